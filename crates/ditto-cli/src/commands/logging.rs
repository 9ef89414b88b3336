use anyhow::anyhow;
use ditto_api_models::{LoggingUpdateResult, routes};
use reqwest::Method;

use crate::cli::{LoggingGetArgs, LoggingUpdateArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult, classify_problem, read_optional_json};
use crate::commands::{append_query, is_empty_document};
use crate::output::{format_logging_results, print_json};
use crate::payload::read_json_object;

pub(crate) async fn handle_logging_get(ctx: &AppContext, args: LoggingGetArgs) -> CliResult<()> {
    let url = match args.module_name.as_deref() {
        Some(module) => ctx.endpoint(routes::DEVOPS_LOGGING, &[module])?,
        None => {
            let mut url = ctx.endpoint(routes::DEVOPS_LOGGING, &[])?;
            let include_disabled = if args.include_disabled { "true" } else { "false" };
            append_query(&mut url, &[("includeDisabledLoggers", Some(include_disabled))]);
            url
        }
    };

    let response = ctx.send(ctx.request(Method::GET, url)).await?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    match read_optional_json(response, "logging configuration").await? {
        Some(config) if !is_empty_document(&config) => print_json(&config),
        _ => {
            println!("No logging configuration found");
            Ok(())
        }
    }
}

pub(crate) async fn handle_logging_update(
    ctx: &AppContext,
    args: LoggingUpdateArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let body = read_json_object(&args.update_file)?;
    let tail: Vec<&str> = args.module_name.as_deref().into_iter().collect();
    let url = ctx.endpoint(routes::DEVOPS_LOGGING, &tail)?;

    let response = ctx.send(ctx.request(Method::PUT, url).json(&body)).await?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let Some(document) = read_optional_json(response, "logging update result").await? else {
        return Err(update_failed());
    };
    let results = LoggingUpdateResult::collect(&document);
    if results.is_empty() {
        return Err(update_failed());
    }
    if output == OutputFormat::Json {
        return print_json(&document);
    }

    let failed = results.iter().filter(|result| !result.success).count();
    if failed > 0 {
        tracing::warn!(failed, total = results.len(), "some services rejected the log level change");
    }
    println!("Logging configuration updated successfully");
    println!("{}", format_logging_results(&results));
    Ok(())
}

fn update_failed() -> CliError {
    CliError::failure(anyhow!("Failed to update logging configuration"))
}
