use ditto_api_models::routes;
use reqwest::Method;
use serde_json::Value;

use crate::cli::{OutputFormat, PermissionCheckArgs};
use crate::client::{AppContext, CliResult, classify_problem, read_optional_json};
use crate::output::{print_json, to_pretty_json};
use crate::payload::read_json_object;

pub(crate) async fn handle_permission_check(
    ctx: &AppContext,
    args: PermissionCheckArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let request = read_json_object(&args.request_file)?;
    let url = ctx.endpoint(routes::CHECK_PERMISSIONS, &[])?;

    let response = ctx.send(ctx.request(Method::POST, url).json(&request)).await?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let results = read_optional_json(response, "permission check result").await?;
    match results {
        Some(Value::Object(map)) if !map.is_empty() => {
            let results = Value::Object(map);
            match output {
                OutputFormat::Json => print_json(&results),
                OutputFormat::Table => {
                    println!("Permission Check Results:\n{}", to_pretty_json(&results)?);
                    Ok(())
                }
            }
        }
        _ => {
            println!("No permission check results returned");
            Ok(())
        }
    }
}
