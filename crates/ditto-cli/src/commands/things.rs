use std::io::BufRead;

use anyhow::anyhow;
use ditto_api_models::{CONTENT_TYPE_MERGE_PATCH, HEADER_HISTORICAL_REVISION, Thing, routes};
use json_patch::Patch;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::cli::{
    OutputFormat, ThingCreateArgs, ThingDeleteArgs, ThingDiffArgs, ThingGetArgs, ThingListArgs,
    ThingUpdateArgs,
};
use crate::client::{AppContext, CliError, CliResult, classify_problem, read_json};
use crate::commands::{append_query, confirm_delete};
use crate::output::{format_things_table, print_json, to_pretty_json};
use crate::payload::read_json_object;

pub(crate) async fn handle_thing_list(
    ctx: &AppContext,
    args: ThingListArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let mut url = ctx.endpoint(routes::THINGS, &[])?;
    append_query(
        &mut url,
        &[
            ("fields", args.fields.as_deref()),
            ("ids", args.ids.as_deref()),
            ("timeout", args.timeout.as_deref()),
        ],
    );

    let response = ctx.send(ctx.request(Method::GET, url)).await?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let things: Vec<Thing> = read_json(response, "thing list").await?;
    if output == OutputFormat::Json {
        return print_json(&things);
    }
    if things.is_empty() {
        println!("No things found");
        return Ok(());
    }
    println!("{}", format_things_table(&things));
    Ok(())
}

pub(crate) async fn handle_thing_get(ctx: &AppContext, args: ThingGetArgs) -> CliResult<()> {
    let thing = fetch_thing(ctx, &args.thing_id, args.revision, args.fields.as_deref())
        .await?
        .ok_or_else(|| missing_thing(&args.thing_id, args.revision))?;
    print_json(&thing)
}

pub(crate) async fn handle_thing_create(ctx: &AppContext, args: ThingCreateArgs) -> CliResult<()> {
    let body = read_json_object(&args.data_file)?;
    let url = ctx.endpoint(routes::THINGS, &[&args.thing_id])?;

    let response = ctx.send(ctx.request(Method::PUT, url).json(&body)).await?;
    if response.status().is_success() {
        println!("Successfully created thing '{}'", args.thing_id);
        Ok(())
    } else {
        Err(classify_problem(response).await)
    }
}

pub(crate) async fn handle_thing_update(ctx: &AppContext, args: ThingUpdateArgs) -> CliResult<()> {
    let patch = read_json_object(&args.patch_file)?;
    let body = serde_json::to_vec(&patch)
        .map_err(|err| CliError::failure(anyhow!("failed to encode merge patch: {err}")))?;
    let url = ctx.endpoint(routes::THINGS, &[&args.thing_id])?;

    let request = ctx
        .request(Method::PATCH, url)
        .header(CONTENT_TYPE, CONTENT_TYPE_MERGE_PATCH)
        .body(body);
    let response = ctx.send(request).await?;
    match response.status() {
        status if status.is_success() => {
            println!("Successfully updated thing '{}'", args.thing_id);
            Ok(())
        }
        StatusCode::NOT_FOUND => Err(missing_thing(&args.thing_id, None)),
        _ => Err(classify_problem(response).await),
    }
}

pub(crate) async fn handle_thing_delete(
    ctx: &AppContext,
    args: ThingDeleteArgs,
    input: &mut impl BufRead,
) -> CliResult<()> {
    if !confirm_delete(input, "thing", &args.thing_id, args.force)? {
        return Ok(());
    }

    let url = ctx.endpoint(routes::THINGS, &[&args.thing_id])?;
    let response = ctx.send(ctx.request(Method::DELETE, url)).await?;
    match response.status() {
        status if status.is_success() => {
            println!("Successfully deleted thing '{}'", args.thing_id);
            Ok(())
        }
        StatusCode::NOT_FOUND => Err(missing_thing(&args.thing_id, None)),
        _ => Err(classify_problem(response).await),
    }
}

pub(crate) async fn handle_thing_diff(
    ctx: &AppContext,
    args: ThingDiffArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let current = fetch_thing(ctx, &args.thing_id, None, None)
        .await?
        .ok_or_else(|| missing_thing(&args.thing_id, None))?;
    let historical = fetch_thing(ctx, &args.thing_id, Some(args.revision), None)
        .await?
        .ok_or_else(|| missing_thing(&args.thing_id, Some(args.revision)))?;

    let patch = diff_states(&as_thing(historical)?, &as_thing(current)?);
    tracing::debug!(
        thing_id = %args.thing_id,
        revision = args.revision,
        operations = patch.0.len(),
        "computed revision diff"
    );

    match output {
        OutputFormat::Json => print_json(&patch),
        OutputFormat::Table => {
            println!("{}", format_diff(&args.thing_id, args.revision, &patch)?);
            Ok(())
        }
    }
}

/// JSON Patch turning the historical state into the current one.
pub(crate) fn diff_states(historical: &Thing, current: &Thing) -> Patch {
    json_patch::diff(&historical.state_view(), &current.state_view())
}

pub(crate) fn format_diff(thing_id: &str, revision: u64, patch: &Patch) -> CliResult<String> {
    if patch.0.is_empty() {
        return Ok(format!(
            "No differences found between current thing and revision {revision}"
        ));
    }
    Ok(format!(
        "Differences between revision {revision} and current state of '{thing_id}':\n{}",
        to_pretty_json(patch)?
    ))
}

async fn fetch_thing(
    ctx: &AppContext,
    thing_id: &str,
    revision: Option<u64>,
    fields: Option<&str>,
) -> CliResult<Option<Value>> {
    let mut url = ctx.endpoint(routes::THINGS, &[thing_id])?;
    append_query(&mut url, &[("fields", fields)]);

    let mut request = ctx.request(Method::GET, url);
    if let Some(revision) = revision {
        request = request.header(HEADER_HISTORICAL_REVISION, revision.to_string());
    }

    let response = ctx.send(request).await?;
    match response.status() {
        StatusCode::NOT_FOUND => Ok(None),
        status if status.is_success() => read_json(response, "thing").await.map(Some),
        _ => Err(classify_problem(response).await),
    }
}

fn as_thing(value: Value) -> CliResult<Thing> {
    serde_json::from_value(value)
        .map_err(|err| CliError::failure(anyhow!("response is not a thing document: {err}")))
}

fn missing_thing(thing_id: &str, revision: Option<u64>) -> CliError {
    match revision {
        Some(revision) => {
            CliError::not_found(format!("Thing '{thing_id}' revision {revision} not found"))
        }
        None => CliError::not_found(format!("Thing '{thing_id}' not found")),
    }
}
