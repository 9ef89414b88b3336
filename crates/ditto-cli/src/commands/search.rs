use anyhow::anyhow;
use ditto_api_models::{SearchResult, routes};
use reqwest::Method;
use serde_json::Value;

use crate::cli::{OutputFormat, SearchCountArgs, SearchQueryArgs};
use crate::client::{AppContext, CliError, CliResult, classify_problem, read_json};
use crate::commands::append_query;
use crate::output::{format_things_table, print_json};

pub(crate) async fn handle_search_query(
    ctx: &AppContext,
    args: SearchQueryArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let mut url = ctx.endpoint(routes::SEARCH_THINGS, &[])?;
    append_query(
        &mut url,
        &[
            ("filter", args.filter.as_deref()),
            ("fields", args.fields.as_deref()),
            ("namespaces", args.namespaces.as_deref()),
            ("option", args.option.as_deref()),
            ("timeout", args.timeout.as_deref()),
        ],
    );

    let response = ctx.send(ctx.request(Method::GET, url)).await?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let result: SearchResult = read_json(response, "search result").await?;
    if output == OutputFormat::Json {
        return print_json(&result);
    }
    if result.items.is_empty() {
        println!("No things found");
        return Ok(());
    }
    println!("{}", format_things_table(&result.items));
    if let Some(cursor) = result.cursor.as_deref() {
        println!("next cursor: {cursor}");
    }
    Ok(())
}

pub(crate) async fn handle_search_count(
    ctx: &AppContext,
    args: SearchCountArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let mut url = ctx.endpoint(routes::SEARCH_COUNT, &[])?;
    append_query(
        &mut url,
        &[
            ("filter", args.filter.as_deref()),
            ("namespaces", args.namespaces.as_deref()),
        ],
    );

    let response = ctx.send(ctx.request(Method::GET, url)).await?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let body: Value = read_json(response, "search count").await?;
    let count = parse_count(&body)?;
    match output {
        OutputFormat::Json => print_json(&count),
        OutputFormat::Table => {
            println!("Total things: {count}");
            Ok(())
        }
    }
}

/// Ditto answers the count endpoint with a bare number; older gateways
/// send it as a string.
pub(crate) fn parse_count(body: &Value) -> CliResult<u64> {
    body.as_u64()
        .or_else(|| body.as_str().and_then(|text| text.trim().parse().ok()))
        .ok_or_else(|| CliError::failure(anyhow!("unexpected search count response: {body}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Profile;
    use crate::client::test_support::{basic_auth, context_for};
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn count_accepts_number_and_numeric_string() {
        assert_eq!(parse_count(&json!(42)).expect("number"), 42);
        assert_eq!(parse_count(&json!("7")).expect("string"), 7);
        let err = parse_count(&json!({"count": 1})).expect_err("object");
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn query_forwards_filter_and_options() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/2/search/things")
                .query_param("filter", "eq(attributes/room,\"hall\")")
                .query_param("namespaces", "org.example")
                .query_param("option", "size(2),sort(+thingId)")
                .header("authorization", basic_auth(Profile::Ditto));
            then.status(200).json_body(json!({
                "items": [{"thingId": "org.example:lamp", "features": {"power": {}}}],
                "cursor": "AQID"
            }));
        });

        let ctx = context_for(&server, Profile::Ditto);
        handle_search_query(
            &ctx,
            SearchQueryArgs {
                filter: Some("eq(attributes/room,\"hall\")".into()),
                namespaces: Some("org.example".into()),
                option: Some("size(2),sort(+thingId)".into()),
                ..SearchQueryArgs::default()
            },
            OutputFormat::Table,
        )
        .await
        .expect("query should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn query_rejects_invalid_rql_as_validation() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/2/search/things");
            then.status(400).json_body(json!({
                "status": 400,
                "error": "rql.expression.invalid",
                "message": "The RQL expression is invalid."
            }));
        });

        let ctx = context_for(&server, Profile::Ditto);
        let err = handle_search_query(
            &ctx,
            SearchQueryArgs {
                filter: Some("eq(".into()),
                ..SearchQueryArgs::default()
            },
            OutputFormat::Json,
        )
        .await
        .expect_err("invalid filter");
        assert!(matches!(err, CliError::Validation(message) if message.contains("RQL")));
    }

    #[tokio::test]
    async fn count_reads_bare_number() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/2/search/things/count")
                .query_param("namespaces", "org.example");
            then.status(200).body("12");
        });

        let ctx = context_for(&server, Profile::Ditto);
        handle_search_count(
            &ctx,
            SearchCountArgs {
                filter: None,
                namespaces: Some("org.example".into()),
            },
            OutputFormat::Table,
        )
        .await
        .expect("count should succeed");
        mock.assert();
    }
}
