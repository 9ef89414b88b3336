use std::io::BufRead;

use ditto_api_models::{Connection, routes};
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::cli::{
    ConnectionCreateArgs, ConnectionDeleteArgs, ConnectionGetArgs, ConnectionListArgs,
    OutputFormat,
};
use crate::client::{
    AppContext, CliError, CliResult, classify_problem, read_json, read_optional_json,
};
use crate::commands::{append_query, confirm_delete};
use crate::output::{format_connections_table, print_json};
use crate::payload::read_json_object;

pub(crate) async fn handle_connection_list(
    ctx: &AppContext,
    args: ConnectionListArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let mut url = ctx.endpoint(routes::CONNECTIONS, &[])?;
    append_query(&mut url, &[("fields", args.fields.as_deref())]);

    let response = ctx.send(ctx.request(Method::GET, url)).await?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let connections: Vec<Connection> = read_json(response, "connection list").await?;
    if output == OutputFormat::Json {
        return print_json(&connections);
    }
    if connections.is_empty() {
        println!("No connections found");
        return Ok(());
    }
    println!("{}", format_connections_table(&connections));
    Ok(())
}

pub(crate) async fn handle_connection_get(
    ctx: &AppContext,
    args: ConnectionGetArgs,
) -> CliResult<()> {
    let mut url = ctx.endpoint(routes::CONNECTIONS, &[&args.connection_id])?;
    append_query(&mut url, &[("fields", args.fields.as_deref())]);

    let response = ctx.send(ctx.request(Method::GET, url)).await?;
    match response.status() {
        status if status.is_success() => {
            let connection: Value = read_json(response, "connection").await?;
            print_json(&connection)
        }
        StatusCode::NOT_FOUND => Err(missing_connection(&args.connection_id)),
        _ => Err(classify_problem(response).await),
    }
}

pub(crate) async fn handle_connection_create(
    ctx: &AppContext,
    args: ConnectionCreateArgs,
) -> CliResult<()> {
    let definition = connection_definition(&args)?;
    let url = ctx.endpoint(routes::CONNECTIONS, &[&args.connection_id])?;

    let response = ctx
        .send(ctx.request(Method::PUT, url).json(&definition))
        .await?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    match read_optional_json(response, "connection").await? {
        Some(created) => print_json(&created),
        None => {
            println!("Successfully created connection '{}'", args.connection_id);
            Ok(())
        }
    }
}

pub(crate) async fn handle_connection_delete(
    ctx: &AppContext,
    args: ConnectionDeleteArgs,
    input: &mut impl BufRead,
) -> CliResult<()> {
    if !confirm_delete(input, "connection", &args.connection_id, args.confirm)? {
        return Ok(());
    }

    let url = ctx.endpoint(routes::CONNECTIONS, &[&args.connection_id])?;
    let response = ctx.send(ctx.request(Method::DELETE, url)).await?;
    match response.status() {
        status if status.is_success() => {
            println!("Successfully deleted connection '{}'", args.connection_id);
            Ok(())
        }
        StatusCode::NOT_FOUND => Err(missing_connection(&args.connection_id)),
        _ => Err(classify_problem(response).await),
    }
}

/// Resolve the connection body from the inline `-d` value or `--file`.
pub(crate) fn connection_definition(args: &ConnectionCreateArgs) -> CliResult<Value> {
    if let Some(inline) = args.definition.as_deref() {
        let value: Value = serde_json::from_str(inline).map_err(|err| {
            CliError::validation(format!("connection definition is not valid JSON: {err}"))
        })?;
        if !value.is_object() {
            return Err(CliError::validation(
                "connection definition must be a JSON object",
            ));
        }
        return Ok(value);
    }
    match args.file.as_deref() {
        Some(path) => Ok(read_json_object(path)?),
        None => Err(CliError::validation(
            "provide a connection definition with --definition or --file",
        )),
    }
}

fn missing_connection(connection_id: &str) -> CliError {
    CliError::not_found(format!("Connection '{connection_id}' not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Profile;
    use crate::client::test_support::{basic_auth, context_for, temp_json};
    use httpmock::prelude::*;
    use serde_json::json;

    const CONNECTION_ID: &str = "mqtt-example";

    fn create_args(definition: Option<&str>, file: Option<std::path::PathBuf>) -> ConnectionCreateArgs {
        ConnectionCreateArgs {
            connection_id: CONNECTION_ID.into(),
            definition: definition.map(str::to_string),
            file,
        }
    }

    #[test]
    fn inline_definition_must_be_an_object() {
        let err = connection_definition(&create_args(Some("[1, 2]"), None)).expect_err("array");
        assert!(matches!(err, CliError::Validation(message) if message.contains("JSON object")));

        let err = connection_definition(&create_args(Some("{oops"), None)).expect_err("bad json");
        assert!(matches!(err, CliError::Validation(message) if message.contains("not valid JSON")));
    }

    #[test]
    fn definition_falls_back_to_file() {
        let file = temp_json("connection.json", &json!({"connectionType": "mqtt"}));
        let value = connection_definition(&create_args(None, Some(file.path().to_path_buf()))).expect("file");
        assert_eq!(value["connectionType"], "mqtt");
    }

    #[test]
    fn missing_definition_is_rejected() {
        let err = connection_definition(&create_args(None, None)).expect_err("nothing given");
        assert!(matches!(err, CliError::Validation(_)));
    }

    #[tokio::test]
    async fn list_uses_devops_credentials_and_fields() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/2/connections")
                .query_param("fields", "id,connectionStatus")
                .header("authorization", basic_auth(Profile::Devops));
            then.status(200).json_body(json!([
                {"id": CONNECTION_ID, "connectionStatus": "open"}
            ]));
        });

        let ctx = context_for(&server, Profile::Devops);
        handle_connection_list(
            &ctx,
            ConnectionListArgs {
                fields: Some("id,connectionStatus".into()),
            },
            OutputFormat::Table,
        )
        .await
        .expect("list should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn get_maps_404_to_not_found() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/2/connections/mqtt-example");
            then.status(404);
        });

        let ctx = context_for(&server, Profile::Devops);
        let err = handle_connection_get(
            &ctx,
            ConnectionGetArgs {
                connection_id: CONNECTION_ID.into(),
                fields: None,
            },
        )
        .await
        .expect_err("missing connection");
        assert!(
            matches!(err, CliError::NotFound(message) if message == "Connection 'mqtt-example' not found")
        );
    }

    #[tokio::test]
    async fn create_puts_inline_definition() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/2/connections/mqtt-example")
                .json_body(json!({"connectionType": "mqtt", "uri": "tcp://broker:1883"}));
            then.status(201)
                .json_body(json!({"id": CONNECTION_ID, "connectionType": "mqtt"}));
        });

        let ctx = context_for(&server, Profile::Devops);
        handle_connection_create(
            &ctx,
            create_args(
                Some(r#"{"connectionType": "mqtt", "uri": "tcp://broker:1883"}"#),
                None,
            ),
        )
        .await
        .expect("create should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn delete_reports_server_errors() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(DELETE).path("/api/2/connections/mqtt-example");
            then.status(500).json_body(json!({
                "status": 500,
                "error": "connectivity:connection.unavailable",
                "message": "The connection is not available."
            }));
        });

        let ctx = context_for(&server, Profile::Devops);
        let err = handle_connection_delete(
            &ctx,
            ConnectionDeleteArgs {
                connection_id: CONNECTION_ID.into(),
                confirm: true,
            },
            &mut std::io::empty(),
        )
        .await
        .expect_err("server error");
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("not available"));
    }

    #[tokio::test]
    async fn delete_declined_sends_nothing() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/api/2/connections/mqtt-example");
            then.status(204);
        });

        let ctx = context_for(&server, Profile::Devops);
        for answer in ["no\n", ""] {
            handle_connection_delete(
                &ctx,
                ConnectionDeleteArgs {
                    connection_id: CONNECTION_ID.into(),
                    confirm: false,
                },
                &mut answer.as_bytes(),
            )
            .await
            .expect("cancelling is not an error");
        }
        mock.assert_calls(0);
    }
}
