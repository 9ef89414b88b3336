use ditto_api_models::routes;
use reqwest::Method;

use crate::cli::ConfigGetArgs;
use crate::client::{AppContext, CliError, CliResult, classify_problem, read_optional_json};
use crate::commands::{append_query, is_empty_document};
use crate::output::print_json;

pub(crate) async fn handle_config_get(ctx: &AppContext, args: ConfigGetArgs) -> CliResult<()> {
    let tail = config_tail(&args)?;
    let mut url = ctx.endpoint(routes::DEVOPS_CONFIG, &tail)?;
    append_query(&mut url, &[("path", args.path.as_deref())]);

    let response = ctx.send(ctx.request(Method::GET, url)).await?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    match read_optional_json(response, "configuration").await? {
        Some(config) if !is_empty_document(&config) => print_json(&config),
        _ => {
            println!("No configuration found");
            Ok(())
        }
    }
}

/// Segments below `/devops/config`: nothing, the module, or module and pod.
pub(crate) fn config_tail(args: &ConfigGetArgs) -> CliResult<Vec<&str>> {
    match (args.module_name.as_deref(), args.pod_name.as_deref()) {
        (None, None) => Ok(Vec::new()),
        (Some(module), None) => Ok(vec![module]),
        (Some(module), Some(pod)) => Ok(vec![module, pod]),
        (None, Some(_)) => Err(CliError::validation("--pod-name requires --module-name")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Profile;
    use crate::client::test_support::{basic_auth, context_for};
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn pod_without_module_is_rejected() {
        let args = ConfigGetArgs {
            pod_name: Some("pod-1".into()),
            ..ConfigGetArgs::default()
        };
        assert!(matches!(config_tail(&args), Err(CliError::Validation(_))));
    }

    #[tokio::test]
    async fn get_targets_module_and_pod_with_path() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/devops/config/gateway/gateway-0")
                .query_param("path", "ditto.gateway")
                .header("authorization", basic_auth(Profile::Devops));
            then.status(200)
                .json_body(json!({"gateway": {"0": {"ditto": {"gateway": {}}}}}));
        });

        let ctx = context_for(&server, Profile::Devops);
        handle_config_get(
            &ctx,
            ConfigGetArgs {
                module_name: Some("gateway".into()),
                pod_name: Some("gateway-0".into()),
                path: Some("ditto.gateway".into()),
            },
        )
        .await
        .expect("config should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn get_without_arguments_reads_root() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/devops/config");
            then.status(200).json_body(json!({}));
        });

        let ctx = context_for(&server, Profile::Devops);
        handle_config_get(&ctx, ConfigGetArgs::default())
            .await
            .expect("empty config is not an error");
        mock.assert();
    }
}
