use std::io::BufRead;

use ditto_api_models::routes;
use reqwest::{Method, StatusCode};
use serde_json::{Map, Value};

use crate::cli::{
    OutputFormat, PolicyCreateArgs, PolicyDeleteArgs, PolicyEntriesArgs, PolicyGetArgs,
};
use crate::client::{
    AppContext, CliError, CliResult, classify_problem, read_json, read_optional_json,
};
use crate::commands::{confirm_delete, is_empty_document};
use crate::output::{print_json, to_pretty_json};
use crate::payload::read_json_object;

pub(crate) async fn handle_policy_get(ctx: &AppContext, args: PolicyGetArgs) -> CliResult<()> {
    let url = ctx.endpoint(routes::POLICIES, &[&args.policy_id])?;
    let response = ctx.send(ctx.request(Method::GET, url)).await?;
    match response.status() {
        status if status.is_success() => {
            let policy: Value = read_json(response, "policy").await?;
            print_json(&policy)
        }
        StatusCode::NOT_FOUND => Err(missing_policy(&args.policy_id)),
        _ => Err(classify_problem(response).await),
    }
}

pub(crate) async fn handle_policy_create(
    ctx: &AppContext,
    args: PolicyCreateArgs,
    output: OutputFormat,
) -> CliResult<()> {
    let body = read_json_object(&args.policy_file)?;
    let url = ctx.endpoint(routes::POLICIES, &[&args.policy_id])?;

    let response = ctx.send(ctx.request(Method::PUT, url).json(&body)).await?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }

    let created = read_optional_json(response, "policy").await?;
    println!(
        "{}",
        format_policy_created(&args.policy_id, created.as_ref(), output)?
    );
    Ok(())
}

/// Success report for `policy create`. JSON mode always yields a document,
/// `{}` when Ditto answered without a body.
pub(crate) fn format_policy_created(
    policy_id: &str,
    created: Option<&Value>,
    output: OutputFormat,
) -> CliResult<String> {
    match (output, created) {
        (OutputFormat::Json, Some(policy)) => to_pretty_json(policy),
        (OutputFormat::Json, None) => to_pretty_json(&Value::Object(Map::new())),
        (OutputFormat::Table, Some(policy)) => Ok(format!(
            "Successfully created policy '{policy_id}'\n{}",
            to_pretty_json(policy)?
        )),
        (OutputFormat::Table, None) => Ok(format!("Successfully created policy '{policy_id}'")),
    }
}

pub(crate) async fn handle_policy_delete(
    ctx: &AppContext,
    args: PolicyDeleteArgs,
    input: &mut impl BufRead,
) -> CliResult<()> {
    if !confirm_delete(input, "policy", &args.policy_id, args.confirm)? {
        return Ok(());
    }

    let url = ctx.endpoint(routes::POLICIES, &[&args.policy_id])?;
    let response = ctx.send(ctx.request(Method::DELETE, url)).await?;
    match response.status() {
        status if status.is_success() => {
            println!("Successfully deleted policy '{}'", args.policy_id);
            Ok(())
        }
        StatusCode::NOT_FOUND => Err(missing_policy(&args.policy_id)),
        _ => Err(classify_problem(response).await),
    }
}

pub(crate) async fn handle_policy_entries(
    ctx: &AppContext,
    args: PolicyEntriesArgs,
) -> CliResult<()> {
    let url = ctx.endpoint(routes::POLICIES, &[&args.policy_id, routes::POLICY_ENTRIES])?;
    let response = ctx.send(ctx.request(Method::GET, url)).await?;
    let entries: Value = match response.status() {
        status if status.is_success() => read_json(response, "policy entries").await?,
        StatusCode::NOT_FOUND => return Err(missing_policy(&args.policy_id)),
        _ => return Err(classify_problem(response).await),
    };

    let entries = match args.subject_id.as_deref() {
        Some(subject) => entries_for_subject(entries, subject),
        None => entries,
    };
    if is_empty_document(&entries) {
        println!("No policy entries found");
        return Ok(());
    }
    print_json(&entries)
}

/// Keep only the policy entries (labels) whose `subjects` contain `subject`.
pub(crate) fn entries_for_subject(entries: Value, subject: &str) -> Value {
    let Value::Object(entries) = entries else {
        return entries;
    };
    let kept: Map<String, Value> = entries
        .into_iter()
        .filter(|(_, entry)| {
            entry
                .get("subjects")
                .and_then(Value::as_object)
                .is_some_and(|subjects| subjects.contains_key(subject))
        })
        .collect();
    Value::Object(kept)
}

fn missing_policy(policy_id: &str) -> CliError {
    CliError::not_found(format!("Policy '{policy_id}' not found"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Profile;
    use crate::client::test_support::{basic_auth, context_for, temp_json};
    use httpmock::prelude::*;
    use serde_json::json;

    const POLICY_ID: &str = "org.example:policy";

    fn sample_entries() -> Value {
        json!({
            "DEFAULT": {
                "subjects": {"nginx:ditto": {"type": "nginx basic auth user"}},
                "resources": {"thing:/": {"grant": ["READ", "WRITE"], "revoke": []}}
            },
            "OBSERVER": {
                "subjects": {"nginx:observer": {"type": "nginx basic auth user"}},
                "resources": {"thing:/": {"grant": ["READ"], "revoke": []}}
            }
        })
    }

    #[test]
    fn entries_filter_keeps_matching_labels() {
        let filtered = entries_for_subject(sample_entries(), "nginx:observer");
        let labels: Vec<&String> = filtered.as_object().expect("object").keys().collect();
        assert_eq!(labels, vec!["OBSERVER"]);
    }

    #[test]
    fn entries_filter_without_match_is_empty() {
        let filtered = entries_for_subject(sample_entries(), "nginx:nobody");
        assert!(is_empty_document(&filtered));
    }

    #[test]
    fn entries_filter_passes_non_objects_through() {
        assert_eq!(entries_for_subject(json!([1]), "x"), json!([1]));
    }

    #[test]
    fn created_report_always_yields_json_in_json_mode() {
        let text = format_policy_created(POLICY_ID, None, OutputFormat::Json).expect("format");
        assert_eq!(text, "{}");

        let policy = json!({"policyId": POLICY_ID});
        let text =
            format_policy_created(POLICY_ID, Some(&policy), OutputFormat::Json).expect("format");
        assert_eq!(serde_json::from_str::<Value>(&text).expect("json"), policy);
    }

    #[test]
    fn created_report_in_table_mode_leads_with_message() {
        let text = format_policy_created(POLICY_ID, None, OutputFormat::Table).expect("format");
        assert_eq!(text, "Successfully created policy 'org.example:policy'");

        let policy = json!({"policyId": POLICY_ID});
        let text =
            format_policy_created(POLICY_ID, Some(&policy), OutputFormat::Table).expect("format");
        assert!(text.starts_with("Successfully created policy 'org.example:policy'\n{"));
    }

    #[tokio::test]
    async fn get_uses_ditto_profile_and_maps_404() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/2/policies/org.example:policy")
                .header("authorization", basic_auth(Profile::Ditto));
            then.status(404);
        });

        let ctx = context_for(&server, Profile::Ditto);
        let err = handle_policy_get(
            &ctx,
            PolicyGetArgs {
                policy_id: POLICY_ID.into(),
            },
        )
        .await
        .expect_err("missing policy");
        assert!(
            matches!(err, CliError::NotFound(message) if message == "Policy 'org.example:policy' not found")
        );
        mock.assert();
    }

    #[tokio::test]
    async fn create_accepts_empty_response_body() {
        let server = MockServer::start_async().await;
        let policy = json!({"entries": sample_entries()});
        let expected = policy.clone();
        let mock = server.mock(move |when, then| {
            when.method(PUT)
                .path("/api/2/policies/org.example:policy")
                .json_body(expected);
            then.status(204);
        });

        let file = temp_json("policy.json", &policy);
        let ctx = context_for(&server, Profile::Ditto);
        handle_policy_create(
            &ctx,
            PolicyCreateArgs {
                policy_id: POLICY_ID.into(),
                policy_file: file.path().to_path_buf(),
            },
            OutputFormat::Table,
        )
        .await
        .expect("create should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn create_surfaces_conflict_as_validation() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(PUT).path("/api/2/policies/org.example:policy");
            then.status(409).json_body(json!({
                "status": 409,
                "error": "policies:policy.conflict",
                "message": "The Policy already exists."
            }));
        });

        let file = temp_json("policy.json", &json!({"entries": {}}));
        let ctx = context_for(&server, Profile::Ditto);
        let err = handle_policy_create(
            &ctx,
            PolicyCreateArgs {
                policy_id: POLICY_ID.into(),
                policy_file: file.path().to_path_buf(),
            },
            OutputFormat::Json,
        )
        .await
        .expect_err("conflict");
        assert!(matches!(err, CliError::Validation(message) if message.contains("already exists")));
    }

    #[tokio::test]
    async fn delete_with_confirm_flag_sends_request() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/api/2/policies/org.example:policy");
            then.status(204);
        });

        let ctx = context_for(&server, Profile::Ditto);
        handle_policy_delete(
            &ctx,
            PolicyDeleteArgs {
                policy_id: POLICY_ID.into(),
                confirm: true,
            },
            &mut std::io::empty(),
        )
        .await
        .expect("delete should succeed");
        mock.assert();
    }

    #[tokio::test]
    async fn delete_without_answer_is_cancelled() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/api/2/policies/org.example:policy");
            then.status(204);
        });

        let ctx = context_for(&server, Profile::Ditto);
        for answer in ["n\n", ""] {
            handle_policy_delete(
                &ctx,
                PolicyDeleteArgs {
                    policy_id: POLICY_ID.into(),
                    confirm: false,
                },
                &mut answer.as_bytes(),
            )
            .await
            .expect("cancelling is not an error");
        }
        mock.assert_calls(0);
    }

    #[tokio::test]
    async fn entries_reads_entries_sub_resource() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/2/policies/org.example:policy/entries");
            then.status(200).json_body(sample_entries());
        });

        let ctx = context_for(&server, Profile::Ditto);
        handle_policy_entries(
            &ctx,
            PolicyEntriesArgs {
                policy_id: POLICY_ID.into(),
                subject_id: Some("nginx:ditto".into()),
            },
        )
        .await
        .expect("entries should succeed");
        mock.assert();
    }
}
