//! Command handlers grouped by Ditto resource.

use std::io::{self, BufRead, Write};

use anyhow::anyhow;
use reqwest::Url;
use serde_json::Value;

use crate::client::{CliError, CliResult};

pub(crate) mod config;
pub(crate) mod connections;
pub(crate) mod devops;
pub(crate) mod logging;
pub(crate) mod permissions;
pub(crate) mod policies;
pub(crate) mod search;
pub(crate) mod things;

/// Append the query parameters that were actually provided.
pub(crate) fn append_query(url: &mut Url, params: &[(&str, Option<&str>)]) {
    let provided: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(key, value)| value.map(|value| (*key, value)))
        .collect();
    if provided.is_empty() {
        return;
    }
    let mut pairs = url.query_pairs_mut();
    for (key, value) in provided {
        pairs.append_pair(key, value);
    }
}

/// Whether a response document carries nothing worth printing.
pub(crate) fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Ask the user to confirm a destructive action on stderr.
///
/// Reads one line from `input`; end of input counts as "no".
pub(crate) fn confirm(input: &mut impl BufRead, question: &str) -> CliResult<bool> {
    let mut stderr = io::stderr().lock();
    write!(stderr, "{question} [y/N]: ")
        .and_then(|()| stderr.flush())
        .map_err(|err| CliError::failure(anyhow!("failed to write prompt: {err}")))?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .map_err(|err| CliError::failure(anyhow!("failed to read confirmation: {err}")))?;
    Ok(is_affirmative(&answer))
}

pub(crate) fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Confirm a delete unless the caller already opted out of prompting.
///
/// Prints "Operation cancelled" and returns `false` when declined.
pub(crate) fn confirm_delete(
    input: &mut impl BufRead,
    kind: &str,
    id: &str,
    skip_prompt: bool,
) -> CliResult<bool> {
    if skip_prompt || confirm(input, &format!("Are you sure you want to delete {kind} '{id}'?"))? {
        return Ok(true);
    }
    println!("Operation cancelled");
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_query_skips_missing_values() {
        let mut url: Url = "http://ditto.local/api/2/things".parse().expect("url");
        append_query(&mut url, &[("fields", None), ("ids", None)]);
        assert_eq!(url.query(), None);

        append_query(
            &mut url,
            &[("fields", Some("thingId,features")), ("ids", None), ("timeout", Some("5s"))],
        );
        assert_eq!(url.query(), Some("fields=thingId%2Cfeatures&timeout=5s"));
    }

    #[test]
    fn empty_documents() {
        assert!(is_empty_document(&Value::Null));
        assert!(is_empty_document(&serde_json::json!({})));
        assert!(is_empty_document(&serde_json::json!([])));
        assert!(!is_empty_document(&serde_json::json!({"a": 1})));
        assert!(!is_empty_document(&serde_json::json!(0)));
    }

    #[test]
    fn affirmative_answers() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative("yep"));
    }

    #[test]
    fn confirm_delete_skips_prompt_when_forced() {
        let mut input = "n\n".as_bytes();
        assert!(confirm_delete(&mut input, "thing", "org.example:lamp", true).expect("confirm"));
        assert_eq!(input, b"n\n", "forced delete must not read an answer");
    }

    #[test]
    fn confirm_reads_one_answer() {
        assert!(confirm(&mut "yes\n".as_bytes(), "Delete?").expect("confirm"));
        assert!(!confirm(&mut "no\n".as_bytes(), "Delete?").expect("confirm"));
        assert!(!confirm(&mut "".as_bytes(), "Delete?").expect("end of input"));
    }
}
