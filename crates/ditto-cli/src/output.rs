//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use ditto_api_models::{Connection, LoggingUpdateResult, Thing, WhoAmI};
use serde::Serialize;

use crate::client::{CliError, CliResult};

const NOT_AVAILABLE: &str = "N/A";

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", to_pretty_json(value)?);
    Ok(())
}

pub(crate) fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

/// Render rows as a titled, left-aligned text table.
#[must_use]
pub(crate) fn format_table(title: &str, headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(title.to_string());
    lines.push(render_row(headers.iter().copied(), &widths));
    for row in rows {
        lines.push(render_row(row.iter().map(String::as_str), &widths));
    }
    lines.join("\n")
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let line = cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

#[must_use]
pub(crate) fn format_things_table(things: &[Thing]) -> String {
    let rows: Vec<Vec<String>> = things
        .iter()
        .map(|thing| {
            vec![
                thing
                    .thing_id
                    .clone()
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                thing.feature_count().to_string(),
            ]
        })
        .collect();
    format_table("Ditto Things", &["THING ID", "FEATURES"], &rows)
}

#[must_use]
pub(crate) fn format_connections_table(connections: &[Connection]) -> String {
    let cell = |value: &Option<String>| {
        value
            .as_deref()
            .filter(|text| !text.is_empty())
            .unwrap_or(NOT_AVAILABLE)
            .to_string()
    };
    let rows: Vec<Vec<String>> = connections
        .iter()
        .map(|connection| {
            vec![
                cell(&connection.id),
                cell(&connection.connection_status),
                cell(&connection.connection_type),
                cell(&connection.uri),
            ]
        })
        .collect();
    format_table(
        "Ditto Connections",
        &["CONNECTION ID", "STATUS", "TYPE", "URI"],
        &rows,
    )
}

#[must_use]
pub(crate) fn format_logging_results(results: &[LoggingUpdateResult]) -> String {
    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|result| {
            let service = match (&result.service_name, &result.instance) {
                (Some(name), Some(instance)) => format!("{name} ({})", plain(instance)),
                (Some(name), None) => name.clone(),
                (None, _) => "Unknown".to_string(),
            };
            let status = if result.success { "Success" } else { "Failed" };
            vec![
                service,
                status.to_string(),
                result
                    .message
                    .clone()
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            ]
        })
        .collect();
    format_table("Update Results", &["SERVICE", "STATUS", "MESSAGE"], &rows)
}

#[must_use]
pub(crate) fn format_whoami(whoami: &WhoAmI) -> String {
    let default_subject = whoami
        .default_subject
        .clone()
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let subjects = if whoami.subjects.is_empty() {
        "None".to_string()
    } else {
        whoami.subjects.join(", ")
    };
    format_table(
        "Current User Information",
        &["PROPERTY", "VALUE"],
        &[
            vec!["Default Subject".to_string(), default_subject],
            vec!["Subjects".to_string(), subjects],
        ],
    )
}

fn plain(value: &serde_json::Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_string)
}
