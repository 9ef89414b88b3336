#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared HTTP DTOs for the Ditto HTTP API v2 and the DevOps API.
//!
//! Ditto documents are passed through the CLI as opaque JSON. The types here
//! only name the handful of fields the renderers read; everything else is
//! preserved in a flattened `extra` map so round-tripping a document never
//! drops data.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod routes;

/// Header asking Ditto to answer from a historical revision of an entity.
pub const HEADER_HISTORICAL_REVISION: &str = "at-historical-revision";
/// Header Ditto propagates into its logs to correlate a request.
pub const HEADER_CORRELATION_ID: &str = "correlation-id";
/// Content type Ditto requires for `PATCH` requests.
pub const CONTENT_TYPE_MERGE_PATCH: &str = "application/merge-patch+json";

/// Error document returned by Ditto for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DittoErrorBody {
    /// HTTP status code echoed in the body.
    pub status: u16,
    #[serde(default)]
    /// Machine readable error code, e.g. `things:thing.notfound`.
    pub error: String,
    #[serde(default)]
    /// Short human readable message.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Longer explanation, usually with a hint on how to fix the request.
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Link to the relevant documentation page.
    pub href: Option<String>,
}

impl DittoErrorBody {
    /// Most descriptive message carried by the document.
    #[must_use]
    pub fn best_message(&self) -> &str {
        self.description
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(&self.message)
    }
}

/// Digital twin as returned by `GET /api/2/things[/{thingId}]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Thing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Namespaced identifier of the thing.
    pub thing_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Identifier of the policy guarding the thing.
    pub policy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Free-form attribute object.
    pub attributes: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Feature map keyed by feature id.
    pub features: Option<Value>,
    #[serde(flatten)]
    /// Remaining fields (`_revision`, `_modified`, `definition`, ...).
    pub extra: Map<String, Value>,
}

impl Thing {
    /// Number of features attached to the thing (zero when absent).
    #[must_use]
    pub fn feature_count(&self) -> usize {
        self.features
            .as_ref()
            .and_then(Value::as_object)
            .map_or(0, Map::len)
    }

    /// The part of the thing that is compared across revisions.
    ///
    /// Only `attributes` and `features` are kept; metadata such as the
    /// revision counter or modification timestamp always differs and would
    /// drown out the actual change.
    #[must_use]
    pub fn state_view(&self) -> Value {
        let mut view = Map::new();
        if let Some(attributes) = self.attributes.as_ref().filter(|value| !value.is_null()) {
            view.insert("attributes".to_string(), attributes.clone());
        }
        if let Some(features) = self.features.as_ref().filter(|value| !value.is_null()) {
            view.insert("features".to_string(), features.clone());
        }
        Value::Object(view)
    }
}

/// Page of things returned by `GET /api/2/search/things`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    #[serde(default)]
    /// Things matching the query.
    pub items: Vec<Thing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Cursor for the next page, when more results exist.
    pub cursor: Option<String>,
}

/// Connection summary as returned by `GET /api/2/connections[/{id}]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Connection identifier.
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Desired status (`open` / `closed`).
    pub connection_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Protocol type (`amqp-091`, `mqtt`, `kafka`, ...).
    pub connection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Broker URI, credentials included as configured.
    pub uri: Option<String>,
    #[serde(flatten)]
    /// Remaining connection fields (sources, targets, mappings, ...).
    pub extra: Map<String, Value>,
}

/// Identity information returned by `GET /api/2/whoami`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmI {
    #[serde(default)]
    /// Every subject the caller is authenticated as.
    pub subjects: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Subject Ditto uses when creating inline policies.
    pub default_subject: Option<String>,
}

/// Outcome of a log level change on one service instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoggingUpdateResult {
    #[serde(default, alias = "service", skip_serializing_if = "Option::is_none")]
    /// Name of the service that answered.
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Instance index of the answering service.
    pub instance: Option<Value>,
    #[serde(default)]
    /// Whether the level change was applied.
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// HTTP status reported by the instance.
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Additional detail, typically present on failure.
    pub message: Option<String>,
}

impl LoggingUpdateResult {
    /// Collect every result contained in a DevOps logging response.
    ///
    /// Ditto answers either with a flat array of results or with an object
    /// keyed by service name, then by instance, with the results as leaves.
    #[must_use]
    pub fn collect(value: &Value) -> Vec<Self> {
        let mut results = Vec::new();
        collect_into(value, &mut results);
        results
    }

    /// Read one result, accepting `status` as a number or string and
    /// `success` as a bool or string.
    fn from_fields(map: &Map<String, Value>) -> Self {
        Self {
            service_name: map
                .get("serviceName")
                .or_else(|| map.get("service"))
                .and_then(text_of),
            instance: map.get("instance").filter(|value| !value.is_null()).cloned(),
            success: map.get("success").is_some_and(is_truthy),
            status: map.get("status").and_then(status_of),
            message: map.get("message").and_then(text_of),
        }
    }
}

fn collect_into(value: &Value, results: &mut Vec<LoggingUpdateResult>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_into(item, results);
            }
        }
        Value::Object(map) if looks_like_result(map) => {
            results.push(LoggingUpdateResult::from_fields(map));
        }
        Value::Object(map) => {
            for nested in map.values() {
                collect_into(nested, results);
            }
        }
        _ => {}
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn status_of(value: &Value) -> Option<u16> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|code| u16::try_from(code).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn looks_like_result(map: &Map<String, Value>) -> bool {
    ["success", "serviceName", "service", "status"]
        .iter()
        .any(|key| map.contains_key(*key))
}
