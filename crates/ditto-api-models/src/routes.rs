//! Path segments of the Ditto endpoints the CLI talks to.
//!
//! Routes are kept as segment lists rather than strings so identifiers can be
//! appended with proper percent-encoding and a base URL path prefix (for a
//! Ditto instance behind a reverse proxy) survives.

/// `/api/2/things`
pub const THINGS: &[&str] = &["api", "2", "things"];
/// `/api/2/policies`
pub const POLICIES: &[&str] = &["api", "2", "policies"];
/// Sub-resource of a policy listing its entries.
pub const POLICY_ENTRIES: &str = "entries";
/// `/api/2/connections`
pub const CONNECTIONS: &[&str] = &["api", "2", "connections"];
/// `/api/2/search/things`
pub const SEARCH_THINGS: &[&str] = &["api", "2", "search", "things"];
/// `/api/2/search/things/count`
pub const SEARCH_COUNT: &[&str] = &["api", "2", "search", "things", "count"];
/// `/api/2/checkPermissions`
pub const CHECK_PERMISSIONS: &[&str] = &["api", "2", "checkPermissions"];
/// `/api/2/whoami`
pub const WHOAMI: &[&str] = &["api", "2", "whoami"];
/// `/devops/logging`
pub const DEVOPS_LOGGING: &[&str] = &["devops", "logging"];
/// `/devops/config`
pub const DEVOPS_CONFIG: &[&str] = &["devops", "config"];
