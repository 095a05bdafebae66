//! API constants

/// API base path prefix
pub const API_BASE: &str = "/api";

/// Slack on top of the largest accepted upload for multipart framing and the
/// `formats` fields.
pub const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Header carrying the caller's cloud (Google Drive) bearer token.
pub const CLOUD_TOKEN_HEADER: &str = "x-cloud-access-token";
