/// Prefix shared by every relay route
pub const API_PREFIX: &str = "/api";

/// Concurrent requests accepted before the server applies backpressure
pub const DEFAULT_HTTP_CONCURRENCY_LIMIT: usize = 1_024;

/// Base64 inflates payloads by a third; leave room for the JSON envelope
pub const BASE64_BODY_OVERHEAD_NUM: usize = 4;
pub const BASE64_BODY_OVERHEAD_DEN: usize = 3;
