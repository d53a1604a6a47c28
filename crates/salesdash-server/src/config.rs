/// Re-export of the `salesdash-core` configuration.
///
/// Environment parsing lives in the core crate so the source crate and the
/// integration tests can build a `Config` without pulling in the server.
pub use salesdash_core::config::{AuthMode, Config};
