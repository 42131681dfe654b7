//! Structured errors raised by the host itself.
//!
//! Worker, cache and catalog failures arrive as `cinecache_core::Error`;
//! these cover what the host rejects before reaching them.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Invalid tool parameters (e.g. an unparseable URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// `worker_activate` with no installed worker waiting.
    #[error("NOTHING_WAITING: no installed worker is waiting to activate")]
    NothingWaiting,
}

impl From<HostError> for McpError {
    fn from(err: HostError) -> Self {
        let code = match &err {
            HostError::InvalidInput(_) => -32602,
            HostError::NothingWaiting => -32021,
        };

        McpError { code: ErrorCode(code), message: err.to_string().into(), data: None }
    }
}
