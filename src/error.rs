//! Application-level error type.
//!
//! The numerical core never fails (degenerate inputs degrade to zeroed results),
//! so `AppError` only travels through the I/O, configuration and front-end layers.
//! Each error carries the process exit code the binary should return:
//!
//! - `2`: invalid input, configuration or file problem
//! - `3`: inconsistent scenario (bad cell index, unknown preset, ...)
//! - `4`: runtime failure (terminal, writes)

use thiserror::Error;

#[derive(Clone, Error)]
#[error("{message}")]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}
