//! # Component Error Handling
//!
//! This module defines the [`ComponentError`] enum returned by every driver
//! operation. Bus-level failures arrive as [`HalError`] and are wrapped in
//! [`ComponentError::Transport`] so callers always see them.

use crate::hal::HalError;
use thiserror::Error;

/// Represents the different error types that can occur in the driver layer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComponentError {
    /// A caller-supplied value is outside the range the device accepts
    /// (channel selector, duty cycle, speed, payload size, address).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying GPIO, SPI or I2C primitive reported a failure.
    #[error("Transport failure: {0}")]
    Transport(#[from] HalError),

    /// An aggregate operation produced no usable values.
    #[error("Empty result: {0}")]
    EmptyResult(String),

    /// A device did not respond within its documented window.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// A long-running loop was stopped through its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,

    /// A background task ended abnormally.
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// Board or device configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ComponentError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ComponentError::InvalidArgument(message.into())
    }
}

/// Result alias used throughout the driver layer
pub type Result<T> = std::result::Result<T, ComponentError>;
