// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the event store.
//!
//! Policy blocks are not errors: the validator returns them as ordinary
//! verdicts. Only storage I/O gets an error type.

use thiserror::Error;

/// Event store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Event log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Event store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, StoreError>;
