//! # stance-store
//!
//! SQLite-backed relational store: viewpoints, evidence, and the
//! append-only feedback log. Source of truth for the similarity indices.

pub mod engine;
pub mod migrations;
pub mod queries;

pub use engine::EvidenceStore;

use stance_core::errors::{StanceError, StoreError};

/// Wrap a SQLite error message into the store error type.
pub(crate) fn to_store_err(message: impl Into<String>) -> StanceError {
    StoreError::Sqlite {
        message: message.into(),
    }
    .into()
}
