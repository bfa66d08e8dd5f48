//! Workspace-wide prelude and the shared error taxonomy.
//!
//! Mirrors the teacher's `common` crate: a thin re-export module so every
//! downstream crate pulls its third-party dependencies from one place,
//! plus (new here) the `CoreError` kind table from the spec's error design.

pub mod error;

pub mod prelude {
    pub use anyhow;
    pub use axum;
    pub use chrono;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json;
    pub use thiserror;
    pub use tokio;
    pub use tracing;
    pub use uuid;

    pub use crate::error::{CoreError, IntoCoreError};
}

pub use error::CoreError;
