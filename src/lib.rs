// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod analyze;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod translate;

pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::error::CuratorError;
pub use crate::model::{NormalizedArticle, Source};
