/// Interaction Service Library
///
/// Social-interaction consistency engine for the Nova feed: likes, saves,
/// comments, post deletion cascades and feed composition. Derived state
/// (like/save sets, comment counters, the saved-posts index) is kept correct
/// through atomic store primitives instead of multi-record transactions.
///
/// # Modules
///
/// - `domain`: Users, posts, comments and their read projections
/// - `repository`: The `RecordStore` seam with in-memory and PostgreSQL backends
/// - `services`: Interaction engine, comment lifecycle, cascade, feed, visibility
/// - `handlers`: actix-web endpoints translating typed failures to HTTP
/// - `error`: Error taxonomy
/// - `config`: Configuration management
/// - `metrics`: Prometheus counters
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod repository;
pub mod services;

pub use config::Config;
pub use error::{ErrorKind, ServiceError, ServiceResult};
