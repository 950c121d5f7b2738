pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod store;
pub mod telemetry;
pub mod validation;

// Re-export main items
pub use app::{router, AppState};
pub use config::Config;
pub use error::{ApiError, ErrorResponse};
pub use metrics::Metrics;
pub use models::{DeletedResponse, GroceryItem, ItemChanges, NewItem, UpdatedResponse};
pub use store::{ItemStore, StoreError};
pub use validation::FieldErrors;
