mod api;
mod pagination;
mod storage;
mod telemetry;
mod upload;

pub use api::ApiSettings;
pub use pagination::PaginationSettings;
pub use storage::StorageSettings;
pub use telemetry::TelemetrySettings;
pub use upload::UploadSettings;
