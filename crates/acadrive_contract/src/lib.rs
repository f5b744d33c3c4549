pub mod error;
pub mod model;

pub use error::ApiError;
pub use model::{
    FileRecord, SearchFilters, Stats, UploadRequest, MAX_UPLOAD_BYTES, UPLOAD_LIMIT_MIB,
};
