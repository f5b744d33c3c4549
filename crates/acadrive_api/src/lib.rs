pub mod client;
pub mod memory;

pub use client::{
    base_url_for_host, search_params, AcadriveApi, HttpAcadriveApi, ProgressFn, LOCAL_BASE_URL,
    PRODUCTION_BASE_URL,
};
pub use memory::InMemoryAcadriveApi;
