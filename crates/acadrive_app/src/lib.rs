pub mod debounce;
pub mod search;
pub mod state;
pub mod upload;

pub use debounce::Debouncer;
pub use search::{SearchController, DEBOUNCE_WINDOW, MIN_QUERY_LEN};
pub use state::{AppState, UiEvent};
pub use upload::{SubmitOutcome, UploadController, UploadPhase, PROGRESS_LINGER};
