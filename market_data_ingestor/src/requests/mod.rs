mod batch_request;
pub use batch_request::{BatchOptions, BatchResult, fetch_bars_batch, fetch_with_retry};
