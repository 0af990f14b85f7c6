pub mod lock;
pub mod models;
pub mod status;

pub use lock::{LockGuard, LockManager};
pub use models::{JobStatus, StatusRecord, TriggerSource};
pub use status::{StatusStore, StoreError};
