//! Business logic services.

pub mod session;
pub mod storage;

pub use storage::{ObjectStore, Storage};
