pub mod model;
pub mod store;

pub use model::LockState;
pub use store::{LockStore, LOCK_FILE};
