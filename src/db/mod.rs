#[cfg(test)]
pub mod memory;
pub mod models;
pub mod retry;
pub mod store;

pub use retry::with_retry;
pub use store::{PgStore, Store};
