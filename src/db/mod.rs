//! SQLite persistence for the call history.

pub mod init;
pub mod operations;

pub use init::{init_db, init_db_at, migrate};
pub use operations::*;

#[cfg(test)]
mod tests;
