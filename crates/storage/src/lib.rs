#![forbid(unsafe_code)]

pub mod keys;
pub mod kv;
pub mod records;
pub mod repository;
pub mod sqlite;

pub use kv::{InMemoryStore, KeyValueStore};
pub use repository::{Storage, StorageError};
