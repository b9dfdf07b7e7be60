//! Persistence layer — registered accounts and the signed-in profile.

pub mod libsql_backend;
pub mod memory;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use memory::InMemoryStore;
pub use traits::{SessionStore, UserStore};
