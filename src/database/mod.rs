//! Database module exports.

mod memory;
pub mod models;
mod mongo;
mod repository;
mod store;
mod users;

pub use memory::MemoryStore;
pub use models::*;
pub use mongo::Database;
pub use repository::MongoStore;
pub use store::{Store, StoreResult};
pub use users::UserRepo;
