pub mod error;
pub mod models;
pub mod services;
pub mod store;

pub use error::SessionError;
pub use models::{HospitalSelection, Session};
pub use services::SessionService;
pub use store::{FileStore, KeyValueStore, MemoryStore};
