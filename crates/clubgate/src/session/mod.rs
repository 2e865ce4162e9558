//! Session state: who the current caller is and what credential proves it.

mod backend;
mod storage;
mod store;

pub use backend::{AuthBackend, HttpAuthBackend};
pub use storage::{FileStorage, MemoryStorage, SessionSnapshot, SessionStorage};
pub use store::SessionStore;
