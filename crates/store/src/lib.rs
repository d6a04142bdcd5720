//! Client-side state for pocketline.
//!
//! Two top-level records are persisted: the in-app settings and the
//! character collection. [`Store`] is their single owner; everything else
//! reads `Arc` snapshots and writes by whole-structure replacement.

pub mod backend;
pub mod backup;
pub mod catalog;
pub mod file_backend;
pub mod in_memory;
pub mod store;

pub use backend::Persistence;
pub use backup::{BACKUP_VERSION, BackupDocument, parse_backup};
pub use file_backend::FileBackend;
pub use in_memory::InMemoryBackend;
pub use store::Store;
