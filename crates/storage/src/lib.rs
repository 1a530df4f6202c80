#![forbid(unsafe_code)]

pub mod ini;
pub mod repository;

pub use ini::{DEFAULT_CONFIG_FILE, IniFileRepository};
pub use repository::{ProgressMap, Storage, StorageError};
