//! cos-storage-core: Core library for the COS storage adapter
//!
//! This crate provides everything the adapter needs that does not depend on
//! a particular SDK:
//! - Configuration resolution and the config file
//! - File records, schema fields and storage keys
//! - Filename generation
//! - The ObjectClient trait and the StorageAdapter built on it

pub mod adapter;
pub mod config;
pub mod error;
pub mod key;
pub mod naming;
pub mod record;
pub mod traits;

pub use adapter::StorageAdapter;
pub use config::{AdapterConfig, Config, ConfigManager, CosOptions};
pub use error::{Error, Result};
pub use key::StorageKey;
pub use naming::FilenameGenerator;
pub use record::{FileRecord, SchemaField, SchemaFields};
pub use traits::{
    NoProgress, ObjectClient, ObjectLocation, ProgressListener, TransferProgress, UploadOutcome,
    UploadRequest,
};
