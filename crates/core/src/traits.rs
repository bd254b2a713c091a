//! ObjectClient trait definition
//!
//! This trait is the contract the adapter consumes from the object-storage
//! client. It keeps the adapter independent of the SDK and lets tests use a
//! mock client.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Bucket/region/key tuple addressing one object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectLocation {
    pub bucket: String,
    pub region: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cos://{}/{} ({})", self.bucket, self.key, self.region)
    }
}

/// Upload of a single local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub location: ObjectLocation,

    /// Local source file
    pub file_path: PathBuf,

    pub content_type: Option<String>,
}

/// Server response for a finished upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Key confirmed by the server
    pub key: String,

    pub etag: Option<String>,

    /// Object location reported by the server, if any
    pub location: Option<String>,
}

/// Progress snapshot of one transfer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferProgress {
    /// Bytes transferred so far
    pub loaded: u64,

    /// Total bytes
    pub total: u64,

    /// Average speed in bytes per second
    pub speed: f64,
}

impl TransferProgress {
    /// Snapshot with the average speed since the transfer started
    pub fn from_elapsed(loaded: u64, total: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let speed = if secs > 0.0 { loaded as f64 / secs } else { 0.0 };
        Self {
            loaded,
            total,
            speed,
        }
    }

    /// Completion percentage, 0 to 100
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.loaded as f64 / self.total as f64 * 100.0).min(100.0)
    }
}

/// Receiver of transfer progress
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, progress: &TransferProgress);
}

/// Listener that discards progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    fn on_progress(&self, _progress: &TransferProgress) {}
}

/// Object-storage operations used by the adapter
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Upload a local file; large files may be split into parts by the client
    async fn upload_file(
        &self,
        request: UploadRequest,
        progress: Arc<dyn ProgressListener>,
    ) -> Result<UploadOutcome>;

    /// Delete an object
    async fn delete_object(&self, location: &ObjectLocation) -> Result<()>;

    /// Public URL of an object
    fn object_url(&self, location: &ObjectLocation) -> Result<String>;

    /// Time-limited signed GET URL of an object
    async fn presigned_url(&self, location: &ObjectLocation, expires: Duration) -> Result<String>;
}
