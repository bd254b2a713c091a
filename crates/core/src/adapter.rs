//! Storage adapter
//!
//! Maps the host's file records onto the object client's bucket/key
//! addressing: upload a local file under a generated name, remove it, and
//! compute its URL.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use crate::key::StorageKey;
use crate::naming::FilenameGenerator;
use crate::record::{FileRecord, SchemaField, SchemaFields};
use crate::traits::{ObjectClient, ObjectLocation, ProgressListener, TransferProgress, UploadRequest};

/// Adapter between file records and an object-storage client
///
/// Holds only immutable state, so one instance can serve concurrent calls
/// for different records.
#[derive(Debug)]
pub struct StorageAdapter<C> {
    config: AdapterConfig,
    client: C,
    generate_filename: FilenameGenerator,
}

impl<C: ObjectClient> StorageAdapter<C> {
    /// Adapter API level implemented by this crate
    pub const COMPATIBILITY_LEVEL: u32 = 1;

    /// Extra record fields this adapter can fill in
    pub const SCHEMA_FIELDS: [SchemaField; 3] = SchemaField::ALL;

    /// Create an adapter using the random filename generator
    pub fn new(config: AdapterConfig, client: C) -> Self {
        Self {
            config,
            client,
            generate_filename: FilenameGenerator::default(),
        }
    }

    pub fn with_filename_generator(mut self, generator: FilenameGenerator) -> Self {
        self.generate_filename = generator;
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Which extra fields the host should persist
    pub fn schema(&self) -> &SchemaFields {
        self.config.schema()
    }

    /// Upload the record's local file and fill in its storage fields
    ///
    /// The record is only modified when the upload succeeds; on any error it
    /// is left as it was.
    pub async fn upload_file(&self, file: &mut FileRecord) -> Result<()> {
        let filename = self
            .generate_filename
            .generate(file, 0)
            .await
            .map_err(Error::FilenameGeneration)?;

        let path = self.config.storage_path().to_string();
        let key = StorageKey::new(&path, &filename);
        let bucket = self.config.bucket().to_string();

        let request = UploadRequest {
            location: ObjectLocation::new(&bucket, self.config.region(), key.as_str()),
            file_path: file.local_path.clone(),
            content_type: Some(file.content_type()),
        };
        let progress: Arc<dyn ProgressListener> = Arc::new(LogProgress {
            key: key.to_string(),
        });

        tracing::debug!(
            key = %key,
            bucket = %bucket,
            source = %file.local_path.display(),
            "Uploading file"
        );

        match self.client.upload_file(request, progress).await {
            Ok(outcome) => {
                let confirmed = if outcome.key.is_empty() {
                    key.into_string()
                } else {
                    outcome.key
                };
                tracing::info!(key = %confirmed, bucket = %bucket, "Upload finished");

                file.path = (!path.is_empty()).then_some(path);
                file.filename = Some(filename);
                file.bucket = Some(bucket);
                file.key = Some(confirmed);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Upload failed");
                Err(Error::Upload {
                    key: key.into_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Delete the record's object
    pub async fn remove_file(&self, file: &FileRecord) -> Result<()> {
        let location = self.location_of(file)?;

        match self.client.delete_object(&location).await {
            Ok(()) => {
                tracing::info!(key = %location.key, bucket = %location.bucket, "Removed file");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(key = %location.key, error = %e, "Remove failed");
                Err(Error::Delete {
                    key: location.key,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Public URL of the record's object
    pub fn get_file_url(&self, file: &FileRecord) -> Result<String> {
        let location = self.location_of(file)?;

        match self.client.object_url(&location) {
            Ok(url) => {
                tracing::debug!(key = %location.key, url = %url, "Resolved file URL");
                Ok(url)
            }
            Err(e) => {
                tracing::warn!(key = %location.key, error = %e, "URL lookup failed");
                Err(Error::Url {
                    key: location.key,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Signed URL granting read access to the record's object for `expires`
    pub async fn get_signed_file_url(&self, file: &FileRecord, expires: Duration) -> Result<String> {
        let location = self.location_of(file)?;

        self.client
            .presigned_url(&location, expires)
            .await
            .map_err(|e| {
                tracing::warn!(key = %location.key, error = %e, "Signed URL lookup failed");
                Error::Url {
                    key: location.key.clone(),
                    source: Box::new(e),
                }
            })
    }

    /// Store the public URL in the record's `url` field
    pub fn resolve_url(&self, file: &mut FileRecord) -> Result<()> {
        let url = self.get_file_url(file)?;
        file.url = Some(url);
        Ok(())
    }

    /// Address of an uploaded record: its own key and bucket, the configured
    /// region
    fn location_of(&self, file: &FileRecord) -> Result<ObjectLocation> {
        let key = file
            .key
            .as_deref()
            .ok_or_else(|| Error::MissingKey(file.label()))?;
        let bucket = file.bucket.as_deref().unwrap_or(self.config.bucket());

        Ok(ObjectLocation::new(bucket, self.config.region(), key))
    }
}

/// Logs upload progress for one key
struct LogProgress {
    key: String,
}

impl ProgressListener for LogProgress {
    fn on_progress(&self, progress: &TransferProgress) {
        tracing::debug!(
            key = %self.key,
            percent = %format!("{:.2}", progress.percent()),
            speed = %format!("{}/s", humansize::format_size(progress.speed as u64, humansize::BINARY)),
            "Upload progress"
        );
    }
}
