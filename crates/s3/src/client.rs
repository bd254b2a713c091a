//! COS client implementation
//!
//! Wraps aws-sdk-s3, pointed at the COS S3-compatible endpoint, and
//! implements the ObjectClient trait from cos-storage-core.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_smithy_types::byte_stream::{ByteStream, Length};
use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::Semaphore;
use url::Url;

use cos_storage_core::{
    AdapterConfig, CosOptions, Error, ObjectClient, ObjectLocation, ProgressListener, Result,
    SchemaFields, StorageAdapter, TransferProgress, UploadOutcome, UploadRequest,
};

use crate::transfer::{TransferConfig, calculate_parts, part_byte_range};

/// COS API endpoint for a region
pub fn cos_endpoint(region: &str) -> String {
    format!("https://cos.{region}.myqcloud.com")
}

/// Unsigned public URL of an object
///
/// Each key segment is percent-encoded; `/` separators are kept.
pub fn public_object_url(bucket: &str, region: &str, key: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("https://{bucket}.cos.{region}.myqcloud.com/"))?;
    url.path_segments_mut()
        .map_err(|_| Error::General(format!("Cannot build object URL for bucket '{bucket}'")))?
        .pop_if_empty()
        .extend(key.split('/'));
    Ok(url)
}

/// COS client wrapper
pub struct CosClient {
    inner: aws_sdk_s3::Client,
    transfer: TransferConfig,
    file_permits: Arc<Semaphore>,
}

impl std::fmt::Debug for CosClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosClient")
            .field("transfer", &self.transfer)
            .field("available_file_permits", &self.file_permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl CosClient {
    /// Create a client bound to the resolved credentials and region
    pub async fn new(config: &AdapterConfig, transfer: TransferConfig) -> Result<Self> {
        let transfer = transfer.normalized();
        let credentials = aws_credential_types::Credentials::new(
            config.secret_id(),
            config.secret_key(),
            None, // session token
            None, // expiry
            "cos-static-credentials",
        );

        let endpoint = cos_endpoint(config.region());
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(config.region().to_string()))
            .endpoint_url(&endpoint)
            .load()
            .await;

        // COS serves buckets as `{bucket}.cos.{region}.myqcloud.com` and does
        // not accept the SDK's default CRC checksums.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(false)
            .request_checksum_calculation(
                aws_sdk_s3::config::RequestChecksumCalculation::WhenRequired,
            )
            .response_checksum_validation(
                aws_sdk_s3::config::ResponseChecksumValidation::WhenRequired,
            )
            .build();

        tracing::debug!(
            endpoint = %endpoint,
            bucket = %config.bucket(),
            file_parallel_limit = transfer.file_parallel_limit,
            chunk_parallel_limit = transfer.chunk_parallel_limit,
            chunk_size = transfer.chunk_size,
            "Created COS client"
        );

        Ok(Self::from_sdk_client(
            aws_sdk_s3::Client::from_conf(s3_config),
            transfer,
        ))
    }

    /// Wrap an already configured aws-sdk-s3 client
    pub fn from_sdk_client(inner: aws_sdk_s3::Client, transfer: TransferConfig) -> Self {
        let transfer = transfer.normalized();
        Self {
            inner,
            file_permits: Arc::new(Semaphore::new(transfer.file_parallel_limit)),
            transfer,
        }
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }

    pub fn transfer(&self) -> &TransferConfig {
        &self.transfer
    }

    async fn upload_single(
        &self,
        request: &UploadRequest,
        size: u64,
        progress: &dyn ProgressListener,
    ) -> Result<UploadOutcome> {
        let location = &request.location;
        let started = Instant::now();

        let body = ByteStream::from_path(&request.file_path)
            .await
            .map_err(|e| read_error(&request.file_path, e))?;

        let mut put = self
            .inner
            .put_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .body(body);

        if let Some(ct) = &request.content_type {
            put = put.content_type(ct);
        }

        let response = put
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, &location.key))?;

        progress.on_progress(&TransferProgress::from_elapsed(size, size, started.elapsed()));

        Ok(UploadOutcome {
            key: location.key.clone(),
            etag: response.e_tag().map(|etag| etag.trim_matches('"').to_string()),
            location: None,
        })
    }

    async fn upload_multipart(
        &self,
        request: &UploadRequest,
        size: u64,
        progress: &dyn ProgressListener,
    ) -> Result<UploadOutcome> {
        let location = &request.location;

        let mut create = self
            .inner
            .create_multipart_upload()
            .bucket(&location.bucket)
            .key(&location.key);

        if let Some(ct) = &request.content_type {
            create = create.content_type(ct);
        }

        let created = create
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, &location.key))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| Error::General(format!("No upload id returned for {}", location.key)))?
            .to_string();

        let parts = match self.upload_parts(request, &upload_id, size, progress).await {
            Ok(parts) => parts,
            Err(e) => {
                self.abort_multipart(location, &upload_id).await;
                return Err(e);
            }
        };

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        let response = match self
            .inner
            .complete_multipart_upload()
            .bucket(&location.bucket)
            .key(&location.key)
            .upload_id(&upload_id)
            .multipart_upload(completed)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.abort_multipart(location, &upload_id).await;
                return Err(classify_sdk_error(e, &location.key));
            }
        };

        Ok(UploadOutcome {
            key: response.key().unwrap_or(location.key.as_str()).to_string(),
            etag: response.e_tag().map(|etag| etag.trim_matches('"').to_string()),
            location: response.location().map(|l| l.to_string()),
        })
    }

    async fn upload_parts(
        &self,
        request: &UploadRequest,
        upload_id: &str,
        size: u64,
        progress: &dyn ProgressListener,
    ) -> Result<Vec<CompletedPart>> {
        let location = &request.location;
        let part_size = self.transfer.calculate_part_size(size);
        let part_count = calculate_parts(size, part_size);
        let loaded = AtomicU64::new(0);
        let loaded = &loaded;
        let started = Instant::now();

        tracing::debug!(
            key = %location.key,
            upload_id,
            part_size,
            part_count,
            "Starting multipart upload"
        );

        let mut parts: Vec<CompletedPart> = stream::iter(1..=part_count as i32)
            .map(move |part_number| async move {
                let (start, end) = part_byte_range(part_number, part_size, size);
                let body = ByteStream::read_from()
                    .path(&request.file_path)
                    .offset(start)
                    .length(Length::Exact(end - start))
                    .build()
                    .await
                    .map_err(|e| read_error(&request.file_path, e))?;

                let response = self
                    .inner
                    .upload_part()
                    .bucket(&location.bucket)
                    .key(&location.key)
                    .upload_id(upload_id)
                    .part_number(part_number)
                    .body(body)
                    .send()
                    .await
                    .map_err(|e| classify_sdk_error(e, &location.key))?;

                let done = loaded.fetch_add(end - start, Ordering::Relaxed) + (end - start);
                progress.on_progress(&TransferProgress::from_elapsed(done, size, started.elapsed()));

                Ok::<_, Error>(
                    CompletedPart::builder()
                        .part_number(part_number)
                        .set_e_tag(response.e_tag().map(|etag| etag.to_string()))
                        .build(),
                )
            })
            .buffer_unordered(self.transfer.chunk_parallel_limit)
            .try_collect()
            .await?;

        parts.sort_by_key(|part| part.part_number());
        Ok(parts)
    }

    async fn abort_multipart(&self, location: &ObjectLocation, upload_id: &str) {
        if let Err(e) = self
            .inner
            .abort_multipart_upload()
            .bucket(&location.bucket)
            .key(&location.key)
            .upload_id(upload_id)
            .send()
            .await
        {
            tracing::warn!(
                key = %location.key,
                upload_id,
                error = %DisplayErrorContext(&e),
                "Failed to abort multipart upload"
            );
        }
    }
}

#[async_trait]
impl ObjectClient for CosClient {
    async fn upload_file(
        &self,
        request: UploadRequest,
        progress: Arc<dyn ProgressListener>,
    ) -> Result<UploadOutcome> {
        let _permit = self
            .file_permits
            .acquire()
            .await
            .map_err(|e| Error::General(e.to_string()))?;

        let size = tokio::fs::metadata(&request.file_path).await?.len();

        if self.transfer.use_multipart(size) {
            self.upload_multipart(&request, size, progress.as_ref()).await
        } else {
            self.upload_single(&request, size, progress.as_ref()).await
        }
    }

    async fn delete_object(&self, location: &ObjectLocation) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|e| classify_sdk_error(e, &location.key))?;

        Ok(())
    }

    fn object_url(&self, location: &ObjectLocation) -> Result<String> {
        public_object_url(&location.bucket, &location.region, &location.key).map(String::from)
    }

    async fn presigned_url(&self, location: &ObjectLocation, expires: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires)
            .map_err(|e| Error::General(format!("Invalid expiry: {e}")))?;

        let request = self
            .inner
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .presigned(presigning)
            .await
            .map_err(|e| classify_sdk_error(e, &location.key))?;

        Ok(request.uri().to_string())
    }
}

/// Resolve options, then build the client and the adapter
///
/// An invalid base path fails before any client is created.
pub async fn connect(
    options: CosOptions,
    schema: SchemaFields,
    transfer: TransferConfig,
) -> Result<StorageAdapter<CosClient>> {
    let config = options.resolve(schema)?;
    let client = CosClient::new(&config, transfer).await?;
    Ok(StorageAdapter::new(config, client))
}

/// Map an SDK failure onto the core error kinds
fn classify_sdk_error<E>(err: E, key: &str) -> Error
where
    E: std::error::Error,
{
    let message = DisplayErrorContext(&err).to_string();
    if message.contains("NotFound") || message.contains("NoSuchKey") || message.contains("NoSuchBucket") {
        Error::NotFound(key.to_string())
    } else if message.contains("AccessDenied")
        || message.contains("InvalidAccessKeyId")
        || message.contains("SignatureDoesNotMatch")
    {
        Error::Auth(message)
    } else {
        Error::Network(message)
    }
}

fn read_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::General(format!("Failed to read {}: {err}", path.display()))
}
