//! Round trips against a real COS bucket
//!
//! These tests need credentials and a scratch bucket.
//!
//! Run with:
//! ```bash
//! export COS_SECRET_ID=... COS_SECRET_KEY=...
//! export COS_BUCKET=scratch-1250000000 COS_REGION=ap-guangzhou
//! cargo test -p cos-storage-s3 --features integration
//! ```

#![cfg(feature = "integration")]

use std::io::Write;
use std::time::Duration;

use cos_storage_core::{CosOptions, FileRecord, FilenameGenerator, SchemaFields};
use cos_storage_s3::{TransferConfig, connect};
use tempfile::NamedTempFile;

fn options(path: &str) -> CosOptions {
    CosOptions::from_env().merge(CosOptions {
        path: Some(path.to_string()),
        ..Default::default()
    })
}

fn temp_file(size: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    let chunk: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
    let mut written = 0;
    while written < size {
        let n = chunk.len().min(size - written);
        file.write_all(&chunk[..n]).expect("write temp file");
        written += n;
    }
    file.flush().expect("flush temp file");
    file
}

#[tokio::test]
async fn test_upload_url_remove_small_file() {
    let adapter = connect(
        options("/cos-storage-tests"),
        SchemaFields::default(),
        TransferConfig::default(),
    )
    .await
    .expect("connect");

    let source = temp_file(4 * 1024);
    let mut record = FileRecord::new(source.path()).with_original_name("hello.txt");

    adapter.upload_file(&mut record).await.expect("upload");
    let key = record.key.clone().expect("key assigned");
    assert!(key.starts_with("cos-storage-tests/"));
    assert!(key.ends_with(".txt"));

    let url = adapter.get_file_url(&record).expect("public url");
    assert!(url.ends_with(&key));

    let signed = adapter
        .get_signed_file_url(&record, Duration::from_secs(60))
        .await
        .expect("signed url");
    assert!(signed.contains("X-Amz-Signature="));

    adapter.remove_file(&record).await.expect("remove");
}

#[tokio::test]
async fn test_multipart_upload() {
    let transfer = TransferConfig::new()
        .chunk_size(1024 * 1024)
        .slice_threshold(2 * 1024 * 1024);
    let adapter = connect(options("/cos-storage-tests"), SchemaFields::default(), transfer)
        .await
        .expect("connect")
        .with_filename_generator(FilenameGenerator::original());

    let source = temp_file(5 * 1024 * 1024 + 17);
    let mut record = FileRecord::new(source.path())
        .with_original_name("large.bin")
        .with_mimetype("application/octet-stream");

    adapter.upload_file(&mut record).await.expect("multipart upload");
    assert_eq!(record.key.as_deref(), Some("cos-storage-tests/large.bin"));

    adapter.remove_file(&record).await.expect("remove");
}
