//! cos-storage-s3: COS client for the storage adapter
//!
//! This crate implements the ObjectClient trait using the aws-sdk-s3 crate
//! against the COS S3-compatible API. It is the only crate that directly
//! depends on the AWS SDK.

pub mod client;
pub mod transfer;

pub use client::{CosClient, connect, cos_endpoint, public_object_url};
pub use transfer::TransferConfig;
