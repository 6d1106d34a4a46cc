//! S3-compatible [`ObjectStore`](cossync_core::ObjectStore) adapter.
//!
//! Talks to Tencent COS (or any S3-compatible endpoint) through
//! `aws-sdk-s3`. The client is built once from a validated
//! [`SyncConfig`](cossync_core::SyncConfig) and shared by every worker.

pub mod client;
pub mod store;

pub use client::build_client;
pub use store::S3ObjectStore;
