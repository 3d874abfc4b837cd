//! nimbus-s3: S3 SDK adapter for the nimbus CLI
//!
//! This crate provides the implementation of the ObjectStore trait
//! using the aws-sdk-s3 crate. It is the only crate that directly
//! depends on the AWS SDK.

pub mod client;
pub mod interceptor;

pub use client::S3Client;
pub use interceptor::IdentityHeader;
