//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from nimbus-core.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{RequestChecksumCalculation, ResponseChecksumValidation};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::types::{
    BucketCannedAcl, BucketLocationConstraint, CreateBucketConfiguration, Delete,
    ObjectIdentifier,
};
use aws_smithy_types::body::SdkBody;
use futures::TryStreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;

use nimbus_core::traits::DeleteOutcome;
use nimbus_core::{
    BucketAcl, BucketOptions, Credential, Error, ListOptions, ListResult, ObjectInfo,
    ObjectStore, PresignMethod, RemotePath, Result, StoreEndpoint, UploadBody,
};

use crate::interceptor::IdentityHeader;

/// Region used when the configuration leaves it empty
const DEFAULT_REGION: &str = "us-east-1";

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

impl S3Client {
    /// Create a client bound to one user's credential
    ///
    /// No request is sent; failures surface on first use.
    pub async fn new(credential: &Credential, endpoint: &StoreEndpoint, region: &str) -> Result<Self> {
        let region = if region.is_empty() {
            DEFAULT_REGION
        } else {
            region
        };

        let credentials = aws_credential_types::Credentials::new(
            credential.access_key(),
            credential.secret_key(),
            None, // session token
            None, // expiry
            "nimbus-static-credentials",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(region.to_string()))
            .endpoint_url(endpoint.url())
            .load()
            .await;

        tracing::debug!(endpoint = %endpoint, region, "object store client ready");
        Ok(Self::from_sdk_config(&config, credential))
    }

    /// Build the S3 client from a loaded SDK configuration
    ///
    /// Addressing is always path-style and the identity header interceptor
    /// is registered here, once.
    pub fn from_sdk_config(config: &aws_config::SdkConfig, credential: &Credential) -> Self {
        let s3_config = aws_sdk_s3::config::Builder::from(config)
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired)
            .interceptor(IdentityHeader::new(credential))
            .build();

        Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        }
    }

    /// Get the underlying aws-sdk-s3 client
    pub fn inner(&self) -> &aws_sdk_s3::Client {
        &self.inner
    }
}

/// Map an SDK failure onto the engine's error taxonomy
fn map_sdk_error<E>(err: SdkError<E, HttpResponse>, subject: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    match (err.code(), status) {
        (Some("NoSuchKey" | "NoSuchBucket" | "NotFound"), _) | (_, Some(404)) => {
            Error::NotFound(subject.to_string())
        }
        (Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch"), _)
        | (_, Some(401 | 403)) => Error::Credential(format!(
            "{subject}: {}",
            err.message().unwrap_or("access denied")
        )),
        _ => Error::Network(format!("{subject}: {}", DisplayErrorContext(&err))),
    }
}

fn timestamp(value: Option<&DateTime>) -> Option<jiff::Timestamp> {
    value.and_then(|t| jiff::Timestamp::from_second(t.secs()).ok())
}

fn etag(value: Option<&str>) -> Option<String> {
    value.map(nimbus_core::traits::normalize_etag)
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_buckets(&self) -> Result<Vec<ObjectInfo>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| map_sdk_error(e, "list buckets"))?;

        let buckets = response
            .buckets()
            .iter()
            .map(|b| {
                let mut info = ObjectInfo::bucket(b.name().unwrap_or_default());
                info.last_modified = timestamp(b.creation_date());
                info
            })
            .collect();

        Ok(buckets)
    }

    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListResult> {
        let mut request = self.inner.list_objects_v2().bucket(&path.bucket);

        if !path.key.is_empty() {
            request = request.prefix(&path.key);
        }

        // Set delimiter (for non-recursive listing)
        if !options.recursive {
            request = request.delimiter(options.delimiter.as_deref().unwrap_or("/"));
        }

        if let Some(max) = options.max_keys {
            request = request.max_keys(max);
        }

        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        let mut items = Vec::new();

        // Add common prefixes (directories)
        for prefix in response.common_prefixes() {
            if let Some(p) = prefix.prefix() {
                items.push(ObjectInfo::dir(p));
            }
        }

        for object in response.contents() {
            let key = object.key().unwrap_or_default();
            let mut info = ObjectInfo::file(key, object.size().unwrap_or(0));
            info.last_modified = timestamp(object.last_modified());
            info.etag = etag(object.e_tag());
            info.storage_class = object.storage_class().map(|sc| sc.as_str().to_string());
            items.push(info);
        }

        Ok(ListResult {
            items,
            truncated: response.is_truncated().unwrap_or(false),
            continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        })
    }

    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo> {
        let response = self
            .inner
            .head_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        let mut info = ObjectInfo::file(&path.key, response.content_length().unwrap_or(0));
        info.last_modified = timestamp(response.last_modified());
        info.etag = etag(response.e_tag());
        info.content_type = response.content_type().map(str::to_string);
        info.storage_class = response.storage_class().map(|sc| sc.as_str().to_string());
        if let Some(metadata) = response.metadata() {
            info.metadata = metadata
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                .collect();
        }

        Ok(info)
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.inner.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => match map_sdk_error(e, bucket) {
                Error::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn create_bucket(&self, bucket: &str, options: &BucketOptions) -> Result<()> {
        let mut request = self.inner.create_bucket().bucket(bucket);

        if let Some(region) = options
            .region
            .as_deref()
            .filter(|r| !r.is_empty() && *r != DEFAULT_REGION)
        {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        // Private is the store default; only send an ACL when it differs
        if options.acl != BucketAcl::Private {
            request = request.acl(BucketCannedAcl::from(options.acl.as_str()));
        }

        request
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &format!("create bucket {bucket}")))?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        self.inner
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &format!("bucket {bucket}")))?;

        Ok(())
    }

    async fn get_object(
        &self,
        path: &RemotePath,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64> {
        let response = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        let mut body = response.body;
        let mut written = 0u64;
        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| Error::Network(format!("{path}: {e}")))?
        {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        Ok(written)
    }

    async fn put_object(&self, path: &RemotePath, body: UploadBody) -> Result<ObjectInfo> {
        let UploadBody {
            reader,
            size,
            content_type,
            metadata,
        } = body;

        let frames = ReaderStream::new(reader).map_ok(http_body::Frame::data);
        let stream = ByteStream::new(SdkBody::from_body_1_x(
            http_body_util::StreamBody::new(frames),
        ));

        let response = self
            .inner
            .put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .content_length(size as i64)
            .set_content_type(content_type.clone())
            .set_metadata(Some(metadata.clone()))
            .body(stream)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        let mut info = ObjectInfo::file(&path.key, size as i64);
        info.etag = etag(response.e_tag());
        info.content_type = content_type;
        info.metadata = metadata;
        info.last_modified = Some(jiff::Timestamp::now());

        Ok(info)
    }

    async fn delete_object(&self, path: &RemotePath) -> Result<()> {
        self.inner
            .delete_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &path.to_string()))?;

        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: Vec<String>) -> Result<DeleteOutcome> {
        if keys.is_empty() {
            return Ok(DeleteOutcome::default());
        }

        let objects = keys
            .iter()
            .map(|k| ObjectIdentifier::builder().key(k).build())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::General(e.to_string()))?;

        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(false)
            .build()
            .map_err(|e| Error::General(e.to_string()))?;

        let response = self
            .inner
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| map_sdk_error(e, &format!("delete objects in {bucket}")))?;

        let deleted = response
            .deleted()
            .iter()
            .filter_map(|d| d.key().map(|k| k.to_string()))
            .collect();

        let failed = response
            .errors()
            .iter()
            .filter_map(|e| {
                let reason = e.message().or(e.code()).unwrap_or("unknown error");
                e.key().map(|k| (k.to_string(), reason.to_string()))
            })
            .collect();

        Ok(DeleteOutcome { deleted, failed })
    }

    async fn presign(
        &self,
        path: &RemotePath,
        method: PresignMethod,
        expires_in: Duration,
    ) -> Result<String> {
        let config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| Error::Usage(format!("invalid expiry: {e}")))?;

        let request = match method {
            PresignMethod::Get => self
                .inner
                .get_object()
                .bucket(&path.bucket)
                .key(&path.key)
                .presigned(config)
                .await
                .map_err(|e| map_sdk_error(e, &path.to_string()))?,
            PresignMethod::Put => self
                .inner
                .put_object()
                .bucket(&path.bucket)
                .key(&path.key)
                .presigned(config)
                .await
                .map_err(|e| map_sdk_error(e, &path.to_string()))?,
        };

        Ok(request.uri().to_string())
    }
}
