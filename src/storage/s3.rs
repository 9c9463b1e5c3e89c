//! S3 object store.

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::DateTime as S3DateTime;
use chrono::{DateTime, Utc};
use tracing::info;

use super::{ObjectLocation, ObjectMetadata, ObjectStore, StoredObject};
use crate::error::StorageError;

/// Object store backed by Amazon S3 or an S3-compatible endpoint.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Builds a client from the ambient AWS configuration.
    ///
    /// SDK retries are disabled; `Fetcher` owns the retry policy. An endpoint
    /// override switches to path-style addressing.
    pub async fn from_env(endpoint_url: Option<&str>) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::disabled())
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(url) = endpoint_url {
            info!(endpoint = url, "using custom S3 endpoint");
            builder = builder.endpoint_url(url).force_path_style(true);
        }

        Self::new(aws_sdk_s3::Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get_object(&self, location: &ObjectLocation) -> Result<StoredObject, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|err| sdk_error(err, location))?;

        let metadata = ObjectMetadata {
            last_modified: output.last_modified().and_then(to_chrono),
            size: output.content_length().unwrap_or_default().max(0) as u64,
            etag: output.e_tag().map(str::to_string),
        };
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Transient(format!("{location}: reading body: {e}")))?
            .into_bytes();

        Ok(StoredObject { body, metadata })
    }

    async fn head_object(
        &self,
        location: &ObjectLocation,
    ) -> Result<ObjectMetadata, StorageError> {
        let output = self
            .client
            .head_object()
            .bucket(&location.bucket)
            .key(&location.key)
            .send()
            .await
            .map_err(|err| sdk_error(err, location))?;

        Ok(ObjectMetadata {
            last_modified: output.last_modified().and_then(to_chrono),
            size: output.content_length().unwrap_or_default().max(0) as u64,
            etag: output.e_tag().map(str::to_string),
        })
    }
}

fn to_chrono(value: &S3DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

// == Error Classification ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    /// The service answered with an error
    Service,
    /// Timeout, connection or response-parsing failure
    Transport,
    /// Request never left the client
    Construction,
}

fn sdk_error<E>(err: SdkError<E>, location: &ObjectLocation) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let kind = match &err {
        SdkError::ServiceError(_) => FailureKind::Service,
        SdkError::ConstructionFailure(_) => FailureKind::Construction,
        _ => FailureKind::Transport,
    };
    let status = err.raw_response().map(|raw| raw.status().as_u16());
    let code = err.code().map(str::to_string);
    let detail = format!("{location}: {}", DisplayErrorContext(&err));

    classify(kind, status, code.as_deref(), detail)
}

/// Maps an SDK failure to the storage taxonomy.
///
/// HeadObject errors carry no body, so the status code is the only signal
/// for a missing key there.
fn classify(
    kind: FailureKind,
    status: Option<u16>,
    code: Option<&str>,
    detail: String,
) -> StorageError {
    match (code, status) {
        (Some("NoSuchKey" | "NoSuchBucket" | "NotFound"), _) | (_, Some(404)) => {
            return StorageError::NotFound(detail)
        }
        (Some("AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch"), _)
        | (_, Some(401 | 403)) => return StorageError::AccessDenied(detail),
        _ => {}
    }

    match kind {
        FailureKind::Transport => StorageError::Transient(detail),
        FailureKind::Construction => StorageError::AccessDenied(detail),
        FailureKind::Service => match status {
            Some(400..=499) if status != Some(429) => StorageError::AccessDenied(detail),
            _ => StorageError::Transient(detail),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail() -> String {
        "s3://bucket/data.json".to_string()
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let err = classify(FailureKind::Service, Some(404), Some("NoSuchKey"), detail());
        assert!(matches!(err, StorageError::NotFound(_)));

        // HeadObject: status only
        let err = classify(FailureKind::Service, Some(404), None, detail());
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_forbidden_is_access_denied() {
        let err = classify(FailureKind::Service, Some(403), None, detail());
        assert!(matches!(err, StorageError::AccessDenied(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_throttling_and_server_errors_are_transient() {
        for status in [429, 500, 503] {
            let err = classify(FailureKind::Service, Some(status), None, detail());
            assert!(err.is_retryable(), "status {status} should be retryable");
        }
    }

    #[test]
    fn test_transport_failures_are_transient() {
        let err = classify(FailureKind::Transport, None, None, detail());
        assert!(matches!(err, StorageError::Transient(_)));
    }

    #[test]
    fn test_construction_failures_are_fatal() {
        let err = classify(FailureKind::Construction, None, None, detail());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_timestamp_conversion() {
        let value = S3DateTime::from_secs(1_700_000_000);
        let converted = to_chrono(&value).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
    }
}
