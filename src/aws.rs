use crate::EnvBucketMediator;
use async_trait::async_trait;
use rusoto_core::{DispatchSignedRequest, Region};
use rusoto_credential::{DefaultCredentialsProvider, ProvideAwsCredentials};
use rusoto_s3::{GetObjectRequest, ListObjectsV2Request, S3Client, S3};
use snafu::{OptionExt, ResultExt, Snafu};
use std::str::FromStr;
use tokio::io::AsyncReadExt;

type Result<T> = std::result::Result<T, Error>;

/// The error type for this module.
#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("Failed to create the default AWS credentials provider: {}", source))]
    DefaultProvider {
        source: rusoto_credential::CredentialsError,
    },

    #[snafu(display(
        "Failed to decode object s3://{}/{} as JSON: {}",
        bucket,
        key,
        source
    ))]
    DecodeJson {
        bucket: String,
        key: String,
        source: serde_json::Error,
    },

    #[snafu(display("Failed to get object s3://{}/{}: {}", bucket, key, source))]
    GetObject {
        bucket: String,
        key: String,
        source: rusoto_core::RusotoError<rusoto_s3::GetObjectError>,
    },

    #[snafu(display("Failed to create HTTP client: {}", source))]
    HttpClient {
        source: rusoto_core::request::TlsError,
    },

    #[snafu(display("Failed to list objects in bucket {}: {}", bucket, source))]
    ListObjects {
        bucket: String,
        source: rusoto_core::RusotoError<rusoto_s3::ListObjectsV2Error>,
    },

    #[snafu(display("Failed to parse region `{}` : {}", name, source))]
    ParseRegion {
        name: String,
        source: rusoto_signature::region::ParseRegionError,
    },

    #[snafu(display("Failed to read body of object s3://{}/{}: {}", bucket, key, source))]
    ReadBody {
        bucket: String,
        key: String,
        source: std::io::Error,
    },

    #[snafu(display("Missing field in `{}` response: {}", api, field))]
    S3MissingField {
        api: &'static str,
        field: &'static str,
    },
}

impl From<Error> for crate::Error {
    fn from(e: Error) -> Self {
        crate::Error::new(e)
    }
}

pub(crate) trait NewWith {
    fn new_with<P, D>(request_dispatcher: D, credentials_provider: P, region: Region) -> Self
    where
        P: ProvideAwsCredentials + Send + Sync + 'static,
        D: DispatchSignedRequest + Send + Sync + 'static;
}

impl NewWith for S3Client {
    fn new_with<P, D>(request_dispatcher: D, credentials_provider: P, region: Region) -> Self
    where
        P: ProvideAwsCredentials + Send + Sync + 'static,
        D: DispatchSignedRequest + Send + Sync + 'static,
    {
        Self::new_with(request_dispatcher, credentials_provider, region)
    }
}

/// Create a rusoto client of the given type using the given region
fn build_client<T: NewWith>(region: &Region) -> Result<T> {
    let provider = DefaultCredentialsProvider::new().context(self::DefaultProvider)?;
    Ok(T::new_with(
        rusoto_core::HttpClient::new().context(self::HttpClient)?,
        provider,
        region.clone(),
    ))
}

pub struct AwsEnvBucketMediator {
    s3_client: S3Client,
}

impl AwsEnvBucketMediator {
    pub fn new(region_name: &str) -> crate::Result<Self> {
        let region =
            Region::from_str(region_name).context(self::ParseRegion { name: region_name })?;
        let s3_client = build_client::<S3Client>(&region)?;
        Ok(AwsEnvBucketMediator { s3_client })
    }
}

#[async_trait]
impl EnvBucketMediator for AwsEnvBucketMediator {
    async fn list_keys(&self, bucket: &str) -> crate::Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token = None;
        loop {
            let resp = self
                .s3_client
                .list_objects_v2(ListObjectsV2Request {
                    bucket: bucket.to_string(),
                    continuation_token: continuation_token.take(),
                    ..ListObjectsV2Request::default()
                })
                .await
                .context(self::ListObjects { bucket })?;
            for object in resp.contents.unwrap_or_default() {
                keys.push(object.key.context(self::S3MissingField {
                    api: "list_objects_v2",
                    field: "key",
                })?);
            }
            match resp.next_continuation_token {
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }
        Ok(keys)
    }

    async fn get_object_json(&self, bucket: &str, key: &str) -> crate::Result<serde_json::Value> {
        let resp = self
            .s3_client
            .get_object(GetObjectRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                ..GetObjectRequest::default()
            })
            .await
            .context(self::GetObject { bucket, key })?;
        let body = resp.body.context(self::S3MissingField {
            api: "get_object",
            field: "body",
        })?;
        let mut buf = Vec::new();
        body.into_async_read()
            .read_to_end(&mut buf)
            .await
            .context(self::ReadBody { bucket, key })?;
        let value = serde_json::from_slice(&buf).context(self::DecodeJson { bucket, key })?;
        Ok(value)
    }
}
