use async_trait::async_trait;
use chrono::Duration;
use satchel_s3_credentials::{Minter, Presentation, ReadCredential, Request};

use super::{ObjectKey, ObjectStore, ObjectStoreError};

/// Lifetime of the presigned URLs used for our own uploads and deletes.
const WRITE_EXPIRES: u64 = 300;

/// An [ObjectStore] speaking the S3 REST protocol to any compatible service
/// (AWS, R2, MinIO). Writes are issued as presigned requests, so the secret
/// never leaves this process.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: reqwest::Client,
    minter: Minter,
}

impl S3ObjectStore {
    /// A store that signs with `minter`'s credentials
    pub fn new(minter: Minter) -> Self {
        Self::with_client(reqwest::Client::new(), minter)
    }

    /// Like [S3ObjectStore::new], with a preconfigured HTTP client
    pub fn with_client(client: reqwest::Client, minter: Minter) -> Self {
        Self { client, minter }
    }

    async fn perform(
        &self,
        request: Request,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, ObjectStoreError> {
        let request = request.with_expires(WRITE_EXPIRES);
        let authorization = self.minter.credentials().authorize(&request)?;

        let mut builder = match authorization.method {
            "PUT" => self.client.put(authorization.url),
            "DELETE" => self.client.delete(authorization.url),
            _ => self.client.get(authorization.url),
        };
        for (name, value) in authorization.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        Ok(builder.send().await?)
    }
}

impl From<reqwest::Error> for ObjectStoreError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            ObjectStoreError::Unavailable(error.to_string())
        } else {
            ObjectStoreError::Rejected(error.to_string())
        }
    }
}

fn status_error(operation: &str, status: reqwest::StatusCode) -> ObjectStoreError {
    let message = format!("{operation} returned {status}");
    if status.is_server_error() {
        ObjectStoreError::Unavailable(message)
    } else {
        ObjectStoreError::Rejected(message)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &ObjectKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let request = Request::put(key.as_str(), self.minter.clock().now())
            .with_header("content-type", content_type);
        let response = self.perform(request, Some(bytes)).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error("PUT", response.status()))
        }
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), ObjectStoreError> {
        let request = Request::delete(key.as_str(), self.minter.clock().now());
        let response = self.perform(request, None).await?;

        // S3 answers 204 whether or not the object existed; some
        // compatible services answer 404 instead
        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND
        {
            Ok(())
        } else {
            Err(status_error("DELETE", response.status()))
        }
    }

    fn mint_read_credential(
        &self,
        key: &ObjectKey,
        lifetime: Duration,
        presentation: &Presentation,
    ) -> Result<ReadCredential, ObjectStoreError> {
        Ok(self.minter.mint(key.as_str(), lifetime, presentation)?)
    }

    fn ceiling(&self) -> Duration {
        self.minter.ceiling()
    }
}
