//! Bucket location.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::AccessError;

/// Where a bucket lives: endpoint, signing region and bucket name.
///
/// This is plain data; the endpoint is only parsed when [`Credentials`]
/// are built from it.
///
/// ```
/// use satchel_s3_credentials::Address;
///
/// // Cloudflare R2 signs with the "auto" region.
/// let address = Address::new("https://account-id.r2.cloudflarestorage.com", "auto", "uploads");
/// assert_eq!(address.bucket(), "uploads");
/// ```
///
/// [`Credentials`]: crate::Credentials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    endpoint: String,
    region: String,
    bucket: String,
}

impl Address {
    /// Create a new address.
    pub fn new(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
            bucket: bucket.into(),
        }
    }

    /// The endpoint URL string.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The signing region.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Parse the endpoint, rejecting URLs that cannot address a host.
    pub(crate) fn parse_endpoint(&self) -> Result<Url, AccessError> {
        let endpoint = Url::parse(&self.endpoint)
            .map_err(|error| AccessError::Configuration(format!("endpoint: {error}")))?;

        if endpoint.host().is_none() {
            return Err(AccessError::Configuration(
                "endpoint has no host".to_string(),
            ));
        }

        if self.bucket.is_empty() {
            return Err(AccessError::Configuration("bucket is empty".to_string()));
        }

        Ok(endpoint)
    }
}

/// Whether path-style URLs should be used by default for this endpoint.
///
/// True for IP addresses and localhost, since virtual-hosted style URLs
/// require DNS resolution of `{bucket}.{host}`.
pub fn is_path_style_default(endpoint: &Url) -> bool {
    use url::Host;
    match endpoint.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        Some(Host::Domain(domain)) => domain == "localhost",
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_a_valid_endpoint() {
        let address = Address::new("https://s3.us-east-1.amazonaws.com", "us-east-1", "b");
        let endpoint = address.parse_endpoint().unwrap();

        assert_eq!(endpoint.host_str(), Some("s3.us-east-1.amazonaws.com"));
        assert!(!is_path_style_default(&endpoint));
    }

    #[test]
    fn it_rejects_an_endpoint_without_host() {
        let address = Address::new("mailto:storage@example.com", "us-east-1", "b");

        assert!(matches!(
            address.parse_endpoint(),
            Err(AccessError::Configuration(_))
        ));
    }

    #[test]
    fn it_rejects_an_empty_bucket() {
        let address = Address::new("http://localhost:9000", "us-east-1", "");

        assert!(matches!(
            address.parse_endpoint(),
            Err(AccessError::Configuration(_))
        ));
    }

    #[test]
    fn it_prefers_path_style_for_local_endpoints() {
        for endpoint in ["http://localhost:9000", "http://127.0.0.1:9000", "http://[::1]:9000"] {
            let url = Url::parse(endpoint).unwrap();
            assert!(is_path_style_default(&url), "{endpoint}");
        }
    }

    #[test]
    fn it_roundtrips_through_serde() {
        let address = Address::new("http://localhost:9000", "us-east-1", "uploads");

        let json = serde_json::to_string(&address).unwrap();
        let parsed: Address = serde_json::from_str(&json).unwrap();

        assert_eq!(address, parsed);
    }
}
