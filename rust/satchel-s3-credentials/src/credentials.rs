//! AWS SigV4 query-string signing.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::percent_decode_str;
use sha2::{Digest, Sha256};
use url::Url;

use crate::{AccessError, Address, Request, is_path_style_default};

/// A presigned request, ready to be handed to an HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// The presigned URL.
    pub url: Url,
    /// The HTTP method the signature is valid for.
    pub method: &'static str,
    /// Headers that must be sent with the request (always includes `host`).
    pub headers: Vec<(String, String)>,
    /// Instant after which the storage service rejects the URL.
    pub expires_at: DateTime<Utc>,
}

/// Access key pair bound to a bucket [`Address`].
///
/// There is deliberately no unsigned variant: every URL produced here is
/// scoped to one object, one method and one lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: String,
    address: Address,
    endpoint: Url,
    path_style: bool,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("address", &self.address)
            .field("path_style", &self.path_style)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Create new credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Configuration`] if the endpoint cannot be parsed,
    /// has no host, or the bucket or key id is empty.
    pub fn new(
        address: Address,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Result<Self, AccessError> {
        let endpoint = address.parse_endpoint()?;
        let access_key_id = access_key_id.into();
        if access_key_id.is_empty() {
            return Err(AccessError::Configuration(
                "access key id is empty".to_string(),
            ));
        }
        let path_style = is_path_style_default(&endpoint);

        Ok(Self {
            access_key_id,
            secret_access_key: secret_access_key.into(),
            address,
            endpoint,
            path_style,
        })
    }

    /// Force path-style (`https://endpoint/bucket/key`) or virtual-hosted
    /// (`https://bucket.endpoint/key`) URLs.
    pub fn with_path_style(mut self, path_style: bool) -> Self {
        self.path_style = path_style;
        self
    }

    /// The access key id.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The bucket address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Build the unsigned URL of an object.
    pub fn object_url(&self, key: &str) -> Result<Url, AccessError> {
        let key = key.trim_start_matches('/');
        if self.path_style {
            let mut url = self.endpoint.clone();
            url.set_path(&format!("{}/{}", self.address.bucket(), key));
            Ok(url)
        } else {
            let host = self
                .endpoint
                .host_str()
                .ok_or_else(|| AccessError::Configuration("endpoint has no host".into()))?;
            let mut url = self.endpoint.clone();
            url.set_host(Some(&format!("{}.{}", self.address.bucket(), host)))
                .map_err(|error| AccessError::Configuration(format!("host: {error}")))?;
            url.set_path(key);
            Ok(url)
        }
    }

    /// Sign `request`, producing a presigned URL.
    pub fn authorize(&self, request: &Request) -> Result<Authorization, AccessError> {
        let timestamp = request.time().format("%Y%m%dT%H%M%SZ").to_string();
        let date = &timestamp[0..8];
        let region = self.address.region();
        let scope = format!("{date}/{region}/s3/aws4_request");

        let url = self.object_url(request.key())?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", url.host_str().unwrap_or_default(), port),
            None => url.host_str().unwrap_or_default().to_string(),
        };

        let mut headers = vec![("host".to_string(), host)];
        headers.extend(request.headers().iter().cloned());
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers = headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(";");

        let mut query: Vec<(String, String)> = vec![
            ("X-Amz-Algorithm".into(), "AWS4-HMAC-SHA256".into()),
            (
                "X-Amz-Credential".into(),
                format!("{}/{}", self.access_key_id, scope),
            ),
            ("X-Amz-Date".into(), timestamp.clone()),
            ("X-Amz-Expires".into(), request.expires().to_string()),
            ("X-Amz-SignedHeaders".into(), signed_headers.clone()),
        ];
        query.extend(request.params().iter().cloned());
        // SigV4 requires parameters ordered by name
        query.sort_by(|a, b| a.0.cmp(&b.0));

        let canonical_query = query
            .iter()
            .map(|(name, value)| format!("{}={}", percent_encode(name), percent_encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_headers = headers
            .iter()
            .map(|(name, value)| format!("{}:{}", name, value.trim()))
            .collect::<Vec<_>>()
            .join("\n");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n\n{}\nUNSIGNED-PAYLOAD",
            request.method().as_str(),
            percent_encode_path(url.path()),
            canonical_query,
            canonical_headers,
            signed_headers
        );

        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            timestamp,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let key = SigningKey::derive(&self.secret_access_key, date, region);
        let signature = hex::encode(key.sign(string_to_sign.as_bytes()));

        let mut url = url;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.clear();
            for (name, value) in &query {
                pairs.append_pair(name, value);
            }
            pairs.append_pair("X-Amz-Signature", &signature);
        }

        Ok(Authorization {
            url,
            method: request.method().as_str(),
            headers,
            expires_at: request.time() + Duration::seconds(request.expires() as i64),
        })
    }
}

/// SigV4 signing key:
/// `HMAC(HMAC(HMAC(HMAC("AWS4" + secret, date), region), "s3"), "aws4_request")`
struct SigningKey(Vec<u8>);

impl SigningKey {
    fn derive(secret: &str, date: &str, region: &str) -> Self {
        let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
        let k_region = hmac_sha256(&k_date, region.as_bytes());
        let k_service = hmac_sha256(&k_region, b"s3");
        Self(hmac_sha256(&k_service, b"aws4_request"))
    }

    fn sign(&self, data: &[u8]) -> Vec<u8> {
        hmac_sha256(&self.0, data)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(key).expect("HMAC-SHA256 accepts keys of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Percent-encode per RFC 3986, leaving only unreserved characters.
fn percent_encode(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

/// Percent-encode each segment of a path, keeping the slashes.
///
/// The path coming out of [`Url`] is already escaped, so it is decoded first to
/// avoid double encoding.
fn percent_encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| percent_encode(&percent_decode_str(segment).decode_utf8_lossy()))
        .collect::<Vec<_>>()
        .join("/")
}
