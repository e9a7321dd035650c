//! S3-compatible object store over blocking HTTP.
//!
//! Speaks the small subset of the S3 REST API the pipeline needs:
//! `HeadBucket`, `CreateBucket`, `ListObjectsV2`, `GetObject`, `PutObject`
//! and `DeleteObject`. Every request is signed with SigV4.

use std::io::Read;
use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use url::Url;

use crate::error::StoreError;
use crate::settings::S3Settings;
use crate::sigv4::{self, CanonicalRequest, EMPTY_PAYLOAD_SHA256, UNSIGNED_PAYLOAD};
use crate::store::{ListPage, ObjectReader, ObjectStore, ObjectSummary};

const SERVICE: &str = "s3";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    is_truncated: bool,
    #[serde(default)]
    contents: Vec<ListEntry>,
    #[serde(default)]
    next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "ETag", default)]
    etag: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Parse a `ListObjectsV2` response body into a page.
pub(crate) fn parse_list_page(xml: &str) -> Result<ListPage, StoreError> {
    let result: ListBucketResult = quick_xml::de::from_str(xml)?;
    let next_continuation = if result.is_truncated {
        match result.next_continuation_token {
            Some(token) if !token.is_empty() => Some(token),
            _ => {
                return Err(StoreError::Protocol(
                    "listing is truncated but carries no continuation token".to_string(),
                ))
            }
        }
    } else {
        None
    };
    Ok(ListPage {
        objects: result
            .contents
            .into_iter()
            .map(|entry| ObjectSummary {
                key: entry.key,
                etag: entry.etag,
            })
            .collect(),
        next_continuation,
    })
}

fn parse_error_body(body: &str) -> (Option<String>, Option<String>) {
    match quick_xml::de::from_str::<ErrorBody>(body) {
        Ok(err) => (err.code, err.message),
        Err(_) => (None, None),
    }
}

// ---------------------------------------------------------------------------
// S3Store
// ---------------------------------------------------------------------------

/// Where a request goes and how its path is signed.
struct Target {
    url: String,
    host: String,
    canonical_uri: String,
}

/// Request body. Streamed bodies are sent unsigned.
enum Payload<'a> {
    Empty,
    Bytes(&'a [u8]),
    Stream {
        reader: &'a mut dyn Read,
        length: u64,
    },
}

/// Blocking S3 client. Cheap to share by reference across threads.
pub struct S3Store {
    agent: ureq::Agent,
    settings: S3Settings,
    endpoint: Url,
}

impl S3Store {
    pub fn new(settings: S3Settings) -> Result<Self, StoreError> {
        let raw = match &settings.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://s3.{}.amazonaws.com", settings.region),
        };
        let endpoint = Url::parse(&raw)
            .map_err(|e| StoreError::Settings(format!("invalid endpoint '{raw}': {e}")))?;
        if endpoint.host_str().is_none() {
            return Err(StoreError::Settings(format!("endpoint '{raw}' has no host")));
        }
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .build();
        Ok(Self {
            agent,
            settings,
            endpoint,
        })
    }

    fn target(&self, bucket: &str, key: Option<&str>) -> Target {
        let scheme = self.endpoint.scheme();
        let base_host = self.endpoint.host_str().unwrap_or_default();
        let port = self
            .endpoint
            .port()
            .map(|p| format!(":{p}"))
            .unwrap_or_default();
        let base_path = self.endpoint.path().trim_end_matches('/');

        // Dotted names break the wildcard TLS certificate of virtual hosts.
        let (host, mut canonical_uri) = if self.settings.path_style || bucket.contains('.') {
            (
                format!("{base_host}{port}"),
                format!("{base_path}/{}", sigv4::uri_encode(bucket)),
            )
        } else {
            (format!("{bucket}.{base_host}{port}"), base_path.to_string())
        };
        match key {
            Some(key) => {
                canonical_uri.push('/');
                canonical_uri.push_str(&sigv4::encode_key_path(key));
            }
            None if canonical_uri.is_empty() => canonical_uri.push('/'),
            None => {}
        }

        Target {
            url: format!("{scheme}://{host}{canonical_uri}"),
            host,
            canonical_uri,
        }
    }

    /// Sign and send one request, mapping non-2xx answers to [`StoreError`].
    fn send(
        &self,
        method: &str,
        target: &Target,
        query: &[(&str, &str)],
        payload: Payload<'_>,
    ) -> Result<ureq::Response, StoreError> {
        let now = Utc::now();
        let amz_date = sigv4::amz_date(now);
        let payload_hash = match &payload {
            Payload::Empty => EMPTY_PAYLOAD_SHA256.to_string(),
            Payload::Bytes(body) => sigv4::sha256_hex(body),
            Payload::Stream { .. } => UNSIGNED_PAYLOAD.to_string(),
        };

        let mut headers: Vec<(&str, &str)> = vec![
            ("host", target.host.as_str()),
            ("x-amz-content-sha256", payload_hash.as_str()),
            ("x-amz-date", amz_date.as_str()),
        ];
        if let Some(token) = &self.settings.credentials.session_token {
            headers.push(("x-amz-security-token", token.as_str()));
        }

        let canonical = CanonicalRequest {
            method,
            canonical_uri: &target.canonical_uri,
            query,
            headers: &headers,
            payload_hash: &payload_hash,
        };
        let authorization = sigv4::authorization(
            &canonical,
            &self.settings.credentials,
            &self.settings.region,
            SERVICE,
            now,
        );

        let url = if query.is_empty() {
            target.url.clone()
        } else {
            format!("{}?{}", target.url, sigv4::canonical_query(query))
        };

        let mut request = self.agent.request(method, &url);
        for (name, value) in &headers {
            // ureq derives Host from the URL; it matches what was signed.
            if *name != "host" {
                request = request.set(name, value);
            }
        }
        request = request.set("authorization", &authorization);

        tracing::debug!("{method} {url}");
        let result = match payload {
            Payload::Empty => request.call(),
            Payload::Bytes(body) => request.send_bytes(body),
            // Without an explicit length ureq falls back to chunked encoding,
            // which S3 rejects for unsigned single-part uploads.
            Payload::Stream { reader, length } => request
                .set("content-length", &length.to_string())
                .send(reader),
        };
        match result {
            Ok(response) => Ok(response),
            Err(ureq::Error::Status(status, response)) => {
                let text = response.into_string().unwrap_or_default();
                let (code, message) = parse_error_body(&text);
                Err(StoreError::Status {
                    status,
                    code,
                    message: message.unwrap_or_else(|| format!("{method} {url} failed")),
                })
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(StoreError::Transport(transport.to_string()))
            }
        }
    }
}

impl ObjectStore for S3Store {
    fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        let target = self.target(bucket, None);
        match self.send("HEAD", &target, &[], Payload::Empty) {
            Ok(_) => Ok(true),
            Err(StoreError::Status { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let target = self.target(bucket, None);
        // us-east-1 rejects an explicit location constraint.
        let body = if self.settings.region == "us-east-1" {
            String::new()
        } else {
            format!(
                "<CreateBucketConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
                 <LocationConstraint>{}</LocationConstraint>\
                 </CreateBucketConfiguration>",
                self.settings.region
            )
        };
        self.send("PUT", &target, &[], Payload::Bytes(body.as_bytes()))?;
        tracing::info!("created bucket {bucket}");
        Ok(())
    }

    fn list_page(
        &self,
        bucket: &str,
        continuation: Option<&str>,
    ) -> Result<ListPage, StoreError> {
        let target = self.target(bucket, None);
        let mut query = vec![("list-type", "2")];
        if let Some(token) = continuation {
            query.push(("continuation-token", token));
        }
        let response = match self.send("GET", &target, &query, Payload::Empty) {
            Err(StoreError::Status { status: 404, .. }) => {
                return Err(StoreError::NoSuchBucket(bucket.to_string()))
            }
            other => other?,
        };
        let mut xml = String::new();
        response.into_reader().read_to_string(&mut xml)?;
        parse_list_page(&xml)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError> {
        let target = self.target(bucket, Some(key));
        match self.send("GET", &target, &[], Payload::Empty) {
            Ok(response) => Ok(Box::new(response.into_reader())),
            Err(StoreError::Status { status: 404, .. }) => Err(StoreError::NoSuchKey {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &mut dyn Read,
        length: u64,
    ) -> Result<String, StoreError> {
        let target = self.target(bucket, Some(key));
        let response = self.send(
            "PUT",
            &target,
            &[],
            Payload::Stream {
                reader: body,
                length,
            },
        )?;
        response
            .header("etag")
            .map(str::to_owned)
            .ok_or_else(|| StoreError::Protocol(format!("PutObject for '{key}' returned no ETag")))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        let target = self.target(bucket, Some(key));
        self.send("DELETE", &target, &[], Payload::Empty)?;
        Ok(())
    }
}
