use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, DATE, ETAG};
use sha1::Sha1;
use std::time::Duration;
use url::Url;

use crate::errors::{AppError, AppResult};

type HmacSha1 = Hmac<Sha1>;

/// Host marker of Aliyun's regional OSS domains
const OSS_DOMAIN_MARKER: &str = "oss-";
const REQUEST_ID_HEADER: &str = "x-oss-request-id";

/// Result of a single-shot object write that the service did not reject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectResult {
    pub status: u16,
    pub request_id: Option<String>,
    pub etag: Option<String>,
}

/// Object storage seam used by the upload loop
pub trait ObjectStore {
    /// Write `data` under `key`. Service-side rejections come back as storage
    /// fault errors; any status the service accepted is returned as-is.
    fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str)
        -> AppResult<PutObjectResult>;
}

/// Minimal Aliyun OSS client: header-signed PutObject against one bucket
pub struct OssClient {
    client: Client,
    access_key_id: String,
    access_key_secret: String,
    bucket: String,
    bucket_base: Url,
}

impl OssClient {
    pub fn new(
        access_key_id: &str,
        access_key_secret: &str,
        endpoint: &str,
        bucket: &str,
    ) -> AppResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Self::with_client(client, access_key_id, access_key_secret, endpoint, bucket)
    }

    /// Build on an existing HTTP client, e.g. one with its own proxy or timeout
    pub fn with_client(
        client: Client,
        access_key_id: &str,
        access_key_secret: &str,
        endpoint: &str,
        bucket: &str,
    ) -> AppResult<Self> {
        let bucket_base = bucket_base_url(endpoint, bucket)?;

        log::debug!("OSS client ready for {}", bucket_base);

        Ok(Self {
            client,
            access_key_id: access_key_id.trim().to_string(),
            access_key_secret: access_key_secret.trim().to_string(),
            bucket: bucket.trim().to_string(),
            bucket_base,
        })
    }

    /// Request URL for an object, with each key segment percent-encoded.
    /// The path must match the signed resource byte for byte, so keys with
    /// `.` or `..` segments (which URL parsing would collapse) are refused.
    pub fn object_url(&self, key: &str) -> AppResult<Url> {
        if key.split('/').any(|segment| segment == "." || segment == "..") {
            return Err(AppError::validation(
                "dest_path",
                &format!("Object key '{}' must not contain '.' or '..' segments", key),
            ));
        }

        let mut url = self.bucket_base.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config("Endpoint cannot carry an object path".to_string()))?
            .pop_if_empty()
            .extend(key.split('/'));
        Ok(url)
    }
}

impl ObjectStore for OssClient {
    fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> AppResult<PutObjectResult> {
        let url = self.object_url(key)?;
        let date = http_date();
        let resource = format!("/{}/{}", self.bucket, key);
        let signature = sign(
            &self.access_key_secret,
            &string_to_sign("PUT", "", content_type, &date, &resource),
        )?;

        log::debug!(
            "PUT {} ({} bytes, {})",
            url,
            data.len(),
            content_type
        );

        let response = self
            .client
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .header(DATE, &date)
            .header(
                AUTHORIZATION,
                format!("OSS {}:{}", self.access_key_id, signature),
            )
            .body(data)
            .send()?;

        let status = response.status();
        let request_id = header_value(&response, REQUEST_ID_HEADER);

        if status.is_success() {
            return Ok(PutObjectResult {
                status: status.as_u16(),
                request_id,
                etag: header_value(&response, ETAG.as_str()),
            });
        }

        let body = response
            .text()
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(parse_error_response(
            status.as_u16(),
            &body,
            request_id.as_deref(),
            &self.bucket,
        ))
    }
}

fn header_value(response: &reqwest::blocking::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim_matches('"').to_string())
}

/// RFC 1123 date in GMT, as OSS expects in the Date header
fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

pub fn string_to_sign(
    verb: &str,
    content_md5: &str,
    content_type: &str,
    date: &str,
    canonical_resource: &str,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}",
        verb, content_md5, content_type, date, canonical_resource
    )
}

/// base64(HMAC-SHA1(secret, string_to_sign))
pub fn sign(access_key_secret: &str, string_to_sign: &str) -> AppResult<String> {
    let mut mac = HmacSha1::new_from_slice(access_key_secret.as_bytes())
        .map_err(|e| AppError::Config(format!("Invalid signing key: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    let endpoint = if endpoint.starts_with("http") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };
    endpoint.trim_end_matches('/').to_string()
}

/// Virtual-hosted bucket URL used for requests: scheme://bucket.host/
pub fn bucket_base_url(endpoint: &str, bucket: &str) -> AppResult<Url> {
    let mut url = Url::parse(&normalize_endpoint(endpoint))?;
    let host = url
        .host_str()
        .ok_or_else(|| AppError::Config(format!("Endpoint {} has no host", endpoint)))?
        .to_string();

    url.set_host(Some(&format!("{}.{}", bucket.trim(), host)))?;
    Ok(url)
}

/// Public URL of an uploaded object. Regional OSS endpoints get the bucket as
/// a subdomain; anything else is treated as a custom domain with the bucket
/// as the first path segment.
pub fn generate_file_url(endpoint: &str, bucket_name: &str, dest_path: &str) -> String {
    let endpoint = normalize_endpoint(endpoint);
    let (scheme, rest) = endpoint.split_once("://").unwrap_or(("https", endpoint.as_str()));
    let host = rest.split('/').next().unwrap_or(rest);

    let base_url = if host.contains(OSS_DOMAIN_MARKER) {
        format!("{}://{}.{}", scheme, bucket_name, rest)
    } else {
        format!("{}/{}", endpoint, bucket_name)
    };

    format!("{}/{}", base_url, dest_path)
}

/// Map an OSS XML error document onto the fault taxonomy
pub fn parse_error_response(
    status: u16,
    body: &str,
    request_id: Option<&str>,
    bucket: &str,
) -> AppError {
    let code = extract_xml_tag(body, "Code").unwrap_or_default();
    let message = extract_xml_tag(body, "Message").unwrap_or_else(|| {
        body.trim().chars().take(200).collect()
    });
    let request_id = extract_xml_tag(body, "RequestId")
        .or_else(|| request_id.map(str::to_string))
        .unwrap_or_default();

    log::debug!(
        "OSS rejected request: status {}, code '{}', request id {}",
        status,
        code,
        request_id
    );

    AppError::from_oss_response(status, &code, &message, &request_id, bucket)
}

fn extract_xml_tag(body: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(body[start..end].trim().to_string())
}
