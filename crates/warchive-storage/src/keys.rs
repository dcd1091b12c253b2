//! Object key helpers.
//!
//! Photo rows store a public URL, not a key. The resize service writes
//! images as `https://{bucket}.s3.{region}.amazonaws.com/processed/{name}.jpg`;
//! S3-compatible endpoints use path style (`{endpoint}/{bucket}/processed/...`).

use url::Url;
use warchive_models::photo::PROCESSED_PREFIX;

use crate::error::{StorageError, StorageResult};

/// Host suffix separating the bucket host from the key in AWS URLs.
const AWS_HOST_MARKER: &str = ".amazonaws.com/";

/// Default AWS region used when none is configured.
pub const DEFAULT_REGION: &str = "eu-central-1";

/// Resolve the storage key of a processed image from its stored URL.
///
/// `+` is treated as an encoded space before percent-decoding. Fails with
/// [`StorageError::MalformedLocation`] unless the key lives under `processed/`.
pub fn processed_key_from_url(image_url: &str, bucket: &str) -> StorageResult<String> {
    let raw = raw_key(image_url, bucket)
        .ok_or_else(|| StorageError::malformed_location(image_url))?;

    let key = urlencoding::decode(&raw.replace('+', " "))
        .map_err(|_| StorageError::malformed_location(image_url))?
        .into_owned();

    if !key.starts_with(PROCESSED_PREFIX) || key.len() == PROCESSED_PREFIX.len() {
        return Err(StorageError::malformed_location(image_url));
    }

    Ok(key)
}

fn raw_key(image_url: &str, bucket: &str) -> Option<String> {
    if let Some((_, key)) = image_url.split_once(AWS_HOST_MARKER) {
        let key = strip_bucket(key, bucket);
        return (!key.is_empty()).then(|| key.to_string());
    }

    let parsed = Url::parse(image_url).ok()?;
    let path = parsed.path().trim_start_matches('/');
    let key = strip_bucket(path, bucket);
    (!key.is_empty()).then(|| key.to_string())
}

/// Remove a leading `{bucket}/` segment left by path-style URLs.
fn strip_bucket<'a>(key: &'a str, bucket: &str) -> &'a str {
    if bucket.is_empty() {
        return key;
    }
    key.strip_prefix(bucket)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(key)
}

/// Public URL of `key`.
///
/// Uses `public_base_url` when configured, otherwise the virtual-hosted AWS
/// form the rest of the system stores.
pub fn public_object_url(
    bucket: &str,
    region: &str,
    public_base_url: Option<&str>,
    key: &str,
) -> String {
    match public_base_url {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}
