//! Fetching raw bytes by URL.
//!
//! This is the only place that touches actual storage.
//! Supported schemes are `file`, `data`, `http` and `https`.

use std::{
    io::ErrorKind,
    mem::size_of_val,
    sync::{Arc, OnceLock},
};

use base64::{
    alphabet::STANDARD,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};
use reqwest::{header::CONTENT_TYPE, StatusCode};
use url::Url;

use crate::{error::LoadError, loader::AssetData};

const BASE64: GeneralPurpose = GeneralPurpose::new(
    &STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Query parameter appended to URLs when cache is bypassed.
pub const CACHE_BUST_PARAM: &str = "_cb";

static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Options for single fetch.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchOptions<'a> {
    /// Expected content type of the data.
    pub content_type: Option<&'a str>,

    /// Skip any cache layer between the loader and the storage.
    pub bypass_cache: bool,

    /// Client for `http` and `https` fetches.
    /// Shared process-wide client is used if not set.
    pub http_client: Option<&'a reqwest::Client>,
}

/// Appends unique query parameter to the URL
/// so that no cache layer can serve it.
pub fn bust_cache(url: &mut Url) {
    if url.scheme() == "data" {
        return;
    }

    let nonce: u64 = rand::random();
    url.query_pairs_mut()
        .append_pair(CACHE_BUST_PARAM, &format!("{nonce:016x}"));
}

/// Fetches data from the URL.
pub async fn fetch_url(url: &Url, options: FetchOptions<'_>) -> Result<AssetData, LoadError> {
    let mut url = url.clone();
    if options.bypass_cache {
        bust_cache(&mut url);
    }

    match url.scheme() {
        "file" => {
            let path = url
                .to_file_path()
                .map_err(|()| LoadError::InvalidPath { url: url.clone() })?;

            tracing::debug!("Fetching file '{}' ('{}')", url, path.display());

            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(AssetData {
                    bytes: bytes.into_boxed_slice(),
                    content_type: options.content_type.map(str::to_owned),
                    source: url.to_string(),
                }),
                Err(error) if error.kind() == ErrorKind::NotFound => {
                    Err(LoadError::NotFound { url })
                }
                Err(error) => Err(LoadError::Io {
                    url,
                    path,
                    error: Arc::new(error),
                }),
            }
        }
        "data" => {
            tracing::debug!("Decoding data url");
            let (media_type, bytes) = decode_data_url(&url)?;

            Ok(AssetData {
                bytes,
                content_type: options
                    .content_type
                    .map(str::to_owned)
                    .or(media_type),
                source: url.to_string(),
            })
        }
        "http" | "https" => fetch_http(url, options).await,
        _ => Err(LoadError::UnsupportedScheme { url }),
    }
}

fn http_error(url: &Url, error: reqwest::Error) -> LoadError {
    LoadError::Http {
        url: url.clone(),
        error: Arc::new(error),
    }
}

fn shared_http_client(url: &Url) -> Result<&'static reqwest::Client, LoadError> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client);
    }

    let client = reqwest::Client::builder()
        .build()
        .map_err(|error| http_error(url, error))?;
    Ok(HTTP_CLIENT.get_or_init(|| client))
}

async fn fetch_http(url: Url, options: FetchOptions<'_>) -> Result<AssetData, LoadError> {
    let client = match options.http_client {
        Some(client) => client,
        None => shared_http_client(&url)?,
    };

    tracing::debug!("Fetching '{}'", url);

    let mut request = client.get(url.clone());
    if options.bypass_cache {
        request = request.header(reqwest::header::CACHE_CONTROL, "no-cache");
    }

    let response = request
        .send()
        .await
        .map_err(|error| http_error(&url, error))?;

    let status = response.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return Err(LoadError::NotFound { url });
    }
    if !status.is_success() {
        return Err(LoadError::Status {
            url,
            status: status.as_u16(),
        });
    }

    let content_type = match options.content_type {
        Some(content_type) => Some(content_type.to_owned()),
        None => response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
    };

    let bytes = response
        .bytes()
        .await
        .map_err(|error| http_error(&url, error))?;

    Ok(AssetData {
        bytes: bytes.to_vec().into_boxed_slice(),
        content_type,
        source: url.to_string(),
    })
}

/// Splits data url into media type and decoded payload.
fn decode_data_url(url: &Url) -> Result<(Option<String>, Box<[u8]>), LoadError> {
    let invalid = || LoadError::InvalidDataUrl { url: url.clone() };

    let rest = &url.as_str()[size_of_val("data:")..];
    let comma = rest.find(',').ok_or_else(invalid)?;
    let head = &rest[..comma];
    let data_str = &rest[comma + 1..];

    let (media_type, base64) = match head.strip_suffix(";base64") {
        Some(media_type) => (media_type, true),
        None => (head, false),
    };

    let bytes = if base64 {
        let data_str = percent_encoding::percent_decode_str(data_str)
            .decode_utf8()
            .map_err(|_| invalid())?;
        BASE64.decode(data_str.as_bytes()).map_err(|_| invalid())?
    } else {
        percent_encoding::percent_decode_str(data_str).collect()
    };

    let media_type = if media_type.is_empty() {
        None
    } else {
        Some(media_type.to_owned())
    };

    Ok((media_type, bytes.into_boxed_slice()))
}
