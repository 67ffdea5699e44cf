use std::collections::HashMap;
use std::future::Future;

use base64::Engine;
use url::Url;

use crate::error::{LoadError, Result};

/// Asynchronous byte source for assets.
pub trait AssetReader {
    fn read_bytes(&self, uri: &str) -> impl Future<Output = Result<Vec<u8>>>;
}

/// Reads assets with the browser's `fetch`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchReader;

#[cfg(target_arch = "wasm32")]
impl AssetReader for FetchReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;

        let fetch_error = |reason: wasm_bindgen::JsValue| LoadError::Fetch {
            url: uri.to_string(),
            reason: reason.as_string().unwrap_or_else(|| format!("{reason:?}")),
        };

        let window = web_sys::window().ok_or_else(|| LoadError::Fetch {
            url: uri.to_string(),
            reason: "no window".to_string(),
        })?;

        let init = web_sys::RequestInit::new();
        init.set_method("GET");
        init.set_mode(web_sys::RequestMode::Cors);
        let request = web_sys::Request::new_with_str_and_init(uri, &init).map_err(fetch_error)?;

        let response: web_sys::Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(fetch_error)?
            .dyn_into()
            .map_err(fetch_error)?;
        if !response.ok() {
            return Err(LoadError::HttpStatus {
                url: uri.to_string(),
                status: response.status(),
            });
        }

        let buffer = JsFuture::from(response.array_buffer().map_err(fetch_error)?)
            .await
            .map_err(fetch_error)?;
        Ok(js_sys::Uint8Array::new(&buffer).to_vec())
    }
}

/// Serves assets from memory, keyed by exact URI.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uri: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(uri.into(), bytes.into());
    }
}

impl AssetReader for MemoryReader {
    async fn read_bytes(&self, uri: &str) -> Result<Vec<u8>> {
        self.files.get(uri).cloned().ok_or_else(|| LoadError::HttpStatus {
            url: uri.to_string(),
            status: 404,
        })
    }
}

/// Read `uri`, decoding `data:` URIs in place instead of going to the reader.
pub async fn read_asset(reader: &impl AssetReader, uri: &str) -> Result<Vec<u8>> {
    if uri.starts_with("data:") {
        decode_data_uri(uri)
    } else {
        reader.read_bytes(uri).await
    }
}

/// Resolve `relative` against the URL of the document that referenced it.
///
/// Absolute bases go through `Url::join`. Page-relative bases such as
/// `models/robot.gltf` are joined textually, keeping the base directory.
pub fn resolve_uri(base: &str, relative: &str) -> Result<String> {
    if relative.starts_with("data:") {
        return Ok(relative.to_string());
    }
    if let Ok(absolute) = Url::parse(relative) {
        return Ok(absolute.into());
    }

    match Url::parse(base) {
        Ok(base_url) => base_url
            .join(relative)
            .map(String::from)
            .map_err(|_| LoadError::InvalidUri {
                uri: relative.to_string(),
                base: base.to_string(),
            }),
        Err(_) => {
            let relative = relative.trim_start_matches("./");
            if relative.starts_with('/') {
                return Ok(relative.to_string());
            }
            let dir = strip_query(base).rsplit_once('/').map_or("", |(dir, _)| dir);
            if dir.is_empty() {
                Ok(relative.to_string())
            } else {
                Ok(format!("{dir}/{relative}"))
            }
        }
    }
}

/// Decode a `data:[<mediatype>][;base64],<data>` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| LoadError::DataUri("missing data: prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| LoadError::DataUri("missing ',' separator".to_string()))?;

    if header.ends_with(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| LoadError::DataUri(e.to_string()))
    } else {
        Ok(payload.as_bytes().to_vec())
    }
}

/// Lowercase file extension of a path or URL, ignoring query and fragment.
pub fn extension_of(uri: &str) -> Option<String> {
    if uri.starts_with("data:") {
        return None;
    }
    let path = strip_query(uri);
    let file = path.rsplit('/').next().unwrap_or(path);
    file.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase())
}

fn strip_query(uri: &str) -> &str {
    let end = uri.find(['?', '#']).unwrap_or(uri.len());
    &uri[..end]
}
