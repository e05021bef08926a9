//! HTTP file serving for resource URIs: raw content with byte ranges, and embedded cover art.

use crate::catalog::builder::ALBUM_ART_PATH;
use crate::catalog::ObjectIdResolver;
use crate::dlna::{mime, ClientContext};
use crate::error::AppError;
use crate::metadata::MetadataHandlerRegistry;
use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, Method, StatusCode, Uri},
    response::Response,
};
use percent_encoding::percent_decode_str;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

const TRANSFER_MODE: HeaderName = HeaderName::from_static("transfermode.dlna.org");
const CONTENT_FEATURES: HeaderName = HeaderName::from_static("contentfeatures.dlna.org");
const GET_CONTENT_FEATURES: &str = "getcontentfeatures.dlna.org";

/// Serves files below the media root. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ResourceServer {
    resolver: ObjectIdResolver,
    registry: Arc<MetadataHandlerRegistry>,
}

impl ResourceServer {
    pub fn new(resolver: ObjectIdResolver, registry: Arc<MetadataHandlerRegistry>) -> Self {
        ResourceServer { resolver, registry }
    }

    /// Entry point for both the content and album-art URIs.
    pub async fn handle_file_request(
        &self,
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
    ) -> Result<Response, AppError> {
        if method != Method::GET && method != Method::HEAD {
            debug!("Rejecting {} on {}", method, uri.path());
            return Err(AppError::MethodNotAllowed);
        }

        let relative = query_path(uri.query()).ok_or(AppError::NotFound)?;

        if uri.path() == ALBUM_ART_PATH {
            return self.serve_album_art(&relative).await;
        }

        let path = self
            .resolver
            .resolve_relative_path(&relative)
            .map_err(|_| AppError::NotFound)?;
        let client = ClientContext::from_headers(headers);
        self.serve_file(&path, headers, method == Method::HEAD, &client)
            .await
    }

    /// Serve a regular file, honoring a single byte range.
    pub async fn serve_file(
        &self,
        path: &Path,
        headers: &HeaderMap,
        head_only: bool,
        client: &ClientContext,
    ) -> Result<Response, AppError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|_| AppError::NotFound)?;
        if !metadata.is_file() {
            return Err(AppError::NotFound);
        }
        let file_size = metadata.len();
        let content_type = mime::mime_type_for_path(path, client);

        let mut response_builder = Response::builder()
            .header(header::CONTENT_TYPE, content_type.as_str())
            .header(header::ACCEPT_RANGES, "bytes")
            .header(TRANSFER_MODE, "Streaming");

        if headers.contains_key(GET_CONTENT_FEATURES) {
            response_builder = response_builder.header(
                CONTENT_FEATURES,
                mime::dlna_extension_for_mime(&content_type, client),
            );
        }

        let range = match headers.get(header::RANGE) {
            Some(range_header) => {
                let range_str = range_header.to_str().map_err(|_| AppError::InvalidRange)?;
                debug!("Received range request: {}", range_str);
                Some(parse_range(range_str, file_size)?)
            }
            None => None,
        };

        let (start, len, status) = match range {
            Some(range) => {
                let (start, end) = (*range.start(), *range.end());
                response_builder = response_builder.header(
                    header::CONTENT_RANGE,
                    format!("bytes {}-{}/{}", start, end, file_size),
                );
                (start, end - start + 1, StatusCode::PARTIAL_CONTENT)
            }
            None => (0, file_size, StatusCode::OK),
        };

        response_builder = response_builder
            .header(header::CONTENT_LENGTH, len)
            .status(status);

        if head_only || len == 0 {
            return Ok(response_builder.body(Body::empty())?);
        }

        let mut file = File::open(path).await?;
        file.seek(std::io::SeekFrom::Start(start)).await?;
        let stream = ReaderStream::with_capacity(file.take(len), 64 * 1024);
        let body = Body::from_stream(stream);

        Ok(response_builder.body(body)?)
    }

    /// Serve embedded cover art for a media file as an opaque byte stream.
    pub async fn serve_album_art(&self, relative: &str) -> Result<Response, AppError> {
        if relative.contains("/..") || relative.contains("\\..") {
            warn!("Rejected album art path: {}", relative);
            return Err(AppError::NotFound);
        }

        let path = self
            .resolver
            .resolve_relative_path(relative)
            .map_err(|_| AppError::NotFound)?;
        let registry = self.registry.clone();

        let cover = tokio::task::spawn_blocking(move || load_cover_art(&registry, path))
            .await
            .map_err(|e| AppError::Internal(e.into()))?
            .ok_or(AppError::NotFound)?;

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header(header::CONTENT_LENGTH, cover.len())
            .body(Body::from(cover))?)
    }
}

fn load_cover_art(registry: &MetadataHandlerRegistry, path: PathBuf) -> Option<Vec<u8>> {
    let handler = registry.find_for(&path)?;
    match handler.load(&path) {
        Ok(metadata) => metadata.cover_art.map(|art| art.data),
        Err(e) => {
            debug!("No cover art for {}: {}", path.display(), e);
            None
        }
    }
}

/// Percent-decoded value of the `path` query field.
pub fn query_path(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "path")
        .and_then(|(_, value)| {
            let value = value.replace('+', " ");
            percent_decode_str(&value)
                .decode_utf8()
                .ok()
                .map(|s| s.into_owned())
        })
        .filter(|path| !path.is_empty())
}

/// First satisfiable range of a `Range` header; multiple ranges collapse to the first.
fn parse_range(range_str: &str, file_size: u64) -> Result<RangeInclusive<u64>, AppError> {
    let ranges = http_range_header::parse_range_header(range_str)
        .and_then(|parsed| parsed.validate(file_size))
        .map_err(|_| AppError::InvalidRange)?;
    ranges.into_iter().next().ok_or(AppError::InvalidRange)
}
