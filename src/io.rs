use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use encoding_rs::Encoding;
use futures::TryStreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio_util::codec::FramedRead;

use crate::codec::Transcoder;

/// Path reads give up after this long.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct SourceMeta {
    /// e.g. "application/gzip" or "text/csv"
    pub content_type: String,
    /// e.g. "gzip", "zstd", or empty
    pub content_encoding: String,
    /// just the key/filename (used for extension fallback)
    pub name_hint: String,
    /// Declared character encoding; `None` means sniff it from the bytes
    pub charset: Option<&'static Encoding>,
    /// Upper bound for path-based reads
    pub read_timeout: Duration,
}

impl Default for SourceMeta {
    fn default() -> Self {
        Self {
            content_type: String::new(),
            content_encoding: String::new(),
            name_hint: String::new(),
            charset: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl SourceMeta {
    fn is_gzip(&self) -> bool {
        let ce = self.content_encoding.to_ascii_lowercase();
        let ct = self.content_type.to_ascii_lowercase();
        ce.split(',').any(|s| s.trim() == "gzip")
            || matches!(ct.as_str(), "application/gzip" | "application/x-gzip")
            || self.name_hint.ends_with(".gz")
    }

    fn is_zstd(&self) -> bool {
        let ce = self.content_encoding.to_ascii_lowercase();
        ce.split(',').any(|s| s.trim() == "zstd")
            || self.content_type.eq_ignore_ascii_case("application/zstd")
            || self.name_hint.ends_with(".zst")
    }
}

/// Raw input after decompression, either still bytes or already transcoded.
pub(crate) enum Payload {
    Bytes(Vec<u8>),
    Text {
        text: String,
        charset: &'static Encoding,
        had_errors: bool,
    },
}

impl Payload {
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Payload::Bytes(bytes) => bytes.is_empty(),
            Payload::Text { text, .. } => text.is_empty(),
        }
    }
}

/// Wrap a reader with decompression chosen from `meta` (encoding -> type -> extension).
pub(crate) fn build_source_reader<'a, R>(raw: R, meta: &SourceMeta) -> Box<dyn AsyncRead + Unpin + Send + 'a>
where
    R: AsyncRead + Unpin + Send + 'a,
{
    let buf = BufReader::with_capacity(64 * 1024, raw);
    if meta.is_gzip() {
        Box::new(GzipDecoder::new(buf))
    } else if meta.is_zstd() {
        Box::new(ZstdDecoder::new(buf))
    } else {
        Box::new(buf)
    }
}

/// Read a source to completion. A declared charset is transcoded while streaming.
pub(crate) async fn read_payload<'a, R>(raw: R, meta: &SourceMeta) -> std::io::Result<Payload>
where
    R: AsyncRead + Unpin + Send + 'a,
{
    let mut reader = build_source_reader(raw, meta);

    match meta.charset {
        None => {
            let mut bytes = Vec::new();
            reader.read_to_end(&mut bytes).await?;
            Ok(Payload::Bytes(bytes))
        }
        Some(charset) => {
            let mut framed = FramedRead::new(reader, Transcoder::new(charset));
            let mut text = String::new();
            while let Some(chunk) = framed.try_next().await? {
                text.push_str(&chunk);
            }
            Ok(Payload::Text {
                text,
                charset,
                had_errors: framed.decoder().had_errors(),
            })
        }
    }
}

/// Lightweight meta for a local file, from its extension only.
pub fn meta_from_path(path: &Path) -> SourceMeta {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    let mut meta = SourceMeta {
        name_hint: name,
        ..Default::default()
    };

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    match ext {
        "gz" => {
            meta.content_type = "application/gzip".into();
            meta.content_encoding = "gzip".into();
        }
        "zst" => {
            meta.content_type = "application/zstd".into();
            meta.content_encoding = "zstd".into();
        }
        _ => {
            meta.content_type = "text/csv".into();
        }
    }
    meta
}

/// A path is usable when it is non-empty and has no interior NUL.
pub(crate) fn is_usable_path(path: &Path) -> bool {
    let raw = path.as_os_str().as_encoded_bytes();
    !raw.is_empty() && !raw.contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn extension_drives_compression() {
        assert!(meta_from_path(Path::new("data/rows.csv.gz")).is_gzip());
        assert!(meta_from_path(Path::new("rows.zst")).is_zstd());
        let plain = meta_from_path(Path::new("rows.csv"));
        assert!(!plain.is_gzip() && !plain.is_zstd());
        assert_eq!(plain.content_type, "text/csv");
        assert_eq!(plain.read_timeout, DEFAULT_READ_TIMEOUT);
    }

    #[test]
    fn unusable_paths() {
        assert!(!is_usable_path(Path::new("")));
        assert!(!is_usable_path(&PathBuf::from("bad\0name.csv")));
        assert!(is_usable_path(Path::new("rows.csv")));
    }

    #[tokio::test]
    async fn declared_charset_is_transcoded() {
        let meta = SourceMeta {
            charset: Some(encoding_rs::WINDOWS_1252),
            ..Default::default()
        };
        let payload = read_payload(&b"caf\xE9,ol\xE9"[..], &meta).await.unwrap();
        match payload {
            Payload::Text { text, had_errors, .. } => {
                assert_eq!(text, "café,olé");
                assert!(!had_errors);
            }
            Payload::Bytes(_) => panic!("expected transcoded text"),
        }
    }
}
