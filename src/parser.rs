use crate::codec::{decode_detected, encode_verified, resolve_encoding};
use crate::decode::{assemble_records, decode, decode_rows};
use crate::io::{is_usable_path, meta_from_path, read_payload, Payload, SourceMeta};
use crate::{CsvParserError, CsvResult, Parsed, Record};
use encoding_rs::{Encoding, UTF_8};
use std::io::Read;
use std::path::Path;
use tokio::io::AsyncRead;
use tracing::debug;

/// Holds acquired text plus a target encoding, and decodes it on demand.
///
/// Every acquisition validates before it replaces anything: a failed call
/// leaves the previous buffer and encodings in place.
#[derive(Debug, Clone)]
pub struct CsvParser {
    data: Option<String>,
    encoding: &'static Encoding,
    source_encoding: &'static Encoding,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self {
            data: None,
            encoding: UTF_8,
            source_encoding: UTF_8,
        }
    }
}

impl CsvParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `text` as the buffer.
    pub fn from_string(&mut self, text: impl Into<String>) -> CsvResult<()> {
        let text = text.into();
        if text.is_empty() {
            return Err(CsvParserError::EmptyResource);
        }
        self.commit(text, UTF_8);
        Ok(())
    }

    /// Use raw bytes as the buffer, sniffing their source encoding.
    pub fn from_bytes(&mut self, bytes: &[u8]) -> CsvResult<()> {
        if bytes.is_empty() {
            return Err(CsvParserError::EmptyResource);
        }
        let (text, source) = decode_detected(bytes, self.encoding)?;
        self.accept_text(text, source)
    }

    /// Read a local file. `*.gz` and `*.zst` are decompressed.
    pub async fn from_path(&mut self, path: impl AsRef<Path>) -> CsvResult<()> {
        let path = path.as_ref();
        let meta = meta_from_path(path);
        self.from_path_with_meta(path, meta).await
    }

    /// Read a local file described by `meta` (charset, compression, timeout).
    pub async fn from_path_with_meta(
        &mut self,
        path: impl AsRef<Path>,
        meta: SourceMeta,
    ) -> CsvResult<()> {
        let path = path.as_ref();
        if !is_usable_path(path) {
            return Err(CsvParserError::InvalidPath(path.to_path_buf()));
        }
        let access = |source: std::io::Error| CsvParserError::InvalidAccess {
            path: path.to_path_buf(),
            source,
        };

        let metadata = tokio::fs::metadata(path).await.map_err(access)?;
        if !metadata.is_file() {
            return Err(access(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }
        let file = tokio::fs::File::open(path).await.map_err(access)?;

        let payload = tokio::time::timeout(meta.read_timeout, read_payload(file, &meta))
            .await
            .map_err(|_| CsvParserError::ReadTimeout(meta.read_timeout))?
            .map_err(access)?;
        debug!(path = %path.display(), "read local source");

        if payload.is_empty() {
            return self.from_string("");
        }
        self.accept_payload(payload)
    }

    /// Read an async resource to completion. The handle stays with the caller.
    pub async fn from_resource<R>(&mut self, reader: &mut R) -> CsvResult<()>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        self.from_resource_with_meta(reader, SourceMeta::default())
            .await
    }

    pub async fn from_resource_with_meta<R>(
        &mut self,
        reader: &mut R,
        meta: SourceMeta,
    ) -> CsvResult<()>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let payload = read_payload(reader, &meta)
            .await
            .map_err(CsvParserError::InvalidResource)?;
        if payload.is_empty() {
            return Err(CsvParserError::UnreadableResource);
        }
        debug!(source = %meta.name_hint, "read resource");
        self.accept_payload(payload)
    }

    /// Blocking counterpart of [`CsvParser::from_resource`].
    pub fn from_reader<R: Read + ?Sized>(&mut self, reader: &mut R) -> CsvResult<()> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(CsvParserError::InvalidResource)?;
        if bytes.is_empty() {
            return Err(CsvParserError::UnreadableResource);
        }
        self.from_bytes(&bytes)
    }

    fn accept_payload(&mut self, payload: Payload) -> CsvResult<()> {
        match payload {
            Payload::Bytes(bytes) => self.from_bytes(&bytes),
            Payload::Text {
                text,
                charset,
                had_errors,
            } => {
                if had_errors {
                    return Err(CsvParserError::InvalidEncoding(format!(
                        "input is not valid {}",
                        charset.name()
                    )));
                }
                self.accept_text(text, charset)
            }
        }
    }

    /// Last checks on decoded text before it becomes the buffer.
    fn accept_text(&mut self, text: String, source: &'static Encoding) -> CsvResult<()> {
        if text.is_empty() {
            return Err(CsvParserError::EmptyResource);
        }
        if text.contains('\0') {
            return Err(CsvParserError::InvalidDataType(
                "binary content is not delimited text".into(),
            ));
        }
        self.commit(text, source);
        Ok(())
    }

    fn commit(&mut self, text: String, source: &'static Encoding) {
        debug!(
            bytes = text.len(),
            source_encoding = source.name(),
            "buffer replaced"
        );
        self.data = Some(text);
        self.source_encoding = source;
    }

    /// Set the target encoding by label. An unknown label leaves the current one in place.
    pub fn set_encoding(&mut self, name: &str) -> CsvResult<()> {
        self.encoding = resolve_encoding(name)?;
        Ok(())
    }

    /// Canonical name of the target encoding, "UTF-8" by default.
    pub fn encoding(&self) -> &'static str {
        self.encoding.name()
    }

    /// Encoding the current buffer was detected (or declared) as.
    pub fn source_encoding(&self) -> &'static str {
        self.source_encoding.name()
    }

    /// The buffer converted to the target encoding.
    ///
    /// The conversion is checked by reading the bytes back; this catches
    /// unmappable characters but cannot prove what encoding a consumer will guess.
    pub fn encode(&self) -> CsvResult<Vec<u8>> {
        let data = self.data.as_deref().ok_or(CsvParserError::EmptyResource)?;
        encode_verified(data, self.encoding)
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Forget the buffer. The target encoding is kept.
    pub fn clear(&mut self) {
        self.data = None;
        self.source_encoding = UTF_8;
    }

    /// Decode the buffer, zipping rows with the first row when `with_headers` is set.
    pub fn parse(&self, with_headers: bool) -> Parsed {
        decode(self.data.as_deref(), with_headers)
    }

    pub fn parse_rows(&self) -> Vec<Vec<String>> {
        self.data.as_deref().map(decode_rows).unwrap_or_default()
    }

    pub fn parse_records(&self) -> Vec<Record> {
        assemble_records(self.parse_rows())
    }
}
