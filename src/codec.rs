use crate::{CsvParserError, CsvResult};
use bytes::{Buf, BytesMut};
use encoding_rs::{Encoding, REPLACEMENT, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use std::io;
use tokio_util::codec::Decoder;

/// Streaming decoder from a declared charset into UTF-8 text chunks.
pub struct Transcoder {
    decoder: encoding_rs::Decoder,
    had_errors: bool,
    finished: bool,
}

impl Transcoder {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder_with_bom_removal(),
            had_errors: false,
            finished: false,
        }
    }

    /// True once any malformed sequence was replaced with U+FFFD.
    pub fn had_errors(&self) -> bool {
        self.had_errors
    }

    fn output_buffer(&self, len: usize) -> String {
        String::with_capacity(
            self.decoder
                .max_utf8_buffer_length(len)
                .unwrap_or_else(|| len * 3 + 4),
        )
    }
}

impl Decoder for Transcoder {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() || self.finished {
            return Ok(None);
        }

        let mut out = self.output_buffer(src.len());
        let (_result, bytes_read, had_errors) = self.decoder.decode_to_string(src, &mut out, false);
        self.had_errors |= had_errors;
        src.advance(bytes_read);

        // Partial sequences are buffered inside the decoder until more input arrives.
        if out.is_empty() {
            return Ok(None);
        }
        Ok(Some(out))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.finished {
            return Ok(None);
        }
        self.finished = true;

        let mut out = self.output_buffer(buf.len());
        let (_result, _bytes_read, had_errors) = self.decoder.decode_to_string(buf, &mut out, true);
        self.had_errors |= had_errors;
        buf.clear();

        if out.is_empty() {
            Ok(None)
        } else {
            Ok(Some(out))
        }
    }
}

/// Resolve an encoding label ("UTF-8", "latin1", "ASCII", ...) to a supported encoding.
pub fn resolve_encoding(label: &str) -> CsvResult<&'static Encoding> {
    let label = label.trim();
    if label.is_empty() {
        return Err(CsvParserError::InvalidEncoding("empty encoding name".into()));
    }
    match Encoding::for_label_no_replacement(label.as_bytes()) {
        Some(encoding) if encoding != REPLACEMENT => Ok(encoding),
        _ => Err(CsvParserError::InvalidEncoding(format!(
            "unsupported encoding: {label}"
        ))),
    }
}

/// Best-effort guess of the encoding `bytes` were written in.
///
/// A BOM wins, then UTF-8 validity. Anything else falls back to `preferred`,
/// or windows-1252 when `preferred` is UTF-8 itself.
pub(crate) fn detect_encoding(bytes: &[u8], preferred: &'static Encoding) -> &'static Encoding {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    if Encoding::utf8_valid_up_to(bytes) == bytes.len() {
        return UTF_8;
    }
    if preferred == UTF_8 {
        WINDOWS_1252
    } else {
        preferred
    }
}

/// Decode `bytes` with a detected source encoding. Returns the text and the encoding used.
pub(crate) fn decode_detected(
    bytes: &[u8],
    preferred: &'static Encoding,
) -> CsvResult<(String, &'static Encoding)> {
    let source = detect_encoding(bytes, preferred);
    let (text, had_errors) = source.decode_with_bom_removal(bytes);
    if had_errors {
        return Err(CsvParserError::InvalidEncoding(format!(
            "input is not valid {}",
            source.name()
        )));
    }
    Ok((text.into_owned(), source))
}

/// Encode `text` into `target`, verifying the output actually reads back as `target`.
///
/// Verification is heuristic: short ASCII-only output is valid under many
/// encodings, so passing it says nothing about which one a reader will guess.
pub(crate) fn encode_verified(text: &str, target: &'static Encoding) -> CsvResult<Vec<u8>> {
    let bytes = if target == UTF_16LE {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    } else if target == UTF_16BE {
        text.encode_utf16().flat_map(u16::to_be_bytes).collect()
    } else {
        let (encoded, used, unmappable) = target.encode(text);
        if unmappable || used != target {
            return Err(CsvParserError::InvalidEncoding(format!(
                "content cannot be represented in {}",
                target.name()
            )));
        }
        encoded.into_owned()
    };

    if let Some((bom_encoding, _)) = Encoding::for_bom(&bytes) {
        if bom_encoding != target {
            return Err(CsvParserError::InvalidEncoding(format!(
                "converted content looks like {}, expected {}",
                bom_encoding.name(),
                target.name()
            )));
        }
    }

    let (round_trip, had_errors) = target.decode_without_bom_handling(&bytes);
    if had_errors || round_trip != text {
        return Err(CsvParserError::InvalidEncoding(format!(
            "converted content does not verify as {}",
            target.name()
        )));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_common_labels() {
        assert_eq!(resolve_encoding("UTF-8").unwrap(), UTF_8);
        assert_eq!(resolve_encoding("utf8").unwrap(), UTF_8);
        assert_eq!(resolve_encoding("ASCII").unwrap(), WINDOWS_1252);
        assert_eq!(resolve_encoding(" latin1 ").unwrap(), WINDOWS_1252);
    }

    #[test]
    fn rejects_unknown_and_replacement_labels() {
        assert!(matches!(
            resolve_encoding("FOO-9"),
            Err(CsvParserError::InvalidEncoding(_))
        ));
        assert!(resolve_encoding("").is_err());
        assert!(resolve_encoding("iso-2022-kr").is_err());
    }

    #[test]
    fn detection_prefers_bom_then_utf8() {
        assert_eq!(detect_encoding(b"\xFF\xFEa\0", UTF_8), UTF_16LE);
        assert_eq!(detect_encoding("zażółć".as_bytes(), WINDOWS_1252), UTF_8);
        assert_eq!(detect_encoding(b"caf\xE9", UTF_8), WINDOWS_1252);
        let latin2 = Encoding::for_label(b"iso-8859-2").unwrap();
        assert_eq!(detect_encoding(b"caf\xE9", latin2), latin2);
    }

    #[test]
    fn encodes_utf16_directly() {
        let bytes = encode_verified("a;b", UTF_16BE).unwrap();
        assert_eq!(bytes, vec![0, b'a', 0, b';', 0, b'b']);
    }

    #[test]
    fn unmappable_characters_fail_verification() {
        assert!(matches!(
            encode_verified("zażółć", WINDOWS_1252),
            Err(CsvParserError::InvalidEncoding(_))
        ));
        assert_eq!(encode_verified("café", WINDOWS_1252).unwrap(), b"caf\xE9");
    }
}
