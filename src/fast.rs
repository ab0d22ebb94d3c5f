use crate::io::is_usable_path;
use crate::{CsvParser, CsvParserError, CsvResult};
use memchr::memchr;
use memmap2::MmapOptions;
use std::fs::File;
use std::path::Path;
use tracing::debug;

impl CsvParser {
    /// Synchronous path acquisition over a memory map.
    /// Assumptions: uncompressed, small enough to decode in one piece.
    pub fn from_path_mapped(&mut self, path: impl AsRef<Path>) -> CsvResult<()> {
        let path = path.as_ref();
        if !is_usable_path(path) {
            return Err(CsvParserError::InvalidPath(path.to_path_buf()));
        }
        let access = |source: std::io::Error| CsvParserError::InvalidAccess {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(access)?;
        let metadata = file.metadata().map_err(access)?;
        if !metadata.is_file() {
            return Err(access(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }
        // Zero-length maps are rejected on some platforms
        if metadata.len() == 0 {
            return self.from_string("");
        }

        let mmap = unsafe { MmapOptions::new().map(&file)? };
        let data: &[u8] = &mmap[..];

        // Reject binary content before paying for a full decode
        if let Some(at) = memchr(0, data) {
            if !has_utf16_bom(data) {
                return Err(CsvParserError::InvalidDataType(format!(
                    "NUL byte at offset {at}; binary content is not delimited text"
                )));
            }
        }
        debug!(path = %path.display(), bytes = data.len(), "mapped local source");
        self.from_bytes(data)
    }
}

fn has_utf16_bom(data: &[u8]) -> bool {
    data.starts_with(&[0xFF, 0xFE]) || data.starts_with(&[0xFE, 0xFF])
}
