//! Metadata root and stream directory, plus heap accessors.

use crate::metadata::LoadError;

use super::pe::{truncated, Span};
use super::read::Cursor;

/// "BSJB" magic of the metadata root.
const METADATA_SIGNATURE: u32 = 0x424A_5342;

/// Byte ranges of the streams the reader uses, relative to the metadata
/// root. `#US` and `#GUID` are located but never read, so only their
/// presence matters for parsing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StreamDir {
    pub tables: Span,
    pub strings: Span,
    pub blobs: Span,
}

/// Parse the metadata root header and stream directory.
///
/// Only images with a compressed `#~` table stream are supported; the
/// uncompressed `#-` form (edit-and-continue output) is reported as a load
/// failure rather than silently misread.
pub(crate) fn parse_streams(metadata: &[u8]) -> Result<StreamDir, LoadError> {
    let mut cur = Cursor::new(metadata);

    let signature = cur.u32().ok_or_else(truncated)?;
    if signature != METADATA_SIGNATURE {
        return Err(LoadError::Failed("metadata signature mismatch".into()));
    }
    let _major = cur.u16().ok_or_else(truncated)?;
    let _minor = cur.u16().ok_or_else(truncated)?;
    let _reserved = cur.u32().ok_or_else(truncated)?;
    let version_len = cur.u32().ok_or_else(truncated)? as usize;
    cur.skip(version_len).ok_or_else(truncated)?;
    let _flags = cur.u16().ok_or_else(truncated)?;
    let stream_count = cur.u16().ok_or_else(truncated)?;

    let mut tables = None;
    let mut strings = None;
    let mut blobs = None;

    for _ in 0..stream_count {
        let offset = cur.u32().ok_or_else(truncated)? as usize;
        let size = cur.u32().ok_or_else(truncated)? as usize;
        let name = stream_name(&mut cur).ok_or_else(truncated)?;

        let span = Span { offset, len: size };
        if span.slice(metadata).is_none() {
            return Err(LoadError::Failed(format!("stream '{name}' extends past the metadata")));
        }
        match name.as_str() {
            "#~" => tables = Some(span),
            "#-" => {
                return Err(LoadError::Failed("uncompressed #- table stream is not supported".into()))
            }
            "#Strings" => strings = Some(span),
            "#Blob" => blobs = Some(span),
            // #US and #GUID carry nothing the walker needs.
            _ => {}
        }
    }

    let tables = tables.ok_or_else(|| LoadError::Failed("no #~ table stream".into()))?;
    let strings = strings.ok_or_else(|| LoadError::Failed("no #Strings heap".into()))?;
    // A #Blob heap is technically optional; images without one simply have
    // no signatures to read.
    let blobs = blobs.unwrap_or(Span { offset: 0, len: 0 });

    Ok(StreamDir { tables, strings, blobs })
}

/// Stream names are zero-terminated ASCII padded to a four-byte boundary.
fn stream_name(cur: &mut Cursor<'_>) -> Option<String> {
    let mut name = String::new();
    loop {
        let chunk = cur.bytes(4)?;
        for &b in chunk {
            if b == 0 {
                return Some(name);
            }
            name.push(b as char);
        }
        if name.len() > 32 {
            return None;
        }
    }
}

/// Read the zero-terminated UTF-8 string at `index` in the `#Strings` heap.
pub(crate) fn heap_string(strings: &[u8], index: u32) -> Option<&str> {
    let start = index as usize;
    if start >= strings.len() {
        return None;
    }
    let tail = &strings[start..];
    let end = tail.iter().position(|&b| b == 0)?;
    std::str::from_utf8(&tail[..end]).ok()
}

/// Read the length-prefixed blob at `index` in the `#Blob` heap.
pub(crate) fn heap_blob(blobs: &[u8], index: u32) -> Option<&[u8]> {
    let start = index as usize;
    if start >= blobs.len() {
        return None;
    }
    let mut cur = Cursor::new(&blobs[start..]);
    let len = cur.compressed_u32()? as usize;
    cur.bytes(len)
}
