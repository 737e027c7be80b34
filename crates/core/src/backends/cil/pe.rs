//! PE envelope: locating the CLR metadata inside an executable image.

use goblin::pe::PE;

use crate::metadata::LoadError;

use super::read::Cursor;

/// File placement of one PE section, kept for RVA translation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SectionSpan {
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub raw_offset: u32,
    pub raw_size: u32,
}

/// Byte range within the image file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn slice<'a>(&self, bytes: &'a [u8]) -> Option<&'a [u8]> {
        bytes.get(self.offset..self.offset.checked_add(self.len)?)
    }
}

/// Section table plus the located metadata root of a managed PE image.
#[derive(Debug, Clone)]
pub(crate) struct PeLayout {
    pub sections: Vec<SectionSpan>,
    pub metadata: Span,
}

/// Parse the PE envelope and follow the CLR runtime header (data directory
/// 14) to the metadata root.
///
/// Anything that is not a PE image, or a PE image with no CLR directory, is
/// [`LoadError::NotApplicable`]; a CLR directory pointing at garbage is
/// [`LoadError::Failed`].
pub(crate) fn parse_layout(bytes: &[u8]) -> Result<PeLayout, LoadError> {
    let pe = PE::parse(bytes).map_err(|_| LoadError::NotApplicable)?;

    let Some(optional) = pe.header.optional_header else {
        return Err(LoadError::NotApplicable);
    };
    let Some(clr) = optional.data_directories.get_clr_runtime_header() else {
        return Err(LoadError::NotApplicable);
    };
    if clr.virtual_address == 0 || clr.size == 0 {
        return Err(LoadError::NotApplicable);
    }

    let sections: Vec<SectionSpan> = pe
        .sections
        .iter()
        .map(|sec| SectionSpan {
            virtual_address: sec.virtual_address,
            virtual_size: sec.virtual_size,
            raw_offset: sec.pointer_to_raw_data,
            raw_size: sec.size_of_raw_data,
        })
        .collect();

    // From here on the file claims to be managed, so failures are reported.
    let cor20_offset = rva_to_offset(&sections, clr.virtual_address)
        .ok_or_else(|| LoadError::Failed("CLR header outside all sections".into()))?;
    let cor20 = bytes
        .get(cor20_offset..)
        .ok_or_else(|| LoadError::Failed("CLR header outside the file".into()))?;

    let mut cur = Cursor::new(cor20);
    let cb = cur.u32().ok_or_else(truncated)?;
    if cb < 72 {
        return Err(LoadError::Failed(format!("CLR header too small ({cb} bytes)")));
    }
    let _runtime_major = cur.u16().ok_or_else(truncated)?;
    let _runtime_minor = cur.u16().ok_or_else(truncated)?;
    let metadata_rva = cur.u32().ok_or_else(truncated)?;
    let metadata_size = cur.u32().ok_or_else(truncated)?;
    if metadata_rva == 0 || metadata_size == 0 {
        return Err(LoadError::Failed("CLR header has no metadata directory".into()));
    }

    let metadata_offset = rva_to_offset(&sections, metadata_rva)
        .ok_or_else(|| LoadError::Failed("metadata outside all sections".into()))?;
    let metadata = Span { offset: metadata_offset, len: metadata_size as usize };
    if metadata.slice(bytes).is_none() {
        return Err(LoadError::Failed("metadata extends past end of file".into()));
    }

    Ok(PeLayout { sections, metadata })
}

/// Translate an RVA to a file offset through the section table. Only the
/// raw-data-backed part of a section exists in the file; RVAs landing in
/// zero-fill tails translate to nothing.
pub(crate) fn rva_to_offset(sections: &[SectionSpan], rva: u32) -> Option<usize> {
    for sec in sections {
        let span = if sec.virtual_size == 0 { sec.raw_size } else { sec.virtual_size };
        if rva >= sec.virtual_address && rva < sec.virtual_address.saturating_add(span) {
            let delta = rva - sec.virtual_address;
            if delta >= sec.raw_size {
                return None;
            }
            return Some(sec.raw_offset as usize + delta as usize);
        }
    }
    None
}

pub(crate) fn truncated() -> LoadError {
    LoadError::Failed("CLR header truncated".into())
}
