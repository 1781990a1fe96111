//! Relocation Rewriter (§4.7): cleans up the `.reloc` base relocation
//! directory so it survives debug-section stripping and `.rossym`
//! insertion unchanged in meaning.
//!
//! Each block is validated against the section table — a block whose page
//! RVA no longer lands inside any section is dropped rather than carried
//! forward pointing at nothing — and exact byte-duplicate blocks (seen on
//! output from some linkers) collapse to one.

use crate::logging::log_warn;
use crate::util::align_up;
use crate::view::PeView;
use crate::{Error, Result};

pub struct RelocResult {
    /// The cleaned block stream, ready to be written back as the
    /// relocation section's raw data.
    pub data: Vec<u8>,
    pub blocks_dropped: usize,
}

/// Rewrite the base relocation directory found at `reloc_rva`/`reloc_size`.
pub fn rewrite(view: &PeView<'_>, reloc_rva: u32, reloc_size: u32) -> Result<RelocResult> {
    if reloc_size == 0 {
        return Ok(RelocResult {
            data: Vec::new(),
            blocks_dropped: 0,
        });
    }

    let section = view
        .section_containing_rva(reloc_rva)
        .ok_or_else(|| Error::bad_debug("relocation directory RVA has no containing section"))?;
    let raw = view
        .raw_section_data(section)
        .ok_or_else(|| Error::bad_debug("relocation section has no raw data"))?;
    let start = (reloc_rva - section.virtual_address.get()) as usize;
    let end = start
        .checked_add(reloc_size as usize)
        .ok_or_else(|| Error::bad_debug("relocation directory size overflows the file"))?;
    let blob = raw
        .get(start..end)
        .ok_or_else(|| Error::bad_debug("relocation directory is out of bounds"))?;

    let mut out = Vec::with_capacity(blob.len());
    let mut seen_blocks: Vec<&[u8]> = Vec::new();
    let mut dropped = 0usize;
    let mut offset = 0usize;

    while offset + 8 <= blob.len() {
        let header = &blob[offset..offset + 8];
        let page_rva = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let block_size = u32::from_le_bytes(header[4..8].try_into().unwrap()) as usize;
        if block_size < 8 || offset + block_size > blob.len() {
            break;
        }
        let whole_block = &blob[offset..offset + block_size];
        offset += block_size;

        if view.section_containing_rva(page_rva).is_none() {
            dropped += 1;
            continue;
        }
        if seen_blocks.contains(&whole_block) {
            dropped += 1;
            continue;
        }
        seen_blocks.push(whole_block);
        out.extend_from_slice(whole_block);
    }

    if dropped > 0 {
        log_warn!("dropped {} relocation block(s) during rewriting", dropped);
    }

    Ok(RelocResult {
        data: out,
        blocks_dropped: dropped,
    })
}

/// The raw size a section holding `content_len` bytes must occupy on
/// disk once it is the image's final section, rounded up to
/// `file_alignment`.
pub fn rounded_size_of_raw_data(content_len: u32, file_alignment: u32) -> u32 {
    align_up(content_len, file_alignment)
}
