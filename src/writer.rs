//! PE Writer (§4.8): rebuilds the image with debug sections stripped and,
//! when there is anything to embed, a new `.rossym` section appended.

use crate::checksum;
use crate::endian::{U16LE, U32LE};
use crate::format::{
    self, ImageFileHeader, ImageSectionHeader, IMAGE_DIRECTORY_ENTRY_BASERELOC,
    IMAGE_FILE_DEBUG_STRIPPED, IMAGE_FILE_LINE_NUMS_STRIPPED, IMAGE_FILE_LOCAL_SYMS_STRIPPED,
    ROSSYM_SECTION_CHARACTERISTICS,
};
use crate::pod;
use crate::util::align_up;
use crate::view::{self, PeView};
use crate::Result;

const DEBUG_SECTION_NAMES: &[&[u8]] = &[b".stab", b".stabstr"];

fn is_debug_section(name: &[u8]) -> bool {
    DEBUG_SECTION_NAMES.contains(&name) || name.starts_with(b".debug_")
}

/// Replacement content for whichever section holds the base relocation
/// directory, produced by [`crate::reloc::rewrite`].
pub struct RelocPatch {
    pub section_index: usize,
    pub data: Vec<u8>,
}

/// The `.rossym` section to append, or omit entirely if there is nothing
/// to embed (§4.9: an empty merge means no section is added at all).
pub struct RossymSection {
    pub data: Vec<u8>,
}

struct Kept {
    name: Vec<u8>,
    virtual_address: u32,
    virtual_size: u32,
    characteristics: u32,
    raw: Vec<u8>,
}

/// Rebuild the image, stripping debug sections and appending `.rossym` if
/// `rossym` is given.
pub fn write(
    view: &PeView<'_>,
    reloc_patch: Option<&RelocPatch>,
    rossym: Option<&RossymSection>,
) -> Result<Vec<u8>> {
    let section_alignment = view.section_alignment().max(1);
    let file_alignment = view.file_alignment().max(1);

    let mut kept: Vec<Kept> = Vec::new();
    for (i, section) in view.sections().iter().enumerate() {
        let name = view.section_name(section).to_vec();
        if is_debug_section(&name) {
            continue;
        }
        let patched = reloc_patch.filter(|p| p.section_index == i);
        let raw = match patched {
            Some(p) => p.data.clone(),
            None => view.raw_section_data(section).unwrap_or(&[]).to_vec(),
        };
        let virtual_size = match patched {
            Some(p) => p.data.len() as u32,
            None => section.virtual_size.get(),
        };
        kept.push(Kept {
            name,
            virtual_address: section.virtual_address.get(),
            virtual_size,
            characteristics: section.characteristics.get(),
            raw,
        });
    }

    if let Some(rossym) = rossym {
        let next_va = align_up(
            kept.iter()
                .map(|s| s.virtual_address + s.virtual_size)
                .max()
                .unwrap_or(0),
            section_alignment,
        );
        kept.push(Kept {
            name: b".rossym".to_vec(),
            virtual_address: next_va,
            virtual_size: rossym.data.len() as u32,
            characteristics: ROSSYM_SECTION_CHARACTERISTICS,
            raw: rossym.data.clone(),
        });
    }

    // Resolve section names, building a fresh long-name string table for
    // any name too long to fit inline (§4.8 step 7).
    let mut string_table = vec![0u8; 4];
    let mut name_fields = Vec::with_capacity(kept.len());
    for s in &kept {
        name_fields.push(if s.name.len() <= 8 {
            let mut field = [0u8; 8];
            field[..s.name.len()].copy_from_slice(&s.name);
            field
        } else {
            let offset = string_table.len() as u32;
            string_table.extend_from_slice(&s.name);
            string_table.push(0);
            let marker = format!("/{offset}");
            let mut field = [0u8; 8];
            field[..marker.len()].copy_from_slice(marker.as_bytes());
            field
        });
    }
    let keep_string_table = string_table.len() > 4;
    if keep_string_table {
        let len = string_table.len() as u32;
        string_table[0..4].copy_from_slice(&len.to_le_bytes());
    }

    let nt_header_offset = view.nt_header_offset();
    let optional_header_len = view.optional_header_bytes().len();
    let header_len = nt_header_offset + 4 + 20 + optional_header_len + 40 * kept.len();
    let size_of_headers = align_up(header_len as u32, file_alignment);

    let mut raw_offsets = Vec::with_capacity(kept.len());
    let mut cursor = size_of_headers;
    for s in &kept {
        raw_offsets.push(cursor);
        cursor += align_up(s.raw.len() as u32, file_alignment);
    }
    let string_table_offset = cursor;

    let size_of_image = align_up(
        kept.iter()
            .map(|s| s.virtual_address + s.virtual_size)
            .max()
            .unwrap_or(section_alignment),
        section_alignment,
    );

    let new_characteristics = view.file_header().characteristics.get()
        | IMAGE_FILE_DEBUG_STRIPPED
        | IMAGE_FILE_LINE_NUMS_STRIPPED
        | IMAGE_FILE_LOCAL_SYMS_STRIPPED;

    let mut out = Vec::with_capacity(cursor as usize + string_table.len());
    out.extend_from_slice(&view.data()[..nt_header_offset]);
    out.extend_from_slice(&format::IMAGE_NT_SIGNATURE.to_le_bytes());

    let file_header = ImageFileHeader {
        machine: view.file_header().machine,
        number_of_sections: U16LE::from(kept.len() as u16),
        time_date_stamp: view.file_header().time_date_stamp,
        pointer_to_symbol_table: U32LE::from(if keep_string_table {
            string_table_offset
        } else {
            0
        }),
        number_of_symbols: U32LE::from(0),
        size_of_optional_header: view.file_header().size_of_optional_header,
        characteristics: U16LE::from(new_characteristics),
    };
    out.extend_from_slice(pod::bytes_of(&file_header));

    let checksum_field_offset = out.len() + view::OPT_CHECK_SUM;
    let mut optional_header = view.optional_header_bytes().to_vec();
    patch_u32(&mut optional_header, view::OPT_SIZE_OF_IMAGE, size_of_image);
    patch_u32(&mut optional_header, view::OPT_SIZE_OF_HEADERS, size_of_headers);
    patch_u32(&mut optional_header, view::OPT_CHECK_SUM, 0);
    if let Some(patch) = reloc_patch {
        let offset = view::data_directory_offset(view.is_64(), IMAGE_DIRECTORY_ENTRY_BASERELOC);
        patch_u32(&mut optional_header, offset + 4, patch.data.len() as u32);
    }
    out.extend_from_slice(&optional_header);

    for ((s, name_field), &offset) in kept.iter().zip(&name_fields).zip(&raw_offsets) {
        let section_header = ImageSectionHeader {
            name: *name_field,
            virtual_size: U32LE::from(s.virtual_size),
            virtual_address: U32LE::from(s.virtual_address),
            size_of_raw_data: U32LE::from(align_up(s.raw.len() as u32, file_alignment)),
            pointer_to_raw_data: U32LE::from(offset),
            pointer_to_relocations: U32LE::from(0),
            pointer_to_linenumbers: U32LE::from(0),
            number_of_relocations: U16LE::from(0),
            number_of_linenumbers: U16LE::from(0),
            characteristics: U32LE::from(s.characteristics),
        };
        out.extend_from_slice(pod::bytes_of(&section_header));
    }

    out.resize(size_of_headers as usize, 0);
    for (s, &offset) in kept.iter().zip(&raw_offsets) {
        out.resize(offset as usize, 0);
        out.extend_from_slice(&s.raw);
        out.resize(offset as usize + align_up(s.raw.len() as u32, file_alignment) as usize, 0);
    }
    if keep_string_table {
        out.resize(string_table_offset as usize, 0);
        out.extend_from_slice(&string_table);
    }

    let computed_checksum = checksum::compute(&out, checksum_field_offset);
    out[checksum_field_offset..checksum_field_offset + 4]
        .copy_from_slice(&computed_checksum.to_le_bytes());

    Ok(out)
}

fn patch_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
