//! PE View (§4.2 of the system overview): read-only, borrowed accessors
//! over an input image's headers, section table, and the debug-info blobs
//! those sections carry.

use crate::format::{
    self, ImageDataDirectory, ImageDosHeader, ImageFileHeader, ImageSectionHeader,
    ImageSymbol, IMAGE_DOS_SIGNATURE, IMAGE_NT_OPTIONAL_HDR32_MAGIC,
    IMAGE_NT_OPTIONAL_HDR64_MAGIC, IMAGE_NT_SIGNATURE,
};
use crate::pod::Bytes;
use crate::{Error, Result};

// Byte offsets of the fields this tool reads within the optional header,
// split by PE32 vs PE32+ width. `section_alignment`, `file_alignment`,
// `size_of_image`, `size_of_headers` and `check_sum` land at the same
// offset in both widths, since the only fields that change width or get
// dropped (`BaseOfData`, `ImageBase`, the stack/heap reserve/commit pairs)
// lie entirely before or after this block.
pub(crate) const OPT_SECTION_ALIGNMENT: usize = 32;
pub(crate) const OPT_FILE_ALIGNMENT: usize = 36;
pub(crate) const OPT_SIZE_OF_IMAGE: usize = 56;
pub(crate) const OPT_SIZE_OF_HEADERS: usize = 60;
pub(crate) const OPT_CHECK_SUM: usize = 64;

const OPT32_IMAGE_BASE: usize = 28;
const OPT64_IMAGE_BASE: usize = 24;
const OPT32_NUMBER_OF_RVA_AND_SIZES: usize = 92;
const OPT64_NUMBER_OF_RVA_AND_SIZES: usize = 108;
const OPT32_DATA_DIRECTORY: usize = 96;
const OPT64_DATA_DIRECTORY: usize = 112;

/// Byte offset of data directory `index` within the optional header, for
/// the given width. Used by the writer to patch the base relocation
/// directory's size after relocation rewriting.
pub(crate) fn data_directory_offset(is_64: bool, index: usize) -> usize {
    let base = if is_64 {
        OPT64_DATA_DIRECTORY
    } else {
        OPT32_DATA_DIRECTORY
    };
    base + index * std::mem::size_of::<ImageDataDirectory>()
}

/// A read-only view over a PE image's structure.
///
/// Borrows the input slice for its whole lifetime; nothing here is copied.
#[derive(Debug)]
pub struct PeView<'data> {
    data: &'data [u8],
    dos_header: &'data ImageDosHeader,
    nt_header_offset: usize,
    file_header: &'data ImageFileHeader,
    optional_header: &'data [u8],
    is_64: bool,
    sections: &'data [ImageSectionHeader],
    coff_string_table: &'data [u8],
}

impl<'data> PeView<'data> {
    /// Parse `data` as a PE image.
    ///
    /// Returns `Ok(None)` if `data` begins with the ELF magic (§6: ELF
    /// pass-through is a successful no-op, not a parse error).
    pub fn parse(data: &'data [u8]) -> Result<Option<Self>> {
        if data.starts_with(&format::ELF_MAGIC) {
            return Ok(None);
        }

        let dos_header: &ImageDosHeader = Bytes(data)
            .read_at(0)
            .map_err(|()| Error::not_pe("file is too short for a DOS header"))?;
        if dos_header.e_magic.get() != IMAGE_DOS_SIGNATURE {
            return Err(Error::not_pe("missing MZ signature"));
        }

        let nt_header_offset = dos_header.e_lfanew.get() as usize;
        let mut cursor = Bytes(data);
        cursor
            .skip(nt_header_offset)
            .map_err(|()| Error::not_pe("e_lfanew points outside the file"))?;
        let signature = cursor
            .read_bytes(4)
            .map_err(|()| Error::not_pe("file too short for NT signature"))?;
        if u32::from_le_bytes(signature.0.try_into().unwrap()) != IMAGE_NT_SIGNATURE {
            return Err(Error::not_pe("missing PE\\0\\0 signature"));
        }

        let file_header: &ImageFileHeader = cursor
            .read()
            .map_err(|()| Error::not_pe("file too short for COFF file header"))?;

        let optional_header = cursor
            .read_bytes(file_header.size_of_optional_header.get() as usize)
            .map_err(|()| Error::not_pe("file too short for optional header"))?
            .0;
        let magic = optional_header
            .get(0..2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .ok_or_else(|| Error::not_pe("optional header too short for magic"))?;
        let is_64 = match magic {
            IMAGE_NT_OPTIONAL_HDR32_MAGIC => false,
            IMAGE_NT_OPTIONAL_HDR64_MAGIC => true,
            _ => return Err(Error::not_pe("unrecognized optional header magic")),
        };

        let sections = cursor
            .read_slice(file_header.number_of_sections.get() as usize)
            .map_err(|()| Error::not_pe("file too short for section headers"))?;

        let coff_string_table = Self::read_coff_string_table(data, file_header)?;

        Ok(Some(Self {
            data,
            dos_header,
            nt_header_offset,
            file_header,
            optional_header,
            is_64,
            sections,
            coff_string_table,
        }))
    }

    fn read_coff_string_table(
        data: &'data [u8],
        file_header: &ImageFileHeader,
    ) -> Result<&'data [u8]> {
        let symbol_table_offset = file_header.pointer_to_symbol_table.get() as usize;
        if symbol_table_offset == 0 {
            return Ok(&[]);
        }
        let symbol_count = file_header.number_of_symbols.get() as usize;
        let string_table_offset = symbol_table_offset
            .checked_add(symbol_count * std::mem::size_of::<ImageSymbol>())
            .ok_or_else(|| Error::bad_debug("COFF symbol table overflows the file"))?;
        let length_bytes = data
            .get(string_table_offset..string_table_offset + 4)
            .ok_or_else(|| Error::bad_debug("COFF string table length is out of bounds"))?;
        let length = u32::from_le_bytes(length_bytes.try_into().unwrap()) as usize;
        data.get(string_table_offset..string_table_offset + length)
            .ok_or_else(|| Error::bad_debug("COFF string table body is out of bounds"))
    }

    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    pub fn dos_header(&self) -> &'data ImageDosHeader {
        self.dos_header
    }

    pub fn nt_header_offset(&self) -> usize {
        self.nt_header_offset
    }

    pub fn file_header(&self) -> &'data ImageFileHeader {
        self.file_header
    }

    pub fn is_64(&self) -> bool {
        self.is_64
    }

    pub fn optional_header_bytes(&self) -> &'data [u8] {
        self.optional_header
    }

    pub fn sections(&self) -> &'data [ImageSectionHeader] {
        self.sections
    }

    /// `ImageBase`, widened to `u64` regardless of PE32/PE32+.
    pub fn image_base(&self) -> u64 {
        let offset = if self.is_64 {
            OPT64_IMAGE_BASE
        } else {
            OPT32_IMAGE_BASE
        };
        if self.is_64 {
            read_u64(self.optional_header, offset)
        } else {
            read_u32(self.optional_header, offset) as u64
        }
    }

    pub fn section_alignment(&self) -> u32 {
        read_u32(self.optional_header, OPT_SECTION_ALIGNMENT)
    }

    pub fn file_alignment(&self) -> u32 {
        read_u32(self.optional_header, OPT_FILE_ALIGNMENT)
    }

    pub fn size_of_image(&self) -> u32 {
        read_u32(self.optional_header, OPT_SIZE_OF_IMAGE)
    }

    pub fn size_of_headers(&self) -> u32 {
        read_u32(self.optional_header, OPT_SIZE_OF_HEADERS)
    }

    pub fn check_sum(&self) -> u32 {
        read_u32(self.optional_header, OPT_CHECK_SUM)
    }

    pub fn number_of_rva_and_sizes(&self) -> u32 {
        let offset = if self.is_64 {
            OPT64_NUMBER_OF_RVA_AND_SIZES
        } else {
            OPT32_NUMBER_OF_RVA_AND_SIZES
        };
        read_u32(self.optional_header, offset)
    }

    /// The `index`'th data directory entry, or `None` if the optional
    /// header's `NumberOfRvaAndSizes` does not extend that far.
    pub fn data_directory(&self, index: usize) -> Option<ImageDataDirectory> {
        if index >= self.number_of_rva_and_sizes() as usize {
            return None;
        }
        let base = if self.is_64 {
            OPT64_DATA_DIRECTORY
        } else {
            OPT32_DATA_DIRECTORY
        };
        let offset = base + index * std::mem::size_of::<ImageDataDirectory>();
        Bytes(self.optional_header).read_at(offset).ok().copied()
    }

    /// Resolve a section's possibly-long name, following the `/<n>`
    /// indirection into the COFF string table.
    pub fn section_name(&self, section: &ImageSectionHeader) -> &'data [u8] {
        if let Some(offset) = format::long_name_offset(&section.name) {
            if let Ok(name) = Bytes(self.coff_string_table).read_string_at(offset as usize) {
                return name;
            }
        }
        format::section_short_name(&section.name)
    }

    /// Find the section whose `[VirtualAddress, VirtualAddress+VirtualSize)`
    /// range contains `rva`.
    pub fn section_containing_rva(&self, rva: u32) -> Option<&'data ImageSectionHeader> {
        self.section_index_containing_rva(rva).map(|i| &self.sections[i])
    }

    /// As [`Self::section_containing_rva`], but returns the section's index
    /// into [`Self::sections`].
    pub fn section_index_containing_rva(&self, rva: u32) -> Option<usize> {
        self.sections.iter().position(|s| {
            let start = s.virtual_address.get();
            let size = s.virtual_size.get().max(s.size_of_raw_data.get());
            rva >= start && rva < start.saturating_add(size)
        })
    }

    /// Section content by resolved name, e.g. `.stab` or `.stabstr`.
    pub fn section_data_by_name(&self, name: &[u8]) -> Option<&'data [u8]> {
        let section = self.sections.iter().find(|s| self.section_name(s) == name)?;
        self.raw_section_data(section)
    }

    pub fn raw_section_data(&self, section: &ImageSectionHeader) -> Option<&'data [u8]> {
        let start = section.pointer_to_raw_data.get() as usize;
        let size = section.size_of_raw_data.get() as usize;
        if start == 0 || size == 0 {
            return None;
        }
        self.data.get(start..start.checked_add(size)?)
    }

    pub fn coff_string_table(&self) -> &'data [u8] {
        self.coff_string_table
    }

    /// The COFF symbol table, if the file header references one.
    pub fn coff_symbols(&self) -> &'data [ImageSymbol] {
        let count = self.file_header.number_of_symbols.get() as usize;
        if count == 0 {
            return &[];
        }
        let offset = self.file_header.pointer_to_symbol_table.get() as usize;
        Bytes(self.data).read_slice_at(offset, count).unwrap_or(&[])
    }

    /// Whether any section uses the `/<n>` long-name indirection, meaning
    /// the COFF long-name string table must be preserved in the output
    /// (§4.8 step 7).
    pub fn uses_long_section_names(&self) -> bool {
        self.sections
            .iter()
            .any(|s| format::long_name_offset(&s.name).is_some())
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    bytes
        .get(offset..offset + 4)
        .map(|b| u32::from_le_bytes(b.try_into().unwrap()))
        .unwrap_or(0)
}

fn read_u64(bytes: &[u8], offset: usize) -> u64 {
    bytes
        .get(offset..offset + 8)
        .map(|b| u64::from_le_bytes(b.try_into().unwrap()))
        .unwrap_or(0)
}
