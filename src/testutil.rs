//! Synthetic minimal PE32/PE32+ images, assembled byte-by-byte from the
//! layouts in [`crate::format`]. No fixture binaries ship in this crate, so
//! every test that needs an input image builds one with [`MinimalPe`].

#![cfg(test)]

use crate::format::{IMAGE_DOS_SIGNATURE, IMAGE_NT_SIGNATURE, IMAGE_SCN_MEM_READ};

const FILE_ALIGNMENT: u32 = 0x200;

#[derive(Clone)]
pub struct SectionSpec {
    pub name: [u8; 8],
    pub virtual_address: u32,
    pub virtual_size: u32,
    pub raw_data: Vec<u8>,
    pub characteristics: u32,
}

impl SectionSpec {
    pub fn new(name: &[u8], virtual_address: u32, raw_data: Vec<u8>) -> Self {
        let mut padded = [0u8; 8];
        padded[..name.len()].copy_from_slice(name);
        Self::with_name_field(padded, virtual_address, raw_data)
    }

    /// Build a section whose 8-byte `Name` field is an explicit `/<n>`
    /// long-name indirection (or any other raw field content).
    pub fn with_name_field(name_field: [u8; 8], virtual_address: u32, raw_data: Vec<u8>) -> Self {
        let virtual_size = raw_data.len() as u32;
        Self {
            name: name_field,
            virtual_address,
            virtual_size,
            raw_data,
            characteristics: IMAGE_SCN_MEM_READ,
        }
    }
}

pub struct MinimalPe {
    is_64: bool,
    sections: Vec<SectionSpec>,
    coff_symbols: Vec<u8>,
    coff_string_table: Vec<u8>,
    data_directories: [(u32, u32); 16],
}

impl MinimalPe {
    pub const IMAGE_BASE: u32 = 0x0040_0000;

    pub fn new32() -> Self {
        Self {
            is_64: false,
            sections: vec![SectionSpec::new(b".text", 0x1000, vec![0u8; 0x200])],
            coff_symbols: Vec::new(),
            coff_string_table: Vec::new(),
            data_directories: [(0, 0); 16],
        }
    }

    pub fn new64() -> Self {
        let mut pe = Self::new32();
        pe.is_64 = true;
        pe
    }

    pub fn with_sections(mut self, sections: Vec<SectionSpec>) -> Self {
        self.sections = sections;
        self
    }

    pub fn push_section(mut self, section: SectionSpec) -> Self {
        self.sections.push(section);
        self
    }

    /// `symbols` is a pre-packed sequence of 18-byte COFF symbol entries.
    /// `names` are the long names referenced from `symbols`, in the order
    /// their string-table offsets were assigned.
    pub fn with_coff_symbols(mut self, symbols: Vec<u8>, names: &[&[u8]]) -> Self {
        self.coff_symbols = symbols;
        let mut table = Vec::new();
        table.extend_from_slice(&[0u8; 4]); // length, patched below
        for name in names {
            table.extend_from_slice(name);
            table.push(0);
        }
        let len = table.len() as u32;
        table[0..4].copy_from_slice(&len.to_le_bytes());
        self.coff_string_table = table;
        self
    }

    pub fn with_data_directory(mut self, index: usize, rva: u32, size: u32) -> Self {
        self.data_directories[index] = (rva, size);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let optional_header_size: u16 = if self.is_64 { 240 } else { 224 };
        let nt_header_offset: u32 = 0x80;
        let headers_len = nt_header_offset as usize
            + 4
            + 20
            + optional_header_size as usize
            + 40 * self.sections.len();
        let headers_len_aligned = align_up(headers_len as u32, FILE_ALIGNMENT);

        let mut section_offsets = Vec::with_capacity(self.sections.len());
        let mut cursor = headers_len_aligned;
        for section in &self.sections {
            section_offsets.push(cursor);
            cursor += align_up(section.raw_data.len() as u32, FILE_ALIGNMENT);
        }
        let symbol_table_offset = cursor;
        let number_of_symbols = (self.coff_symbols.len() / 18) as u32;

        let mut image = vec![0u8; 64];
        image[0..2].copy_from_slice(&IMAGE_DOS_SIGNATURE.to_le_bytes());
        image[60..64].copy_from_slice(&nt_header_offset.to_le_bytes());
        image.resize(nt_header_offset as usize, 0);

        image.extend_from_slice(&IMAGE_NT_SIGNATURE.to_le_bytes());

        // IMAGE_FILE_HEADER
        push_u16(&mut image, 0x014c); // machine: I386
        push_u16(&mut image, self.sections.len() as u16);
        push_u32(&mut image, 0); // time_date_stamp
        push_u32(
            &mut image,
            if number_of_symbols > 0 || !self.coff_string_table.is_empty() {
                symbol_table_offset
            } else {
                0
            },
        );
        push_u32(&mut image, number_of_symbols);
        push_u16(&mut image, optional_header_size);
        push_u16(&mut image, 0);

        let size_of_image = self
            .sections
            .last()
            .map(|s| align_up(s.virtual_address + s.virtual_size, 0x1000))
            .unwrap_or(0x1000);
        self.push_optional_header(&mut image, headers_len_aligned, size_of_image);

        for (section, &raw_offset) in self.sections.iter().zip(&section_offsets) {
            image.extend_from_slice(&section.name);
            push_u32(&mut image, section.virtual_size);
            push_u32(&mut image, section.virtual_address);
            push_u32(&mut image, align_up(section.raw_data.len() as u32, FILE_ALIGNMENT));
            push_u32(&mut image, raw_offset);
            push_u32(&mut image, 0); // pointer_to_relocations
            push_u32(&mut image, 0); // pointer_to_linenumbers
            push_u16(&mut image, 0);
            push_u16(&mut image, 0);
            push_u32(&mut image, section.characteristics);
        }

        image.resize(headers_len_aligned as usize, 0);
        for (section, &raw_offset) in self.sections.iter().zip(&section_offsets) {
            image.resize(raw_offset as usize, 0);
            image.extend_from_slice(&section.raw_data);
            image.resize(
                raw_offset as usize + align_up(section.raw_data.len() as u32, FILE_ALIGNMENT) as usize,
                0,
            );
        }

        if number_of_symbols > 0 || !self.coff_string_table.is_empty() {
            image.resize(symbol_table_offset as usize, 0);
            image.extend_from_slice(&self.coff_symbols);
            image.extend_from_slice(&self.coff_string_table);
        }

        image
    }

    fn push_optional_header(&self, image: &mut Vec<u8>, size_of_headers: u32, size_of_image: u32) {
        let magic: u16 = if self.is_64 { 0x20b } else { 0x10b };
        push_u16(image, magic);
        image.push(0); // MajorLinkerVersion
        image.push(0); // MinorLinkerVersion
        push_u32(image, 0); // SizeOfCode
        push_u32(image, 0); // SizeOfInitializedData
        push_u32(image, 0); // SizeOfUninitializedData
        push_u32(image, self.sections.first().map(|s| s.virtual_address).unwrap_or(0));
        push_u32(image, self.sections.first().map(|s| s.virtual_address).unwrap_or(0));
        if !self.is_64 {
            push_u32(image, 0); // BaseOfData
            push_u32(image, Self::IMAGE_BASE);
        } else {
            push_u64(image, Self::IMAGE_BASE as u64);
        }
        push_u32(image, 0x1000); // SectionAlignment
        push_u32(image, FILE_ALIGNMENT); // FileAlignment
        push_u16(image, 0); // MajorOperatingSystemVersion
        push_u16(image, 0);
        push_u16(image, 0); // MajorImageVersion
        push_u16(image, 0);
        push_u16(image, 4); // MajorSubsystemVersion
        push_u16(image, 0);
        push_u32(image, 0); // Win32VersionValue
        push_u32(image, size_of_image);
        push_u32(image, size_of_headers);
        push_u32(image, 0); // CheckSum
        push_u16(image, 3); // Subsystem: console
        push_u16(image, 0); // DllCharacteristics
        if !self.is_64 {
            push_u32(image, 0x100000); // SizeOfStackReserve
            push_u32(image, 0x1000); // SizeOfStackCommit
            push_u32(image, 0x100000); // SizeOfHeapReserve
            push_u32(image, 0x1000); // SizeOfHeapCommit
        } else {
            push_u64(image, 0x100000);
            push_u64(image, 0x1000);
            push_u64(image, 0x100000);
            push_u64(image, 0x1000);
        }
        push_u32(image, 0); // LoaderFlags
        push_u32(image, 16); // NumberOfRvaAndSizes
        for (rva, size) in self.data_directories {
            push_u32(image, rva);
            push_u32(image, size);
        }
    }
}

fn align_up(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) / alignment * alignment
}

fn push_u16(buf: &mut Vec<u8>, v: u16) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn push_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}
