//! `.rossym` payload serialization (§3/§6): a 16-byte header followed by a
//! packed [`SymbolRecord`] array and the string pool's raw bytes.

use crate::pool::StringPool;
use crate::record::SymbolRecord;

const HEADER_LEN: usize = 16;
const RECORD_LEN: usize = 16;

/// Build the `.rossym` section content for `records` (already sorted) and
/// `pool`.
pub fn build(records: &[SymbolRecord], pool: &StringPool) -> Vec<u8> {
    let symbols_offset = HEADER_LEN as u32;
    let symbols_length = (records.len() * RECORD_LEN) as u32;
    let strings_offset = symbols_offset + symbols_length;
    let strings = pool.as_bytes();
    let strings_length = strings.len() as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + symbols_length as usize + strings_length as usize);
    out.extend_from_slice(&symbols_offset.to_le_bytes());
    out.extend_from_slice(&symbols_length.to_le_bytes());
    out.extend_from_slice(&strings_offset.to_le_bytes());
    out.extend_from_slice(&strings_length.to_le_bytes());
    for record in records {
        out.extend_from_slice(&record.address.to_le_bytes());
        out.extend_from_slice(&record.file_offset.to_le_bytes());
        out.extend_from_slice(&record.function_offset.to_le_bytes());
        out.extend_from_slice(&record.source_line.to_le_bytes());
    }
    out.extend_from_slice(strings);
    out
}

/// Parse a previously built `.rossym` payload back into its records and
/// string pool bytes. Used by tests to check the writer's output.
#[cfg(test)]
pub fn parse(data: &[u8]) -> Option<(Vec<SymbolRecord>, &[u8])> {
    let header: [u32; 4] = [
        u32::from_le_bytes(data.get(0..4)?.try_into().ok()?),
        u32::from_le_bytes(data.get(4..8)?.try_into().ok()?),
        u32::from_le_bytes(data.get(8..12)?.try_into().ok()?),
        u32::from_le_bytes(data.get(12..16)?.try_into().ok()?),
    ];
    let [symbols_offset, symbols_length, strings_offset, strings_length] = header;
    let symbols_bytes = data.get(symbols_offset as usize..(symbols_offset + symbols_length) as usize)?;
    let mut records = Vec::with_capacity(symbols_bytes.len() / RECORD_LEN);
    for chunk in symbols_bytes.chunks_exact(RECORD_LEN) {
        records.push(SymbolRecord {
            address: u32::from_le_bytes(chunk[0..4].try_into().ok()?),
            file_offset: u32::from_le_bytes(chunk[4..8].try_into().ok()?),
            function_offset: u32::from_le_bytes(chunk[8..12].try_into().ok()?),
            source_line: u32::from_le_bytes(chunk[12..16].try_into().ok()?),
        });
    }
    let strings = data.get(strings_offset as usize..(strings_offset + strings_length) as usize)?;
    Some((records, strings))
}
