//! Orchestrator (§4.9): wires the decoders, merger, and writer together
//! into the end-to-end pipeline the CLI and library entry point drive.

use crate::dbghelp::{self, LineSource, SymbolResolver};
use crate::format::IMAGE_DIRECTORY_ENTRY_BASERELOC;
use crate::logging::log_debug;
use crate::pool::StringPool;
use crate::view::PeView;
use crate::writer::{RelocPatch, RossymSection};
use crate::{coff_symbols, merge, reloc, rossym, stabs, writer, Options, Result};

/// Run the full pipeline over `data`.
///
/// Returns `Ok(None)` when `data` is an ELF image (§6: a successful
/// no-op), or `Ok(Some(bytes))` with the rewritten image otherwise.
pub fn process(
    data: &[u8],
    options: &Options,
    line_source: &mut dyn LineSource,
    resolver: &dyn SymbolResolver,
) -> Result<Option<Vec<u8>>> {
    let view = match PeView::parse(data)? {
        Some(view) => view,
        None => return Ok(None),
    };

    let mut pool = StringPool::new();

    let stab = view.section_data_by_name(b".stab");
    let stabstr = view.section_data_by_name(b".stabstr");
    let primary_records = match (stab, stabstr) {
        (Some(stab), Some(stabstr)) => {
            log_debug!("decoding {} bytes of stabs records", stab.len());
            stabs::decode(stab, stabstr, view.image_base() as u32, &mut pool)?
        }
        _ => {
            log_debug!("no .stab section; falling back to the line-number provider");
            dbghelp::decode(line_source, resolver, options.source_path.as_deref(), &mut pool)
        }
    };

    let coff_records = coff_symbols::decode(
        view.coff_symbols(),
        view.coff_string_table(),
        view.sections(),
        &mut pool,
    )?;
    log_debug!(
        "{} stabs/line records, {} COFF symbol records",
        primary_records.len(),
        coff_records.len()
    );

    let merged = merge::merge(&primary_records, &coff_records);

    let reloc_patch = build_reloc_patch(&view)?;

    let rossym = if merged.is_empty() {
        log_debug!("merge produced no records; emitting no .rossym section");
        None
    } else {
        Some(RossymSection {
            data: rossym::build(&merged, &pool),
        })
    };

    let output = writer::write(&view, reloc_patch.as_ref(), rossym.as_ref())?;
    Ok(Some(output))
}

fn build_reloc_patch(view: &PeView<'_>) -> Result<Option<RelocPatch>> {
    let Some(directory) = view.data_directory(IMAGE_DIRECTORY_ENTRY_BASERELOC) else {
        return Ok(None);
    };
    if directory.size.get() == 0 {
        return Ok(None);
    }
    let Some(section_index) = view.section_index_containing_rva(directory.virtual_address.get()) else {
        return Ok(None);
    };
    let result = reloc::rewrite(view, directory.virtual_address.get(), directory.size.get())?;
    Ok(Some(RelocPatch {
        section_index,
        data: result.data,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbghelp::{NullLineSource, NullSymbolResolver};
    use crate::testutil::{MinimalPe, SectionSpec};

    #[test]
    fn elf_image_passes_through_as_a_no_op() {
        let mut data = vec![0u8; 32];
        data[0..4].copy_from_slice(&crate::format::ELF_MAGIC);
        let result = process(&data, &Options::default(), &mut NullLineSource, &NullSymbolResolver).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn image_with_no_debug_info_and_no_coff_symbols_produces_no_rossym() {
        let image = MinimalPe::new32()
            .with_sections(vec![SectionSpec::new(b".text", 0x1000, vec![0u8; 0x200])])
            .build();
        let output = process(&image, &Options::default(), &mut NullLineSource, &NullSymbolResolver)
            .unwrap()
            .unwrap();
        let view = PeView::parse(&output).unwrap().unwrap();
        assert!(view
            .sections()
            .iter()
            .all(|s| view.section_name(s) != b".rossym"));
    }
}
