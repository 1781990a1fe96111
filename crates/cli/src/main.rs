use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{arg, command};
use log::info;

fn main() -> Result<()> {
    let matches = command!()
        .arg(arg!(-s --sources <DIR> "Root directory for resolving reported source paths").required(false))
        .arg(arg!(-v --verbose "Enable verbose logging"))
        .arg(arg!(<input> "Input PE image"))
        .arg(arg!(<output> "Output path for the rewritten image"))
        .get_matches();

    let verbose = matches.get_flag("verbose");
    env_logger::Builder::new()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    let input_path = matches.get_one::<String>("input").unwrap();
    let output_path = matches.get_one::<String>("output").unwrap();
    let source_path = matches.get_one::<String>("sources").map(PathBuf::from);

    let input_file = fs::File::open(input_path)
        .with_context(|| format!("failed to open input image `{input_path}`"))?;
    // Safety: the mapping is read-only and this process does not rely on
    // the file staying unmodified for longer than the call below.
    let mmap = unsafe { memmap2::Mmap::map(&input_file) }
        .with_context(|| format!("failed to map input image `{input_path}`"))?;

    let options = rsym_core::Options {
        source_path,
        ..Default::default()
    };
    let result = rsym_core::run(
        &mmap,
        &options,
        &mut rsym_core::NullLineSource,
        &rsym_core::NullSymbolResolver,
    )
    .with_context(|| format!("failed to process `{input_path}`"))?;

    match result {
        Some(bytes) => {
            fs::write(output_path, bytes)
                .with_context(|| format!("failed to write output image `{output_path}`"))?;
        }
        None => {
            info!("`{input_path}` is an ELF image; copying through unchanged");
            fs::copy(input_path, output_path)
                .with_context(|| format!("failed to copy `{input_path}` to `{output_path}`"))?;
        }
    }

    Ok(())
}
