// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, ensure};
use bwt::{ExternalConfig, IndexWidth, Symbol};
use clap::Parser;
use env_logger::Env;
use log::info;
use tempfile::NamedTempFile;

// Each entry is a text and its transform
const EXAMPLES: [(&[u8], &[u8]); 3] = [
    (b"amammmasasmasassaara\0", b"ars\0mammssamsmaasaaaa"),
    (b"cabadabab\0", b"bbdcbaaa\0a"),
    (b"\0", b"\0"),
];

/// Burrows-Wheeler Transform by induced sorting
#[derive(Parser)]
#[command(version, about)]
struct Args {
    #[command(flatten)]
    mode: Mode,

    /// Input file
    #[arg(short, long, required_unless_present = "test")]
    input: Option<PathBuf>,

    /// Output file
    #[arg(short, long, required_unless_present = "test")]
    output: Option<PathBuf>,

    /// RAM budget in bytes for the intermediate data of an in-file transform
    #[arg(long, default_value_t = ExternalConfig::DEFAULT_MEMORY_BUDGET)]
    memory: usize,

    /// Largest symbol value; symbols are read as 1, 2, 4 or 8 native-endian bytes accordingly
    #[arg(long, default_value_t = 255)]
    alphabet: u64,

    /// Directory for temporary files of an in-file transform
    #[arg(long)]
    temp_dir: Option<PathBuf>,

    /// Log the progress of every stage
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::Args)]
#[group(required = true, multiple = false)]
struct Mode {
    /// Transform the input in memory
    #[arg(short = 'm', long)]
    in_memory: bool,

    /// Transform the input in files, keeping intermediate data within the memory budget
    #[arg(short = 'f', long)]
    in_files: bool,

    /// Invert a transform
    #[arg(short = 'u', long)]
    inverse: bool,

    /// Check the transform on built-in examples, and on the input file if one is given
    #[arg(short = 't', long)]
    test: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_level)).init();

    let mut config = ExternalConfig::new();
    config.memory_budget(args.memory);
    if let Some(dir) = &args.temp_dir {
        config.temp_dir(dir.clone());
    }

    if args.mode.test {
        return self_test(
            args.input.as_deref(),
            args.alphabet,
            args.temp_dir.as_deref(),
            &config,
        );
    }

    let input = args.input.context("No input file given")?;
    let output = args.output.context("No output file given")?;

    if args.mode.in_files {
        let written = bwt::bwt_in_files_with_config(&input, args.alphabet, &output, &config)
            .with_context(|| format!("Failed to transform '{}' in files", input.display()))?;
        info!("wrote {written} symbols");
    } else if args.mode.inverse {
        bwt::inverse_bwt_in_files(&input, args.alphabet, &output)
            .with_context(|| format!("Failed to invert '{}'", input.display()))?;
    } else {
        match IndexWidth::for_bound(args.alphabet) {
            IndexWidth::Byte => transform_in_memory::<u8>(&input, args.alphabet, &output)?,
            IndexWidth::Short => transform_in_memory::<u16>(&input, args.alphabet, &output)?,
            IndexWidth::Word => transform_in_memory::<u32>(&input, args.alphabet, &output)?,
            IndexWidth::Long => transform_in_memory::<u64>(&input, args.alphabet, &output)?,
        }
    }

    Ok(())
}

/// Reads a file of native-endian symbols, appending a sentinel if it does not end with one.
fn read_text<S: Symbol>(path: &Path) -> anyhow::Result<Vec<S>> {
    bwt::read_text(path).with_context(|| format!("Failed to read input file '{}'", path.display()))
}

fn transform_in_memory<S: Symbol>(
    input: &Path,
    alphabet: u64,
    output: &Path,
) -> anyhow::Result<()> {
    let text: Vec<S> = read_text(input)?;
    let mut transformed = vec![S::default(); text.len()];
    bwt::bwt_with_bound(&text, alphabet, &mut transformed)
        .with_context(|| format!("Failed to transform '{}'", input.display()))?;

    fs::write(output, bytemuck::cast_slice::<S, u8>(&transformed))
        .with_context(|| format!("Failed to write output file '{}'", output.display()))?;

    Ok(())
}

fn self_test(
    input: Option<&Path>,
    alphabet: u64,
    temp_dir: Option<&Path>,
    config: &ExternalConfig,
) -> anyhow::Result<()> {
    for (text, expected) in EXAMPLES {
        let mut transformed = vec![0; text.len()];
        bwt::bwt(text, &mut transformed).context("Failed to transform built-in example")?;
        ensure!(
            transformed == expected,
            "Transform of {:?} is {:?}, expected {:?}",
            String::from_utf8_lossy(text),
            String::from_utf8_lossy(&transformed),
            String::from_utf8_lossy(expected),
        );
        println!("example {:?}: ok", String::from_utf8_lossy(text));
    }

    if let Some(input) = input {
        match IndexWidth::for_bound(alphabet) {
            IndexWidth::Byte => check_input::<u8>(input, alphabet, temp_dir, config)?,
            IndexWidth::Short => check_input::<u16>(input, alphabet, temp_dir, config)?,
            IndexWidth::Word => check_input::<u32>(input, alphabet, temp_dir, config)?,
            IndexWidth::Long => check_input::<u64>(input, alphabet, temp_dir, config)?,
        }
    }

    Ok(())
}

/// Checks that the in-memory and in-file transforms of `input` agree and that the transform inverts
/// back to the input.
fn check_input<S: Symbol>(
    input: &Path,
    alphabet: u64,
    temp_dir: Option<&Path>,
    config: &ExternalConfig,
) -> anyhow::Result<()> {
    let text: Vec<S> = read_text(input)?;
    let mut in_memory = vec![S::default(); text.len()];
    bwt::bwt_with_bound(&text, alphabet, &mut in_memory)
        .with_context(|| format!("Failed to transform '{}'", input.display()))?;

    let scratch = match temp_dir {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new(),
    }
    .context("Failed to create a scratch file")?;
    bwt::bwt_in_files_with_config(input, alphabet, scratch.path(), config)
        .with_context(|| format!("Failed to transform '{}' in files", input.display()))?;
    let in_files = fs::read(scratch.path()).with_context(|| {
        format!("Failed to read in-file transform '{}'", scratch.path().display())
    })?;
    ensure!(
        in_files == bytemuck::cast_slice::<S, u8>(&in_memory),
        "In-file and in-memory transforms of '{}' differ",
        input.display(),
    );
    println!("in-file transform of '{}': ok", input.display());

    let mut restored = vec![S::default(); in_memory.len()];
    bwt::inverse_bwt_with_bound(&in_memory, alphabet, &mut restored)
        .with_context(|| format!("Failed to invert the transform of '{}'", input.display()))?;
    ensure!(
        restored == text,
        "Transform of '{}' does not invert to the input",
        input.display(),
    );
    println!("round trip of '{}': ok", input.display());

    Ok(())
}
