// Copyright 2024 Logan Magee
//
// SPDX-License-Identifier: LicenseRef-Proprietary

#![allow(missing_docs)]

use std::{error::Error, fs, path::PathBuf};

use bwt::ExternalConfig;
use rand::{Rng, SeedableRng, rngs::StdRng};

fn workspace_file(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name)
}

fn in_memory(text: &[u8]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut transformed = vec![0; text.len()];
    bwt::bwt(text, &mut transformed)?;
    Ok(transformed)
}

#[test]
fn matches_in_memory_output() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(1234);
    let mut text: Vec<u8> = (0..20_000).map(|_| rng.gen_range(1..=8)).collect();
    text.push(0);
    let expected = in_memory(&text)?;

    let source = workspace_file("random-20000.txt");
    fs::write(&source, &text)?;

    // From a single slot per store up to everything in RAM
    for budget in [1, 1000, 100_000, 64 << 20] {
        let dest = workspace_file(&format!("random-20000-{budget}.bwt"));
        let written = bwt::bwt_in_files(&source, 255, budget, &dest)?;

        assert_eq!(written, text.len() as u64);
        assert_eq!(fs::read(&dest)?, expected, "budget {budget}");
    }

    Ok(())
}

#[test]
fn recursion_in_files() -> Result<(), Box<dyn Error>> {
    // Without a sentinel; the in-file transform appends one
    let text = b"abcab".repeat(4000);
    let mut with_sentinel = text.clone();
    with_sentinel.push(0);
    let expected = in_memory(&with_sentinel)?;

    let source = workspace_file("periodic.txt");
    let dest = workspace_file("periodic.bwt");
    fs::write(&source, &text)?;
    let written = bwt::bwt_in_files(&source, 255, 4096, &dest)?;

    assert_eq!(written, with_sentinel.len() as u64);
    assert_eq!(fs::read(&dest)?, expected);

    Ok(())
}

#[test]
fn file_round_trip() -> Result<(), Box<dyn Error>> {
    let text = b"It was the best of times, it was the worst of times".repeat(50);
    let source = workspace_file("dickens.txt");
    let transformed = workspace_file("dickens.bwt");
    let restored = workspace_file("dickens.restored");
    fs::write(&source, &text)?;

    bwt::bwt_in_files_with_config(
        &source,
        255,
        &transformed,
        ExternalConfig::new()
            .memory_budget(512)
            .temp_dir(env!("CARGO_TARGET_TMPDIR")),
    )?;
    bwt::inverse_bwt_in_files(&transformed, 255, &restored)?;

    let mut expected = text;
    expected.push(0);
    assert_eq!(fs::read(&restored)?, expected);

    Ok(())
}

#[test]
fn wide_symbol_files() -> Result<(), Box<dyn Error>> {
    let mut rng = StdRng::seed_from_u64(77);
    let bound = 100_000u32;
    let mut text: Vec<u32> = (0..5000).map(|_| rng.gen_range(1..=bound)).collect();
    text.push(0);

    let mut expected = vec![0; text.len()];
    bwt::bwt_with_bound(&text, bound.into(), &mut expected)?;

    let source = workspace_file("wide.u32");
    let dest = workspace_file("wide.bwt");
    let bytes: Vec<u8> = text.iter().flat_map(|symbol| symbol.to_ne_bytes()).collect();
    fs::write(&source, bytes)?;
    bwt::bwt_in_files(&source, bound.into(), 2048, &dest)?;

    let transformed: Vec<u32> = fs::read(&dest)?
        .chunks_exact(4)
        .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    assert_eq!(transformed, expected);

    Ok(())
}

#[test]
fn rejects_symbols_over_bound() -> Result<(), Box<dyn Error>> {
    let source = workspace_file("over-bound.txt");
    let dest = workspace_file("over-bound.bwt");
    fs::write(&source, b"abcz")?;

    let result = bwt::bwt_in_files(&source, u64::from(b'c'), 1 << 10, &dest);

    assert!(matches!(
        result,
        Err(bwt::BwtError::SymbolOutOfRange {
            position: 3,
            symbol: 122,
            bound: 99,
        }),
    ));

    Ok(())
}
