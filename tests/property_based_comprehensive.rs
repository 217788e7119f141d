//! Property-based tests for the density analysis core
//!
//! Core properties covered:
//! 1. Dump decoding and parsing
//! 2. Band inversion
//! 3. Block layout arithmetic
//! 4. Block statistics
//! 5. Normal fit

use pufstat::bitstream::{decode, BitArray, DumpRecord};
use pufstat::block_stats::analyze;
use pufstat::distribution::NormalFit;
use pufstat::dump::parse_dump;
use pufstat::inversion::InversionBand;
use pufstat::partition::{BlockLayout, Geometry};
use pufstat::AnalysisError;
use proptest::prelude::*;

fn records(bytes: &[u8]) -> Vec<DumpRecord> {
    bytes
        .iter()
        .enumerate()
        .map(|(i, &byte)| DumpRecord {
            address: i as u32,
            byte,
        })
        .collect()
}

/// 256 bits in 16-bit rows
fn small_geometry() -> Geometry {
    Geometry {
        bit_len: 256,
        row_width: 16,
        centering_divisor: 511,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_decode_is_msb_first(bytes in prop::collection::vec(any::<u8>(), 1..64)) {
        let bits = decode(&records(&bytes));
        prop_assert_eq!(bits.len(), bytes.len() * 8);
        for (i, &byte) in bytes.iter().enumerate() {
            for bit in 0..8 {
                let expected = (byte >> (7 - bit)) & 1 == 1;
                prop_assert_eq!(bits.get(i * 8 + bit), Some(expected));
            }
        }
    }

    #[test]
    fn prop_parse_dump_never_panics(text in "\\PC{0,200}") {
        let _ = parse_dump(&text);
    }

    #[test]
    fn prop_parse_dump_reads_written_rows(bytes in prop::collection::vec(any::<u8>(), 1..64)) {
        let mut text = String::from("Address,Word\n");
        for (address, byte) in bytes.iter().enumerate() {
            text.push_str(&format!("{:04x},{:02x}\n", address, byte));
        }
        let parsed = parse_dump(&text).unwrap();
        prop_assert_eq!(parsed, records(&bytes));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_double_inversion_is_identity(
        bits in prop::collection::vec(any::<bool>(), 0..512),
        low in 0usize..600,
        width in 0usize..600,
    ) {
        let array: BitArray = bits.iter().copied().collect();
        let band = InversionBand::new(low, low + width);
        prop_assert_eq!(band.apply(&band.apply(&array)), array);
    }

    #[test]
    fn prop_inversion_touches_only_the_band(
        bits in prop::collection::vec(any::<bool>(), 1..512),
        low in 0usize..512,
        width in 0usize..512,
    ) {
        let array: BitArray = bits.iter().copied().collect();
        let band = InversionBand::new(low, low + width);
        let inverted = band.apply(&array);
        prop_assert_eq!(inverted.len(), array.len());
        for i in 0..array.len() {
            let flipped = inverted.get(i) != array.get(i);
            prop_assert_eq!(flipped, band.contains(i));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_layout_never_exceeds_array(
        len in 1usize..200_000,
        row_width in 1usize..512,
        k in 1usize..40,
        divisor in 1usize..1024,
    ) {
        let geometry = Geometry { bit_len: len, row_width, centering_divisor: divisor };
        let blocks = k * k;
        if let Ok(layout) = BlockLayout::compute(len, &geometry, blocks) {
            prop_assert!(blocks * layout.block_area() <= len);
            prop_assert_eq!(layout.excess, len - blocks * layout.block_area());
            prop_assert!(layout.end_index() <= len);
            prop_assert_eq!(layout.k, k);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_densities_are_fractions_and_mean_matches_counts(
        bytes in prop::collection::vec(any::<u8>(), 32),
        k in 2usize..=8,
    ) {
        let bits = decode(&records(&bytes));
        let blocks = k * k;
        let result = analyze(&bits, blocks, &small_geometry()).unwrap();

        prop_assert_eq!(result.densities.len(), blocks);
        prop_assert!(result.densities.iter().all(|d| (0.0..=1.0).contains(d)));
        prop_assert!(result.std_dev >= 0.0);

        let layout = small_geometry().layout(blocks).unwrap();
        let ones: usize = layout.blocks(&bits).map(|block| block.ones()).sum();
        let expected = ones as f64 / (blocks * layout.block_area()) as f64;
        prop_assert!((result.mean - expected).abs() < 1e-12);
    }

    #[test]
    fn prop_single_block_density_and_degenerate_std_dev(bytes in prop::collection::vec(any::<u8>(), 32)) {
        let bits = decode(&records(&bytes));
        let layout = small_geometry().layout(1).unwrap();
        // 256 is a perfect square: one 16 x 16 block covers everything
        prop_assert_eq!(layout.excess, 0);
        let block = layout.blocks(&bits).next().unwrap();
        prop_assert_eq!(block.ones(), bits.count_ones());

        let err = analyze(&bits, 1, &small_geometry()).unwrap_err();
        let is_degenerate = matches!(err, AnalysisError::DegenerateSample { samples: 1 });
        prop_assert!(is_degenerate);
    }

    #[test]
    fn prop_normal_fit_bounds(values in prop::collection::vec(0.0f64..1.0, 1..100)) {
        let fit = NormalFit::fit(&values).unwrap();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(fit.mu >= min - 1e-5 && fit.mu <= max + 1e-5);
        prop_assert!(fit.sigma >= 0.0);
        prop_assert!(fit.sigma <= (max - min) + 1e-5);
        prop_assert_eq!(fit.samples, values.len());
    }
}
