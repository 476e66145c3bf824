//! End-to-end extraction against the emulated chip

use spidump_core::chip::{identify, ChipDatabase, ChipProfile, JedecId};
use spidump_core::error::{Error, TransportError};
use spidump_core::extract::{extract_image, ExtractOptions, Verification};
use spidump_core::flash::{self, CancelToken, NoProgress, ReadOptions};
use spidump_core::retry::RetryPolicy;
use spidump_core::verify::{self, Sampling};
use spidump_dummy::{DummyConfig, DummyFlash, FaultTrigger};

fn pattern(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| ((i * 7) ^ (i >> 9) ^ (i >> 17)) as u8)
        .collect()
}

fn chip(name: &str) -> ChipProfile {
    ChipDatabase::builtin()
        .find_by_name(name)
        .unwrap_or_else(|| panic!("{} missing from table", name))
        .clone()
}

fn dummy_for(profile: &ChipProfile) -> (DummyFlash, Vec<u8>) {
    let data = pattern(profile.total_size as usize);
    let flash = DummyFlash::with_data(DummyConfig::from_profile(profile), &data);
    (flash, data)
}

fn read_all(flash: &mut DummyFlash, profile: &ChipProfile, opts: &ReadOptions) -> Vec<u8> {
    flash::extract(flash, profile, opts, &mut NoProgress, &CancelToken::new())
        .unwrap()
        .0
}

#[test]
fn every_known_id_identifies() {
    let db = ChipDatabase::builtin();
    for profile in db.iter() {
        let mut flash = DummyFlash::new(DummyConfig {
            jedec_id: profile.jedec_id,
            size: 0,
            ..DummyConfig::default()
        });
        let found = identify(&mut flash, &db, &RetryPolicy::none()).unwrap();
        assert_eq!(&found, profile);
    }
}

#[test]
fn unknown_id_is_an_error() {
    let db = ChipDatabase::builtin();
    let mut flash = DummyFlash::new(DummyConfig {
        jedec_id: JedecId::new([0xAA, 0xBB, 0xCC]),
        size: 4096,
        ..DummyConfig::default()
    });
    match identify(&mut flash, &db, &RetryPolicy::default()) {
        Err(Error::UnknownChip(e)) => {
            assert_eq!(e.jedec_id, JedecId::new([0xAA, 0xBB, 0xCC]));
            assert!(!e.is_absent());
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn sleeping_chip_is_woken_for_identification() {
    let profile = chip("MX25L6405");
    let db = ChipDatabase::builtin();
    let mut flash = DummyFlash::new(DummyConfig {
        asleep: true,
        size: 0,
        ..DummyConfig::from_profile(&profile)
    });
    assert_eq!(identify(&mut flash, &db, &RetryPolicy::default()).unwrap(), profile);
}

#[test]
fn image_length_matches_chip() {
    for name in ["W25Q80", "EN25Q32", "M25P16", "W25Q256"] {
        let profile = chip(name);
        let (mut flash, data) = dummy_for(&profile);
        let image = read_all(&mut flash, &profile, &ReadOptions::default());
        assert_eq!(image.len(), profile.total_size as usize, "{}", name);
        assert!(image == data, "{} image differs", name);
    }
}

#[test]
fn chunks_ascend_and_reads_are_repeatable() {
    let profile = chip("GD25Q16");
    let (mut flash, _) = dummy_for(&profile);
    let opts = ReadOptions {
        chunk_len: Some(2048),
        ..ReadOptions::default()
    };

    let first = read_all(&mut flash, &profile, &opts);
    let log = flash.read_log().to_vec();
    assert_eq!(log.len(), profile.total_size as usize / 2048);
    for (i, addr) in log.iter().enumerate() {
        assert_eq!(*addr as usize, i * 2048);
    }

    let second = read_all(&mut flash, &profile, &opts);
    assert!(first == second);
}

#[test]
fn four_byte_chip_reads_past_16m() {
    let profile = chip("GD25Q256");
    let (mut flash, data) = dummy_for(&profile);
    let image = read_all(&mut flash, &profile, &ReadOptions::default());
    assert_eq!(&image[0x0100_0000..0x0100_1000], &data[0x0100_0000..0x0100_1000]);
    assert_eq!(*flash.read_log().last().unwrap(), profile.total_size - 4096);
}

#[test]
fn single_fault_is_retried_without_damage() {
    let profile = chip("W25Q32");
    let (mut flash, data) = dummy_for(&profile);
    flash.inject_fault(
        FaultTrigger::Address(0x0012_3456),
        1,
        TransportError::ShortTransfer {
            expected: 4096,
            actual: 31,
        },
    );

    let (image, stats) = flash::extract(
        &mut flash,
        &profile,
        &ReadOptions::default(),
        &mut NoProgress,
        &CancelToken::new(),
    )
    .unwrap();
    assert!(image == data);
    assert_eq!(stats.retries, 1);
    assert_eq!(flash.read_attempts(), stats.chunks + 1);
}

#[test]
fn exhausted_retries_abort_without_image() {
    let profile = chip("W25Q32");
    let (mut flash, _) = dummy_for(&profile);
    flash.inject_fault(FaultTrigger::Address(0x0020_0000), u32::MAX, TransportError::Timeout);

    let opts = ExtractOptions {
        read: ReadOptions {
            retry: RetryPolicy::with_retries(3),
            chunk_len: None,
        },
        sampling: Sampling::None,
    };
    let db = ChipDatabase::builtin();
    let err = extract_image(&mut flash, &db, &opts, &mut NoProgress, &CancelToken::new())
        .unwrap_err();

    match err {
        Error::FatalTransport(f) => {
            assert_eq!(f.offset, Some(0x0020_0000));
            assert_eq!(f.attempts, 4);
            assert_eq!(f.cause, TransportError::Timeout);
            assert_eq!(f.chip.as_deref(), Some("Winbond W25Q32"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // Nothing past the failing chunk was read
    assert_eq!(*flash.read_log().last().unwrap(), 0x0020_0000 - 4096);
}

#[test]
fn disconnect_is_not_retried() {
    let profile = chip("W25Q80");
    let (mut flash, _) = dummy_for(&profile);
    flash.disconnect();

    let err = flash::extract(
        &mut flash,
        &profile,
        &ReadOptions::default(),
        &mut NoProgress,
        &CancelToken::new(),
    )
    .unwrap_err();
    match err {
        Error::FatalTransport(f) => {
            assert_eq!(f.attempts, 1);
            assert_eq!(f.cause, TransportError::Disconnected);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn sampling_flags_post_read_corruption() {
    let profile = chip("W25Q16");
    let (mut flash, data) = dummy_for(&profile);
    let chunks = profile.total_size as usize / 4096;
    // Flip a byte in the last chunk right after the whole chip was read
    flash.corrupt_after_reads(chunks, profile.total_size - 1);

    let db = ChipDatabase::builtin();
    let opts = ExtractOptions {
        sampling: Sampling::Count(3),
        ..ExtractOptions::default()
    };
    let result = extract_image(&mut flash, &db, &opts, &mut NoProgress, &CancelToken::new())
        .unwrap();

    assert!(result.image == data);
    assert_eq!(result.checksum, verify::checksum(&data));
    match result.verification {
        Verification::Unverified(e) => {
            assert_eq!(e.chunks_checked, 3);
            assert_eq!(e.mismatches.len(), 1);
            let m = e.mismatches[0];
            assert_eq!(m.offset, profile.total_size - 4096);
            assert_eq!(m.first_diff, profile.total_size - 1);
            assert_eq!(m.actual, !m.expected);
        }
        other => panic!("unexpected verification: {:?}", other),
    }
}

#[test]
fn clean_chip_verifies() {
    let profile = chip("W25Q16");
    let (mut flash, _) = dummy_for(&profile);
    let db = ChipDatabase::builtin();
    let opts = ExtractOptions {
        sampling: Sampling::Every(16),
        ..ExtractOptions::default()
    };
    let result = extract_image(&mut flash, &db, &opts, &mut NoProgress, &CancelToken::new())
        .unwrap();
    assert_eq!(result.verification, Verification::Verified { chunks: 32 });
    assert_eq!(result.profile, profile);
}

#[test]
fn cancelled_read_returns_nothing() {
    let profile = chip("W25Q80");
    let (mut flash, _) = dummy_for(&profile);
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = flash::extract(
        &mut flash,
        &profile,
        &ReadOptions::default(),
        &mut NoProgress,
        &cancel,
    )
    .unwrap_err();
    assert_eq!(err, Error::Cancelled { offset: 0 });
    assert_eq!(flash.read_attempts(), 0);
}

#[test]
fn oversized_chunk_is_rejected_before_the_bus() {
    let profile = chip("W25Q80");
    let (mut flash, _) = dummy_for(&profile);
    let opts = ReadOptions {
        chunk_len: Some(8192),
        ..ReadOptions::default()
    };
    let err = flash::extract(&mut flash, &profile, &opts, &mut NoProgress, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidChunkLength { len: 8192, .. }));
    assert_eq!(flash.read_attempts(), 0);
}
