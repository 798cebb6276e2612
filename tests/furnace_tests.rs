use cerastar_bm1::ramblock::RamBlock;
use cerastar_bm1::{FrameError, FurnaceEmulator, SharedRamBlock};

#[test]
fn test_probe_finds_identity() {
    let mut furnace = FurnaceEmulator::new(SharedRamBlock::new());
    assert_eq!(furnace.probe(), Ok(()));
}

#[test]
fn test_probe_fails_on_blank_ram() {
    let block = SharedRamBlock::new();
    block.with_block(|ram| ram.write_external(0xFE, &[0x00, 0x00]));
    let mut furnace = FurnaceEmulator::new(block);

    assert_eq!(
        furnace.probe(),
        Err(FrameError::IdentityMismatch {
            magic: 0,
            version: 0
        })
    );
}

#[test]
fn test_publish_raises_furnace_flag() {
    let block = SharedRamBlock::new();
    let mut furnace = FurnaceEmulator::new(block.clone());
    furnace.publish();

    let raw = block.raw_copy();
    assert_eq!(raw[0x10], 1);
    assert_eq!(&raw[0x20..0x2D], &[0x8C, 0x40, 0x78, 0x00, 0x8A, 0x4A, 0x00, 0x89, 0x01, 0x00, 0x01, 0x42, 0x07]);
    assert_eq!(block.snapshot().furnace, Some(*furnace.telemetry()));
}

#[test]
fn test_control_not_published_after_init() {
    let mut furnace = FurnaceEmulator::new(SharedRamBlock::new());
    assert_eq!(furnace.read_control(), Err(FrameError::NotPublished));
    assert_eq!(furnace.update(100), Ok(()));
    assert!(furnace.control().is_none());
}

#[test]
fn test_reads_back_published_control() {
    let block = SharedRamBlock::new();
    block.set_targets(0x80, 22, 45, false).unwrap();
    let mut furnace = FurnaceEmulator::new(block);

    let control = furnace.read_control().unwrap();
    assert_eq!(control.vl_set_x2.raw(), 44);
    assert_eq!(control.checksum, 0x3B);

    furnace.update(100).unwrap();
    assert_eq!(furnace.control(), Some(&control));
}

#[test]
fn test_corrupted_control_is_detected_not_repaired() {
    let mut ram = RamBlock::new();
    ram.set_targets(0x80, 22, 45, false).unwrap();
    let mut raw = *ram.raw();
    raw[0x91] = 50;
    let block = SharedRamBlock::from_block(RamBlock::from_raw(raw));

    let mut furnace = FurnaceEmulator::new(block.clone());
    assert_eq!(
        furnace.read_control(),
        Err(FrameError::ChecksumMismatch {
            expected: cerastar_bm1::crc8::checksum(&raw[0x90..0x9F]),
            found: 0x3B
        })
    );

    assert!(furnace.update(250).is_err());
    assert_eq!(furnace.checksum_errors(), 1);
    assert!(furnace.control().is_none());
    // the furnace never writes the control block
    assert_eq!(block.raw_copy()[0x91], 50);
    assert_eq!(block.raw_copy()[0x9F], 0x3B);
}

#[test]
fn test_burner_heats_towards_setpoint() {
    let block = SharedRamBlock::new();
    block.set_targets(0xFF, 60, 50, false).unwrap();
    let mut furnace = FurnaceEmulator::new(block.clone());
    let start = furnace.telemetry().vl_temp_x2;

    furnace.update(5_000).unwrap();
    assert!(furnace.telemetry().flame_on());
    assert!(furnace.telemetry().pump_on());
    assert!(furnace.telemetry().vl_temp_x2 > start);
    assert_eq!(block.snapshot().furnace, Some(*furnace.telemetry()));
}

#[test]
fn test_burner_stays_off_below_current_temperature() {
    let block = SharedRamBlock::new();
    block.set_targets(0x80, 20, 20, true).unwrap();
    let mut furnace = FurnaceEmulator::new(block);

    furnace.update(1_000).unwrap();
    assert!(!furnace.telemetry().flame_on());
    assert!(!furnace.telemetry().pump_on());
}

#[test]
fn test_supply_temperature_capped_at_limit() {
    let block = SharedRamBlock::new();
    block.set_targets(0xFF, 127, 60, false).unwrap();
    let mut furnace = FurnaceEmulator::new(block);

    for _ in 0..200 {
        furnace.update(10_000).unwrap();
    }
    assert!(furnace.telemetry().vl_temp_x2.raw() <= 0x8C);
}
