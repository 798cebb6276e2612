use cerastar_bm1::crc8;
use cerastar_bm1::ramblock::RamBlock;
use cerastar_bm1::SharedRamBlock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

#[test]
fn test_clones_share_one_block() {
    let a = SharedRamBlock::new();
    let b = a.clone();

    a.set_power_level(0x20);
    assert_eq!(b.snapshot().bus_module.power, 0x20);
    assert_eq!(b.raw_copy()[0x90], 0x20);
}

#[test]
fn test_snapshot_fields() {
    let block = SharedRamBlock::new();
    let snapshot = block.snapshot();
    assert!(!snapshot.furnace_data_avail);
    assert!(!snapshot.bm1_data_avail);
    assert_eq!(snapshot.furnace, None);

    block.set_targets(0x80, 22, 45, false).unwrap();
    block.with_block(|ram| {
        ram.write_external(0x20, &[0x8C, 0x40]);
        ram.write_external(0x10, &[1]);
    });

    let snapshot = block.snapshot();
    assert!(snapshot.furnace_data_avail);
    assert!(snapshot.bm1_data_avail);
    assert_eq!(snapshot.furnace.unwrap().vl_temp_x2.raw(), 0x40);
    assert_eq!(snapshot.bus_module.checksum, 0x3B);
}

#[test]
fn test_init_through_handle() {
    let block = SharedRamBlock::new();
    block.set_targets(0xFF, 70, 60, true).unwrap();
    block.init();
    assert_eq!(block.raw_copy(), *RamBlock::new().raw());
}

#[test]
fn test_rejected_setpoint_through_handle() {
    let block = SharedRamBlock::new();
    let before = block.raw_copy();
    assert!(block.set_heating_setpoint(150).is_err());
    assert!(block.set_hot_water_setpoint(128).is_err());
    assert_eq!(block.raw_copy(), before);
}

#[test]
fn test_readers_never_see_flag_with_stale_checksum() {
    let block = SharedRamBlock::new();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let block = block.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut checked = 0u32;
                while !done.load(Ordering::Relaxed) || checked == 0 {
                    let raw = block.raw_copy();
                    if raw[0x11] == 1 {
                        assert_eq!(raw[0x9F], crc8::checksum(&raw[0x90..0x9F]));
                        checked += 1;
                    }
                    thread::yield_now();
                }
            })
        })
        .collect();

    for i in 0..2000u32 {
        let t = (i % 100) as u8;
        match i % 4 {
            0 => block.set_targets(t, t, 100 - t, i % 8 == 0).unwrap(),
            1 => block.set_power_level(t.wrapping_mul(3)),
            2 => block.set_heating_setpoint(t).unwrap(),
            _ => block.stop_pump(),
        }
    }
    done.store(true, Ordering::Relaxed);

    for reader in readers {
        reader.join().unwrap();
    }
}
