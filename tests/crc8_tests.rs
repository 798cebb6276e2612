use cerastar_bm1::crc8::{self, Crc8, CRC8_TABLE};

#[test]
fn test_check_value() {
    assert_eq!(crc8::checksum(b"123456789"), 0x8F);
}

#[test]
fn test_empty_input_is_init() {
    assert_eq!(crc8::checksum(&[]), 0x00);
}

#[test]
fn test_update_is_table_lookup() {
    assert_eq!(crc8::update(0, 0x01), CRC8_TABLE[1]);
    assert_eq!(crc8::update(0x5A, 0x5A), 0x00);
    assert_eq!(crc8::update(0x12, 0x34), CRC8_TABLE[0x12 ^ 0x34]);
}

#[test]
fn test_table_first_entries() {
    // one shift of the poly through the register
    assert_eq!(CRC8_TABLE[0x00], 0x00);
    assert_eq!(CRC8_TABLE[0x01], 0x39);
    assert_eq!(CRC8_TABLE[0x02], 0x72);
}

#[test]
fn test_frame_captured_from_real_bm1() {
    // FF B4 00 01 00 01 03 00 .. 00 FF | 0D
    let frame: [u8; 15] = [
        0xFF, 0xB4, 0x00, 0x01, 0x00, 0x01, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF,
    ];
    assert_eq!(crc8::checksum(&frame), 0x0D);
}

#[test]
fn test_streaming_matches_fold() {
    let data: Vec<u8> = (0u8..=200).step_by(3).collect();

    let mut digest = Crc8::new();
    let (head, tail) = data.split_at(17);
    digest.update_slice(head);
    for &b in tail {
        digest.update(b);
    }

    assert_eq!(digest.finalize(), crc8::checksum(&data));
}

#[test]
fn test_checksum_detects_single_byte_change() {
    let mut frame = [0u8; 15];
    frame[0] = 0x80;
    let good = crc8::checksum(&frame);
    for i in 0..frame.len() {
        let mut corrupted = frame;
        corrupted[i] ^= 0x01;
        assert_ne!(crc8::checksum(&corrupted), good, "flip at byte {i}");
    }
}
