//! Table-driven CRC-8 used to protect the bus-module control block.
//!
//! Parameters: width=8 poly=0x39 init=0x00 refin=false refout=false
//! xorout=0x00, check=0x8f.

pub const CRC8_POLY: u8 = 0x39;
pub const CRC8_INIT: u8 = 0x00;

/// Lookup table, evaluated once at compile time.
pub static CRC8_TABLE: [u8; 256] = init_table();

/// Build the lookup table: entry `i` is the remainder of the single byte `i`,
/// processed MSB first.
pub const fn init_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut j = 0;
        while j < 8 {
            crc = (crc << 1) ^ if crc & 0x80 != 0 { CRC8_POLY } else { 0 };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Fold one byte into a running checksum.
#[inline]
#[must_use]
pub fn update(crc_in: u8, byte_in: u8) -> u8 {
    CRC8_TABLE[(crc_in ^ byte_in) as usize]
}

/// Checksum of a whole slice, starting from [`CRC8_INIT`].
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(CRC8_INIT, |crc, &b| update(crc, b))
}

/// Streaming digest for callers that see the protected bytes piecewise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc8 {
    value: u8,
}

impl Crc8 {
    pub const fn new() -> Self {
        Self { value: CRC8_INIT }
    }

    pub fn update(&mut self, byte: u8) {
        self.value = update(self.value, byte);
    }

    pub fn update_slice(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.update(b);
        }
    }

    #[must_use]
    pub fn finalize(self) -> u8 {
        self.value
    }
}

impl Default for Crc8 {
    fn default() -> Self {
        Self::new()
    }
}
