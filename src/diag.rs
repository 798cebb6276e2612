//! Human-readable renderings of the RAM block for logs and the CLI.

use crate::ramblock::{BusModuleState, FurnaceState, HalfDegrees, RamBlock, RAM_SIZE};
use core::fmt;

const DUMP_BYTES_PER_LINE: usize = 16;

/// One decimal place, e.g. raw 45 renders as `22.5C`.
impl fmt::Display for HalfDegrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let half = if self.has_half() { 5 } else { 0 };
        write!(f, "{}.{}C", self.whole_degrees(), half)
    }
}

impl fmt::Display for FurnaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Furnace: vmax={} vcurr={} dmax={} dcurr={} wmax={} wcurr={} \
             aux=error/flame/pump/flags={}/{}/{}/{:#04x}",
            self.vl_max_x2,
            self.vl_temp_x2,
            self.dl_max_x2,
            self.dl_temp_x2,
            self.ww_max_x2,
            self.ww_temp_x2,
            self.error,
            self.flame,
            self.pump,
            self.flags,
        )
    }
}

impl fmt::Display for BusModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BM1: power={} vtarget={} wtarget={} aux=stopPump/error={}/{} crc={:#04x}",
            self.power, self.vl_set_x2, self.ww_set_x2, self.stop_pump, self.error, self.checksum,
        )?;
        if !self.checksum_valid() {
            write!(f, " (expected {:#04x})", self.expected_checksum())?;
        }
        Ok(())
    }
}

/// Full hex dump, 16 bytes per line, each line prefixed by its offset.
pub struct HexDump<'a>(pub &'a [u8; RAM_SIZE]);

impl<'a> HexDump<'a> {
    pub fn of(block: &'a RamBlock) -> Self {
        Self(block.raw())
    }
}

impl fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (line, chunk) in self.0.chunks(DUMP_BYTES_PER_LINE).enumerate() {
            write!(f, "{:02x}:", line * DUMP_BYTES_PER_LINE)?;
            for b in chunk {
                write!(f, " {b:02x}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
