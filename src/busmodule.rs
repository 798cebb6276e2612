//! Control writes from the emulated BM1 bus module.
//!
//! Every mutator goes through [`RamBlock::update_bus_module`], which clears
//! `bm1_data_avail`, applies the change, recomputes the checksum and only then
//! raises the flag again. [`BusModuleWriter`] cannot touch the checksum byte,
//! so a new mutator cannot publish an unchecked block.

use crate::ramblock::{BusModuleField, HalfDegrees, RamBlock, BM1_DUMMY3_RANGE};
use thiserror::Error;
use tracing::debug;

/// Highest whole-degree setpoint whose half-degree encoding fits the field.
pub const MAX_SETPOINT_C: u8 = 127;

/// "Heating off": both setpoints at 10 degC.
pub const STOP_HEATING_SETPOINT_C: u8 = 10;

// Reserved bytes as seen in traffic from a real BM1. No known meaning.
const DUMMY1_SENTINEL: u8 = 0x01;
const DUMMY2_SENTINEL: u8 = 0x01;
const DUMMY4_SENTINEL: u8 = 0xFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setpoint {
    Heating,
    HotWater,
}

impl core::fmt::Display for Setpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Setpoint::Heating => write!(f, "heating"),
            Setpoint::HotWater => write!(f, "hot water"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RamError {
    #[error("{setpoint} setpoint {value}C out of range (max 127C)")]
    SetpointOutOfRange { setpoint: Setpoint, value: u8 },
}

fn encode_setpoint(setpoint: Setpoint, celsius: u8) -> Result<HalfDegrees, RamError> {
    HalfDegrees::from_celsius(celsius)
        .filter(|_| celsius <= MAX_SETPOINT_C)
        .ok_or(RamError::SetpointOutOfRange { setpoint, value: celsius })
}

/// Write access to bytes 0..=14 of the control block for the duration of one
/// transaction.
pub struct BusModuleWriter<'a> {
    body: &'a mut [u8],
}

impl BusModuleWriter<'_> {
    fn set(&mut self, field: BusModuleField, value: u8) {
        debug_assert!(field != BusModuleField::Checksum);
        self.body[field.index()] = value;
    }

    pub fn set_power(&mut self, power: u8) {
        self.set(BusModuleField::Power, power);
    }

    pub fn set_heating_setpoint(&mut self, value: HalfDegrees) {
        self.set(BusModuleField::VlSetX2, value.raw());
    }

    pub fn set_hot_water_setpoint(&mut self, value: HalfDegrees) {
        self.set(BusModuleField::WwSetX2, value.raw());
    }

    pub fn set_stop_pump(&mut self, stop: bool) {
        self.set(BusModuleField::StopPump, u8::from(stop));
    }

    pub fn set_error(&mut self, error: u8) {
        self.set(BusModuleField::Error, error);
    }

    pub fn apply_sentinels(&mut self) {
        self.set(BusModuleField::Dummy1, DUMMY1_SENTINEL);
        self.set(BusModuleField::Dummy2, DUMMY2_SENTINEL);
        self.set(BusModuleField::Dummy4, DUMMY4_SENTINEL);
    }

    pub fn dummy3(&self) -> &[u8] {
        &self.body[BM1_DUMMY3_RANGE]
    }
}

impl RamBlock {
    /// Run one flag-gated update of the control block.
    pub fn update_bus_module<R>(&mut self, mutate: impl FnOnce(&mut BusModuleWriter<'_>) -> R) -> R {
        self.set_bus_module_available(false);
        let result = {
            let mut writer = BusModuleWriter {
                body: self.bus_module_body_mut(),
            };
            mutate(&mut writer)
        };
        let checksum = self.store_bus_module_checksum();
        self.set_bus_module_available(true);
        debug!("bus-module block published, checksum {:#04x}", checksum);
        result
    }

    /// Full target update, including the reserved sentinel bytes.
    pub fn set_targets(
        &mut self,
        power: u8,
        vl_temp_c: u8,
        ww_temp_c: u8,
        stop_pump: bool,
    ) -> Result<(), RamError> {
        let vl = encode_setpoint(Setpoint::Heating, vl_temp_c)?;
        let ww = encode_setpoint(Setpoint::HotWater, ww_temp_c)?;
        self.update_bus_module(|w| {
            w.set_power(power);
            w.set_heating_setpoint(vl);
            w.set_hot_water_setpoint(ww);
            w.set_stop_pump(stop_pump);
            w.set_error(0);
            w.apply_sentinels();
        });
        Ok(())
    }

    pub fn stop_pump(&mut self) {
        self.update_bus_module(|w| w.set_stop_pump(true));
    }

    pub fn start_pump(&mut self) {
        self.update_bus_module(|w| w.set_stop_pump(false));
    }

    /// Drop both setpoints to 10 degC; power and pump are left alone.
    pub fn stop_heating(&mut self) {
        let off = HalfDegrees(STOP_HEATING_SETPOINT_C * 2);
        self.update_bus_module(|w| {
            w.set_heating_setpoint(off);
            w.set_hot_water_setpoint(off);
        });
    }

    pub fn set_power_level(&mut self, level: u8) {
        self.update_bus_module(|w| w.set_power(level));
    }

    pub fn set_heating_setpoint(&mut self, temp_c: u8) -> Result<(), RamError> {
        let vl = encode_setpoint(Setpoint::Heating, temp_c)?;
        self.update_bus_module(|w| w.set_heating_setpoint(vl));
        Ok(())
    }

    pub fn set_hot_water_setpoint(&mut self, temp_c: u8) -> Result<(), RamError> {
        let ww = encode_setpoint(Setpoint::HotWater, temp_c)?;
        self.update_bus_module(|w| w.set_hot_water_setpoint(ww));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_setpoint_bounds() {
        assert_eq!(encode_setpoint(Setpoint::Heating, 0), Ok(HalfDegrees(0)));
        assert_eq!(encode_setpoint(Setpoint::Heating, 127), Ok(HalfDegrees(254)));
        assert_eq!(
            encode_setpoint(Setpoint::HotWater, 128),
            Err(RamError::SetpointOutOfRange {
                setpoint: Setpoint::HotWater,
                value: 128
            })
        );
    }

    #[test]
    fn writer_leaves_dummy3_untouched() {
        let mut block = RamBlock::new();
        block.update_bus_module(|w| {
            w.apply_sentinels();
            assert_eq!(w.dummy3(), &[0u8; 7]);
        });
        assert_eq!(block.bus_module_dummy3(), &[0u8; 7]);
    }
}
