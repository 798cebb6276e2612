//! Simulated furnace mainboard acting as bus master.
//!
//! Publishes telemetry into the RAM block and consumes the bus-module control
//! block the way the real mainboard does. Control frames with a bad checksum
//! are detected and ignored, never repaired.

use crate::ramblock::{
    BusModuleState, FurnaceState, HalfDegrees, BM1_AVAILABLE_OFFSET, BM1_STATE_OFFSET,
    BM1_STATE_SIZE, DEV_MAGIC, DEV_MAGIC_OFFSET, DEV_VERSION, FURNACE_AVAILABLE_OFFSET,
    FURNACE_STATE_OFFSET,
};
use crate::shared::SharedRamBlock;
use crate::transport::RamBus;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Ambient water temperature the circuit cools down to (20 degC).
const AMBIENT_X2: u8 = 40;
/// Boiler limits as reported by a real Cerastar: 70 degC supply, 69 degC hot water.
const VL_MAX_X2: u8 = 0x8C;
const WW_MAX_X2: u8 = 0x8A;
/// Half-degree hysteresis below the target before the burner relights.
const HYSTERESIS_X2: u8 = 4;
/// Simulation step: one half-degree per this many milliseconds at full power.
const HEAT_STEP_MS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("device identity mismatch: magic {magic:#04x}, version {version:#04x}")]
    IdentityMismatch { magic: u8, version: u8 },
    #[error("bus-module data not published")]
    NotPublished,
    #[error("bus-module checksum mismatch: expected {expected:#04x}, found {found:#04x}")]
    ChecksumMismatch { expected: u8, found: u8 },
}

#[derive(Debug)]
pub struct FurnaceEmulator {
    bus: RamBus,
    telemetry: FurnaceState,
    control: Option<BusModuleState>,
    heat_accumulator_ms: u32,
    checksum_errors: u32,
}

impl FurnaceEmulator {
    pub fn new(block: SharedRamBlock) -> Self {
        // 8C 40 78 00 8A 4A 00 89 01 00 01 42 07 as logged from a Cerastar
        let telemetry = FurnaceState {
            vl_max_x2: HalfDegrees(VL_MAX_X2),
            vl_temp_x2: HalfDegrees(0x40),
            dl_max_x2: HalfDegrees(0x78),
            dl_temp_x2: HalfDegrees(0x00),
            ww_max_x2: HalfDegrees(WW_MAX_X2),
            ww_temp_x2: HalfDegrees(0x4A),
            error: 0,
            dummy1: 0x89,
            dummy2: 0x01,
            flame: 0,
            pump: 1,
            flags: 0x42,
            dummy3: 0x07,
        };
        Self {
            bus: RamBus::new(block),
            telemetry,
            control: None,
            heat_accumulator_ms: 0,
            checksum_errors: 0,
        }
    }

    pub fn telemetry(&self) -> &FurnaceState {
        &self.telemetry
    }

    /// Last control block that passed the checksum test.
    pub fn control(&self) -> Option<&BusModuleState> {
        self.control.as_ref()
    }

    pub fn checksum_errors(&self) -> u32 {
        self.checksum_errors
    }

    pub fn bus(&self) -> &RamBus {
        &self.bus
    }

    /// Check for the BM1 identity at 0xFE before starting the handshake.
    pub fn probe(&mut self) -> Result<(), FrameError> {
        let mut id = [0u8; 2];
        self.bus.read_at(DEV_MAGIC_OFFSET as u8, &mut id);
        if id == [DEV_MAGIC, DEV_VERSION] {
            Ok(())
        } else {
            Err(FrameError::IdentityMismatch {
                magic: id[0],
                version: id[1],
            })
        }
    }

    /// Write telemetry, then raise the furnace availability flag.
    pub fn publish(&mut self) {
        let bytes = self.telemetry.to_bytes();
        self.bus.write_at(FURNACE_STATE_OFFSET as u8, &bytes);
        self.bus.write_at(FURNACE_AVAILABLE_OFFSET as u8, &[1]);
    }

    /// Fetch and verify the bus-module control block.
    pub fn read_control(&mut self) -> Result<BusModuleState, FrameError> {
        let mut flag = [0u8; 1];
        self.bus.read_at(BM1_AVAILABLE_OFFSET as u8, &mut flag);
        if flag[0] == 0 {
            return Err(FrameError::NotPublished);
        }
        let mut bytes = [0u8; BM1_STATE_SIZE];
        self.bus.read_at(BM1_STATE_OFFSET as u8, &mut bytes);
        let state = BusModuleState::from_bytes(&bytes);
        let expected = state.expected_checksum();
        if state.checksum != expected {
            return Err(FrameError::ChecksumMismatch {
                expected,
                found: state.checksum,
            });
        }
        Ok(state)
    }

    /// Advance the simulation by `dt_ms`: pick up control, move the
    /// temperatures, publish telemetry.
    pub fn update(&mut self, dt_ms: u32) -> Result<(), FrameError> {
        let result = match self.read_control() {
            Ok(state) => {
                if self.control != Some(state) {
                    info!(
                        "furnace accepted control: power={} vl={} ww={} stop_pump={}",
                        state.power,
                        state.vl_set_x2.whole_degrees(),
                        state.ww_set_x2.whole_degrees(),
                        state.stop_pump
                    );
                }
                self.control = Some(state);
                Ok(())
            }
            Err(FrameError::NotPublished) => Ok(()),
            Err(e) => {
                self.checksum_errors = self.checksum_errors.wrapping_add(1);
                warn!("furnace rejected control frame: {}", e);
                Err(e)
            }
        };

        self.simulate(dt_ms);
        self.publish();
        result
    }

    fn simulate(&mut self, dt_ms: u32) {
        let Some(control) = self.control else {
            return;
        };

        let target = control.vl_set_x2.raw().min(VL_MAX_X2);
        let current = self.telemetry.vl_temp_x2.raw();

        let flame = if current >= target || control.power == 0 {
            false
        } else if current.saturating_add(HYSTERESIS_X2) <= target {
            true
        } else {
            self.telemetry.flame_on()
        };
        if flame != self.telemetry.flame_on() {
            debug!("burner {}", if flame { "on" } else { "off" });
        }
        self.telemetry.flame = u8::from(flame);
        self.telemetry.pump = u8::from(!control.pump_stopped());

        // power scales the heating rate, 0xFF being one step per HEAT_STEP_MS
        let rate = if flame { u32::from(control.power) + 1 } else { 256 };
        self.heat_accumulator_ms = self
            .heat_accumulator_ms
            .saturating_add(dt_ms.saturating_mul(rate) / 256);
        let steps = (self.heat_accumulator_ms / HEAT_STEP_MS).min(u32::from(u8::MAX)) as u8;
        self.heat_accumulator_ms %= HEAT_STEP_MS;

        let next = if flame {
            current.saturating_add(steps).min(VL_MAX_X2)
        } else if self.telemetry.pump_on() {
            current.saturating_sub(steps).max(AMBIENT_X2)
        } else {
            current
        };
        self.telemetry.vl_temp_x2 = HalfDegrees(next);
    }
}
