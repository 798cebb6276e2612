use crate::busmodule::RamError;
use crate::ramblock::{BusModuleState, FurnaceState, RamBlock, RAM_SIZE};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Consistent copy of the interesting parts of the block, taken under the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub furnace_data_avail: bool,
    pub bm1_data_avail: bool,
    pub furnace: Option<FurnaceState>,
    pub bus_module: BusModuleState,
}

impl BlockSnapshot {
    pub fn of(block: &RamBlock) -> Self {
        Self {
            furnace_data_avail: block.furnace_data_available(),
            bm1_data_avail: block.bus_module_data_available(),
            furnace: block.furnace_state(),
            bus_module: block.bus_module_state(),
        }
    }
}

/// Handle to one [`RamBlock`] shared between the bus-module logic, the
/// transport side and diagnostics.
///
/// Each bus-module mutator runs its whole clear-flag, write, checksum,
/// set-flag sequence while holding the lock, so no reader can observe a
/// raised flag next to a stale checksum.
#[derive(Debug, Clone, Default)]
pub struct SharedRamBlock {
    inner: Arc<Mutex<RamBlock>>,
}

impl SharedRamBlock {
    pub fn new() -> Self {
        Self::from_block(RamBlock::new())
    }

    pub fn from_block(block: RamBlock) -> Self {
        Self {
            inner: Arc::new(Mutex::new(block)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RamBlock> {
        // A panicking holder can at worst leave the flag cleared, which
        // readers already treat as "not ready".
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the block.
    pub fn with_block<R>(&self, f: impl FnOnce(&mut RamBlock) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn snapshot(&self) -> BlockSnapshot {
        BlockSnapshot::of(&self.lock())
    }

    pub fn raw_copy(&self) -> [u8; RAM_SIZE] {
        *self.lock().raw()
    }

    pub fn init(&self) {
        self.lock().init();
    }

    pub fn set_targets(
        &self,
        power: u8,
        vl_temp_c: u8,
        ww_temp_c: u8,
        stop_pump: bool,
    ) -> Result<(), RamError> {
        self.lock().set_targets(power, vl_temp_c, ww_temp_c, stop_pump)
    }

    pub fn stop_pump(&self) {
        self.lock().stop_pump();
    }

    pub fn start_pump(&self) {
        self.lock().start_pump();
    }

    pub fn stop_heating(&self) {
        self.lock().stop_heating();
    }

    pub fn set_power_level(&self, level: u8) {
        self.lock().set_power_level(level);
    }

    pub fn set_heating_setpoint(&self, temp_c: u8) -> Result<(), RamError> {
        self.lock().set_heating_setpoint(temp_c)
    }

    pub fn set_hot_water_setpoint(&self, temp_c: u8) -> Result<(), RamError> {
        self.lock().set_hot_water_setpoint(temp_c)
    }
}
