//! The emulated 256-byte PCF8570 RAM shared between furnace and bus module.
//!
//! Storage is a single byte array. Named fields are reached through fixed
//! offsets, so the raw view and the field view always denote the same bytes.

use crate::crc8;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;
use tracing::debug;

pub const RAM_SIZE: usize = 256;

pub const FURNACE_AVAILABLE_OFFSET: usize = 0x10;
pub const BM1_AVAILABLE_OFFSET: usize = 0x11;

pub const FURNACE_STATE_OFFSET: usize = 0x20;
pub const FURNACE_STATE_SIZE: usize = 13;

pub const BM1_STATE_OFFSET: usize = 0x90;
pub const BM1_STATE_SIZE: usize = 16;
/// Bytes covered by the checksum (everything before the checksum byte).
pub const BM1_PROTECTED_SIZE: usize = BM1_STATE_SIZE - 1;
pub const BM1_CHECKSUM_OFFSET: usize = BM1_STATE_OFFSET + BM1_PROTECTED_SIZE;

pub const INIT_SEQ_OFFSET: usize = 0xE0;
/// "IF 04.00"
pub const INIT_SEQUENCE: [u8; 8] = [0x49, 0x46, 0x20, 0x30, 0x34, 0x2E, 0x30, 0x30];

pub const DEV_MAGIC_OFFSET: usize = 0xFE;
pub const DEV_VERSION_OFFSET: usize = 0xFF;
pub const DEV_MAGIC: u8 = 0xFC;
pub const DEV_VERSION: u8 = 0x03;

/// 0xFF is full power, so 0x80 is roughly half.
pub const DEFAULT_POWER: u8 = 0x80;

const_assert!(FURNACE_AVAILABLE_OFFSET + 1 == BM1_AVAILABLE_OFFSET);
const_assert!(FURNACE_STATE_OFFSET + FURNACE_STATE_SIZE == 0x2D);
const_assert!(FURNACE_STATE_OFFSET + FURNACE_STATE_SIZE <= BM1_STATE_OFFSET);
const_assert!(BM1_CHECKSUM_OFFSET == 0x9F);
const_assert!(BM1_STATE_OFFSET + BM1_STATE_SIZE <= INIT_SEQ_OFFSET);
const_assert!(INIT_SEQ_OFFSET + INIT_SEQUENCE.len() <= DEV_MAGIC_OFFSET);
const_assert!(DEV_VERSION_OFFSET == RAM_SIZE - 1);

/// Byte positions inside the furnace telemetry block (relative to 0x20).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FurnaceField {
    VlMaxX2 = 0,
    VlTempX2 = 1,
    DlMaxX2 = 2,
    DlTempX2 = 3,
    WwMaxX2 = 4,
    WwTempX2 = 5,
    Error = 6,
    Dummy1 = 7,
    Dummy2 = 8,
    Flame = 9,
    Pump = 10,
    Flags = 11,
    Dummy3 = 12,
}

impl FurnaceField {
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Absolute offset in the RAM block.
    pub const fn offset(self) -> usize {
        FURNACE_STATE_OFFSET + self as usize
    }
}

/// Byte positions inside the bus-module control block (relative to 0x90).
///
/// Bytes 7..=13 are the reserved `dummy3` run, see [`BM1_DUMMY3_RANGE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusModuleField {
    Power = 0,
    VlSetX2 = 1,
    WwSetX2 = 2,
    Dummy1 = 3,
    StopPump = 4,
    Dummy2 = 5,
    Error = 6,
    Dummy4 = 14,
    Checksum = 15,
}

pub const BM1_DUMMY3_RANGE: core::ops::Range<usize> = 7..14;

impl BusModuleField {
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn offset(self) -> usize {
        BM1_STATE_OFFSET + self as usize
    }
}

/// True for bytes only the bus module may write: its availability flag and
/// its whole control block including the checksum.
pub const fn is_bus_module_owned(offset: usize) -> bool {
    offset == BM1_AVAILABLE_OFFSET
        || (offset >= BM1_STATE_OFFSET && offset < BM1_STATE_OFFSET + BM1_STATE_SIZE)
}

/// Temperature in half-degree Celsius steps, as stored on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct HalfDegrees(pub u8);

impl HalfDegrees {
    /// Encode whole degrees; `None` if the doubled value does not fit a byte.
    pub const fn from_celsius(celsius: u8) -> Option<Self> {
        match celsius.checked_mul(2) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn whole_degrees(self) -> u8 {
        self.0 / 2
    }

    pub const fn has_half(self) -> bool {
        self.0 & 1 != 0
    }

    pub fn celsius(self) -> f32 {
        f32::from(self.0) * 0.5
    }
}

/// Snapshot of the furnace telemetry block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FurnaceState {
    /// Vorlauf (supply line) maximum limit.
    pub vl_max_x2: HalfDegrees,
    /// Vorlauf actual temperature.
    pub vl_temp_x2: HalfDegrees,
    // meaning of the "dl" pair is unknown
    pub dl_max_x2: HalfDegrees,
    pub dl_temp_x2: HalfDegrees,
    /// Hot water (boiler) maximum.
    pub ww_max_x2: HalfDegrees,
    /// Hot water actual temperature.
    pub ww_temp_x2: HalfDegrees,
    pub error: u8,
    pub dummy1: u8,
    pub dummy2: u8,
    pub flame: u8,
    pub pump: u8,
    pub flags: u8,
    pub dummy3: u8,
}

impl FurnaceState {
    pub fn from_bytes(bytes: &[u8; FURNACE_STATE_SIZE]) -> Self {
        let t = |f: FurnaceField| HalfDegrees(bytes[f.index()]);
        let b = |f: FurnaceField| bytes[f.index()];
        Self {
            vl_max_x2: t(FurnaceField::VlMaxX2),
            vl_temp_x2: t(FurnaceField::VlTempX2),
            dl_max_x2: t(FurnaceField::DlMaxX2),
            dl_temp_x2: t(FurnaceField::DlTempX2),
            ww_max_x2: t(FurnaceField::WwMaxX2),
            ww_temp_x2: t(FurnaceField::WwTempX2),
            error: b(FurnaceField::Error),
            dummy1: b(FurnaceField::Dummy1),
            dummy2: b(FurnaceField::Dummy2),
            flame: b(FurnaceField::Flame),
            pump: b(FurnaceField::Pump),
            flags: b(FurnaceField::Flags),
            dummy3: b(FurnaceField::Dummy3),
        }
    }

    pub fn to_bytes(&self) -> [u8; FURNACE_STATE_SIZE] {
        [
            self.vl_max_x2.raw(),
            self.vl_temp_x2.raw(),
            self.dl_max_x2.raw(),
            self.dl_temp_x2.raw(),
            self.ww_max_x2.raw(),
            self.ww_temp_x2.raw(),
            self.error,
            self.dummy1,
            self.dummy2,
            self.flame,
            self.pump,
            self.flags,
            self.dummy3,
        ]
    }

    pub fn flame_on(&self) -> bool {
        self.flame != 0
    }

    pub fn pump_on(&self) -> bool {
        self.pump != 0
    }
}

/// Snapshot of the bus-module control block, checksum included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BusModuleState {
    pub power: u8,
    pub vl_set_x2: HalfDegrees,
    pub ww_set_x2: HalfDegrees,
    pub dummy1: u8,
    pub stop_pump: u8,
    pub dummy2: u8,
    pub error: u8,
    pub dummy3: [u8; 7],
    pub dummy4: u8,
    pub checksum: u8,
}

impl BusModuleState {
    pub fn from_bytes(bytes: &[u8; BM1_STATE_SIZE]) -> Self {
        let b = |f: BusModuleField| bytes[f.index()];
        Self {
            power: b(BusModuleField::Power),
            vl_set_x2: HalfDegrees(b(BusModuleField::VlSetX2)),
            ww_set_x2: HalfDegrees(b(BusModuleField::WwSetX2)),
            dummy1: b(BusModuleField::Dummy1),
            stop_pump: b(BusModuleField::StopPump),
            dummy2: b(BusModuleField::Dummy2),
            error: b(BusModuleField::Error),
            dummy3: core::array::from_fn(|i| bytes[BM1_DUMMY3_RANGE.start + i]),
            dummy4: b(BusModuleField::Dummy4),
            checksum: b(BusModuleField::Checksum),
        }
    }

    pub fn to_bytes(&self) -> [u8; BM1_STATE_SIZE] {
        let mut bytes = [0u8; BM1_STATE_SIZE];
        bytes[BusModuleField::Power.index()] = self.power;
        bytes[BusModuleField::VlSetX2.index()] = self.vl_set_x2.raw();
        bytes[BusModuleField::WwSetX2.index()] = self.ww_set_x2.raw();
        bytes[BusModuleField::Dummy1.index()] = self.dummy1;
        bytes[BusModuleField::StopPump.index()] = self.stop_pump;
        bytes[BusModuleField::Dummy2.index()] = self.dummy2;
        bytes[BusModuleField::Error.index()] = self.error;
        bytes[BM1_DUMMY3_RANGE].copy_from_slice(&self.dummy3);
        bytes[BusModuleField::Dummy4.index()] = self.dummy4;
        bytes[BusModuleField::Checksum.index()] = self.checksum;
        bytes
    }

    /// CRC-8 over every byte preceding the checksum.
    pub fn expected_checksum(&self) -> u8 {
        crc8::checksum(&self.to_bytes()[..BM1_PROTECTED_SIZE])
    }

    pub fn checksum_valid(&self) -> bool {
        self.checksum == self.expected_checksum()
    }

    pub fn pump_stopped(&self) -> bool {
        self.stop_pump != 0
    }
}

/// The whole emulated device memory.
#[derive(Clone, PartialEq, Eq)]
pub struct RamBlock {
    ram: [u8; RAM_SIZE],
}

impl Default for RamBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for RamBlock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RamBlock")
            .field("furnace_data_avail", &self.ram[FURNACE_AVAILABLE_OFFSET])
            .field("bm1_data_avail", &self.ram[BM1_AVAILABLE_OFFSET])
            .field("furnace_state", &self.furnace_bytes())
            .field("bm1_state", &self.bus_module_bytes())
            .field("dev_magic", &self.ram[DEV_MAGIC_OFFSET])
            .field("dev_version", &self.ram[DEV_VERSION_OFFSET])
            .finish()
    }
}

impl RamBlock {
    /// A freshly initialised block, identical to calling [`RamBlock::init`].
    pub const fn new() -> Self {
        let mut ram = [0u8; RAM_SIZE];
        let mut i = 0;
        while i < INIT_SEQUENCE.len() {
            ram[INIT_SEQ_OFFSET + i] = INIT_SEQUENCE[i];
            i += 1;
        }
        ram[DEV_MAGIC_OFFSET] = DEV_MAGIC;
        ram[DEV_VERSION_OFFSET] = DEV_VERSION;
        ram[FURNACE_AVAILABLE_OFFSET] = 0;
        ram[BM1_AVAILABLE_OFFSET] = 0;
        ram[BusModuleField::Power.offset()] = DEFAULT_POWER;
        Self { ram }
    }

    /// Wrap a captured image as-is, e.g. a dump taken from a live device.
    pub const fn from_raw(ram: [u8; RAM_SIZE]) -> Self {
        Self { ram }
    }

    /// Reset to the power-on image: zeroes, identity stamp, default power.
    pub fn init(&mut self) {
        *self = Self::new();
        debug!("RAM block initialised");
    }

    pub fn raw(&self) -> &[u8; RAM_SIZE] {
        &self.ram
    }

    pub fn byte(&self, offset: u8) -> u8 {
        self.ram[offset as usize]
    }

    pub fn furnace_data_available(&self) -> bool {
        self.ram[FURNACE_AVAILABLE_OFFSET] != 0
    }

    pub fn bus_module_data_available(&self) -> bool {
        self.ram[BM1_AVAILABLE_OFFSET] != 0
    }

    pub fn furnace_byte(&self, field: FurnaceField) -> u8 {
        self.ram[field.offset()]
    }

    pub fn bus_module_byte(&self, field: BusModuleField) -> u8 {
        self.ram[field.offset()]
    }

    pub fn bus_module_dummy3(&self) -> &[u8] {
        &self.ram[BM1_STATE_OFFSET + BM1_DUMMY3_RANGE.start..BM1_STATE_OFFSET + BM1_DUMMY3_RANGE.end]
    }

    pub fn init_sequence(&self) -> &[u8] {
        &self.ram[INIT_SEQ_OFFSET..INIT_SEQ_OFFSET + INIT_SEQUENCE.len()]
    }

    pub fn dev_magic(&self) -> u8 {
        self.ram[DEV_MAGIC_OFFSET]
    }

    pub fn dev_version(&self) -> u8 {
        self.ram[DEV_VERSION_OFFSET]
    }

    /// The furnace only talks to a RAM that carries the BM1 identity.
    pub fn identity_valid(&self) -> bool {
        self.dev_magic() == DEV_MAGIC
            && self.dev_version() == DEV_VERSION
            && self.init_sequence() == INIT_SEQUENCE
    }

    pub fn furnace_bytes(&self) -> &[u8] {
        &self.ram[FURNACE_STATE_OFFSET..FURNACE_STATE_OFFSET + FURNACE_STATE_SIZE]
    }

    pub fn bus_module_bytes(&self) -> &[u8] {
        &self.ram[BM1_STATE_OFFSET..BM1_STATE_OFFSET + BM1_STATE_SIZE]
    }

    /// Telemetry, but only once the furnace has flagged a completed write.
    pub fn furnace_state(&self) -> Option<FurnaceState> {
        self.furnace_data_available()
            .then(|| FurnaceState::from_bytes(&self.array(FURNACE_STATE_OFFSET)))
    }

    /// Current control block regardless of the availability flag.
    pub fn bus_module_state(&self) -> BusModuleState {
        BusModuleState::from_bytes(&self.array(BM1_STATE_OFFSET))
    }

    /// Control block as a reader on the bus would accept it: flag set.
    pub fn published_bus_module_state(&self) -> Option<BusModuleState> {
        self.bus_module_data_available()
            .then(|| self.bus_module_state())
    }

    /// Store bytes arriving from the bus master, starting at `offset` and
    /// wrapping at the end of the block like the PCF8570 address counter.
    ///
    /// Bytes aimed at bus-module-owned storage are dropped. Returns the
    /// number of bytes actually stored.
    pub fn write_external(&mut self, offset: u8, data: &[u8]) -> usize {
        let mut addr = offset;
        let mut stored = 0;
        for &b in data {
            if !is_bus_module_owned(addr as usize) {
                self.ram[addr as usize] = b;
                stored += 1;
            }
            addr = addr.wrapping_add(1);
        }
        if stored != data.len() {
            debug!(
                "dropped {} byte(s) of external write at {:#04x} into bus-module storage",
                data.len() - stored,
                offset
            );
        }
        stored
    }

    fn array<const N: usize>(&self, offset: usize) -> [u8; N] {
        core::array::from_fn(|i| self.ram[offset + i])
    }

    pub(crate) fn set_bus_module_available(&mut self, available: bool) {
        self.ram[BM1_AVAILABLE_OFFSET] = u8::from(available);
    }

    pub(crate) fn bus_module_body_mut(&mut self) -> &mut [u8] {
        &mut self.ram[BM1_STATE_OFFSET..BM1_CHECKSUM_OFFSET]
    }

    pub(crate) fn store_bus_module_checksum(&mut self) -> u8 {
        let checksum = crc8::checksum(&self.ram[BM1_STATE_OFFSET..BM1_CHECKSUM_OFFSET]);
        self.ram[BM1_CHECKSUM_OFFSET] = checksum;
        checksum
    }
}
