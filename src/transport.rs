//! Bus-side access model of the emulated PCF8570.
//!
//! A master write starts with one address byte that loads the word pointer;
//! following bytes are stored at the pointer, which then auto-increments and
//! wraps at 256. A master read returns bytes from the pointer onwards.
//!
//! Typical furnace sequence: read 2 bytes at 0xFE (expects 0xFC 0x03), write
//! 13 bytes of telemetry to 0x20, raise 0x10; then read 0x11 and the 16
//! control bytes at 0x90.

use crate::shared::SharedRamBlock;
use heapless::{Deque, Vec};
use tracing::trace;

const TRANSFER_HISTORY: usize = 16;
pub const MAX_LOGGED_BYTES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    MasterWrite,
    MasterRead,
}

/// One recorded bus transaction, kept for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub direction: Direction,
    pub address: u8,
    /// Bytes moved; longer transfers are truncated in the log.
    pub data: Vec<u8, MAX_LOGGED_BYTES>,
    /// Bytes the RAM actually accepted (writes) or delivered (reads).
    pub accepted: usize,
}

#[derive(Debug)]
pub struct RamBus {
    block: SharedRamBlock,
    pointer: u8,
    history: Deque<Transfer, TRANSFER_HISTORY>,
}

impl RamBus {
    pub fn new(block: SharedRamBlock) -> Self {
        Self {
            block,
            pointer: 0,
            history: Deque::new(),
        }
    }

    pub fn block(&self) -> &SharedRamBlock {
        &self.block
    }

    pub fn pointer(&self) -> u8 {
        self.pointer
    }

    /// Handle a master write. An empty write is a plain address probe and
    /// changes nothing. Returns the number of data bytes stored.
    pub fn master_write(&mut self, bytes: &[u8]) -> usize {
        let Some((&address, data)) = bytes.split_first() else {
            return 0;
        };
        self.write_at(address, data)
    }

    /// Store `data` starting at `address`, as one master write would.
    pub fn write_at(&mut self, address: u8, data: &[u8]) -> usize {
        let stored = self
            .block
            .with_block(|ram| ram.write_external(address, data));
        self.pointer = address.wrapping_add(data.len() as u8);
        trace!(
            "master write {:#04x}: {} byte(s), {} stored",
            address,
            data.len(),
            stored
        );
        self.record(Direction::MasterWrite, address, data, stored);
        stored
    }

    /// Handle a master read from the current pointer.
    pub fn master_read(&mut self, buf: &mut [u8]) {
        let address = self.pointer;
        self.block.with_block(|ram| {
            let raw = ram.raw();
            let mut addr = address;
            for b in buf.iter_mut() {
                *b = raw[addr as usize];
                addr = addr.wrapping_add(1);
            }
        });
        self.pointer = address.wrapping_add(buf.len() as u8);
        trace!("master read {:#04x}: {} byte(s)", address, buf.len());
        self.record(Direction::MasterRead, address, buf, buf.len());
    }

    /// Combined transaction: set the pointer, then read.
    pub fn read_at(&mut self, address: u8, buf: &mut [u8]) {
        self.pointer = address;
        self.master_read(buf);
    }

    pub fn recent_transfers(&self) -> impl Iterator<Item = &Transfer> {
        self.history.iter()
    }

    fn record(&mut self, direction: Direction, address: u8, data: &[u8], accepted: usize) {
        if self.history.is_full() {
            let _ = self.history.pop_front();
        }
        let mut logged = Vec::new();
        let _ = logged.extend_from_slice(&data[..data.len().min(MAX_LOGGED_BYTES)]);
        let _ = self.history.push_back(Transfer {
            direction,
            address,
            data: logged,
            accepted,
        });
    }
}
