//! Address decoding for the sound core.
//!
//! Plain 64K RAM with two I/O windows:
//!
//! | Range         | Device                                   |
//! |---------------|------------------------------------------|
//! | $D400-$D41C   | SID registers                            |
//! | $D41D-$D41F   | SID slot, no register (register policy)  |
//! | $DC00-$DC0F   | CIA                                      |
//!
//! The windows are resolved into a page table once at construction, so
//! decoding an access is an index plus a bounds check.

#![allow(clippy::cast_possible_truncation)]

use emu_core::Bus;
use log::warn;
use mos_cia_6526::Cia;
use mos_sid_6581::Sid6581;

use crate::config::RegisterPolicy;
use crate::error::EmulationError;

/// First SID register.
pub const SID_BASE: u16 = 0xD400;
/// Last SID register.
pub const SID_LAST: u16 = 0xD41C;
/// The SID decodes five address lines, so its slot is 32 bytes.
const SID_SLOT: u16 = 0x20;
/// First CIA register.
pub const CIA_BASE: u16 = 0xDC00;
const CIA_SLOT: u16 = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Device {
    Sid,
    Cia,
}

/// A device occupying `len` bytes from `base`, within a single page.
#[derive(Debug, Clone, Copy)]
struct Window {
    device: Device,
    base: u16,
    len: u16,
}

/// RAM plus the SID and CIA, implementing `emu_core::Bus`.
pub struct SidBus {
    ram: Box<[u8; 0x10000]>,
    pub sid: Sid6581,
    pub cia: Cia,
    pages: [Option<Window>; 256],
    policy: RegisterPolicy,
    /// First access the policy refused since the last `take_fault`.
    fault: Option<EmulationError>,
}

impl SidBus {
    #[must_use]
    pub fn new(sid: Sid6581, cia: Cia, policy: RegisterPolicy) -> Self {
        let mut pages = [None; 256];
        for window in [
            Window {
                device: Device::Sid,
                base: SID_BASE,
                len: SID_SLOT,
            },
            Window {
                device: Device::Cia,
                base: CIA_BASE,
                len: CIA_SLOT,
            },
        ] {
            pages[usize::from(window.base >> 8)] = Some(window);
        }

        Self {
            ram: Box::new([0; 0x10000]),
            sid,
            cia,
            pages,
            policy,
            fault: None,
        }
    }

    /// Device and register offset for `addr`, or `None` for RAM.
    fn decode(&self, addr: u16) -> Option<(Device, u8)> {
        let window = self.pages[usize::from(addr >> 8)]?;
        let offset = addr.wrapping_sub(window.base);
        (offset < window.len).then_some((window.device, offset as u8))
    }

    /// Copy `data` into RAM at `address`.
    ///
    /// # Errors
    ///
    /// [`EmulationError::AddressOutOfRange`] if the image would run past
    /// $FFFF. Nothing is written in that case.
    pub fn load(&mut self, address: u16, data: &[u8]) -> Result<(), EmulationError> {
        let start = usize::from(address);
        let end = start + data.len();
        if end > self.ram.len() {
            return Err(EmulationError::AddressOutOfRange {
                address,
                len: data.len(),
            });
        }
        self.ram[start..end].copy_from_slice(data);
        Ok(())
    }

    /// RAM contents, ignoring I/O.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        self.ram[usize::from(addr)]
    }

    /// Write RAM directly, ignoring I/O.
    pub fn poke(&mut self, addr: u16, value: u8) {
        self.ram[usize::from(addr)] = value;
    }

    #[must_use]
    pub fn peek_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.peek(addr), self.peek(addr.wrapping_add(1))])
    }

    pub fn poke_word(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.poke(addr, lo);
        self.poke(addr.wrapping_add(1), hi);
    }

    #[must_use]
    pub fn policy(&self) -> RegisterPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RegisterPolicy) {
        self.policy = policy;
    }

    /// Take the error recorded by a refused register access, if any.
    pub fn take_fault(&mut self) -> Option<EmulationError> {
        self.fault.take()
    }

    fn unsupported(&mut self, address: u16, access: &str) {
        match self.policy {
            RegisterPolicy::Ignore => {}
            RegisterPolicy::Warn => {
                warn!("SID: {access} of unsupported register ${address:04X}");
            }
            RegisterPolicy::Fail => {
                if self.fault.is_none() {
                    self.fault = Some(EmulationError::UnsupportedRegister { address });
                }
            }
        }
    }
}

impl Bus for SidBus {
    fn read(&mut self, addr: u16) -> u8 {
        match self.decode(addr) {
            None => self.ram[usize::from(addr)],
            Some((Device::Cia, reg)) => self.cia.read(reg),
            Some((Device::Sid, reg)) => match self.sid.read_register(reg) {
                Ok(value) => value,
                Err(_) => {
                    self.unsupported(addr, "read");
                    0xFF
                }
            },
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match self.decode(addr) {
            None => self.ram[usize::from(addr)] = value,
            Some((Device::Cia, reg)) => self.cia.write(reg, value),
            Some((Device::Sid, reg)) => {
                if self.sid.write_register(reg, value).is_err() {
                    self.unsupported(addr, "write");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bus(policy: RegisterPolicy) -> SidBus {
        SidBus::new(Sid6581::new(985_248, 44_100), Cia::new(), policy)
    }

    #[test]
    fn sid_window_intercepts_writes() {
        let mut bus = bus(RegisterPolicy::Warn);
        bus.write(0xD418, 0x0F);
        assert_eq!(bus.sid.volume, 0x0F);
        assert_eq!(bus.peek(0xD418), 0x00);
        bus.write(0xD400, 0x34);
        bus.write(0xD401, 0x12);
        assert_eq!(bus.sid.voices[0].frequency, 0x1234);
        assert_eq!(bus.read(0xD401), 0x12);
    }

    #[test]
    fn addresses_outside_windows_are_ram() {
        let mut bus = bus(RegisterPolicy::Fail);
        for addr in [0x0000, 0xD3FF, 0xD420, 0xDC10, 0xFFFF] {
            bus.write(addr, 0x5A);
            assert_eq!(bus.read(addr), 0x5A, "${addr:04X}");
        }
        assert!(bus.take_fault().is_none());
    }

    #[test]
    fn cia_window_reaches_timers() {
        let mut bus = bus(RegisterPolicy::Warn);
        bus.write(0xDC04, 0x10);
        bus.write(0xDC05, 0x00);
        assert_eq!(bus.cia.timer_a().latch(), 0x0010);
        assert_eq!(bus.read(0xDC04), 0x10);
    }

    #[test]
    fn unsupported_register_policy() {
        let mut bus = bus(RegisterPolicy::Ignore);
        bus.write(0xD41D, 1);
        assert_eq!(bus.read(0xD41F), 0xFF);
        assert!(bus.take_fault().is_none());

        bus.set_policy(RegisterPolicy::Fail);
        bus.write(0xD41E, 1);
        bus.read(0xD41D);
        assert!(matches!(
            bus.take_fault(),
            Some(EmulationError::UnsupportedRegister { address: 0xD41E })
        ));
        assert!(bus.take_fault().is_none());
    }

    #[test]
    fn load_rejects_images_past_top_of_memory() {
        let mut bus = bus(RegisterPolicy::Warn);
        bus.load(0xFFFE, &[1, 2]).expect("fits exactly");
        assert_eq!(bus.peek_word(0xFFFE), 0x0201);
        assert!(matches!(
            bus.load(0xFFFF, &[1, 2]),
            Err(EmulationError::AddressOutOfRange {
                address: 0xFFFF,
                len: 2
            })
        ));
        assert_eq!(bus.peek(0xFFFF), 2);
    }
}
