//! Flat 64 KiB memory with memory-mapped I/O.
//!
//! Three addresses double as device ports: writing the character port
//! emits the byte as ASCII, writing the numeric port emits a decimal
//! string, and the timer port is a free-running 8-bit counter advanced
//! once per executed instruction. Everything else is plain RAM. Word
//! access is little-endian and wraps modulo 65536 at the top of the
//! address space.

use std::fmt;
use std::io::{self, Write};

use crate::cpu::config::{MachineConfig, MEM_SIZE};

/// Byte-addressable memory with three intercepted I/O ports.
///
/// Owns the output stream the ports emit to; port emissions are
/// synchronous and never fail as far as the machine is concerned.
pub struct Memory {
    bytes: Vec<u8>,
    port_numeric_out: u16,
    port_char_out: u16,
    port_timer: u16,
    out: Box<dyn Write>,
}

impl Memory {
    /// Memory whose ports emit to stdout.
    pub fn new(config: &MachineConfig) -> Self {
        Self::with_output(config, Box::new(io::stdout()))
    }

    /// Memory whose ports emit to an arbitrary sink.
    pub fn with_output(config: &MachineConfig, out: Box<dyn Write>) -> Self {
        Self {
            bytes: vec![0; MEM_SIZE],
            port_numeric_out: config.port_numeric_out,
            port_char_out: config.port_char_out,
            port_timer: config.port_timer,
            out,
        }
    }

    /// Read one byte.
    #[inline]
    pub fn read8(&self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    /// Little-endian word read; the high byte wraps around the top of
    /// the address space.
    pub fn read16(&self, addr: u16) -> u16 {
        let lo = self.read8(addr);
        let hi = self.read8(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Byte write with port interception: the character port emits the
    /// byte as ASCII, the numeric port emits its decimal string plus a
    /// space. The value is stored either way.
    pub fn write8(&mut self, addr: u16, value: u8) {
        if addr == self.port_char_out {
            self.emit(&[value]);
        } else if addr == self.port_numeric_out {
            self.emit(format!("{} ", value).as_bytes());
        }

        self.bytes[addr as usize] = value;
    }

    /// Little-endian word write. Ports are intercepted at word level
    /// first; an intercepted write stores its two bytes directly so the
    /// byte-level port handling cannot emit a second time. Plain writes
    /// fall through to two byte writes, which keeps byte-level
    /// interception live for words straddling a port address.
    pub fn write16(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();

        if addr == self.port_numeric_out {
            self.emit(format!("{} ", value).as_bytes());
            self.store_pair(addr, lo, hi);
        } else if addr == self.port_char_out {
            self.emit(&[lo]);
            self.store_pair(addr, lo, hi);
        } else {
            self.write8(addr, lo);
            self.write8(addr.wrapping_add(1), hi);
        }
    }

    fn store_pair(&mut self, addr: u16, lo: u8, hi: u8) {
        self.bytes[addr as usize] = lo;
        self.bytes[addr.wrapping_add(1) as usize] = hi;
    }

    fn emit(&mut self, bytes: &[u8]) {
        // The machine has no error channel for console output.
        let _ = self.out.write_all(bytes);
        let _ = self.out.flush();
    }

    /// Advance the free-running timer by one; the byte wraps at 256.
    pub fn tick_timer(&mut self) {
        let addr = self.port_timer as usize;
        self.bytes[addr] = self.bytes[addr].wrapping_add(1);
    }

    /// Copy a program image into memory starting at `start`, wrapping at
    /// the top of the address space.
    pub fn load(&mut self, start: u16, image: &[u8]) {
        let mut addr = start;
        for &byte in image {
            self.bytes[addr as usize] = byte;
            addr = addr.wrapping_add(1);
        }
    }

    /// Read-only listing of `start..=end` for diagnostics.
    pub fn dump(&self, start: u16, end: u16) -> Vec<(u16, u8)> {
        (start..=end)
            .map(|addr| (addr, self.bytes[addr as usize]))
            .collect()
    }

    /// Zero all of memory.
    pub fn clear(&mut self) {
        self.bytes.iter_mut().for_each(|b| *b = 0);
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let non_zero = self.bytes.iter().filter(|b| **b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_bytes", &non_zero)
            .field("size", &MEM_SIZE)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::testutil::SharedBuf;

    fn captured() -> (Memory, SharedBuf) {
        let buf = SharedBuf::default();
        let mem = Memory::with_output(&MachineConfig::default(), Box::new(buf.clone()));
        (mem, buf)
    }

    #[test]
    fn word_access_is_little_endian() {
        let (mut mem, _) = captured();

        mem.write16(0x0100, 0xABCD);

        assert_eq!(mem.read8(0x0100), 0xCD);
        assert_eq!(mem.read8(0x0101), 0xAB);
        assert_eq!(mem.read16(0x0100), 0xABCD);
    }

    #[test]
    fn word_access_wraps_at_address_space_top() {
        let (mut mem, _) = captured();

        mem.write16(0xFFFF, 0xBEEF);

        assert_eq!(mem.read8(0xFFFF), 0xEF);
        assert_eq!(mem.read8(0x0000), 0xBE);
        assert_eq!(mem.read16(0xFFFF), 0xBEEF);
    }

    #[test]
    fn char_port_byte_write_emits_ascii() {
        let (mut mem, buf) = captured();
        let port = MachineConfig::default().port_char_out;

        mem.write8(port, b'A');

        assert_eq!(buf.contents(), "A");
        assert_eq!(mem.read8(port), b'A');
    }

    #[test]
    fn char_port_word_write_emits_low_byte_once() {
        let (mut mem, buf) = captured();
        let port = MachineConfig::default().port_char_out;

        mem.write16(port, u16::from_le_bytes([b'Z', b'Q']));

        assert_eq!(buf.contents(), "Z");
        assert_eq!(mem.read8(port), b'Z');
        assert_eq!(mem.read8(port.wrapping_add(1)), b'Q');
    }

    #[test]
    fn numeric_port_word_write_emits_decimal() {
        let (mut mem, buf) = captured();
        let port = MachineConfig::default().port_numeric_out;

        mem.write16(port, 1234);

        assert_eq!(buf.contents(), "1234 ");
        assert_eq!(mem.read16(port), 1234);
    }

    #[test]
    fn numeric_port_byte_write_emits_decimal() {
        let (mut mem, buf) = captured();
        let port = MachineConfig::default().port_numeric_out;

        mem.write8(port, 42);

        assert_eq!(buf.contents(), "42 ");
        assert_eq!(mem.read8(port), 42);
    }

    #[test]
    fn word_write_straddling_char_port_still_emits() {
        let (mut mem, buf) = captured();
        let port = MachineConfig::default().port_char_out;

        // High byte of the word lands on the port address.
        mem.write16(port.wrapping_sub(1), u16::from_le_bytes([0x00, b'X']));

        assert_eq!(buf.contents(), "X");
    }

    #[test]
    fn timer_ticks_and_wraps() {
        let (mut mem, _) = captured();
        let port = MachineConfig::default().port_timer;

        mem.tick_timer();
        assert_eq!(mem.read8(port), 1);

        mem.write8(port, 255);
        mem.tick_timer();
        assert_eq!(mem.read8(port), 0);
    }

    #[test]
    fn timer_port_write_is_silent() {
        let (mut mem, buf) = captured();
        let port = MachineConfig::default().port_timer;

        mem.write8(port, 99);

        assert_eq!(buf.contents(), "");
        assert_eq!(mem.read8(port), 99);
    }

    #[test]
    fn dump_lists_the_requested_range() {
        let (mut mem, _) = captured();
        mem.write8(0x10, 0xAA);
        mem.write8(0x12, 0xBB);

        let listing = mem.dump(0x10, 0x12);

        assert_eq!(listing, vec![(0x10, 0xAA), (0x11, 0x00), (0x12, 0xBB)]);
    }

    #[test]
    fn load_copies_the_image() {
        let (mut mem, _) = captured();

        mem.load(0x20, &[1, 2, 3]);

        assert_eq!(mem.read8(0x20), 1);
        assert_eq!(mem.read8(0x21), 2);
        assert_eq!(mem.read8(0x22), 3);
    }
}
