//! Address-space contract between the CPU and the rest of the machine.
//!
//! The CPU never owns memory. Every operation that touches the address space
//! borrows a `Bus` for the duration of the call, so mappers, video and audio
//! registers can all live behind a single implementation owned by the host.

/// Unified 16-bit address space as seen by the CPU.
///
/// Implementations must never fail: unmapped addresses return whatever the
/// mapper defines (open bus, zero, ...). Reads take `&mut self` because I/O
/// registers are allowed to change state when read.
pub trait Bus {
    /// Read a byte at `addr`
    fn read(&mut self, addr: u16) -> u8;

    /// Write a byte at `addr`
    fn write(&mut self, addr: u16, value: u8);
}

/// Reset vector location ($FFFC-$FFFD)
pub const RESET_VECTOR: u16 = 0xFFFC;
/// NMI vector location ($FFFA-$FFFB)
pub const NMI_VECTOR: u16 = 0xFFFA;
/// IRQ/BRK vector location ($FFFE-$FFFF)
pub const IRQ_VECTOR: u16 = 0xFFFE;
/// Base address of the hardware stack page
pub const STACK_BASE: u16 = 0x0100;

/// Read a little-endian word through the bus.
#[inline]
pub fn read_u16<B: Bus + ?Sized>(bus: &mut B, addr: u16) -> u16 {
    let lo = bus.read(addr) as u16;
    let hi = bus.read(addr.wrapping_add(1)) as u16;
    (hi << 8) | lo
}

/// Flat 64 KiB RAM with no mapping at all.
///
/// Used by tests, benchmarks and the headless runner.
#[derive(Debug, Clone)]
pub struct FlatMemory {
    pub data: Box<[u8; 0x10000]>,
}

impl FlatMemory {
    pub fn new() -> Self {
        Self {
            data: Box::new([0; 0x10000]),
        }
    }

    /// Copy `bytes` into memory starting at `offset`.
    ///
    /// Anything that would land past $FFFF is dropped.
    pub fn load(&mut self, offset: u16, bytes: &[u8]) {
        let start = offset as usize;
        let len = bytes.len().min(0x10000 - start);
        self.data[start..start + len].copy_from_slice(&bytes[..len]);
    }

    /// Load a program and point the reset vector at it
    pub fn load_program(&mut self, offset: u16, bytes: &[u8]) {
        self.load(offset, bytes);
        self.set_vector(RESET_VECTOR, offset);
    }

    /// Store `target` little-endian at `vector`
    pub fn set_vector(&mut self, vector: u16, target: u16) {
        self.data[vector as usize] = (target & 0xFF) as u8;
        self.data[vector.wrapping_add(1) as usize] = (target >> 8) as u8;
    }

    /// Read without going through the `Bus` trait (no side effects)
    pub fn peek(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for FlatMemory {
    #[inline]
    fn read(&mut self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    #[inline]
    fn write(&mut self, addr: u16, value: u8) {
        self.data[addr as usize] = value;
    }
}
