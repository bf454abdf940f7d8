//! Machine state seam between the monitor and the emulator
//!
//! The expression evaluator never touches emulator internals directly; it
//! reads registers and memory through the [`Machine`] trait.  This module
//! also owns the fixed register name table and [`Cpu`], a minimal concrete
//! machine state used by the emulator glue and by tests.
//!
//! # Register Names
//!
//! The 32 general-purpose registers are addressed by their `$`-prefixed
//! RISC-V ABI names (`$ra`, `$sp`, `$a0`, ...).  The table index is the GPR
//! number, so `$a0` resolves to register 10.

use rustc_hash::FxHashMap;

/// Number of general-purpose registers.
pub const NR_REGISTERS: usize = 32;

/// `$`-prefixed ABI names for the 32 GPRs, in register-number order.
pub const REGISTER_NAMES: [&str; NR_REGISTERS] = [
    "$0", "$ra", "$sp", "$gp", "$tp", "$t0", "$t1", "$t2", "$s0", "$s1", "$a0",
    "$a1", "$a2", "$a3", "$a4", "$a5", "$a6", "$a7", "$s2", "$s3", "$s4",
    "$s5", "$s6", "$s7", "$s8", "$s9", "$s10", "$s11", "$t3", "$t4", "$t5",
    "$t6",
];

/// Resolve a `$`-prefixed register name to its GPR number.
///
/// The match is exact: `$a0` resolves, `a0` and `$A0` do not.
pub fn register_index(name: &str) -> Option<usize> {
    REGISTER_NAMES.iter().position(|&n| n == name)
}

/// Read access to live machine state.
///
/// Both reads are synchronous and infallible: every register index below
/// [`NR_REGISTERS`] holds a value, and every address is readable (unmapped
/// memory reads as whatever the implementation chooses; [`Cpu`] reads it
/// as zero).
pub trait Machine {
    /// Read general-purpose register `index` (`index < NR_REGISTERS`).
    fn read_register(&self, index: usize) -> u32;

    /// Read a little-endian 4-byte value from `addr`.
    fn read_memory_u32(&self, addr: u32) -> u32;
}

/// Minimal concrete machine state: 32 GPRs plus a sparse, byte-addressed
/// memory image.
///
/// Unwritten memory reads as zero.  Register 0 is writable here; whether it
/// is hard-wired to zero is the emulator core's business, not the monitor's.
#[derive(Debug, Clone, Default)]
pub struct Cpu {
    gpr: [u32; NR_REGISTERS],
    mem: FxHashMap<u32, u8>,
}

impl Cpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_register(&mut self, index: usize, value: u32) {
        self.gpr[index] = value;
    }

    pub fn write_memory_u8(&mut self, addr: u32, value: u8) {
        self.mem.insert(addr, value);
    }

    /// Store a little-endian 4-byte value at `addr`.
    pub fn write_memory_u32(&mut self, addr: u32, value: u32) {
        for (i, byte) in value.to_le_bytes().into_iter().enumerate() {
            self.mem.insert(addr.wrapping_add(i as u32), byte);
        }
    }
}

impl Machine for Cpu {
    fn read_register(&self, index: usize) -> u32 {
        self.gpr[index]
    }

    fn read_memory_u32(&self, addr: u32) -> u32 {
        let mut bytes = [0u8; 4];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = self
                .mem
                .get(&addr.wrapping_add(i as u32))
                .copied()
                .unwrap_or(0);
        }
        u32::from_le_bytes(bytes)
    }
}
