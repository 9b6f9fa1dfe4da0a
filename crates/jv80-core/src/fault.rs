use thiserror::Error;

/// Fault taxonomy for the emulator core.
///
/// Microcode faults are fatal to the clock pulse that raised them: the pulse
/// returns immediately, machine state is left exactly as it was, and resuming
/// without a [`reset`](crate::Backplane::reset) is unsupported. Memory faults
/// raised through the out-of-band [`peek`](crate::Memory::peek) /
/// [`poke`](crate::Memory::poke) tooling surface are recoverable and do not
/// disturb execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Fault {
    /// A microcode step carried an action or op-flag combination the bus
    /// cannot execute. Always a table-authoring bug.
    #[error("invalid microcode for opcode {opcode:#04x} at step {step}")]
    InvalidMicroCode {
        /// Opcode whose step sequence is malformed.
        opcode: u8,
        /// Index of the offending step within the expanded sequence.
        step: usize,
    },
    /// The microcode table entry at `index` does not carry `index` in its
    /// opcode field. The table must be exactly indexed by opcode.
    #[error("microcode table entry {index:#04x} carries opcode {found:#04x}")]
    MicroCodeMismatch {
        /// Table index that was decoded.
        index: u8,
        /// Opcode value found in the entry at that index.
        found: u8,
    },
    /// An access targeted an address no bank maps.
    #[error("access to unmapped address {addr:#06x}")]
    UnmappedAddress {
        /// The unmapped address.
        addr: u16,
    },
    /// An out-of-band write targeted a read-only bank.
    #[error("write to read-only address {addr:#06x}")]
    ReadOnly {
        /// The targeted ROM address.
        addr: u16,
    },
    /// A new bank would intersect an existing bank.
    #[error("bank at {start:#06x}+{size:#06x} overlaps an existing bank")]
    BankOverlap {
        /// Start address of the rejected bank.
        start: u16,
        /// Size in bytes of the rejected bank.
        size: u16,
    },
    /// A bank definition does not fit the 16-bit address space.
    #[error("bank at {start:#06x}+{size:#06x} exceeds the address space")]
    InvalidBank {
        /// Start address of the rejected bank.
        start: u16,
        /// Size in bytes of the rejected bank.
        size: u16,
    },
}

impl Fault {
    /// Returns `true` for faults that abort the current clock pulse, as
    /// opposed to recoverable tooling errors.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::InvalidMicroCode { .. }
                | Self::MicroCodeMismatch { .. }
                | Self::UnmappedAddress { .. }
        )
    }
}
