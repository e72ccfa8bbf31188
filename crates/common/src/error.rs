//! Decode errors for raw Ember opcode bytes.

use thiserror::Error;

/// Errors that occur when interpreting raw bytes as opcodes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Opcode byte falls in the reserved range (31..=254).
    #[error("reserved opcode: {0:#04x}")]
    ReservedOpcode(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_reserved_opcode() {
        assert_eq!(
            DecodeError::ReservedOpcode(0x1F).to_string(),
            "reserved opcode: 0x1f"
        );
    }
}
