//! Ember common types.
//!
//! This crate provides the foundational data structures shared by the
//! compiler, the security layer, and the VM:
//!
//! - [`Opcode`] — the 32 defined opcodes with their fixed byte values
//! - [`Instruction`] — the (opcode, arg1, arg2) record
//! - [`Value`] — tagged runtime values (int / float / string reference)
//! - [`Program`] — an instruction sequence plus its string table
//! - [`DecodeError`] — errors from decoding raw opcode bytes
//!
//! # Dependencies
//!
//! This crate uses `thiserror` (compile-time proc-macro, zero runtime cost)
//! and has no other dependencies.

pub mod error;
pub mod instruction;
pub mod opcode;
pub mod program;
pub mod value;

// Re-export commonly used types at the crate root.
pub use error::DecodeError;
pub use instruction::Instruction;
pub use opcode::Opcode;
pub use program::Program;
pub use value::Value;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy that generates a random valid Opcode.
    fn arb_opcode() -> impl Strategy<Value = Opcode> {
        prop::sample::select(&opcode::ALL_OPCODES[..])
    }

    proptest! {
        /// For all valid opcodes, byte conversion roundtrips.
        #[test]
        fn opcode_byte_roundtrip(op in arb_opcode()) {
            let byte = op as u8;
            prop_assert_eq!(Opcode::try_from(byte).unwrap(), op);
        }

        /// For any byte, try_from either succeeds (and the value converts
        /// back to the same byte) or reports it as reserved — never panics.
        #[test]
        fn any_byte_resolves(byte in any::<u8>()) {
            match Opcode::try_from(byte) {
                Ok(op) => prop_assert_eq!(op as u8, byte),
                Err(DecodeError::ReservedOpcode(b)) => prop_assert_eq!(b, byte),
            }
        }

        /// Integer immediates survive the u32 reinterpretation.
        #[test]
        fn int_immediate_roundtrip(v in any::<i32>()) {
            prop_assert_eq!(Instruction::push_int(v).int_immediate(), v);
        }

        /// Float immediates survive the bit-pattern encoding exactly.
        #[test]
        fn float_immediate_roundtrip(bits in any::<u32>()) {
            let f = f32::from_bits(bits);
            let instr = Instruction::push_float(f);
            prop_assert_eq!(instr.float_immediate().to_bits(), bits);
        }
    }
}
