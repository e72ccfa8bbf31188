//! Error types for the Ember security policy.

use thiserror::Error;

/// Rejections from [`SecurityConfig`](crate::SecurityConfig) setters.
///
/// A rejected setter leaves the configuration unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecurityError {
    /// A limit value fell outside its documented range.
    #[error("{name} must be between {min} and {max}")]
    LimitOutOfRange {
        name: &'static str,
        min: u32,
        max: u32,
    },
}

/// Violations found by bytecode verification.
///
/// Every variant that refers to an instruction includes its index (`at`).
/// A program with any violation is refused at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Program exceeds the hard instruction-count cap.
    #[error("program too large: {size} instructions")]
    ProgramTooLarge { size: usize },

    /// String table exceeds the hard entry cap.
    #[error("string table too large: {size} entries")]
    StringTableTooLarge { size: usize },

    /// JUMP or JUMP_IF target is not a valid instruction index.
    #[error("invalid jump target {target} at instruction {at}")]
    InvalidJumpTarget { at: usize, target: u32 },

    /// A string-arg opcode indexes past the end of the string table.
    #[error("invalid string index {index} at instruction {at}")]
    InvalidStringIndex { at: usize, index: u32 },

    /// LED_ON/LED_OFF names a pin outside the allowed set.
    #[error("unauthorized pin {pin} at instruction {at}")]
    UnauthorizedPin { at: usize, pin: u32 },

    /// DELAY longer than the 60-second cap.
    #[error("excessive delay {ms}ms at instruction {at}")]
    ExcessiveDelay { at: usize, ms: u32 },

    /// A program longer than ten instructions must contain a HALT.
    #[error("program missing HALT instruction")]
    MissingHalt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_limit_out_of_range() {
        let e = SecurityError::LimitOutOfRange {
            name: "max_stack_size",
            min: 16,
            max: 2048,
        };
        assert_eq!(e.to_string(), "max_stack_size must be between 16 and 2048");
    }

    #[test]
    fn display_verify_errors() {
        assert_eq!(
            VerifyError::InvalidJumpTarget { at: 3, target: 99 }.to_string(),
            "invalid jump target 99 at instruction 3"
        );
        assert_eq!(
            VerifyError::UnauthorizedPin { at: 0, pin: 14 }.to_string(),
            "unauthorized pin 14 at instruction 0"
        );
        assert_eq!(
            VerifyError::MissingHalt.to_string(),
            "program missing HALT instruction"
        );
    }
}
