//! Bytecode verification: static checks a program must pass before the VM
//! will load it.
//!
//! Verification collects ALL violations, not just the first. Opcode-set
//! membership needs no check here — a `Program` can only hold decoded
//! [`Opcode`] values.

use ember_common::{Opcode, Program};

use crate::config::SecurityConfig;
use crate::error::VerifyError;

/// Hard cap on verified program length, independent of `max_instructions`.
pub const MAX_PROGRAM_LEN: usize = 10_000;

/// Hard cap on verified string-table size.
pub const MAX_STRING_TABLE_LEN: usize = 1_000;

/// Hard cap on a single DELAY, in milliseconds.
pub const MAX_DELAY_MS: u32 = 60_000;

/// Programs longer than this must contain a HALT.
const HALT_REQUIRED_ABOVE: usize = 10;

impl SecurityConfig {
    /// Verify a program against this configuration.
    ///
    /// Returns `Ok(())` if the program is safe to load, or every violation
    /// found. A program that fails verification must never execute.
    pub fn verify_bytecode(&self, program: &Program) -> Result<(), Vec<VerifyError>> {
        let instrs = &program.instructions;
        let mut errors = Vec::new();

        if instrs.len() > MAX_PROGRAM_LEN {
            errors.push(VerifyError::ProgramTooLarge { size: instrs.len() });
        }
        if program.strings.len() > MAX_STRING_TABLE_LEN {
            errors.push(VerifyError::StringTableTooLarge {
                size: program.strings.len(),
            });
        }

        for (at, instr) in instrs.iter().enumerate() {
            if instr.opcode.takes_jump_target() && instr.arg1 as usize >= instrs.len() {
                errors.push(VerifyError::InvalidJumpTarget {
                    at,
                    target: instr.arg1,
                });
            }

            if instr.opcode.takes_string_index() && instr.arg1 as usize >= program.strings.len() {
                errors.push(VerifyError::InvalidStringIndex {
                    at,
                    index: instr.arg1,
                });
            }

            match instr.opcode {
                Opcode::LedOn | Opcode::LedOff => {
                    let allowed = u8::try_from(instr.arg1)
                        .is_ok_and(|pin| self.is_pin_allowed(pin));
                    if !allowed {
                        errors.push(VerifyError::UnauthorizedPin {
                            at,
                            pin: instr.arg1,
                        });
                    }
                }
                Opcode::Delay if instr.arg1 > MAX_DELAY_MS => {
                    errors.push(VerifyError::ExcessiveDelay {
                        at,
                        ms: instr.arg1,
                    });
                }
                _ => {}
            }
        }

        if instrs.len() > HALT_REQUIRED_ABOVE && !instrs.iter().any(|i| i.opcode == Opcode::Halt) {
            errors.push(VerifyError::MissingHalt);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_common::Instruction;

    fn halt() -> Instruction {
        Instruction::nullary(Opcode::Halt)
    }

    #[test]
    fn minimal_valid_program() {
        let config = SecurityConfig::default();
        let program = Program::new(vec![Instruction::push_int(42), halt()], vec![]);
        assert!(config.verify_bytecode(&program).is_ok());
    }

    #[test]
    fn empty_program_is_valid() {
        let config = SecurityConfig::default();
        assert!(config.verify_bytecode(&Program::default()).is_ok());
    }

    #[test]
    fn program_too_large() {
        let config = SecurityConfig::default();
        let mut instrs = vec![Instruction::nullary(Opcode::Nop); MAX_PROGRAM_LEN + 1];
        *instrs.last_mut().unwrap() = halt();
        let program = Program::new(instrs, vec![]);
        let errors = config.verify_bytecode(&program).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, VerifyError::ProgramTooLarge { .. })));
    }

    #[test]
    fn string_table_too_large() {
        let config = SecurityConfig::default();
        let strings = (0..=MAX_STRING_TABLE_LEN).map(|i| i.to_string()).collect();
        let program = Program::new(vec![halt()], strings);
        let errors = config.verify_bytecode(&program).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, VerifyError::StringTableTooLarge { .. })));
    }

    #[test]
    fn jump_target_out_of_range() {
        let config = SecurityConfig::default();
        let program = Program::new(vec![Instruction::new(Opcode::Jump, 2), halt()], vec![]);
        let errors = config.verify_bytecode(&program).unwrap_err();
        assert_eq!(
            errors,
            vec![VerifyError::InvalidJumpTarget { at: 0, target: 2 }]
        );
    }

    #[test]
    fn jump_if_target_checked_too() {
        let config = SecurityConfig::default();
        let program = Program::new(
            vec![
                Instruction::push_int(1),
                Instruction::new(Opcode::JumpIf, 99),
                halt(),
            ],
            vec![],
        );
        let errors = config.verify_bytecode(&program).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, VerifyError::InvalidJumpTarget { at: 1, target: 99 })));
    }

    #[test]
    fn string_index_out_of_range() {
        let config = SecurityConfig::default();
        for opcode in [
            Opcode::Print,
            Opcode::PushString,
            Opcode::Store,
            Opcode::Load,
            Opcode::Input,
        ] {
            let program = Program::new(
                vec![Instruction::new(opcode, 1), halt()],
                vec!["only".to_string()],
            );
            let errors = config.verify_bytecode(&program).unwrap_err();
            assert!(
                errors
                    .iter()
                    .any(|e| matches!(e, VerifyError::InvalidStringIndex { at: 0, index: 1 })),
                "missing string-index error for {opcode:?}"
            );
        }
    }

    #[test]
    fn unauthorized_pin() {
        let config = SecurityConfig::default();
        let program = Program::new(vec![Instruction::new(Opcode::LedOn, 14), halt()], vec![]);
        let errors = config.verify_bytecode(&program).unwrap_err();
        assert_eq!(errors, vec![VerifyError::UnauthorizedPin { at: 0, pin: 14 }]);
    }

    #[test]
    fn pin_above_byte_range_rejected() {
        let config = SecurityConfig::default();
        let program = Program::new(vec![Instruction::new(Opcode::LedOff, 300), halt()], vec![]);
        let errors = config.verify_bytecode(&program).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, VerifyError::UnauthorizedPin { pin: 300, .. })));
    }

    #[test]
    fn allowed_pin_passes() {
        let config = SecurityConfig::default();
        let program = Program::new(vec![Instruction::new(Opcode::LedOn, 13), halt()], vec![]);
        assert!(config.verify_bytecode(&program).is_ok());
    }

    #[test]
    fn excessive_delay() {
        let config = SecurityConfig::default();
        let program = Program::new(vec![Instruction::new(Opcode::Delay, 60_001), halt()], vec![]);
        let errors = config.verify_bytecode(&program).unwrap_err();
        assert_eq!(
            errors,
            vec![VerifyError::ExcessiveDelay { at: 0, ms: 60_001 }]
        );
    }

    #[test]
    fn delay_at_cap_passes() {
        let config = SecurityConfig::default();
        let program = Program::new(vec![Instruction::new(Opcode::Delay, 60_000), halt()], vec![]);
        assert!(config.verify_bytecode(&program).is_ok());
    }

    #[test]
    fn long_program_needs_halt() {
        let config = SecurityConfig::default();
        let program = Program::new(vec![Instruction::nullary(Opcode::Nop); 11], vec![]);
        let errors = config.verify_bytecode(&program).unwrap_err();
        assert_eq!(errors, vec![VerifyError::MissingHalt]);
    }

    #[test]
    fn short_program_without_halt_passes() {
        let config = SecurityConfig::default();
        let program = Program::new(vec![Instruction::nullary(Opcode::Nop); 10], vec![]);
        assert!(config.verify_bytecode(&program).is_ok());
    }

    #[test]
    fn multiple_errors_collected() {
        let config = SecurityConfig::default();
        let mut instrs = vec![
            Instruction::new(Opcode::Jump, 500),
            Instruction::new(Opcode::Print, 0),
            Instruction::new(Opcode::LedOn, 99),
        ];
        instrs.extend(vec![Instruction::nullary(Opcode::Nop); 10]);
        let program = Program::new(instrs, vec![]);
        let errors = config.verify_bytecode(&program).unwrap_err();
        assert!(errors.len() >= 4, "expected 4+ errors, got {errors:?}");
    }
}
