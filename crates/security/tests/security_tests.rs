//! Black-box tests for the security policy: limits, sanitization, and
//! bytecode verification working together over the public API.

use ember_common::{Instruction, Opcode, Program};
use ember_security::{SecurityConfig, SecurityError, VerifyError};

fn halt() -> Instruction {
    Instruction::nullary(Opcode::Halt)
}

#[test]
fn verification_respects_reconfigured_pins() {
    let mut config = SecurityConfig::default();
    let program = Program::new(vec![Instruction::new(Opcode::LedOn, 7), halt()], vec![]);
    assert!(config.verify_bytecode(&program).is_ok());

    config.set_allowed_pins([2, 3]);
    let errors = config.verify_bytecode(&program).unwrap_err();
    assert_eq!(errors, vec![VerifyError::UnauthorizedPin { at: 0, pin: 7 }]);
}

#[test]
fn rejected_setter_reports_its_bounds() {
    let mut config = SecurityConfig::default();
    let err = config.set_max_loop_depth(100).unwrap_err();
    assert_eq!(
        err,
        SecurityError::LimitOutOfRange {
            name: "max_loop_depth",
            min: 1,
            max: 64
        }
    );
    // The old value still applies.
    assert_eq!(config.max_loop_depth(), 16);
}

#[test]
fn sanitize_then_verify_a_program_with_hostile_strings() {
    let config = SecurityConfig::default();
    let strings = vec![
        config.sanitize_string("normal"),
        config.sanitize_string("quote\" and tick'"),
        config.sanitize_string("ctrl\u{7}char"),
    ];
    assert_eq!(strings[1], "quote\\\" and tick\\'");
    assert_eq!(strings[2], "ctrl?char");

    let program = Program::new(
        vec![
            Instruction::new(Opcode::Print, 0),
            Instruction::new(Opcode::Print, 1),
            Instruction::new(Opcode::Print, 2),
            halt(),
        ],
        strings,
    );
    assert!(config.verify_bytecode(&program).is_ok());
}

#[test]
fn every_string_arg_opcode_is_bounds_checked() {
    let config = SecurityConfig::default();
    for opcode in [
        Opcode::Print,
        Opcode::PushString,
        Opcode::Store,
        Opcode::Load,
        Opcode::Input,
    ] {
        let program = Program::new(vec![Instruction::new(opcode, 0), halt()], vec![]);
        assert!(
            config.verify_bytecode(&program).is_err(),
            "{opcode:?} with empty table should fail"
        );
    }
}

#[test]
fn jump_to_last_instruction_is_valid() {
    let config = SecurityConfig::default();
    let program = Program::new(vec![Instruction::new(Opcode::Jump, 1), halt()], vec![]);
    assert!(config.verify_bytecode(&program).is_ok());
}

#[test]
fn jump_one_past_end_is_invalid() {
    let config = SecurityConfig::default();
    let program = Program::new(vec![Instruction::new(Opcode::Jump, 2), halt()], vec![]);
    assert!(config.verify_bytecode(&program).is_err());
}
