//! Human-readable disassembly of compiled programs.

use ember_common::{Opcode, Program};
use std::fmt::Write;

/// Render a program as one instruction per line, with string operands
/// resolved against the program's table.
pub fn disassemble(program: &Program) -> String {
    let mut out = String::new();
    for (i, instr) in program.instructions.iter().enumerate() {
        let _ = write!(out, "{i}: ");
        match instr.opcode {
            Opcode::Print | Opcode::PushString => {
                let _ = match program.strings.get(instr.arg1 as usize) {
                    Some(text) => writeln!(out, "{} \"{text}\"", instr.opcode.mnemonic()),
                    None => writeln!(out, "{} <invalid string>", instr.opcode.mnemonic()),
                };
            }
            Opcode::Store | Opcode::Load | Opcode::Input => {
                let _ = match program.strings.get(instr.arg1 as usize) {
                    Some(name) => writeln!(out, "{} {name}", instr.opcode.mnemonic()),
                    None => writeln!(out, "{} <invalid var>", instr.opcode.mnemonic()),
                };
            }
            Opcode::LedOn | Opcode::LedOff => {
                let _ = writeln!(out, "{} pin={}", instr.opcode.mnemonic(), instr.arg1);
            }
            Opcode::Delay => {
                let _ = writeln!(out, "DELAY {}ms", instr.arg1);
            }
            Opcode::Push => {
                let _ = writeln!(out, "PUSH {}", instr.int_immediate());
            }
            Opcode::PushFloat => {
                let _ = writeln!(out, "PUSH_FLOAT {:.4}", instr.float_immediate());
            }
            Opcode::Jump | Opcode::JumpIf => {
                let _ = writeln!(out, "{} {}", instr.opcode.mnemonic(), instr.arg1);
            }
            _ => {
                let _ = writeln!(out, "{}", instr.opcode.mnemonic());
            }
        }
    }
    out
}
