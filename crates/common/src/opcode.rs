//! Opcode definitions for the Ember instruction set.
//!
//! The numeric values are part of the bytecode contract: cross-compiled
//! programs rely on this exact numbering.

use crate::error::DecodeError;

/// Identifies the operation to perform.
///
/// The `#[repr(u8)]` attribute ensures each variant has a stable byte value.
/// Values 31..=254 are reserved for future use and rejected on decode.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// No operation.
    Nop = 0,
    /// Print the string at table index `arg1`, followed by a newline.
    Print = 1,
    /// Drive pin `arg1` high. Subject to the allowed-pin whitelist.
    LedOn = 2,
    /// Drive pin `arg1` low. Subject to the allowed-pin whitelist.
    LedOff = 3,
    /// Block for `arg1` milliseconds.
    Delay = 4,
    /// Push an integer immediate (`arg1` reinterpreted as i32).
    Push = 5,
    /// Pop and discard the top of stack.
    Pop = 6,
    /// Pop two values, push their sum. Concatenates if either is a string.
    Add = 7,
    /// Pop two values, push their difference.
    Sub = 8,
    /// Pop two values, push their product.
    Mul = 9,
    /// Pop two values, push their quotient. Division by zero is a soft error.
    Div = 10,
    /// Unconditional jump to instruction index `arg1`.
    Jump = 11,
    /// Pop one value; jump to `arg1` if it is non-zero / non-empty.
    JumpIf = 12,
    /// Peek (not pop) the top of stack and print it.
    PrintNum = 13,
    /// Pop a value and store it under the variable named at string index `arg1`.
    Store = 14,
    /// Push the value of the variable named at string index `arg1`.
    Load = 15,
    /// Pop two integers, push the remainder. Integer-only.
    Mod = 16,
    /// Replace the top of stack with its absolute value.
    Abs = 17,
    /// Pop base and exponent, push base^exponent.
    Pow = 18,
    /// Pop two values, push 0 if equal, 1 otherwise.
    Eq = 19,
    /// Pop two values, push 0 if not equal, 1 otherwise.
    Neq = 20,
    /// Pop two values, push 0 if a < b, 1 otherwise.
    Lt = 21,
    /// Pop two values, push 0 if a > b, 1 otherwise.
    Gt = 22,
    /// Pop two values, push 0 if a <= b, 1 otherwise.
    Lte = 23,
    /// Pop two values, push 0 if a >= b, 1 otherwise.
    Gte = 24,
    /// Push a float immediate (`arg1` is the raw f32 bit pattern).
    PushFloat = 25,
    /// Push a string reference (table index `arg1`).
    PushString = 26,
    /// Read a line from the console and store it under the variable at `arg1`.
    Input = 27,
    /// Pop two numbers, push the larger.
    Max = 28,
    /// Pop two numbers, push the smaller.
    Min = 29,
    /// Replace the top of stack with its square root.
    Sqrt = 30,
    /// Stop execution.
    Halt = 255,
}

/// All valid opcodes, in numeric order. Useful for exhaustive testing.
pub const ALL_OPCODES: [Opcode; 32] = [
    Opcode::Nop,
    Opcode::Print,
    Opcode::LedOn,
    Opcode::LedOff,
    Opcode::Delay,
    Opcode::Push,
    Opcode::Pop,
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::Jump,
    Opcode::JumpIf,
    Opcode::PrintNum,
    Opcode::Store,
    Opcode::Load,
    Opcode::Mod,
    Opcode::Abs,
    Opcode::Pow,
    Opcode::Eq,
    Opcode::Neq,
    Opcode::Lt,
    Opcode::Gt,
    Opcode::Lte,
    Opcode::Gte,
    Opcode::PushFloat,
    Opcode::PushString,
    Opcode::Input,
    Opcode::Max,
    Opcode::Min,
    Opcode::Sqrt,
    Opcode::Halt,
];

impl TryFrom<u8> for Opcode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Nop),
            1 => Ok(Opcode::Print),
            2 => Ok(Opcode::LedOn),
            3 => Ok(Opcode::LedOff),
            4 => Ok(Opcode::Delay),
            5 => Ok(Opcode::Push),
            6 => Ok(Opcode::Pop),
            7 => Ok(Opcode::Add),
            8 => Ok(Opcode::Sub),
            9 => Ok(Opcode::Mul),
            10 => Ok(Opcode::Div),
            11 => Ok(Opcode::Jump),
            12 => Ok(Opcode::JumpIf),
            13 => Ok(Opcode::PrintNum),
            14 => Ok(Opcode::Store),
            15 => Ok(Opcode::Load),
            16 => Ok(Opcode::Mod),
            17 => Ok(Opcode::Abs),
            18 => Ok(Opcode::Pow),
            19 => Ok(Opcode::Eq),
            20 => Ok(Opcode::Neq),
            21 => Ok(Opcode::Lt),
            22 => Ok(Opcode::Gt),
            23 => Ok(Opcode::Lte),
            24 => Ok(Opcode::Gte),
            25 => Ok(Opcode::PushFloat),
            26 => Ok(Opcode::PushString),
            27 => Ok(Opcode::Input),
            28 => Ok(Opcode::Max),
            29 => Ok(Opcode::Min),
            30 => Ok(Opcode::Sqrt),
            255 => Ok(Opcode::Halt),

            // 31..=254 are reserved.
            _ => Err(DecodeError::ReservedOpcode(value)),
        }
    }
}

impl Opcode {
    /// Returns the assembly mnemonic for this opcode.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Nop => "NOP",
            Opcode::Print => "PRINT",
            Opcode::LedOn => "LED_ON",
            Opcode::LedOff => "LED_OFF",
            Opcode::Delay => "DELAY",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Jump => "JUMP",
            Opcode::JumpIf => "JUMP_IF",
            Opcode::PrintNum => "PRINT_NUM",
            Opcode::Store => "STORE",
            Opcode::Load => "LOAD",
            Opcode::Mod => "MOD",
            Opcode::Abs => "ABS",
            Opcode::Pow => "POW",
            Opcode::Eq => "EQ",
            Opcode::Neq => "NEQ",
            Opcode::Lt => "LT",
            Opcode::Gt => "GT",
            Opcode::Lte => "LTE",
            Opcode::Gte => "GTE",
            Opcode::PushFloat => "PUSH_FLOAT",
            Opcode::PushString => "PUSH_STRING",
            Opcode::Input => "INPUT",
            Opcode::Max => "MAX",
            Opcode::Min => "MIN",
            Opcode::Sqrt => "SQRT",
            Opcode::Halt => "HALT",
        }
    }

    /// True if `arg1` of this opcode is an index into the string table.
    pub fn takes_string_index(&self) -> bool {
        matches!(
            self,
            Opcode::Print | Opcode::PushString | Opcode::Store | Opcode::Load | Opcode::Input
        )
    }

    /// True if `arg1` of this opcode is an instruction index.
    pub fn takes_jump_target(&self) -> bool {
        matches!(self, Opcode::Jump | Opcode::JumpIf)
    }
}
