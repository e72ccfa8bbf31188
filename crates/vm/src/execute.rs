//! The fetch/dispatch loop and one handler per opcode.
//!
//! Two error regimes, per the language's error policy:
//!
//! - **soft**: arithmetic overflow, division by zero, missing variables,
//!   disallowed pins. An `ERROR:` line goes to the console, the operation
//!   yields a typed default, execution continues.
//! - **fatal** ([`VmError`]): stack over/underflow, invalid jump targets,
//!   invalid string indices, exhausted budgets. The error is echoed and
//!   the machine halts.

use ember_common::{Instruction, Opcode, Value};

use crate::error::VmError;
use crate::io::{Clock, Console, Pins};
use crate::machine::{Vm, VmState, ITERATION_LIMIT};

/// INPUT waits this long for a console line.
const INPUT_TIMEOUT_MS: u32 = 30_000;

impl<'a, C: Console, P: Pins, K: Clock> Vm<'a, C, P, K> {
    /// Run until HALT or a fatal condition.
    pub fn run(&mut self) {
        while self.step() {}
    }

    /// Execute one instruction.
    ///
    /// Returns `true` if the machine can take another step. Fatal errors
    /// and budget exhaustion report to the console and halt.
    pub fn step(&mut self) -> bool {
        if self.state == VmState::Halted || self.pc >= self.program.len() {
            self.state = VmState::Halted;
            return false;
        }
        self.state = VmState::Running;

        self.iteration_count += 1;
        if self.iteration_count > ITERATION_LIMIT {
            self.fail(VmError::IterationLimitExceeded {
                limit: ITERATION_LIMIT,
            });
            return false;
        }

        let instr = self.program.instructions[self.pc];
        self.pc += 1;

        if let Err(error) = self.dispatch(&instr) {
            self.fail(error);
            return false;
        }

        self.instruction_count += 1;
        if self.instruction_count > self.config.max_instructions() {
            self.fail(VmError::InstructionLimitExceeded {
                limit: self.config.max_instructions(),
            });
            return false;
        }

        self.state == VmState::Running
    }

    fn fail(&mut self, error: VmError) {
        self.console.print_line(&format!("ERROR: {error}"));
        self.last_error = Some(error);
        self.state = VmState::Halted;
    }

    fn dispatch(&mut self, instr: &Instruction) -> Result<(), VmError> {
        match instr.opcode {
            Opcode::Nop => Ok(()),
            Opcode::Halt => {
                self.state = VmState::Halted;
                Ok(())
            }

            Opcode::Print => self.exec_print(instr),
            Opcode::PrintNum => self.exec_print_num(),

            Opcode::LedOn => self.exec_led(instr, true),
            Opcode::LedOff => self.exec_led(instr, false),
            Opcode::Delay => {
                self.clock.sleep_ms(instr.arg1);
                Ok(())
            }

            Opcode::Push => self.push(Value::Int(instr.int_immediate())),
            Opcode::PushFloat => self.push(Value::Float(instr.float_immediate())),
            Opcode::PushString => self.exec_push_string(instr),
            Opcode::Pop => self.pop().map(|_| ()),

            Opcode::Add => self.exec_add(),
            Opcode::Sub => self.exec_binary_numeric(
                "subtraction",
                i32::checked_sub,
                |a, b| a - b,
            ),
            Opcode::Mul => self.exec_binary_numeric(
                "multiplication",
                i32::checked_mul,
                |a, b| a * b,
            ),
            Opcode::Div => self.exec_div(),
            Opcode::Mod => self.exec_mod(),
            Opcode::Abs => self.exec_abs(),
            Opcode::Pow => self.exec_pow(),
            Opcode::Max => self.exec_min_max(true),
            Opcode::Min => self.exec_min_max(false),
            Opcode::Sqrt => self.exec_sqrt(),

            Opcode::Eq
            | Opcode::Neq
            | Opcode::Lt
            | Opcode::Gt
            | Opcode::Lte
            | Opcode::Gte => self.exec_comparison(instr.opcode),

            Opcode::Jump => self.exec_jump(instr.arg1),
            Opcode::JumpIf => self.exec_jump_if(instr.arg1),

            Opcode::Store => self.exec_store(instr),
            Opcode::Load => self.exec_load(instr),
            Opcode::Input => self.exec_input(instr),
        }
    }

    // ---- Console ----

    fn string_arg(&self, instr: &Instruction) -> Result<&str, VmError> {
        self.program
            .strings
            .get(instr.arg1 as usize)
            .map(String::as_str)
            .ok_or(VmError::InvalidStringIndex {
                at: self.at(),
                index: instr.arg1,
            })
    }

    fn exec_print(&mut self, instr: &Instruction) -> Result<(), VmError> {
        let text = self.string_arg(instr)?.to_string();
        self.console.print_line(&text);
        Ok(())
    }

    fn exec_print_num(&mut self) -> Result<(), VmError> {
        let value = self.peek()?;
        let text = match value {
            Value::Int(v) => v.to_string(),
            Value::Float(f) => format!("{f:.2}"),
            Value::Str(index) => self.program.string(index).unwrap_or("").to_string(),
        };
        self.console.print_line(&text);
        Ok(())
    }

    // ---- Pins and clock ----

    fn exec_led(&mut self, instr: &Instruction, high: bool) -> Result<(), VmError> {
        let pin = match u8::try_from(instr.arg1) {
            Ok(pin) if self.config.is_pin_allowed(pin) => pin,
            _ => {
                self.console
                    .print_line(&format!("ERROR: pin not allowed: {}", instr.arg1));
                return Ok(());
            }
        };
        self.pins.set_output(pin);
        self.pins.write(pin, high);
        let state = if high { "ON" } else { "OFF" };
        self.console.print_line(&format!("LED {state} pin {pin}"));
        Ok(())
    }

    // ---- Stack ----

    fn exec_push_string(&mut self, instr: &Instruction) -> Result<(), VmError> {
        self.string_arg(instr)?;
        self.push(Value::Str(instr.arg1 as u16))
    }

    // ---- Arithmetic ----

    fn soft_error(&mut self, message: &str) {
        self.console.print_line(&format!("ERROR: {message}"));
    }

    /// Shared shape for SUB and MUL: floats promote, integers are
    /// overflow-checked, non-numeric operands yield integer zero.
    fn exec_binary_numeric(
        &mut self,
        name: &str,
        int_op: fn(i32, i32) -> Option<i32>,
        float_op: fn(f32, f32) -> f32,
    ) -> Result<(), VmError> {
        let (a, b) = self.pop2()?;
        let result = match (a, b) {
            (Value::Int(x), Value::Int(y)) => match int_op(x, y) {
                Some(v) => Value::Int(v),
                None => {
                    self.soft_error(&format!("integer overflow in {name}"));
                    Value::Int(0)
                }
            },
            _ if a.is_numeric() && b.is_numeric() => {
                Value::Float(float_op(a.as_f32(), b.as_f32()))
            }
            _ => Value::Int(0),
        };
        self.push(result)
    }

    fn exec_add(&mut self) -> Result<(), VmError> {
        let (a, b) = self.pop2()?;

        // `+` is polymorphic: any string operand turns it into
        // concatenation, and the result is interned.
        if matches!(a, Value::Str(_)) || matches!(b, Value::Str(_)) {
            let combined = format!("{}{}", self.display_value(a), self.display_value(b));
            let index = self.intern_runtime(&combined);
            return self.push(Value::Str(index));
        }

        let result = match (a, b) {
            (Value::Int(x), Value::Int(y)) => match x.checked_add(y) {
                Some(v) => Value::Int(v),
                None => {
                    self.soft_error("integer overflow in addition");
                    Value::Int(0)
                }
            },
            _ => Value::Float(a.as_f32() + b.as_f32()),
        };
        self.push(result)
    }

    fn exec_div(&mut self) -> Result<(), VmError> {
        let (a, b) = self.pop2()?;
        let result = match (a, b) {
            (Value::Int(x), Value::Int(y)) => {
                if y == 0 {
                    self.soft_error("division by zero");
                    Value::Int(0)
                } else if x == i32::MIN && y == -1 {
                    self.soft_error("integer overflow in division");
                    Value::Int(0)
                } else {
                    Value::Int(x / y)
                }
            }
            _ if a.is_numeric() && b.is_numeric() => {
                let divisor = b.as_f32();
                if divisor == 0.0 {
                    self.soft_error("division by zero");
                    Value::Float(0.0)
                } else {
                    Value::Float(a.as_f32() / divisor)
                }
            }
            _ => Value::Int(0),
        };
        self.push(result)
    }

    fn exec_mod(&mut self) -> Result<(), VmError> {
        let (a, b) = self.pop2()?;
        let result = match (a, b) {
            (Value::Int(x), Value::Int(y)) => {
                if y == 0 {
                    self.soft_error("modulo by zero");
                    Value::Int(0)
                } else if x == i32::MIN && y == -1 {
                    // The one case where % itself would overflow.
                    Value::Int(0)
                } else {
                    Value::Int(x % y)
                }
            }
            _ => {
                self.soft_error("modulo requires integer operands");
                Value::Int(0)
            }
        };
        self.push(result)
    }

    fn exec_abs(&mut self) -> Result<(), VmError> {
        let value = self.peek()?;
        let result = match value {
            Value::Int(i32::MIN) => {
                self.soft_error("integer overflow in absolute value");
                Value::Int(i32::MAX)
            }
            Value::Int(v) => Value::Int(v.abs()),
            Value::Float(f) => Value::Float(f.abs()),
            Value::Str(_) => Value::Int(0),
        };
        self.set_top(result);
        Ok(())
    }

    fn exec_pow(&mut self) -> Result<(), VmError> {
        let (a, b) = self.pop2()?;
        let result = match (a, b) {
            (Value::Int(base), Value::Int(exponent)) => self.int_pow(base, exponent),
            _ if a.is_numeric() && b.is_numeric() => {
                Value::Float(a.as_f32().powf(b.as_f32()))
            }
            _ => Value::Int(0),
        };
        self.push(result)
    }

    /// Integer power by repeated multiplication, overflow-checked at each
    /// step.
    fn int_pow(&mut self, base: i32, exponent: i32) -> Value {
        if exponent < 0 {
            self.soft_error("negative exponent in power operation");
            return Value::Int(0);
        }
        let mut result: i32 = 1;
        for _ in 0..exponent {
            match result.checked_mul(base) {
                Some(v) => result = v,
                None => {
                    self.soft_error("integer overflow in power operation");
                    return Value::Int(0);
                }
            }
        }
        Value::Int(result)
    }

    fn exec_min_max(&mut self, want_max: bool) -> Result<(), VmError> {
        let (a, b) = self.pop2()?;
        let result = match (a, b) {
            (Value::Int(x), Value::Int(y)) => {
                Value::Int(if want_max { x.max(y) } else { x.min(y) })
            }
            _ if a.is_numeric() && b.is_numeric() => {
                let (x, y) = (a.as_f32(), b.as_f32());
                Value::Float(if want_max { x.max(y) } else { x.min(y) })
            }
            _ => Value::Int(0),
        };
        self.push(result)
    }

    fn exec_sqrt(&mut self) -> Result<(), VmError> {
        let value = self.peek()?;
        let result = match value {
            Value::Int(v) if v < 0 => {
                self.soft_error("square root of negative number");
                Value::Float(0.0)
            }
            Value::Int(v) => Value::Float((v as f32).sqrt()),
            Value::Float(f) if f < 0.0 => {
                self.soft_error("square root of negative number");
                Value::Float(0.0)
            }
            Value::Float(f) => Value::Float(f.sqrt()),
            Value::Str(_) => Value::Int(0),
        };
        self.set_top(result);
        Ok(())
    }

    // ---- Comparison ----

    /// All six relations push 0 for true, 1 for false. Mixed numerics
    /// promote to float; string/number pairs compare false.
    fn exec_comparison(&mut self, op: Opcode) -> Result<(), VmError> {
        let (a, b) = self.pop2()?;
        let holds = match (a, b) {
            (Value::Str(x), Value::Str(y)) => {
                let sx = self.program.string(x).unwrap_or("");
                let sy = self.program.string(y).unwrap_or("");
                match op {
                    Opcode::Eq => sx == sy,
                    Opcode::Neq => sx != sy,
                    Opcode::Lt => sx < sy,
                    Opcode::Gt => sx > sy,
                    Opcode::Lte => sx <= sy,
                    Opcode::Gte => sx >= sy,
                    _ => false,
                }
            }
            (Value::Int(x), Value::Int(y)) => match op {
                Opcode::Eq => x == y,
                Opcode::Neq => x != y,
                Opcode::Lt => x < y,
                Opcode::Gt => x > y,
                Opcode::Lte => x <= y,
                Opcode::Gte => x >= y,
                _ => false,
            },
            _ if a.is_numeric() && b.is_numeric() => {
                let (x, y) = (a.as_f32(), b.as_f32());
                match op {
                    Opcode::Eq => x == y,
                    Opcode::Neq => x != y,
                    Opcode::Lt => x < y,
                    Opcode::Gt => x > y,
                    Opcode::Lte => x <= y,
                    Opcode::Gte => x >= y,
                    _ => false,
                }
            }
            _ => false,
        };
        self.push(Value::Int(if holds { 0 } else { 1 }))
    }

    // ---- Control flow ----

    fn exec_jump(&mut self, target: u32) -> Result<(), VmError> {
        if (target as usize) < self.program.len() {
            self.pc = target as usize;
            Ok(())
        } else {
            Err(VmError::InvalidJumpTarget {
                at: self.at(),
                target,
            })
        }
    }

    fn exec_jump_if(&mut self, target: u32) -> Result<(), VmError> {
        let condition = self.pop()?;
        if self.branch_taken(condition) {
            self.exec_jump(target)
        } else {
            Ok(())
        }
    }

    // ---- Variables ----

    fn exec_store(&mut self, instr: &Instruction) -> Result<(), VmError> {
        let name = self.string_arg(instr)?.to_string();
        let value = self.pop()?;
        self.variables.insert(name, value);
        Ok(())
    }

    fn exec_load(&mut self, instr: &Instruction) -> Result<(), VmError> {
        let name = self.string_arg(instr)?.to_string();
        match self.variables.get(&name) {
            Some(&value) => self.push(value),
            None => {
                self.soft_error(&format!("variable not found: {name}"));
                self.push(Value::Int(0))
            }
        }
    }

    fn exec_input(&mut self, instr: &Instruction) -> Result<(), VmError> {
        let name = self.string_arg(instr)?.to_string();
        self.console.print_line(&format!("INPUT {name}:"));

        let reply = self
            .console
            .read_line_with_timeout(INPUT_TIMEOUT_MS)
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty());

        let Some(text) = reply else {
            self.console.print_line("TIMEOUT - using default value 0");
            self.variables.insert(name, Value::Int(0));
            return Ok(());
        };

        let value = if let Some(v) = parse_input_int(&text) {
            Value::Int(v)
        } else if let Some(f) = parse_input_float(&text) {
            Value::Float(f)
        } else {
            Value::Str(self.intern_runtime(&text))
        };
        self.variables.insert(name, value);
        self.console.print_line(&format!("-> {text}"));
        Ok(())
    }
}

/// Integer-shaped input: optional leading `-`, then digits. Values that
/// overflow i32 fall through to the string branch.
fn parse_input_int(text: &str) -> Option<i32> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Float-shaped input: optional leading `-`, digits with exactly one `.`.
fn parse_input_float(text: &str) -> Option<f32> {
    let body = text.strip_prefix('-').unwrap_or(text);
    let mut seen_dot = false;
    for b in body.bytes() {
        if b == b'.' {
            if seen_dot {
                return None;
            }
            seen_dot = true;
        } else if !b.is_ascii_digit() {
            return None;
        }
    }
    if !seen_dot {
        return None;
    }
    text.parse().ok()
}
