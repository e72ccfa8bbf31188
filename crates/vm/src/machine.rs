//! VM state: value stack, variable map, program, counters, lifecycle.

use std::collections::{BTreeMap, HashMap};

use ember_common::{Program, Value};
use ember_security::{SecurityConfig, VerifyError};

use crate::error::VmError;
use crate::io::{Clock, Console, Pins};

/// Hard cap on loop iterations per run, independent of `max_instructions`.
pub const ITERATION_LIMIT: u32 = 100_000;

/// Runtime cap on string-table growth (indices are 16-bit).
pub(crate) const MAX_RUNTIME_STRINGS: usize = 65_535;

/// VM lifecycle.
///
/// `load_program` moves `Halted`/`Ready` to `Ready` only when verification
/// passes; `step`/`run` move to `Running`; `HALT`, `stop`, or any fatal
/// condition moves to `Halted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Halted,
    Ready,
    Running,
}

/// The Ember virtual machine.
///
/// Generic over its three host collaborators; hosted code passes the stubs
/// from [`crate::io`], firmware passes its drivers.
pub struct Vm<'a, C: Console, P: Pins, K: Clock> {
    pub(crate) config: &'a SecurityConfig,
    pub(crate) console: C,
    pub(crate) pins: P,
    pub(crate) clock: K,
    pub(crate) program: Program,
    /// Runtime interner over `program.strings`.
    pub(crate) string_lookup: HashMap<String, u16>,
    pub(crate) stack: Vec<Value>,
    /// Ordered so dumps and iteration are deterministic.
    pub(crate) variables: BTreeMap<String, Value>,
    pub(crate) pc: usize,
    pub(crate) state: VmState,
    pub(crate) instruction_count: u32,
    pub(crate) iteration_count: u32,
    pub(crate) last_error: Option<VmError>,
}

impl<'a, C: Console, P: Pins, K: Clock> Vm<'a, C, P, K> {
    /// Create an idle VM with no program loaded.
    pub fn new(config: &'a SecurityConfig, console: C, pins: P, clock: K) -> Self {
        Self {
            config,
            console,
            pins,
            clock,
            program: Program::default(),
            string_lookup: HashMap::new(),
            stack: Vec::new(),
            variables: BTreeMap::new(),
            pc: 0,
            state: VmState::Halted,
            instruction_count: 0,
            iteration_count: 0,
            last_error: None,
        }
    }

    fn reset_state(&mut self) {
        self.pc = 0;
        self.stack.clear();
        self.variables.clear();
        self.string_lookup.clear();
        self.instruction_count = 0;
        self.iteration_count = 0;
        self.last_error = None;
    }

    /// Load a program: reset, sanitize every string, verify, install.
    ///
    /// On verification failure nothing is installed, the VM stays `Halted`,
    /// and the violations are returned for the host to report.
    pub fn load_program(&mut self, program: Program) -> Result<(), Vec<VerifyError>> {
        self.reset_state();
        self.program = Program::default();
        self.state = VmState::Halted;

        let sanitized = Program::new(
            program.instructions,
            program
                .strings
                .iter()
                .map(|s| self.config.sanitize_string(s))
                .collect(),
        );

        self.config.verify_bytecode(&sanitized)?;

        for (i, text) in sanitized.strings.iter().enumerate() {
            self.string_lookup.insert(text.clone(), i as u16);
        }
        self.program = sanitized;
        self.state = VmState::Ready;
        Ok(())
    }

    /// Cancel execution and reset pc/sp. The loaded program stays.
    pub fn stop(&mut self) {
        self.state = VmState::Halted;
        self.pc = 0;
        self.stack.clear();
    }

    // ---- Accessors ----

    pub fn state(&self) -> VmState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == VmState::Running
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Current stack depth.
    pub fn sp(&self) -> usize {
        self.stack.len()
    }

    pub fn instruction_count(&self) -> u32 {
        self.instruction_count
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    /// Current value of a variable, if set.
    pub fn variable(&self, name: &str) -> Option<Value> {
        self.variables.get(name).copied()
    }

    /// The fatal error that ended the last run, if any.
    pub fn last_error(&self) -> Option<&VmError> {
        self.last_error.as_ref()
    }

    // ---- Stack discipline ----

    /// Index of the instruction currently executing (pc is post-increment).
    pub(crate) fn at(&self) -> usize {
        self.pc.saturating_sub(1)
    }

    pub(crate) fn push(&mut self, value: Value) -> Result<(), VmError> {
        if self.stack.len() >= self.config.max_stack_size() {
            return Err(VmError::StackOverflow { at: self.at() });
        }
        self.stack.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<Value, VmError> {
        self.stack
            .pop()
            .ok_or(VmError::StackUnderflow { at: self.at() })
    }

    /// Pop two values; the second element of the pair was the top.
    pub(crate) fn pop2(&mut self) -> Result<(Value, Value), VmError> {
        if self.stack.len() < 2 {
            return Err(VmError::StackUnderflow { at: self.at() });
        }
        let b = self.pop()?;
        let a = self.pop()?;
        Ok((a, b))
    }

    pub(crate) fn peek(&self) -> Result<Value, VmError> {
        self.stack
            .last()
            .copied()
            .ok_or(VmError::StackUnderflow { at: self.at() })
    }

    /// Overwrite the top of stack. Callers peek first, so the slot exists.
    pub(crate) fn set_top(&mut self, value: Value) {
        if let Some(top) = self.stack.last_mut() {
            *top = value;
        }
    }

    // ---- Strings ----

    /// Intern a string at runtime (concatenation results, INPUT text).
    ///
    /// Sanitizes first, then reuses an existing entry via the lookup map.
    /// A full table is a soft error yielding index 0.
    pub(crate) fn intern_runtime(&mut self, text: &str) -> u16 {
        let safe = self.config.sanitize_string(text);
        if let Some(&index) = self.string_lookup.get(&safe) {
            return index;
        }
        if self.program.strings.len() >= MAX_RUNTIME_STRINGS {
            self.console.print_line("ERROR: string table overflow");
            return 0;
        }
        let index = self.program.strings.len() as u16;
        self.program.strings.push(safe.clone());
        self.string_lookup.insert(safe, index);
        index
    }

    /// Render a value the way `+`-concatenation sees it: ints in decimal,
    /// floats with three fractional digits, strings as their contents.
    pub(crate) fn display_value(&self, value: Value) -> String {
        match value {
            Value::Int(v) => v.to_string(),
            Value::Float(f) => format!("{f:.3}"),
            Value::Str(index) => self.program.string(index).unwrap_or("").to_string(),
        }
    }

    /// True when `JUMP_IF` takes the branch on this value: non-zero
    /// integer, non-zero float, or non-empty string. Comparisons encode
    /// true as 0, so a passing test falls through and a failing one
    /// branches.
    pub(crate) fn branch_taken(&self, value: Value) -> bool {
        match value {
            Value::Int(v) => v != 0,
            Value::Float(f) => f != 0.0,
            Value::Str(index) => !self.program.string(index).unwrap_or("").is_empty(),
        }
    }

    // ---- Diagnostics ----

    /// Print the machine state through the console: pc, sp, up to ten
    /// stack slots, and every variable.
    pub fn dump_state(&mut self) {
        self.console.print_line("=== VM State ===");
        self.console.print_line(&format!("Program Counter: {}", self.pc));
        self.console
            .print_line(&format!("Stack Pointer: {}", self.stack.len()));

        self.console.print_line("Stack: [");
        for (i, value) in self.stack.iter().take(10).enumerate() {
            let line = format!("  {i}: {} {}", value.type_name(), self.dump_value(*value));
            self.console.print_line(&line);
        }
        if self.stack.len() > 10 {
            self.console.print_line("  ...");
        }
        self.console.print_line("]");

        self.console.print_line("Variables: {");
        let entries: Vec<(String, Value)> = self
            .variables
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        for (name, value) in entries {
            let line = format!("  {name}: {} {}", value.type_name(), self.dump_value(value));
            self.console.print_line(&line);
        }
        self.console.print_line("}");
    }

    fn dump_value(&self, value: Value) -> String {
        match value {
            Value::Int(v) => v.to_string(),
            Value::Float(f) => format!("{f:.4}"),
            Value::Str(index) => format!("\"{}\"", self.program.string(index).unwrap_or("")),
        }
    }
}
