//! Ember virtual machine — executes verified bytecode under the security
//! policy's limits.
//!
//! The VM is a stack machine with:
//! - a typed value stack capped at `max_stack_size`
//! - a flat variable map (one namespace per program)
//! - a program counter plus instruction and iteration budgets
//!
//! Side effects go through three host collaborators — [`io::Console`],
//! [`io::Pins`], [`io::Clock`] — so the same core runs against serial/GPIO
//! drivers on hardware and against in-memory stubs in tests.
//!
//! # Usage
//!
//! ```
//! use ember_compiler::compile;
//! use ember_security::SecurityConfig;
//! use ember_vm::io::{BufferConsole, ManualClock, RecordingPins};
//! use ember_vm::Vm;
//!
//! let config = SecurityConfig::default();
//! let output = compile("print \"hello\"\nhalt\n", &config);
//!
//! let mut console = BufferConsole::new();
//! let mut vm = Vm::new(&config, &mut console, RecordingPins::new(), ManualClock::new());
//! vm.load_program(output.program).unwrap();
//! vm.run();
//! drop(vm);
//!
//! assert_eq!(console.lines, vec!["hello"]);
//! ```

pub mod error;
pub mod execute;
pub mod io;
pub mod machine;

pub use error::VmError;
pub use machine::{Vm, VmState, ITERATION_LIMIT};
