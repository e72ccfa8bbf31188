//! Ember security policy — the layer that constrains both the compiler and
//! the VM.
//!
//! The policy is a single mutable record, [`SecurityConfig`], holding
//! resource limits and the allowed-pin whitelist. It offers:
//!
//! - validating setters that reject out-of-range limits without mutating,
//! - [`SecurityConfig::is_pin_allowed`] for the GPIO sandbox,
//! - [`SecurityConfig::sanitize_string`] applied to every string entering
//!   the VM,
//! - [`SecurityConfig::verify_bytecode`] — static verification that must
//!   pass before a program may execute.
//!
//! # Usage
//!
//! ```
//! use ember_common::{Instruction, Opcode, Program};
//! use ember_security::SecurityConfig;
//!
//! let config = SecurityConfig::default();
//! let program = Program::new(
//!     vec![Instruction::push_int(42), Instruction::nullary(Opcode::Halt)],
//!     vec![],
//! );
//! assert!(config.verify_bytecode(&program).is_ok());
//! ```

pub mod config;
pub mod error;
pub mod verify;

pub use config::SecurityConfig;
pub use error::{SecurityError, VerifyError};
