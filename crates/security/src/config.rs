//! The shared security configuration record.
//!
//! One `SecurityConfig` is owned by the host and read by both the compiler
//! and the VM. Limits are mutated only through validating setters; a
//! rejected setter leaves the previous value in place.

use std::collections::BTreeSet;

use crate::error::SecurityError;

/// Configurable limits and the allowed-pin whitelist.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    max_string_length: usize,
    max_variable_name_length: usize,
    max_expression_depth: usize,
    max_loop_depth: usize,
    max_if_depth: usize,
    max_stack_size: usize,
    max_instructions: u32,
    allowed_pins: BTreeSet<u8>,
}

impl Default for SecurityConfig {
    /// Defaults sized for a small microcontroller target: short strings,
    /// shallow nesting, and the classic digital pins 2..=13 allowed.
    fn default() -> Self {
        Self {
            max_string_length: 256,
            max_variable_name_length: 32,
            max_expression_depth: 32,
            max_loop_depth: 16,
            max_if_depth: 16,
            max_stack_size: 256,
            max_instructions: 100_000,
            allowed_pins: (2..=13).collect(),
        }
    }
}

fn check_range(
    value: usize,
    min: usize,
    max: usize,
    name: &'static str,
) -> Result<(), SecurityError> {
    if value < min || value > max {
        return Err(SecurityError::LimitOutOfRange {
            name,
            min: min as u32,
            max: max as u32,
        });
    }
    Ok(())
}

impl SecurityConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Validating setters ----

    /// Set the maximum interned-string length. Range [1, 4096].
    pub fn set_max_string_length(&mut self, length: usize) -> Result<(), SecurityError> {
        check_range(length, 1, 4096, "max_string_length")?;
        self.max_string_length = length;
        Ok(())
    }

    /// Set the maximum variable-name length. Range [1, 256].
    pub fn set_max_variable_name_length(&mut self, length: usize) -> Result<(), SecurityError> {
        check_range(length, 1, 256, "max_variable_name_length")?;
        self.max_variable_name_length = length;
        Ok(())
    }

    /// Set the maximum nesting depth for expression compilation. Range [1, 256].
    pub fn set_max_expression_depth(&mut self, depth: usize) -> Result<(), SecurityError> {
        check_range(depth, 1, 256, "max_expression_depth")?;
        self.max_expression_depth = depth;
        Ok(())
    }

    /// Set the maximum `for` nesting depth. Range [1, 64].
    pub fn set_max_loop_depth(&mut self, depth: usize) -> Result<(), SecurityError> {
        check_range(depth, 1, 64, "max_loop_depth")?;
        self.max_loop_depth = depth;
        Ok(())
    }

    /// Set the maximum `if` nesting depth. Range [1, 64].
    pub fn set_max_if_depth(&mut self, depth: usize) -> Result<(), SecurityError> {
        check_range(depth, 1, 64, "max_if_depth")?;
        self.max_if_depth = depth;
        Ok(())
    }

    /// Set the VM value-stack capacity. Range [16, 2048].
    pub fn set_max_stack_size(&mut self, size: usize) -> Result<(), SecurityError> {
        check_range(size, 16, 2048, "max_stack_size")?;
        self.max_stack_size = size;
        Ok(())
    }

    /// Set the executed-instruction budget. Range [1_000, 1_000_000].
    pub fn set_max_instructions(&mut self, count: u32) -> Result<(), SecurityError> {
        if !(1_000..=1_000_000).contains(&count) {
            return Err(SecurityError::LimitOutOfRange {
                name: "max_instructions",
                min: 1_000,
                max: 1_000_000,
            });
        }
        self.max_instructions = count;
        Ok(())
    }

    /// Replace the allowed-pin whitelist. Pin numbers are inherently
    /// limited to [0, 255] by the `u8` type; the pin driver may narrow
    /// further.
    pub fn set_allowed_pins(&mut self, pins: impl IntoIterator<Item = u8>) {
        self.allowed_pins = pins.into_iter().collect();
    }

    // ---- Read access ----

    pub fn max_string_length(&self) -> usize {
        self.max_string_length
    }

    pub fn max_variable_name_length(&self) -> usize {
        self.max_variable_name_length
    }

    pub fn max_expression_depth(&self) -> usize {
        self.max_expression_depth
    }

    pub fn max_loop_depth(&self) -> usize {
        self.max_loop_depth
    }

    pub fn max_if_depth(&self) -> usize {
        self.max_if_depth
    }

    pub fn max_stack_size(&self) -> usize {
        self.max_stack_size
    }

    pub fn max_instructions(&self) -> u32 {
        self.max_instructions
    }

    /// True if the VM may drive this pin.
    pub fn is_pin_allowed(&self, pin: u8) -> bool {
        self.allowed_pins.contains(&pin)
    }

    // ---- Sanitization ----

    /// Sanitize a string before it enters the VM's string table.
    ///
    /// Printable ASCII passes through, with a backslash prefixed to
    /// `\\ " ' \``; space, tab, newline and carriage return pass through;
    /// every other character becomes `?`. Once the output reaches
    /// `max_string_length` characters, the literal `...` is appended and
    /// the walk stops.
    pub fn sanitize_string(&self, input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut written = 0usize;
        for c in input.chars() {
            match c {
                '\\' | '"' | '\'' | '`' => {
                    out.push('\\');
                    out.push(c);
                    written += 2;
                }
                ' ' | '\t' | '\n' | '\r' => {
                    out.push(c);
                    written += 1;
                }
                _ if (' '..='~').contains(&c) => {
                    out.push(c);
                    written += 1;
                }
                _ => {
                    out.push('?');
                    written += 1;
                }
            }
            if written >= self.max_string_length {
                out.push_str("...");
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SecurityConfig::default();
        assert_eq!(config.max_string_length(), 256);
        assert_eq!(config.max_variable_name_length(), 32);
        assert_eq!(config.max_expression_depth(), 32);
        assert_eq!(config.max_loop_depth(), 16);
        assert_eq!(config.max_if_depth(), 16);
        assert_eq!(config.max_stack_size(), 256);
        assert_eq!(config.max_instructions(), 100_000);
        assert!(config.is_pin_allowed(13));
        assert!(!config.is_pin_allowed(0));
        assert!(!config.is_pin_allowed(14));
    }

    #[test]
    fn setter_accepts_in_range() {
        let mut config = SecurityConfig::default();
        assert!(config.set_max_string_length(4096).is_ok());
        assert_eq!(config.max_string_length(), 4096);
        assert!(config.set_max_stack_size(16).is_ok());
        assert_eq!(config.max_stack_size(), 16);
        assert!(config.set_max_instructions(1_000).is_ok());
        assert_eq!(config.max_instructions(), 1_000);
    }

    #[test]
    fn setter_rejects_without_mutating() {
        let mut config = SecurityConfig::default();

        assert!(config.set_max_string_length(0).is_err());
        assert!(config.set_max_string_length(4097).is_err());
        assert_eq!(config.max_string_length(), 256);

        assert!(config.set_max_variable_name_length(257).is_err());
        assert_eq!(config.max_variable_name_length(), 32);

        assert!(config.set_max_expression_depth(0).is_err());
        assert!(config.set_max_expression_depth(257).is_err());
        assert_eq!(config.max_expression_depth(), 32);

        assert!(config.set_max_loop_depth(65).is_err());
        assert!(config.set_max_if_depth(65).is_err());

        assert!(config.set_max_stack_size(15).is_err());
        assert!(config.set_max_stack_size(2049).is_err());
        assert_eq!(config.max_stack_size(), 256);

        assert!(config.set_max_instructions(999).is_err());
        assert!(config.set_max_instructions(1_000_001).is_err());
        assert_eq!(config.max_instructions(), 100_000);
    }

    #[test]
    fn allowed_pins_replaced() {
        let mut config = SecurityConfig::default();
        config.set_allowed_pins([3, 7]);
        assert!(config.is_pin_allowed(3));
        assert!(config.is_pin_allowed(7));
        assert!(!config.is_pin_allowed(13));
    }

    #[test]
    fn sanitize_passthrough() {
        let config = SecurityConfig::default();
        assert_eq!(config.sanitize_string("hello world"), "hello world");
        assert_eq!(config.sanitize_string("a\tb\nc"), "a\tb\nc");
    }

    #[test]
    fn sanitize_escapes_quote_characters() {
        let config = SecurityConfig::default();
        assert_eq!(config.sanitize_string(r#"a"b"#), r#"a\"b"#);
        assert_eq!(config.sanitize_string("it's"), r"it\'s");
        assert_eq!(config.sanitize_string(r"a\b"), r"a\\b");
        assert_eq!(config.sanitize_string("`cmd`"), r"\`cmd\`");
    }

    #[test]
    fn sanitize_replaces_other_bytes() {
        let config = SecurityConfig::default();
        assert_eq!(config.sanitize_string("a\x01b"), "a?b");
        assert_eq!(config.sanitize_string("héllo"), "h?llo");
    }

    #[test]
    fn sanitize_truncates_with_ellipsis() {
        let mut config = SecurityConfig::default();
        config.set_max_string_length(4).unwrap();
        assert_eq!(config.sanitize_string("abcdefgh"), "abcd...");
        // Exactly at the limit also stops the walk.
        assert_eq!(config.sanitize_string("abcd"), "abcd...");
        assert_eq!(config.sanitize_string("abc"), "abc");
    }

    #[test]
    fn sanitize_idempotent_for_short_clean_input() {
        let config = SecurityConfig::default();
        let once = config.sanitize_string("plain text 123");
        assert_eq!(config.sanitize_string(&once), once);
    }
}
