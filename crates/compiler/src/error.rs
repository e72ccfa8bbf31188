//! Compile-time diagnostics.
//!
//! Every diagnostic carries the 1-based source line it was found on. The
//! compiler reports and skips the offending line, then keeps going, so one
//! compilation can surface many of these.

use thiserror::Error;

/// A diagnostic produced while compiling one source line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// Source line longer than 512 characters.
    #[error("line {line}: line too long")]
    LineTooLong { line: usize },

    /// The command keyword is not part of the language.
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { line: usize, command: String },

    /// Variable name fails the identifier rules or the length limit.
    #[error("line {line}: invalid variable name '{name}'")]
    InvalidVariableName { line: usize, name: String },

    /// `led` without both a pin and a state argument.
    #[error("line {line}: invalid LED command")]
    InvalidLedCommand { line: usize },

    /// `led` state argument is not on/1/off/0.
    #[error("line {line}: unknown LED state '{state}'")]
    UnknownLedState { line: usize, state: String },

    /// `led` pin outside [0, 255].
    #[error("line {line}: invalid pin number")]
    InvalidPin { line: usize },

    /// `delay` outside [0, 60000]; the emitted value is clamped.
    #[error("line {line}: delay time out of range, clamped")]
    DelayClamped { line: usize },

    /// A literal operand could not be parsed.
    #[error("line {line}: invalid literal '{token}'")]
    InvalidLiteral { line: usize, token: String },

    /// `if` without a condition or the `then` keyword.
    #[error("line {line}: invalid IF command")]
    InvalidIf { line: usize },

    /// `else` with no open `if`.
    #[error("line {line}: ELSE without IF")]
    ElseWithoutIf { line: usize },

    /// `endif` with no open `if`.
    #[error("line {line}: ENDIF without IF")]
    EndifWithoutIf { line: usize },

    /// `if` nesting beyond the configured depth.
    #[error("line {line}: IF nesting too deep")]
    IfTooDeep { line: usize },

    /// `for` header does not match `for <var> = <expr> to <expr>`.
    #[error("line {line}: invalid FOR command")]
    InvalidFor { line: usize },

    /// `endfor` with no open `for`.
    #[error("line {line}: ENDFOR without FOR")]
    EndforWithoutFor { line: usize },

    /// `for` nesting beyond the configured depth.
    #[error("line {line}: loop nesting too deep")]
    LoopTooDeep { line: usize },

    /// `set` without a variable and an expression.
    #[error("line {line}: invalid SET command")]
    InvalidSet { line: usize },

    /// An expression was expected but the text is empty.
    #[error("line {line}: empty expression")]
    EmptyExpression { line: usize },

    /// Expression longer than 1024 characters.
    #[error("line {line}: expression too long")]
    ExpressionTooLong { line: usize },

    /// Call nesting beyond the configured expression depth.
    #[error("line {line}: expression too complex")]
    ExpressionTooDeep { line: usize },

    /// More than 100 tokens in one expression.
    #[error("line {line}: too many tokens in expression")]
    TooManyTokens { line: usize },

    /// A quoted string with no closing quote.
    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },

    /// A call to something other than abs/sqrt/max/min.
    #[error("line {line}: unknown function '{name}'")]
    UnknownFunction { line: usize, name: String },

    /// A call opened a parenthesis that never closes.
    #[error("line {line}: unmatched parenthesis in call")]
    UnmatchedParen { line: usize },

    /// A built-in called with the wrong number of arguments.
    #[error("line {line}: {function} requires {expected} argument(s)")]
    WrongArgCount {
        line: usize,
        function: &'static str,
        expected: usize,
    },

    /// A string literal longer than the configured limit.
    #[error("line {line}: string too long")]
    StringTooLong { line: usize },

    /// The string table hit its 16-bit index cap.
    #[error("line {line}: string table overflow")]
    StringTableFull { line: usize },

    /// The program hit the emit-time instruction cap.
    #[error("line {line}: program too large")]
    ProgramTooLarge { line: usize },

    /// An `if` opened on this line was never closed.
    #[error("line {line}: IF without ENDIF")]
    UnclosedIf { line: usize },

    /// A `for` opened on this line was never closed.
    #[error("line {line}: FOR without ENDFOR")]
    UnclosedFor { line: usize },
}

impl CompileError {
    /// Warnings do not indicate a skipped line; the compiler emitted
    /// something sensible anyway.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            CompileError::UnknownCommand { .. }
                | CompileError::UnknownLedState { .. }
                | CompileError::InvalidLedCommand { .. }
                | CompileError::DelayClamped { .. }
        )
    }

    /// The source line this diagnostic refers to.
    pub fn line(&self) -> usize {
        match self {
            CompileError::LineTooLong { line }
            | CompileError::UnknownCommand { line, .. }
            | CompileError::InvalidVariableName { line, .. }
            | CompileError::InvalidLedCommand { line }
            | CompileError::UnknownLedState { line, .. }
            | CompileError::InvalidPin { line }
            | CompileError::DelayClamped { line }
            | CompileError::InvalidLiteral { line, .. }
            | CompileError::InvalidIf { line }
            | CompileError::ElseWithoutIf { line }
            | CompileError::EndifWithoutIf { line }
            | CompileError::IfTooDeep { line }
            | CompileError::InvalidFor { line }
            | CompileError::EndforWithoutFor { line }
            | CompileError::LoopTooDeep { line }
            | CompileError::InvalidSet { line }
            | CompileError::EmptyExpression { line }
            | CompileError::ExpressionTooLong { line }
            | CompileError::ExpressionTooDeep { line }
            | CompileError::TooManyTokens { line }
            | CompileError::UnterminatedString { line }
            | CompileError::UnknownFunction { line, .. }
            | CompileError::UnmatchedParen { line }
            | CompileError::WrongArgCount { line, .. }
            | CompileError::StringTooLong { line }
            | CompileError::StringTableFull { line }
            | CompileError::ProgramTooLarge { line }
            | CompileError::UnclosedIf { line }
            | CompileError::UnclosedFor { line } => *line,
        }
    }
}
