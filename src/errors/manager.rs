//! Error managers - message strategies for strict conversions
//!
//! Conversion routines in `core::convert` never format messages themselves.
//! They ask the `ErrorManager` they were handed for the error object of the
//! failure kind they detected. The default methods word errors generically;
//! an argument descriptor words them in terms of its parameter, an option
//! setter in terms of the option.

use super::Error;
use crate::core::HostValue;

/// Strategy producing one error object per conversion failure kind
pub trait ErrorManager {
    /// Subject of the messages, e.g. "Argument `i` in function f()"
    fn subject(&self) -> Option<String> {
        None
    }

    /// Attach context (function/parameter) to an error built by this manager
    fn decorate(&self, error: Error) -> Error {
        error
    }

    /// Generic type-mismatch error for `expected`
    fn mismatch(&self, expected: &str, got: &HostValue) -> Error {
        let message = match self.subject() {
            Some(subject) => format!(
                "{} should be {}, instead got <class '{}'>",
                subject,
                expected,
                got.type_name()
            ),
            None => format!(
                "Expected {}, instead got <class '{}'>",
                expected,
                got.type_name()
            ),
        };
        self.decorate(Error::type_mismatch(expected, got.type_name()).with_message(message))
    }

    fn error_not_list(&self, got: &HostValue) -> Error {
        self.mismatch("a list or tuple", got)
    }

    fn error_not_stype(&self, got: &HostValue) -> Error {
        self.mismatch("an stype", got)
    }

    fn error_not_boolean(&self, got: &HostValue) -> Error {
        self.mismatch("a boolean", got)
    }

    fn error_not_integer(&self, got: &HostValue) -> Error {
        self.mismatch("an integer", got)
    }

    fn error_not_double(&self, got: &HostValue) -> Error {
        self.mismatch("a float", got)
    }

    fn error_not_string(&self, got: &HostValue) -> Error {
        self.mismatch("a string", got)
    }

    fn error_not_dict(&self, got: &HostValue) -> Error {
        self.mismatch("a dict", got)
    }

    fn error_not_tuple(&self, got: &HostValue) -> Error {
        self.mismatch("a tuple", got)
    }

    fn error_not_range(&self, got: &HostValue) -> Error {
        self.mismatch("a range", got)
    }

    fn error_not_frame(&self, got: &HostValue) -> Error {
        self.mismatch("a Frame", got)
    }

    fn error_not_rowindex(&self, got: &HostValue) -> Error {
        self.mismatch("a RowIndex", got)
    }

    /// A list element that should have been a string
    fn error_not_string_item(&self, index: usize, got: &HostValue) -> Error {
        let subject = self.subject().unwrap_or_else(|| "Value".to_string());
        let message = format!(
            "{} should be a list of strings, but element {} is <class '{}'>",
            subject,
            index,
            got.type_name()
        );
        self.decorate(Error::type_mismatch("a string", got.type_name()).with_message(message))
    }

    fn error_int_negative(&self, value: i128) -> Error {
        let message = match self.subject() {
            Some(subject) => format!("{} cannot be negative: {}", subject, value),
            None => format!("Expected a non-negative integer, instead got {}", value),
        };
        self.decorate(Error::negative(value).with_message(message))
    }

    fn error_int_overflow(&self, value: i128, bits: u32) -> Error {
        let subject = self.subject().unwrap_or_else(|| "Value".to_string());
        let message = format!(
            "{} is out of range for a {}-bit integer: {}",
            subject, bits, value
        );
        self.decorate(Error::overflow(value, bits).with_message(message))
    }
}

/// Context-free messages
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrors;

impl ErrorManager for DefaultErrors {}

/// Messages for a single attribute/option setter
#[derive(Debug, Clone)]
pub struct AttrErrors<'a> {
    owner: &'a str,
    attr: &'a str,
}

impl<'a> AttrErrors<'a> {
    pub fn new(owner: &'a str, attr: &'a str) -> Self {
        Self { owner, attr }
    }

    pub fn option(attr: &'a str) -> Self {
        Self::new("option", attr)
    }
}

impl ErrorManager for AttrErrors<'_> {
    fn subject(&self) -> Option<String> {
        Some(format!("Value for {} `{}`", self.owner, self.attr))
    }

    fn decorate(&self, error: Error) -> Error {
        error.for_param(self.attr)
    }

    fn mismatch(&self, expected: &str, got: &HostValue) -> Error {
        let message = format!(
            "Invalid value for {} `{}`: expected {}, instead got <class '{}'>",
            self.owner,
            self.attr,
            expected,
            got.type_name()
        );
        self.decorate(Error::type_mismatch(expected, got.type_name()).with_message(message))
    }
}
