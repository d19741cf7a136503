//! Diagnostics raised at the host boundary
//!
//! Design: one `Error` type for every failure this layer can report.
//! - `ErrorKind` carries the structured facts (which parameter, which slot,
//!   which value) and a default rendering
//! - `Error` carries the message actually shown to the host, which is
//!   produced by an `ErrorManager` so that different binding contexts can
//!   word the same failure differently
//! - `ExcType` decides which host exception class the error is raised as

pub mod manager;

pub use manager::{AttrErrors, DefaultErrors, ErrorManager};

use std::fmt;
use thiserror::Error as ThisError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Why a value was rejected as out of range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeViolation {
    /// A negative value where an unsigned/size value is required
    Negative { value: i128 },
    /// Magnitude does not fit in the target width
    IntegerOverflow { value: i128, bits: u32 },
    /// Index is not smaller than the container length
    IndexOutOfBounds { index: usize, len: usize },
}

impl fmt::Display for RangeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative { value } => write!(f, "{} is negative", value),
            Self::IntegerOverflow { value, bits } => {
                write!(f, "{} does not fit in a {}-bit integer", value, bits)
            }
            Self::IndexOutOfBounds { index, len } => {
                write!(f, "index {} is out of bounds for length {}", index, len)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ErrorKind {
    #[error("argument `{param}` in {function}() is missing")]
    MissingArgument { param: String, function: String },

    #[error("expected {expected}, instead got <class '{found}'>")]
    TypeMismatch { expected: String, found: String },

    #[error("value out of range: {0}")]
    ValueOutOfRange(RangeViolation),

    #[error("unknown registration slot: {slot}")]
    UnknownRegistrationSlot { slot: i128 },

    #[error("at most {max} positional arguments accepted, but {given} were given")]
    TooManyPositionalArguments { max: usize, given: usize },

    #[error("unexpected keyword argument `{name}`")]
    UnknownKeywordArgument { name: String },

    #[error("multiple values for argument `{name}`")]
    DuplicateBinding { name: String },

    #[error("subsystem `{subsystem}` failed to initialize: {reason}")]
    SubsystemInitializationFailure { subsystem: String, reason: String },

    #[error("invalid parameter schema for {function}(): {reason}")]
    InvalidSchema { function: String, reason: String },

    #[error("unknown function `{name}`")]
    UnknownFunction { name: String },

    #[error("unknown option `{name}`")]
    UnknownOption { name: String },

    /// Argument combination or shape rejected by a function body
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Argument well-typed but with unusable contents
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
}

impl ErrorKind {
    /// Host exception class this kind is raised as
    pub fn exc_type(&self) -> ExcType {
        match self {
            Self::MissingArgument { .. }
            | Self::TypeMismatch { .. }
            | Self::TooManyPositionalArguments { .. }
            | Self::UnknownKeywordArgument { .. }
            | Self::DuplicateBinding { .. }
            | Self::UnknownFunction { .. }
            | Self::InvalidArgument { .. } => ExcType::TypeError,
            Self::ValueOutOfRange(_)
            | Self::UnknownRegistrationSlot { .. }
            | Self::InvalidSchema { .. }
            | Self::UnknownOption { .. }
            | Self::InvalidValue { .. } => ExcType::ValueError,
            Self::SubsystemInitializationFailure { .. } => ExcType::ImportError,
        }
    }
}

/// Host-side exception categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExcType {
    TypeError,
    ValueError,
    ImportError,
    Warning,
}

impl ExcType {
    pub const ALL: [ExcType; 4] = [
        ExcType::TypeError,
        ExcType::ValueError,
        ExcType::ImportError,
        ExcType::Warning,
    ];

    /// Name of the builtin host class used when nothing was registered
    pub const fn builtin_name(self) -> &'static str {
        match self {
            ExcType::TypeError => "TypeError",
            ExcType::ValueError => "ValueError",
            ExcType::ImportError => "ImportError",
            ExcType::Warning => "UserWarning",
        }
    }
}

/// An error raised to the host caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    message: String,
    function: Option<String>,
    param: Option<String>,
    hints: Vec<String>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            function: None,
            param: None,
            hints: Vec::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn in_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    pub fn for_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints.extend(hints);
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    pub fn exc_type(&self) -> ExcType {
        self.kind.exc_type()
    }

    // ------------------------------------------------------------------------
    // Constructors per failure kind
    // ------------------------------------------------------------------------

    pub fn missing_argument(param: &str, function: &str) -> Self {
        Self::new(ErrorKind::MissingArgument {
            param: param.to_string(),
            function: function.to_string(),
        })
        .in_function(function)
        .for_param(param)
    }

    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        })
    }

    pub fn negative(value: i128) -> Self {
        Self::new(ErrorKind::ValueOutOfRange(RangeViolation::Negative { value }))
    }

    pub fn overflow(value: i128, bits: u32) -> Self {
        Self::new(ErrorKind::ValueOutOfRange(RangeViolation::IntegerOverflow {
            value,
            bits,
        }))
    }

    pub fn index_out_of_bounds(index: usize, len: usize) -> Self {
        Self::new(ErrorKind::ValueOutOfRange(RangeViolation::IndexOutOfBounds {
            index,
            len,
        }))
    }

    pub fn unknown_slot(slot: i128) -> Self {
        Self::new(ErrorKind::UnknownRegistrationSlot { slot })
            .with_message(format!("Unknown index: {}", slot))
    }

    pub fn too_many_positional(function: &str, max: usize, given: usize) -> Self {
        let message = if max == 0 {
            format!("{}() takes no positional arguments, but {} were given", function, given)
        } else {
            format!(
                "{}() takes at most {} positional argument{}, but {} were given",
                function,
                max,
                if max == 1 { "" } else { "s" },
                given
            )
        };
        Self::new(ErrorKind::TooManyPositionalArguments { max, given })
            .with_message(message)
            .in_function(function)
    }

    pub fn unknown_keyword(function: &str, name: &str) -> Self {
        Self::new(ErrorKind::UnknownKeywordArgument { name: name.to_string() })
            .with_message(format!(
                "{}() got an unexpected keyword argument `{}`",
                function, name
            ))
            .in_function(function)
            .for_param(name)
    }

    pub fn duplicate_binding(function: &str, name: &str) -> Self {
        Self::new(ErrorKind::DuplicateBinding { name: name.to_string() })
            .with_message(format!(
                "{}() got multiple values for argument `{}`",
                function, name
            ))
            .in_function(function)
            .for_param(name)
    }

    pub fn subsystem_failure(subsystem: &str, cause: &Error) -> Self {
        Self::new(ErrorKind::SubsystemInitializationFailure {
            subsystem: subsystem.to_string(),
            reason: cause.message().to_string(),
        })
    }

    pub fn invalid_schema(function: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSchema {
            function: function.to_string(),
            reason: reason.into(),
        })
        .in_function(function)
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::new(ErrorKind::UnknownFunction { name: name.to_string() })
    }

    pub fn unknown_option(name: &str) -> Self {
        Self::new(ErrorKind::UnknownOption { name: name.to_string() })
            .with_message(format!("Unknown option `{}`", name))
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(ErrorKind::InvalidArgument { reason: reason.clone() }).with_message(reason)
    }

    pub fn invalid_value(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::new(ErrorKind::InvalidValue { reason: reason.clone() }).with_message(reason)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for hint in &self.hints {
            write!(f, "\n  hint: {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

/// Compute Levenshtein distance for "did you mean" suggestions
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() { return b_chars.len(); }
    if b_chars.is_empty() { return a_chars.len(); }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Find similar names for "did you mean" suggestions
pub fn find_similar_names<'a, I>(target: &str, candidates: I, max_distance: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut results: Vec<(&str, usize)> = candidates
        .into_iter()
        .map(|c| (c, levenshtein_distance(target, c)))
        .filter(|(_, dist)| *dist <= max_distance && *dist > 0)
        .collect();

    results.sort_by_key(|(_, dist)| *dist);
    results.into_iter().map(|(name, _)| name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exc_type_mapping() {
        assert_eq!(Error::negative(-1).exc_type(), ExcType::ValueError);
        assert_eq!(Error::unknown_slot(11).exc_type(), ExcType::ValueError);
        assert_eq!(Error::unknown_keyword("f", "x").exc_type(), ExcType::TypeError);
        assert_eq!(Error::missing_argument("x", "f").exc_type(), ExcType::TypeError);
    }

    #[test]
    fn test_display_with_hints() {
        let err = Error::unknown_keyword("frame_column_rowindex", "frme")
            .with_hint("did you mean `frame`?");
        assert_eq!(
            err.to_string(),
            "frame_column_rowindex() got an unexpected keyword argument `frme`\n  hint: did you mean `frame`?"
        );
    }

    #[test]
    fn test_too_many_positional_message() {
        let err = Error::too_many_positional("f", 1, 3);
        assert_eq!(err.message(), "f() takes at most 1 positional argument, but 3 were given");
        let err = Error::too_many_positional("g", 0, 1);
        assert_eq!(err.message(), "g() takes no positional arguments, but 1 were given");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("frame", "frame"), 0);
        assert_eq!(levenshtein_distance("frme", "frame"), 1);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(find_similar_names("nme", ["name", "names", "stype"], 2), vec!["name", "names"]);
    }
}
