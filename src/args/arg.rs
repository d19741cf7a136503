//! Argument descriptors
//!
//! Design: one `Arg` per declared parameter, created by `Args::bind` for the
//! duration of a single call.
//! - Predicates never fail; on an undefined argument they return false
//! - Conversions check presence first, then delegate to `core::convert`
//!   with the descriptor itself as the error manager, so diagnostics name
//!   the parameter and the function
//! - Missing required arguments are reported lazily, at conversion time

use std::fmt;
use std::sync::Arc;

use once_cell::unsync::OnceCell;

use super::schema::BundleSchema;
use crate::core::{HostRef, HostValue, RangeValue, SType};
use crate::errors::{Error, ErrorManager, Result};
use crate::frame::{Frame, RowIndex};
use crate::module::Registry;

/// A single bound (or undefined) parameter of a native call
pub struct Arg<'a> {
    pos: usize,
    schema: &'a BundleSchema,
    registry: &'a Registry,
    value: Option<&'a HostRef>,
    cached_name: OnceCell<String>,
}

impl<'a> Arg<'a> {
    pub(crate) fn new(
        pos: usize,
        schema: &'a BundleSchema,
        registry: &'a Registry,
        value: Option<&'a HostRef>,
    ) -> Self {
        debug_assert!(pos < schema.arity());
        Self {
            pos,
            schema,
            registry,
            value,
            cached_name: OnceCell::new(),
        }
    }

    /// Index of the parameter in its schema
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Declared parameter name
    pub fn param_name(&self) -> &'a str {
        &self.schema.names()[self.pos]
    }

    pub fn function_name(&self) -> &'a str {
        self.schema.name()
    }

    /// Display name used in diagnostics, e.g. "Argument `i` in function f()"
    pub fn name(&self) -> &str {
        self.cached_name.get_or_init(|| {
            if self.schema.is_posonly(self.pos) {
                format!("Argument #{} in function {}()", self.pos + 1, self.function_name())
            } else {
                format!(
                    "Argument `{}` in function {}()",
                    self.param_name(),
                    self.function_name()
                )
            }
        })
    }

    pub fn is_required(&self) -> bool {
        self.schema.is_required(self.pos)
    }

    /// The bound host value, or a MissingArgument error
    pub fn value(&self) -> Result<&'a HostRef> {
        self.value.ok_or_else(|| self.missing())
    }

    fn missing(&self) -> Error {
        let prefix = if self.is_required() { "Required argument" } else { "Argument" };
        let label = if self.schema.is_posonly(self.pos) {
            format!("#{}", self.pos + 1)
        } else {
            format!("`{}`", self.param_name())
        };
        Error::missing_argument(self.param_name(), self.function_name()).with_message(format!(
            "{} {} in {}() is missing",
            prefix,
            label,
            self.function_name()
        ))
    }

    #[inline]
    fn check(&self, pred: impl FnOnce(&HostValue) -> bool) -> bool {
        self.value.map_or(false, |v| pred(v.value()))
    }

    // ========================================================================
    // Predicates
    // ========================================================================

    pub fn is_undefined(&self) -> bool {
        self.value.is_none()
    }

    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_none(&self) -> bool {
        self.check(HostValue::is_none)
    }

    pub fn is_none_or_undefined(&self) -> bool {
        self.value.map_or(true, |v| v.is_none())
    }

    pub fn is_ellipsis(&self) -> bool {
        self.check(HostValue::is_ellipsis)
    }

    pub fn is_bool(&self) -> bool {
        self.check(HostValue::is_bool)
    }

    pub fn is_int(&self) -> bool {
        self.check(HostValue::is_int)
    }

    pub fn is_float(&self) -> bool {
        self.check(HostValue::is_float)
    }

    pub fn is_string(&self) -> bool {
        self.check(HostValue::is_string)
    }

    pub fn is_bytes(&self) -> bool {
        self.check(HostValue::is_bytes)
    }

    pub fn is_list(&self) -> bool {
        self.check(HostValue::is_list)
    }

    pub fn is_tuple(&self) -> bool {
        self.check(HostValue::is_tuple)
    }

    pub fn is_list_or_tuple(&self) -> bool {
        self.check(HostValue::is_list_or_tuple)
    }

    pub fn is_dict(&self) -> bool {
        self.check(HostValue::is_dict)
    }

    pub fn is_range(&self) -> bool {
        self.check(HostValue::is_range)
    }

    pub fn is_frame(&self) -> bool {
        self.check(HostValue::is_frame)
    }

    pub fn is_rowindex(&self) -> bool {
        self.check(HostValue::is_rowindex)
    }

    pub fn is_numpy_array(&self) -> bool {
        self.check(HostValue::is_numpy_array)
    }

    pub fn is_pandas_frame(&self) -> bool {
        self.check(HostValue::is_pandas_frame)
    }

    pub fn is_pandas_series(&self) -> bool {
        self.check(HostValue::is_pandas_series)
    }

    // ========================================================================
    // Strict conversions
    // ========================================================================

    /// The underlying host value, unconverted
    pub fn to_host(&self) -> Result<HostRef> {
        self.value().cloned()
    }

    pub fn to_bool_strict(&self) -> Result<bool> {
        self.value()?.to_bool_strict(self)
    }

    pub fn to_int32_strict(&self) -> Result<i32> {
        self.value()?.to_int32_strict(self)
    }

    pub fn to_int64_strict(&self) -> Result<i64> {
        self.value()?.to_int64_strict(self)
    }

    pub fn to_int_exact(&self) -> Result<i128> {
        self.value()?.to_int_exact(self)
    }

    pub fn to_size_t(&self) -> Result<usize> {
        self.value()?.to_size_t(self)
    }

    pub fn to_double(&self) -> Result<f64> {
        self.value()?.to_double(self)
    }

    pub fn to_string(&self) -> Result<&'a str> {
        self.value()?.value().to_str(self)
    }

    pub fn to_stringlist(&self) -> Result<Vec<String>> {
        self.value()?.to_stringlist(self)
    }

    pub fn to_list(&self) -> Result<&'a [HostRef]> {
        self.value()?.value().to_list(self)
    }

    pub fn to_tuple(&self) -> Result<&'a [HostRef]> {
        self.value()?.value().to_tuple(self)
    }

    pub fn to_dict(&self) -> Result<&'a [(HostRef, HostRef)]> {
        self.value()?.value().to_dict(self)
    }

    pub fn to_range(&self) -> Result<RangeValue> {
        self.value()?.to_range(self)
    }

    pub fn to_frame(&self) -> Result<Arc<Frame>> {
        self.value()?.to_frame(self)
    }

    pub fn to_rowindex(&self) -> Result<Arc<RowIndex>> {
        self.value()?.to_rowindex(self)
    }

    pub fn to_stype(&self) -> Result<SType> {
        self.to_stype_with(self)
    }

    /// Stype conversion with caller-supplied diagnostics
    pub fn to_stype_with(&self, em: &dyn ErrorManager) -> Result<SType> {
        self.value()?.to_stype(self.registry, em)
    }

    // ========================================================================
    // Optional arguments with defaults
    // ========================================================================

    pub fn to_bool_or(&self, default: bool) -> Result<bool> {
        if self.is_none_or_undefined() {
            Ok(default)
        } else {
            self.to_bool_strict()
        }
    }

    pub fn to_int64_or(&self, default: i64) -> Result<i64> {
        if self.is_none_or_undefined() {
            Ok(default)
        } else {
            self.to_int64_strict()
        }
    }

    pub fn to_size_t_or(&self, default: usize) -> Result<usize> {
        if self.is_none_or_undefined() {
            Ok(default)
        } else {
            self.to_size_t()
        }
    }

    pub fn to_string_or(&self, default: &'a str) -> Result<&'a str> {
        if self.is_none_or_undefined() {
            Ok(default)
        } else {
            self.to_string()
        }
    }
}

impl ErrorManager for Arg<'_> {
    fn subject(&self) -> Option<String> {
        Some(self.name().to_string())
    }

    fn decorate(&self, error: Error) -> Error {
        error
            .in_function(self.function_name())
            .for_param(self.param_name())
    }
}

impl fmt::Debug for Arg<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arg")
            .field("param", &self.param_name())
            .field("function", &self.function_name())
            .field("value", &self.value)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorKind, RangeViolation};

    fn schema() -> BundleSchema {
        BundleSchema::builder("f")
            .posonly(["p"])
            .positional(["frame", "i"])
            .required(2)
            .build()
            .unwrap()
    }

    #[test]
    fn test_display_names() {
        let schema = schema();
        let registry = Registry::new();
        let p = Arg::new(0, &schema, &registry, None);
        let i = Arg::new(2, &schema, &registry, None);
        assert_eq!(p.name(), "Argument #1 in function f()");
        assert_eq!(i.name(), "Argument `i` in function f()");
    }

    #[test]
    fn test_missing_is_lazy() {
        let schema = schema();
        let registry = Registry::new();
        let arg = Arg::new(1, &schema, &registry, None);
        assert!(arg.is_undefined());
        assert!(!arg.is_int());

        let err = arg.to_frame().unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::MissingArgument {
                param: "frame".into(),
                function: "f".into()
            }
        );
        assert_eq!(err.message(), "Required argument `frame` in f() is missing");

        let opt = Arg::new(2, &schema, &registry, None);
        assert_eq!(opt.to_size_t().unwrap_err().message(), "Argument `i` in f() is missing");
    }

    #[test]
    fn test_conversion_messages_name_parameter() {
        let schema = schema();
        let registry = Registry::new();
        let value = HostRef::float(1.5);
        let arg = Arg::new(2, &schema, &registry, Some(&value));

        let err = arg.to_size_t().unwrap_err();
        assert_eq!(
            err.message(),
            "Argument `i` in function f() should be an integer, instead got <class 'float'>"
        );
        assert_eq!(err.param(), Some("i"));
        assert_eq!(err.function(), Some("f"));

        let neg = HostRef::int(-2);
        let arg = Arg::new(2, &schema, &registry, Some(&neg));
        let err = arg.to_size_t().unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::ValueOutOfRange(RangeViolation::Negative { value: -2 })
        );
    }

    #[test]
    fn test_defaults() {
        let schema = schema();
        let registry = Registry::new();
        let none = HostRef::none();
        let arg = Arg::new(2, &schema, &registry, Some(&none));
        assert_eq!(arg.to_int64_or(7), Ok(7));
        assert!(arg.is_none_or_undefined());

        let undefined = Arg::new(2, &schema, &registry, None);
        assert_eq!(undefined.to_string_or("x"), Ok("x"));

        let s = HostRef::str("abc");
        let arg = Arg::new(2, &schema, &registry, Some(&s));
        assert_eq!(arg.to_string_or("x"), Ok("abc"));
        assert!(arg.to_bool_or(false).is_err());
    }
}
