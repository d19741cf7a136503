//! Strict conversions from host values to native values
//!
//! Design: fail-fast, no cross-domain coercion.
//! - Each conversion accepts an explicit, closed set of representations
//! - Every rejection is produced by the caller's `ErrorManager`
//! - Integer narrowing is range-checked, never saturated or wrapped

use std::sync::Arc;

use num_traits::ToPrimitive;
use tracing::trace;

use super::stype::SType;
use super::value::{HostRef, HostValue, RangeValue};
use crate::errors::{Error, ErrorManager, Result};
use crate::frame::{Frame, RowIndex};
use crate::module::Registry;

#[inline]
fn reject(error: Error) -> Error {
    trace!(event = "conversion_rejected", error = %error.message());
    error
}

impl HostValue {
    /// `True`/`False` only
    pub fn to_bool_strict(&self, em: &dyn ErrorManager) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(reject(em.error_not_boolean(other))),
        }
    }

    /// Integers in `[i32::MIN, i32::MAX]`
    pub fn to_int32_strict(&self, em: &dyn ErrorManager) -> Result<i32> {
        let value = self.to_int_exact(em)?;
        value
            .to_i32()
            .ok_or_else(|| reject(em.error_int_overflow(value, 32)))
    }

    /// Integers in `[i64::MIN, i64::MAX]`
    pub fn to_int64_strict(&self, em: &dyn ErrorManager) -> Result<i64> {
        let value = self.to_int_exact(em)?;
        value
            .to_i64()
            .ok_or_else(|| reject(em.error_int_overflow(value, 64)))
    }

    /// Non-negative integers that fit in `usize`
    pub fn to_size_t(&self, em: &dyn ErrorManager) -> Result<usize> {
        let value = self.to_int_exact(em)?;
        if value < 0 {
            return Err(reject(em.error_int_negative(value)));
        }
        value
            .to_usize()
            .ok_or_else(|| reject(em.error_int_overflow(value, usize::BITS)))
    }

    /// Floats, or integers widened to f64
    pub fn to_double(&self, em: &dyn ErrorManager) -> Result<f64> {
        match self {
            Self::Float(x) => Ok(*x),
            Self::Int(i) => Ok(*i as f64),
            other => Err(reject(em.error_not_double(other))),
        }
    }

    pub fn to_str(&self, em: &dyn ErrorManager) -> Result<&str> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(reject(em.error_not_string(other))),
        }
    }

    /// List or tuple whose elements are all strings
    pub fn to_stringlist(&self, em: &dyn ErrorManager) -> Result<Vec<String>> {
        self.to_list(em)?
            .iter()
            .enumerate()
            .map(|(i, item)| match item.value() {
                Self::Str(s) => Ok(s.clone()),
                other => Err(reject(em.error_not_string_item(i, other))),
            })
            .collect()
    }

    /// Elements of a list or tuple
    pub fn to_list(&self, em: &dyn ErrorManager) -> Result<&[HostRef]> {
        match self {
            Self::List(items) | Self::Tuple(items) => Ok(items),
            Self::NamedTuple(nt) => Ok(&nt.values),
            other => Err(reject(em.error_not_list(other))),
        }
    }

    pub fn to_tuple(&self, em: &dyn ErrorManager) -> Result<&[HostRef]> {
        match self {
            Self::Tuple(items) => Ok(items),
            Self::NamedTuple(nt) => Ok(&nt.values),
            other => Err(reject(em.error_not_tuple(other))),
        }
    }

    pub fn to_dict(&self, em: &dyn ErrorManager) -> Result<&[(HostRef, HostRef)]> {
        match self {
            Self::Dict(items) => Ok(items),
            other => Err(reject(em.error_not_dict(other))),
        }
    }

    pub fn to_range(&self, em: &dyn ErrorManager) -> Result<RangeValue> {
        match self {
            Self::Range(r) => Ok(*r),
            other => Err(reject(em.error_not_range(other))),
        }
    }

    pub fn to_frame(&self, em: &dyn ErrorManager) -> Result<Arc<Frame>> {
        self.as_object()
            .and_then(|obj| obj.downcast_arc::<Frame>())
            .ok_or_else(|| reject(em.error_not_frame(self)))
    }

    pub fn to_rowindex(&self, em: &dyn ErrorManager) -> Result<Arc<RowIndex>> {
        self.as_object()
            .and_then(|obj| obj.downcast_arc::<RowIndex>())
            .ok_or_else(|| reject(em.error_not_rowindex(self)))
    }

    /// A registered stype object, an stype code, or an stype name
    pub fn to_stype(&self, registry: &Registry, em: &dyn ErrorManager) -> Result<SType> {
        let found = match self {
            Self::Int(code) => SType::from_code(*code),
            Self::Str(name) => name.parse::<SType>().ok(),
            Self::Object(_) => registry.stype_from_value(self),
            _ => None,
        };
        found.ok_or_else(|| reject(em.error_not_stype(self)))
    }

    /// Any integer, at full host precision
    pub fn to_int_exact(&self, em: &dyn ErrorManager) -> Result<i128> {
        match self {
            Self::Int(i) => Ok(*i),
            other => Err(reject(em.error_not_integer(other))),
        }
    }
}
