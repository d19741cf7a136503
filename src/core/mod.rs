//! Core value model
//!
//! This module contains the host value representation, the storage type
//! enumerations and the strict conversions used by every binding context.

pub mod value;
pub mod stype;
pub mod convert;

pub use stype::{LType, SType};
pub use value::{HostCallable, HostObject, HostRef, HostValue, NamedTuple, RangeValue};
