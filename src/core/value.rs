//! Host values - the dynamically typed side of the binding boundary
//!
//! Design: a closed tagged union over the shapes a host call can carry,
//! plus an opaque `HostObject` for everything the layer does not model
//! structurally (native Frame/RowIndex handles, foreign arrays, host
//! classes and callables).
//! - `HostRef` is a cheap, shareable handle with identity semantics
//! - Predicates are total and never fail
//! - Strict conversions live in `convert.rs`

use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::errors::Result;
use crate::frame::{Frame, RowIndex};

/// Type names of foreign array-likes recognized by `is_numpy_array`
const NUMPY_ARRAY_TYPES: &[&str] = &["numpy.ndarray", "numpy.ma.core.MaskedArray"];
const PANDAS_FRAME_TYPES: &[&str] = &["pandas.DataFrame", "pandas.core.frame.DataFrame"];
const PANDAS_SERIES_TYPES: &[&str] = &["pandas.Series", "pandas.core.series.Series"];

/// Python-style `range(start, stop, step)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    pub fn new(start: i64, stop: i64, step: i64) -> Self {
        Self { start, stop, step }
    }

    /// Number of elements produced by the range
    ///
    /// Exact for every start/stop/step combination, including spans wider
    /// than `i64`.
    pub fn count(&self) -> i128 {
        let (start, stop, step) = (
            i128::from(self.start),
            i128::from(self.stop),
            i128::from(self.step),
        );
        if step > 0 && stop > start {
            (stop - start - 1) / step + 1
        } else if step < 0 && stop < start {
            (start - stop - 1) / -step + 1
        } else {
            0
        }
    }

    /// Element count as a `usize`, `None` when it does not fit
    pub fn len(&self) -> Option<usize> {
        usize::try_from(self.count()).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Final element, `None` for an empty range
    pub fn last(&self) -> Option<i64> {
        match self.count() {
            0 => None,
            n => self.at(n - 1),
        }
    }

    fn at(&self, i: i128) -> Option<i64> {
        let offset = i.checked_mul(i128::from(self.step))?;
        i64::try_from(i128::from(self.start) + offset).ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.count()).map_while(move |i| self.at(i))
    }
}

/// Tuple value whose type names its positions
#[derive(Debug, Clone)]
pub struct NamedTuple {
    pub type_name: String,
    pub fields: Vec<String>,
    pub values: Vec<HostRef>,
}

type HostFnImpl = dyn Fn(&[HostRef]) -> Result<HostRef> + Send + Sync;

/// A host-side callable that native code may invoke (e.g. the ingestion
/// entry point injected through the registration protocol)
#[derive(Clone)]
pub struct HostCallable {
    name: String,
    f: Arc<HostFnImpl>,
}

impl HostCallable {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[HostRef]) -> Result<HostRef> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: &[HostRef]) -> Result<HostRef> {
        (self.f)(args)
    }
}

impl fmt::Debug for HostCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name)
    }
}

/// Opaque host object
#[derive(Clone)]
pub struct HostObject {
    type_name: String,
    identity: usize,
    payload: Arc<dyn Any + Send + Sync>,
}

impl HostObject {
    /// Object owned by this layer; identity is the payload allocation
    pub fn native<T: Any + Send + Sync>(type_name: impl Into<String>, value: T) -> Self {
        Self::from_arc(type_name, Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(type_name: impl Into<String>, value: Arc<T>) -> Self {
        let payload: Arc<dyn Any + Send + Sync> = value;
        let identity = Arc::as_ptr(&payload) as *const () as usize;
        Self {
            type_name: type_name.into(),
            identity,
            payload,
        }
    }

    /// Object owned by the host; `identity` is the host's own identity token
    pub fn foreign<T: Any + Send + Sync>(
        type_name: impl Into<String>,
        identity: usize,
        value: T,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            identity,
            payload: Arc::new(value),
        }
    }

    pub fn callable(callable: HostCallable) -> Self {
        Self::native("function", callable)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn identity(&self) -> usize {
        self.identity
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.payload).downcast::<T>().ok()
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} object at {:#x}>", self.type_name, self.identity)
    }
}

/// A value received from (or returned to) the host
#[derive(Debug, Clone)]
pub enum HostValue {
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<HostRef>),
    Tuple(Vec<HostRef>),
    /// Tuple subclass carrying `_fields` (e.g. `collections.namedtuple`)
    NamedTuple(NamedTuple),
    /// Key/value pairs in insertion order
    Dict(Vec<(HostRef, HostRef)>),
    Range(RangeValue),
    Ellipsis,
    Object(HostObject),
}

impl HostValue {
    /// Concrete type name as the host would print it
    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::NamedTuple(nt) => &nt.type_name,
            Self::Dict(_) => "dict",
            Self::Range(_) => "range",
            Self::Ellipsis => "ellipsis",
            Self::Object(obj) => obj.type_name(),
        }
    }

    // ------------------------------------------------------------------------
    // Predicates
    // ------------------------------------------------------------------------

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    #[inline]
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// True for integers only; booleans are a separate domain
    #[inline]
    pub fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    #[inline]
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::Str(_))
    }

    #[inline]
    pub fn is_bytes(&self) -> bool {
        matches!(self, Self::Bytes(_))
    }

    #[inline]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    #[inline]
    pub fn is_tuple(&self) -> bool {
        matches!(self, Self::Tuple(_) | Self::NamedTuple(_))
    }

    #[inline]
    pub fn is_list_or_tuple(&self) -> bool {
        matches!(self, Self::List(_) | Self::Tuple(_) | Self::NamedTuple(_))
    }

    /// Elements of a plain or named tuple
    pub fn as_tuple(&self) -> Option<&[HostRef]> {
        match self {
            Self::Tuple(items) => Some(items),
            Self::NamedTuple(nt) => Some(&nt.values),
            _ => None,
        }
    }

    #[inline]
    pub fn is_dict(&self) -> bool {
        matches!(self, Self::Dict(_))
    }

    #[inline]
    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range(_))
    }

    #[inline]
    pub fn is_ellipsis(&self) -> bool {
        matches!(self, Self::Ellipsis)
    }

    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn is_frame(&self) -> bool {
        self.as_object()
            .map_or(false, |obj| obj.downcast_ref::<Frame>().is_some())
    }

    pub fn is_rowindex(&self) -> bool {
        self.as_object()
            .map_or(false, |obj| obj.downcast_ref::<RowIndex>().is_some())
    }

    pub fn as_callable(&self) -> Option<&HostCallable> {
        self.as_object().and_then(|obj| obj.downcast_ref::<HostCallable>())
    }

    pub fn is_callable(&self) -> bool {
        self.as_callable().is_some()
    }

    pub fn is_numpy_array(&self) -> bool {
        self.object_type_in(NUMPY_ARRAY_TYPES)
    }

    pub fn is_pandas_frame(&self) -> bool {
        self.object_type_in(PANDAS_FRAME_TYPES)
    }

    pub fn is_pandas_series(&self) -> bool {
        self.object_type_in(PANDAS_SERIES_TYPES)
    }

    fn object_type_in(&self, names: &[&str]) -> bool {
        self.as_object()
            .map_or(false, |obj| names.contains(&obj.type_name()))
    }
}

/// Shared handle to a host value
#[derive(Clone)]
pub struct HostRef(Arc<HostValue>);

impl HostRef {
    pub fn new(value: HostValue) -> Self {
        Self(Arc::new(value))
    }

    pub fn none() -> Self {
        Self::new(HostValue::None)
    }

    pub fn int(value: impl Into<i128>) -> Self {
        Self::new(HostValue::Int(value.into()))
    }

    pub fn float(value: f64) -> Self {
        Self::new(HostValue::Float(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(HostValue::Bool(value))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::new(HostValue::Str(value.into()))
    }

    pub fn list(items: Vec<HostRef>) -> Self {
        Self::new(HostValue::List(items))
    }

    pub fn tuple(items: Vec<HostRef>) -> Self {
        Self::new(HostValue::Tuple(items))
    }

    pub fn named_tuple(
        type_name: impl Into<String>,
        fields: Vec<String>,
        values: Vec<HostRef>,
    ) -> Self {
        Self::new(HostValue::NamedTuple(NamedTuple {
            type_name: type_name.into(),
            fields,
            values,
        }))
    }

    pub fn dict(items: Vec<(HostRef, HostRef)>) -> Self {
        Self::new(HostValue::Dict(items))
    }

    pub fn range(start: i64, stop: i64, step: i64) -> Self {
        Self::new(HostValue::Range(RangeValue::new(start, stop, step)))
    }

    pub fn object(obj: HostObject) -> Self {
        Self::new(HostValue::Object(obj))
    }

    pub fn frame(frame: Frame) -> Self {
        Self::object(HostObject::native("Frame", frame))
    }

    pub fn rowindex(rowindex: RowIndex) -> Self {
        Self::object(HostObject::native("RowIndex", rowindex))
    }

    pub fn callable(callable: HostCallable) -> Self {
        Self::object(HostObject::callable(callable))
    }

    pub fn value(&self) -> &HostValue {
        &self.0
    }

    /// Identity comparison (host `is`)
    pub fn is(&self, other: &HostRef) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        match (self.value(), other.value()) {
            (HostValue::Object(a), HostValue::Object(b)) => a.identity() == b.identity(),
            _ => false,
        }
    }
}

impl Deref for HostRef {
    type Target = HostValue;

    fn deref(&self) -> &HostValue {
        &self.0
    }
}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Equality is identity, as for host objects without `__eq__`
impl PartialEq for HostRef {
    fn eq(&self, other: &Self) -> bool {
        self.is(other)
    }
}

impl From<HostValue> for HostRef {
    fn from(value: HostValue) -> Self {
        Self::new(value)
    }
}
