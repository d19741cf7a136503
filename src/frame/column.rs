//! Columns - typed storage built from host sequences
//!
//! Design: a column is an immutable, shareable data buffer plus an optional
//! row index. Views share the buffer and differ only in the row index.
//! - `None` elements become NA
//! - `SType::Void` requests type detection from the values
//! - Element conversion goes through the strict conversions with an error
//!   manager naming the column and row

use std::sync::Arc;

use num_traits::ToPrimitive;

use super::rowindex::RowIndex;
use crate::core::{HostRef, HostValue, LType, RangeValue, SType};
use crate::errors::{Error, ErrorManager, Result};

/// Backing storage of a column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Void { nrows: usize },
    Bool(Vec<Option<bool>>),
    Int8(Vec<Option<i8>>),
    Int16(Vec<Option<i16>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    Float32(Vec<Option<f32>>),
    Float64(Vec<Option<f64>>),
    Str(Vec<Option<String>>),
    Obj(Vec<HostRef>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Void { nrows } => *nrows,
            ColumnData::Bool(v) => v.len(),
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Str(v) => v.len(),
            ColumnData::Obj(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Address of the first element of the buffer, 0 for void data
    fn address(&self) -> usize {
        match self {
            ColumnData::Void { .. } => 0,
            ColumnData::Bool(v) => v.as_ptr() as usize,
            ColumnData::Int8(v) => v.as_ptr() as usize,
            ColumnData::Int16(v) => v.as_ptr() as usize,
            ColumnData::Int32(v) => v.as_ptr() as usize,
            ColumnData::Int64(v) => v.as_ptr() as usize,
            ColumnData::Float32(v) => v.as_ptr() as usize,
            ColumnData::Float64(v) => v.as_ptr() as usize,
            ColumnData::Str(v) => v.as_ptr() as usize,
            ColumnData::Obj(v) => v.as_ptr() as usize,
        }
    }

    fn get(&self, row: usize) -> Option<HostRef> {
        let value = match self {
            ColumnData::Void { nrows } => (row < *nrows).then(HostRef::none)?,
            ColumnData::Bool(v) => v.get(row)?.map_or_else(HostRef::none, HostRef::bool),
            ColumnData::Int8(v) => v.get(row)?.map_or_else(HostRef::none, HostRef::int),
            ColumnData::Int16(v) => v.get(row)?.map_or_else(HostRef::none, HostRef::int),
            ColumnData::Int32(v) => v.get(row)?.map_or_else(HostRef::none, HostRef::int),
            ColumnData::Int64(v) => v.get(row)?.map_or_else(HostRef::none, HostRef::int),
            ColumnData::Float32(v) => v
                .get(row)?
                .map_or_else(HostRef::none, |x| HostRef::float(f64::from(x))),
            ColumnData::Float64(v) => v.get(row)?.map_or_else(HostRef::none, HostRef::float),
            ColumnData::Str(v) => v
                .get(row)?
                .as_deref()
                .map_or_else(HostRef::none, HostRef::str),
            ColumnData::Obj(v) => v.get(row)?.clone(),
        };
        Some(value)
    }
}

/// Diagnostics for one element of a column being built
struct ElementErrors {
    column: usize,
    row: usize,
}

impl ErrorManager for ElementErrors {
    fn subject(&self) -> Option<String> {
        Some(format!("Element {} in column {}", self.row, self.column))
    }
}

/// A typed column, possibly viewed through a row index
#[derive(Debug, Clone)]
pub struct Column {
    stype: SType,
    data: Arc<ColumnData>,
    rowindex: Option<Arc<RowIndex>>,
}

impl Column {
    pub fn new(stype: SType, data: ColumnData) -> Self {
        Self {
            stype,
            data: Arc::new(data),
            rowindex: None,
        }
    }

    /// A column of `nrows` NAs
    pub fn void(nrows: usize) -> Self {
        Self::new(SType::Void, ColumnData::Void { nrows })
    }

    pub fn stype(&self) -> SType {
        self.stype
    }

    pub fn ltype(&self) -> LType {
        self.stype.ltype()
    }

    /// Number of rows visible through the row index
    pub fn nrows(&self) -> usize {
        match &self.rowindex {
            Some(ri) => ri.len(),
            None => self.data.len(),
        }
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn rowindex(&self) -> Option<&Arc<RowIndex>> {
        self.rowindex.as_ref()
    }

    /// Address of the backing buffer, shared between views
    pub fn data_ptr(&self) -> usize {
        self.data.address()
    }

    /// View of this column through `rowindex`
    pub fn with_rowindex(&self, rowindex: Arc<RowIndex>) -> Result<Column> {
        rowindex.check_bounds(self.data.len())?;
        Ok(Self {
            stype: self.stype,
            data: Arc::clone(&self.data),
            rowindex: Some(rowindex),
        })
    }

    /// Value at visible row `row`, NA as `None`
    pub fn get(&self, row: usize) -> Option<HostRef> {
        match &self.rowindex {
            Some(ri) => match ri.nth(row)? {
                src if src < 0 => Some(HostRef::none()),
                src => self.data.get(src as usize),
            },
            None => self.data.get(row),
        }
    }

    // ========================================================================
    // Construction from host values
    // ========================================================================

    /// Build column `index` from a list of host values
    pub fn from_values(index: usize, values: &[HostRef], stype: SType) -> Result<Column> {
        let stype = match stype {
            SType::Void => detect_stype(values),
            st => st,
        };
        let data = match stype {
            SType::Void => ColumnData::Void { nrows: values.len() },
            SType::Bool => ColumnData::Bool(collect(index, values, |v, em| v.to_bool_strict(em))?),
            SType::Int8 => ColumnData::Int8(collect(index, values, |v, em| {
                narrow(v, em, 8, |x| x.to_i8())
            })?),
            SType::Int16 => ColumnData::Int16(collect(index, values, |v, em| {
                narrow(v, em, 16, |x| x.to_i16())
            })?),
            SType::Int32 => {
                ColumnData::Int32(collect(index, values, |v, em| v.to_int32_strict(em))?)
            }
            SType::Int64 => {
                ColumnData::Int64(collect(index, values, |v, em| v.to_int64_strict(em))?)
            }
            SType::Float32 => ColumnData::Float32(collect(index, values, |v, em| {
                v.to_double(em).map(|x| x as f32)
            })?),
            SType::Float64 => ColumnData::Float64(collect(index, values, |v, em| v.to_double(em))?),
            SType::Str32 | SType::Str64 => ColumnData::Str(collect(index, values, |v, em| {
                v.to_str(em).map(str::to_string)
            })?),
            SType::Obj64 => ColumnData::Obj(values.to_vec()),
        };
        Ok(Column::new(stype, data))
    }

    /// Build column `index` from a host `range`
    pub fn from_range(index: usize, range: RangeValue, stype: SType) -> Result<Column> {
        let fits_i32 = |x: i64| i32::try_from(x).is_ok();
        let last = range.last().unwrap_or(range.start);
        let stype = match stype {
            SType::Void if fits_i32(range.start) && fits_i32(last) => SType::Int32,
            SType::Void => SType::Int64,
            st => st,
        };
        match stype.ltype() {
            LType::Int | LType::Real => {
                let count = range.count();
                let too_large = || {
                    Error::overflow(count, usize::BITS).with_message(format!(
                        "Range with {} elements is too large for column {}",
                        count, index
                    ))
                };
                let nrows = range.len().ok_or_else(too_large)?;
                let mut values: Vec<HostRef> = Vec::new();
                values.try_reserve_exact(nrows).map_err(|_| too_large())?;
                values.extend(range.iter().map(HostRef::int));
                Column::from_values(index, &values, stype)
            }
            _ => Err(Error::invalid_argument(format!(
                "Cannot create a column of stype {} from a range",
                stype
            ))),
        }
    }
}

fn collect<T, F>(column: usize, values: &[HostRef], convert: F) -> Result<Vec<Option<T>>>
where
    F: Fn(&HostValue, &ElementErrors) -> Result<T>,
{
    values
        .iter()
        .enumerate()
        .map(|(row, v)| {
            if v.is_none() {
                Ok(None)
            } else {
                convert(v.value(), &ElementErrors { column, row }).map(Some)
            }
        })
        .collect()
}

fn narrow<T>(
    value: &HostValue,
    em: &ElementErrors,
    bits: u32,
    cast: impl Fn(i64) -> Option<T>,
) -> Result<T> {
    let x = value.to_int64_strict(em)?;
    cast(x).ok_or_else(|| em.error_int_overflow(i128::from(x), bits))
}

/// Narrowest stype able to hold every non-None value
fn detect_stype(values: &[HostRef]) -> SType {
    let mut seen_bool = false;
    let mut seen_int = false;
    let mut seen_float = false;
    let mut seen_str = false;
    let mut int_fits_i32 = true;

    for v in values.iter().filter(|v| !v.is_none()) {
        match v.value() {
            HostValue::Bool(_) => seen_bool = true,
            HostValue::Int(i) => {
                if i64::try_from(*i).is_err() {
                    return SType::Obj64;
                }
                seen_int = true;
                int_fits_i32 &= i32::try_from(*i).is_ok();
            }
            HostValue::Float(_) => seen_float = true,
            HostValue::Str(_) => seen_str = true,
            _ => return SType::Obj64,
        }
    }

    match (seen_bool, seen_int, seen_float, seen_str) {
        (false, false, false, false) => SType::Void,
        (true, false, false, false) => SType::Bool,
        (false, true, false, false) if int_fits_i32 => SType::Int32,
        (false, true, false, false) => SType::Int64,
        (false, _, true, false) => SType::Float64,
        (false, false, false, true) => SType::Str32,
        _ => SType::Obj64,
    }
}
