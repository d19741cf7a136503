//! Row indices - row selections shared by the columns of a Frame view

use crate::errors::{Error, Result};

/// Mapping from a view's rows to the rows of the underlying column data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIndex {
    /// Rows `start, start + step, ...` (`count` of them)
    Slice { start: usize, count: usize, step: i64 },
    Array32(Vec<i32>),
    Array64(Vec<i64>),
}

impl RowIndex {
    pub fn slice(start: usize, count: usize, step: i64) -> Self {
        RowIndex::Slice { start, count, step }
    }

    /// Compact array form: 32-bit when every index fits
    pub fn from_indices(indices: Vec<i64>) -> Self {
        if indices.iter().all(|&i| i32::try_from(i).is_ok()) {
            RowIndex::Array32(indices.into_iter().map(|i| i as i32).collect())
        } else {
            RowIndex::Array64(indices)
        }
    }

    /// Number of rows selected
    pub fn len(&self) -> usize {
        match self {
            RowIndex::Slice { count, .. } => *count,
            RowIndex::Array32(v) => v.len(),
            RowIndex::Array64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            RowIndex::Slice { .. } => "slice",
            RowIndex::Array32(_) => "arr32",
            RowIndex::Array64(_) => "arr64",
        }
    }

    /// Source row for view row `i`; negative means NA
    pub fn nth(&self, i: usize) -> Option<i64> {
        if i >= self.len() {
            return None;
        }
        match self {
            RowIndex::Slice { start, step, .. } => Some(*start as i64 + (i as i64) * step),
            RowIndex::Array32(v) => Some(i64::from(v[i])),
            RowIndex::Array64(v) => Some(v[i]),
        }
    }

    /// Largest source row referenced
    pub fn max(&self) -> Option<i64> {
        match self {
            RowIndex::Slice { count: 0, .. } => None,
            RowIndex::Slice { start, count, step } => {
                let last = *start as i64 + (*count as i64 - 1) * step;
                Some(last.max(*start as i64))
            }
            RowIndex::Array32(v) => v.iter().copied().max().map(i64::from),
            RowIndex::Array64(v) => v.iter().copied().max(),
        }
    }

    /// Ensure every referenced source row is below `nrows`
    pub fn check_bounds(&self, nrows: usize) -> Result<()> {
        if let RowIndex::Slice { start, count, step } = self {
            let last = *start as i64 + (*count as i64 - 1) * step;
            if *count > 0 && last < 0 {
                return Err(Error::invalid_value(format!(
                    "Slice rowindex reaches negative row {}",
                    last
                )));
            }
        }
        match self.max() {
            Some(max) if max >= 0 && max as usize >= nrows => {
                Err(Error::index_out_of_bounds(max as usize, nrows))
            }
            _ => Ok(()),
        }
    }
}
