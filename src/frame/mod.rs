//! Frames - the composite-table type exposed to the host
//!
//! This is the minimal storage collaborator the binding layer needs: named,
//! equally long columns, row-index views over them, and the constructor
//! bound from host calls (`init`).

pub mod column;
pub mod rowindex;
pub mod init;

pub use column::{Column, ColumnData};
pub use rowindex::RowIndex;

use std::sync::Arc;

use crate::errors::{Error, Result};

/// A table of named columns with a common row count
#[derive(Debug, Clone, Default)]
pub struct Frame {
    columns: Vec<Column>,
    names: Vec<String>,
    nrows: usize,
}

impl Frame {
    /// A frame with no columns and no rows
    pub fn empty() -> Self {
        Self::default()
    }

    /// Frame from columns; names default to `C0, C1, ...`
    pub fn new(columns: Vec<Column>, names: Option<Vec<String>>) -> Result<Self> {
        let nrows = columns.first().map_or(0, Column::nrows);
        if let Some((i, col)) = columns.iter().enumerate().find(|(_, c)| c.nrows() != nrows) {
            return Err(Error::invalid_value(format!(
                "Column {} has different number of rows ({}) than the preceding columns ({})",
                i,
                col.nrows(),
                nrows
            )));
        }

        let names = match names {
            Some(names) => {
                if names.len() != columns.len() {
                    return Err(Error::invalid_value(format!(
                        "The `names` argument contains {} element{}, which is {} than the \
                         number of columns being created ({})",
                        names.len(),
                        if names.len() == 1 { "" } else { "s" },
                        if names.len() < columns.len() { "less" } else { "more" },
                        columns.len()
                    )));
                }
                names
            }
            None => (0..columns.len()).map(|i| format!("C{}", i)).collect(),
        };

        Ok(Self {
            columns,
            names,
            nrows,
        })
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, i: usize) -> Option<&Column> {
        self.columns.get(i)
    }

    /// Column `i`, or an IndexOutOfBounds error
    pub fn column_checked(&self, i: usize) -> Result<&Column> {
        self.columns
            .get(i)
            .ok_or_else(|| {
                Error::index_out_of_bounds(i, self.ncols()).with_message("Index out of bounds")
            })
    }

    /// A view selecting `rowindex` rows from every column
    pub fn view(&self, rowindex: RowIndex) -> Result<Frame> {
        rowindex.check_bounds(self.nrows)?;
        let rowindex = Arc::new(rowindex);
        let columns = self
            .columns
            .iter()
            .map(|c| c.with_rowindex(Arc::clone(&rowindex)))
            .collect::<Result<Vec<_>>>()?;
        Frame::new(columns, Some(self.names.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HostRef, SType};
    use crate::errors::{ErrorKind, RangeViolation};

    fn frame() -> Frame {
        let a = Column::from_values(0, &[HostRef::int(1), HostRef::int(2)], SType::Void).unwrap();
        let b = Column::from_values(1, &[HostRef::str("x"), HostRef::none()], SType::Void).unwrap();
        Frame::new(vec![a, b], None).unwrap()
    }

    #[test]
    fn test_default_names() {
        let f = frame();
        assert_eq!(f.names(), ["C0", "C1"]);
        assert_eq!(f.nrows(), 2);
        assert_eq!(f.column(1).map(Column::stype), Some(SType::Str32));
    }

    #[test]
    fn test_mismatched_rows() {
        let a = Column::void(2);
        let b = Column::void(3);
        let err = Frame::new(vec![a, b], None).unwrap_err();
        assert!(err.message().starts_with("Column 1 has different number of rows (3)"));
    }

    #[test]
    fn test_column_checked() {
        let err = frame().column_checked(2).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::ValueOutOfRange(RangeViolation::IndexOutOfBounds { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_view_shares_rowindex() {
        let f = frame().view(RowIndex::slice(1, 1, 1)).unwrap();
        assert_eq!(f.nrows(), 1);
        let r0 = f.column(0).and_then(Column::rowindex).unwrap();
        let r1 = f.column(1).and_then(Column::rowindex).unwrap();
        assert!(Arc::ptr_eq(r0, r1));
    }
}
