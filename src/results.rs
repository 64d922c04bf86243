//! Shared, forward-only result sets.

use std::rc::Rc;

use crate::driver::RawRows;

/// Rows and columns from one completed query.
///
/// Cloning shares the underlying tuples; counts are fixed at creation. A
/// failed or absent query carries a `-1` sentinel in `num_rows()` and
/// `num_fields()` while `size()` flattens it to zero so iteration code can
/// treat "query failed" and "no rows" the same way.
#[derive(Debug, Clone)]
pub struct ResultSet {
    data: Rc<RawRows>,
    num_rows: i64,
    num_fields: i64,
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::failed()
    }
}

impl ResultSet {
    pub(crate) fn from_raw(raw: RawRows) -> Self {
        let num_rows = raw.rows.len() as i64;
        let num_fields = raw.columns as i64;
        Self {
            data: Rc::new(raw),
            num_rows,
            num_fields,
        }
    }

    /// The error-sentinel result set.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            data: Rc::new(RawRows::default()),
            num_rows: -1,
            num_fields: -1,
        }
    }

    /// Number of rows; `-1` means the query failed.
    #[must_use]
    pub fn num_rows(&self) -> i64 {
        self.num_rows
    }

    /// Number of fields per row; `-1` means the query failed.
    #[must_use]
    pub fn num_fields(&self) -> i64 {
        self.num_fields
    }

    /// Row count with the failure sentinel flattened to zero.
    #[must_use]
    pub fn size(&self) -> usize {
        if self.num_rows >= 0 {
            self.num_rows as usize
        } else {
            0
        }
    }

    /// Read one column of one row; `None` for NULL or out of range.
    #[must_use]
    pub fn value(&self, row: usize, column: usize) -> Option<&str> {
        self.data
            .rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|v| v.as_deref())
    }

    /// Forward-only iteration over the rows.
    #[must_use]
    pub fn rows(&self) -> RowsIter<'_> {
        RowsIter {
            rs: self,
            next: 0,
            len: self.size(),
        }
    }

    /// The row at `index`, if in range.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        if index < self.size() {
            Some(RowRef { rs: self, index })
        } else {
            None
        }
    }
}

/// One row of a result set; read-only indexed column access plus a
/// forward-only field iterator.
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    rs: &'a ResultSet,
    index: usize,
}

impl<'a> RowRef<'a> {
    /// Index of this row within its result set.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Read one column; `None` for NULL or out of range.
    #[must_use]
    pub fn get(&self, column: usize) -> Option<&'a str> {
        self.rs.value(self.index, column)
    }

    /// Iterate this row's fields in column order.
    #[must_use]
    pub fn fields(&self) -> FieldsIter<'a> {
        FieldsIter {
            rs: self.rs,
            row: self.index,
            next: 0,
            len: if self.rs.num_fields >= 0 {
                self.rs.num_fields as usize
            } else {
                0
            },
        }
    }
}

pub struct RowsIter<'a> {
    rs: &'a ResultSet,
    next: usize,
    len: usize,
}

impl<'a> Iterator for RowsIter<'a> {
    type Item = RowRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let row = RowRef {
            rs: self.rs,
            index: self.next,
        };
        self.next += 1;
        Some(row)
    }
}

pub struct FieldsIter<'a> {
    rs: &'a ResultSet,
    row: usize,
    next: usize,
    len: usize,
}

impl<'a> Iterator for FieldsIter<'a> {
    type Item = Option<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let value = self.rs.value(self.row, self.next);
        self.next += 1;
        Some(value)
    }
}
