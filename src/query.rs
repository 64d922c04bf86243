//! Manifest-driven SELECT building and typed row access.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Display;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::commas::Commas;
use crate::error::RowBindError;
use crate::fields::{BindableField, FieldSpec};
use crate::pool::ConnectionPool;
use crate::quote::quote_opt;
use crate::results::ResultSet;
use crate::row_saver::{RowSaver, RowSync, SlotLookup};

/// A fixed list of columns a query selects, in positional order.
///
/// Usually generated by the [`manifest!`](crate::manifest) macro rather than
/// written by hand.
pub trait Manifest: 'static {
    const FIELDS: &'static [FieldSpec];
}

/// A comparison spliced around the right-hand side of a filter,
/// as `lhs{before}rhs{after}`.
#[derive(Debug, Clone, Copy)]
pub struct CompareOp {
    pub before: &'static str,
    pub after: &'static str,
}

impl Default for CompareOp {
    fn default() -> Self {
        Self::eq()
    }
}

impl CompareOp {
    #[must_use]
    pub const fn new(before: &'static str, after: &'static str) -> Self {
        Self { before, after }
    }

    #[must_use]
    pub const fn eq() -> Self {
        Self::new("=", "")
    }

    #[must_use]
    pub const fn ne() -> Self {
        Self::new("<>", "")
    }

    #[must_use]
    pub const fn lt() -> Self {
        Self::new("<", "")
    }

    #[must_use]
    pub const fn le() -> Self {
        Self::new("<=", "")
    }

    #[must_use]
    pub const fn gt() -> Self {
        Self::new(">", "")
    }

    #[must_use]
    pub const fn ge() -> Self {
        Self::new(">=", "")
    }

    #[must_use]
    pub const fn like() -> Self {
        Self::new(" like ", "")
    }

    /// Membership test, for use with sub-selects.
    #[must_use]
    pub const fn within() -> Self {
        Self::new(" in ", "")
    }
}

/// Anything that can stand in as a parenthesized sub-select.
pub trait SubSelect {
    fn sub_select_sql(&self) -> String;
}

struct PkEntry {
    position: usize,
    column: &'static str,
    table: &'static str,
}

/// A SELECT over a manifest's columns with deferred execution.
///
/// Filters, joins, and the limit accumulate between executions; the statement
/// runs when [`Query::rows`] is first called and is reused until a mutator
/// dirties it again. Dirtying also releases every row writer handed out from
/// the previous result, flushing their pending modifications first.
pub struct Query<M: Manifest> {
    pool: ConnectionPool,
    pks: Vec<PkEntry>,
    where_clause: String,
    join_clause: String,
    limit: Option<u64>,
    needs_select: bool,
    result: ResultSet,
    savers: RefCell<HashMap<usize, Vec<Rc<RowSaver>>>>,
    _manifest: PhantomData<M>,
}

impl<M: Manifest> Query<M> {
    #[must_use]
    pub fn new(pool: &ConnectionPool) -> Self {
        let pks = M::FIELDS
            .iter()
            .enumerate()
            .filter(|(_, spec)| spec.primary)
            .map(|(position, spec)| PkEntry {
                position,
                column: spec.column,
                table: spec.table,
            })
            .collect();
        Self {
            pool: pool.clone(),
            pks,
            where_clause: String::new(),
            join_clause: String::new(),
            limit: None,
            needs_select: true,
            result: ResultSet::failed(),
            savers: RefCell::new(HashMap::new()),
            _manifest: PhantomData,
        }
    }

    /// Restrict rows by comparing a column against a field's current value.
    /// Replaces any filter set before it.
    pub fn set_filter<F: BindableField>(&mut self, field: &F, op: CompareOp) {
        let spec = field.spec();
        let condition = format!(
            "{}.{}{}{}{}",
            spec.table,
            spec.column,
            op.before,
            field.literal(),
            op.after
        );
        self.set_condition(condition);
    }

    /// Restrict rows by comparing the column at `position` against `value`,
    /// spliced in verbatim with no quoting. Replaces any filter set before it.
    ///
    /// # Errors
    ///
    /// Fails when `position` is outside the manifest.
    pub fn set_filter_literal(
        &mut self,
        position: usize,
        value: impl Display,
        op: CompareOp,
    ) -> Result<(), RowBindError> {
        let spec = Self::spec_at(position)?;
        let condition = format!(
            "{}.{}{}{}{}",
            spec.table, spec.column, op.before, value, op.after
        );
        self.set_condition(condition);
        Ok(())
    }

    /// Restrict rows by comparing a column against a sub-select.
    /// Replaces any filter set before it.
    pub fn set_filter_subquery<F: BindableField>(
        &mut self,
        field: &F,
        sub: &dyn SubSelect,
        op: CompareOp,
    ) {
        let spec = field.spec();
        let condition = format!(
            "{}.{}{}{}{}",
            spec.table,
            spec.column,
            op.before,
            sub.sub_select_sql(),
            op.after
        );
        self.set_condition(condition);
    }

    /// Cap the number of rows returned.
    pub fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
        self.dirty();
    }

    /// Join the tables of two manifest positions.
    ///
    /// # Errors
    ///
    /// Fails when either position is outside the manifest.
    pub fn set_inner_join(
        &mut self,
        left: usize,
        right: usize,
        op: CompareOp,
    ) -> Result<(), RowBindError> {
        self.add_join("inner join", left, right, op)
    }

    /// Like [`Query::set_inner_join`] but keeps unmatched left-side rows.
    ///
    /// # Errors
    ///
    /// Fails when either position is outside the manifest.
    pub fn set_outer_join(
        &mut self,
        left: usize,
        right: usize,
        op: CompareOp,
    ) -> Result<(), RowBindError> {
        self.add_join("left outer join", left, right, op)
    }

    /// Execute if dirty, then iterate the result rows.
    ///
    /// # Errors
    ///
    /// Fails when no connection can be acquired to run the statement. A
    /// statement that runs but fails yields an empty iteration instead; the
    /// message is in the pool connection's error slot.
    pub fn rows(&mut self) -> Result<Rows<'_, M>, RowBindError> {
        if self.needs_select {
            self.run_select()?;
        }
        let len = self.result.size();
        Ok(Rows {
            query: self,
            next: 0,
            len,
        })
    }

    /// Execute if dirty, then report the number of rows.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Query::rows`].
    pub fn size(&mut self) -> Result<usize, RowBindError> {
        if self.needs_select {
            self.run_select()?;
        }
        Ok(self.result.size())
    }

    /// The SELECT this query runs, with `limit_override` in place of the
    /// configured limit when given.
    #[must_use]
    pub fn compile(&self, limit_override: Option<u64>) -> String {
        let mut sql = String::from("select");
        let mut sep = Commas::new();
        for spec in M::FIELDS {
            sql.push(sep.get());
            sql.push_str(spec.table);
            sql.push('.');
            sql.push_str(spec.column);
        }
        sql.push_str(" from ");
        if !self.join_clause.is_empty() {
            sql.push_str(&self.join_clause);
        } else if let Some(pk) = self.pks.first() {
            sql.push_str(pk.table);
        } else {
            sql.push_str(M::FIELDS.first().map_or("", |spec| spec.table));
        }
        sql.push_str(&self.where_clause);
        if let Some(limit) = limit_override.or(self.limit) {
            sql.push_str(" limit ");
            sql.push_str(&limit.to_string());
        }
        sql
    }

    fn run_select(&mut self) -> Result<(), RowBindError> {
        let sql = self.compile(None);
        let handle = self.pool.acquire()?;
        handle.push(&sql);
        self.result = handle.select();
        self.needs_select = false;
        Ok(())
    }

    fn spec_at(position: usize) -> Result<FieldSpec, RowBindError> {
        M::FIELDS
            .get(position)
            .copied()
            .ok_or(RowBindError::PositionOutOfRange {
                position,
                len: M::FIELDS.len(),
            })
    }

    // Each set_filter* call owns the whole WHERE clause; the last one wins.
    fn set_condition(&mut self, condition: String) {
        self.where_clause.clear();
        self.where_clause.push_str(" where ");
        self.where_clause.push_str(&condition);
        self.dirty();
    }

    fn add_join(
        &mut self,
        kind: &str,
        left: usize,
        right: usize,
        op: CompareOp,
    ) -> Result<(), RowBindError> {
        let lhs = Self::spec_at(left)?;
        let rhs = Self::spec_at(right)?;
        if self.join_clause.is_empty() {
            self.join_clause.push_str(lhs.table);
        }
        let clause = format!(
            " {kind} {} on {}.{}{}{}.{}{}",
            rhs.table, lhs.table, lhs.column, op.before, rhs.table, rhs.column, op.after
        );
        self.join_clause.push_str(&clause);
        self.dirty();
        Ok(())
    }

    fn dirty(&mut self) {
        self.release_savers();
        self.needs_select = true;
    }

    fn release_savers(&mut self) {
        for (_, savers) in self.savers.borrow_mut().drain() {
            for saver in savers {
                saver.release();
            }
        }
    }

    fn savers_for(&self, row: usize) -> Vec<Rc<RowSaver>> {
        self.savers
            .borrow_mut()
            .entry(row)
            .or_insert_with(|| {
                self.pks
                    .iter()
                    .map(|pk| {
                        RowSaver::new(
                            pk.column,
                            pk.table,
                            quote_opt(self.result.value(row, pk.position)),
                            self.pool.clone(),
                            M::FIELDS.len(),
                        )
                    })
                    .collect()
            })
            .clone()
    }
}

impl<M: Manifest> Drop for Query<M> {
    fn drop(&mut self) {
        self.release_savers();
    }
}

impl<M: Manifest> SubSelect for Query<M> {
    fn sub_select_sql(&self) -> String {
        format!("( {} )", self.compile(Some(1)))
    }
}

/// Iterator over a query's result rows.
pub struct Rows<'q, M: Manifest> {
    query: &'q Query<M>,
    next: usize,
    len: usize,
}

impl<'q, M: Manifest> Iterator for Rows<'q, M> {
    type Item = RowHandle<'q, M>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.len {
            return None;
        }
        let row = RowHandle {
            query: self.query,
            row: self.next,
        };
        self.next += 1;
        Some(row)
    }
}

/// One result row, handing out typed fields wired to its write-back slots.
pub struct RowHandle<'q, M: Manifest> {
    query: &'q Query<M>,
    row: usize,
}

impl<'q, M: Manifest> RowHandle<'q, M> {
    /// Index of this row within the result.
    #[must_use]
    pub fn index(&self) -> usize {
        self.row
    }

    /// Raw result text at `position`; `None` for NULL or out of range.
    #[must_use]
    pub fn raw(&self, position: usize) -> Option<&'q str> {
        self.query.result.value(self.row, position)
    }

    /// The typed field at `position`.
    ///
    /// When the manifest names key columns, clones of one row's field share a
    /// value slot and write back through the row's key. Without key columns
    /// the field is detached: readable, but assignments are refused.
    ///
    /// # Errors
    ///
    /// Fails when `position` is outside the manifest, when the column's table
    /// has no key column to address the row by, or when the slot was already
    /// materialized at a different type.
    pub fn field<F: BindableField>(&self, position: usize) -> Result<F, RowBindError> {
        let spec = Query::<M>::spec_at(position)?;
        if self.query.pks.is_empty() {
            return Ok(F::init_from_text(spec, self.raw(position)));
        }
        let savers = self.query.savers_for(self.row);
        let saver = savers
            .iter()
            .find(|s| s.table() == spec.table)
            .ok_or(RowBindError::NotUpdatable {
                column: spec.column,
                table: spec.table,
            })?;
        match saver.lookup::<F>(position) {
            SlotLookup::Found(field) => Ok(field),
            SlotLookup::TypeMismatch => Err(RowBindError::FieldTypeMismatch {
                position,
                column: spec.column,
                table: spec.table,
            }),
            SlotLookup::Vacant => {
                let field = F::init_from_text(spec, self.raw(position));
                let sync: Rc<dyn RowSync> = Rc::<RowSaver>::clone(saver);
                field.attach(&sync);
                saver.install(position, &field);
                Ok(field)
            }
        }
    }
}
