//! Typed field slots over text tuples.
//!
//! A field is a cheap clone of a shared value slot. Slots created by a query
//! are wired back to that row's writer, so assigning through an
//! [`UpdateableField`] schedules an UPDATE that runs when the last clone of
//! the slot goes away (or on an explicit `sync`).

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use chrono::NaiveDateTime;

use crate::quote::quote;
use crate::row_saver::RowSync;

/// Identity of one column within a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub column: &'static str,
    pub table: &'static str,
    pub primary: bool,
}

/// Key identifying a value slot; stable for the slot's lifetime.
pub type SlotKey = usize;

/// A value that can round-trip through the database's text representation.
///
/// Parsing is forgiving the way dynamically typed result text demands:
/// unparseable or NULL input becomes the type's fallback value rather than
/// an error.
pub trait FieldValue: Clone + 'static {
    fn from_text(text: Option<&str>) -> Self;

    /// Render as a literal ready to splice into a SQL statement.
    fn to_literal(&self) -> String;

    fn fallback() -> Self;
}

impl FieldValue for String {
    fn from_text(text: Option<&str>) -> Self {
        text.unwrap_or_default().to_string()
    }

    fn to_literal(&self) -> String {
        quote(self)
    }

    fn fallback() -> Self {
        String::new()
    }
}

macro_rules! numeric_field_value {
    ($($ty:ty),+) => {
        $(impl FieldValue for $ty {
            fn from_text(text: Option<&str>) -> Self {
                text.and_then(|t| t.trim().parse().ok()).unwrap_or_default()
            }

            fn to_literal(&self) -> String {
                self.to_string()
            }

            fn fallback() -> Self {
                Self::default()
            }
        })+
    };
}

numeric_field_value!(i32, i64, u32, u64, f64);

impl FieldValue for bool {
    // Backends render booleans as t/f, TRUE/FALSE, Y/N, or 1/0.
    fn from_text(text: Option<&str>) -> Self {
        matches!(
            text.and_then(|t| t.trim().chars().next()),
            Some('t' | 'T' | 'y' | 'Y' | '1')
        )
    }

    fn to_literal(&self) -> String {
        if *self { "true" } else { "false" }.to_string()
    }

    fn fallback() -> Self {
        false
    }
}

impl FieldValue for NaiveDateTime {
    fn from_text(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return Self::fallback();
        };
        let text = text.trim();
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.3f"))
            .unwrap_or_else(|_| Self::fallback())
    }

    fn to_literal(&self) -> String {
        quote(&self.format("%Y-%m-%d %H:%M:%S%.f").to_string())
    }

    fn fallback() -> Self {
        NaiveDateTime::UNIX_EPOCH
    }
}

struct FieldCore<V> {
    value: RefCell<V>,
    modified: Cell<bool>,
    saver: RefCell<Option<Weak<dyn RowSync>>>,
}

/// A read-only typed view of one column of one row.
///
/// Clones share the same value slot. A field created outside a keyed query is
/// detached: it still parses and carries a value, it just has no row writer
/// behind it.
pub struct Field<V: FieldValue> {
    spec: FieldSpec,
    core: Rc<FieldCore<V>>,
}

impl<V: FieldValue> Field<V> {
    fn with_value(spec: FieldSpec, value: V) -> Self {
        Self {
            spec,
            core: Rc::new(FieldCore {
                value: RefCell::new(value),
                modified: Cell::new(false),
                saver: RefCell::new(None),
            }),
        }
    }

    /// Current value of the shared slot.
    #[must_use]
    pub fn get(&self) -> V {
        self.core.value.borrow().clone()
    }

    /// Overwrite the slot value without marking it modified. Legal in any
    /// state, including detached.
    pub fn initialize(&self, value: V) {
        *self.core.value.borrow_mut() = value;
    }

    /// Column and table this field belongs to.
    #[must_use]
    pub fn spec(&self) -> FieldSpec {
        self.spec
    }

    /// True when no other copy shares this slot, so discarding this one
    /// cannot lose a pending shared value.
    #[must_use]
    pub fn delete_ok(&self) -> bool {
        Rc::strong_count(&self.core) == 1
    }

    /// Hand the slot back to its row writer if this is the last copy
    /// outside the writer itself: pending modifications are flushed and the
    /// slot retired. Called automatically on drop; calling it earlier makes
    /// the hand-off happen at a deterministic point.
    pub fn detach(&self) {
        if Rc::strong_count(&self.core) != 2 {
            return;
        }
        if let Some(saver) = self.saver() {
            saver.remove_ref(self.slot_key());
        }
    }

    /// Has this slot been assigned since it was loaded or last synced?
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.core.modified.get()
    }

    fn saver(&self) -> Option<Rc<dyn RowSync>> {
        self.core.saver.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn set_value(&self, value: V) -> bool {
        if self.saver().is_none() {
            tracing::warn!(
                column = self.spec.column,
                table = self.spec.table,
                "assignment to a detached field ignored"
            );
            return false;
        }
        *self.core.value.borrow_mut() = value;
        self.core.modified.set(true);
        true
    }
}

impl<V: FieldValue> Clone for Field<V> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec,
            core: Rc::clone(&self.core),
        }
    }
}

impl<V: FieldValue> Drop for Field<V> {
    // Dropping from two owners to one means only the row writer's own copy
    // remains; tell it so it can flush and retire the slot.
    fn drop(&mut self) {
        self.detach();
    }
}

impl<V: FieldValue + std::fmt::Debug> std::fmt::Debug for Field<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("column", &self.spec.column)
            .field("table", &self.spec.table)
            .field("value", &*self.core.value.borrow())
            .field("modified", &self.core.modified.get())
            .finish()
    }
}

/// A typed view that also accepts assignments.
///
/// [`UpdateableField::set`] stores the value in the shared slot and marks it
/// for write-back; the UPDATE itself runs when the row writer next syncs,
/// which happens at the latest when the last clone of the slot drops.
pub struct UpdateableField<V: FieldValue> {
    inner: Field<V>,
}

impl<V: FieldValue> UpdateableField<V> {
    /// Current value of the shared slot.
    #[must_use]
    pub fn get(&self) -> V {
        self.inner.get()
    }

    /// Overwrite the slot value without marking it modified.
    pub fn initialize(&self, value: V) {
        self.inner.initialize(value);
    }

    /// See [`Field::delete_ok`].
    #[must_use]
    pub fn delete_ok(&self) -> bool {
        self.inner.delete_ok()
    }

    /// See [`Field::detach`].
    pub fn detach(&self) {
        self.inner.detach();
    }

    #[must_use]
    pub fn spec(&self) -> FieldSpec {
        self.inner.spec()
    }

    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.inner.is_modified()
    }

    /// Assign a new value, scheduling it for write-back.
    ///
    /// Returns false without storing anything when the field is detached
    /// from a row writer, since there is no row to write it back to.
    pub fn set(&self, value: V) -> bool {
        self.inner.set_value(value)
    }

    /// Write every modified column of this row back now.
    pub fn sync(&self) -> bool {
        match self.inner.saver() {
            Some(saver) => saver.sync(),
            None => false,
        }
    }
}

impl<V: FieldValue> Clone for UpdateableField<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V: FieldValue + std::fmt::Debug> std::fmt::Debug for UpdateableField<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

/// The operations a query needs to create, wire up, and clone fields of any
/// concrete type. Implemented by [`Field`] and [`UpdateableField`].
pub trait BindableField: Clone + Sized + 'static {
    /// A detached field carrying the fallback value.
    fn bind(spec: FieldSpec) -> Self;

    /// A field initialized from result text.
    fn init_from_text(spec: FieldSpec, text: Option<&str>) -> Self;

    fn attach(&self, saver: &Rc<dyn RowSync>);

    fn spec(&self) -> FieldSpec;

    fn literal(&self) -> String;

    fn is_modified(&self) -> bool;

    fn clear_modified(&self);

    /// True when the slot has no owners besides the row writer itself.
    fn retire_ok(&self) -> bool;

    fn slot_key(&self) -> SlotKey;

    /// Clear the back-link to the row writer without notifying it.
    fn unlink(&self);
}

impl<V: FieldValue> BindableField for Field<V> {
    fn bind(spec: FieldSpec) -> Self {
        Self::with_value(spec, V::fallback())
    }

    fn init_from_text(spec: FieldSpec, text: Option<&str>) -> Self {
        Self::with_value(spec, V::from_text(text))
    }

    fn attach(&self, saver: &Rc<dyn RowSync>) {
        *self.core.saver.borrow_mut() = Some(Rc::downgrade(saver));
    }

    fn spec(&self) -> FieldSpec {
        self.spec
    }

    fn literal(&self) -> String {
        self.core.value.borrow().to_literal()
    }

    fn is_modified(&self) -> bool {
        self.core.modified.get()
    }

    fn clear_modified(&self) {
        self.core.modified.set(false);
    }

    fn retire_ok(&self) -> bool {
        Rc::strong_count(&self.core) == 1
    }

    fn slot_key(&self) -> SlotKey {
        Rc::as_ptr(&self.core) as SlotKey
    }

    fn unlink(&self) {
        *self.core.saver.borrow_mut() = None;
    }
}

impl<V: FieldValue> BindableField for UpdateableField<V> {
    fn bind(spec: FieldSpec) -> Self {
        Self {
            inner: Field::bind(spec),
        }
    }

    fn init_from_text(spec: FieldSpec, text: Option<&str>) -> Self {
        Self {
            inner: Field::init_from_text(spec, text),
        }
    }

    fn attach(&self, saver: &Rc<dyn RowSync>) {
        self.inner.attach(saver);
    }

    fn spec(&self) -> FieldSpec {
        self.inner.spec
    }

    fn literal(&self) -> String {
        BindableField::literal(&self.inner)
    }

    fn is_modified(&self) -> bool {
        self.inner.is_modified()
    }

    fn clear_modified(&self) {
        BindableField::clear_modified(&self.inner);
    }

    fn retire_ok(&self) -> bool {
        BindableField::retire_ok(&self.inner)
    }

    fn slot_key(&self) -> SlotKey {
        self.inner.slot_key()
    }

    fn unlink(&self) {
        BindableField::unlink(&self.inner);
    }
}

/// Type-erased view of one slot held by a row writer.
pub(crate) trait SlotOps: Any {
    fn is_modified(&self) -> bool;

    /// Append `column=literal` for this slot's current value.
    fn append_assignment(&self, out: &mut String);

    fn clear_modified(&self);

    fn retire_ok(&self) -> bool;

    fn key(&self) -> SlotKey;

    fn unlink(&self);

    fn as_any(&self) -> &dyn Any;
}

impl<F: BindableField> SlotOps for F {
    fn is_modified(&self) -> bool {
        BindableField::is_modified(self)
    }

    fn append_assignment(&self, out: &mut String) {
        out.push_str(self.spec().column);
        out.push('=');
        out.push_str(&self.literal());
    }

    fn clear_modified(&self) {
        BindableField::clear_modified(self);
    }

    fn retire_ok(&self) -> bool {
        BindableField::retire_ok(self)
    }

    fn key(&self) -> SlotKey {
        self.slot_key()
    }

    fn unlink(&self) {
        BindableField::unlink(self);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
