//! Per-row write-back: collects modified columns of one keyed row and turns
//! them into a single UPDATE.

use std::cell::{Cell, RefCell};
use std::fmt::Write as _;
use std::rc::Rc;

use crate::commas::Commas;
use crate::fields::{BindableField, SlotKey, SlotOps};
use crate::pool::ConnectionPool;

/// Callbacks a field slot makes into the writer of its row.
pub trait RowSync {
    /// Flush every modified column of the row; true when nothing needed
    /// flushing or the UPDATE succeeded.
    fn sync(&self) -> bool;

    /// A slot is losing its last outside owner: flush the row, then retire
    /// the slot.
    fn remove_ref(&self, key: SlotKey);
}

pub(crate) enum SlotLookup<F> {
    Vacant,
    Found(F),
    TypeMismatch,
}

/// Writer for one keyed row. Holds one type-erased slot per manifest
/// position; only positions a caller has asked for are populated.
pub(crate) struct RowSaver {
    pk_column: &'static str,
    pk_table: &'static str,
    /// Key value already rendered as a SQL literal.
    pk_literal: String,
    pool: ConnectionPool,
    slots: RefCell<Vec<Option<Box<dyn SlotOps>>>>,
    released: Cell<bool>,
}

impl RowSaver {
    pub(crate) fn new(
        pk_column: &'static str,
        pk_table: &'static str,
        pk_literal: String,
        pool: ConnectionPool,
        slot_count: usize,
    ) -> Rc<Self> {
        Rc::new(Self {
            pk_column,
            pk_table,
            pk_literal,
            pool,
            slots: RefCell::new((0..slot_count).map(|_| None).collect()),
            released: Cell::new(false),
        })
    }

    pub(crate) fn table(&self) -> &'static str {
        self.pk_table
    }

    /// Clone the slot at `position` as `F`, if it is populated.
    pub(crate) fn lookup<F: BindableField>(&self, position: usize) -> SlotLookup<F> {
        let slots = self.slots.borrow();
        match slots.get(position).and_then(Option::as_ref) {
            None => SlotLookup::Vacant,
            Some(slot) => match slot.as_any().downcast_ref::<F>() {
                Some(field) => SlotLookup::Found(field.clone()),
                None => SlotLookup::TypeMismatch,
            },
        }
    }

    /// Populate the slot at `position` with a clone of `field`.
    pub(crate) fn install<F: BindableField>(&self, position: usize, field: &F) {
        self.slots.borrow_mut()[position] = Some(Box::new(field.clone()));
    }

    /// Flush pending modifications, then drop every slot. Surviving outside
    /// clones of the slots keep their values but lose the link back here.
    pub(crate) fn release(&self) {
        if self.released.replace(true) {
            return;
        }
        self.flush();
        let mut slots = self.slots.borrow_mut();
        for slot in slots.iter_mut() {
            if let Some(boxed) = slot {
                // Slots still shared with outside copies lose their link
                // first so the copies survive as plain detached fields.
                if !boxed.retire_ok() {
                    boxed.unlink();
                }
            }
            *slot = None;
        }
    }

    fn flush(&self) -> bool {
        let slots = self.slots.borrow();
        let mut assignments = String::new();
        let mut sep = Commas::new();
        for slot in slots.iter().flatten() {
            if slot.is_modified() {
                assignments.push(sep.get());
                slot.append_assignment(&mut assignments);
            }
        }
        if assignments.is_empty() {
            return true;
        }
        let mut handle = match self.pool.acquire() {
            Ok(handle) => handle,
            Err(err) => {
                tracing::error!(
                    table = self.pk_table,
                    error = %err,
                    "no connection to write row back"
                );
                return false;
            }
        };
        let _ = write!(
            handle,
            "update {table} set{assignments} where {table}.{pk}={key}",
            table = self.pk_table,
            pk = self.pk_column,
            key = self.pk_literal,
        );
        if handle.exec() {
            for slot in slots.iter().flatten() {
                slot.clear_modified();
            }
            true
        } else {
            false
        }
    }
}

impl RowSync for RowSaver {
    fn sync(&self) -> bool {
        self.flush()
    }

    fn remove_ref(&self, key: SlotKey) {
        // Flush first so the dying slot's value still makes it out.
        self.flush();
        let mut slots = self.slots.borrow_mut();
        match slots
            .iter_mut()
            .find(|s| s.as_ref().is_some_and(|b| b.key() == key))
        {
            Some(slot) => {
                if let Some(boxed) = slot {
                    // Break the back-link before the drop so the slot's own
                    // copy does not notify us again.
                    boxed.unlink();
                }
                *slot = None;
            }
            None => {
                tracing::error!(table = self.pk_table, "row writer told to retire an unknown slot");
                debug_assert!(false, "retire of unknown slot key");
            }
        }
    }
}
