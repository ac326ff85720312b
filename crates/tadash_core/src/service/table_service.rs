//! Intent-level use-case service over one record store.
//!
//! # Responsibility
//! - Translate presentation intents (add, edit, delete, filter) into editor
//!   operations on an injected `RecordStore`.
//! - Commit every successful mutation immediately.
//!
//! # Invariants
//! - Service APIs never bypass editor validation or store persistence.
//! - A failed operation leaves the store snapshot unchanged.

use crate::editor::{add_record, delete_records, update_record, FieldValues};
use crate::error::{DashError, DashResult};
use crate::model::table::{RecordId, Table};
use crate::store::RecordStore;
use crate::view::{FilterSpec, FilteredView, Selection, SortSpec, View};
use log::{info, warn};
use std::fmt::Debug;

/// User intent emitted by a presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Add(FieldValues),
    Edit { id: RecordId, fields: FieldValues },
    Delete(Vec<RecordId>),
}

/// Result of a successful intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added(RecordId),
    Edited(RecordId),
    /// Ids that were present and removed.
    Deleted(Vec<RecordId>),
}

/// Use-case wrapper around one table's store.
pub struct TableService {
    store: RecordStore,
}

impl TableService {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    pub fn table(&self) -> &Table {
        self.store.get()
    }

    pub fn name(&self) -> &str {
        &self.store.schema().name
    }

    /// Derives a view of the current snapshot.
    ///
    /// # Errors
    /// - `DashError::Validation` when the filter or sort names an unknown
    ///   field.
    pub fn view(&self, filter: &FilterSpec, sort: Option<&SortSpec>) -> DashResult<View> {
        let table = self.store.get();
        filter.validate(table)?;
        match sort {
            Some(sort) => {
                if table.schema().column_def(&sort.field).is_none() {
                    return Err(DashError::validation(&sort.field, "unknown sort field"));
                }
                Ok(FilteredView::apply_sorted(table, filter, sort))
            }
            None => Ok(FilteredView::apply(table, filter)),
        }
    }

    /// Executes one intent and commits the resulting table.
    pub fn execute(&mut self, intent: Intent) -> DashResult<Outcome> {
        match intent {
            Intent::Add(fields) => self.add(fields).map(Outcome::Added),
            Intent::Edit { id, fields } => self.edit(id, fields).map(|()| Outcome::Edited(id)),
            Intent::Delete(ids) => self.delete(ids).map(Outcome::Deleted),
        }
    }

    pub fn add(&mut self, fields: FieldValues) -> DashResult<RecordId> {
        self.run("add", |current| add_record(current, &fields))
    }

    pub fn edit(&mut self, id: RecordId, fields: FieldValues) -> DashResult<()> {
        self.run("edit", |current| {
            update_record(current, id, &fields).map(|next| (next, ()))
        })
    }

    /// Deletes `ids`, returning the ones that were present.
    pub fn delete(&mut self, ids: Vec<RecordId>) -> DashResult<Vec<RecordId>> {
        self.run("delete", |current| {
            let removed: Vec<RecordId> = ids
                .iter()
                .copied()
                .filter(|id| current.contains(*id))
                .collect();
            delete_records(current, &ids).map(|next| (next, removed))
        })
    }

    /// Deletes the records behind selected rows of `view`.
    pub fn delete_selected(
        &mut self,
        view: &View,
        selection: &Selection,
    ) -> DashResult<Vec<RecordId>> {
        let ids = view.resolve(selection)?;
        self.delete(ids)
    }

    /// Edits the single record behind the selected row of `view`.
    pub fn edit_selected(
        &mut self,
        view: &View,
        selection: &Selection,
        fields: FieldValues,
    ) -> DashResult<RecordId> {
        let id = view.resolve_single(selection)?;
        self.edit(id, fields)?;
        Ok(id)
    }

    fn run<T: Debug>(
        &mut self,
        intent: &'static str,
        op: impl FnOnce(&Table) -> DashResult<(Table, T)>,
    ) -> DashResult<T> {
        let result = self.commit_with(op);
        match &result {
            Ok(output) => info!(
                "event=intent module=service status=ok table={} intent={} output={:?}",
                self.name(),
                intent,
                output
            ),
            Err(err) => warn!(
                "event=intent module=service status=error table={} intent={} error_code={}",
                self.name(),
                intent,
                err.code()
            ),
        }
        result
    }

    fn commit_with<T>(
        &mut self,
        op: impl FnOnce(&Table) -> DashResult<(Table, T)>,
    ) -> DashResult<T> {
        let current = self.store.get();
        let (next, output) = op(current)?;
        if next.revision() != current.revision() {
            self.store.commit(next)?;
        }
        Ok(output)
    }
}
