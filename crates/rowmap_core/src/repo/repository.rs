//! Identity-mapped repository for one entity kind.
//!
//! # Responsibility
//! - Serve model lookups from the identity map before touching storage.
//! - Orchestrate create/update/delete through the translator and factory.
//!
//! # Invariants
//! - At most one in-memory model exists per id while this repository holds it;
//!   repeated lookups return the same `ModelHandle` instance.
//! - A storage row for an already cached id resolves to the cached instance.
//! - The cache never evicts on its own; only `delete`, `evict` and
//!   `clear_cache` remove entries.
//! - Not thread-safe: callers serialize access (one repository per unit of work).

use crate::error::OrmResult;
use crate::gateway::{Operator, QueryParams, WhereClause};
use crate::mapping::translator::Translator;
use crate::model::factory::Factory;
use crate::model::instance::{ModelHandle, ID_PROPERTY};
use crate::model::value::{Record, Value};
use log::{debug, info, warn};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Identity map plus CRUD orchestration for one entity kind.
pub struct Repository {
    translator: Rc<Translator>,
    factory: Rc<Factory>,
    models: RefCell<BTreeMap<i64, ModelHandle>>,
}

impl Repository {
    pub fn new(translator: Rc<Translator>, factory: Rc<Factory>) -> Self {
        Self {
            translator,
            factory,
            models: RefCell::new(BTreeMap::new()),
        }
    }

    /// Loads one model by id, from the identity map when cached.
    ///
    /// Returns `None` when storage has no such row.
    pub fn get_by_id(&self, id: i64) -> OrmResult<Option<ModelHandle>> {
        if let Some(model) = self.cached(id) {
            debug!(
                "event=repo_get module=repo status=cache_hit table={} id={id}",
                self.translator.table()
            );
            return Ok(Some(model));
        }

        let params = QueryParams::new().filter(WhereClause::eq(self.translator.id_column(), id));
        let rows = self.translator.read(params)?;
        Ok(self.materialize(rows).into_values().next())
    }

    /// Loads models matching identity-keyed filters.
    ///
    /// Clauses on other columns are dropped. Equality clauses on an id already
    /// in the identity map are answered from the map and removed from the
    /// outgoing query; the first remaining clause loses its connective. A query
    /// whose clauses were all answered or dropped does not touch storage, while
    /// a query without clauses reads the whole table.
    pub fn get(&self, mut params: QueryParams) -> OrmResult<BTreeMap<i64, ModelHandle>> {
        let id_column = self.translator.id_column();
        let had_clauses = !params.where_clauses.is_empty();
        let mut models = BTreeMap::new();
        let mut remaining = Vec::with_capacity(params.where_clauses.len());

        for clause in params.where_clauses.drain(..) {
            if clause.column != id_column {
                debug!(
                    "event=repo_get module=repo status=clause_dropped table={} column={}",
                    self.translator.table(),
                    clause.column
                );
                continue;
            }
            if clause.operator == Operator::Eq {
                if let Some(id) = clause.value.as_id() {
                    if let Some(model) = self.cached(id) {
                        models.insert(id, model);
                        continue;
                    }
                }
            }
            remaining.push(clause);
        }

        if let Some(first) = remaining.first_mut() {
            first.condition = None;
        }
        if had_clauses && remaining.is_empty() {
            return Ok(models);
        }

        params.where_clauses = remaining;
        let rows = self.translator.read(params)?;
        models.extend(self.materialize(rows));
        Ok(models)
    }

    /// Persists `model` and returns its id.
    ///
    /// A model with a non-null id is updated in storage, filtered by that id,
    /// and cached under it when the id is integral (replacing any other
    /// instance). A transient model is created, hydrated with the stored row
    /// and cached. Returns `None` when creation produced no row or the id is
    /// not integral.
    pub fn add(&self, model: &ModelHandle) -> OrmResult<Option<i64>> {
        let data = model.data();

        if !model.borrow().is_transient() {
            let raw_id = data.get(ID_PROPERTY).cloned().unwrap_or_default();
            let id = raw_id.as_id();
            let filter = id.map_or(raw_id, Value::Integer);
            if let Some(id) = id {
                self.models.borrow_mut().insert(id, model.clone());
            }
            let params = QueryParams::new()
                .data(data)
                .filter(WhereClause::eq(self.translator.id_column(), filter.clone()));
            if !self.translator.update(params)? {
                warn!(
                    "event=repo_add module=repo status=update_noop table={} id={filter}",
                    self.translator.table()
                );
            }
            return Ok(id);
        }

        let Some(row) = self.translator.create(&data)? else {
            return Ok(None);
        };
        let rejected = model.hydrate(&row);
        if !rejected.is_empty() {
            warn!(
                "event=repo_add module=repo status=partial table={} rejected={}",
                self.translator.table(),
                rejected.into_iter().collect::<Vec<_>>().join(",")
            );
        }

        let id = model.id();
        match id {
            Some(id) => {
                self.models.borrow_mut().insert(id, model.clone());
                info!(
                    "event=repo_add module=repo status=created table={} id={id}",
                    self.translator.table()
                );
            }
            None => warn!(
                "event=repo_add module=repo status=missing_id table={}",
                self.translator.table()
            ),
        }
        Ok(id)
    }

    /// Evicts `id` and deletes its row; returns the storage result.
    ///
    /// Handles to the evicted model stay usable but no longer represent a
    /// persisted row.
    pub fn delete(&self, id: i64) -> OrmResult<bool> {
        self.evict(id);
        let params = QueryParams::new().filter(WhereClause::eq(self.translator.id_column(), id));
        let deleted = self.translator.delete(params)?;
        debug!(
            "event=repo_delete module=repo status=ok table={} id={id} deleted={deleted}",
            self.translator.table()
        );
        Ok(deleted)
    }

    /// Returns the cached model for `id` without touching storage.
    pub fn cached(&self, id: i64) -> Option<ModelHandle> {
        self.models.borrow().get(&id).cloned()
    }

    pub fn cached_ids(&self) -> Vec<i64> {
        self.models.borrow().keys().copied().collect()
    }

    pub fn cache_len(&self) -> usize {
        self.models.borrow().len()
    }

    /// Drops `id` from the identity map only; storage is untouched.
    pub fn evict(&self, id: i64) -> Option<ModelHandle> {
        self.models.borrow_mut().remove(&id)
    }

    pub fn clear_cache(&self) {
        self.models.borrow_mut().clear();
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    fn materialize(&self, rows: Vec<Record>) -> BTreeMap<i64, ModelHandle> {
        let mut loaded = BTreeMap::new();
        for row in rows {
            let Some(id) = row.get(ID_PROPERTY).and_then(Value::as_id) else {
                warn!(
                    "event=repo_materialize module=repo status=skipped table={} reason=missing_id",
                    self.translator.table()
                );
                continue;
            };

            if let Some(model) = self.cached(id) {
                loaded.insert(id, model);
                continue;
            }

            let mut model = self.factory.create_empty();
            let rejected = model.hydrate(&row);
            if !rejected.is_empty() {
                warn!(
                    "event=repo_materialize module=repo status=partial table={} id={id} rejected={}",
                    self.translator.table(),
                    rejected.into_iter().collect::<Vec<_>>().join(",")
                );
            }
            let model = ModelHandle::new(model);
            self.models.borrow_mut().insert(id, model.clone());
            loaded.insert(id, model);
        }
        loaded
    }
}
