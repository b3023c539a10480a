//! Turning raw rows into bound, identity-preserving children.
//!
//! A [`ResultSet`] wraps the [`Cursor`] a session returned for a query. Every
//! row it hands out is bound to the parent the collection resolves for it and
//! to the name its key encodes to. When both exist, the identity cache is
//! consulted first: a live entry at that path wins and the fresh row is
//! dropped, otherwise the new child is stored there.
//!
//! Rows are pulled in batches, so neither one-at-a-time iteration nor
//! [`partitions`](ResultSet::partitions) holds the whole result in memory.

use std::collections::VecDeque;

use crate::Result;
use crate::backend::Cursor;
use crate::collection::{Collection, CollectionError};
use crate::context::Context;
use crate::record::Child;
use crate::value::Fields;

/// Lazily bound rows of one query.
///
/// Iterating yields `Result<Child>`; after the cursor fails once, iteration
/// ends.
pub struct ResultSet<'a> {
    collection: &'a Collection,
    ctx: &'a Context,
    cursor: Box<dyn Cursor>,
    buffer: VecDeque<Fields>,
    done: bool,
}

impl<'a> ResultSet<'a> {
    pub(crate) fn new(collection: &'a Collection, ctx: &'a Context, cursor: Box<dyn Cursor>) -> Self {
        Self {
            collection,
            ctx,
            cursor,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Iterate in batches of `size` children.
    ///
    /// The last batch may be shorter; no batch is empty.
    pub fn partitions(self, size: usize) -> Partitions<'a> {
        Partitions {
            results: self,
            size: size.max(1),
        }
    }

    /// The only child of the result, if any.
    ///
    /// Fails with [`CollectionError::MultipleRows`] when a second row exists.
    pub fn one_or_none(mut self) -> Result<Option<Child>> {
        let mut rows: Vec<Fields> = self.buffer.drain(..).collect();
        while !self.done && rows.len() < 2 {
            let batch = self.cursor.fetch(2 - rows.len())?;
            self.done = batch.is_empty();
            rows.extend(batch);
        }
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop().map(|row| self.bind(row))),
            _ => Err(CollectionError::MultipleRows {
                collection: self.collection.type_name().to_string(),
            }
            .into()),
        }
    }

    /// Every remaining child, in order.
    pub fn collect_all(self) -> Result<Vec<Child>> {
        self.collect()
    }

    fn bind(&self, row: Fields) -> Child {
        let name = self.collection.name_for(&row);
        let child = Child::new(row);
        let parent = self.collection.parent_for(&child);

        let (Some(parent), Some(name)) = (parent.clone(), name.clone()) else {
            child.bind_parent(parent);
            child.bind_name(name);
            return child;
        };

        let path = parent.child(name.clone());
        if let Some(cached) = self.ctx.cache().live(&path) {
            tracing::trace!(path = %path, "Identity cache hit");
            return cached;
        }
        tracing::trace!(path = %path, "Identity cache miss");
        child.bind_parent(Some(parent));
        child.bind_name(Some(name));
        self.ctx.cache().set(&path, Some(child.clone()));
        child
    }

    /// Fill the buffer with the next batch unless the cursor is exhausted.
    fn refill(&mut self, size: usize) -> Result<()> {
        if self.done || !self.buffer.is_empty() {
            return Ok(());
        }
        match self.cursor.fetch(size) {
            Ok(batch) if batch.is_empty() => {
                self.done = true;
                Ok(())
            }
            Ok(batch) => {
                self.buffer.extend(batch);
                Ok(())
            }
            Err(err) => {
                self.done = true;
                Err(err)
            }
        }
    }
}

impl Iterator for ResultSet<'_> {
    type Item = Result<Child>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(err) = self.refill(self.collection.batch_size()) {
            return Some(Err(err));
        }
        let row = self.buffer.pop_front()?;
        Some(Ok(self.bind(row)))
    }
}

/// Fixed-size batches of a [`ResultSet`].
pub struct Partitions<'a> {
    results: ResultSet<'a>,
    size: usize,
}

impl Iterator for Partitions<'_> {
    type Item = Result<Vec<Child>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut rows = Vec::with_capacity(self.size);
        while rows.len() < self.size {
            if let Err(err) = self.results.refill(self.size - rows.len()) {
                return Some(Err(err));
            }
            if self.results.buffer.is_empty() {
                break;
            }
            let take = self.results.buffer.len().min(self.size - rows.len());
            rows.extend(self.results.buffer.drain(..take));
        }
        if rows.is_empty() {
            return None;
        }
        Some(Ok(rows
            .into_iter()
            .map(|row| self.results.bind(row))
            .collect()))
    }
}
