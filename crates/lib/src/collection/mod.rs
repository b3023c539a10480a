//! Collections: record types exposed as named children of a tree node.
//!
//! A [`Collection`] binds one [`RecordType`] to a path in the resource tree.
//! Each stored row becomes a [`Child`] whose name is its primary key encoded
//! by the collection's [`KeyCodec`], so `/users/42` resolves to the `users`
//! row with `id = 42`.
//!
//! Collections hold configuration only. Every operation takes a [`Context`]
//! carrying the session to read and write through, the identity cache and
//! the notifier that receives mutation events.
//!
//! ## Mutation lifecycle
//!
//! | operation | events                                                   |
//! |-----------|----------------------------------------------------------|
//! | `add`     | `before-add`, `after-add` (only when a parent resolves)  |
//! | `edit`    | `before-edit`, `moved` (if the name changed), `after-edit` |
//! | `delete`  | `before-delete`, `after-delete` (on the collection)      |

mod errors;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

pub use errors::CollectionError;

use crate::Result;
use crate::codec::{ColumnCodec, KeyCodec, encode_value};
use crate::constants::{DEFAULT_BATCH_SIZE, UNBOUND};
use crate::context::Context;
use crate::events::{Payload, Phase, Target};
use crate::path::ResourcePath;
use crate::query::{Query, QueryBuilder};
use crate::record::{ChangeSet, Child, diff};
use crate::results::ResultSet;
use crate::schema::RecordType;
use crate::value::{Fields, Value};

/// Decides which node a child hangs under.
///
/// The default is the collection's own path. A rule returning `None` leaves
/// the child without a parent: it is neither cached nor announced on add.
pub trait ParentRule: Send + Sync {
    fn parent_for(&self, collection: &ResourcePath, child: &Child) -> Option<ResourcePath>;
}

impl<F> ParentRule for F
where
    F: Fn(&ResourcePath, &Child) -> Option<ResourcePath> + Send + Sync,
{
    fn parent_for(&self, collection: &ResourcePath, child: &Child) -> Option<ResourcePath> {
        self(collection, child)
    }
}

/// Options resolved once when a [`Collection`] is built.
#[derive(Clone)]
pub struct CollectionConfig {
    key: Option<String>,
    order_by: Option<Vec<String>>,
    codec: Option<Arc<dyn KeyCodec>>,
    parent_rule: Option<Arc<dyn ParentRule>>,
    batch_size: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            key: None,
            order_by: None,
            codec: None,
            parent_rule: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl CollectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name children by `column` instead of the primary key.
    ///
    /// Needed for record types whose primary key has several columns.
    pub fn with_key(mut self, column: impl Into<String>) -> Self {
        self.key = Some(column.into());
        self
    }

    /// Order `iter_ordered` by these columns instead of the primary key.
    pub fn with_order_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_by = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Use a custom codec. Overrides [`with_key`](Self::with_key).
    pub fn with_codec(mut self, codec: Arc<dyn KeyCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_parent_rule(mut self, rule: Arc<dyn ParentRule>) -> Self {
        self.parent_rule = Some(rule);
        self
    }

    /// Rows pulled per fetch during iteration. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

impl fmt::Debug for CollectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionConfig")
            .field("key", &self.key)
            .field("order_by", &self.order_by)
            .field("codec", &self.codec)
            .field("parent_rule", &self.parent_rule.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

/// A child lookup key.
///
/// Text, integer, UUID, date and timestamp keys are turned into names.
/// Anything else never names a child.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupKey(Value);

impl LookupKey {
    /// The name this key stands for.
    pub fn as_name(&self) -> Option<String> {
        match &self.0 {
            Value::Text(text) => Some(text.clone()),
            Value::Integer(_) | Value::Uuid(_) | Value::Date(_) | Value::Timestamp(_) => {
                encode_value(&self.0)
            }
            Value::Null | Value::Real(_) | Value::Bool(_) => None,
        }
    }
}

macro_rules! lookup_key_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for LookupKey {
                fn from(value: $ty) -> Self {
                    LookupKey(Value::from(value))
                }
            }
        )*
    };
}

lookup_key_from!(&str, String, &String, i64, i32, u32, f64, bool, Uuid, NaiveDate, DateTime<Utc>);

impl From<Value> for LookupKey {
    fn from(value: Value) -> Self {
        LookupKey(value)
    }
}

/// Derive a type name from a dashed or underscored resource name.
///
/// `"user-groups"` becomes `"UserGroups"`.
pub fn collection_type_name(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// A record type mounted at a path of the resource tree.
pub struct Collection {
    path: ResourcePath,
    record_type: RecordType,
    codec: Arc<dyn KeyCodec>,
    queries: QueryBuilder,
    parent_rule: Option<Arc<dyn ParentRule>>,
    batch_size: usize,
    type_name: String,
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("path", &self.path)
            .field("type_name", &self.type_name)
            .field("table", &self.record_type.table())
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

impl Collection {
    /// Mount `record_type` at `path`.
    ///
    /// # Errors
    /// Returns a configuration error if no usable key codec can be derived
    /// (composite primary key without a key override, unknown key column,
    /// real or bool key column) and `UnknownField` if the ordering names a
    /// column the record type lacks.
    pub fn new(path: ResourcePath, record_type: RecordType, config: CollectionConfig) -> Result<Self> {
        let type_name = collection_type_name(path.name().unwrap_or(record_type.table()));

        let codec: Arc<dyn KeyCodec> = match config.codec {
            Some(codec) => codec,
            None => Arc::new(ColumnCodec::for_record_type(&record_type, config.key.as_deref())?),
        };

        let order = config
            .order_by
            .unwrap_or_else(|| record_type.primary_key().to_vec());
        if let Some(column) = order.iter().find(|c| record_type.column(c).is_none()) {
            return Err(CollectionError::UnknownField {
                collection: type_name,
                field: column.clone(),
            }
            .into());
        }

        tracing::debug!(path = %path, table = record_type.table(), "Mounted collection");
        Ok(Self {
            queries: QueryBuilder::new(record_type.table(), order),
            path,
            record_type,
            codec,
            parent_rule: config.parent_rule,
            batch_size: config.batch_size.max(1),
            type_name,
        })
    }

    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    pub fn codec(&self) -> &dyn KeyCodec {
        self.codec.as_ref()
    }

    /// Statements over this collection's record type.
    pub fn queries(&self) -> &QueryBuilder {
        &self.queries
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Display name, derived from the last path segment.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Name a record with these fields would get, if its key is set.
    pub fn name_for(&self, fields: &Fields) -> Option<String> {
        self.codec.encode(fields).filter(|name| !name.is_empty())
    }

    /// Parent node for `child` under the configured rule.
    pub fn parent_for(&self, child: &Child) -> Option<ResourcePath> {
        match &self.parent_rule {
            Some(rule) => rule.parent_for(&self.path, child),
            None => Some(self.path.clone()),
        }
    }

    fn not_found(&self, name: impl Into<String>) -> crate::Error {
        CollectionError::NotFound {
            collection: self.type_name.clone(),
            name: name.into(),
        }
        .into()
    }

    fn check_fields(&self, fields: &Fields) -> Result<()> {
        match self.record_type.find_invalid_field(fields) {
            None => Ok(()),
            Some((field, _, None)) => Err(CollectionError::UnknownField {
                collection: self.type_name.clone(),
                field: field.to_string(),
            }
            .into()),
            Some((field, value, Some(expected))) => Err(CollectionError::FieldType {
                collection: self.type_name.clone(),
                field: field.to_string(),
                expected,
                actual: value.kind().to_string(),
            }
            .into()),
        }
    }

    /// Run `query` and bind its rows as children of this collection.
    pub fn execute<'a>(&'a self, ctx: &'a Context, query: &Query) -> Result<ResultSet<'a>> {
        let cursor = ctx.session().execute(&self.record_type, query)?;
        Ok(ResultSet::new(self, ctx, cursor))
    }

    /// Children whose fields equal every value in `fields`.
    pub fn find<'a>(&'a self, ctx: &'a Context, fields: &Fields) -> Result<ResultSet<'a>> {
        self.execute(ctx, &self.queries.select().filter_by(fields))
    }

    /// Look up the child called `name` in storage.
    ///
    /// A name that does not decode is treated as absent.
    pub fn get_child(&self, ctx: &Context, name: &str) -> Result<Option<Child>> {
        let key = match self.codec.decode(name) {
            Ok(key) => key,
            Err(err) if err.is_decode_error() => {
                tracing::trace!(collection = %self.path, name, "Name does not decode");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        self.execute(ctx, &self.queries.select().filter_by(&key))?
            .one_or_none()
    }

    /// Like [`get_child`](Self::get_child), with `default` when absent.
    pub fn get_child_or(&self, ctx: &Context, name: &str, default: Child) -> Result<Child> {
        Ok(self.get_child(ctx, name)?.unwrap_or(default))
    }

    /// Resolve a child by key, going through the identity cache.
    ///
    /// # Arguments
    /// * `key` - a name, or a key value that encodes to one
    ///
    /// # Errors
    /// Returns [`CollectionError::NotFound`] if the key is of a kind that
    /// cannot name a child, does not decode, or matches no row. Storage
    /// errors propagate unchanged.
    pub fn get(&self, ctx: &Context, key: impl Into<LookupKey>) -> Result<Child> {
        let key = key.into();
        let Some(raw) = key.as_name() else {
            tracing::warn!(collection = %self.path, ?key, "Lookup key cannot name a child");
            return Err(self.not_found(format!("{key:?}")));
        };
        let name = match self.codec.canonical(&raw) {
            Ok(name) => name,
            Err(err) if err.is_decode_error() => return Err(self.not_found(raw)),
            Err(err) => return Err(err),
        };

        let path = self.path.child(name.clone());
        if let Some(child) = ctx.cache().live(&path) {
            tracing::trace!(path = %path, "Identity cache hit");
            return Ok(child);
        }
        match self.get_child(ctx, &name)? {
            Some(child) => {
                ctx.cache().set(&path, Some(child.clone()));
                Ok(child)
            }
            None => Err(self.not_found(name)),
        }
    }

    /// Whether `key` resolves to a child.
    pub fn contains(&self, ctx: &Context, key: impl Into<LookupKey>) -> Result<bool> {
        match self.get(ctx, key) {
            Ok(_) => Ok(true),
            Err(crate::Error::Collection(CollectionError::NotFound { .. })) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Every child, in storage order.
    pub fn iter<'a>(&'a self, ctx: &'a Context) -> Result<ResultSet<'a>> {
        self.execute(ctx, &self.queries.select())
    }

    /// Every child, in the collection's canonical order.
    pub fn iter_ordered<'a>(&'a self, ctx: &'a Context) -> Result<ResultSet<'a>> {
        self.execute(ctx, &self.queries.select_ordered())
    }

    /// Number of rows `query` selects; all rows when `None`.
    pub fn count(&self, ctx: &Context, query: Option<&Query>) -> Result<u64> {
        match query {
            Some(query) => ctx.session().count(&self.record_type, query),
            None => ctx.session().count(&self.record_type, &self.queries.select()),
        }
    }

    /// Create a child.
    ///
    /// Key fields decoded from `name` are merged under `fields`; explicit
    /// fields win. `before-add` observers see the child with its parent and
    /// provisional name bound and may change its fields. Keys the session
    /// generates are written back before the child is cached.
    ///
    /// # Errors
    /// Returns an error if `name` does not decode, a field does not fit the
    /// record type, or the session rejects the row.
    pub fn add(&self, ctx: &Context, name: Option<&str>, fields: Fields) -> Result<Child> {
        let mut record = match name {
            Some(name) => self.codec.decode(name)?,
            None => Fields::new(),
        };
        record.extend(fields);
        self.check_fields(&record)?;

        let child = Child::new(record);
        let parent = self.parent_for(&child);
        child.bind_parent(parent.clone());
        child.bind_name(self.name_for(&child.fields()));

        if parent.is_some() {
            let payload = Payload::Fields {
                fields: child.fields(),
            };
            ctx.notify(&Target::Child(child.clone()), Phase::BeforeAdd, &payload);
        }

        let pending = child.fields();
        self.check_fields(&pending)?;
        child.bind_name(self.name_for(&pending));

        let stored = ctx.session().add(&self.record_type, &pending)?;
        child.bind_name(self.name_for(&stored));
        child.replace_fields(stored);

        let path = child.path();
        if let Some(path) = &path {
            ctx.cache().set(path, Some(child.clone()));
        }
        let name = child.name();
        tracing::debug!(
            collection = %self.path,
            name = name.as_deref().unwrap_or(UNBOUND),
            "Added child"
        );

        if parent.is_some() {
            let payload = Payload::Fields {
                fields: child.fields(),
            };
            ctx.notify(&Target::Child(child.clone()), Phase::AfterAdd, &payload);
        }
        Ok(child)
    }

    /// Update the child `fields` name, or add it if it does not exist.
    ///
    /// # Errors
    /// Returns [`CollectionError::IncompleteKey`] if `fields` do not name a
    /// child.
    pub fn merge(&self, ctx: &Context, fields: Fields) -> Result<Child> {
        let Some(name) = self.name_for(&fields) else {
            return Err(CollectionError::IncompleteKey {
                collection: self.type_name.clone(),
            }
            .into());
        };
        match self.get_child(ctx, &name)? {
            Some(child) => {
                self.edit(ctx, &child, fields)?;
                Ok(child)
            }
            None => self.add(ctx, None, fields),
        }
    }

    /// Apply `fields` to `child` and persist what actually changed.
    ///
    /// Returns the fields whose value changed, with old and new values. When
    /// the key or the resolved parent changes, the child moves: its old path
    /// is tombstoned, it is cached at the new path and a `moved` event
    /// carries the old path.
    pub fn edit(&self, ctx: &Context, child: &Child, fields: Fields) -> Result<ChangeSet> {
        self.check_fields(&fields)?;
        let old_name = child.name();
        let old_path = child.path();
        let target = Target::Child(child.clone());

        let pending = Payload::Fields {
            fields: fields.clone(),
        };
        ctx.notify(&target, Phase::BeforeEdit, &pending);

        let current = child.fields();
        let changes = diff(&current, &fields);
        if !changes.is_empty() {
            let key = self.record_type.key_fields(&current);
            let updates: Fields = changes
                .iter()
                .map(|(field, change)| (field.clone(), change.new.clone()))
                .collect();
            ctx.session().update(&self.record_type, &key, &updates)?;
            child.apply(&updates);
        }

        let new_name = self.name_for(&child.fields());
        child.bind_parent(self.parent_for(child));
        child.bind_name(new_name.clone());
        let new_path = child.path();
        if new_name != old_name || new_path != old_path {
            match &old_name {
                Some(old_name) if new_name.as_ref() != Some(old_name) => {
                    self.tombstone(ctx, old_path.as_ref(), old_name);
                }
                // Same name under another parent: the collection path still
                // names this child, only the old virtual path is gone.
                Some(old_name) => {
                    if let Some(old_path) = &old_path
                        && *old_path != self.path.child(old_name.as_str())
                    {
                        ctx.cache().set(old_path, None);
                    }
                }
                None => {}
            }
            if let Some(path) = &new_path {
                ctx.cache().set(path, Some(child.clone()));
            }
            tracing::debug!(
                collection = %self.path,
                old = old_name.as_deref().unwrap_or(UNBOUND),
                new = new_name.as_deref().unwrap_or(UNBOUND),
                "Child moved"
            );
            if let Some(old_path) = old_path {
                ctx.notify(&target, Phase::Moved, &Payload::Moved { old_path });
            }
        }

        let payload = Payload::Edited {
            fields,
            changes: changes.clone(),
        };
        ctx.notify(&target, Phase::AfterEdit, &payload);
        Ok(changes)
    }

    /// Give `child` the key `name` decodes to.
    pub fn rename(&self, ctx: &Context, child: &Child, name: &str) -> Result<ChangeSet> {
        let fields = self.codec.decode(name)?;
        self.edit(ctx, child, fields)
    }

    /// Delete `child` from storage and tombstone its path.
    pub fn delete(&self, ctx: &Context, child: &Child) -> Result<()> {
        let target = Target::Child(child.clone());
        ctx.notify(&target, Phase::BeforeDelete, &Payload::Empty);

        let path = child.path();
        if let Some(name) = child.name() {
            self.tombstone(ctx, path.as_ref(), &name);
        }
        let key = self.record_type.key_fields(&child.fields());
        ctx.session().delete(&self.record_type, &key)?;
        tracing::debug!(collection = %self.path, key = ?key, "Deleted child");

        ctx.notify(
            &Target::Collection(self.path.clone()),
            Phase::AfterDelete,
            &Payload::Removed { path },
        );
        Ok(())
    }

    /// Resolve `key` and delete that child.
    pub fn remove(&self, ctx: &Context, key: impl Into<LookupKey>) -> Result<()> {
        let child = self.get(ctx, key)?;
        self.delete(ctx, &child)
    }

    /// Operations on `child` that route through this collection.
    pub fn child_ops<'a>(&'a self, ctx: &'a Context, child: &'a Child) -> ChildOps<'a> {
        ChildOps {
            collection: self,
            ctx,
            child,
        }
    }

    /// Tombstone every path `name` may be cached under: the bound path and,
    /// when a parent rule places children elsewhere, the collection path.
    fn tombstone(&self, ctx: &Context, bound: Option<&ResourcePath>, name: &str) {
        let direct = self.path.child(name);
        if let Some(bound) = bound
            && *bound != direct
        {
            ctx.cache().set(bound, None);
        }
        ctx.cache().set(&direct, None);
    }
}

/// Edit, rename and delete a child without naming its collection each time.
#[derive(Debug, Clone, Copy)]
pub struct ChildOps<'a> {
    collection: &'a Collection,
    ctx: &'a Context,
    child: &'a Child,
}

impl ChildOps<'_> {
    pub fn edit(&self, fields: Fields) -> Result<ChangeSet> {
        self.collection.edit(self.ctx, self.child, fields)
    }

    pub fn rename(&self, name: &str) -> Result<ChangeSet> {
        self.collection.rename(self.ctx, self.child, name)
    }

    pub fn delete(&self) -> Result<()> {
        self.collection.delete(self.ctx, self.child)
    }
}
