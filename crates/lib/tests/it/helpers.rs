use std::sync::Arc;

use rowtree::{
    Collection, CollectionConfig, ColumnType, Context, EventLog, InMemory, MemoryCache,
    RecordType, ResourcePath, backend::Session, fields,
};

// ==========================
// CORE TEST FACTORIES
// ==========================
// Single point of change for backend matrix testing via TEST_BACKEND.

/// Creates a test session based on the TEST_BACKEND env var.
///
/// Supported values:
/// - "inmemory" or unset: InMemory backend (default)
/// - "sqlite": SQLite in-memory backend (requires `sqlite` feature)
///
/// # Panics
/// Panics if TEST_BACKEND=sqlite but the `sqlite` feature is not enabled.
///
/// # Example
/// ```bash
/// # Run tests with InMemory (default)
/// cargo test
///
/// # Run tests with SQLite
/// TEST_BACKEND=sqlite cargo test --features sqlite
/// ```
pub fn test_session() -> Arc<dyn Session> {
    match std::env::var("TEST_BACKEND").as_deref() {
        Ok("sqlite") => {
            #[cfg(feature = "sqlite")]
            {
                use rowtree::Sqlite;
                Arc::new(Sqlite::in_memory().expect("Failed to create SQLite backend"))
            }
            #[cfg(not(feature = "sqlite"))]
            {
                panic!("TEST_BACKEND=sqlite requires the 'sqlite' feature to be enabled")
            }
        }
        Ok("inmemory") | Err(_) => Arc::new(InMemory::new()),
        Ok(other) => panic!("Unknown TEST_BACKEND: {other}"),
    }
}

/// `items(id INTEGER PRIMARY KEY, label TEXT)`.
pub fn items_type() -> RecordType {
    RecordType::builder("items")
        .key_column("id", ColumnType::Integer)
        .column("label", ColumnType::Text)
        .build()
        .expect("items record type is valid")
}

/// Everything a test needs to drive one collection.
pub struct Fixture {
    pub collection: Collection,
    pub ctx: Context,
    pub cache: Arc<MemoryCache>,
    pub events: EventLog,
}

/// An `items` collection mounted at `/items` over an empty table, with a
/// memory cache and an event log.
pub fn empty_items(config: CollectionConfig) -> Fixture {
    mount_empty(items_type(), config)
}

/// `record_type` mounted at `/<table>` over an empty table.
pub fn mount_empty(record_type: RecordType, config: CollectionConfig) -> Fixture {
    let session = test_session();
    session
        .ensure_table(&record_type)
        .expect("Failed to create table");
    let cache = Arc::new(MemoryCache::new());
    let events = EventLog::new();
    let ctx = Context::new(session)
        .with_cache(cache.clone())
        .with_notifier(Arc::new(events.clone()));
    let path = ResourcePath::new([record_type.table()]);
    let collection =
        Collection::new(path, record_type, config).expect("Failed to mount collection");
    Fixture {
        collection,
        ctx,
        cache,
        events,
    }
}

/// A collection over `<table>(<key> <key_type> PRIMARY KEY, label TEXT)`.
pub fn keyed_by(table: &str, key: &str, key_type: ColumnType) -> Fixture {
    let record_type = RecordType::builder(table)
        .key_column(key, key_type)
        .column("label", ColumnType::Text)
        .build()
        .expect("keyed record type is valid");
    mount_empty(record_type, CollectionConfig::new())
}

/// Like [`empty_items`], seeded with ids 1..=5 labelled "a" to "e".
///
/// Seeding goes straight through the session, so the cache and the event
/// log start out empty.
pub fn seeded_items(config: CollectionConfig) -> Fixture {
    let fixture = empty_items(config);
    for (id, label) in (1..=5).zip(["a", "b", "c", "d", "e"]) {
        fixture
            .ctx
            .session()
            .add(&items_type(), &fields! { "id" => id, "label" => label })
            .expect("Failed to seed items");
    }
    fixture
}

/// Path of child `name` under `/items`.
pub fn item_path(name: &str) -> ResourcePath {
    ResourcePath::new(["items", name])
}
