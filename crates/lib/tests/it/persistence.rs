use std::sync::Arc;

use rowtree::{
    Collection, CollectionConfig, ColumnType, Context, InMemory, RecordType, ResourcePath, Value,
    backend::Session, fields,
};

use crate::helpers::items_type;

fn mount(session: Arc<dyn Session>) -> (Collection, Context) {
    let collection = Collection::new(
        ResourcePath::new(["items"]),
        items_type(),
        CollectionConfig::new(),
    )
    .unwrap();
    (collection, Context::new(session))
}

#[test]
fn test_in_memory_snapshot_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("items.json");

    let backend = Arc::new(InMemory::new());
    backend.ensure_table(&items_type()).unwrap();
    let (collection, ctx) = mount(backend.clone());
    collection
        .add(&ctx, None, fields! { "label" => "kept" })
        .unwrap();
    backend.save_to_file(&file).unwrap();

    let (collection, ctx) = mount(Arc::new(InMemory::load_from_file(&file).unwrap()));
    let child = collection.get(&ctx, "1").unwrap();
    assert_eq!(child.get("label"), Some(Value::from("kept")));
}

#[test]
fn test_uuid_keyed_collection() {
    let record_type = RecordType::builder("sessions")
        .key_column("token", ColumnType::Uuid)
        .column("user", ColumnType::Text)
        .build()
        .unwrap();
    let session = crate::helpers::test_session();
    session.ensure_table(&record_type).unwrap();
    let ctx = Context::new(session);
    let collection = Collection::new(
        ResourcePath::new(["sessions"]),
        record_type,
        CollectionConfig::new(),
    )
    .unwrap();

    let token = uuid::Uuid::new_v4();
    let child = collection
        .add(&ctx, None, fields! { "token" => token, "user" => "ana" })
        .unwrap();
    assert_eq!(child.name(), Some(token.hyphenated().to_string()));

    let upper = token.hyphenated().to_string().to_uppercase();
    let found = collection.get(&ctx, upper.as_str()).unwrap();
    assert_eq!(found.get("user"), Some(Value::from("ana")));
    assert_eq!(collection.get(&ctx, token).unwrap().name(), child.name());
}

#[cfg(feature = "sqlite")]
#[test]
fn test_sqlite_file_survives_reopen() {
    use rowtree::Sqlite;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.db");
    {
        let backend = Sqlite::open(&path).unwrap();
        backend.ensure_table(&items_type()).unwrap();
        let (collection, ctx) = mount(Arc::new(backend));
        for label in ["a", "b"] {
            collection
                .add(&ctx, None, fields! { "label" => label })
                .unwrap();
        }
    }

    let backend = Sqlite::open(&path).unwrap();
    backend.ensure_table(&items_type()).unwrap();
    let (collection, ctx) = mount(Arc::new(backend));
    assert_eq!(collection.count(&ctx, None).unwrap(), 2);
    assert_eq!(
        collection.get(&ctx, 2).unwrap().get("label"),
        Some(Value::from("b"))
    );
}

#[cfg(feature = "sqlite")]
#[test]
fn test_sqlite_missing_table_is_persistence_error() {
    use rowtree::Sqlite;

    let (collection, ctx) = mount(Arc::new(Sqlite::in_memory().unwrap()));
    let err = collection.iter(&ctx).unwrap().next().unwrap().unwrap_err();
    assert!(err.is_persistence_error());
    assert!(err.is_not_found());
}
