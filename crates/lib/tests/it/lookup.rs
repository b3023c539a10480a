use chrono::{NaiveDate, TimeZone, Utc};
use rowtree::{
    Child, CollectionConfig, ColumnType, IdentityCache, Value, collection::CollectionError,
    fields,
};
use uuid::Uuid;

use crate::helpers::{keyed_by, seeded_items};

#[test]
fn test_get_by_name_and_key() {
    let f = seeded_items(CollectionConfig::new());
    let by_name = f.collection.get(&f.ctx, "3").unwrap();
    assert_eq!(by_name.get("label"), Some(Value::from("c")));
    assert_eq!(by_name.name().as_deref(), Some("3"));
    assert_eq!(by_name.parent(), Some(f.collection.path().clone()));

    let by_key = f.collection.get(&f.ctx, 3i64).unwrap();
    assert!(Child::ptr_eq(&by_name, &by_key));
}

#[test]
fn test_get_child_absent_and_malformed() {
    let f = seeded_items(CollectionConfig::new());
    assert!(f.collection.get_child(&f.ctx, "42").unwrap().is_none());
    assert!(f.collection.get_child(&f.ctx, "not-a-number").unwrap().is_none());

    let fallback = Child::new(fields! { "label" => "fallback" });
    let got = f
        .collection
        .get_child_or(&f.ctx, "42", fallback.clone())
        .unwrap();
    assert!(Child::ptr_eq(&got, &fallback));
}

#[test]
fn test_get_missing_is_not_found() {
    let f = seeded_items(CollectionConfig::new());
    let err = f.collection.get(&f.ctx, "42").unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        err,
        rowtree::Error::Collection(CollectionError::NotFound { .. })
    ));

    // Malformed names read as absent too.
    assert!(f.collection.get(&f.ctx, "abc").unwrap_err().is_not_found());
}

#[test]
fn test_unsupported_key_kinds_are_not_found() {
    let f = seeded_items(CollectionConfig::new());
    assert!(f.collection.get(&f.ctx, 1.0).unwrap_err().is_not_found());
    assert!(f.collection.get(&f.ctx, true).unwrap_err().is_not_found());
    assert!(f.collection.get(&f.ctx, Value::Null).unwrap_err().is_not_found());
}

#[test]
fn test_non_canonical_names_share_one_instance() {
    let f = seeded_items(CollectionConfig::new());
    let padded = f.collection.get(&f.ctx, "05").unwrap();
    let plain = f.collection.get(&f.ctx, "5").unwrap();
    assert!(Child::ptr_eq(&padded, &plain));
    assert_eq!(padded.name().as_deref(), Some("5"));
}

#[test]
fn test_contains() {
    let f = seeded_items(CollectionConfig::new());
    assert!(f.collection.contains(&f.ctx, "1").unwrap());
    assert!(f.collection.contains(&f.ctx, 5).unwrap());
    assert!(!f.collection.contains(&f.ctx, "6").unwrap());
    assert!(!f.collection.contains(&f.ctx, "six").unwrap());
}

#[test]
fn test_find_filters_by_fields() {
    let f = seeded_items(CollectionConfig::new());
    let found = f
        .collection
        .find(&f.ctx, &fields! { "label" => "d" })
        .unwrap()
        .one_or_none()
        .unwrap()
        .expect("label d exists");
    assert_eq!(found.name().as_deref(), Some("4"));
}

#[test]
fn test_uuid_keys_resolve_from_any_spelling() {
    let f = keyed_by("tokens", "token", ColumnType::Uuid);
    let token = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
    f.collection
        .add(&f.ctx, None, fields! { "token" => token, "label" => "t" })
        .unwrap();
    f.cache.clear();

    let upper = f
        .collection
        .get(&f.ctx, "67E55044-10B1-426F-9247-BB680E5FE0C8")
        .unwrap();
    assert_eq!(
        upper.name().as_deref(),
        Some("67e55044-10b1-426f-9247-bb680e5fe0c8")
    );
    let by_value = f.collection.get(&f.ctx, token).unwrap();
    assert!(Child::ptr_eq(&upper, &by_value));
}

#[test]
fn test_date_keys_resolve_by_value_and_name() {
    let f = keyed_by("days", "day", ColumnType::Date);
    let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    f.collection
        .add(&f.ctx, None, fields! { "day" => day, "label" => "leap" })
        .unwrap();
    f.cache.clear();

    let by_value = f.collection.get(&f.ctx, day).unwrap();
    assert_eq!(by_value.name().as_deref(), Some("2024-02-29"));
    assert_eq!(by_value.get("label"), Some(Value::from("leap")));
    let by_name = f.collection.get(&f.ctx, "2024-02-29").unwrap();
    assert!(Child::ptr_eq(&by_value, &by_name));
    assert!(!f.collection.contains(&f.ctx, "2024-02-30").unwrap());
}

#[test]
fn test_timestamp_keys_resolve_from_any_offset() {
    let f = keyed_by("ticks", "at", ColumnType::Timestamp);
    let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    f.collection
        .add(&f.ctx, None, fields! { "at" => at, "label" => "noon" })
        .unwrap();
    f.cache.clear();

    let by_value = f.collection.get(&f.ctx, at).unwrap();
    assert_eq!(by_value.name().as_deref(), Some("2024-03-01T12:00:00Z"));
    let shifted = f
        .collection
        .get(&f.ctx, "2024-03-01T13:00:00+01:00")
        .unwrap();
    assert!(Child::ptr_eq(&by_value, &shifted));
}
