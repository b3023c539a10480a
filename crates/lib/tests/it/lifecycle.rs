use std::sync::Arc;

use rowtree::{
    Child, CollectionConfig, Payload, Phase, Target, Value, collection::CollectionError, fields,
};

use crate::helpers::{empty_items, item_path, items_type, seeded_items};

#[test]
fn test_add_then_rename_end_to_end() {
    let f = seeded_items(CollectionConfig::new());

    let added = f
        .collection
        .add(&f.ctx, None, fields! { "id" => 6, "label" => "f" })
        .unwrap();
    assert_eq!(added.path(), Some(item_path("6")));

    let six = f.collection.get(&f.ctx, "6").unwrap();
    assert_eq!(six.get("label"), Some(Value::from("f")));
    assert!(Child::ptr_eq(&added, &six));

    f.collection.rename(&f.ctx, &six, "60").unwrap();
    let sixty = f.collection.get(&f.ctx, "60").unwrap();
    assert!(Child::ptr_eq(&six, &sixty));
    assert!(f.collection.get(&f.ctx, "6").unwrap_err().is_not_found());
    assert_eq!(f.collection.count(&f.ctx, None).unwrap(), 6);
}

#[test]
fn test_add_with_name_merges_fields() {
    let f = empty_items(CollectionConfig::new());
    let child = f
        .collection
        .add(&f.ctx, Some("7"), fields! { "label" => "g" })
        .unwrap();
    assert_eq!(child.fields(), fields! { "id" => 7, "label" => "g" });

    // Explicit fields win over the decoded name.
    let child = f
        .collection
        .add(&f.ctx, Some("8"), fields! { "id" => 9, "label" => "i" })
        .unwrap();
    assert_eq!(child.name().as_deref(), Some("9"));
}

#[test]
fn test_add_assigns_generated_key() {
    let f = seeded_items(CollectionConfig::new());
    let child = f
        .collection
        .add(&f.ctx, None, fields! { "label" => "auto" })
        .unwrap();
    assert_eq!(child.get("id"), Some(Value::Integer(6)));
    assert_eq!(child.name().as_deref(), Some("6"));
    assert!(Child::ptr_eq(&child, &f.collection.get(&f.ctx, 6).unwrap()));
}

#[test]
fn test_add_events() {
    let f = empty_items(CollectionConfig::new());
    f.collection
        .add(&f.ctx, None, fields! { "id" => 1, "label" => "a" })
        .unwrap();
    assert_eq!(f.events.phases(), vec![Phase::BeforeAdd, Phase::AfterAdd]);
    let after = &f.events.of_phase(Phase::AfterAdd)[0];
    assert_eq!(after.target.path(), Some(item_path("1")));
}

#[test]
fn test_before_add_observer_can_change_key() {
    let mut f = empty_items(CollectionConfig::new());
    let bump = |target: &Target, phase: Phase, _: &Payload| {
        if phase == Phase::BeforeAdd
            && let Some(child) = target.as_child()
        {
            child.set_field("id", 100);
        }
    };
    f.ctx = f.ctx.clone().with_notifier(Arc::new(bump));

    let child = f
        .collection
        .add(&f.ctx, None, fields! { "id" => 1, "label" => "a" })
        .unwrap();
    assert_eq!(child.name().as_deref(), Some("100"));
    assert!(f.collection.contains(&f.ctx, "100").unwrap());
    assert!(!f.collection.contains(&f.ctx, "1").unwrap());
}

#[test]
fn test_add_duplicate_key_is_conflict() {
    let f = seeded_items(CollectionConfig::new());
    let err = f
        .collection
        .add(&f.ctx, None, fields! { "id" => 1, "label" => "again" })
        .unwrap_err();
    assert!(err.is_conflict());
    assert!(err.is_persistence_error());
}

#[test]
fn test_edit_unchanged_field_is_empty_change_set() {
    let f = seeded_items(CollectionConfig::new());
    let child = f.collection.get(&f.ctx, "2").unwrap();
    f.events.clear();

    let changes = f
        .collection
        .edit(&f.ctx, &child, fields! { "label" => "b" })
        .unwrap();
    assert!(changes.is_empty());
    assert_eq!(f.events.phases(), vec![Phase::BeforeEdit, Phase::AfterEdit]);
}

#[test]
fn test_edit_persists_changes() {
    let f = seeded_items(CollectionConfig::new());
    let child = f.collection.get(&f.ctx, "2").unwrap();
    let changes = f
        .collection
        .edit(&f.ctx, &child, fields! { "label" => "bee" })
        .unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes["label"].old, Value::from("b"));
    assert_eq!(changes["label"].new, Value::from("bee"));
    assert_eq!(child.get("label"), Some(Value::from("bee")));

    let stored = f
        .ctx
        .session()
        .count(
            &items_type(),
            &f.collection.queries().select().filter("label", "bee"),
        )
        .unwrap();
    assert_eq!(stored, 1);

    let edited = &f.events.of_phase(Phase::AfterEdit)[0];
    match &edited.payload {
        Payload::Edited { fields, changes } => {
            assert_eq!(fields, &fields! { "label" => "bee" });
            assert_eq!(changes.len(), 1);
        }
        other => panic!("unexpected payload {other:?}"),
    }
}

#[test]
fn test_key_change_moves_child() {
    let f = seeded_items(CollectionConfig::new());
    let child = f.collection.get(&f.ctx, "4").unwrap();
    f.events.clear();

    f.collection
        .edit(&f.ctx, &child, fields! { "id" => 40 })
        .unwrap();

    assert!(f.cache.is_tombstoned(&item_path("4")));
    assert!(f.collection.get(&f.ctx, "4").unwrap_err().is_not_found());
    assert!(Child::ptr_eq(&child, &f.collection.get(&f.ctx, "40").unwrap()));
    assert_eq!(
        f.events.phases(),
        vec![Phase::BeforeEdit, Phase::Moved, Phase::AfterEdit]
    );
    let moved = &f.events.of_phase(Phase::Moved)[0];
    assert_eq!(
        moved.payload,
        Payload::Moved {
            old_path: item_path("4")
        }
    );
}

#[test]
fn test_edit_rejects_unknown_field() {
    let f = seeded_items(CollectionConfig::new());
    let child = f.collection.get(&f.ctx, "1").unwrap();
    let err = f
        .collection
        .edit(&f.ctx, &child, fields! { "colour" => "red" })
        .unwrap_err();
    assert!(matches!(
        err,
        rowtree::Error::Collection(CollectionError::UnknownField { .. })
    ));
    assert!(f.events.phases().is_empty());
}

#[test]
fn test_rename_to_malformed_name_fails() {
    let f = seeded_items(CollectionConfig::new());
    let child = f.collection.get(&f.ctx, "1").unwrap();
    let err = f.collection.rename(&f.ctx, &child, "one").unwrap_err();
    assert!(err.is_decode_error());
    assert_eq!(child.name().as_deref(), Some("1"));
}

#[test]
fn test_merge_creates_then_updates() {
    let f = empty_items(CollectionConfig::new());
    let first = f
        .collection
        .merge(&f.ctx, fields! { "id" => 3, "label" => "first" })
        .unwrap();
    let second = f
        .collection
        .merge(&f.ctx, fields! { "id" => 3, "label" => "second" })
        .unwrap();
    assert!(Child::ptr_eq(&first, &second));
    assert_eq!(f.collection.count(&f.ctx, None).unwrap(), 1);
    assert_eq!(
        f.collection.get(&f.ctx, "3").unwrap().get("label"),
        Some(Value::from("second"))
    );
}

#[test]
fn test_merge_requires_key() {
    let f = empty_items(CollectionConfig::new());
    let err = f
        .collection
        .merge(&f.ctx, fields! { "label" => "orphan" })
        .unwrap_err();
    assert!(matches!(
        err,
        rowtree::Error::Collection(CollectionError::IncompleteKey { .. })
    ));
    assert_eq!(f.collection.count(&f.ctx, None).unwrap(), 0);
}

#[test]
fn test_delete_with_warm_cache() {
    let f = seeded_items(CollectionConfig::new());
    let child = f.collection.get(&f.ctx, "2").unwrap();
    f.events.clear();

    f.collection.delete(&f.ctx, &child).unwrap();
    assert!(f.collection.get(&f.ctx, "2").unwrap_err().is_not_found());
    assert_eq!(f.collection.count(&f.ctx, None).unwrap(), 4);

    assert_eq!(
        f.events.phases(),
        vec![Phase::BeforeDelete, Phase::AfterDelete]
    );
    let after = &f.events.of_phase(Phase::AfterDelete)[0];
    assert_eq!(after.target.path(), Some(f.collection.path().clone()));
    assert_eq!(
        after.payload,
        Payload::Removed {
            path: Some(item_path("2"))
        }
    );
}

#[test]
fn test_remove_by_key() {
    let f = seeded_items(CollectionConfig::new());
    f.collection.remove(&f.ctx, 5).unwrap();
    assert!(!f.collection.contains(&f.ctx, 5).unwrap());
    assert!(f.collection.remove(&f.ctx, 5).unwrap_err().is_not_found());
}
