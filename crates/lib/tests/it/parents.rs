use std::sync::Arc;

use rowtree::{
    Child, CollectionConfig, IdentityCache, Payload, Phase, ResourcePath, Value,
    collection::ParentRule, fields,
};

use crate::helpers::{empty_items, item_path};

/// Places children under `/labels/<label>` instead of `/items`.
fn by_label() -> Arc<dyn ParentRule> {
    Arc::new(|_: &ResourcePath, child: &Child| {
        child
            .get("label")
            .and_then(|label| label.as_text().map(str::to_string))
            .map(|label| ResourcePath::new(["labels", label.as_str()]))
    })
}

#[test]
fn test_parent_rule_binds_virtual_parent() {
    let f = empty_items(CollectionConfig::new().with_parent_rule(by_label()));
    let child = f
        .collection
        .add(&f.ctx, None, fields! { "id" => 1, "label" => "red" })
        .unwrap();
    assert_eq!(child.parent(), Some(ResourcePath::new(["labels", "red"])));
    assert_eq!(child.path(), Some(ResourcePath::new(["labels", "red", "1"])));

    let looked_up = f.collection.get(&f.ctx, "1").unwrap();
    assert!(Child::ptr_eq(&child, &looked_up));
}

#[test]
fn test_children_without_parent_are_not_cached_or_announced() {
    let f = empty_items(CollectionConfig::new().with_parent_rule(by_label()));
    let child = f
        .collection
        .add(&f.ctx, None, fields! { "id" => 2 })
        .unwrap();
    assert_eq!(child.parent(), None);
    assert_eq!(child.path(), None);
    assert!(f.events.phases().is_empty());
    assert!(f.cache.is_empty());

    // Still stored and reachable by name.
    let found = f.collection.get_child(&f.ctx, "2").unwrap().unwrap();
    assert_eq!(found.get("id"), Some(Value::Integer(2)));
}

#[test]
fn test_delete_under_virtual_parent_tombstones_both_paths() {
    let f = empty_items(CollectionConfig::new().with_parent_rule(by_label()));
    f.collection
        .add(&f.ctx, None, fields! { "id" => 3, "label" => "blue" })
        .unwrap();
    let child = f.collection.get(&f.ctx, 3).unwrap();
    f.collection.delete(&f.ctx, &child).unwrap();

    assert!(f
        .cache
        .is_tombstoned(&ResourcePath::new(["labels", "blue", "3"])));
    assert!(f.cache.is_tombstoned(&item_path("3")));
    assert!(f.collection.get(&f.ctx, 3).unwrap_err().is_not_found());
    assert_eq!(f.events.of_phase(Phase::AfterDelete).len(), 1);
}

#[test]
fn test_edit_that_changes_parent_moves_child() {
    let f = empty_items(CollectionConfig::new().with_parent_rule(by_label()));
    let child = f
        .collection
        .add(&f.ctx, None, fields! { "id" => 4, "label" => "red" })
        .unwrap();
    let looked_up = f.collection.get(&f.ctx, 4).unwrap();
    assert!(Child::ptr_eq(&child, &looked_up));

    f.collection
        .edit(&f.ctx, &child, fields! { "label" => "green" })
        .unwrap();

    let old_path = ResourcePath::new(["labels", "red", "4"]);
    let new_path = ResourcePath::new(["labels", "green", "4"]);
    assert_eq!(child.parent(), Some(ResourcePath::new(["labels", "green"])));
    assert_eq!(child.path(), Some(new_path.clone()));
    assert!(f.cache.is_tombstoned(&old_path));
    assert!(Child::ptr_eq(&f.cache.live(&new_path).unwrap(), &child));

    // The name is unchanged, so lookups by name still find the same child.
    assert!(!f.cache.is_tombstoned(&item_path("4")));
    assert!(Child::ptr_eq(&f.collection.get(&f.ctx, 4).unwrap(), &child));

    let moved = f.events.of_phase(Phase::Moved);
    assert_eq!(moved.len(), 1);
    assert!(matches!(
        &moved[0].payload,
        Payload::Moved { old_path: path } if *path == old_path
    ));
}
