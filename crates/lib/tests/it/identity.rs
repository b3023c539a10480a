use std::sync::Arc;

use rowtree::{
    Child, CollectionConfig, Context, IdentityCache, MemoryCache, NullCache, cache::CacheSlot,
};

use crate::helpers::{item_path, seeded_items};

#[test]
fn test_repeated_lookups_share_one_instance() {
    let f = seeded_items(CollectionConfig::new());
    let a = f.collection.get(&f.ctx, "1").unwrap();
    let b = f.collection.get(&f.ctx, "1").unwrap();
    assert!(Child::ptr_eq(&a, &b));
    assert!(matches!(
        f.cache.get(&item_path("1")),
        Some(CacheSlot::Live(_))
    ));
}

#[test]
fn test_null_cache_materializes_fresh_instances() {
    let f = seeded_items(CollectionConfig::new());
    let ctx = f.ctx.clone().with_cache(Arc::new(NullCache));
    let a = f.collection.get(&ctx, "1").unwrap();
    let b = f.collection.get(&ctx, "1").unwrap();
    assert!(!Child::ptr_eq(&a, &b));
    assert_eq!(a.fields(), b.fields());
}

#[test]
fn test_cached_instance_sees_edits_through_other_handles() {
    let f = seeded_items(CollectionConfig::new());
    let a = f.collection.get(&f.ctx, "3").unwrap();
    let b = f.collection.get(&f.ctx, 3).unwrap();
    f.collection
        .edit(&f.ctx, &b, rowtree::fields! { "label" => "changed" })
        .unwrap();
    assert_eq!(a.get("label"), Some(rowtree::Value::from("changed")));
}

#[test]
fn test_tombstoned_path_goes_back_to_storage() {
    let f = seeded_items(CollectionConfig::new());
    let first = f.collection.get(&f.ctx, "2").unwrap();
    f.cache.set(&item_path("2"), None);

    // The row still exists, so storage yields a new instance.
    let second = f.collection.get(&f.ctx, "2").unwrap();
    assert!(!Child::ptr_eq(&first, &second));
    assert!(Child::ptr_eq(
        &second,
        &f.collection.get(&f.ctx, "2").unwrap()
    ));
}

#[test]
fn test_bounded_cache_evicts() {
    let f = seeded_items(CollectionConfig::new());
    let cache = Arc::new(MemoryCache::with_capacity(2));
    let ctx: Context = f.ctx.clone().with_cache(cache.clone());

    let one = f.collection.get(&ctx, "1").unwrap();
    f.collection.get(&ctx, "2").unwrap();
    f.collection.get(&ctx, "3").unwrap();
    assert_eq!(cache.len(), 2);
    assert!(cache.get(&item_path("1")).is_none());

    let again = f.collection.get(&ctx, "1").unwrap();
    assert!(!Child::ptr_eq(&one, &again));
}

#[test]
fn test_separate_contexts_keep_separate_identities() {
    let f = seeded_items(CollectionConfig::new());
    let other = f
        .ctx
        .clone()
        .with_cache(Arc::new(MemoryCache::new()));
    let a = f.collection.get(&f.ctx, "4").unwrap();
    let b = f.collection.get(&other, "4").unwrap();
    assert!(!Child::ptr_eq(&a, &b));
}
