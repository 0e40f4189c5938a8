//! HybridMultiMap interaction suite
//!
//! The hide mechanism intersects with uniqueness checks, key refreshing, and
//! bucket rebuilds in ways no single-feature unit test pins down. These
//! tests fix the intended behavior of each pairing explicitly.

use densekit::{ChainOrder, DensekitError, HybridConfig, HybridMultiMap};

type Entry = (u32, String);
type EntryMap = HybridMultiMap<u32, Entry, fn(&Entry) -> u32>;

fn entry_key(v: &Entry) -> u32 {
    v.0
}

fn entry(k: u32, s: &str) -> Entry {
    (k, s.to_string())
}

fn map_with(config: HybridConfig) -> EntryMap {
    HybridMultiMap::with_config(entry_key, config)
}

fn hash_map_with(config: HybridConfig, n: u32) -> EntryMap {
    let mut map = map_with(config);
    for i in 0..n {
        map.insert(entry(i, "seed")).unwrap();
    }
    assert!(map.is_hash());
    map
}

// ---------------------------------------------------------------------------
// hide x unique-mode insertion
// ---------------------------------------------------------------------------

#[test]
fn hidden_entry_does_not_block_unique_insert() {
    let mut map = hash_map_with(HybridConfig::unique(), 10);
    map.hide(3).unwrap();
    // key 3 has no *visible* entry, so a unique-mode insert succeeds
    let slot = map.insert(entry(3, "replacement")).unwrap();
    map.validate();
    assert_eq!(map.find_first(&3), Some(slot));
}

#[test]
fn unhide_can_surface_a_duplicate() {
    let mut map = hash_map_with(HybridConfig::unique(), 10);
    map.hide(3).unwrap();
    map.insert(entry(3, "replacement")).unwrap();
    // unhide restores visibility without re-validating uniqueness; the key
    // now has two entries and enumeration sees both
    map.unhide(3).unwrap();
    map.validate();
    assert_eq!(map.iter_key(&3).count(), 2);
}

#[test]
fn hidden_entry_invisible_in_list_mode_too() {
    let mut map = map_with(HybridConfig::unique());
    map.insert(entry(1, "a")).unwrap();
    map.insert(entry(2, "b")).unwrap();
    map.hide(0).unwrap();
    assert!(map.insert(entry(1, "again")).is_ok());
    assert_eq!(map.visible_len(), 2);
}

// ---------------------------------------------------------------------------
// hide x refresh_key_at
// ---------------------------------------------------------------------------

#[test]
fn refresh_on_hidden_slot_restamps_hash_for_later_unhide() {
    let mut map = hash_map_with(HybridConfig::default(), 10);
    map.hide(5).unwrap();
    // mutate the hidden value's key, then refresh while hidden
    map.get_mut(5).unwrap().0 = 500;
    map.refresh_key_at(5).unwrap();
    map.validate();
    // still hidden: neither old nor new key finds it
    assert_eq!(map.find_first(&5), None);
    assert_eq!(map.find_first(&500), None);
    // unhide links it into the bucket of the refreshed key
    map.unhide(5).unwrap();
    map.validate();
    assert_eq!(map.find_first(&500), Some(5));
    assert_eq!(map.find_first(&5), None);
}

#[test]
fn stale_unhide_without_refresh_is_the_callers_bug() {
    // the contract requires refresh after key mutation; this pins what the
    // structure does about it: nothing - the entry files under its stored
    // (stale) hash
    let mut map = hash_map_with(HybridConfig::default(), 10);
    map.hide(5).unwrap();
    map.get_mut(5).unwrap().0 = 500;
    map.unhide(5).unwrap();
    // linked under the old hash: lookups by the new key can miss it, and a
    // refresh now repairs the linkage
    map.refresh_key_at(5).unwrap();
    map.validate();
    assert_eq!(map.find_first(&500), Some(5));
}

// ---------------------------------------------------------------------------
// hide x rehash / upgrade
// ---------------------------------------------------------------------------

#[test]
fn hidden_slots_survive_bucket_rebuilds() {
    let mut map = hash_map_with(HybridConfig::default(), 10);
    map.hide(2).unwrap();
    map.hide(7).unwrap();
    // push the map through at least one load-factor rebuild
    for i in 100..300u32 {
        map.insert(entry(i, "filler")).unwrap();
    }
    map.validate();
    assert_eq!(map.find_first(&2), None);
    assert_eq!(map.find_first(&7), None);
    map.unhide(2).unwrap();
    map.unhide(7).unwrap();
    map.validate();
    // the stored hash stayed valid across the bucket-count change
    assert_eq!(map.find_first(&2), Some(2));
    assert_eq!(map.find_first(&7), Some(7));
}

#[test]
fn hidden_slots_survive_list_to_hash_upgrade() {
    let mut map = map_with(HybridConfig::default());
    for i in 0..4u32 {
        map.insert(entry(i, "seed")).unwrap();
    }
    map.hide(1).unwrap();
    assert!(!map.is_hash());
    map.insert(entry(4, "trigger")).unwrap();
    assert!(map.is_hash());
    map.validate();
    assert_eq!(map.find_first(&1), None);
    assert_eq!(map.is_hidden(1), Some(true));
    map.unhide(1).unwrap();
    assert_eq!(map.find_first(&1), Some(1));
}

// ---------------------------------------------------------------------------
// hide x swap_remove
// ---------------------------------------------------------------------------

#[test]
fn swap_remove_of_hidden_slot() {
    let mut map = hash_map_with(HybridConfig::default(), 10);
    map.hide(4).unwrap();
    let removed = map.swap_remove(4).unwrap();
    assert_eq!(removed.0, 4);
    map.validate();
    assert_eq!(map.len(), 9);
    assert_eq!(map.visible_len(), 9);
    // the moved last entry answers at the recycled slot
    assert_eq!(map.find_first(&9), Some(4));
}

#[test]
fn swap_remove_moving_a_hidden_last_slot() {
    let mut map = hash_map_with(HybridConfig::default(), 10);
    map.hide(9).unwrap();
    map.swap_remove(0).unwrap();
    map.validate();
    // the hidden tail moved into slot 0 and stayed hidden
    assert_eq!(map.is_hidden(0), Some(true));
    assert_eq!(map.get(0).unwrap().0, 9);
    assert_eq!(map.find_first(&9), None);
    map.unhide(0).unwrap();
    map.validate();
    assert_eq!(map.find_first(&9), Some(0));
}

// ---------------------------------------------------------------------------
// refresh_key_at x rehash
// ---------------------------------------------------------------------------

#[test]
fn refreshed_keys_stay_reachable_across_rebuilds() {
    let mut map = hash_map_with(HybridConfig::default(), 20);
    for slot in 0..20 {
        map.get_mut(slot).unwrap().0 += 1000;
        map.refresh_key_at(slot).unwrap();
    }
    for i in 300..500u32 {
        map.insert(entry(i, "filler")).unwrap();
    }
    map.validate();
    for i in 0..20u32 {
        assert_eq!(map.find_first(&(i + 1000)), Some(i as usize));
        assert_eq!(map.find_first(&i), None);
    }
}

#[test]
fn refresh_with_unchanged_key_is_a_no_op() {
    let mut map = hash_map_with(HybridConfig::default(), 10);
    let before: Vec<usize> = map.iter_key(&6).map(|(s, _)| s).collect();
    map.refresh_key_at(6).unwrap();
    map.validate();
    let after: Vec<usize> = map.iter_key(&6).map(|(s, _)| s).collect();
    assert_eq!(before, after);
}

// ---------------------------------------------------------------------------
// chain order under churn
// ---------------------------------------------------------------------------

#[test]
fn newest_first_chains_survive_rebuilds() {
    let config = HybridConfig {
        chain_order: ChainOrder::NewestFirst,
        ..HybridConfig::default()
    };
    let mut map = map_with(config);
    for round in 0..4u32 {
        for key in 0..30u32 {
            map.insert((key, format!("r{}", round))).unwrap();
        }
    }
    map.validate();
    for key in 0..30u32 {
        let tags: Vec<&str> = map.iter_key(&key).map(|(_, v)| v.1.as_str()).collect();
        assert_eq!(tags, ["r3", "r2", "r1", "r0"], "order broken for {}", key);
    }
}

// ---------------------------------------------------------------------------
// representation pinning
// ---------------------------------------------------------------------------

#[test]
fn pinned_list_reports_configuration_error_not_capacity() {
    let mut map = map_with(HybridConfig::pinned_list());
    for i in 0..4u32 {
        map.insert(entry(i, "v")).unwrap();
    }
    let err = map.insert(entry(9, "overflow")).unwrap_err();
    assert!(matches!(err, DensekitError::Configuration { .. }));
    // the pin is about representation, not data: everything inserted so far
    // is still reachable
    for i in 0..4u32 {
        assert!(map.contains_key(&i));
    }
}
