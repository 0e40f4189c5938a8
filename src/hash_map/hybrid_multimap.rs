//! HybridMultiMap - dense multimap that upgrades from a linear-scan list to
//! a chained hash table as it grows
//!
//! Values live in a dense array whose slot indices stay stable until a
//! `swap_remove`. Keys are extracted from values by a function supplied at
//! construction, so a value can carry its own key. Small maps are scanned
//! linearly with no auxiliary structure; past a small threshold the map
//! builds 16-bit chained buckets, capping it at 65 535 slots. Slots can be
//! "hidden": excluded from key lookup and iteration while keeping their
//! index and value in place.

use crate::error::{check_bounds, DensekitError, Result};
use crate::succinct::BitVector;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::marker::PhantomData;

/// Chain-link sentinel; also the reason slot indices stop at 65 534.
const NIL: u16 = u16::MAX;

/// Hard slot limit of the hash representation (16-bit links)
pub const MAX_SLOTS: usize = NIL as usize;

/// Largest entry count served by the list representation
pub const LIST_MAX: usize = 4;

const LOAD_FACTOR: f32 = 0.7;

/// Prime numbers used for bucket sizing
const PRIMES: &[usize] = &[
    5, 11, 23, 47, 97, 199, 409, 823, 1741, 3469, 6949, 14033, 28411, 57557, 116731,
];

/// Get the smallest listed prime >= n
fn next_prime(n: usize) -> usize {
    for &prime in PRIMES {
        if prime >= n {
            return prime;
        }
    }
    n.next_power_of_two()
}

/// Ordering of entries that share a key (observed by key iteration)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOrder {
    /// Entries enumerate in the order they were inserted (the default)
    InsertionOrder,
    /// The most recently inserted entry enumerates first
    NewestFirst,
}

/// Configuration for [`HybridMultiMap`]
#[derive(Debug, Clone)]
pub struct HybridConfig {
    /// Reject insertion of a key that already has a visible entry
    pub unique_keys: bool,
    /// Enumeration order among entries sharing a key
    pub chain_order: ChainOrder,
    /// Permit the one-way list-to-hash representation upgrade
    pub allow_upgrade: bool,
    /// Slot/bucket capacity to preallocate; a value above [`LIST_MAX`]
    /// starts the map directly in the hash representation
    pub initial_capacity: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            unique_keys: false,
            chain_order: ChainOrder::InsertionOrder,
            allow_upgrade: true,
            initial_capacity: 0,
        }
    }
}

impl HybridConfig {
    /// Config for a unique-keys map (duplicate inserts fail)
    pub fn unique() -> Self {
        Self {
            unique_keys: true,
            ..Self::default()
        }
    }

    /// Config pinned to the list representation.
    ///
    /// Inserts past [`LIST_MAX`] fail with a configuration error instead of
    /// upgrading.
    pub fn pinned_list() -> Self {
        Self {
            allow_upgrade: false,
            ..Self::default()
        }
    }
}

/// Per-slot chain record of the hash representation
#[derive(Debug, Clone, Copy)]
struct Link {
    hash: u32,
    prev: u16,
    next: u16,
}

/// Backing representation; the upgrade is one-directional
enum Repr {
    List,
    Hash {
        /// Head slot per bucket, `NIL` when empty
        buckets: Vec<u16>,
        /// Parallel to the value array; hidden slots keep a stale-free
        /// `hash` but are not linked into any chain
        links: Vec<Link>,
        /// Entry count that triggers the next bucket rebuild
        max_load: usize,
    },
}

/// Append `slot` to the bucket chain its stored hash selects.
///
/// Chains are doubly linked with a circular `prev`: the head's `prev` names
/// the chain tail, giving O(1) tail access, while `next` terminates with
/// `NIL` at the tail.
fn link_slot(buckets: &mut [u16], links: &mut [Link], slot: u16, at_tail: bool) {
    let b = (links[slot as usize].hash as usize) % buckets.len();
    let head = buckets[b];
    if head == NIL {
        buckets[b] = slot;
        links[slot as usize].prev = slot;
        links[slot as usize].next = NIL;
    } else if at_tail {
        let tail = links[head as usize].prev;
        links[tail as usize].next = slot;
        links[slot as usize].prev = tail;
        links[slot as usize].next = NIL;
        links[head as usize].prev = slot;
    } else {
        links[slot as usize].prev = links[head as usize].prev;
        links[slot as usize].next = head;
        links[head as usize].prev = slot;
        buckets[b] = slot;
    }
}

/// Detach `slot` from its bucket chain; its own link fields become stale.
fn unlink_slot(buckets: &mut [u16], links: &mut [Link], slot: u16) {
    let b = (links[slot as usize].hash as usize) % buckets.len();
    let prev = links[slot as usize].prev;
    let next = links[slot as usize].next;
    if buckets[b] == slot {
        if next == NIL {
            buckets[b] = NIL;
        } else {
            // the new head inherits the tail pointer
            links[next as usize].prev = prev;
            buckets[b] = next;
        }
    } else if next == NIL {
        links[prev as usize].next = NIL;
        let head = buckets[b];
        links[head as usize].prev = prev;
    } else {
        links[prev as usize].next = next;
        links[next as usize].prev = prev;
    }
}

/// Rewrite every chain reference to `from` so it names `to` instead,
/// preserving the slot's position within its chain. The caller copies the
/// link record afterwards and fixes a single-node self-referencing `prev`.
fn repoint_slot(buckets: &mut [u16], links: &mut [Link], from: u16, to: u16) {
    let rec = links[from as usize];
    let b = (rec.hash as usize) % buckets.len();
    if buckets[b] == from {
        buckets[b] = to;
        if rec.next != NIL {
            links[rec.next as usize].prev = to;
        }
    } else {
        links[rec.prev as usize].next = to;
        if rec.next != NIL {
            links[rec.next as usize].prev = to;
        } else {
            // `from` is the tail; the head's prev names the tail
            links[buckets[b] as usize].prev = to;
        }
    }
}

/// Key-to-values lookup structure with a dense, stable-index value array
///
/// `HybridMultiMap` stores values contiguously; the slot index returned by
/// [`insert`](Self::insert) identifies the value until a
/// [`swap_remove`](Self::swap_remove) recycles it. A key extractor supplied
/// at construction derives each value's key, and pluggable hashing arrives
/// through the `S: BuildHasher` parameter.
///
/// Up to [`LIST_MAX`] entries the map is a plain array searched linearly.
/// The insert that would overflow it upgrades to prime-sized buckets of
/// 16-bit doubly linked chains; the upgrade is one-directional and caps the
/// map at [`MAX_SLOTS`] entries, signalled by a capacity error.
///
/// Entries sharing a key enumerate in insertion order (or newest-first, per
/// [`ChainOrder`]). A slot can be hidden - removed from key lookup and
/// iteration without moving it - and later unhidden. After mutating a
/// value's key fields in place, call [`refresh_key_at`](Self::refresh_key_at)
/// to resynchronize the index.
///
/// # Examples
///
/// ```rust
/// use densekit::{HybridMultiMap, HybridConfig};
///
/// let mut map = HybridMultiMap::new(|v: &(u32, &str)| v.0);
/// map.insert((1, "one"))?;
/// map.insert((2, "two"))?;
/// map.insert((1, "uno"))?;
/// let ones: Vec<&str> = map.iter_key(&1).map(|(_, v)| v.1).collect();
/// assert_eq!(ones, ["one", "uno"]);
/// # Ok::<(), densekit::DensekitError>(())
/// ```
pub struct HybridMultiMap<K, V, E, S = ahash::RandomState> {
    values: Vec<V>,
    /// Parallel bitmap; a set bit marks a hidden slot
    hidden: BitVector,
    hidden_count: usize,
    repr: Repr,
    key_of: E,
    hash_builder: S,
    config: HybridConfig,
    _marker: PhantomData<fn() -> K>,
}

impl<K, V, E> HybridMultiMap<K, V, E, ahash::RandomState>
where
    K: Hash + Eq,
    E: Fn(&V) -> K,
{
    /// Create an empty map with the default configuration
    pub fn new(key_of: E) -> Self {
        Self::with_config(key_of, HybridConfig::default())
    }

    /// Create an empty map with a custom configuration
    pub fn with_config(key_of: E, config: HybridConfig) -> Self {
        Self::with_config_and_hasher(key_of, config, ahash::RandomState::new())
    }

    /// Build a map from an existing sequence of values
    pub fn from_values<I>(values: I, key_of: E, config: HybridConfig) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
    {
        let mut map = Self::with_config(key_of, config);
        map.insert_all(values)?;
        Ok(map)
    }
}

impl<K, V, E, S> HybridMultiMap<K, V, E, S>
where
    K: Hash + Eq,
    E: Fn(&V) -> K,
    S: BuildHasher,
{
    /// Create an empty map with a custom configuration and hasher
    pub fn with_config_and_hasher(key_of: E, config: HybridConfig, hash_builder: S) -> Self {
        let repr = if config.initial_capacity > LIST_MAX {
            let nbuckets = next_prime(config.initial_capacity.max(5));
            Repr::Hash {
                buckets: vec![NIL; nbuckets],
                links: Vec::with_capacity(config.initial_capacity),
                max_load: (nbuckets as f32 * LOAD_FACTOR) as usize,
            }
        } else {
            Repr::List
        };
        Self {
            values: Vec::with_capacity(config.initial_capacity),
            hidden: BitVector::new(),
            hidden_count: 0,
            repr,
            key_of,
            hash_builder,
            config,
            _marker: PhantomData,
        }
    }

    /// Number of physical slots, hidden ones included
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the map holds no slots at all
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of slots visible to key lookup and iteration
    #[inline]
    pub fn visible_len(&self) -> usize {
        self.values.len() - self.hidden_count
    }

    /// Whether the map has upgraded to the hash representation
    #[inline]
    pub fn is_hash(&self) -> bool {
        matches!(self.repr, Repr::Hash { .. })
    }

    /// Whether the slot at `index` is currently hidden
    pub fn is_hidden(&self, index: usize) -> Option<bool> {
        self.hidden.get(index)
    }

    /// The dense value array; slot indices index into it directly
    #[inline]
    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// Borrow the value at a slot, hidden or not
    #[inline]
    pub fn get(&self, index: usize) -> Option<&V> {
        self.values.get(index)
    }

    /// Mutably borrow the value at a slot.
    ///
    /// If the mutation changes the value's key fields, follow up with
    /// [`refresh_key_at`](Self::refresh_key_at).
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut V> {
        self.values.get_mut(index)
    }

    fn hash_u32(&self, key: &K) -> u32 {
        let mut hasher = self.hash_builder.build_hasher();
        key.hash(&mut hasher);
        let h = hasher.finish();
        (h ^ (h >> 32)) as u32
    }

    #[inline]
    fn at_tail(&self) -> bool {
        self.config.chain_order == ChainOrder::InsertionOrder
    }

    /// Insert a value, returning its new slot index.
    ///
    /// The key is extracted from the value. In unique-keys mode an insert
    /// whose key already has a visible entry fails with a duplicate-key
    /// error and leaves the map unchanged. The insert that would overflow
    /// the list representation upgrades to hash (or fails with a
    /// configuration error when the upgrade is disallowed); the insert that
    /// would exceed [`MAX_SLOTS`] fails with a capacity error.
    pub fn insert(&mut self, value: V) -> Result<usize> {
        let key = (self.key_of)(&value);
        // all failure checks precede any mutation, including the upgrade
        if self.config.unique_keys && self.find_first(&key).is_some() {
            return Err(DensekitError::duplicate_key(
                "key already has a visible entry in a unique-keys map",
            ));
        }
        if matches!(self.repr, Repr::List) && self.values.len() >= LIST_MAX {
            if !self.config.allow_upgrade {
                return Err(DensekitError::configuration(format!(
                    "map is pinned to the list representation and full ({} entries)",
                    LIST_MAX
                )));
            }
            self.upgrade_to_hash();
        }
        if self.is_hash() && self.values.len() >= MAX_SLOTS {
            return Err(DensekitError::capacity_exceeded(MAX_SLOTS));
        }

        let slot = self.values.len();
        if self.is_hash() {
            self.maybe_rehash(slot + 1);
            let hash = self.hash_u32(&key);
            let at_tail = self.at_tail();
            if let Repr::Hash { buckets, links, .. } = &mut self.repr {
                links.push(Link {
                    hash,
                    prev: NIL,
                    next: NIL,
                });
                link_slot(buckets, links, slot as u16, at_tail);
            }
        }
        self.values.push(value);
        self.hidden.push(false);
        Ok(slot)
    }

    /// Insert every value of a sequence, stopping at the first failure
    pub fn insert_all<I: IntoIterator<Item = V>>(&mut self, values: I) -> Result<()> {
        for value in values {
            self.insert(value)?;
        }
        Ok(())
    }

    /// Upgrade to the hash representation now.
    ///
    /// No-op when already upgraded; the transition is one-directional.
    pub fn force_hash(&mut self) {
        if matches!(self.repr, Repr::List) {
            self.upgrade_to_hash();
        }
    }

    fn upgrade_to_hash(&mut self) {
        let n = self.values.len();
        log::debug!("upgrading multimap to hash representation at {} entries", n);
        let nbuckets = next_prime((n * 2).max(5));
        let mut buckets = vec![NIL; nbuckets];
        let mut links: Vec<Link> = Vec::with_capacity(n + 1);
        for value in &self.values {
            let hash = self.hash_u32(&(self.key_of)(value));
            links.push(Link {
                hash,
                prev: NIL,
                next: NIL,
            });
        }
        // walking slots in slot order reproduces the list scan order inside
        // every chain
        let at_tail = self.at_tail();
        for slot in 0..n {
            if !self.hidden.get(slot).unwrap_or(false) {
                link_slot(&mut buckets, &mut links, slot as u16, at_tail);
            }
        }
        self.repr = Repr::Hash {
            buckets,
            links,
            max_load: (nbuckets as f32 * LOAD_FACTOR) as usize,
        };
    }

    fn maybe_rehash(&mut self, needed: usize) {
        let (cur, max_load) = match &self.repr {
            Repr::Hash { buckets, max_load, .. } => (buckets.len(), *max_load),
            Repr::List => return,
        };
        if needed <= max_load {
            return;
        }
        let mut new_cap = cur;
        while ((new_cap as f32 * LOAD_FACTOR) as usize) < needed {
            new_cap = next_prime(new_cap + 1);
        }
        self.rebuild_buckets(new_cap);
    }

    /// Rebuild all buckets at `new_cap`, rehashing every linked entry.
    ///
    /// Old chains are walked in chain order and tail-appended, so the
    /// relative order of entries sharing a bucket (hence a key) survives the
    /// rebuild. Hidden slots are in no chain and are untouched; their stored
    /// hash keys them into the right bucket whenever they are unhidden.
    fn rebuild_buckets(&mut self, new_cap: usize) {
        if let Repr::Hash {
            buckets,
            links,
            max_load,
        } = &mut self.repr
        {
            log::trace!(
                "rebuilding {} buckets into {} for {} slots",
                buckets.len(),
                new_cap,
                links.len()
            );
            let old_buckets = std::mem::replace(buckets, vec![NIL; new_cap]);
            *max_load = (new_cap as f32 * LOAD_FACTOR) as usize;
            for head in old_buckets {
                let mut cur = head;
                while cur != NIL {
                    let next = links[cur as usize].next;
                    link_slot(buckets, links, cur, true);
                    cur = next;
                }
            }
        }
    }

    /// Slot of the first visible entry with this key, in chain order
    pub fn find_first(&self, key: &K) -> Option<usize> {
        self.iter_key(key).next().map(|(slot, _)| slot)
    }

    /// Whether any visible entry has this key
    pub fn contains_key(&self, key: &K) -> bool {
        self.find_first(key).is_some()
    }

    /// Walk the visible entries with this key, returning the first slot the
    /// predicate accepts.
    ///
    /// The predicate sees `(slot, &value)`, supporting lookup by key alone,
    /// by key and value, or by key and any external argument.
    pub fn find_with<P>(&self, key: &K, mut pred: P) -> Option<usize>
    where
        P: FnMut(usize, &V) -> bool,
    {
        self.iter_key(key)
            .find(|(slot, value)| pred(*slot, value))
            .map(|(slot, _)| slot)
    }

    /// Iterate over `(slot, &value)` for every visible entry with this key,
    /// in chain order
    pub fn iter_key<'a>(&'a self, key: &'a K) -> KeyIter<'a, K, V, E, S> {
        let cursor = match &self.repr {
            Repr::List => match self.config.chain_order {
                ChainOrder::InsertionOrder => Cursor::ListFwd { pos: 0 },
                ChainOrder::NewestFirst => Cursor::ListRev {
                    pos: self.values.len(),
                },
            },
            Repr::Hash { buckets, .. } => {
                let hash = self.hash_u32(key);
                let b = (hash as usize) % buckets.len();
                Cursor::Hash {
                    cur: buckets[b],
                    hash,
                }
            }
        };
        KeyIter {
            map: self,
            key,
            cursor,
        }
    }

    /// Iterate over `(slot, &value)` for every visible slot, in slot order
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            values: &self.values,
            hidden: &self.hidden,
            pos: 0,
        }
    }

    /// Remove the value at `index` in O(1).
    ///
    /// The last slot's value is moved into the freed slot (its chain links
    /// are re-pointed in place, keeping its chain position), so the removed
    /// index is recycled and all other indices stay stable except the moved
    /// last one.
    pub fn swap_remove(&mut self, index: usize) -> Result<V> {
        check_bounds(index, self.values.len())?;
        let last = self.values.len() - 1;
        let was_hidden = self.hidden.get(index).unwrap_or(false);
        let last_hidden = self.hidden.get(last).unwrap_or(false);
        if let Repr::Hash { buckets, links, .. } = &mut self.repr {
            if !was_hidden {
                unlink_slot(buckets, links, index as u16);
            }
            if index != last {
                if !last_hidden {
                    repoint_slot(buckets, links, last as u16, index as u16);
                }
                links[index] = links[last];
                if links[index].prev == last as u16 {
                    // single-node chain pointed at itself
                    links[index].prev = index as u16;
                }
            }
            links.pop();
        }
        let removed = self.values.swap_remove(index);
        if index != last {
            self.hidden
                .set(index, last_hidden)
                .expect("index is below the pre-removal length");
        }
        self.hidden.pop();
        if was_hidden {
            self.hidden_count -= 1;
        }
        Ok(removed)
    }

    /// Hide the slot at `index`: exclude it from key lookup and iteration
    /// while keeping its index and value in place.
    ///
    /// Hiding an already hidden slot is an invalid-state error.
    pub fn hide(&mut self, index: usize) -> Result<()> {
        check_bounds(index, self.values.len())?;
        if self.hidden.get(index).unwrap_or(false) {
            return Err(DensekitError::invalid_state(format!(
                "slot {} is already hidden",
                index
            )));
        }
        if let Repr::Hash { buckets, links, .. } = &mut self.repr {
            unlink_slot(buckets, links, index as u16);
        }
        self.hidden
            .set(index, true)
            .expect("index bounds checked above");
        self.hidden_count += 1;
        Ok(())
    }

    /// Restore a hidden slot to visibility.
    ///
    /// The slot re-links into the bucket its stored hash selects, at the
    /// chain end configured by [`ChainOrder`]. Unhiding a slot that is not
    /// hidden is an invalid-state error. Uniqueness is not re-validated: a
    /// duplicate hidden away before an equal-key insert resurfaces as a
    /// second entry for its key.
    pub fn unhide(&mut self, index: usize) -> Result<()> {
        check_bounds(index, self.values.len())?;
        if !self.hidden.get(index).unwrap_or(false) {
            return Err(DensekitError::invalid_state(format!(
                "slot {} is not hidden",
                index
            )));
        }
        let at_tail = self.at_tail();
        if let Repr::Hash { buckets, links, .. } = &mut self.repr {
            link_slot(buckets, links, index as u16, at_tail);
        }
        self.hidden
            .set(index, false)
            .expect("index bounds checked above");
        self.hidden_count -= 1;
        Ok(())
    }

    /// Resynchronize the index after mutating the value's key fields in
    /// place.
    ///
    /// Recomputes the hash; if it is unchanged nothing moves. In unique-keys
    /// mode the destination chain is validated first - on a duplicate-key
    /// error the entry keeps its old linkage and the caller owns the repair.
    /// A hidden slot only has its stored hash restamped, so a later
    /// [`unhide`](Self::unhide) links it into the correct bucket.
    pub fn refresh_key_at(&mut self, index: usize) -> Result<()> {
        check_bounds(index, self.values.len())?;
        let key = (self.key_of)(&self.values[index]);
        let is_hidden = self.hidden.get(index).unwrap_or(false);

        if matches!(self.repr, Repr::List) {
            // keys are re-extracted on every list scan, so only uniqueness
            // needs re-validation
            if self.config.unique_keys && !is_hidden {
                for slot in 0..self.values.len() {
                    if slot != index
                        && !self.hidden.get(slot).unwrap_or(false)
                        && (self.key_of)(&self.values[slot]) == key
                    {
                        return Err(DensekitError::duplicate_key(
                            "refreshed key collides with an existing entry",
                        ));
                    }
                }
            }
            return Ok(());
        }

        let new_hash = self.hash_u32(&key);
        if is_hidden {
            if let Repr::Hash { links, .. } = &mut self.repr {
                links[index].hash = new_hash;
            }
            return Ok(());
        }
        if self.config.unique_keys {
            if let Repr::Hash { buckets, links, .. } = &self.repr {
                let b = (new_hash as usize) % buckets.len();
                let mut cur = buckets[b];
                while cur != NIL {
                    let slot = cur as usize;
                    if slot != index
                        && links[slot].hash == new_hash
                        && (self.key_of)(&self.values[slot]) == key
                    {
                        return Err(DensekitError::duplicate_key(
                            "refreshed key collides with an existing entry",
                        ));
                    }
                    cur = links[slot].next;
                }
            }
        }
        let at_tail = self.at_tail();
        let Repr::Hash { buckets, links, .. } = &mut self.repr else {
            unreachable!("list representation returned above");
        };
        if links[index].hash == new_hash {
            return Ok(());
        }
        unlink_slot(buckets, links, index as u16);
        links[index].hash = new_hash;
        link_slot(buckets, links, index as u16, at_tail);
        Ok(())
    }

    /// Remove every slot, keeping the representation and bucket allocation
    pub fn clear(&mut self) {
        self.values.clear();
        self.hidden.clear();
        self.hidden_count = 0;
        if let Repr::Hash { buckets, links, .. } = &mut self.repr {
            buckets.iter_mut().for_each(|b| *b = NIL);
            links.clear();
        }
    }

    /// Walk every bucket chain checking link reciprocity, hash/bucket
    /// agreement, and hidden-slot exclusion. Panics on the first
    /// inconsistency; compiled to a no-op outside debug builds.
    pub fn validate(&self) {
        #[cfg(debug_assertions)]
        self.validate_impl();
    }

    #[cfg(debug_assertions)]
    fn validate_impl(&self) {
        assert_eq!(self.hidden.len(), self.values.len());
        let counted = (0..self.values.len())
            .filter(|&i| self.hidden.get(i).unwrap())
            .count();
        assert_eq!(counted, self.hidden_count, "hidden count drifted");
        if let Repr::Hash { buckets, links, .. } = &self.repr {
            assert_eq!(links.len(), self.values.len());
            let mut seen = vec![false; links.len()];
            for (b, &head) in buckets.iter().enumerate() {
                let mut prev_slot = NIL;
                let mut cur = head;
                while cur != NIL {
                    let slot = cur as usize;
                    assert!(!seen[slot], "slot {} linked twice", slot);
                    seen[slot] = true;
                    assert!(
                        !self.hidden.get(slot).unwrap(),
                        "hidden slot {} is linked",
                        slot
                    );
                    assert_eq!(
                        (links[slot].hash as usize) % buckets.len(),
                        b,
                        "slot {} linked into the wrong bucket",
                        slot
                    );
                    if prev_slot != NIL {
                        assert_eq!(links[slot].prev, prev_slot, "prev mismatch at slot {}", slot);
                    }
                    prev_slot = cur;
                    cur = links[slot].next;
                }
                if head != NIL {
                    assert_eq!(
                        links[head as usize].prev,
                        prev_slot,
                        "head.prev is not the tail in bucket {}",
                        b
                    );
                }
            }
            for (slot, &linked) in seen.iter().enumerate() {
                assert_eq!(
                    linked,
                    !self.hidden.get(slot).unwrap(),
                    "slot {} linkage does not match visibility",
                    slot
                );
            }
        }
    }
}

impl<K, V, E, S> fmt::Debug for HybridMultiMap<K, V, E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridMultiMap")
            .field("len", &self.values.len())
            .field("hidden", &self.hidden_count)
            .field(
                "repr",
                &match self.repr {
                    Repr::List => "list",
                    Repr::Hash { .. } => "hash",
                },
            )
            .finish()
    }
}

enum Cursor {
    ListFwd { pos: usize },
    ListRev { pos: usize },
    Hash { cur: u16, hash: u32 },
}

/// Iterator over the visible entries sharing a key, in chain order
pub struct KeyIter<'a, K, V, E, S> {
    map: &'a HybridMultiMap<K, V, E, S>,
    key: &'a K,
    cursor: Cursor,
}

impl<'a, K, V, E, S> Iterator for KeyIter<'a, K, V, E, S>
where
    K: Hash + Eq,
    E: Fn(&V) -> K,
    S: BuildHasher,
{
    type Item = (usize, &'a V);

    fn next(&mut self) -> Option<(usize, &'a V)> {
        match &mut self.cursor {
            Cursor::ListFwd { pos } => {
                while *pos < self.map.values.len() {
                    let slot = *pos;
                    *pos += 1;
                    if self.map.hidden.get(slot).unwrap_or(false) {
                        continue;
                    }
                    if (self.map.key_of)(&self.map.values[slot]) == *self.key {
                        return Some((slot, &self.map.values[slot]));
                    }
                }
                None
            }
            Cursor::ListRev { pos } => {
                while *pos > 0 {
                    *pos -= 1;
                    let slot = *pos;
                    if self.map.hidden.get(slot).unwrap_or(false) {
                        continue;
                    }
                    if (self.map.key_of)(&self.map.values[slot]) == *self.key {
                        return Some((slot, &self.map.values[slot]));
                    }
                }
                None
            }
            Cursor::Hash { cur, hash } => {
                let links = match &self.map.repr {
                    Repr::Hash { links, .. } => links,
                    Repr::List => return None,
                };
                while *cur != NIL {
                    let slot = *cur as usize;
                    *cur = links[slot].next;
                    if links[slot].hash == *hash
                        && (self.map.key_of)(&self.map.values[slot]) == *self.key
                    {
                        return Some((slot, &self.map.values[slot]));
                    }
                }
                None
            }
        }
    }
}

/// Iterator over `(slot, &value)` for every visible slot
pub struct Iter<'a, V> {
    values: &'a [V],
    hidden: &'a BitVector,
    pos: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (usize, &'a V);

    fn next(&mut self) -> Option<(usize, &'a V)> {
        while self.pos < self.values.len() {
            let slot = self.pos;
            self.pos += 1;
            if !self.hidden.get(slot).unwrap_or(false) {
                return Some((slot, &self.values[slot]));
            }
        }
        None
    }
}
