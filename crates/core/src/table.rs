//! Open-addressed Robin-Hood hash table keyed by [`Value`] (C4).
//!
//! Capacities are always a power of two. Resize fires once
//! `count > capacity * 0.8`. Deletion is back-shift, bounded by the
//! table's tracked `max_psl`.

use crate::value::{self, Value};
use std::fmt;

const INITIAL_CAPACITY: usize = 8;
const EXPANSION_RATE: usize = 2;
const EXPANSION_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone)]
struct Entry {
    key: Value,
    value: Value,
    psl: u32,
}

#[derive(Debug, Clone)]
pub struct Table {
    slots: Vec<Option<Entry>>,
    count: usize,
    min_psl: u32,
    max_psl: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    NullKey,
    BooleanKey,
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableError::NullKey => write!(f, "null is not a legal table key"),
            TableError::BooleanKey => write!(f, "boolean is not a legal table key"),
        }
    }
}

impl std::error::Error for TableError {}

fn check_key(key: &Value) -> Result<(), TableError> {
    match key {
        Value::Null => Err(TableError::NullKey),
        Value::Boolean(_) => Err(TableError::BooleanKey),
        _ => Ok(()),
    }
}

impl Default for Table {
    fn default() -> Self {
        Table::new()
    }
}

impl Table {
    pub fn new() -> Self {
        Table::with_capacity(INITIAL_CAPACITY)
    }

    /// Construct a table whose capacity is the next power of two `>= hint`.
    pub fn with_capacity(hint: usize) -> Self {
        let capacity = hint.max(1).next_power_of_two();
        Table {
            slots: vec![None; capacity],
            count: 0,
            min_psl: 0,
            max_psl: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn max_psl(&self) -> u32 {
        self.max_psl
    }

    fn home(&self, key: &Value) -> usize {
        (value::hash_value(key) as usize) % self.capacity()
    }

    pub fn insert(&mut self, key: Value, val: Value) -> Result<(), TableError> {
        check_key(&key)?;
        if (self.count + 1) as f64 > self.capacity() as f64 * EXPANSION_THRESHOLD {
            self.resize(self.capacity() * EXPANSION_RATE);
        }
        self.insert_unchecked(key, val);
        Ok(())
    }

    fn insert_unchecked(&mut self, key: Value, val: Value) {
        let mut entry = Entry { key, value: val, psl: 0 };
        let mut idx = self.home(&entry.key);
        let capacity = self.capacity();

        loop {
            match &mut self.slots[idx] {
                None => {
                    let psl = entry.psl;
                    self.slots[idx] = Some(entry);
                    self.count += 1;
                    self.max_psl = self.max_psl.max(psl);
                    return;
                }
                Some(existing) => {
                    if value::values_equal(&existing.key, &entry.key) {
                        existing.value = entry.value;
                        return;
                    }
                    if existing.psl < entry.psl {
                        std::mem::swap(existing, &mut entry);
                    }
                }
            }
            entry.psl += 1;
            self.max_psl = self.max_psl.max(entry.psl);
            idx = (idx + 1) % capacity;
        }
    }

    /// Returns `Value::Null` when the key is absent (the "null sentinel"
    /// lookup contract).
    pub fn lookup(&self, key: &Value) -> Value {
        self.find_slot(key).map(|i| self.slots[i].as_ref().unwrap().value.clone()).unwrap_or(Value::Null)
    }

    pub fn contains(&self, key: &Value) -> bool {
        self.find_slot(key).is_some()
    }

    /// Return the exact key object stored for an equal-valued lookup key.
    /// Distinct from `lookup`/`contains` because a `Name` string's
    /// metadata (declared type, constant flag) lives only on the
    /// originally-inserted key, not on the lookup key used to find it.
    pub fn stored_key(&self, key: &Value) -> Option<&Value> {
        self.find_slot(key).map(|i| &self.slots[i].as_ref().unwrap().key)
    }

    fn find_slot(&self, key: &Value) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        let capacity = self.capacity();
        let mut idx = self.home(key);
        let mut dist: u32 = 0;
        loop {
            match &self.slots[idx] {
                None => return None,
                Some(entry) => {
                    if value::values_equal(&entry.key, key) {
                        return Some(idx);
                    }
                    if dist > entry.psl {
                        // Robin-Hood invariant: entries are ordered by PSL
                        // along a probe run, so once ours would exceed the
                        // resident's we know the key cannot be present.
                        return None;
                    }
                }
            }
            dist += 1;
            idx = (idx + 1) % capacity;
            if dist as usize > capacity {
                return None;
            }
        }
    }

    /// Back-shift deletion, bounded by `max_psl`.
    pub fn remove(&mut self, key: &Value) -> bool {
        let Some(mut idx) = self.find_slot(key) else {
            return false;
        };
        self.slots[idx] = None;
        self.count -= 1;

        let capacity = self.capacity();
        loop {
            let next = (idx + 1) % capacity;
            let should_shift = matches!(&self.slots[next], Some(e) if e.psl > 0);
            if !should_shift {
                break;
            }
            let mut moved = self.slots[next].take().unwrap();
            moved.psl -= 1;
            self.slots[idx] = Some(moved);
            idx = next;
        }
        self.recompute_psl_bounds();
        true
    }

    fn recompute_psl_bounds(&mut self) {
        let mut max = 0;
        let mut min = u32::MAX;
        for slot in self.slots.iter().flatten() {
            max = max.max(slot.psl);
            min = min.min(slot.psl);
        }
        self.max_psl = max;
        self.min_psl = if self.count == 0 { 0 } else { min };
    }

    fn resize(&mut self, new_capacity: usize) {
        let new_capacity = new_capacity.max(1).next_power_of_two();
        let old_slots = std::mem::replace(&mut self.slots, vec![None; new_capacity]);
        self.count = 0;
        self.max_psl = 0;
        self.min_psl = 0;
        for entry in old_slots.into_iter().flatten() {
            self.insert_unchecked(entry.key, entry.value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.slots.iter().flatten().map(|e| (&e.key, &e.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_null_and_boolean_keys() {
        let mut t = Table::new();
        assert_eq!(t.insert(Value::Null, Value::Integer(1)), Err(TableError::NullKey));
        assert_eq!(
            t.insert(Value::Boolean(true), Value::Integer(1)),
            Err(TableError::BooleanKey)
        );
    }

    #[test]
    fn insert_lookup_remove_roundtrip() {
        let mut t = Table::new();
        for i in 0..50 {
            t.insert(Value::Integer(i), Value::Integer(i * 2)).unwrap();
        }
        for i in 0..50 {
            assert_eq!(t.lookup(&Value::Integer(i)), Value::Integer(i * 2));
        }
        assert!(t.remove(&Value::Integer(25)));
        assert_eq!(t.lookup(&Value::Integer(25)), Value::Null);
        assert_eq!(t.len(), 49);
    }

    #[test]
    fn capacity_is_always_power_of_two() {
        let t = Table::with_capacity(7);
        assert_eq!(t.capacity(), 8);
        let t = Table::with_capacity(100);
        assert_eq!(t.capacity(), 128);
    }

    #[test]
    fn resizes_past_load_factor() {
        let mut t = Table::new();
        for i in 0..100 {
            t.insert(Value::Integer(i), Value::Null).unwrap();
        }
        assert!((t.len() as f64) <= t.capacity() as f64 * EXPANSION_THRESHOLD + 1.0);
    }

    #[test]
    fn max_psl_matches_actual_scan() {
        let mut t = Table::new();
        for i in 0..6 {
            t.insert(Value::Integer(i), Value::Null).unwrap();
        }
        let mut actual_max = 0u32;
        for slot in t.slots.iter().flatten() {
            actual_max = actual_max.max(slot.psl);
        }
        assert_eq!(actual_max, t.max_psl());
    }

    #[test]
    fn insert_same_key_updates_value() {
        let mut t = Table::new();
        t.insert(Value::Integer(1), Value::Integer(1)).unwrap();
        t.insert(Value::Integer(1), Value::Integer(2)).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.lookup(&Value::Integer(1)), Value::Integer(2));
    }

    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Insert(i32),
        Remove(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0i32..64).prop_map(Op::Insert),
            (0i32..64).prop_map(Op::Remove),
        ]
    }

    proptest! {
        // §8: after any sequence of insert/remove operations, `max_psl`
        // matches the highest PSL actually stored, and every present key
        // is still reachable by `lookup`.
        #[test]
        fn max_psl_tracks_actual_scan_under_arbitrary_traffic(ops in prop::collection::vec(op_strategy(), 0..200)) {
            let mut t = Table::new();
            let mut model = std::collections::HashMap::new();
            for op in ops {
                match op {
                    Op::Insert(k) => {
                        t.insert(Value::Integer(k), Value::Integer(k)).unwrap();
                        model.insert(k, k);
                    }
                    Op::Remove(k) => {
                        t.remove(&Value::Integer(k));
                        model.remove(&k);
                    }
                }
            }

            let mut actual_max = 0u32;
            for slot in t.slots.iter().flatten() {
                actual_max = actual_max.max(slot.psl);
            }
            prop_assert_eq!(actual_max, t.max_psl());
            prop_assert_eq!(t.len(), model.len());
            for (k, v) in &model {
                prop_assert_eq!(t.lookup(&Value::Integer(*k)), Value::Integer(*v));
            }
        }
    }
}
