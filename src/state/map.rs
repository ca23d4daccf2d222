//! Persistent map state.
//!
//! `MapState` uses `im::HashMap`, whose clones share structure, so taking a
//! snapshot costs O(1) however large the map grows. Typical uses are symbol
//! tables and scopes built while parsing.

use std::hash::Hash;

use im::HashMap;

use super::State;
use crate::error::StateError;

#[derive(Debug, Clone, Default)]
pub struct MapState<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    map: HashMap<K, V>,
}

impl<K, V> MapState<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    /// Binds `key`, returning the value it was bound to before.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.map.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.map.remove(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.map.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for MapState<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}

// The whole map is its own delta: replaying it is a pointer copy.
impl<K, V> State for MapState<K, V>
where
    K: Hash + Eq + Clone + 'static,
    V: Clone + PartialEq + 'static,
{
    type Snapshot = HashMap<K, V>;
    type Delta = HashMap<K, V>;

    fn snapshot(&self) -> HashMap<K, V> {
        self.map.clone()
    }

    fn restore(&mut self, snapshot: &HashMap<K, V>) {
        self.map = snapshot.clone();
    }

    fn diff(&self, _snapshot: &HashMap<K, V>) -> Result<HashMap<K, V>, StateError> {
        Ok(self.map.clone())
    }

    fn merge(&mut self, delta: &HashMap<K, V>) {
        self.map = delta.clone();
    }

    fn equiv(&self, _pos: usize, snapshot: &HashMap<K, V>) -> bool {
        self.map.ptr_eq(snapshot) || self.map == *snapshot
    }
}
