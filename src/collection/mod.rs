//! Shared collection aliases and the ordered sorted-map container.

pub mod sorted_map;

pub use sorted_map::SortedMap;

/// An `IndexMap` using the faster, non-DoS-resistant FNV hasher, for
/// in-process maps keyed by small identifiers (order ids, symbols) where
/// HashDoS resistance is not a concern.
pub type FnvIndexMap<K, V> = indexmap::IndexMap<K, V, fnv::FnvBuildHasher>;

/// An `IndexSet` counterpart to [`FnvIndexMap`].
pub type FnvIndexSet<T> = indexmap::IndexSet<T, fnv::FnvBuildHasher>;
