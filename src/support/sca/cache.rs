//! Caller-owned warm-start cache.
//!
//! The cache replaces any notion of a process-wide "last solution": it is
//! plain data owned by whoever runs repeated solves, keyed by the model
//! shape and a hash of the substituted inputs.

use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

use crate::support::gp::{DesignPoint, Var};

/// Identifies a solved configuration: grid shape plus input hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub n_hot: usize,
    pub n_cold: usize,
    pub params_hash: u64,
}

impl CacheKey {
    #[must_use]
    pub fn new(n_hot: usize, n_cold: usize, substitutions: &BTreeMap<Var, f64>) -> Self {
        Self {
            n_hot,
            n_cold,
            params_hash: params_hash(substitutions),
        }
    }
}

/// A stable hash of a substitution set.
///
/// The map iterates in variable order, so the hash is independent of how the
/// substitutions were assembled.
#[must_use]
pub fn params_hash(substitutions: &BTreeMap<Var, f64>) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for (var, value) in substitutions {
        var.index().hash(&mut hasher);
        value.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

/// Stores converged points for reuse as warm starts.
#[derive(Debug, Default)]
pub struct WarmStartCache {
    entries: HashMap<CacheKey, DesignPoint>,
}

impl WarmStartCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&DesignPoint> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: CacheKey, point: DesignPoint) {
        self.entries.insert(key, point);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::support::gp::VarTable;

    use super::*;

    #[test]
    fn keys_distinguish_shape_and_inputs() {
        let mut table = VarTable::new();
        let t_in = table.var("T_in", "K", 300.0, (200.0, 700.0));

        let a = BTreeMap::from([(t_in, 300.0)]);
        let b = BTreeMap::from([(t_in, 310.0)]);

        assert_eq!(CacheKey::new(3, 3, &a), CacheKey::new(3, 3, &a));
        assert_ne!(CacheKey::new(3, 3, &a), CacheKey::new(3, 3, &b));
        assert_ne!(CacheKey::new(3, 3, &a), CacheKey::new(6, 3, &a));
    }

    #[test]
    fn stores_and_recalls_points() {
        let mut table = VarTable::new();
        let t_in = table.var("T_in", "K", 300.0, (200.0, 700.0));
        let subs = BTreeMap::from([(t_in, 300.0)]);

        let mut cache = WarmStartCache::new();
        let key = CacheKey::new(3, 3, &subs);
        assert!(cache.get(&key).is_none());

        cache.insert(key, table.initial_point());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key).is_some());
    }
}
