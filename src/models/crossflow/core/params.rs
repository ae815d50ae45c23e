use std::collections::BTreeMap;

use crate::support::gp::Var;

/// The named design-parameter surface of a layer.
///
/// Maps stable, human-readable names (channel inlet conditions, envelope
/// dimensions, fin count, property overrides) to the internal variable
/// handles they substitute. Only names registered here may be overridden
/// from the outside, so a caller can never accidentally pin a decision
/// variable.
#[derive(Debug, Default)]
pub struct ParameterMap {
    by_name: BTreeMap<String, Var>,
}

impl ParameterMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, var: Var) {
        let name = name.into();
        let previous = self.by_name.insert(name.clone(), var);
        assert!(previous.is_none(), "parameter `{name}` registered twice");
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Var> {
        self.by_name.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::support::gp::VarTable;

    use super::*;

    #[test]
    fn registers_and_resolves_names() {
        let mut table = VarTable::new();
        let v = table.var("cold.v_in", "m/s", 20.0, (1e-3, 100.0));

        let mut params = ParameterMap::new();
        params.register("cold.v_in", v);

        assert_eq!(params.get("cold.v_in"), Some(v));
        assert_eq!(params.get("cold.T_in"), None);
        assert_eq!(params.len(), 1);
    }
}
