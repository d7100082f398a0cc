use hashbrown::HashMap;

use crate::error::{NetworkError, NetworkResult};
use crate::topology::NodeId;

/// Maps unique node identifiers to arena handles.
#[derive(Debug, Clone, Default)]
pub struct IdentifierRegistry {
    by_name: HashMap<String, NodeId>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` under `identifier`.
    ///
    /// Fails without touching the registry if the identifier is missing,
    /// empty, or already taken.
    pub fn register(&mut self, identifier: Option<&str>, node: NodeId) -> NetworkResult<()> {
        let name = match identifier {
            Some(name) if !name.is_empty() => name,
            _ => return Err(NetworkError::MissingIdentifier(node)),
        };
        if self.by_name.contains_key(name) {
            return Err(NetworkError::DuplicateIdentifier(name.to_string()));
        }
        self.by_name.insert(name.to_string(), node);
        Ok(())
    }

    pub fn find(&self, identifier: Option<&str>) -> Option<NodeId> {
        self.by_name.get(identifier?).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.by_name.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_leaves_registry_unchanged() {
        let mut reg = IdentifierRegistry::new();
        reg.register(Some("light"), 3).unwrap();

        let err = reg.register(Some("light"), 9).unwrap_err();
        assert!(matches!(err, NetworkError::DuplicateIdentifier(ref n) if n == "light"));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.find(Some("light")), Some(3));
    }

    #[test]
    fn unidentified_nodes_are_rejected() {
        let mut reg = IdentifierRegistry::new();
        assert!(matches!(
            reg.register(None, 1),
            Err(NetworkError::MissingIdentifier(1))
        ));
        assert!(reg.register(Some(""), 1).is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn lookups_of_unknown_or_nil_return_none() {
        let mut reg = IdentifierRegistry::new();
        reg.register(Some("tone"), 0).unwrap();
        assert_eq!(reg.find(Some("lever")), None);
        assert_eq!(reg.find(None), None);
        assert_eq!(reg.find(Some("tone")), Some(0));
    }
}
