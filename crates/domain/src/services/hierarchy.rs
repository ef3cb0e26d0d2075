//! Cycle checks for self-referencing trees (categories, permissions).

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Returns true if making `new_parent` the parent of `node` would close a cycle.
///
/// `parent_of` resolves the current parent of any node. The walk stops on a
/// repeated node so a corrupt tree cannot loop forever.
pub fn would_create_cycle<F>(node: Uuid, new_parent: Uuid, parent_of: F) -> bool
where
    F: Fn(Uuid) -> Option<Uuid>,
{
    let mut visited = HashSet::new();
    let mut current = Some(new_parent);

    while let Some(id) = current {
        if id == node {
            return true;
        }
        if !visited.insert(id) {
            return true;
        }
        current = parent_of(id);
    }

    false
}

/// Map-backed variant of [`would_create_cycle`] that returns `InvalidParent`.
pub fn check_parent(
    node: Uuid,
    new_parent: Option<Uuid>,
    parents: &HashMap<Uuid, Option<Uuid>>,
) -> DomainResult<()> {
    let Some(new_parent) = new_parent else {
        return Ok(());
    };

    if would_create_cycle(node, new_parent, |id| parents.get(&id).copied().flatten()) {
        return Err(DomainError::InvalidParent(
            "Parent is the node itself or one of its descendants".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Uuid, Uuid, Uuid, HashMap<Uuid, Option<Uuid>>) {
        let root = Uuid::new_v4();
        let child = Uuid::new_v4();
        let grandchild = Uuid::new_v4();
        let parents = HashMap::from([
            (root, None),
            (child, Some(root)),
            (grandchild, Some(child)),
        ]);
        (root, child, grandchild, parents)
    }

    #[test]
    fn test_self_parent_is_cycle() {
        let (root, _, _, parents) = chain();
        assert!(check_parent(root, Some(root), &parents).is_err());
    }

    #[test]
    fn test_descendant_as_parent_is_cycle() {
        let (root, _, grandchild, parents) = chain();
        assert!(matches!(
            check_parent(root, Some(grandchild), &parents),
            Err(DomainError::InvalidParent(_))
        ));
    }

    #[test]
    fn test_reparent_to_unrelated_node() {
        let (_, child, grandchild, mut parents) = chain();
        let other = Uuid::new_v4();
        parents.insert(other, None);
        assert!(check_parent(grandchild, Some(other), &parents).is_ok());
        assert!(check_parent(child, None, &parents).is_ok());
    }

    #[test]
    fn test_corrupt_loop_terminates() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let parents = HashMap::from([(a, Some(b)), (b, Some(a))]);
        assert!(would_create_cycle(Uuid::new_v4(), a, |id| parents
            .get(&id)
            .copied()
            .flatten()));
    }
}
