//! The two-pass well-formedness algorithm every generated tree is checked
//! against: a reachability pass that walks owning edges and assigns each
//! owned node a sequence number (failing on a node owned twice), followed
//! by a completeness pass that walks the same edges again to confirm
//! required fields are populated and every link resolves inside the set the
//! first pass found.

use std::collections::HashMap;

use crate::error::NotWellFormed;
use crate::node::AnyNode;

/// Identity of an owned node, derived from the address of the `Rc` that
/// owns it. Two different owning edges pointing at the same address is
/// exactly the "the same node is owned twice" violation this algorithm
/// exists to catch.
pub type NodeIdentity = usize;

/// Sequence numbers assigned to every node reached during [`find_reachable`],
/// in depth-first visitation order. Built during the reachability pass and
/// consulted (read-only) during the completeness pass to resolve links.
#[derive(Debug, Default)]
pub struct PointerMap {
    seen: HashMap<NodeIdentity, u64>,
    next: u64,
}

impl PointerMap {
    fn new() -> Self {
        PointerMap::default()
    }

    /// A map whose numbering reserves sequence number 0 for a tree's root
    /// (which isn't owned by any edge, so [`PointerMap::mark`] never assigns
    /// it one on its own) — used by `treeforge_runtime::ids::build_serialize_map`
    /// so every node, root included, has a stable `@i`.
    pub fn for_root() -> Self {
        PointerMap { seen: HashMap::new(), next: 1 }
    }

    /// Record that `ptr` was reached, assigning it the next sequence
    /// number. Returns [`NotWellFormed::DuplicateNode`] if `ptr` was already
    /// recorded.
    pub fn mark(&mut self, ptr: NodeIdentity) -> Result<(), NotWellFormed> {
        if self.seen.contains_key(&ptr) {
            return Err(NotWellFormed::DuplicateNode);
        }
        self.seen.insert(ptr, self.next);
        self.next += 1;
        Ok(())
    }

    /// Whether `ptr` was reached during the reachability pass.
    pub fn contains(&self, ptr: NodeIdentity) -> bool {
        self.seen.contains_key(&ptr)
    }

    /// The sequence number `ptr` was assigned, if reached.
    pub fn sequence(&self, ptr: NodeIdentity) -> Option<u64> {
        self.seen.get(&ptr).copied()
    }

    /// How many distinct nodes were reached.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether no nodes were reached (only possible for an edge-less root).
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Pass 1: walk every owning edge reachable from `root`, failing as soon as
/// the same owned node is reached through two different edges.
pub fn find_reachable(root: &dyn AnyNode) -> Result<PointerMap, NotWellFormed> {
    let mut map = PointerMap::new();
    root.find_reachable(&mut map)?;
    Ok(map)
}

/// Pass 2: walk the owning edges again, confirming required fields are
/// populated and that every `Link`/`OptLink` target is present in `map`.
pub fn check_complete(root: &dyn AnyNode, map: &PointerMap) -> Result<(), NotWellFormed> {
    root.check_complete(map)
}

/// Run both passes. This is what generated `NodeType::check_well_formed`
/// delegates to.
pub fn check_well_formed(root: &dyn AnyNode) -> Result<(), NotWellFormed> {
    let map = find_reachable(root)?;
    check_complete(root, &map)
}

/// [`check_well_formed`], discarding the error — for call sites that want a
/// boolean rather than a diagnostic.
pub fn is_well_formed(root: &dyn AnyNode) -> bool {
    check_well_formed(root).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_map_assigns_sequential_numbers() {
        let mut map = PointerMap::new();
        map.mark(0x1000).unwrap();
        map.mark(0x2000).unwrap();
        assert_eq!(map.sequence(0x1000), Some(0));
        assert_eq!(map.sequence(0x2000), Some(1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn pointer_map_rejects_duplicate_address() {
        let mut map = PointerMap::new();
        map.mark(0x1000).unwrap();
        let err = map.mark(0x1000).unwrap_err();
        assert!(matches!(err, NotWellFormed::DuplicateNode));
    }
}
