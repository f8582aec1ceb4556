//! Sequence-number bookkeeping shared by every generated `serialize`/
//! `deserialize` pair (§4.4, §6): the wire format's `@i`/`@l` values are
//! exactly the reachability pass's sequence numbers, with the root
//! reserved as 0.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::NotWellFormed;
use crate::node::AnyNode;
use crate::wellformed::PointerMap;

/// The `@i` a tree's root is always serialized under. Nothing else can
/// collide with it: [`build_serialize_map`] seeds [`PointerMap::for_root`]
/// before the reachability walk assigns any other node a number, so real
/// nodes start at 1.
pub const ROOT_SEQUENCE: u64 = 0;

/// The identity [`crate::wellformed::PointerMap`] uses for the `Rc` behind
/// an owning edge field — the same value the edge types compute internally,
/// exposed here so a generated `serialize` body can resolve a child's (or a
/// link target's) sequence number from the field's own `.rc()`/`.iter()`
/// accessor without reaching into `crate::edge`'s private helpers.
pub fn identity_of<T>(rc: &Rc<RefCell<T>>) -> usize {
    Rc::as_ptr(rc) as usize
}

/// Runs the reachability pass with the root pre-seeded at [`ROOT_SEQUENCE`],
/// producing the map a `serialize` walk resolves every node's `@i` and every
/// link's `@l` against.
pub fn build_serialize_map(root: &dyn AnyNode) -> Result<PointerMap, NotWellFormed> {
    let mut map = PointerMap::for_root();
    root.find_reachable(&mut map)?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationMap;
    use crate::error::NotWellFormed as Nwf;
    use std::cell::RefCell as Rc_;

    struct Leaf {
        annotations: AnnotationMap,
    }

    impl AnyNode for Leaf {
        fn node_type_name(&self) -> &'static str {
            "leaf"
        }
        fn annotations(&self) -> crate::annotation::AnnotationsRef<'_> {
            crate::annotation::AnnotationsRef::Direct(&self.annotations)
        }
        fn annotations_mut(&mut self) -> crate::annotation::AnnotationsMut<'_> {
            crate::annotation::AnnotationsMut::Direct(&mut self.annotations)
        }
        fn find_reachable(&self, _map: &mut PointerMap) -> Result<(), Nwf> {
            Ok(())
        }
        fn check_complete(&self, _map: &PointerMap) -> Result<(), Nwf> {
            Ok(())
        }
    }

    #[test]
    fn root_with_no_owned_children_only_has_the_reserved_sequence() {
        let root = Leaf { annotations: AnnotationMap::new() };
        let map = build_serialize_map(&root).unwrap();
        assert!(map.is_empty());
        assert_eq!(ROOT_SEQUENCE, 0);
    }

    #[test]
    fn identity_of_matches_across_calls() {
        let rc = Rc::new(Rc_::new(Leaf { annotations: AnnotationMap::new() }));
        assert_eq!(identity_of(&rc), identity_of(&rc));
    }
}
