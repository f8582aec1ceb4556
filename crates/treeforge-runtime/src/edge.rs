//! The six edge kinds a schema field can be declared with.
//!
//! `Exactly`, `Maybe`, `List`, `NonEmptyList` own their targets (`Rc<RefCell<T>>`);
//! `Link`, `OptLink` merely reference a node owned elsewhere in the same
//! tree (`Weak<RefCell<T>>`). Ownership is single-threaded: nodes are
//! neither internally synchronized nor designed for concurrent mutation, so
//! `Rc`/`RefCell` is used throughout rather than `Arc`/`Mutex`.
//!
//! Every edge kind implements [`Edge`], the seam the well-formedness
//! algorithm drives: [`Edge::find_reachable`] marks (and recurses into)
//! owned targets, [`Edge::check_complete`] confirms a required edge is
//! populated and resolves link targets against the reachability pass's map.
//!
//! The owning kinds also expose a `peek`/`peek_iter` accessor alongside the
//! `RefCell`-tracked `get`: generated `AnyNode::fields()` implementations
//! need a `&dyn AnyNode` tied to `&self`'s lifetime, not to a temporary
//! `Ref` guard that would be dropped before the function returns. `peek`
//! reads through the `Rc`'s pointer without registering a borrow, which is
//! sound only under this module's single-mutator invariant: a tree is never
//! read (dumped, visited, diffed, serialized) while another owner is
//! concurrently mutating it.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use crate::error::NotWellFormed;
use crate::node::AnyNode;
use crate::wellformed::PointerMap;

/// Shared well-formedness hooks implemented by every edge kind.
pub trait Edge {
    /// Mark (and, for owning edges, recurse into) this edge's target(s).
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed>;

    /// Confirm this edge is populated if required, and that any link
    /// target resolves inside `map`. `node_kind`/`field` name the owning
    /// `NodeType` and field, for error context.
    fn check_complete(
        &self,
        map: &PointerMap,
        node_kind: &'static str,
        field: &'static str,
    ) -> Result<(), NotWellFormed>;

    /// Convenience check of this edge alone, against a freshly built map.
    /// The two-pass algorithm over a whole tree should use
    /// [`crate::wellformed::check_well_formed`] instead; this exists for
    /// ad hoc single-edge checks (e.g. in tests).
    fn is_well_formed_edge(&self) -> bool {
        let mut map = PointerMap::default();
        self.find_reachable(&mut map).is_ok() && self.check_complete(&map, "<edge>", "<field>").is_ok()
    }
}

fn rc_identity<T>(rc: &Rc<RefCell<T>>) -> usize {
    Rc::as_ptr(rc) as usize
}

/// A required, owned edge: exactly one target, always present.
pub struct Exactly<T>(Rc<RefCell<T>>);

impl<T> Exactly<T> {
    /// Wrap `value` as the edge's target.
    pub fn new(value: T) -> Self {
        Exactly(Rc::new(RefCell::new(value)))
    }

    /// Borrow the target.
    pub fn get(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutably borrow the target.
    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Wrap an already-owned handle — e.g. a generated `copy()` sharing a
    /// child with its source instead of cloning it.
    pub fn from_rc(rc: Rc<RefCell<T>>) -> Self {
        Exactly(rc)
    }

    /// The underlying owning handle, e.g. to hand a `Link` a target.
    pub fn rc(&self) -> &Rc<RefCell<T>> {
        &self.0
    }

    /// Borrow the target without a tracked `Ref` guard — see the module
    /// docs' single-mutator invariant.
    pub fn peek(&self) -> &T {
        unsafe { &*self.0.as_ptr() }
    }

    /// Replace the target, returning `self` for chaining.
    pub fn emplace(&mut self, value: T) -> &mut Self {
        self.0 = Rc::new(RefCell::new(value));
        self
    }
}

impl<T: AnyNode + 'static> Edge for Exactly<T> {
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        map.mark(rc_identity(&self.0))?;
        self.0.borrow().find_reachable(map)
    }

    fn check_complete(
        &self,
        map: &PointerMap,
        _node_kind: &'static str,
        _field: &'static str,
    ) -> Result<(), NotWellFormed> {
        self.0.borrow().check_complete(map)
    }
}

/// An optional, owned edge: at most one target.
pub struct Maybe<T>(Option<Rc<RefCell<T>>>);

impl<T> Maybe<T> {
    /// An unpopulated edge.
    pub fn none() -> Self {
        Maybe(None)
    }

    /// An edge populated with `value`.
    pub fn some(value: T) -> Self {
        Maybe(Some(Rc::new(RefCell::new(value))))
    }

    /// Borrow the target, if present.
    pub fn get(&self) -> Option<Ref<'_, T>> {
        self.0.as_ref().map(|rc| rc.borrow())
    }

    /// Mutably borrow the target, if present.
    pub fn get_mut(&self) -> Option<RefMut<'_, T>> {
        self.0.as_ref().map(|rc| rc.borrow_mut())
    }

    /// Whether a target is present.
    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }

    /// Whether no target is present.
    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Wrap an already-owned handle, if populated — e.g. a generated
    /// `copy()` sharing a child with its source instead of cloning it.
    pub fn from_rc(rc: Option<Rc<RefCell<T>>>) -> Self {
        Maybe(rc)
    }

    /// The underlying owning handle, if populated — e.g. to compute the
    /// target's reachability-pass identity, or to hand a `Link` a target.
    pub fn rc(&self) -> Option<&Rc<RefCell<T>>> {
        self.0.as_ref()
    }

    /// Borrow the target without a tracked `Ref` guard, if present — see
    /// the module docs' single-mutator invariant.
    pub fn peek(&self) -> Option<&T> {
        self.0.as_ref().map(|rc| unsafe { &*rc.as_ptr() })
    }

    /// Populate the edge with `value`, returning `self` for chaining.
    pub fn emplace(&mut self, value: T) -> &mut Self {
        self.0 = Some(Rc::new(RefCell::new(value)));
        self
    }

    /// Clear the edge, returning `self` for chaining.
    pub fn clear(&mut self) -> &mut Self {
        self.0 = None;
        self
    }
}

impl<T> Default for Maybe<T> {
    fn default() -> Self {
        Maybe::none()
    }
}

impl<T: AnyNode + 'static> Edge for Maybe<T> {
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        match &self.0 {
            Some(rc) => {
                map.mark(rc_identity(rc))?;
                rc.borrow().find_reachable(map)
            }
            None => Ok(()),
        }
    }

    fn check_complete(
        &self,
        map: &PointerMap,
        _node_kind: &'static str,
        _field: &'static str,
    ) -> Result<(), NotWellFormed> {
        match &self.0 {
            Some(rc) => rc.borrow().check_complete(map),
            None => Ok(()),
        }
    }
}

/// Shared storage behind [`List`] and [`NonEmptyList`]: an ordered sequence
/// of owned targets supporting negative indexing (`-1` = last element).
pub struct Multi<T> {
    items: Vec<Rc<RefCell<T>>>,
}

impl<T> Multi<T> {
    fn new() -> Self {
        Multi { items: Vec::new() }
    }

    fn resolve_index(&self, index: i64) -> Option<usize> {
        let len = self.items.len() as i64;
        let resolved = if index < 0 { len + index } else { index };
        if resolved < 0 || resolved >= len {
            None
        } else {
            Some(resolved as usize)
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The owning handle at `index` (negative indices count from the end).
    pub fn get(&self, index: i64) -> Option<&Rc<RefCell<T>>> {
        self.resolve_index(index).map(|i| &self.items[i])
    }

    /// Append `value`, returning `self` for chaining.
    pub fn push(&mut self, value: T) -> &mut Self {
        self.items.push(Rc::new(RefCell::new(value)));
        self
    }

    /// Append an already-owned handle (e.g. one shared with another edge
    /// via [`Exactly::rc`]).
    pub fn push_rc(&mut self, value: Rc<RefCell<T>>) -> &mut Self {
        self.items.push(value);
        self
    }

    /// Insert `value` at `index` (negative indices count from the end).
    pub fn insert(&mut self, index: i64, value: T) {
        let at = self.resolve_index(index).unwrap_or(self.items.len());
        self.items.insert(at, Rc::new(RefCell::new(value)));
    }

    /// Remove and return the element at `index`, if in bounds.
    pub fn remove(&mut self, index: i64) -> Option<Rc<RefCell<T>>> {
        self.resolve_index(index).map(|i| self.items.remove(i))
    }

    /// Iterate over the owning handles in order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<RefCell<T>>> {
        self.items.iter()
    }

    /// Borrow the target at `index` without a tracked `Ref` guard — see the
    /// module docs' single-mutator invariant.
    pub fn peek(&self, index: i64) -> Option<&T> {
        self.get(index).map(|rc| unsafe { &*rc.as_ptr() })
    }

    /// Iterate over the targets without tracked `Ref` guards — see the
    /// module docs' single-mutator invariant.
    pub fn peek_iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(|rc| unsafe { &*rc.as_ptr() })
    }
}

impl<T> Default for Multi<T> {
    fn default() -> Self {
        Multi::new()
    }
}

fn multi_find_reachable<T: AnyNode + 'static>(
    multi: &Multi<T>,
    map: &mut PointerMap,
) -> Result<(), NotWellFormed> {
    for rc in multi.iter() {
        map.mark(rc_identity(rc))?;
        rc.borrow().find_reachable(map)?;
    }
    Ok(())
}

fn multi_check_complete<T: AnyNode + 'static>(
    multi: &Multi<T>,
    map: &PointerMap,
) -> Result<(), NotWellFormed> {
    for rc in multi.iter() {
        rc.borrow().check_complete(map)?;
    }
    Ok(())
}

/// A possibly-empty, owned, ordered sequence of targets.
pub struct List<T>(Multi<T>);

impl<T> List<T> {
    /// An empty list.
    pub fn new() -> Self {
        List(Multi::new())
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        List::new()
    }
}

impl<T> std::ops::Deref for List<T> {
    type Target = Multi<T>;
    fn deref(&self) -> &Multi<T> {
        &self.0
    }
}

impl<T> std::ops::DerefMut for List<T> {
    fn deref_mut(&mut self) -> &mut Multi<T> {
        &mut self.0
    }
}

impl<T: AnyNode + 'static> Edge for List<T> {
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        multi_find_reachable(&self.0, map)
    }

    fn check_complete(
        &self,
        map: &PointerMap,
        _node_kind: &'static str,
        _field: &'static str,
    ) -> Result<(), NotWellFormed> {
        multi_check_complete(&self.0, map)
    }
}

/// A required, owned, ordered sequence with at least one target.
///
/// Non-emptiness is validated (not type-enforced): `remove`ing the last
/// element leaves a momentarily-empty list that the next completeness pass
/// will reject with [`NotWellFormed::MissingRequired`], rather than being
/// impossible to construct in the first place.
pub struct NonEmptyList<T>(Multi<T>);

impl<T> NonEmptyList<T> {
    /// A list containing exactly `first`.
    pub fn new(first: T) -> Self {
        let mut multi = Multi::new();
        multi.push(first);
        NonEmptyList(multi)
    }

    /// A momentarily-empty list — only for building one up from a source
    /// that might itself be (invalidly) empty, e.g. a generated `copy()`/
    /// `clone_deep()` working element-by-element off an existing list. The
    /// completeness pass still rejects an empty result.
    pub fn empty() -> Self {
        NonEmptyList(Multi::new())
    }
}

impl<T> std::ops::Deref for NonEmptyList<T> {
    type Target = Multi<T>;
    fn deref(&self) -> &Multi<T> {
        &self.0
    }
}

impl<T> std::ops::DerefMut for NonEmptyList<T> {
    fn deref_mut(&mut self) -> &mut Multi<T> {
        &mut self.0
    }
}

impl<T: AnyNode + 'static> Edge for NonEmptyList<T> {
    fn find_reachable(&self, map: &mut PointerMap) -> Result<(), NotWellFormed> {
        multi_find_reachable(&self.0, map)
    }

    fn check_complete(
        &self,
        map: &PointerMap,
        node_kind: &'static str,
        field: &'static str,
    ) -> Result<(), NotWellFormed> {
        if self.0.is_empty() {
            return Err(NotWellFormed::MissingRequired { node_kind, field });
        }
        multi_check_complete(&self.0, map)
    }
}

/// A required, non-owning reference to a node owned elsewhere in the tree.
pub struct Link<T>(Weak<RefCell<T>>);

impl<T> Link<T> {
    /// An unset link (never resolves, reported as missing by
    /// [`Edge::check_complete`]).
    pub fn new() -> Self {
        Link(Weak::new())
    }

    /// A link pointing at `target`.
    pub fn to(target: &Rc<RefCell<T>>) -> Self {
        Link(Rc::downgrade(target))
    }

    /// Retarget this link, returning `self` for chaining.
    pub fn set(&mut self, target: &Rc<RefCell<T>>) -> &mut Self {
        self.0 = Rc::downgrade(target);
        self
    }

    /// Resolve the link's target, if it is still alive.
    pub fn get(&self) -> Option<Rc<RefCell<T>>> {
        self.0.upgrade()
    }

    /// Whether two links point at the same address, without requiring
    /// either target to still be alive — how generated `equals()` bodies
    /// compare link fields (by identity, never by recursing into the
    /// target).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.0.as_ptr() == other.0.as_ptr()
    }
}

impl<T> Clone for Link<T> {
    /// Shares the same weak target — this is what lets `copy()`/
    /// `clone_deep()` leave link fields pointing at the *original* tree's
    /// nodes rather than retargeting them.
    fn clone(&self) -> Self {
        Link(self.0.clone())
    }
}

impl<T> Default for Link<T> {
    fn default() -> Self {
        Link::new()
    }
}

impl<T: AnyNode + 'static> Edge for Link<T> {
    fn find_reachable(&self, _map: &mut PointerMap) -> Result<(), NotWellFormed> {
        // Non-owning: contributes nothing to the reachability pass.
        Ok(())
    }

    fn check_complete(
        &self,
        map: &PointerMap,
        node_kind: &'static str,
        field: &'static str,
    ) -> Result<(), NotWellFormed> {
        match self.0.upgrade() {
            None => Err(NotWellFormed::MissingRequired { node_kind, field }),
            Some(rc) if !map.contains(rc_identity(&rc)) => {
                Err(NotWellFormed::DanglingLink { node_kind, field })
            }
            Some(_) => Ok(()),
        }
    }
}

/// An optional, non-owning reference to a node owned elsewhere in the tree.
pub struct OptLink<T>(Option<Weak<RefCell<T>>>);

impl<T> OptLink<T> {
    /// An unset link.
    pub fn none() -> Self {
        OptLink(None)
    }

    /// A link pointing at `target`.
    pub fn to(target: &Rc<RefCell<T>>) -> Self {
        OptLink(Some(Rc::downgrade(target)))
    }

    /// Retarget this link, returning `self` for chaining.
    pub fn set(&mut self, target: &Rc<RefCell<T>>) -> &mut Self {
        self.0 = Some(Rc::downgrade(target));
        self
    }

    /// Clear the link, returning `self` for chaining.
    pub fn clear(&mut self) -> &mut Self {
        self.0 = None;
        self
    }

    /// Resolve the link's target, if set and still alive.
    pub fn get(&self) -> Option<Rc<RefCell<T>>> {
        self.0.as_ref().and_then(Weak::upgrade)
    }

    /// Whether two links are both unset, or both point at the same address.
    /// See [`Link::ptr_eq`].
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => a.as_ptr() == b.as_ptr(),
            _ => false,
        }
    }
}

impl<T> Clone for OptLink<T> {
    /// See [`Link::clone`].
    fn clone(&self) -> Self {
        OptLink(self.0.clone())
    }
}

impl<T> Default for OptLink<T> {
    fn default() -> Self {
        OptLink::none()
    }
}

impl<T: AnyNode + 'static> Edge for OptLink<T> {
    fn find_reachable(&self, _map: &mut PointerMap) -> Result<(), NotWellFormed> {
        Ok(())
    }

    fn check_complete(
        &self,
        map: &PointerMap,
        node_kind: &'static str,
        field: &'static str,
    ) -> Result<(), NotWellFormed> {
        match &self.0 {
            None => Ok(()),
            Some(weak) => match weak.upgrade() {
                None => Ok(()),
                Some(rc) if !map.contains(rc_identity(&rc)) => {
                    Err(NotWellFormed::DanglingLink { node_kind, field })
                }
                Some(_) => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationMap;

    struct Leaf {
        annotations: AnnotationMap,
    }

    impl Leaf {
        fn new() -> Self {
            Leaf {
                annotations: AnnotationMap::new(),
            }
        }
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
        fn find_reachable(&self, _map: &mut PointerMap) -> Result<(), NotWellFormed> {
            Ok(())
        }
        fn check_complete(&self, _map: &PointerMap) -> Result<(), NotWellFormed> {
            Ok(())
        }
    }

    #[test]
    fn exactly_find_reachable_marks_target() {
        let edge = Exactly::new(Leaf::new());
        let mut map = PointerMap::default();
        edge.find_reachable(&mut map).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn maybe_none_contributes_nothing() {
        let edge: Maybe<Leaf> = Maybe::none();
        let mut map = PointerMap::default();
        edge.find_reachable(&mut map).unwrap();
        assert!(map.is_empty());
        assert!(edge.check_complete(&map, "n", "f").is_ok());
    }

    #[test]
    fn list_supports_negative_indexing() {
        let mut list: List<Leaf> = List::new();
        list.push(Leaf::new());
        list.push(Leaf::new());
        list.push(Leaf::new());
        assert_eq!(list.len(), 3);
        assert!(list.get(-1).is_some());
        assert!(std::ptr::eq(
            Rc::as_ptr(list.get(-1).unwrap()),
            Rc::as_ptr(list.get(2).unwrap())
        ));
        assert!(list.get(-4).is_none());
    }

    #[test]
    fn non_empty_list_rejects_empty_on_completeness() {
        let mut list = NonEmptyList::new(Leaf::new());
        list.remove(0);
        let map = PointerMap::default();
        let err = list.check_complete(&map, "widget", "items").unwrap_err();
        assert!(matches!(
            err,
            NotWellFormed::MissingRequired {
                node_kind: "widget",
                field: "items"
            }
        ));
    }

    #[test]
    fn link_to_owned_target_resolves_after_reachability_pass() {
        let owner = Exactly::new(Leaf::new());
        let link = Link::to(owner.rc());
        let mut map = PointerMap::default();
        owner.find_reachable(&mut map).unwrap();
        assert!(link.check_complete(&map, "n", "f").is_ok());
    }

    #[test]
    fn link_to_node_outside_tree_is_dangling() {
        let outside = Rc::new(RefCell::new(Leaf::new()));
        let link = Link::to(&outside);
        let map = PointerMap::default();
        let err = link.check_complete(&map, "n", "f").unwrap_err();
        assert!(matches!(err, NotWellFormed::DanglingLink { .. }));
    }

    #[test]
    fn unset_link_is_missing_required() {
        let link: Link<Leaf> = Link::new();
        let map = PointerMap::default();
        let err = link.check_complete(&map, "n", "f").unwrap_err();
        assert!(matches!(err, NotWellFormed::MissingRequired { .. }));
    }

    #[test]
    fn unset_opt_link_is_fine() {
        let link: OptLink<Leaf> = OptLink::none();
        let map = PointerMap::default();
        assert!(link.check_complete(&map, "n", "f").is_ok());
    }
}
