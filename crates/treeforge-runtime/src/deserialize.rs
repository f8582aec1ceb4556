//! Two-phase bookkeeping a generated `deserialize` walk drives: every owned
//! node registers itself under its wire `@i` as it's built, and every
//! `Link`/`OptLink` field defers its fixup until the whole tree exists —
//! CBOR's depth-first nesting means a link can easily name a node that
//! hasn't been constructed yet (a later sibling, a node reachable only
//! through a field declared further down the schema).
//!
//! Generated code never constructs a [`DeserializeContext`] mid-tree: one is
//! opened for a whole `deserialize_root` call and [`DeserializeContext::finish`]
//! is the last thing that call does, running every deferred fixup against
//! the now-complete registry.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{DeserializeError, DeserializeResult};

type PendingFixup = Box<dyn FnOnce(&HashMap<u64, Rc<dyn Any>>) -> DeserializeResult<()>>;

/// One `Link`/`OptLink` field a leaf's `deserialize_fields` couldn't resolve
/// inline, carrying everything needed to finish the job once every node in
/// the payload has been registered.
///
/// Generic over the concrete leaf type `T` the link field lives on — codegen
/// builds `apply` as a closure over that type's own field, so applying a
/// fixup never needs to know any other leaf's shape.
pub struct PendingLink<T> {
    /// The `@i` the link's `{"@l": ...}` value named.
    pub target_seq: u64,
    /// The owning leaf's schema name, for [`DeserializeError::UnresolvedLink`].
    pub node_kind: &'static str,
    /// The link field's name, for [`DeserializeError::UnresolvedLink`].
    pub field: &'static str,
    /// Downcasts the resolved registry entry to this field's concrete
    /// target type and calls the field's `set`.
    pub apply: Box<dyn FnOnce(&mut T, Rc<dyn Any>) -> DeserializeResult<()>>,
}

impl<T: 'static> PendingLink<T> {
    /// Re-home this fixup onto an enclosing owner `U` (an abstract
    /// NodeType's enum wrapping the leaf `T` it was built against), via a
    /// projection from `&mut U` to `&mut T`. Generated abstract-NodeType
    /// `deserialize` bodies use this to re-target the leaf's own pending
    /// links onto the `Rc<RefCell<EnumType>>` it actually got wrapped in.
    pub fn map_owner<U: 'static>(self, project: impl Fn(&mut U) -> &mut T + 'static) -> PendingLink<U> {
        let apply = self.apply;
        PendingLink {
            target_seq: self.target_seq,
            node_kind: self.node_kind,
            field: self.field,
            apply: Box::new(move |owner: &mut U, any_rc| apply(project(owner), any_rc)),
        }
    }
}

/// Registry of already-deserialized owned nodes (keyed by `@i`) plus the
/// link fixups still waiting on one.
#[derive(Default)]
pub struct DeserializeContext {
    registry: HashMap<u64, Rc<dyn Any>>,
    pending: Vec<PendingFixup>,
}

impl DeserializeContext {
    /// An empty context, opened once per `deserialize_root` call.
    pub fn new() -> Self {
        DeserializeContext::default()
    }

    /// Record a freshly built owned node under its `@i`, erasing its
    /// concrete type. Only nodes a schema's `Link`/`OptLink` fields can
    /// actually target need registering (see the per-schema deserialize
    /// bodies' own doc comments for which NodeTypes that is).
    pub fn register<T: 'static>(&mut self, seq: u64, rc: Rc<RefCell<T>>) {
        self.registry.insert(seq, rc as Rc<dyn Any>);
    }

    /// Look up an already-registered node by `@i`, downcasting to `T`.
    /// `None` if the sequence number hasn't been registered yet (the common
    /// case for a forward reference) or was registered under a different
    /// concrete type.
    pub fn resolve<T: 'static>(&self, seq: u64) -> Option<Rc<RefCell<T>>> {
        self.registry.get(&seq).and_then(|rc| rc.clone().downcast::<RefCell<T>>().ok())
    }

    /// Queue a fixup to run once every node in the payload is registered.
    pub fn defer(&mut self, fixup: impl FnOnce(&HashMap<u64, Rc<dyn Any>>) -> DeserializeResult<()> + 'static) {
        self.pending.push(Box::new(fixup));
    }

    /// Queue a [`PendingLink`] built by a leaf's `deserialize_fields`,
    /// against the `Rc` that field's owner was just wrapped in.
    pub fn defer_link<T: 'static>(&mut self, owner: Rc<RefCell<T>>, link: PendingLink<T>) {
        self.defer(move |registry| {
            let target = registry.get(&link.target_seq).cloned().ok_or(DeserializeError::UnresolvedLink {
                node_kind: link.node_kind,
                field: link.field,
                seq: link.target_seq,
            })?;
            (link.apply)(&mut owner.borrow_mut(), target)
        });
    }

    /// Run every deferred fixup, in the order they were queued. The last
    /// step of a `deserialize_root` call.
    pub fn finish(self) -> DeserializeResult<()> {
        for fixup in self.pending {
            fixup(&self.registry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf {
        link_target: Option<Rc<RefCell<Leaf>>>,
    }

    #[test]
    fn forward_reference_resolves_after_finish() {
        let mut ctx = DeserializeContext::new();
        let a = Rc::new(RefCell::new(Leaf { link_target: None }));
        ctx.defer_link(
            a.clone(),
            PendingLink {
                target_seq: 7,
                node_kind: "leaf",
                field: "link_target",
                apply: Box::new(|node, any_rc| {
                    let typed = any_rc.downcast::<RefCell<Leaf>>().unwrap();
                    node.link_target = Some(typed);
                    Ok(())
                }),
            },
        );
        let b = Rc::new(RefCell::new(Leaf { link_target: None }));
        ctx.register(7, b.clone());
        ctx.finish().unwrap();
        assert!(Rc::ptr_eq(a.borrow().link_target.as_ref().unwrap(), &b));
    }

    #[test]
    fn unresolved_target_is_reported() {
        let mut ctx = DeserializeContext::new();
        let a = Rc::new(RefCell::new(Leaf { link_target: None }));
        ctx.defer_link(
            a,
            PendingLink {
                target_seq: 99,
                node_kind: "leaf",
                field: "link_target",
                apply: Box::new(|_, _| Ok(())),
            },
        );
        let err = ctx.finish().unwrap_err();
        assert!(matches!(err, DeserializeError::UnresolvedLink { seq: 99, .. }));
    }
}
