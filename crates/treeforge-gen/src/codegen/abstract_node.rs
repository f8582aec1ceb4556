//! Per-abstract-NodeType emission (§4.5, §9 Design Notes): a NodeType that
//! other NodeTypes derive from never gets instantiated on its own — it
//! becomes an enum whose variants are its transitive leaves, each wrapping
//! an `Rc<RefCell<Leaf>>`. A field typed `Exactly<Abstract>` (etc.) owns one
//! more level of indirection than a field typed at a leaf directly: the
//! edge wrapper's `Rc<RefCell<Abstract>>` holds the enum value, and the
//! enum variant holds the `Rc<RefCell<Leaf>>` the concrete node actually
//! lives in. Every operation below either dispatches on the variant to the
//! wrapped leaf's own method through a real `borrow`/`borrow_mut` — so an
//! accessor forwarding borrowed data back out (`as_<leaf>`, the annotations
//! pair) hands back the `Ref`/`RefMut` guard that data is borrowed through,
//! never a bare reference that outlives the borrow's own tracking — or, for
//! `as_<ancestor>`-style casts, returns `Self` directly, the same
//! trivial-identity shape [`super::leaf::emit_leaf`] uses for a leaf's own
//! ancestors.

use proc_macro2::TokenStream;
use quote::quote;

use crate::codegen::names::{as_method, as_method_mut, ident, visit_method};
use crate::codegen::types::support_path;
use crate::model::{NodeId, Specification};

/// Emit the enum definition, its inherent impl (constructor, downcasts,
/// copy/clone/equals, visitor dispatch), and its `AnyNode` impl for the
/// non-leaf NodeType `id`. Mirrors [`super::leaf::emit_leaf`]'s shape.
pub fn emit_abstract(spec: &Specification, id: NodeId) -> TokenStream {
    let config = &spec.config;
    let support = support_path(config);
    let node = spec.node(id);
    let enum_name = ident(&node.title_name);
    let snake_name = &node.name;
    let doc = &node.doc;

    let leaves: Vec<_> = spec.transitive_leaves(id).into_iter().map(|lid| spec.node(lid)).collect();
    let variant_names: Vec<_> = leaves.iter().map(|l| ident(&l.title_name)).collect();
    let leaf_types = &variant_names;

    let variants = variant_names.iter().zip(leaf_types.iter()).map(|(v, t)| {
        quote! { #v(std::rc::Rc<std::cell::RefCell<#t>>) }
    });

    let first_variant = &variant_names[0];

    let kind_arms = variant_names.iter().map(|v| {
        quote! { #enum_name::#v(__rc) => __rc.borrow().kind() }
    });

    let as_leaf_methods = variant_names.iter().enumerate().map(|(idx, v)| {
        let snake = &leaves[idx].name;
        let leaf_ty = v;
        let as_fn = as_method(snake);
        let as_fn_mut = as_method_mut(snake);
        let arms: Vec<_> = variant_names
            .iter()
            .map(|other| {
                if other == v {
                    quote! { #enum_name::#other(__rc) => Some(__rc.borrow()) }
                } else {
                    quote! { #enum_name::#other(_) => None }
                }
            })
            .collect();
        let arms_mut: Vec<_> = variant_names
            .iter()
            .map(|other| {
                if other == v {
                    quote! { #enum_name::#other(__rc) => Some(__rc.borrow_mut()) }
                } else {
                    quote! { #enum_name::#other(_) => None }
                }
            })
            .collect();
        quote! {
            #[doc = "`Some(borrow guard)` if this value currently holds that leaf kind, else `None`."]
            pub fn #as_fn(&self) -> Option<std::cell::Ref<'_, #leaf_ty>> {
                match self { #(#arms,)* }
            }

            #[doc = "Mutable form of the identically-named accessor above."]
            pub fn #as_fn_mut(&mut self) -> Option<std::cell::RefMut<'_, #leaf_ty>> {
                match self { #(#arms_mut,)* }
            }
        }
    });

    let own_as = as_method(snake_name);
    let own_as_mut = as_method_mut(snake_name);

    let ancestor_as_methods = spec.ancestors(id).into_iter().map(|aid| {
        let ancestor_snake = &spec.node(aid).name;
        let as_fn = as_method(ancestor_snake);
        let as_fn_mut = as_method_mut(ancestor_snake);
        quote! {
            #[doc = "Always `Some(self)` — every leaf this value may hold derives from this ancestor."]
            pub fn #as_fn(&self) -> Option<&Self> {
                Some(self)
            }

            #[doc = "Always `Some(self)` — every leaf this value may hold derives from this ancestor."]
            pub fn #as_fn_mut(&mut self) -> Option<&mut Self> {
                Some(self)
            }
        }
    });

    let copy_arms = variant_names.iter().map(|v| {
        quote! { #enum_name::#v(__rc) => #enum_name::#v(__rc.clone()) }
    });

    let clone_deep_arms = variant_names.iter().map(|v| {
        quote! {
            #enum_name::#v(__rc) => #enum_name::#v(std::rc::Rc::new(std::cell::RefCell::new(__rc.borrow().clone_deep())))
        }
    });

    let equals_arms = variant_names.iter().map(|v| {
        quote! { (#enum_name::#v(__a), #enum_name::#v(__b)) => __a.borrow().equals(&__b.borrow()) }
    });

    let dispatch_arms = variant_names.iter().map(|v| {
        quote! { #enum_name::#v(__rc) => __rc.borrow().dispatch(visitor) }
    });

    let node_type_name_arms = variant_names.iter().map(|v| {
        quote! { #enum_name::#v(__rc) => __rc.borrow().node_type_name() }
    });

    let is_error_marker_arms = variant_names.iter().map(|v| {
        quote! { #enum_name::#v(__rc) => #support::AnyNode::is_error_marker(&*__rc.borrow()) }
    });

    let annotations_arms = variant_names.iter().map(|v| {
        quote! {
            #enum_name::#v(__rc) => #support::annotation::AnnotationsRef::Cell(
                std::cell::Ref::map(__rc.borrow(), |__leaf| &__leaf.annotations),
            )
        }
    });

    let annotations_mut_arms = variant_names.iter().map(|v| {
        quote! {
            #enum_name::#v(__rc) => #support::annotation::AnnotationsMut::Cell(
                std::cell::RefMut::map(__rc.borrow_mut(), |__leaf| &mut __leaf.annotations),
            )
        }
    });

    let for_each_field_arms = variant_names.iter().map(|v| {
        quote! { #enum_name::#v(__rc) => #support::AnyNode::for_each_field(&*__rc.borrow(), f) }
    });

    let find_reachable_arms = variant_names.iter().map(|v| {
        quote! {
            #enum_name::#v(__rc) => {
                map.mark(#support::ids::identity_of(__rc))?;
                __rc.borrow().find_reachable(map)
            }
        }
    });

    let check_complete_arms = variant_names.iter().map(|v| {
        quote! { #enum_name::#v(__rc) => __rc.borrow().check_complete(map) }
    });

    let doc_attr = if doc.is_empty() {
        quote! {}
    } else {
        quote! { #[doc = #doc] }
    };

    quote! {
        #doc_attr
        #[derive(Debug)]
        pub enum #enum_name {
            #(#variants,)*
        }

        impl #enum_name {
            /// A well-defined, not necessarily well-formed, instance — an
            /// arbitrary choice of this NodeType's transitive leaves (its
            /// first, in schema declaration order), constructed by its own
            /// default.
            pub fn new() -> Self {
                #enum_name::#first_variant(std::rc::Rc::new(std::cell::RefCell::new(#first_variant::new())))
            }

            /// The concrete leaf kind this value currently holds (§4.5).
            pub fn kind(&self) -> NodeKind {
                match self { #(#kind_arms,)* }
            }

            #[doc = "Always `Some(self)` — this node's own kind."]
            pub fn #own_as(&self) -> Option<&Self> {
                Some(self)
            }

            #[doc = "Always `Some(self)` — this node's own kind."]
            pub fn #own_as_mut(&mut self) -> Option<&mut Self> {
                Some(self)
            }

            #(#ancestor_as_methods)*
            #(#as_leaf_methods)*

            /// A shallow copy: shares the same underlying leaf `Rc` as
            /// `self` rather than cloning it.
            pub fn copy(&self) -> Self {
                match self { #(#copy_arms,)* }
            }

            /// A deep clone: the underlying leaf is recursively cloned into
            /// a freshly allocated owning handle.
            pub fn clone_deep(&self) -> Self {
                match self { #(#clone_deep_arms,)* }
            }

            /// Structural equality, true only when both values hold the
            /// same leaf kind and that leaf's own `equals` agrees.
            pub fn equals(&self, other: &Self) -> bool {
                match (self, other) {
                    #(#equals_arms,)*
                    _ => false,
                }
            }

            /// Double-dispatch entry point, delegated to whichever leaf
            /// this value currently holds.
            pub fn dispatch<V: Visitor>(&self, visitor: &mut V) -> V::Output {
                match self { #(#dispatch_arms,)* }
            }
        }

        impl Default for #enum_name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl #support::AnyNode for #enum_name {
            fn node_type_name(&self) -> &'static str {
                match self { #(#node_type_name_arms,)* }
            }

            fn is_error_marker(&self) -> bool {
                match self { #(#is_error_marker_arms,)* }
            }

            fn annotations(&self) -> #support::annotation::AnnotationsRef<'_> {
                match self { #(#annotations_arms,)* }
            }

            fn annotations_mut(&mut self) -> #support::annotation::AnnotationsMut<'_> {
                match self { #(#annotations_mut_arms,)* }
            }

            fn for_each_field(&self, f: &mut dyn FnMut(#support::Field<'_>)) {
                match self { #(#for_each_field_arms,)* }
            }

            fn find_reachable(&self, map: &mut #support::wellformed::PointerMap) -> Result<(), #support::NotWellFormed> {
                match self { #(#find_reachable_arms,)* }
            }

            fn check_complete(&self, map: &#support::wellformed::PointerMap) -> Result<(), #support::NotWellFormed> {
                match self { #(#check_complete_arms,)* }
            }
        }
    }
}

/// Emit `serialize`/`deserialize` for the non-leaf NodeType `id`, appended
/// to its inherent `impl` block. Only called when
/// [`crate::model::Config::wants_serde`].
///
/// Dispatch writes and reads through to whichever leaf a value currently
/// holds — the wire shape of a field typed at an abstract NodeType is
/// identical to one typed at the concrete leaf it happens to hold (§4.4):
/// the same flat `@t`/`@i`/fields map, with no extra nesting for the
/// abstract wrapper.
pub fn emit_abstract_serde(spec: &Specification, id: NodeId) -> TokenStream {
    let config = &spec.config;
    let support = support_path(config);
    let node = spec.node(id);
    let enum_name = ident(&node.title_name);

    let leaves: Vec<_> = spec.transitive_leaves(id).into_iter().map(|lid| spec.node(lid)).collect();
    let variant_names: Vec<_> = leaves.iter().map(|l| ident(&l.title_name)).collect();
    let tags: Vec<&String> = leaves.iter().map(|l| &l.name).collect();
    let expected = tags.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(", ");

    let serialize_arms = variant_names.iter().map(|v| {
        quote! {
            #enum_name::#v(__rc) => {
                let __leaf_seq = ids.sequence(#support::ids::identity_of(__rc))
                    .expect("well-formed tree: every owned child has a sequence number");
                __rc.borrow().serialize(__leaf_seq, map, ids)
            }
        }
    });

    let deserialize_arms = variant_names.iter().zip(tags.iter()).map(|(v, tag)| {
        quote! {
            #tag => {
                let __rc = #v::deserialize(view, ctx)?;
                Ok(std::rc::Rc::new(std::cell::RefCell::new(#enum_name::#v(__rc))))
            }
        }
    });

    quote! {
        impl #enum_name {
            /// Write whichever leaf `self` currently holds as a flat CBOR
            /// map: `@t`, `@i` (the leaf's own sequence number — never the
            /// enum wrapper's), then its fields and annotations. `_seq` (the
            /// sequence number assigned to the enum wrapper's own `Rc`) is
            /// never itself a valid link target and is unused here.
            pub fn serialize<W: std::io::Write>(
                &self,
                _seq: u64,
                map: &mut #support::cbor::MapWriter<W>,
                ids: &#support::wellformed::PointerMap,
            ) -> #support::CodecResult<()> {
                match self { #(#serialize_arms,)* }
            }

            /// Read `@t` and dispatch to whichever leaf it names, wrapping
            /// the result in a fresh enum-level owning handle.
            pub fn deserialize(
                view: &#support::cbor::MapView<'_, '_>,
                ctx: &mut #support::DeserializeContext,
            ) -> #support::DeserializeResult<std::rc::Rc<std::cell::RefCell<Self>>> {
                let __tag = view
                    .get("@t")
                    .ok_or(#support::DeserializeError::MissingField { node_kind: "<abstract>", field: "@t" })?
                    .as_text()?;
                match __tag {
                    #(#deserialize_arms)*
                    other => Err(#support::DeserializeError::UnknownTag {
                        tag: other.to_string(),
                        expected: #expected.to_string(),
                    }),
                }
            }
        }
    }
}
