//! Per-leaf-NodeType emission (§4.5): the only NodeTypes a tree ever
//! actually instantiates. Each becomes a plain struct, one field per
//! schema-declared (own + inherited) field, plus the operations every
//! `NodeType` carries: a default constructor, `copy`/`clone`/`clone_deep`/
//! `equals`, the `AnyNode` impl, visitor dispatch, and — when the schema
//! wants serialization — `serialize`/`deserialize`.

use proc_macro2::TokenStream;
use quote::quote;

use crate::codegen::fields::{
    check_complete_field_call, clone_deep_field_expr, copy_field_expr, default_field_expr, equals_field_expr,
    fields_body, find_reachable_field_call,
};
use crate::codegen::names::{as_method, as_method_mut, ident, visit_method};
use crate::codegen::serde::{deserialize_field_stmts, serialize_field_stmt};
use crate::codegen::types::{field_type, support_path};
use crate::model::{NodeId, Specification};

/// Emit the struct definition, its inherent impl (constructor, copy/clone/
/// equals, visitor dispatch), and its `AnyNode` impl for leaf node `id`.
/// `serialize`/`deserialize` are appended separately by
/// [`crate::codegen::emit_tree_methods`] when the schema wants them.
pub fn emit_leaf(spec: &Specification, id: NodeId) -> TokenStream {
    let config = &spec.config;
    let support = support_path(config);
    let node = spec.node(id);
    let struct_name = ident(&node.title_name);
    let snake_name = &node.name;
    let doc = &node.doc;
    let fields = spec.all_fields(id);

    let struct_fields = fields.iter().map(|f| {
        let name = ident(&f.name);
        let ty = field_type(spec, config, f);
        let doc = &f.doc;
        if doc.is_empty() {
            quote! { pub #name: #ty }
        } else {
            quote! {
                #[doc = #doc]
                pub #name: #ty
            }
        }
    });

    let defaults = fields.iter().map(|f| {
        let name = ident(&f.name);
        let expr = default_field_expr(spec, config, f);
        quote! { #name: #expr }
    });

    let copy_fields = fields.iter().map(|f| {
        let name = ident(&f.name);
        let expr = copy_field_expr(config, f);
        quote! { #name: #expr }
    });

    let clone_deep_fields = fields.iter().map(|f| {
        let name = ident(&f.name);
        let expr = clone_deep_field_expr(config, f);
        quote! { #name: #expr }
    });

    let equals_terms = fields.iter().map(|f| equals_field_expr(f));

    let fields_method = fields_body(config, &fields);
    let find_reachable_calls = fields.iter().filter_map(find_reachable_field_call);
    let check_complete_calls = fields.iter().map(|f| check_complete_field_call(f, snake_name));

    let own_as = as_method(snake_name);
    let own_as_mut = as_method_mut(snake_name);
    let own_visit = visit_method(snake_name);

    let ancestor_as_methods = spec.ancestors(id).into_iter().map(|aid| {
        let ancestor_snake = &spec.node(aid).name;
        let as_fn = as_method(ancestor_snake);
        let as_fn_mut = as_method_mut(ancestor_snake);
        quote! {
            #[doc = "Always `Some(self)` — this leaf derives from this ancestor kind."]
            pub fn #as_fn(&self) -> Option<&Self> {
                Some(self)
            }

            #[doc = "Always `Some(self)` — this leaf derives from this ancestor kind."]
            pub fn #as_fn_mut(&mut self) -> Option<&mut Self> {
                Some(self)
            }
        }
    });

    let is_error_marker = node.is_error_marker;
    let is_error_marker_impl = if is_error_marker {
        quote! {
            fn is_error_marker(&self) -> bool {
                true
            }
        }
    } else {
        quote! {}
    };

    let doc_attr = if doc.is_empty() {
        quote! {}
    } else {
        quote! { #[doc = #doc] }
    };

    quote! {
        #doc_attr
        #[derive(Debug)]
        pub struct #struct_name {
            #(#struct_fields,)*
            annotations: #support::annotation::AnnotationMap,
        }

        impl #struct_name {
            /// A well-defined, not necessarily well-formed, instance: every
            /// field set to its edge kind's empty value or its primitive's
            /// `initialize()` default.
            pub fn new() -> Self {
                Self {
                    #(#defaults,)*
                    annotations: #support::annotation::AnnotationMap::new(),
                }
            }

            /// The discriminant for this leaf's kind (§4.5).
            pub fn kind(&self) -> NodeKind {
                NodeKind::#struct_name
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

            /// A shallow copy: every owning field shares its `Rc` with
            /// `self` instead of cloning the target; link fields keep
            /// pointing at whatever they already resolve to.
            pub fn copy(&self) -> Self {
                Self {
                    #(#copy_fields,)*
                    annotations: {
                        let mut __a = #support::annotation::AnnotationMap::new();
                        __a.copy_from(&self.annotations);
                        __a
                    },
                }
            }

            /// A deep clone: owning fields are recursively cloned; link
            /// fields keep pointing at the *original* tree (§9 Design Notes).
            pub fn clone_deep(&self) -> Self {
                Self {
                    #(#clone_deep_fields,)*
                    annotations: {
                        let mut __a = #support::annotation::AnnotationMap::new();
                        __a.copy_from(&self.annotations);
                        __a
                    },
                }
            }

            /// Structural equality through owning fields, pointer equality
            /// through link fields. Annotations are never consulted (§4.5).
            pub fn equals(&self, other: &Self) -> bool {
                true #(&& #equals_terms)*
            }

            /// Double-dispatch entry point for the schema's [`Visitor`] trait.
            pub fn dispatch<V: Visitor>(&self, visitor: &mut V) -> V::Output {
                visitor.#own_visit(self)
            }
        }

        impl Default for #struct_name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl #support::AnyNode for #struct_name {
            fn node_type_name(&self) -> &'static str {
                #snake_name
            }

            #is_error_marker_impl

            fn annotations(&self) -> #support::annotation::AnnotationsRef<'_> {
                #support::annotation::AnnotationsRef::Direct(&self.annotations)
            }

            fn annotations_mut(&mut self) -> #support::annotation::AnnotationsMut<'_> {
                #support::annotation::AnnotationsMut::Direct(&mut self.annotations)
            }

            fn for_each_field(&self, f: &mut dyn FnMut(#support::Field<'_>)) {
                #fields_method
            }

            fn find_reachable(&self, map: &mut #support::wellformed::PointerMap) -> Result<(), #support::NotWellFormed> {
                use #support::edge::Edge as _;
                #(#find_reachable_calls)*
                Ok(())
            }

            fn check_complete(&self, map: &#support::wellformed::PointerMap) -> Result<(), #support::NotWellFormed> {
                use #support::edge::Edge as _;
                if #support::AnyNode::is_error_marker(self) {
                    return Err(#support::NotWellFormed::ErrorMarker { node_kind: #snake_name });
                }
                #(#check_complete_calls)*
                Ok(())
            }
        }
    }
}

/// Emit the `serialize`/`deserialize_fields`/`deserialize` trio for leaf
/// node `id`, appended to its inherent `impl` block. Only called when
/// [`crate::model::Config::wants_serde`].
pub fn emit_leaf_serde(spec: &Specification, id: NodeId) -> TokenStream {
    let config = &spec.config;
    let support = support_path(config);
    let node = spec.node(id);
    let struct_name = ident(&node.title_name);
    let snake_name = &node.name;
    let fields = spec.all_fields(id);

    let serialize_stmts = fields.iter().map(|f| serialize_field_stmt(config, spec, f));
    let deserialize_stmts = fields.iter().map(|f| deserialize_field_stmts(config, spec, snake_name, f));
    let field_names = fields.iter().map(|f| ident(&f.name));

    quote! {
        impl #struct_name {
            /// Write this node (already assigned `seq` by the reachability
            /// pass) as a CBOR map: `@t`, `@i`, then each field in
            /// declaration order, then every registered annotation.
            pub fn serialize<W: std::io::Write>(
                &self,
                seq: u64,
                map: &mut #support::cbor::MapWriter<W>,
                ids: &#support::wellformed::PointerMap,
            ) -> #support::CodecResult<()> {
                map.entry("@t", #support::cbor::Scalar::Text(#snake_name))?;
                map.entry("@i", #support::cbor::Scalar::Int(seq as i64))?;
                #(#serialize_stmts)*
                #support::annotation::serialize_annotations(&self.annotations, map)?;
                Ok(())
            }

            /// Build this node's own value from an already-open map,
            /// without wrapping it in an owning handle yet: link fields are
            /// left unset, each paired with a [`treeforge_runtime::PendingLink`]
            /// the caller applies once every node has been registered.
            pub fn deserialize_fields(
                view: &#support::cbor::MapView<'_, '_>,
                ctx: &mut #support::DeserializeContext,
            ) -> #support::DeserializeResult<(Self, u64, Vec<#support::PendingLink<Self>>)> {
                let __seq = view.get("@i").ok_or(#support::DeserializeError::MissingField {
                    node_kind: #snake_name,
                    field: "@i",
                })?.as_int()? as u64;
                let mut __links: Vec<#support::PendingLink<Self>> = Vec::new();
                #(#deserialize_stmts)*
                let __node = Self {
                    #(#field_names,)*
                    annotations: #support::annotation::deserialize_annotations(view),
                };
                Ok((__node, __seq, __links))
            }

            /// Build and register this node, deferring its own link fields'
            /// fixups onto `ctx`.
            pub fn deserialize(
                view: &#support::cbor::MapView<'_, '_>,
                ctx: &mut #support::DeserializeContext,
            ) -> #support::DeserializeResult<std::rc::Rc<std::cell::RefCell<Self>>> {
                let (node, seq, links) = Self::deserialize_fields(view, ctx)?;
                let rc = std::rc::Rc::new(std::cell::RefCell::new(node));
                ctx.register(seq, rc.clone());
                for link in links {
                    ctx.defer_link(rc.clone(), link);
                }
                Ok(rc)
            }
        }
    }
}
