//! Process-wide annotation registry and per-node annotation storage.
//!
//! Annotations are out-of-band values attached to a node (source locations,
//! type-checker results, whatever a consumer wants to hang off a tree)
//! without the schema author declaring a field for them. Because a
//! deserialized tree may land in a different process than the one that
//! serialized it, annotation keys are plain strings registered once per
//! type — never `TypeId`, which is only stable within one process/binary.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::cbor::{MapView, MapWriter, Reader, Scalar};
use crate::error::{AnnotationResult, CodecResult, Missing};

/// An annotation value reduced to the handful of shapes the CBOR codec
/// understands, used to move payloads across the registry's `ser`/`des`
/// boundary without the registry itself needing to be generic.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Text(String),
}

impl AnnotationValue {
    fn from_reader(r: &Reader<'_>) -> Option<AnnotationValue> {
        if r.is_null() {
            Some(AnnotationValue::Null)
        } else if r.is_bool() {
            r.as_bool().ok().map(AnnotationValue::Bool)
        } else if r.is_int() {
            r.as_int().ok().map(AnnotationValue::Int)
        } else if r.is_float() {
            r.as_float().ok().map(AnnotationValue::Float)
        } else if r.is_bytes() {
            r.as_bytes().ok().map(|b| AnnotationValue::Bytes(b.to_vec()))
        } else if r.is_text() {
            r.as_text().ok().map(|s| AnnotationValue::Text(s.to_string()))
        } else {
            None
        }
    }

    fn as_scalar(&self) -> Scalar<'_> {
        match self {
            AnnotationValue::Null => Scalar::Null,
            AnnotationValue::Bool(b) => Scalar::Bool(*b),
            AnnotationValue::Int(n) => Scalar::Int(*n),
            AnnotationValue::Float(f) => Scalar::Float(*f),
            AnnotationValue::Bytes(b) => Scalar::Bytes(b),
            AnnotationValue::Text(s) => Scalar::Text(s),
        }
    }
}

type SerFn = Box<dyn Fn(&dyn Any) -> AnnotationValue + Send + Sync>;
type DesFn = Box<dyn Fn(&AnnotationValue) -> Option<Box<dyn Any>> + Send + Sync>;

struct AnnotationCodec {
    ser: SerFn,
    des: DesFn,
}

static REGISTRY: OnceLock<RwLock<HashMap<&'static str, AnnotationCodec>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<&'static str, AnnotationCodec>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Reverse index from a registered type's [`TypeId`] back to the key it was
/// registered under — lets [`AnnotationMap`] key its per-node storage by
/// whatever name [`register`] actually chose for `T`, including a custom
/// `name` that doesn't match `T`'s own default key.
static TYPE_KEYS: OnceLock<RwLock<HashMap<TypeId, &'static str>>> = OnceLock::new();

fn type_keys() -> &'static RwLock<HashMap<TypeId, &'static str>> {
    TYPE_KEYS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// The last `::`-separated segment of `type_name::<T>()`, used as the
/// default registry key when a type is registered without an explicit name.
fn default_key<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Register the serializer/deserializer pair for annotation type `T`.
///
/// `name` overrides the default key (`T`'s unqualified type name). The key
/// is written to CBOR braced as `{name}`; re-registering the same key
/// replaces the previous codec.
pub fn register<T: Any + 'static>(
    name: Option<&'static str>,
    ser: fn(&T) -> AnnotationValue,
    des: fn(&AnnotationValue) -> Option<T>,
) {
    let key = name.unwrap_or_else(default_key::<T>);
    let codec = AnnotationCodec {
        ser: Box::new(move |any: &dyn Any| {
            ser(any
                .downcast_ref::<T>()
                .expect("treeforge_runtime: annotation registered under mismatched type"))
        }),
        des: Box::new(move |value: &AnnotationValue| des(value).map(|t| Box::new(t) as Box<dyn Any>)),
    };
    registry().write().unwrap().insert(key, codec);
    type_keys().write().unwrap().insert(TypeId::of::<T>(), key);
}

/// The registry key `T`'s values are stored under: whatever [`register`]
/// was called with for `T`, if it ever was, otherwise `T`'s default key.
/// An unregistered `T` can still be `set`/`get` on a single node (the
/// per-node map doesn't require registration) — it simply can't round-trip
/// through serialize/deserialize, same as any other unregistered type.
fn key_for<T: Any + 'static>() -> &'static str {
    type_keys()
        .read()
        .unwrap()
        .get(&TypeId::of::<T>())
        .copied()
        .unwrap_or_else(default_key::<T>)
}

/// A read-only view of an [`AnyNode`](crate::node::AnyNode)'s annotations.
///
/// A leaf's annotations sit in a plain struct field, reachable as `&self`'s
/// own data; a non-leaf NodeType's enum wraps its leaf in `Rc<RefCell<_>>`,
/// so reaching the same field means holding a live [`Ref`](std::cell::Ref)
/// guard instead. Both forms deref to [`AnnotationMap`] so callers don't
/// need to care which one they got.
pub enum AnnotationsRef<'a> {
    /// A leaf's own `annotations` field, borrowed straight off `&self`.
    Direct(&'a AnnotationMap),
    /// A non-leaf NodeType's wrapped leaf, reached through a tracked borrow.
    Cell(std::cell::Ref<'a, AnnotationMap>),
}

impl std::ops::Deref for AnnotationsRef<'_> {
    type Target = AnnotationMap;

    fn deref(&self) -> &AnnotationMap {
        match self {
            AnnotationsRef::Direct(r) => r,
            AnnotationsRef::Cell(r) => r,
        }
    }
}

/// Mutable counterpart to [`AnnotationsRef`].
pub enum AnnotationsMut<'a> {
    /// A leaf's own `annotations` field, borrowed straight off `&mut self`.
    Direct(&'a mut AnnotationMap),
    /// A non-leaf NodeType's wrapped leaf, reached through a tracked borrow.
    Cell(std::cell::RefMut<'a, AnnotationMap>),
}

impl std::ops::Deref for AnnotationsMut<'_> {
    type Target = AnnotationMap;

    fn deref(&self) -> &AnnotationMap {
        match self {
            AnnotationsMut::Direct(r) => r,
            AnnotationsMut::Cell(r) => r,
        }
    }
}

impl std::ops::DerefMut for AnnotationsMut<'_> {
    fn deref_mut(&mut self) -> &mut AnnotationMap {
        match self {
            AnnotationsMut::Direct(r) => r,
            AnnotationsMut::Cell(r) => r,
        }
    }
}

/// Per-node annotation storage, keyed by the same string the registry uses.
#[derive(Default)]
pub struct AnnotationMap {
    entries: HashMap<&'static str, Box<dyn Any>>,
}

impl AnnotationMap {
    /// Construct an empty annotation map.
    pub fn new() -> Self {
        AnnotationMap::default()
    }

    /// Attach (or replace) the value of type `T`.
    pub fn set<T: Any + 'static>(&mut self, value: T) {
        self.entries.insert(key_for::<T>(), Box::new(value));
    }

    /// Look up the value of type `T`.
    pub fn get<T: Any + 'static>(&self) -> AnnotationResult<&T> {
        self.entries
            .get(key_for::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
            .ok_or(Missing)
    }

    /// Look up the value of type `T` mutably.
    pub fn get_mut<T: Any + 'static>(&mut self) -> AnnotationResult<&mut T> {
        self.entries
            .get_mut(key_for::<T>())
            .and_then(|boxed| boxed.downcast_mut::<T>())
            .ok_or(Missing)
    }

    /// Whether an annotation of type `T` is attached.
    pub fn has<T: Any + 'static>(&self) -> bool {
        self.entries.contains_key(key_for::<T>())
    }

    /// Remove the annotation of type `T`, if present.
    pub fn erase<T: Any + 'static>(&mut self) -> bool {
        self.entries.remove(key_for::<T>()).is_some()
    }

    /// Copy every annotation that has a registered codec from `other` into
    /// `self`, overwriting like keys. Annotations with no registered codec
    /// cannot be copied generically and are silently skipped, matching the
    /// serialize path's skip-unregistered-types rule.
    pub fn copy_from(&mut self, other: &AnnotationMap) {
        let reg = registry().read().unwrap();
        for (&key, boxed) in &other.entries {
            if let Some(codec) = reg.get(key) {
                let value = (codec.ser)(boxed.as_ref());
                if let Some(copied) = (codec.des)(&value) {
                    self.entries.insert(key, copied);
                }
            }
        }
    }

    /// Number of attached annotations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no annotations are attached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialize every annotation in `map` that has a registered codec, writing
/// each as `{key}: value` into an already-open node map. Unregistered
/// entries are skipped (§4.2).
pub fn serialize_annotations<W: std::io::Write>(
    map: &AnnotationMap,
    writer: &mut MapWriter<W>,
) -> CodecResult<()> {
    let reg = registry().read().unwrap();
    for (&key, boxed) in &map.entries {
        if let Some(codec) = reg.get(key) {
            let value = (codec.ser)(boxed.as_ref());
            let braced = format!("{{{key}}}");
            writer.entry(&braced, value.as_scalar())?;
        }
    }
    Ok(())
}

/// Reconstruct an [`AnnotationMap`] from a deserialized node map: every key
/// shaped `{name}` is looked up in the registry; unknown braced keys are
/// dropped silently.
pub fn deserialize_annotations(map: &MapView<'_, '_>) -> AnnotationMap {
    let mut result = AnnotationMap::new();
    let reg = registry().read().unwrap();
    for (key, reader) in map.iter() {
        let Some(name) = key.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
            continue;
        };
        let Some(codec) = reg.get(name) else { continue };
        let Some(value) = AnnotationValue::from_reader(reader) else {
            continue;
        };
        if let Some(boxed) = (codec.des)(&value) {
            result.entries.insert(
                reg.get_key_value(name).map(|(&k, _)| k).unwrap_or(name),
                boxed,
            );
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Clone)]
    struct SourceLine(u32);

    fn ser_source_line(v: &SourceLine) -> AnnotationValue {
        AnnotationValue::Int(v.0 as i64)
    }

    fn des_source_line(v: &AnnotationValue) -> Option<SourceLine> {
        match v {
            AnnotationValue::Int(n) => Some(SourceLine(*n as u32)),
            _ => None,
        }
    }

    #[test]
    fn set_get_has_erase_roundtrip() {
        register("SourceLine", ser_source_line, des_source_line);
        let mut map = AnnotationMap::new();
        assert!(!map.has::<SourceLine>());
        map.set(SourceLine(42));
        assert!(map.has::<SourceLine>());
        assert_eq!(map.get::<SourceLine>().unwrap(), &SourceLine(42));
        assert!(map.erase::<SourceLine>());
        assert!(!map.has::<SourceLine>());
    }

    #[test]
    fn get_missing_returns_missing_error() {
        let map = AnnotationMap::new();
        assert!(map.get::<SourceLine>().is_err());
    }

    #[test]
    fn copy_from_only_copies_registered_types() {
        register("SourceLine", ser_source_line, des_source_line);
        let mut src = AnnotationMap::new();
        src.set(SourceLine(7));
        let mut dst = AnnotationMap::new();
        dst.copy_from(&src);
        assert_eq!(dst.get::<SourceLine>().unwrap(), &SourceLine(7));
    }

    #[derive(Debug, PartialEq, Clone)]
    struct CustomNamed(u32);

    fn ser_custom(v: &CustomNamed) -> AnnotationValue {
        AnnotationValue::Int(v.0 as i64)
    }

    fn des_custom(v: &AnnotationValue) -> Option<CustomNamed> {
        match v {
            AnnotationValue::Int(n) => Some(CustomNamed(*n as u32)),
            _ => None,
        }
    }

    #[test]
    fn custom_registered_name_stays_consistent_between_node_storage_and_wire_round_trip() {
        // The registered name deliberately does not match `CustomNamed`'s
        // own default key, so `AnnotationMap::set/get` must key off of
        // whatever `register` actually chose, not `T`'s type name.
        register("totally_different_key", ser_custom, des_custom);
        let mut map = AnnotationMap::new();
        map.set(CustomNamed(99));
        assert!(map.has::<CustomNamed>());
        assert_eq!(map.get::<CustomNamed>().unwrap(), &CustomNamed(99));

        let mut w = crate::cbor::Writer::new(Vec::new());
        let mut root = w.start_root_map().unwrap();
        serialize_annotations(&map, &mut root).unwrap();
        root.finish().unwrap();
        let bytes = w.into_inner().unwrap();

        let reader = Reader::new(&bytes).unwrap();
        let view = reader.as_map().unwrap();
        assert!(view.contains_key("{totally_different_key}"));

        let restored = deserialize_annotations(&view);
        assert_eq!(restored.get::<CustomNamed>().unwrap(), &CustomNamed(99));
    }
}
