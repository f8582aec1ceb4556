//! Bridges opaque schema primitive types (§4.1) to the CBOR codec.
//!
//! A schema field typed as a bare primitive (`name: String;`) or an
//! edge-wrapped one (`Maybe<Integer>`) is, per §1, "an opaque,
//! capability-bound external type" — this is the capability: implement
//! [`CborPrimitive`] and a generated `serialize`/`deserialize` body can read
//! and write it. The handful of types schema authors reach for most often
//! (strings, the fixed-width integers, floats, bytes, bool) are implemented
//! here; a schema's own `ext` primitives need their own `impl` alongside
//! their definition.

use crate::cbor::{Reader, Scalar};

/// Implemented by every concrete Rust type a schema's primitive fields may
/// hold. A schema's `serialize "...";`/`deserialize "...";` directives
/// only gate *whether* (de)serialization is emitted at all
/// ([`crate::node`]/`treeforge_gen::model::Config::wants_serde`) — this
/// trait is what a generated `serialize`/`deserialize` body actually calls
/// for a primitive-typed field, in place of naming two free functions per
/// schema (see `DESIGN.md`'s Open Questions for why).
pub trait CborPrimitive: Sized {
    /// Render `self` as the CBOR scalar a generated `serialize` body writes
    /// under the field's key.
    fn to_cbor(&self) -> Scalar<'_>;

    /// Parse a value back out of an already-parsed CBOR reader. `None`
    /// means the reader's kind didn't match what this type expects;
    /// generated `deserialize` bodies turn that into a
    /// [`crate::error::DeserializeError`].
    fn from_cbor(reader: &Reader<'_>) -> Option<Self>;
}

impl CborPrimitive for String {
    fn to_cbor(&self) -> Scalar<'_> {
        Scalar::Text(self)
    }
    fn from_cbor(reader: &Reader<'_>) -> Option<Self> {
        reader.as_text().ok().map(str::to_string)
    }
}

impl CborPrimitive for bool {
    fn to_cbor(&self) -> Scalar<'_> {
        Scalar::Bool(*self)
    }
    fn from_cbor(reader: &Reader<'_>) -> Option<Self> {
        reader.as_bool().ok()
    }
}

impl CborPrimitive for f64 {
    fn to_cbor(&self) -> Scalar<'_> {
        Scalar::Float(*self)
    }
    fn from_cbor(reader: &Reader<'_>) -> Option<Self> {
        reader.as_float().ok()
    }
}

impl CborPrimitive for f32 {
    fn to_cbor(&self) -> Scalar<'_> {
        Scalar::Float(*self as f64)
    }
    fn from_cbor(reader: &Reader<'_>) -> Option<Self> {
        reader.as_float().ok().map(|f| f as f32)
    }
}

macro_rules! impl_cbor_primitive_int {
    ($($t:ty),+ $(,)?) => {
        $(
            impl CborPrimitive for $t {
                fn to_cbor(&self) -> Scalar<'_> {
                    Scalar::Int(*self as i64)
                }
                fn from_cbor(reader: &Reader<'_>) -> Option<Self> {
                    reader.as_int().ok().and_then(|n| <$t>::try_from(n).ok())
                }
            }
        )+
    };
}

impl_cbor_primitive_int!(i8, i16, i32, i64, u8, u16, u32, u64);

impl CborPrimitive for Vec<u8> {
    fn to_cbor(&self) -> Scalar<'_> {
        Scalar::Bytes(self)
    }
    fn from_cbor(reader: &Reader<'_>) -> Option<Self> {
        reader.as_bytes().ok().map(<[u8]>::to_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbor::Writer;

    fn roundtrip<T: CborPrimitive + PartialEq + std::fmt::Debug>(value: T) {
        let mut w = Writer::new(Vec::new());
        let bytes = w.value(value.to_cbor()).unwrap();
        let reader = Reader::new(&bytes).unwrap();
        assert_eq!(T::from_cbor(&reader).unwrap(), value);
    }

    #[test]
    fn strings_round_trip() {
        roundtrip("hello".to_string());
    }

    #[test]
    fn integers_round_trip_including_negatives() {
        roundtrip(-7i32);
        roundtrip(42u64);
    }

    #[test]
    fn bool_and_float_round_trip() {
        roundtrip(true);
        roundtrip(3.5f64);
    }

    #[test]
    fn out_of_range_int_conversion_fails_gracefully() {
        let mut w = Writer::new(Vec::new());
        let bytes = w.value(Scalar::Int(300)).unwrap();
        let reader = Reader::new(&bytes).unwrap();
        assert!(u8::from_cbor(&reader).is_none());
    }
}
