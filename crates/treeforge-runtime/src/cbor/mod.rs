//! A validating, dependency-free CBOR codec (a deterministic subset of
//! RFC 7049) used to serialize and deserialize generated trees.
//!
//! [`reader`] parses a byte slice eagerly into a tree of [`Reader`] values;
//! [`writer`] streams a [`Writer`] out to any [`std::io::Write`] sink. The
//! two are independent: nothing here depends on the node/edge/annotation
//! machinery elsewhere in this crate, so the codec can be exercised (and
//! tested) on its own.

mod reader;
mod writer;

pub use reader::{ArrayView, Kind, MapView, Reader};
pub use writer::{ArrayWriter, MapWriter, Scalar, Writer};
