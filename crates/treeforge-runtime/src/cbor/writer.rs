//! Streaming CBOR writer over an arbitrary [`std::io::Write`] sink.
//!
//! Unlike [`super::reader::Reader`], the writer never buffers a tree in
//! memory: a [`Writer`] hands out [`MapWriter`]/[`ArrayWriter`] handles that
//! write directly to the sink as each field or element is pushed. Only one
//! handle is ever "active" at a time; writing through a handle that has
//! since had a nested container opened and not yet closed is a programmer
//! error reported as [`CodecError::ShadowedHandle`] rather than silently
//! reordering bytes.
//!
//! Two deliberate simplifications relative to the general RFC 7049 grammar:
//! strings are always written definite-length, and floats are always
//! written as major-7 doubles (`0xFB`), even when the value would round-trip
//! through a narrower encoding. This keeps the writer's output shape fixed
//! and trivially greppable in a hex dump.

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use crate::error::{CodecError, CodecResult};

const BREAK: u8 = 0xFF;

struct State<W> {
    sink: W,
    depth: u32,
}

/// Entry point for writing a single CBOR value tree to `W`.
pub struct Writer<W: io::Write> {
    state: Rc<RefCell<State<W>>>,
}

impl<W: io::Write> Writer<W> {
    /// Wrap `sink`. Nothing is written until the first container is opened
    /// or a bare scalar is written with [`Writer::value`].
    pub fn new(sink: W) -> Self {
        Writer {
            state: Rc::new(RefCell::new(State { sink, depth: 0 })),
        }
    }

    /// Begin the top-level map. The returned [`MapWriter`] must be
    /// [`MapWriter::finish`]ed before [`Writer::into_inner`] will succeed.
    pub fn start_root_map(&mut self) -> CodecResult<MapWriter<W>> {
        {
            let mut state = self.state.borrow_mut();
            state.sink.write_all(&[0xBF])?;
            state.depth += 1;
        }
        Ok(MapWriter {
            state: self.state.clone(),
            depth: 1,
            closed: false,
        })
    }

    /// Begin the top-level array.
    pub fn start_root_array(&mut self) -> CodecResult<ArrayWriter<W>> {
        {
            let mut state = self.state.borrow_mut();
            state.sink.write_all(&[0x9F])?;
            state.depth += 1;
        }
        Ok(ArrayWriter {
            state: self.state.clone(),
            depth: 1,
            closed: false,
        })
    }

    /// Write a single scalar as the entire document (no surrounding
    /// container). Mutually exclusive with `start_root_map`/`start_root_array`.
    pub fn value(self, value: Scalar<'_>) -> CodecResult<W> {
        {
            let mut state = self.state.borrow_mut();
            write_scalar(&mut state.sink, value)?;
        }
        self.into_inner()
    }

    /// Recover the underlying sink. Errors if any handle is still open,
    /// whether it's still live at the call site or was simply never
    /// finished before being dropped.
    pub fn into_inner(self) -> CodecResult<W> {
        let state = match Rc::try_unwrap(self.state) {
            Ok(cell) => cell.into_inner(),
            Err(_) => return Err(CodecError::ShadowedHandle),
        };
        if state.depth != 0 {
            return Err(CodecError::ShadowedHandle);
        }
        Ok(state.sink)
    }
}

/// A scalar value writable through [`MapWriter`]/[`ArrayWriter`].
#[derive(Debug, Clone, Copy)]
pub enum Scalar<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(&'a [u8]),
    Text(&'a str),
}

fn write_length(sink: &mut impl io::Write, major: u8, n: u64) -> io::Result<()> {
    let head = major << 5;
    if n <= 23 {
        sink.write_all(&[head | n as u8])
    } else if let Ok(n) = u8::try_from(n) {
        sink.write_all(&[head | 24, n])
    } else if let Ok(n) = u16::try_from(n) {
        sink.write_all(&[head | 25])?;
        sink.write_all(&n.to_be_bytes())
    } else if let Ok(n) = u32::try_from(n) {
        sink.write_all(&[head | 26])?;
        sink.write_all(&n.to_be_bytes())
    } else {
        sink.write_all(&[head | 27])?;
        sink.write_all(&n.to_be_bytes())
    }
}

fn write_int(sink: &mut impl io::Write, n: i64) -> io::Result<()> {
    if n >= 0 {
        write_length(sink, 0, n as u64)
    } else {
        // value = -1 - n  =>  n = -1 - value
        let magnitude = (-1i128 - n as i128) as u64;
        write_length(sink, 1, magnitude)
    }
}

fn write_scalar(sink: &mut impl io::Write, value: Scalar<'_>) -> io::Result<()> {
    match value {
        Scalar::Null => sink.write_all(&[0xF6]),
        Scalar::Bool(false) => sink.write_all(&[0xF4]),
        Scalar::Bool(true) => sink.write_all(&[0xF5]),
        Scalar::Int(n) => write_int(sink, n),
        Scalar::Float(f) => {
            sink.write_all(&[0xFB])?;
            sink.write_all(&f.to_bits().to_be_bytes())
        }
        Scalar::Bytes(b) => {
            write_length(sink, 2, b.len() as u64)?;
            sink.write_all(b)
        }
        Scalar::Text(s) => {
            write_length(sink, 3, s.len() as u64)?;
            sink.write_all(s.as_bytes())
        }
    }
}

/// A handle for writing the key/value pairs of one open map.
///
/// Opening a nested container (`start_map`/`start_array`) shadows this
/// handle until the child is [`MapWriter::finish`]/[`ArrayWriter::finish`]ed:
/// any write attempted on `self` in the meantime returns
/// [`CodecError::ShadowedHandle`].
pub struct MapWriter<W: io::Write> {
    state: Rc<RefCell<State<W>>>,
    depth: u32,
    closed: bool,
}

impl<W: io::Write> MapWriter<W> {
    fn check_active(&self) -> CodecResult<()> {
        if self.closed || self.state.borrow().depth != self.depth {
            return Err(CodecError::ShadowedHandle);
        }
        Ok(())
    }

    fn write_key(&mut self, key: &str) -> CodecResult<()> {
        self.check_active()?;
        let mut state = self.state.borrow_mut();
        write_length(&mut state.sink, 3, key.len() as u64)?;
        state.sink.write_all(key.as_bytes())?;
        Ok(())
    }

    /// Write `key: value` for a scalar value.
    pub fn entry(&mut self, key: &str, value: Scalar<'_>) -> CodecResult<()> {
        self.write_key(key)?;
        let mut state = self.state.borrow_mut();
        write_scalar(&mut state.sink, value)?;
        Ok(())
    }

    /// Begin a nested map under `key`. `self` is shadowed until the
    /// returned handle is finished.
    pub fn start_map(&mut self, key: &str) -> CodecResult<MapWriter<W>> {
        self.write_key(key)?;
        let child_depth = {
            let mut state = self.state.borrow_mut();
            state.sink.write_all(&[0xBF])?;
            state.depth += 1;
            state.depth
        };
        Ok(MapWriter {
            state: self.state.clone(),
            depth: child_depth,
            closed: false,
        })
    }

    /// Begin a nested array under `key`.
    pub fn start_array(&mut self, key: &str) -> CodecResult<ArrayWriter<W>> {
        self.write_key(key)?;
        let child_depth = {
            let mut state = self.state.borrow_mut();
            state.sink.write_all(&[0x9F])?;
            state.depth += 1;
            state.depth
        };
        Ok(ArrayWriter {
            state: self.state.clone(),
            depth: child_depth,
            closed: false,
        })
    }

    /// Close this map, writing the break byte and un-shadowing the parent.
    pub fn finish(mut self) -> CodecResult<()> {
        self.check_active()?;
        let mut state = self.state.borrow_mut();
        state.sink.write_all(&[BREAK])?;
        state.depth -= 1;
        drop(state);
        self.closed = true;
        Ok(())
    }
}

/// A handle for writing the elements of one open array. Mirrors
/// [`MapWriter`]'s shadowing rules.
pub struct ArrayWriter<W: io::Write> {
    state: Rc<RefCell<State<W>>>,
    depth: u32,
    closed: bool,
}

impl<W: io::Write> ArrayWriter<W> {
    fn check_active(&self) -> CodecResult<()> {
        if self.closed || self.state.borrow().depth != self.depth {
            return Err(CodecError::ShadowedHandle);
        }
        Ok(())
    }

    /// Push a scalar element.
    pub fn push(&mut self, value: Scalar<'_>) -> CodecResult<()> {
        self.check_active()?;
        let mut state = self.state.borrow_mut();
        write_scalar(&mut state.sink, value)?;
        Ok(())
    }

    /// Begin a nested map element. `self` is shadowed until finished.
    pub fn start_map(&mut self) -> CodecResult<MapWriter<W>> {
        self.check_active()?;
        let child_depth = {
            let mut state = self.state.borrow_mut();
            state.sink.write_all(&[0xBF])?;
            state.depth += 1;
            state.depth
        };
        Ok(MapWriter {
            state: self.state.clone(),
            depth: child_depth,
            closed: false,
        })
    }

    /// Begin a nested array element.
    pub fn start_array(&mut self) -> CodecResult<ArrayWriter<W>> {
        self.check_active()?;
        let child_depth = {
            let mut state = self.state.borrow_mut();
            state.sink.write_all(&[0x9F])?;
            state.depth += 1;
            state.depth
        };
        Ok(ArrayWriter {
            state: self.state.clone(),
            depth: child_depth,
            closed: false,
        })
    }

    /// Close this array, writing the break byte and un-shadowing the parent.
    pub fn finish(mut self) -> CodecResult<()> {
        self.check_active()?;
        let mut state = self.state.borrow_mut();
        state.sink.write_all(&[BREAK])?;
        state.depth -= 1;
        drop(state);
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cbor::reader::Reader;

    #[test]
    fn writes_flat_map_roundtrip() {
        let mut w = Writer::new(Vec::new());
        let mut map = w.start_root_map().unwrap();
        map.entry("name", Scalar::Text("brook")).unwrap();
        map.entry("age", Scalar::Int(7)).unwrap();
        map.entry("nocturnal", Scalar::Bool(false)).unwrap();
        map.finish().unwrap();
        let bytes = w.into_inner().unwrap();

        let r = Reader::new(&bytes).unwrap();
        let view = r.as_map().unwrap();
        assert_eq!(view.get("name").unwrap().as_text().unwrap(), "brook");
        assert_eq!(view.get("age").unwrap().as_int().unwrap(), 7);
        assert!(!view.get("nocturnal").unwrap().as_bool().unwrap());
    }

    #[test]
    fn writes_nested_array_in_map() {
        let mut w = Writer::new(Vec::new());
        let mut map = w.start_root_map().unwrap();
        let mut arr = map.start_array("tags").unwrap();
        arr.push(Scalar::Text("a")).unwrap();
        arr.push(Scalar::Text("b")).unwrap();
        arr.finish().unwrap();
        map.finish().unwrap();
        let bytes = w.into_inner().unwrap();

        let r = Reader::new(&bytes).unwrap();
        let tags = r.as_map().unwrap().get("tags").unwrap().as_array().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get(1).unwrap().as_text().unwrap(), "b");
    }

    #[test]
    fn shadowed_parent_handle_rejects_writes() {
        let mut w = Writer::new(Vec::new());
        let mut map = w.start_root_map().unwrap();
        let child = map.start_map("inner").unwrap();
        // `map` is shadowed while `child` is open.
        let err = map.entry("oops", Scalar::Null).unwrap_err();
        assert!(matches!(err, CodecError::ShadowedHandle));
        child.finish().unwrap();
        map.finish().unwrap();
    }

    #[test]
    fn into_inner_rejects_unclosed_handles() {
        let mut w = Writer::new(Vec::new());
        let _map = w.start_root_map().unwrap();
        let err = w.into_inner().unwrap_err();
        assert!(matches!(err, CodecError::ShadowedHandle));
    }

    #[test]
    fn negative_and_large_integers_roundtrip() {
        let mut w = Writer::new(Vec::new());
        let mut arr = w.start_root_array().unwrap();
        arr.push(Scalar::Int(-1)).unwrap();
        arr.push(Scalar::Int(i64::MIN)).unwrap();
        arr.push(Scalar::Int(i64::MAX)).unwrap();
        arr.finish().unwrap();
        let bytes = w.into_inner().unwrap();

        let r = Reader::new(&bytes).unwrap();
        let view = r.as_array().unwrap();
        assert_eq!(view.get(0).unwrap().as_int().unwrap(), -1);
        assert_eq!(view.get(1).unwrap().as_int().unwrap(), i64::MIN);
        assert_eq!(view.get(2).unwrap().as_int().unwrap(), i64::MAX);
    }
}
