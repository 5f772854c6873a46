//! Growable command buffer
//!
//! Two append-only streams: packed little-endian scalars (opcodes and their
//! numeric payloads) and out-of-line shared objects. Every object slot also
//! leaves a marker byte in the scalar stream, so a reader walking the scalar
//! stream always knows when to take the next object and both streams replay
//! in call order.

use std::sync::Arc;

use quill_core::{Effect, Font, Image, Paint};

use crate::error::{CanvasError, ReplayError, Result, Stream};
use crate::opcode::Opcode;
use crate::path::PathData;

/// Scalar-stream byte standing in for one object slot
pub const OBJECT_MARKER: u8 = 0xA5;

/// Smallest step by which the value stream grows
const MIN_VALUE_GROWTH: usize = 64;
const MIN_OBJECT_GROWTH: usize = 8;

/// An out-of-line payload referenced from the scalar stream.
///
/// Payloads are immutable shared handles, so the producer can keep
/// changing its own attributes after recording.
#[derive(Clone, Debug, PartialEq)]
pub enum BufferObject {
    Paint(Arc<Paint>),
    Dashes(Option<Arc<[f64]>>),
    Font(Arc<Font>),
    Effect(Option<Arc<Effect>>),
    Path(Arc<PathData>),
    Image(Image),
    Text(Arc<str>),
    Pixels(Arc<[u8]>),
}

impl BufferObject {
    pub fn kind(&self) -> &'static str {
        match self {
            BufferObject::Paint(_) => "paint",
            BufferObject::Dashes(_) => "dashes",
            BufferObject::Font(_) => "font",
            BufferObject::Effect(_) => "effect",
            BufferObject::Path(_) => "path",
            BufferObject::Image(_) => "image",
            BufferObject::Text(_) => "text",
            BufferObject::Pixels(_) => "pixels",
        }
    }
}

/// Append-only opcode store handed from the recorder to a renderer
#[derive(Debug, Default)]
pub struct CommandBuffer {
    values: Vec<u8>,
    objects: Vec<BufferObject>,
    read_value: usize,
    read_object: usize,
}

impl CommandBuffer {
    /// An empty buffer that has not allocated yet
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer with room for `values` scalar bytes and `objects` objects
    pub fn with_capacity(values: usize, objects: usize) -> Result<Self> {
        let mut buffer = Self::new();
        buffer.reserve_values(values)?;
        buffer.reserve_objects(objects)?;
        Ok(buffer)
    }

    fn reserve_values(&mut self, additional: usize) -> Result<()> {
        if self.values.capacity() - self.values.len() >= additional {
            return Ok(());
        }
        let grow = additional
            .max(self.values.capacity())
            .max(MIN_VALUE_GROWTH);
        self.values
            .try_reserve_exact(grow)
            .map_err(|source| CanvasError::BufferExhausted {
                stream: Stream::Values,
                additional: grow,
                source,
            })?;
        tracing::trace!(
            capacity = self.values.capacity(),
            "grew command buffer value stream"
        );
        Ok(())
    }

    fn reserve_objects(&mut self, additional: usize) -> Result<()> {
        if self.objects.capacity() - self.objects.len() >= additional {
            return Ok(());
        }
        let grow = additional
            .max(self.objects.capacity())
            .max(MIN_OBJECT_GROWTH);
        self.objects
            .try_reserve_exact(grow)
            .map_err(|source| CanvasError::BufferExhausted {
                stream: Stream::Objects,
                additional: grow,
                source,
            })?;
        tracing::trace!(
            capacity = self.objects.capacity(),
            "grew command buffer object stream"
        );
        Ok(())
    }

    fn put_bytes<const N: usize>(&mut self, bytes: [u8; N]) -> Result<()> {
        self.reserve_values(N)?;
        self.values.extend_from_slice(&bytes);
        Ok(())
    }

    // === Writing ===

    pub fn put_byte(&mut self, value: u8) -> Result<()> {
        self.put_bytes([value])
    }

    pub fn put_opcode(&mut self, opcode: Opcode) -> Result<()> {
        self.put_byte(opcode.as_u8())
    }

    pub fn put_boolean(&mut self, value: bool) -> Result<()> {
        self.put_byte(value as u8)
    }

    pub fn put_int(&mut self, value: i32) -> Result<()> {
        self.put_bytes(value.to_le_bytes())
    }

    pub fn put_float(&mut self, value: f32) -> Result<()> {
        self.put_bytes(value.to_le_bytes())
    }

    pub fn put_double(&mut self, value: f64) -> Result<()> {
        self.put_bytes(value.to_le_bytes())
    }

    pub fn put_object(&mut self, object: BufferObject) -> Result<()> {
        self.reserve_objects(1)?;
        self.reserve_values(1)?;
        self.objects.push(object);
        self.values.push(OBJECT_MARKER);
        Ok(())
    }

    /// Bytes written to the scalar stream
    pub fn write_value_position(&self) -> usize {
        self.values.len()
    }

    /// Objects written to the object stream
    pub fn write_object_position(&self) -> usize {
        self.objects.len()
    }

    pub fn value_capacity(&self) -> usize {
        self.values.capacity()
    }

    pub fn object_capacity(&self) -> usize {
        self.objects.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Rewind both streams to zero, keeping the allocations
    pub fn reset(&mut self) {
        self.values.clear();
        self.objects.clear();
        self.read_value = 0;
        self.read_object = 0;
    }

    /// Move everything from `other` to the end of this buffer.
    ///
    /// `other` is left empty on success and untouched on failure.
    pub fn append(&mut self, other: &mut CommandBuffer) -> Result<()> {
        self.reserve_values(other.values.len())?;
        self.reserve_objects(other.objects.len())?;
        self.values.append(&mut other.values);
        self.objects.append(&mut other.objects);
        other.reset();
        Ok(())
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    pub fn objects(&self) -> &[BufferObject] {
        &self.objects
    }

    // === Reading ===

    pub fn has_values(&self) -> bool {
        self.read_value < self.values.len()
    }

    pub fn read_value_position(&self) -> usize {
        self.read_value
    }

    pub fn rewind_read(&mut self) {
        self.read_value = 0;
        self.read_object = 0;
    }

    /// Look at a scalar byte without moving the read cursor
    pub fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.values.get(offset).copied()
    }

    fn take<const N: usize>(&mut self) -> std::result::Result<[u8; N], ReplayError> {
        let start = self.read_value;
        let available = self.values.len() - start;
        if available < N {
            return Err(ReplayError::Truncated {
                offset: start,
                needed: N - available,
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.values[start..start + N]);
        self.read_value += N;
        Ok(out)
    }

    pub fn get_byte(&mut self) -> std::result::Result<u8, ReplayError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn get_boolean(&mut self) -> std::result::Result<bool, ReplayError> {
        Ok(self.get_byte()? != 0)
    }

    pub fn get_int(&mut self) -> std::result::Result<i32, ReplayError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    pub fn get_float(&mut self) -> std::result::Result<f32, ReplayError> {
        Ok(f32::from_le_bytes(self.take()?))
    }

    pub fn get_double(&mut self) -> std::result::Result<f64, ReplayError> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    /// Take the next object; the scalar stream must be at an object slot
    pub fn get_object(&mut self) -> std::result::Result<BufferObject, ReplayError> {
        let offset = self.read_value;
        if self.get_byte()? != OBJECT_MARKER {
            return Err(ReplayError::ObjectMismatch {
                offset,
                expected: "object marker",
            });
        }
        let index = self.read_object;
        let object = self
            .objects
            .get(index)
            .cloned()
            .ok_or(ReplayError::MissingObject { index })?;
        self.read_object += 1;
        Ok(object)
    }
}
