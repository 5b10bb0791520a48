//! Growable attribute and index storage shared by all batches of a batcher.

use super::vertex::{BatchVertex, VERTEX_SIZE};

/// Interleaved vertex attributes stored as raw 32-bit words.
///
/// Floats are written through their bit patterns, so growing the buffer is a
/// plain word copy that preserves everything already packed.
#[derive(Debug, Clone)]
pub struct AttributeBuffer {
    words: Vec<u32>,
}

impl AttributeBuffer {
    /// A zeroed buffer holding `vertices` vertices.
    pub fn with_vertices(vertices: usize) -> Self {
        Self {
            words: vec![0; vertices.max(1) * VERTEX_SIZE],
        }
    }

    /// Capacity in 32-bit words.
    pub fn len_words(&self) -> usize {
        self.words.len()
    }

    /// Make room for at least `required_words`, doubling on overflow.
    ///
    /// Returns true if the buffer was reallocated.
    pub fn ensure(&mut self, required_words: usize) -> bool {
        if required_words <= self.words.len() {
            return false;
        }
        let new_len = required_words.max(self.words.len() * 2);
        let mut words = vec![0u32; new_len];
        words[..self.words.len()].copy_from_slice(&self.words);
        log::trace!(
            "Attribute buffer grew from {} to {} words",
            self.words.len(),
            new_len
        );
        self.words = words;
        true
    }

    pub fn write_f32(&mut self, word: usize, value: f32) {
        self.words[word] = value.to_bits();
    }

    pub fn write_u32(&mut self, word: usize, value: u32) {
        self.words[word] = value;
    }

    pub fn read_f32(&self, word: usize) -> f32 {
        f32::from_bits(self.words[word])
    }

    pub fn read_u32(&self, word: usize) -> u32 {
        self.words[word]
    }

    /// The first `count` vertices as typed values.
    pub fn vertices(&self, count: usize) -> &[BatchVertex] {
        let words = count.min(self.words.len() / VERTEX_SIZE) * VERTEX_SIZE;
        bytemuck::cast_slice(&self.words[..words])
    }

    /// Raw bytes for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }
}

/// Largest vertex index a 16-bit index buffer can address.
pub const MAX_U16_INDEX: usize = u16::MAX as usize;

/// Triangle indices, promoted from 16-bit to 32-bit entries on demand.
#[derive(Debug, Clone)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// A zeroed buffer of `len` entries, narrow when it fits.
    pub fn with_len(len: usize) -> Self {
        let len = len.max(2);
        if len > MAX_U16_INDEX {
            IndexBuffer::U32(vec![0; len])
        } else {
            IndexBuffer::U16(vec![0; len])
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether entries are 32 bits wide.
    pub fn is_wide(&self) -> bool {
        matches!(self, IndexBuffer::U32(_))
    }

    /// Bytes per entry.
    pub fn bytes_per_index(&self) -> usize {
        if self.is_wide() { 4 } else { 2 }
    }

    /// Make room for `required` entries addressing up to `vertex_count` vertices.
    ///
    /// Grows by doubling. Promotes to 32-bit entries once the length or any
    /// addressable vertex exceeds the 16-bit range; existing values are
    /// copied over unchanged. Returns true if the buffer was reallocated.
    pub fn ensure(&mut self, required: usize, vertex_count: usize) -> bool {
        let needs_wide = vertex_count > MAX_U16_INDEX + 1;
        if required <= self.len() && (self.is_wide() || !needs_wide) {
            return false;
        }

        let mut new_len = required.max(self.len() * 2);
        new_len += new_len % 2;
        let wide = self.is_wide() || needs_wide || new_len > MAX_U16_INDEX;

        let resized = match (&*self, wide) {
            (IndexBuffer::U16(old), false) => {
                let mut v = vec![0u16; new_len];
                v[..old.len()].copy_from_slice(old);
                IndexBuffer::U16(v)
            }
            (IndexBuffer::U16(old), true) => {
                log::trace!("Promoting index buffer to 32-bit ({} entries)", new_len);
                let mut v = vec![0u32; new_len];
                for (dst, src) in v.iter_mut().zip(old.iter()) {
                    *dst = *src as u32;
                }
                IndexBuffer::U32(v)
            }
            (IndexBuffer::U32(old), _) => {
                let mut v = vec![0u32; new_len];
                v[..old.len()].copy_from_slice(old);
                IndexBuffer::U32(v)
            }
        };
        *self = resized;
        true
    }

    /// Store a vertex index. Narrow buffers must have been promoted first
    /// (see [`ensure`](Self::ensure)) for values above `u16::MAX`.
    pub fn set(&mut self, i: usize, value: u32) {
        match self {
            IndexBuffer::U16(v) => v[i] = value as u16,
            IndexBuffer::U32(v) => v[i] = value,
        }
    }

    pub fn get(&self, i: usize) -> u32 {
        match self {
            IndexBuffer::U16(v) => v[i] as u32,
            IndexBuffer::U32(v) => v[i],
        }
    }

    /// Raw bytes for upload.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexBuffer::U16(v) => bytemuck::cast_slice(v),
            IndexBuffer::U32(v) => bytemuck::cast_slice(v),
        }
    }
}
