//! Packed vertex layout shared by every batch.

/// One packed vertex as the shader reads it.
///
/// The attribute buffer is a flat run of these, written word by word.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BatchVertex {
    /// Position in render-group space
    pub position: [f32; 2],
    /// Texture coordinates
    pub uv: [f32; 2],
    /// Tint and alpha as `0xAABBGGRR`
    pub color: u32,
    /// Texture slot in the high 16 bits, round-pixels flag in the low 16
    pub texture_id_and_round: u32,
}

/// Size of one vertex in 32-bit words.
pub const VERTEX_SIZE: usize = std::mem::size_of::<BatchVertex>() / 4;

impl BatchVertex {
    /// Texture slot this vertex samples from.
    pub fn texture_id(&self) -> u16 {
        (self.texture_id_and_round >> 16) as u16
    }

    pub fn round_pixels(&self) -> bool {
        self.texture_id_and_round & 0xFFFF != 0
    }
}

/// Pack a texture slot and the round-pixels flag into one word.
pub fn pack_texture_id(texture_id: u16, round_pixels: bool) -> u32 {
    ((texture_id as u32) << 16) | (round_pixels as u32)
}

/// Index pattern for a quad laid out top-left, top-right, bottom-right, bottom-left.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_size() {
        assert_eq!(std::mem::size_of::<BatchVertex>(), 24);
        assert_eq!(VERTEX_SIZE, 6);
    }

    #[test]
    fn test_texture_id_packing() {
        let v = BatchVertex {
            texture_id_and_round: pack_texture_id(7, true),
            ..BatchVertex::default()
        };
        assert_eq!(v.texture_id(), 7);
        assert!(v.round_pixels());
    }
}
