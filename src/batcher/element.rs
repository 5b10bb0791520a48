use crate::blend::BlendMode;
use crate::geometry::{GeometryRef, Topology};
use crate::math::{Bounds, Matrix};
use crate::texture::TextureRef;

/// Vertex data an element contributes to a batch.
#[derive(Debug, Clone)]
pub enum ElementGeometry {
    /// Four corners of `bounds`, uvs taken from the texture frame.
    Quad { bounds: Bounds },
    /// A slice of a shared tessellated geometry.
    Mesh {
        geometry: GeometryRef,
        attribute_offset: usize,
        attribute_size: usize,
        index_offset: usize,
        index_size: usize,
    },
}

impl ElementGeometry {
    /// A mesh element covering all of `geometry`.
    pub fn whole_mesh(geometry: GeometryRef) -> Self {
        let attribute_size = geometry.vertex_count();
        let index_size = geometry.index_count();
        ElementGeometry::Mesh {
            geometry,
            attribute_offset: 0,
            attribute_size,
            index_offset: 0,
            index_size,
        }
    }

    /// Vertices contributed.
    pub fn attribute_size(&self) -> usize {
        match self {
            ElementGeometry::Quad { .. } => 4,
            ElementGeometry::Mesh { attribute_size, .. } => *attribute_size,
        }
    }

    /// Indices contributed.
    pub fn index_size(&self) -> usize {
        match self {
            ElementGeometry::Quad { .. } => 6,
            ElementGeometry::Mesh { index_size, .. } => *index_size,
        }
    }
}

/// One draw primitive submitted to the batcher.
///
/// The public fields describe what to draw; the batcher fills in where it
/// landed (buffer offsets, texture slot, owning batch) when it packs.
#[derive(Debug, Clone)]
pub struct BatchableElement {
    pub texture: TextureRef,
    pub blend_mode: BlendMode,
    pub topology: Topology,
    /// Transform into render-group space
    pub transform: Matrix,
    /// Tint and alpha as `0xAABBGGRR`
    pub color: u32,
    pub round_pixels: bool,
    pub geometry: ElementGeometry,

    pub(crate) attribute_start: usize,
    pub(crate) index_start: usize,
    pub(crate) texture_id: u16,
    pub(crate) batch: Option<usize>,
}

impl BatchableElement {
    /// A textured quad covering `bounds`.
    pub fn quad(texture: TextureRef, bounds: Bounds) -> Self {
        Self::new(texture, ElementGeometry::Quad { bounds }, Topology::TriangleList)
    }

    /// A textured mesh slice.
    pub fn mesh(texture: TextureRef, geometry: ElementGeometry, topology: Topology) -> Self {
        Self::new(texture, geometry, topology)
    }

    fn new(texture: TextureRef, geometry: ElementGeometry, topology: Topology) -> Self {
        Self {
            texture,
            blend_mode: BlendMode::Normal,
            topology,
            transform: Matrix::IDENTITY,
            color: 0xFFFF_FFFF,
            round_pixels: false,
            geometry,
            attribute_start: 0,
            index_start: 0,
            texture_id: 0,
            batch: None,
        }
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_transform(mut self, transform: Matrix) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    /// Vertices contributed.
    pub fn attribute_size(&self) -> usize {
        self.geometry.attribute_size()
    }

    /// Indices contributed.
    pub fn index_size(&self) -> usize {
        self.geometry.index_size()
    }

    /// Texture slot assigned at pack time.
    pub fn texture_id(&self) -> u16 {
        self.texture_id
    }

    /// Index of the batch this element was packed into.
    pub fn batch(&self) -> Option<usize> {
        self.batch
    }

    /// First index of this element in the shared index buffer.
    pub fn index_start(&self) -> usize {
        self.index_start
    }
}
