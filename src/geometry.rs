//! Pre-triangulated geometry handed to the scene by the tessellator.
//!
//! The scene never triangulates. Shapes arrive as flat position/uv/index
//! arrays tagged with a [`Topology`]; graphics views slice a shared geometry
//! into [`GraphicsPart`]s, one per texture/topology run.

use std::rc::Rc;

use crate::texture::TextureRef;

/// GPU primitive assembly mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Topology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Flat vertex data for one drawable shape.
///
/// `positions` and `uvs` are interleaved `x, y` pairs; `indices` refer to
/// vertices in this geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<f32>,
    pub uvs: Vec<f32>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Geometry {
    pub fn new(positions: Vec<f32>, uvs: Vec<f32>, indices: Vec<u32>, topology: Topology) -> Self {
        Self {
            positions,
            uvs,
            indices,
            topology,
        }
    }

    /// A `width` x `height` rectangle as two triangles.
    pub fn rectangle(width: f32, height: f32) -> Self {
        Self::new(
            vec![0.0, 0.0, width, 0.0, width, height, 0.0, height],
            vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0],
            vec![0, 1, 2, 0, 2, 3],
            Topology::TriangleList,
        )
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 2
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// A run of a shared geometry drawn with a single texture and topology.
#[derive(Debug, Clone)]
pub struct GraphicsPart {
    pub texture: TextureRef,
    pub topology: Topology,
    /// First vertex of this part in the shared geometry.
    pub attribute_offset: usize,
    pub attribute_size: usize,
    /// First index of this part in the shared geometry.
    pub index_offset: usize,
    pub index_size: usize,
}

impl GraphicsPart {
    /// A part spanning all of `geometry`.
    pub fn whole(geometry: &Geometry, texture: TextureRef) -> Self {
        Self {
            texture,
            topology: geometry.topology,
            attribute_offset: 0,
            attribute_size: geometry.vertex_count(),
            index_offset: 0,
            index_size: geometry.index_count(),
        }
    }
}

/// Shared, immutable geometry.
pub type GeometryRef = Rc<Geometry>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_counts() {
        let g = Geometry::rectangle(4.0, 2.0);
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(g.index_count(), 6);
        assert_eq!(g.topology, Topology::TriangleList);
    }
}
