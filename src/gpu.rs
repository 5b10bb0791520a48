//! wgpu descriptions of batch state.
//!
//! The crate never talks to a device; these conversions let a backend build
//! its pipelines and upload buffers straight from what the batcher produced.

use wgpu::{
    BlendComponent, BlendFactor, BlendOperation, BlendState, IndexFormat, PrimitiveTopology,
    VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode,
};

use crate::batcher::{BatchVertex, IndexBuffer};
use crate::blend::BlendMode;
use crate::geometry::Topology;

impl BatchVertex {
    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<BatchVertex>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: &[
                // position
                VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: VertexFormat::Float32x2,
                },
                // uv
                VertexAttribute {
                    offset: 8,
                    shader_location: 1,
                    format: VertexFormat::Float32x2,
                },
                // color
                VertexAttribute {
                    offset: 16,
                    shader_location: 2,
                    format: VertexFormat::Unorm8x4,
                },
                // texture id and round flag
                VertexAttribute {
                    offset: 20,
                    shader_location: 3,
                    format: VertexFormat::Uint16x2,
                },
            ],
        }
    }
}

impl From<Topology> for PrimitiveTopology {
    fn from(topology: Topology) -> Self {
        match topology {
            Topology::PointList => PrimitiveTopology::PointList,
            Topology::LineList => PrimitiveTopology::LineList,
            Topology::LineStrip => PrimitiveTopology::LineStrip,
            Topology::TriangleList => PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => PrimitiveTopology::TriangleStrip,
        }
    }
}

impl IndexBuffer {
    pub fn format(&self) -> IndexFormat {
        if self.is_wide() {
            IndexFormat::Uint32
        } else {
            IndexFormat::Uint16
        }
    }
}

const fn component(src: BlendFactor, dst: BlendFactor) -> BlendComponent {
    BlendComponent {
        src_factor: src,
        dst_factor: dst,
        operation: BlendOperation::Add,
    }
}

impl BlendMode {
    /// Blend state for premultiplied-alpha color targets. `None` disables
    /// blending.
    pub fn blend_state(self) -> Option<BlendState> {
        let (color, alpha) = match self.or_normal() {
            BlendMode::Normal | BlendMode::Inherit => (
                component(BlendFactor::One, BlendFactor::OneMinusSrcAlpha),
                component(BlendFactor::One, BlendFactor::OneMinusSrcAlpha),
            ),
            BlendMode::Add => (
                component(BlendFactor::One, BlendFactor::One),
                component(BlendFactor::One, BlendFactor::One),
            ),
            BlendMode::Multiply => (
                component(BlendFactor::Dst, BlendFactor::OneMinusSrcAlpha),
                component(BlendFactor::One, BlendFactor::OneMinusSrcAlpha),
            ),
            BlendMode::Screen => (
                component(BlendFactor::One, BlendFactor::OneMinusSrc),
                component(BlendFactor::One, BlendFactor::OneMinusSrcAlpha),
            ),
            BlendMode::Erase => (
                component(BlendFactor::Zero, BlendFactor::OneMinusSrcAlpha),
                component(BlendFactor::Zero, BlendFactor::OneMinusSrcAlpha),
            ),
            BlendMode::None => return None,
        };
        Some(BlendState { color, alpha })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_covers_vertex() {
        let desc = BatchVertex::desc();
        assert_eq!(desc.array_stride, 24);
        assert_eq!(desc.attributes.len(), 4);
    }

    #[test]
    fn test_index_format_follows_width() {
        let mut buffer = IndexBuffer::with_len(6);
        assert_eq!(buffer.format(), IndexFormat::Uint16);
        buffer.ensure(6, 70_000);
        assert_eq!(buffer.format(), IndexFormat::Uint32);
    }

    #[test]
    fn test_blend_none_disables_blending() {
        assert!(BlendMode::None.blend_state().is_none());
        assert_eq!(
            BlendMode::Inherit.blend_state(),
            BlendMode::Normal.blend_state()
        );
    }
}
