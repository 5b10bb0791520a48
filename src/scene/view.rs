//! Renderable content attached to a node.

use crate::batcher::{BatchableElement, ElementGeometry};
use crate::blend::BlendMode;
use crate::error::{SceneError, SceneResult};
use crate::geometry::{Geometry, GeometryRef, GraphicsPart, Topology};
use crate::math::{Bounds, Matrix, Point};
use crate::texture::TextureRef;

/// Meshes with more vertices than this are drawn through their own pipe.
pub const MESH_BATCH_VERTEX_LIMIT: usize = 100;

/// Pipes a view can be drawn through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPipe {
    Sprite,
    Graphics,
    Mesh,
}

impl RenderPipe {
    pub fn id(self) -> &'static str {
        match self {
            RenderPipe::Sprite => "sprite",
            RenderPipe::Graphics => "graphics",
            RenderPipe::Mesh => "mesh",
        }
    }
}

/// What a node draws.
#[derive(Debug, Clone)]
pub enum View {
    /// A textured quad; `anchor` is the normalized point placed at the origin.
    Sprite { texture: TextureRef, anchor: Point },
    /// Tessellated shapes; each part is one texture/topology run.
    Graphics {
        geometry: GeometryRef,
        parts: Vec<GraphicsPart>,
    },
    /// Arbitrary geometry drawn with one texture.
    Mesh {
        geometry: GeometryRef,
        texture: TextureRef,
    },
}

impl View {
    pub fn sprite(texture: TextureRef) -> Self {
        View::Sprite {
            texture,
            anchor: Point::ZERO,
        }
    }

    pub fn pipe(&self) -> RenderPipe {
        match self {
            View::Sprite { .. } => RenderPipe::Sprite,
            View::Graphics { .. } => RenderPipe::Graphics,
            View::Mesh { .. } => RenderPipe::Mesh,
        }
    }

    /// Whether the view goes through the batcher.
    pub fn is_batched(&self) -> bool {
        match self {
            View::Sprite { .. } | View::Graphics { .. } => true,
            View::Mesh { geometry, .. } => {
                geometry.topology == Topology::TriangleList
                    && geometry.vertex_count() <= MESH_BATCH_VERTEX_LIMIT
            }
        }
    }

    /// Check that every part stays inside its geometry and that each index
    /// refers to a vertex of its own part.
    pub fn validate(&self) -> SceneResult<()> {
        match self {
            View::Sprite { .. } => Ok(()),
            View::Graphics { geometry, parts } => {
                parts.iter().enumerate().try_for_each(|(i, part)| {
                    check_part(
                        geometry,
                        i,
                        (part.attribute_offset, part.attribute_size),
                        (part.index_offset, part.index_size),
                    )
                })
            }
            View::Mesh { geometry, .. } => check_part(
                geometry,
                0,
                (0, geometry.vertex_count()),
                (0, geometry.index_count()),
            ),
        }
    }

    /// Bounds in the node's local space.
    pub fn bounds(&self) -> Bounds {
        match self {
            View::Sprite { texture, anchor } => sprite_bounds(texture, *anchor),
            View::Graphics { geometry, .. } | View::Mesh { geometry, .. } => {
                let mut bounds = Bounds::EMPTY;
                bounds.add_vertices(
                    &geometry.positions,
                    0,
                    geometry.vertex_count(),
                    &Matrix::IDENTITY,
                );
                bounds
            }
        }
    }

    /// Batcher elements for this view, or none when it is not batched.
    pub(crate) fn elements(
        &self,
        transform: Matrix,
        color: u32,
        blend_mode: BlendMode,
    ) -> Vec<BatchableElement> {
        if !self.is_batched() {
            return Vec::new();
        }
        let elements = match self {
            View::Sprite { texture, anchor } => {
                vec![BatchableElement::quad(
                    texture.clone(),
                    sprite_bounds(texture, *anchor),
                )]
            }
            View::Graphics { geometry, parts } => parts
                .iter()
                .map(|part| {
                    BatchableElement::mesh(
                        part.texture.clone(),
                        ElementGeometry::Mesh {
                            geometry: geometry.clone(),
                            attribute_offset: part.attribute_offset,
                            attribute_size: part.attribute_size,
                            index_offset: part.index_offset,
                            index_size: part.index_size,
                        },
                        part.topology,
                    )
                })
                .collect(),
            View::Mesh { geometry, texture } => vec![BatchableElement::mesh(
                texture.clone(),
                ElementGeometry::whole_mesh(geometry.clone()),
                geometry.topology,
            )],
        };

        elements
            .into_iter()
            .map(|e| {
                e.with_transform(transform)
                    .with_color(color)
                    .with_blend_mode(blend_mode)
            })
            .collect()
    }

    /// Texture uids in element order, used to decide whether a view swap can
    /// be repacked in place.
    pub(crate) fn texture_uids(&self) -> Vec<u64> {
        match self {
            View::Sprite { texture, .. } | View::Mesh { texture, .. } => vec![texture.uid()],
            View::Graphics { parts, .. } => parts.iter().map(|p| p.texture.uid()).collect(),
        }
    }

    /// `(vertices, indices, topology)` per element.
    pub(crate) fn element_sizes(&self) -> Vec<(usize, usize, Topology)> {
        match self {
            View::Sprite { .. } => vec![(4, 6, Topology::TriangleList)],
            View::Graphics { parts, .. } => parts
                .iter()
                .map(|p| (p.attribute_size, p.index_size, p.topology))
                .collect(),
            View::Mesh { geometry, .. } => vec![(
                geometry.vertex_count(),
                geometry.index_count(),
                geometry.topology,
            )],
        }
    }

    /// Whether `other` occupies exactly the same batch slots as `self`.
    pub(crate) fn is_layout_compatible(&self, other: &View) -> bool {
        self.is_batched() == other.is_batched()
            && self.texture_uids() == other.texture_uids()
            && self.element_sizes() == other.element_sizes()
    }
}

/// Validate one `(offset, size)` vertex range and index range of `geometry`.
fn check_part(
    geometry: &Geometry,
    part: usize,
    (attribute_offset, attribute_size): (usize, usize),
    (index_offset, index_size): (usize, usize),
) -> SceneResult<()> {
    let invalid = |reason: String| SceneError::InvalidGeometry { part, reason };

    if geometry.uvs.len() < geometry.positions.len() {
        return Err(invalid(format!(
            "{} uv values for {} position values",
            geometry.uvs.len(),
            geometry.positions.len()
        )));
    }
    let vertex_end = attribute_offset
        .checked_add(attribute_size)
        .filter(|end| *end <= geometry.vertex_count())
        .ok_or_else(|| {
            invalid(format!(
                "vertices {}+{} exceed {}",
                attribute_offset,
                attribute_size,
                geometry.vertex_count()
            ))
        })?;
    let index_end = index_offset
        .checked_add(index_size)
        .filter(|end| *end <= geometry.index_count())
        .ok_or_else(|| {
            invalid(format!(
                "indices {}+{} exceed {}",
                index_offset,
                index_size,
                geometry.index_count()
            ))
        })?;

    let range = attribute_offset..vertex_end;
    match geometry.indices[index_offset..index_end]
        .iter()
        .find(|index| !range.contains(&(**index as usize)))
    {
        Some(index) => Err(invalid(format!(
            "index {} is outside vertices {:?}",
            index, range
        ))),
        None => Ok(()),
    }
}

fn sprite_bounds(texture: &TextureRef, anchor: Point) -> Bounds {
    let frame = texture.frame();
    let (w, h) = (frame.width, frame.height);
    Bounds::new(
        -anchor.x * w,
        -anchor.y * h,
        (1.0 - anchor.x) * w,
        (1.0 - anchor.y) * h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::Texture;
    use crate::uid::UidCounter;
    use std::rc::Rc;

    #[test]
    fn test_sprite_anchor_bounds() {
        let uids = UidCounter::new();
        let view = View::Sprite {
            texture: Texture::new(&uids, 100, 50),
            anchor: Point::new(0.5, 0.5),
        };
        assert_eq!(view.bounds(), Bounds::new(-50.0, -25.0, 50.0, 25.0));
    }

    #[test]
    fn test_large_mesh_is_not_batched() {
        let uids = UidCounter::new();
        let texture = Texture::new(&uids, 1, 1);
        let small = View::Mesh {
            geometry: Rc::new(Geometry::rectangle(1.0, 1.0)),
            texture: texture.clone(),
        };
        let large = View::Mesh {
            geometry: Rc::new(Geometry::new(
                vec![0.0; 202],
                vec![0.0; 202],
                (0..99).collect(),
                Topology::TriangleList,
            )),
            texture,
        };
        assert!(small.is_batched());
        assert!(!large.is_batched());
        assert!(large.elements(Matrix::IDENTITY, 0, BlendMode::Normal).is_empty());
    }

    #[test]
    fn test_graphics_elements_per_part() {
        let uids = UidCounter::new();
        let geometry = Rc::new(Geometry::rectangle(10.0, 10.0));
        let a = Texture::new(&uids, 1, 1);
        let b = Texture::new(&uids, 1, 1);
        let view = View::Graphics {
            parts: vec![
                GraphicsPart::whole(&geometry, a),
                GraphicsPart::whole(&geometry, b),
            ],
            geometry,
        };
        let elements = view.elements(Matrix::translate(1.0, 0.0), 7, BlendMode::Add);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[1].color, 7);
        assert_eq!(elements[1].blend_mode, BlendMode::Add);
        assert_eq!(view.bounds(), Bounds::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_layout_compatibility() {
        let uids = UidCounter::new();
        let a = Texture::new(&uids, 4, 4);
        let b = Texture::new(&uids, 4, 4);
        let first = View::sprite(a.clone());
        let moved = View::Sprite {
            texture: a,
            anchor: Point::new(0.5, 0.5),
        };
        assert!(first.is_layout_compatible(&moved));
        assert!(!first.is_layout_compatible(&View::sprite(b)));
    }

    #[test]
    fn test_validate_rejects_parts_outside_geometry() {
        let uids = UidCounter::new();
        let texture = Texture::new(&uids, 4, 4);
        let geometry = Rc::new(Geometry::new(
            vec![0.0; 12],
            vec![0.0; 12],
            vec![0, 1, 2, 3, 4, 5],
            Topology::TriangleList,
        ));
        let part = |attribute_offset, index_offset, index_size| GraphicsPart {
            texture: texture.clone(),
            topology: Topology::TriangleList,
            attribute_offset,
            attribute_size: 3,
            index_offset,
            index_size,
        };
        let graphics = |parts| View::Graphics {
            geometry: geometry.clone(),
            parts,
        };

        assert!(graphics(vec![part(0, 0, 3), part(3, 3, 3)]).validate().is_ok());
        // Indices 0..3 belong to the first triangle, not to vertices 3..6.
        assert!(matches!(
            graphics(vec![part(3, 0, 3)]).validate(),
            Err(SceneError::InvalidGeometry { part: 0, .. })
        ));
        assert!(graphics(vec![part(4, 3, 3)]).validate().is_err());
        assert!(graphics(vec![part(0, 4, 3)]).validate().is_err());

        let mesh = View::Mesh {
            geometry: Rc::new(Geometry::new(
                vec![0.0; 6],
                vec![0.0; 6],
                vec![0, 1, 3],
                Topology::TriangleList,
            )),
            texture,
        };
        assert!(mesh.validate().is_err());
    }
}
