//! Property setters.
//!
//! Every setter compares against the current value first and returns
//! without touching any tick when nothing changed. Changes that affect
//! inherited state set the matching [`UpdateFlags`] bit; changes that affect
//! which nodes draw mark the owning group's structure as changed.

use crate::blend::BlendMode;
use crate::color::rgb_to_bgr;
use crate::error::{SceneError, SceneResult};
use crate::math::{Matrix, Point, Rectangle};

use super::Scene;
use super::effects::{Effect, EffectKind};
use super::node::{DisplayStatus, NodeId, UpdateFlags};
use super::view::View;

impl Scene {
    pub fn set_position(&mut self, id: NodeId, x: f32, y: f32) -> SceneResult<()> {
        self.set_point(id, Point::new(x, y), |n| &mut n.position)
    }

    pub fn set_scale(&mut self, id: NodeId, x: f32, y: f32) -> SceneResult<()> {
        self.set_point(id, Point::new(x, y), |n| &mut n.scale)
    }

    /// Point in local space that lands on the position.
    pub fn set_pivot(&mut self, id: NodeId, x: f32, y: f32) -> SceneResult<()> {
        self.set_point(id, Point::new(x, y), |n| &mut n.pivot)
    }

    /// Point in local space that scale and rotation are applied around,
    /// without moving the node.
    pub fn set_origin(&mut self, id: NodeId, x: f32, y: f32) -> SceneResult<()> {
        self.set_point(id, Point::new(x, y), |n| &mut n.origin)
    }

    /// Skew in radians.
    pub fn set_skew(&mut self, id: NodeId, x: f32, y: f32) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        let skew = Point::new(x, y);
        if node.skew == skew {
            return Ok(());
        }
        node.skew = skew;
        node.update_skew();
        self.on_update(id);
        Ok(())
    }

    /// Rotation in radians.
    pub fn set_rotation(&mut self, id: NodeId, rotation: f32) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if node.rotation == rotation {
            return Ok(());
        }
        node.rotation = rotation;
        node.update_skew();
        self.on_update(id);
        Ok(())
    }

    /// Rotation in degrees.
    pub fn set_angle(&mut self, id: NodeId, degrees: f32) -> SceneResult<()> {
        self.set_rotation(id, degrees.to_radians())
    }

    /// Replace the transform components with a decomposition of `matrix`,
    /// keeping the pivot.
    pub fn set_from_matrix(&mut self, id: NodeId, matrix: &Matrix) -> SceneResult<()> {
        let pivot = self.node_ref(id)?.pivot;
        let parts = matrix.decompose(pivot);
        self.set_position(id, parts.position.x, parts.position.y)?;
        self.set_scale(id, parts.scale.x, parts.scale.y)?;
        self.set_skew(id, parts.skew.x, parts.skew.y)?;
        self.set_rotation(id, parts.rotation)
    }

    pub fn set_alpha(&mut self, id: NodeId, alpha: f32) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if node.local_alpha == alpha {
            return Ok(());
        }
        node.local_alpha = alpha;
        node.update_flags |= UpdateFlags::COLOR;
        self.on_update(id);
        Ok(())
    }

    /// Tint as `0xRRGGBB`; white leaves colors unchanged.
    pub fn set_tint(&mut self, id: NodeId, rgb: u32) -> SceneResult<()> {
        let bgr = rgb_to_bgr(rgb & 0xFF_FFFF);
        let node = self.node_mut(id)?;
        if node.local_color == bgr {
            return Ok(());
        }
        node.local_color = bgr;
        node.update_flags |= UpdateFlags::COLOR;
        self.on_update(id);
        Ok(())
    }

    pub fn set_blend_mode(&mut self, id: NodeId, blend_mode: BlendMode) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if node.local_blend_mode == blend_mode {
            return Ok(());
        }
        node.local_blend_mode = blend_mode;
        node.update_flags |= UpdateFlags::BLEND;
        self.mark_structure_changed(id);
        self.on_update(id);
        Ok(())
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> SceneResult<()> {
        self.set_display_bit(id, DisplayStatus::VISIBLE, visible)
    }

    pub fn set_renderable(&mut self, id: NodeId, renderable: bool) -> SceneResult<()> {
        self.set_display_bit(id, DisplayStatus::RENDERABLE, renderable)
    }

    pub fn set_culled(&mut self, id: NodeId, culled: bool) -> SceneResult<()> {
        self.set_display_bit(id, DisplayStatus::NOT_CULLED, !culled)
    }

    /// Whether the [`Culler`](super::Culler) may cull this node.
    pub fn set_cullable(&mut self, id: NodeId, cullable: bool) -> SceneResult<()> {
        self.node_mut(id)?.cullable = cullable;
        Ok(())
    }

    /// Whether the [`Culler`](super::Culler) descends into the children.
    pub fn set_cullable_children(&mut self, id: NodeId, cullable: bool) -> SceneResult<()> {
        self.node_mut(id)?.cullable_children = cullable;
        Ok(())
    }

    /// Local-space rectangle used for culling instead of the measured bounds.
    pub fn set_cull_area(&mut self, id: NodeId, area: Option<Rectangle>) -> SceneResult<()> {
        self.node_mut(id)?.cull_area = area;
        Ok(())
    }

    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) -> SceneResult<()> {
        self.node_mut(id)?.label = Some(label.into());
        Ok(())
    }

    /// Paint order among siblings; ties keep insertion order.
    pub fn set_z_index(&mut self, id: NodeId, z_index: i32) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if node.z_index == z_index {
            return Ok(());
        }
        node.z_index = z_index;
        self.depth_of_child_modified(id);
        self.mutation_tick += 1;
        Ok(())
    }

    /// Sort children by z-index before each build.
    pub fn set_sortable_children(&mut self, id: NodeId, sortable: bool) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if node.sortable_children == sortable {
            return Ok(());
        }
        node.sortable_children = sortable;
        node.sort_dirty = sortable;
        self.mark_own_structure_changed(id);
        Ok(())
    }

    /// Replace the node's visual content.
    ///
    /// Whether the new view can be repacked in place or forces an
    /// instruction rebuild is decided at the next prepare.
    pub fn set_view(&mut self, id: NodeId, view: Option<View>) -> SceneResult<()> {
        if let Some(view) = &view {
            view.validate()?;
        }
        let node = self.node_mut(id)?;
        let compatible = match (node.view.as_ref(), view.as_ref()) {
            (Some(old), Some(new)) => old.is_layout_compatible(new),
            (None, None) => true,
            _ => false,
        };
        node.view = view;
        node.local_bounds.invalidate();
        if !compatible {
            self.mark_own_structure_changed(id);
        }
        self.on_view_update(id);
        Ok(())
    }

    /// Attach an effect; effects are kept ordered by priority.
    pub fn add_effect(&mut self, id: NodeId, effect: Effect) -> SceneResult<()> {
        if let Effect::Mask { mask, .. } = effect {
            self.node_ref(mask)?;
            if mask == id {
                return Err(SceneError::CycleDetected {
                    parent: id,
                    child: mask,
                });
            }
        }
        let node = self.node_mut(id)?;
        node.effects.push(effect);
        node.effects.sort_by_key(Effect::priority);
        if let Effect::Mask { mask, .. } = effect {
            self.set_mask_target(mask, Some(id));
        }
        self.mark_own_structure_changed(id);
        self.mutation_tick += 1;
        Ok(())
    }

    /// Remove every effect of `kind`; returns how many were removed.
    pub fn remove_effect(&mut self, id: NodeId, kind: EffectKind) -> SceneResult<usize> {
        let node = self.node_mut(id)?;
        let masks: Vec<NodeId> = node
            .effects
            .iter()
            .filter_map(|e| match e {
                Effect::Mask { mask, .. } if kind == EffectKind::Mask => Some(*mask),
                _ => None,
            })
            .collect();
        let before = node.effects.len();
        node.effects.retain(|e| e.kind() != kind);
        let removed = before - node.effects.len();
        for mask in masks {
            self.set_mask_target(mask, None);
        }
        if removed > 0 {
            self.mark_own_structure_changed(id);
            self.mutation_tick += 1;
        }
        Ok(removed)
    }

    /// Clip `id` to `mask`, or clear the mask with `None`.
    ///
    /// A node used as a mask is no longer drawn or measured on its own.
    pub fn set_mask(&mut self, id: NodeId, mask: Option<NodeId>, inverse: bool) -> SceneResult<()> {
        if let Some(mask) = mask {
            self.node_ref(mask)?;
            if mask == id {
                return Err(SceneError::CycleDetected {
                    parent: id,
                    child: mask,
                });
            }
        }
        self.remove_effect(id, EffectKind::Mask)?;
        if let Some(mask) = mask {
            self.add_effect(id, Effect::Mask { mask, inverse })?;
        }
        Ok(())
    }

    /// Mark `mask` as the mask of `owner`, or release it with `None`.
    pub(crate) fn set_mask_target(&mut self, mask: NodeId, owner: Option<NodeId>) {
        if let Some(node) = self.nodes.get_mut(mask.0) {
            node.include_in_build = owner.is_none();
            node.measurable = owner.is_none();
            node.mask_owner = owner;
        }
        self.mark_structure_changed(mask);
        self.mutation_tick += 1;
    }

    fn set_point(
        &mut self,
        id: NodeId,
        value: Point,
        field: impl FnOnce(&mut super::Node) -> &mut Point,
    ) -> SceneResult<()> {
        let slot = field(self.node_mut(id)?);
        if *slot == value {
            return Ok(());
        }
        *slot = value;
        self.on_update(id);
        Ok(())
    }

    fn set_display_bit(&mut self, id: NodeId, bit: DisplayStatus, on: bool) -> SceneResult<()> {
        let node = self.node_mut(id)?;
        if node.local_display_status.contains(bit) == on {
            return Ok(());
        }
        node.local_display_status.set(bit, on);
        node.update_flags |= UpdateFlags::VISIBLE;
        self.mark_structure_changed(id);
        self.on_update(id);
        Ok(())
    }
}
