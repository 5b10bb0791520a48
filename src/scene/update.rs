//! The per-frame transform pass.
//!
//! Each render group drains its dirty queues depth by depth, starting at
//! depth 1. A queued node recomputes its relative group transform from its
//! parent's (already up to date, because the parent sits at a smaller
//! depth or was reached through the same recursion) and then walks its own
//! subtree. The group's update tick keeps a node from being recomputed twice
//! in one pass when both it and an ancestor were queued.

use crate::blend::BlendMode;
use crate::color::WHITE_BGR;
use crate::error::SceneResult;
use crate::math::Matrix;

use super::Scene;
use super::node::{DisplayStatus, NodeId, UpdateFlags};
use super::render_group::RenderGroupId;
use super::stats::FrameStats;

/// Inherited values for nodes whose parent is a group root (or missing).
const GROUP_ROOT_PARENT: (u32, f32, BlendMode, DisplayStatus) =
    (WHITE_BGR, 1.0, BlendMode::Normal, DisplayStatus::all());

impl Scene {
    /// Refresh `group`'s world transform and drain its queues; with
    /// `update_children`, recurse into nested groups afterwards.
    pub(crate) fn update_render_group_transforms(
        &mut self,
        group: RenderGroupId,
        update_children: bool,
        stats: &mut FrameStats,
    ) {
        self.update_render_group_transform(group);

        let Some(g) = self.groups.get_mut(group.0) else {
            return;
        };
        let update_tick = g.update_tick;
        g.update_tick += 1;
        let mut queues = std::mem::take(&mut g.children_to_update);
        stats.groups_updated += 1;

        for (depth, queue) in queues.iter_mut().enumerate() {
            for node in queue.drain(..) {
                let belongs = self.nodes.get(node.0).is_some_and(|n| {
                    n.parent_render_group == Some(group) && n.relative_render_group_depth == depth
                });
                if belongs {
                    stats.nodes_updated +=
                        self.update_transform_and_children(node, group, update_tick, UpdateFlags::empty());
                }
            }
        }

        // Hand the emptied queues back so their capacity is reused.
        if let Some(g) = self.groups.get_mut(group.0) {
            for (depth, queue) in queues.into_iter().enumerate() {
                if let Some(pending) = g.children_to_update.get_mut(depth) {
                    // Nodes queued while draining stay queued.
                    let mut queue = queue;
                    queue.append(pending);
                    *pending = queue;
                } else {
                    g.children_to_update.push(queue);
                }
            }
        }

        if update_children {
            let children = self
                .groups
                .get(group.0)
                .map(|g| g.render_group_children.clone())
                .unwrap_or_default();
            for child in children {
                self.update_render_group_transforms(child, true, stats);
            }
        }
    }

    /// Recompute `id` and its subtree within `group`. Returns the number of
    /// nodes recomputed.
    fn update_transform_and_children(
        &mut self,
        id: NodeId,
        group: RenderGroupId,
        update_tick: u64,
        inherited_flags: UpdateFlags,
    ) -> usize {
        let parent = self
            .nodes
            .get(id.0)
            .and_then(|n| n.parent)
            .and_then(|p| self.nodes.get(p.0))
            .map(|p| (p.render_group.is_some(), p.group_transform(), p.child_group_color()));

        let Some(node) = self.nodes.get_mut(id.0) else {
            return 0;
        };
        if node.update_tick == Some(update_tick) {
            return 0;
        }
        node.update_tick = Some(update_tick);
        node.did_change = false;
        node.update_local_transform();

        // Below a group root, or at the top, nothing is inherited.
        let (is_group_root_child, parent_transform, parent_color) =
            parent.unwrap_or((true, Matrix::IDENTITY, GROUP_ROOT_PARENT));
        let flags = if is_group_root_child {
            node.update_flags
        } else {
            inherited_flags | node.update_flags
        };
        node.relative_group_transform = parent_transform.then(&node.local_transform);
        if flags.intersects(UpdateFlags::COLOR_BLEND_VISIBLE) {
            node.update_color_blend_visibility(parent_color, flags);
        }
        node.update_flags = UpdateFlags::empty();

        let mut updated = 1;
        if node.render_group.is_none() {
            let children = node.children.clone();
            let has_view = node.view.is_some();
            for child in children {
                updated += self.update_transform_and_children(child, group, update_tick, flags);
            }
            if has_view {
                if let Some(g) = self.groups.get_mut(group.0) {
                    if !g.structure_did_change {
                        g.renderables_to_update.push(id);
                    }
                }
            }
        }
        updated
    }

    /// Check queued view changes against what was packed last build; any
    /// change the batcher cannot absorb in place forces a rebuild.
    pub(crate) fn validate_renderables(&mut self, group: RenderGroupId) {
        let Some(g) = self.groups.get(group.0) else {
            return;
        };
        if g.structure_did_change {
            return;
        }
        let rebuild = g.renderables_to_update.iter().any(|id| {
            self.nodes
                .get(id.0)
                .is_some_and(|n| n.did_view_update && !self.view_matches_elements(*id, group))
        });
        if rebuild {
            if let Some(g) = self.groups.get_mut(group.0) {
                g.structure_did_change = true;
            }
        }
    }

    /// Whether `id`'s current view occupies exactly the elements it was
    /// packed into.
    fn view_matches_elements(&self, id: NodeId, group: RenderGroupId) -> bool {
        let (Some(node), Some(g)) = (self.nodes.get(id.0), self.groups.get(group.0)) else {
            return false;
        };
        let Some(view) = node.view.as_ref() else {
            return node.render_elements.is_empty();
        };
        if !view.is_batched() {
            return node.render_elements.is_empty();
        }

        let uids = view.texture_uids();
        let sizes = view.element_sizes();
        if sizes.len() != node.render_elements.len() {
            return false;
        }
        node.render_elements
            .iter()
            .zip(uids.iter().zip(sizes.iter()))
            .all(|(index, (uid, (vertices, indices, topology)))| {
                g.batcher.elements().get(*index).is_some_and(|e| {
                    e.texture.uid() == *uid
                        && e.attribute_size() == *vertices
                        && e.index_size() == *indices
                        && e.topology == *topology
                })
            })
    }

    /// Repack every queued renderable of `group` in place. Falls back to a
    /// rebuild if an element no longer fits.
    pub(crate) fn update_renderables(
        &mut self,
        group: RenderGroupId,
        stats: &mut FrameStats,
    ) -> SceneResult<()> {
        let Some(g) = self.groups.get_mut(group.0) else {
            return Ok(());
        };
        let mut queued = std::mem::take(&mut g.renderables_to_update);
        queued.sort_unstable();
        queued.dedup();

        for id in &queued {
            if !crate::render::update_renderable(self, group, *id) {
                log::debug!("{:?} no longer fits its batch slots, rebuilding {:?}", id, group);
                if let Some(g) = self.groups.get_mut(group.0) {
                    g.structure_did_change = true;
                }
                self.build_group(group)?;
                stats.groups_rebuilt += 1;
                return Ok(());
            }
            if let Some(node) = self.nodes.get_mut(id.0) {
                node.did_view_update = false;
            }
            stats.renderables_repacked += 1;
        }
        Ok(())
    }
}
