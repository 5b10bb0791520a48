//! Render groups: coordinate-space partitions of the tree.
//!
//! A render group is owned by its root node. Everything below the root, down
//! to the next nested group root, has its transform, color and visibility
//! computed relative to the root. Dirty nodes are queued per depth and
//! drained depth-ascending, so a parent's group transform is always fresh
//! before its children compose against it.

use crate::arena::RawId;
use crate::batcher::Batcher;
use crate::color::WHITE_BGR;
use crate::error::{SceneError, SceneResult};
use crate::math::Matrix;
use crate::render::InstructionSet;

use super::Scene;
use super::node::{NodeId, UpdateFlags};

/// Handle to a render group in a [`Scene`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct RenderGroupId(pub(crate) RawId);

impl RenderGroupId {
    /// Convert to a u64 for external use.
    pub fn as_u64(self) -> u64 {
        self.0.as_u64()
    }
}

/// Per-group transform cache, update queues and draw program.
#[derive(Debug)]
pub struct RenderGroup {
    pub(crate) uid: u64,
    pub(crate) root: NodeId,

    pub(crate) world_transform: Matrix,
    pub(crate) world_color: u32,
    pub(crate) world_alpha: f32,
    pub(crate) world_color_alpha: u32,

    /// Dirty nodes, indexed by relative depth
    pub(crate) children_to_update: Vec<Vec<NodeId>>,
    pub(crate) render_group_children: Vec<RenderGroupId>,
    pub(crate) render_group_parent: Option<RenderGroupId>,

    pub(crate) structure_did_change: bool,
    pub(crate) update_tick: u64,
    /// Nodes whose batched elements must be repacked
    pub(crate) renderables_to_update: Vec<NodeId>,

    pub(crate) batcher: Batcher,
    pub(crate) instructions: InstructionSet,
}

impl RenderGroup {
    pub(crate) fn new(uid: u64, root: NodeId, batcher: Batcher) -> Self {
        Self {
            uid,
            root,
            world_transform: Matrix::IDENTITY,
            world_color: WHITE_BGR,
            world_alpha: 1.0,
            world_color_alpha: 0xFFFF_FFFF,
            children_to_update: Vec::new(),
            render_group_children: Vec::new(),
            render_group_parent: None,
            structure_did_change: true,
            update_tick: 0,
            renderables_to_update: Vec::new(),
            batcher,
            instructions: InstructionSet::new(),
        }
    }

    /// Queue `node` for a transform update at `depth`.
    ///
    /// Duplicates are allowed; the update pass skips nodes it already
    /// visited this tick.
    pub(crate) fn on_child_update(&mut self, node: NodeId, depth: usize) {
        if self.children_to_update.len() <= depth {
            self.children_to_update.resize_with(depth + 1, Vec::new);
        }
        self.children_to_update[depth].push(node);
    }

    /// Number of queued node updates across all depths.
    pub fn queued_updates(&self) -> usize {
        self.children_to_update.iter().map(Vec::len).sum()
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// The node that owns this group.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Transform from group space to world space, as of the last update.
    pub fn world_transform(&self) -> &Matrix {
        &self.world_transform
    }

    /// `0xBBGGRR`
    pub fn world_color(&self) -> u32 {
        self.world_color
    }

    pub fn world_alpha(&self) -> f32 {
        self.world_alpha
    }

    /// `0xAABBGGRR`
    pub fn world_color_alpha(&self) -> u32 {
        self.world_color_alpha
    }

    pub fn render_group_children(&self) -> &[RenderGroupId] {
        &self.render_group_children
    }

    pub fn render_group_parent(&self) -> Option<RenderGroupId> {
        self.render_group_parent
    }

    /// Whether instructions will be rebuilt on the next prepare.
    pub fn structure_did_change(&self) -> bool {
        self.structure_did_change
    }

    pub fn batcher(&self) -> &Batcher {
        &self.batcher
    }

    pub fn instructions(&self) -> &InstructionSet {
        &self.instructions
    }
}

impl Scene {
    /// Make `id` the root of a new render group.
    ///
    /// The node is moved out of its parent group's queues and re-added as a
    /// nested group. Enabling twice returns the existing group.
    pub fn enable_render_group(&mut self, id: NodeId) -> SceneResult<RenderGroupId> {
        let node = self.node_ref(id)?;
        if let Some(existing) = node.render_group {
            log::warn!("Render group already enabled on {:?}", id);
            return Ok(existing);
        }
        let parent_group = node.parent_render_group;

        if let Some(parent_group) = parent_group {
            self.group_remove_child(parent_group, id);
        }

        let group = self.create_render_group(id)?;

        if let Some(parent_group) = parent_group {
            self.group_add_child(parent_group, id);
        }
        self.mutation_tick += 1;
        log::trace!("Enabled render group {:?} on {:?}", group, id);
        Ok(group)
    }

    /// Dissolve the render group rooted at `id`; its subtree rejoins the
    /// enclosing group.
    pub fn disable_render_group(&mut self, id: NodeId) -> SceneResult<()> {
        if id == self.root {
            return Err(SceneError::RootNode(id));
        }
        let node = self.node_ref(id)?;
        let Some(group) = node.render_group else {
            return Ok(());
        };
        let parent_group = node.parent_render_group;
        let children = node.children.clone();

        if let Some(parent_group) = parent_group {
            self.group_remove_child(parent_group, id);
        }
        for child in children {
            self.group_remove_child(group, child);
        }
        self.release_render_group(group);

        if let Some(node) = self.nodes.get_mut(id.0) {
            node.render_group = None;
            node.relative_group_transform = node.local_transform;
        }

        if let Some(parent_group) = parent_group {
            self.group_add_child(parent_group, id);
        }
        self.mutation_tick += 1;
        log::trace!("Disabled render group {:?} on {:?}", group, id);
        Ok(())
    }

    pub fn render_group(&self, id: RenderGroupId) -> SceneResult<&RenderGroup> {
        self.groups
            .get(id.0)
            .ok_or(SceneError::StaleRenderGroup(id))
    }

    /// Bind a fresh group to `root` and seed its queues with the existing
    /// children.
    pub(crate) fn create_render_group(&mut self, root: NodeId) -> SceneResult<RenderGroupId> {
        self.node_ref(root)?;
        let batcher = Batcher::new(self.config.batcher, self.ticker.clone())?;
        let uid = self.uids.next_uid();
        let group = RenderGroupId(self.groups.insert(RenderGroup::new(uid, root, batcher)));

        let children = match self.nodes.get_mut(root.0) {
            Some(node) => {
                node.render_group = Some(group);
                node.did_change = true;
                node.children.clone()
            }
            None => Vec::new(),
        };
        for child in children {
            self.group_add_child(group, child);
        }
        Ok(group)
    }

    /// Free a group. Nested groups are orphaned, not destroyed.
    pub(crate) fn release_render_group(&mut self, group: RenderGroupId) {
        let Some(released) = self.groups.remove(group.0) else {
            return;
        };
        if let Some(parent) = released.render_group_parent {
            if let Some(parent) = self.groups.get_mut(parent.0) {
                parent.render_group_children.retain(|g| *g != group);
                parent.structure_did_change = true;
            }
        }
        for child in released.render_group_children {
            if let Some(child) = self.groups.get_mut(child.0) {
                child.render_group_parent = None;
            }
        }
    }

    /// Register `child` (and its subtree, down to nested group roots) with
    /// `group`.
    pub(crate) fn group_add_child(&mut self, group: RenderGroupId, child: NodeId) {
        let root = match self.groups.get_mut(group.0) {
            Some(g) => {
                g.structure_did_change = true;
                g.root
            }
            None => return,
        };

        let parent_depth = self
            .nodes
            .get(child.0)
            .and_then(|n| n.parent)
            .filter(|p| *p != root)
            .and_then(|p| self.nodes.get(p.0))
            .map(|p| p.relative_render_group_depth);

        let Some(node) = self.nodes.get_mut(child.0) else {
            return;
        };
        node.parent_render_group = Some(group);
        node.update_tick = None;
        node.relative_render_group_depth = parent_depth.map_or(1, |d| d + 1);
        node.did_change = true;
        let depth = node.relative_render_group_depth;
        let nested = node.render_group;
        let children = if nested.is_some() {
            Vec::new()
        } else {
            node.children.clone()
        };

        if let Some(g) = self.groups.get_mut(group.0) {
            g.on_child_update(child, depth);
        }

        if let Some(nested) = nested {
            self.group_add_render_group_child(group, nested);
            return;
        }
        for grandchild in children {
            self.group_add_child(group, grandchild);
        }
    }

    /// Unregister `child` and its subtree from `group`.
    pub(crate) fn group_remove_child(&mut self, group: RenderGroupId, child: NodeId) {
        if let Some(g) = self.groups.get_mut(group.0) {
            g.structure_did_change = true;
        }
        let Some(node) = self.nodes.get_mut(child.0) else {
            return;
        };
        node.parent_render_group = None;
        node.render_elements.clear();
        let nested = node.render_group;

        if let Some(nested) = nested {
            self.group_remove_render_group_child(group, nested);
            return;
        }
        let children = self
            .nodes
            .get(child.0)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for grandchild in children {
            self.group_remove_child(group, grandchild);
        }
    }

    /// Attach `child` under `group`, detaching it from any previous parent
    /// group first.
    pub(crate) fn group_add_render_group_child(
        &mut self,
        group: RenderGroupId,
        child: RenderGroupId,
    ) {
        let previous = self.groups.get(child.0).and_then(|c| c.render_group_parent);
        if let Some(previous) = previous {
            self.group_remove_render_group_child(previous, child);
        }
        if let Some(c) = self.groups.get_mut(child.0) {
            c.render_group_parent = Some(group);
        }
        if let Some(g) = self.groups.get_mut(group.0) {
            g.render_group_children.push(child);
        }
    }

    pub(crate) fn group_remove_render_group_child(
        &mut self,
        group: RenderGroupId,
        child: RenderGroupId,
    ) {
        if let Some(g) = self.groups.get_mut(group.0) {
            if let Some(index) = g.render_group_children.iter().position(|c| *c == child) {
                g.render_group_children.remove(index);
            }
        }
        if let Some(c) = self.groups.get_mut(child.0) {
            if c.render_group_parent == Some(group) {
                c.render_group_parent = None;
            }
        }
    }

    /// Mark the structure of the group `node` belongs to as changed.
    pub(crate) fn mark_structure_changed(&mut self, node: NodeId) {
        // The top-level root has no enclosing group and draws through its own.
        let group = self
            .nodes
            .get(node.0)
            .and_then(|n| n.parent_render_group.or(n.render_group));
        if let Some(g) = group.and_then(|g| self.groups.get_mut(g.0)) {
            g.structure_did_change = true;
        }
    }

    /// Structure flag of the group `node` is the root of, or else the group it
    /// belongs to.
    pub(crate) fn mark_own_structure_changed(&mut self, node: NodeId) {
        let group = self
            .nodes
            .get(node.0)
            .and_then(|n| n.render_group.or(n.parent_render_group));
        if let Some(g) = group.and_then(|g| self.groups.get_mut(g.0)) {
            g.structure_did_change = true;
        }
    }

    /// Recompute a group's world transform and color from its root.
    pub(crate) fn update_render_group_transform(&mut self, group: RenderGroupId) {
        let Some(g) = self.groups.get(group.0) else {
            return;
        };
        let root_id = g.root;
        let parent = g
            .render_group_parent
            .and_then(|p| self.groups.get(p.0))
            .map(|p| (p.world_transform, p.world_color, p.world_alpha));

        let Some(root) = self.nodes.get_mut(root_id.0) else {
            return;
        };
        let (transform, color, alpha) = match parent {
            Some((parent_transform, parent_color, parent_alpha)) => (
                parent_transform.then(&root.relative_group_transform),
                crate::color::multiply_colors(root.group_color, parent_color),
                root.group_alpha * parent_alpha,
            ),
            None => {
                // A top-level root inherits from nothing.
                root.update_local_transform();
                if !root.update_flags.is_empty() {
                    root.update_color_blend_visibility(
                        (
                            WHITE_BGR,
                            1.0,
                            crate::blend::BlendMode::Normal,
                            super::DisplayStatus::all(),
                        ),
                        UpdateFlags::all(),
                    );
                }
                root.did_change = false;
                (root.local_transform, root.local_color, root.local_alpha)
            }
        };

        if let Some(g) = self.groups.get_mut(group.0) {
            let alpha = crate::color::clamp_alpha(alpha);
            g.world_transform = transform;
            g.world_color = color;
            g.world_alpha = alpha;
            g.world_color_alpha = crate::color::pack_color_alpha(color, alpha);
        }
    }
}
