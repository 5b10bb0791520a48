//! Structural operations: adding, removing, reordering and destroying nodes.
//!
//! Every operation validates its arguments before touching the tree, so an
//! `Err` leaves the scene unchanged.

use crate::error::{SceneError, SceneResult};

use super::Scene;
use super::effects::Effect;
use super::node::{DestroyOptions, NodeId, UpdateFlags};

impl Scene {
    /// Append `child` to `parent`.
    ///
    /// A child that already has a parent is detached first. Re-adding an
    /// existing child moves it to the end.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<NodeId> {
        self.node_ref(parent)?;
        let current_parent = self.node_ref(child)?.parent;
        self.check_cycle(parent, child)?;

        if current_parent == Some(parent) {
            let p = self.node_mut(parent)?;
            if let Some(index) = p.children.iter().position(|c| *c == child) {
                p.children.remove(index);
            }
            p.children.push(child);
            if p.sortable_children {
                p.sort_dirty = true;
            }
            self.mark_own_structure_changed(parent);
            self.mutation_tick += 1;
            return Ok(child);
        }

        if let Some(old) = current_parent {
            self.detach(old, child);
        }
        let index = self.node_ref(parent)?.children.len();
        self.attach(parent, child, index);
        Ok(child)
    }

    /// Insert `child` at `index` (`0..=len`) in `parent`'s children.
    pub fn add_child_at(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> SceneResult<NodeId> {
        let len = self.node_ref(parent)?.children.len();
        let current_parent = self.node_ref(child)?.parent;
        if index > len {
            return Err(SceneError::IndexOutOfBounds { index, len });
        }
        self.check_cycle(parent, child)?;

        if current_parent == Some(parent) {
            let p = self.node_mut(parent)?;
            let Some(current) = p.children.iter().position(|c| *c == child) else {
                return Ok(child);
            };
            if current == index {
                return Ok(child);
            }
            p.children.remove(current);
            let index = index.min(p.children.len());
            p.children.insert(index, child);
            if p.sortable_children {
                p.sort_dirty = true;
            }
            self.mark_own_structure_changed(parent);
            self.mutation_tick += 1;
            return Ok(child);
        }

        if let Some(old) = current_parent {
            self.detach(old, child);
        }
        self.attach(parent, child, index);
        Ok(child)
    }

    /// Remove `child` from `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<NodeId> {
        self.child_index(parent, child)?;
        self.detach(parent, child);
        Ok(child)
    }

    /// Remove the child at `index`.
    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> SceneResult<NodeId> {
        let child = self.child_at(parent, index)?;
        self.detach(parent, child);
        Ok(child)
    }

    /// Remove children in `begin..end` (`end` defaults to the child count)
    /// and return them in their former order.
    pub fn remove_children(
        &mut self,
        parent: NodeId,
        begin: usize,
        end: Option<usize>,
    ) -> SceneResult<Vec<NodeId>> {
        let p = self.node_ref(parent)?;
        let len = p.children.len();
        let end = end.unwrap_or(len);
        if begin > end || end > len {
            return Err(SceneError::RangeOutOfBounds { begin, end, len });
        }
        if begin == end {
            return Ok(Vec::new());
        }

        let p = self.node_mut(parent)?;
        let removed: Vec<NodeId> = p.children.drain(begin..end).collect();
        let group = p.render_group.or(p.parent_render_group);

        for child in &removed {
            if let Some(node) = self.nodes.get_mut(child.0) {
                node.parent = None;
            }
            if let Some(group) = group {
                self.group_remove_child(group, *child);
            }
        }
        self.mutation_tick += 1;
        log::trace!("Removed {} children from {:?}", removed.len(), parent);
        Ok(removed)
    }

    /// Detach `child` from its parent, if it has one.
    pub fn remove_from_parent(&mut self, child: NodeId) -> SceneResult<()> {
        if let Some(parent) = self.node_ref(child)?.parent {
            self.detach(parent, child);
        }
        Ok(())
    }

    pub fn child_at(&self, parent: NodeId, index: usize) -> SceneResult<NodeId> {
        let children = &self.node_ref(parent)?.children;
        children
            .get(index)
            .copied()
            .ok_or(SceneError::IndexOutOfBounds {
                index,
                len: children.len(),
            })
    }

    pub fn child_index(&self, parent: NodeId, child: NodeId) -> SceneResult<usize> {
        self.node_ref(child)?;
        self.node_ref(parent)?
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or(SceneError::NotAChild { parent, child })
    }

    /// Move an existing child to `index` (`0..len`).
    pub fn set_child_index(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> SceneResult<()> {
        let len = self.node_ref(parent)?.children.len();
        if index >= len {
            return Err(SceneError::IndexOutOfBounds { index, len });
        }
        self.child_index(parent, child)?;
        self.add_child_at(parent, child, index)?;
        Ok(())
    }

    /// Swap the positions of two children of `parent`.
    pub fn swap_children(&mut self, parent: NodeId, a: NodeId, b: NodeId) -> SceneResult<()> {
        if a == b {
            return Ok(());
        }
        let i1 = self.child_index(parent, a)?;
        let i2 = self.child_index(parent, b)?;

        let p = self.node_mut(parent)?;
        p.children.swap(i1, i2);
        p.container_change_tick += 1;
        self.mark_own_structure_changed(parent);
        self.mutation_tick += 1;
        Ok(())
    }

    /// Move `child` under `parent` keeping its world transform.
    pub fn reparent_child(&mut self, parent: NodeId, child: NodeId) -> SceneResult<NodeId> {
        let index = self.node_ref(parent)?.children.len();
        let already_child = self.node_ref(child)?.parent == Some(parent);
        self.reparent_child_at(parent, child, if already_child { index - 1 } else { index })
    }

    /// Move `child` under `parent` at `index` keeping its world transform.
    ///
    /// The new local transform is decomposed back into position, scale,
    /// rotation and skew.
    pub fn reparent_child_at(
        &mut self,
        parent: NodeId,
        child: NodeId,
        index: usize,
    ) -> SceneResult<NodeId> {
        if self.node_ref(child)?.parent == Some(parent) {
            self.set_child_index(parent, child, index)?;
            return Ok(child);
        }
        let len = self.node_ref(parent)?.children.len();
        if index > len {
            return Err(SceneError::IndexOutOfBounds { index, len });
        }
        self.check_cycle(parent, child)?;

        let child_world = self.world_transform(child)?;
        self.remove_from_parent(child)?;
        self.add_child_at(parent, child, index)?;

        let parent_world = self.world_transform(parent)?;
        let local = parent_world.inverse().then(&child_world);
        self.set_from_matrix(child, &local)?;
        Ok(child)
    }

    /// Destroy `id`: detach it, remove its children and free its render
    /// group. Children are destroyed too when `options.children` is set,
    /// otherwise they are left detached.
    ///
    /// Destroying a stale handle is a logged no-op.
    pub fn destroy(&mut self, id: NodeId, options: DestroyOptions) -> SceneResult<()> {
        if !self.contains(id) {
            log::warn!("destroy called on stale node {:?}", id);
            return Ok(());
        }
        if id == self.root {
            return Err(SceneError::RootNode(id));
        }

        let children = self.remove_children(id, 0, None)?;
        self.remove_from_parent(id)?;
        self.detach_masks(id)?;

        if let Some(node) = self.nodes.remove(id.0) {
            if let Some(group) = node.render_group {
                self.release_render_group(group);
            }
        }
        self.mutation_tick += 1;
        log::trace!("Destroyed {:?}", id);

        if options.children {
            for child in children {
                self.destroy(child, options)?;
            }
        }
        Ok(())
    }

    /// Break mask links in both directions before `id` goes away.
    fn detach_masks(&mut self, id: NodeId) -> SceneResult<()> {
        let node = self.node_ref(id)?;
        let owner = node.mask_owner;
        let own_mask = node.effects.iter().find_map(|e| match e {
            Effect::Mask { mask, .. } => Some(*mask),
            _ => None,
        });

        if let Some(mask) = own_mask {
            self.set_mask_target(mask, None);
        }
        if let Some(owner) = owner {
            if let Some(node) = self.nodes.get_mut(owner.0) {
                node.effects
                    .retain(|e| !matches!(e, Effect::Mask { mask, .. } if *mask == id));
            }
            self.mark_own_structure_changed(owner);
        }
        Ok(())
    }

    /// Stable-sort `id`'s children by z-index if they are marked dirty.
    ///
    /// Returns whether a sort happened.
    pub fn sort_children(&mut self, id: NodeId) -> SceneResult<bool> {
        let node = self.node_ref(id)?;
        if !node.sort_dirty {
            return Ok(false);
        }
        let mut keyed: Vec<(i32, NodeId)> = node
            .children
            .iter()
            .map(|c| (self.nodes.get(c.0).map_or(0, |n| n.z_index), *c))
            .collect();
        keyed.sort_by_key(|(z, _)| *z);

        let node = self.node_mut(id)?;
        node.children = keyed.into_iter().map(|(_, c)| c).collect();
        node.sort_dirty = false;
        Ok(true)
    }

    /// Fail if attaching `child` under `parent` would make `child` its own
    /// ancestor.
    fn check_cycle(&self, parent: NodeId, child: NodeId) -> SceneResult<()> {
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == child {
                return Err(SceneError::CycleDetected { parent, child });
            }
            cursor = self.nodes.get(current.0).and_then(|n| n.parent);
        }
        Ok(())
    }

    /// Insert a validated, parentless `child` into `parent` at `index`.
    fn attach(&mut self, parent: NodeId, child: NodeId, index: usize) {
        let Some(p) = self.nodes.get_mut(parent.0) else {
            return;
        };
        let index = index.min(p.children.len());
        p.children.insert(index, child);
        if p.sortable_children {
            p.sort_dirty = true;
        }
        let group = p.render_group.or(p.parent_render_group);

        let Some(c) = self.nodes.get_mut(child.0) else {
            return;
        };
        c.parent = Some(parent);
        c.did_change = true;
        c.update_flags = UpdateFlags::all();
        let z_index = c.z_index;

        if let Some(group) = group {
            self.group_add_child(group, child);
        }
        if z_index != 0 {
            self.depth_of_child_modified(child);
        }
        self.mutation_tick += 1;
        log::trace!("Added {:?} to {:?} at {}", child, parent, index);
    }

    /// Remove a known child from `parent` and its render group.
    fn detach(&mut self, parent: NodeId, child: NodeId) {
        let Some(p) = self.nodes.get_mut(parent.0) else {
            return;
        };
        let Some(index) = p.children.iter().position(|c| *c == child) else {
            return;
        };
        p.children.remove(index);
        let group = p.render_group.or(p.parent_render_group);

        if let Some(group) = group {
            self.group_remove_child(group, child);
        }
        if let Some(c) = self.nodes.get_mut(child.0) {
            c.parent = None;
        }
        self.mutation_tick += 1;
        log::trace!("Removed {:?} from {:?}", child, parent);
    }

    /// A child's z-index changed: its parent must re-sort before the next
    /// build.
    pub(crate) fn depth_of_child_modified(&mut self, child: NodeId) {
        let parent = self.nodes.get(child.0).and_then(|n| n.parent);
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(p.0)) {
            p.sortable_children = true;
            p.sort_dirty = true;
        }
        self.mark_structure_changed(child);
    }
}
