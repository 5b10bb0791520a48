//! Subtree measurement.
//!
//! Bounds are accumulated recursively with scratch matrices and boxes taken
//! from the scene's pools. Every scratch object is held by a guard scoped to
//! one recursion frame, so borrows nest and are returned in reverse order.

use std::rc::Rc;

use crate::error::SceneResult;
use crate::math::{Bounds, Matrix};

use super::Scene;
use super::effects::Effect;
use super::node::{DisplayStatus, NodeId};

impl Scene {
    /// Bounds of `id` and its subtree in `id`'s own coordinate space.
    ///
    /// Hidden and non-measurable nodes contribute nothing. An empty subtree
    /// measures as a zero box at the origin.
    pub fn local_bounds(&mut self, id: NodeId) -> SceneResult<Bounds> {
        let tick = self.mutation_tick;
        if let Some(bounds) = self.node_ref(id)?.local_bounds.get(tick) {
            return Ok(*bounds);
        }

        let world = self.world_transform(id)?;
        let space = world.inverse();
        let mut bounds = Bounds::EMPTY;
        self.accumulate_bounds(id, &Matrix::IDENTITY, &space, &mut bounds, false);
        let bounds = or_zero(bounds);

        self.node_mut(id)?.local_bounds.store(tick, bounds);
        Ok(bounds)
    }

    /// Bounds of `id` and its subtree in world space.
    pub fn global_bounds(&mut self, id: NodeId) -> SceneResult<Bounds> {
        let tick = self.mutation_tick;
        if let Some(bounds) = self.node_ref(id)?.global_bounds.get(tick) {
            return Ok(*bounds);
        }

        let world = self.world_transform(id)?;
        let mut bounds = Bounds::EMPTY;
        self.accumulate_bounds(id, &world, &Matrix::IDENTITY, &mut bounds, false);
        let bounds = or_zero(bounds);

        self.node_mut(id)?.global_bounds.store(tick, bounds);
        Ok(bounds)
    }

    /// Whether the world-space point `(x, y)` lies inside `id`'s global
    /// bounds.
    pub fn contains_point(&mut self, id: NodeId, x: f32, y: f32) -> SceneResult<bool> {
        let bounds = self.global_bounds(id)?;
        Ok(!bounds.is_empty() && bounds.contains_point(x, y))
    }

    /// Add `id`'s subtree to `out`.
    ///
    /// `matrix` maps `id`'s local space into the measurement space. `space`
    /// maps world space into the measurement space and is only needed to
    /// place mask bounds.
    fn accumulate_bounds(
        &mut self,
        id: NodeId,
        matrix: &Matrix,
        space: &Matrix,
        out: &mut Bounds,
        force_measure: bool,
    ) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        let visible = node.local_display_status.contains(DisplayStatus::VISIBLE);
        if !visible || !(node.measurable || force_measure) {
            return;
        }

        let view_bounds = node.view.as_ref().map(|v| v.bounds());
        let effects = node.effects.clone();
        let children = node.children.clone();

        let bounds_pool = Rc::clone(&self.bounds_pool);
        let matrix_pool = Rc::clone(&self.matrix_pool);
        let mut subtree = bounds_pool.borrow();
        let target: &mut Bounds = if effects.is_empty() {
            &mut *out
        } else {
            &mut *subtree
        };

        if let Some(view_bounds) = view_bounds {
            target.add_bounds(&view_bounds, matrix);
        }

        for child in children {
            let Some(local) = self.nodes.get_mut(child.0).map(|c| {
                c.update_local_transform();
                c.local_transform
            }) else {
                continue;
            };
            let mut child_matrix = matrix_pool.borrow();
            *child_matrix = matrix.then(&local);
            self.accumulate_bounds(child, &child_matrix, space, target, false);
        }

        if effects.is_empty() {
            return;
        }
        for effect in &effects {
            let mask_bounds = match effect {
                Effect::Mask { mask, .. } => Some(self.mask_bounds(*mask, space)),
                _ => None,
            };
            effect.add_bounds(&mut subtree, mask_bounds.as_ref());
        }
        if !subtree.is_empty() {
            out.add_bounds(&subtree, &Matrix::IDENTITY);
        }
    }

    /// Bounds of a mask node in the measurement space. Mask nodes are not
    /// measurable themselves, so measurement is forced at the top.
    fn mask_bounds(&mut self, mask: NodeId, space: &Matrix) -> Bounds {
        let Ok(world) = self.world_transform(mask) else {
            return Bounds::EMPTY;
        };
        let matrix = space.then(&world);
        let mut bounds = Bounds::EMPTY;
        self.accumulate_bounds(mask, &matrix, space, &mut bounds, true);
        bounds
    }
}

fn or_zero(bounds: Bounds) -> Bounds {
    if bounds.is_empty() {
        Bounds::new(0.0, 0.0, 0.0, 0.0)
    } else {
        bounds
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SceneConfig;
    use crate::math::Bounds;
    use crate::scene::{Effect, NodeId, Scene, View};
    use crate::texture::Texture;

    fn sprite(scene: &mut Scene, parent: NodeId, size: u32) -> NodeId {
        let texture = Texture::new(&scene.uids, size, size);
        let node = scene.create_view_node(View::sprite(texture)).unwrap();
        scene.add_child(parent, node).unwrap();
        node
    }

    #[test]
    fn test_global_bounds_follow_transforms() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        let root = scene.root();
        let holder = scene.create_node();
        scene.add_child(root, holder).unwrap();
        let a = sprite(&mut scene, holder, 10);
        scene.set_position(holder, 100.0, 50.0).unwrap();
        scene.set_scale(a, 2.0, 2.0).unwrap();

        let bounds = scene.global_bounds(holder).unwrap();
        assert_eq!(bounds, Bounds::new(100.0, 50.0, 120.0, 70.0));

        let local = scene.local_bounds(holder).unwrap();
        assert_eq!(local, Bounds::new(0.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn test_empty_subtree_measures_zero() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        let node = scene.create_node();
        let root = scene.root();
        scene.add_child(root, node).unwrap();
        assert_eq!(
            scene.global_bounds(node).unwrap(),
            Bounds::new(0.0, 0.0, 0.0, 0.0)
        );
    }

    #[test]
    fn test_hidden_children_are_ignored() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        let root = scene.root();
        let a = sprite(&mut scene, root, 10);
        let b = sprite(&mut scene, root, 10);
        scene.set_position(b, 100.0, 0.0).unwrap();
        scene.set_visible(b, false).unwrap();

        let bounds = scene.global_bounds(root).unwrap();
        assert_eq!(bounds.max_x, 10.0);
        assert!(scene.contains_point(a, 5.0, 5.0).unwrap());
        assert!(!scene.contains_point(root, 105.0, 5.0).unwrap());
    }

    #[test]
    fn test_bounds_cache_tracks_mutations() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        let root = scene.root();
        let a = sprite(&mut scene, root, 10);
        assert_eq!(scene.global_bounds(a).unwrap().min_x, 0.0);
        scene.set_position(a, 5.0, 0.0).unwrap();
        assert_eq!(scene.global_bounds(a).unwrap().min_x, 5.0);
    }

    #[test]
    fn test_filter_pads_and_mask_clips() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        let root = scene.root();
        let holder = scene.create_node();
        scene.add_child(root, holder).unwrap();
        sprite(&mut scene, holder, 10);

        scene
            .add_effect(holder, Effect::Filter { padding: 2.0 })
            .unwrap();
        assert_eq!(
            scene.global_bounds(holder).unwrap(),
            Bounds::new(-2.0, -2.0, 12.0, 12.0)
        );
        scene
            .remove_effect(holder, crate::scene::EffectKind::Filter)
            .unwrap();

        let mask = sprite(&mut scene, root, 4);
        scene.set_mask(holder, Some(mask), false).unwrap();
        assert_eq!(
            scene.global_bounds(holder).unwrap(),
            Bounds::new(0.0, 0.0, 4.0, 4.0)
        );
        // The mask itself no longer counts towards its parent.
        assert_eq!(scene.global_bounds(root).unwrap().max_x, 4.0);
    }

    #[test]
    fn test_scratch_objects_return_to_pools() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        let root = scene.root();
        let holder = scene.create_node();
        scene.add_child(root, holder).unwrap();
        for _ in 0..3 {
            sprite(&mut scene, holder, 8);
        }
        scene
            .add_effect(holder, Effect::Filter { padding: 1.0 })
            .unwrap();
        scene.global_bounds(root).unwrap();

        let matrices = &scene.matrix_pool;
        let bounds = &scene.bounds_pool;
        assert_eq!(matrices.free_count(), matrices.created_count());
        assert_eq!(bounds.free_count(), bounds.created_count());
    }
}
