//! The scene graph.
//!
//! A [`Scene`] owns every node and render group in generational arenas and
//! hands out [`NodeId`]/[`RenderGroupId`] handles. Parents own their children
//! by id; the back-reference to the parent is a plain id used for transform
//! propagation and removal.
//!
//! # Frame flow
//!
//! ```text
//! mutation ──► node._on_update ──► group.children_to_update[depth]
//!                                           │
//! prepare() ── cull ── update transforms (depth-ascending) ── build/repack
//! ```
//!
//! Nothing walks the whole tree to find dirty nodes: setters queue the node
//! with its render group, and [`Scene::prepare`] drains the queues.

mod bounds;
mod culling;
mod effects;
mod hierarchy;
mod node;
mod properties;
mod render_group;
mod stats;
mod update;
mod view;

pub use culling::Culler;
pub use effects::{Effect, EffectKind};
pub use node::{DestroyOptions, DisplayStatus, Node, NodeId, UpdateFlags};
pub use render_group::{RenderGroup, RenderGroupId};
pub use stats::FrameStats;
pub use view::{MESH_BATCH_VERTEX_LIMIT, RenderPipe, View};

use std::rc::Rc;

use crate::arena::Arena;
use crate::batcher::BatchTicker;
use crate::config::SceneConfig;
use crate::error::{SceneError, SceneResult};
use crate::math::{Bounds, Matrix};
use crate::pool::{Pool, PoolRegistry};
use crate::render::RenderPipes;
use crate::uid::UidCounter;

/// A tree of nodes partitioned into render groups.
#[derive(Debug)]
pub struct Scene {
    pub(crate) config: SceneConfig,
    pub(crate) nodes: Arena<Node>,
    pub(crate) groups: Arena<RenderGroup>,
    root: NodeId,

    pub(crate) uids: UidCounter,
    pub(crate) ticker: BatchTicker,
    pools: PoolRegistry,
    pub(crate) matrix_pool: Rc<Pool<Matrix>>,
    pub(crate) bounds_pool: Rc<Pool<Bounds>>,

    /// Bumped by every mutation; keys the bounds caches
    pub(crate) mutation_tick: u64,
    frame: u64,
}

impl Scene {
    /// Create a scene with its own uid counter and batch ticker.
    pub fn new(config: SceneConfig) -> SceneResult<Self> {
        Self::with_context(config, UidCounter::new(), BatchTicker::new())
    }

    /// Create a scene that draws uids and batch ticks from shared sources.
    ///
    /// Scenes that share textures must share a ticker.
    pub fn with_context(
        config: SceneConfig,
        uids: UidCounter,
        ticker: BatchTicker,
    ) -> SceneResult<Self> {
        config.validate()?;
        let pools = PoolRegistry::new();
        let matrix_pool = pools.pool::<Matrix>();
        let bounds_pool = pools.pool::<Bounds>();

        let mut nodes = Arena::new();
        let root = NodeId(nodes.insert(Node::new(uids.next_uid())));

        let mut scene = Self {
            config,
            nodes,
            groups: Arena::new(),
            root,
            uids,
            ticker,
            pools,
            matrix_pool,
            bounds_pool,
            mutation_tick: 0,
            frame: 0,
        };
        scene.create_render_group(root)?;
        scene.set_label(root, "root")?;
        log::debug!("Created scene with root {:?}", root);
        Ok(scene)
    }

    /// The document root. It always owns a render group.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The root's render group.
    pub fn root_group(&self) -> SceneResult<RenderGroupId> {
        self.node_ref(self.root)?
            .render_group
            .ok_or(SceneError::StaleNode(self.root))
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Create a detached node.
    pub fn create_node(&mut self) -> NodeId {
        let uid = self.uids.next_uid();
        self.mutation_tick += 1;
        NodeId(self.nodes.insert(Node::new(uid)))
    }

    /// Create a detached node drawing `view`.
    /// Create a detached node drawing `view`. Fails if the view addresses
    /// geometry it does not have.
    pub fn create_view_node(&mut self, view: View) -> SceneResult<NodeId> {
        view.validate()?;
        let id = self.create_node();
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.view = Some(view);
            node.view_change_tick = 1;
        }
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> SceneResult<&Node> {
        self.node_ref(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id.0)
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live render groups.
    pub fn render_group_count(&self) -> usize {
        self.groups.len()
    }

    /// Frames prepared so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Shared pools used for scratch matrices and bounds.
    pub fn pools(&self) -> &PoolRegistry {
        &self.pools
    }

    pub fn ticker(&self) -> &BatchTicker {
        &self.ticker
    }

    pub(crate) fn node_ref(&self, id: NodeId) -> SceneResult<&Node> {
        self.nodes.get(id.0).ok_or(SceneError::StaleNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> SceneResult<&mut Node> {
        self.nodes.get_mut(id.0).ok_or(SceneError::StaleNode(id))
    }

    /// Record a local change on `id` and queue it with its render group.
    ///
    /// The node is queued at most once until the next update pass.
    pub(crate) fn on_update(&mut self, id: NodeId) {
        self.mutation_tick += 1;
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        node.container_change_tick += 1;
        if node.did_change {
            return;
        }
        node.did_change = true;
        let depth = node.relative_render_group_depth;
        if let Some(group) = node.parent_render_group {
            if let Some(g) = self.groups.get_mut(group.0) {
                g.on_child_update(id, depth);
            }
        }
    }

    /// Record a change of the node's own visual content.
    pub(crate) fn on_view_update(&mut self, id: NodeId) {
        self.mutation_tick += 1;
        let Some(node) = self.nodes.get_mut(id.0) else {
            return;
        };
        node.view_change_tick += 1;
        if node.did_view_update {
            return;
        }
        node.did_view_update = true;
        if let Some(group) = node.render_group.or(node.parent_render_group) {
            if let Some(g) = self.groups.get_mut(group.0) {
                g.renderables_to_update.push(id);
            }
        }
    }

    /// World transform of `id`, composed from the current local transforms
    /// of its ancestors.
    pub fn world_transform(&mut self, id: NodeId) -> SceneResult<Matrix> {
        self.node_ref(id)?;
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            path.push(current);
            cursor = self.nodes.get(current.0).and_then(|n| n.parent);
        }

        let mut world = Matrix::IDENTITY;
        for current in path.into_iter().rev() {
            if let Some(node) = self.nodes.get_mut(current.0) {
                node.update_local_transform();
                world = world.then(&node.local_transform);
            }
        }
        Ok(world)
    }

    /// World transform of `id` as of the last [`prepare`](Self::prepare),
    /// read from the render group caches.
    pub fn cached_world_transform(&self, id: NodeId) -> SceneResult<Matrix> {
        let node = self.node_ref(id)?;
        if let Some(group) = node.render_group {
            return Ok(self.render_group(group)?.world_transform);
        }
        match node.parent_render_group {
            Some(group) => Ok(self
                .render_group(group)?
                .world_transform
                .then(&node.relative_group_transform)),
            None => Ok(node.relative_group_transform),
        }
    }

    /// Run one frame: optional cull, transform update, instruction
    /// rebuild or repack for every group reachable from the root.
    pub fn prepare(&mut self) -> SceneResult<FrameStats> {
        self.frame += 1;
        let mut stats = FrameStats::default();
        let root_group = self.root_group()?;

        if self.config.cull_on_prepare {
            let view = self.config.view;
            Culler::new().cull(self, self.root, view)?;
        }

        let groups = self.collect_render_groups(root_group);
        for group in &groups {
            self.validate_renderables(*group);
        }

        self.update_render_group_transforms(root_group, true, &mut stats);

        for group in &groups {
            let rebuild = self
                .groups
                .get(group.0)
                .is_some_and(|g| g.structure_did_change);
            if rebuild {
                self.build_group(*group)?;
                stats.groups_rebuilt += 1;
            } else {
                self.update_renderables(*group, &mut stats)?;
            }
            if let Some(g) = self.groups.get(group.0) {
                stats.batches += g.batcher.batches().len();
                stats.elements += g.batcher.elements().len();
                stats.instructions += g.instructions.len();
            }
        }

        log::debug!(
            "Frame {}: {} groups, {} nodes updated, {} rebuilt, {} repacked, {} batches",
            self.frame,
            stats.groups_updated,
            stats.nodes_updated,
            stats.groups_rebuilt,
            stats.renderables_repacked,
            stats.batches
        );
        Ok(stats)
    }

    /// Dispatch the prepared instructions, descending into nested groups
    /// where their instruction appears.
    pub fn render(&self, pipes: &mut impl RenderPipes) -> SceneResult<()> {
        self.render_group_instructions(self.root_group()?, pipes)
    }

    fn render_group_instructions(
        &self,
        group: RenderGroupId,
        pipes: &mut impl RenderPipes,
    ) -> SceneResult<()> {
        let g = self.render_group(group)?;
        for instruction in g.instructions.iter() {
            crate::render::dispatch(instruction, &g.batcher, pipes);
            if let crate::render::Instruction::RenderGroup(child) = instruction {
                self.render_group_instructions(*child, pipes)?;
            }
        }
        Ok(())
    }

    /// `group` and every group nested below it, parents first.
    pub(crate) fn collect_render_groups(&self, group: RenderGroupId) -> Vec<RenderGroupId> {
        let mut out = Vec::new();
        let mut stack = vec![group];
        while let Some(current) = stack.pop() {
            let Some(g) = self.groups.get(current.0) else {
                continue;
            };
            out.push(current);
            stack.extend(g.render_group_children.iter().rev().copied());
        }
        out
    }

    /// Drop every pooled scratch object.
    pub fn release_pools(&self) {
        self.pools.release();
    }
}
