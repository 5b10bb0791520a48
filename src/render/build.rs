use crate::batcher::BatchableElement;
use crate::error::SceneResult;
use crate::math::Matrix;
use crate::scene::{DisplayStatus, Node, NodeId, RenderGroupId, Scene};

use super::instructions::Instruction;

/// What a traversal of a render group's subtree produces, in paint order.
#[derive(Debug)]
enum Step {
    /// Batchable elements of one node.
    Elements(NodeId, Vec<BatchableElement>),
    /// Close the running batch and emit a standalone instruction.
    Emit(Instruction),
}

/// Batcher elements for `node`'s view in its render group's space.
///
/// A group root draws its own view at the group origin.
fn node_elements(node: &Node) -> Vec<BatchableElement> {
    let Some(view) = node.view.as_ref() else {
        return Vec::new();
    };
    let transform = if node.render_group.is_some() {
        Matrix::IDENTITY
    } else {
        node.relative_group_transform
    };
    let blend_mode = if node.render_group.is_some() {
        crate::blend::BlendMode::Normal
    } else {
        node.group_blend_mode
    };
    view.elements(transform, node.view_color_alpha(), blend_mode)
}

fn is_drawn(node: &Node) -> bool {
    node.include_in_build && node.global_display_status == DisplayStatus::all()
}

/// Walks a group's subtree and records draw steps without touching the
/// group itself.
struct Collector<'a> {
    scene: &'a Scene,
    steps: Vec<Step>,
}

impl<'a> Collector<'a> {
    fn collect(&mut self, id: NodeId) {
        let scene = self.scene;
        let Some(node) = scene.nodes.get(id.0) else {
            return;
        };
        if !is_drawn(node) {
            return;
        }
        if node.is_simple() {
            self.collect_simple(id, node);
        } else if let Some(group) = node.render_group {
            self.steps.push(Step::Emit(Instruction::RenderGroup(group)));
        } else {
            self.collect_with_effects(id, node);
        }
    }

    fn collect_simple(&mut self, id: NodeId, node: &'a Node) {
        if let Some(view) = node.view.as_ref() {
            if view.is_batched() {
                self.steps.push(Step::Elements(id, node_elements(node)));
            } else {
                self.steps.push(Step::Emit(Instruction::Renderable {
                    pipe: view.pipe(),
                    node: id,
                }));
            }
        }
        for child in &node.children {
            self.collect(*child);
        }
    }

    fn collect_with_effects(&mut self, id: NodeId, node: &'a Node) {
        for effect in &node.effects {
            self.steps.push(Step::Emit(Instruction::PushEffect {
                effect: effect.kind(),
                node: id,
            }));
        }
        self.collect_simple(id, node);
        for effect in node.effects.iter().rev() {
            self.steps.push(Step::Emit(Instruction::PopEffect {
                effect: effect.kind(),
                node: id,
            }));
        }
    }
}

/// Nodes drawn by `root`'s group: the root and its subtree down to, but
/// excluding, nested group roots.
fn group_members(scene: &Scene, root: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(node) = scene.nodes.get(id.0) else {
            continue;
        };
        out.push(id);
        for child in &node.children {
            let nested = scene
                .nodes
                .get(child.0)
                .is_some_and(|c| c.render_group.is_some());
            if !nested {
                stack.push(*child);
            }
        }
    }
    out
}

impl Scene {
    /// Rebuild `group`'s batches and instructions from its subtree.
    pub(crate) fn build_group(&mut self, group: RenderGroupId) -> SceneResult<()> {
        let (root, top_level) = {
            let g = self.render_group(group)?;
            (g.root, g.render_group_parent.is_none())
        };
        let members = group_members(self, root);
        for id in &members {
            let unsorted = self
                .nodes
                .get(id.0)
                .is_some_and(|n| n.sortable_children && n.sort_dirty);
            if unsorted {
                self.sort_children(*id)?;
            }
        }

        let steps = {
            let mut collector = Collector {
                scene: self,
                steps: Vec::new(),
            };
            // Nested roots are filtered by their parent group's traversal.
            if let Some(node) = self.nodes.get(root.0).filter(|n| !top_level || is_drawn(n)) {
                collector.collect_with_effects(root, node);
            }
            collector.steps
        };

        let Some(g) = self.groups.get_mut(group.0) else {
            return Ok(());
        };
        g.batcher.begin();
        g.instructions.reset();

        let mut placed: Vec<(NodeId, Vec<usize>)> = Vec::new();
        for step in steps {
            match step {
                Step::Elements(id, elements) => {
                    let indices = elements.into_iter().map(|e| g.batcher.add(e)).collect();
                    placed.push((id, indices));
                }
                Step::Emit(instruction) => {
                    g.batcher.break_batch(&mut g.instructions);
                    g.instructions.add(instruction);
                }
            }
        }
        g.batcher.finish(&mut g.instructions);
        g.structure_did_change = false;
        let queued = std::mem::take(&mut g.renderables_to_update);
        log::trace!(
            "Built {:?}: {} elements, {} batches, {} instructions",
            group,
            g.batcher.elements().len(),
            g.batcher.batches().len(),
            g.instructions.len()
        );

        for id in &queued {
            if let Some(node) = self.nodes.get_mut(id.0) {
                node.did_view_update = false;
            }
        }
        for id in &members {
            if let Some(node) = self.nodes.get_mut(id.0) {
                node.did_view_update = false;
                node.render_elements.clear();
            }
        }
        for (id, indices) in placed {
            if let Some(node) = self.nodes.get_mut(id.0) {
                node.render_elements = indices;
            }
        }
        Ok(())
    }
}

/// Repack `id`'s elements in `group`'s batcher from the node's current
/// state. Returns `false` when the elements no longer fit their slots.
pub(crate) fn update_renderable(scene: &mut Scene, group: RenderGroupId, id: NodeId) -> bool {
    let Scene { nodes, groups, .. } = scene;
    let Some(node) = nodes.get(id.0) else {
        return true;
    };
    let Some(view) = node.view.as_ref() else {
        return node.render_elements.is_empty();
    };
    if !view.is_batched() {
        // Drawn by its own pipe straight from the node.
        return node.render_elements.is_empty();
    }
    if node.render_elements.is_empty() {
        // Never built; fine as long as it is not supposed to be drawn.
        return !is_drawn(node);
    }

    let elements = node_elements(node);
    if elements.len() != node.render_elements.len() {
        return false;
    }
    let Some(g) = groups.get_mut(group.0) else {
        return false;
    };
    node.render_elements
        .iter()
        .zip(elements)
        .all(|(index, element)| g.batcher.update_element(*index, |e| *e = element))
}
