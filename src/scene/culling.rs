//! View-rectangle culling.

use crate::error::SceneResult;
use crate::math::{Bounds, Rectangle};

use super::Scene;
use super::node::NodeId;

/// Marks cullable nodes that fall outside a view rectangle as culled.
///
/// A culled node keeps its place in the tree but drops out of instruction
/// building, and its children are not visited.
#[derive(Debug, Default, Clone, Copy)]
pub struct Culler;

impl Culler {
    pub fn new() -> Self {
        Self
    }

    /// Cull the subtree under `root` against `view` (world space).
    pub fn cull(&self, scene: &mut Scene, root: NodeId, view: Rectangle) -> SceneResult<()> {
        scene.node_ref(root)?;
        self.cull_recursive(scene, root, &view)
    }

    fn cull_recursive(&self, scene: &mut Scene, id: NodeId, view: &Rectangle) -> SceneResult<()> {
        let node = scene.node_ref(id)?;
        let measured = node.cullable && node.measurable && node.include_in_build;
        let cull_area = node.cull_area;

        let culled = if measured {
            let bounds = match cull_area {
                Some(area) => {
                    let world = scene.world_transform(id)?;
                    let mut bounds = Bounds::EMPTY;
                    bounds.add_rect(&area, &world);
                    bounds
                }
                None => scene.global_bounds(id)?,
            };
            outside(&bounds, view)
        } else {
            false
        };
        scene.set_culled(id, culled)?;

        let node = scene.node_ref(id)?;
        if culled || !node.cullable_children || !node.visible() || !node.renderable() {
            return Ok(());
        }
        let children = node.children.clone();
        for child in children {
            self.cull_recursive(scene, child, view)?;
        }
        Ok(())
    }
}

fn outside(bounds: &Bounds, view: &Rectangle) -> bool {
    bounds.min_x >= view.x + view.width
        || bounds.min_y >= view.y + view.height
        || bounds.max_x <= view.x
        || bounds.max_y <= view.y
}
