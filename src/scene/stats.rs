//! Per-frame counters returned by [`Scene::prepare`](super::Scene::prepare).

/// What one call to `prepare` did.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameStats {
    /// Render groups whose world transform and queues were processed
    pub groups_updated: usize,
    /// Nodes whose relative group transform was recomputed
    pub nodes_updated: usize,
    /// Groups whose batches and instructions were rebuilt from scratch
    pub groups_rebuilt: usize,
    /// Renderables repacked in place without a rebuild
    pub renderables_repacked: usize,
    pub batches: usize,
    pub elements: usize,
    pub instructions: usize,
}

impl FrameStats {
    /// True when the frame did no transform or instruction work.
    pub fn is_idle(&self) -> bool {
        self.nodes_updated == 0 && self.groups_rebuilt == 0 && self.renderables_repacked == 0
    }
}

#[cfg(test)]
mod tests {
    use crate::config::SceneConfig;
    use crate::scene::{Scene, View};
    use crate::texture::Texture;

    #[test]
    fn test_first_frame_rebuilds_root() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        let stats = scene.prepare().unwrap();
        assert_eq!(stats.groups_updated, 1);
        assert_eq!(stats.groups_rebuilt, 1);
        assert_eq!(stats.batches, 0);
    }

    #[test]
    fn test_unchanged_frame_is_idle() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        let texture = Texture::new(&scene.uids, 4, 4);
        let node = scene.create_view_node(View::sprite(texture)).unwrap();
        let root = scene.root();
        scene.add_child(root, node).unwrap();

        let first = scene.prepare().unwrap();
        assert!(!first.is_idle());
        assert_eq!(first.elements, 1);

        let second = scene.prepare().unwrap();
        assert!(second.is_idle());
        assert_eq!(second.batches, 1);
        assert_eq!(second.instructions, 1);
    }
}
