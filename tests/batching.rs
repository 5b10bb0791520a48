use std::rc::Rc;

use stagecraft::prelude::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn batcher(max_textures: usize) -> Batcher {
    init_logger();
    Batcher::new(
        BatcherOptions::default().with_max_textures(max_textures),
        BatchTicker::new(),
    )
    .unwrap()
}

fn quad(texture: &TextureRef) -> BatchableElement {
    BatchableElement::quad(texture.clone(), Bounds::new(0.0, 0.0, 1.0, 1.0))
}

/// Records every pipe call as a short string.
#[derive(Default)]
struct Recorder {
    calls: Vec<String>,
}

impl RenderPipes for Recorder {
    fn execute_batch(&mut self, action: BatchAction, batch: &Batch, _batcher: &Batcher) {
        self.calls.push(format!(
            "{}:{}x{}",
            action.as_str(),
            batch.element_count,
            batch.textures.len()
        ));
    }

    fn execute_render_group(&mut self, _group: RenderGroupId) {
        self.calls.push("group".into());
    }

    fn execute_renderable(&mut self, pipe: RenderPipe, _node: NodeId) {
        self.calls.push(pipe.id().into());
    }

    fn push_effect(&mut self, effect: EffectKind, _node: NodeId) {
        self.calls.push(format!("push {}", effect.pipe_id()));
    }

    fn pop_effect(&mut self, effect: EffectKind, _node: NodeId) {
        self.calls.push(format!("pop {}", effect.pipe_id()));
    }
}

#[test]
fn test_texture_limit_splits_greedily() {
    let uids = UidCounter::new();
    let [a, b, c] = [0, 1, 2].map(|_| Texture::new(&uids, 4, 4));
    let mut batcher = batcher(2);
    let mut instructions = InstructionSet::new();

    batcher.begin();
    for texture in [&a, &a, &b, &c] {
        batcher.add(quad(texture));
    }
    batcher.finish(&mut instructions);

    let batches = batcher.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].element_count, 3);
    assert_eq!(batches[0].textures.len(), 2);
    assert_eq!(batches[1].element_count, 1);
    assert!(batches[1].textures.slot_of(c.uid()).is_some());
    assert_eq!(instructions.batch_count(), 2);
}

#[test]
fn test_blend_change_always_breaks() {
    let uids = UidCounter::new();
    let a = Texture::new(&uids, 4, 4);
    for max_textures in [1, 2, 16] {
        let mut batcher = batcher(max_textures);
        let mut instructions = InstructionSet::new();
        batcher.begin();
        batcher.add(quad(&a));
        batcher.add(quad(&a).with_blend_mode(BlendMode::Add));
        batcher.finish(&mut instructions);
        assert_eq!(batcher.batches().len(), 2);
        assert_eq!(batcher.batches()[1].blend_mode, BlendMode::Add);
    }
}

#[test]
fn test_index_promotion_preserves_packed_indices() {
    let uids = UidCounter::new();
    let a = Texture::new(&uids, 4, 4);
    let mut batcher = batcher(16);
    let mut instructions = InstructionSet::new();

    batcher.begin();
    batcher.add(quad(&a));
    batcher.break_batch(&mut instructions);
    let first: Vec<u32> = (0..6).map(|i| batcher.index_buffer().get(i)).collect();
    assert!(!batcher.index_buffer().is_wide());

    // 20k quads address 80k vertices, past the 16-bit range.
    for _ in 0..20_000 {
        batcher.add(quad(&a));
    }
    batcher.finish(&mut instructions);

    assert!(batcher.index_buffer().is_wide());
    let after: Vec<u32> = (0..6).map(|i| batcher.index_buffer().get(i)).collect();
    assert_eq!(first, after);
    let last = batcher.index_count() - 1;
    assert_eq!(batcher.index_buffer().get(last), 20_000 * 4 + 3);
}

#[test]
fn test_scene_emits_one_batch_for_shared_texture() {
    init_logger();
    let mut scene = Scene::new(SceneConfig::default()).unwrap();
    let uids = UidCounter::starting_at(1_000);
    let atlas = Texture::new(&uids, 64, 64);
    let root = scene.root();
    for i in 0..10 {
        let node = scene.create_view_node(View::sprite(atlas.clone())).unwrap();
        scene.add_child(root, node).unwrap();
        scene.set_position(node, i as f32 * 8.0, 0.0).unwrap();
    }

    let stats = scene.prepare().unwrap();
    assert_eq!(stats.batches, 1);
    assert_eq!(stats.elements, 10);

    let mut recorder = Recorder::default();
    scene.render(&mut recorder).unwrap();
    assert_eq!(recorder.calls, vec!["startBatch:10x1"]);
}

#[test]
fn test_render_walks_nested_groups_and_effects() {
    init_logger();
    let mut scene = Scene::new(SceneConfig::default()).unwrap();
    let uids = UidCounter::starting_at(1_000);
    let texture = Texture::new(&uids, 8, 8);
    let root = scene.root();

    let first = scene.create_view_node(View::sprite(texture.clone())).unwrap();
    scene.add_child(root, first).unwrap();

    let filtered = scene.create_node();
    scene.add_child(root, filtered).unwrap();
    scene
        .add_effect(filtered, Effect::Filter { padding: 1.0 })
        .unwrap();
    let inside = scene.create_view_node(View::sprite(texture.clone())).unwrap();
    scene.add_child(filtered, inside).unwrap();

    let cached = scene.create_view_node(View::sprite(texture.clone())).unwrap();
    scene.add_child(root, cached).unwrap();
    scene.enable_render_group(cached).unwrap();

    let geometry = Rc::new(Geometry::rectangle(300.0, 300.0));
    let big = Geometry::new(
        (0..200).flat_map(|i| [i as f32, 0.0]).collect(),
        vec![0.0; 400],
        (0..198).collect(),
        Topology::TriangleStrip,
    );
    let mesh = scene
        .create_view_node(View::Mesh {
            geometry: Rc::new(big),
            texture: texture.clone(),
        })
        .unwrap();
    scene.add_child(root, mesh).unwrap();
    let small = scene
        .create_view_node(View::Mesh {
            geometry,
            texture: texture.clone(),
        })
        .unwrap();
    scene.add_child(root, small).unwrap();

    scene.prepare().unwrap();
    let mut recorder = Recorder::default();
    scene.render(&mut recorder).unwrap();
    assert_eq!(
        recorder.calls,
        vec![
            "startBatch:1x1",
            "push filter",
            "startBatch:1x1",
            "pop filter",
            "group",
            "startBatch:1x1",
            "mesh",
            "startBatch:1x1",
        ]
    );
}

#[test]
fn test_view_swap_with_same_layout_repacks() {
    init_logger();
    let mut scene = Scene::new(SceneConfig::default()).unwrap();
    let uids = UidCounter::starting_at(1_000);
    let texture = Texture::new(&uids, 8, 8);
    let other = Texture::new(&uids, 8, 8);
    let root = scene.root();
    let node = scene.create_view_node(View::sprite(texture.clone())).unwrap();
    scene.add_child(root, node).unwrap();
    scene.prepare().unwrap();

    scene
        .set_view(
            node,
            Some(View::Sprite {
                texture: texture.clone(),
                anchor: Point::new(0.5, 0.5),
            }),
        )
        .unwrap();
    let stats = scene.prepare().unwrap();
    assert_eq!(stats.groups_rebuilt, 0);
    assert_eq!(stats.renderables_repacked, 1);

    scene
        .set_view(node, Some(View::sprite(other.clone())))
        .unwrap();
    let stats = scene.prepare().unwrap();
    assert_eq!(stats.groups_rebuilt, 1);
    let group = scene.root_group().unwrap();
    let batch = &scene.render_group(group).unwrap().batcher().batches()[0];
    assert!(batch.textures.slot_of(other.uid()).is_some());
}

#[test]
fn test_visibility_toggle_rebuilds_group() {
    init_logger();
    let mut scene = Scene::new(SceneConfig::default()).unwrap();
    let uids = UidCounter::starting_at(1_000);
    let texture = Texture::new(&uids, 8, 8);
    let root = scene.root();
    let a = scene.create_view_node(View::sprite(texture.clone())).unwrap();
    let b = scene.create_view_node(View::sprite(texture.clone())).unwrap();
    scene.add_child(root, a).unwrap();
    scene.add_child(root, b).unwrap();
    scene.prepare().unwrap();

    scene.set_visible(a, false).unwrap();
    let stats = scene.prepare().unwrap();
    assert_eq!(stats.groups_rebuilt, 1);
    assert_eq!(stats.elements, 1);
    assert_eq!(scene.node(b).unwrap().render_elements(), &[0]);
}

#[test]
fn test_graphics_part_outside_geometry_is_rejected() {
    init_logger();
    let mut scene = Scene::new(SceneConfig::default()).unwrap();
    let uids = UidCounter::starting_at(1_000);
    let texture = Texture::new(&uids, 8, 8);
    let geometry = Rc::new(Geometry::new(
        vec![0.0; 12],
        vec![0.0; 12],
        vec![0, 1, 2],
        Topology::TriangleList,
    ));
    let broken = View::Graphics {
        geometry: geometry.clone(),
        parts: vec![GraphicsPart {
            texture: texture.clone(),
            topology: Topology::TriangleList,
            attribute_offset: 3,
            attribute_size: 3,
            index_offset: 0,
            index_size: 3,
        }],
    };

    assert!(matches!(
        scene.create_view_node(broken.clone()),
        Err(SceneError::InvalidGeometry { part: 0, .. })
    ));

    let root = scene.root();
    let node = scene
        .create_view_node(View::Graphics {
            geometry: geometry.clone(),
            parts: vec![GraphicsPart::whole(&geometry, texture.clone())],
        })
        .unwrap();
    scene.add_child(root, node).unwrap();
    scene.prepare().unwrap();

    assert!(scene.set_view(node, Some(broken)).is_err());
    assert!(matches!(
        scene.node(node).unwrap().view(),
        Some(View::Graphics { parts, .. }) if parts[0].attribute_offset == 0
    ));
    let stats = scene.prepare().unwrap();
    assert_eq!(stats.groups_rebuilt, 0);
    assert_eq!(stats.batches, 1);
}
