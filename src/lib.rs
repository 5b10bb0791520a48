//! A retained 2D scene graph with render-group transform caching and a
//! dynamic draw-call batcher.
//!
//! The crate sits between an application and a GPU backend. Applications
//! build a tree of nodes in a [`Scene`](scene::Scene), mutate transforms,
//! colors and views, and call [`Scene::prepare`](scene::Scene::prepare) once
//! per frame. Preparing propagates only what changed, then turns each render
//! group into an [`InstructionSet`](render::InstructionSet) of batches and
//! custom draws that a backend replays through
//! [`RenderPipes`](render::RenderPipes).
//!
//! ```
//! use stagecraft::prelude::*;
//!
//! let mut scene = Scene::new(SceneConfig::default()).unwrap();
//! let texture = Texture::new(&UidCounter::new(), 32, 32);
//! let sprite = scene.create_view_node(View::sprite(texture)).unwrap();
//! scene.add_child(scene.root(), sprite).unwrap();
//! scene.set_position(sprite, 10.0, 20.0).unwrap();
//!
//! let stats = scene.prepare().unwrap();
//! assert_eq!(stats.batches, 1);
//! ```

pub mod arena;
pub mod batcher;
pub mod blend;
pub mod cache;
pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
#[cfg(feature = "wgpu")]
pub mod gpu;
pub mod math;
pub mod pool;
pub mod render;
pub mod scene;
pub mod texture;
pub mod uid;

pub mod prelude {
    pub use crate::batcher::{Batch, BatchAction, BatchTicker, BatchableElement, Batcher};
    pub use crate::blend::BlendMode;
    pub use crate::config::{BatcherOptions, SceneConfig};
    pub use crate::error::{SceneError, SceneResult};
    pub use crate::geometry::{Geometry, GraphicsPart, Topology};
    pub use crate::math::{Bounds, Matrix, Point, Rectangle};
    pub use crate::pool::{Pool, PoolRegistry, Poolable};
    pub use crate::render::{Instruction, InstructionSet, RenderPipes};
    pub use crate::scene::{
        Culler, DestroyOptions, Effect, EffectKind, FrameStats, NodeId, RenderGroupId, RenderPipe,
        Scene, View,
    };
    pub use crate::texture::{Texture, TextureRef};
    pub use crate::uid::UidCounter;
}
