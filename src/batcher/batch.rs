use std::collections::HashMap;

use crate::blend::BlendMode;
use crate::geometry::Topology;
use crate::pool::Poolable;
use crate::texture::TextureRef;

/// Whether a batch starts a run (shader/buffers must be bound) or
/// continues one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchAction {
    #[default]
    StartBatch,
    RenderBatch,
}

impl BatchAction {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchAction::StartBatch => "startBatch",
            BatchAction::RenderBatch => "renderBatch",
        }
    }
}

/// Textures bound by one batch, with a uid → slot table.
#[derive(Debug, Clone, Default)]
pub struct BatchTextures {
    textures: Vec<TextureRef>,
    slots: HashMap<u64, u16>,
}

impl BatchTextures {
    /// Bind `texture` to the next free slot and return it.
    pub(crate) fn push(&mut self, texture: TextureRef) -> u16 {
        let slot = self.textures.len() as u16;
        self.slots.insert(texture.uid(), slot);
        self.textures.push(texture);
        slot
    }

    /// Slot assigned to the texture with `uid`, if bound.
    pub fn slot_of(&self, uid: u64) -> Option<u16> {
        self.slots.get(&uid).copied()
    }

    pub fn textures(&self) -> &[TextureRef] {
        &self.textures
    }

    /// Distinct textures bound.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.slots.clear();
    }
}

/// A contiguous run of packed indices drawn with one call.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub action: BatchAction,
    /// First index in the shared index buffer
    pub start: usize,
    /// Number of indices
    pub size: usize,
    pub textures: BatchTextures,
    pub blend_mode: BlendMode,
    pub topology: Topology,
    /// Elements packed into this batch
    pub element_count: usize,
}

impl Poolable for Batch {
    fn reset(&mut self) {
        self.action = BatchAction::StartBatch;
        self.start = 0;
        self.size = 0;
        self.textures.clear();
        self.blend_mode = BlendMode::Normal;
        self.topology = Topology::TriangleList;
        self.element_count = 0;
    }
}
