//! The ordered instruction list handed to the renderer.

use crate::batcher::{Batch, BatchAction, Batcher};
use crate::scene::{EffectKind, NodeId, RenderGroupId, RenderPipe};

/// One step of a render group's draw program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Draw batch `batch` of the group's batcher.
    Batch { action: BatchAction, batch: usize },
    /// Draw a nested render group with its own world transform.
    RenderGroup(RenderGroupId),
    /// Draw a node through its own pipe (unbatched content).
    Renderable { pipe: RenderPipe, node: NodeId },
    /// Start an effect scope around `node`'s subtree.
    PushEffect { effect: EffectKind, node: NodeId },
    /// End the effect scope opened for `node`.
    PopEffect { effect: EffectKind, node: NodeId },
}

impl Instruction {
    /// String id of the pipe that executes this instruction.
    pub fn pipe_id(&self) -> &'static str {
        match self {
            Instruction::Batch { .. } => "batch",
            Instruction::RenderGroup(_) => "renderGroup",
            Instruction::Renderable { pipe, .. } => pipe.id(),
            Instruction::PushEffect { effect, .. } | Instruction::PopEffect { effect, .. } => {
                effect.pipe_id()
            }
        }
    }
}

/// Receives instructions in draw order.
///
/// Implemented by the GPU backend. Each method corresponds to one pipe.
pub trait RenderPipes {
    fn execute_batch(&mut self, action: BatchAction, batch: &Batch, batcher: &Batcher);

    fn execute_render_group(&mut self, group: RenderGroupId);

    fn execute_renderable(&mut self, pipe: RenderPipe, node: NodeId);

    fn push_effect(&mut self, effect: EffectKind, node: NodeId);

    fn pop_effect(&mut self, effect: EffectKind, node: NodeId);
}

/// A flat, ordered list of [`Instruction`]s for one render group.
#[derive(Debug, Clone, Default)]
pub struct InstructionSet {
    instructions: Vec<Instruction>,
}

impl InstructionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear for a rebuild, keeping capacity.
    pub fn reset(&mut self) {
        self.instructions.clear();
    }

    pub fn add(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of batch draw instructions.
    pub fn batch_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| matches!(i, Instruction::Batch { .. }))
            .count()
    }

    /// Dispatch every instruction to `pipes`, resolving batches in `batcher`.
    pub fn execute(&self, batcher: &Batcher, pipes: &mut impl RenderPipes) {
        for instruction in &self.instructions {
            dispatch(instruction, batcher, pipes);
        }
    }
}

/// Route one instruction to its pipe.
pub(crate) fn dispatch(instruction: &Instruction, batcher: &Batcher, pipes: &mut impl RenderPipes) {
    match *instruction {
        Instruction::Batch { action, batch } => match batcher.batch(batch) {
            Some(b) => pipes.execute_batch(action, b, batcher),
            None => log::warn!("Instruction refers to missing batch {}", batch),
        },
        Instruction::RenderGroup(group) => pipes.execute_render_group(group),
        Instruction::Renderable { pipe, node } => pipes.execute_renderable(pipe, node),
        Instruction::PushEffect { effect, node } => pipes.push_effect(effect, node),
        Instruction::PopEffect { effect, node } => pipes.pop_effect(effect, node),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcher::{BatchTicker, BatchableElement};
    use crate::config::BatcherOptions;
    use crate::math::Bounds;
    use crate::texture::Texture;
    use crate::uid::UidCounter;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl RenderPipes for Recorder {
        fn execute_batch(&mut self, action: BatchAction, batch: &Batch, _batcher: &Batcher) {
            self.calls
                .push(format!("{}:{}+{}", action.as_str(), batch.start, batch.size));
        }

        fn execute_render_group(&mut self, _group: RenderGroupId) {
            self.calls.push("group".to_string());
        }

        fn execute_renderable(&mut self, pipe: RenderPipe, _node: NodeId) {
            self.calls.push(pipe.id().to_string());
        }

        fn push_effect(&mut self, effect: EffectKind, _node: NodeId) {
            self.calls.push(format!("push {}", effect.pipe_id()));
        }

        fn pop_effect(&mut self, effect: EffectKind, _node: NodeId) {
            self.calls.push(format!("pop {}", effect.pipe_id()));
        }
    }

    #[test]
    fn test_execute_dispatches_batches_in_order() {
        let uids = UidCounter::new();
        let a = Texture::new(&uids, 4, 4);
        let b = Texture::new(&uids, 4, 4);
        let mut batcher =
            Batcher::new(BatcherOptions::default().with_max_textures(1), BatchTicker::new())
                .unwrap();
        let mut set = InstructionSet::new();

        batcher.begin();
        batcher.add(BatchableElement::quad(a, Bounds::new(0.0, 0.0, 1.0, 1.0)));
        batcher.add(BatchableElement::quad(b, Bounds::new(0.0, 0.0, 1.0, 1.0)));
        batcher.finish(&mut set);

        let mut recorder = Recorder::default();
        set.execute(&batcher, &mut recorder);
        assert_eq!(
            recorder.calls,
            vec!["startBatch:0+6".to_string(), "renderBatch:6+6".to_string()]
        );
        assert_eq!(set.batch_count(), 2);
    }

    #[test]
    fn test_pipe_ids() {
        let batch = Instruction::Batch {
            action: BatchAction::StartBatch,
            batch: 0,
        };
        assert_eq!(batch.pipe_id(), "batch");
    }
}
