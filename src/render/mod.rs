//! Instruction building.
//!
//! Each render group turns its subtree into an [`InstructionSet`]: batchable
//! content is fed to the group's [`Batcher`](crate::batcher::Batcher) in
//! paint order, and anything that cannot be batched (nested groups, effects,
//! large meshes) breaks the current batch and emits its own instruction.

mod build;
mod instructions;

pub use instructions::{Instruction, InstructionSet, RenderPipes};

pub(crate) use build::update_renderable;
pub(crate) use instructions::dispatch;
