//! Draw-call coalescing.
//!
//! The [`Batcher`] takes a paint-ordered stream of [`BatchableElement`]s and
//! packs them into shared attribute/index buffers, cutting the stream into
//! the fewest [`Batch`]es a single greedy pass can produce:
//!
//! - a batch never binds more than `max_textures` distinct textures
//! - a batch never spans a blend-mode or topology change
//! - elements are never reordered, so overlapping content keeps its paint order
//!
//! # Lifecycle
//!
//! ```text
//! begin() ──► add(element)* ──► break_batch() ──► add(element)* ──► finish()
//! ```
//!
//! `break_batch` is also what callers use when something that cannot be
//! batched (an effect, a custom pipe) interrupts the stream.
//!
//! Texture residency is tested in O(1): every texture carries the tick of the
//! batch it was last bound in, and the [`BatchTicker`] advances whenever a
//! batch is closed. Batchers that share textures must share a ticker.

mod batch;
mod buffers;
mod element;
mod vertex;

pub use batch::{Batch, BatchAction, BatchTextures};
pub use buffers::{AttributeBuffer, IndexBuffer};
pub use element::{BatchableElement, ElementGeometry};
pub use vertex::{BatchVertex, QUAD_INDICES, VERTEX_SIZE, pack_texture_id};

use std::cell::Cell;
use std::rc::Rc;

use crate::config::BatcherOptions;
use crate::error::SceneResult;
use crate::pool::Pool;
use crate::render::{Instruction, InstructionSet};

/// Shared batch tick used to stamp texture residency.
#[derive(Clone, Debug, Default)]
pub struct BatchTicker {
    tick: Rc<Cell<u64>>,
}

impl BatchTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick of the batch currently being filled.
    pub fn current(&self) -> u64 {
        self.tick.get()
    }

    /// Close the current batch and return the new tick.
    pub fn advance(&self) -> u64 {
        let next = self.tick.get() + 1;
        self.tick.set(next);
        next
    }
}

/// Packs elements into batches; see the [module docs](self).
#[derive(Debug)]
pub struct Batcher {
    max_textures: usize,
    ticker: BatchTicker,

    elements: Vec<BatchableElement>,
    element_start: usize,

    /// Words reserved in the attribute buffer by added elements
    attribute_size: usize,
    /// Entries reserved in the index buffer by added elements
    index_size: usize,

    attribute_buffer: AttributeBuffer,
    index_buffer: IndexBuffer,

    batches: Vec<Batch>,
    batch_pool: Pool<Batch>,
    batch_index_start: usize,
    batch_index_size: usize,

    dirty: bool,
}

impl Batcher {
    /// Create a batcher. Fails if the options are invalid.
    pub fn new(options: BatcherOptions, ticker: BatchTicker) -> SceneResult<Self> {
        options.validate()?;
        Ok(Self {
            max_textures: options.max_textures,
            ticker,
            elements: Vec::new(),
            element_start: 0,
            attribute_size: 0,
            index_size: 0,
            attribute_buffer: AttributeBuffer::with_vertices(options.attributes_initial_size),
            index_buffer: IndexBuffer::with_len(options.indices_initial_size),
            batches: Vec::new(),
            batch_pool: Pool::new(),
            batch_index_start: 0,
            batch_index_size: 0,
            dirty: true,
        })
    }

    /// Reset for a new build. Backing storage is kept.
    pub fn begin(&mut self) {
        self.elements.clear();
        self.element_start = 0;
        self.attribute_size = 0;
        self.index_size = 0;
        for batch in self.batches.drain(..) {
            self.batch_pool.return_item(batch);
        }
        self.batch_index_start = 0;
        self.batch_index_size = 0;
        self.dirty = true;
    }

    /// Queue an element; returns its index for later [`update_element`](Self::update_element).
    pub fn add(&mut self, mut element: BatchableElement) -> usize {
        element.index_start = self.index_size;
        element.attribute_start = self.attribute_size;
        element.batch = None;
        self.index_size += element.index_size();
        self.attribute_size += element.attribute_size() * VERTEX_SIZE;

        self.elements.push(element);
        self.elements.len() - 1
    }

    /// Pack every element queued since the last break into batches and
    /// append them to `instructions`.
    pub fn break_batch(&mut self, instructions: &mut InstructionSet) {
        if self.element_start >= self.elements.len() {
            return;
        }

        self.attribute_buffer.ensure(self.attribute_size);
        self.index_buffer
            .ensure(self.index_size, self.attribute_size / VERTEX_SIZE);

        let Self {
            max_textures,
            ticker,
            elements,
            element_start,
            attribute_buffer,
            index_buffer,
            batches,
            batch_pool,
            batch_index_start,
            batch_index_size,
            ..
        } = self;

        let first = &elements[*element_start];
        let mut blend_mode = first.blend_mode;
        let mut topology = first.topology;

        let mut batch = batch_pool.get();
        let mut start = *batch_index_start;
        let mut size = *batch_index_size;
        let mut action = BatchAction::StartBatch;
        let mut tick = ticker.current();

        for element in &mut elements[*element_start..] {
            let break_required = blend_mode != element.blend_mode || topology != element.topology;

            let texture = &element.texture;
            let texture_id = if texture.batch_tick() == tick && !break_required {
                texture.bind_location()
            } else {
                if batch.textures.len() >= *max_textures || break_required {
                    batch.size = size - start;
                    finish_batch(batches, batch, start, blend_mode, topology, action, instructions);

                    action = BatchAction::RenderBatch;
                    start = size;
                    blend_mode = element.blend_mode;
                    topology = element.topology;
                    batch = batch_pool.get();
                    tick = ticker.advance();
                }
                let slot = batch.textures.push(texture.clone());
                texture.mark_bound(tick, slot);
                slot
            };

            element.texture_id = texture_id;
            element.batch = Some(batches.len());
            batch.element_count += 1;
            size += element.index_size();

            pack_element(element, attribute_buffer, index_buffer);
        }

        if batch.textures.is_empty() {
            batch_pool.return_item(batch);
        } else {
            batch.size = size - start;
            finish_batch(batches, batch, start, blend_mode, topology, action, instructions);
            start = size;
            ticker.advance();
        }

        *element_start = elements.len();
        *batch_index_start = start;
        *batch_index_size = size;
        self.dirty = true;
    }

    /// Final break for the build.
    pub fn finish(&mut self, instructions: &mut InstructionSet) {
        self.break_batch(instructions);
    }

    /// Re-pack an already packed element in place after `f` edits it.
    ///
    /// Only transform, color, uv and position changes can be applied this
    /// way. If `f` changes the texture, blend mode, topology or the
    /// vertex/index counts the edit is discarded and `false` is returned; the
    /// caller must rebuild instead.
    pub fn update_element(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut BatchableElement),
    ) -> bool {
        let Some(element) = self.elements.get_mut(index) else {
            return false;
        };
        if element.batch.is_none() {
            return false;
        }

        let mut edited = element.clone();
        f(&mut edited);
        let compatible = edited.texture.uid() == element.texture.uid()
            && edited.blend_mode == element.blend_mode
            && edited.topology == element.topology
            && edited.attribute_size() == element.attribute_size()
            && edited.index_size() == element.index_size();
        if !compatible {
            return false;
        }

        edited.attribute_start = element.attribute_start;
        edited.index_start = element.index_start;
        edited.texture_id = element.texture_id;
        edited.batch = element.batch;
        *element = edited;

        pack_element(element, &mut self.attribute_buffer, &mut self.index_buffer);
        self.dirty = true;
        true
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn batch(&self, index: usize) -> Option<&Batch> {
        self.batches.get(index)
    }

    pub fn elements(&self) -> &[BatchableElement] {
        &self.elements
    }

    pub fn attribute_buffer(&self) -> &AttributeBuffer {
        &self.attribute_buffer
    }

    pub fn index_buffer(&self) -> &IndexBuffer {
        &self.index_buffer
    }

    /// Vertices packed so far.
    pub fn vertex_count(&self) -> usize {
        self.attribute_size / VERTEX_SIZE
    }

    /// Indices packed so far.
    pub fn index_count(&self) -> usize {
        self.index_size
    }

    pub fn max_textures(&self) -> usize {
        self.max_textures
    }

    /// Whether buffers changed since the last [`take_dirty`](Self::take_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read and clear the upload flag.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

fn finish_batch(
    batches: &mut Vec<Batch>,
    mut batch: Batch,
    start: usize,
    blend_mode: crate::blend::BlendMode,
    topology: crate::geometry::Topology,
    action: BatchAction,
    instructions: &mut InstructionSet,
) {
    batch.action = action;
    batch.start = start;
    batch.blend_mode = blend_mode;
    batch.topology = topology;

    instructions.add(Instruction::Batch {
        action,
        batch: batches.len(),
    });
    batches.push(batch);
}

fn pack_element(
    element: &BatchableElement,
    attributes: &mut AttributeBuffer,
    indices: &mut IndexBuffer,
) {
    let vertex_offset = (element.attribute_start / VERTEX_SIZE) as u32;
    match &element.geometry {
        ElementGeometry::Quad { bounds } => {
            pack_quad_attributes(element, bounds, attributes);
            for (i, q) in QUAD_INDICES.iter().enumerate() {
                indices.set(element.index_start + i, vertex_offset + q);
            }
        }
        ElementGeometry::Mesh {
            geometry,
            attribute_offset,
            attribute_size,
            index_offset,
            index_size,
        } => {
            let m = &element.transform;
            let texture_id_and_round = pack_texture_id(element.texture_id, element.round_pixels);
            let mut word = element.attribute_start;
            for v in *attribute_offset..*attribute_offset + *attribute_size {
                let pair = |values: &[f32]| {
                    (
                        values.get(v * 2).copied().unwrap_or_default(),
                        values.get(v * 2 + 1).copied().unwrap_or_default(),
                    )
                };
                let (x, y) = pair(&geometry.positions);
                let (tu, tv) = pair(&geometry.uvs);
                let (px, py) = m.transform_point(x, y);
                attributes.write_f32(word, px);
                attributes.write_f32(word + 1, py);
                attributes.write_f32(word + 2, tu);
                attributes.write_f32(word + 3, tv);
                attributes.write_u32(word + 4, element.color);
                attributes.write_u32(word + 5, texture_id_and_round);
                word += VERTEX_SIZE;
            }

            // Indices are rebased from the geometry's vertex numbering onto
            // this element's slot in the shared buffer.
            // Views are validated on entry; an index that still falls outside
            // the part collapses onto the part's first vertex.
            let bias = *attribute_offset as u32;
            let limit = *attribute_size as u32;
            for i in 0..*index_size {
                let local = geometry
                    .indices
                    .get(index_offset + i)
                    .and_then(|index| index.checked_sub(bias))
                    .filter(|local| *local < limit)
                    .unwrap_or(0);
                indices.set(element.index_start + i, vertex_offset + local);
            }
        }
    }
}

fn pack_quad_attributes(
    element: &BatchableElement,
    bounds: &crate::math::Bounds,
    attributes: &mut AttributeBuffer,
) {
    let m = &element.transform;
    let uvs = element.texture.uvs();
    let texture_id_and_round = pack_texture_id(element.texture_id, element.round_pixels);
    let corners = [
        (bounds.min_x, bounds.min_y),
        (bounds.max_x, bounds.min_y),
        (bounds.max_x, bounds.max_y),
        (bounds.min_x, bounds.max_y),
    ];

    let mut word = element.attribute_start;
    for (i, (x, y)) in corners.into_iter().enumerate() {
        let (px, py) = m.transform_point(x, y);
        attributes.write_f32(word, px);
        attributes.write_f32(word + 1, py);
        attributes.write_f32(word + 2, uvs[i * 2]);
        attributes.write_f32(word + 3, uvs[i * 2 + 1]);
        attributes.write_u32(word + 4, element.color);
        attributes.write_u32(word + 5, texture_id_and_round);
        word += VERTEX_SIZE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::BlendMode;
    use crate::geometry::{Geometry, Topology};
    use crate::math::{Bounds, Matrix};
    use crate::texture::{Texture, TextureRef};
    use crate::uid::UidCounter;

    fn batcher(max_textures: usize) -> Batcher {
        let options = BatcherOptions {
            max_textures,
            ..BatcherOptions::default()
        };
        Batcher::new(options, BatchTicker::new()).unwrap()
    }

    fn quad(texture: &TextureRef) -> BatchableElement {
        BatchableElement::quad(texture.clone(), Bounds::new(0.0, 0.0, 10.0, 10.0))
    }

    fn textures(n: usize) -> Vec<TextureRef> {
        let uids = UidCounter::new();
        (0..n).map(|_| Texture::new(&uids, 8, 8)).collect()
    }

    fn batch_instructions(set: &InstructionSet) -> Vec<(BatchAction, usize)> {
        set.iter()
            .filter_map(|i| match i {
                Instruction::Batch { action, batch } => Some((*action, *batch)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_texture_limit_splits_batches() {
        let t = textures(3);
        let (a, b, c) = (&t[0], &t[1], &t[2]);
        let mut batcher = batcher(2);
        let mut set = InstructionSet::new();

        batcher.begin();
        for tex in [a, a, b, c] {
            batcher.add(quad(tex));
        }
        batcher.finish(&mut set);

        let batches = batcher.batches();
        assert_eq!(batches.len(), 2);

        assert_eq!(batches[0].element_count, 3);
        assert_eq!(batches[0].textures.len(), 2);
        assert_eq!(batches[0].textures.slot_of(a.uid()), Some(0));
        assert_eq!(batches[0].textures.slot_of(b.uid()), Some(1));
        assert_eq!(batches[0].start, 0);
        assert_eq!(batches[0].size, 18);

        assert_eq!(batches[1].element_count, 1);
        assert_eq!(batches[1].textures.slot_of(c.uid()), Some(0));
        assert_eq!(batches[1].start, 18);
        assert_eq!(batches[1].size, 6);

        assert_eq!(
            batch_instructions(&set),
            vec![(BatchAction::StartBatch, 0), (BatchAction::RenderBatch, 1)]
        );
    }

    #[test]
    fn test_blend_change_breaks_regardless_of_limit() {
        let t = textures(1);
        let mut batcher = batcher(16);
        let mut set = InstructionSet::new();

        batcher.begin();
        batcher.add(quad(&t[0]).with_blend_mode(BlendMode::Normal));
        batcher.add(quad(&t[0]).with_blend_mode(BlendMode::Add));
        batcher.finish(&mut set);

        let batches = batcher.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].blend_mode, BlendMode::Normal);
        assert_eq!(batches[1].blend_mode, BlendMode::Add);
        // The texture is bound again in the new batch.
        assert_eq!(batches[1].textures.len(), 1);
    }

    #[test]
    fn test_topology_change_breaks() {
        let t = textures(1);
        let mut batcher = batcher(16);
        let mut set = InstructionSet::new();
        let geometry = std::rc::Rc::new(Geometry::new(
            vec![0.0, 0.0, 1.0, 1.0],
            vec![0.0, 0.0, 1.0, 1.0],
            vec![0, 1],
            Topology::LineList,
        ));

        batcher.begin();
        batcher.add(quad(&t[0]));
        batcher.add(BatchableElement::mesh(
            t[0].clone(),
            ElementGeometry::whole_mesh(geometry),
            Topology::LineList,
        ));
        batcher.finish(&mut set);

        assert_eq!(batcher.batches().len(), 2);
        assert_eq!(batcher.batches()[1].topology, Topology::LineList);
    }

    #[test]
    fn test_empty_break_emits_nothing() {
        let mut batcher = batcher(4);
        let mut set = InstructionSet::new();
        batcher.begin();
        batcher.break_batch(&mut set);
        batcher.finish(&mut set);
        assert!(batcher.batches().is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn test_break_between_runs_starts_new_batch() {
        let t = textures(1);
        let mut batcher = batcher(4);
        let mut set = InstructionSet::new();

        batcher.begin();
        batcher.add(quad(&t[0]));
        batcher.break_batch(&mut set);
        batcher.add(quad(&t[0]));
        batcher.finish(&mut set);

        let batches = batcher.batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].start, 6);
        assert_eq!(batches[1].action, BatchAction::StartBatch);
    }

    #[test]
    fn test_quad_packing() {
        let t = textures(2);
        let mut batcher = batcher(4);
        let mut set = InstructionSet::new();

        batcher.begin();
        batcher.add(quad(&t[0]));
        batcher.add(
            quad(&t[1])
                .with_transform(Matrix::translate(100.0, 0.0))
                .with_color(0x80FF_0000),
        );
        batcher.finish(&mut set);

        let verts = batcher.attribute_buffer().vertices(8);
        assert_eq!(verts[0].position, [0.0, 0.0]);
        assert_eq!(verts[2].position, [10.0, 10.0]);
        assert_eq!(verts[4].position, [100.0, 0.0]);
        assert_eq!(verts[5].uv, [1.0, 0.0]);
        assert_eq!(verts[4].color, 0x80FF_0000);
        assert_eq!(verts[4].texture_id(), 1);

        let idx: Vec<u32> = (0..12).map(|i| batcher.index_buffer().get(i)).collect();
        assert_eq!(idx, vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]);
    }

    #[test]
    fn test_mesh_indices_are_rebased() {
        let t = textures(1);
        let mut batcher = batcher(4);
        let mut set = InstructionSet::new();
        // Two triangles; the element draws only the second (vertices 3..6).
        let geometry = std::rc::Rc::new(Geometry::new(
            vec![0.0; 12],
            vec![0.0; 12],
            vec![0, 1, 2, 3, 4, 5],
            Topology::TriangleList,
        ));

        batcher.begin();
        batcher.add(quad(&t[0]));
        batcher.add(BatchableElement::mesh(
            t[0].clone(),
            ElementGeometry::Mesh {
                geometry,
                attribute_offset: 3,
                attribute_size: 3,
                index_offset: 3,
                index_size: 3,
            },
            Topology::TriangleList,
        ));
        batcher.finish(&mut set);

        let idx: Vec<u32> = (6..9).map(|i| batcher.index_buffer().get(i)).collect();
        assert_eq!(idx, vec![4, 5, 6]);
        assert_eq!(batcher.batches().len(), 1);
        assert_eq!(batcher.batches()[0].size, 9);
    }

    #[test]
    fn test_out_of_part_indices_collapse_to_first_vertex() {
        let t = textures(1);
        let mut batcher = batcher(4);
        let mut set = InstructionSet::new();
        // Indices 0..3 sit below the part's vertex range 3..6.
        let geometry = std::rc::Rc::new(Geometry::new(
            vec![0.0; 12],
            vec![0.0; 12],
            vec![0, 1, 2],
            Topology::TriangleList,
        ));

        batcher.begin();
        batcher.add(BatchableElement::mesh(
            t[0].clone(),
            ElementGeometry::Mesh {
                geometry,
                attribute_offset: 3,
                attribute_size: 3,
                index_offset: 0,
                index_size: 3,
            },
            Topology::TriangleList,
        ));
        batcher.finish(&mut set);

        let idx: Vec<u32> = (0..3).map(|i| batcher.index_buffer().get(i)).collect();
        assert_eq!(idx, vec![0, 0, 0]);
    }

    #[test]
    fn test_buffers_grow_and_keep_data() {
        let t = textures(1);
        let mut batcher = batcher(4);
        let mut set = InstructionSet::new();

        batcher.begin();
        for i in 0..100 {
            batcher.add(quad(&t[0]).with_transform(Matrix::translate(i as f32, 0.0)));
        }
        batcher.finish(&mut set);

        let verts = batcher.attribute_buffer().vertices(400);
        assert_eq!(verts.len(), 400);
        assert_eq!(verts[0].position, [0.0, 0.0]);
        assert_eq!(verts[396].position, [99.0, 0.0]);
        assert_eq!(batcher.index_buffer().get(599), 399);
        assert_eq!(batcher.batches().len(), 1);
    }

    #[test]
    fn test_index_promotion_through_batcher() {
        let t = textures(1);
        let mut batcher = batcher(4);
        let mut set = InstructionSet::new();

        // 11_000 quads -> 66_000 indices, 44_000 vertices
        batcher.begin();
        for _ in 0..11_000 {
            batcher.add(quad(&t[0]));
        }
        batcher.finish(&mut set);

        let indices = batcher.index_buffer();
        assert!(indices.is_wide());
        assert_eq!(indices.get(0), 0);
        assert_eq!(indices.get(65_999), 43_999);
    }

    #[test]
    fn test_begin_recycles_batches() {
        let t = textures(1);
        let mut batcher = batcher(4);

        for _ in 0..3 {
            let mut set = InstructionSet::new();
            batcher.begin();
            batcher.add(quad(&t[0]));
            batcher.finish(&mut set);
            assert_eq!(batcher.batches().len(), 1);
        }
        assert_eq!(batcher.batch_pool.created_count(), 1);
    }

    #[test]
    fn test_residency_does_not_leak_between_builds() {
        let t = textures(2);
        let mut batcher = batcher(1);
        let mut set = InstructionSet::new();

        batcher.begin();
        batcher.add(quad(&t[0]));
        batcher.finish(&mut set);

        // A stale stamp from the previous build must not count as resident.
        set.reset();
        batcher.begin();
        batcher.add(quad(&t[1]));
        batcher.add(quad(&t[0]));
        batcher.finish(&mut set);
        assert_eq!(batcher.batches().len(), 2);
    }

    #[test]
    fn test_update_element_repacks_in_place() {
        let t = textures(1);
        let mut batcher = batcher(4);
        let mut set = InstructionSet::new();

        batcher.begin();
        batcher.add(quad(&t[0]));
        let second = batcher.add(quad(&t[0]));
        batcher.finish(&mut set);

        assert!(batcher.update_element(second, |e| {
            e.transform = Matrix::translate(5.0, 5.0);
        }));
        let verts = batcher.attribute_buffer().vertices(8);
        assert_eq!(verts[4].position, [5.0, 5.0]);
        assert_eq!(verts[0].position, [0.0, 0.0]);
    }

    #[test]
    fn test_update_element_rejects_texture_change() {
        let t = textures(2);
        let mut batcher = batcher(4);
        let mut set = InstructionSet::new();

        batcher.begin();
        let first = batcher.add(quad(&t[0]));
        batcher.finish(&mut set);

        let other = t[1].clone();
        assert!(!batcher.update_element(first, move |e| e.texture = other));
        assert_eq!(batcher.elements()[first].texture.uid(), t[0].uid());
    }

    #[test]
    fn test_invalid_options() {
        let options = BatcherOptions {
            max_textures: 0,
            ..BatcherOptions::default()
        };
        assert!(Batcher::new(options, BatchTicker::new()).is_err());
    }
}
