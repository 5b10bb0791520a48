//! Textures as seen by the batcher.
//!
//! Loading and uploading pixels belongs to the asset layer. The batcher
//! only needs a stable uid, the pixel size, the frame's uvs, and two mutable
//! stamps it writes while packing: the batch tick the texture was last bound
//! in and the slot it was bound to.

use std::cell::Cell;
use std::rc::Rc;

use crate::math::Rectangle;
use crate::uid::UidCounter;

/// Shared handle to a texture.
pub type TextureRef = Rc<Texture>;

/// Tick value meaning "never bound".
const UNBOUND: u64 = u64::MAX;

/// A texture region plus the bind bookkeeping used for batch residency.
#[derive(Debug)]
pub struct Texture {
    uid: u64,
    width: u32,
    height: u32,
    frame: Rectangle,
    uvs: [f32; 8],
    batch_tick: Cell<u64>,
    bind_location: Cell<u16>,
}

impl Texture {
    /// A texture whose frame covers the whole source.
    pub fn new(uids: &UidCounter, width: u32, height: u32) -> TextureRef {
        Self::with_frame(
            uids,
            width,
            height,
            Rectangle::new(0.0, 0.0, width as f32, height as f32),
        )
    }

    /// A texture showing the `frame` sub-rectangle (in pixels) of its source.
    pub fn with_frame(uids: &UidCounter, width: u32, height: u32, frame: Rectangle) -> TextureRef {
        let w = width.max(1) as f32;
        let h = height.max(1) as f32;
        let (u0, v0) = (frame.x / w, frame.y / h);
        let (u1, v1) = ((frame.x + frame.width) / w, (frame.y + frame.height) / h);

        Rc::new(Self {
            uid: uids.next_uid(),
            width,
            height,
            frame,
            // Clockwise from top-left, matching the quad packer's corner order.
            uvs: [u0, v0, u1, v0, u1, v1, u0, v1],
            batch_tick: Cell::new(UNBOUND),
            bind_location: Cell::new(0),
        })
    }

    /// Process-unique id.
    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The visible region in pixels.
    pub fn frame(&self) -> Rectangle {
        self.frame
    }

    /// Corner uvs as `[u0, v0, u1, v1, u2, v2, u3, v3]`.
    pub fn uvs(&self) -> &[f32; 8] {
        &self.uvs
    }

    /// Batch tick this texture was last bound in.
    pub fn batch_tick(&self) -> u64 {
        self.batch_tick.get()
    }

    /// Texture slot assigned in the batch identified by [`batch_tick`](Self::batch_tick).
    pub fn bind_location(&self) -> u16 {
        self.bind_location.get()
    }

    pub(crate) fn mark_bound(&self, tick: u64, location: u16) {
        self.batch_tick.set(tick);
        self.bind_location.set(location);
    }
}
