//! Scene-graph node data.

use bitflags::bitflags;

use crate::arena::RawId;
use crate::blend::BlendMode;
use crate::cache::Cached;
use crate::color::{WHITE_BGR, pack_color_alpha};
use crate::math::{Bounds, Matrix, Point, Rectangle};

use super::effects::Effect;
use super::render_group::RenderGroupId;
use super::view::View;

/// Handle to a node in a [`Scene`](super::Scene).
///
/// Handles are generational: once a node is destroyed its handle stops
/// resolving, even if the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(pub(crate) RawId);

impl NodeId {
    /// Convert to a u64 for external use.
    pub fn as_u64(self) -> u64 {
        self.0.as_u64()
    }
}

bitflags! {
    /// Per-node drawing eligibility. A node draws only when all bits are set
    /// on it and on every ancestor up to its render group root.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct DisplayStatus: u8 {
        const RENDERABLE = 0b001;
        const VISIBLE = 0b010;
        const NOT_CULLED = 0b100;
    }
}

bitflags! {
    /// Which inherited group properties must be recomputed for a node.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct UpdateFlags: u8 {
        const COLOR = 0b0001;
        const BLEND = 0b0010;
        const VISIBLE = 0b0100;
        const TRANSFORM = 0b1000;
    }
}

impl UpdateFlags {
    /// Flags that require an inherited-property pass.
    pub const COLOR_BLEND_VISIBLE: Self = Self::COLOR.union(Self::BLEND).union(Self::VISIBLE);
}

/// Options for [`Scene::destroy`](super::Scene::destroy).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestroyOptions {
    /// Destroy the children too instead of leaving them detached.
    pub children: bool,
}

impl DestroyOptions {
    pub fn with_children() -> Self {
        Self { children: true }
    }
}

/// A tree entity: local transform components, inherited group state and the
/// dirty ticks that drive incremental updates.
#[derive(Debug)]
pub struct Node {
    pub(crate) uid: u64,
    pub(crate) label: Option<String>,

    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,

    // Transform components
    pub(crate) position: Point,
    pub(crate) scale: Point,
    pub(crate) pivot: Point,
    pub(crate) origin: Point,
    pub(crate) skew: Point,
    pub(crate) rotation: f32,
    // Rotation/skew basis, refreshed whenever rotation or skew changes
    pub(crate) cx: f32,
    pub(crate) sx: f32,
    pub(crate) cy: f32,
    pub(crate) sy: f32,

    pub(crate) local_transform: Matrix,
    /// Transform into the coordinate space of the owning render group
    pub(crate) relative_group_transform: Matrix,

    // Dirty tracking
    pub(crate) container_change_tick: u64,
    pub(crate) local_composed_tick: Option<u64>,
    pub(crate) view_change_tick: u64,
    pub(crate) did_change: bool,
    pub(crate) did_view_update: bool,
    pub(crate) update_flags: UpdateFlags,
    pub(crate) update_tick: Option<u64>,

    // Local appearance
    pub(crate) local_color: u32,
    pub(crate) local_alpha: f32,
    pub(crate) local_blend_mode: BlendMode,
    pub(crate) local_display_status: DisplayStatus,

    // Inherited within the render group
    pub(crate) group_color: u32,
    pub(crate) group_alpha: f32,
    pub(crate) group_color_alpha: u32,
    pub(crate) group_blend_mode: BlendMode,
    pub(crate) global_display_status: DisplayStatus,

    pub(crate) render_group: Option<RenderGroupId>,
    pub(crate) parent_render_group: Option<RenderGroupId>,
    pub(crate) relative_render_group_depth: usize,

    pub(crate) z_index: i32,
    pub(crate) sortable_children: bool,
    pub(crate) sort_dirty: bool,

    pub(crate) cullable: bool,
    pub(crate) cullable_children: bool,
    pub(crate) cull_area: Option<Rectangle>,
    pub(crate) include_in_build: bool,
    pub(crate) measurable: bool,
    /// The node this one is the mask of
    pub(crate) mask_owner: Option<NodeId>,

    pub(crate) view: Option<View>,
    pub(crate) effects: Vec<Effect>,
    /// Elements this node's view occupies in its group's batcher
    pub(crate) render_elements: Vec<usize>,

    pub(crate) local_bounds: Cached<Bounds>,
    pub(crate) global_bounds: Cached<Bounds>,
}

impl Node {
    pub(crate) fn new(uid: u64) -> Self {
        Self {
            uid,
            label: None,
            parent: None,
            children: Vec::new(),
            position: Point::ZERO,
            scale: Point::ONE,
            pivot: Point::ZERO,
            origin: Point::ZERO,
            skew: Point::ZERO,
            rotation: 0.0,
            cx: 1.0,
            sx: 0.0,
            cy: 0.0,
            sy: 1.0,
            local_transform: Matrix::IDENTITY,
            relative_group_transform: Matrix::IDENTITY,
            container_change_tick: 0,
            local_composed_tick: None,
            view_change_tick: 0,
            did_change: false,
            did_view_update: false,
            update_flags: UpdateFlags::all(),
            update_tick: None,
            local_color: WHITE_BGR,
            local_alpha: 1.0,
            local_blend_mode: BlendMode::Inherit,
            local_display_status: DisplayStatus::all(),
            group_color: WHITE_BGR,
            group_alpha: 1.0,
            group_color_alpha: 0xFFFF_FFFF,
            group_blend_mode: BlendMode::Normal,
            global_display_status: DisplayStatus::all(),
            render_group: None,
            parent_render_group: None,
            relative_render_group_depth: 0,
            z_index: 0,
            sortable_children: false,
            sort_dirty: false,
            cullable: false,
            cullable_children: true,
            cull_area: None,
            include_in_build: true,
            measurable: true,
            mask_owner: None,
            view: None,
            effects: Vec::new(),
            render_elements: Vec::new(),
            local_bounds: Cached::default(),
            global_bounds: Cached::default(),
        }
    }

    /// Recompose the local matrix if any component changed since the last
    /// composition. Repeated calls without a mutation are no-ops.
    pub(crate) fn update_local_transform(&mut self) {
        if self.local_composed_tick == Some(self.container_change_tick) {
            return;
        }
        self.local_composed_tick = Some(self.container_change_tick);

        let (sx, sy) = (self.scale.x, self.scale.y);
        let (px, py) = (self.pivot.x, self.pivot.y);
        let ox = -self.origin.x;
        let oy = -self.origin.y;

        let lt = &mut self.local_transform;
        lt.a = self.cx * sx;
        lt.b = self.sx * sx;
        lt.c = self.cy * sy;
        lt.d = self.sy * sy;

        lt.tx = self.position.x - (px * lt.a + py * lt.c) + (ox * lt.a + oy * lt.c) - ox;
        lt.ty = self.position.y - (px * lt.b + py * lt.d) + (ox * lt.b + oy * lt.d) - oy;
    }

    pub(crate) fn update_skew(&mut self) {
        let rotation = self.rotation;
        self.cx = (rotation + self.skew.y).cos();
        self.sx = (rotation + self.skew.y).sin();
        self.cy = -(rotation - self.skew.x).sin();
        self.sy = (rotation - self.skew.x).cos();
    }

    /// Transform children compose against: identity for a render group root,
    /// whose children live in the group's own space.
    pub(crate) fn group_transform(&self) -> Matrix {
        if self.render_group.is_some() {
            Matrix::IDENTITY
        } else {
            self.relative_group_transform
        }
    }

    /// Color children inherit inside the group; white for a group root.
    pub(crate) fn child_group_color(&self) -> (u32, f32, BlendMode, DisplayStatus) {
        if self.render_group.is_some() {
            (WHITE_BGR, 1.0, BlendMode::Normal, DisplayStatus::all())
        } else {
            (
                self.group_color,
                self.group_alpha,
                self.group_blend_mode,
                self.global_display_status,
            )
        }
    }

    /// Packed color the node's own view is drawn with inside its render group.
    pub(crate) fn view_color_alpha(&self) -> u32 {
        if self.render_group.is_some() {
            0xFFFF_FFFF
        } else {
            self.group_color_alpha
        }
    }

    /// Recompute the inherited color, blend mode and visibility selected by
    /// `flags` from the parent's values.
    pub(crate) fn update_color_blend_visibility(
        &mut self,
        parent: (u32, f32, BlendMode, DisplayStatus),
        flags: UpdateFlags,
    ) {
        let (parent_color, parent_alpha, parent_blend, parent_status) = parent;
        if flags.contains(UpdateFlags::COLOR) {
            self.group_color = crate::color::multiply_colors(self.local_color, parent_color);
            self.group_alpha = crate::color::clamp_alpha(self.local_alpha * parent_alpha);
            self.group_color_alpha = pack_color_alpha(self.group_color, self.group_alpha);
        }
        if flags.contains(UpdateFlags::BLEND) {
            self.group_blend_mode = self.local_blend_mode.resolve(parent_blend).or_normal();
        }
        if flags.contains(UpdateFlags::VISIBLE) {
            self.global_display_status = self.local_display_status & parent_status;
        }
        self.update_flags = UpdateFlags::empty();
    }

    /// No render group and no effects: traversal can treat the node as a
    /// plain list of children.
    pub fn is_simple(&self) -> bool {
        self.render_group.is_none() && self.effects.is_empty()
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in paint order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn scale(&self) -> Point {
        self.scale
    }

    pub fn pivot(&self) -> Point {
        self.pivot
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn skew(&self) -> Point {
        self.skew
    }

    /// Rotation in radians.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Rotation in degrees.
    pub fn angle(&self) -> f32 {
        self.rotation.to_degrees()
    }

    /// The last composed local matrix.
    pub fn local_transform(&self) -> &Matrix {
        &self.local_transform
    }

    /// Transform into the owning render group's space, as of the last update.
    pub fn relative_group_transform(&self) -> &Matrix {
        &self.relative_group_transform
    }

    pub fn container_change_tick(&self) -> u64 {
        self.container_change_tick
    }

    pub fn view_change_tick(&self) -> u64 {
        self.view_change_tick
    }

    /// Whether the node is queued for a transform update.
    pub fn did_change(&self) -> bool {
        self.did_change
    }

    pub fn alpha(&self) -> f32 {
        self.local_alpha
    }

    /// Tint as `0xRRGGBB`.
    pub fn tint(&self) -> u32 {
        crate::color::bgr_to_rgb(self.local_color)
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.local_blend_mode
    }

    /// Alpha inherited within the render group.
    pub fn group_alpha(&self) -> f32 {
        self.group_alpha
    }

    /// Color and alpha inherited within the render group, `0xAABBGGRR`.
    pub fn group_color_alpha(&self) -> u32 {
        self.group_color_alpha
    }

    /// Blend mode resolved within the render group.
    pub fn group_blend_mode(&self) -> BlendMode {
        self.group_blend_mode
    }

    pub fn visible(&self) -> bool {
        self.local_display_status.contains(DisplayStatus::VISIBLE)
    }

    pub fn renderable(&self) -> bool {
        self.local_display_status.contains(DisplayStatus::RENDERABLE)
    }

    pub fn culled(&self) -> bool {
        !self.local_display_status.contains(DisplayStatus::NOT_CULLED)
    }

    pub fn local_display_status(&self) -> DisplayStatus {
        self.local_display_status
    }

    pub fn global_display_status(&self) -> DisplayStatus {
        self.global_display_status
    }

    pub fn cullable(&self) -> bool {
        self.cullable
    }

    pub fn cull_area(&self) -> Option<Rectangle> {
        self.cull_area
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn sortable_children(&self) -> bool {
        self.sortable_children
    }

    /// The render group this node is the root of, if any.
    pub fn render_group(&self) -> Option<RenderGroupId> {
        self.render_group
    }

    /// The render group whose queues this node belongs to.
    pub fn parent_render_group(&self) -> Option<RenderGroupId> {
        self.parent_render_group
    }

    /// Depth below the owning render group's root (children of the root are 1).
    pub fn relative_render_group_depth(&self) -> usize {
        self.relative_render_group_depth
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    /// Batcher elements the view occupied in the last build.
    pub fn render_elements(&self) -> &[usize] {
        &self.render_elements
    }
}
