//! Packed color helpers.
//!
//! Colors travel through the scene as `0xBBGGRR` integers (the byte order
//! the vertex shader reads) and are combined with alpha into a single
//! `0xAABBGGRR` word when packed into vertex attributes.

/// Opaque white in BGR order.
pub const WHITE_BGR: u32 = 0xFF_FF_FF;

/// Convert a `0xRRGGBB` tint to `0xBBGGRR`.
pub fn rgb_to_bgr(rgb: u32) -> u32 {
    let r = (rgb >> 16) & 0xFF;
    let g = (rgb >> 8) & 0xFF;
    let b = rgb & 0xFF;
    (b << 16) | (g << 8) | r
}

/// Convert a `0xBBGGRR` color back to `0xRRGGBB`.
pub fn bgr_to_rgb(bgr: u32) -> u32 {
    // The swap is symmetric.
    rgb_to_bgr(bgr)
}

/// Multiply two BGR colors channel by channel.
///
/// White is the identity and black absorbs, both short-circuited.
pub fn multiply_colors(local: u32, parent: u32) -> u32 {
    if local == WHITE_BGR || parent == 0 {
        return parent;
    }
    if parent == WHITE_BGR || local == 0 {
        return local;
    }

    let channel = |shift: u32| -> u32 {
        let l = (local >> shift) & 0xFF;
        let p = (parent >> shift) & 0xFF;
        (l * p) / 255
    };

    (channel(16) << 16) | (channel(8) << 8) | channel(0)
}

/// Clamp an alpha value into `0.0..=1.0`.
pub fn clamp_alpha(alpha: f32) -> f32 {
    alpha.clamp(0.0, 1.0)
}

/// Pack a BGR color and an alpha into `0xAABBGGRR`.
pub fn pack_color_alpha(bgr: u32, alpha: f32) -> u32 {
    let a = (clamp_alpha(alpha) * 255.0) as u32;
    (bgr & 0x00FF_FFFF) | (a << 24)
}
