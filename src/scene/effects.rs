//! Effects that wrap a node's subtree in push/pop instructions.

use crate::math::Bounds;

use super::node::NodeId;

/// The closed set of effect kinds, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EffectKind {
    Mask,
    ColorMask,
    Filter,
}

impl EffectKind {
    /// String id of the pipe that executes this effect.
    pub fn pipe_id(self) -> &'static str {
        match self {
            EffectKind::Mask => "mask",
            EffectKind::ColorMask => "colorMask",
            EffectKind::Filter => "filter",
        }
    }

    /// Lower priorities are pushed first (outermost).
    pub fn priority(self) -> u8 {
        match self {
            EffectKind::Mask => 0,
            EffectKind::ColorMask => 1,
            EffectKind::Filter => 99,
        }
    }
}

/// An effect attached to a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Clip the subtree to `mask`'s shape (or its complement when `inverse`).
    Mask { mask: NodeId, inverse: bool },
    /// Write only the channels set in the 4-bit RGBA mask.
    ColorMask(u8),
    /// Run the subtree through a filter chain that reads `padding` extra
    /// pixels around the content.
    Filter { padding: f32 },
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::Mask { .. } => EffectKind::Mask,
            Effect::ColorMask(_) => EffectKind::ColorMask,
            Effect::Filter { .. } => EffectKind::Filter,
        }
    }

    pub fn pipe_id(&self) -> &'static str {
        self.kind().pipe_id()
    }

    pub fn priority(&self) -> u8 {
        self.kind().priority()
    }

    /// Adjust subtree bounds for this effect.
    ///
    /// `mask_bounds` are the global bounds of the mask node, resolved by the
    /// caller. Inverse masks do not shrink the bounds.
    pub(crate) fn add_bounds(&self, bounds: &mut Bounds, mask_bounds: Option<&Bounds>) {
        match self {
            Effect::Mask { inverse: false, .. } => {
                if let Some(mask) = mask_bounds {
                    bounds.fit(mask);
                }
            }
            Effect::Mask { inverse: true, .. } | Effect::ColorMask(_) => {}
            Effect::Filter { padding } => bounds.pad(*padding),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_order() {
        let mut kinds = vec![EffectKind::Filter, EffectKind::Mask, EffectKind::ColorMask];
        kinds.sort_by_key(|k| k.priority());
        assert_eq!(
            kinds,
            vec![EffectKind::Mask, EffectKind::ColorMask, EffectKind::Filter]
        );
    }

    #[test]
    fn test_filter_pads_bounds() {
        let mut bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
        Effect::Filter { padding: 2.0 }.add_bounds(&mut bounds, None);
        assert_eq!(bounds, Bounds::new(-2.0, -2.0, 12.0, 12.0));
    }

    #[test]
    fn test_mask_fits_bounds() {
        let mut bounds = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let mask = Bounds::new(5.0, 5.0, 20.0, 20.0);
        let node = NodeId(crate::arena::Arena::<()>::new().insert(()));
        Effect::Mask {
            mask: node,
            inverse: false,
        }
        .add_bounds(&mut bounds, Some(&mask));
        assert_eq!(bounds, Bounds::new(5.0, 5.0, 10.0, 10.0));
    }
}
