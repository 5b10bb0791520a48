/// How a node's pixels combine with what is already drawn.
///
/// `Inherit` is only meaningful on nodes: it resolves to the parent's group
/// blend mode during the transform pass. Batches always carry a concrete
/// mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Inherit,
    Normal,
    Add,
    Multiply,
    Screen,
    Erase,
    None,
}

impl BlendMode {
    /// Resolve `Inherit` against the parent's mode.
    pub fn resolve(self, parent: BlendMode) -> BlendMode {
        match self {
            BlendMode::Inherit => parent,
            other => other,
        }
    }

    /// The concrete mode used when nothing up the chain sets one.
    pub fn or_normal(self) -> BlendMode {
        match self {
            BlendMode::Inherit => BlendMode::Normal,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        assert_eq!(BlendMode::Inherit.resolve(BlendMode::Add), BlendMode::Add);
        assert_eq!(BlendMode::Screen.resolve(BlendMode::Add), BlendMode::Screen);
        assert_eq!(BlendMode::Inherit.or_normal(), BlendMode::Normal);
    }
}
