//! Scene and batcher configuration.

use crate::error::{SceneError, SceneResult};

/// Texture slots addressable through the 16-bit texture-id field of a vertex.
pub const MAX_TEXTURE_SLOTS: usize = u16::MAX as usize;

/// Sizing for a [`Batcher`](crate::batcher::Batcher).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatcherOptions {
    /// Distinct textures one batch may bind (hardware texture units).
    pub max_textures: usize,
    /// Initial attribute buffer capacity, in vertices.
    pub attributes_initial_size: usize,
    /// Initial index buffer capacity, in indices.
    pub indices_initial_size: usize,
}

impl Default for BatcherOptions {
    fn default() -> Self {
        Self {
            max_textures: 16,
            attributes_initial_size: 4,
            indices_initial_size: 6,
        }
    }
}

impl BatcherOptions {
    pub fn with_max_textures(mut self, max_textures: usize) -> Self {
        self.max_textures = max_textures;
        self
    }

    pub fn validate(&self) -> SceneResult<()> {
        if self.max_textures == 0 {
            return Err(SceneError::InvalidConfig(
                "max_textures must be at least 1".to_string(),
            ));
        }
        if self.max_textures > MAX_TEXTURE_SLOTS {
            return Err(SceneError::InvalidConfig(format!(
                "max_textures {} exceeds the {} slots a vertex can address",
                self.max_textures, MAX_TEXTURE_SLOTS
            )));
        }
        Ok(())
    }
}

/// Configuration for a [`Scene`](crate::scene::Scene).
#[derive(Debug, Clone, Default)]
pub struct SceneConfig {
    /// Options for every render group's batcher.
    pub batcher: BatcherOptions,
    /// Cull against [`SceneConfig::view`] at the start of each prepare.
    pub cull_on_prepare: bool,
    /// Screen rectangle used when culling on prepare.
    pub view: crate::math::Rectangle,
}

impl SceneConfig {
    pub fn validate(&self) -> SceneResult<()> {
        self.batcher.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(SceneConfig::default().validate().is_ok());
        assert_eq!(BatcherOptions::default().max_textures, 16);
    }

    #[test]
    fn test_rejects_zero_textures() {
        let options = BatcherOptions::default().with_max_textures(0);
        assert!(matches!(
            options.validate(),
            Err(SceneError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_too_many_textures() {
        let options = BatcherOptions::default().with_max_textures(70_000);
        assert!(options.validate().is_err());
    }
}
