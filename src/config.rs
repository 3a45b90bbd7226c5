//! User-tunable extrusion parameters.
//!
//! All types serialize with `serde` so a whole configuration can be
//! persisted or handed across process boundaries as one document.

use serde::{Deserialize, Serialize};

/// Bevel profile parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BevelConfig {
    /// Whether the bevel is applied at all.
    pub enabled: bool,
    /// Distance the caps are pushed out along the extrusion axis.
    pub thickness: f64,
    /// Distance the caps are inset into the material.
    pub size: f64,
    /// Number of intermediate profile levels between wall and cap.
    pub segments: u32,
}

impl BevelConfig {
    /// A bevel that contributes no geometry.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Returns `Some(self)` when the bevel actually changes the solid.
    /// A disabled bevel, or one with zero thickness and zero size, is
    /// treated as absent.
    #[must_use]
    pub fn effective(&self) -> Option<&Self> {
        if self.enabled && (self.thickness > 0.0 || self.size > 0.0) {
            Some(self)
        } else {
            None
        }
    }
}

impl Default for BevelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            thickness: 1.0,
            size: 0.5,
            segments: 4,
        }
    }
}

/// How the hollow/solid decision is made for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HollowMode {
    /// Decide from the document content.
    #[default]
    Auto,
    /// Force the decision regardless of content.
    Override(bool),
}

impl HollowMode {
    /// Resolves the mode against the automatic detection result.
    #[must_use]
    pub fn resolve(self, detected: bool) -> bool {
        match self {
            Self::Auto => detected,
            Self::Override(forced) => forced,
        }
    }
}

/// Full parameter set for one regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtrusionConfig {
    /// Extrusion depth along the axis, clamped to a small positive
    /// minimum during generation.
    pub depth: f64,
    /// Bevel profile.
    pub bevel: BevelConfig,
    /// Spread factor for laying out multiple shape groups. Zero keeps
    /// every group at its source position.
    pub spread: f64,
    /// Hollow decision mode.
    pub hollow: HollowMode,
}

impl Default for ExtrusionConfig {
    fn default() -> Self {
        Self {
            depth: 5.0,
            bevel: BevelConfig::default(),
            spread: 0.0,
            hollow: HollowMode::Auto,
        }
    }
}
