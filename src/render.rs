//! Render Binding: material parameters, environment selection, and the
//! geometry handle a renderer draws from.
//!
//! This module owns no GPU resources. It models the render-facing state
//! so the pipeline can swap geometry atomically and environment textures
//! are loaded once and released when replaced.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::GeometryResult;
use crate::error::{ResourceError, Result};

/// Linear RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    /// Parses a `#RRGGBB` hex string.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if digits.len() != 6 {
            return None;
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .ok()
                .map(|v| f32::from(v) / 255.0)
        };
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }
}

impl Default for Color {
    fn default() -> Self {
        // Neutral silver
        Self {
            r: 0.75,
            g: 0.75,
            b: 0.75,
        }
    }
}

/// Physically-based material parameters applied to the whole solid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialParams {
    /// When false, the renderer's default finish is used and
    /// `custom_color` is ignored.
    pub use_custom_color: bool,
    pub custom_color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub clearcoat: f32,
    pub transmission: f32,
    /// Multiplier on environment lighting.
    pub env_map_intensity: f32,
}

impl Default for MaterialParams {
    fn default() -> Self {
        Self {
            use_custom_color: false,
            custom_color: Color::default(),
            roughness: 0.3,
            metalness: 0.8,
            clearcoat: 0.0,
            transmission: 0.0,
            env_map_intensity: 1.0,
        }
    }
}

impl MaterialParams {
    /// Base color the renderer should apply.
    #[must_use]
    pub fn effective_color(&self) -> Color {
        if self.use_custom_color {
            self.custom_color
        } else {
            Color::default()
        }
    }
}

/// Built-in environment lighting presets plus a user-supplied one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentPreset {
    Apartment,
    #[default]
    City,
    Dawn,
    Forest,
    Lobby,
    Night,
    Park,
    Studio,
    Sunset,
    Warehouse,
    /// Lighting from a caller-supplied texture URL.
    Custom,
}

/// Environment lighting selection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvironmentSettings {
    pub preset: EnvironmentPreset,
    /// Texture URL, only meaningful with [`EnvironmentPreset::Custom`].
    pub custom_url: Option<String>,
}

/// A loaded environment texture.
#[derive(Debug)]
pub struct EnvironmentTexture {
    pub url: String,
    pub data: Vec<u8>,
}

/// Fetches environment textures. The production implementation talks to
/// whatever asset source the host embeds; tests substitute fakes.
pub trait TextureLoader: Send + Sync {
    /// Loads the texture behind `url`.
    ///
    /// # Errors
    ///
    /// Returns [`ResourceError::TextureLoad`] when the source is
    /// unreachable or the data is not a usable texture.
    fn load(&self, url: &str) -> Result<EnvironmentTexture>;

    /// Releases any source-side resource backing `url`. Called exactly
    /// once per successful load, when the texture is replaced or the
    /// cache is dropped.
    fn release(&self, _url: &str) {}
}

/// Caches the current custom environment texture.
///
/// At most one texture is held at a time. Re-resolving the same URL is
/// free; resolving a different URL releases the previous one. A failed
/// load keeps the previous texture so the scene never loses its lighting
/// over a transient fetch error.
pub struct EnvironmentCache {
    loader: Arc<dyn TextureLoader>,
    current: Option<Arc<EnvironmentTexture>>,
}

impl EnvironmentCache {
    #[must_use]
    pub fn new(loader: Arc<dyn TextureLoader>) -> Self {
        Self {
            loader,
            current: None,
        }
    }

    /// Resolves the texture for `settings`. Returns `None` for built-in
    /// presets; they need no loaded texture.
    ///
    /// # Errors
    ///
    /// Propagates the loader's [`ResourceError`]. The previously loaded
    /// texture stays current in that case.
    pub fn resolve(
        &mut self,
        settings: &EnvironmentSettings,
    ) -> Result<Option<Arc<EnvironmentTexture>>> {
        let url = match (&settings.preset, &settings.custom_url) {
            (EnvironmentPreset::Custom, Some(url)) => url,
            (EnvironmentPreset::Custom, None) => {
                return Err(ResourceError::TextureLoad {
                    url: String::new(),
                    reason: "custom environment selected without a URL".into(),
                }
                .into());
            }
            _ => {
                self.evict();
                return Ok(None);
            }
        };

        if let Some(current) = &self.current {
            if current.url == *url {
                return Ok(Some(Arc::clone(current)));
            }
        }

        let texture = Arc::new(self.loader.load(url)?);
        self.evict();
        self.current = Some(Arc::clone(&texture));
        Ok(Some(texture))
    }

    fn evict(&mut self) {
        if let Some(old) = self.current.take() {
            self.loader.release(&old.url);
        }
    }
}

impl Drop for EnvironmentCache {
    fn drop(&mut self) {
        self.evict();
    }
}

/// The state a renderer draws from: current geometry, material, and
/// environment.
#[derive(Default)]
pub struct RenderBinding {
    geometry: Option<Arc<GeometryResult>>,
    material: MaterialParams,
    environment: EnvironmentSettings,
}

impl RenderBinding {
    /// Replaces the bound geometry. The superseded result is released
    /// once the renderer drops its own reference.
    pub fn bind_geometry(&mut self, geometry: Arc<GeometryResult>) {
        self.geometry = Some(geometry);
    }

    /// Unbinds the geometry, e.g. when the pipeline reports an error and
    /// the caller prefers an empty scene over a stale one.
    pub fn clear_geometry(&mut self) {
        self.geometry = None;
    }

    /// Currently bound geometry. `None` renders an empty scene.
    #[must_use]
    pub fn geometry(&self) -> Option<&Arc<GeometryResult>> {
        self.geometry.as_ref()
    }

    /// Number of triangles the renderer would draw. Zero with no
    /// geometry bound.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.geometry.as_ref().map_or(0, |g| g.triangle_count())
    }

    #[must_use]
    pub fn material(&self) -> &MaterialParams {
        &self.material
    }

    pub fn set_material(&mut self, material: MaterialParams) {
        self.material = material;
    }

    #[must_use]
    pub fn environment(&self) -> &EnvironmentSettings {
        &self.environment
    }

    pub fn set_environment(&mut self, environment: EnvironmentSettings) {
        self.environment = environment;
    }
}
