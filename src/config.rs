//! Layout configuration
//!
//! `LayoutConfig` carries the engine resolution and canvas geometry for one
//! task. Pixel inputs are converted into the inch space Graphviz works in;
//! node records always get the same fixed footprint.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{TopolayError, TopolayResult};

/// Fixed node footprint in pixels
pub const NODE_WIDTH_PX: f64 = 225.0;
pub const NODE_HEIGHT_PX: f64 = 60.0;

// Share of the canvas usable for the graph itself; the rest is reserved for
// surrounding chrome in the rendered document.
const CANVAS_USABLE_WIDTH: f64 = 0.82;
const CANVAS_USABLE_HEIGHT: f64 = 0.79;

/// Rank-flattening strategy handed to the layout engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FlattenMode {
    /// Leave rank assignment entirely to the engine
    #[default]
    None,
    /// Force same-rank grouping around sources of adjacency edges
    Partial,
    /// Force all nodes onto one rank
    Full,
}

impl std::fmt::Display for FlattenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FlattenMode::None => "none",
            FlattenMode::Partial => "partial",
            FlattenMode::Full => "full",
        };
        f.write_str(name)
    }
}

/// Per-task layout configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Engine resolution in dots per inch
    pub dpi: f64,
    pub flatten: FlattenMode,
    /// Target canvas width in pixels
    pub width_px: u32,
    /// Target canvas height in pixels
    pub height_px: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            dpi: 72.0,
            flatten: FlattenMode::None,
            width_px: 1920,
            height_px: 1080,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> TopolayResult<()> {
        if !(self.dpi.is_finite() && self.dpi > 0.0) {
            return Err(TopolayError::Validation(format!(
                "dpi must be a positive number, got {}",
                self.dpi
            )));
        }
        if self.width_px == 0 || self.height_px == 0 {
            return Err(TopolayError::Validation(
                "canvas width and height must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Usable graph size in inches
    pub fn graph_size_in(&self) -> (f64, f64) {
        (
            self.px_to_in(f64::from(self.width_px) * CANVAS_USABLE_WIDTH),
            self.px_to_in(f64::from(self.height_px) * CANVAS_USABLE_HEIGHT),
        )
    }

    /// Node footprint in inches
    pub fn node_size_in(&self) -> (f64, f64) {
        (self.px_to_in(NODE_WIDTH_PX), self.px_to_in(NODE_HEIGHT_PX))
    }

    fn px_to_in(&self, px: f64) -> f64 {
        px / self.dpi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LayoutConfig::default();
        assert_eq!(config.dpi, 72.0);
        assert_eq!(config.flatten, FlattenMode::None);
        assert_eq!(config.width_px, 1920);
        assert_eq!(config.height_px, 1080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_node_size_scales_with_dpi() {
        let config = LayoutConfig {
            dpi: 100.0,
            ..Default::default()
        };
        let (w, h) = config.node_size_in();
        assert_eq!(w, 2.25);
        assert_eq!(h, 0.6);
    }

    #[test]
    fn test_graph_size_applies_usable_area() {
        let config = LayoutConfig {
            dpi: 100.0,
            width_px: 1000,
            height_px: 1000,
            ..Default::default()
        };
        let (w, h) = config.graph_size_in();
        assert!((w - 8.2).abs() < 1e-9);
        assert!((h - 7.9).abs() < 1e-9);
    }

    #[test]
    fn test_validate_rejects_non_positive_dpi() {
        let config = LayoutConfig {
            dpi: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_canvas() {
        let config = LayoutConfig {
            width_px: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flatten_mode_serde() {
        let mode: FlattenMode = serde_yaml_ng::from_str("partial").unwrap();
        assert_eq!(mode, FlattenMode::Partial);
    }
}
