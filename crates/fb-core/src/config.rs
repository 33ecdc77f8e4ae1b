//! Editor configuration shared by the controller, history and exporter.

use serde::{Deserialize, Serialize};

// ─── Config ──────────────────────────────────────────────────────────────

/// Tunables for one editor instance.
///
/// Every field has a default; hosts may pass a partial JSON object to
/// [`EditorConfig::from_json`] and only override what they name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Grid cell size in document units. Default: **20**.
    pub grid_size: f64,
    /// Snap dragged and placed elements to the grid. Default: **true**.
    pub snap_to_grid: bool,
    /// Paint the background grid. Default: **true**.
    pub show_grid: bool,
    /// Maximum number of undo snapshots kept. Default: **50**.
    pub history_capacity: usize,
    /// Screen-pixel radius for grabbing connection points. Default: **8**.
    pub grab_radius: f64,
    /// Side of the square resize handles, in screen pixels. Default: **8**.
    pub handle_size: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Wheel zoom factor per notch toward the user (`deltaY < 0`).
    pub wheel_zoom_in: f64,
    /// Wheel zoom factor per notch away from the user (`deltaY > 0`).
    pub wheel_zoom_out: f64,
    /// Multiplier for zoom-in/zoom-out commands. Default: **1.2**.
    pub zoom_step: f64,
    /// Arrow-key nudge distance. Default: **1**.
    pub nudge: f64,
    /// Arrow-key nudge distance with Shift. Default: **10**.
    pub nudge_large: f64,
    /// Offset applied to duplicated elements. Default: **20**.
    pub duplicate_offset: f64,
    /// Screen padding around content for fit-to-view. Default: **50**.
    pub fit_padding: f64,
    /// Upper zoom bound for fit-to-view. Default: **2**.
    pub fit_max_zoom: f64,
    /// Padding around content in exports. Default: **50**.
    pub export_padding: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            grid_size: 20.0,
            snap_to_grid: true,
            show_grid: true,
            history_capacity: 50,
            grab_radius: 8.0,
            handle_size: 8.0,
            min_zoom: 0.25,
            max_zoom: 4.0,
            wheel_zoom_in: 1.1,
            wheel_zoom_out: 0.9,
            zoom_step: 1.2,
            nudge: 1.0,
            nudge_large: 10.0,
            duplicate_offset: 20.0,
            fit_padding: 50.0,
            fit_max_zoom: 2.0,
            export_padding: 50.0,
        }
    }
}

impl EditorConfig {
    /// Parse a (possibly partial) JSON object over the defaults.
    ///
    /// # Errors
    /// Returns the `serde_json` error when the text is not a valid object
    /// of the expected field types.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut config: EditorConfig = serde_json::from_str(text)?;
        config.normalize();
        Ok(config)
    }

    /// The grid to snap to, if snapping is on.
    pub fn snap_grid(&self) -> Option<f64> {
        (self.snap_to_grid && self.grid_size > 0.0).then_some(self.grid_size)
    }

    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    /// Repair inconsistent values instead of rejecting them.
    fn normalize(&mut self) {
        let defaults = EditorConfig::default();
        if self.history_capacity == 0 {
            self.history_capacity = 1;
        }
        if self.min_zoom.is_nan() || self.min_zoom <= 0.0 {
            self.min_zoom = defaults.min_zoom;
        }
        if self.max_zoom < self.min_zoom {
            self.max_zoom = self.min_zoom;
        }
        if self.grid_size < 0.0 {
            self.grid_size = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = EditorConfig::default();
        assert_eq!(c.grid_size, 20.0);
        assert_eq!(c.history_capacity, 50);
        assert_eq!(c.snap_grid(), Some(20.0));
        assert_eq!(c.clamp_zoom(10.0), 4.0);
        assert_eq!(c.clamp_zoom(0.01), 0.25);
    }

    #[test]
    fn partial_json_overrides() {
        let c = EditorConfig::from_json(r#"{ "gridSize": 10, "snapToGrid": false }"#).unwrap();
        assert_eq!(c.grid_size, 10.0);
        assert_eq!(c.snap_grid(), None);
        assert_eq!(c.history_capacity, 50);
    }

    #[test]
    fn inconsistent_values_are_repaired() {
        let c = EditorConfig::from_json(r#"{ "historyCapacity": 0, "minZoom": 2, "maxZoom": 1 }"#)
            .unwrap();
        assert_eq!(c.history_capacity, 1);
        assert_eq!(c.max_zoom, 2.0);
        assert!(EditorConfig::from_json("\"grid\"").is_err());
    }
}
