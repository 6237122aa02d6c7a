use std::collections::HashMap;
use tracing::trace;

use crate::domain::CedError;

pub const DEFAULT_COLUMN_WIDTH: i32 = 200;
pub const MIN_COLUMN_WIDTH: i32 = 100;
pub const PANEL_MIN_PERCENT: u16 = 30;
pub const PANEL_MAX_PERCENT: u16 = 80;
pub const DEFAULT_PANEL_PERCENT: u16 = 50;

// A resize gesture is a begin/update*/end sequence of pointer events. There
// is one slot for both targets, a new begin replaces whatever was active.
#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    Column {
        column: String,
        start_x: i32,
        start_width: i32,
    },
    Panel {
        start_x: i32,
        start_percent: f64,
    },
}

// Tracks per-column widths in pixels and the panel width as a percentage of
// the viewport. Widths are pure UI state, the table data never depends on
// them.
#[derive(Debug)]
pub struct ColumnLayout {
    widths: HashMap<String, i32>,
    panel_percent: u16,
    gesture: Gesture,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        ColumnLayout {
            widths: HashMap::new(),
            panel_percent: DEFAULT_PANEL_PERCENT,
            gesture: Gesture::Idle,
        }
    }
}

impl ColumnLayout {
    pub fn new() -> Self {
        Self::default()
    }

    // Called whenever a new table is installed. Every column starts at the
    // default width, prior widths and any unfinished gesture are dropped.
    pub fn initialize(&mut self, columns: &[&str]) {
        self.widths = columns
            .iter()
            .map(|c| (c.to_string(), DEFAULT_COLUMN_WIDTH))
            .collect();
        self.gesture = Gesture::Idle;
        trace!("Initialized column layout for {} columns", columns.len());
    }

    pub fn width(&self, column: &str) -> Option<i32> {
        self.widths.get(column).copied()
    }

    pub fn panel_percent(&self) -> u16 {
        self.panel_percent
    }

    pub fn is_resizing(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    pub fn resizing_column(&self) -> Option<&str> {
        match &self.gesture {
            Gesture::Column { column, .. } => Some(column),
            _ => None,
        }
    }

    pub fn begin_column_resize(&mut self, column: &str, pointer_x: i32) -> Result<(), CedError> {
        let start_width = self
            .width(column)
            .ok_or_else(|| CedError::UnknownColumn(column.to_string()))?;
        self.gesture = Gesture::Column {
            column: column.to_string(),
            start_x: pointer_x,
            start_width,
        };
        trace!("Begin column resize \"{column}\" at x {pointer_x}, width {start_width}");
        Ok(())
    }

    pub fn update_column_resize(&mut self, pointer_x: i32) {
        if let Gesture::Column {
            column,
            start_x,
            start_width,
        } = &self.gesture
        {
            let new_width = std::cmp::max(MIN_COLUMN_WIDTH, start_width + (pointer_x - start_x));
            self.widths.insert(column.clone(), new_width);
        }
    }

    pub fn end_column_resize(&mut self) {
        if matches!(self.gesture, Gesture::Column { .. }) {
            self.gesture = Gesture::Idle;
        }
    }

    pub fn begin_panel_resize(&mut self, pointer_x: i32) {
        self.gesture = Gesture::Panel {
            start_x: pointer_x,
            start_percent: self.panel_percent as f64,
        };
        trace!("Begin panel resize at x {pointer_x}, {}%", self.panel_percent);
    }

    // Dragging the left handle towards the left grows the panel, so the
    // delta is the negative of the pointer movement.
    pub fn update_panel_resize(&mut self, pointer_x: i32, viewport_width: i32) {
        if viewport_width <= 0 {
            return;
        }
        if let Gesture::Panel {
            start_x,
            start_percent,
        } = self.gesture
        {
            let delta_percent = (start_x - pointer_x) as f64 / viewport_width as f64 * 100.0;
            let new_percent = (start_percent + delta_percent)
                .clamp(PANEL_MIN_PERCENT as f64, PANEL_MAX_PERCENT as f64);
            self.panel_percent = new_percent.round() as u16;
        }
    }

    pub fn end_panel_resize(&mut self) {
        if matches!(self.gesture, Gesture::Panel { .. }) {
            self.gesture = Gesture::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> ColumnLayout {
        let mut layout = ColumnLayout::new();
        layout.initialize(&["name", "age"]);
        layout
    }

    #[test]
    fn initialize_sets_defaults() {
        let layout = fresh();
        assert_eq!(layout.width("name"), Some(DEFAULT_COLUMN_WIDTH));
        assert_eq!(layout.width("age"), Some(DEFAULT_COLUMN_WIDTH));
        assert_eq!(layout.width("salary"), None);
        assert_eq!(layout.panel_percent(), DEFAULT_PANEL_PERCENT);
    }

    #[test]
    fn initialize_discards_prior_widths() {
        let mut layout = fresh();
        layout.begin_column_resize("age", 0).unwrap();
        layout.update_column_resize(150);
        layout.end_column_resize();
        assert_eq!(layout.width("age"), Some(350));

        layout.initialize(&["age", "city"]);
        assert_eq!(layout.width("age"), Some(DEFAULT_COLUMN_WIDTH));
        assert_eq!(layout.width("name"), None);
    }

    #[test]
    fn column_resize_follows_pointer_delta() {
        let mut layout = fresh();
        layout.begin_column_resize("age", 100).unwrap();
        layout.update_column_resize(160);
        layout.end_column_resize();
        assert_eq!(layout.width("age"), Some(260));
    }

    #[test]
    fn column_resize_clamps_to_minimum() {
        // Delta of -60 from 200 gives 140, a huge negative delta clamps.
        let mut layout = fresh();
        layout.begin_column_resize("age", 100).unwrap();
        layout.update_column_resize(40);
        assert_eq!(layout.width("age"), Some(140));
        layout.update_column_resize(-900);
        assert_eq!(layout.width("age"), Some(MIN_COLUMN_WIDTH));
        layout.end_column_resize();
    }

    #[test]
    fn unknown_column_cannot_begin_a_gesture() {
        let mut layout = fresh();
        let err = layout.begin_column_resize("salary", 0).unwrap_err();
        assert!(matches!(err, CedError::UnknownColumn(_)));
        assert!(!layout.is_resizing());
    }

    #[test]
    fn updates_outside_a_gesture_are_noops() {
        let mut layout = fresh();
        layout.update_column_resize(500);
        layout.update_panel_resize(500, 1000);
        assert_eq!(layout.width("name"), Some(DEFAULT_COLUMN_WIDTH));
        assert_eq!(layout.panel_percent(), DEFAULT_PANEL_PERCENT);

        layout.end_column_resize();
        layout.end_panel_resize();
        assert!(!layout.is_resizing());
    }

    #[test]
    fn a_new_begin_replaces_the_active_gesture() {
        let mut layout = fresh();
        layout.begin_column_resize("name", 0).unwrap();
        layout.begin_column_resize("age", 0).unwrap();
        layout.update_column_resize(50);
        layout.end_column_resize();
        // Only the second gesture took effect.
        assert_eq!(layout.width("name"), Some(DEFAULT_COLUMN_WIDTH));
        assert_eq!(layout.width("age"), Some(250));

        layout.begin_column_resize("name", 0).unwrap();
        layout.begin_panel_resize(0);
        layout.update_column_resize(80);
        assert_eq!(layout.width("name"), Some(DEFAULT_COLUMN_WIDTH));
        assert!(layout.resizing_column().is_none());
    }

    #[test]
    fn panel_resize_grows_against_pointer_movement() {
        let mut layout = fresh();
        layout.begin_panel_resize(500);
        // 100 px left on a 1000 px viewport is +10%.
        layout.update_panel_resize(400, 1000);
        layout.end_panel_resize();
        assert_eq!(layout.panel_percent(), 60);
    }

    #[test]
    fn panel_percent_stays_clamped() {
        let mut layout = fresh();
        layout.begin_panel_resize(0);
        layout.update_panel_resize(-100_000, 1000);
        assert_eq!(layout.panel_percent(), PANEL_MAX_PERCENT);
        layout.update_panel_resize(100_000, 1000);
        assert_eq!(layout.panel_percent(), PANEL_MIN_PERCENT);
        layout.end_panel_resize();
    }

    #[test]
    fn end_is_target_specific_and_idempotent() {
        let mut layout = fresh();
        layout.begin_panel_resize(0);
        // Ending the other target must not kill the active gesture.
        layout.end_column_resize();
        assert!(layout.is_resizing());
        layout.end_panel_resize();
        layout.end_panel_resize();
        assert!(!layout.is_resizing());
    }
}
