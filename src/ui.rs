use crate::coordinate::Coordinate;
use egui::Pos2;

/// Pointer travel beyond which a press counts as a drag.
pub const PRESS_SLOP: f32 = 6.0;

#[derive(Default)]
pub struct UiState {
    // Pointer tracking
    pub cursor_coordinate: Option<Coordinate>,
    pub press: PressTracker,

    // Surfaces layered over the screen
    pub alert: Option<String>,
}

/// Turns raw pointer state into long-press gestures.
#[derive(Debug, Default)]
pub struct PressTracker {
    start: Option<(f64, Pos2)>,
    fired: bool,
    moved: bool,
}

impl PressTracker {
    /// Feeds one frame of pointer state. Returns the press origin exactly once
    /// when the pointer has been held still for `hold` seconds.
    pub fn update(&mut self, down: bool, pos: Option<Pos2>, now: f64, hold: f64) -> Option<Pos2> {
        if !down {
            self.start = None;
            return None;
        }

        let (started_at, origin) = match (self.start, pos) {
            (Some(start), _) => start,
            (None, Some(pos)) => {
                self.start = Some((now, pos));
                self.fired = false;
                self.moved = false;
                (now, pos)
            }
            (None, None) => return None,
        };

        if let Some(pos) = pos {
            if (pos - origin).length() > PRESS_SLOP {
                self.moved = true;
            }
        }

        if !self.fired && !self.moved && now - started_at >= hold {
            self.fired = true;
            return Some(origin);
        }
        None
    }

    /// Whether the latest press already turned into a long-press or a drag,
    /// so its release must not count as a tap.
    pub fn consumed(&self) -> bool {
        self.fired || self.moved
    }
}
