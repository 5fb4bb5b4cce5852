use serde::{Deserialize, Serialize};

use super::shortcut::KeyPress;
use crate::geometry::Point;
use crate::platform::SurfaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Move(Point),
    Enter(Point),
    Push(Point),
    Drag(Point),
    Release(Point),
    Key(KeyPress),
    /// The windowing system asks for a full repaint of a surface.
    Expose(SurfaceId),
}

/// One event; pointer positions are in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(flatten)]
    pub kind: EventKind,
    /// Milliseconds on the windowing layer's clock.
    #[serde(default)]
    pub time_ms: u64,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self { kind, time_ms: 0 }
    }

    pub fn at(mut self, time_ms: u64) -> Self {
        self.time_ms = time_ms;
        self
    }

    pub fn moved(x: i32, y: i32) -> Self {
        Self::new(EventKind::Move(Point::new(x, y)))
    }

    pub fn push(x: i32, y: i32) -> Self {
        Self::new(EventKind::Push(Point::new(x, y)))
    }

    pub fn drag(x: i32, y: i32) -> Self {
        Self::new(EventKind::Drag(Point::new(x, y)))
    }

    pub fn release(x: i32, y: i32) -> Self {
        Self::new(EventKind::Release(Point::new(x, y)))
    }

    pub fn key(press: KeyPress) -> Self {
        Self::new(EventKind::Key(press))
    }

    pub fn position(&self) -> Option<Point> {
        match self.kind {
            EventKind::Move(p)
            | EventKind::Enter(p)
            | EventKind::Push(p)
            | EventKind::Drag(p)
            | EventKind::Release(p) => Some(p),
            EventKind::Key(_) | EventKind::Expose(_) => None,
        }
    }
}

/// A button press remembered to classify the matching release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Press {
    pub pos: Point,
    pub time_ms: u64,
}

/// Decides whether a release completes a quick click (as opposed to a
/// press-drag-release gesture).
pub trait ClickPolicy {
    fn is_click(&self, press: &Press, pos: Point, time_ms: u64) -> bool;
}

/// Click when the pointer stayed within `max_distance` pixels and the button
/// was released within `max_duration_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickThreshold {
    pub max_distance: i32,
    pub max_duration_ms: u64,
}

impl ClickThreshold {
    pub const DEFAULT: Self = Self {
        max_distance: 5,
        max_duration_ms: 500,
    };
}

impl Default for ClickThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl ClickPolicy for ClickThreshold {
    fn is_click(&self, press: &Press, pos: Point, time_ms: u64) -> bool {
        (pos.x - press.pos.x).abs() <= self.max_distance
            && (pos.y - press.pos.y).abs() <= self.max_distance
            && time_ms.saturating_sub(press.time_ms) <= self.max_duration_ms
    }
}
