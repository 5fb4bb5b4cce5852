use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect, Size};
use crate::menu::event::Event;
use crate::menu::style::Color;

pub mod headless;

/// Handle of one popup surface. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

/// One drawing operation in surface-local coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Paint {
    /// The window's box, background included.
    Frame { rect: Rect, color: Color },
    /// Row background: the selection box or an erase to the window color.
    Row { rect: Rect, color: Color },
    Check { rect: Rect, radio: bool, on: bool },
    Label { rect: Rect, text: String, color: Color },
    /// Modifier text right-aligned to `split`, key text left-aligned from it.
    Shortcut {
        rect: Rect,
        split: i32,
        modifiers: String,
        key: String,
        color: Color,
    },
    /// Submenu indicator triangle inside `rect`.
    Arrow { rect: Rect, color: Color },
    Divider { x: i32, y: i32, w: i32, dark: Color, light: Color },
}

pub trait Backend {
    /// Usable area of the screen containing `at`.
    fn work_area(&self, at: Point) -> Rect;
    /// Current pointer position in screen coordinates.
    fn pointer(&self) -> Point;
    fn text_size(&self, text: &str, font_size: u16) -> Size;

    /// Create a hidden surface.
    fn create_surface(&mut self, rect: Rect) -> SurfaceId;
    fn set_geometry(&mut self, id: SurfaceId, rect: Rect);
    fn show(&mut self, id: SurfaceId);
    fn hide(&mut self, id: SurfaceId);
    fn is_shown(&self, id: SurfaceId) -> bool;
    fn destroy(&mut self, id: SurfaceId);
    fn paint(&mut self, id: SurfaceId, ops: &[Paint]);

    /// Route every input event to the menu (`true`) or release the grab.
    fn grab(&mut self, on: bool);
    /// Block until the next event. `None` means the event source is gone.
    fn wait(&mut self) -> Option<Event>;
}
