pub mod event;
pub mod item;
pub mod pulldown;
pub mod shortcut;
pub mod spec;
pub mod state;
pub mod style;
pub mod window;

pub use event::{ClickPolicy, ClickThreshold, Event, EventKind, Press};
pub use item::{CommandId, ItemFlags, ItemRef, Level, MenuItem, MenuTable};
pub use pulldown::{popup, pulldown, Owner, OwnerWatch, PulldownObserver, PulldownRequest};
pub use shortcut::{Key, KeyPress, Modifiers, Shortcut};
pub use spec::MenuSpec;
pub use style::MenuStyle;

use crate::platform::Backend;

/// What every window and state operation needs from the outside world,
/// passed explicitly for the duration of one pulldown.
pub struct Context<'a> {
    pub backend: &'a mut dyn Backend,
    pub style: &'a MenuStyle,
    pub click: &'a dyn ClickPolicy,
}
