use std::sync::{Arc, Weak};

use super::event::{ClickPolicy, ClickThreshold, Event, EventKind, Press};
use super::item::{ItemRef, Level};
use super::state::MenuState;
use super::style::MenuStyle;
use super::window::{MenuWindow, Placement};
use super::Context;
use crate::geometry::{Point, Rect};
use crate::platform::Backend;

static DEFAULT_CLICK: ClickThreshold = ClickThreshold::DEFAULT;

/// Liveness token held by whatever owns the menu (a menu bar, a button).
/// Dropping it while a pulldown runs cancels the pulldown.
#[derive(Debug, Default)]
pub struct Owner(Arc<()>);

impl Owner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watch(&self) -> OwnerWatch {
        OwnerWatch(Arc::downgrade(&self.0))
    }
}

#[derive(Debug, Clone)]
pub struct OwnerWatch(Weak<()>);

impl OwnerWatch {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

/// Told about highlight changes on items flagged `CHATTY`.
pub trait PulldownObserver {
    fn highlighted(&mut self, item: &ItemRef);
}

pub struct PulldownRequest<'a> {
    pub level: Level,
    /// Anchor rectangle relative to the innermost of `origins`.
    pub anchor: Rect,
    /// Offsets of the owning window chain, innermost first.
    pub origins: Vec<Point>,
    /// Item to reopen on, possibly inside a submenu.
    pub initial: Option<ItemRef>,
    pub title: Option<ItemRef>,
    pub menubar: bool,
    /// The press that opened the menu, for telling clicks from drags.
    pub opened_by: Option<Press>,
    pub owner: Option<OwnerWatch>,
    pub click: &'a dyn ClickPolicy,
    pub observer: Option<&'a mut dyn PulldownObserver>,
}

impl<'a> PulldownRequest<'a> {
    pub fn new(level: Level, anchor: Rect) -> Self {
        Self {
            level,
            anchor,
            origins: Vec::new(),
            initial: None,
            title: None,
            menubar: false,
            opened_by: None,
            owner: None,
            click: &DEFAULT_CLICK,
            observer: None,
        }
    }

    pub fn origin(mut self, offset: Point) -> Self {
        self.origins.push(offset);
        self
    }

    pub fn initial(mut self, item: Option<ItemRef>) -> Self {
        self.initial = item;
        self
    }

    pub fn title(mut self, item: Option<ItemRef>) -> Self {
        self.title = item;
        self
    }

    pub fn menubar(mut self, on: bool) -> Self {
        self.menubar = on;
        self
    }

    pub fn opened_by(mut self, press: Press) -> Self {
        self.opened_by = Some(press);
        self
    }

    pub fn owner(mut self, watch: OwnerWatch) -> Self {
        self.owner = Some(watch);
        self
    }

    pub fn click(mut self, policy: &'a dyn ClickPolicy) -> Self {
        self.click = policy;
        self
    }

    pub fn observer(mut self, observer: &'a mut dyn PulldownObserver) -> Self {
        self.observer = Some(observer);
        self
    }
}

/// Run one modal menu interaction and return the picked item.
pub fn pulldown(backend: &mut dyn Backend, style: &MenuStyle, req: PulldownRequest<'_>) -> Option<ItemRef> {
    let PulldownRequest {
        level,
        anchor,
        origins,
        initial,
        title,
        menubar,
        opened_by,
        owner,
        click,
        mut observer,
    } = req;
    let alive = || owner.as_ref().map_or(true, OwnerWatch::is_alive);
    if !alive() {
        return None;
    }

    let anchor = origins
        .iter()
        .fold(anchor, |r, o| r.translated(o.x, o.y));
    let mut cx = Context { backend, style, click };

    let root = MenuWindow::new(
        level,
        Placement {
            anchor,
            picked: initial.clone(),
            title,
            menubar,
            ..Default::default()
        },
        &mut cx,
    );
    let mut state = MenuState::new(root, anchor, initial, opened_by);
    cx.backend.grab(true);
    log::debug!("pulldown at {anchor:?}{}", if menubar { " (menu bar)" } else { "" });

    let started = if state.select_root() {
        state.settle(&mut cx);
        true
    } else if menubar {
        // Find the bar entry under the pointer before anything is shown.
        let p = cx.backend.pointer();
        let hit = state.handle(&Event::new(EventKind::Drag(p)), &mut cx);
        if hit {
            state.settle(&mut cx);
        } else {
            log::debug!("pointer at {p:?} is not over a menu bar entry");
        }
        hit
    } else {
        true
    };

    let picked = if !started {
        None
    } else {
        loop {
            if !alive() {
                log::debug!("menu owner destroyed, cancelling");
                break None;
            }
            state.show_all(&mut cx);
            state.flush(&mut cx);
            let Some(event) = cx.backend.wait() else {
                log::debug!("event source closed, cancelling");
                break None;
            };
            if !alive() {
                log::debug!("menu owner destroyed, cancelling");
                break None;
            }
            let before = state.current().cloned();
            state.handle(&event, &mut cx);
            if state.is_done() {
                break state.current().cloned();
            }
            if state.current() == before.as_ref() {
                continue;
            }
            if let (Some(observer), Some(current)) = (observer.as_deref_mut(), state.current()) {
                if current.item().is_chatty() {
                    observer.highlighted(current);
                }
            }
            state.highlight_changed(&mut cx);
        }
    };

    state.teardown(&mut cx);
    cx.backend.grab(false);
    log::debug!("pulldown picked {picked:?}");
    picked
}

/// Pop up `level` at a point, optionally titled and reopened on `picked`.
pub fn popup(
    backend: &mut dyn Backend,
    style: &MenuStyle,
    level: Level,
    at: Point,
    title: Option<ItemRef>,
    picked: Option<ItemRef>,
) -> Option<ItemRef> {
    let req = PulldownRequest::new(level, Rect::new(at.x, at.y, 0, 0))
        .title(title)
        .initial(picked);
    pulldown(backend, style, req)
}
