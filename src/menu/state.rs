use super::event::{Event, EventKind, Press};
use super::item::ItemRef;
use super::shortcut::{Key, KeyPress};
use super::window::{MenuTitle, MenuWindow, Placement};
use super::Context;
use crate::geometry::{Point, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No press or release since the menu opened.
    Init,
    /// Button went down on a plain item.
    PressedOnItem,
    /// Button went down on a submenu title that was not open yet.
    PressedOnTitle,
    Done,
}

/// Stack of open windows (index 0 is the root) and the highlighted item.
#[derive(Debug)]
pub struct MenuState {
    windows: Vec<MenuWindow>,
    current: Option<ItemRef>,
    menu_index: usize,
    item_index: usize,
    mode: Mode,
    in_menubar: bool,
    /// The current submenu title was closed with Left and stays closed
    /// until the user reopens it.
    collapsed: bool,
    /// Deep item the menu reopens on; cleared once reached.
    initial: Option<ItemRef>,
    bar_button: Option<MenuTitle>,
    last_press: Option<Press>,
    anchor: Rect,
}

impl MenuState {
    pub fn new(root: MenuWindow, anchor: Rect, initial: Option<ItemRef>, opened_by: Option<Press>) -> Self {
        let in_menubar = root.is_menubar();
        Self {
            windows: vec![root],
            current: None,
            menu_index: 0,
            item_index: 0,
            mode: Mode::Init,
            in_menubar,
            collapsed: false,
            initial,
            bar_button: None,
            last_press: opened_by,
            anchor,
        }
    }

    pub fn windows(&self) -> &[MenuWindow] {
        &self.windows
    }

    pub fn current(&self) -> Option<&ItemRef> {
        self.current.as_ref()
    }

    /// Stack position of the current item: window index and visible item index.
    /// `None` when the current item is not shown in any open window, as after
    /// a shortcut hit in an unopened submenu.
    pub fn position(&self) -> Option<(usize, usize)> {
        let current = self.current.as_ref()?;
        let shown = self
            .windows
            .get(self.menu_index)
            .and_then(|w| w.item(self.item_index));
        (shown == Some(current)).then_some((self.menu_index, self.item_index))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_done(&self) -> bool {
        self.mode == Mode::Done
    }

    pub fn in_menubar(&self) -> bool {
        self.in_menubar
    }

    pub fn bar_button(&self) -> Option<&MenuTitle> {
        self.bar_button.as_ref()
    }

    fn set_position(&mut self, level: usize, n: usize) {
        let item = self.windows.get(level).and_then(|w| w.item(n)).cloned();
        if item != self.current {
            self.collapsed = false;
        }
        self.current = item;
        self.menu_index = level;
        self.item_index = n;
    }

    fn clear(&mut self) {
        self.current = None;
        self.collapsed = false;
    }

    fn finish(&mut self, why: &str) {
        if self.mode != Mode::Done {
            log::debug!("menu done ({why}): {:?}", self.current);
            self.mode = Mode::Done;
        }
    }

    /// Highlight the root window's preselected entry, if it has one.
    pub fn select_root(&mut self) -> bool {
        match self.windows[0].selected() {
            Some(n) => {
                self.set_position(0, n);
                true
            }
            None => false,
        }
    }

    /// Level the keyboard acts on.
    fn key_level(&self) -> usize {
        if self.current.is_some() {
            self.menu_index
        } else {
            self.windows.len().saturating_sub(1)
        }
    }

    fn start_index(&self, menu: usize) -> Option<usize> {
        if menu == self.menu_index && self.current.is_some() {
            Some(self.item_index)
        } else {
            self.windows[menu].selected()
        }
    }

    fn forward_from(&mut self, menu: usize, from: Option<usize>) -> bool {
        let Some(w) = self.windows.get(menu) else {
            return false;
        };
        let found = (from.map_or(0, |i| i + 1)..w.num_items())
            .find(|&n| w.item(n).is_some_and(|m| m.item().activevisible()));
        match found {
            Some(n) => {
                self.set_position(menu, n);
                true
            }
            None => false,
        }
    }

    fn backward_from(&mut self, menu: usize, from: Option<usize>) -> bool {
        let Some(w) = self.windows.get(menu) else {
            return false;
        };
        let found = (0..from.unwrap_or(w.num_items()))
            .rev()
            .find(|&n| w.item(n).is_some_and(|m| m.item().activevisible()));
        match found {
            Some(n) => {
                self.set_position(menu, n);
                true
            }
            None => false,
        }
    }

    /// Next selectable item of window `menu`.
    pub fn forward(&mut self, menu: usize) -> bool {
        if menu >= self.windows.len() {
            return false;
        }
        self.forward_from(menu, self.start_index(menu))
    }

    /// Previous selectable item of window `menu`.
    pub fn backward(&mut self, menu: usize) -> bool {
        if menu >= self.windows.len() {
            return false;
        }
        self.backward_from(menu, self.start_index(menu))
    }

    fn forward_wrap(&mut self, menu: usize) {
        if !self.forward(menu) {
            self.forward_from(menu, None);
        }
    }

    fn backward_wrap(&mut self, menu: usize) {
        if !self.backward(menu) {
            self.backward_from(menu, None);
        }
    }

    /// Feed one event. Returns `false` when a pointer event hit nothing the
    /// menu cares about.
    pub fn handle(&mut self, event: &Event, cx: &mut Context<'_>) -> bool {
        if self.mode == Mode::Done {
            return false;
        }
        match event.kind {
            EventKind::Move(p) | EventKind::Enter(p) | EventKind::Drag(p) => {
                self.pointer(p, false, event.time_ms, cx)
            }
            EventKind::Push(p) => self.pointer(p, true, event.time_ms, cx),
            EventKind::Release(p) => {
                self.release(p, event.time_ms, cx);
                true
            }
            EventKind::Key(press) => {
                self.key(&press, cx);
                true
            }
            EventKind::Expose(id) => {
                let mut hit = false;
                for w in &mut self.windows {
                    hit |= w.expose(id);
                }
                if let Some(b) = &mut self.bar_button {
                    hit |= b.expose(id);
                }
                hit
            }
        }
    }

    fn pointer(&mut self, pos: Point, push: bool, time_ms: u64, cx: &mut Context<'_>) -> bool {
        let style = cx.style;
        let bar_only = self.in_menubar && self.windows.len() == 1;
        if !bar_only && !self.windows.iter().any(|w| w.is_inside(pos, style)) {
            self.clear();
            if push {
                self.finish("click outside");
            }
            return true;
        }

        let hit = (0..self.windows.len())
            .rev()
            .find_map(|i| self.windows[i].find_selected(pos, style).map(|n| (i, n)));
        let Some((level, n)) = hit else {
            if push && self.current.is_none() {
                self.finish("click outside");
                return true;
            }
            // A highlighted bar button is let go when clicking elsewhere.
            let on_button = self.menu_index == 0
                && self
                    .current
                    .as_ref()
                    .is_some_and(|m| !m.item().is_submenu());
            if on_button {
                if push {
                    self.clear();
                    self.finish("click outside");
                }
                return true;
            }
            return false;
        };

        let already_open = self.windows[level].selected() == Some(n);
        self.set_position(level, n);
        if push {
            self.last_press = Some(Press { pos, time_ms });
            let title = self.current.as_ref().is_some_and(|m| {
                let item = m.item();
                item.is_submenu() && item.callback.is_none()
            });
            let reopen = title && self.collapsed;
            self.mode = if title && (!already_open || reopen) {
                Mode::PressedOnTitle
            } else {
                Mode::PressedOnItem
            };
            if reopen {
                // Pressing a collapsed title opens its submenu again.
                self.collapsed = false;
                self.settle(cx);
            }
        }
        true
    }

    fn release(&mut self, pos: Point, time_ms: u64, cx: &mut Context<'_>) {
        let click = self
            .last_press
            .is_some_and(|press| cx.click.is_click(&press, pos, time_ms));
        let bar_button = self.in_menubar
            && self.menu_index == 0
            && self
                .current
                .as_ref()
                .is_some_and(|m| !m.item().is_submenu());
        if click && self.mode != Mode::PressedOnItem && !bar_button {
            return;
        }
        match &self.current {
            None => self.finish("released outside"),
            Some(m) => {
                let item = m.item();
                // Titles without a callback open instead of committing.
                if item.activevisible() && (!item.is_submenu() || item.callback.is_some()) {
                    self.finish("release");
                }
            }
        }
    }

    fn key(&mut self, press: &KeyPress, cx: &mut Context<'_>) {
        let level = self.key_level();
        let bar_root = self.in_menubar && level == 0;
        match press.key {
            Key::BackSpace => self.backward_wrap(level),
            Key::Tab if press.shift() => self.backward_wrap(level),
            Key::Up => {
                if !bar_root && !self.backward(level) {
                    if self.in_menubar && level == 1 {
                        // Back up to the bar entry that opened this level.
                        if let Some(n) = self.windows[0].selected() {
                            self.set_position(0, n);
                        }
                    } else {
                        self.backward_from(level, None);
                    }
                }
            }
            Key::Tab | Key::Down => {
                if bar_root {
                    if self.windows.len() > 1 {
                        self.forward(1);
                    } else {
                        self.descend(cx);
                    }
                } else {
                    self.forward_wrap(level);
                }
            }
            Key::Right => {
                if self.collapsed && !bar_root {
                    self.descend(cx);
                } else if self.in_menubar && (level == 0 || (level == 1 && self.windows.len() == 2)) {
                    let had_open = self.windows.len() > 1;
                    if self.forward(0) {
                        self.collapsed = !had_open;
                    }
                } else if level + 1 < self.windows.len() {
                    self.forward(level + 1);
                }
            }
            Key::Left => {
                if self.in_menubar && level <= 1 {
                    let had_open = self.windows.len() > 1;
                    if self.backward(0) {
                        self.collapsed = !had_open;
                    }
                } else if level > 0 {
                    let parent = level - 1;
                    if let Some(n) = self.windows[parent].selected() {
                        self.set_position(parent, n);
                    }
                    self.collapsed = true;
                    self.trim(parent + 1, cx);
                }
            }
            Key::Enter | Key::KpEnter | Key::Char(' ') => {
                let Some(m) = &self.current else {
                    self.finish("enter");
                    return;
                };
                let item = m.item();
                if item.is_submenu() && item.callback.is_none() {
                    self.descend(cx);
                } else if item.activevisible() {
                    self.finish("enter");
                }
            }
            Key::Escape => {
                self.clear();
                self.finish("escape");
            }
            _ => self.shortcut(press),
        }
    }

    /// Open the current submenu title if needed and move into it.
    fn descend(&mut self, cx: &mut Context<'_>) {
        let Some(current) = self.current.clone() else {
            return;
        };
        if !current.item().activevisible() {
            return;
        }
        let Some(sub) = current.submenu() else {
            return;
        };
        let next = self.menu_index + 1;
        self.collapsed = false;
        if self.windows.get(next).map_or(true, |w| *w.level() != sub) {
            self.create_submenu(cx);
        }
        self.forward(next);
    }

    fn shortcut(&mut self, press: &KeyPress) {
        for level in (0..self.windows.len()).rev() {
            if let Some((m, n)) = self.windows[level].level().find_shortcut(press, false) {
                log::debug!("shortcut {press} matched {m:?} on level {level}");
                let submenu = m.item().is_submenu();
                self.set_position(level, n);
                if !submenu {
                    self.finish("shortcut");
                }
                return;
            }
        }
        if let Some(m) = self.windows[0].level().test_shortcut(press) {
            log::debug!("shortcut {press} matched nested {m:?}");
            if !m.item().is_submenu() {
                self.current = Some(m);
                self.finish("shortcut");
            }
        }
    }

    /// React to a new current item: autoscroll it into view, then settle the
    /// window stack around it.
    pub fn highlight_changed(&mut self, cx: &mut Context<'_>) {
        if let Some(button) = self.bar_button.take() {
            button.destroy(cx);
        }
        if self.current.is_none() {
            if let Some(w) = self.windows.last_mut() {
                w.set_selected(None);
            }
            return;
        }
        self.initial = None;
        let (level, n) = (self.menu_index, self.item_index);
        self.windows[level].autoscroll(n, cx);
        self.settle(cx);
    }

    /// Open, reuse or close submenus so the stack ends at the current item.
    /// While reopening on an initial item this descends level by level.
    pub fn settle(&mut self, cx: &mut Context<'_>) {
        loop {
            if let Some(button) = self.bar_button.take() {
                button.destroy(cx);
            }
            let Some(current) = self.current.clone() else {
                return;
            };
            let level = self.menu_index;
            let item = current.item();
            if !item.activevisible() {
                self.windows[level].set_selected(None);
                self.initial = None;
                self.trim(level + 1, cx);
                return;
            }
            self.windows[level].set_selected(Some(self.item_index));
            if self.initial.as_ref() == Some(&current) {
                self.initial = None;
            }
            if item.is_submenu() && !self.collapsed {
                if let Some(n) = self.create_submenu(cx) {
                    self.set_position(level + 1, n);
                    continue;
                }
                return;
            }
            self.trim(level + 1, cx);
            if self.in_menubar && level == 0 {
                // Shows the bar entry as pressed.
                let bar = &self.windows[0];
                let origin = Point::new(bar.rect().x + bar.titlex(self.item_index, cx.style), bar.rect().bottom());
                let bar_height = bar.rect().h;
                self.bar_button = Some(MenuTitle::for_bar(current, origin, bar_height, cx));
            }
            return;
        }
    }

    /// Make the window after the current one show the current submenu title's
    /// level. Returns the preselected position when the new window was
    /// centered on the initial item.
    fn create_submenu(&mut self, cx: &mut Context<'_>) -> Option<usize> {
        let level = self.menu_index;
        let title_item = self.current.clone()?;
        let sub = title_item.submenu()?;
        let off_bar = self.in_menubar && level == 0;
        let cw = &self.windows[level];
        let parent = cw.rect();
        let origin = if off_bar {
            Point::new(parent.x + cw.titlex(self.item_index, cx.style), parent.bottom())
        } else {
            Point::new(parent.right(), parent.y + self.item_index as i32 * cw.item_height())
        };
        if off_bar {
            self.initial = None;
        }

        if let Some(initial) = self.initial.clone() {
            let mut w = MenuWindow::new(
                sub,
                Placement {
                    anchor: self.anchor,
                    picked: Some(initial),
                    ..Default::default()
                },
                cx,
            );
            w.set_opened_by(title_item);
            let selected = w.selected();
            let placed = w.rect();
            self.windows.push(w);
            let n = selected?;
            // Slide the shallower windows so the chain stays contiguous.
            let work = cx.backend.work_area(self.anchor.origin());
            let mut dx = placed.x - origin.x;
            let mut dy = placed.y - origin.y;
            for w in &mut self.windows[..=level] {
                let r = w.rect();
                let mut nx = r.x + dx;
                if nx < work.x {
                    nx = work.x;
                    dx = work.x - r.x;
                }
                let mut ny = r.y + dy;
                if ny < work.y {
                    ny = work.y;
                    dy = work.y - r.y;
                }
                w.position(Point::new(nx, ny), cx);
            }
            return Some(n);
        }

        if self.windows.get(level + 1).is_some_and(|w| *w.level() == sub) {
            log::trace!("reusing submenu window for {title_item:?}");
            self.trim(level + 2, cx);
            self.windows[level + 1].set_selected(None);
            return None;
        }

        self.trim(level + 1, cx);
        let title = off_bar.then(|| title_item.clone());
        let mut w = MenuWindow::new(
            sub,
            Placement {
                anchor: Rect::new(origin.x, origin.y, i32::from(off_bar), 0),
                title,
                bar_title: off_bar,
                bar_height: parent.h,
                ..Default::default()
            },
            cx,
        );
        log::trace!("opened submenu {title_item:?} at {:?}", w.rect());
        w.set_opened_by(title_item);
        self.windows.push(w);
        None
    }

    /// Destroy every window from index `keep` on. The root is never removed.
    fn trim(&mut self, keep: usize, cx: &mut Context<'_>) {
        let keep = keep.max(1);
        while self.windows.len() > keep {
            if let Some(w) = self.windows.pop() {
                w.destroy(cx);
            }
        }
    }

    pub fn show_all(&mut self, cx: &mut Context<'_>) {
        for w in &mut self.windows {
            w.show(cx);
        }
        if let Some(button) = &mut self.bar_button {
            button.show(cx);
        }
    }

    pub fn flush(&mut self, cx: &mut Context<'_>) {
        for w in &mut self.windows {
            w.flush(cx);
        }
        if let Some(button) = &mut self.bar_button {
            button.flush(cx);
        }
    }

    /// Destroy every window. Safe to call more than once.
    pub fn teardown(&mut self, cx: &mut Context<'_>) {
        // The whole cascade disappears before any surface is released.
        for w in &self.windows {
            w.hide(cx);
        }
        if let Some(button) = &self.bar_button {
            button.hide(cx);
        }
        if let Some(button) = self.bar_button.take() {
            button.destroy(cx);
        }
        while let Some(w) = self.windows.pop() {
            w.destroy(cx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::event::ClickThreshold;
    use crate::menu::item::{ItemFlags, Level, MenuTable};
    use crate::menu::shortcut::Shortcut;
    use crate::menu::style::MenuStyle;
    use crate::platform::headless::HeadlessBackend;
    use std::sync::Arc;

    struct Harness {
        backend: HeadlessBackend,
        style: MenuStyle,
        click: ClickThreshold,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                backend: HeadlessBackend::new(Rect::new(0, 0, 1024, 768)),
                style: MenuStyle::default(),
                click: ClickThreshold::default(),
            }
        }

        fn cx(&mut self) -> Context<'_> {
            Context {
                backend: &mut self.backend,
                style: &self.style,
                click: &self.click,
            }
        }
    }

    fn open(cx: &mut Context<'_>, table: Arc<MenuTable>, placement: Placement) -> MenuState {
        let anchor = placement.anchor;
        let root = MenuWindow::new(Level::root(table), placement, cx);
        let mut state = MenuState::new(root, anchor, None, None);
        if state.in_menubar() {
            let p = cx.backend.pointer();
            state.handle(&Event::new(EventKind::Drag(p)), cx);
            state.settle(cx);
        }
        state
    }

    fn popup_at(cx: &mut Context<'_>, table: Arc<MenuTable>) -> MenuState {
        open(
            cx,
            table,
            Placement {
                anchor: Rect::new(100, 100, 80, 20),
                ..Default::default()
            },
        )
    }

    /// One driver iteration without the blocking wait.
    fn feed(state: &mut MenuState, cx: &mut Context<'_>, event: Event) {
        let before = state.current().cloned();
        state.handle(&event, cx);
        if !state.is_done() && state.current() != before.as_ref() {
            state.highlight_changed(cx);
        }
        state.show_all(cx);
        state.flush(cx);
    }

    fn key(s: &str) -> Event {
        Event::key(s.parse().unwrap())
    }

    fn label(state: &MenuState) -> Option<String> {
        state.current().map(|m| m.item().text())
    }

    fn nested() -> Arc<MenuTable> {
        MenuTable::builder()
            .item("Alpha")
            .submenu("Beta", |b| b.item("X").item("Y"))
            .item("Gamma")
            .build()
    }

    #[test]
    fn down_wraps_once_and_skips_inactive() {
        let mut h = Harness::new();
        let cx = &mut h.cx();
        let table = MenuTable::builder()
            .item("Cut")
            .item("Copy")
            .inactive()
            .item("Paste")
            .build();
        let mut s = popup_at(cx, table);
        feed(&mut s, cx, key("Down"));
        assert_eq!(label(&s).as_deref(), Some("Cut"));
        feed(&mut s, cx, key("Down"));
        assert_eq!(label(&s).as_deref(), Some("Paste"));
        feed(&mut s, cx, key("Down"));
        assert_eq!(label(&s).as_deref(), Some("Cut"));
        feed(&mut s, cx, key("Up"));
        assert_eq!(label(&s).as_deref(), Some("Paste"));
        feed(&mut s, cx, key("Shift+Tab"));
        assert_eq!(label(&s).as_deref(), Some("Cut"));
    }

    #[test]
    fn all_inactive_table_does_not_spin() {
        let mut h = Harness::new();
        let cx = &mut h.cx();
        let table = MenuTable::builder().item("a").inactive().item("b").inactive().build();
        let mut s = popup_at(cx, table);
        feed(&mut s, cx, key("Down"));
        feed(&mut s, cx, key("Up"));
        assert!(s.current().is_none());
    }

    #[test]
    fn hover_opens_submenu_right_then_left_collapses() {
        let mut h = Harness::new();
        let cx = &mut h.cx();
        let mut s = popup_at(cx, nested());
        assert_eq!(s.windows()[0].rect(), Rect::new(100, 120, 80, 57));

        feed(&mut s, cx, Event::moved(110, 146));
        assert_eq!(label(&s).as_deref(), Some("Beta"));
        assert_eq!(s.windows().len(), 2);
        let sub = &s.windows()[1];
        assert_eq!(sub.rect().origin(), Point::new(180, 138));
        assert_eq!(sub.opened_by().map(|m| m.item().text()).as_deref(), Some("Beta"));
        let sub_surface = sub.surface().unwrap();

        feed(&mut s, cx, key("Right"));
        assert_eq!(label(&s).as_deref(), Some("X"));
        assert_eq!(s.position(), Some((1, 0)));

        feed(&mut s, cx, key("Left"));
        assert_eq!(label(&s).as_deref(), Some("Beta"));
        assert_eq!(s.position(), Some((0, 1)));
        assert_eq!(s.windows().len(), 1);
        assert!(!cx.backend.is_shown(sub_surface));

        // Collapsed titles stay closed until reopened.
        feed(&mut s, cx, Event::moved(112, 146));
        assert_eq!(s.windows().len(), 1);
        feed(&mut s, cx, key("Enter"));
        assert!(!s.is_done());
        assert_eq!(label(&s).as_deref(), Some("X"));
        assert_eq!(s.windows().len(), 2);
    }

    #[test]
    fn teardown_hides_cascade_then_destroys() {
        let mut h = Harness::new();
        let surfaces: Vec<_> = {
            let cx = &mut h.cx();
            let mut s = popup_at(cx, nested());
            feed(&mut s, cx, Event::moved(110, 146));
            let surfaces: Vec<_> = s.windows().iter().filter_map(|w| w.surface()).collect();
            assert_eq!(surfaces.len(), 2);
            assert!(surfaces.iter().all(|&id| cx.backend.is_shown(id)));
            s.teardown(cx);
            assert!(s.windows().is_empty());
            surfaces
        };
        for id in surfaces {
            let record = h.backend.surface(id).unwrap();
            assert_eq!(record.hides, 1);
            assert!(record.destroyed);
        }
        assert_eq!(h.backend.double_destroys(), 0);
    }

    #[test]
    fn clicking_collapsed_title_reopens_submenu() {
        let mut h = Harness::new();
        let cx = &mut h.cx();
        let mut s = popup_at(cx, nested());
        feed(&mut s, cx, Event::moved(110, 146));
        feed(&mut s, cx, key("Right"));
        feed(&mut s, cx, key("Left"));
        assert_eq!(s.windows().len(), 1);

        feed(&mut s, cx, Event::push(110, 146).at(1_000));
        assert_eq!(s.mode(), Mode::PressedOnTitle);
        assert_eq!(s.windows().len(), 2);
        assert_eq!(s.windows()[1].rect().origin(), Point::new(180, 138));
        feed(&mut s, cx, Event::release(110, 146).at(1_050));
        assert!(!s.is_done());
        assert_eq!(label(&s).as_deref(), Some("Beta"));
        assert_eq!(s.windows().len(), 2);
    }

    #[test]
    fn sibling_navigation_reuses_submenu_window() {
        let mut h = Harness::new();
        let cx = &mut h.cx();
        let mut s = popup_at(cx, nested());
        feed(&mut s, cx, Event::moved(110, 146));
        let first = s.windows()[1].surface();
        // Into the submenu and back onto its title.
        feed(&mut s, cx, Event::moved(190, 145));
        assert_eq!(label(&s).as_deref(), Some("X"));
        assert_eq!(s.windows()[1].selected(), Some(0));
        feed(&mut s, cx, Event::moved(110, 146));
        assert_eq!(s.windows()[1].surface(), first);
        assert_eq!(s.windows()[1].selected(), None);
        // Moving to a plain sibling closes it.
        feed(&mut s, cx, Event::moved(110, 165));
        assert_eq!(label(&s).as_deref(), Some("Gamma"));
        assert_eq!(s.windows().len(), 1);
    }

    #[test]
    fn pointer_outside_clears_and_push_outside_cancels() {
        let mut h = Harness::new();
        let cx = &mut h.cx();
        let mut s = popup_at(cx, nested());
        feed(&mut s, cx, Event::moved(110, 130));
        assert_eq!(label(&s).as_deref(), Some("Alpha"));
        feed(&mut s, cx, Event::moved(600, 600));
        assert!(s.current().is_none());
        assert_eq!(s.windows()[0].selected(), None);
        assert!(!s.is_done());
        feed(&mut s, cx, Event::push(600, 600));
        assert!(s.is_done());
        assert!(s.current().is_none());
    }

    fn bar() -> Arc<MenuTable> {
        MenuTable::builder()
            .item("One")
            .submenu("Two", |b| b.item("A").item("B"))
            .build()
    }

    fn open_bar(cx: &mut Context<'_>) -> MenuState {
        open(
            cx,
            bar(),
            Placement {
                anchor: Rect::new(0, 0, 300, 20),
                menubar: true,
                ..Default::default()
            },
        )
    }

    #[test]
    fn menubar_right_moves_then_down_opens() {
        let mut h = Harness::new();
        h.backend.set_pointer(Point::new(10, 10));
        let cx = &mut h.cx();
        let mut s = open_bar(cx);
        assert_eq!(label(&s).as_deref(), Some("One"));
        assert!(s.bar_button().is_some());

        feed(&mut s, cx, key("Right"));
        assert_eq!(label(&s).as_deref(), Some("Two"));
        assert_eq!(s.windows().len(), 1);
        let button = s.bar_button().unwrap();
        assert_eq!(button.item().item().text(), "Two");

        feed(&mut s, cx, key("Down"));
        assert_eq!(s.windows().len(), 2);
        assert_eq!(s.windows()[1].rect().origin(), Point::new(49, 20));
        assert_eq!(label(&s).as_deref(), Some("A"));
        assert!(s.bar_button().is_none());
        let title = s.windows()[1].title().unwrap();
        assert_eq!(title.rect().bottom(), 17);

        // Up at the top of the first bar submenu goes back to the bar entry.
        feed(&mut s, cx, key("Up"));
        assert_eq!(s.position(), Some((0, 1)));
        assert_eq!(s.windows().len(), 2);

        feed(&mut s, cx, key("Left"));
        assert_eq!(label(&s).as_deref(), Some("One"));
        assert_eq!(s.windows().len(), 1);
    }

    #[test]
    fn menubar_pointer_off_entries_finds_nothing() {
        let mut h = Harness::new();
        h.backend.set_pointer(Point::new(250, 10));
        let cx = &mut h.cx();
        let table = bar();
        let root = MenuWindow::new(
            Level::root(table),
            Placement {
                anchor: Rect::new(0, 0, 300, 20),
                menubar: true,
                ..Default::default()
            },
            cx,
        );
        let mut s = MenuState::new(root, Rect::new(0, 0, 300, 20), None, None);
        assert!(!s.handle(&Event::drag(250, 10), cx));
    }

    #[test]
    fn shortcut_from_top_level_while_submenu_open() {
        let mut h = Harness::new();
        let cx = &mut h.cx();
        let table = MenuTable::builder()
            .submenu("File", |b| {
                b.item("Open")
                    .submenu("Recent", |b| b.item("a.txt").shortcut(Shortcut::ctrl('r')))
            })
            .item("Save")
            .shortcut(Shortcut::ctrl('s'))
            .build();
        let mut s = popup_at(cx, table.clone());
        feed(&mut s, cx, key("Down"));
        feed(&mut s, cx, key("Right"));
        assert_eq!(s.windows().len(), 2);
        feed(&mut s, cx, key("Ctrl+S"));
        assert!(s.is_done());
        assert_eq!(label(&s).as_deref(), Some("Save"));

        // Unopened nested shortcuts still commit.
        let mut s = popup_at(cx, table);
        feed(&mut s, cx, key("Down"));
        feed(&mut s, cx, key("Down"));
        assert_eq!(s.position(), Some((0, 1)));
        feed(&mut s, cx, key("Ctrl+R"));
        assert!(s.is_done());
        assert_eq!(label(&s).as_deref(), Some("a.txt"));
        assert_eq!(s.position(), None);
    }

    #[test]
    fn accelerator_on_submenu_title_opens_it() {
        let mut h = Harness::new();
        let cx = &mut h.cx();
        let table = MenuTable::builder()
            .item("&Quit")
            .submenu("&Edit", |b| b.item("Cut"))
            .build();
        let mut s = popup_at(cx, table);
        feed(&mut s, cx, key("e"));
        assert!(!s.is_done());
        assert_eq!(s.windows().len(), 2);
        feed(&mut s, cx, key("q"));
        assert!(s.is_done());
        assert_eq!(label(&s).as_deref(), Some("Quit"));
    }

    #[test]
    fn escape_twice_is_a_no_op() {
        let mut h = Harness::new();
        {
            let cx = &mut h.cx();
            let mut s = popup_at(cx, nested());
            feed(&mut s, cx, Event::moved(110, 146));
            feed(&mut s, cx, key("Escape"));
            assert!(s.is_done());
            assert!(!s.handle(&key("Escape"), cx));
            s.teardown(cx);
            s.teardown(cx);
        }
        assert!(h.backend.live_surfaces().is_empty());
        assert_eq!(h.backend.double_destroys(), 0);
    }

    #[test]
    fn click_on_title_keeps_menu_open_drag_release_commits() {
        let mut h = Harness::new();
        let cx = &mut h.cx();
        let mut s = popup_at(cx, nested());
        feed(&mut s, cx, Event::push(110, 146).at(0));
        assert_eq!(s.mode(), Mode::PressedOnTitle);
        feed(&mut s, cx, Event::release(110, 146).at(50));
        assert!(!s.is_done());

        feed(&mut s, cx, Event::push(110, 130).at(100));
        assert_eq!(s.mode(), Mode::PressedOnItem);
        feed(&mut s, cx, Event::drag(110, 165).at(200));
        feed(&mut s, cx, Event::release(110, 165).at(900));
        assert!(s.is_done());
        assert_eq!(label(&s).as_deref(), Some("Gamma"));
    }

    #[test]
    fn inactive_items_are_not_committed() {
        let mut h = Harness::new();
        let cx = &mut h.cx();
        let table = MenuTable::builder()
            .add(crate::menu::item::MenuItem::new("Off").with_flags(ItemFlags::INACTIVE))
            .item("On")
            .build();
        let mut s = popup_at(cx, table);
        feed(&mut s, cx, Event::push(110, 130).at(0));
        feed(&mut s, cx, Event::release(110, 130).at(1000));
        assert!(!s.is_done());
        assert_eq!(s.windows()[0].selected(), None);
        feed(&mut s, cx, key("Enter"));
        assert!(!s.is_done());
    }

    #[test]
    fn reopen_on_initial_item_descends_and_lines_up() {
        let mut h = Harness::new();
        let cx = &mut h.cx();
        let table = nested();
        let level = Level::root(table);
        let y = level.find_path("Beta/Y").unwrap();
        let anchor = Rect::new(300, 300, 0, 0);
        let root = MenuWindow::new(
            level,
            Placement {
                anchor,
                picked: Some(y.clone()),
                ..Default::default()
            },
            cx,
        );
        let mut s = MenuState::new(root, anchor, Some(y.clone()), None);
        assert!(s.select_root());
        s.settle(cx);
        assert_eq!(s.windows().len(), 2);
        assert_eq!(s.current(), Some(&y));
        assert_eq!(s.position(), Some((1, 1)));
        // The parent sits immediately left of the submenu.
        let (parent, sub) = (s.windows()[0].rect(), s.windows()[1].rect());
        assert_eq!(parent.right(), sub.x);
    }

    #[test]
    fn expose_marks_window_for_full_repaint() {
        let mut h = Harness::new();
        let id = {
            let cx = &mut h.cx();
            let mut s = popup_at(cx, nested());
            s.show_all(cx);
            s.flush(cx);
            let id = s.windows()[0].surface().unwrap();
            feed(&mut s, cx, Event::new(EventKind::Expose(id)));
            id
        };
        let paints = &h.backend.surface(id).unwrap().paints;
        assert_eq!(paints.len(), 2);
        assert!(matches!(paints[1][0], crate::platform::Paint::Frame { .. }));
    }
}
