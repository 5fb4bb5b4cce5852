use super::item::{ItemRef, Level, MenuItem};
use super::style::MenuStyle;
use super::Context;
use crate::geometry::{Point, Rect, Size};
use crate::platform::{Paint, SurfaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Damage {
    Clean,
    Selection,
    Full,
}

/// Where a window opens and what it shows besides its items.
#[derive(Debug, Clone, Default)]
pub struct Placement {
    /// The rectangle the window opens against (below it, or centered on it
    /// when `picked` is given). Zero width or height is allowed.
    pub anchor: Rect,
    /// Item to preselect; the window is centered on it.
    pub picked: Option<ItemRef>,
    pub title: Option<ItemRef>,
    /// The level is a horizontal menu bar drawn by its owner.
    pub menubar: bool,
    /// Draw the title as a pressed menu-bar button above the window.
    pub bar_title: bool,
    pub bar_height: i32,
}

fn measure_item(cx: &Context<'_>, item: &MenuItem) -> Size {
    let size = item.style.size.unwrap_or(cx.style.font_size);
    let text = cx.backend.text_size(&item.text(), size);
    let mut w = text.w + 6;
    if item.is_checkbox() {
        w += i32::from(cx.style.font_size);
    }
    Size::new(w, text.h)
}

/// Caption surface for a titled popup or a highlighted menu-bar entry.
#[derive(Debug)]
pub struct MenuTitle {
    item: ItemRef,
    rect: Rect,
    surface: SurfaceId,
    bar_button: bool,
    dirty: bool,
}

impl MenuTitle {
    fn new(item: ItemRef, rect: Rect, bar_button: bool, cx: &mut Context<'_>) -> Self {
        let surface = cx.backend.create_surface(rect);
        Self {
            item,
            rect,
            surface,
            bar_button,
            dirty: true,
        }
    }

    /// Title covering the bar entry whose left edge is at `origin.x`; `origin.y`
    /// is the bottom of the bar.
    pub fn for_bar(item: ItemRef, origin: Point, bar_height: i32, cx: &mut Context<'_>) -> Self {
        let w = measure_item(cx, item.item()).w + 12;
        Self::new(item, Self::bar_rect(origin, w, bar_height, cx.style), true, cx)
    }

    fn bar_rect(origin: Point, w: i32, bar_height: i32, style: &MenuStyle) -> Rect {
        let dy = style.border + 1;
        let ht = bar_height - dy * 2;
        Rect::new(origin.x, origin.y - ht - dy, w, ht)
    }

    pub fn item(&self) -> &ItemRef {
        &self.item
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    pub fn show(&mut self, cx: &mut Context<'_>) {
        if !cx.backend.is_shown(self.surface) {
            cx.backend.show(self.surface);
            self.dirty = true;
        }
    }

    pub fn hide(&self, cx: &mut Context<'_>) {
        if cx.backend.is_shown(self.surface) {
            cx.backend.hide(self.surface);
        }
    }

    fn move_by(&mut self, dx: i32, dy: i32, cx: &mut Context<'_>) {
        self.rect = self.rect.translated(dx, dy);
        cx.backend.set_geometry(self.surface, self.rect);
    }

    pub fn flush(&mut self, cx: &mut Context<'_>) {
        if !self.dirty || !cx.backend.is_shown(self.surface) {
            return;
        }
        let style = cx.style;
        let (bg, fg) = if self.bar_button {
            (style.selection, style.selected_text)
        } else {
            (style.background, style.text)
        };
        let ops = [
            Paint::Frame {
                rect: Rect::new(0, 0, self.rect.w, self.rect.h),
                color: bg,
            },
            Paint::Label {
                rect: Rect::new(3, 0, self.rect.w - 6, self.rect.h),
                text: self.item.item().text(),
                color: fg,
            },
        ];
        cx.backend.paint(self.surface, &ops);
        self.dirty = false;
    }

    pub fn expose(&mut self, id: SurfaceId) -> bool {
        if id == self.surface {
            self.dirty = true;
        }
        id == self.surface
    }

    pub fn destroy(self, cx: &mut Context<'_>) {
        cx.backend.destroy(self.surface);
    }
}

#[derive(Debug)]
pub struct MenuWindow {
    level: Level,
    items: Vec<ItemRef>,
    widths: Vec<i32>,
    rect: Rect,
    /// `None` for a menu bar, which its owner draws.
    surface: Option<SurfaceId>,
    title: Option<MenuTitle>,
    /// Submenu title in the window one level up.
    opened_by: Option<ItemRef>,
    selected: Option<usize>,
    drawn_selected: Option<usize>,
    damage: Damage,
    item_height: i32,
    shortcut_width: i32,
    menubar: bool,
}

impl MenuWindow {
    pub fn new(level: Level, placement: Placement, cx: &mut Context<'_>) -> Self {
        let Placement {
            anchor,
            picked,
            title,
            menubar,
            bar_title,
            bar_height,
        } = placement;
        let style = cx.style;
        let bw = style.border;
        let leading = style.line_spacing;
        let (mut x, mut y) = (anchor.x, anchor.y);
        let (mut wp, mut hp) = (anchor.w, anchor.h);
        let work = cx.backend.work_area(anchor.origin());

        let items: Vec<ItemRef> = level.visible().collect();
        let mut selected = None;
        if let Some(picked) = &picked {
            for (n, m) in items.iter().enumerate() {
                if m == picked {
                    selected = Some(n);
                    break;
                }
                // The pick lives deeper: select its submenu title and center
                // on the anchor point instead of the anchor box.
                if m.submenu().is_some_and(|sub| sub.path_to(picked).is_some()) {
                    selected = Some(n);
                    wp = 0;
                    hp = 0;
                    break;
                }
            }
        }
        let sizes: Vec<Size> = items.iter().map(|m| measure_item(cx, m.item())).collect();
        let widths = sizes.iter().map(|s| s.w).collect();

        if menubar {
            return Self {
                level,
                items,
                widths,
                rect: anchor,
                surface: None,
                title: None,
                opened_by: None,
                selected,
                drawn_selected: None,
                damage: Damage::Clean,
                item_height: 0,
                shortcut_width: 0,
                menubar: true,
            };
        }

        let text_w = |s: &str| cx.backend.text_size(s, style.font_size).w;
        let mut item_height = 1;
        let mut hot_keys = 0;
        let mut hot_mods = 0;
        let mut w = 0;
        for (m, size) in items.iter().zip(&sizes) {
            let item = m.item();
            item_height = item_height.max(size.h + leading);
            let mut w1 = size.w;
            if item.is_submenu() {
                w1 += i32::from(style.font_size);
            }
            w = w.max(w1);
            if let Some(shortcut) = item.shortcut {
                let (mods, key) = shortcut.label_parts();
                if key.chars().count() <= 4 {
                    hot_mods = hot_mods.max(text_w(&mods));
                    hot_keys = hot_keys.max(text_w(&key) + 4);
                } else {
                    // Long key names are right-aligned as a whole.
                    let w1 = text_w(&format!("{mods}{key}")) + 4;
                    if w1 > hot_mods + hot_keys {
                        hot_mods = w1 - hot_keys;
                    }
                }
            }
        }
        let title_size = title.as_ref().map(|t| {
            let s = measure_item(cx, t.item());
            Size::new(s.w + 12, s.h)
        });
        let (w_title, h_title) = title_size.map_or((0, 0), |s| (s.w, s.h));

        if selected.is_some() && wp == 0 {
            x -= w / 2;
        }
        w += hot_keys + hot_mods + 2 * bw + 7;
        w = w.max(wp).max(w_title);

        if x > work.right() - w {
            x = work.right() - w;
        }
        // Menus wider than the screen keep their left edge visible.
        x = x.max(work.x);

        let n = items.len() as i32;
        let h = if n > 0 { item_height * n - leading } else { 0 } + 2 * bw + 3;
        if let Some(sel) = selected {
            y += (hp - item_height) / 2 - sel as i32 * item_height - bw;
        } else {
            y += hp;
            // Flip above the anchor when there is no room below it.
            if y + h > work.bottom() && y - h >= work.y {
                if hp > 1 {
                    y = y - hp - h;
                } else if title.is_some() {
                    y = y - item_height - h - 2 * bw;
                } else {
                    y = y - h + item_height + bw;
                }
                if title.is_some() {
                    if bar_title {
                        y += leading - 2 * bw;
                    } else {
                        y += 2 * h_title + 2 * bw + 3;
                    }
                }
            }
        }
        let rect = Rect::new(x, y, w, h);

        let title = title.map(|t| {
            let r = if bar_title {
                MenuTitle::bar_rect(anchor.origin(), w_title, bar_height, style)
            } else {
                let ht = h_title + 2 * bw + 3;
                Rect::new(x, y - ht - 2, w_title, ht)
            };
            MenuTitle::new(t, r, bar_title, cx)
        });

        let surface = cx.backend.create_surface(rect);
        log::trace!("menu window {surface:?}: {} items at {rect:?}", items.len());

        Self {
            level,
            items,
            widths,
            rect,
            surface: Some(surface),
            title,
            opened_by: None,
            selected,
            drawn_selected: None,
            damage: Damage::Full,
            item_height,
            shortcut_width: hot_keys,
            menubar: false,
        }
    }

    pub(crate) fn set_opened_by(&mut self, item: ItemRef) {
        self.opened_by = Some(item);
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn opened_by(&self) -> Option<&ItemRef> {
        self.opened_by.as_ref()
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    pub fn title(&self) -> Option<&MenuTitle> {
        self.title.as_ref()
    }

    pub fn is_menubar(&self) -> bool {
        self.menubar
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn item(&self, n: usize) -> Option<&ItemRef> {
        self.items.get(n)
    }

    pub fn item_height(&self) -> i32 {
        self.item_height
    }

    pub fn shortcut_width(&self) -> i32 {
        self.shortcut_width
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn set_selected(&mut self, n: Option<usize>) {
        if n != self.selected {
            self.selected = n;
            if self.damage == Damage::Clean {
                self.damage = Damage::Selection;
            }
        }
    }

    /// Left edge of bar entry `n`, relative to the bar.
    pub fn titlex(&self, n: usize, style: &MenuStyle) -> i32 {
        style.bar_margin
            + self
                .widths
                .iter()
                .take(n)
                .map(|w| w + style.bar_spacing)
                .sum::<i32>()
    }

    /// Visible item position under the screen point `p`.
    pub fn find_selected(&self, p: Point, style: &MenuStyle) -> Option<usize> {
        if self.items.is_empty() {
            return None;
        }
        let mx = p.x - self.rect.x;
        let my = p.y - self.rect.y;
        if my < 0 || my >= self.rect.h {
            return None;
        }
        if self.menubar {
            if mx < 0 {
                return None;
            }
            let mut xx = style.bar_margin;
            for (n, w) in self.widths.iter().enumerate() {
                xx += w + style.bar_spacing;
                if xx > mx {
                    return Some(n);
                }
            }
            return None;
        }
        if mx < style.border || mx >= self.rect.w {
            return None;
        }
        let n = (my - style.border - 1) / self.item_height;
        if n < 0 || n as usize >= self.items.len() {
            return None;
        }
        Some(n as usize)
    }

    pub fn is_inside(&self, p: Point, style: &MenuStyle) -> bool {
        if !self.rect.contains(p) {
            return false;
        }
        !self.menubar || self.find_selected(p, style).is_some()
    }

    /// Move to `to`, carrying the title along.
    pub fn position(&mut self, to: Point, cx: &mut Context<'_>) {
        let (dx, dy) = (to.x - self.rect.x, to.y - self.rect.y);
        if dx == 0 && dy == 0 {
            return;
        }
        if let Some(title) = &mut self.title {
            title.move_by(dx, dy, cx);
        }
        self.rect = self.rect.moved_to(to);
        if let Some(surface) = self.surface {
            cx.backend.set_geometry(surface, self.rect);
        }
    }

    /// Slide vertically so row `n` lies inside the work area. Returns whether
    /// the window moved.
    pub fn autoscroll(&mut self, n: usize, cx: &mut Context<'_>) -> bool {
        if self.menubar {
            return false;
        }
        let work = cx.backend.work_area(self.rect.origin());
        let mut y = self.rect.y + cx.style.border + 2 + n as i32 * self.item_height;
        if y <= work.y {
            y = work.y - y + 10;
        } else {
            y = y + self.item_height - work.h - work.y;
            if y < 0 {
                return false;
            }
            y = -y - 10;
        }
        let to = Point::new(self.rect.x, self.rect.y + y);
        self.position(to, cx);
        true
    }

    pub fn show(&mut self, cx: &mut Context<'_>) {
        let Some(surface) = self.surface else {
            return;
        };
        if let Some(title) = &mut self.title {
            title.show(cx);
        }
        if !cx.backend.is_shown(surface) {
            cx.backend.show(surface);
            self.damage = Damage::Full;
        }
    }

    pub fn hide(&self, cx: &mut Context<'_>) {
        if let Some(title) = &self.title {
            title.hide(cx);
        }
        if let Some(surface) = self.surface.filter(|&s| cx.backend.is_shown(s)) {
            cx.backend.hide(surface);
        }
    }

    /// Request a full repaint if `id` belongs to this window.
    pub fn expose(&mut self, id: SurfaceId) -> bool {
        let title_hit = self.title.as_mut().is_some_and(|t| t.expose(id));
        if self.surface == Some(id) {
            self.damage = Damage::Full;
            return true;
        }
        title_hit
    }

    /// Paint whatever changed since the last flush.
    pub fn flush(&mut self, cx: &mut Context<'_>) {
        if let Some(title) = &mut self.title {
            title.flush(cx);
        }
        let Some(surface) = self.surface else {
            return;
        };
        if !cx.backend.is_shown(surface) {
            return;
        }
        let style = cx.style;
        let mut ops = Vec::new();
        match self.damage {
            Damage::Clean => {}
            Damage::Full => {
                ops.push(Paint::Frame {
                    rect: Rect::new(0, 0, self.rect.w, self.rect.h),
                    color: style.background,
                });
                for n in 0..self.items.len() {
                    self.draw_entry(n, false, style, &mut ops);
                }
            }
            Damage::Selection => {
                if self.selected != self.drawn_selected {
                    if let Some(old) = self.drawn_selected {
                        self.draw_entry(old, true, style, &mut ops);
                    }
                    if let Some(new) = self.selected {
                        self.draw_entry(new, true, style, &mut ops);
                    }
                }
            }
        }
        self.drawn_selected = self.selected;
        self.damage = Damage::Clean;
        if !ops.is_empty() {
            cx.backend.paint(surface, &ops);
        }
    }

    fn draw_entry(&self, n: usize, erase: bool, style: &MenuStyle, ops: &mut Vec<Paint>) {
        let Some(m) = self.items.get(n) else {
            return;
        };
        let item = m.item();
        let bw = style.border;
        let leading = style.line_spacing;
        let xx = bw;
        let ww = self.rect.w - 2 * bw - 1;
        let yy = bw + 1 + n as i32 * self.item_height;
        let hh = self.item_height - leading;
        let selected = self.selected == Some(n);
        let row = Rect::new(xx + 1, yy - (leading - 2) / 2, ww - 2, hh + (leading - 2));

        if selected {
            ops.push(Paint::Row {
                rect: row,
                color: style.selection,
            });
        } else if erase {
            ops.push(Paint::Row {
                rect: row,
                color: style.background,
            });
        }

        let color = if !item.active() {
            style.inactive_text
        } else if selected {
            style.selected_text
        } else {
            style.text
        };

        let mut lx = xx + 3;
        if item.is_checkbox() {
            let d = i32::from(style.font_size) - 2;
            ops.push(Paint::Check {
                rect: Rect::new(lx, yy + (hh - d) / 2, d, d),
                radio: item.flags.contains(super::item::ItemFlags::RADIO),
                on: item.value(),
            });
            lx += i32::from(style.font_size);
        }
        ops.push(Paint::Label {
            rect: Rect::new(lx, yy, xx + ww - 3 - lx, hh),
            text: item.text(),
            color,
        });

        if item.is_submenu() {
            let sz = (hh - 7) & !1;
            let y1 = yy + (hh - sz) / 2;
            let x1 = xx + ww - sz - 3;
            ops.push(Paint::Arrow {
                rect: Rect::new(x1 + 2, y1, sz / 2, sz),
                color,
            });
        } else if let Some(shortcut) = item.shortcut {
            let (modifiers, key) = shortcut.label_parts();
            ops.push(Paint::Shortcut {
                rect: Rect::new(xx, yy, ww - 3, hh),
                split: xx + ww - self.shortcut_width,
                modifiers,
                key,
                color,
            });
        }

        if item.is_divider() {
            ops.push(Paint::Divider {
                x: bw - 1,
                y: yy + hh + (leading - 2) / 2,
                w: self.rect.w - 2 * bw + 2,
                dark: style.divider_dark,
                light: style.divider_light,
            });
        }
    }

    /// Release the surfaces. Consumes the window so it cannot be destroyed twice.
    pub fn destroy(self, cx: &mut Context<'_>) {
        if let Some(title) = self.title {
            title.destroy(cx);
        }
        if let Some(surface) = self.surface {
            log::trace!("destroy menu window {surface:?}");
            cx.backend.destroy(surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::event::ClickThreshold;
    use crate::menu::item::MenuTable;
    use crate::menu::shortcut::Shortcut;
    use crate::platform::headless::HeadlessBackend;

    fn screen() -> Rect {
        Rect::new(0, 0, 1024, 768)
    }

    fn run<R>(f: impl FnOnce(&mut Context<'_>) -> R) -> (R, HeadlessBackend) {
        run_on(screen(), f)
    }

    fn run_on<R>(work: Rect, f: impl FnOnce(&mut Context<'_>) -> R) -> (R, HeadlessBackend) {
        let mut backend = HeadlessBackend::new(work);
        let style = MenuStyle::default();
        let click = ClickThreshold::default();
        let r = {
            let mut cx = Context {
                backend: &mut backend,
                style: &style,
                click: &click,
            };
            f(&mut cx)
        };
        (r, backend)
    }

    fn edit_level() -> Level {
        Level::root(MenuTable::builder().item("Cut").item("Copy").item("Paste").build())
    }

    fn below(anchor: Rect) -> Placement {
        Placement {
            anchor,
            ..Default::default()
        }
    }

    #[test]
    fn opens_below_anchor() {
        let (w, _) = run(|cx| MenuWindow::new(edit_level(), below(Rect::new(100, 100, 80, 20)), cx));
        assert_eq!(w.item_height(), 18);
        assert_eq!(w.rect(), Rect::new(100, 120, 80, 57));
        assert_eq!(w.selected(), None);
    }

    #[test]
    fn flips_above_anchor_near_bottom() {
        let (w, _) = run(|cx| MenuWindow::new(edit_level(), below(Rect::new(100, 740, 80, 20)), cx));
        assert_eq!(w.rect().bottom(), 740);
    }

    #[test]
    fn clamped_to_right_edge() {
        let (w, _) = run(|cx| MenuWindow::new(edit_level(), below(Rect::new(1000, 100, 80, 20)), cx));
        assert_eq!(w.rect().right(), 1024);
    }

    #[test]
    fn wider_than_screen_keeps_left_edge() {
        let (w, _) = run_on(Rect::new(0, 0, 60, 768), |cx| {
            MenuWindow::new(edit_level(), below(Rect::new(30, 100, 80, 20)), cx)
        });
        assert_eq!(w.rect().x, 0);
        assert!(w.rect().w > 60);
    }

    #[test]
    fn picked_item_is_centered_on_anchor() {
        let level = edit_level();
        let copy = level.item(1).unwrap();
        let (w, _) = run(|cx| {
            MenuWindow::new(
                level.clone(),
                Placement {
                    anchor: Rect::new(100, 100, 0, 0),
                    picked: Some(copy),
                    ..Default::default()
                },
                cx,
            )
        });
        assert_eq!(w.selected(), Some(1));
        assert_eq!(w.rect().y, 71);
        let row_center = w.rect().y + 2 + 1 + 18 + 7;
        assert!((row_center - 100).abs() <= 2);
    }

    #[test]
    fn picked_inside_submenu_selects_its_title() {
        let table = MenuTable::builder()
            .item("New")
            .submenu("Recent", |b| b.item("a.txt").item("b.txt"))
            .build();
        let level = Level::root(table);
        let b = level.find_path("Recent/b.txt").unwrap();
        let (w, _) = run(|cx| {
            MenuWindow::new(
                level.clone(),
                Placement {
                    anchor: Rect::new(300, 300, 50, 20),
                    picked: Some(b),
                    ..Default::default()
                },
                cx,
            )
        });
        assert_eq!(w.selected(), Some(1));
    }

    #[test]
    fn shortcut_and_submenu_columns_widen_window() {
        let table = MenuTable::builder()
            .item("Save")
            .shortcut(Shortcut::ctrl('s'))
            .build();
        let (w, _) = run(|cx| MenuWindow::new(Level::root(table), below(Rect::new(0, 0, 0, 0)), cx));
        assert_eq!(w.shortcut_width(), 12);
        assert_eq!(w.rect().w, 38 + 12 + 40 + 4 + 7);

        let table = MenuTable::builder().submenu("Edit", |b| b.item("x")).build();
        let (w, _) = run(|cx| MenuWindow::new(Level::root(table), below(Rect::new(0, 0, 0, 0)), cx));
        assert_eq!(w.rect().w, 38 + 14 + 4 + 7);
    }

    #[test]
    fn vertical_hit_testing() {
        let style = MenuStyle::default();
        let (w, _) = run(|cx| MenuWindow::new(edit_level(), below(Rect::new(100, 100, 80, 20)), cx));
        assert_eq!(w.find_selected(Point::new(110, 130), &style), Some(0));
        assert_eq!(w.find_selected(Point::new(110, 166), &style), Some(2));
        assert_eq!(w.find_selected(Point::new(101, 130), &style), None);
        assert_eq!(w.find_selected(Point::new(110, 180), &style), None);
        assert!(w.is_inside(Point::new(150, 150), &style));
        assert!(!w.is_inside(Point::new(50, 150), &style));
    }

    #[test]
    fn menubar_hit_testing_walks_widths() {
        let style = MenuStyle::default();
        let table = MenuTable::builder().item("One").item("Two").build();
        let (w, _) = run(|cx| {
            MenuWindow::new(
                Level::root(table),
                Placement {
                    anchor: Rect::new(0, 0, 300, 20),
                    menubar: true,
                    ..Default::default()
                },
                cx,
            )
        });
        assert!(w.surface().is_none());
        assert_eq!(w.find_selected(Point::new(10, 5), &style), Some(0));
        assert_eq!(w.find_selected(Point::new(60, 5), &style), Some(1));
        assert_eq!(w.find_selected(Point::new(200, 5), &style), None);
        assert!(!w.is_inside(Point::new(200, 5), &style));
        assert_eq!(w.titlex(1, &style), 49);
    }

    fn labels(batch: &[Paint]) -> Vec<String> {
        batch
            .iter()
            .filter_map(|p| match p {
                Paint::Label { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn selection_change_repaints_two_rows_only() {
        let (surface, backend) = run(|cx| {
            let mut w = MenuWindow::new(edit_level(), below(Rect::new(100, 100, 80, 20)), cx);
            w.show(cx);
            w.flush(cx);
            w.set_selected(Some(1));
            w.flush(cx);
            w.set_selected(Some(2));
            w.flush(cx);
            w.flush(cx);
            w.surface().unwrap()
        });
        let paints = &backend.surface(surface).unwrap().paints;
        assert_eq!(paints.len(), 3);
        assert!(matches!(paints[0][0], Paint::Frame { .. }));
        assert_eq!(labels(&paints[0]), vec!["Cut", "Copy", "Paste"]);
        assert_eq!(labels(&paints[1]), vec!["Copy"]);
        assert_eq!(labels(&paints[2]), vec!["Copy", "Paste"]);
        assert!(!paints[2].iter().any(|p| matches!(p, Paint::Frame { .. })));
    }

    #[test]
    fn expose_forces_full_repaint() {
        let (surface, backend) = run(|cx| {
            let mut w = MenuWindow::new(edit_level(), below(Rect::new(100, 100, 80, 20)), cx);
            w.show(cx);
            w.flush(cx);
            let id = w.surface().unwrap();
            assert!(w.expose(id));
            w.flush(cx);
            id
        });
        let paints = &backend.surface(surface).unwrap().paints;
        assert_eq!(paints.len(), 2);
        assert_eq!(labels(&paints[1]).len(), 3);
    }

    #[test]
    fn autoscroll_brings_row_on_screen() {
        let mut builder = MenuTable::builder();
        for i in 0..50 {
            builder = builder.item(format!("Item {i}"));
        }
        let level = Level::root(builder.build());
        let (w, _) = run(|cx| {
            let mut w = MenuWindow::new(level, below(Rect::new(0, 0, 0, 0)), cx);
            assert!(!w.autoscroll(0, cx));
            assert!(w.autoscroll(45, cx));
            w
        });
        assert_eq!(w.rect().y, -74);
    }

    #[test]
    fn titled_popup_puts_title_above() {
        let level = edit_level();
        let title = level.item(0).unwrap();
        let (w, backend) = run(|cx| {
            MenuWindow::new(
                level.clone(),
                Placement {
                    anchor: Rect::new(100, 100, 0, 0),
                    title: Some(title),
                    ..Default::default()
                },
                cx,
            )
        });
        let t = w.title().unwrap();
        assert!(t.rect().bottom() <= w.rect().y);
        assert_eq!(backend.live_surfaces().len(), 2);
    }

    #[test]
    fn destroy_releases_title_and_window() {
        let level = edit_level();
        let title = level.item(0).unwrap();
        let ((), backend) = run(|cx| {
            let w = MenuWindow::new(
                level.clone(),
                Placement {
                    anchor: Rect::new(100, 100, 0, 0),
                    title: Some(title),
                    ..Default::default()
                },
                cx,
            );
            w.destroy(cx);
        });
        assert!(backend.live_surfaces().is_empty());
        assert_eq!(backend.double_destroys(), 0);
    }
}
