use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Result};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::shortcut::{display_label, test_label_accelerator, KeyPress, Shortcut};

bitflags! {
    /// Per-item flag bits. The values are part of the table format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ItemFlags: u32 {
        /// Shown dimmed, cannot be picked.
        const INACTIVE = 0x001;
        /// Check box item.
        const TOGGLE = 0x002;
        /// Toggle or radio item that is on.
        const VALUE = 0x004;
        /// Radio button item.
        const RADIO = 0x008;
        /// Skipped by traversal, hit-testing and layout.
        const INVISIBLE = 0x010;
        /// The submenu is the table in `MenuItem::submenu`.
        const SUBMENU_POINTER = 0x020;
        /// The submenu is the run of entries following this one.
        const SUBMENU = 0x040;
        /// Draw a divider line below this item.
        const DIVIDER = 0x080;
        /// Report highlight changes, not just the final pick.
        const CHATTY = 0x200;
    }
}

/// Opaque invocation target of an item. The engine only tests for presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub u32);

/// Presentation fields read by the renderer only.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LabelStyle {
    pub font: Option<u16>,
    pub size: Option<u16>,
    pub color: Option<u32>,
}

#[derive(Debug, Default, Clone)]
pub struct MenuItem {
    /// `None` marks the terminator of a level.
    pub label: Option<String>,
    pub shortcut: Option<Shortcut>,
    pub flags: ItemFlags,
    /// Target table when `SUBMENU_POINTER` is set.
    pub submenu: Option<Arc<MenuTable>>,
    pub callback: Option<CommandId>,
    pub user_data: u64,
    pub style: LabelStyle,
}

impl MenuItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    pub fn terminator() -> Self {
        Self::default()
    }

    pub fn with_shortcut(mut self, shortcut: Shortcut) -> Self {
        self.shortcut = Some(shortcut);
        self
    }

    pub fn with_flags(mut self, flags: ItemFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_callback(mut self, id: u32) -> Self {
        self.callback = Some(CommandId(id));
        self
    }

    pub fn is_terminator(&self) -> bool {
        self.label.is_none()
    }

    pub fn visible(&self) -> bool {
        !self.flags.contains(ItemFlags::INVISIBLE)
    }

    pub fn active(&self) -> bool {
        !self.flags.contains(ItemFlags::INACTIVE)
    }

    pub fn activevisible(&self) -> bool {
        !self
            .flags
            .intersects(ItemFlags::INACTIVE | ItemFlags::INVISIBLE)
    }

    pub fn is_submenu(&self) -> bool {
        self.flags
            .intersects(ItemFlags::SUBMENU | ItemFlags::SUBMENU_POINTER)
    }

    pub fn is_divider(&self) -> bool {
        self.flags.contains(ItemFlags::DIVIDER)
    }

    pub fn is_checkbox(&self) -> bool {
        self.flags.intersects(ItemFlags::TOGGLE | ItemFlags::RADIO)
    }

    pub fn value(&self) -> bool {
        self.flags.contains(ItemFlags::VALUE)
    }

    pub fn is_chatty(&self) -> bool {
        self.flags.contains(ItemFlags::CHATTY)
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or_default()
    }

    /// Label without accelerator markup.
    pub fn text(&self) -> String {
        display_label(self.label())
    }
}

/// An immutable flat table of menu items. Every nesting level ends in a
/// terminator entry; a submenu is either the run after a `SUBMENU` item or a
/// separate table hung off a `SUBMENU_POINTER` item.
#[derive(Debug, Default)]
pub struct MenuTable {
    items: Vec<MenuItem>,
}

impl MenuTable {
    /// Wrap `items`, closing any open runs and the outermost level if the
    /// caller left them unterminated.
    pub fn new(mut items: Vec<MenuItem>) -> Arc<Self> {
        let mut nest = 0usize;
        let mut closed = false;
        for m in &items {
            if m.is_terminator() {
                if nest == 0 {
                    closed = true;
                    break;
                }
                nest -= 1;
            } else if m.flags.contains(ItemFlags::SUBMENU) {
                nest += 1;
            }
        }
        if !closed {
            items.extend(std::iter::repeat_with(MenuItem::terminator).take(nest + 1));
        }
        Arc::new(Self { items })
    }

    pub fn builder() -> TableBuilder {
        TableBuilder::default()
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.len() <= 1
    }

    /// Entry at `index`; anything past the end reads as the last terminator.
    pub fn get(&self, index: usize) -> &MenuItem {
        let last = self.items.len().saturating_sub(1);
        &self.items[index.min(last)]
    }

    fn is_terminator_at(&self, index: usize) -> bool {
        index >= self.items.len() || self.items[index].is_terminator()
    }

    fn clamp(&self, index: usize) -> usize {
        index.min(self.items.len().saturating_sub(1))
    }

    /// Number of entries from `start` through the terminator of its level,
    /// nested runs and their terminators included.
    pub fn size_from(&self, start: usize) -> usize {
        let mut nest = 0usize;
        let mut i = start;
        loop {
            if self.is_terminator_at(i) {
                if nest == 0 || i >= self.items.len() {
                    return (i + 1).min(self.items.len()).saturating_sub(start);
                }
                nest -= 1;
            } else if self.items[i].flags.contains(ItemFlags::SUBMENU) {
                nest += 1;
            }
            i += 1;
        }
    }

    /// Advance `n` visible entries from `start`, stepping over nested runs.
    /// Stops on the level's terminator when `n` runs past the end.
    pub fn next_from(&self, start: usize, mut n: usize) -> usize {
        let mut i = start;
        let mut nest = 0usize;
        if !self.get(i).visible() {
            n += 1;
        }
        while n > 0 {
            if self.is_terminator_at(i) {
                if nest == 0 || i >= self.items.len() {
                    return self.clamp(i);
                }
                nest -= 1;
            } else if self.items[i].flags.contains(ItemFlags::SUBMENU) {
                nest += 1;
            }
            i += 1;
            if nest == 0 && self.get(i).visible() {
                n -= 1;
            }
        }
        self.clamp(i)
    }

    /// First visible entry at or after `start`.
    pub fn first_from(&self, start: usize) -> usize {
        self.next_from(start, 0)
    }

    /// The entry after `index` on the same level, visible or not.
    pub fn next_visible_or_not(&self, index: usize) -> usize {
        let mut i = index;
        let mut nest = 0usize;
        loop {
            if self.is_terminator_at(i) {
                if nest == 0 || i >= self.items.len() {
                    return self.clamp(i);
                }
                nest -= 1;
            } else if self.items[i].flags.contains(ItemFlags::SUBMENU) {
                nest += 1;
            }
            i += 1;
            if nest == 0 {
                return self.clamp(i);
            }
        }
    }

    /// Verify the nesting of this table and of every table it points to.
    pub fn check(&self) -> Result<()> {
        self.check_depth(0)
    }

    fn check_depth(&self, depth: usize) -> Result<()> {
        if depth > 64 {
            bail!("submenu pointers nest deeper than 64 levels (cycle?)");
        }
        let mut nest = 0usize;
        for (i, m) in self.items.iter().enumerate() {
            if m.is_terminator() {
                if nest == 0 {
                    if i + 1 != self.items.len() {
                        bail!("entry {i}: outermost terminator is followed by {} stray entries", self.items.len() - i - 1);
                    }
                    return Ok(());
                }
                nest -= 1;
                continue;
            }
            if m.flags.contains(ItemFlags::SUBMENU) {
                if m.flags.contains(ItemFlags::SUBMENU_POINTER) {
                    bail!("entry {i} ('{}'): both inline and pointer submenu", m.label());
                }
                nest += 1;
            }
            if m.flags.contains(ItemFlags::SUBMENU_POINTER) {
                match &m.submenu {
                    Some(table) => table.check_depth(depth + 1)?,
                    None => bail!("entry {i} ('{}'): submenu pointer without a table", m.label()),
                }
            }
        }
        bail!("table ends inside {} unterminated level(s)", nest + 1)
    }
}

/// Builds a table level by level; submenus passed as closures become inline runs.
#[derive(Debug, Default)]
pub struct TableBuilder {
    items: Vec<MenuItem>,
    last: Option<usize>,
}

impl TableBuilder {
    pub fn add(mut self, item: MenuItem) -> Self {
        self.last = Some(self.items.len());
        self.items.push(item);
        self
    }

    pub fn item(self, label: impl Into<String>) -> Self {
        self.add(MenuItem::new(label))
    }

    /// Inline submenu: the title followed by the children and their terminator.
    pub fn submenu(
        mut self,
        label: impl Into<String>,
        children: impl FnOnce(TableBuilder) -> TableBuilder,
    ) -> Self {
        let title = self.items.len();
        self.items
            .push(MenuItem::new(label).with_flags(ItemFlags::SUBMENU));
        let nested = children(TableBuilder::default());
        self.items.extend(nested.items);
        self.items.push(MenuItem::terminator());
        self.last = Some(title);
        self
    }

    /// Submenu stored in its own table.
    pub fn submenu_ref(self, label: impl Into<String>, table: Arc<MenuTable>) -> Self {
        let mut item = MenuItem::new(label).with_flags(ItemFlags::SUBMENU_POINTER);
        item.submenu = Some(table);
        self.add(item)
    }

    fn edit_last(mut self, f: impl FnOnce(&mut MenuItem)) -> Self {
        if let Some(i) = self.last {
            f(&mut self.items[i]);
        }
        self
    }

    pub fn shortcut(self, shortcut: Shortcut) -> Self {
        self.edit_last(|m| m.shortcut = Some(shortcut))
    }

    pub fn flags(self, flags: ItemFlags) -> Self {
        self.edit_last(|m| m.flags |= flags)
    }

    pub fn divider(self) -> Self {
        self.flags(ItemFlags::DIVIDER)
    }

    pub fn inactive(self) -> Self {
        self.flags(ItemFlags::INACTIVE)
    }

    pub fn invisible(self) -> Self {
        self.flags(ItemFlags::INVISIBLE)
    }

    pub fn callback(self, id: u32) -> Self {
        self.edit_last(|m| m.callback = Some(CommandId(id)))
    }

    pub fn build(mut self) -> Arc<MenuTable> {
        self.items.push(MenuItem::terminator());
        Arc::new(MenuTable { items: self.items })
    }
}

/// One entry of a table.
#[derive(Clone)]
pub struct ItemRef {
    table: Arc<MenuTable>,
    index: usize,
}

impl ItemRef {
    pub fn new(table: Arc<MenuTable>, index: usize) -> Self {
        Self { table, index }
    }

    pub fn item(&self) -> &MenuItem {
        self.table.get(self.index)
    }

    pub fn table(&self) -> &Arc<MenuTable> {
        &self.table
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The level this entry opens, if it is a submenu title.
    pub fn submenu(&self) -> Option<Level> {
        let item = self.item();
        if item.flags.contains(ItemFlags::SUBMENU) {
            Some(Level::new(self.table.clone(), self.index + 1))
        } else if item.flags.contains(ItemFlags::SUBMENU_POINTER) {
            item.submenu.clone().map(Level::root)
        } else {
            None
        }
    }
}

impl PartialEq for ItemRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.table, &other.table) && self.index == other.index
    }
}

impl Eq for ItemRef {}

impl fmt::Debug for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemRef({}, {:?})", self.index, self.item().label)
    }
}

/// One nesting level of a table: the entries from `start` to its terminator.
#[derive(Clone)]
pub struct Level {
    table: Arc<MenuTable>,
    start: usize,
}

impl Level {
    pub fn new(table: Arc<MenuTable>, start: usize) -> Self {
        Self { table, start }
    }

    pub fn root(table: Arc<MenuTable>) -> Self {
        Self::new(table, 0)
    }

    pub fn table(&self) -> &Arc<MenuTable> {
        &self.table
    }

    pub fn start(&self) -> usize {
        self.start
    }

    /// Entries through the level's terminator, nested runs included.
    pub fn size(&self) -> usize {
        self.table.size_from(self.start)
    }

    /// Table index of the `n`th visible entry (the terminator when out of range).
    pub fn position(&self, n: usize) -> usize {
        let first = self.table.first_from(self.start);
        self.table.next_from(first, n)
    }

    /// The `n`th visible entry, or `None` when `n` is past the end.
    pub fn item(&self, n: usize) -> Option<ItemRef> {
        let pos = self.position(n);
        if self.table.get(pos).is_terminator() {
            None
        } else {
            Some(ItemRef::new(self.table.clone(), pos))
        }
    }

    pub fn first(&self) -> Option<ItemRef> {
        self.item(0)
    }

    /// Visible entries in order.
    pub fn visible(&self) -> impl Iterator<Item = ItemRef> + '_ {
        let mut pos = self.table.first_from(self.start);
        std::iter::from_fn(move || {
            if self.table.get(pos).is_terminator() {
                return None;
            }
            let out = ItemRef::new(self.table.clone(), pos);
            pos = self.table.next_from(pos, 1);
            Some(out)
        })
    }

    pub fn count(&self) -> usize {
        self.visible().count()
    }

    /// Every entry of the level, invisible ones included.
    fn all(&self) -> impl Iterator<Item = ItemRef> + '_ {
        let mut pos = self.start;
        std::iter::from_fn(move || {
            if self.table.get(pos).is_terminator() {
                return None;
            }
            let out = ItemRef::new(self.table.clone(), pos);
            pos = self.table.next_visible_or_not(pos);
            Some(out)
        })
    }

    /// Visible position of `item` on this level.
    pub fn index_of(&self, item: &ItemRef) -> Option<usize> {
        self.visible().position(|m| m == *item)
    }

    /// Match `press` against this level only: the shortcut field first, then
    /// the label's accelerator. Returns the entry and its visible position.
    pub fn find_shortcut(&self, press: &KeyPress, require_alt: bool) -> Option<(ItemRef, usize)> {
        self.visible().enumerate().find_map(|(n, m)| {
            let item = m.item();
            if !item.active() {
                return None;
            }
            let hit = item.shortcut.is_some_and(|s| s.matches(press))
                || test_label_accelerator(item.label(), press, require_alt);
            hit.then_some((m, n))
        })
    }

    /// Match `press` against shortcut fields on this level and every nested
    /// level. A match on this level wins over any match inside a submenu.
    pub fn test_shortcut(&self, press: &KeyPress) -> Option<ItemRef> {
        let mut nested = None;
        for m in self.all() {
            let item = m.item();
            if !item.active() {
                continue;
            }
            if item.shortcut.is_some_and(|s| s.matches(press)) {
                return Some(m);
            }
            if nested.is_none() {
                if let Some(sub) = m.submenu() {
                    nested = sub.test_shortcut(press);
                }
            }
        }
        nested
    }

    /// Find an entry by its `/`-separated display-label path, e.g. `"Edit/Copy"`.
    pub fn find_path(&self, path: &str) -> Option<ItemRef> {
        let (head, rest) = match path.split_once('/') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let found = self.all().find(|m| m.item().text() == head)?;
        match rest {
            None => Some(found),
            Some(rest) => found.submenu()?.find_path(rest),
        }
    }

    /// Display-label path from this level down to `target`.
    pub fn path_to(&self, target: &ItemRef) -> Option<Vec<String>> {
        for m in self.all() {
            if m == *target {
                return Some(vec![m.item().text()]);
            }
            if let Some(mut tail) = m.submenu().and_then(|sub| sub.path_to(target)) {
                tail.insert(0, m.item().text());
                return Some(tail);
            }
        }
        None
    }

    /// Depth-first visit of every entry, with its label path.
    pub fn walk(&self, visit: &mut dyn FnMut(&[String], &ItemRef)) {
        let mut prefix = Vec::new();
        self.walk_inner(&mut prefix, visit, 0);
    }

    fn walk_inner(&self, prefix: &mut Vec<String>, visit: &mut dyn FnMut(&[String], &ItemRef), depth: usize) {
        if depth > 64 {
            return;
        }
        for m in self.all() {
            prefix.push(m.item().text());
            visit(prefix.as_slice(), &m);
            if let Some(sub) = m.submenu() {
                sub.walk_inner(prefix, visit, depth + 1);
            }
            prefix.pop();
        }
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.table, &other.table) && self.start == other.start
    }
}

impl Eq for Level {}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level(start={}, size={})", self.start, self.size())
    }
}
