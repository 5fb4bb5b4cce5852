use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::item::{CommandId, ItemFlags, MenuItem, MenuTable};
use super::shortcut::Shortcut;

const MAX_DEPTH: usize = 64;

/// Nested, human-writable menu description.
///
/// ```json
/// { "items": [
///     { "label": "&File", "items": [
///         { "label": "&Open", "shortcut": "Ctrl+O", "command": 1 },
///         "separator",
///         { "label": "Recent", "detached": true, "items": [ { "label": "a.txt" } ] }
///     ] },
///     { "label": "Wrap", "flags": "TOGGLE | VALUE" }
/// ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MenuSpec {
    pub items: Vec<MenuSpecItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MenuSpecItem {
    /// Draws a divider below the preceding entry.
    Separator(SeparatorTag),
    Entry(EntrySpec),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeparatorTag {
    Separator,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntrySpec {
    pub label: String,
    #[serde(default)]
    pub shortcut: Option<Shortcut>,
    /// Extra flag bits, e.g. `"INACTIVE | DIVIDER"`. Submenu bits are derived
    /// from `items` and `detached`.
    #[serde(default)]
    pub flags: ItemFlags,
    #[serde(default)]
    pub command: Option<u32>,
    #[serde(default)]
    pub user_data: u64,
    #[serde(default)]
    pub items: Option<Vec<MenuSpecItem>>,
    /// Store the submenu as a separate table instead of inline.
    #[serde(default)]
    pub detached: bool,
}

impl MenuSpec {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing menu description")
    }

    /// Flatten into a checked table.
    pub fn build(&self) -> Result<Arc<MenuTable>> {
        build_table(&self.items, 0)
    }
}

fn build_table(items: &[MenuSpecItem], depth: usize) -> Result<Arc<MenuTable>> {
    let mut out = Vec::new();
    flatten(items, &mut out, depth)?;
    let table = MenuTable::new(out);
    table.check()?;
    Ok(table)
}

fn flatten(items: &[MenuSpecItem], out: &mut Vec<MenuItem>, depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        bail!("menu nests deeper than {MAX_DEPTH} levels");
    }
    let mut last: Option<usize> = None;
    for spec in items {
        let entry = match spec {
            MenuSpecItem::Separator(_) => {
                match last {
                    Some(i) => out[i].flags |= ItemFlags::DIVIDER,
                    None => log::warn!("separator before the first entry of a level is ignored"),
                }
                continue;
            }
            MenuSpecItem::Entry(entry) => entry,
        };

        let mut item = MenuItem::new(entry.label.as_str())
            .with_flags(entry.flags - (ItemFlags::SUBMENU | ItemFlags::SUBMENU_POINTER));
        item.shortcut = entry.shortcut;
        item.callback = entry.command.map(CommandId);
        item.user_data = entry.user_data;
        last = Some(out.len());

        match &entry.items {
            None => out.push(item),
            Some(children) if entry.detached => {
                let table = build_table(children, depth + 1)
                    .with_context(|| format!("in submenu '{}'", entry.label))?;
                item.flags |= ItemFlags::SUBMENU_POINTER;
                item.submenu = Some(table);
                out.push(item);
            }
            Some(children) => {
                item.flags |= ItemFlags::SUBMENU;
                out.push(item);
                flatten(children, out, depth + 1)
                    .with_context(|| format!("in submenu '{}'", entry.label))?;
                out.push(MenuItem::terminator());
            }
        }
    }
    Ok(())
}
