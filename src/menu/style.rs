use serde::{Deserialize, Serialize};

/// `0xRRGGBB`.
pub type Color = u32;

/// Colors, box insets and font size the menu windows read while laying
/// themselves out and painting. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuStyle {
    pub font_size: u16,
    /// Extra vertical space added to every row.
    pub line_spacing: i32,
    /// Inset of the window's box on each side.
    pub border: i32,
    /// Left margin of the first entry in a menu bar.
    pub bar_margin: i32,
    /// Gap added after every menu-bar entry.
    pub bar_spacing: i32,
    pub background: Color,
    pub selection: Color,
    pub text: Color,
    pub selected_text: Color,
    pub inactive_text: Color,
    pub divider_dark: Color,
    pub divider_light: Color,
}

impl Default for MenuStyle {
    fn default() -> Self {
        Self {
            font_size: 14,
            line_spacing: 4,
            border: 2,
            bar_margin: 3,
            bar_spacing: 16,
            background: 0xC0C0C0,
            selection: 0x000080,
            text: 0x000000,
            selected_text: 0xFFFFFF,
            inactive_text: 0x808080,
            divider_dark: 0x808080,
            divider_light: 0xFFFFFF,
        }
    }
}
