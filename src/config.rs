use std::{env, fs, path::Path, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::menu::{ClickThreshold, Event, MenuSpec, MenuStyle, MenuTable};

pub const ENV_VAR: &str = "POPMENU_CONFIG";

/// Work area used by the headless backend when none is configured.
pub const DEFAULT_SCREEN: Rect = Rect::new(0, 0, 1024, 768);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub style: MenuStyle,

    /// Release-after-press thresholds that still count as a click.
    #[serde(default)]
    pub click: ClickThreshold,

    /// Menu description used when the command line names none.
    #[serde(default)]
    pub menu: Option<PathBuf>,

    /// Screen work area for the headless backend.
    #[serde(default)]
    pub screen: Option<Rect>,
}

impl Config {
    pub fn screen(&self) -> Rect {
        self.screen.unwrap_or(DEFAULT_SCREEN)
    }
}

pub fn load_optional() -> Result<Option<Config>> {
    let Some(path) = resolve_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    let cfg = load_from(&path)?;
    log::debug!("loaded config from {}", path.display());
    Ok(Some(cfg))
}

pub fn load_from(path: &Path) -> Result<Config> {
    let bytes = fs::read(path).with_context(|| format!("reading config {}", path.display()))?;
    let cfg: Config =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(p) = env::var(ENV_VAR) {
        if !p.trim().is_empty() {
            return Some(PathBuf::from(p));
        }
    }

    let local = PathBuf::from("popmenu.json");
    if local.exists() {
        return Some(local);
    }

    if let Some(appdata) = env::var_os("APPDATA") {
        return Some(PathBuf::from(appdata).join("popmenu").join("config.json"));
    }

    if let Some(home) = env::var_os("HOME") {
        return Some(PathBuf::from(home).join(".config").join("popmenu").join("config.json"));
    }

    None
}

pub fn ensure_config_file_exists() -> Result<PathBuf> {
    let Some(path) = resolve_config_path() else {
        return Err(anyhow!(
            "No config path available (set {ENV_VAR} or ensure APPDATA/HOME is present)"
        ));
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create config dir {}", parent.display()))?;
    }

    if !path.exists() {
        let mut s = serde_json::to_string_pretty(&Config::default()).context("serialize config template")?;
        s.push('\n');
        fs::write(&path, s.as_bytes()).with_context(|| format!("write {}", path.display()))?;
        log::info!("wrote config template to {}", path.display());
    }

    Ok(path)
}

/// Read a JSON menu description and flatten it into a checked table.
pub fn load_menu(path: &Path) -> Result<Arc<MenuTable>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading menu {}", path.display()))?;
    let spec = MenuSpec::from_json(&text).with_context(|| format!("in {}", path.display()))?;
    spec.build()
        .with_context(|| format!("building menu from {}", path.display()))
}

/// Read a JSON array of events for the headless backend.
pub fn load_script(path: &Path) -> Result<Vec<Event>> {
    let bytes = fs::read(path).with_context(|| format!("reading script {}", path.display()))?;
    let events: Vec<Event> =
        serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::EventKind;

    fn scratch(name: &str, contents: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("popmenu-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let path = scratch(
            "config.json",
            r#"{ "click": { "max_duration_ms": 250 }, "screen": { "x": 0, "y": 0, "w": 640, "h": 480 } }"#,
        );
        let cfg = load_from(&path).unwrap();
        assert_eq!(cfg.click.max_duration_ms, 250);
        assert_eq!(cfg.click.max_distance, ClickThreshold::DEFAULT.max_distance);
        assert_eq!(cfg.style, MenuStyle::default());
        assert_eq!(cfg.screen(), Rect::new(0, 0, 640, 480));
        assert!(cfg.menu.is_none());
    }

    #[test]
    fn malformed_config_names_the_file() {
        let path = scratch("broken.json", "{ nope");
        let err = load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn menu_and_script_files_load() {
        let menu = scratch(
            "menu.json",
            r#"{ "items": [ { "label": "Cut" }, { "label": "Copy", "shortcut": "Ctrl+C" } ] }"#,
        );
        let table = load_menu(&menu).unwrap();
        assert_eq!(table.len(), 3);

        let script = scratch("script.json", r#"[ { "key": "Down" }, { "move": { "x": 1, "y": 2 } } ]"#);
        let events = load_script(&script).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1].kind, EventKind::Move(_)));
    }

    #[test]
    fn missing_menu_file_is_an_error() {
        assert!(load_menu(Path::new("/definitely/not/here.json")).is_err());
    }
}
