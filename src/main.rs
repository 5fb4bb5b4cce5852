use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use popmenu::config::{self, Config};
use popmenu::geometry::{Point, Rect};
use popmenu::logging;
use popmenu::menu::{pulldown, Level, PulldownRequest};
use popmenu::platform::headless::HeadlessBackend;

#[derive(Parser, Debug)]
#[command(name = "popmenu", version, about = "Cascading popup-menu engine driven by scripted input")]
struct Cli {
    /// off, error, warn, info, debug or trace. Defaults to $POPMENU_LOG, then warn.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Runs one pulldown against a scripted event list and prints the picked item path.
    Run {
        /// Menu description (JSON).
        menu: PathBuf,
        /// Event script (JSON array).
        script: PathBuf,
        #[arg(long, default_value_t = 0)]
        x: i32,
        #[arg(long, default_value_t = 0)]
        y: i32,
        #[arg(long, default_value_t = 0)]
        width: i32,
        #[arg(long, default_value_t = 0)]
        height: i32,
        /// Treat the top level as a horizontal menu bar occupying the anchor.
        #[arg(long)]
        menubar: bool,
        /// Reopen on this item, e.g. "Edit/Copy".
        #[arg(long)]
        initial: Option<String>,
        /// Initial pointer position as "X,Y" (defaults to the anchor's top-left corner).
        #[arg(long)]
        pointer: Option<String>,
    },
    /// Prints the table size and the number of visible top-level entries.
    Size {
        /// Menu description; falls back to the configured menu.
        menu: Option<PathBuf>,
    },
    /// Lists every shortcut with the path of its item.
    Shortcuts {
        menu: Option<PathBuf>,
    },
    /// Validates the nesting and termination of the flattened table.
    Check {
        menu: Option<PathBuf>,
    },
    /// Prints the config path that would be used (if any).
    ConfigPath,
    /// Writes a config template at the config path unless one exists.
    ConfigInit,
}

fn menu_path(arg: Option<PathBuf>, cfg: &Config) -> Result<PathBuf> {
    arg.or_else(|| cfg.menu.clone())
        .ok_or_else(|| anyhow!("no menu file given and none configured"))
}

fn parse_point(s: &str) -> Result<Point> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| anyhow!("expected X,Y but got '{s}'"))?;
    let x = x.trim().parse().with_context(|| format!("bad x in '{s}'"))?;
    let y = y.trim().parse().with_context(|| format!("bad y in '{s}'"))?;
    Ok(Point::new(x, y))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(logging::resolve_level(cli.log_level.as_deref())?);
    let cfg = config::load_optional()?.unwrap_or_default();

    match cli.command {
        Command::Run {
            menu,
            script,
            x,
            y,
            width,
            height,
            menubar,
            initial,
            pointer,
        } => {
            let table = config::load_menu(&menu)?;
            let events = config::load_script(&script)?;
            let level = Level::root(table);
            let initial = initial
                .map(|p| {
                    level
                        .find_path(&p)
                        .ok_or_else(|| anyhow!("no item at path '{p}'"))
                })
                .transpose()?;

            let anchor = Rect::new(x, y, width, height);
            let mut backend = HeadlessBackend::new(cfg.screen());
            let start = match pointer.as_deref() {
                Some(s) => parse_point(s)?,
                None => anchor.origin(),
            };
            backend.set_pointer(start);
            backend.queue(events);

            let req = PulldownRequest::new(level.clone(), anchor)
                .menubar(menubar)
                .initial(initial)
                .click(&cfg.click);
            match pulldown(&mut backend, &cfg.style, req) {
                Some(item) => {
                    let path = level
                        .path_to(&item)
                        .map(|p| p.join("/"))
                        .unwrap_or_else(|| item.item().text());
                    println!("{path}");
                }
                None => println!("none"),
            }
        }
        Command::Size { menu } => {
            let table = config::load_menu(&menu_path(menu, &cfg)?)?;
            let level = Level::root(table);
            println!("size {}", level.size());
            println!("visible {}", level.count());
        }
        Command::Shortcuts { menu } => {
            let table = config::load_menu(&menu_path(menu, &cfg)?)?;
            Level::root(table).walk(&mut |path, m| {
                if let Some(shortcut) = m.item().shortcut {
                    println!("{shortcut}\t{}", path.join("/"));
                }
            });
        }
        Command::Check { menu } => {
            let path = menu_path(menu, &cfg)?;
            let table = config::load_menu(&path)?;
            println!("{}: ok ({} entries)", path.display(), table.len());
        }
        Command::ConfigPath => {
            if let Some(path) = config::resolve_config_path() {
                println!("{}", path.display());
            }
        }
        Command::ConfigInit => {
            let path = config::ensure_config_file_exists()?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
