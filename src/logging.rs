use std::env;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use log::{LevelFilter, Log, Metadata, Record};

pub const ENV_VAR: &str = "POPMENU_LOG";

struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let _ = writeln!(
            std::io::stderr().lock(),
            "[{}] [{:<5}] {}: {}",
            timestamp(),
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:06}", now.as_secs(), now.subsec_micros())
}

/// Level from the command line, else `POPMENU_LOG`, else `warn`.
pub fn resolve_level(arg: Option<&str>) -> Result<LevelFilter> {
    let from_env = env::var(ENV_VAR).ok().filter(|v| !v.trim().is_empty());
    match arg.map(str::to_string).or(from_env) {
        Some(s) => s
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid log level '{s}' (expected off|error|warn|info|debug|trace)")),
        None => Ok(LevelFilter::Warn),
    }
}

/// Install the stderr logger. A second call only changes the level.
pub fn init(level: LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
