//! Stderr logger for the `log` facade.
//!
//! Format: `[LEVEL] target: message`, level colored when the terminal allows.

use log::{Level, LevelFilter, Metadata, Record};
use std::io::Write;
use std::sync::OnceLock;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

struct StderrLogger {
    choice: ColorChoice,
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

fn level_color(level: Level) -> Color {
    match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Cyan,
        Level::Trace => Color::Magenta,
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = StandardStream::stderr(self.choice);
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(level_color(record.level()))).set_bold(true);
        let _ = stderr.set_color(&spec);
        let _ = write!(stderr, "[{}]", record.level());
        let _ = stderr.reset();
        let _ = writeln!(stderr, " {}: {}", record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Level from `-v` repetitions, overridden by `BATON_LOG` when set.
pub fn level_from(verbose: u8) -> LevelFilter {
    if let Some(level) = std::env::var("BATON_LOG")
        .ok()
        .and_then(|value| value.parse().ok())
    {
        return level;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the logger. Later calls only adjust the level.
pub fn init(max_level: LevelFilter, choice: ColorChoice) {
    let logger = LOGGER.get_or_init(|| StderrLogger { choice });
    let _ = log::set_logger(logger);
    log::set_max_level(max_level);
}
