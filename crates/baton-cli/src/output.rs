//! Shared colored output utilities for CLI commands.
//!
//! Uses `termcolor` for cross-platform colored terminal output.
//! Respects `NO_COLOR` environment variable and `--color` flag.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// Styled output writer for stdout.
pub struct StyledOutput {
    stdout: StandardStream,
}

impl StyledOutput {
    /// Create a new styled output with the given color choice.
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
        }
    }

    fn writeln_styled(&mut self, text: &str, color: Option<Color>, bold: bool) {
        let mut spec = ColorSpec::new();
        spec.set_fg(color).set_bold(bold);
        let _ = self.stdout.set_color(&spec);
        let _ = writeln!(self.stdout, "{}", text);
        let _ = self.stdout.reset();
    }

    /// Bold section heading.
    pub fn heading(&mut self, text: &str) {
        self.writeln_styled(text, None, true);
    }

    /// Green bold text.
    pub fn success(&mut self, text: &str) {
        self.writeln_styled(text, Some(Color::Green), true);
    }

    /// Cyan text.
    pub fn info(&mut self, text: &str) {
        self.writeln_styled(text, Some(Color::Cyan), false);
    }

    /// One numbered trace step.
    pub fn step(&mut self, index: usize, text: &str) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(Color::White)).set_dimmed(true);
        let _ = self.stdout.set_color(&spec);
        let _ = write!(self.stdout, "{:>4}  ", index);
        let _ = self.stdout.reset();
        let _ = writeln!(self.stdout, "{}", text);
    }

    /// Aligned `label: value` line.
    pub fn field(&mut self, label: &str, value: impl std::fmt::Display) {
        let _ = writeln!(self.stdout, "  {:<14}{}", format!("{}:", label), value);
    }
}
