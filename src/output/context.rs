use crate::cli::Cli;
use crate::error::SnapError;
use crossterm::style::{StyledContent, Stylize};
use serde_json::Value;
use std::io::IsTerminal;

/// How results are presented on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Coloured banners
    Rich,
    /// Plain text, no ANSI codes (for piping)
    Plain,
    /// JSON report only
    Json,
    /// Failures only
    Quiet,
}

/// Banner kinds printed in front of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    Runs,
    Pass,
    Fail,
}

impl Banner {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Runs => " RUNS ",
            Self::Pass => " PASS ",
            Self::Fail => " FAIL ",
        }
    }

    fn styled(self) -> StyledContent<&'static str> {
        let label = self.label().white().bold();
        match self {
            Self::Runs => label.on_blue(),
            Self::Pass => label.on_green(),
            Self::Fail => label.on_red(),
        }
    }
}

/// Central output coordinator that respects json/quiet/colour modes.
#[derive(Debug, Clone, Copy)]
pub struct OutputContext {
    mode: OutputMode,
}

impl OutputContext {
    /// Create from CLI global args.
    #[must_use]
    pub fn from_args(args: &Cli) -> Self {
        Self::from_flags(args.json, args.quiet, args.no_color)
    }

    /// Create from CLI-style flags.
    #[must_use]
    pub fn from_flags(json: bool, quiet: bool, no_color: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else if no_color
            || std::env::var_os("NO_COLOR").is_some()
            || !std::io::stdout().is_terminal()
        {
            OutputMode::Plain
        } else {
            OutputMode::Rich
        };
        Self { mode }
    }

    #[must_use]
    pub const fn with_mode(mode: OutputMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub const fn mode(&self) -> OutputMode {
        self.mode
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Banner line as it would be printed in this mode.
    #[must_use]
    pub fn banner_line(&self, banner: Banner, message: &str) -> String {
        if self.mode == OutputMode::Rich {
            format!("{} {message}", banner.styled())
        } else {
            format!("{} {message}", banner.label())
        }
    }

    /// Print a banner; quiet mode keeps only failures.
    pub fn banner(&self, banner: Banner, message: &str) {
        match (self.mode, banner) {
            (OutputMode::Json, _) => {}
            (OutputMode::Quiet, Banner::Runs | Banner::Pass) => {}
            _ => println!("{}", self.banner_line(banner, message)),
        }
    }

    /// Print free text below a banner (diffs, hints).
    pub fn detail(&self, text: &str) {
        if !self.is_json() {
            println!("{}", text.trim_end_matches('\n'));
        }
    }

    /// Print the JSON report.
    pub fn json_pretty(&self, value: &Value) {
        if self.is_json() {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            );
        }
    }

    /// Human-readable form of a run-level error.
    #[must_use]
    pub fn error_text(&self, err: &SnapError) -> String {
        let color = self.mode == OutputMode::Rich;
        let mut output = if color {
            format!("{} {}", "Error:".red(), err)
        } else {
            format!("Error: {err}")
        };
        if let Some(hint) = err.suggestion() {
            output.push('\n');
            if color {
                output.push_str(&format!("{} {hint}", "Hint:".yellow()));
            } else {
                output.push_str("Hint: ");
                output.push_str(hint);
            }
        }
        output
    }
}
