//! # Output Configuration
//!
//! Human-facing summary lines printed by the CLI, as opposed to the log
//! stream on stderr. Colours and emoji are used only when the terminal and
//! the user allow it.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

use console::style;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `color_flag` is the value of `--color`: `always` forces colours on
    /// (overriding `NO_COLOR`), `never` forces them off and anything else
    /// detects support from the environment.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        // presence alone disables, even when empty
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    /// A line reporting success.
    pub fn success(&self, message: &str) -> String {
        if self.use_color {
            format!("{} {}", emoji(self, "✅", "[OK]"), style(message).green())
        } else {
            format!("[OK] {}", message)
        }
    }

    /// A line reporting something the user should look at.
    pub fn warning(&self, message: &str) -> String {
        if self.use_color {
            format!("{} {}", emoji(self, "⚠️ ", "[WARN]"), style(message).yellow())
        } else {
            format!("[WARN] {}", message)
        }
    }

    /// A line reporting a failure.
    pub fn failure(&self, message: &str) -> String {
        if self.use_color {
            format!("{} {}", emoji(self, "❌", "[FAIL]"), style(message).red())
        } else {
            format!("[FAIL] {}", message)
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns `emoji_str` when colors are enabled, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}
