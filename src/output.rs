//! Terminal decorations for command output: emoji markers and progress bars.
//!
//! `--color always` and `--color never` decide outright. With `auto` the
//! environment is consulted first (`NO_COLOR`, `CLICOLOR=0`,
//! `CLICOLOR_FORCE`, `TERM=dumb`), then the terminal behind stdout.

use std::env;

use console::Term;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Decorate output with emoji instead of bracketed markers.
    pub use_color: bool,
}

impl OutputConfig {
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = if color_flag.eq_ignore_ascii_case("always") {
            true
        } else if color_flag.eq_ignore_ascii_case("never") {
            false
        } else {
            color_from_env().unwrap_or_else(|| Term::stdout().features().colors_supported())
        };
        Self { use_color }
    }

    /// Progress bars go to stderr and need an interactive terminal.
    pub fn show_progress(&self) -> bool {
        self.use_color && Term::stderr().is_term()
    }
}

/// The environment's say on colors, if it has one.
fn color_from_env() -> Option<bool> {
    let var = |name: &str| env::var(name).ok();

    if env::var_os("NO_COLOR").is_some() || var("CLICOLOR").as_deref() == Some("0") {
        return Some(false);
    }
    if var("CLICOLOR_FORCE").is_some_and(|v| !v.is_empty() && v != "0") {
        return Some(true);
    }
    (var("TERM").as_deref() == Some("dumb")).then_some(false)
}

/// `decorated` for colored output, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, decorated: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        decorated
    } else {
        plain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const COLOR_VARS: [&str; 4] = ["NO_COLOR", "CLICOLOR", "CLICOLOR_FORCE", "TERM"];

    fn with_env<T>(vars: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let saved: Vec<_> = COLOR_VARS.iter().map(|n| (*n, env::var_os(n))).collect();
        for name in COLOR_VARS {
            env::remove_var(name);
        }
        for (name, value) in vars {
            env::set_var(name, value);
        }
        let result = f();
        for (name, value) in saved {
            match value {
                Some(value) => env::set_var(name, value),
                None => env::remove_var(name),
            }
        }
        result
    }

    #[test]
    #[serial]
    fn test_flag_overrides_environment() {
        with_env(&[("NO_COLOR", "1")], || {
            assert!(OutputConfig::from_env_and_flag("Always").use_color);
        });
        with_env(&[("CLICOLOR_FORCE", "1")], || {
            assert!(!OutputConfig::from_env_and_flag("never").use_color);
        });
    }

    #[test]
    #[serial]
    fn test_environment_decides_in_auto_mode() {
        assert_eq!(with_env(&[("NO_COLOR", "")], color_from_env), Some(false));
        assert_eq!(with_env(&[("CLICOLOR", "0")], color_from_env), Some(false));
        assert_eq!(
            with_env(&[("CLICOLOR_FORCE", "1"), ("TERM", "dumb")], color_from_env),
            Some(true)
        );
        assert_eq!(with_env(&[("TERM", "dumb")], color_from_env), Some(false));
        assert_eq!(with_env(&[("CLICOLOR_FORCE", "0")], color_from_env), None);
        assert!(!with_env(&[("NO_COLOR", "1")], || {
            OutputConfig::from_env_and_flag("auto").use_color
        }));
    }

    #[test]
    fn test_emoji_falls_back_to_marker() {
        let colored = OutputConfig { use_color: true };
        let plain = OutputConfig { use_color: false };
        assert_eq!(emoji(&colored, "🚚", "[SEND]"), "🚚");
        assert_eq!(emoji(&plain, "🚚", "[SEND]"), "[SEND]");
        assert!(!plain.show_progress());
    }
}
