use std::fmt::Write;

use clap::builder::styling::{AnsiColor, Effects, Style, Styles};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Whether output goes to an ANSI-capable interactive terminal.
static IS_ANSI_TERMINAL: std::sync::LazyLock<bool> =
    std::sync::LazyLock::new(frostutils::term::is_ansi_interactive_terminal);

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Returns a `Styles` object with the default styles for the CLI.
pub fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
        .valid(AnsiColor::Green.on_default() | Effects::BOLD)
        .invalid(AnsiColor::Red.on_default() | Effects::BOLD)
}

fn apply_style(text: &str, style: &Style, enabled: bool) -> String {
    if !enabled {
        return text.to_string();
    }

    let mut styled = String::with_capacity(text.len() + 16);
    let _ = write!(styled, "{}", style);
    styled.push_str(text);
    let _ = write!(styled, "{}", style.render_reset());
    styled
}

//--------------------------------------------------------------------------------------------------
// Traits
//--------------------------------------------------------------------------------------------------

/// Applies the styles defined in [`styles`] to text printed by the binary.
///
/// Text is left plain when stdout is not an ANSI-capable terminal.
pub trait AnsiStyles {
    /// Apply header style to text
    fn header(&self) -> String;

    /// Apply literal style to text
    fn literal(&self) -> String;

    /// Apply placeholder style to text
    fn placeholder(&self) -> String;

    /// Apply error style to text
    fn error(&self) -> String;

    /// Apply valid style to text
    fn valid(&self) -> String;
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<T: AsRef<str> + ?Sized> AnsiStyles for T {
    fn header(&self) -> String {
        apply_style(self.as_ref(), styles().get_header(), *IS_ANSI_TERMINAL)
    }

    fn literal(&self) -> String {
        apply_style(self.as_ref(), styles().get_literal(), *IS_ANSI_TERMINAL)
    }

    fn placeholder(&self) -> String {
        apply_style(self.as_ref(), styles().get_placeholder(), *IS_ANSI_TERMINAL)
    }

    fn error(&self) -> String {
        apply_style(self.as_ref(), styles().get_error(), *IS_ANSI_TERMINAL)
    }

    fn valid(&self) -> String {
        apply_style(self.as_ref(), styles().get_valid(), *IS_ANSI_TERMINAL)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_style_when_enabled() {
        let styled = apply_style("sys", styles().get_header(), true);
        assert!(styled.contains("\x1b[1m"));
        assert!(styled.contains("\x1b[36m"));
        assert!(styled.contains("sys"));
        assert!(styled.ends_with("\x1b[0m"));
    }

    #[test]
    fn test_apply_style_when_disabled() {
        assert_eq!(apply_style("sys", styles().get_error(), false), "sys");
        assert_eq!(apply_style("", styles().get_valid(), false), "");
    }
}
