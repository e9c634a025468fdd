//! Module containing terminal utilities

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Determines if the process is running in an interactive terminal environment
pub fn is_interactive_terminal() -> bool {
    let stdin_is_tty = unsafe { libc::isatty(libc::STDIN_FILENO) == 1 };
    let stdout_is_tty = unsafe { libc::isatty(libc::STDOUT_FILENO) == 1 };

    stdin_is_tty && stdout_is_tty
}

/// Determines if stdout is a terminal that understands ANSI escape sequences
pub fn is_ansi_interactive_terminal() -> bool {
    let term = std::env::var("TERM").unwrap_or_default();
    if term == "dumb" || std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    if term.is_empty() {
        tracing::debug!("detected TTY without TERM environment variable");
    }

    is_interactive_terminal()
}
