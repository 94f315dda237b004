//! General helper utilities.

/// ANSI colour codes for terminal output.
pub mod colors {
    pub const BLUE: &str = "\x1b[94m";
    pub const WARNING: &str = "\x1b[93m";
    pub const FAIL: &str = "\x1b[91m";
    pub const ENDC: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const GREEN: &str = "\x1b[32m";
    pub const GRAY: &str = "\x1b[38;5;8m";

    /// Wrap `text` in ANSI colour escape codes (no-op when `add_color` is false).
    pub fn colorize(text: &str, color: &str, add_color: bool) -> String {
        if add_color && !text.is_empty() {
            format!("{color}{text}{ENDC}")
        } else {
            text.to_string()
        }
    }
}

/// Drop every NUL byte (padding in ABI-encoded strings).
pub fn strip_nul(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().copied().filter(|b| *b != 0).collect()
}

/// TAC variable as printed in dumps: `0x` dropped, `v` prepended.
pub fn short_var(var: &str) -> String {
    format!("v{}", var.replace("0x", ""))
}
