//! Desktop-shell configuration store.
//!
//! The shell persists its extension state as two string-array keys in
//! gsettings. Read-modify-write across this store is NOT atomic across
//! process boundaries — the shell itself may write between our read and our
//! write — so the executor reads immediately before reconciling and writes
//! the result back promptly.
//!
//! The store speaks GVariant text format for `as` values
//! (`['a', 'b']`, or `@as []` for the empty array); the codec for that
//! lives here as pure, separately tested functions.

use super::run_with_timeout;
use std::collections::BTreeSet;
use std::process::Command;
use std::time::Duration;

/// Schema holding the shell's extension state.
pub const SHELL_SCHEMA: &str = "org.gnome.shell";
/// Key listing enabled extension UUIDs.
pub const ENABLED_KEY: &str = "enabled-extensions";
/// Key listing disabled extension UUIDs.
pub const DISABLED_KEY: &str = "disabled-extensions";

/// Narrow contract over the shell's configuration store.
pub trait ShellConfigStore {
    /// Read a string-array key as a set.
    fn get_array(&self, key: &str) -> Result<BTreeSet<String>, String>;

    /// Replace a string-array key with the given set.
    fn set_array(&self, key: &str, values: &BTreeSet<String>) -> Result<(), String>;
}

/// gsettings-backed store for the GNOME shell schema.
pub struct GsettingsStore {
    timeout: Duration,
}

impl GsettingsStore {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ShellConfigStore for GsettingsStore {
    fn get_array(&self, key: &str) -> Result<BTreeSet<String>, String> {
        let mut cmd = Command::new("gsettings");
        cmd.args(["get", SHELL_SCHEMA, key]);
        let raw = run_with_timeout(&mut cmd, self.timeout)?;
        parse_string_array(&raw)
    }

    fn set_array(&self, key: &str, values: &BTreeSet<String>) -> Result<(), String> {
        let rendered = format_string_array(values);
        log::info!("Writing {} {} = {}", SHELL_SCHEMA, key, rendered);
        let mut cmd = Command::new("gsettings");
        cmd.args(["set", SHELL_SCHEMA, key, &rendered]);
        run_with_timeout(&mut cmd, self.timeout).map(|_| ())
    }
}

// ============================================================================
// GVariant `as` codec
// ============================================================================

/// Parse a GVariant string-array literal into a set.
///
/// Accepts `['a', 'b']`, `[]` and the typed empty form `@as []`. Entries
/// may be single- or double-quoted; quotes, backslashes and the `\n`/`\t`/
/// `\r` control escapes are decoded, any other escape is rejected.
pub fn parse_string_array(input: &str) -> Result<BTreeSet<String>, String> {
    let mut text = input.trim();
    if let Some(rest) = text.strip_prefix("@as") {
        text = rest.trim_start();
    }
    let inner = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .ok_or_else(|| format!("not a string array: {:?}", input))?;

    let mut values = BTreeSet::new();
    let mut chars = inner.chars().peekable();

    loop {
        // Skip separators and whitespace up to the next quoted entry
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        let Some(&quote) = chars.peek() else { break };
        if quote != '\'' && quote != '"' {
            return Err(format!("unexpected character {:?} in array: {:?}", quote, input));
        }
        chars.next();

        let mut value = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    let Some(escaped) = chars.next() else {
                        return Err(format!("dangling escape in array: {:?}", input));
                    };
                    let decoded = match escaped {
                        '\\' | '\'' | '"' => escaped,
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => {
                            return Err(format!(
                                "unsupported escape \\{} in array: {:?}",
                                other, input
                            ));
                        }
                    };
                    value.push(decoded);
                }
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => value.push(c),
            }
        }
        if !closed {
            return Err(format!("unterminated string in array: {:?}", input));
        }
        values.insert(value);
    }

    Ok(values)
}

/// Render a set as a GVariant string-array literal.
///
/// The empty set renders as the typed form `@as []` so gsettings keeps the
/// key's array type.
pub fn format_string_array(values: &BTreeSet<String>) -> String {
    if values.is_empty() {
        return "@as []".to_string();
    }
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("'{}'", v.replace('\\', "\\\\").replace('\'', "\\'")))
        .collect();
    format!("[{}]", quoted.join(", "))
}

// ============================================================================
// Tests
// ============================================================================
