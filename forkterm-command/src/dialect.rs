//! Shell escaping dialects.
//!
//! | Dialect             | Used for                         | Metacharacters |
//! |---------------------|----------------------------------|----------------|
//! | `PowerShellLiteral` | agent payloads under PowerShell  | neutralized    |
//! | `PowerShellActive`  | raw commands under PowerShell    | live           |
//! | `Posix`             | everything under sh/bash/zsh     | neutralized for agents, raw commands pass through |
//! | `AppleScript`       | string literals in `osascript`   | n/a            |
//!
//! The first three describe how a payload is written into the line the
//! terminal's shell executes. `AppleScript` is an outer encoding: the
//! Terminal.app strategy embeds a finished POSIX line inside an AppleScript
//! string literal.
//!
//! Agent arguments under PowerShell also go through [`native_argument`]
//! before they are quoted, since PowerShell rebuilds a Windows command line
//! from them.

use std::borrow::Cow;
use std::fmt;

use forkterm_core::TaskKind;

use crate::error::CommandError;

/// The shell that interprets the command line inside the new terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellFamily {
    PowerShell,
    Posix,
}

impl ShellFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            ShellFamily::PowerShell => "powershell",
            ShellFamily::Posix => "posix",
        }
    }
}

impl fmt::Display for ShellFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellDialect {
    /// Single-quoted PowerShell string: nothing inside is interpreted.
    PowerShellLiteral,
    /// Text is PowerShell source; `;`, `&&`, `|` stay operators.
    PowerShellActive,
    /// POSIX sh single-quoting.
    Posix,
    /// AppleScript double-quoted string literal.
    AppleScript,
}

/// PowerShell treats all of these as single-quote delimiters.
const POWERSHELL_SINGLE_QUOTES: [char; 5] = ['\'', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];

impl ShellDialect {
    /// Dialect used to write a `kind` payload for a shell of `family`.
    pub fn for_payload(family: ShellFamily, kind: TaskKind) -> Self {
        match (family, kind.is_agent()) {
            (ShellFamily::PowerShell, true) => ShellDialect::PowerShellLiteral,
            (ShellFamily::PowerShell, false) => ShellDialect::PowerShellActive,
            (ShellFamily::Posix, _) => ShellDialect::Posix,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShellDialect::PowerShellLiteral => "powershell-literal",
            ShellDialect::PowerShellActive => "powershell-active",
            ShellDialect::Posix => "posix",
            ShellDialect::AppleScript => "applescript",
        }
    }

    /// Whether [`ShellDialect::escape`] yields one inert literal.
    pub fn is_literal(self) -> bool {
        !matches!(self, ShellDialect::PowerShellActive)
    }

    /// Render `text` in this dialect.
    ///
    /// Literal dialects return a token the shell (or AppleScript compiler)
    /// reads back as exactly `text`. `PowerShellActive` returns `text`
    /// unchanged so operators inside it stay live.
    pub fn escape<'a>(self, text: &'a str) -> Result<Cow<'a, str>, CommandError> {
        if text.contains('\0') {
            return Err(CommandError::Unrenderable {
                dialect: self,
                reason: "text contains a NUL byte".to_string(),
            });
        }
        match self {
            ShellDialect::PowerShellActive => Ok(Cow::Borrowed(text)),
            ShellDialect::PowerShellLiteral => Ok(Cow::Owned(powershell_single_quote(text))),
            ShellDialect::Posix => shlex::try_quote(text).map_err(|err| CommandError::Unrenderable {
                dialect: self,
                reason: err.to_string(),
            }),
            ShellDialect::AppleScript => Ok(Cow::Owned(applescript_string(text))),
        }
    }
}

impl fmt::Display for ShellDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode one argument for the command line PowerShell builds when it starts
/// a native program with legacy argument passing.
///
/// PowerShell wraps an argument containing whitespace in `"` but leaves
/// embedded quotes and trailing backslashes alone, so the program's C runtime
/// would misread them. Each `"` becomes `\"` with the backslashes directly
/// before it doubled, and trailing backslashes are doubled when PowerShell
/// will add the closing quote.
pub fn native_argument(text: &str) -> Cow<'_, str> {
    let quoted = text.chars().any(char::is_whitespace);
    if !text.contains('"') && !(quoted && text.ends_with('\\')) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    let mut backslashes = 0;
    for c in text.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                out.extend(std::iter::repeat('\\').take(backslashes + 1));
                backslashes = 0;
            }
            _ => backslashes = 0,
        }
        out.push(c);
    }
    if quoted {
        out.extend(std::iter::repeat('\\').take(backslashes));
    }
    Cow::Owned(out)
}

fn powershell_single_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        if POWERSHELL_SINGLE_QUOTES.contains(&c) {
            out.push(c);
        }
        out.push(c);
    }
    out.push('\'');
    out
}

fn applescript_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
