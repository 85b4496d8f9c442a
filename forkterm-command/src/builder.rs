//! [`CommandBuilder`]: turns a task into the line a terminal's shell runs.
//!
//! | Kind     | Line (POSIX shown)                                        |
//! |----------|-----------------------------------------------------------|
//! | `claude` | `claude --model <id> [--dangerously-skip-permissions] <prompt>` |
//! | `gemini` | `gemini [--model <tier>] [--yolo] <prompt>`               |
//! | `raw`    | the payload, verbatim                                     |
//!
//! Program names and flags are emitted bare. Only values (model, prompt) go
//! through [`ShellDialect::escape`]; under PowerShell they are first encoded
//! with [`native_argument`]. A prompt starting with `-` follows `--`.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::PathBuf;

use forkterm_core::{ForkConfig, TaskKind};

use crate::dialect::{native_argument, ShellDialect, ShellFamily};
use crate::error::CommandError;

/// Separator between handed-off context and the task itself.
const CONTEXT_SEPARATOR: &str = "\n\n---\n\nTask: ";

/// Characters of the payload kept in a default window title.
pub const TITLE_PAYLOAD_CHARS: usize = 40;

// ---------------------------------------------------------------------------
// Input / output
// ---------------------------------------------------------------------------

/// What to run, before any shell is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub kind: TaskKind,
    pub payload: String,
    /// Tier label; mapped to a model id for Claude, passed as-is to Gemini.
    pub tier: Option<String>,
    /// File whose contents are prepended to an agent prompt.
    pub context_file: Option<PathBuf>,
    pub skip_permissions: bool,
}

impl CommandSpec {
    pub fn new(kind: TaskKind, payload: impl Into<String>) -> Self {
        Self {
            kind,
            payload: payload.into(),
            tier: None,
            context_file: None,
            skip_permissions: false,
        }
    }

    /// Like [`CommandSpec::new`] but with the kind given by name.
    pub fn named(kind: &str, payload: impl Into<String>) -> Result<Self, CommandError> {
        Ok(Self::new(kind.parse()?, payload))
    }

    pub fn with_tier(mut self, tier: Option<String>) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_context_file(mut self, path: Option<PathBuf>) -> Self {
        self.context_file = path;
        self
    }

    pub fn with_skip_permissions(mut self, skip: bool) -> Self {
        self.skip_permissions = skip;
        self
    }
}

/// A command line ready to hand to a launch strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCommand {
    /// The exact text the terminal's shell executes.
    pub line: String,
    /// Dialect the payload was written in.
    pub dialect: ShellDialect,
    /// Arguments the agent program receives, unescaped. `None` for raw
    /// commands, whose argv is whatever the shell makes of the line.
    pub argv: Option<Vec<String>>,
}

impl RenderedCommand {
    pub fn family(&self) -> ShellFamily {
        match self.dialect {
            ShellDialect::PowerShellLiteral | ShellDialect::PowerShellActive => {
                ShellFamily::PowerShell
            }
            ShellDialect::Posix | ShellDialect::AppleScript => ShellFamily::Posix,
        }
    }
}

// ---------------------------------------------------------------------------
// CommandBuilder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CommandBuilder {
    tiers: BTreeMap<String, String>,
    default_tier: Option<String>,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::from_config(&ForkConfig::default())
    }
}

impl CommandBuilder {
    pub fn from_config(config: &ForkConfig) -> Self {
        let default_tier = Some(config.default_tier.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_owned);
        Self {
            tiers: config.tiers.clone(),
            default_tier,
        }
    }

    /// Value passed to `--model`, if any.
    ///
    /// Claude falls back to the default tier and maps known tiers to model
    /// ids; unknown labels are passed through so new model ids work without a
    /// config change. Gemini only gets `--model` when a tier was given.
    pub fn model_arg(&self, kind: TaskKind, tier: Option<&str>) -> Option<String> {
        let tier = tier.map(str::trim).filter(|t| !t.is_empty());
        match kind {
            TaskKind::Claude => {
                let tier = tier.or(self.default_tier.as_deref())?;
                Some(self.tiers.get(tier).cloned().unwrap_or_else(|| tier.to_owned()))
            }
            TaskKind::Gemini => tier.map(str::to_owned),
            TaskKind::Raw => None,
        }
    }

    /// The text the agent (or shell) finally receives: the payload, with any
    /// context file prepended for agent kinds.
    pub fn prompt(&self, spec: &CommandSpec) -> Result<String, CommandError> {
        if spec.payload.trim().is_empty() {
            return Err(CommandError::EmptyPayload { kind: spec.kind });
        }
        let Some(path) = spec.context_file.as_ref() else {
            return Ok(spec.payload.clone());
        };
        if !spec.kind.is_agent() {
            tracing::warn!(path = %path.display(), "context file ignored for raw command");
            return Ok(spec.payload.clone());
        }
        let context = std::fs::read_to_string(path).map_err(|source| {
            CommandError::ContextUnreadable {
                path: path.clone(),
                source,
            }
        })?;
        Ok(format!("{}{CONTEXT_SEPARATOR}{}", context.trim_end(), spec.payload))
    }

    /// Render `spec` for a shell of `family`.
    pub fn render(
        &self,
        spec: &CommandSpec,
        family: ShellFamily,
    ) -> Result<RenderedCommand, CommandError> {
        let prompt = self.prompt(spec)?;
        let dialect = ShellDialect::for_payload(family, spec.kind);

        let Some(program) = spec.kind.program() else {
            if spec.tier.is_some() || spec.skip_permissions {
                tracing::warn!("tier and permission options ignored for raw command");
            }
            // Raw payloads are shell source under every dialect.
            if prompt.contains('\0') {
                return Err(CommandError::Unrenderable {
                    dialect,
                    reason: "text contains a NUL byte".to_string(),
                });
            }
            return Ok(RenderedCommand {
                line: prompt,
                dialect,
                argv: None,
            });
        };

        let mut line = LineWriter::new(dialect);
        line.word(program);
        if let Some(model) = self.model_arg(spec.kind, spec.tier.as_deref()) {
            line.word("--model");
            line.value(model)?;
        }
        if spec.skip_permissions {
            line.word(bypass_flag(spec.kind));
        }
        // End of options, so the agent never parses the prompt as a flag.
        if prompt.starts_with('-') {
            line.value("--".to_string())?;
        }
        line.value(prompt)?;
        tracing::debug!(kind = %spec.kind, %dialect, "rendered agent command");
        Ok(line.finish())
    }
}

/// Builds the escaped line and the logical argv side by side.
struct LineWriter {
    dialect: ShellDialect,
    parts: Vec<String>,
    argv: Vec<String>,
}

impl LineWriter {
    fn new(dialect: ShellDialect) -> Self {
        Self {
            dialect,
            parts: Vec::new(),
            argv: Vec::new(),
        }
    }

    /// A fixed program name or flag, emitted bare.
    fn word(&mut self, word: &str) {
        self.parts.push(word.to_owned());
        self.argv.push(word.to_owned());
    }

    fn value(&mut self, value: String) -> Result<(), CommandError> {
        let native = match self.dialect {
            ShellDialect::PowerShellLiteral => native_argument(&value),
            _ => Cow::Borrowed(value.as_str()),
        };
        self.parts.push(self.dialect.escape(&native)?.into_owned());
        self.argv.push(value);
        Ok(())
    }

    fn finish(self) -> RenderedCommand {
        RenderedCommand {
            line: self.parts.join(" "),
            dialect: self.dialect,
            argv: Some(self.argv),
        }
    }
}

fn bypass_flag(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Gemini => "--yolo",
        _ => "--dangerously-skip-permissions",
    }
}

/// Default window title: `Claude: <first 40 chars>...`.
///
/// Whitespace runs (including newlines) collapse to one space; the ellipsis
/// is only added when the payload was cut.
pub fn default_title(kind: TaskKind, payload: &str) -> String {
    let flat = payload.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut head: String = flat.chars().take(TITLE_PAYLOAD_CHARS).collect();
    if flat.chars().count() > TITLE_PAYLOAD_CHARS {
        head.push_str("...");
    }
    format!("{}: {head}", kind.title_prefix())
}
