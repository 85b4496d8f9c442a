//! One [`LaunchStrategy`] per terminal, and the per-platform candidate order.
//!
//! | Platform | Order                                                        |
//! |----------|--------------------------------------------------------------|
//! | Windows  | `windows-terminal`, `powershell`                             |
//! | macOS    | `terminal-app`                                               |
//! | Linux    | `gnome-terminal`, `konsole`, `xfce4-terminal`, `xterm`       |

use std::path::PathBuf;

use forkterm_command::{CommandError, ShellDialect, ShellFamily};

use crate::probe::ExecutableProbe;
use crate::strategy::{clip_title, path_arg, Candidate, Invocation, LaunchStrategy, Session};
use crate::OsFamily;

/// Appended to a POSIX line to leave an interactive shell behind.
pub const POSIX_KEEP_OPEN: &str = r#"exec "${SHELL:-bash}""#;

/// First line of every PowerShell command. Pins native-argument quoting to
/// the Windows PowerShell 5.1 rules on every version, which is the encoding
/// the command builder writes agent arguments in.
pub const POWERSHELL_PREAMBLE: &str = "$PSNativeCommandArgumentPassing = 'Legacy'";

pub const WINDOWS: &[Candidate] = &[
    Candidate::new("windows-terminal", WindowsTerminal::detect),
    Candidate::new("powershell", PowerShellConsole::detect),
];

pub const MACOS: &[Candidate] = &[Candidate::new("terminal-app", TerminalApp::detect)];

pub const LINUX: &[Candidate] = &[
    Candidate::new("gnome-terminal", GnomeTerminal::detect),
    Candidate::new("konsole", Konsole::detect),
    Candidate::new("xfce4-terminal", Xfce4Terminal::detect),
    Candidate::new("xterm", Xterm::detect),
];

/// Candidates for `os`, most preferred first.
pub fn candidates_for(os: &OsFamily) -> &'static [Candidate] {
    match os {
        OsFamily::Windows => WINDOWS,
        OsFamily::MacOs => MACOS,
        OsFamily::Linux => LINUX,
        OsFamily::Unsupported(_) => &[],
    }
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// `pwsh` when installed, otherwise Windows PowerShell.
fn find_powershell(probe: &dyn ExecutableProbe) -> Option<PathBuf> {
    probe.find("pwsh").or_else(|| probe.find("powershell"))
}

fn powershell_args(keep_open: bool, command: String) -> Vec<String> {
    let mut args = vec!["-NoLogo".to_string()];
    if keep_open {
        args.push("-NoExit".to_string());
    }
    args.push("-Command".to_string());
    args.push(command);
    args
}

#[derive(Debug, Clone)]
pub struct WindowsTerminal {
    wt: PathBuf,
    shell: PathBuf,
}

impl WindowsTerminal {
    fn detect(probe: &dyn ExecutableProbe) -> Option<Box<dyn LaunchStrategy>> {
        let wt = probe.find("wt").or_else(|| {
            // App-execution alias; not always on PATH.
            let local = std::env::var_os("LOCALAPPDATA")?;
            let alias = PathBuf::from(local)
                .join("Microsoft")
                .join("WindowsApps")
                .join("wt.exe");
            probe.find(&alias.to_string_lossy())
        })?;
        let shell = find_powershell(probe)?;
        Some(Box::new(Self { wt, shell }))
    }
}

impl LaunchStrategy for WindowsTerminal {
    fn name(&self) -> &'static str {
        "windows-terminal"
    }

    fn family(&self) -> ShellFamily {
        ShellFamily::PowerShell
    }

    fn invocation(&self, session: &Session) -> Result<Invocation, CommandError> {
        let mut inv = Invocation::new(&self.wt);
        if session.new_window {
            inv = inv.args(["-w", "-1"]);
        }
        // wt splits its own command line on `;`.
        let command = format!("{POWERSHELL_PREAMBLE}\n{}", session.line).replace(';', "\\;");
        Ok(inv
            .args(["new-tab", "-d"])
            .arg(path_arg(&session.cwd))
            .arg("--title")
            .arg(clip_title(&session.title))
            .arg(path_arg(&self.shell))
            .args(powershell_args(session.keep_open, command)))
    }
}

/// The inner shell started directly in its own console window.
#[derive(Debug, Clone)]
pub struct PowerShellConsole {
    shell: PathBuf,
}

impl PowerShellConsole {
    fn detect(probe: &dyn ExecutableProbe) -> Option<Box<dyn LaunchStrategy>> {
        Some(Box::new(Self {
            shell: find_powershell(probe)?,
        }))
    }
}

impl LaunchStrategy for PowerShellConsole {
    fn name(&self) -> &'static str {
        "powershell"
    }

    fn family(&self) -> ShellFamily {
        ShellFamily::PowerShell
    }

    fn invocation(&self, session: &Session) -> Result<Invocation, CommandError> {
        let clipped = clip_title(&session.title);
        let title = ShellDialect::PowerShellLiteral.escape(&clipped)?;
        let command = format!(
            "{POWERSHELL_PREAMBLE}\n$Host.UI.RawUI.WindowTitle = {title}\n{}",
            session.line
        );
        Ok(Invocation::new(&self.shell)
            .args(powershell_args(session.keep_open, command))
            .current_dir(&session.cwd)
            .in_new_console())
    }
}

// ---------------------------------------------------------------------------
// macOS
// ---------------------------------------------------------------------------

/// Terminal.app driven through `osascript`.
#[derive(Debug, Clone)]
pub struct TerminalApp {
    osascript: PathBuf,
}

impl TerminalApp {
    fn detect(probe: &dyn ExecutableProbe) -> Option<Box<dyn LaunchStrategy>> {
        Some(Box::new(Self {
            osascript: probe.find("osascript")?,
        }))
    }

    /// The line typed into the new window.
    fn shell_line(session: &Session) -> Result<String, CommandError> {
        let dir = path_arg(&session.cwd);
        let cwd = ShellDialect::Posix.escape(&dir)?;
        let mut line = format!("cd {cwd} && {{ {}\n}}", session.line);
        if !session.keep_open {
            line.push_str("\nexit");
        }
        Ok(line)
    }
}

impl LaunchStrategy for TerminalApp {
    fn name(&self) -> &'static str {
        "terminal-app"
    }

    fn family(&self) -> ShellFamily {
        ShellFamily::Posix
    }

    fn invocation(&self, session: &Session) -> Result<Invocation, CommandError> {
        let line = Self::shell_line(session)?;
        let script = ShellDialect::AppleScript.escape(&line)?;
        let clipped = clip_title(&session.title);
        let title = ShellDialect::AppleScript.escape(&clipped)?;
        Ok(Invocation::new(&self.osascript).args([
            "-e".to_string(),
            "tell application \"Terminal\"".to_string(),
            "-e".to_string(),
            "activate".to_string(),
            "-e".to_string(),
            format!("set t to do script {script}"),
            "-e".to_string(),
            format!("set custom title of t to {title}"),
            "-e".to_string(),
            "end tell".to_string(),
        ]))
    }
}

// ---------------------------------------------------------------------------
// Linux
// ---------------------------------------------------------------------------

/// `bash -c` script for an emulator.
fn bash_script(session: &Session) -> String {
    if session.keep_open {
        format!("{}\n{POSIX_KEEP_OPEN}", session.line)
    } else {
        session.line.clone()
    }
}

fn bash_c(bash: &std::path::Path, session: &Session) -> [String; 3] {
    [path_arg(bash), "-c".to_string(), bash_script(session)]
}

#[derive(Debug, Clone)]
pub struct GnomeTerminal {
    program: PathBuf,
    bash: PathBuf,
}

impl GnomeTerminal {
    fn detect(probe: &dyn ExecutableProbe) -> Option<Box<dyn LaunchStrategy>> {
        Some(Box::new(Self {
            program: probe.find("gnome-terminal")?,
            bash: probe.find("bash")?,
        }))
    }
}

impl LaunchStrategy for GnomeTerminal {
    fn name(&self) -> &'static str {
        "gnome-terminal"
    }

    fn family(&self) -> ShellFamily {
        ShellFamily::Posix
    }

    fn invocation(&self, session: &Session) -> Result<Invocation, CommandError> {
        Ok(Invocation::new(&self.program)
            .arg("--working-directory")
            .arg(path_arg(&session.cwd))
            .arg("--title")
            .arg(clip_title(&session.title))
            .arg("--")
            .args(bash_c(&self.bash, session))
            .current_dir(&session.cwd))
    }
}

#[derive(Debug, Clone)]
pub struct Konsole {
    program: PathBuf,
    bash: PathBuf,
}

impl Konsole {
    fn detect(probe: &dyn ExecutableProbe) -> Option<Box<dyn LaunchStrategy>> {
        Some(Box::new(Self {
            program: probe.find("konsole")?,
            bash: probe.find("bash")?,
        }))
    }
}

impl LaunchStrategy for Konsole {
    fn name(&self) -> &'static str {
        "konsole"
    }

    fn family(&self) -> ShellFamily {
        ShellFamily::Posix
    }

    fn invocation(&self, session: &Session) -> Result<Invocation, CommandError> {
        Ok(Invocation::new(&self.program)
            .arg("--workdir")
            .arg(path_arg(&session.cwd))
            .arg("-p")
            .arg(format!("tabtitle={}", clip_title(&session.title)))
            .arg("-e")
            .args(bash_c(&self.bash, session))
            .current_dir(&session.cwd))
    }
}

#[derive(Debug, Clone)]
pub struct Xfce4Terminal {
    program: PathBuf,
    bash: PathBuf,
}

impl Xfce4Terminal {
    fn detect(probe: &dyn ExecutableProbe) -> Option<Box<dyn LaunchStrategy>> {
        Some(Box::new(Self {
            program: probe.find("xfce4-terminal")?,
            bash: probe.find("bash")?,
        }))
    }
}

impl LaunchStrategy for Xfce4Terminal {
    fn name(&self) -> &'static str {
        "xfce4-terminal"
    }

    fn family(&self) -> ShellFamily {
        ShellFamily::Posix
    }

    fn invocation(&self, session: &Session) -> Result<Invocation, CommandError> {
        // -x takes the rest of the command line as the program to run.
        Ok(Invocation::new(&self.program)
            .arg("--working-directory")
            .arg(path_arg(&session.cwd))
            .arg("--title")
            .arg(clip_title(&session.title))
            .arg("-x")
            .args(bash_c(&self.bash, session))
            .current_dir(&session.cwd))
    }
}

/// Last resort: present on nearly every X11 install.
#[derive(Debug, Clone)]
pub struct Xterm {
    program: PathBuf,
    bash: PathBuf,
}

impl Xterm {
    fn detect(probe: &dyn ExecutableProbe) -> Option<Box<dyn LaunchStrategy>> {
        Some(Box::new(Self {
            program: probe.find("xterm")?,
            bash: probe.find("bash")?,
        }))
    }
}

impl LaunchStrategy for Xterm {
    fn name(&self) -> &'static str {
        "xterm"
    }

    fn family(&self) -> ShellFamily {
        ShellFamily::Posix
    }

    fn invocation(&self, session: &Session) -> Result<Invocation, CommandError> {
        Ok(Invocation::new(&self.program)
            .arg("-T")
            .arg(clip_title(&session.title))
            .arg("-e")
            .args(bash_c(&self.bash, session))
            .current_dir(&session.cwd))
    }
}
