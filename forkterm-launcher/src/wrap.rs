//! Tee wrapping: the spawned shell copies its own output into the log file
//! while still writing it to the terminal. An existing log is truncated.

use std::path::Path;

use forkterm_command::{CommandError, ShellDialect, ShellFamily};

/// Wrap `line` so stdout and stderr are also written to `log`.
///
/// The line is grouped first so `&&`, `;` and pipes inside it are all teed,
/// not just the last command.
pub fn tee(line: &str, family: ShellFamily, log: &Path) -> Result<String, CommandError> {
    let log = log.to_string_lossy();
    match family {
        ShellFamily::Posix => {
            let log = ShellDialect::Posix.escape(&log)?;
            Ok(format!("{{ {line}\n}} 2>&1 | tee {log}"))
        }
        ShellFamily::PowerShell => {
            let log = ShellDialect::PowerShellLiteral.escape(&log)?;
            Ok(format!("& {{\n{line}\n}} 2>&1 | Tee-Object -FilePath {log}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posix_groups_the_whole_line() {
        let out = tee("a && b", ShellFamily::Posix, Path::new("/tmp/my log.log")).unwrap();
        assert_eq!(out, "{ a && b\n} 2>&1 | tee '/tmp/my log.log'");
    }

    #[test]
    fn powershell_uses_a_script_block() {
        let out = tee("npm test", ShellFamily::PowerShell, Path::new(r"C:\logs\o'k.log")).unwrap();
        assert_eq!(
            out,
            "& {\nnpm test\n} 2>&1 | Tee-Object -FilePath 'C:\\logs\\o''k.log'"
        );
    }

    #[cfg(unix)]
    #[test]
    fn posix_tee_captures_both_streams() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("out.log");
        let line = tee("echo out && echo err >&2", ShellFamily::Posix, &log).unwrap();
        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(line)
            .stdout(std::process::Stdio::null())
            .status()
            .unwrap();
        assert!(status.success());
        let logged = std::fs::read_to_string(&log).unwrap();
        assert!(logged.contains("out"));
        assert!(logged.contains("err"));
    }

    #[cfg(unix)]
    #[test]
    fn relaunch_replaces_an_old_log() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("out.log");
        std::fs::write(&log, "previous session\n").unwrap();
        let line = tee("echo fresh", ShellFamily::Posix, &log).unwrap();
        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(line)
            .stdout(std::process::Stdio::null())
            .status()
            .unwrap();
        assert!(status.success());
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "fresh\n");
    }
}
