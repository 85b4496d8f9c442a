//! Platform detection for `forkterm-detector`.
//!
//! [`PlatformDetector::select`] walks the host's candidate list (see
//! [`terminals`]) and returns the first [`LaunchStrategy`] whose executables
//! are installed. Probing only resolves paths; nothing is executed. When no
//! candidate is usable the result is [`DetectError::PlatformUnsupported`],
//! never a silent no-op.

pub mod probe;
pub mod strategy;
pub mod terminals;

use std::fmt;

use forkterm_core::FailureKind;
use serde::Serialize;
use thiserror::Error;

pub use probe::{ExecutableProbe, KnownExecutables, SystemProbe};
pub use strategy::{clip_title, Candidate, Invocation, LaunchStrategy, Session, MAX_TITLE_CHARS};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Host operating-system family, as far as launching terminals goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    MacOs,
    /// Linux and the BSDs: X11/Wayland terminal emulators.
    Linux,
    /// Anything else; carries `std::env::consts::OS`.
    Unsupported(String),
}

impl OsFamily {
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    pub fn from_os_name(os: &str) -> Self {
        match os {
            "windows" => OsFamily::Windows,
            "macos" => OsFamily::MacOs,
            "linux" | "freebsd" | "openbsd" | "netbsd" | "dragonfly" => OsFamily::Linux,
            other => OsFamily::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::MacOs => "macos",
            OsFamily::Linux => "linux",
            OsFamily::Unsupported(os) => os,
        }
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for OsFamily {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Errors from platform detection.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("no terminal launcher available on {os} (tried: {})", tried.join(", "))]
    PlatformUnsupported { os: String, tried: Vec<String> },
}

impl DetectError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DetectError::PlatformUnsupported { .. } => FailureKind::PlatformUnsupported,
        }
    }
}

/// One candidate as seen by [`PlatformDetector::report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateStatus {
    pub name: &'static str,
    pub available: bool,
}

/// Everything `forkterm detect` prints.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub platform: OsFamily,
    pub candidates: Vec<CandidateStatus>,
    pub selected: Option<&'static str>,
}

// ---------------------------------------------------------------------------
// PlatformDetector
// ---------------------------------------------------------------------------

pub struct PlatformDetector {
    os: OsFamily,
    probe: Box<dyn ExecutableProbe>,
    preferred: Option<String>,
}

impl fmt::Debug for PlatformDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformDetector")
            .field("os", &self.os)
            .field("preferred", &self.preferred)
            .finish_non_exhaustive()
    }
}

impl PlatformDetector {
    pub fn new(os: OsFamily, probe: impl ExecutableProbe + 'static) -> Self {
        Self {
            os,
            probe: Box::new(probe),
            preferred: None,
        }
    }

    /// The running host, probed through `PATH`.
    pub fn system() -> Self {
        Self::new(OsFamily::current(), SystemProbe)
    }

    /// Try the strategy named `name` before the platform's default order.
    pub fn with_preferred(mut self, name: Option<String>) -> Self {
        self.preferred = name;
        self
    }

    pub fn os(&self) -> &OsFamily {
        &self.os
    }

    /// Candidate order for this host, preferred terminal first.
    pub fn candidates(&self) -> Vec<Candidate> {
        let mut list = terminals::candidates_for(&self.os).to_vec();
        if let Some(name) = self.preferred.as_deref() {
            match list.iter().position(|c| c.name == name) {
                Some(pos) => {
                    let preferred = list.remove(pos);
                    list.insert(0, preferred);
                }
                None => tracing::warn!(
                    terminal = name,
                    os = %self.os,
                    "preferred terminal is not known on this platform, ignoring"
                ),
            }
        }
        list
    }

    /// First available strategy.
    pub fn select(&self) -> Result<Box<dyn LaunchStrategy>, DetectError> {
        let candidates = self.candidates();
        for candidate in &candidates {
            if let Some(strategy) = candidate.detect(self.probe.as_ref()) {
                tracing::debug!(strategy = candidate.name, os = %self.os, "selected launch strategy");
                return Ok(strategy);
            }
            tracing::debug!(strategy = candidate.name, "not available");
        }
        Err(DetectError::PlatformUnsupported {
            os: self.os.to_string(),
            tried: candidates.iter().map(|c| c.name.to_string()).collect(),
        })
    }

    /// Availability of every candidate, plus the one [`select`](Self::select)
    /// would pick.
    pub fn report(&self) -> DetectionReport {
        let candidates: Vec<CandidateStatus> = self
            .candidates()
            .iter()
            .map(|c| CandidateStatus {
                name: c.name,
                available: c.detect(self.probe.as_ref()).is_some(),
            })
            .collect();
        let selected = candidates.iter().find(|c| c.available).map(|c| c.name);
        DetectionReport {
            platform: self.os.clone(),
            candidates,
            selected,
        }
    }
}
