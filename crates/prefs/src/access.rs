//! Access scope checking.
//!
//! Settings are normally touched only from the interactive client. Background
//! jobs may read and write settings marked server-accessible; touching any
//! other setting from a job is reported but never blocked.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Who is performing a read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessContext {
    pub is_client: bool,
}

impl AccessContext {
    /// The interactive client.
    pub const fn client() -> Self {
        Self { is_client: true }
    }

    /// A background job.
    pub const fn job() -> Self {
        Self { is_client: false }
    }
}

/// How often an out-of-scope access is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticPolicy {
    /// Report the first occurrence per setting only.
    LogOnce,
    /// Report every occurrence.
    LogAlways,
    /// Never report.
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

/// Records out-of-scope accesses.
pub struct AccessMonitor {
    read_policy: DiagnosticPolicy,
    write_policy: DiagnosticPolicy,
    warned: Mutex<HashSet<String>>,
    reported: AtomicUsize,
}

impl AccessMonitor {
    pub fn new(read_policy: DiagnosticPolicy, write_policy: DiagnosticPolicy) -> Self {
        Self {
            read_policy,
            write_policy,
            warned: Mutex::new(HashSet::new()),
            reported: AtomicUsize::new(0),
        }
    }

    /// Check one access to the setting identified by `pref_path`.
    /// Returns true if a diagnostic was emitted.
    pub fn check(
        &self,
        ctx: AccessContext,
        kind: AccessKind,
        pref_path: &str,
        server_accessible: bool,
    ) -> bool {
        if ctx.is_client || server_accessible {
            return false;
        }
        let policy = match kind {
            AccessKind::Read => self.read_policy,
            AccessKind::Write => self.write_policy,
        };
        let report = match policy {
            DiagnosticPolicy::Silent => false,
            DiagnosticPolicy::LogAlways => true,
            DiagnosticPolicy::LogOnce => self.warned.lock().insert(pref_path.to_string()),
        };
        if report {
            self.reported.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "Setting '{}' is not server-accessible but was {} outside the client",
                pref_path,
                match kind {
                    AccessKind::Read => "read",
                    AccessKind::Write => "written",
                }
            );
        }
        report
    }

    /// Number of diagnostics emitted so far.
    pub fn reported(&self) -> usize {
        self.reported.load(Ordering::Relaxed)
    }

    /// Forget which settings have been reported and zero the counter.
    pub fn reset(&self) {
        self.warned.lock().clear();
        self.reported.store(0, Ordering::Relaxed);
    }
}

impl Default for AccessMonitor {
    fn default() -> Self {
        Self::new(DiagnosticPolicy::LogOnce, DiagnosticPolicy::LogAlways)
    }
}
