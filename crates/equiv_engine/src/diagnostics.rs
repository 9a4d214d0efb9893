//! Optional per-phase reporting for callers that want timing data.

use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    CacheLookup,
    Parse,
    Canonicalize,
    SlowPath,
    CacheStore,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::CacheLookup => "cache-lookup",
            Phase::Parse => "parse",
            Phase::Canonicalize => "canonicalize",
            Phase::SlowPath => "slow-path",
            Phase::CacheStore => "cache-store",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticEvent {
    pub phase: Phase,
    pub duration_ms: f64,
    pub details: serde_json::Value,
}

/// Callback invoked synchronously once per completed phase.
pub type DiagnosticHook = Arc<dyn Fn(&DiagnosticEvent) + Send + Sync>;

/// Forwards events to the hook, if one is installed. Events are also traced.
#[derive(Clone, Default)]
pub(crate) struct Diagnostics {
    hook: Option<DiagnosticHook>,
}

impl Diagnostics {
    pub(crate) fn new(hook: Option<DiagnosticHook>) -> Self {
        Self { hook }
    }

    pub(crate) fn emit(
        &self,
        phase: Phase,
        started: std::time::Instant,
        details: serde_json::Value,
    ) {
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::trace!(target: "equivalence", phase = %phase, duration_ms, "phase_complete");
        if let Some(hook) = &self.hook {
            hook(&DiagnosticEvent {
                phase,
                duration_ms,
                details,
            });
        }
    }
}
