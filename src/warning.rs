// warning.rs - Non-fatal diagnostics.
//
// Conditions worth telling the user about but not worth failing for.
// A warning is reported once per context for each call site and
// subject, like Ruby's once-per-location warnings. Search entry points
// carry `#[track_caller]`, so the call site is the embedder's.

use std::collections::HashSet;
use std::fmt;
use std::panic::Location;
use std::sync::{Arc, Mutex};

use log::warn;

use crate::encoding::EncodingRef;

/// What a warning is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A match fell back from the linear engine to backtracking.
    LinearFallback { pattern: String },
    /// The linear engine accepted a pattern but backtracks internally.
    DegradedToBacktracking { pattern: String },
    /// A `/.../n` pattern matched against a non-binary subject.
    HistoricalBinaryMatch { subject: EncodingRef },
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::LinearFallback { pattern } => {
                write!(f, "linear engine fallback to backtracking for /{}/", pattern)
            }
            WarningKind::DegradedToBacktracking { pattern } => {
                write!(f, "linear engine runs /{}/ by backtracking", pattern)
            }
            WarningKind::HistoricalBinaryMatch { subject } => {
                write!(f, "historical binary regexp match /.../n against {} string", subject)
            }
        }
    }
}

/// Receives warnings.
pub trait WarningSink: Send + Sync {
    fn warn(&self, kind: &WarningKind, location: &'static Location<'static>);
}

/// Forwards warnings to the `log` facade.
#[derive(Debug, Default)]
pub struct LogWarningSink;

impl WarningSink for LogWarningSink {
    fn warn(&self, kind: &WarningKind, location: &'static Location<'static>) {
        warn!("{}:{}: warning: {}", location.file(), location.line(), kind);
    }
}

type SeenKey = (&'static str, u32, u32, WarningKind);

/// Deduplicates warnings per call site and subject.
pub(crate) struct Warnings {
    sink: Arc<dyn WarningSink>,
    seen: Mutex<HashSet<SeenKey>>,
}

impl Warnings {
    pub fn new(sink: Arc<dyn WarningSink>) -> Self {
        Warnings {
            sink,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Report `kind` unless this call site already reported an equal
    /// warning.
    #[track_caller]
    pub fn warn_once(&self, kind: WarningKind) {
        let location = Location::caller();
        let key = (location.file(), location.line(), location.column(), kind.clone());
        let first = match self.seen.lock() {
            Ok(mut seen) => seen.insert(key),
            Err(poisoned) => poisoned.into_inner().insert(key),
        };
        if first {
            self.sink.warn(&kind, location);
        }
    }
}

impl fmt::Debug for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Warnings").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encodings::UTF_8;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl WarningSink for Collect {
        fn warn(&self, kind: &WarningKind, _location: &'static Location<'static>) {
            self.0.lock().unwrap().push(kind.to_string());
        }
    }

    #[test]
    fn once_per_call_site() {
        let sink = Arc::new(Collect::default());
        let warnings = Warnings::new(sink.clone());
        for _ in 0..3 {
            warnings.warn_once(WarningKind::HistoricalBinaryMatch { subject: UTF_8 });
        }
        warnings.warn_once(WarningKind::HistoricalBinaryMatch { subject: UTF_8 });
        let got = sink.0.lock().unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(
            got[0],
            "historical binary regexp match /.../n against UTF-8 string"
        );
    }

    #[test]
    fn distinct_subjects_warn_separately() {
        let sink = Arc::new(Collect::default());
        let warnings = Warnings::new(sink.clone());
        for pattern in ["a", "b", "a"] {
            warnings.warn_once(WarningKind::LinearFallback {
                pattern: pattern.to_string(),
            });
        }
        assert_eq!(
            *sink.0.lock().unwrap(),
            vec![
                "linear engine fallback to backtracking for /a/".to_string(),
                "linear engine fallback to backtracking for /b/".to_string(),
            ]
        );
    }
}
