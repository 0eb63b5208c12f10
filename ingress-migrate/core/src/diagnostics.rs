//! User-facing migration notices.
//!
//! Diagnostics are distinct from field errors: they describe constructs that
//! were parsed successfully but whose translation needs a human's attention.

use crate::ResourceId;
use parking_lot::Mutex;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Guidance; nothing was lost in translation.
    Info,
    /// The translation is approximate or incomplete.
    Advisory,
    /// The source relies on behavior with no structural equivalent in the
    /// output and must be migrated by hand.
    Blocking,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectRef {
    pub kind: &'static str,
    pub id: ResourceId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub object: Option<ObjectRef>,
}

/// Receives diagnostics. Emitting is fire-and-forget.
pub trait DiagnosticSink {
    fn emit(&self, diagnostic: Diagnostic);
}

/// Collects diagnostics for the duration of a conversion run and mirrors them
/// to the log.
#[derive(Debug, Default)]
pub struct Notifications(Mutex<Vec<Diagnostic>>);

// === impl Severity ===

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => "info".fmt(f),
            Self::Advisory => "advisory".fmt(f),
            Self::Blocking => "blocking".fmt(f),
        }
    }
}

// === impl ObjectRef ===

impl ObjectRef {
    pub fn ingress(id: ResourceId) -> Self {
        Self { kind: "Ingress", id }
    }

    pub fn http_route(id: ResourceId) -> Self {
        Self {
            kind: "HTTPRoute",
            id,
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

// === impl Diagnostic ===

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            object: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn advisory(message: impl Into<String>) -> Self {
        Self::new(Severity::Advisory, message)
    }

    pub fn blocking(message: impl Into<String>) -> Self {
        Self::new(Severity::Blocking, message)
    }

    pub fn about(mut self, object: ObjectRef) -> Self {
        self.object = Some(object);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            Some(object) => write!(f, "[{}] {}: {}", self.severity, object, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}

// === impl Notifications ===

impl Notifications {
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.0.lock().clone()
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.0.lock())
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.0
            .lock()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

impl DiagnosticSink for Notifications {
    fn emit(&self, diagnostic: Diagnostic) {
        let object = diagnostic
            .object
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        match diagnostic.severity {
            Severity::Info => tracing::debug!(%object, "{}", diagnostic.message),
            Severity::Advisory => tracing::warn!(%object, "{}", diagnostic.message),
            Severity::Blocking => tracing::error!(%object, "{}", diagnostic.message),
        }
        self.0.lock().push(diagnostic);
    }
}
