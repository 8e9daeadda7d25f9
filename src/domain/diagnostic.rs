//! Findings reported by inspections

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::component::ComponentType;

/// What went wrong
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// No candidate file found under any strategy or extension
    UnresolvedImport,
    /// The import closes a loop back onto the current import path
    CircularImport,
    /// The file is not under the configured stacks root
    OutsideStacksRoot,
    /// A component reference matches no catalog entry
    UnknownComponent,
    /// The import chain is too long to check for cycles
    ImportDepthExceeded,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::UnresolvedImport => "unresolved-import",
            FindingKind::CircularImport => "circular-import",
            FindingKind::OutsideStacksRoot => "outside-stacks-root",
            FindingKind::UnknownComponent => "unknown-component",
            FindingKind::ImportDepthExceeded => "import-depth-exceeded",
        }
    }

    /// Severity a finding of this kind is reported with
    pub fn severity(&self) -> Severity {
        match self {
            FindingKind::UnresolvedImport | FindingKind::CircularImport => Severity::Error,
            FindingKind::UnknownComponent | FindingKind::ImportDepthExceeded => Severity::Warning,
            FindingKind::OutsideStacksRoot => Severity::Info,
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scaffold action offered alongside a finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum QuickFix {
    /// Create the missing stack file at `path`
    CreateStackFile { path: PathBuf },
    /// Create a component directory with scaffold files
    CreateComponent {
        path: PathBuf,
        component_type: ComponentType,
    },
}

impl QuickFix {
    pub fn path(&self) -> &PathBuf {
        match self {
            QuickFix::CreateStackFile { path } | QuickFix::CreateComponent { path, .. } => path,
        }
    }

    pub fn label(&self) -> String {
        match self {
            QuickFix::CreateStackFile { path } => format!("Create stack file '{}'", path.display()),
            QuickFix::CreateComponent { path, component_type } => {
                format!("Create {} component '{}'", component_type, path.display())
            }
        }
    }
}

/// One finding in one stack file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: FindingKind,
    pub severity: Severity,

    /// The stack file the finding belongs to
    pub file: PathBuf,

    /// The import string or component name the finding is about
    pub subject: String,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_fix: Option<QuickFix>,
}

impl Diagnostic {
    pub fn new(kind: FindingKind, file: impl Into<PathBuf>, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            file: file.into(),
            subject: subject.into(),
            message: message.into(),
            quick_fix: None,
        }
    }

    pub fn with_fix(mut self, fix: QuickFix) -> Self {
        self.quick_fix = Some(fix);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
