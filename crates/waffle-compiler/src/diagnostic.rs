//! Scoped warning suppression: `push` + `ignored` on entry, `pop` on exit.

use std::fmt;

use crate::environment::{Environment, Mechanism};
use crate::identity::{Compiler, CompilerIdentity};

/// Which compiler family a suppression bracket is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticScope {
    Gcc,
    Clang,
    /// Whichever of GCC or Clang is building.
    Any,
}

impl DiagnosticScope {
    /// Pragma namespace to use, or `None` when the bracket is a no-op here.
    pub(crate) fn namespace(self, identity: &CompilerIdentity) -> Option<&'static str> {
        let gcc = identity.is(Compiler::Gcc);
        let clang = identity.is(Compiler::Clang);
        match self {
            DiagnosticScope::Gcc if gcc => Some("GCC"),
            DiagnosticScope::Clang if clang => Some("clang"),
            // Clang understands the GCC namespace.
            DiagnosticScope::Any if gcc || clang => Some("GCC"),
            _ => None,
        }
    }
}

/// `_Pragma` operators opening and closing one suppression bracket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarningSuppression {
    begin: Vec<String>,
    end: Vec<String>,
}

impl WarningSuppression {
    pub(crate) fn new(
        env: &Environment,
        identity: &CompilerIdentity,
        scope: DiagnosticScope,
        warning: &str,
    ) -> Self {
        let namespace = match scope.namespace(identity) {
            Some(namespace) => namespace,
            None => return Self::default(),
        };
        let flag = format!("-W{}", warning);
        let recognized = if env.has_mechanism(Mechanism::HasWarning) {
            env.has_warning(&flag)
        } else {
            true
        };

        let mut begin = vec![format!("_Pragma(\"{} diagnostic push\")", namespace)];
        if recognized {
            begin.push(format!(
                "_Pragma(\"{} diagnostic ignored \\\"{}\\\"\")",
                namespace, flag
            ));
        } else {
            tracing::trace!(%flag, "warning not recognized, bracket reduced to push/pop");
        }
        Self {
            begin,
            end: vec![format!("_Pragma(\"{} diagnostic pop\")", namespace)],
        }
    }

    pub fn begin(&self) -> &[String] {
        &self.begin
    }

    pub fn end(&self) -> &[String] {
        &self.end
    }

    pub fn is_noop(&self) -> bool {
        self.begin.is_empty() && self.end.is_empty()
    }

    pub fn begin_text(&self) -> String {
        self.begin.join(" ")
    }

    pub fn end_text(&self) -> String {
        self.end.join(" ")
    }
}

/// Named suppression brackets, each `<NAME>_BEGIN` / `<NAME>_END` in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Allowance {
    DeprecatedDeclarations,
    DeprecatedImplementations,
    NewApiWithoutGuards,
    UnusedParameters,
    NonliteralFormat,
    ReturnTypeWarnings,
    NullCheckWarnings,
}

impl Allowance {
    pub const ALL: [Allowance; 7] = [
        Allowance::DeprecatedDeclarations,
        Allowance::DeprecatedImplementations,
        Allowance::NewApiWithoutGuards,
        Allowance::UnusedParameters,
        Allowance::NonliteralFormat,
        Allowance::ReturnTypeWarnings,
        Allowance::NullCheckWarnings,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Allowance::DeprecatedDeclarations => "ALLOW_DEPRECATED_DECLARATIONS",
            Allowance::DeprecatedImplementations => "ALLOW_DEPRECATED_IMPLEMENTATIONS",
            Allowance::NewApiWithoutGuards => "ALLOW_NEW_API_WITHOUT_GUARDS",
            Allowance::UnusedParameters => "ALLOW_UNUSED_PARAMETERS",
            Allowance::NonliteralFormat => "ALLOW_NONLITERAL_FORMAT",
            Allowance::ReturnTypeWarnings => "IGNORE_RETURN_TYPE_WARNINGS",
            Allowance::NullCheckWarnings => "IGNORE_NULL_CHECK_WARNINGS",
        }
    }

    pub fn scope(self) -> DiagnosticScope {
        match self {
            Allowance::NewApiWithoutGuards => DiagnosticScope::Clang,
            _ => DiagnosticScope::Any,
        }
    }

    /// Warning name without the `-W` prefix.
    pub fn warning(self) -> &'static str {
        match self {
            Allowance::DeprecatedDeclarations => "deprecated-declarations",
            Allowance::DeprecatedImplementations => "deprecated-implementations",
            Allowance::NewApiWithoutGuards => "unguarded-availability-new",
            Allowance::UnusedParameters => "unused-parameter",
            Allowance::NonliteralFormat => "format-nonliteral",
            Allowance::ReturnTypeWarnings => "return-type",
            Allowance::NullCheckWarnings => "nonnull",
        }
    }
}

impl fmt::Display for Allowance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
