use std::path::PathBuf;

/// Configurations that are known to produce a broken or unusable build.
///
/// These are not capability answers: resolving a registry for such an environment
/// fails outright, and the build that asked for it is expected to stop.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error(
        "building release without compiler optimizations: the runtime will be slow. \
         Define RELEASE_WITHOUT_OPTIMIZATIONS (or enable the `release-without-optimizations` \
         feature) if this is intended."
    )]
    ReleaseWithoutOptimizations,
    #[error(
        "unsupported Visual Studio (_MSC_VER {version}): VS2017 or newer (_MSC_VER >= {minimum}) \
         is required. Define ALLOW_UNSUPPORTED_MSVC to build anyway."
    )]
    UnsupportedMsvc { version: i64, minimum: i64 },
}

/// Failures while asking a real compiler about itself.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("I/O error while probing: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to run compiler `{}`: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("compiler `{}` exited with {status}: {stderr}", program.display())]
    Failed {
        program: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

/// A name that does not belong to any known tag, feature or preset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{name}`")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

impl UnknownName {
    pub(crate) fn new(kind: &'static str, name: &str) -> Self {
        Self {
            kind,
            name: name.to_owned(),
        }
    }
}
