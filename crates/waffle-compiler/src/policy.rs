use crate::environment::Environment;
use crate::error::PolicyError;
use crate::identity::{Compiler, CompilerIdentity};

/// Oldest `_MSC_VER` accepted: Visual Studio 2017.
pub const MINIMUM_MSVC_VERSION: i64 = 1910;

pub const RELEASE_WITHOUT_OPTIMIZATIONS: &str = "RELEASE_WITHOUT_OPTIMIZATIONS";
pub const ALLOW_UNSUPPORTED_MSVC: &str = "ALLOW_UNSUPPORTED_MSVC";

/// Runs the build gates in order and reports the first one that fires.
pub fn check(env: &Environment, identity: &CompilerIdentity) -> Result<(), PolicyError> {
    if identity.is(Compiler::GccCompatible)
        && !env.is_debug()
        && !env.is_optimized()
        && !env.is_defined(RELEASE_WITHOUT_OPTIMIZATIONS)
    {
        return Err(PolicyError::ReleaseWithoutOptimizations);
    }

    if identity.is(Compiler::Msvc) && !env.is_defined(ALLOW_UNSUPPORTED_MSVC) {
        if let Some(version) = identity.msvc_version() {
            if version < MINIMUM_MSVC_VERSION {
                return Err(PolicyError::UnsupportedMsvc {
                    version,
                    minimum: MINIMUM_MSVC_VERSION,
                });
            }
        }
    }

    tracing::debug!("build policy gates passed");
    Ok(())
}
