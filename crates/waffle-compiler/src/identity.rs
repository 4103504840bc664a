use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::environment::Environment;
use crate::error::UnknownName;

/// Compiler tags answered by `COMPILER(...)`.
///
/// `GccCompatible` is a capability class rather than a compiler: Clang and MinGW
/// satisfy it too. `Gcc` means GCC proper and never coexists with `Clang`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Compiler {
    Clang,
    GccCompatible,
    Gcc,
    MinGW,
    MinGW64,
    Msvc,
}

impl Compiler {
    /// Detection order. Later tags read earlier ones.
    pub const ALL: [Compiler; 6] = [
        Compiler::Clang,
        Compiler::GccCompatible,
        Compiler::Gcc,
        Compiler::MinGW,
        Compiler::MinGW64,
        Compiler::Msvc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Compiler::Clang => "CLANG",
            Compiler::GccCompatible => "GCC_COMPATIBLE",
            Compiler::Gcc => "GCC",
            Compiler::MinGW => "MINGW",
            Compiler::MinGW64 => "MINGW64",
            Compiler::Msvc => "MSVC",
        }
    }

    pub fn flag_name(self) -> String {
        format!("WAFFLE_COMPILER_{}", self.name())
    }
}

impl fmt::Display for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compiler {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name() == upper)
            .ok_or_else(|| UnknownName::new("compiler", s))
    }
}

/// Which compiler is building, as far as its predefined markers tell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerIdentity {
    tags: BTreeSet<Compiler>,
    gcc_version: Option<u32>,
    msvc_version: Option<i64>,
    cpp_std_version: Option<u32>,
}

impl CompilerIdentity {
    pub fn detect(env: &Environment) -> Self {
        let mut tags = BTreeSet::new();
        let mut tag = |compiler: Compiler, computed: bool| {
            let active = env.resolve_flag(&compiler.flag_name(), computed);
            if active {
                tags.insert(compiler);
            }
            active
        };

        let clang = tag(Compiler::Clang, env.is_defined("__clang__"));
        let gcc_compatible = tag(Compiler::GccCompatible, env.is_defined("__GNUC__"));
        // Clang defines __GNUC__ as well, so GCC proper must exclude it explicitly.
        let gcc = tag(Compiler::Gcc, gcc_compatible && !clang);
        let mingw = tag(Compiler::MinGW, env.is_defined("__MINGW32__"));
        tag(
            Compiler::MinGW64,
            mingw && env.is_defined("__MINGW64_VERSION_MAJOR"),
        );
        tag(Compiler::Msvc, env.is_defined("_MSC_VER"));

        let gcc_version = if gcc {
            // Markers are arbitrary integers; out-of-range versions saturate.
            let part = |name: &str| env.integer(name).unwrap_or(0).max(0) as u64;
            let version = part("__GNUC__")
                .saturating_mul(10000)
                .saturating_add(part("__GNUC_MINOR__").saturating_mul(100))
                .saturating_add(part("__GNUC_PATCHLEVEL__"));
            Some(version.min(u64::from(u32::MAX)) as u32)
        } else {
            None
        };

        let cpp_std_version = match env.integer("__cplusplus") {
            Some(version) if clang => cpp_std_version(version),
            _ => None,
        };

        let identity = Self {
            tags,
            gcc_version,
            msvc_version: env.integer("_MSC_VER"),
            cpp_std_version,
        };
        tracing::debug!(tags = ?identity.tags, gcc_version = ?identity.gcc_version, "detected compiler identity");
        identity
    }

    pub fn is(&self, compiler: Compiler) -> bool {
        self.tags.contains(&compiler)
    }

    pub fn tags(&self) -> impl Iterator<Item = Compiler> + '_ {
        self.tags.iter().copied()
    }

    /// The exclusive primary identity: Clang, GCC proper or MSVC.
    pub fn primary(&self) -> Option<Compiler> {
        [Compiler::Clang, Compiler::Gcc, Compiler::Msvc]
            .iter()
            .copied()
            .find(|c| self.is(*c))
    }

    /// `major * 10000 + minor * 100 + patch`, only for GCC proper.
    pub fn gcc_version(&self) -> Option<u32> {
        self.gcc_version
    }

    pub fn gcc_version_at_least(&self, major: u32, minor: u32, patch: u32) -> bool {
        let wanted = u64::from(major) * 10000 + u64::from(minor) * 100 + u64::from(patch);
        self.gcc_version.map_or(false, |v| u64::from(v) >= wanted)
    }

    /// `_MSC_VER`, whenever it is defined.
    pub fn msvc_version(&self) -> Option<i64> {
        self.msvc_version
    }

    /// C++ standard revision (11, 14 or 17), known only under Clang.
    pub fn cpp_std_version(&self) -> Option<u32> {
        self.cpp_std_version
    }
}

fn cpp_std_version(cplusplus: i64) -> Option<u32> {
    if cplusplus <= 201103 {
        Some(11)
    } else if cplusplus <= 201402 {
        Some(14)
    } else if cplusplus <= 201703 {
        Some(17)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Preset;

    fn tags(env: &Environment) -> Vec<Compiler> {
        CompilerIdentity::detect(env).tags().collect()
    }

    #[test]
    fn clang_is_gcc_compatible_but_not_gcc() {
        let id = CompilerIdentity::detect(&Preset::Clang.environment());
        assert!(id.is(Compiler::Clang));
        assert!(id.is(Compiler::GccCompatible));
        assert!(!id.is(Compiler::Gcc));
        assert_eq!(id.primary(), Some(Compiler::Clang));
        assert_eq!(id.gcc_version(), None);
    }

    #[test]
    fn plain_gcc() {
        let id = CompilerIdentity::detect(&Preset::Gcc.environment());
        assert_eq!(
            tags(&Preset::Gcc.environment()),
            vec![Compiler::GccCompatible, Compiler::Gcc]
        );
        assert_eq!(id.gcc_version(), Some(130200));
        assert!(id.gcc_version_at_least(13, 2, 0));
        assert!(id.gcc_version_at_least(9, 0, 0));
        assert!(!id.gcc_version_at_least(13, 2, 1));
        assert_eq!(id.primary(), Some(Compiler::Gcc));
    }

    #[test]
    fn huge_gcc_versions_saturate() {
        let env = Preset::Gcc.environment().with_define("__GNUC__", "500000");
        let id = CompilerIdentity::detect(&env);
        assert_eq!(id.gcc_version(), Some(u32::MAX));
        assert!(id.gcc_version_at_least(13, 2, 0));
        assert!(!id.gcc_version_at_least(u32::MAX, u32::MAX, u32::MAX));
        assert!(crate::registry::CapabilityRegistry::resolve(env).is_ok());

        let env = Preset::Gcc
            .environment()
            .with_define("__GNUC__", "9223372036854775807")
            .with_define("__GNUC_PATCHLEVEL__", "9223372036854775807");
        assert_eq!(CompilerIdentity::detect(&env).gcc_version(), Some(u32::MAX));
    }

    #[test]
    fn mingw64_nests_under_mingw() {
        assert_eq!(
            tags(&Preset::MinGW64.environment()),
            vec![
                Compiler::GccCompatible,
                Compiler::Gcc,
                Compiler::MinGW,
                Compiler::MinGW64
            ]
        );
        // The mingw-w64 version marker alone does not make a MinGW compiler.
        let env = Environment::new().with_define("__MINGW64_VERSION_MAJOR", "11");
        assert!(tags(&env).is_empty());
    }

    #[test]
    fn msvc_and_unknown() {
        let id = CompilerIdentity::detect(&Preset::Msvc.environment());
        assert_eq!(id.tags().collect::<Vec<_>>(), vec![Compiler::Msvc]);
        assert_eq!(id.msvc_version(), Some(1937));

        let id = CompilerIdentity::detect(&Environment::new());
        assert_eq!(id.tags().count(), 0);
        assert_eq!(id.primary(), None);
    }

    #[test]
    fn cpp_standard_only_under_clang() {
        let clang = Preset::Clang.environment();
        let version = |env: Environment, cplusplus: &str| -> Option<u32> {
            CompilerIdentity::detect(&env.with_define("__cplusplus", cplusplus)).cpp_std_version()
        };
        assert_eq!(version(clang.clone(), "201103L"), Some(11));
        assert_eq!(version(clang.clone(), "201402L"), Some(14));
        assert_eq!(version(clang.clone(), "201703L"), Some(17));
        assert_eq!(version(clang, "202002L"), None);
        assert_eq!(version(Preset::Gcc.environment(), "201703L"), None);
    }

    #[test]
    fn predefined_tag_overrides_detection() {
        let env = Preset::Clang
            .environment()
            .with_define("WAFFLE_COMPILER_CLANG", "0");
        let id = CompilerIdentity::detect(&env);
        assert!(!id.is(Compiler::Clang));
        // With Clang switched off, the GCC-compatible class reads as GCC proper.
        assert!(id.is(Compiler::Gcc));
    }

    #[test]
    fn compiler_names_round_trip() {
        assert_eq!("gcc_compatible".parse::<Compiler>(), Ok(Compiler::GccCompatible));
        assert_eq!(Compiler::MinGW64.flag_name(), "WAFFLE_COMPILER_MINGW64");
        assert!("icc".parse::<Compiler>().is_err());
    }
}
