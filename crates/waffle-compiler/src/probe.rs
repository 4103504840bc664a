//! Asks a real C compiler about itself.
//!
//! A single generated source is preprocessed once. Every marker and feature-test
//! operator we care about is echoed as a tagged line, and the preprocessed output is
//! parsed back into an [`Environment`].

use std::ffi::OsString;
use std::fmt::{self, Write};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::attribute::Attribute;
use crate::diagnostic::Allowance;
use crate::environment::{Environment, Language, Mechanism};
use crate::error::ProbeError;
use crate::feature::{Feature, Quirk, Sanitizer};
use crate::identity::Compiler;
use crate::policy;

const PROBE_TAG: &str = "__waffle_probe__";

/// Markers every probe asks about, besides flag and attribute names.
const MARKERS: &[&str] = &[
    "__clang__",
    "__clang_major__",
    "__GNUC__",
    "__GNUC_MINOR__",
    "__GNUC_PATCHLEVEL__",
    "__MINGW32__",
    "__MINGW64__",
    "__MINGW64_VERSION_MAJOR",
    "_MSC_VER",
    "_WIN32",
    "_WIN64",
    "__cplusplus",
    "__STDC_VERSION__",
    "__OBJC__",
    "__ARM_EABI__",
    "__EABI__",
    "__SANITIZE_ADDRESS__",
    "__SANITIZE_THREAD__",
    "__OPTIMIZE__",
    "NDEBUG",
];

const BUILTINS: &[&str] = &["__builtin_expect", "__builtin_bit_cast", "__builtin_unreachable"];
const FEATURES: &[&str] = &[
    "blocks",
    "c_static_assert",
    "cxx_exceptions",
    "is_trivially_copyable",
    "address_sanitizer",
    "thread_sanitizer",
];
const DECLSPECS: &[&str] = &["noinline", "noreturn"];
const ATTRIBUTES: &[&str] = &["fallthrough", "not_tail_called", "always_inline", "noinline"];
const CPP_ATTRIBUTES: &[&str] = &["fallthrough", "clang::fallthrough", "gnu::fallthrough"];

/// Command-line dialect of the compiler driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    /// `gcc`, `clang` and anything else taking `-E`.
    Gnu,
    /// `cl.exe` and `clang-cl`, taking `/EP`.
    Msvc,
}

impl Flavor {
    pub fn guess(program: &Path) -> Self {
        let stem = program
            .file_stem()
            .map(|s| s.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if stem == "cl" || stem.ends_with("clang-cl") {
            Flavor::Msvc
        } else {
            Flavor::Gnu
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toolchain {
    program: PathBuf,
    args: Vec<OsString>,
    flavor: Flavor,
    language: Language,
    markers: Vec<String>,
    warnings: Vec<String>,
}

impl Toolchain {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        Self {
            flavor: Flavor::guess(&program),
            program,
            args: Vec::new(),
            language: Language::C,
            markers: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Extra driver arguments, e.g. `-O2`, `-DNDEBUG` or `-fsanitize=address`.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Also record whether `name` is predefined, and its value.
    pub fn with_marker(mut self, name: impl Into<String>) -> Self {
        self.markers.push(name.into());
        self
    }

    /// Also probe `__has_warning("-W<name>")`.
    pub fn with_warning(mut self, name: impl Into<String>) -> Self {
        self.warnings.push(name.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// The generated probe translation unit.
    pub fn probe_source(&self) -> String {
        GeneratedSource(self).to_string()
    }

    pub fn write_source<W: Write>(&self, out: &mut W) -> fmt::Result {
        writeln!(
            out,
            "/* waffle-compiler probe */\n#ifdef __MINGW32__\n#include <_mingw.h>\n#endif"
        )?;

        let mut markers: Vec<String> = MARKERS.iter().map(|m| (*m).to_owned()).collect();
        markers.extend(Compiler::ALL.iter().map(|c| c.flag_name()));
        markers.extend(Feature::ALL.iter().map(|f| f.flag_name()));
        markers.extend(Quirk::ALL.iter().map(|q| q.flag_name()));
        markers.extend(Sanitizer::ALL.iter().map(|s| s.flag_name().to_owned()));
        markers.extend(Attribute::ALL.iter().map(|a| a.name().to_owned()));
        markers.push(policy::RELEASE_WITHOUT_OPTIMIZATIONS.to_owned());
        markers.push(policy::ALLOW_UNSUPPORTED_MSVC.to_owned());
        markers.extend(self.markers.iter().cloned());
        markers.sort();
        markers.dedup();
        for marker in &markers {
            writeln!(
                out,
                "#ifdef {0}\n{1} define \"{0}\" {0}\n#endif",
                marker, PROBE_TAG
            )?;
        }

        let mut warnings: Vec<String> = Allowance::ALL
            .iter()
            .map(|a| format!("-W{}", a.warning()))
            .collect();
        warnings.extend(self.warnings.iter().map(|w| format!("-W{}", w)));

        write_block(out, Mechanism::HasBuiltin, None, BUILTINS.iter().copied(), false)?;
        write_block(out, Mechanism::HasFeature, None, FEATURES.iter().copied(), false)?;
        write_block(
            out,
            Mechanism::HasDeclspecAttribute,
            None,
            DECLSPECS.iter().copied(),
            false,
        )?;
        write_block(out, Mechanism::HasAttribute, None, ATTRIBUTES.iter().copied(), false)?;
        // Scoped attribute names do not even lex as C.
        write_block(
            out,
            Mechanism::HasCppAttribute,
            Some("__cplusplus"),
            CPP_ATTRIBUTES.iter().copied(),
            false,
        )?;
        write_block(
            out,
            Mechanism::HasWarning,
            None,
            warnings.iter().map(String::as_str),
            true,
        )
    }

    pub fn probe(&self) -> Result<Environment, ProbeError> {
        let dir = tempfile::Builder::new().prefix("waffle-probe").tempdir()?;
        let source = dir.path().join(match self.language {
            Language::C => "probe.c",
            Language::Cxx => "probe.cpp",
            Language::ObjC => "probe.m",
            Language::ObjCxx => "probe.mm",
        });
        fs::write(&source, self.probe_source())?;

        let mut command = Command::new(&self.program);
        command.args(&self.args);
        match self.flavor {
            Flavor::Gnu => {
                let language = match self.language {
                    Language::C => "c",
                    Language::Cxx => "c++",
                    Language::ObjC => "objective-c",
                    Language::ObjCxx => "objective-c++",
                };
                command.args(&["-E", "-P", "-x", language]).arg(&source);
            }
            Flavor::Msvc => {
                command.args(&["/nologo", "/EP"]);
                command.arg(if self.language.is_cxx() { "/Tp" } else { "/Tc" });
                command.arg(&source);
            }
        }

        tracing::debug!(?command, "probing compiler");
        let output = command.output().map_err(|source| ProbeError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(ProbeError::Failed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(parse_probe_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

struct GeneratedSource<'a>(&'a Toolchain);

impl fmt::Display for GeneratedSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.write_source(f)
    }
}

fn write_block<'a, W: Write>(
    out: &mut W,
    mechanism: Mechanism,
    guard: Option<&str>,
    names: impl Iterator<Item = &'a str>,
    quoted: bool,
) -> fmt::Result {
    let operator = mechanism.operator();
    match guard {
        Some(guard) => writeln!(out, "#if defined({}) && defined({})", guard, operator)?,
        None => writeln!(out, "#if defined({})", operator)?,
    }
    writeln!(out, "{} mechanism \"{}\"", PROBE_TAG, operator)?;
    for name in names {
        let argument = if quoted {
            format!("\"{}\"", name)
        } else {
            name.to_owned()
        };
        writeln!(
            out,
            "#if {}({})\n{} probe \"{}\" \"{}\"\n#endif",
            operator, argument, PROBE_TAG, operator, name
        )?;
    }
    writeln!(out, "#endif")
}

/// Rebuilds an [`Environment`] from preprocessed probe output. Untagged lines are
/// ignored.
pub fn parse_probe_output(output: &str) -> Environment {
    let mut env = Environment::new();
    for line in output.lines() {
        let mut words = line.split_whitespace();
        if words.next() != Some(PROBE_TAG) {
            continue;
        }
        tracing::trace!(line, "probe answer");
        match words.next() {
            Some("define") => {
                if let Some(name) = words.next().map(unquote) {
                    let value = words.collect::<Vec<_>>().join(" ");
                    env.insert_define(name, value);
                }
            }
            Some("mechanism") => {
                if let Some(mechanism) = words.next().map(unquote).and_then(Mechanism::from_operator) {
                    env.insert_mechanism(mechanism);
                }
            }
            Some("probe") => {
                let mechanism = words.next().map(unquote).and_then(Mechanism::from_operator);
                if let (Some(mechanism), Some(name)) = (mechanism, words.next().map(unquote)) {
                    env.insert_probe(mechanism, name);
                }
            }
            _ => tracing::trace!(line, "malformed probe line"),
        }
    }
    env
}

fn unquote(word: &str) -> &str {
    word.trim_matches('"')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flavor_from_program_name() {
        assert_eq!(Flavor::guess(Path::new("/usr/bin/gcc")), Flavor::Gnu);
        assert_eq!(Flavor::guess(Path::new("clang")), Flavor::Gnu);
        assert_eq!(Flavor::guess(Path::new("C:\\VC\\bin\\cl.exe")), Flavor::Msvc);
        assert_eq!(Flavor::guess(Path::new("clang-cl")), Flavor::Msvc);
    }

    #[test]
    fn probe_source_covers_markers_and_operators() {
        let src = Toolchain::new("cc")
            .with_marker("MY_MARKER")
            .with_warning("shadow")
            .probe_source();
        assert!(src.contains("#ifdef __clang__\n__waffle_probe__ define \"__clang__\" __clang__\n#endif"));
        assert!(src.contains("#ifdef MY_MARKER\n"));
        assert!(src.contains("#ifdef ALWAYS_INLINE\n"));
        assert!(src.contains("#ifdef RELEASE_WITHOUT_OPTIMIZATIONS\n"));
        assert!(src.contains("#if __has_feature(address_sanitizer)\n"));
        assert!(src.contains("#if __has_warning(\"-Wshadow\")\n"));
        assert!(src.contains("#if defined(__cplusplus) && defined(__has_cpp_attribute)\n"));
        assert!(src.contains("#include <_mingw.h>"));
    }

    #[test]
    fn parse_preprocessed_output() {
        let output = "\n\
            __waffle_probe__ define \"__clang__\" 1\n\
            __waffle_probe__ define \"__STDC_VERSION__\" 201710L\n\
            __waffle_probe__ define \"NDEBUG\"\n\
            __waffle_probe__ define \"ALWAYS_INLINE\" inline   __attribute__((always_inline))\n\
            __waffle_probe__ mechanism \"__has_feature\"\n\
            __waffle_probe__ probe \"__has_feature\" \"c_static_assert\"\n\
            __waffle_probe__ mechanism \"__has_warning\"\n\
            __waffle_probe__ probe \"__has_warning\" \"-Wnonnull\"\n\
            __waffle_probe__ probe \"__has_nothing\" \"x\"\n\
            int unrelated;\n";
        let env = parse_probe_output(output);
        assert!(env.truthy("__clang__"));
        assert_eq!(env.integer("__STDC_VERSION__"), Some(201710));
        assert_eq!(env.value("NDEBUG"), Some(""));
        assert_eq!(
            env.value("ALWAYS_INLINE"),
            Some("inline __attribute__((always_inline))")
        );
        assert!(env.has_feature("c_static_assert"));
        assert!(!env.has_feature("blocks"));
        assert!(env.has_warning("-Wnonnull"));
        assert!(!env.has_mechanism(Mechanism::HasBuiltin));
        assert_eq!(env.defines().count(), 4);
    }

    #[test]
    fn missing_compiler_is_a_spawn_error() {
        let err = Toolchain::new("/nonexistent/waffle-cc").probe().unwrap_err();
        assert!(matches!(err, ProbeError::Spawn { .. }), "{}", err);
    }
}
