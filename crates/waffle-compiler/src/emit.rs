//! Renders a resolved [`CapabilityRegistry`] for its consumers: a C header for C
//! sources, `pub const` items for Rust sources, and cargo directives for `#[cfg]`.

use std::fmt::{self, Write};

use crate::attribute::{Attribute, Expansion, Origin};
use crate::diagnostic::{Allowance, DiagnosticScope};
use crate::environment::Language;
use crate::feature::{Feature, Quirk, Sanitizer};
use crate::identity::Compiler;
use crate::registry::CapabilityRegistry;

const HEADER_GUARD: &str = "WAFFLE_COMPILER_H";

const POINTER_WIDTH: &str = "#if UINTPTR_MAX == UINT32_MAX\n\
                             #define IS32BIT 1\n\
                             #elif UINTPTR_MAX == UINT64_MAX\n\
                             #define IS64BIT 1\n\
                             #else\n\
                             #error \"Other pointer sizes are not supported for now\"\n\
                             #endif\n\n";

const QUERY_MACROS: &str = "#define COMPILER(WAFFLE_FEATURE) (defined WAFFLE_COMPILER_##WAFFLE_FEATURE && WAFFLE_COMPILER_##WAFFLE_FEATURE)\n\
     #define COMPILER_SUPPORTS(WAFFLE_COMPILER_FEATURE) (defined WAFFLE_COMPILER_SUPPORTS_##WAFFLE_COMPILER_FEATURE && WAFFLE_COMPILER_SUPPORTS_##WAFFLE_COMPILER_FEATURE)\n\
     #define COMPILER_QUIRK(WAFFLE_COMPILER_QUIRK) (defined WAFFLE_COMPILER_QUIRK_##WAFFLE_COMPILER_QUIRK && WAFFLE_COMPILER_QUIRK_##WAFFLE_COMPILER_QUIRK)\n\n";

/// Standard attribute spellings, decided by each C++ translation unit itself.
const CXX_FALLTHROUGH: &str = "#if defined(__has_cpp_attribute)\n\
                               #if __has_cpp_attribute(fallthrough)\n\
                               #define FALLTHROUGH [[fallthrough]]\n\
                               #elif __has_cpp_attribute(clang::fallthrough)\n\
                               #define FALLTHROUGH [[clang::fallthrough]]\n\
                               #elif __has_cpp_attribute(gnu::fallthrough)\n\
                               #define FALLTHROUGH [[gnu::fallthrough]]\n\
                               #endif\n\
                               #endif\n";

/// `__has_warning` is only consulted inside the including file, where the warning
/// name is known. `_COND` pastes its answer to pick the `_IMPL_1` or `_IMPL_0` form.
const WARNING_HELPERS: &str = "#define _WAFFLE_CONCAT_I(a, b) a ## b\n\
     #define _WAFFLE_CONCAT(a, b) _WAFFLE_CONCAT_I(a, b)\n\
     #define _WAFFLE_STRINGIZE(exp) #exp\n\
     #define _WAFFLE_WARNING_NAME(warning) \"-W\" warning\n\
     #define _WAFFLE_IGNORE_WARNINGS_BEGIN_COND(cond, compiler, warning) _Pragma(_WAFFLE_STRINGIZE(compiler diagnostic push)) _WAFFLE_CONCAT(_WAFFLE_IGNORE_WARNINGS_BEGIN_IMPL_, cond)(compiler, warning)\n\
     #define _WAFFLE_IGNORE_WARNINGS_BEGIN_IMPL_1(compiler, warning) _Pragma(_WAFFLE_STRINGIZE(compiler diagnostic ignored warning))\n\
     #define _WAFFLE_IGNORE_WARNINGS_BEGIN_IMPL_0(compiler, warning)\n\
     #define _WAFFLE_IGNORE_WARNINGS_BEGIN_IMPL_(compiler, warning)\n\
     #define _WAFFLE_IGNORE_WARNINGS_END_IMPL(compiler) _Pragma(_WAFFLE_STRINGIZE(compiler diagnostic pop))\n\
     #if defined(__has_warning)\n\
     #define _WAFFLE_IGNORE_WARNINGS_BEGIN_CHECKED(compiler, warning) _WAFFLE_IGNORE_WARNINGS_BEGIN_COND(__has_warning(warning), compiler, warning)\n\
     #else\n\
     #define _WAFFLE_IGNORE_WARNINGS_BEGIN_CHECKED(compiler, warning) _WAFFLE_IGNORE_WARNINGS_BEGIN_COND(1, compiler, warning)\n\
     #endif\n\
     #define _WAFFLE_IGNORE_WARNINGS_BEGIN(compiler, warning) _WAFFLE_IGNORE_WARNINGS_BEGIN_CHECKED(compiler, _WAFFLE_WARNING_NAME(warning))\n";

struct Header<'a>(&'a CapabilityRegistry);

impl fmt::Display for Header<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_header(f, self.0)
    }
}

struct RustSource<'a>(&'a CapabilityRegistry);

impl fmt::Display for RustSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_rust(f, self.0)
    }
}

pub fn render_header(registry: &CapabilityRegistry) -> String {
    Header(registry).to_string()
}

/// Writes `waffle/compiler.h`. Attributes whose spelling depends on the source
/// language are guarded by that language's marker, so one header serves every
/// includer whatever language the build itself was described in.
pub fn write_header<W: Write>(out: &mut W, registry: &CapabilityRegistry) -> fmt::Result {
    let identity = registry.identity();

    writeln!(out, "/* Generated by waffle-compiler. Do not edit. */")?;
    writeln!(out, "#ifndef {0}\n#define {0}\n", HEADER_GUARD)?;
    writeln!(out, "#include <stdint.h>\n")?;
    out.write_str(POINTER_WIDTH)?;
    out.write_str(QUERY_MACROS)?;

    for (name, value) in registry.flags() {
        writeln!(out, "#ifndef {0}\n#define {0} {1}\n#endif", name, value as u8)?;
    }
    writeln!(out)?;

    if let Some(version) = identity.gcc_version() {
        writeln!(out, "#define GCC_VERSION {}", version)?;
        writeln!(
            out,
            "#define GCC_VERSION_AT_LEAST(major, minor, patch) \
             (GCC_VERSION >= (major * 10000 + minor * 100 + patch))"
        )?;
    }
    if let Some(version) = identity.cpp_std_version() {
        writeln!(out, "#define WAFFLE_CPP_STD_VER {}", version)?;
    }
    if registry.is_compiler(Compiler::Msvc) {
        writeln!(out, "#if !defined(__has_include)\n#define __has_include(path) 0\n#endif")?;
    }
    writeln!(out)?;

    for (attribute, expansion) in registry.attributes() {
        write_attribute(out, registry, attribute, expansion)?;
    }
    writeln!(out)?;

    write_warning_macros(out, registry)?;

    writeln!(out, "\n#endif /* {} */", HEADER_GUARD)
}

fn write_attribute<W: Write>(
    out: &mut W,
    registry: &CapabilityRegistry,
    attribute: Attribute,
    expansion: &Expansion,
) -> fmt::Result {
    if expansion.origin() == Origin::Predefined {
        return writeln!(out, "/* {} is defined by the build. */", attribute.name());
    }
    let signature = macro_signature(attribute);

    writeln!(out, "#ifndef {}", attribute.name())?;
    match attribute.language() {
        Some(language) => {
            writeln!(out, "#ifdef {}", language_marker(language))?;
            if attribute == Attribute::Fallthrough {
                out.write_str(CXX_FALLTHROUGH)?;
            } else {
                let own = registry.attribute_for_language(attribute, language);
                write_define(out, &signature, own.body())?;
            }
            writeln!(out, "#else")?;
            let plain = registry.attribute_for_language(attribute, Language::C);
            if !(attribute == Attribute::Fallthrough && plain.is_empty()) {
                write_define(out, &signature, plain.body())?;
            }
            writeln!(out, "#endif")?;
            if attribute == Attribute::Fallthrough {
                writeln!(out, "#ifndef FALLTHROUGH\n#define FALLTHROUGH\n#endif")?;
            }
        }
        None => write_define(out, &signature, expansion.body())?,
    }
    writeln!(out, "#endif")
}

fn write_define<W: Write>(out: &mut W, signature: &str, body: &str) -> fmt::Result {
    if body.is_empty() {
        writeln!(out, "#define {}", signature)
    } else {
        writeln!(out, "#define {} {}", signature, body)
    }
}

fn language_marker(language: Language) -> &'static str {
    if language.is_objc() {
        "__OBJC__"
    } else {
        "__cplusplus"
    }
}

fn macro_signature(attribute: Attribute) -> String {
    if attribute.is_function_like() {
        format!("{}({})", attribute.name(), attribute.params().join(", "))
    } else {
        attribute.name().to_owned()
    }
}

fn write_warning_macros<W: Write>(out: &mut W, registry: &CapabilityRegistry) -> fmt::Result {
    out.write_str(WARNING_HELPERS)?;

    let families = [
        ("IGNORE_GCC_WARNINGS", DiagnosticScope::Gcc),
        ("IGNORE_CLANG_WARNINGS", DiagnosticScope::Clang),
        ("IGNORE_WARNINGS", DiagnosticScope::Any),
    ];
    for (family, scope) in families.iter() {
        match scope.namespace(registry.identity()) {
            Some(namespace) => writeln!(
                out,
                "#define {0}_BEGIN(warning) _WAFFLE_IGNORE_WARNINGS_BEGIN({1}, warning)\n\
                 #define {0}_END _WAFFLE_IGNORE_WARNINGS_END_IMPL({1})",
                family, namespace
            )?,
            None => writeln!(out, "#define {0}_BEGIN(warning)\n#define {0}_END", family)?,
        }
    }

    // Named brackets are resolved already, `__has_warning` included.
    for allowance in Allowance::ALL.iter() {
        let bracket = registry.allowance(*allowance);
        write_define(out, &format!("{}_BEGIN", allowance.name()), &bracket.begin_text())?;
        write_define(out, &format!("{}_END", allowance.name()), &bracket.end_text())?;
    }
    Ok(())
}

/// `pub const` items with the same names in every configuration.
pub fn render_rust(registry: &CapabilityRegistry) -> String {
    RustSource(registry).to_string()
}

pub fn write_rust<W: Write>(out: &mut W, registry: &CapabilityRegistry) -> fmt::Result {
    let identity = registry.identity();
    writeln!(out, "// Generated by waffle-compiler. Do not edit.\n")?;

    for (name, value) in registry.flags() {
        let name = name.strip_prefix("WAFFLE_").unwrap_or(name);
        writeln!(out, "pub const {}: bool = {};", name, value)?;
    }
    writeln!(
        out,
        "pub const GCC_VERSION: Option<u32> = {:?};",
        identity.gcc_version()
    )?;
    writeln!(
        out,
        "pub const MSVC_VERSION: Option<i64> = {:?};",
        identity.msvc_version()
    )?;
    writeln!(
        out,
        "pub const CPP_STD_VERSION: Option<u32> = {:?};",
        identity.cpp_std_version()
    )?;

    writeln!(out, "\n/// Every flag by its full name.\npub const FLAGS: &[(&str, bool)] = &[")?;
    for (name, value) in registry.flags() {
        writeln!(out, "    ({:?}, {}),", name, value)?;
    }
    writeln!(
        out,
        "];\n\n/// Every attribute macro and its replacement text.\npub const ATTRIBUTES: &[(&str, &str)] = &["
    )?;
    for (attribute, expansion) in registry.attributes() {
        writeln!(out, "    ({:?}, {:?}),", attribute.name(), expansion.body())?;
    }
    writeln!(out, "];")
}

/// `cargo:rustc-cfg` lines for active tags plus the `rustc-check-cfg` declarations
/// of every possible value.
pub fn cargo_directives(registry: &CapabilityRegistry) -> Vec<String> {
    fn values<'a>(names: impl Iterator<Item = &'a str>) -> String {
        names
            .map(|n| format!("\"{}\"", n.to_ascii_lowercase()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    let mut directives = vec![
        format!(
            "cargo:rustc-check-cfg=cfg(waffle_compiler, values({}))",
            values(Compiler::ALL.iter().map(|c| c.name()))
        ),
        format!(
            "cargo:rustc-check-cfg=cfg(waffle_supports, values({}))",
            values(Feature::ALL.iter().map(|f| f.name()))
        ),
        format!(
            "cargo:rustc-check-cfg=cfg(waffle_quirk, values({}))",
            values(Quirk::ALL.iter().map(|q| q.name()))
        ),
        format!(
            "cargo:rustc-check-cfg=cfg(waffle_sanitize, values({}))",
            values(Sanitizer::ALL.iter().map(|s| s.name()))
        ),
    ];

    let mut cfg = |key: &str, name: &str| {
        directives.push(format!(
            "cargo:rustc-cfg={}=\"{}\"",
            key,
            name.to_ascii_lowercase()
        ))
    };
    for compiler in registry.identity().tags() {
        cfg("waffle_compiler", compiler.name());
    }
    for feature in Feature::ALL.iter().filter(|f| registry.supports(**f)) {
        cfg("waffle_supports", feature.name());
    }
    for quirk in Quirk::ALL.iter().filter(|q| registry.requires_quirk(**q)) {
        cfg("waffle_quirk", quirk.name());
    }
    for sanitizer in Sanitizer::ALL.iter().filter(|s| registry.sanitizer_enabled(**s)) {
        cfg("waffle_sanitize", sanitizer.name());
    }
    directives
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Environment, Preset};

    fn registry(env: Environment) -> CapabilityRegistry {
        CapabilityRegistry::resolve(env).unwrap()
    }

    #[test]
    fn header_defines_every_flag_and_attribute() {
        let header = render_header(&registry(Preset::Gcc.environment()));
        assert!(header.contains("#define WAFFLE_COMPILER_GCC 1"));
        assert!(header.contains("#define WAFFLE_COMPILER_CLANG 0"));
        assert!(header.contains("#define ASAN_ENABLED 0"));
        assert!(header.contains("#define GCC_VERSION 130200"));
        assert!(header.contains("#define LIKELY(x) __builtin_expect(!!(x), 1)"));
        assert!(header.contains("#define UNUSED_PARAM(variable) (void)variable"));
        for attribute in Attribute::ALL.iter() {
            assert!(header.contains(&format!("#ifndef {}\n", attribute.name())), "{}", attribute);
        }
        assert!(header.starts_with("/* Generated"));
        assert!(header.trim_end().ends_with("#endif /* WAFFLE_COMPILER_H */"));
    }

    #[test]
    fn header_leaves_predefined_attributes_alone() {
        let env = Preset::Clang.environment().with_define("NEVER_INLINE", "");
        let header = render_header(&registry(env));
        assert!(header.contains("/* NEVER_INLINE is defined by the build. */"));
        assert!(!header.contains("#define NEVER_INLINE"));
    }

    #[test]
    fn header_warning_families() {
        let header = render_header(&registry(Preset::Msvc.environment()));
        assert!(header.contains("#define IGNORE_WARNINGS_BEGIN(warning)\n#define IGNORE_WARNINGS_END\n"));
        assert!(header.contains("#define __has_include(path) 0"));

        let header = render_header(&registry(Preset::Clang.environment()));
        assert!(header.contains(
            "#define IGNORE_CLANG_WARNINGS_BEGIN(warning) _WAFFLE_IGNORE_WARNINGS_BEGIN(clang, warning)\n\
             #define IGNORE_CLANG_WARNINGS_END _WAFFLE_IGNORE_WARNINGS_END_IMPL(clang)\n"
        ));
        assert!(header.contains("#define IGNORE_GCC_WARNINGS_BEGIN(warning)\n"));
        assert!(header.contains("#define ALLOW_UNUSED_PARAMETERS_END _Pragma(\"GCC diagnostic pop\")"));
    }

    #[test]
    fn rust_constants_have_stable_names() {
        let names = |source: String| -> Vec<String> {
            source
                .lines()
                .filter(|l| l.starts_with("pub const"))
                .map(|l| l.split(':').next().unwrap_or_default().to_owned())
                .collect()
        };
        let clang = names(render_rust(&registry(Preset::Clang.environment())));
        let unknown = names(render_rust(&registry(Environment::new())));
        assert_eq!(clang, unknown);
        assert!(clang.contains(&"pub const COMPILER_CLANG".to_owned()));
    }

    #[test]
    fn rust_constants_values() {
        let source = render_rust(&registry(Preset::Gcc.environment()));
        assert!(source.contains("pub const COMPILER_GCC: bool = true;"));
        assert!(source.contains("pub const COMPILER_SUPPORTS_C_STATIC_ASSERT: bool = true;"));
        assert!(source.contains("pub const GCC_VERSION: Option<u32> = Some(130200);"));
        assert!(source.contains("(\"ALWAYS_INLINE\", \"inline\"),"));
    }

    #[test]
    fn cfg_directives() {
        let directives = cargo_directives(&registry(Preset::Clang.environment()));
        assert!(directives.contains(&"cargo:rustc-cfg=waffle_compiler=\"clang\"".to_owned()));
        assert!(directives.contains(&"cargo:rustc-cfg=waffle_compiler=\"gcc_compatible\"".to_owned()));
        assert!(!directives.contains(&"cargo:rustc-cfg=waffle_compiler=\"gcc\"".to_owned()));
        assert!(directives.contains(&"cargo:rustc-cfg=waffle_supports=\"builtin_bit_cast\"".to_owned()));
        assert!(directives[0].starts_with("cargo:rustc-check-cfg=cfg(waffle_compiler, values(\"clang\""));

        let directives = cargo_directives(&registry(Environment::new()));
        assert_eq!(
            directives
                .iter()
                .filter(|d| d.starts_with("cargo:rustc-cfg="))
                .collect::<Vec<_>>(),
            vec!["cargo:rustc-cfg=waffle_quirk=\"considers_unreachable_code\""]
        );
    }

    #[test]
    fn header_checks_warnings_where_they_are_used() {
        let header = render_header(&registry(Preset::Clang.environment()));
        assert!(header.contains(
            "#if defined(__has_warning)\n\
             #define _WAFFLE_IGNORE_WARNINGS_BEGIN_CHECKED(compiler, warning) \
             _WAFFLE_IGNORE_WARNINGS_BEGIN_COND(__has_warning(warning), compiler, warning)\n\
             #else\n"
        ));
        assert!(header.contains("#define _WAFFLE_IGNORE_WARNINGS_BEGIN_IMPL_0(compiler, warning)\n"));
        assert!(header.contains(
            "#define _WAFFLE_IGNORE_WARNINGS_BEGIN_COND(cond, compiler, warning) \
             _Pragma(_WAFFLE_STRINGIZE(compiler diagnostic push)) \
             _WAFFLE_CONCAT(_WAFFLE_IGNORE_WARNINGS_BEGIN_IMPL_, cond)(compiler, warning)\n"
        ));
        assert!(header.contains(
            "#define IGNORE_WARNINGS_BEGIN(warning) _WAFFLE_IGNORE_WARNINGS_BEGIN(GCC, warning)\n"
        ));
    }

    #[test]
    fn header_guards_extern_c_with_cplusplus() {
        // A C build still has to serve C++ includers.
        let header = render_header(&registry(Preset::Clang.environment()));
        assert!(header.contains(
            "#ifndef WAFFLE_EXTERN_C_BEGIN\n\
             #ifdef __cplusplus\n\
             #define WAFFLE_EXTERN_C_BEGIN extern \"C\" {\n\
             #else\n\
             #define WAFFLE_EXTERN_C_BEGIN\n\
             #endif\n\
             #endif\n"
        ));
        assert!(header.contains("#ifdef __cplusplus\n#define WAFFLE_EXTERN_C_END }\n#else\n"));

        let cxx = Preset::Clang.environment().for_language(Language::Cxx);
        let cxx_header = render_header(&registry(cxx));
        let extern_c = |text: &str| -> Option<String> {
            let start = text.find("#ifndef WAFFLE_EXTERN_C_BEGIN")?;
            let end = text.find("#ifndef FALLTHROUGH")?;
            Some(text[start..end].to_owned())
        };
        assert_eq!(extern_c(&cxx_header), extern_c(&header));
    }

    #[test]
    fn header_guards_objc_spellings() {
        let header = render_header(&registry(Preset::Gcc.environment()));
        assert!(header.contains(
            "#ifndef OBJC_CLASS\n#ifdef __OBJC__\n#define OBJC_CLASS @class\n#else\n#define OBJC_CLASS class\n#endif\n"
        ));
        assert!(header.contains("#define OBJC_PROTOCOL(protocolName) class protocolName\n"));
    }

    #[test]
    fn header_fallthrough_follows_the_includer() {
        let header = render_header(&registry(Preset::Gcc.environment()));
        assert!(header.contains(
            "#ifndef FALLTHROUGH\n#ifdef __cplusplus\n#if defined(__has_cpp_attribute)\n\
             #if __has_cpp_attribute(fallthrough)\n#define FALLTHROUGH [[fallthrough]]\n"
        ));
        assert!(header.contains("#else\n#define FALLTHROUGH __attribute__ ((fallthrough))\n#endif\n"));
        assert!(header.contains("#ifndef FALLTHROUGH\n#define FALLTHROUGH\n#endif\n"));

        let header = render_header(&registry(Preset::Msvc.environment()));
        assert!(header.contains("#define FALLTHROUGH [[gnu::fallthrough]]\n#endif\n#endif\n#else\n#endif\n"));
    }
}
