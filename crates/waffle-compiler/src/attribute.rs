//! Portable attribute macros.
//!
//! Every attribute resolves in the same order: a definition the build already made
//! wins; then the GCC/Clang spelling; then the MSVC `__declspec` spelling; then a
//! no-op or the plain keyword the attribute strengthens. Some attributes carve out
//! exceptions from the GCC-compatible step, see [`Attribute::AlwaysInline`].

use std::fmt;
use std::str::FromStr;

use crate::environment::{Environment, Language, Mechanism};
use crate::error::UnknownName;
use crate::identity::{Compiler, CompilerIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Attribute {
    /// Forced inlining. Only granted for GCC-compatible optimized release builds that
    /// are neither MinGW nor GCC proper with ASan: GCC refuses to inline an
    /// `always_inline` callee into a `no_sanitize_address` caller
    /// (<https://gcc.gnu.org/bugzilla/show_bug.cgi?id=67368>).
    AlwaysInline,
    AlwaysInlineExceptMsvc,
    ExternCBegin,
    ExternCEnd,
    Fallthrough,
    Likely,
    Unlikely,
    NeverInline,
    NoReturn,
    NoReturnWithValue,
    NotTailCalled,
    ReturnsNonnull,
    ObjcClass,
    ObjcProtocol,
    PureFunction,
    UnusedInstanceVariable,
    UnusedFunction,
    ReferencedFromAsm,
    UnusedLabel,
    UnusedParam,
    UnusedVariable,
    WarnUnusedReturn,
    DebuggerAnnotationMarker,
    SuppressAsan,
    SuppressTsan,
}

impl Attribute {
    pub const ALL: [Attribute; 25] = [
        Attribute::AlwaysInline,
        Attribute::AlwaysInlineExceptMsvc,
        Attribute::ExternCBegin,
        Attribute::ExternCEnd,
        Attribute::Fallthrough,
        Attribute::Likely,
        Attribute::Unlikely,
        Attribute::NeverInline,
        Attribute::NoReturn,
        Attribute::NoReturnWithValue,
        Attribute::NotTailCalled,
        Attribute::ReturnsNonnull,
        Attribute::ObjcClass,
        Attribute::ObjcProtocol,
        Attribute::PureFunction,
        Attribute::UnusedInstanceVariable,
        Attribute::UnusedFunction,
        Attribute::ReferencedFromAsm,
        Attribute::UnusedLabel,
        Attribute::UnusedParam,
        Attribute::UnusedVariable,
        Attribute::WarnUnusedReturn,
        Attribute::DebuggerAnnotationMarker,
        Attribute::SuppressAsan,
        Attribute::SuppressTsan,
    ];

    /// Macro name.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::AlwaysInline => "ALWAYS_INLINE",
            Attribute::AlwaysInlineExceptMsvc => "ALWAYS_INLINE_EXCEPT_MSVC",
            Attribute::ExternCBegin => "WAFFLE_EXTERN_C_BEGIN",
            Attribute::ExternCEnd => "WAFFLE_EXTERN_C_END",
            Attribute::Fallthrough => "FALLTHROUGH",
            Attribute::Likely => "LIKELY",
            Attribute::Unlikely => "UNLIKELY",
            Attribute::NeverInline => "NEVER_INLINE",
            Attribute::NoReturn => "NO_RETURN",
            Attribute::NoReturnWithValue => "NO_RETURN_WITH_VALUE",
            Attribute::NotTailCalled => "NOT_TAIL_CALLED",
            Attribute::ReturnsNonnull => "RETURNS_NONNULL",
            Attribute::ObjcClass => "OBJC_CLASS",
            Attribute::ObjcProtocol => "OBJC_PROTOCOL",
            Attribute::PureFunction => "PURE_FUNCTION",
            Attribute::UnusedInstanceVariable => "WK_UNUSED_INSTANCE_VARIABLE",
            Attribute::UnusedFunction => "UNUSED_FUNCTION",
            Attribute::ReferencedFromAsm => "REFERENCED_FROM_ASM",
            Attribute::UnusedLabel => "UNUSED_LABEL",
            Attribute::UnusedParam => "UNUSED_PARAM",
            Attribute::UnusedVariable => "UNUSED_VARIABLE",
            Attribute::WarnUnusedReturn => "WARN_UNUSED_RETURN",
            Attribute::DebuggerAnnotationMarker => "DEBUGGER_ANNOTATION_MARKER",
            Attribute::SuppressAsan => "SUPPRESS_ASAN",
            Attribute::SuppressTsan => "SUPPRESS_TSAN",
        }
    }

    /// Parameters of function-like macros; empty for object-like ones.
    pub fn params(self) -> &'static [&'static str] {
        match self {
            Attribute::Likely | Attribute::Unlikely => &["x"],
            Attribute::ObjcProtocol => &["protocolName"],
            Attribute::UnusedLabel => &["label"],
            Attribute::UnusedParam | Attribute::UnusedVariable => &["variable"],
            Attribute::DebuggerAnnotationMarker => &["name"],
            _ => &[],
        }
    }

    pub fn is_function_like(self) -> bool {
        !self.params().is_empty()
    }

    /// The source language whose marker changes this attribute's spelling, if any.
    /// Objective-C++ units take both the C++ and the Objective-C spellings.
    pub fn language(self) -> Option<Language> {
        match self {
            Attribute::ExternCBegin | Attribute::ExternCEnd | Attribute::Fallthrough => {
                Some(Language::Cxx)
            }
            Attribute::ObjcClass | Attribute::ObjcProtocol => Some(Language::ObjC),
            _ => None,
        }
    }

    pub(crate) fn resolve(self, cx: &AttributeContext<'_>) -> Expansion {
        if let Some(body) = cx.env.value(self.name()) {
            return Expansion::new(Origin::Predefined, body);
        }
        match self.toolchain_spelling(cx) {
            Some(body) => Expansion::new(Origin::Toolchain, body),
            None => Expansion::new(Origin::Fallback, self.fallback(cx)),
        }
    }

    fn toolchain_spelling(self, cx: &AttributeContext<'_>) -> Option<String> {
        let gnu = cx.is(Compiler::GccCompatible);
        let msvc = cx.is(Compiler::Msvc);
        let spelling = match self {
            Attribute::AlwaysInline => {
                let release = !cx.env.is_debug();
                if gnu
                    && release
                    && cx.env.is_optimized()
                    && !cx.is(Compiler::MinGW)
                    && !(cx.is(Compiler::Gcc) && cx.asan)
                {
                    "inline __attribute__((__always_inline__))"
                } else if msvc && release {
                    "__forceinline"
                } else {
                    return None;
                }
            }
            Attribute::AlwaysInlineExceptMsvc if msvc => "inline",
            Attribute::ExternCBegin if cx.language_is_cxx() => "extern \"C\" {",
            Attribute::ExternCEnd if cx.language_is_cxx() => "}",
            Attribute::Fallthrough => return fallthrough(cx).map(str::to_owned),
            Attribute::Likely if gnu => "__builtin_expect(!!(x), 1)",
            Attribute::Unlikely if gnu => "__builtin_expect(!!(x), 0)",
            Attribute::NeverInline if gnu => "__attribute__((__noinline__))",
            Attribute::NeverInline if msvc => "__declspec(noinline)",
            Attribute::NoReturn if gnu => "__attribute__((__noreturn__))",
            Attribute::NoReturn if msvc => "__declspec(noreturn)",
            Attribute::NoReturnWithValue if gnu => "NO_RETURN",
            Attribute::NotTailCalled if cx.env.has_attribute("not_tail_called") => {
                "__attribute__((not_tail_called))"
            }
            Attribute::ReturnsNonnull if gnu => "__attribute__((returns_nonnull))",
            Attribute::ObjcClass if cx.language_is_objc() => "@class",
            Attribute::ObjcProtocol if cx.language_is_objc() => {
                "@protocol protocolName; using protocolName = NSObject<protocolName>"
            }
            Attribute::PureFunction if gnu => "__attribute__((__pure__))",
            Attribute::UnusedInstanceVariable | Attribute::UnusedFunction if gnu => {
                "__attribute__((unused))"
            }
            Attribute::ReferencedFromAsm if gnu => "__attribute__((__used__))",
            Attribute::UnusedLabel if msvc => "if (false) goto label",
            Attribute::WarnUnusedReturn if gnu => "__attribute__((__warn_unused_result__))",
            Attribute::DebuggerAnnotationMarker if cx.is(Compiler::Gcc) => {
                "__attribute__((__no_reorder__)) void name(void) { __asm__(\"\"); }"
            }
            Attribute::SuppressAsan if cx.asan => "__attribute__((no_sanitize_address))",
            Attribute::SuppressTsan if cx.tsan => "__attribute__((no_sanitize_thread))",
            _ => return None,
        };
        Some(spelling.to_owned())
    }

    fn fallback(self, cx: &AttributeContext<'_>) -> &'static str {
        match self {
            Attribute::AlwaysInline => "inline",
            Attribute::AlwaysInlineExceptMsvc => "ALWAYS_INLINE",
            Attribute::Likely | Attribute::Unlikely => "(x)",
            Attribute::NoReturnWithValue if !cx.is(Compiler::Msvc) => "NO_RETURN",
            Attribute::ObjcClass => "class",
            Attribute::ObjcProtocol => "class protocolName",
            Attribute::UnusedLabel => "UNUSED_PARAM(&& label)",
            Attribute::UnusedParam => "(void)variable",
            Attribute::UnusedVariable => "UNUSED_PARAM(variable)",
            _ => "",
        }
    }
}

/// C++ tries the standard attribute spellings in order; C falls back to the GNU
/// attribute. Objective-C++ counts as C++ here.
fn fallthrough(cx: &AttributeContext<'_>) -> Option<&'static str> {
    if cx.language_is_cxx() {
        if !cx.env.has_mechanism(Mechanism::HasCppAttribute) {
            return None;
        }
        [
            ("fallthrough", "[[fallthrough]]"),
            ("clang::fallthrough", "[[clang::fallthrough]]"),
            ("gnu::fallthrough", "[[gnu::fallthrough]]"),
        ]
        .iter()
        .find(|(probe, _)| cx.env.has_cpp_attribute(probe))
        .map(|(_, spelling)| *spelling)
    } else if cx.is(Compiler::GccCompatible) && cx.env.has_attribute("fallthrough") {
        Some("__attribute__ ((fallthrough))")
    } else {
        None
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownName::new("attribute", s))
    }
}

/// Where an expansion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The build defined the macro itself; it is left alone.
    Predefined,
    /// A toolchain-specific spelling.
    Toolchain,
    /// The safe baseline every compiler accepts.
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    origin: Origin,
    body: String,
}

impl Expansion {
    fn new(origin: Origin, body: impl Into<String>) -> Self {
        Self {
            origin,
            body: body.into(),
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Replacement text; may name other attribute macros, e.g. `NO_RETURN`.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl fmt::Display for Expansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body)
    }
}

pub(crate) struct AttributeContext<'a> {
    pub env: &'a Environment,
    pub identity: &'a CompilerIdentity,
    pub asan: bool,
    pub tsan: bool,
}

impl AttributeContext<'_> {
    fn is(&self, compiler: Compiler) -> bool {
        self.identity.is(compiler)
    }

    fn language_is_cxx(&self) -> bool {
        self.env.language().is_cxx()
    }

    fn language_is_objc(&self) -> bool {
        self.env.language().is_objc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Preset;

    fn resolve(env: &Environment, attribute: Attribute) -> Expansion {
        resolve_with(env, attribute, false)
    }

    fn resolve_with(env: &Environment, attribute: Attribute, asan: bool) -> Expansion {
        let identity = CompilerIdentity::detect(env);
        attribute.resolve(&AttributeContext {
            env,
            identity: &identity,
            asan,
            tsan: false,
        })
    }

    fn release(preset: Preset) -> Environment {
        preset
            .environment()
            .with_define("NDEBUG", "1")
            .with_define("__OPTIMIZE__", "1")
    }

    #[test]
    fn always_inline_granted_for_optimized_release() {
        let forced = "inline __attribute__((__always_inline__))";
        assert_eq!(resolve(&release(Preset::Gcc), Attribute::AlwaysInline).body(), forced);
        assert_eq!(resolve(&release(Preset::Clang), Attribute::AlwaysInline).body(), forced);
        assert_eq!(
            resolve(&release(Preset::Msvc), Attribute::AlwaysInline).body(),
            "__forceinline"
        );
    }

    #[test]
    fn always_inline_exceptions() {
        let plain = |env: &Environment, asan| {
            let expansion = resolve_with(env, Attribute::AlwaysInline, asan);
            expansion.origin() == Origin::Fallback && expansion.body() == "inline"
        };
        // Debug builds.
        assert!(plain(&Preset::Gcc.environment(), false));
        assert!(plain(&Preset::Msvc.environment(), false));
        // Release without optimizations.
        let unoptimized = Preset::Gcc
            .environment()
            .with_define("NDEBUG", "1")
            .with_define("RELEASE_WITHOUT_OPTIMIZATIONS", "1");
        assert!(plain(&unoptimized, false));
        // MinGW.
        assert!(plain(&release(Preset::MinGW), false));
        // GCC proper under ASan, but not Clang under ASan.
        assert!(plain(&release(Preset::Gcc), true));
        assert!(!plain(&release(Preset::Clang), true));
    }

    #[test]
    fn predefined_definition_wins() {
        let env = release(Preset::Gcc).with_define("ALWAYS_INLINE", "inline");
        let expansion = resolve(&env, Attribute::AlwaysInline);
        assert_eq!(expansion.origin(), Origin::Predefined);
        assert_eq!(expansion.body(), "inline");
    }

    #[test]
    fn always_inline_except_msvc() {
        assert_eq!(
            resolve(&release(Preset::Msvc), Attribute::AlwaysInlineExceptMsvc).body(),
            "inline"
        );
        assert_eq!(
            resolve(&release(Preset::Gcc), Attribute::AlwaysInlineExceptMsvc).body(),
            "ALWAYS_INLINE"
        );
    }

    #[test]
    fn fallthrough_in_c() {
        assert_eq!(
            resolve(&Preset::Gcc.environment(), Attribute::Fallthrough).body(),
            "__attribute__ ((fallthrough))"
        );
        let no_has_attribute = Preset::Gcc
            .environment()
            .without_mechanism(Mechanism::HasAttribute);
        assert!(resolve(&no_has_attribute, Attribute::Fallthrough).is_empty());
        assert!(resolve(&Preset::Msvc.environment(), Attribute::Fallthrough).is_empty());
    }

    #[test]
    fn fallthrough_in_cxx_tries_standard_spellings_in_order() {
        let cxx = Preset::Clang
            .environment()
            .with_define("__cplusplus", "201703L")
            .with_probe(Mechanism::HasCppAttribute, "clang::fallthrough")
            .with_probe(Mechanism::HasCppAttribute, "gnu::fallthrough");
        assert_eq!(
            resolve(&cxx, Attribute::Fallthrough).body(),
            "[[clang::fallthrough]]"
        );
        let cxx = cxx.with_probe(Mechanism::HasCppAttribute, "fallthrough");
        assert_eq!(resolve(&cxx, Attribute::Fallthrough).body(), "[[fallthrough]]");

        // C++ never falls back to the GNU attribute form.
        let bare = Preset::Gcc.environment().with_define("__cplusplus", "201103L");
        assert!(resolve(&bare, Attribute::Fallthrough).is_empty());
    }

    #[test]
    fn msvc_declspec_spellings() {
        let msvc = Preset::Msvc.environment();
        assert_eq!(resolve(&msvc, Attribute::NeverInline).body(), "__declspec(noinline)");
        assert_eq!(resolve(&msvc, Attribute::NoReturn).body(), "__declspec(noreturn)");
        assert!(resolve(&msvc, Attribute::NoReturnWithValue).is_empty());
        assert!(resolve(&msvc, Attribute::PureFunction).is_empty());
        assert_eq!(resolve(&msvc, Attribute::UnusedLabel).body(), "if (false) goto label");
    }

    #[test]
    fn gcc_only_debugger_marker() {
        assert!(!resolve(&Preset::Gcc.environment(), Attribute::DebuggerAnnotationMarker).is_empty());
        assert!(resolve(&Preset::Clang.environment(), Attribute::DebuggerAnnotationMarker).is_empty());
    }

    #[test]
    fn language_dependent_spellings() {
        let objcxx = Environment::new()
            .with_define("__OBJC__", "1")
            .with_define("__cplusplus", "201703L");
        assert_eq!(resolve(&objcxx, Attribute::ObjcClass).body(), "@class");
        assert_eq!(resolve(&objcxx, Attribute::ExternCBegin).body(), "extern \"C\" {");
        assert_eq!(resolve(&objcxx, Attribute::ExternCEnd).body(), "}");
        let c = Environment::new();
        assert_eq!(resolve(&c, Attribute::ObjcClass).body(), "class");
        assert_eq!(resolve(&c, Attribute::ObjcProtocol).body(), "class protocolName");
        assert!(resolve(&c, Attribute::ExternCBegin).is_empty());
    }

    #[test]
    fn language_markers_per_attribute() {
        for attribute in Attribute::ALL.iter() {
            let c = resolve(&Environment::new(), *attribute);
            let marked = Environment::new()
                .with_define("__OBJC__", "1")
                .with_define("__cplusplus", "201703L")
                .with_mechanism(Mechanism::HasCppAttribute)
                .with_probe(Mechanism::HasCppAttribute, "fallthrough");
            let marked = resolve(&marked, *attribute);
            assert_eq!(c != marked, attribute.language().is_some(), "{}", attribute);
        }
        assert_eq!(Attribute::Fallthrough.language(), Some(Language::Cxx));
        assert_eq!(Attribute::ObjcProtocol.language(), Some(Language::ObjC));
    }

    #[test]
    fn sanitizer_suppression() {
        let env = Preset::Clang.environment();
        assert_eq!(
            resolve_with(&env, Attribute::SuppressAsan, true).body(),
            "__attribute__((no_sanitize_address))"
        );
        assert!(resolve(&env, Attribute::SuppressAsan).is_empty());
        assert!(resolve_with(&env, Attribute::SuppressTsan, true).is_empty());
    }

    #[test]
    fn unknown_compiler_gets_fallbacks_only() {
        let env = Environment::new().with_define("NDEBUG", "1");
        for attribute in Attribute::ALL.iter() {
            assert_eq!(
                resolve(&env, *attribute).origin(),
                Origin::Fallback,
                "{}",
                attribute
            );
        }
    }

    #[test]
    fn function_like_macros() {
        assert_eq!(Attribute::Likely.params(), &["x"]);
        assert!(!Attribute::NoReturn.is_function_like());
        assert_eq!("likely".parse::<Attribute>(), Ok(Attribute::Likely));
    }
}
