//! The read-only build-time surface a toolchain hands us: predefined markers and the
//! answers of its feature-test operators.
//!
//! An [`Environment`] is plain data. It can come from a real compiler (see
//! [`crate::probe`]), from a [`Preset`], or be assembled by hand for simulation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::UnknownName;

/// Feature-test operators a compiler may or may not expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mechanism {
    HasBuiltin,
    HasFeature,
    HasDeclspecAttribute,
    HasAttribute,
    HasCppAttribute,
    HasWarning,
}

impl Mechanism {
    pub const ALL: [Mechanism; 6] = [
        Mechanism::HasBuiltin,
        Mechanism::HasFeature,
        Mechanism::HasDeclspecAttribute,
        Mechanism::HasAttribute,
        Mechanism::HasCppAttribute,
        Mechanism::HasWarning,
    ];

    /// The preprocessor operator spelling, e.g. `__has_feature`.
    pub fn operator(self) -> &'static str {
        match self {
            Mechanism::HasBuiltin => "__has_builtin",
            Mechanism::HasFeature => "__has_feature",
            Mechanism::HasDeclspecAttribute => "__has_declspec_attribute",
            Mechanism::HasAttribute => "__has_attribute",
            Mechanism::HasCppAttribute => "__has_cpp_attribute",
            Mechanism::HasWarning => "__has_warning",
        }
    }

    pub fn from_operator(operator: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.operator() == operator)
    }
}

/// Source language of the translation unit being described.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    C,
    Cxx,
    ObjC,
    ObjCxx,
}

impl Language {
    pub fn is_cxx(self) -> bool {
        matches!(self, Language::Cxx | Language::ObjCxx)
    }

    pub fn is_objc(self) -> bool {
        matches!(self, Language::ObjC | Language::ObjCxx)
    }
}

impl FromStr for Language {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "c" => Ok(Language::C),
            "c++" | "cxx" | "cpp" => Ok(Language::Cxx),
            "objc" | "objective-c" => Ok(Language::ObjC),
            "objc++" | "objective-c++" => Ok(Language::ObjCxx),
            _ => Err(UnknownName::new("language", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    defines: BTreeMap<String, String>,
    /// A mechanism absent from this map is not exposed by the compiler at all.
    probes: BTreeMap<Mechanism, BTreeSet<String>>,
}

impl Environment {
    /// An environment with no markers and no feature-test operators.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_define(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_define(name, value);
        self
    }

    pub fn without_define(mut self, name: &str) -> Self {
        self.remove_define(name);
        self
    }

    /// The same compiler as seen from a `language` translation unit. Sets or clears
    /// `__cplusplus` and `__OBJC__`; a `__cplusplus` value already present is kept.
    pub fn for_language(mut self, language: Language) -> Self {
        let mut mark = |name: &str, on: bool, value: &str| {
            if !on {
                self.defines.remove(name);
            } else if !self.defines.contains_key(name) {
                self.defines.insert(name.to_owned(), value.to_owned());
            }
        };
        mark("__cplusplus", language.is_cxx(), "201703L");
        mark("__OBJC__", language.is_objc(), "1");
        self
    }

    pub fn with_mechanism(mut self, mechanism: Mechanism) -> Self {
        self.insert_mechanism(mechanism);
        self
    }

    pub fn without_mechanism(mut self, mechanism: Mechanism) -> Self {
        self.probes.remove(&mechanism);
        self
    }

    /// Records that `mechanism(name)` answers true. Implies the mechanism exists.
    pub fn with_probe(mut self, mechanism: Mechanism, name: impl Into<String>) -> Self {
        self.insert_probe(mechanism, name);
        self
    }

    pub fn insert_define(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.defines.insert(name.into(), value.into());
    }

    pub fn remove_define(&mut self, name: &str) -> Option<String> {
        self.defines.remove(name)
    }

    pub fn insert_mechanism(&mut self, mechanism: Mechanism) {
        self.probes.entry(mechanism).or_default();
    }

    pub fn insert_probe(&mut self, mechanism: Mechanism, name: impl Into<String>) {
        self.probes.entry(mechanism).or_default().insert(name.into());
    }

    pub fn defines(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defines.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.defines.contains_key(name)
    }

    /// Raw replacement text of a marker.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.defines.get(name).map(String::as_str)
    }

    /// Value of a marker read as a C integer constant.
    pub fn integer(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(parse_c_integer)
    }

    /// `defined NAME && NAME`: defined with a non-zero integer value.
    pub fn truthy(&self, name: &str) -> bool {
        self.integer(name).map_or(false, |v| v != 0)
    }

    pub fn has_mechanism(&self, mechanism: Mechanism) -> bool {
        self.probes.contains_key(&mechanism)
    }

    /// Answer of `mechanism(name)`; false if the compiler has no such operator.
    pub fn probe(&self, mechanism: Mechanism, name: &str) -> bool {
        self.probes
            .get(&mechanism)
            .map_or(false, |names| names.contains(name))
    }

    pub fn probes(&self, mechanism: Mechanism) -> impl Iterator<Item = &str> {
        self.probes
            .get(&mechanism)
            .into_iter()
            .flat_map(|names| names.iter().map(String::as_str))
    }

    pub fn has_builtin(&self, name: &str) -> bool {
        self.probe(Mechanism::HasBuiltin, name)
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.probe(Mechanism::HasFeature, name)
    }

    pub fn has_declspec_attribute(&self, name: &str) -> bool {
        self.probe(Mechanism::HasDeclspecAttribute, name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.probe(Mechanism::HasAttribute, name)
    }

    pub fn has_cpp_attribute(&self, name: &str) -> bool {
        self.probe(Mechanism::HasCppAttribute, name)
    }

    pub fn has_warning(&self, name: &str) -> bool {
        self.probe(Mechanism::HasWarning, name)
    }

    /// Resolves a capability flag. A marker already carrying the flag's own name wins
    /// over whatever detection computed.
    pub fn resolve_flag(&self, name: &str, computed: bool) -> bool {
        if self.is_defined(name) {
            self.truthy(name)
        } else {
            computed
        }
    }

    pub fn language(&self) -> Language {
        match (self.is_defined("__cplusplus"), self.is_defined("__OBJC__")) {
            (true, true) => Language::ObjCxx,
            (true, false) => Language::Cxx,
            (false, true) => Language::ObjC,
            (false, false) => Language::C,
        }
    }

    /// Debug builds are the ones without `NDEBUG`.
    pub fn is_debug(&self) -> bool {
        !self.is_defined("NDEBUG")
    }

    pub fn is_optimized(&self) -> bool {
        self.is_defined("__OPTIMIZE__")
    }
}

/// Parses the replacement text of an integer-valued marker, e.g. `201703L`, `0x10`, `(1)`.
pub fn parse_c_integer(text: &str) -> Option<i64> {
    let mut text = text.trim();
    while text.starts_with('(') && text.ends_with(')') && text.len() >= 2 {
        text = text[1..text.len() - 1].trim();
    }
    let (negative, text) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };
    let text = text.trim_end_matches(|c| matches!(c, 'u' | 'U' | 'l' | 'L'));
    if text.is_empty() {
        return None;
    }
    let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if text.len() > 1 && text.starts_with('0') {
        i64::from_str_radix(&text[1..], 8).ok()?
    } else {
        text.parse::<i64>().ok()?
    };
    Some(if negative { -value } else { value })
}

/// Typical environments, used to simulate a toolchain without running it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    Clang,
    Gcc,
    Msvc,
    MinGW,
    MinGW64,
    Unknown,
}

impl Preset {
    pub const ALL: [Preset; 6] = [
        Preset::Clang,
        Preset::Gcc,
        Preset::Msvc,
        Preset::MinGW,
        Preset::MinGW64,
        Preset::Unknown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Clang => "clang",
            Preset::Gcc => "gcc",
            Preset::Msvc => "msvc",
            Preset::MinGW => "mingw",
            Preset::MinGW64 => "mingw64",
            Preset::Unknown => "unknown",
        }
    }

    /// A C translation unit in a debug build for this toolchain.
    pub fn environment(self) -> Environment {
        match self {
            Preset::Clang => Environment::new()
                .with_define("__clang__", "1")
                .with_define("__clang_major__", "17")
                .with_define("__GNUC__", "4")
                .with_define("__GNUC_MINOR__", "2")
                .with_define("__GNUC_PATCHLEVEL__", "1")
                .with_define("__STDC_VERSION__", "201710L")
                .with_mechanism(Mechanism::HasDeclspecAttribute)
                .with_probe(Mechanism::HasBuiltin, "__builtin_expect")
                .with_probe(Mechanism::HasBuiltin, "__builtin_bit_cast")
                .with_probe(Mechanism::HasFeature, "c_static_assert")
                .with_probe(Mechanism::HasFeature, "is_trivially_copyable")
                .with_probe(Mechanism::HasAttribute, "fallthrough")
                .with_probe(Mechanism::HasAttribute, "not_tail_called")
                .with_probe(Mechanism::HasWarning, "-Wdeprecated-declarations")
                .with_probe(Mechanism::HasWarning, "-Wdeprecated-implementations")
                .with_probe(Mechanism::HasWarning, "-Wunguarded-availability-new")
                .with_probe(Mechanism::HasWarning, "-Wunused-parameter")
                .with_probe(Mechanism::HasWarning, "-Wformat-nonliteral")
                .with_probe(Mechanism::HasWarning, "-Wreturn-type")
                .with_probe(Mechanism::HasWarning, "-Wnonnull"),
            Preset::Gcc => gnu_base(),
            Preset::Msvc => Environment::new()
                .with_define("_MSC_VER", "1937")
                .with_define("_WIN32", "1")
                .with_define("_WIN64", "1"),
            Preset::MinGW => gnu_base()
                .with_define("__MINGW32__", "1")
                .with_define("_WIN32", "1"),
            Preset::MinGW64 => Preset::MinGW
                .environment()
                .with_define("__MINGW64__", "1")
                .with_define("__MINGW64_VERSION_MAJOR", "11"),
            Preset::Unknown => Environment::new(),
        }
    }
}

fn gnu_base() -> Environment {
    Environment::new()
        .with_define("__GNUC__", "13")
        .with_define("__GNUC_MINOR__", "2")
        .with_define("__GNUC_PATCHLEVEL__", "0")
        .with_define("__STDC_VERSION__", "201710L")
        .with_probe(Mechanism::HasBuiltin, "__builtin_expect")
        .with_probe(Mechanism::HasAttribute, "fallthrough")
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == lower)
            .ok_or_else(|| UnknownName::new("preset", s))
    }
}
