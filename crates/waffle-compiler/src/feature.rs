//! `COMPILER_SUPPORTS()`, `COMPILER_QUIRK()` and the sanitizer switches.

use std::fmt;
use std::str::FromStr;

use crate::environment::Environment;
use crate::error::UnknownName;
use crate::identity::{Compiler, CompilerIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Feature {
    Blocks,
    CStaticAssert,
    CxxExceptions,
    BuiltinIsTriviallyCopyable,
    BuiltinBitCast,
    Eabi,
}

impl Feature {
    pub const ALL: [Feature; 6] = [
        Feature::Blocks,
        Feature::CStaticAssert,
        Feature::CxxExceptions,
        Feature::BuiltinIsTriviallyCopyable,
        Feature::BuiltinBitCast,
        Feature::Eabi,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::Blocks => "BLOCKS",
            Feature::CStaticAssert => "C_STATIC_ASSERT",
            Feature::CxxExceptions => "CXX_EXCEPTIONS",
            Feature::BuiltinIsTriviallyCopyable => "BUILTIN_IS_TRIVIALLY_COPYABLE",
            Feature::BuiltinBitCast => "BUILTIN_BIT_CAST",
            Feature::Eabi => "EABI",
        }
    }

    pub fn flag_name(self) -> String {
        format!("WAFFLE_COMPILER_SUPPORTS_{}", self.name())
    }

    pub(crate) fn detect(self, env: &Environment, identity: &CompilerIdentity) -> bool {
        let clang = identity.is(Compiler::Clang);
        let computed = match self {
            Feature::Blocks => clang && env.has_feature("blocks"),
            Feature::CStaticAssert => {
                if clang {
                    env.has_feature("c_static_assert")
                } else {
                    identity.is(Compiler::Gcc)
                        && env.integer("__STDC_VERSION__").map_or(false, |v| v >= 201112)
                }
            }
            Feature::CxxExceptions => clang && env.has_feature("cxx_exceptions"),
            Feature::BuiltinIsTriviallyCopyable => clang && env.has_feature("is_trivially_copyable"),
            Feature::BuiltinBitCast => clang && env.has_builtin("__builtin_bit_cast"),
            Feature::Eabi => env.is_defined("__ARM_EABI__") || env.is_defined("__EABI__"),
        };
        env.resolve_flag(&self.flag_name(), computed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quirk {
    /// Code after an unconditional jump is still considered reachable.
    ConsidersUnreachableCode,
}

impl Quirk {
    pub const ALL: [Quirk; 1] = [Quirk::ConsidersUnreachableCode];

    pub fn name(self) -> &'static str {
        match self {
            Quirk::ConsidersUnreachableCode => "CONSIDERS_UNREACHABLE_CODE",
        }
    }

    pub fn flag_name(self) -> String {
        format!("WAFFLE_COMPILER_QUIRK_{}", self.name())
    }

    pub(crate) fn detect(self, env: &Environment, identity: &CompilerIdentity) -> bool {
        let computed = match self {
            Quirk::ConsidersUnreachableCode => {
                !identity.is(Compiler::Clang) && !identity.is(Compiler::Msvc)
            }
        };
        env.resolve_flag(&self.flag_name(), computed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sanitizer {
    Address,
    Thread,
}

impl Sanitizer {
    pub const ALL: [Sanitizer; 2] = [Sanitizer::Address, Sanitizer::Thread];

    pub fn name(self) -> &'static str {
        match self {
            Sanitizer::Address => "address",
            Sanitizer::Thread => "thread",
        }
    }

    pub fn flag_name(self) -> &'static str {
        match self {
            Sanitizer::Address => "ASAN_ENABLED",
            Sanitizer::Thread => "TSAN_ENABLED",
        }
    }

    /// Marker GCC defines under `-fsanitize=...`.
    pub fn gcc_marker(self) -> &'static str {
        match self {
            Sanitizer::Address => "__SANITIZE_ADDRESS__",
            Sanitizer::Thread => "__SANITIZE_THREAD__",
        }
    }

    /// Name Clang answers through `__has_feature`.
    pub fn clang_feature(self) -> &'static str {
        match self {
            Sanitizer::Address => "address_sanitizer",
            Sanitizer::Thread => "thread_sanitizer",
        }
    }

    pub(crate) fn detect(self, env: &Environment) -> bool {
        let computed = env.is_defined(self.gcc_marker()) || env.has_feature(self.clang_feature());
        env.resolve_flag(self.flag_name(), computed)
    }
}

macro_rules! named_enum {
    ($($ty: ident => $kind: literal),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.name())
                }
            }

            impl FromStr for $ty {
                type Err = UnknownName;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    Self::ALL
                        .iter()
                        .copied()
                        .find(|v| v.name().eq_ignore_ascii_case(s))
                        .ok_or_else(|| UnknownName::new($kind, s))
                }
            }
        )*
    };
}

named_enum! {
    Feature => "feature",
    Quirk => "quirk",
    Sanitizer => "sanitizer"
}
