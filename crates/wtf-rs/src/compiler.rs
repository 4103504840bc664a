//! Capabilities of the C compiler that built this crate, resolved by `build.rs`.
//!
//! Every flag exists as a `bool` constant in every configuration, so consumers can
//! branch with `if compiler::COMPILER_CLANG { .. }` or with the matching cfg, e.g.
//! `#[cfg(waffle_compiler = "clang")]`.

include!(concat!(env!("OUT_DIR"), "/compiler_config.rs"));

/// The generated `waffle/compiler.h`.
pub const HEADER: &str = include_str!(concat!(env!("OUT_DIR"), "/include/waffle/compiler.h"));

/// Directory to add to the include path for `#include <waffle/compiler.h>`.
pub const INCLUDE_DIR: &str = concat!(env!("OUT_DIR"), "/include");

/// Looks up a flag by its full name, e.g. `WAFFLE_COMPILER_SUPPORTS_BLOCKS`. Unknown
/// names read as false, like an undefined macro in `#if`.
pub fn flag(name: &str) -> bool {
    FLAGS
        .iter()
        .find(|(flag, _)| *flag == name)
        .map_or(false, |(_, value)| *value)
}

/// Replacement text of an attribute macro, e.g. `ALWAYS_INLINE`.
pub fn attribute(name: &str) -> Option<&'static str> {
    ATTRIBUTES
        .iter()
        .find(|(attribute, _)| *attribute == name)
        .map(|(_, body)| *body)
}
