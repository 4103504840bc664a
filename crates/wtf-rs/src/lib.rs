//! # wtf-rs
//!
//! This crate is inspired by WebKit WTF (WTF - Web Template Framework). It carries the
//! lowest layer of the engine: what the compiler building us can do, resolved once by
//! the build script, and the canonical NaN primitives the value representation relies on.
//!
//! C and C++ sources built next to this crate can include the generated
//! `waffle/compiler.h` from the directory dependents see as `DEP_WTF_INCLUDE`.

#![no_std]

cfg_if::cfg_if! {
    if #[cfg(not(any(target_pointer_width = "32", target_pointer_width = "64")))] {
        compile_error!("unsupported pointer width: only 32 and 64 bit targets are supported");
    }
}

pub mod bitwise_cast;
pub mod compiler;
pub mod pure_nan;

pub use bitwise_cast::{bits_to_double, bits_to_float, double_to_bits, float_to_bits};
pub use pure_nan::{is_impure_nan, pure_nan, purify_nan};
