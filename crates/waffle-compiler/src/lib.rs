//! # waffle-compiler
//!
//! Answers, before anything is compiled, which compiler is building, what it
//! supports and how to spell portable attributes for it.
//!
//! Inputs are an [`Environment`]: the predefined markers and feature-test answers a
//! toolchain exposes. It can be read from a real compiler with [`probe::Toolchain`]
//! or simulated with [`Preset`]. [`CapabilityRegistry::resolve`] turns it into a
//! total set of flags and attribute expansions, or refuses with a [`PolicyError`]
//! for configurations known to produce a bad build. [`emit`] renders the result for
//! C and Rust consumers.
//!
//! ```
//! use waffle_compiler::{Attribute, CapabilityRegistry, Compiler, Preset};
//!
//! let registry = CapabilityRegistry::resolve(Preset::Gcc.environment()).unwrap();
//! assert!(registry.is_compiler(Compiler::GccCompatible));
//! assert_eq!(registry.attribute(Attribute::NeverInline).body(), "__attribute__((__noinline__))");
//! ```

pub mod attribute;
pub mod diagnostic;
pub mod emit;
pub mod environment;
pub mod error;
pub mod feature;
pub mod identity;
pub mod policy;
pub mod probe;
pub mod registry;

pub use attribute::{Attribute, Expansion, Origin};
pub use diagnostic::{Allowance, DiagnosticScope, WarningSuppression};
pub use environment::{Environment, Language, Mechanism, Preset};
pub use error::{PolicyError, ProbeError, UnknownName};
pub use feature::{Feature, Quirk, Sanitizer};
pub use identity::{Compiler, CompilerIdentity};
pub use registry::CapabilityRegistry;
