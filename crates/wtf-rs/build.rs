use std::env;
use std::fs;
use std::path::PathBuf;

use waffle_compiler::probe::{Flavor, Toolchain};
use waffle_compiler::{emit, CapabilityRegistry, Environment};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for var in &["CC", "CFLAGS", "TARGET_CC", "TARGET_CFLAGS"] {
        println!("cargo:rerun-if-env-changed={}", var);
    }

    let registry = match CapabilityRegistry::resolve(probe_environment()) {
        Ok(registry) => registry,
        // Known-bad configurations stop the build here.
        Err(err) => panic!("{}", err),
    };

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let include = out_dir.join("include");
    fs::create_dir_all(include.join("waffle")).expect("Couldn't create include directory");
    fs::write(
        include.join("waffle").join("compiler.h"),
        emit::render_header(&registry),
    )
    .expect("Couldn't write compiler.h");
    fs::write(
        out_dir.join("compiler_config.rs"),
        emit::render_rust(&registry),
    )
    .expect("Couldn't write compiler_config.rs");

    for directive in emit::cargo_directives(&registry) {
        println!("{}", directive);
    }
    // Visible to dependents as DEP_WTF_INCLUDE.
    println!("cargo:include={}", include.display());
}

/// Preprocesses a probe with the C compiler `cc` would use for this target. Without
/// a working compiler we fall back to the baseline of an unknown one.
fn probe_environment() -> Environment {
    let mut build = cc::Build::new();
    build.cargo_metadata(false);
    if env::var_os("CARGO_CFG_DEBUG_ASSERTIONS").is_none() {
        build.define("NDEBUG", None);
    }
    if env::var_os("CARGO_FEATURE_RELEASE_WITHOUT_OPTIMIZATIONS").is_some() {
        build.define("RELEASE_WITHOUT_OPTIMIZATIONS", None);
    }

    let tool = match build.try_get_compiler() {
        Ok(tool) => tool,
        Err(err) => {
            println!(
                "cargo:warning=no C compiler found ({}), assuming baseline capabilities",
                err
            );
            return Environment::new();
        }
    };
    let toolchain = Toolchain::new(tool.path())
        .with_args(tool.args().iter().cloned())
        .with_flavor(if tool.is_like_msvc() {
            Flavor::Msvc
        } else {
            Flavor::Gnu
        });

    match toolchain.probe() {
        Ok(env) => env,
        Err(err) => {
            println!(
                "cargo:warning=probing {} failed ({}), assuming baseline capabilities",
                toolchain.program().display(),
                err
            );
            Environment::new()
        }
    }
}
