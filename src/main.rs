use anyhow::Context;
use structopt::StructOpt;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waffle_compiler::probe::{Flavor, Toolchain};
use waffle_compiler::{emit, CapabilityRegistry, Environment, Preset};
use wtf_rs::pure_nan::{is_impure_nan, purify_nan};
use wtf_rs::{bits_to_double, double_to_bits};

mod options;

use options::{Command, Emit, Options, ResolveOptions};

fn main() -> anyhow::Result<()> {
    let options = Options::from_args();

    let default_filter = if options.verbose {
        "waffle_compiler=trace,waffle_config=debug"
    } else {
        "warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match options.command {
        Command::Resolve(resolve) => print!("{}", run_resolve(&resolve)?),
        Command::Nan { value } => print!("{}", describe_nan(&value)?),
    }
    Ok(())
}

fn environment(options: &ResolveOptions) -> anyhow::Result<Environment> {
    let mut env = match (&options.cc, options.preset) {
        (Some(cc), _) => {
            let toolchain = Toolchain::new(cc)
                .with_args(options.cc_args.iter())
                .with_flavor(Flavor::guess(cc))
                .with_language(options.language);
            info!(program = %cc.display(), "probing compiler");
            toolchain
                .probe()
                .with_context(|| format!("could not probe `{}`", cc.display()))?
        }
        (None, preset) => {
            let preset = preset.unwrap_or(Preset::Unknown);
            debug!(%preset, "simulating compiler");
            preset.environment().for_language(options.language)
        }
    };

    for define in &options.defines {
        env.insert_define(define.name.as_str(), define.value.as_str());
    }
    for name in &options.undefines {
        env.remove_define(name);
    }
    Ok(env)
}

fn run_resolve(options: &ResolveOptions) -> anyhow::Result<String> {
    let env = environment(options)?;
    let registry = CapabilityRegistry::resolve(env)?;

    Ok(match options.emit {
        Emit::Header => emit::render_header(&registry),
        Emit::Rust => emit::render_rust(&registry),
        Emit::Cfg => {
            let mut out = emit::cargo_directives(&registry).join("\n");
            out.push('\n');
            out
        }
        Emit::Flags => {
            let mut out = String::new();
            for (name, value) in registry.flags() {
                out.push_str(&format!("{}={}\n", name, value as u8));
            }
            out
        }
    })
}

fn parse_double(text: &str) -> anyhow::Result<f64> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let bits = u64::from_str_radix(&hex.replace('_', ""), 16)
            .with_context(|| format!("invalid bit pattern `{}`", text))?;
        return Ok(bits_to_double(bits));
    }
    text.parse::<f64>()
        .with_context(|| format!("invalid number `{}`", text))
}

fn describe_nan(text: &str) -> anyhow::Result<String> {
    let value = parse_double(text)?;
    let purified = purify_nan(value);
    Ok(format!(
        "bits:     {:#018x}\nnan:      {}\nimpure:   {}\npurified: {:#018x}\n",
        double_to_bits(value),
        value.is_nan(),
        is_impure_nan(value),
        double_to_bits(purified)
    ))
}
