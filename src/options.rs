use std::path::PathBuf;
use std::str::FromStr;

use structopt::StructOpt;
use waffle_compiler::{Language, Preset};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "waffle-config",
    about = "Resolve compiler capabilities and inspect NaN encodings"
)]
pub struct Options {
    #[structopt(short = "v", long = "verbose", help = "Log probing and resolution steps")]
    pub verbose: bool,
    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Resolve the capability registry for a compiler and print it.
    Resolve(ResolveOptions),
    /// Classify a double given as a decimal float or a 0x bit pattern.
    Nan {
        #[structopt(allow_hyphen_values = true)]
        value: String,
    },
}

#[derive(StructOpt, Debug)]
pub struct ResolveOptions {
    #[structopt(
        long = "cc",
        parse(from_os_str),
        conflicts_with = "preset",
        help = "Probe this C compiler"
    )]
    pub cc: Option<PathBuf>,
    #[structopt(
        long = "preset",
        help = "Simulate a compiler: clang, gcc, msvc, mingw, mingw64 or unknown"
    )]
    pub preset: Option<Preset>,
    #[structopt(long = "cc-arg", number_of_values = 1, help = "Extra argument for --cc")]
    pub cc_args: Vec<String>,
    #[structopt(
        long = "lang",
        default_value = "c",
        help = "Language to probe or simulate: c, c++, objc, objc++"
    )]
    pub language: Language,
    #[structopt(
        short = "D",
        number_of_values = 1,
        help = "Predefine NAME, or NAME=VALUE"
    )]
    pub defines: Vec<Define>,
    #[structopt(short = "U", number_of_values = 1, help = "Remove a predefined NAME")]
    pub undefines: Vec<String>,
    #[structopt(
        long = "emit",
        default_value = "header",
        possible_values = &["header", "rust", "cfg", "flags"],
        help = "Output format"
    )]
    pub emit: Emit,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            cc: None,
            preset: None,
            cc_args: Vec::new(),
            language: Language::C,
            defines: Vec::new(),
            undefines: Vec::new(),
            emit: Emit::Header,
        }
    }
}

#[cfg(test)]
impl ResolveOptions {
    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = Some(preset);
        self
    }

    pub fn with_define(mut self, name: &str, value: &str) -> Self {
        self.defines.push(Define {
            name: name.to_owned(),
            value: value.to_owned(),
        });
        self
    }

    pub fn with_undefine(mut self, name: &str) -> Self {
        self.undefines.push(name.to_owned());
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn with_emit(mut self, emit: Emit) -> Self {
        self.emit = emit;
        self
    }
}

/// `NAME` or `NAME=VALUE`, like the compiler's own `-D`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    pub value: String,
}

impl FromStr for Define {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = match s.find('=') {
            Some(at) => (&s[..at], &s[at + 1..]),
            None => (s, "1"),
        };
        if name.is_empty() {
            return Err(format!("missing macro name in `{}`", s));
        }
        Ok(Self {
            name: name.to_owned(),
            value: value.to_owned(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    Header,
    Rust,
    Cfg,
    Flags,
}

impl FromStr for Emit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "header" => Ok(Emit::Header),
            "rust" => Ok(Emit::Rust),
            "cfg" => Ok(Emit::Cfg),
            "flags" => Ok(Emit::Flags),
            _ => Err(format!("unknown output format `{}`", s)),
        }
    }
}
