use crate::attribute::{Attribute, AttributeContext, Expansion};
use crate::diagnostic::{Allowance, DiagnosticScope, WarningSuppression};
use crate::environment::{Environment, Language};
use crate::error::PolicyError;
use crate::feature::{Feature, Quirk, Sanitizer};
use crate::identity::{Compiler, CompilerIdentity};
use crate::policy;

/// Every capability flag and attribute spelling for one environment, resolved once.
///
/// Resolution is total: every known flag has a value and every [`Attribute`] has an
/// expansion, whatever the compiler. The only way to not get a registry is a
/// [`PolicyError`].
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    env: Environment,
    identity: CompilerIdentity,
    /// In emission order: compilers, features, quirks, sanitizers.
    flags: Vec<(String, bool)>,
    /// Indexed by `Attribute as usize`.
    attributes: Vec<Expansion>,
}

impl CapabilityRegistry {
    pub fn resolve(env: Environment) -> Result<Self, PolicyError> {
        let identity = CompilerIdentity::detect(&env);
        policy::check(&env, &identity)?;

        let mut flags = Vec::new();
        for compiler in Compiler::ALL.iter() {
            flags.push((compiler.flag_name(), identity.is(*compiler)));
        }
        for feature in Feature::ALL.iter() {
            flags.push((feature.flag_name(), feature.detect(&env, &identity)));
        }
        for quirk in Quirk::ALL.iter() {
            flags.push((quirk.flag_name(), quirk.detect(&env, &identity)));
        }
        let asan = Sanitizer::Address.detect(&env);
        let tsan = Sanitizer::Thread.detect(&env);
        flags.push((Sanitizer::Address.flag_name().to_owned(), asan));
        flags.push((Sanitizer::Thread.flag_name().to_owned(), tsan));

        let cx = AttributeContext {
            env: &env,
            identity: &identity,
            asan,
            tsan,
        };
        let attributes = Attribute::ALL.iter().map(|a| a.resolve(&cx)).collect();

        tracing::debug!(
            primary = ?identity.primary(),
            enabled = flags.iter().filter(|(_, on)| *on).count(),
            "capability registry resolved"
        );
        Ok(Self {
            env,
            identity,
            flags,
            attributes,
        })
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn identity(&self) -> &CompilerIdentity {
        &self.identity
    }

    /// `COMPILER(tag)`
    pub fn is_compiler(&self, compiler: Compiler) -> bool {
        self.identity.is(compiler)
    }

    /// `COMPILER_SUPPORTS(feature)`
    pub fn supports(&self, feature: Feature) -> bool {
        self.flag(&feature.flag_name())
    }

    /// `COMPILER_QUIRK(quirk)`
    pub fn requires_quirk(&self, quirk: Quirk) -> bool {
        self.flag(&quirk.flag_name())
    }

    pub fn sanitizer_enabled(&self, sanitizer: Sanitizer) -> bool {
        self.flag(sanitizer.flag_name())
    }

    /// Any flag by its full name. Names that were never defined read as false.
    pub fn flag(&self, name: &str) -> bool {
        self.flags
            .iter()
            .find(|(flag, _)| flag == name)
            .map_or(false, |(_, value)| *value)
    }

    pub fn flags(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn attribute(&self, attribute: Attribute) -> &Expansion {
        &self.attributes[attribute as usize]
    }

    pub fn attributes(&self) -> impl Iterator<Item = (Attribute, &Expansion)> {
        Attribute::ALL.iter().copied().zip(self.attributes.iter())
    }

    /// The expansion `attribute` gets in a `language` translation unit built by the
    /// same compiler. Equal to [`attribute`](Self::attribute) for the registry's own
    /// language.
    pub fn attribute_for_language(&self, attribute: Attribute, language: Language) -> Expansion {
        let env = self.env.clone().for_language(language);
        attribute.resolve(&AttributeContext {
            env: &env,
            identity: &self.identity,
            asan: self.sanitizer_enabled(Sanitizer::Address),
            tsan: self.sanitizer_enabled(Sanitizer::Thread),
        })
    }

    /// `__has_builtin(name)`, trusted only from Clang.
    pub fn supports_builtin(&self, name: &str) -> bool {
        self.is_compiler(Compiler::Clang) && self.env.has_builtin(name)
    }

    /// `__has_feature(name)`, trusted only from Clang.
    pub fn supports_language_feature(&self, name: &str) -> bool {
        self.is_compiler(Compiler::Clang) && self.env.has_feature(name)
    }

    /// `__has_declspec_attribute(name)`, trusted only from Clang.
    pub fn supports_declspec(&self, name: &str) -> bool {
        self.is_compiler(Compiler::Clang) && self.env.has_declspec_attribute(name)
    }

    /// Suppression bracket for `warning` (no `-W` prefix) on the given family.
    pub fn ignore_warnings(&self, scope: DiagnosticScope, warning: &str) -> WarningSuppression {
        WarningSuppression::new(&self.env, &self.identity, scope, warning)
    }

    pub fn allowance(&self, allowance: Allowance) -> WarningSuppression {
        self.ignore_warnings(allowance.scope(), allowance.warning())
    }
}
