use crate::{
    diagnostics::DiagnosticSink, ir::Ir, resources::GatewayResources, source::Sources,
    validation::ErrorList,
};
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;

/// Converts source objects of one ingress implementation into Gateway API
/// resources.
pub trait Provider {
    fn name(&self) -> &'static str;

    /// Resolves routes and applies the provider's annotation passes.
    fn to_ir(&self, sources: &Sources, sink: &dyn DiagnosticSink) -> (Ir, ErrorList);

    /// Lowers a completed IR into target resources.
    fn to_gateway_resources(
        &self,
        ir: Ir,
        sink: &dyn DiagnosticSink,
    ) -> (GatewayResources, ErrorList);

    fn convert(&self, sources: &Sources, sink: &dyn DiagnosticSink) -> (GatewayResources, ErrorList) {
        let (ir, mut errors) = self.to_ir(sources, sink);
        let (resources, lowering_errors) = self.to_gateway_resources(ir, sink);
        errors.extend(lowering_errors);
        (resources, errors)
    }
}

/// Configuration shared by all providers, plus each provider's own flags
/// keyed by provider name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderConf {
    pub ingress_class: String,
    pub provider_flags: BTreeMap<String, BTreeMap<String, String>>,
}

pub type Constructor = fn(&ProviderConf) -> Result<Box<dyn Provider>>;

/// Provider constructors by name.
#[derive(Clone, Debug, Default)]
pub struct ProviderRegistry(BTreeMap<&'static str, Constructor>);

// === impl ProviderConf ===

impl ProviderConf {
    pub fn flags(&self, provider: &str) -> Option<&BTreeMap<String, String>> {
        self.provider_flags.get(provider)
    }

    pub fn flag(&self, provider: &str, flag: &str) -> Option<&str> {
        self.flags(provider)?
            .get(flag)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

// === impl ProviderRegistry ===

impl ProviderRegistry {
    pub fn register(&mut self, name: &'static str, constructor: Constructor) {
        self.0.insert(name, constructor);
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn build(&self, name: &str, conf: &ProviderConf) -> Result<Box<dyn Provider>> {
        let constructor = self.0.get(name).ok_or_else(|| {
            let known = self.names().collect::<Vec<_>>().join(", ");
            anyhow!("unknown provider {name:?}; expected one of: {known}")
        })?;
        constructor(conf)
    }
}
