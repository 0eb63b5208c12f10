#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod diagnostics;
pub mod ir;
pub mod provider;
mod resource_id;
pub mod resources;
pub mod routes;
pub mod source;
pub mod validation;

pub use self::{
    diagnostics::{Diagnostic, DiagnosticSink, Notifications, ObjectRef, Severity},
    ir::Ir,
    provider::{Provider, ProviderConf, ProviderRegistry},
    resource_id::ResourceId,
    resources::GatewayResources,
    source::Sources,
    validation::{ErrorList, FieldError, FieldPath},
};
pub use ingress_migrate_k8s_api as k8s;
