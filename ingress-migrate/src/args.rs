use crate::{
    core::{Notifications, ProviderConf, Severity, Sources},
    ingress_nginx::{self, config as nginx},
    output, read, LogFormat, OutputFormat,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::{collections::BTreeMap, io::Write};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[clap(
    name = "ingress-migrate",
    about = "Converts Ingress resources to Gateway API resources"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "ingress_migrate=info,warn",
        env = "INGRESS_MIGRATE_LOG"
    )]
    log_level: String,

    #[clap(long, default_value = "plain")]
    log_format: LogFormat,

    /// A file of Kubernetes manifests, or `-` to read stdin.
    #[clap(long)]
    input_file: String,

    /// Providers to run, in order.
    #[clap(long, value_delimiter = ',', default_value = ingress_nginx::NAME)]
    providers: Vec<String>,

    /// Only converts Ingresses in this namespace.
    #[clap(long)]
    namespace: Option<String>,

    /// Ingresses selecting another class are skipped.
    #[clap(long, default_value = "nginx")]
    ingress_class: String,

    /// Either `centralized` or `per-namespace`.
    #[clap(long)]
    ingress_nginx_gateway_mode: Option<String>,

    /// The shared Gateway's namespace in centralized mode.
    #[clap(long)]
    ingress_nginx_gateway_namespace: Option<String>,

    /// The shared Gateway's name in centralized mode.
    #[clap(long)]
    ingress_nginx_gateway_name: Option<String>,

    /// The GatewayClass of per-namespace Gateways.
    #[clap(long)]
    ingress_nginx_gateway_class: Option<String>,

    #[clap(long, default_value = "yaml")]
    output: OutputFormat,
}

// === impl Args ===

impl Args {
    pub fn parse_and_run() -> Result<()> {
        Self::parse().run()
    }

    pub fn run(self) -> Result<()> {
        self.log_format.try_init(&self.log_level)?;

        let conf = self.provider_conf();
        let Self {
            input_file,
            providers,
            namespace,
            ingress_class,
            output,
            ..
        } = self;

        let text = read::read_input(&input_file)?;
        let filter = read::Filter {
            ingress_class: Some(ingress_class),
            namespace,
        };
        let (ingresses, services) = read::read_manifests(&text, &filter)
            .with_context(|| format!("invalid manifests in {input_file}"))?;
        info!(
            ingresses = ingresses.len(),
            services = services.len(),
            "Read manifests"
        );

        let sources = Sources::new(ingresses, &services);
        let notifications = Notifications::default();
        let (resources, errors) =
            crate::convert(&crate::registry(), &providers, &conf, &sources, &notifications)?;

        let rendered = output::render(&resources, output)?;
        std::io::stdout()
            .lock()
            .write_all(rendered.as_bytes())
            .context("failed to write output")?;

        let mut stderr = std::io::stderr().lock();
        for error in &errors {
            writeln!(stderr, "error: {error}")?;
        }
        let blocking = notifications
            .take()
            .into_iter()
            .filter(|d| d.severity == Severity::Blocking)
            .collect::<Vec<_>>();
        for diagnostic in &blocking {
            match &diagnostic.object {
                Some(obj) => writeln!(stderr, "blocking: {obj}: {}", diagnostic.message)?,
                None => writeln!(stderr, "blocking: {}", diagnostic.message)?,
            }
        }
        if !blocking.is_empty() || !errors.is_empty() {
            writeln!(
                stderr,
                "{} blocking issue(s) and {} invalid field(s) need manual migration",
                blocking.len(),
                errors.len()
            )?;
        }
        Ok(())
    }

    /// Collects the provider-specific flags that were set.
    fn provider_conf(&self) -> ProviderConf {
        let flags = [
            (nginx::GATEWAY_MODE_FLAG, &self.ingress_nginx_gateway_mode),
            (nginx::GATEWAY_NAMESPACE_FLAG, &self.ingress_nginx_gateway_namespace),
            (nginx::GATEWAY_NAME_FLAG, &self.ingress_nginx_gateway_name),
            (nginx::GATEWAY_CLASS_FLAG, &self.ingress_nginx_gateway_class),
        ]
        .into_iter()
        .filter_map(|(flag, value)| Some((flag.to_string(), value.clone()?)))
        .collect::<BTreeMap<_, _>>();
        debug!(?flags, "Provider flags");

        let mut provider_flags = BTreeMap::new();
        provider_flags.insert(ingress_nginx::NAME.to_string(), flags);
        ProviderConf {
            ingress_class: self.ingress_class.clone(),
            provider_flags,
        }
    }
}
