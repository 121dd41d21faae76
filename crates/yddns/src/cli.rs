//! Command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use yddns_core::Domain;

/// Dynamic DNS client refreshing records through provider URLs.
#[derive(Parser, Debug)]
#[command(name = "yddns")]
#[command(version)]
#[command(about = "A lightweight dynamic DNS client")]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct GlobalOptions {
    /// Configuration file (default: search /etc/yddns, ~/.yddns, cwd).
    #[arg(short, long, env = "YDDNS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error.
    #[arg(long, env = "YDDNS_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh every configured domain, once or periodically.
    Refresh(RefreshArgs),

    /// Refresh a single domain given on the command line.
    ///
    /// The cache is bypassed; templates from the configuration are available.
    Domain(DomainArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RefreshArgs {
    /// Run a single cycle and exit.
    #[arg(long)]
    pub once: bool,

    /// Seconds between cycles, overriding `refresh_interval`.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DomainArgs {
    /// Refresh URL with placeholders, or `:name` of a template.
    pub refresh_url: String,

    /// Authentication method (basic, bearer).
    #[arg(long)]
    pub auth_method: Option<String>,

    /// Domain name [<domain>].
    #[arg(long)]
    pub domain: Option<String>,

    /// Host name of the service [<host>].
    #[arg(long)]
    pub host: Option<String>,

    /// IPv4 address instead of the WAN lookup [<ip4>].
    #[arg(long)]
    pub ip4_address: Option<String>,

    /// IPv6 address instead of the WAN lookup [<ip6>].
    #[arg(long)]
    pub ip6_address: Option<String>,

    /// IPv6 host id appended to the WAN /64 prefix.
    #[arg(long)]
    pub ip6_host_id: Option<String>,

    /// Password or bearer token [<password>].
    #[arg(long)]
    pub password: Option<String>,

    /// Protocol of the refresh URL [<protocol>].
    #[arg(long)]
    pub protocol: Option<String>,

    /// Request method (GET, POST).
    #[arg(long)]
    pub request_method: Option<String>,

    /// User-Agent header of the refresh request.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// User name [<username>].
    #[arg(long)]
    pub username: Option<String>,
}

impl DomainArgs {
    /// The domain described by the flags, shaped like a configured one
    pub fn to_domain(&self) -> Domain {
        let mut domain = Domain::new(self.domain.clone().unwrap_or_default(), &self.refresh_url)
            .with_credentials(
                self.username.clone().unwrap_or_default(),
                self.password.clone().unwrap_or_default(),
            );

        domain.template.auth_method = self.auth_method.clone().unwrap_or_default();
        domain.template.host = self.host.clone().unwrap_or_default();
        domain.template.protocol = self.protocol.clone().unwrap_or_default();
        domain.template.request_method = self.request_method.clone().unwrap_or_default();
        domain.template.user_agent = self.user_agent.clone().unwrap_or_default();
        domain.ip4_address = self.ip4_address.clone().unwrap_or_default();
        domain.ip6_address = self.ip6_address.clone().unwrap_or_default();
        domain.ip6_host_id = self.ip6_host_id.clone().unwrap_or_default();

        domain
    }
}
