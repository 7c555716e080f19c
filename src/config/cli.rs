use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, builder::BoolishValueParser};

use crate::cache::ContextKind;

/// Command-line arguments for the banner-cache binary.
#[derive(Debug, Parser)]
#[command(name = "banner-cache", version, about = "Multi-tier banner cache")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BANNER_CACHE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Fetch one banner through the cache and print it as JSON.
    Get(GetArgs),
    /// Purge every cached variant of one banner.
    Purge(PurgeArgs),
    /// Drop every cache entry of the namespace.
    Flush,
    /// Warm the cache with every banner that is not cached yet.
    Preload(PreloadArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL", global = true)]
    pub database_url: Option<String>,

    /// Override the Redis connection URL.
    #[arg(long = "redis-url", value_name = "URL", global = true)]
    pub redis_url: Option<String>,

    /// Force every cache read to bypass the tiers.
    #[arg(
        long = "cache-debug",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub cache_debug: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,
}

/// Execution context a command runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ContextArg {
    #[default]
    Frontend,
    Admin,
    Ajax,
    Cli,
    Cron,
}

impl From<ContextArg> for ContextKind {
    fn from(value: ContextArg) -> Self {
        match value {
            ContextArg::Frontend => ContextKind::Frontend,
            ContextArg::Admin => ContextKind::Admin,
            ContextArg::Ajax => ContextKind::Programmatic,
            ContextArg::Cli => ContextKind::Cli,
            ContextArg::Cron => ContextKind::Background,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct ContextArgs {
    /// Execution context to run as; only `frontend` uses the cache.
    #[arg(long = "context", value_enum, default_value_t = ContextArg::Frontend)]
    pub context: ContextArg,

    /// Locale of the simulated visitor.
    #[arg(long = "locale", value_name = "LOCALE")]
    pub locale: Option<String>,

    /// Identified viewer id; anonymous when omitted.
    #[arg(long = "viewer", value_name = "ID")]
    pub viewer: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct GetArgs {
    /// Banner slug.
    #[arg(value_name = "SLUG")]
    pub slug: String,

    /// Display setting as `name=value`; repeatable.
    #[arg(long = "setting", value_name = "NAME=VALUE", value_parser = parse_setting)]
    pub settings: Vec<(String, String)>,

    /// Print rendered markup instead of the record.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub render: bool,

    #[command(flatten)]
    pub context: ContextArgs,
}

#[derive(Debug, Args, Clone)]
pub struct PurgeArgs {
    /// Banner id or slug.
    #[arg(value_name = "IDENTIFIER")]
    pub identifier: String,
}

#[derive(Debug, Args, Clone)]
pub struct PreloadArgs {
    #[command(flatten)]
    pub context: ContextArgs,
}

fn parse_setting(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("setting name must not be empty".to_string());
    }
    Ok((name.to_string(), value.to_string()))
}
