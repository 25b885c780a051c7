mod audit;
mod config;
mod engine;
mod logging;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};

use audit::AuditEvent;
use config::{config_path, ensure_dirs, LogLevel, UserConfig};
use engine::{ApiVersion, DiscoveryReport, EngineClient, EngineFactory};
use logging::LogMode;

#[derive(Debug, Subcommand)]
enum Commands {
    /// Get a client for an API version and check the engine answers (default)
    #[command(alias = "p")]
    Ping {
        /// API version to use (e.g. 1.18); defaults to the configured default
        #[arg(short, long)]
        api_version: Option<String>,
    },

    /// Discover which API versions the engine accepts
    #[command(alias = "ls")]
    Versions {
        /// Print a JSON discovery report
        #[arg(short, long)]
        json: bool,

        /// Compact JSON output (single line)
        #[arg(short, long, requires = "json")]
        compact: bool,
    },

    /// Show or edit configuration
    Config {
        /// Print config file path
        #[arg(long)]
        path: bool,

        /// Reset config to defaults
        #[arg(long)]
        reset: bool,

        /// Open config file in $EDITOR
        #[arg(short, long)]
        edit: bool,
    },
}

/// Versioned client factory and API version discovery for a local container engine
#[derive(Debug, Parser)]
#[command(name = "berth", version, verbatim_doc_comment)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Engine endpoint (socket path, optionally prefixed with unix://)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit audit entries for engine API usage
    #[arg(long, global = true)]
    audit: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = ensure_dirs();

    let cli = Cli::parse();
    let mut config = UserConfig::load();
    config.merge_with_args(cli.endpoint.as_deref(), cli.audit);
    let log_level_override = cli.log_level.as_deref().map(LogLevel::from_str);

    let _guard = logging::init(
        config.log_level,
        LogMode::for_config(config.log_to_file),
        log_level_override,
    );

    match cli.command {
        Some(Commands::Ping { api_version }) => run_ping(&config, api_version.as_deref()),
        Some(Commands::Versions { json, compact }) => run_versions(&config, json, compact),
        Some(Commands::Config { path, reset, edit }) => run_config(path, reset, edit),
        None => run_ping(&config, None),
    }
}

fn build_factory(config: &UserConfig) -> Result<EngineFactory> {
    let versions = config
        .version_set()
        .wrap_err_with(|| format!("Invalid version settings in {}", config_path().display()))?;
    let timeout = config
        .probe_timeout()
        .wrap_err_with(|| format!("Invalid probe timeout in {}", config_path().display()))?;

    tracing::debug!(
        endpoint = %config.endpoint,
        default_version = %versions.default_version(),
        known = versions.versions().len(),
        ?timeout,
        "Creating engine client factory"
    );
    Ok(engine::socket_factory(&config.endpoint, versions, timeout))
}

fn run_ping(config: &UserConfig, api_version: Option<&str>) -> Result<()> {
    let factory = build_factory(config)?;

    let version = match api_version {
        Some(v) => v
            .parse::<ApiVersion>()
            .wrap_err_with(|| format!("Invalid API version {:?}", v))?,
        None => factory.default_version(),
    };

    let result = if api_version.is_some() {
        factory.client(version)
    } else {
        factory.default_client()
    };

    if config.audit {
        audit::record(
            i32::from(result.is_err()),
            &AuditEvent::GetClient {
                endpoint: factory.endpoint().to_string(),
                version,
            },
        );
    }

    let client = result.wrap_err_with(|| {
        format!(
            "Engine at {} is not usable with API version {}",
            factory.endpoint(),
            version
        )
    })?;
    tracing::debug!(socket = %client.socket_path().display(), "Ping succeeded");

    println!(
        "Engine at {} answered on API version {}",
        factory.endpoint(),
        client.api_version()
    );
    Ok(())
}

fn run_versions(config: &UserConfig, json: bool, compact: bool) -> Result<()> {
    let factory = build_factory(config)?;
    let available = factory.find_available_versions();
    tracing::debug!(cached = ?factory.cached_versions(), "Discovery left clients cached");

    if config.audit {
        audit::record(
            0,
            &AuditEvent::FindAvailableVersions {
                endpoint: factory.endpoint().to_string(),
                available: available.clone(),
            },
        );
    }

    let report = DiscoveryReport::new(factory.endpoint(), factory.known_versions(), available);

    if json {
        if compact {
            println!("{}", report.to_json()?);
        } else {
            println!("{}", report.to_json_pretty()?);
        }
        return Ok(());
    }

    println!("Endpoint: {}", report.endpoint);
    println!("{}", "=".repeat(40));
    for version in &report.known_versions {
        let status = if report.available_versions.contains(version) {
            "available"
        } else {
            "unavailable"
        };
        let marker = if *version == report.default_version {
            " (default)"
        } else {
            ""
        };
        println!("  {:<6} {}{}", version.to_string(), status, marker);
    }
    println!();

    match report.newest_available() {
        Some(newest) => println!(
            "{} of {} versions available, newest {}",
            report.available_versions.len(),
            report.known_versions.len(),
            newest
        ),
        None => println!("No API versions available at {}", report.endpoint),
    }

    if !report.default_available() && !report.available_versions.is_empty() {
        println!(
            "Warning: default version {} is not available; set default_version in {}",
            report.default_version,
            config_path().display()
        );
    }

    Ok(())
}

fn run_config(path: bool, reset: bool, edit: bool) -> Result<()> {
    let config_file = config_path();

    if path {
        println!("{}", config_file.display());
        return Ok(());
    }

    if reset {
        let config = UserConfig::default();
        config.save()?;
        println!("Config reset to defaults at: {}", config_file.display());
        return Ok(());
    }

    if edit {
        let editor = std::env::var("EDITOR").unwrap_or_else(|_| "nano".to_string());

        if !config_file.exists() {
            let config = UserConfig::default();
            config.save()?;
        }

        std::process::Command::new(editor)
            .arg(&config_file)
            .status()?;

        return Ok(());
    }

    let config = UserConfig::load();
    println!("Config file: {}", config_file.display());
    println!("Log directory: {}", logging::log_dir().display());
    println!();
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}
