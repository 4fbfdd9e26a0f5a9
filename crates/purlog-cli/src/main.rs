//! PurLog command line tool - provision credentials and send log lines.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use purlog::{
    init_logging, Environment, LogLevel, Metadata, Paths, PurLog, PurLogConfig, Settings,
};

/// PurLog command-line interface.
#[derive(Parser)]
#[command(name = "purlog")]
#[command(about = "Provision and exercise the PurLog logging SDK")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Diagnostic log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Directory holding config.json. Defaults to ~/.purlog
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30, global = true)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a project credential and remember the project id
    Setup {
        /// Project id issued by PurLog
        #[arg(long)]
        project_id: String,

        /// Project JWT issued by PurLog
        #[arg(long, env = "PURLOG_PROJECT_JWT", hide_env_values = true)]
        project_jwt: String,

        /// Override the API URL
        #[arg(long)]
        api_url: Option<String>,

        /// Environment reported with every log (dev, prod)
        #[arg(long)]
        env: Option<Environment>,

        /// Minimum level to submit
        #[arg(long)]
        level: Option<LogLevel>,
    },
    /// Send one log line
    Log {
        /// Severity of the line
        #[arg(short = 'L', long, default_value = "info")]
        level: LogLevel,

        /// Metadata entries as key=value
        #[arg(short, long = "meta", value_parser = parse_key_val)]
        meta: Vec<(String, String)>,

        message: String,
    },
    /// Show the configuration and which credentials are stored
    Status,
    /// Delete the session credential and device identity
    Reset {
        /// Also delete the project credential
        #[arg(long)]
        all: bool,
    },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))?;
    if key.trim().is_empty() {
        return Err(format!("empty key in `{}`", raw));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn build_client(settings: &Settings, timeout: Duration) -> anyhow::Result<PurLog> {
    PurLog::builder()
        .api_url(settings.api_url.clone())
        .request_timeout(timeout)
        .build()
        .context("Failed to create PurLog client")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let mut settings = Settings::load_default(&paths).context("Failed to load settings")?;
    let timeout = Duration::from_secs(cli.timeout);

    match cli.command {
        Commands::Setup {
            project_id,
            project_jwt,
            api_url,
            env,
            level,
        } => {
            if let Some(api_url) = api_url {
                settings.api_url = api_url;
            }
            if let Some(env) = env {
                settings.env = env;
            }
            if let Some(level) = level {
                settings.level = level;
            }

            let client = build_client(&settings, timeout)?;
            let config = PurLogConfig::builder()
                .level(settings.level)
                .env(settings.env)
                .app_version(settings.app_version.clone())
                .project(project_id, project_jwt)
                .build_and_store(client.credential_store())
                .await
                .context("Failed to store project credential")?;

            settings.project_id = config.project_id;
            paths.ensure_dirs()?;
            settings.save(&paths.config_file())?;
            println!("Project credential stored");
            println!("Settings written to {}", paths.config_file().display());
        }
        Commands::Log {
            level,
            meta,
            message,
        } => {
            let client = build_client(&settings, timeout)?;
            client
                .initialize(settings.to_config())
                .await
                .context("Failed to initialize PurLog")?;

            let metadata: Metadata = meta.into_iter().collect();
            client.log(level, &message, metadata).await;
            tracing::debug!(level = %level, "Log call finished");
        }
        Commands::Status => {
            let client = build_client(&settings, timeout)?;
            let store = client.credential_store();
            let present = |value: Option<String>| {
                if value.is_some() {
                    "stored"
                } else {
                    "missing"
                }
            };

            println!("Config file:        {}", paths.config_file().display());
            println!("API URL:            {}", settings.api_url);
            println!("Environment:        {}", settings.env);
            println!("Level:              {}", settings.level);
            println!(
                "Project id:         {}",
                settings.project_id.as_deref().unwrap_or("(none)")
            );
            println!(
                "Project credential: {}",
                present(store.project_credential().await?)
            );
            println!(
                "Session credential: {}",
                present(store.session_credential().await?)
            );
            println!(
                "Device identity:    {}",
                store.device_identity().await?.unwrap_or_else(|| "missing".to_string())
            );
        }
        Commands::Reset { all } => {
            let client = build_client(&settings, timeout)?;
            if all {
                client.credential_store().clear_all().await?;
                if settings.project_id.take().is_some() {
                    settings.save(&paths.config_file())?;
                }
                println!("All PurLog credentials deleted");
            } else {
                client.reset_credentials().await?;
                println!("Session credential and device identity deleted");
            }
        }
    }

    Ok(())
}
