use anyhow::{Context, Result};
use clap::{value_parser, Arg, Command};
use config::{Config, File as ConfigFile};
use profil_core::{Artifacts, Predictor};
use profil_rpc::{start_server, AppState};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
struct AppConfig {
    rpc_host: String,
    rpc_port: u16,
    artifacts_dir: PathBuf,
    log_level: String,
    log_format: String,
}

impl AppConfig {
    /// Config file (optional) -> PROFIL_* environment -> CLI overrides.
    fn load(matches: &clap::ArgMatches) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = matches.get_one::<String>("config") {
            builder = builder.add_source(ConfigFile::with_name(path));
        }

        builder = builder.add_source(config::Environment::with_prefix("PROFIL"));

        let config = builder.build()?;

        let mut app = Self {
            rpc_host: config
                .get_string("RPC_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            rpc_port: config
                .get_int("RPC_PORT")
                .map(|port| port as u16)
                .unwrap_or(8000),
            artifacts_dir: PathBuf::from(
                config
                    .get_string("ARTIFACTS_DIR")
                    .unwrap_or_else(|_| "model_artifacts".to_string()),
            ),
            log_level: config
                .get_string("LOG_LEVEL")
                .unwrap_or_else(|_| "info".to_string()),
            log_format: config
                .get_string("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string()),
        };

        if let Some(host) = matches.get_one::<String>("rpc-host") {
            app.rpc_host = host.clone();
        }
        if let Some(port) = matches.get_one::<u16>("rpc-port") {
            app.rpc_port = *port;
        }
        if let Some(dir) = matches.get_one::<String>("artifacts-dir") {
            app.artifacts_dir = PathBuf::from(dir);
        }
        if let Some(level) = matches.get_one::<String>("log-level") {
            app.log_level = level.clone();
        }
        if let Some(format) = matches.get_one::<String>("log-format") {
            app.log_format = format.clone();
        }

        Ok(app)
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("profil-node")
        .version(profil_core::VERSION)
        .about("Obesity profile prediction API node")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("rpc-host")
                .long("rpc-host")
                .value_name("HOST")
                .help("Override API bind host"),
        )
        .arg(
            Arg::new("rpc-port")
                .long("rpc-port")
                .value_name("PORT")
                .value_parser(value_parser!(u16))
                .help("Override API port"),
        )
        .arg(
            Arg::new("artifacts-dir")
                .long("artifacts-dir")
                .value_name("DIR")
                .help("Directory holding the trained model artifacts"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(["trace", "debug", "info", "warn", "error"])
                .help("Override the log level"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .value_parser(["pretty", "json"])
                .help("Select log output format"),
        )
        .get_matches();

    let config = AppConfig::load(&matches)?;
    init_logging(&config)?;

    info!(
        "Loading model artifacts from {}",
        config.artifacts_dir.display()
    );
    let artifacts = Artifacts::load(&config.artifacts_dir).with_context(|| {
        format!(
            "failed to load model artifacts from {}",
            config.artifacts_dir.display()
        )
    })?;
    info!(
        "Model v{} ready: {} features, {} encoded columns",
        artifacts.model.version,
        artifacts.feature_order.len(),
        artifacts.encoders.len()
    );

    let state = AppState::new(Predictor::new(artifacts));
    let addr = format!("{}:{}", config.rpc_host, config.rpc_port);
    info!("Starting prediction API on {}", addr);

    start_server(state, &addr).await
}
