use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use videolink::{Config, create_app, startup_checks, store::VideoLinkStore, video};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// Manage stored video links
    #[command(subcommand)]
    Link(LinkCommands),

    /// Print how a video URL would be played, as JSON
    Resolve {
        url: String,
    },
}

#[derive(Subcommand, Debug)]
enum LinkCommands {
    /// List all video links
    List,
    /// Show the video link of an image
    Get { attachment_id: u64 },
    /// Attach a video URL to an image
    Set { attachment_id: u64, video_url: String },
    /// Remove the video link of an image
    Clear { attachment_id: u64 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Some(Commands::Link(link_cmd)) => {
            let config = load_config(&cli.config)?;
            handle_link_command(&config, link_cmd).await
        }
        Some(Commands::Resolve { url }) => {
            let directive = video::resolve(url.trim());
            println!("{}", serde_json::to_string_pretty(&directive)?);
            Ok(())
        }
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(cli.config, port, host, quit_after).await,
        None => run_server(cli.config, None, None, None).await,
    }
}

fn load_config(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        Ok(toml_edit::de::from_str::<Config>(&config_content)?)
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Ok(Config::default())
    }
}

async fn handle_link_command(
    config: &Config,
    cmd: LinkCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = VideoLinkStore::open(config.video.store_file.clone()).await?;

    match cmd {
        LinkCommands::List => {
            let links = store.list().await;
            if links.is_empty() {
                println!("No video links in {:?}", config.video.store_file);
            } else {
                println!("Video links:");
                for link in links {
                    println!(
                        "  {} -> {} (updated {})",
                        link.attachment_id,
                        link.video_url,
                        link.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
            }
        }
        LinkCommands::Get { attachment_id } => match store.get_video_url(attachment_id).await {
            Some(video_url) => {
                let directive = video::resolve(&video_url);
                println!("{}", video_url);
                println!("{}", serde_json::to_string_pretty(&directive)?);
            }
            None => {
                eprintln!("Error: No video link for attachment {}", attachment_id);
                std::process::exit(1);
            }
        },
        LinkCommands::Set {
            attachment_id,
            video_url,
        } => {
            let Some(video_url) = video::sanitize_video_url(&video_url) else {
                eprintln!("Error: '{}' is not a usable video URL", video_url.trim());
                std::process::exit(1);
            };
            store.set_video_url(attachment_id, &video_url).await?;
            println!("Linked attachment {} to {}", attachment_id, video_url);
        }
        LinkCommands::Clear { attachment_id } => {
            if store.delete_video_url(attachment_id).await? {
                println!("Removed video link from attachment {}", attachment_id);
            } else {
                eprintln!("Error: No video link for attachment {}", attachment_id);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_server(
    config_path: PathBuf,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&config_path)?;

    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    info!("Configuration loaded from: {:?}", config_path);
    info!("Template directory: {:?}", config.templates.directory);
    info!(
        "Static files directory: {:?}",
        config.static_files.directory
    );
    info!("Catalog file: {:?}", config.catalog.file);
    info!("Video link store: {:?}", config.video.store_file);
    info!("Video display mode: {}", config.video.display_mode);

    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => info!("All startup checks passed"),
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }
            let critical_error = errors.iter().any(|e| {
                matches!(
                    e,
                    startup_checks::StartupCheckError::StoreDirectoryCreationFailed(_)
                )
            });

            if critical_error {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let app = create_app(config.clone()).await?;

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = app.into_make_service_with_connect_info::<SocketAddr>();

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
