use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use listenfd::ListenFd;
use sveltide::{create_app, Config, ContextData, DirFs, Entry, Props, RouteTable};
use sveltide_render::{RenderData, RenderOutput, Renderer, DEFAULT_ERROR_PAGE};
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sveltide - Server-side render Svelte builds
#[derive(Parser, Debug)]
#[command(name = "sveltide")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log as JSON lines
    #[arg(long, global = true, env = "SVELTIDE_JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve a route table over HTTP
    Serve {
        /// Host address to bind the server to
        #[arg(long, short = 'H', default_value = "0.0.0.0", env = "HOST")]
        host: String,

        /// Port to listen on
        #[arg(long, short, default_value = "3000", env = "PORT")]
        port: u16,

        /// Build output directory (overrides SVELTIDE_BUILD_DIR)
        #[arg(long)]
        build: Option<PathBuf>,

        /// Route table file
        #[arg(long, default_value = "routes.json", env = "SVELTIDE_ROUTES")]
        routes: PathBuf,
    },
    /// Render one entry chain and print the HTML
    Render {
        /// Build output directory (overrides SVELTIDE_BUILD_DIR)
        #[arg(long)]
        build: Option<PathBuf>,

        /// Layout component, outermost first (repeatable)
        #[arg(long = "layout")]
        layouts: Vec<String>,

        /// Page component
        #[arg(long)]
        page: String,

        /// Page props as a JSON object
        #[arg(long)]
        props: Option<String>,

        /// Error page component
        #[arg(long)]
        error_page: Option<String>,

        /// Request URL exposed to components
        #[arg(long, default_value = "http://localhost/")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sveltide=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let mut config = Config::from_env();
    match cli.command {
        Command::Serve {
            host,
            port,
            build,
            routes,
        } => {
            if let Some(build) = build {
                config.build_dir = build;
            }
            serve(config, &host, port, &routes).await
        }
        Command::Render {
            build,
            layouts,
            page,
            props,
            error_page,
            url,
        } => {
            if let Some(build) = build {
                config.build_dir = build;
            }
            config.workers = 1;
            render_once(config, layouts, page, props, error_page, url).await
        }
    }
}

async fn serve(config: Config, host: &str, port: u16, routes: &Path) -> Result<()> {
    let source = std::fs::read_to_string(routes)
        .with_context(|| format!("Failed to read route table {}", routes.display()))?;
    let table = RouteTable::from_json(&source)
        .with_context(|| format!("Invalid route table {}", routes.display()))?;

    let renderer = Arc::new(init_renderer(&config)?);
    let app = create_app(renderer, &table);

    // Auto-reload support via listenfd
    let mut listenfd = ListenFd::from_env();
    let listener = match listenfd.take_tcp_listener(0)? {
        // If we are given a tcp listener on listen fd 0, use that one
        Some(listener) => {
            listener.set_nonblocking(true)?;
            TcpListener::from_std(listener)?
        }
        // Otherwise fall back to CLI-specified host:port
        None => {
            let addr = format!("{host}:{port}");
            TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?
        }
    };

    tracing::info!("listening on {}", listener.local_addr()?);

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn render_once(
    config: Config,
    layouts: Vec<String>,
    page: String,
    props: Option<String>,
    error_page: Option<String>,
    url: String,
) -> Result<()> {
    let props: Option<Props> = props
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .context("--props must be a JSON object")?;

    let mut entries: Vec<Entry> = layouts
        .into_iter()
        .map(|component| Entry::new(component, None))
        .collect();
    entries.push(Entry::new(page, props));

    let data = RenderData::new(
        entries,
        error_page.unwrap_or_else(|| DEFAULT_ERROR_PAGE.to_string()),
        ContextData { url },
    );

    let renderer = init_renderer(&config)?;
    let mut out = RenderOutput::new();
    renderer
        .render(&mut out, &data, false)
        .await
        .context("Render failed")?;

    if out.status() != 200 {
        tracing::warn!(status = out.status(), "Render reported an error");
    }
    println!("{}", out.body());
    Ok(())
}

/// Start the renderer over the configured build directory.
///
/// Spawns the engine pool and loads the server bundle on every worker.
fn init_renderer(config: &Config) -> Result<Renderer> {
    let renderer_config = config
        .renderer_config()
        .context("Invalid renderer configuration")?;

    tracing::info!(
        workers = renderer_config.worker_count,
        build = %config.build_dir.display(),
        node_env = %renderer_config.node_env,
        "Initializing renderer"
    );

    let build_fs = Arc::new(DirFs::new(config.build_dir.clone()));
    let renderer = Renderer::new(build_fs, renderer_config)
        .with_context(|| format!("Failed to start renderer for {}", config.build_dir.display()))?;

    Ok(renderer)
}

/// Wait for shutdown signals (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
