use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use comfy_table::{modifiers, presets, ContentArrangement, Table};
use terminal_size::{terminal_size, Width};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use cms_wizard::config;
use cms_wizard::models::AppState;
use cms_wizard::routes::build_router;
use cms_wizard::services::ContentStore;
use cms_wizard::utils::absolute_url;
use cms_wizard::wizard::{register_defaults, EntryRegistry, FileStaging, LanguageSettings, WizardStorage};

async fn build_state_from_env(env_file: Option<&str>) -> AppState {
    config::load_env_file(env_file);

    let mut builder = EntryRegistry::builder();
    if let Err(e) = register_defaults(&mut builder) {
        tracing::error!(%e, "Failed to register wizard entries");
        eprintln!("{}: {}", yansi::Paint::red("Failed to register wizard entries"), e);
        process::exit(1);
    }
    let registry = builder.build();

    let content_file = config::get_content_file();
    let store = match ContentStore::open(&content_file).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(%e, path = %content_file.display(), "Failed to open content store");
            eprintln!(
                "{} {}: {}",
                yansi::Paint::red("Failed to open content file"),
                content_file.display(),
                e
            );
            process::exit(1);
        }
    };

    AppState {
        registry: Arc::new(registry),
        store,
        wizard_sessions: WizardStorage::new(),
        files: FileStaging::new(config::get_wizard_tmp_dir()),
        languages: Arc::new(LanguageSettings::from_env()),
        public_base_url: config::get_public_base_url(),
        remote_user_header: config::get_remote_user_header(),
        remote_role_header: config::get_remote_role_header(),
    }
}

async fn start_server(state: AppState, host: &str, port: u16) {
    let addr: SocketAddr = match format!("{}:{}", host, port).parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(%e, "Invalid host/port format");
            eprintln!("{}: {}", yansi::Paint::red("Invalid host/port format"), e);
            process::exit(1);
        }
    };
    let ttl = config::get_session_ttl_secs();
    let max_age = chrono::Duration::from_std(Duration::from_secs(ttl)).unwrap_or_else(|_| chrono::Duration::days(36500));
    state.wizard_sessions.spawn_sweeper(
        state.files.clone(),
        Duration::from_secs(config::SESSION_SWEEP_INTERVAL_SECS),
        max_age,
    );
    let app = build_router(state);
    tracing::info!(%addr, ttl_secs = ttl, "Starting wizard server");
    println!(
        "{} {}",
        yansi::Paint::new("Wizard running on").green(),
        yansi::Paint::new(format!("http://{}/wizard/create/", addr)).cyan()
    );
    match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(%e, "Server encountered an error while running");
                eprintln!("{}: {}", yansi::Paint::new("Server error").red(), e);
                process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!(%e, "Failed to bind to address; is the port already in use?");
            eprintln!(
                "{}: {}\n{}",
                yansi::Paint::new(format!("Failed to bind to {}", addr)).red(),
                e,
                yansi::Paint::new("Please stop any process using this port, or start the server with a different --port value.").yellow()
            );
            process::exit(1);
        }
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if let Some((Width(w), _)) = terminal_size() {
        table.set_width(w.saturating_sub(4));
    }
    table
}

#[derive(Parser)]
#[command(
    name = "cms-wizard",
    author,
    version,
    about = "Content creation wizard server",
    long_about = r#"cms-wizard serves a two-step "create" wizard: pick what to create (and where), fill in its form, and get redirected to the new page.

Configuration comes from environment variables or a `.env` file (see `check-config`).

Examples:
  1) Run the server:
      cms-wizard serve --host 127.0.0.1 --port 8080
  2) List the available wizard entries:
      cms-wizard entries
  3) List the pages created so far:
      cms-wizard pages
"#,
    after_help = "Use `cms-wizard <subcommand> --help` to get subcommand specific options."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    /// Disable colorized output
    #[arg(long, global = true)]
    no_color: bool,
    /// Only log warnings and errors
    #[arg(long, global = true)]
    silent: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server
    Serve {
        /// Host to bind to (defaults to HOST, then 127.0.0.1)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (defaults to PORT, then 8080)
        #[arg(long)]
        port: Option<u16>,
        /// Path to .env file
        #[arg(long)]
        env_file: Option<String>,
    },
    /// Validate configuration
    #[command(about = "Validate configuration.", long_about = "Load the environment, open the content file and print the effective settings. Exits non-zero if the content file cannot be read.")]
    CheckConfig { env_file: Option<String> },
    /// List registered wizard entries
    #[command(about = "List wizard entries", long_about = "List the entries offered in the first wizard step, in display order.")]
    Entries,
    /// List stored pages
    #[command(about = "List pages", long_about = "List the pages stored in the content file with their public URLs.")]
    Pages {
        /// Language used to build the page URLs (defaults to LANGUAGE_CODE)
        #[arg(long)]
        language: Option<String>,
        /// Path to .env file
        #[arg(long)]
        env_file: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.silent { "warn" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if cli.no_color {
        yansi::whenever(yansi::Condition::NEVER);
    }

    let Some(command) = cli.command else {
        let state = build_state_from_env(None).await;
        start_server(state, &config::get_host(), config::get_port()).await;
        return;
    };
    match command {
        Commands::Serve { host, port, env_file } => {
            let state = build_state_from_env(env_file.as_deref()).await;
            let host = host.unwrap_or_else(config::get_host);
            let port = port.unwrap_or_else(config::get_port);
            start_server(state, &host, port).await;
        }
        Commands::CheckConfig { env_file } => {
            let state = build_state_from_env(env_file.as_deref()).await;
            let mut table = new_table();
            table.set_header(vec!["Setting", "Value"]);
            let content_file = state
                .store
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(in memory)".into());
            table.add_row(vec!["HOST".to_string(), config::get_host()]);
            table.add_row(vec!["PORT".to_string(), config::get_port().to_string()]);
            table.add_row(vec!["PUBLIC_BASE_URL".to_string(), state.public_base_url.clone()]);
            table.add_row(vec!["CONTENT_FILE".to_string(), content_file]);
            table.add_row(vec!["MEDIA_ROOT".to_string(), config::get_media_root().display().to_string()]);
            table.add_row(vec!["WIZARD_SESSION_TTL_SECS".to_string(), config::get_session_ttl_secs().to_string()]);
            table.add_row(vec!["LANGUAGES".to_string(), state.languages.languages().join(", ")]);
            table.add_row(vec!["LANGUAGE_CODE".to_string(), state.languages.default_language().to_string()]);
            table.add_row(vec!["REMOTE_USER_HEADER".to_string(), state.remote_user_header.clone()]);
            table.add_row(vec!["REMOTE_ROLE_HEADER".to_string(), state.remote_role_header.clone()]);
            println!("\n{table}\n");
            println!(
                "{} ({} pages, {} entries)",
                yansi::Paint::new("Configuration looks valid").green(),
                state.store.page_count(),
                state.registry.len()
            );
        }
        Commands::Entries => {
            let mut builder = EntryRegistry::builder();
            if let Err(e) = register_defaults(&mut builder) {
                eprintln!("{}: {}", yansi::Paint::red("Failed to register wizard entries"), e);
                process::exit(1);
            }
            let registry = builder.build();
            let mut table = new_table();
            table.set_header(vec!["ID", "Title", "Weight", "Template", "Description"]);
            for entry in registry.entries() {
                table.add_row(vec![
                    entry.id().to_string(),
                    entry.title().to_string(),
                    entry.weight().to_string(),
                    entry.template_name().to_string(),
                    entry.description().to_string(),
                ]);
            }
            println!("\n{table}\n");
        }
        Commands::Pages { language, env_file } => {
            let state = build_state_from_env(env_file.as_deref()).await;
            let language = language
                .and_then(|l| state.languages.supported_variant(&l))
                .unwrap_or_else(|| state.languages.default_language().to_string());
            let pages = state.store.pages();
            if pages.is_empty() {
                println!("(no pages)");
                return;
            }
            let mut table = new_table();
            table.set_header(vec!["ID", "Title", "Parent", "Language", "Created by", "URL"]);
            for page in pages {
                table.add_row(vec![
                    page.id.to_string(),
                    page.title.clone(),
                    page.parent_id.map(|p| p.to_string()).unwrap_or_default(),
                    page.language.clone(),
                    page.created_by.clone(),
                    absolute_url(&state.public_base_url, &page.absolute_url(&language)),
                ]);
            }
            println!("\n{table}\n");
        }
    }
}
