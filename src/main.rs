//! # es-assistant CLI (`esa`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `esa chat` | Interactive question/answer loop |
//! | `esa ask "<question>"` | Answer one question and exit |
//! | `esa serve stdio` | Tool protocol over stdin/stdout |
//! | `esa serve http` | Tool protocol over HTTP (`POST /rpc`) |
//! | `esa tools` | Print the tool and resource catalog |
//! | `esa check` | Check the Elasticsearch connection |
//!
//! ## Examples
//!
//! ```bash
//! esa --config ./config/esa.toml chat
//! esa ask "show me the 3 most recent posts"
//! echo '{"method":"tools/list","id":1}' | esa serve stdio
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use es_assistant::catalog::ToolCatalog;
use es_assistant::chat::{is_exit, ChatFacade};
use es_assistant::config::{load_config, Config};
use es_assistant::dispatcher::Dispatcher;
use es_assistant::elastic::ElasticsearchGateway;
use es_assistant::keywords::create_extractor;
use es_assistant::{logging, server, stdio};
use es_assistant_core::format::format_categories;
use es_assistant_core::gateway::{SearchGateway, CATEGORY_FIELD};

/// Config file used when `--config` is not given, if it exists.
const DEFAULT_CONFIG_PATH: &str = "./config/esa.toml";

/// es-assistant: question answering over an Elasticsearch index.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Without it, `./config/esa.toml` is used when present and built-in
/// defaults otherwise.
#[derive(Parser)]
#[command(
    name = "esa",
    about = "Answer questions from an Elasticsearch index via chat or a JSON-RPC tool protocol",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session.
    ///
    /// Type `sair`, `exit` or `quit` to leave.
    Chat,

    /// Answer a single question and exit.
    Ask {
        /// The question, e.g. "how many documents per category?".
        question: String,
    },

    /// Serve the tool protocol.
    Serve {
        #[command(subcommand)]
        transport: Transport,
    },

    /// Print the tool and resource catalog.
    Tools,

    /// Check the Elasticsearch connection and print category statistics.
    Check,
}

#[derive(Subcommand)]
enum Transport {
    /// Newline-delimited JSON on stdin/stdout.
    Stdio,
    /// HTTP on `[server].bind`.
    Http,
}

fn resolve_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                load_config(default)
            } else {
                Ok(Config::minimal())
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = resolve_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Tools => {
            print_catalog(&ToolCatalog::with_builtins(&cfg.elasticsearch.index));
            return Ok(());
        }
        Commands::Check => return run_check(&cfg).await,
        _ => {}
    }

    let gateway: Arc<dyn SearchGateway> = Arc::new(ElasticsearchGateway::new(&cfg.elasticsearch)?);
    match gateway.ping().await {
        Ok(version) => info!(url = %cfg.elasticsearch.url, %version, "connected"),
        Err(e) => warn!(url = %cfg.elasticsearch.url, error = %e, "elasticsearch not reachable"),
    }

    match cli.command {
        Commands::Chat => {
            let chat = build_chat(&cfg, gateway)?;
            run_chat(&chat).await?;
        }
        Commands::Ask { question } => {
            let chat = build_chat(&cfg, gateway)?;
            println!("{}", chat.answer(&question).await);
        }
        Commands::Serve { transport } => {
            let catalog = Arc::new(ToolCatalog::with_builtins(&cfg.elasticsearch.index));
            let dispatcher = Dispatcher::new(catalog, gateway);
            match transport {
                Transport::Stdio => stdio::run_stdio(&dispatcher).await?,
                Transport::Http => server::run_http(&cfg, dispatcher).await?,
            }
        }
        Commands::Tools | Commands::Check => {
            // Handled above (before gateway construction)
            unreachable!()
        }
    }

    Ok(())
}

fn build_chat(cfg: &Config, gateway: Arc<dyn SearchGateway>) -> Result<ChatFacade> {
    let extractor = create_extractor(&cfg.llm)?;
    ChatFacade::from_config(&cfg.chat, gateway, extractor)
}

async fn run_chat(chat: &ChatFacade) -> Result<()> {
    println!("Ask a question (or 'sair' to leave).");
    println!();
    println!("Examples:");
    println!("   - Show me the 3 most recent posts");
    println!("   - How many documents per category?");
    println!("   - Search posts about user");
    println!("   - Give me the details of post_1");
    println!("{}", "-".repeat(50));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit(input) {
            println!("Bye!");
            break;
        }

        println!("\nAssistant:");
        println!("{}", chat.answer(input).await);
    }
    Ok(())
}

async fn run_check(cfg: &Config) -> Result<()> {
    let gateway = ElasticsearchGateway::new(&cfg.elasticsearch)?;
    let version = gateway.ping().await?;
    println!("Connected to {} at {}", version, cfg.elasticsearch.url);

    let stats = gateway.index_stats().await?;
    println!(
        "Index '{}': {} documents, {} bytes",
        cfg.elasticsearch.index, stats.document_count, stats.size_in_bytes
    );
    println!();

    let counts = gateway.aggregate_by_field(CATEGORY_FIELD).await?;
    println!("{}", format_categories(&counts));
    Ok(())
}

fn print_catalog(catalog: &ToolCatalog) {
    println!("Tools ({}):", catalog.len());
    for tool in catalog.tools() {
        let params: Vec<String> = tool
            .params()
            .iter()
            .map(|p| {
                let text = format!("{}: {}", p.name, p.kind.as_str());
                match p.default {
                    Some(n) => format!("{} = {}", text, n),
                    None => text,
                }
            })
            .collect();
        println!("  {}({})", tool.name(), params.join(", "));
        println!("      {}", tool.description());
    }

    println!();
    println!("Resources ({}):", catalog.resources().len());
    for resource in catalog.resources() {
        println!("  {} ({})", resource.uri, resource.mime_type);
        println!("      {}", resource.description);
    }
}
