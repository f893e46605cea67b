use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use noir_frame::api::{Alias, ApiClient};
use noir_frame::config::Configuration;
use noir_frame::pipeline;
use noir_frame::preferences::Preferences;
use noir_frame::storage::{JsonFileStore, Storage};
use noir_frame::suggest::{Source, Suggester};
use noir_frame::tasks;
use noir_frame::tasks::viewer::{FileDisplay, LogDisplay, ViewerOptions};

#[derive(Debug, Parser)]
#[command(name = "noir-frame", version, about = "slideshow client for a noir image server")]
struct Args {
    /// Path to YAML config
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Override the configured API endpoint
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Run the slideshow, reading commands from stdin
    Run {
        /// Seconds between automatic advances (<= 0 disables)
        #[arg(long, value_name = "SECONDS", allow_negative_numbers = true)]
        interval: Option<i64>,
        /// Start with this expression instead of the saved one
        #[arg(long, value_name = "EXPR")]
        expression: Option<String>,
    },
    /// Print the paths matching an expression
    Search {
        expression: String,
        /// Append the expression to the server-side history
        #[arg(long)]
        record: bool,
    },
    /// List alias names
    Aliases,
    /// Inspect or edit one alias
    Alias {
        #[command(subcommand)]
        action: AliasCmd,
    },
    /// List tags, or the tags of one file
    Tags {
        #[arg(long, value_name = "PATH")]
        path: Option<String>,
    },
    /// Show server-side and local expression history
    History,
    /// Complete a partial expression (#tag, @alias, !history)
    Suggest { input: String },
}

#[derive(Debug, Subcommand)]
enum AliasCmd {
    Show {
        name: String,
    },
    Set {
        name: String,
        expression: String,
        #[arg(long)]
        recursive: bool,
    },
    Rm {
        name: String,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,noir_frame={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config,
        endpoint,
        verbose,
        command,
    } = Args::parse();
    init_tracing(verbose);

    let mut cfg = Configuration::load_or_default(config.as_deref())?;
    if let Some(endpoint) = endpoint {
        cfg.api_endpoint = endpoint;
    }
    let cfg = cfg.validated().context("invalid configuration values")?;
    tracing::debug!("configuration:\n{:#?}", cfg);

    let api = ApiClient::new(&cfg.api_endpoint, cfg.request_timeout)
        .context("failed to build HTTP client")?;

    match command.unwrap_or(Cmd::Run {
        interval: None,
        expression: None,
    }) {
        Cmd::Run {
            interval,
            expression,
        } => run_slideshow(cfg, api, interval, expression).await,
        Cmd::Search { expression, record } => {
            let items = api.search(&expression, record).await?;
            for item in &items {
                println!("{}", item.path());
            }
            eprintln!("{} item(s)", items.len());
            Ok(())
        }
        Cmd::Aliases => {
            for name in noir_frame::suggest::sort_ignore_case(api.aliases().await?) {
                println!("{name}");
            }
            Ok(())
        }
        Cmd::Alias { action } => run_alias(&api, action).await,
        Cmd::Tags { path } => {
            let tags = match path {
                Some(path) => api.file_tags(&path).await?,
                None => api.tags().await?,
            };
            for tag in noir_frame::suggest::sort_ignore_case(tags) {
                println!("{tag}");
            }
            Ok(())
        }
        Cmd::History => {
            for entry in api.history().await? {
                println!("{:>5}  {}", entry.uses, entry.expression);
            }
            let prefs = Preferences::load(open_storage(&cfg)?);
            for expression in prefs.history().items() {
                println!("local  {expression}");
            }
            Ok(())
        }
        Cmd::Suggest { input } => {
            let (tags, aliases, history) =
                tokio::try_join!(api.tags(), api.aliases(), api.history())?;
            let suggester = Suggester::new(tags, aliases, history);
            for candidate in suggester.suggest(&input) {
                let source = match candidate.source {
                    Source::Tag => "tag",
                    Source::Alias => "alias",
                    Source::History => "history",
                };
                println!("{source:<8}{}", candidate.value);
            }
            Ok(())
        }
    }
}

async fn run_alias(api: &ApiClient, action: AliasCmd) -> Result<()> {
    match action {
        AliasCmd::Show { name } => match api.alias(&name).await? {
            Some(alias) => println!(
                "{name}: {}{}",
                alias.expression,
                if alias.recursive { " (recursive)" } else { "" }
            ),
            None => println!("{name}: not defined"),
        },
        AliasCmd::Set {
            name,
            expression,
            recursive,
        } => {
            let saved = api
                .update_alias(
                    &name,
                    &Alias {
                        expression,
                        recursive,
                    },
                )
                .await
                .with_context(|| format!("failed to save alias {name}"))?;
            println!("{name}: {}", saved.expression);
        }
        AliasCmd::Rm { name } => {
            let removed = api.delete_alias(&name).await?;
            println!("{name}: {}", if removed { "deleted" } else { "not defined" });
        }
    }
    Ok(())
}

fn open_storage(cfg: &Configuration) -> Result<Storage> {
    let store = JsonFileStore::open(&cfg.state_file)
        .with_context(|| format!("failed to open state file {}", cfg.state_file.display()))?;
    tracing::debug!(path = %store.path().display(), "state file opened");
    Ok(Storage::new(store))
}

async fn run_slideshow(
    cfg: Configuration,
    api: ApiClient,
    interval: Option<i64>,
    expression: Option<String>,
) -> Result<()> {
    let mut prefs = Preferences::load(open_storage(&cfg)?);
    if let Some(secs) = interval {
        prefs.set_update_interval(secs)?;
    }
    if let Some(expression) = expression {
        prefs.set_search_expression(&expression)?;
    }

    let cancel = CancellationToken::new();
    let mut tasks = JoinSet::new();

    // Manager, search and loader
    let pipeline::Endpoints { commands, viewer } = pipeline::spawn(
        &mut tasks,
        prefs,
        tasks::manager::ManagerOptions {
            endpoint: cfg.api_endpoint.clone(),
            max_load_retries: cfg.max_load_retries,
            seed: cfg.random_seed,
        },
        api.clone(),
        api.clone(),
        cfg.loader_max_concurrent_fetches,
        &cancel,
    );

    // stdin drives navigation; EOF or `q` ends the slideshow
    tasks::input::spawn_stdin(commands, cancel.clone());

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    // Viewer
    tasks.spawn({
        let options = ViewerOptions {
            clock_timezone: cfg.clock_timezone,
            ..ViewerOptions::default()
        };
        let cancel = cancel.clone();
        let output_path = cfg.output_path.clone();
        async move {
            let result = match output_path {
                Some(path) => {
                    let file_display = FileDisplay::new(path);
                    tracing::info!(path = %file_display.path().display(), "writing images to file");
                    tasks::viewer::run(viewer, file_display, options, Some(api), cancel).await
                }
                None => tasks::viewer::run(viewer, LogDisplay, options, Some(api), cancel).await,
            };
            result.context("viewer task failed")
        }
    });

    // First task to finish (normally on cancel) stops the rest
    let clean = pipeline::drain(&mut tasks, &cancel).await;

    // the blocking stdin reader cannot be interrupted
    std::process::exit(if clean { 0 } else { 1 })
}
