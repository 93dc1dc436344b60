use std::{path::PathBuf, sync::Arc, time::Duration};

use color_eyre::{
    Result,
    eyre::{WrapErr, eyre},
};
use crossterm::event::EventStream;
use drugprice::{
    auth::UserSession,
    catalog::{ColumnPreset, Field, RecordId},
    config::{Config, project_dirs},
    gateway::{Gateway, RestGateway},
    query::PageSize,
};
use ratatui::DefaultTerminal;
use tokio_stream::StreamExt;

mod env;
mod logging;
mod subcommands;
mod widgets;

use subcommands::{FilterArgs, SortArgs};

#[derive(clap::Parser)]
#[command(
    name = "drugprice",
    version,
    about = "Search, browse and export tendered drug prices",
    long_about = None
)]
struct Cli {
    /// Increase output verbosity (-v, -vv, etc.)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the hosted catalog database
    #[arg(long, global = true)]
    url: Option<String>,

    /// API key for the hosted catalog database
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print one page of matching rows
    Search {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        sort: SortArgs,
        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Rows per page: 20, 50 or 100
        #[arg(long)]
        page_size: Option<PageSize>,
        /// Column preset: essential, pricing, detailed, procurement, all
        #[arg(long, default_value = "essential")]
        columns: ColumnPreset,
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },
    /// Unit-price statistics over the matching rows
    Stats {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },
    /// Distinct values of a column, for building filters
    Distinct {
        field: Field,
        #[arg(long, default_value_t = subcommands::distinct::DEFAULT_LIMIT)]
        limit: usize,
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },
    /// Write matching rows to an .xlsx file
    Export {
        #[command(subcommand)]
        target: ExportTarget,
    },
    /// Ask the AI service for drugs related to an ingredient
    Suggest {
        #[arg(long)]
        ingredient: String,
        #[arg(long, default_value = "")]
        concentration: String,
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },
    /// Sign in and remember the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, conflicts_with = "password_stdin")]
        password: Option<String>,
        /// Read the password from standard input
        #[arg(long)]
        password_stdin: bool,
    },
    /// Forget the saved session
    Logout,
    /// Show the signed-in user
    Whoami,
}

#[derive(clap::Subcommand)]
enum ExportTarget {
    /// One 1000-row batch of a search
    Batch {
        #[command(flatten)]
        filters: FilterArgs,
        #[command(flatten)]
        sort: SortArgs,
        /// 1-based batch number
        #[arg(long, default_value_t = 1)]
        batch: u64,
        /// Output directory (defaults to the configured export_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Specific rows by id
    Ids {
        #[arg(required = true)]
        ids: Vec<RecordId>,
        #[command(flatten)]
        sort: SortArgs,
        /// Output directory (defaults to the configured export_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = <Cli as clap::Parser>::parse();

    let log_path = project_dirs().map(|dirs| dirs.data_dir().join("drugprice.log"));
    let sink = match (&cli.command, log_path.as_deref()) {
        (None, Some(path)) => logging::Sink::File(path),
        (None, None) => return Err(eyre!("could not determine a data directory")),
        (Some(_), _) => logging::Sink::Stderr,
    };
    logging::init(cli.verbose, sink)?;

    let mut config = Config::load(cli.config.as_deref()).wrap_err("failed to load config")?;
    if let Some(url) = cli.url {
        config.url = url;
    }
    if let Some(key) = cli.api_key {
        config.api_key = key;
    }

    // These don't touch the catalog.
    match &cli.command {
        Some(Commands::Logout) => return subcommands::account::logout(),
        Some(Commands::Whoami) => return subcommands::account::whoami(),
        Some(Commands::Suggest {
            ingredient,
            concentration,
            json,
        }) => {
            let options = subcommands::suggest::Options {
                ingredient: ingredient.clone(),
                concentration: concentration.clone(),
                json: *json,
            };
            return subcommands::suggest::command(&config.ai, options).await;
        }
        _ => {}
    }

    config.validate()?;
    let gateway = Arc::new(RestGateway::from_config(&config)?);

    match cli.command {
        Some(Commands::Search {
            filters,
            sort,
            page,
            page_size,
            columns,
            json,
        }) => {
            let options = subcommands::search::Options {
                filters,
                sort,
                page,
                page_size: page_size.unwrap_or_else(|| config.page_size()),
                columns,
                json,
            };
            subcommands::search::command(gateway.as_ref(), options).await
        }
        Some(Commands::Stats { filters, json }) => {
            let options = subcommands::stats::Options { filters, json };
            subcommands::stats::command(gateway.as_ref(), options).await
        }
        Some(Commands::Distinct { field, limit, json }) => {
            let options = subcommands::distinct::Options { field, limit, json };
            subcommands::distinct::command(gateway.as_ref(), options).await
        }
        Some(Commands::Export { target }) => {
            let (target, sort, out) = match target {
                ExportTarget::Batch {
                    filters,
                    sort,
                    batch,
                    out,
                } => (
                    subcommands::export::Target::Batch {
                        filters,
                        number: batch,
                    },
                    sort,
                    out,
                ),
                ExportTarget::Ids { ids, sort, out } => {
                    (subcommands::export::Target::Ids(ids), sort, out)
                }
            };
            let options = subcommands::export::Options {
                target,
                sort,
                out_dir: out.unwrap_or_else(|| config.export_dir.clone()),
            };
            subcommands::export::command(gateway, options).await
        }
        Some(Commands::Login {
            username,
            password,
            password_stdin: _,
        }) => {
            let password = match password {
                Some(password) => subcommands::account::Password::Given(password),
                None => subcommands::account::Password::Stdin,
            };
            let options = subcommands::account::LoginOptions { username, password };
            subcommands::account::login(&config, options).await
        }
        Some(Commands::Logout | Commands::Whoami | Commands::Suggest { .. }) => Ok(()),
        None => {
            let user = signed_in_user(&config)?;
            App::new(gateway, config, user).run_tui().await
        }
    }
}

fn signed_in_user(config: &Config) -> Result<Option<UserSession>> {
    let user = subcommands::account::session_store()?.load();
    if config.require_login && user.is_none() {
        return Err(eyre!(
            "Vui lòng đăng nhập trước: drugprice login --username <TÊN>"
        ));
    }
    Ok(user)
}

struct App {
    gateway: Arc<dyn Gateway>,
    config: Config,
    user: Option<UserSession>,
}

impl App {
    const FRAMES_PER_SECOND: f32 = 30.0;

    fn new(gateway: Arc<dyn Gateway>, config: Config, user: Option<UserSession>) -> Self {
        Self {
            gateway,
            config,
            user,
        }
    }

    pub async fn run_tui(self) -> Result<()> {
        // Probe the terminal background before raw mode takes over.
        widgets::theme::Theme::detect();
        let terminal = ratatui::init();
        let app_result = self.run(terminal).await;
        ratatui::restore();
        app_result
    }

    async fn run(self, mut terminal: DefaultTerminal) -> Result<()> {
        let mut env = env::Env::new();
        let (mut browser, mut search_events) =
            widgets::Browser::new(self.gateway, &self.config, env.tx(), self.user);
        browser.start();

        let period = Duration::from_secs_f32(1.0 / Self::FRAMES_PER_SECOND);
        let mut interval = tokio::time::interval(period);
        let mut events = EventStream::new();

        while !browser.should_quit() {
            tokio::select! {
                _ = interval.tick() => {
                    browser.tick();
                    terminal.draw(|frame| browser.render(frame))?;
                },
                Some(Ok(event)) = events.next() => browser.handle_event(&event),
                Some(event) = search_events.recv() => browser.handle_session_event(event),
                Some(message) = env.rx().recv() => browser.handle_message(message),
            }
        }
        Ok(())
    }
}
