use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pms::api::{self, StoreKind};
use pms::{controller_from_config, Config, SessionFile, SyncController};
use pms_core::derive::{self, FilterId, SortDirection, SortField, SortSpec};
use pms_core::models::EntityId;
use pms_core::state::{Action, AppState, Effect};

#[derive(Parser)]
#[command(name = "pms")]
#[command(about = "Project, task and team tracking")]
struct Cli {
    /// Config file (defaults to $PMS_CONFIG, then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Endpoint profile (nodejs, php or one defined in the config)
    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP backend
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Persistence store
        #[arg(long, value_enum, default_value = "json")]
        store: StoreKind,

        /// Directory for the database and uploads
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// List dashboard projects
    Projects {
        /// all, planning, inprogress, delivered or upcoming
        #[arg(short, long, default_value = "all")]
        filter: String,

        /// name, status, priority, start_date, deadline or progress
        #[arg(short, long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Match name, description or tech stack
        #[arg(long)]
        search: Option<String>,
    },
    /// List team members
    Users,
    /// List tasks
    Tasks {
        /// Only tasks assigned to the logged in user
        #[arg(long)]
        mine: bool,
    },
    /// Remember a user as the current session
    Login { user_id: i64 },
    /// Forget the current session
    Logout,
    /// Show the current session user
    Whoami,
    /// Check backend reachability
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pms=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(profile) = cli.profile {
        config.profile = profile;
    }

    match cli.command {
        Some(Commands::Serve {
            port,
            store,
            data_dir,
        }) => serve(&config, port, store, data_dir).await?,
        None => serve(&config, 3000, StoreKind::Json, None).await?,
        Some(Commands::Projects {
            filter,
            sort,
            desc,
            search,
        }) => {
            let sort = match sort {
                Some(raw) => {
                    let field = SortField::from_str(&raw)
                        .with_context(|| format!("unknown sort field {raw:?}"))?;
                    let direction = if desc {
                        SortDirection::Desc
                    } else {
                        SortDirection::Asc
                    };
                    Some(SortSpec { field, direction })
                }
                None => None,
            };
            let state = load(&config, None).await?;
            let list = derive::dashboard(
                &state.projects,
                &FilterId::parse(&filter),
                sort,
                search.as_deref().unwrap_or(""),
            );
            for project in &list {
                println!(
                    "{:>4}  {:<28} {:<15} {:>3}%  {:<8} {}",
                    project.id,
                    project.name,
                    project.status.as_str(),
                    project.progress,
                    project.priority.as_str(),
                    project
                        .deadline
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "-".into()),
                );
            }
            let stats = derive::stats_summary(&state.projects);
            println!(
                "\n{} projects, {} in development, {} delivered, {} upcoming",
                stats.total, stats.in_development, stats.delivered, stats.upcoming
            );
        }
        Some(Commands::Users) => {
            let state = load(&config, None).await?;
            for member in derive::team(&state.users, &state.tasks) {
                println!(
                    "{:>4}  {:<24} {:<8} {:<24} {} tasks",
                    member.user.id,
                    member.user.name,
                    member.user.role.as_str(),
                    member.user.title,
                    member.assigned_tasks
                );
            }
        }
        Some(Commands::Tasks { mine }) => {
            let session = session_file(&config)?;
            let state = load(&config, session.load()?).await?;
            let tasks = if mine {
                let user = state
                    .current_user
                    .as_ref()
                    .context("not logged in; run `pms login <user-id>`")?;
                derive::my_tasks(&state.tasks, user.id)
            } else {
                state.tasks.iter().collect()
            };
            for task in tasks {
                println!(
                    "{:>4}  {:<32} {:<12} {:<8} {:<20} {}",
                    task.id,
                    task.title,
                    task.status,
                    task.priority.as_str(),
                    task.project_name.as_deref().unwrap_or("-"),
                    task.assigned_user_name.as_deref().unwrap_or("-"),
                );
            }
        }
        Some(Commands::Login { user_id }) => {
            let session = session_file(&config)?;
            let controller = controller_from_config(&config)?;
            let mut state = load_with(&controller, None).await?;
            let effects = controller
                .dispatch(&mut state, Action::Login(EntityId::new(user_id)))
                .await;
            if let Some(notice) = state.notice.take() {
                anyhow::bail!("{}", notice.message);
            }
            persist(&session, effects)?;
            if let Some(user) = &state.current_user {
                println!("Logged in as {} ({})", user.name, user.role.as_str());
            }
        }
        Some(Commands::Logout) => {
            session_file(&config)?.clear()?;
            println!("Logged out");
        }
        Some(Commands::Whoami) => {
            let session = session_file(&config)?;
            let controller = controller_from_config(&config)?;
            let mut state = AppState::new(session.load()?);
            let effects = controller.dispatch(&mut state, Action::Refresh).await;
            persist(&session, effects)?;
            match &state.current_user {
                Some(user) => println!("{} ({}) {}", user.name, user.role.as_str(), user.title),
                None => println!("Not logged in"),
            }
        }
        Some(Commands::Status) => {
            let controller = controller_from_config(&config)?;
            println!("Checking {} ...", controller.client().base_url());
            match controller.client().list_projects().await {
                Ok(projects) => println!("Backend reachable ({} projects)", projects.len()),
                Err(e) => println!("Backend unreachable: {e}"),
            }
        }
    }

    Ok(())
}

async fn serve(
    config: &Config,
    port: u16,
    store: StoreKind,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let data_dir = match data_dir {
        Some(dir) => dir,
        None => config.data_dir()?,
    };
    tracing::info!(port, ?store, data_dir = %data_dir.display(), "Starting pms server");

    let db = api::open_store(store, &data_dir)?;
    let app = api::create_router(db, data_dir.join("uploads"));

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("pms server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn session_file(config: &Config) -> anyhow::Result<SessionFile> {
    Ok(SessionFile::new(config.session_path()?))
}

async fn load(config: &Config, saved_session: Option<EntityId>) -> anyhow::Result<AppState> {
    let controller = controller_from_config(config)?;
    load_with(&controller, saved_session).await
}

/// Fetch every collection into a fresh state, failing on any notice.
async fn load_with(
    controller: &SyncController,
    saved_session: Option<EntityId>,
) -> anyhow::Result<AppState> {
    let mut state = AppState::new(saved_session);
    controller.dispatch(&mut state, Action::Refresh).await;
    if let Some(notice) = state.notice.take() {
        anyhow::bail!("could not load data from the backend: {}", notice.message);
    }
    Ok(state)
}

fn persist(session: &SessionFile, effects: Vec<Effect>) -> anyhow::Result<()> {
    for effect in effects {
        if let Effect::PersistSession(user_id) = effect {
            session.store(user_id)?;
        }
    }
    Ok(())
}
