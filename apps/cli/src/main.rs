use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use workflowdeck_core::{
    ActiveWorkflow, DeleteOrder, DeleteRequest, HostEvent, MenuError, WorkflowMenu, WorkflowPath,
};
use workflowdeck_settings::{PreferencesStore, SessionState, SessionStore};
use workflowdeck_store::FsWorkflowStore;

mod render;

const STATE_DIR: &str = ".workflowdeck";

#[derive(Parser)]
#[command(
    name = "workflowdeck",
    about = "Browse, favorite, rename and delete saved workflows",
    author,
    version
)]
struct Cli {
    /// 使用者資料根目錄；預設為目前目錄。 / User-data root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    root: Option<PathBuf>,
    /// 輸出除錯紀錄。 / Emit debug logs on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 顯示工作流程樹。 / Print the workflow tree.
    Tree,
    /// 顯示我的最愛。 / Print favorited workflows.
    Favorites,
    /// 顯示開啟中的工作流程。 / Print workflows the host has open.
    OpenList,
    /// 顯示目前工作流程與未儲存狀態。 / Print the active workflow label.
    Status,
    /// 切換我的最愛。 / Toggle the favorite flag of a workflow.
    Favorite(PathArgs),
    /// 刪除工作流程。 / Delete a workflow.
    Delete(DeleteArgs),
    /// 重新命名或移動工作流程。 / Rename or move a workflow.
    Rename(RenameArgs),
    /// 儲存工作流程內容。 / Save workflow content.
    Save(SaveArgs),
    /// 載入工作流程並設為目前工作流程。 / Load a workflow and make it active.
    Load(PathArgs),
    /// 輸出工作流程內容以插入目前畫面。 / Print workflow content for insertion.
    Insert(PathArgs),
    /// 開始新的未命名工作流程。 / Start a new, unnamed workflow.
    New,
    /// 載入預設工作流程。 / Switch to the default workflow.
    LoadDefault,
    /// 通知：宿主開啟了工作流程。 / Host notification: a workflow was opened.
    OpenWorkflow(IdArgs),
    /// 通知：宿主關閉了工作流程。 / Host notification: a workflow was closed.
    CloseWorkflow(IdArgs),
    /// 檢視或修改設定。 / Inspect or change configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args)]
struct PathArgs {
    /// 命名空間內的工作流程路徑。 / Workflow path inside the namespace (e.g. `team/flow.json`).
    path: String,
}

#[derive(Args)]
struct IdArgs {
    /// 顯示識別字。 / Display identifier.
    id: String,
}

#[derive(Args)]
struct DeleteArgs {
    path: String,
    /// 確認刪除。 / Confirm the deletion.
    #[arg(long)]
    yes: bool,
}

#[derive(Args)]
struct RenameArgs {
    from: String,
    to: String,
    /// 目的地已存在時覆寫。 / Replace the destination if it exists.
    #[arg(long)]
    overwrite: bool,
}

#[derive(Args)]
struct SaveArgs {
    /// 另存新檔名稱；略過時覆寫目前工作流程。 / Save-as name; omitted saves over the active workflow.
    name: Option<String>,
    /// 工作流程內容檔案。 / File holding the workflow content.
    #[arg(long, value_name = "FILE")]
    input: PathBuf,
    /// 目的地已存在時覆寫。 / Replace the destination if it exists.
    #[arg(long)]
    overwrite: bool,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// 輸出目前設定。 / Print the effective configuration.
    Show,
    /// 設定刪除順序。 / Choose when delete commits local changes.
    SetDeleteOrder { order: DeleteOrderChoice },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DeleteOrderChoice {
    RemoteFirst,
    LocalFirst,
}

impl From<DeleteOrderChoice> for DeleteOrder {
    fn from(choice: DeleteOrderChoice) -> Self {
        match choice {
            DeleteOrderChoice::RemoteFirst => DeleteOrder::RemoteFirst,
            DeleteOrderChoice::LocalFirst => DeleteOrder::LocalFirst,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        root,
        verbose,
        command,
    } = Cli::parse();
    let root = resolve_root(root)?;
    let prefs_path = state_dir(&root).join("preferences.json");
    let mut prefs = PreferencesStore::load(&prefs_path)
        .with_context(|| format!("failed to load preferences from {}", prefs_path.display()))?;
    init_tracing(verbose, &prefs.preferences().log_level);
    debug!(root = %root.display(), "workflowdeck starting");

    if let Commands::Config(subcommand) = command {
        return execute_config_command(subcommand, &mut prefs);
    }

    let session_store = SessionStore::new(state_dir(&root).join("session.json"));
    let mut session = session_store
        .load()
        .with_context(|| format!("failed to load {}", session_store.path().display()))?;

    let store = FsWorkflowStore::new(&root).with_index_file(prefs.preferences().index_file.clone());
    let active = ActiveWorkflow::new(session.active_path());
    let mut menu = WorkflowMenu::new(store, prefs.preferences().menu_config(), active.clone());
    menu.notify(HostEvent::UnsavedChanged(session.unsaved));
    menu.notify(HostEvent::OpenSetChanged(session.open_workflows.clone()));

    let outcome = execute(command, &mut menu, &mut session);

    session.set_active_path(active.get().as_ref());
    session.unsaved = menu.is_unsaved();
    session_store
        .save(&session)
        .with_context(|| format!("failed to save {}", session_store.path().display()))?;
    outcome
}

fn execute(
    command: Commands,
    menu: &mut WorkflowMenu<FsWorkflowStore>,
    session: &mut SessionState,
) -> Result<()> {
    match command {
        Commands::Tree => {
            menu.open().context("failed to read workflows")?;
            print!("{}", render::tree(menu));
            Ok(())
        }
        Commands::Favorites => {
            menu.open().context("failed to read workflows")?;
            print!("{}", render::favorites(menu));
            Ok(())
        }
        Commands::OpenList => {
            print!("{}", render::open_list(menu));
            Ok(())
        }
        Commands::Status => {
            let label = menu.label();
            if label.unsaved {
                println!("{} (unsaved)", label.text);
            } else {
                println!("{}", label.text);
            }
            Ok(())
        }
        Commands::Favorite(args) => {
            let path = parse_path(&args.path)?;
            menu.open().context("failed to read workflows")?;
            let now = menu.toggle_favorite(&path)?;
            let verb = if now { "Favorited" } else { "Unfavorited" };
            println!("{verb} {path}");
            Ok(())
        }
        Commands::Delete(args) => execute_delete(args, menu),
        Commands::Rename(args) => execute_rename(args, menu),
        Commands::Save(args) => execute_save(args, menu),
        Commands::Load(args) => {
            let path = parse_path(&args.path)?;
            let content = menu.load_workflow(&path).map_err(|err| user_error(err, &path))?;
            session.open(path.display_name(&menu.config().extension));
            menu.notify(HostEvent::OpenSetChanged(session.open_workflows.clone()));
            println!("{content}");
            Ok(())
        }
        Commands::Insert(args) => {
            let path = parse_path(&args.path)?;
            let content = menu
                .fetch_workflow(&path)
                .map_err(|err| user_error(err, &path))?;
            println!("{content}");
            Ok(())
        }
        Commands::New => {
            menu.new_workflow();
            println!("{}", menu.label().text);
            Ok(())
        }
        Commands::LoadDefault => {
            menu.load_default();
            println!("{}", menu.label().text);
            Ok(())
        }
        Commands::OpenWorkflow(args) => {
            session.open(args.id);
            menu.notify(HostEvent::OpenSetChanged(session.open_workflows.clone()));
            print!("{}", render::open_list(menu));
            Ok(())
        }
        Commands::CloseWorkflow(args) => {
            if !session.close(&args.id) {
                bail!("workflow '{}' is not open", args.id);
            }
            menu.notify(HostEvent::OpenSetChanged(session.open_workflows.clone()));
            print!("{}", render::open_list(menu));
            Ok(())
        }
        Commands::Config(_) => bail!("config commands do not open the workflow menu"),
    }
}

fn execute_delete(args: DeleteArgs, menu: &mut WorkflowMenu<FsWorkflowStore>) -> Result<()> {
    let path = parse_path(&args.path)?;
    menu.open().context("failed to read workflows")?;
    if menu.request_delete(&path)? == DeleteRequest::Armed && !args.yes {
        bail!("refusing to delete '{path}' without --yes");
    }
    match menu.request_delete(&path) {
        Ok(DeleteRequest::Deleted(_)) => {
            println!("Deleted {path}");
            Ok(())
        }
        Ok(DeleteRequest::Armed) => Err(anyhow!("delete of '{path}' was not confirmed")),
        Err(err) => Err(user_error(err, &path)),
    }
}

fn execute_rename(args: RenameArgs, menu: &mut WorkflowMenu<FsWorkflowStore>) -> Result<()> {
    let from = parse_path(&args.from)?;
    let to = parse_path(&args.to)?;
    menu.open().context("failed to read workflows")?;
    match menu.rename(&from, &to, args.overwrite) {
        Ok(()) => {
            println!("Renamed {from} -> {to}");
            Ok(())
        }
        Err(err) if err.is_conflict() => bail!(
            "workflow '{to}' already exists, re-run with --overwrite to replace it"
        ),
        Err(err) => Err(user_error(err, &from)),
    }
}

fn execute_save(args: SaveArgs, menu: &mut WorkflowMenu<FsWorkflowStore>) -> Result<()> {
    let input = resolve_input_path(&args.input)?;
    let content = fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    match menu.save(args.name.as_deref(), &content, args.overwrite) {
        Ok(path) => {
            println!("Saved {path}");
            Ok(())
        }
        Err(err) if err.is_conflict() => bail!(
            "workflow '{}' already exists, re-run with --overwrite to replace it",
            args.name.unwrap_or_default()
        ),
        Err(err) => Err(err.into()),
    }
}

fn execute_config_command(command: ConfigCommand, prefs: &mut PreferencesStore) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let json = serde_json::to_string_pretty(prefs.preferences())
                .context("failed to serialize preferences")?;
            println!("{json}");
            Ok(())
        }
        ConfigCommand::SetDeleteOrder { order } => {
            prefs
                .update(|p| p.delete_order = order.into())
                .with_context(|| format!("failed to save {}", prefs.path().display()))?;
            println!("delete order set to {order:?}");
            Ok(())
        }
    }
}

fn user_error(err: MenuError, path: &WorkflowPath) -> anyhow::Error {
    if err.is_not_found() {
        anyhow!("workflow '{path}' not found")
    } else {
        anyhow::Error::new(err)
    }
}

fn parse_path(raw: &str) -> Result<WorkflowPath> {
    WorkflowPath::parse(raw).with_context(|| format!("invalid workflow path '{raw}'"))
}

fn init_tracing(verbose: bool, configured: &str) {
    let fallback = if verbose { "debug" } else { configured };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().without_time().with_writer(std::io::stderr))
        .try_init();
}

fn state_dir(root: &Path) -> PathBuf {
    root.join(STATE_DIR)
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(path) => resolve_input_path(&path),
        None => std::env::current_dir().context("determine current directory"),
    }
}

fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("determine current directory")?
            .join(path))
    }
}
