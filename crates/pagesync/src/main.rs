use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, CommandFactory, Parser};
use pagesync_core::deploy::{DeployOutcome, DeployReport, deploy_page};
use pagesync_core::editor::open_page_script;
use pagesync_core::reload::{ReloadReport, reload_pages};
use pagesync_core::select::select_page;
use pagesync_core::{PageClient, PageStore, SyncConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pagesync",
    version,
    about = "Pull hosted pages to disk, edit their scripts locally, and deploy changes back"
)]
#[command(group(
    ArgGroup::new("action")
        .args(["reload", "deploy", "show"])
        .multiple(false)
))]
struct Cli {
    #[arg(long, help = "Re-fetch every page into the local cache")]
    reload: bool,
    #[arg(long, help = "Deploy a page if its local copy differs from the server")]
    deploy: bool,
    #[arg(long, help = "Open a page's script in the editor")]
    show: bool,
    #[arg(
        long = "page_id",
        value_name = "ID",
        help = "Page for --deploy/--show (prompts from the cached index when omitted)"
    )]
    page_id: Option<String>,
    #[arg(long, value_name = "PATH", help = "Local cache directory (overrides PAGES_DIR)")]
    pages_dir: Option<PathBuf>,
    #[arg(long, help = "Print reports as JSON")]
    json: bool,
    #[arg(long, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[arg(short, long, help = "Enable debug logging")]
    verbose: bool,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Reload,
    Deploy,
    Show,
}

impl Cli {
    fn action(&self) -> Option<Action> {
        if self.reload {
            Some(Action::Reload)
        } else if self.deploy {
            Some(Action::Deploy)
        } else if self.show {
            Some(Action::Show)
        } else {
            None
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Fatal errors are reported on stdout next to the command's
            // regular output; tracing keeps stderr.
            println!("Error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let Some(action) = cli.action() else {
        let mut command = Cli::command();
        command.print_help()?;
        println!();
        return Ok(());
    };

    let config = SyncConfig::from_env(cli.pages_dir.as_deref())?;
    if cli.diagnostics {
        println!("[diagnostics]\n{}\n", config.diagnostics());
    }
    tracing::debug!("pages_dir={}", config.pages_dir.display());

    let store = PageStore::new(&config.pages_dir);
    store.ensure_root_directory()?;

    match action {
        Action::Reload => run_reload(&config, &store, cli.json),
        Action::Deploy => run_deploy(&config, &store, cli.page_id, cli.json),
        Action::Show => run_show(&config, &store, cli.page_id),
    }
}

fn run_reload(config: &SyncConfig, store: &PageStore, json: bool) -> Result<()> {
    let mut client = PageClient::new(config)?;
    let report = reload_pages(store, &mut client).context("reload failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_reload_report(store, &report);
    }
    Ok(())
}

fn run_deploy(
    config: &SyncConfig,
    store: &PageStore,
    page_id: Option<String>,
    json: bool,
) -> Result<()> {
    let page_id = resolve_page_id(store, page_id)?;
    let mut client = PageClient::new(config)?;
    let report = deploy_page(store, &mut client, &config.token, &page_id)
        .with_context(|| format!("deploy of page {page_id} failed"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_deploy_report(&report);
    }
    Ok(())
}

fn run_show(config: &SyncConfig, store: &PageStore, page_id: Option<String>) -> Result<()> {
    let page_id = resolve_page_id(store, page_id)?;
    let status = open_page_script(store, &config.editor, &page_id)?;
    if !status.success() {
        bail!("editor `{}` exited with {status}", config.editor);
    }
    Ok(())
}

fn resolve_page_id(store: &PageStore, page_id: Option<String>) -> Result<String> {
    if let Some(page_id) = page_id {
        return Ok(page_id);
    }
    let index = store
        .read_index()
        .context("no cached page index; run `pagesync --reload` first")?;
    let page_id = select_page(&index, &mut io::stdin().lock(), &mut io::stdout().lock())?;
    Ok(page_id)
}

fn print_reload_report(store: &PageStore, report: &ReloadReport) {
    println!("reload");
    println!("pages_dir: {}", store.root().to_string_lossy().replace('\\', "/"));
    for page in &report.pages {
        println!("page: {} ({})", page.id, page.title);
    }
    println!("pages.count: {}", report.pages.len());
    println!("requests: {}", report.request_count);
}

fn print_deploy_report(report: &DeployReport) {
    match report.outcome {
        DeployOutcome::Unchanged => {
            println!("No changes: {}", report.page_id);
        }
        DeployOutcome::Updated => {
            println!("changed_fields: {}", report.changed_fields.join(", "));
            if let Some(diff) = &report.script_diff {
                print!("{diff}");
            }
            println!("Deployed: {}", report.page_id);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pagesync=debug,pagesync_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
