use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use honest_common::telemetry::{self, TelemetryConfig};
use honest_common::{Config, EnvCredentialStore, FileCredentialStore, HonestError, Layered};
use honest_editor_core::{
    EditorError, EditorSession, HeadlessFactory, Post, PublishOptions, PublishOutcome,
    SaveOutcome, StoreRecord, reconcile,
};
use miette::{IntoDiagnostic, Result};
use serde::de::DeserializeOwned;

mod console;
mod store;

use console::{ConsoleNotifier, OptionsDialog};
use store::FilePostStore;

type Credentials = Layered<Option<FileCredentialStore>, EnvCredentialStore>;

#[derive(Parser)]
#[command(version, about = "Honest - drive the honest post editor from the command line", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(long, global = true, env = "HONEST_CONFIG")]
    config: Option<PathBuf>,

    /// Path to credentials file (JSON object of string values)
    #[arg(long, global = true, env = "HONEST_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Print metrics in prometheus text format when done
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the title a markdown file would get
    Title {
        /// Markdown file
        file: PathBuf,

        /// Title the post was loaded with
        #[arg(long)]
        original: Option<String>,
    },
    /// Validate and save a post
    Save(DraftArgs),
    /// Save a post, then publish it
    Publish {
        #[command(flatten)]
        draft: DraftArgs,

        /// Publish options (JSON); without them the publish is dismissed
        #[arg(long)]
        options: Option<PathBuf>,
    },
}

#[derive(Args)]
struct DraftArgs {
    /// Post to load (JSON)
    #[arg(long)]
    post: PathBuf,

    /// Editor records to replay after loading, one JSON object per line
    #[arg(long)]
    records: Option<PathBuf>,

    /// Output directory
    #[arg(long)]
    out: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    let mut telemetry_config = TelemetryConfig::from_env("honest-cli");
    telemetry_config.metrics |= cli.metrics;
    telemetry::init(telemetry_config);

    match cli.command {
        Commands::Title { file, original } => {
            let markdown = std::fs::read_to_string(&file).into_diagnostic()?;
            match reconcile(&markdown, original.as_deref()) {
                Some(title) => println!("{title}"),
                None => println!("⚠ No title"),
            }
        }
        Commands::Save(draft) => {
            let (config, credentials) = load_settings(cli.config.as_deref(), cli.credentials)?;
            run_draft(config, credentials, draft, Mode::Save).await?;
        }
        Commands::Publish { draft, options } => {
            let (config, credentials) = load_settings(cli.config.as_deref(), cli.credentials)?;
            let options = options
                .map(|path| read_json::<PublishOptions>(&path))
                .transpose()?;
            run_draft(config, credentials, draft, Mode::Publish(options)).await?;
        }
    }

    if cli.metrics {
        print!("{}", telemetry::render());
    }

    Ok(())
}

enum Mode {
    Save,
    Publish(Option<PublishOptions>),
}

fn load_settings(
    config_path: Option<&Path>,
    credentials_path: Option<PathBuf>,
) -> std::result::Result<(Config, Credentials), HonestError> {
    let config = match config_path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // An explicit path must exist; the default one is optional.
    let file = match credentials_path {
        Some(path) => Some(FileCredentialStore::open(path)?),
        None => match default_credentials_path() {
            Some(path) if path.exists() => Some(FileCredentialStore::open(path)?),
            _ => None,
        },
    };
    if let Some(file) = &file {
        tracing::debug!(path = %file.path().display(), "using credentials file");
    }

    Ok((
        config,
        Layered {
            primary: file,
            fallback: EnvCredentialStore,
        },
    ))
}

async fn run_draft(
    config: Config,
    credentials: Credentials,
    draft: DraftArgs,
    mode: Mode,
) -> Result<()> {
    let post: Post = read_json(&draft.post)?;
    let records = match &draft.records {
        Some(path) => read_records(path)?,
        None => Vec::new(),
    };
    tokio::fs::create_dir_all(&draft.out)
        .await
        .into_diagnostic()?;

    let dialog = match &mode {
        Mode::Publish(options) => OptionsDialog::new(options.clone()),
        Mode::Save => OptionsDialog::default(),
    };

    let factory = HeadlessFactory::new();
    let mut session = EditorSession::new(
        config,
        factory.clone(),
        FilePostStore::new(&draft.out),
        ConsoleNotifier,
        dialog,
    )
    .with_credentials(credentials);

    session.set_editor_default();
    let engine_store = factory
        .store()
        .ok_or_else(|| miette::miette!("editor engine did not mount"))?;
    engine_store.dispatch(&StoreRecord::discussion_ready("honest-cli"));
    session.set_post(post)?;

    println!("→ Replaying {} record(s)...", records.len());
    for record in &records {
        engine_store.dispatch(record);
    }

    match mode {
        Mode::Save => match session.save_draft().await? {
            SaveOutcome::Saved => {}
            SaveOutcome::Rejected(reason) => tracing::info!(%reason, "draft not saved"),
            SaveOutcome::Failed(err) => tracing::warn!(error = %err, "draft not saved"),
        },
        Mode::Publish(_) => match session.publish_post().await? {
            PublishOutcome::Published | PublishOutcome::Dismissed => {}
            PublishOutcome::NotSaved(_) => tracing::info!("post not published"),
            PublishOutcome::Failed(err) => tracing::warn!(error = %err, "post not published"),
        },
    }

    let post = session.post().ok_or(EditorError::NoPost)?;
    let out = draft.out.join("post.json");
    store::write_json(&out, &post)
        .await
        .map_err(|e| miette::miette!("Failed to write {}: {e}", out.display()))?;
    println!("✓ Output: {}", out.display());

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .into_diagnostic()
        .map_err(|e| e.wrap_err(format!("Failed to read {}", path.display())))?;
    serde_json::from_str(&contents)
        .into_diagnostic()
        .map_err(|e| e.wrap_err(format!("Failed to parse {}", path.display())))
}

fn read_records(path: &Path) -> Result<Vec<StoreRecord>> {
    let contents = std::fs::read_to_string(path).into_diagnostic()?;
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                miette::miette!("{}:{}: invalid record: {e}", path.display(), n + 1)
            })
        })
        .collect()
}

fn default_credentials_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("honest").join("credentials.json"))
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
