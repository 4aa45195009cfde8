use clap::Parser;
use once_cell::sync::OnceCell;
use respaste::{
    clipboard::{
        Clipboard, DirectoryDropTarget, PasteDestination, PasteOutcome, PasteReport, PasteService,
    },
    config::Config,
    errors::{
        api_error::{ApiError, ApiResult},
        domain::map_api_result,
    },
    progress::LogProgressSink,
    project::Project,
    resource::{FsStore, QualifiedName, ResourcePath, ResourceStore},
};
use std::{path::PathBuf, process::ExitCode, sync::Arc};
use tracing::info;

mod args;
use args::{Cli, Commands, PropsAction};

fn init_logging(config: &Config, verbose: bool) {
    static GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();
    let log_dir = &config.log_dir;
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Failed to create log dir {:?}: {}", log_dir, e);
        return;
    }
    let file_appender = tracing_appender::rolling::never(log_dir, "respaste.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = GUARD.set(guard);
    let directive = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = match tracing_subscriber::EnvFilter::try_new(directive) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("Invalid log filter {directive:?}: {e}");
            tracing_subscriber::EnvFilter::new("info")
        }
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(non_blocking);
    if let Err(e) = subscriber.try_init() {
        eprintln!("Failed to init tracing subscriber: {e}");
    }
    info!(log_dir = %log_dir.display(), "logging initialized");
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config, cli.verbose);

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn open_store(workspace: &std::path::Path, config: &Config) -> ApiResult<FsStore> {
    map_api_result(FsStore::open(workspace, config.property_db.clone()))
        .map(|store| store.with_buffer_size(config.copy_buffer_size))
}

fn parse_path(raw: &str) -> ApiResult<ResourcePath> {
    map_api_result(ResourcePath::parse(raw))
}

fn run(command: Commands, config: &Config) -> ApiResult<ExitCode> {
    match command {
        Commands::Paste {
            workspace,
            into,
            drop_dir,
            resources,
            files,
            project,
            read_only,
            json,
        } => handle_paste(
            config,
            PasteArgs {
                workspace,
                into,
                drop_dir,
                resources,
                files,
                project,
                read_only,
                json,
            },
        ),
        Commands::Props { workspace, action } => {
            let store = open_store(&workspace, config)?;
            handle_props(&store, action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

struct PasteArgs {
    workspace: PathBuf,
    into: Option<String>,
    drop_dir: Option<PathBuf>,
    resources: Vec<String>,
    files: Vec<PathBuf>,
    project: String,
    read_only: bool,
    json: bool,
}

fn handle_paste(config: &Config, args: PasteArgs) -> ApiResult<ExitCode> {
    let store = open_store(&args.workspace, config)?;
    let project = if args.read_only {
        Project::read_only(args.project)
    } else {
        Project::new(args.project)
    };
    let service = PasteService::new(Arc::new(store), project).with_throttle(config.throttle());

    let node_paths = args
        .resources
        .iter()
        .map(|raw| parse_path(raw))
        .collect::<ApiResult<Vec<_>>>()?;
    let clipboard = Clipboard::new();
    if !node_paths.is_empty() && !args.files.is_empty() {
        return Err(ApiError::new(
            "invalid_input",
            "Clipboard holds either workspace resources or host files, not both",
        ));
    }
    if args.files.is_empty() {
        clipboard.set_nodes(node_paths);
    } else {
        map_api_result(clipboard.set_files(args.files))?;
    }

    let monitor = service.monitor().with_sink(Arc::new(LogProgressSink));
    let report = match (&args.into, &args.drop_dir) {
        (_, Some(dir)) => {
            let target = map_api_result(DirectoryDropTarget::new(dir))?;
            map_api_result(service.paste_clipboard(
                &clipboard,
                &PasteDestination::Drop(&target),
                &monitor,
            ))?
        }
        (Some(into), None) => map_api_result(service.paste_clipboard(
            &clipboard,
            &PasteDestination::Resource(parse_path(into)?),
            &monitor,
        ))?,
        (None, None) => {
            return Err(ApiError::new(
                "invalid_input",
                "Either --into or --drop-dir is required",
            ))
        }
    };

    if args.json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| ApiError::new("serialization_failed", e.to_string()))?;
        println!("{out}");
    } else {
        print_report(&report);
    }
    if report.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_report(report: &PasteReport) {
    for item in &report.items {
        match &item.outcome {
            PasteOutcome::Pasted { target } => println!("pasted    {} -> {target}", item.name),
            PasteOutcome::Rejected { reason } => println!("failed    {}: {reason}", item.name),
            PasteOutcome::Cancelled => println!("cancelled {}", item.name),
        }
    }
    if let Some(summary) = report.summary() {
        eprintln!("{summary}");
    }
}

fn handle_props(store: &FsStore, action: PropsAction) -> ApiResult<()> {
    match action {
        PropsAction::List { path } => {
            let path = parse_path(&path)?;
            let props = map_api_result(store.persistent_properties(&path))?;
            for (key, value) in props {
                println!("{key}={value}");
            }
        }
        PropsAction::Set { path, key, value } => {
            let path = parse_path(&path)?;
            if map_api_result(store.resolve(&path))?.is_none() {
                return Err(ApiError::new(
                    "not_found",
                    format!("Resource does not exist: {path}"),
                ));
            }
            let key = map_api_result(key.parse::<QualifiedName>())?;
            map_api_result(store.set_persistent_property(&path, &key, &value))?;
            info!(%path, %key, "property set");
        }
    }
    Ok(())
}
