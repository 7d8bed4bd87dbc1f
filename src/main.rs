use std::ffi::OsStr;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use lensify::config::Configuration;
use lensify::download::DownloadSink;
use lensify::effects::{CATALOG, EffectId};
use lensify::events::{Intent, Notice, Snapshot, UploadFile};
use lensify::service::HttpEffectService;
use lensify::tasks::controller;

#[derive(Debug, Parser)]
#[command(name = "lensify", version, about = "photo effect session console")]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Print the effect catalog and exit
    #[arg(long = "list-effects")]
    list_effects: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // init tracing (RUST_LOG controls level, default = info)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let Args {
        config,
        list_effects,
    } = Args::parse();

    if list_effects {
        print_effect_catalog();
        return Ok(());
    }

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::info!(
        service = %cfg.service.base_url,
        timeout = %humantime::format_duration(cfg.service.request_timeout),
        downloads = %cfg.downloads.directory.display(),
        "loaded configuration from {}",
        config.display()
    );

    let service = Arc::new(
        HttpEffectService::new(&cfg.service.base_url, cfg.service.request_timeout)
            .context("failed to build effect service client")?,
    );
    let downloads = DownloadSink::new(cfg.downloads.directory.clone());

    // Channels (small/bounded)
    let (intent_tx, intent_rx) = mpsc::channel::<Intent>(16); // Console -> Controller
    let (snapshot_tx, mut snapshot_rx) = mpsc::channel::<Snapshot>(16); // Controller -> Renderer

    let cancel = CancellationToken::new();

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

    let mut tasks = JoinSet::new();

    // SessionController
    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            controller::run(intent_rx, snapshot_tx, cancel, service, downloads)
                .await
                .context("controller task failed")
        }
    });

    // Bridge blocking stdin lines into the async loop; EOF ends the session.
    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);
    {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) => {
                        if line_tx.blocking_send(line).is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        tracing::warn!("stdin read failed: {err}");
                        break;
                    }
                }
            }
            tracing::info!("stdin closed; initiating shutdown");
            cancel.cancel();
        });
    }

    print_help();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            maybe_snapshot = snapshot_rx.recv() => {
                match maybe_snapshot {
                    Some(snapshot) => render(&snapshot),
                    None => break,
                }
            }

            maybe_line = line_rx.recv() => {
                let Some(line) = maybe_line else { break };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => {
                        cancel.cancel();
                        break;
                    }
                    Ok(Some(Command::Help)) => print_help(),
                    Ok(Some(Command::Effects)) => print_effect_catalog(),
                    Ok(Some(Command::Add(paths))) => match gather_upload_files(&paths) {
                        Ok(files) => {
                            if intent_tx.send(Intent::Upload(files)).await.is_err() {
                                break;
                            }
                        }
                        Err(err) => println!("error: {err:#}"),
                    },
                    Ok(Some(Command::Intent(intent))) => {
                        if intent_tx.send(intent).await.is_err() {
                            break;
                        }
                    }
                    Err(msg) => println!("error: {msg}"),
                }
            }
        }
    }

    cancel.cancel();
    drop(intent_tx);

    // Drain JoinSet (wait for the controller to release its resources)
    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}

#[derive(Debug)]
enum Command {
    Add(Vec<PathBuf>),
    Intent(Intent),
    Effects,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    match head {
        "add" => {
            if rest.is_empty() {
                return Err("add needs at least one file or directory".to_string());
            }
            Ok(Some(Command::Add(rest.iter().map(PathBuf::from).collect())))
        }
        "photo" => {
            let [index] = rest.as_slice() else {
                return Err("usage: photo <index>".to_string());
            };
            let index: usize = index
                .parse()
                .map_err(|_| format!("'{index}' is not a photo index"))?;
            Ok(Some(Command::Intent(Intent::SelectPhoto(index))))
        }
        "effect" => {
            let [id] = rest.as_slice() else {
                return Err("usage: effect <id> (try 'effects')".to_string());
            };
            let effect: EffectId = id.parse().map_err(|err| format!("{err}"))?;
            Ok(Some(Command::Intent(Intent::SelectEffect(effect))))
        }
        "clear" => Ok(Some(Command::Intent(Intent::ClearEffect))),
        "reset" => Ok(Some(Command::Intent(Intent::ClearSession))),
        "commit" => Ok(Some(Command::Intent(Intent::Commit))),
        "effects" => Ok(Some(Command::Effects)),
        "help" => Ok(Some(Command::Help)),
        "quit" | "exit" => Ok(Some(Command::Quit)),
        other => Err(format!("unknown command '{other}' (try 'help')")),
    }
}

/// Reads the named files, expanding directories recursively to files with
/// image extensions. Content-level filtering happens in the controller;
/// this only decides what to read from disk.
fn gather_upload_files(paths: &[PathBuf]) -> Result<Vec<UploadFile>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).follow_links(true) {
                let entry = entry.with_context(|| format!("failed to scan {}", path.display()))?;
                if entry.file_type().is_file() && is_image(entry.path()) {
                    files.push(read_upload_file(entry.path())?);
                }
            }
        } else {
            files.push(read_upload_file(path)?);
        }
    }
    Ok(files)
}

fn read_upload_file(path: &Path) -> Result<UploadFile> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("upload")
        .to_string();
    Ok(UploadFile {
        name,
        bytes: Arc::new(bytes),
    })
}

#[inline]
fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(OsStr::to_str)
            .map(|s| s.to_ascii_lowercase())
            .as_deref(),
        Some("jpg" | "jpeg" | "png" | "gif" | "webp")
    )
}

fn render(snapshot: &Snapshot) {
    if let Some(notice) = &snapshot.notice {
        match notice {
            Notice::UploadAccepted { accepted, rejected } => {
                println!("accepted {accepted} photo(s)");
                for name in rejected {
                    println!("  dropped non-image file: {name}");
                }
            }
            Notice::Rejected(reason) => println!("rejected: {reason}"),
            Notice::PreviewApplied(effect) => println!("preview ready: {}", effect.label()),
            Notice::PreviewFailed(reason) => println!("preview failed: {reason}"),
            Notice::CommitSaved { photos, path } => {
                println!("processed {photos} image(s) -> {}", path.display());
            }
            Notice::CommitFailed(reason) => println!("commit failed: {reason}"),
        }
    }

    if snapshot.photos.is_empty() {
        println!("(no photos loaded)");
        return;
    }
    for (index, photo) in snapshot.photos.iter().enumerate() {
        let marker = if snapshot.active_index == Some(index) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} [{index}] {} ({}, {}x{})",
            photo.name,
            photo.human_size(),
            photo.width,
            photo.height
        );
    }
    let effect = snapshot
        .selected_effect
        .map_or("none", |effect| effect.label());
    let mut status = format!("effect: {effect}");
    if let Some(preview) = &snapshot.preview {
        status.push_str(&format!(", preview {}x{}", preview.width, preview.height));
    }
    if snapshot.preview_pending {
        status.push_str(", preview pending");
    }
    if snapshot.commit_pending {
        status.push_str(", commit pending");
    }
    println!("{status}");
}

fn print_effect_catalog() {
    println!("available effects:");
    for effect in CATALOG {
        println!("  {:<22} {:<14} {}", effect.as_str(), effect.label(), effect.blurb());
    }
}

fn print_help() {
    println!("commands:");
    println!("  add <path>...   load photos (directories are scanned recursively)");
    println!("  photo <index>   switch the active photo");
    println!("  effect <id>     preview an effect on the active photo");
    println!("  clear           drop the previewed effect");
    println!("  commit          apply the effect to every photo and download");
    println!("  reset           clear the whole session");
    println!("  effects         list the effect catalog");
    println!("  quit            exit");
}
