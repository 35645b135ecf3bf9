use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling;
use tracing_error::ErrorLayer;
use tracing_log::LogTracer;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::targets::{SUBSYSTEMS, T_GAME, T_MEDIA, T_NET};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER: OnceCell<FilterHandle> = OnceCell::new();

/// Keeps the non-blocking file writers alive. Dropping it flushes them.
pub struct LoggingGuards {
    _writers: Vec<WorkerGuard>,
}

/// Daily-rolling files under one directory, each with its own writer thread.
struct LogFiles {
    dir: PathBuf,
    guards: Vec<WorkerGuard>,
}

impl LogFiles {
    fn open(dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            guards: Vec::new(),
        })
    }

    fn layer<S>(&mut self, file: &str, targets: Targets) -> impl Layer<S> + Send + Sync
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&self.dir, file));
        self.guards.push(guard);
        file_format(writer).with_filter(targets)
    }
}

fn file_format<S>(writer: NonBlocking) -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .compact()
        .with_ansi(false)
        .with_line_number(true)
        .with_thread_names(true)
        .with_writer(writer)
}

/// Installs the global subscriber: stdout, `<root>/logs/<component>.log`,
/// and one file per subsystem target. Without a writable log directory only
/// stdout is kept.
pub fn init(component: &str, root: &Path, cfg: &LoggingConfig) -> Result<LoggingGuards> {
    let (filter, handle) = reload::Layer::new(build_filter(cfg));
    // A second init keeps the first subscriber and its handle.
    let _ = FILTER.set(handle);

    let log_dir = root.join("logs");
    let mut files = LogFiles::open(log_dir.clone());

    let (component_file, game_file, media_file, net_file) = match files.as_mut() {
        Ok(files) => (
            Some(files.layer(&format!("{component}.log"), component_targets())),
            Some(files.layer(&format!("{T_GAME}.log"), only(T_GAME))),
            Some(files.layer(&format!("{T_MEDIA}.log"), only(T_MEDIA))),
            Some(files.layer(&format!("{T_NET}.log"), only(T_NET))),
        ),
        Err(_) => (None, None, None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default())
        .with(fmt::layer().compact().with_line_number(true))
        .with(component_file)
        .with(game_file)
        .with(media_file)
        .with(net_file)
        .try_init()
        .ok();
    LogTracer::init().ok();

    match files {
        Ok(files) => Ok(LoggingGuards {
            _writers: files.guards,
        }),
        Err(err) => {
            tracing::warn!("File logging disabled ({}): {}", log_dir.display(), err);
            Ok(LoggingGuards {
                _writers: Vec::new(),
            })
        }
    }
}

/// Swaps the live filter for one built from `cfg`.
pub fn apply(cfg: &LoggingConfig) -> Result<()> {
    FILTER
        .get()
        .context("logging not initialized")?
        .reload(build_filter(cfg))
        .context("reloading log filter")
}

pub fn build_filter(cfg: &LoggingConfig) -> EnvFilter {
    if !cfg.enabled {
        return EnvFilter::new("off");
    }
    EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Everything except the subsystem targets, which have their own files.
fn component_targets() -> Targets {
    SUBSYSTEMS.iter().fold(
        Targets::new().with_default(LevelFilter::TRACE),
        |targets, target| targets.with_target(*target, LevelFilter::OFF),
    )
}

fn only(target: &'static str) -> Targets {
    Targets::new().with_target(target, LevelFilter::TRACE)
}
