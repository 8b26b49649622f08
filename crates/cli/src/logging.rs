//! Logging and execution trace setup
//!
//! Installs a stderr log layer filtered by `RUST_LOG` and, when a trace path
//! is given, a second layer that records the whole run (span open/close and
//! every event from the llama crates) into that file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use llama_core::{Error, Result};

/// Crates whose spans and events are traced at every level
const TRACED_TARGETS: &[&str] = &["llama", "llama_cli", "llama_core", "llama_s3"];

/// Extra directives enabled by --debug-aws
const PROVIDER_DIRECTIVES: &str = "aws_smithy_runtime=debug,aws_sdk_s3=debug,llama_s3::wire=debug";

/// Install the global subscriber
///
/// Returns the trace sink when `trace` is set; the caller closes it once the
/// command has finished.
pub fn init(debug: bool, debug_provider: bool, trace: Option<&Path>) -> Result<Option<TraceSink>> {
    let sink = trace.map(TraceSink::create).transpose()?;

    let directives = filter_directives(
        std::env::var(EnvFilter::DEFAULT_ENV).ok(),
        debug,
        debug_provider,
    );
    let stderr_filter = EnvFilter::try_new(&directives)
        .map_err(|e| Error::Config(format!("invalid log filter '{directives}': {e}")))?;

    let trace_layer = sink.as_ref().map(|sink| {
        let writer = sink.writer();
        let targets = TRACED_TARGETS
            .iter()
            .fold(Targets::new().with_default(LevelFilter::INFO), |targets, target| {
                targets.with_target(*target, LevelFilter::TRACE)
            });
        fmt::layer()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
            .with_filter(targets)
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_filter(stderr_filter))
        .with(trace_layer)
        .try_init()
        .map_err(|e| Error::General(format!("failed to install logger: {e}")))?;

    Ok(sink)
}

/// Stderr filter directives: RUST_LOG if set, else quiet unless --debug
fn filter_directives(env: Option<String>, debug: bool, debug_provider: bool) -> String {
    let mut directives = match env {
        Some(env) if !env.trim().is_empty() => env,
        _ if debug => "debug".to_string(),
        _ => "off".to_string(),
    };
    if debug_provider {
        directives.push(',');
        directives.push_str(PROVIDER_DIRECTIVES);
    }
    directives
}

type SharedFile = Arc<Mutex<Option<BufWriter<File>>>>;

/// Owner of the trace output file
///
/// The file is flushed and closed exactly once, by [`TraceSink::close`] or on drop.
#[derive(Debug)]
pub struct TraceSink {
    path: PathBuf,
    file: SharedFile,
}

impl TraceSink {
    /// Create (or truncate) the trace file
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .map_err(|e| Error::Config(format!("open trace {}: {e}", path.display())))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Arc::new(Mutex::new(Some(BufWriter::new(file)))),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A handle the log layer writes through
    pub fn writer(&self) -> TraceWriter {
        TraceWriter(Arc::clone(&self.file))
    }

    /// Flush and close the file; later calls do nothing
    pub fn close(&self) -> io::Result<()> {
        let writer = self
            .file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match writer {
            Some(writer) => writer.into_inner().map_err(|e| e.into_error())?.sync_all(),
            None => Ok(()),
        }
    }
}

impl Drop for TraceSink {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            eprintln!("failed to close trace {}: {e}", self.path.display());
        }
    }
}

/// Writer handed to the trace layer; writes after close are discarded
#[derive(Debug, Clone)]
pub struct TraceWriter(SharedFile);

impl Write for TraceWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.lock().unwrap_or_else(PoisonError::into_inner).as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.lock().unwrap_or_else(PoisonError::into_inner).as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}
