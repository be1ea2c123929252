use crate::config::AnalyzerConfig;
use crate::error::{Error, Result};
use crate::naming;
use crate::results::Sample;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Cooperative cancellation flag shared between the caller (e.g. an interrupt
/// handler) and the analysis workers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Extracts (url, duration, bytes) samples from capture artifacts by running
/// the external protocol-analysis tool over each one.
#[derive(Debug, Clone)]
pub struct TraceAnalyzer {
    config: AnalyzerConfig,
}

impl TraceAnalyzer {
    #[must_use]
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    /// Analyze a batch of artifacts with bounded parallelism.
    ///
    /// Artifacts that fail to parse are skipped (logged) and cost the batch
    /// nothing. Blocks until every artifact is processed, unless `cancel`
    /// trips: then no further work is dispatched, in-flight work gets a
    /// bounded drain, and the batch fails with [`Error::AnalysisCancelled`].
    /// Returned sample order is unrelated to submission order.
    pub fn analyze_all(&self, paths: &[PathBuf], cancel: &CancelToken) -> Result<Vec<Sample>> {
        let workers = self
            .config
            .workers
            .unwrap_or_else(available_parallelism);
        let tool = self.config.tool.clone();

        analyze_pool(paths, workers, self.config.cancel_drain, cancel, move |path| {
            analyze_trace(&tool, path)
        })
    }
}

fn available_parallelism() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Worker pool over an in-memory queue of artifact paths.
///
/// Workers share only the read-only queue and the mutex-guarded output; the
/// per-artifact work is injected so the pool machinery is testable without
/// the external tool.
fn analyze_pool<F>(
    paths: &[PathBuf],
    workers: usize,
    cancel_drain: Duration,
    cancel: &CancelToken,
    analyze: F,
) -> Result<Vec<Sample>>
where
    F: Fn(&Path) -> Result<Sample> + Send + Sync + 'static,
{
    if paths.is_empty() {
        return if cancel.is_cancelled() {
            Err(Error::AnalysisCancelled)
        } else {
            Ok(Vec::new())
        };
    }

    let workers = workers.max(1).min(paths.len());
    log::info!("analyzing {} trace(s) on {workers} worker(s)", paths.len());

    let (job_tx, job_rx) = mpsc::channel::<PathBuf>();
    for path in paths {
        // Queueing everything up front is fine: workers stop taking jobs the
        // moment the cancel token trips.
        let _ = job_tx.send(path.clone());
    }
    drop(job_tx);

    let job_rx = Arc::new(Mutex::new(job_rx));
    let results: Arc<Mutex<Vec<Sample>>> = Arc::new(Mutex::new(Vec::with_capacity(paths.len())));
    let analyze = Arc::new(analyze);
    let (done_tx, done_rx) = mpsc::channel::<()>();

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let job_rx = Arc::clone(&job_rx);
        let results = Arc::clone(&results);
        let analyze = Arc::clone(&analyze);
        let cancel = cancel.clone();
        let done_tx = done_tx.clone();

        handles.push(thread::spawn(move || {
            loop {
                if cancel.is_cancelled() {
                    break;
                }

                let job = {
                    let rx = job_rx
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    rx.recv()
                };

                let path = match job {
                    Ok(path) => path,
                    Err(_) => break,
                };

                match analyze(&path) {
                    Ok(sample) => {
                        let mut out = results
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        out.push(sample);
                    }
                    Err(err) => {
                        log::error!("skipping trace {}: {err}", path.display());
                    }
                }
            }

            let _ = done_tx.send(());
        }));
    }
    drop(done_tx);

    let mut finished = 0usize;
    let mut drain_deadline: Option<Instant> = None;
    while finished < workers {
        if drain_deadline.is_none() && cancel.is_cancelled() {
            drain_deadline = Some(Instant::now() + cancel_drain);
        }

        let wait = match drain_deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    // Whatever is still running is abandoned; its thread ends
                    // on its own once the external tool returns.
                    log::warn!("abandoning {} analysis worker(s) after cancel", workers - finished);
                    return Err(Error::AnalysisCancelled);
                }
                (deadline - now).min(Duration::from_millis(100))
            }
            None => Duration::from_millis(100),
        };

        match done_rx.recv_timeout(wait) {
            Ok(()) => finished += 1,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for handle in handles {
        let _ = handle.join();
    }

    if cancel.is_cancelled() {
        return Err(Error::AnalysisCancelled);
    }

    let samples = match Arc::try_unwrap(results) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
        Err(arc) => arc
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone(),
    };
    Ok(samples)
}

/// Run the analysis tool over one artifact and parse its summary.
fn analyze_trace(tool: &str, path: &Path) -> Result<Sample> {
    log::debug!("analyzing trace {}", path.display());

    let url = naming::url_from_artifact(path).ok_or_else(|| {
        Error::TraceParse(format!("artifact name `{}` has no trial index", path.display()))
    })?;

    let mut cmd = Command::new(tool);
    cmd.args(["-q", "-z", "io,stat,0", "-r"])
        .arg(path)
        .stdin(Stdio::null());

    let output = cmd.output()?;
    if !output.status.success() {
        // The tool reports a non-zero status even for well-formed captures;
        // only the presence of parseable summary fields decides success.
        log::debug!(
            "analysis tool exited with {} for {} (ignored)",
            output.status,
            path.display()
        );
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let (duration_secs, bytes) = parse_summary(&stdout)?;

    Ok(Sample {
        url,
        duration_secs,
        bytes,
    })
}

/// Pull elapsed seconds and total bytes out of the tool's `io,stat` summary.
///
/// The two fields sit at fixed positions: the `Duration: <secs> secs` line at
/// index 4, and the bytes column of the single interval row at index 10.
fn parse_summary(text: &str) -> Result<(f64, u64)> {
    let lines: Vec<&str> = text.lines().collect();

    let duration_secs = lines
        .get(4)
        .and_then(|line| line.split(':').nth(1))
        .and_then(|rest| rest.split("secs").next())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| *secs >= 0.0)
        .ok_or_else(|| Error::TraceParse("duration".to_string()))?;

    let bytes = lines
        .get(10)
        .and_then(|line| line.split('|').nth(3))
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| Error::TraceParse("bytes".to_string()))?;

    Ok((duration_secs, bytes))
}
