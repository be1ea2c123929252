use crate::cli::Cli;
use crate::exit_codes::ExitCode;
use crate::report;
use crate::run_error::RunError;
use anyhow::{Context, anyhow};
use pageprobe_core::{
    AdbBridge, AnalyzerConfig, CancelToken, ProbeConfig, ResultSet, TraceAnalyzer, TrialRunner,
    compare, list_devices,
};
use std::path::{Path, PathBuf};

pub async fn run(cli: Cli) -> Result<ExitCode, RunError> {
    let urls =
        collect_urls(&cli.load_pages, cli.url_file.as_deref()).map_err(RunError::InvalidInput)?;

    let traces_dir = cli.outdir.join("traces");
    std::fs::create_dir_all(&traces_dir)
        .with_context(|| format!("failed to create output directory {}", cli.outdir.display()))
        .map_err(RunError::RuntimeError)?;

    let config = ProbeConfig {
        settle: cli.settle,
        trial_backoff: cli.backoff,
        ..ProbeConfig::default()
    };

    if !urls.is_empty() {
        let device = match cli.device.clone() {
            Some(device) => device,
            None => detect_device(&config.adb)?,
        };

        load_pages(urls, device, config, cli.trials, traces_dir).await?;
    }

    if let Some(trace_dir) = &cli.trace_dir {
        analyze_traces(trace_dir).await?;
    }

    if !cli.result_files.is_empty() {
        let bundle = compare(&cli.result_files)
            .map_err(|err| RunError::RuntimeError(anyhow::Error::new(err)))?;
        report::print_comparison(&bundle);
    }

    Ok(ExitCode::Success)
}

/// Use the first device id listed by the bridge; warn when there is a choice.
fn detect_device(adb: &str) -> Result<String, RunError> {
    let devices = list_devices(adb).map_err(|err| {
        RunError::RuntimeError(anyhow::Error::new(err).context("failed to list devices"))
    })?;

    match devices.as_slice() {
        [] => Err(RunError::NoDevice),
        [only] => Ok(only.clone()),
        [first, ..] => {
            log::warn!("multiple devices found, using the first one ({first})");
            Ok(first.clone())
        }
    }
}

async fn load_pages(
    urls: Vec<String>,
    device: String,
    config: ProbeConfig,
    trials: u32,
    traces_dir: PathBuf,
) -> Result<(), RunError> {
    let handle = tokio::task::spawn_blocking(move || {
        let bridge = AdbBridge::new(device, config.clone());
        let runner = TrialRunner::new(&bridge, &config);

        for url in &urls {
            let run = runner.run_trials(url, trials, &traces_dir);
            let completed = run.iter().filter(|t| t.outcome.is_completed()).count();
            log::info!("{url}: captured {completed}/{} trials", run.len());
        }
    });

    handle
        .await
        .map_err(|err| RunError::RuntimeError(anyhow!("page-load task failed: {err}")))
}

async fn analyze_traces(trace_dir: &Path) -> Result<(), RunError> {
    if !trace_dir.is_dir() {
        log::warn!("trace directory {} does not exist, skipping analysis", trace_dir.display());
        return Ok(());
    }

    let analyzer_config = AnalyzerConfig::default();
    let paths = collect_traces(trace_dir, "pcap").map_err(RunError::RuntimeError)?;

    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        log::warn!("interrupt received, cancelling analysis");
        interrupt.cancel();
    });

    let analyzer = TraceAnalyzer::new(analyzer_config);
    let worker_cancel = cancel.clone();
    let samples = tokio::task::spawn_blocking(move || analyzer.analyze_all(&paths, &worker_cancel))
        .await
        .map_err(|err| RunError::RuntimeError(anyhow!("analysis task failed: {err}")))?
        .map_err(|err| RunError::RuntimeError(anyhow::Error::new(err)))?;

    let results = ResultSet::from_samples(samples);
    results
        .persist(&trace_dir.join("results.json"))
        .map_err(|err| RunError::RuntimeError(anyhow::Error::new(err)))?;

    Ok(())
}

fn collect_urls(args: &[String], url_file: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let mut urls = Vec::new();

    if let Some(file) = url_file {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read URL file {}", file.display()))?;
        urls.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from),
        );
    }

    urls.extend(args.iter().cloned());
    Ok(urls)
}

fn collect_traces(dir: &Path, ext: &str) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read trace directory {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to read trace directory {}", dir.display()))?
            .path();
        if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            paths.push(path);
        }
    }

    paths.sort();
    Ok(paths)
}
