use crate::bridge::DeviceBridge;
use crate::config::ProbeConfig;
use crate::error::{Error, Result};
use crate::naming;
use crate::retrieve::retrieve;
use std::path::{Path, PathBuf};
use std::thread;

/// One attempt to load a target page and capture its traffic.
#[derive(Debug)]
pub struct Trial {
    pub url: String,
    pub index: u32,
    pub device: String,
    pub outcome: TrialOutcome,
}

#[derive(Debug)]
pub enum TrialOutcome {
    /// Artifact confirmed present locally.
    Completed { artifact: PathBuf },
    /// Trial abandoned; no artifact exists for it.
    Abandoned { stage: TrialStage, reason: String },
}

impl TrialOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Step of the per-trial sequence a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialStage {
    Cleanup,
    CaptureStart,
    PageLoad,
    Retrieve,
}

/// Stops the capture exactly once, on whatever path the trial exits.
///
/// The success path stops explicitly before retrieval; drop is the backstop
/// for every failure path after capture-start.
struct CaptureGuard<'a, B: DeviceBridge> {
    bridge: &'a B,
    capture: Option<B::Capture>,
}

impl<'a, B: DeviceBridge> CaptureGuard<'a, B> {
    fn new(bridge: &'a B, capture: B::Capture) -> Self {
        Self {
            bridge,
            capture: Some(capture),
        }
    }

    fn stop(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            log::debug!("stopping capture");
            self.bridge.stop_capture(&mut capture);
        }
    }
}

impl<B: DeviceBridge> Drop for CaptureGuard<'_, B> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Runs measurement trials for one URL on one device, strictly sequentially.
///
/// Each trial walks cleanup, capture-start, page-load, capture-stop and
/// retrieval; any step failure abandons that trial (after the configured
/// backoff) and never the whole run.
pub struct TrialRunner<'a, B: DeviceBridge> {
    bridge: &'a B,
    config: &'a ProbeConfig,
}

impl<'a, B: DeviceBridge> TrialRunner<'a, B> {
    #[must_use]
    pub fn new(bridge: &'a B, config: &'a ProbeConfig) -> Self {
        Self { bridge, config }
    }

    /// Load `url` `trials` times, capturing each load into `local_dir`.
    pub fn run_trials(&self, url: &str, trials: u32, local_dir: &Path) -> Vec<Trial> {
        log::info!("loading {url} {trials} times");

        (0..trials)
            .map(|index| self.run_trial(url, index, local_dir))
            .collect()
    }

    fn run_trial(&self, url: &str, index: u32, local_dir: &Path) -> Trial {
        let outcome = match self.attempt(url, index, local_dir) {
            Ok(artifact) => TrialOutcome::Completed { artifact },
            Err((stage, err)) => {
                log::error!("trial {index} for {url} abandoned ({stage:?}): {err}");
                thread::sleep(self.config.trial_backoff);
                TrialOutcome::Abandoned {
                    stage,
                    reason: err.to_string(),
                }
            }
        };

        Trial {
            url: url.to_string(),
            index,
            device: self.bridge.device().to_string(),
            outcome,
        }
    }

    fn attempt(
        &self,
        url: &str,
        index: u32,
        local_dir: &Path,
    ) -> std::result::Result<PathBuf, (TrialStage, Error)> {
        self.cleanup().map_err(|err| (TrialStage::Cleanup, err))?;

        let remote_file = format!(
            "{}/{}",
            self.config.remote_trace_dir,
            naming::trace_file_name(url, index, &self.config.capture_ext)
        );

        let mut capture = self
            .begin_capture(&remote_file)
            .map_err(|err| (TrialStage::CaptureStart, err))?;

        // Stop the capture whatever the page load did; only then decide the
        // trial's fate.
        let loaded = self.load_page(url);
        capture.stop();
        loaded.map_err(|err| (TrialStage::PageLoad, err))?;

        let artifact = retrieve(self.bridge, &remote_file, local_dir)
            .map_err(|err| (TrialStage::Retrieve, err))?;

        // The capture process should be gone; make sure of it. This is
        // best-effort and does not change the trial's outcome.
        if let Err(err) = self.bridge.kill_process(self.config.capture_process_name()) {
            log::error!("failed to kill leftover capture process: {err}");
        }

        Ok(artifact)
    }

    fn cleanup(&self) -> Result<()> {
        self.bridge.kill_process(self.config.capture_process_name())?;
        self.bridge.force_stop_app(&self.config.browser_package)?;
        self.bridge.kill_background_processes()?;
        self.bridge.clear_directory(&self.config.browser_cache_dir)?;
        self.bridge.clear_directory(&self.config.browser_session_dir)?;
        Ok(())
    }

    fn begin_capture(&self, remote_file: &str) -> Result<CaptureGuard<'a, B>> {
        self.bridge.make_directory(&self.config.remote_trace_dir)?;

        let capture = self
            .bridge
            .start_capture(remote_file, &self.config.capture_filter())?;

        Ok(CaptureGuard::new(self.bridge, capture))
    }

    fn load_page(&self, url: &str) -> Result<()> {
        self.bridge.launch_url(url)?;
        // No load-complete signal exists; wait out the settle period.
        thread::sleep(self.config.settle);
        Ok(())
    }
}
