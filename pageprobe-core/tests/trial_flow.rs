use pageprobe_core::{
    DeviceBridge, Error, ProbeConfig, Result, TrialOutcome, TrialRunner, TrialStage,
};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Bridge command, in the order the orchestrator issues them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    KillProcess,
    ForceStopApp,
    KillBackground,
    ClearDirectory,
    MakeDirectory,
    StartCapture,
    StopCapture,
    LaunchUrl,
    Pull,
    RemoveRemote,
}

/// In-memory bridge that records every command and fails on cue.
#[derive(Debug, Default)]
struct ScriptedBridge {
    fail_on: Option<(Op, u32)>,
    calls: Mutex<Vec<Op>>,
}

impl ScriptedBridge {
    fn new() -> Self {
        Self::default()
    }

    /// Fail the nth occurrence (0-based) of `op`; everything else succeeds.
    fn failing_on(op: Op, nth: u32) -> Self {
        Self {
            fail_on: Some((op, nth)),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, op: Op) -> Result<()> {
        let seen = {
            let mut calls = self
                .calls
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            calls.push(op);
            calls.iter().filter(|&&c| c == op).count() as u32 - 1
        };

        match self.fail_on {
            Some((fail_op, nth)) if fail_op == op && nth == seen => Err(Error::DeviceCommand {
                command: format!("{op:?}"),
                output: "injected failure".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn count(&self, op: Op) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|&&c| c == op)
            .count()
    }
}

impl DeviceBridge for ScriptedBridge {
    type Capture = ();

    fn device(&self) -> &str {
        "scripted-0"
    }

    fn kill_process(&self, _name: &str) -> Result<()> {
        self.record(Op::KillProcess)
    }

    fn force_stop_app(&self, _package: &str) -> Result<()> {
        self.record(Op::ForceStopApp)
    }

    fn kill_background_processes(&self) -> Result<()> {
        self.record(Op::KillBackground)
    }

    fn clear_directory(&self, _path: &str) -> Result<()> {
        self.record(Op::ClearDirectory)
    }

    fn make_directory(&self, _path: &str) -> Result<()> {
        self.record(Op::MakeDirectory)
    }

    fn start_capture(&self, _remote_file: &str, _filter: &str) -> Result<()> {
        self.record(Op::StartCapture)
    }

    fn stop_capture(&self, _capture: &mut ()) {
        let mut calls = self
            .calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        calls.push(Op::StopCapture);
    }

    fn launch_url(&self, _url: &str) -> Result<()> {
        self.record(Op::LaunchUrl)
    }

    fn pull(&self, _remote: &str, _local: &Path) -> Result<()> {
        self.record(Op::Pull)
    }

    fn remove_remote(&self, _remote: &str) -> Result<()> {
        self.record(Op::RemoveRemote)
    }
}

fn test_config() -> ProbeConfig {
    ProbeConfig {
        settle: Duration::ZERO,
        trial_backoff: Duration::ZERO,
        ..ProbeConfig::default()
    }
}

fn run_one(bridge: &ScriptedBridge) -> TrialOutcome {
    let config = test_config();
    let runner = TrialRunner::new(bridge, &config);
    let mut trials = runner.run_trials("http://example.com/", 1, &PathBuf::from("/tmp/traces"));
    assert_eq!(trials.len(), 1);
    let trial = trials.remove(0);
    assert_eq!(trial.url, "http://example.com/");
    assert_eq!(trial.index, 0);
    assert_eq!(trial.device, "scripted-0");
    trial.outcome
}

#[test]
fn successful_trial_stops_capture_exactly_once() {
    let bridge = ScriptedBridge::new();
    let outcome = run_one(&bridge);

    match outcome {
        TrialOutcome::Completed { artifact } => {
            assert_eq!(
                artifact,
                PathBuf::from("/tmp/traces/http---example.com--0.pcap")
            );
        }
        TrialOutcome::Abandoned { stage, reason } => {
            panic!("expected completion, abandoned at {stage:?}: {reason}")
        }
    }

    assert_eq!(bridge.count(Op::StartCapture), 1);
    assert_eq!(bridge.count(Op::StopCapture), 1);
    assert_eq!(bridge.count(Op::Pull), 1);
    assert_eq!(bridge.count(Op::RemoveRemote), 1);
    // Cleanup kill plus the post-retrieval leftover kill.
    assert_eq!(bridge.count(Op::KillProcess), 2);
}

#[test]
fn cleanup_failure_abandons_before_capture_starts() {
    for op in [
        Op::KillProcess,
        Op::ForceStopApp,
        Op::KillBackground,
        Op::ClearDirectory,
    ] {
        let bridge = ScriptedBridge::failing_on(op, 0);
        let outcome = run_one(&bridge);

        match outcome {
            TrialOutcome::Abandoned { stage, .. } => assert_eq!(stage, TrialStage::Cleanup),
            TrialOutcome::Completed { .. } => panic!("expected abandonment for {op:?}"),
        }

        // Capture never started, so it must never be stopped.
        assert_eq!(bridge.count(Op::StartCapture), 0);
        assert_eq!(bridge.count(Op::StopCapture), 0);
        assert_eq!(bridge.count(Op::Pull), 0);
    }
}

#[test]
fn capture_start_failure_leaves_nothing_to_stop() {
    for op in [Op::MakeDirectory, Op::StartCapture] {
        let bridge = ScriptedBridge::failing_on(op, 0);
        let outcome = run_one(&bridge);

        match outcome {
            TrialOutcome::Abandoned { stage, .. } => assert_eq!(stage, TrialStage::CaptureStart),
            TrialOutcome::Completed { .. } => panic!("expected abandonment for {op:?}"),
        }

        assert_eq!(bridge.count(Op::StopCapture), 0);
        assert_eq!(bridge.count(Op::LaunchUrl), 0);
        assert_eq!(bridge.count(Op::Pull), 0);
    }
}

#[test]
fn page_load_failure_still_stops_capture_and_skips_retrieval() {
    let bridge = ScriptedBridge::failing_on(Op::LaunchUrl, 0);
    let outcome = run_one(&bridge);

    match outcome {
        TrialOutcome::Abandoned { stage, .. } => assert_eq!(stage, TrialStage::PageLoad),
        TrialOutcome::Completed { .. } => panic!("expected abandonment"),
    }

    assert_eq!(bridge.count(Op::StartCapture), 1);
    assert_eq!(bridge.count(Op::StopCapture), 1);
    assert_eq!(bridge.count(Op::Pull), 0);
    assert_eq!(bridge.count(Op::RemoveRemote), 0);
}

#[test]
fn retrieval_failure_abandons_after_capture_stopped() {
    let bridge = ScriptedBridge::failing_on(Op::Pull, 0);
    let outcome = run_one(&bridge);

    match outcome {
        TrialOutcome::Abandoned { stage, reason } => {
            assert_eq!(stage, TrialStage::Retrieve);
            assert!(reason.contains("failed to retrieve"), "reason: {reason}");
        }
        TrialOutcome::Completed { .. } => panic!("expected abandonment"),
    }

    assert_eq!(bridge.count(Op::StopCapture), 1);
    assert_eq!(bridge.count(Op::RemoveRemote), 0);
    // The leftover kill only runs for completed trials.
    assert_eq!(bridge.count(Op::KillProcess), 1);
}

#[test]
fn stop_happens_exactly_once_iff_start_succeeded() {
    // Inject a failure at every point in the sequence and check the pairing
    // property each time.
    let injections = [
        Op::KillProcess,
        Op::ForceStopApp,
        Op::KillBackground,
        Op::ClearDirectory,
        Op::MakeDirectory,
        Op::StartCapture,
        Op::LaunchUrl,
        Op::Pull,
    ];

    for op in injections {
        let bridge = ScriptedBridge::failing_on(op, 0);
        let _ = run_one(&bridge);

        let started = bridge.count(Op::StartCapture);
        let stopped = bridge.count(Op::StopCapture);
        assert_eq!(
            stopped, started,
            "stop/start mismatch with failure injected at {op:?}"
        );
        assert!(stopped <= 1, "capture stopped more than once for {op:?}");
    }
}

#[test]
fn remote_delete_failure_does_not_invalidate_the_artifact() {
    let bridge = ScriptedBridge::failing_on(Op::RemoveRemote, 0);
    let outcome = run_one(&bridge);
    assert!(outcome.is_completed());
}

#[test]
fn leftover_kill_failure_does_not_change_the_outcome() {
    // Occurrence 0 of KillProcess is the cleanup kill; occurrence 1 is the
    // best-effort leftover kill after retrieval.
    let bridge = ScriptedBridge::failing_on(Op::KillProcess, 1);
    let outcome = run_one(&bridge);
    assert!(outcome.is_completed());
}

#[test]
fn one_bad_trial_does_not_abort_the_run() {
    let bridge = ScriptedBridge::failing_on(Op::LaunchUrl, 0);
    let config = test_config();
    let runner = TrialRunner::new(&bridge, &config);

    let trials = runner.run_trials("http://example.com/", 3, &PathBuf::from("/tmp/traces"));
    assert_eq!(trials.len(), 3);
    assert!(!trials[0].outcome.is_completed());
    assert!(trials[1].outcome.is_completed());
    assert!(trials[2].outcome.is_completed());
}
