use std::time::Duration;

/// Settings for one device-automation run.
///
/// Everything the orchestrator and bridge read comes from here; there is no
/// implicit global state. Defaults match the rooted-device layout the capture
/// tooling is deployed with.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Device-bridge program, resolved via PATH.
    pub adb: String,
    /// Capture binary location on the device.
    pub capture_bin: String,
    /// Interface the capture binary records on.
    pub capture_interface: String,
    /// Ports the capture filter is restricted to.
    pub capture_ports: Vec<u16>,
    /// Extension for capture artifacts.
    pub capture_ext: String,
    /// Scratch directory on the device for capture artifacts.
    pub remote_trace_dir: String,
    /// Browser application package id.
    pub browser_package: String,
    /// Browser cache directory, cleared before each trial.
    pub browser_cache_dir: String,
    /// Browser session-file directory (open tabs), cleared before each trial.
    pub browser_session_dir: String,
    /// Wait after launching a URL for the page to finish loading. There is no
    /// load-complete signal from the browser, so this is an approximation.
    pub settle: Duration,
    /// Delay after an abandoned trial before starting the next one.
    pub trial_backoff: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            adb: "adb".to_string(),
            capture_bin: "/data/local/tmp/tcpdump_armv7".to_string(),
            capture_interface: "rmnet0".to_string(),
            capture_ports: vec![80, 443, 10750],
            capture_ext: "pcap".to_string(),
            remote_trace_dir: "/data/local/tmp/traces".to_string(),
            browser_package: "com.android.chrome".to_string(),
            browser_cache_dir: "/data/data/com.android.chrome/cache".to_string(),
            browser_session_dir: "/data/data/com.android.chrome/files".to_string(),
            settle: Duration::from_secs(15),
            trial_backoff: Duration::from_secs(5),
        }
    }
}

impl ProbeConfig {
    /// Process name of the capture binary, as seen by `killall` on the device.
    #[must_use]
    pub fn capture_process_name(&self) -> &str {
        self.capture_bin
            .rsplit('/')
            .next()
            .unwrap_or(&self.capture_bin)
    }

    /// Capture filter expression covering the configured ports.
    #[must_use]
    pub fn capture_filter(&self) -> String {
        let ports: Vec<String> = self
            .capture_ports
            .iter()
            .map(|p| format!("port {p}"))
            .collect();
        ports.join(" or ")
    }
}

/// Settings for the trace-analysis stage.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Protocol-analysis program, resolved via PATH.
    pub tool: String,
    /// Worker count; defaults to available parallelism.
    pub workers: Option<usize>,
    /// Upper bound on waiting for in-flight work after cancellation; whatever
    /// is still running afterwards is abandoned.
    pub cancel_drain: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            tool: "tshark".to_string(),
            workers: None,
            cancel_drain: Duration::from_secs(30),
        }
    }
}
