use crate::config::ProbeConfig;
use crate::error::{Error, Result};
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};

/// Capability set the orchestrator drives, scoped to one connected device.
///
/// Every operation maps to one device-bridge invocation; failures surface as
/// [`Error::DeviceCommand`] carrying the rendered command line and the tool's
/// output, so callers never see tool-specific error shapes.
pub trait DeviceBridge {
    type Capture;

    /// Identifier of the device this bridge is scoped to.
    fn device(&self) -> &str;

    fn kill_process(&self, name: &str) -> Result<()>;
    fn force_stop_app(&self, package: &str) -> Result<()>;
    fn kill_background_processes(&self) -> Result<()>;
    fn clear_directory(&self, path: &str) -> Result<()>;
    fn make_directory(&self, path: &str) -> Result<()>;

    /// Launch the remote capture process; returns without waiting for it.
    fn start_capture(&self, remote_file: &str, filter: &str) -> Result<Self::Capture>;

    /// Stop the capture process. Idempotent; never fails (a stop that goes
    /// wrong is logged, the process is gone either way).
    fn stop_capture(&self, capture: &mut Self::Capture);

    /// Open the URL in the browser app via an intent.
    fn launch_url(&self, url: &str) -> Result<()>;

    fn pull(&self, remote: &str, local: &Path) -> Result<()>;
    fn remove_remote(&self, remote: &str) -> Result<()>;
}

/// Handle to a running remote capture, held open across the page load.
///
/// Killing the local bridge process terminates the remote capture; the drop
/// impl is the backstop so a capture can never outlive its trial.
#[derive(Debug)]
pub struct CaptureProcess {
    child: Child,
    stopped: bool,
}

impl CaptureProcess {
    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Drop for CaptureProcess {
    fn drop(&mut self) {
        self.stop();
    }
}

/// adb-backed [`DeviceBridge`].
#[derive(Debug, Clone)]
pub struct AdbBridge {
    device: String,
    config: ProbeConfig,
}

impl AdbBridge {
    #[must_use]
    pub fn new(device: impl Into<String>, config: ProbeConfig) -> Self {
        Self {
            device: device.into(),
            config,
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.config.adb);
        cmd.arg("-s").arg(&self.device);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        run_checked(self.command(args))
    }

    /// Superuser shell command (`su -c "<inner>"`).
    fn run_su(&self, inner: &str) -> Result<Output> {
        self.run(&["shell", "su", "-c", inner])
    }
}

impl DeviceBridge for AdbBridge {
    type Capture = CaptureProcess;

    fn device(&self) -> &str {
        &self.device
    }

    fn kill_process(&self, name: &str) -> Result<()> {
        self.run_su(&format!("killall {name}")).map(drop)
    }

    fn force_stop_app(&self, package: &str) -> Result<()> {
        self.run(&["shell", "am", "force-stop", package]).map(drop)
    }

    fn kill_background_processes(&self) -> Result<()> {
        self.run(&["shell", "am", "kill-all"]).map(drop)
    }

    fn clear_directory(&self, path: &str) -> Result<()> {
        self.run_su(&format!("rm -rf {path}")).map(drop)
    }

    fn make_directory(&self, path: &str) -> Result<()> {
        self.run(&["shell", &format!("mkdir -p {path}")]).map(drop)
    }

    fn start_capture(&self, remote_file: &str, filter: &str) -> Result<CaptureProcess> {
        let inner = format!(
            "{} -i {} -w {remote_file} {filter}",
            self.config.capture_bin, self.config.capture_interface
        );
        let mut cmd = self.command(&["shell", "su", "-c", &inner]);
        cmd.stdout(Stdio::null()).stderr(Stdio::null());

        let rendered = command_to_string(&cmd);
        log::debug!("{rendered}");

        let child = cmd.spawn().map_err(|err| {
            Error::CaptureStart(Box::new(Error::DeviceCommand {
                command: rendered,
                output: err.to_string(),
            }))
        })?;

        Ok(CaptureProcess {
            child,
            stopped: false,
        })
    }

    fn stop_capture(&self, capture: &mut CaptureProcess) {
        capture.stop();
    }

    fn launch_url(&self, url: &str) -> Result<()> {
        self.run(&[
            "shell",
            "am",
            "start",
            "-a",
            "android.intent.action.VIEW",
            "-d",
            url,
            &self.config.browser_package,
        ])
        .map(drop)
    }

    fn pull(&self, remote: &str, local: &Path) -> Result<()> {
        let local = local.display().to_string();
        self.run(&["pull", remote, &local]).map(drop)
    }

    fn remove_remote(&self, remote: &str) -> Result<()> {
        self.run(&["shell", "rm", remote]).map(drop)
    }
}

/// Enumerate connected device identifiers via `adb devices`.
pub fn list_devices(adb: &str) -> Result<Vec<String>> {
    let mut cmd = Command::new(adb);
    cmd.arg("devices").stdin(Stdio::null());
    let output = run_checked(cmd)?;
    Ok(parse_device_list(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_device_list(stdout: &str) -> Vec<String> {
    // First line is the `List of devices attached` header; each following
    // non-empty line is `<id>\t<state>`.
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| {
            let id = line.split('\t').next().unwrap_or("").trim();
            if id.is_empty() {
                None
            } else {
                Some(id.to_string())
            }
        })
        .collect()
}

fn run_checked(mut cmd: Command) -> Result<Output> {
    let rendered = command_to_string(&cmd);
    log::debug!("{rendered}");

    let output = cmd.output().map_err(|err| Error::DeviceCommand {
        command: rendered.clone(),
        output: err.to_string(),
    })?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(stderr);
        }
        return Err(Error::DeviceCommand {
            command: rendered,
            output: combined,
        });
    }

    Ok(output)
}

fn command_to_string(cmd: &Command) -> String {
    let prog = cmd.get_program().to_string_lossy();
    let mut out = String::new();
    out.push_str(&quote_for_display(&prog));
    for arg in cmd.get_args() {
        out.push(' ');
        out.push_str(&quote_for_display(&arg.to_string_lossy()));
    }
    out
}

fn quote_for_display(s: &str) -> String {
    // Not a shell-accurate escaper; just makes spaces/specials unambiguous in logs.
    let needs_quotes = s
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '"' | '\\'));
    if !needs_quotes {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_device_list_skips_header_and_blanks() {
        let out = "List of devices attached\nemulator-5554\tdevice\n\nHT4A1JT01234\tdevice\n";
        assert_eq!(
            parse_device_list(out),
            vec!["emulator-5554".to_string(), "HT4A1JT01234".to_string()]
        );
    }

    #[test]
    fn parse_device_list_handles_no_devices() {
        assert_eq!(parse_device_list("List of devices attached\n"), Vec::<String>::new());
        assert_eq!(parse_device_list(""), Vec::<String>::new());
    }

    #[test]
    fn command_rendering_quotes_arguments_with_spaces() {
        let mut cmd = Command::new("adb");
        cmd.args(["shell", "su", "-c", "killall tcpdump_armv7"]);
        assert_eq!(
            command_to_string(&cmd),
            "adb shell su -c \"killall tcpdump_armv7\""
        );
    }
}
