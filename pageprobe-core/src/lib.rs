mod analyze;
mod bridge;
mod compare;
mod config;
mod error;
mod naming;
mod results;
mod retrieve;
mod stats;
mod trial;

pub use analyze::{CancelToken, TraceAnalyzer};
pub use bridge::{AdbBridge, CaptureProcess, DeviceBridge, list_devices};
pub use compare::{ComparisonBundle, ComparisonSource, DISPLAY_NAMES, compare, display_label};
pub use config::{AnalyzerConfig, ProbeConfig};
pub use error::{Error, Result};
pub use naming::{sanitize_url, trace_file_name, url_from_artifact};
pub use results::{ResultSet, ResultSummary, Sample, UrlStats};
pub use retrieve::retrieve;
pub use trial::{Trial, TrialOutcome, TrialRunner, TrialStage};
