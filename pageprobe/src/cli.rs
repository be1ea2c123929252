use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 15s, 500ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 15s, 500ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 15s, 500ms, 1m)"))?;

    match unit_str.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 15s, 500ms, 1m)"
        )),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "pageprobe",
    author,
    version,
    about = "Mobile web page load profiler",
    long_about = "pageprobe loads web pages on a connected Android device while capturing their network traffic, then turns the captured traces into per-URL page-load-time and transfer-size statistics.\n\nThe three stages are independent: load pages (-l/-f), analyze a directory of traces (-t), and compare persisted result files (-r). Any combination can run in one invocation.",
    after_help = "Examples:\n  pageprobe -l http://example.com/ -n 10 -o results/\n  pageprobe -f urls.txt -o results/ -s HT4A1JT01234\n  pageprobe -t results/traces\n  pageprobe -r results-NoProxy/traces/results.json results-SPDY/traces/results.json"
)]
pub struct Cli {
    /// URL(s) to load (to load multiple pages, separate URLs with spaces)
    #[arg(short = 'l', long = "load-pages", num_args = 1.., value_name = "URL")]
    pub load_pages: Vec<String>,

    /// Profile the URLs in the specified file (one URL per line)
    #[arg(short = 'f', long, value_name = "FILE")]
    pub url_file: Option<PathBuf>,

    /// Destination directory for traces and results
    #[arg(short, long, default_value = ".")]
    pub outdir: PathBuf,

    /// Number of times to load each URL
    #[arg(short = 'n', long, default_value_t = 10)]
    pub trials: u32,

    /// Directory of capture traces to analyze
    #[arg(short = 't', long, value_name = "DIR")]
    pub trace_dir: Option<PathBuf>,

    /// Persisted result files to compare
    #[arg(short = 'r', long = "result-files", num_args = 1.., value_name = "FILE")]
    pub result_files: Vec<PathBuf>,

    /// Specific device ID (from `adb devices`); auto-detected when omitted
    #[arg(short = 's', long)]
    pub device: Option<String>,

    /// Wait after launching a URL for the page to finish loading
    #[arg(long, value_parser = parse_duration, default_value = "15s")]
    pub settle: Duration,

    /// Delay after an abandoned trial before the next one
    #[arg(long, value_parser = parse_duration, default_value = "5s")]
    pub backoff: Duration,

    /// Only print errors and warnings
    #[arg(short, long)]
    pub quiet: bool,

    /// Print debug info (--quiet wins if both are present)
    #[arg(short, long)]
    pub verbose: bool,
}
