use crate::error::Result;
use crate::results::{ResultSet, ResultSummary};
use std::path::Path;

/// Fixed run-codename -> display-label substitutions applied to source labels.
pub const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("NoProxy", "No Proxy"),
    ("SPDY", "Compression Proxy"),
];

/// Summaries of one persisted Result Set, keyed by its display label.
#[derive(Debug, Clone)]
pub struct ComparisonSource {
    pub label: String,
    pub summary: ResultSummary,
}

/// Aligned per-source summaries for downstream rendering. Built on demand
/// from persisted Result Sets, never itself persisted.
#[derive(Debug, Clone, Default)]
pub struct ComparisonBundle {
    pub sources: Vec<ComparisonSource>,
}

impl ComparisonBundle {
    /// url-ordered mean durations per source, seconds.
    #[must_use]
    pub fn mean_durations(&self) -> Vec<(&str, Vec<f64>)> {
        self.series(|s| s.durations.values().map(|v| v.mean).collect())
    }

    /// url-ordered median durations per source, seconds.
    #[must_use]
    pub fn median_durations(&self) -> Vec<(&str, Vec<f64>)> {
        self.series(|s| s.durations.values().map(|v| v.median).collect())
    }

    /// url-ordered mean transfer sizes per source, megabytes.
    #[must_use]
    pub fn mean_sizes_mb(&self) -> Vec<(&str, Vec<f64>)> {
        self.series(|s| s.sizes.values().map(|v| v.mean / 1_000_000.0).collect())
    }

    /// url-ordered median transfer sizes per source, megabytes.
    #[must_use]
    pub fn median_sizes_mb(&self) -> Vec<(&str, Vec<f64>)> {
        self.series(|s| s.sizes.values().map(|v| v.median / 1_000_000.0).collect())
    }

    fn series<F>(&self, select: F) -> Vec<(&str, Vec<f64>)>
    where
        F: Fn(&ResultSummary) -> Vec<f64>,
    {
        self.sources
            .iter()
            .map(|source| (source.label.as_str(), select(&source.summary)))
            .collect()
    }
}

/// Load and summarize each named Result Set. Each source stands alone; URLs
/// never leak between sources.
pub fn compare(paths: &[impl AsRef<Path>]) -> Result<ComparisonBundle> {
    let mut sources = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let set = ResultSet::load(path)?;
        sources.push(ComparisonSource {
            label: display_label(&source_label(path)),
            summary: set.summarize(),
        });
    }
    Ok(ComparisonBundle { sources })
}

/// Map a run codename to its display label: plain substring replacement,
/// longest codename first, each pair applied once.
#[must_use]
pub fn display_label(label: &str) -> String {
    let mut pairs: Vec<(&str, &str)> = DISPLAY_NAMES.to_vec();
    pairs.sort_by_key(|(code, _)| std::cmp::Reverse(code.len()));

    let mut out = label.to_string();
    for (code, display) in pairs {
        out = out.replace(code, display);
    }
    out
}

fn source_label(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Sample;

    #[test]
    fn display_label_substitutes_codenames() {
        assert_eq!(display_label("SPDY"), "Compression Proxy");
        assert_eq!(display_label("NoProxy"), "No Proxy");
        assert_eq!(display_label("results-SPDY-run2"), "results-Compression Proxy-run2");
        assert_eq!(display_label("baseline"), "baseline");
    }

    #[test]
    fn compare_keeps_sources_independent() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(err) => panic!("tempdir: {err}"),
        };

        let first = ResultSet::from_samples(vec![Sample {
            url: "a.com".to_string(),
            duration_secs: 1.0,
            bytes: 2_000_000,
        }]);
        let second = ResultSet::from_samples(vec![Sample {
            url: "b.com".to_string(),
            duration_secs: 4.0,
            bytes: 8_000_000,
        }]);

        let first_path = dir.path().join("NoProxy.json");
        let second_path = dir.path().join("SPDY.json");
        if let Err(err) = first.persist(&first_path) {
            panic!("persist: {err}");
        }
        if let Err(err) = second.persist(&second_path) {
            panic!("persist: {err}");
        }

        let bundle = match compare(&[&first_path, &second_path]) {
            Ok(v) => v,
            Err(err) => panic!("compare: {err}"),
        };

        assert_eq!(bundle.sources.len(), 2);
        assert_eq!(bundle.sources[0].label, "No Proxy");
        assert_eq!(bundle.sources[1].label, "Compression Proxy");

        // No cross-contamination of urls between sources.
        assert!(bundle.sources[0].summary.durations.contains_key("a.com"));
        assert!(!bundle.sources[0].summary.durations.contains_key("b.com"));
        assert!(bundle.sources[1].summary.durations.contains_key("b.com"));
        assert!(!bundle.sources[1].summary.durations.contains_key("a.com"));

        let sizes = bundle.mean_sizes_mb();
        assert_eq!(sizes[0].1, vec![2.0]);
        assert_eq!(sizes[1].1, vec![8.0]);
    }
}
