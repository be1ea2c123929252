use crate::error::{Error, Result};
use crate::stats;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One measurement extracted from one capture artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub url: String,
    pub duration_secs: f64,
    pub bytes: u64,
}

/// Per-URL sample sequences for one analysis run.
///
/// Both mappings are persisted together as a single JSON document; a stored
/// file either loads as exactly this shape or fails as corrupt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResultSet {
    /// url -> page load durations, seconds, in trial order.
    pub durations: BTreeMap<String, Vec<f64>>,
    /// url -> total bytes transferred, in trial order.
    pub sizes: BTreeMap<String, Vec<u64>>,
}

/// Mean and median of one per-URL sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UrlStats {
    pub mean: f64,
    pub median: f64,
}

/// Per-URL summary statistics for one Result Set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSummary {
    pub durations: BTreeMap<String, UrlStats>,
    pub sizes: BTreeMap<String, UrlStats>,
}

impl ResultSet {
    /// Group samples by URL. Samples without a URL are invalid and dropped.
    #[must_use]
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut set = Self::default();
        for sample in samples {
            if sample.url.is_empty() {
                log::debug!("discarding sample without url");
                continue;
            }
            set.durations
                .entry(sample.url.clone())
                .or_default()
                .push(sample.duration_secs);
            set.sizes.entry(sample.url).or_default().push(sample.bytes);
        }
        set
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.durations.is_empty() && self.sizes.is_empty()
    }

    /// Write both mappings as one JSON document, atomically (temp file in the
    /// destination directory, then rename).
    pub fn persist(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, self).map_err(|err| Error::Io(err.into()))?;
        tmp.persist(path).map_err(|err| Error::Io(err.error))?;

        log::info!("wrote results to {}", path.display());
        Ok(())
    }

    /// Load a persisted Result Set. Anything that does not match the expected
    /// two-mapping shape fails as [`Error::CorruptResultSet`]; no partial
    /// result set is ever returned.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|err| Error::CorruptResultSet {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }

    /// Per-URL mean and median for both sequences. URLs with no samples are
    /// omitted rather than summarized from an empty sequence.
    #[must_use]
    pub fn summarize(&self) -> ResultSummary {
        let mut summary = ResultSummary::default();

        for (url, values) in &self.durations {
            if let (Some(mean), Some(median)) = (stats::mean(values), stats::median(values)) {
                summary.durations.insert(url.clone(), UrlStats { mean, median });
            }
        }

        for (url, values) in &self.sizes {
            let values: Vec<f64> = values.iter().map(|&b| b as f64).collect();
            if let (Some(mean), Some(median)) = (stats::mean(&values), stats::median(&values)) {
                summary.sizes.insert(url.clone(), UrlStats { mean, median });
            }
        }

        summary
    }
}
