//! Named parameter mappings and the tolerant merge used to load them.
//!
//! Checkpoints are frequently saved under a slightly different naming scheme
//! than the predictor that consumes them (a wrapper module prefix, extra
//! auxiliary tensors). Loading therefore merges by name: entries the
//! destination knows are overwritten, everything else is skipped, and
//! destination entries the checkpoint does not mention keep their values.

use crate::error::RectifyError;
use ndarray::ArrayD;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Name-keyed collection of numeric arrays
pub type ParameterMap = BTreeMap<String, ArrayD<f32>>;

/// Leading characters dropped from mask-predictor checkpoint names
pub const MASK_PREFIX_LEN: usize = 6;

/// How source names are matched against destination names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergePolicy {
    /// Number of leading characters removed from every source name
    pub strip_prefix: usize,
}

impl MergePolicy {
    /// Policy for the foreground mask predictor's checkpoints
    pub fn mask() -> Self {
        Self {
            strip_prefix: MASK_PREFIX_LEN,
        }
    }

    /// Policy for the backward-map predictor's checkpoints
    pub fn backward_map() -> Self {
        Self { strip_prefix: 0 }
    }

    fn destination_name<'a>(&self, source_name: &'a str) -> Option<&'a str> {
        source_name.get(self.strip_prefix..)
    }
}

/// Outcome of a merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Destination names that received a new value
    pub updated: Vec<String>,
    /// Source names with no counterpart in the destination
    pub ignored: Vec<String>,
    /// Destination entries left at their previous value
    pub untouched: usize,
}

/// Overwrite destination entries whose name matches a source entry.
///
/// A matching entry whose shape differs from the destination's is an error;
/// in that case the destination is left unchanged.
pub fn merge_parameters(
    destination: &mut ParameterMap,
    source: ParameterMap,
    policy: MergePolicy,
) -> Result<MergeReport, RectifyError> {
    let mut accepted = Vec::new();
    let mut report = MergeReport::default();

    for (source_name, value) in source {
        let target = policy
            .destination_name(&source_name)
            .filter(|name| destination.contains_key(*name))
            .map(str::to_string);

        let Some(target) = target else {
            report.ignored.push(source_name);
            continue;
        };

        let current = &destination[&target];
        if current.shape() != value.shape() {
            return Err(RectifyError::ParameterLoad(format!(
                "{} (from {}): expected shape {:?}, got {:?}",
                target,
                source_name,
                current.shape(),
                value.shape()
            )));
        }
        accepted.push((target, value));
    }

    for (name, value) in accepted {
        destination.insert(name.clone(), value);
        report.updated.push(name);
    }
    report.updated.sort();
    report.updated.dedup();
    report.untouched = destination.len() - report.updated.len();

    Ok(report)
}

/// Read a persisted mapping
pub fn load_parameter_file(path: &Path) -> Result<ParameterMap, RectifyError> {
    let file = File::open(path).map_err(|e| {
        RectifyError::ParameterLoad(format!("{}: {}", path.display(), e))
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        RectifyError::ParameterLoad(format!("{}: {}", path.display(), e))
    })
}

/// Persist a mapping
pub fn save_parameter_file(path: &Path, parameters: &ParameterMap) -> Result<(), RectifyError> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), parameters).map_err(|e| {
        RectifyError::ParameterLoad(format!("failed to write {}: {}", path.display(), e))
    })
}
