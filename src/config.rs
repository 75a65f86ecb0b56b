use crate::RectifyArgs;
use docrectify::PredictorConfig;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Batch configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub predictors: PredictorConfig,
    pub jobs: usize,
    pub timeout: Option<Duration>,
    pub ocr: bool,
    pub results_file: String,
}

impl Config {
    /// Where the rectified copy of `input` is written.
    ///
    /// Keeps the whole file name and appends `.png` unless it already ends
    /// with it, so `a.jpg` and `a.png` land in different files.
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let name = input
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let is_png = input
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        let file_name = if is_png {
            format!("processed_{}", name)
        } else {
            format!("processed_{}.png", name)
        };
        self.output_dir.join(file_name)
    }

    /// First output path shared by two inputs, if any
    pub fn colliding_output(&self) -> Option<PathBuf> {
        let mut seen = HashSet::new();
        self.inputs
            .iter()
            .map(|input| self.output_path(input))
            .find(|path| !seen.insert(path.clone()))
    }

    pub fn results_path(&self) -> PathBuf {
        self.output_dir.join(&self.results_file)
    }
}

impl From<RectifyArgs> for Config {
    fn from(args: RectifyArgs) -> Self {
        Self {
            inputs: args.inputs,
            output_dir: args.output_dir,
            predictors: PredictorConfig {
                mask_model: args.mask_model,
                backward_map_model: args.backward_map_model,
                device: args.device,
            },
            jobs: args.jobs.max(1),
            timeout: (args.timeout_secs > 0).then(|| Duration::from_secs(args.timeout_secs)),
            ocr: args.ocr,
            results_file: args.results_file,
        }
    }
}
