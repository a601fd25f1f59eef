// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch rendering: one base image and corner set, many replacements,
// rendered in parallel.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use image::RgbImage;
use rayon::prelude::*;
use screenswap_core::config::FailurePolicy;
use screenswap_core::{AdjustmentParameters, CornerSet, RenderStage, Result, ScreenswapError};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::codec;
use crate::pipeline::Pipeline;

/// Stem used when a replacement file name has no usable ASCII characters.
pub const FALLBACK_STEM: &str = "replacement";

/// Outcome of one replacement in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemReport {
    pub source: PathBuf,
    pub output: PathBuf,
    /// `Rendered` on success, `Failed` otherwise.
    pub stage: RenderStage,
    pub error: Option<String>,
}

impl BatchItemReport {
    pub fn succeeded(&self) -> bool {
        self.stage == RenderStage::Rendered
    }
}

/// Outcome of a whole batch, items in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub corners: CornerSet,
    pub items: Vec<BatchItemReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// ASCII-only file stem for an output name.
pub fn sanitize_stem(path: &Path) -> String {
    let raw = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ascii: String = raw
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && !matches!(c, '/' | '\\' | '"'))
        .collect();
    let trimmed = ascii.trim();
    if trimmed.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Output paths `<dir>/<stem>_composite.png`, made unique by appending the
/// item index (and then a counter) when a name is already taken.
pub fn output_paths(replacements: &[PathBuf], output_dir: &Path) -> Vec<PathBuf> {
    let mut used = HashSet::new();
    replacements
        .iter()
        .enumerate()
        .map(|(index, path)| {
            let stem = sanitize_stem(path);
            let mut name = format!("{stem}_composite.png");
            let mut bump = 0usize;
            while !used.insert(name.clone()) {
                name = if bump == 0 {
                    format!("{stem}_{index}_composite.png")
                } else {
                    format!("{stem}_{index}_{bump}_composite.png")
                };
                bump += 1;
            }
            output_dir.join(name)
        })
        .collect()
}

/// Renders many replacements into the same base image.
pub struct BatchRenderer<'a> {
    pipeline: &'a Pipeline,
}

impl<'a> BatchRenderer<'a> {
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self { pipeline }
    }

    /// Render every file in `replacements` into `base` and write the PNGs to
    /// `output_dir`.
    ///
    /// The base image is decoded and (if `corners` is `None`) detected once;
    /// a failure there aborts the batch. Per-item failures follow the
    /// configured [`FailurePolicy`]: `ContinueOnError` records them in the
    /// report, `FailFast` returns the first one.
    #[instrument(skip_all, fields(items = replacements.len(), output_dir = %output_dir.display()))]
    pub fn run(
        &self,
        base: &RgbImage,
        corners: Option<CornerSet>,
        replacements: &[PathBuf],
        params: &AdjustmentParameters,
        output_dir: &Path,
    ) -> Result<BatchReport> {
        params.validate()?;
        let corners = match corners {
            Some(corners) => corners,
            None => self.pipeline.detect(base)?.corners,
        };
        corners.validate(
            base.width(),
            base.height(),
            self.pipeline.config().geometry.min_area_fraction,
        )?;
        std::fs::create_dir_all(output_dir)?;

        let outputs = output_paths(replacements, output_dir);
        let jobs: Vec<(&PathBuf, &PathBuf)> = replacements.iter().zip(&outputs).collect();
        let policy = self.pipeline.config().batch.failure_policy;

        let render_all = || -> Result<Vec<BatchItemReport>> {
            match policy {
                FailurePolicy::FailFast => jobs
                    .par_iter()
                    .map(|(source, output)| {
                        self.render_one(base, corners, source, output, params)?;
                        Ok(report(source, output, None))
                    })
                    .collect(),
                FailurePolicy::ContinueOnError => Ok(jobs
                    .par_iter()
                    .map(|(source, output)| {
                        let outcome = self.render_one(base, corners, source, output, params);
                        if let Err(err) = &outcome {
                            warn!(source = %source.display(), error = %err, "Batch item failed");
                        }
                        report(source, output, outcome.err())
                    })
                    .collect()),
            }
        };

        let threads = self.pipeline.config().batch.threads;
        let items = if threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|err| ScreenswapError::invalid_parameter("threads", err.to_string()))?;
            pool.install(render_all)?
        } else {
            render_all()?
        };

        let report = BatchReport { corners, items };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch complete"
        );
        Ok(report)
    }

    /// Open a base image from disk and run the batch against it.
    pub fn run_paths(
        &self,
        base: &Path,
        corners: Option<CornerSet>,
        replacements: &[PathBuf],
        params: &AdjustmentParameters,
        output_dir: &Path,
    ) -> Result<BatchReport> {
        let base = codec::open(base)?;
        self.run(&base, corners, replacements, params, output_dir)
    }

    fn render_one(
        &self,
        base: &RgbImage,
        corners: CornerSet,
        source: &Path,
        output: &Path,
        params: &AdjustmentParameters,
    ) -> Result<()> {
        let replacement = codec::open(source)?;
        let result = self.pipeline.render(base, Some(corners), &replacement, params)?;
        codec::save_png(&result.image, output)
    }
}

fn report(source: &Path, output: &Path, error: Option<ScreenswapError>) -> BatchItemReport {
    BatchItemReport {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        stage: if error.is_some() {
            RenderStage::Failed
        } else {
            RenderStage::Rendered
        },
        error: error.map(|e| e.to_string()),
    }
}
