// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand execution. Each command returns what should be printed to
// stdout; diagnostics go through tracing to stderr.

use std::path::Path;

use screenswap_core::{PipelineConfig, Result};
use screenswap_pipeline::{BatchRenderer, BatchReport, Pipeline, codec};
use tracing::{info, warn};

use crate::cli::{BatchArgs, Command, RenderArgs};

/// What a successful command produced.
#[derive(Debug)]
pub enum Outcome {
    /// JSON printed to stdout.
    Json(String),
    /// A batch that ran to completion, possibly with failed items.
    Batch { json: String, failed: usize },
}

pub fn run(command: &Command, config: PipelineConfig) -> Result<Outcome> {
    let pipeline = Pipeline::new(config);
    match command {
        Command::Detect { base, .. } => detect(&pipeline, base),
        Command::Render(args) => render(&pipeline, args),
        Command::Batch(args) => batch(&pipeline, args),
    }
}

fn detect(pipeline: &Pipeline, base: &Path) -> Result<Outcome> {
    let image = codec::open(base)?;
    let detection = pipeline.detect(&image)?;
    info!(corners = %detection.corners, "Green screen detected");
    Ok(Outcome::Json(serde_json::to_string(&detection)?))
}

fn render(pipeline: &Pipeline, args: &RenderArgs) -> Result<Outcome> {
    let params = args.adjustments.to_params()?;
    let base = codec::open(&args.base)?;
    let replacement = codec::open(&args.replacement)?;

    let result = pipeline.render(&base, args.corners, &replacement, &params)?;
    codec::save_png(&result.image, &args.output)?;
    info!(output = %args.output.display(), detected = result.detected, "Composite saved");

    if let Some(preview_path) = &args.preview {
        let preview = pipeline.preview(&result.image)?;
        std::fs::write(preview_path, serde_json::to_vec(&preview)?)?;
        info!(path = %preview_path.display(), scale = preview.scale, "Preview written");
    }

    let summary = serde_json::json!({
        "output": args.output,
        "corners": result.corners,
        "detected": result.detected,
    });
    Ok(Outcome::Json(summary.to_string()))
}

fn batch(pipeline: &Pipeline, args: &BatchArgs) -> Result<Outcome> {
    let params = args.adjustments.to_params()?;
    let report: BatchReport = BatchRenderer::new(pipeline).run_paths(
        &args.base,
        args.corners,
        &args.replacements,
        &params,
        &args.output_dir,
    )?;

    for item in report.items.iter().filter(|i| !i.succeeded()) {
        warn!(
            source = %item.source.display(),
            error = item.error.as_deref().unwrap_or("unknown"),
            "Replacement not rendered"
        );
    }
    let failed = report.failed();
    Ok(Outcome::Batch {
        json: serde_json::to_string(&report)?,
        failed,
    })
}
