// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface: argument definitions and their mapping onto the core
// parameter and configuration types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use screenswap_core::config::FailurePolicy;
use screenswap_core::{
    AdjustmentParameters, CornerSet, HueRange, ManualAdjustments, PhotometricMode, PipelineConfig, Result,
};

#[derive(Debug, Parser)]
#[command(name = "screenswap")]
#[command(about = "Detect a green screen in a photo and composite a replacement image into it")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file; unspecified values keep their defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Detect the green screen and print its corners as JSON.
    Detect {
        /// Photo containing the green screen.
        #[arg(long)]
        base: PathBuf,

        #[command(flatten)]
        detection: DetectionArgs,
    },

    /// Composite one replacement image into the green screen.
    Render(RenderArgs),

    /// Composite many replacement images into the same green screen.
    Batch(BatchArgs),
}

#[derive(Debug, Clone, Args, Default)]
pub struct DetectionArgs {
    /// Accepted hue band on the 0-179 scale, as `low,high`.
    #[arg(long, value_name = "LOW,HIGH")]
    pub hue_range: Option<HueRange>,
}

#[derive(Debug, Clone, Args)]
pub struct AdjustmentArgs {
    /// Brightness shift, -100 to 100.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub brightness: f32,

    /// Contrast in percent, -100 to 100.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub contrast: f32,

    /// Warm (positive) or cool (negative) shift, -50 to 50.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub temperature: f32,

    /// Saturation in percent, -100 to 100.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub saturation: f32,

    /// Softening blur radius in pixels, 0 to 20.
    #[arg(long, default_value_t = 0.0)]
    pub blur: f32,

    /// Edge feather radius in pixels; 0 gives a hard edge.
    #[arg(long, default_value_t = AdjustmentParameters::DEFAULT_FEATHER_RADIUS)]
    pub feather: u32,

    /// Match brightness to the surrounding scene instead of manual adjustments.
    #[arg(
        long,
        conflicts_with_all = ["brightness", "contrast", "temperature", "saturation", "blur"]
    )]
    pub auto_match: bool,
}

impl AdjustmentArgs {
    pub fn to_params(&self) -> Result<AdjustmentParameters> {
        let photometric = if self.auto_match {
            PhotometricMode::Auto
        } else {
            PhotometricMode::Manual(ManualAdjustments {
                brightness: self.brightness,
                contrast: self.contrast,
                temperature: self.temperature,
                saturation: self.saturation,
                blur: self.blur,
            })
        };
        let params = AdjustmentParameters {
            photometric,
            feather_radius: self.feather,
        };
        params.validate()?;
        Ok(params)
    }
}

#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Photo containing the green screen.
    #[arg(long)]
    pub base: PathBuf,

    /// Image to place on the screen.
    #[arg(long)]
    pub replacement: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    pub output: PathBuf,

    /// Screen corners TL TR BR BL, as `"x,y x,y x,y x,y"` or a JSON array of
    /// pairs. Detected when omitted.
    #[arg(long)]
    pub corners: Option<CornerSet>,

    /// Also write a downscaled base64 JPEG preview (JSON) to this path.
    #[arg(long, value_name = "FILE")]
    pub preview: Option<PathBuf>,

    #[command(flatten)]
    pub detection: DetectionArgs,

    #[command(flatten)]
    pub adjustments: AdjustmentArgs,
}

#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    /// Photo containing the green screen.
    #[arg(long)]
    pub base: PathBuf,

    /// Images to place on the screen, one output each.
    #[arg(long, num_args = 1.., required = true)]
    pub replacements: Vec<PathBuf>,

    /// Directory for `<name>_composite.png` outputs.
    #[arg(long)]
    pub output_dir: PathBuf,

    /// Screen corners TL TR BR BL; detected once when omitted.
    #[arg(long)]
    pub corners: Option<CornerSet>,

    /// Stop at the first failed item instead of rendering the rest.
    #[arg(long)]
    pub fail_fast: bool,

    /// Worker threads (0 = one per core).
    #[arg(long)]
    pub threads: Option<usize>,

    #[command(flatten)]
    pub detection: DetectionArgs,

    #[command(flatten)]
    pub adjustments: AdjustmentArgs,
}

/// Load the configuration file (if any) and apply command-line overrides.
pub fn resolve_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let detection = match &cli.command {
        Command::Detect { detection, .. } => detection,
        Command::Render(args) => &args.detection,
        Command::Batch(args) => &args.detection,
    };
    if let Some(range) = detection.hue_range {
        config.detection.hue_range = range;
    }
    config.detection.hue_range.validate()?;

    if let Command::Batch(args) = &cli.command {
        if args.fail_fast {
            config.batch.failure_policy = FailurePolicy::FailFast;
        }
        if let Some(threads) = args.threads {
            config.batch.threads = threads;
        }
    }

    Ok(config)
}
