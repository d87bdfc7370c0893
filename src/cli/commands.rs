//! Command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::adapters::{FixedCropWidget, StickerConfig};
use crate::app::progress::watch_progress;
use crate::app::{AppContainer, ConsoleProgressObserver, JsonProgressObserver, ProgressObserver};
use crate::cli::args::{ConvertArgs, InspectArgs, PlanArgs, ReportFormat};
use crate::cli::view;
use crate::domain::commands::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::error::StickerError;

/// Execute the convert command
pub async fn convert(container: &dyn AppContainer, args: ConvertArgs) -> Result<()> {
    info!("Starting convert operation");
    info!("Input: {}", args.input.display());
    info!("Output: {}", args.output.display());

    // Validate input file exists
    if !args.input.is_file() {
        return Err(StickerError::InputFileNotFound {
            path: args.input.display().to_string(),
        }
        .into());
    }
    if args.output.exists() && !args.overwrite {
        anyhow::bail!(
            "Output file already exists: {} (pass --overwrite to replace it)",
            args.output.display()
        );
    }

    // Views go to stderr when stdout carries JSON events
    let show = |text: String| {
        if args.json_progress {
            eprintln!("{}", text);
        } else {
            println!("{}", text);
        }
    };

    let data = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.input.display().to_string());
    let size = data.len() as u64;

    let controller = container.controller();
    controller
        .init_engine()
        .await
        .context("Failed to start ffmpeg")?;

    let info = controller
        .load_input(UploadPayload::file(name.clone(), data))
        .await
        .with_context(|| format!("Failed to load {}", name))?;
    show(view::render_upload(&name, size));
    show(view::render_video_info(&info));

    controller
        .merge_settings(args.settings_patch(info.duration))
        .context("Invalid conversion settings")?;

    if args.crop.is_some() || args.aspect.is_some() {
        let widget = match args.crop {
            Some(rect) => FixedCropWidget::with_rect(info, rect),
            None => FixedCropWidget::new(info),
        };
        controller.enable_crop(Arc::new(widget))?;
        if let Some(ratio) = args.aspect {
            controller.set_aspect_ratio(ratio)?;
        }
    }

    let state = controller.state();
    show(view::render_crop_toolbar(state.cropper.cropper.as_ref()));
    show(view::render_trim_bar(&state.video_editor_config, info.duration));
    show(view::render_settings(&state.video_editor_config));

    let observer: Box<dyn ProgressObserver> = if args.json_progress {
        Box::new(JsonProgressObserver)
    } else {
        Box::new(ConsoleProgressObserver::new(true))
    };

    // the watcher returns once the conversion settles as converted or failed
    let (result, ()) = tokio::join!(
        controller.convert(),
        watch_progress(controller.subscribe(), observer.as_ref())
    );
    let output = result.context("Conversion failed")?;

    controller
        .save_output(&args.output)
        .await
        .map_err(|e| StickerError::OutputError {
            message: e.to_string(),
        })?;
    show(view::render_output_card(&output, &args.output));

    if StickerLimits::check_size(output.file_size).is_some() {
        warn!(size = output.file_size, "Sticker exceeds the size limit");
    }
    info!("Convert operation completed successfully");
    Ok(())
}

/// Execute the inspect command
pub async fn inspect(container: &dyn AppContainer, args: InspectArgs) -> Result<()> {
    info!("Starting inspect operation");
    info!("Input: {}", args.input.display());

    // Validate input file exists
    if !args.input.is_file() {
        return Err(StickerError::InputFileNotFound {
            path: args.input.display().to_string(),
        }
        .into());
    }

    let report = container
        .inspect_interactor()
        .inspect(&args.input, args.frame)
        .await
        .context("Failed to inspect input file")?;

    let rendered = match args.format {
        ReportFormat::Text => view::render_report(&report),
        ReportFormat::Json => serde_json::to_string_pretty(&report).map_err(StickerError::from)?,
        ReportFormat::Yaml => serde_yaml::to_string(&report).map_err(StickerError::from)?,
    };
    println!("{}", rendered);

    info!("Inspect operation completed successfully");
    Ok(())
}

/// The three argument lists a conversion with these settings would run
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PlannedCommands {
    pub normalize: Vec<String>,
    pub trim: Vec<String>,
    pub encode: Vec<String>,
}

/// Build the dry-run plan; settings not given fall back to the configuration
pub fn plan_commands(config: &StickerConfig, args: &PlanArgs) -> Result<PlannedCommands> {
    if args.start > args.end {
        anyhow::bail!("Start time must not be after end time");
    }

    let mut setting = config.convert.to_setting();
    setting.merge(&ConvertSettingPatch {
        bitrate: args.bitrate,
        fps: args.fps,
        speed: args.speed,
        time: Some((args.start, args.end)),
    });

    Ok(PlannedCommands {
        normalize: CommandBuilder::normalize(&args.input, INPUT_FILE),
        trim: CommandBuilder::trim_crop(INPUT_FILE, TRIM_FILE, &setting, &args.crop),
        encode: CommandBuilder::encode(TRIM_FILE, OUTPUT_FILE, &setting),
    })
}

/// Execute the commands (dry run) command
pub fn plan(config: &StickerConfig, args: PlanArgs) -> Result<()> {
    let planned = plan_commands(config, &args)?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&planned).map_err(StickerError::from)?
        );
        return Ok(());
    }

    let program = engine_program(&config.engine.ffmpeg);
    println!("# normalize (only when the input is not MP4)");
    println!("{}", view::render_command(&program, &planned.normalize));
    println!("# trim and crop");
    println!("{}", view::render_command(&program, &planned.trim));
    println!("# encode");
    println!("{}", view::render_command(&program, &planned.encode));
    Ok(())
}

fn engine_program(path: &Path) -> String {
    path.display().to_string()
}
