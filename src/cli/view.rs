//! Terminal views over the application state

use std::path::Path;

use crate::app::InspectReport;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::CropperHandle;
use crate::utils::format_file_size;
use crate::utils::time::format_time_duration;

const TRIM_BAR_WIDTH: usize = 40;

/// Upload confirmation
pub fn render_upload(name: &str, size: u64) -> String {
    format!("Loaded {} ({})", name, format_file_size(size))
}

pub fn render_video_info(info: &VideoInfo) -> String {
    format!(
        "Video: {}x{}, {}",
        info.width,
        info.height,
        format_time_duration(info.duration, 1.0)
    )
}

/// Crop switch and aspect ratio buttons, the active preset in brackets
pub fn render_crop_toolbar(cropper: Option<&CropperHandle>) -> String {
    let Some(handle) = cropper else {
        return "Crop: off".to_string();
    };

    let active = handle.aspect_ratio();
    let buttons: Vec<String> = AspectRatio::ALL
        .iter()
        .map(|ratio| {
            if *ratio == active {
                format!("[{}]", ratio.label())
            } else {
                ratio.label().to_string()
            }
        })
        .collect();

    format!("Crop: on  {}  {}", buttons.join(" "), handle.get_data())
}

/// Trim range over the whole video, with the playback length at the chosen speed
pub fn render_trim_bar(setting: &ConvertSetting, duration: Micros) -> String {
    let (start, end) = setting.time;
    let cell = |t: Micros| -> usize {
        if duration == 0 {
            return 0;
        }
        ((t.min(duration) as f64 / duration as f64) * TRIM_BAR_WIDTH as f64).round() as usize
    };
    let (from, to) = (cell(start), cell(end).max(cell(start)));

    let bar: String = (0..TRIM_BAR_WIDTH)
        .map(|i| if (from..to).contains(&i) { '=' } else { '-' })
        .collect();

    let mut out = format!(
        "[{}] {} - {}  length {}",
        bar,
        format_time_duration(start, setting.speed),
        format_time_duration(end, setting.speed),
        format_time_duration(setting.clip_duration(), setting.speed)
    );
    if let Some(warning) = StickerLimits::check_duration(setting) {
        out.push('\n');
        out.push_str(&render_warning(warning));
    }
    out
}

pub fn render_settings(setting: &ConvertSetting) -> String {
    format!(
        "Speed: {}x  FPS: {}  Bitrate: {}k",
        setting.speed, setting.fps, setting.bitrate
    )
}

pub fn render_warning(warning: StickerWarning) -> String {
    format!("Warning: {}", warning.message())
}

/// Download card for a finished sticker
pub fn render_output_card(output: &OutputFile, path: &Path) -> String {
    let mut out = format!("Download Video ({}KB): {}", output.size_kb(), path.display());
    if let Some(warning) = StickerLimits::check_size(output.file_size) {
        out.push('\n');
        out.push_str(&render_warning(warning));
    }
    out
}

/// Plain text inspect report
pub fn render_report(report: &InspectReport) -> String {
    let mut lines = vec![
        format!("File: {}", report.path),
        format!("Size: {}", format_file_size(report.file_size)),
        format!("Container: {}", report.file_info.name),
        format!(
            "Duration: {}",
            format_time_duration(report.file_info.duration, 1.0)
        ),
        format!(
            "Needs normalizing: {}",
            if report.is_mp4 { "no" } else { "yes" }
        ),
    ];

    if report.file_info.streams.is_empty() {
        lines.push("Video streams: none".to_string());
    }
    for (index, stream) in report.file_info.streams.iter().enumerate() {
        lines.push(format!("Video stream {}: {}x{}", index, stream.width, stream.height));
    }

    if let Some(frame) = &report.frame {
        lines.push(format!(
            "Frame {}: {} {}x{}{}",
            frame.index,
            format_time_duration(frame.timestamp, 1.0),
            frame.width,
            frame.height,
            if frame.key_frame { " (key frame)" } else { "" }
        ));
    }
    lines.join("\n")
}

/// One engine invocation as a copy-pasteable shell line
pub fn render_command(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().map(|arg| shell_quote(arg)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.,:=/+*%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
