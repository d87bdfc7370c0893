//! Engine argument lists for the three conversion invocations
//!
//! Every builder is a pure function of its inputs. Settings are not validated
//! here; out-of-range values become arguments the engine rejects.

use crate::domain::model::*;

/// Working file every loaded input is normalized to
pub const INPUT_FILE: &str = "input.mp4";
/// Normalize target for an upload that has not been probed yet
pub const STAGED_FILE: &str = "upload.mp4";
/// Output of the trim+crop phase
pub const TRIM_FILE: &str = "trim.mp4";
/// Output of the encode phase
pub const OUTPUT_FILE: &str = "output.webm";

/// Longest edge of the encoded sticker
pub const STICKER_EDGE: u32 = 512;

/// Builds engine argument lists
pub struct CommandBuilder;

impl CommandBuilder {
    /// Re-encode any container to H.264 in MP4, copying audio
    pub fn normalize(input: &str, output: &str) -> Vec<String> {
        args([
            "-i", input, "-c:a", "copy", "-c:v", "libx264", output,
        ])
    }

    /// Clip `setting.time`, drop audio and metadata, and crop
    pub fn trim_crop(
        input: &str,
        output: &str,
        setting: &ConvertSetting,
        crop: &CropInfo,
    ) -> Vec<String> {
        let start = micros_to_seconds(setting.time.0);
        let end = micros_to_seconds(setting.time.1);
        let crop_filter = format!("crop={}:{}:{}:{}", crop.width, crop.height, crop.x, crop.y);

        args([
            "-i",
            input,
            "-ss",
            start.as_str(),
            "-to",
            end.as_str(),
            "-an",
            "-map_metadata",
            "-1",
            "-filter:v",
            crop_filter.as_str(),
            output,
        ])
    }

    /// Scale into the sticker box, retime, resample and encode VP9 with alpha
    pub fn encode(input: &str, output: &str, setting: &ConvertSetting) -> Vec<String> {
        let bitrate = format!("{}k", setting.bitrate);
        let filter = format!(
            "scale=w={edge}:h={edge}:force_original_aspect_ratio=decrease, setpts={}*PTS",
            1.0 / setting.speed,
            edge = STICKER_EDGE,
        );
        let fps = setting.fps.to_string();

        args([
            "-i",
            input,
            "-c:v",
            "libvpx-vp9",
            "-b:v",
            bitrate.as_str(),
            "-vf",
            filter.as_str(),
            "-r",
            fps.as_str(),
            "-pix_fmt",
            "yuva420p",
            output,
        ])
    }
}

fn args<const N: usize>(tokens: [&str; N]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

/// Shortest decimal form of a microsecond count in seconds (`1500000` -> `1.5`)
pub fn micros_to_seconds(micros: Micros) -> String {
    format!("{}", micros as f64 / MICROS_PER_SECOND)
}
