//! Render quality presets and duration estimation for lyric videos.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::lyrics::{last_end_time, LyricLine};

/// Duration assumed for a video with no lyric lines, in seconds.
pub const DEFAULT_VIDEO_DURATION_SECS: f64 = 60.0;

/// Output quality for a rendered video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderQuality {
    #[serde(rename = "720p")]
    Hd720,
    #[default]
    #[serde(rename = "1080p")]
    Hd1080,
}

impl RenderQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            RenderQuality::Hd720 => "720p",
            RenderQuality::Hd1080 => "1080p",
        }
    }

    /// Frame size as `WIDTHxHEIGHT`.
    pub fn resolution(self) -> &'static str {
        match self {
            RenderQuality::Hd720 => "1280x720",
            RenderQuality::Hd1080 => "1920x1080",
        }
    }

    /// Rough output size used when the renderer does not report one.
    pub fn estimated_file_size_bytes(self) -> i64 {
        const MIB: i64 = 1024 * 1024;
        match self {
            RenderQuality::Hd720 => 50 * MIB,
            RenderQuality::Hd1080 => 150 * MIB,
        }
    }
}

impl fmt::Display for RenderQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RenderQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "720p" => Ok(RenderQuality::Hd720),
            "1080p" => Ok(RenderQuality::Hd1080),
            other => Err(format!("unknown render quality '{other}'")),
        }
    }
}

/// Video length implied by the lyrics: the end of the last line, or
/// [`DEFAULT_VIDEO_DURATION_SECS`] when there are none.
pub fn estimate_duration_secs(lines: &[LyricLine]) -> f64 {
    last_end_time(lines).unwrap_or(DEFAULT_VIDEO_DURATION_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_quality_is_1080p() {
        assert_eq!(RenderQuality::default(), RenderQuality::Hd1080);
        assert_eq!(RenderQuality::default().resolution(), "1920x1080");
    }

    #[test]
    fn quality_round_trips_through_str() {
        for quality in [RenderQuality::Hd720, RenderQuality::Hd1080] {
            assert_eq!(quality.as_str().parse::<RenderQuality>(), Ok(quality));
        }
        assert!("4k".parse::<RenderQuality>().is_err());
    }

    #[test]
    fn estimated_sizes() {
        assert_eq!(RenderQuality::Hd720.estimated_file_size_bytes(), 52_428_800);
        assert_eq!(RenderQuality::Hd1080.estimated_file_size_bytes(), 157_286_400);
    }

    #[test]
    fn duration_uses_last_line_or_default() {
        let lines = vec![
            LyricLine::new("a", 0.0, 2.0),
            LyricLine::new("b", 2.0, 42.5),
        ];
        assert_eq!(estimate_duration_secs(&lines), 42.5);
        assert_eq!(estimate_duration_secs(&[]), DEFAULT_VIDEO_DURATION_SECS);
    }
}
