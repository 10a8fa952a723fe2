//! Supported music styles and background themes.

use serde::Serialize;

/// Target styles accepted by the style-transfer stage.
pub const MUSIC_STYLES: [&str; 6] = ["Orchestra", "Jazz", "Rock", "EDM", "Lo-fi", "Classical"];

/// Background themes accepted by the render stage.
pub const BACKGROUND_THEMES: [&str; 4] = ["dark", "light", "gradient", "abstract"];

/// Theme used when a project does not specify one.
pub const DEFAULT_BACKGROUND_THEME: &str = "dark";

pub fn is_supported_music_style(style: &str) -> bool {
    MUSIC_STYLES.contains(&style)
}

pub fn is_supported_background_theme(theme: &str) -> bool {
    BACKGROUND_THEMES.contains(&theme)
}

/// Visual parameters handed to the renderer for a background theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemePalette {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<&'static str>,
}

/// Palette for `theme`. Unknown themes fall back to `dark`.
pub fn theme_palette(theme: &str) -> ThemePalette {
    let none = ThemePalette {
        color: None,
        gradient: None,
        pattern: None,
    };
    match theme {
        "light" => ThemePalette {
            color: Some("#f5f5f5"),
            ..none
        },
        "gradient" => ThemePalette {
            gradient: Some("linear-gradient(135deg, #667eea 0%, #764ba2 100%)"),
            ..none
        },
        "abstract" => ThemePalette {
            pattern: Some("animated-shapes"),
            ..none
        },
        _ => ThemePalette {
            color: Some("#1a1a2e"),
            ..none
        },
    }
}
