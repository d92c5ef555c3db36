//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Marble and UI colours, defaulting to the MaMatch pastel set.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Marble colours (index 0..=5): blue, pink, green, purple, yellow, cyan.
    pub marble: [Color; 6],
    /// Board background.
    pub bg: Color,
    /// Grid / border.
    pub grid_line: Color,
    /// Text (score, combo).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Inactive / secondary text.
    pub inactive_fg: Color,
    /// Cursor highlight on the board.
    pub cursor: Color,
    /// Selected-cell highlight on the board.
    pub selected: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::mamatch_default()
    }
}

impl Theme {
    /// Hardcoded defaults: six pastel marble colours on a dark board.
    pub fn mamatch_default() -> Self {
        Self {
            marble: [
                parse_hex("#4E82FF").unwrap(), // blue
                parse_hex("#FF6B9D").unwrap(), // pink
                parse_hex("#5EDCA8").unwrap(), // green
                parse_hex("#9370FF").unwrap(), // purple
                parse_hex("#FFC83D").unwrap(), // yellow
                parse_hex("#22D3EE").unwrap(), // cyan
            ],
            bg: parse_hex("#1E2430").unwrap(),
            grid_line: parse_hex("#3F444F").unwrap(),
            main_fg: parse_hex("#ABB2BF").unwrap(),
            title: parse_hex("#E5C07B").unwrap(),
            inactive_fg: parse_hex("#5C6370").unwrap(),
            cursor: parse_hex("#FFC83D").unwrap(),
            selected: parse_hex("#FF6B9D").unwrap(),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to the defaults if path is None or file is missing/invalid.
    /// `palette` selects colour variant: Normal (theme), HighContrast, or Colorblind.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default_for_palette(palette)),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        let mut theme = Self::from_map(&map);
        theme.apply_palette(palette);
        Ok(theme)
    }

    fn default_for_palette(palette: crate::Palette) -> Self {
        let mut t = Self::mamatch_default();
        t.apply_palette(palette);
        t
    }

    /// Override marble colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.marble = [
                    parse_hex("#0088FF").unwrap(), // blue
                    parse_hex("#FF00FF").unwrap(), // magenta for pink
                    parse_hex("#00FF00").unwrap(), // bright green
                    parse_hex("#AA00FF").unwrap(), // purple
                    parse_hex("#FFFF00").unwrap(), // yellow
                    parse_hex("#00FFFF").unwrap(), // cyan
                ];
            }
            crate::Palette::Colorblind => {
                // Avoid red/green alone; Tol bright-ish set
                self.marble = [
                    parse_hex("#0077BB").unwrap(), // blue
                    parse_hex("#EE3377").unwrap(), // magenta
                    parse_hex("#009988").unwrap(), // teal
                    parse_hex("#CC3311").unwrap(), // red
                    parse_hex("#BBBB00").unwrap(), // yellow
                    parse_hex("#33BBEE").unwrap(), // light blue
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        let defaults = Self::mamatch_default();
        // Keys follow btop theme naming so existing theme files map over.
        Self {
            marble: [
                get("cpu_box").unwrap_or(defaults.marble[0]),
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(defaults.marble[1]),
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(defaults.marble[2]),
                get("net_box").unwrap_or(defaults.marble[3]),
                get("title").or_else(|| get("cpu_mid")).unwrap_or(defaults.marble[4]),
                get("hi_fg").or_else(|| get("proc_misc")).unwrap_or(defaults.marble[5]),
            ],
            bg: get("meter_bg").unwrap_or(defaults.bg),
            grid_line: get("div_line").unwrap_or(defaults.grid_line),
            main_fg: get("main_fg").unwrap_or(defaults.main_fg),
            title: get("title").unwrap_or(defaults.title),
            inactive_fg: get("inactive_fg").unwrap_or(defaults.inactive_fg),
            cursor: get("title").unwrap_or(defaults.cursor),
            selected: get("hi_fg").unwrap_or(defaults.selected),
        }
    }

    /// Marble colour for a palette index (0..6).
    #[inline]
    pub fn marble_color(&self, index: u8) -> Color {
        self.marble[(index as usize) % 6]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let (r, g, b) = if s.len() == 6 {
        let r =
            u8::from_str_radix(&s[0..2], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        let g =
            u8::from_str_radix(&s[2..4], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        let b =
            u8::from_str_radix(&s[4..6], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        (r, g, b)
    } else if s.len() == 3 {
        let r = u8::from_str_radix(&s[0..1], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        let g = u8::from_str_radix(&s[1..2], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        let b = u8::from_str_radix(&s[2..3], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        (r, g, b)
    } else {
        return Err(ThemeError::InvalidHex(s.to_string()));
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#4E82FF").unwrap();
        assert!(matches!(c, Color::Rgb(0x4E, 0x82, 0xFF)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_invalid() {
        assert!(parse_hex("#12345").is_err());
        assert!(parse_hex("#GGGGGG").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[meter_bg]="#1E2430""##);
        assert_eq!(map.get("meter_bg"), Some(&"#1E2430".to_string()));
    }

    #[test]
    fn test_marble_color_wraps() {
        let t = Theme::default();
        assert_eq!(t.marble_color(0), t.marble_color(6));
    }
}
