use std::{env, sync::OnceLock, time::Duration};

use ratatui::style::Color;

pub const THEME_ENV: &str = "DRUGPRICE_THEME";

const LUMA_THRESHOLD: f32 = 0.6;
// A single luma read right after startup can be noisy; the median of a few
// samples decides.
const LUMA_SAMPLES: usize = 5;
const LUMA_SAMPLE_DELAY: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    panel_bg: Color,
    header_bg: Color,
    text: Color,
    text_muted: Color,
    accent: Color,
    border: Color,
    cursor_bg: Color,
    cursor_fg: Color,
    marked: Color,
    success: Color,
    warning: Color,
    error: Color,
}

impl Theme {
    /// `$DRUGPRICE_THEME` if set, otherwise picked from the terminal background.
    pub fn detect() -> Self {
        static THEME: OnceLock<Theme> = OnceLock::new();
        *THEME.get_or_init(|| {
            if let Some(theme) = env::var(THEME_ENV).ok().and_then(|v| Self::from_name(&v)) {
                return theme;
            }
            match detect_terminal_luma() {
                Some(luma) if luma > LUMA_THRESHOLD => Self::light(),
                _ => Self::dark(),
            }
        })
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Self::light()),
            "dark" => Some(Self::dark()),
            _ => None,
        }
    }

    pub fn dark() -> Self {
        Self {
            panel_bg: Color::Rgb(16, 24, 26),
            header_bg: Color::Rgb(24, 38, 40),
            text: Color::Rgb(228, 236, 234),
            text_muted: Color::Rgb(140, 158, 156),
            accent: Color::Rgb(94, 214, 176),
            border: Color::Rgb(60, 82, 84),
            cursor_bg: Color::Rgb(34, 62, 66),
            cursor_fg: Color::Rgb(240, 248, 246),
            marked: Color::Rgb(242, 190, 100),
            success: Color::Rgb(150, 210, 110),
            warning: Color::Rgb(230, 180, 90),
            error: Color::Rgb(244, 112, 120),
        }
    }

    pub fn light() -> Self {
        Self {
            panel_bg: Color::Rgb(252, 253, 252),
            header_bg: Color::Rgb(230, 242, 238),
            text: Color::Rgb(28, 36, 38),
            text_muted: Color::Rgb(96, 110, 112),
            accent: Color::Rgb(10, 128, 100),
            border: Color::Rgb(160, 176, 174),
            cursor_bg: Color::Rgb(210, 236, 228),
            cursor_fg: Color::Rgb(12, 24, 26),
            marked: Color::Rgb(176, 96, 6),
            success: Color::Rgb(40, 150, 70),
            warning: Color::Rgb(176, 96, 6),
            error: Color::Rgb(200, 50, 40),
        }
    }

    pub fn panel_bg(&self) -> Color {
        self.panel_bg
    }

    pub fn header_bg(&self) -> Color {
        self.header_bg
    }

    pub fn text(&self) -> Color {
        self.text
    }

    pub fn text_muted(&self) -> Color {
        self.text_muted
    }

    pub fn accent(&self) -> Color {
        self.accent
    }

    pub fn border(&self) -> Color {
        self.border
    }

    pub fn cursor_bg(&self) -> Color {
        self.cursor_bg
    }

    pub fn cursor_fg(&self) -> Color {
        self.cursor_fg
    }

    /// Rows picked for export.
    pub fn marked(&self) -> Color {
        self.marked
    }

    pub fn success(&self) -> Color {
        self.success
    }

    pub fn warning(&self) -> Color {
        self.warning
    }

    pub fn error(&self) -> Color {
        self.error
    }
}

fn detect_terminal_luma() -> Option<f32> {
    let mut samples = Vec::with_capacity(LUMA_SAMPLES);
    for attempt in 0..LUMA_SAMPLES {
        if let Ok(luma) = terminal_light::luma()
            && luma.is_finite()
        {
            samples.push(luma);
        }
        if attempt + 1 < LUMA_SAMPLES {
            std::thread::sleep(LUMA_SAMPLE_DELAY);
        }
    }
    median_luma(&mut samples)
}

fn median_luma(samples: &mut [f32]) -> Option<f32> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(|a, b| a.total_cmp(b));
    let mid = samples.len() / 2;
    Some(if samples.len().is_multiple_of(2) {
        (samples[mid - 1] + samples[mid]) / 2.0
    } else {
        samples[mid]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_samples() {
        assert_eq!(median_luma(&mut []), None);
        let odd = median_luma(&mut [0.9, 0.4, 0.2]).unwrap();
        assert!((odd - 0.4).abs() < 1e-6);
        let even = median_luma(&mut [0.2, 0.8, 0.4, 0.6]).unwrap();
        assert!((even - 0.5).abs() < 1e-6);
    }

    #[test]
    fn theme_names() {
        assert_eq!(Theme::from_name(" Light "), Some(Theme::light()));
        assert_eq!(Theme::from_name("dark"), Some(Theme::dark()));
        assert_eq!(Theme::from_name("sepia"), None);
    }
}
