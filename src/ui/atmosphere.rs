use ratatui::style::Color;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(3);
const CALM_HUE: f32 = 215.0;
const FAST_HUE: f32 = 285.0;
const ERROR_HUE: f32 = 8.0;
/// Keys per second treated as flat-out typing.
const FAST_RATE: f32 = 8.0;

/// Rolling record of recent keystrokes.
#[derive(Debug, Default)]
pub struct TypingCadence {
    strokes: VecDeque<Instant>,
}

impl TypingCadence {
    pub fn record(&mut self, at: Instant) {
        self.strokes.push_back(at);
        self.prune(at);
    }

    /// Keystrokes per second over the trailing window.
    pub fn rate(&mut self, now: Instant) -> f32 {
        self.prune(now);
        self.strokes.len() as f32 / WINDOW.as_secs_f32()
    }

    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.strokes.front() {
            if now.duration_since(*front) > WINDOW {
                self.strokes.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Hue in degrees: calm blue at rest, violet when typing fast, pulled to red
/// as errors pile up.
pub fn hue(rate: f32, errors: usize) -> f32 {
    let speed = (rate / FAST_RATE).clamp(0.0, 1.0);
    let base = CALM_HUE + (FAST_HUE - CALM_HUE) * speed;
    let pull = (errors as f32 / 3.0).min(1.0);
    let mut h = base + ((ERROR_HUE + 360.0) - base) * pull;
    if h >= 360.0 {
        h -= 360.0;
    }
    h
}

pub fn accent(hue: f32, saturation: f32, lightness: f32) -> Color {
    let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);
    Color::Rgb(r, g, b)
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (u8, u8, u8) {
    let h = h.rem_euclid(360.0) / 60.0;
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u8 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    let to_u8 = |v: f32| ((v + m).clamp(0.0, 1.0) * 255.0).round() as u8;
    (to_u8(r), to_u8(g), to_u8(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cadence_window() {
        let t0 = Instant::now();
        let mut cadence = TypingCadence::default();
        for i in 0..6 {
            cadence.record(t0 + Duration::from_millis(i * 100));
        }
        assert_eq!(cadence.rate(t0 + Duration::from_millis(600)), 2.0);
        assert_eq!(cadence.rate(t0 + Duration::from_secs(10)), 0.0);
    }

    #[test]
    fn test_hue_moves_with_speed_and_errors() {
        assert_eq!(hue(0.0, 0), CALM_HUE);
        assert_eq!(hue(100.0, 0), FAST_HUE);
        assert!((hue(0.0, 5) - ERROR_HUE).abs() < 1e-3);
    }

    #[test]
    fn test_hsl_primaries() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), (0, 255, 0));
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), (0, 0, 255));
    }
}
