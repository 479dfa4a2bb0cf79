use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};
use ratatui::style::Color;
use std::time::{Duration, Instant};

use super::surface::{BACKGROUND, blend, to_rgb};

const FLASH_COLOR: Color = Color::Rgb(214, 220, 255);
const FLASH: Duration = Duration::from_millis(220);

/// The two rain layers: a slow, dim sheet far away and sparse fast streaks
/// running down the glass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RainKind {
    Back,
    Front,
}

impl RainKind {
    fn color(self) -> Color {
        match self {
            Self::Back => Color::Rgb(70, 98, 140),
            Self::Front => Color::Rgb(140, 178, 226),
        }
    }

    /// Drops per hundred cells of area.
    fn density(self) -> f32 {
        match self {
            Self::Back => 1.2,
            Self::Front => 0.6,
        }
    }

    /// Cells per second: base and random spread.
    fn speed(self) -> (f32, u32) {
        match self {
            Self::Back => (12.0, 18),
            Self::Front => (26.0, 24),
        }
    }

    fn glyph(self) -> &'static str {
        match self {
            Self::Back => "╎",
            Self::Front => "│",
        }
    }

    fn seed(self) -> u32 {
        match self {
            Self::Back => 0x5eed_0001,
            Self::Front => 0x5eed_0002,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Raindrop {
    x: u16,
    y: f32,
    speed: f32,
}

/// Falling rain streaks. A drop draws its glyph on an empty cell and tints
/// the foreground of an occupied one.
#[derive(Debug)]
pub struct Rain {
    kind: RainKind,
    drops: Vec<Raindrop>,
    area: Rect,
    seed: u32,
}

impl Rain {
    pub fn new(kind: RainKind) -> Self {
        Self {
            kind,
            drops: Vec::new(),
            area: Rect::default(),
            seed: kind.seed(),
        }
    }

    pub fn resize(&mut self, area: Rect) {
        if area == self.area {
            return;
        }
        self.area = area;
        let count = (area.area() as f32 * self.kind.density() / 100.0) as usize;
        let drops = (0..count).map(|_| self.spawn(true)).collect();
        self.drops = drops;
    }

    pub fn advance(&mut self, dt: f32) {
        let height = self.area.height as f32;
        for i in 0..self.drops.len() {
            self.drops[i].y += self.drops[i].speed * dt;
            if self.drops[i].y >= height {
                let fresh = self.spawn(false);
                self.drops[i] = fresh;
            }
        }
    }

    pub fn draw(&self, buf: &mut Buffer, opacity: f32) {
        if opacity <= 0.0 {
            return;
        }
        let glyph_color = blend(self.kind.color(), BACKGROUND, opacity * 0.8);
        for drop in &self.drops {
            let pos = Position::new(self.area.x + drop.x, self.area.y + drop.y as u16);
            let Some(cell) = buf.cell_mut(pos) else {
                continue;
            };
            if cell.symbol() == " " {
                cell.set_symbol(self.kind.glyph());
                cell.set_fg(glyph_color);
            } else {
                cell.fg = blend(self.kind.color(), to_rgb(cell.fg), opacity * 0.5);
            }
        }
    }

    /// Xorshift step over the stored seed.
    fn next(&mut self) -> u32 {
        let mut x = self.seed.wrapping_add(0x9e37_79b9);
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.seed = x;
        x
    }

    fn spawn(&mut self, anywhere: bool) -> Raindrop {
        let width = self.area.width.max(1) as u32;
        let height = self.area.height.max(1) as u32;
        Raindrop {
            x: (self.next() % width) as u16,
            y: if anywhere {
                (self.next() % height) as f32
            } else {
                0.0
            },
            speed: {
                let (base, spread) = self.kind.speed();
                base + (self.next() % spread) as f32
            },
        }
    }
}

/// Screen flash when the editor's error count rises.
#[derive(Debug, Default)]
pub struct Lightning {
    struck: Option<Instant>,
}

impl Lightning {
    pub fn strike(&mut self, now: Instant) {
        tracing::debug!("lightning");
        self.struck = Some(now);
    }

    /// Flash strength, fading out over the flash duration.
    pub fn intensity(&self, now: Instant) -> f32 {
        let Some(at) = self.struck else {
            return 0.0;
        };
        let elapsed = now.duration_since(at).as_secs_f32();
        (1.0 - elapsed / FLASH.as_secs_f32()).max(0.0)
    }
}

pub fn draw_flash(buf: &mut Buffer, area: Rect, intensity: f32) {
    if intensity <= 0.0 {
        return;
    }
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            if let Some(cell) = buf.cell_mut(Position::new(x, y)) {
                cell.bg = blend(FLASH_COLOR, to_rgb(cell.bg), intensity * 0.6);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rain_drops_stay_in_area() {
        let mut rain = Rain::new(RainKind::Front);
        rain.resize(Rect::new(2, 1, 40, 10));
        assert!(!rain.drops.is_empty());
        for _ in 0..50 {
            rain.advance(0.1);
        }
        assert!(rain.drops.iter().all(|d| d.x < 40 && d.y < 10.0));
    }

    #[test]
    fn test_rain_tints_occupied_cells_without_replacing_them() {
        let area = Rect::new(0, 0, 20, 20);
        let mut buf = Buffer::empty(area);
        for y in 0..20 {
            for x in 0..20 {
                buf[(x, y)].set_symbol("x").set_fg(Color::Rgb(200, 200, 200));
            }
        }
        let mut rain = Rain::new(RainKind::Back);
        rain.resize(area);
        rain.draw(&mut buf, 1.0);
        assert!(buf.content().iter().all(|c| c.symbol() == "x"));
        assert!(buf.content().iter().any(|c| c.fg != Color::Rgb(200, 200, 200)));
    }

    #[test]
    fn test_rain_fills_empty_cells_with_its_glyph() {
        let area = Rect::new(0, 0, 20, 20);
        let mut buf = Buffer::empty(area);
        let mut rain = Rain::new(RainKind::Front);
        rain.resize(area);
        rain.draw(&mut buf, 1.0);
        assert!(buf.content().iter().any(|c| c.symbol() == "│"));
        assert!(buf.content().iter().all(|c| c.symbol() == " " || c.symbol() == "│"));
    }

    #[test]
    fn test_rain_layers_differ() {
        let area = Rect::new(0, 0, 40, 20);
        let mut back = Rain::new(RainKind::Back);
        let mut front = Rain::new(RainKind::Front);
        back.resize(area);
        front.resize(area);
        assert!(back.drops.len() > front.drops.len());
        assert!(front.drops.iter().all(|d| d.speed >= 26.0));
    }

    #[test]
    fn test_lightning_fades() {
        let t0 = Instant::now();
        let mut lightning = Lightning::default();
        assert_eq!(lightning.intensity(t0), 0.0);
        lightning.strike(t0);
        assert_eq!(lightning.intensity(t0), 1.0);
        assert_eq!(lightning.intensity(t0 + Duration::from_secs(1)), 0.0);
    }
}
