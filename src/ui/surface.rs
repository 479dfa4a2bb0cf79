use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Style};

use crate::engine::visibility::{FogSurface, Surface};

pub const BACKGROUND: (u8, u8, u8) = (14, 15, 22);
const FOG_TINT: (u8, u8, u8) = (58, 62, 78);
/// Density regained per second.
const FOG_REGROWTH: f32 = 0.12;

/// A plain render layer: an opacity and whether it takes the pointer.
#[derive(Debug, Clone, Copy)]
pub struct Pane {
    opacity: f32,
    interactive: bool,
}

impl Pane {
    pub fn new(opacity: f32, interactive: bool) -> Self {
        Self {
            opacity,
            interactive,
        }
    }
}

impl Surface for Pane {
    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    fn opacity(&self) -> f32 {
        self.opacity
    }

    fn interactive(&self) -> bool {
        self.interactive
    }
}

/// Fog as a density grid over the body area.
#[derive(Debug, Clone)]
pub struct FogPane {
    pane: Pane,
    width: u16,
    height: u16,
    density: Vec<f32>,
}

impl FogPane {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            pane: Pane::new(1.0, false),
            width,
            height,
            density: vec![1.0; width as usize * height as usize],
        }
    }

    fn index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }
}

impl Surface for FogPane {
    fn set_opacity(&mut self, opacity: f32) {
        self.pane.set_opacity(opacity);
    }

    fn set_interactive(&mut self, interactive: bool) {
        self.pane.set_interactive(interactive);
    }

    fn opacity(&self) -> f32 {
        self.pane.opacity()
    }

    fn interactive(&self) -> bool {
        self.pane.interactive()
    }
}

impl FogSurface for FogPane {
    fn clear_at(&mut self, x: f32, y: f32, radius: f32) {
        if radius <= 0.0 {
            return;
        }
        // Cells are about twice as tall as wide.
        let x_reach = (radius * 2.0).ceil() as i32;
        let y_reach = radius.ceil() as i32;
        for dy in -y_reach..=y_reach {
            for dx in -x_reach..=x_reach {
                let cx = x as i32 + dx;
                let cy = y as i32 + dy;
                if cx < 0 || cy < 0 {
                    continue;
                }
                let dist = ((dx as f32 / 2.0).powi(2) + (dy as f32).powi(2)).sqrt();
                if dist > radius {
                    continue;
                }
                if let Some(i) = self.index(cx as u16, cy as u16) {
                    let cleared = dist / radius;
                    self.density[i] = self.density[i].min(cleared);
                }
            }
        }
    }

    fn density_at(&self, x: u16, y: u16) -> f32 {
        self.index(x, y).map(|i| self.density[i]).unwrap_or(1.0)
    }

    fn regrow(&mut self, dt: f32) {
        let step = FOG_REGROWTH * dt.max(0.0);
        for d in &mut self.density {
            *d = (*d + step).min(1.0);
        }
    }

    fn resize(&mut self, width: u16, height: u16) {
        if width != self.width || height != self.height {
            *self = Self {
                pane: self.pane,
                ..Self::new(width, height)
            };
        }
    }
}

/// RGB of a terminal colour, approximating the named palette.
pub fn to_rgb(color: Color) -> (u8, u8, u8) {
    match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0, 0, 0),
        Color::Red => (205, 49, 49),
        Color::Green => (13, 188, 121),
        Color::Yellow => (229, 229, 16),
        Color::Blue => (36, 114, 200),
        Color::Magenta => (188, 63, 188),
        Color::Cyan => (17, 168, 205),
        Color::Gray => (204, 204, 204),
        Color::DarkGray => (118, 118, 118),
        Color::LightRed => (241, 76, 76),
        Color::LightGreen => (35, 209, 139),
        Color::LightYellow => (245, 245, 67),
        Color::LightBlue => (59, 142, 234),
        Color::LightMagenta => (214, 112, 214),
        Color::LightCyan => (41, 184, 219),
        Color::White => (229, 229, 229),
        Color::Indexed(i) => (i, i, i),
        Color::Reset => (204, 204, 204),
    }
}

/// Mix `color` over `under` at `opacity`.
pub fn blend(color: Color, under: (u8, u8, u8), opacity: f32) -> Color {
    let (r, g, b) = to_rgb(color);
    let t = opacity.clamp(0.0, 1.0);
    let mix = |c: u8, u: u8| (u as f32 + (c as f32 - u as f32) * t).round() as u8;
    Color::Rgb(mix(r, under.0), mix(g, under.1), mix(b, under.2))
}

/// Fade a style's colours into the background.
pub fn fade(style: Style, opacity: f32) -> Style {
    let mut faded = style;
    if let Some(fg) = style.fg {
        faded.fg = Some(blend(fg, BACKGROUND, opacity));
    }
    if let Some(bg) = style.bg {
        faded.bg = Some(blend(bg, BACKGROUND, opacity));
    }
    faded
}

/// Dim every cell in `area` whose distance from `center` exceeds `radius`.
pub fn dim_outside(buf: &mut Buffer, area: Rect, center: Option<(u16, u16)>, radius: f32, strength: f32) {
    if strength <= 0.0 {
        return;
    }
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            let inside = center.is_some_and(|(cx, cy)| {
                let dx = (x as f32 - cx as f32) / 2.0;
                let dy = y as f32 - cy as f32;
                (dx * dx + dy * dy).sqrt() <= radius
            });
            if inside {
                continue;
            }
            if let Some(cell) = buf.cell_mut(Position::new(x, y)) {
                cell.fg = blend(cell.fg, BACKGROUND, 1.0 - strength);
                cell.bg = blend(cell.bg, BACKGROUND, 1.0 - strength);
            }
        }
    }
}

/// Tint cells towards fog grey by the pane's density.
pub fn draw_fog(buf: &mut Buffer, area: Rect, fog: &dyn FogSurface) {
    let opacity = fog.opacity();
    if opacity <= 0.0 {
        return;
    }
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            let density = fog.density_at(x - area.x, y - area.y) * opacity * 0.45;
            if density <= 0.01 {
                continue;
            }
            if let Some(cell) = buf.cell_mut(Position::new(x, y)) {
                let fg = to_rgb(cell.fg);
                let bg = to_rgb(cell.bg);
                cell.fg = blend(Color::Rgb(FOG_TINT.0, FOG_TINT.1, FOG_TINT.2), fg, density);
                cell.bg = blend(Color::Rgb(FOG_TINT.0, FOG_TINT.1, FOG_TINT.2), bg, density * 0.5);
            }
        }
    }
}
