use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use super::atmosphere::accent;
use crate::engine::gestures::{PortalPhase, SonarPhase};
use crate::engine::visibility::{EditorDepth, LayerModes, Weather};
use crate::model::buffer::Buffer;
use crate::model::mode::Mode;

pub struct StatusInfo<'a> {
    pub mode: Mode,
    pub buffer: &'a Buffer,
    pub depth: f32,
    pub modes: LayerModes,
    pub weather: Weather,
    pub editor_depth: EditorDepth,
    pub animations: bool,
    pub sonar: SonarPhase,
    pub portal: PortalPhase,
    pub notes: usize,
    pub diagnostics: usize,
    pub hue: f32,
}

/// One letter per ambient toggle, `-` when off.
pub fn flags(info: &StatusInfo<'_>) -> String {
    [
        (info.modes.lantern, 'L'),
        (info.modes.ghost, 'G'),
        (info.modes.xray, 'X'),
        (info.weather.rain_back, 'R'),
        (info.weather.rain_front, 'W'),
        (info.weather.fog, 'F'),
        (info.animations, 'A'),
    ]
    .iter()
    .map(|&(on, c)| if on { c } else { '-' })
    .collect()
}

fn gesture_label(info: &StatusInfo<'_>) -> Option<&'static str> {
    match (info.sonar, info.portal) {
        (SonarPhase::Pulsing { .. }, _) => Some("sonar"),
        (SonarPhase::Charging { .. }, _) => Some("sonar?"),
        (_, PortalPhase::Active) => Some("portal"),
        (_, PortalPhase::Armed { .. }) => Some("portal…"),
        _ => None,
    }
}

pub fn render(frame: &mut Frame, area: Rect, info: &StatusInfo<'_>) {
    let mode_style = match info.mode {
        Mode::Normal => Style::default()
            .fg(Color::Black)
            .bg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
        Mode::Insert => Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    };
    let mode_span = Span::styled(format!(" {} ", info.mode.label()), mode_style);

    let file_name = info
        .buffer
        .path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "[scratch]".to_string());
    let dirty_marker = if info.buffer.dirty { " [+]" } else { "" };

    let file = Span::styled(
        format!(
            " {file_name}{dirty_marker}  {}:{} ",
            info.buffer.cursor.row + 1,
            info.buffer.cursor.col + 1,
        ),
        Style::default().fg(Color::Gray).bg(Color::DarkGray),
    );

    let depth = Span::styled(
        format!(
            " depth {:>3.0}% {} ",
            info.depth * 100.0,
            info.editor_depth.icon()
        ),
        Style::default()
            .fg(Color::Black)
            .bg(accent(info.hue, 0.55, 0.6)),
    );

    let mut tail = format!(" {}  {} notes", flags(info), info.notes);
    if info.diagnostics > 0 {
        tail.push_str(&format!("  ✗{}", info.diagnostics));
    }
    if let Some(label) = gesture_label(info) {
        tail.push_str(&format!("  {label}"));
    }
    tail.push(' ');
    let tail = Span::styled(tail, Style::default().fg(Color::Gray).bg(Color::DarkGray));

    let bar = Line::from(vec![mode_span, file, depth, tail]);
    let status = Paragraph::new(bar).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::time::Instant;

    fn info(buffer: &Buffer) -> StatusInfo<'_> {
        StatusInfo {
            mode: Mode::Normal,
            buffer,
            depth: 0.5,
            modes: LayerModes {
                lantern: true,
                ghost: false,
                xray: true,
            },
            weather: Weather {
                rain_back: false,
                rain_front: true,
                fog: true,
            },
            editor_depth: EditorDepth::Between,
            animations: true,
            sonar: SonarPhase::Idle,
            portal: PortalPhase::Idle,
            notes: 3,
            diagnostics: 0,
            hue: 215.0,
        }
    }

    #[test]
    fn test_flags() {
        let buffer = Buffer::new();
        assert_eq!(flags(&info(&buffer)), "L-X-WFA");
    }

    #[test]
    fn test_gesture_label_prefers_sonar() {
        let buffer = Buffer::new();
        let mut status = info(&buffer);
        assert_eq!(gesture_label(&status), None);
        status.portal = PortalPhase::Active;
        assert_eq!(gesture_label(&status), Some("portal"));
        status.sonar = SonarPhase::Pulsing {
            since: Instant::now(),
        };
        assert_eq!(gesture_label(&status), Some("sonar"));
    }

    #[test]
    fn test_render_status_bar() {
        let mut buffer = Buffer::from_text("hello");
        buffer.dirty = true;
        let mut status = info(&buffer);
        status.diagnostics = 2;
        let mut terminal = Terminal::new(TestBackend::new(80, 1)).unwrap();
        terminal
            .draw(|f| render(f, f.area(), &status))
            .unwrap();
        let line: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(line.contains("NORMAL"));
        assert!(line.contains("[scratch] [+]  1:1"));
        assert!(line.contains("depth  50% ◆"));
        assert!(line.contains("3 notes  ✗2"));
    }
}
