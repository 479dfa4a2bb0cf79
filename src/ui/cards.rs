use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block as Border, BorderType, Clear, Paragraph, Wrap};

use super::atmosphere::accent;
use super::editor::tag_color;
use super::surface::{BACKGROUND, blend, fade};
use crate::engine::layout::{
    self, CARD_MAX_H, CardHit, ConnectionReason, Links, MAX_TILT, Tilt,
};
use crate::engine::parser::inline::{self, RunStyle};
use crate::engine::parser::{Block, CalloutKind, Note, NoteSet, TagKind};

const CARD_MIN_H: u16 = 3;
/// Cards fainter than this are not drawn.
const INVISIBLE: f32 = 0.03;

/// Everything the reference layer needs for one frame.
pub struct ReferenceView<'a> {
    pub notes: &'a NoteSet,
    pub links: &'a Links,
    pub opacity: f32,
    pub hue: f32,
    pub pointer: Option<(u16, u16)>,
    /// Screen cell of the editor caret, origin of focus links.
    pub caret: Option<(u16, u16)>,
    /// Seconds since start, drives the float animation.
    pub t: f32,
    pub animations: bool,
    pub tilt_falloff: f32,
}

struct Placed<'a> {
    note: &'a Note,
    rect: Rect,
    tilt: Tilt,
    opacity: f32,
    z: f32,
}

impl Placed<'_> {
    fn center(&self) -> (u16, u16) {
        (
            self.rect.x + self.rect.width / 2,
            self.rect.y + self.rect.height / 2,
        )
    }
}

/// Draw connections and cards. Returns card hit boxes in draw order.
pub fn render(frame: &mut Frame, area: Rect, view: &ReferenceView<'_>) -> Vec<CardHit> {
    let pointer_norm = view.pointer.map_or((0.0, 0.0), |(px, py)| {
        let half_w = (area.width as f32 / 2.0).max(1.0);
        let half_h = (area.height as f32 / 2.0).max(1.0);
        (
            (px as f32 - area.x as f32 - half_w) / half_w,
            (py as f32 - area.y as f32 - half_h) / half_h,
        )
    });

    let mut placed: Vec<Placed<'_>> = view
        .notes
        .iter()
        .filter_map(|note| {
            let position = note.position?;
            let opacity = if note.spotlighted { 1.0 } else { view.opacity };
            if opacity < INVISIBLE {
                return None;
            }
            let float = layout::float_offset(&position, view.t, view.animations);
            let parallax = layout::parallax_offset(&position, pointer_norm, view.animations);
            let offset = (float.0 + parallax.0, float.1 + parallax.1);
            let height = card_height(note);
            let rect = layout::card_rect(&position, offset, height, area)?;
            let center = (
                rect.x as f32 + rect.width as f32 / 2.0,
                rect.y as f32 + rect.height as f32 / 2.0,
            );
            let tilt = view.pointer.map_or(Tilt::default(), |(px, py)| {
                // Terminal cells are twice as tall as wide.
                layout::tilt(
                    (center.0, center.1 * 2.0),
                    (px as f32, py as f32 * 2.0),
                    view.tilt_falloff,
                )
            });
            Some(Placed {
                note,
                rect,
                tilt,
                opacity,
                z: position.z,
            })
        })
        .collect();

    let buf = frame.buffer_mut();
    for connection in &view.links.connections {
        let ends = (
            placed.iter().find(|p| p.note.id == connection.from),
            placed.iter().find(|p| p.note.id == connection.to),
        );
        let (Some(a), Some(b)) = ends else {
            continue;
        };
        let color = match &connection.reason {
            ConnectionReason::SharedTag(name) => tag_color(TagKind::classify(name)),
            ConnectionReason::Keyword => Color::Rgb(230, 210, 90),
        };
        let opacity = a.opacity.min(b.opacity) * 0.8;
        draw_line(buf, area, a.center(), b.center(), "·", blend(color, BACKGROUND, opacity));
    }

    if let Some(caret) = view.caret {
        let color = accent(view.hue, 0.8, 0.65);
        for id in &view.links.keyword_hits {
            if let Some(target) = placed.iter().find(|p| p.note.id == *id) {
                let opacity = target.opacity.max(0.35);
                draw_line(buf, area, caret, target.center(), "∙", blend(color, BACKGROUND, opacity));
            }
        }
    }

    placed.sort_by(|a, b| a.z.total_cmp(&b.z));

    let mut hits = Vec::with_capacity(placed.len());
    for card in &placed {
        draw_card(frame, card, view.hue);
        hits.push(CardHit {
            id: card.note.id,
            rect: card.rect,
        });
    }
    hits
}

fn card_height(note: &Note) -> u16 {
    if note.collapsed {
        return CARD_MIN_H;
    }
    let lines = card_lines(note).len() as u16;
    (lines + 2).clamp(CARD_MIN_H, CARD_MAX_H)
}

fn draw_card(frame: &mut Frame, card: &Placed<'_>, hue: f32) {
    let note = card.note;
    let border_color = note
        .dominant_tag()
        .map(|t| tag_color(t.kind))
        .unwrap_or_else(|| accent(hue, 0.45, 0.6));

    let (border_type, border_style) = if note.spotlighted {
        (
            BorderType::Double,
            Style::default()
                .fg(Color::Rgb(255, 236, 140))
                .add_modifier(Modifier::BOLD),
        )
    } else if card.tilt.magnitude() > MAX_TILT / 2.0 {
        (BorderType::Thick, Style::default().fg(border_color))
    } else {
        (BorderType::Rounded, Style::default().fg(border_color))
    };

    let lean = if card.tilt.magnitude() > 1.0 {
        card.tilt.x
    } else {
        note.position.map_or(0.0, |p| p.rotation)
    };
    let alignment = if lean > 2.0 {
        Alignment::Right
    } else if lean < -2.0 {
        Alignment::Left
    } else {
        Alignment::Center
    };

    let arrow = if note.collapsed { "▸" } else { "▾" };
    let title = Span::styled(
        format!(" {arrow} {} ", note.title),
        fade(
            Style::default()
                .fg(Color::Rgb(235, 235, 245))
                .add_modifier(Modifier::BOLD),
            card.opacity,
        ),
    );

    let block = Border::bordered()
        .border_type(border_type)
        .border_style(fade(border_style, card.opacity))
        .title(title)
        .title_alignment(alignment)
        .style(Style::default().bg(blend(Color::Rgb(24, 26, 38), BACKGROUND, card.opacity)));

    let body: Vec<Line<'static>> = if note.collapsed {
        vec![Line::from(Span::styled(
            format!("{} blocks", note.blocks.len()),
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        card_lines(note)
    };
    let body: Vec<Line<'static>> = body
        .into_iter()
        .map(|line| fade_line(line, card.opacity))
        .collect();

    frame.render_widget(Clear, card.rect);
    frame.render_widget(
        Paragraph::new(body).block(block).wrap(Wrap { trim: false }),
        card.rect,
    );
}

fn fade_line(line: Line<'static>, opacity: f32) -> Line<'static> {
    let spans: Vec<Span<'static>> = line
        .spans
        .into_iter()
        .map(|span| {
            let style = fade(span.style, opacity);
            span.style(style)
        })
        .collect();
    Line::from(spans)
}

/// Card body, one entry per display line before wrapping.
pub fn card_lines(note: &Note) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, block) in note.blocks.iter().enumerate() {
        match block {
            // The leading heading is already the card title.
            Block::Heading { .. } if i == 0 => {}
            Block::Heading { text, .. } => lines.push(Line::from(Span::styled(
                inline::plain(text),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ))),
            Block::Paragraph { text } => lines.push(styled_runs(text, Style::default().fg(Color::Gray))),
            Block::List { items } => {
                let mut ordinals: Vec<usize> = Vec::new();
                for item in items {
                    ordinals.truncate(item.depth + 1);
                    ordinals.resize(item.depth + 1, 0);
                    ordinals[item.depth] += 1;
                    let marker = match (item.checked, item.ordered) {
                        (Some(true), _) => "☑ ".to_string(),
                        (Some(false), _) => "☐ ".to_string(),
                        (None, true) => format!("{}. ", ordinals[item.depth]),
                        (None, false) => "• ".to_string(),
                    };
                    let mut line = styled_runs(
                        &item.text,
                        if item.checked == Some(true) {
                            Style::default()
                                .fg(Color::DarkGray)
                                .add_modifier(Modifier::CROSSED_OUT)
                        } else {
                            Style::default().fg(Color::Gray)
                        },
                    );
                    line.spans.insert(
                        0,
                        Span::styled(
                            format!("{}{marker}", "  ".repeat(item.depth)),
                            Style::default().fg(Color::LightCyan),
                        ),
                    );
                    lines.push(line);
                }
            }
            Block::Table { headers, rows } => {
                lines.push(Line::from(Span::styled(
                    headers.join(" │ "),
                    Style::default()
                        .fg(Color::LightBlue)
                        .add_modifier(Modifier::BOLD),
                )));
                for row in rows {
                    lines.push(Line::from(Span::styled(
                        row.join(" │ "),
                        Style::default().fg(Color::Gray),
                    )));
                }
            }
            Block::Quote { lines: quoted } => {
                for text in quoted {
                    lines.push(Line::from(Span::styled(
                        format!("▎ {text}"),
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::ITALIC),
                    )));
                }
            }
            Block::Callout {
                kind,
                title,
                lines: body,
            } => {
                let color = callout_color(*kind);
                let head = match title {
                    Some(title) => format!("▌{} {title}", kind.label()),
                    None => format!("▌{}", kind.label()),
                };
                lines.push(Line::from(Span::styled(
                    head,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )));
                for text in body {
                    let mut line = styled_runs(text, Style::default().fg(Color::Gray));
                    line.spans
                        .insert(0, Span::styled("▌ ", Style::default().fg(color)));
                    lines.push(line);
                }
            }
            Block::Code { language, code } => {
                if let Some(language) = language {
                    lines.push(Line::from(Span::styled(
                        format!("‹{language}›"),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
                for text in code.lines() {
                    lines.push(Line::from(Span::styled(
                        text.to_string(),
                        Style::default()
                            .fg(Color::Rgb(200, 200, 210))
                            .bg(Color::Rgb(25, 25, 42)),
                    )));
                }
            }
        }
    }
    lines
}

fn callout_color(kind: CalloutKind) -> Color {
    match kind {
        CalloutKind::Note | CalloutKind::Info => tag_color(TagKind::Info),
        CalloutKind::Tip => Color::Rgb(80, 200, 120),
        CalloutKind::Important => Color::Rgb(180, 120, 255),
        CalloutKind::Warning | CalloutKind::Caution => tag_color(TagKind::Warning),
        CalloutKind::Bug => tag_color(TagKind::Alert),
        CalloutKind::Todo => tag_color(TagKind::Pending),
    }
}

fn styled_runs(text: &str, base: Style) -> Line<'static> {
    let spans: Vec<Span<'static>> = inline::runs(text)
        .into_iter()
        .map(|run| {
            let style = match run.style {
                RunStyle::Plain => base,
                RunStyle::Strong => base.add_modifier(Modifier::BOLD),
                RunStyle::Emphasis => base.add_modifier(Modifier::ITALIC),
                RunStyle::Code => base
                    .fg(Color::Rgb(220, 220, 220))
                    .bg(Color::Rgb(32, 32, 48)),
                RunStyle::Strike => base.add_modifier(Modifier::CROSSED_OUT),
            };
            Span::styled(run.text, style)
        })
        .collect();
    Line::from(spans)
}

/// Bresenham line over empty cells inside `area`.
fn draw_line(buf: &mut Buffer, area: Rect, from: (u16, u16), to: (u16, u16), symbol: &str, color: Color) {
    let (mut x, mut y) = (from.0 as i32, from.1 as i32);
    let (x1, y1) = (to.0 as i32, to.1 as i32);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if x >= 0 && y >= 0 {
            let pos = Position::new(x as u16, y as u16);
            if area.contains(pos)
                && let Some(cell) = buf.cell_mut(pos)
                && cell.symbol() == " "
            {
                cell.set_symbol(symbol);
                cell.set_fg(color);
            }
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Expanding sonar ring from the area centre.
pub fn render_sonar(buf: &mut Buffer, area: Rect, progress: f32, hue: f32) {
    let cx = area.x as f32 + area.width as f32 / 2.0;
    let cy = area.y as f32 + area.height as f32 / 2.0;
    let max_radius = (area.width as f32 / 2.0).hypot(area.height as f32);
    let radius = progress.clamp(0.0, 1.0) * max_radius;
    let color = blend(accent(hue, 0.9, 0.7), BACKGROUND, 1.0 - progress * 0.7);

    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            let dx = (x as f32 - cx) / 2.0;
            let dy = y as f32 - cy;
            if ((dx * dx + dy * dy).sqrt() - radius).abs() < 0.6
                && let Some(cell) = buf.cell_mut(Position::new(x, y))
            {
                cell.set_symbol("○");
                cell.set_fg(color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parser;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn placed_notes(text: &str) -> NoteSet {
        let mut notes = parser::parse(text, &NoteSet::default());
        layout::place(&mut notes, 2);
        notes
    }

    fn view<'a>(notes: &'a NoteSet, links: &'a Links, opacity: f32) -> ReferenceView<'a> {
        ReferenceView {
            notes,
            links,
            opacity,
            hue: 215.0,
            pointer: None,
            caret: None,
            t: 0.0,
            animations: false,
            tilt_falloff: 40.0,
        }
    }

    #[test]
    fn test_card_lines_for_blocks() {
        let notes = placed_notes("# Title\n- [ ] a\n- [x] b\n\n| A | B |\n|---|---|\n| 1 | 2 |");
        let note = notes.iter().next().unwrap();
        let text: Vec<String> = card_lines(note)
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert_eq!(text, vec!["☐ a", "☑ b", "A │ B", "1 │ 2"]);
    }

    #[test]
    fn test_render_returns_hits_for_visible_cards() {
        let notes = placed_notes("# A\none\n# B\ntwo");
        let links = layout::connect(&notes, None);
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        let mut hits = Vec::new();
        terminal
            .draw(|f| hits = render(f, f.area(), &view(&notes, &links, 1.0)))
            .unwrap();
        assert_eq!(hits.len(), 2);

        terminal
            .draw(|f| hits = render(f, f.area(), &view(&notes, &links, 0.0)))
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_spotlighted_card_stays_visible_at_rest() {
        let mut notes = placed_notes("# A\n# B");
        let id = notes.ids()[1];
        crate::engine::gestures::spotlight(&mut notes, id);
        let links = Links::default();
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        let mut hits = Vec::new();
        terminal
            .draw(|f| hits = render(f, f.area(), &view(&notes, &links, 0.0)))
            .unwrap();
        assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![id]);
    }

    #[test]
    fn test_collapsed_card_is_short() {
        let mut notes = placed_notes("# A\n- 1\n- 2\n- 3\n- 4");
        let id = notes.ids()[0];
        assert_eq!(card_height(notes.get(id).unwrap()), 6);
        crate::engine::gestures::toggle_collapsed(&mut notes, id);
        assert_eq!(card_height(notes.get(id).unwrap()), CARD_MIN_H);
    }

    #[test]
    fn test_draw_line_skips_occupied_cells() {
        let area = Rect::new(0, 0, 10, 3);
        let mut buf = Buffer::empty(area);
        buf[(4, 0)].set_symbol("x");
        draw_line(&mut buf, area, (0, 0), (9, 0), "·", Color::White);
        assert_eq!(buf[(0, 0)].symbol(), "·");
        assert_eq!(buf[(4, 0)].symbol(), "x");
        assert_eq!(buf[(9, 0)].symbol(), "·");
    }
}
