use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;
use std::sync::LazyLock;
use syntect::easy::HighlightLines;
use syntect::highlighting::{FontStyle, Theme as SyntectTheme, ThemeSet};
use syntect::parsing::SyntaxSet;

use super::surface::fade;
use crate::engine::gestures::PortalMarker;
use crate::engine::parser::{Badge, TagKind};
use crate::engine::parser::splitter::Fence;
use crate::model::buffer::Buffer;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]+\]\([^\)]+\)").expect("valid markdown link regex"));
static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`]+`").expect("valid inline code regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*[^*]+\*\*").expect("valid bold regex"));
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*[^*\s][^*]*\*").expect("valid italic regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#[A-Za-z][\w-]*").expect("valid tag regex"));
static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(BUG|TODO|FIXME|WARNING|WARN|INFO|NOTE|HACK|OPTIMIZE|HOLO):")
        .expect("valid marker regex")
});
static PORTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@portal\b").expect("valid portal regex"));
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static SYNTECT_THEME: LazyLock<SyntectTheme> = LazyLock::new(|| {
    let themes = ThemeSet::load_defaults();
    themes
        .themes
        .get("base16-ocean.dark")
        .cloned()
        .or_else(|| themes.themes.values().next().cloned())
        .expect("at least one syntect theme")
});

#[derive(Default)]
struct RenderCache {
    top: usize,
    bottom: usize,
    lines: Vec<Line<'static>>,
    dirty: bool,
}

/// Widest a marker badge gets, borders included.
const BADGE_MAX: usize = 34;
const BADGE_BG: Color = Color::Rgb(26, 28, 42);

/// The text layer. Draws glyphs only, so whatever is underneath shows
/// through the gaps.
pub struct EditorView {
    cache: RenderCache,
}

impl EditorView {
    pub fn new() -> Self {
        Self {
            cache: RenderCache {
                dirty: true,
                ..Default::default()
            },
        }
    }

    pub fn mark_dirty(&mut self) {
        self.cache.dirty = true;
    }

    pub fn render(&mut self, frame: &mut Frame, buffer: &Buffer, area: Rect, opacity: f32) {
        let top = buffer.viewport.top_line;
        let bottom = (top + area.height as usize).min(buffer.line_count());

        let needs_rebuild = self.cache.dirty || self.cache.top != top || self.cache.bottom != bottom;
        if needs_rebuild {
            let mut fence = fence_before_line(buffer, top);
            self.cache.lines = (top..bottom)
                .map(|i| {
                    let text = buffer.line_text(i).unwrap_or_default();
                    render_markdown_line(&text, &mut fence)
                })
                .collect();
            self.cache.top = top;
            self.cache.bottom = bottom;
            self.cache.dirty = false;
        }

        let buf = frame.buffer_mut();
        for (row, line) in self.cache.lines.iter().enumerate() {
            let y = area.y + row as u16;
            let mut x = area.x;
            for span in &line.spans {
                let style = fade(span.style, opacity);
                for ch in span.content.chars() {
                    if x >= area.right() {
                        break;
                    }
                    if ch == ' ' || ch == '\t' {
                        x += if ch == '\t' { 4 } else { 1 };
                        continue;
                    }
                    let mut tmp = [0u8; 4];
                    let (next_x, _) = buf.set_stringn(
                        x,
                        y,
                        ch.encode_utf8(&mut tmp),
                        (area.right() - x) as usize,
                        style,
                    );
                    x = next_x.max(x + 1);
                }
            }
        }
    }

    /// Marker badges floating in the right margin of their line. A badge
    /// that would cover the line's own text is left out.
    pub fn render_badges(
        &self,
        frame: &mut Frame,
        buffer: &Buffer,
        area: Rect,
        badges: &[Badge],
        opacity: f32,
    ) {
        let top = buffer.viewport.top_line;
        for badge in badges {
            let Some(row) = badge.line.checked_sub(top) else {
                continue;
            };
            if row >= area.height as usize {
                continue;
            }
            let label = badge_label(badge);
            let width = label.chars().count() as u16;
            let text_end = buffer
                .line_text(badge.line)
                .map_or(0, |line| display_width(&line)) as u16;
            if area.width < width + 1 || area.width - width - 1 <= text_end + 1 {
                continue;
            }
            let style = fade(
                Style::default()
                    .fg(tag_color(badge.tag.kind))
                    .bg(BADGE_BG),
                opacity,
            );
            let x = area.right() - width - 1;
            frame
                .buffer_mut()
                .set_string(x, area.y + row as u16, &label, style);
        }
    }

    /// Portal markers at the right edge of their line.
    pub fn render_portals(
        &self,
        frame: &mut Frame,
        buffer: &Buffer,
        area: Rect,
        markers: &[PortalMarker],
        active: bool,
    ) {
        let top = buffer.viewport.top_line;
        let (label, style) = if active {
            (
                " ◈ portal ",
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::LightMagenta)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            (" ◇ ", Style::default().fg(Color::Magenta))
        };
        let width = label.chars().count() as u16;
        if area.width < width {
            return;
        }
        for marker in markers {
            let Some(row) = marker.line.checked_sub(top) else {
                continue;
            };
            if row >= area.height as usize {
                continue;
            }
            let x = area.right() - width;
            let y = area.y + row as u16;
            frame.buffer_mut().set_string(x, y, label, style);
        }
    }
}

impl Default for EditorView {
    fn default() -> Self {
        Self::new()
    }
}

/// Fence still open at the start of `line_index`.
fn badge_icon(name: &str) -> char {
    match name {
        "todo" => '☐',
        "fixme" | "bug" => '✗',
        "note" | "info" => 'ℹ',
        "holo" => '✦',
        "warn" | "warning" | "hack" => '!',
        _ => '↯',
    }
}

fn badge_label(badge: &Badge) -> String {
    let mut label = format!(
        " {} {} {}",
        badge_icon(&badge.tag.name),
        badge.tag.name.to_uppercase(),
        badge.message
    );
    if label.chars().count() > BADGE_MAX - 1 {
        label = label.chars().take(BADGE_MAX - 2).collect();
        label.push('…');
    }
    label.truncate(label.trim_end().len());
    label.push(' ');
    label
}

/// Cells a line occupies as the editor draws it.
fn display_width(line: &str) -> usize {
    line.chars().map(|c| if c == '\t' { 4 } else { 1 }).sum()
}

fn fence_before_line(buffer: &Buffer, line_index: usize) -> Option<(Fence, String)> {
    let mut fence = None;
    for i in 0..line_index {
        let text = buffer.line_text(i).unwrap_or_default();
        step_fence(&text, &mut fence);
    }
    fence
}

/// Advance fence state past one line. Returns true when the line is a fence marker.
fn step_fence(text: &str, fence: &mut Option<(Fence, String)>) -> bool {
    let trimmed = text.trim();
    if let Some(open) = fence.as_ref().map(|(open, _)| *open) {
        if open.closes(trimmed) {
            *fence = None;
            return true;
        }
        return false;
    }

    let Some(open) = Fence::open(trimmed) else {
        return false;
    };
    let lang = open
        .info(trimmed)
        .split_whitespace()
        .next()
        .unwrap_or("text")
        .to_string();
    *fence = Some((open, lang));
    true
}

fn render_markdown_line(text: &str, fence: &mut Option<(Fence, String)>) -> Line<'static> {
    if step_fence(text, fence) {
        return Line::from(Span::styled(
            text.to_string(),
            Style::default()
                .fg(Color::Rgb(180, 180, 200))
                .add_modifier(Modifier::BOLD),
        ));
    }

    if let Some((_, lang)) = fence.as_ref() {
        return render_code_block_line(text, lang);
    }

    render_inline_markdown(text, base_markdown_style(text))
}

fn render_code_block_line(text: &str, language: &str) -> Line<'static> {
    let plain = || {
        Line::from(Span::styled(
            text.to_string(),
            Style::default().fg(Color::Rgb(200, 200, 200)),
        ))
    };

    let syntax = SYNTAX_SET
        .find_syntax_by_token(language)
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
    let mut highlighter = HighlightLines::new(syntax, &SYNTECT_THEME);
    let Ok(tokens) = highlighter.highlight_line(text, &SYNTAX_SET) else {
        return plain();
    };

    let spans: Vec<Span<'static>> = tokens
        .into_iter()
        .map(|(style, segment)| Span::styled(segment.to_string(), syntect_to_ratatui(style)))
        .collect();

    if spans.is_empty() { plain() } else { Line::from(spans) }
}

fn base_markdown_style(text: &str) -> Style {
    let trimmed = text.trim_start();

    if trimmed.starts_with("# ") {
        return Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD);
    }
    if trimmed.starts_with("## ") {
        return Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
    }
    if trimmed.starts_with("### ") {
        return Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD);
    }
    if trimmed.starts_with('>') {
        return Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC);
    }
    if trimmed.starts_with('|') {
        return Style::default().fg(Color::LightBlue);
    }
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("+ ") {
        return Style::default().fg(Color::LightCyan);
    }
    if trimmed.len() >= 3 && trimmed.chars().all(|c| c == '-') {
        return Style::default().fg(Color::DarkGray);
    }

    Style::default().fg(Color::Gray)
}

pub fn tag_color(kind: TagKind) -> Color {
    match kind {
        TagKind::Alert => Color::Rgb(255, 85, 85),
        TagKind::Pending => Color::Rgb(241, 196, 15),
        TagKind::Warning => Color::Rgb(255, 150, 50),
        TagKind::Info => Color::Rgb(90, 170, 255),
        TagKind::Custom => Color::Rgb(120, 220, 170),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Link,
    InlineCode,
    Bold,
    Italic,
    Tag,
    Marker,
    Portal,
}

fn render_inline_markdown(text: &str, base_style: Style) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut cursor = 0;

    while cursor < text.len() {
        let Some((start, end, kind)) = next_markdown_token(text, cursor) else {
            spans.push(Span::styled(text[cursor..].to_string(), base_style));
            break;
        };

        if start > cursor {
            spans.push(Span::styled(text[cursor..start].to_string(), base_style));
        }

        let token = &text[start..end];
        let token_style = match kind {
            TokenKind::Link => base_style
                .fg(Color::Rgb(255, 102, 0))
                .add_modifier(Modifier::UNDERLINED),
            TokenKind::InlineCode => base_style
                .fg(Color::Rgb(220, 220, 220))
                .bg(Color::Rgb(32, 32, 48)),
            TokenKind::Bold => base_style.add_modifier(Modifier::BOLD),
            TokenKind::Italic => base_style.add_modifier(Modifier::ITALIC),
            TokenKind::Tag => base_style
                .fg(tag_color(TagKind::classify(&token[1..].to_lowercase())))
                .add_modifier(Modifier::BOLD),
            TokenKind::Marker => base_style
                .fg(tag_color(TagKind::classify(
                    &token.trim_end_matches(':').to_lowercase(),
                )))
                .add_modifier(Modifier::BOLD),
            TokenKind::Portal => base_style
                .fg(Color::LightMagenta)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        };

        spans.push(Span::styled(token.to_string(), token_style));
        cursor = end;
    }

    if spans.is_empty() {
        Line::from(Span::styled(text.to_string(), base_style))
    } else {
        Line::from(spans)
    }
}

fn next_markdown_token(text: &str, start_at: usize) -> Option<(usize, usize, TokenKind)> {
    let candidates = [
        (&*INLINE_CODE_RE, TokenKind::InlineCode),
        (&*PORTAL_RE, TokenKind::Portal),
        (&*MARKER_RE, TokenKind::Marker),
        (&*LINK_RE, TokenKind::Link),
        (&*BOLD_RE, TokenKind::Bold),
        (&*ITALIC_RE, TokenKind::Italic),
        (&*TAG_RE, TokenKind::Tag),
    ];

    candidates
        .into_iter()
        .enumerate()
        .filter_map(|(priority, (re, kind))| {
            re.find_at(text, start_at)
                .map(|m| ((m.start(), m.end(), kind), priority))
        })
        .min_by(|((sa, _, _), pa), ((sb, _, _), pb)| sa.cmp(sb).then(pa.cmp(pb)))
        .map(|(hit, _)| hit)
}

fn syntect_to_ratatui(style: syntect::highlighting::Style) -> Style {
    let mut rat_style = Style::default().fg(Color::Rgb(
        style.foreground.r,
        style.foreground.g,
        style.foreground.b,
    ));

    if style.font_style.contains(FontStyle::BOLD) {
        rat_style = rat_style.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        rat_style = rat_style.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        rat_style = rat_style.add_modifier(Modifier::UNDERLINED);
    }

    rat_style
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &Line<'_>) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_tags_and_portal_are_tokens() {
        let mut fence = None;
        let line = render_markdown_line("fix #bug then @portal", &mut fence);
        assert_eq!(kinds(&line), vec!["fix ", "#bug", " then ", "@portal"]);
        assert_eq!(line.spans[1].style.fg, Some(tag_color(TagKind::Alert)));
    }

    #[test]
    fn test_code_fence_state_spans_lines() {
        let mut fence = None;
        render_markdown_line("```rust", &mut fence);
        assert!(fence.is_some());
        let body = render_markdown_line("# not a heading", &mut fence);
        assert_ne!(
            body.spans.first().and_then(|s| s.style.fg),
            Some(Color::Magenta)
        );
        render_markdown_line("```", &mut fence);
        assert!(fence.is_none());
    }

    #[test]
    fn test_marker_colouring() {
        let mut fence = None;
        let line = render_markdown_line("// TODO: later", &mut fence);
        let todo = line.spans.iter().find(|s| s.content == "TODO:").unwrap();
        assert_eq!(todo.style.fg, Some(tag_color(TagKind::Pending)));
    }

    fn badge(line: usize, name: &str, message: &str) -> Badge {
        Badge {
            line,
            tag: crate::engine::parser::Tag::new(name),
            message: message.to_string(),
        }
    }

    fn row_text(terminal: &ratatui::Terminal<ratatui::backend::TestBackend>, y: u16) -> String {
        let buf = terminal.backend().buffer();
        (0..buf.area.width).map(|x| buf[(x, y)].symbol().to_string()).collect()
    }

    #[test]
    fn test_badge_label() {
        assert_eq!(badge_label(&badge(0, "TODO", "wire it up")), " ☐ TODO wire it up ");
        assert_eq!(badge_label(&badge(0, "FIXME", "")), " ✗ FIXME ");
        let long = badge_label(&badge(0, "NOTE", &"x".repeat(80)));
        assert_eq!(long.chars().count(), BADGE_MAX);
        assert!(long.ends_with("… "));
    }

    #[test]
    fn test_badges_sit_in_right_margin_of_their_line() {
        let buffer = Buffer::from_text("fn main() {\n    // TODO: wire it up\n}");
        let badges = vec![badge(1, "todo", "wire it up")];
        let view = EditorView::new();
        let mut terminal =
            ratatui::Terminal::new(ratatui::backend::TestBackend::new(60, 4)).unwrap();
        terminal
            .draw(|f| view.render_badges(f, &buffer, f.area(), &badges, 1.0))
            .unwrap();

        let row = row_text(&terminal, 1);
        assert!(row.trim_end().ends_with("☐ TODO wire it up"));
        assert_eq!(row.chars().last(), Some(' '));
        let cell = &terminal.backend().buffer()[(40, 1)];
        assert_eq!(cell.fg, tag_color(TagKind::Pending));
        assert!(row_text(&terminal, 0).trim().is_empty());
    }

    #[test]
    fn test_badge_skipped_when_it_would_cover_text() {
        let buffer = Buffer::from_text(&format!("{} TODO: x", "y".repeat(40)));
        let badges = vec![badge(0, "todo", "x")];
        let view = EditorView::new();
        let mut terminal =
            ratatui::Terminal::new(ratatui::backend::TestBackend::new(50, 2)).unwrap();
        terminal
            .draw(|f| view.render_badges(f, &buffer, f.area(), &badges, 1.0))
            .unwrap();
        assert!(row_text(&terminal, 0).trim().is_empty());
    }

    #[test]
    fn test_fence_before_line() {
        let buffer = Buffer::from_text("a\n~~~py\nx = 1\n~~~\nb");
        assert!(fence_before_line(&buffer, 2).is_some());
        assert!(fence_before_line(&buffer, 4).is_none());
    }
}
