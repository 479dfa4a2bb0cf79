use regex::Regex;
use std::sync::LazyLock;

use super::splitter::Fence;
use super::{Block, CalloutKind, Diagnostics, ListItem};

static TABLE_SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\|?\s*:?-+:?\s*(\|\s*:?-+:?\s*)*\|?$").expect("valid table separator regex")
});
static CALLOUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[!([A-Za-z]+)\]\s*(.*)$").expect("valid callout regex"));
static LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([ \t]*)([-*+]|\d{1,9}[.)])[ \t]+(.*)$").expect("valid list item regex")
});
static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})[ \t]+(.*)$").expect("valid heading regex"));

/// Parse one note's text into blocks.
///
/// Never fails: malformed tables degrade to paragraphs and an unterminated
/// fence runs to the end of the note, each counted in the returned
/// diagnostics.
pub fn parse(text: &str) -> (Vec<Block>, Diagnostics) {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut diagnostics = Diagnostics::default();
    let mut i = 0;

    while i < lines.len() {
        let trimmed = lines[i].trim();
        if trimmed.is_empty() {
            i += 1;
            continue;
        }

        if let Some(fence) = Fence::open(trimmed) {
            i = parse_fence(&lines, i, fence, &mut blocks, &mut diagnostics);
        } else if starts_table(&lines, i) {
            i = parse_table(&lines, i, &mut blocks, &mut diagnostics);
        } else if trimmed.starts_with('>') {
            i = parse_quote(&lines, i, &mut blocks);
        } else if LIST_ITEM_RE.is_match(lines[i]) {
            i = parse_list(&lines, i, &mut blocks);
        } else if let Some(caps) = HEADING_RE.captures(trimmed) {
            blocks.push(Block::Heading {
                level: caps[1].len() as u8,
                text: caps[2].trim_end_matches('#').trim().to_string(),
            });
            i += 1;
        } else {
            i = parse_paragraph(&lines, i, &mut blocks);
        }
    }

    (blocks, diagnostics)
}

fn parse_fence(
    lines: &[&str],
    start: usize,
    fence: Fence,
    blocks: &mut Vec<Block>,
    diagnostics: &mut Diagnostics,
) -> usize {
    let info = fence.info(lines[start].trim());
    let language = info
        .split_whitespace()
        .next()
        .map(|lang| lang.to_string());

    let mut i = start + 1;
    let mut body = Vec::new();
    let mut closed = false;
    while i < lines.len() {
        if fence.closes(lines[i].trim()) {
            closed = true;
            i += 1;
            break;
        }
        body.push(lines[i]);
        i += 1;
    }

    if !closed {
        diagnostics.unterminated_fences += 1;
    }

    blocks.push(Block::Code {
        language,
        code: body.join("\n"),
    });
    i
}

fn starts_table(lines: &[&str], i: usize) -> bool {
    let Some(next) = lines.get(i + 1) else {
        return false;
    };
    let next = next.trim();
    lines[i].contains('|') && next.contains('|') && TABLE_SEPARATOR_RE.is_match(next)
}

fn parse_table(
    lines: &[&str],
    start: usize,
    blocks: &mut Vec<Block>,
    diagnostics: &mut Diagnostics,
) -> usize {
    let headers = split_cells(lines[start]);
    let separator = split_cells(lines[start + 1]);

    let mut i = start + 2;
    let mut rows = Vec::new();
    while i < lines.len() && !lines[i].trim().is_empty() && lines[i].contains('|') {
        rows.push(lines[i]);
        i += 1;
    }

    if separator.len() != headers.len() {
        diagnostics.malformed_tables += 1;
        let text = lines[start..i]
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join("\n");
        blocks.push(Block::Paragraph { text });
        return i;
    }

    let width = headers.len();
    let rows = rows
        .into_iter()
        .map(|row| {
            let mut cells = split_cells(row);
            cells.resize(width, String::new());
            cells
        })
        .collect();

    blocks.push(Block::Table { headers, rows });
    i
}

fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').map(|c| c.trim().to_string()).collect()
}

fn parse_quote(lines: &[&str], start: usize, blocks: &mut Vec<Block>) -> usize {
    let mut i = start;
    let mut body = Vec::new();
    while i < lines.len() {
        let Some(rest) = lines[i].trim_start().strip_prefix('>') else {
            break;
        };
        body.push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        i += 1;
    }

    let callout = body.first().and_then(|first| {
        let caps = CALLOUT_RE.captures(first.trim())?;
        let kind = CalloutKind::parse(&caps[1])?;
        Some((kind, caps[2].trim().to_string()))
    });

    match callout {
        Some((kind, title)) => blocks.push(Block::Callout {
            kind,
            title: (!title.is_empty()).then_some(title),
            lines: body.split_off(1),
        }),
        None => blocks.push(Block::Quote { lines: body }),
    }
    i
}

fn parse_list(lines: &[&str], start: usize, blocks: &mut Vec<Block>) -> usize {
    let mut i = start;
    let mut items = Vec::new();
    while i < lines.len() {
        let Some(caps) = LIST_ITEM_RE.captures(lines[i]) else {
            break;
        };
        let width: usize = caps[1].chars().map(|c| if c == '\t' { 2 } else { 1 }).sum();
        let ordered = caps[2].starts_with(|c: char| c.is_ascii_digit());
        let (checked, text) = split_checkbox(&caps[3]);
        items.push(ListItem {
            depth: width / 2,
            ordered,
            checked,
            text: text.trim().to_string(),
        });
        i += 1;
    }

    blocks.push(Block::List { items });
    i
}

fn split_checkbox(text: &str) -> (Option<bool>, &str) {
    for (prefix, state) in [("[ ]", false), ("[x]", true), ("[X]", true)] {
        if let Some(rest) = text.strip_prefix(prefix)
            && (rest.is_empty() || rest.starts_with([' ', '\t']))
        {
            return (Some(state), rest);
        }
    }
    (None, text)
}

fn parse_paragraph(lines: &[&str], start: usize, blocks: &mut Vec<Block>) -> usize {
    let mut i = start;
    let mut body = Vec::new();
    while i < lines.len() {
        let trimmed = lines[i].trim();
        if trimmed.is_empty() {
            break;
        }
        if i > start && interrupts_paragraph(lines, i) {
            break;
        }
        body.push(trimmed);
        i += 1;
    }

    blocks.push(Block::Paragraph {
        text: body.join("\n"),
    });
    i
}

fn interrupts_paragraph(lines: &[&str], i: usize) -> bool {
    let trimmed = lines[i].trim();
    Fence::open(trimmed).is_some()
        || starts_table(lines, i)
        || trimmed.starts_with('>')
        || LIST_ITEM_RE.is_match(lines[i])
        || HEADING_RE.is_match(trimmed)
}
