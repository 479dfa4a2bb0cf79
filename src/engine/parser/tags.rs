use regex::Regex;
use smallvec::SmallVec;
use std::sync::LazyLock;

use super::Block;

static HASHTAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s(\[{,;])#([A-Za-z][\w-]*)").expect("valid hashtag regex")
});
static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(BUG|TODO|FIXME|WARNING|WARN|INFO|NOTE|HACK|OPTIMIZE|HOLO):")
        .expect("valid keyword marker regex")
});
static BADGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(BUG|TODO|FIXME|WARNING|WARN|INFO|NOTE|HACK|OPTIMIZE|HOLO):\s*(.*)")
        .expect("valid badge regex")
});
static PORTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s/*#])@portal\b").expect("valid portal regex"));

/// Visual treatment a tag asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Alert,
    Pending,
    Warning,
    Info,
    Custom,
}

impl TagKind {
    pub fn classify(name: &str) -> Self {
        match name {
            "bug" | "fixme" => TagKind::Alert,
            "todo" => TagKind::Pending,
            "warn" | "warning" | "hack" => TagKind::Warning,
            "note" | "info" | "optimize" | "holo" => TagKind::Info,
            _ => TagKind::Custom,
        }
    }

    /// Higher wins when a note carries several tags.
    pub fn severity(&self) -> u8 {
        match self {
            TagKind::Alert => 4,
            TagKind::Warning => 3,
            TagKind::Pending => 2,
            TagKind::Info => 1,
            TagKind::Custom => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    pub name: String,
    pub kind: TagKind,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        let name = name.to_lowercase();
        let kind = TagKind::classify(&name);
        Self { name, kind }
    }
}

pub type Tags = SmallVec<[Tag; 4]>;

/// Collect tags from every block, deduplicated in first-seen order.
///
/// `#word` markers are skipped inside code blocks, where `#` is usually
/// syntax; uppercase `KEYWORD:` markers are honoured everywhere.
pub fn extract(blocks: &[Block]) -> Tags {
    let mut tags = Tags::new();
    for block in blocks {
        let text = block.plain_text();
        if !matches!(block, Block::Code { .. }) {
            for caps in HASHTAG_RE.captures_iter(&text) {
                push_unique(&mut tags, &caps[1]);
            }
        }
        for caps in KEYWORD_RE.captures_iter(&text) {
            push_unique(&mut tags, &caps[1]);
        }
    }
    tags
}

/// A keyword marker pinned to the line it was written on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    /// 0-based buffer line.
    pub line: usize,
    pub tag: Tag,
    /// Text after the marker, trimmed.
    pub message: String,
}

/// First keyword marker of every line, in line order.
pub fn badges(text: &str) -> Vec<Badge> {
    text.lines()
        .enumerate()
        .filter_map(|(line, content)| {
            let caps = BADGE_RE.captures(content)?;
            Some(Badge {
                line,
                tag: Tag::new(&caps[1]),
                message: caps[2].trim().to_string(),
            })
        })
        .collect()
}

/// 0-based line numbers carrying an `@portal` directive.
pub fn portal_lines(text: &str) -> Vec<usize> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| PORTAL_RE.is_match(line))
        .map(|(idx, _)| idx)
        .collect()
}

fn push_unique(tags: &mut Tags, raw: &str) {
    let tag = Tag::new(raw);
    if tag.name == "portal" {
        return;
    }
    if !tags.iter().any(|t| t.name == tag.name) {
        tags.push(tag);
    }
}
