pub mod blocks;
pub mod inline;
pub mod splitter;
pub mod tags;

use slotmap::{SlotMap, new_key_type};
use std::collections::HashSet;

pub use tags::{Badge, Tag, TagKind, Tags};

new_key_type! {
    /// Stable handle for a note across re-parses.
    pub struct NoteId;
}

const TITLE_MAX_CHARS: usize = 40;

/// Place of a card in layout grid units. `z` doubles as the parallax factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Degrees.
    pub rotation: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalloutKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
    Info,
    Bug,
    Todo,
}

impl CalloutKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "note" => Some(Self::Note),
            "tip" => Some(Self::Tip),
            "important" => Some(Self::Important),
            "warning" => Some(Self::Warning),
            "caution" => Some(Self::Caution),
            "info" => Some(Self::Info),
            "bug" => Some(Self::Bug),
            "todo" => Some(Self::Todo),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Note => "NOTE",
            Self::Tip => "TIP",
            Self::Important => "IMPORTANT",
            Self::Warning => "WARNING",
            Self::Caution => "CAUTION",
            Self::Info => "INFO",
            Self::Bug => "BUG",
            Self::Todo => "TODO",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub depth: usize,
    pub ordered: bool,
    /// `None` for plain items, `Some(done)` for checkboxes.
    pub checked: Option<bool>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    List {
        items: Vec<ListItem>,
    },
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Quote {
        lines: Vec<String>,
    },
    Callout {
        kind: CalloutKind,
        title: Option<String>,
        lines: Vec<String>,
    },
    Code {
        language: Option<String>,
        code: String,
    },
}

impl Block {
    /// Searchable text of the block, markup stripped of structure but not of
    /// inline syntax.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Heading { text, .. } | Block::Paragraph { text } => text.clone(),
            Block::List { items } => items
                .iter()
                .map(|i| i.text.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Table { headers, rows } => std::iter::once(headers)
                .chain(rows)
                .map(|row| row.join(" "))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Quote { lines } => lines.join("\n"),
            Block::Callout { title, lines, .. } => title
                .iter()
                .chain(lines)
                .cloned()
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Code { code, .. } => code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub raw: String,
    pub start_line: usize,
    pub blocks: Vec<Block>,
    pub tags: Tags,
    pub position: Option<Position>,
    pub collapsed: bool,
    pub spotlighted: bool,
}

impl Note {
    /// Last document line covered by the note, inclusive.
    pub fn end_line(&self) -> usize {
        self.start_line + self.raw.lines().count().saturating_sub(1)
    }

    /// Case-insensitive containment over the note's source.
    pub fn mentions(&self, keyword_lower: &str) -> bool {
        self.raw.to_lowercase().contains(keyword_lower)
    }

    /// Tag that decides the card's colour.
    pub fn dominant_tag(&self) -> Option<&Tag> {
        self.tags.iter().max_by_key(|t| t.kind.severity())
    }

    fn heading_signature(&self) -> Option<(u8, &str)> {
        heading_signature(&self.blocks)
    }
}

/// Degradations recorded while parsing. Never fatal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub malformed_tables: usize,
    pub unterminated_fences: usize,
}

impl Diagnostics {
    pub fn total(&self) -> usize {
        self.malformed_tables + self.unterminated_fences
    }

    fn absorb(&mut self, other: Diagnostics) {
        self.malformed_tables += other.malformed_tables;
        self.unterminated_fences += other.unterminated_fences;
    }
}

/// An `@portal` directive and the note that contains it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalDirective {
    pub line: usize,
    pub note: Option<NoteId>,
}

#[derive(Debug, Clone, Default)]
pub struct NoteSet {
    notes: SlotMap<NoteId, Note>,
    order: Vec<NoteId>,
    pub portals: Vec<PortalDirective>,
    /// Keyword markers by buffer line.
    pub badges: Vec<Badge>,
    pub diagnostics: Diagnostics,
}

impl NoteSet {
    /// Notes in document order.
    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.order.iter().filter_map(|id| self.notes.get(*id))
    }

    pub fn ids(&self) -> &[NoteId] {
        &self.order
    }

    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(id)
    }

    pub fn get_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Note covering a document line.
    pub fn note_at_line(&self, line: usize) -> Option<NoteId> {
        self.iter()
            .find(|n| n.start_line <= line && line <= n.end_line())
            .map(|n| n.id)
    }
}

struct Draft {
    raw: String,
    start_line: usize,
    blocks: Vec<Block>,
}

/// Parse a document into notes, carrying identity over from `previous`.
///
/// A new note inherits a previous note's id and interaction state when its
/// source text is identical, or failing that when its first heading matches
/// (level and text). Each previous note is claimed at most once. Everything
/// else starts fresh.
pub fn parse(text: &str, previous: &NoteSet) -> NoteSet {
    let mut diagnostics = Diagnostics::default();
    let drafts: Vec<Draft> = splitter::split(text)
        .into_iter()
        .map(|segment| {
            let (blocks, found) = blocks::parse(&segment.text);
            diagnostics.absorb(found);
            Draft {
                raw: segment.text,
                start_line: segment.start_line,
                blocks,
            }
        })
        .collect();

    let mut claimed: HashSet<NoteId> = HashSet::new();
    let mut matches: Vec<Option<NoteId>> = vec![None; drafts.len()];

    for (slot, draft) in matches.iter_mut().zip(&drafts) {
        *slot = previous
            .iter()
            .find(|old| !claimed.contains(&old.id) && old.raw == draft.raw)
            .map(|old| old.id);
        if let Some(id) = slot {
            claimed.insert(*id);
        }
    }

    for (slot, draft) in matches.iter_mut().zip(&drafts) {
        if slot.is_some() {
            continue;
        }
        let Some(signature) = heading_signature(&draft.blocks) else {
            continue;
        };
        *slot = previous
            .iter()
            .find(|old| !claimed.contains(&old.id) && old.heading_signature() == Some(signature))
            .map(|old| old.id);
        if let Some(id) = slot {
            claimed.insert(*id);
        }
    }

    let mut notes = previous.notes.clone();
    notes.retain(|id, _| claimed.contains(&id));

    let mut order = Vec::with_capacity(drafts.len());
    for (draft, matched) in drafts.into_iter().zip(matches) {
        let title = title_of(&draft.blocks, &draft.raw);
        let tags = tags::extract(&draft.blocks);

        let id = match matched.filter(|id| notes.contains_key(*id)) {
            Some(id) => {
                if let Some(note) = notes.get_mut(id) {
                    note.title = title;
                    note.raw = draft.raw;
                    note.start_line = draft.start_line;
                    note.blocks = draft.blocks;
                    note.tags = tags;
                }
                id
            }
            None => notes.insert_with_key(|id| Note {
                id,
                title,
                raw: draft.raw,
                start_line: draft.start_line,
                blocks: draft.blocks,
                tags,
                position: None,
                collapsed: false,
                spotlighted: false,
            }),
        };
        order.push(id);
    }

    let mut set = NoteSet {
        notes,
        order,
        portals: Vec::new(),
        badges: tags::badges(text),
        diagnostics,
    };
    set.portals = tags::portal_lines(text)
        .into_iter()
        .map(|line| PortalDirective {
            line,
            note: set.note_at_line(line),
        })
        .collect();
    set
}

fn heading_signature(blocks: &[Block]) -> Option<(u8, &str)> {
    blocks.iter().find_map(|block| match block {
        Block::Heading { level, text } => Some((*level, text.as_str())),
        _ => None,
    })
}

fn title_of(blocks: &[Block], raw: &str) -> String {
    let title = heading_signature(blocks)
        .map(|(_, text)| text)
        .or_else(|| raw.lines().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or_default();
    let plain = inline::plain(title);
    let plain = if plain.is_empty() { title.to_string() } else { plain };

    if plain.chars().count() > TITLE_MAX_CHARS {
        let cut: String = plain.chars().take(TITLE_MAX_CHARS - 1).collect();
        format!("{cut}…")
    } else {
        plain
    }
}
