use ratatui::layout::Rect;
use std::collections::HashSet;

use super::parser::{Note, NoteId, NoteSet, Position};

/// Terminal cells per grid unit.
pub const CELL_W: u16 = 30;
pub const CELL_H: u16 = 9;
/// Card size inside its grid cell.
pub const CARD_W: u16 = 26;
pub const CARD_MAX_H: u16 = 8;

/// Jitter per axis, in grid units. Bounded by the slack between a card and
/// its cell so neighbouring cards never intersect.
const JITTER_X: f32 = (CELL_W - CARD_W) as f32 / CELL_W as f32;
const JITTER_Y: f32 = (CELL_H - CARD_MAX_H) as f32 / CELL_H as f32;
const MAX_ROTATION: f32 = 5.0;
const Z_MIN: f32 = 0.5;
const Z_MAX: f32 = 2.0;
/// Degrees.
pub const MAX_TILT: f32 = 12.0;
/// Cells of parallax travel per unit of normalised pointer offset and depth.
const PARALLAX_CELLS: f32 = 2.0;
const FLOAT_AMPLITUDE: f32 = 0.4;
/// Shortest caret word tracked for focus links.
pub const MIN_KEYWORD_LEN: usize = 3;

/// Give every unplaced note a grid slot. Placed notes keep their position.
///
/// The preferred slot comes from a hash of the title, so the same document
/// lays out the same way every time; collisions scan forward to the next
/// free slot.
pub fn place(notes: &mut NoteSet, columns: usize) {
    let columns = columns.max(1);
    let mut occupied: HashSet<usize> = notes
        .iter()
        .filter_map(|n| n.position)
        .map(|p| slot_of(&p, columns))
        .collect();

    let rows = notes.len().div_ceil(columns).max(1);
    let unplaced: Vec<NoteId> = notes
        .iter()
        .filter(|n| n.position.is_none())
        .map(|n| n.id)
        .collect();

    for id in unplaced {
        let Some(note) = notes.get_mut(id) else {
            continue;
        };
        let seed = fnv1a(&note.title);
        let mut slot = (seed % (rows * columns) as u64) as usize;
        while occupied.contains(&slot) {
            slot += 1;
        }
        occupied.insert(slot);

        let col = (slot % columns) as f32;
        let row = (slot / columns) as f32;
        note.position = Some(Position {
            x: col + jitter(seed, 1) * JITTER_X,
            y: row + jitter(seed, 2) * JITTER_Y,
            z: Z_MIN + jitter(seed, 3) * (Z_MAX - Z_MIN),
            rotation: (jitter(seed, 4) * 2.0 - 1.0) * MAX_ROTATION,
        });
    }
}

fn slot_of(position: &Position, columns: usize) -> usize {
    let col = (position.x.max(0.0) as usize).min(columns - 1);
    let row = position.y.max(0.0) as usize;
    row * columns + col
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ b as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Deterministic value in `[0, 1)` for a seed and channel.
fn jitter(seed: u64, channel: u32) -> f32 {
    let x = ((seed % 100_000) as f64 + channel as f64).sin() * 10_000.0;
    (x.rem_euclid(1.0) as f32).min(0.999_999)
}

/// Slow drift of a card around its slot, in cells.
pub fn float_offset(position: &Position, t: f32, animations: bool) -> (f32, f32) {
    if !animations {
        return (0.0, 0.0);
    }
    let phase = position.rotation + position.x * 1.7 + position.y * 2.3;
    let speed = 0.6 / position.z;
    (
        (t * speed + phase).sin() * FLOAT_AMPLITUDE * 2.0,
        (t * speed * 0.8 + phase).cos() * FLOAT_AMPLITUDE,
    )
}

/// Cards shift against the pointer; deeper cards shift further.
/// `pointer_norm` is the pointer offset from the area centre in `[-1, 1]`.
pub fn parallax_offset(position: &Position, pointer_norm: (f32, f32), animations: bool) -> (f32, f32) {
    if !animations {
        return (0.0, 0.0);
    }
    let (px, py) = pointer_norm;
    (
        -px.clamp(-1.0, 1.0) * PARALLAX_CELLS * position.z,
        -py.clamp(-1.0, 1.0) * PARALLAX_CELLS * position.z,
    )
}

/// Tilt in degrees about each axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tilt {
    pub x: f32,
    pub y: f32,
}

impl Tilt {
    pub fn magnitude(&self) -> f32 {
        self.x.hypot(self.y)
    }
}

/// Tilt of a card towards the pointer. Strongest next to the card, zero at
/// `falloff` cells away and beyond, and zero dead centre.
pub fn tilt(center: (f32, f32), pointer: (f32, f32), falloff: f32) -> Tilt {
    let dx = pointer.0 - center.0;
    let dy = pointer.1 - center.1;
    let dist = dx.hypot(dy);
    if dist == 0.0 || !dist.is_finite() {
        return Tilt::default();
    }
    let magnitude = MAX_TILT * (1.0 - dist / falloff.max(1.0)).max(0.0);
    Tilt {
        x: magnitude * dx / dist,
        y: magnitude * dy / dist,
    }
}

/// Screen rectangle of a card, or `None` when fully outside `area`.
pub fn card_rect(position: &Position, offset: (f32, f32), height: u16, area: Rect) -> Option<Rect> {
    let x = area.x as f32 + position.x * CELL_W as f32 + 1.0 + offset.0;
    let y = area.y as f32 + position.y * CELL_H as f32 + offset.1;
    let (x, y) = (x.round() as i32, y.round() as i32);

    let left = x.max(area.x as i32);
    let top = y.max(area.y as i32);
    let right = (x + CARD_W as i32).min(area.right() as i32);
    let bottom = (y + height as i32).min(area.bottom() as i32);
    if right <= left || bottom <= top {
        return None;
    }
    Some(Rect::new(
        left as u16,
        top as u16,
        (right - left) as u16,
        (bottom - top) as u16,
    ))
}

/// Where a card was drawn last frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardHit {
    pub id: NoteId,
    pub rect: Rect,
}

impl CardHit {
    pub fn on_title_row(&self, y: u16) -> bool {
        y == self.rect.y
    }
}

/// Topmost card under a cell. `hits` is in draw order.
pub fn hit_test(hits: &[CardHit], x: u16, y: u16) -> Option<CardHit> {
    hits.iter()
        .rev()
        .find(|h| {
            x >= h.rect.x && x < h.rect.right() && y >= h.rect.y && y < h.rect.bottom()
        })
        .copied()
}

/// Move a card by a drag delta given in cells.
pub fn drag_by(note: &mut Note, dx: i32, dy: i32) {
    if let Some(position) = note.position.as_mut() {
        position.x = (position.x + dx as f32 / CELL_W as f32).max(0.0);
        position.y = (position.y + dy as f32 / CELL_H as f32).max(0.0);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionReason {
    SharedTag(String),
    Keyword,
}

/// An edge between two notes; `from` precedes `to` in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub from: NoteId,
    pub to: NoteId,
    pub reason: ConnectionReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    pub connections: Vec<Connection>,
    /// Notes mentioning the tracked keyword, in document order.
    pub keyword_hits: Vec<NoteId>,
}

/// Normalise a caret word into a tracked keyword.
pub fn tracked_keyword(word: &str) -> Option<String> {
    let word = word.trim().to_lowercase();
    (word.chars().count() >= MIN_KEYWORD_LEN).then_some(word)
}

/// Recompute connections: a shared tag wins over a keyword match.
pub fn connect(notes: &NoteSet, keyword: Option<&str>) -> Links {
    let ordered: Vec<&Note> = notes.iter().collect();
    let keyword = keyword.and_then(tracked_keyword);
    let mentions: Vec<bool> = ordered
        .iter()
        .map(|n| keyword.as_deref().is_some_and(|k| n.mentions(k)))
        .collect();

    let mut connections = Vec::new();
    for (i, a) in ordered.iter().enumerate() {
        for (j, b) in ordered.iter().enumerate().skip(i + 1) {
            let shared = a
                .tags
                .iter()
                .find(|t| b.tags.iter().any(|u| u.name == t.name));
            let reason = match shared {
                Some(tag) => ConnectionReason::SharedTag(tag.name.clone()),
                None if mentions[i] && mentions[j] => ConnectionReason::Keyword,
                None => continue,
            };
            connections.push(Connection {
                from: a.id,
                to: b.id,
                reason,
            });
        }
    }

    let keyword_hits = ordered
        .iter()
        .zip(&mentions)
        .filter(|(_, hit)| **hit)
        .map(|(n, _)| n.id)
        .collect();

    Links {
        connections,
        keyword_hits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parser;

    fn notes(text: &str) -> NoteSet {
        parser::parse(text, &NoteSet::default())
    }

    #[test]
    fn test_place_assigns_distinct_slots() {
        let mut set = notes("# A\n# B\n# C\n# D\n# E\n# F");
        place(&mut set, 4);
        let slots: HashSet<usize> = set
            .iter()
            .map(|n| slot_of(&n.position.unwrap(), 4))
            .collect();
        assert_eq!(slots.len(), 6);

        for note in set.iter() {
            let p = note.position.unwrap();
            assert!(p.x.fract() < JITTER_X && p.y.fract() < JITTER_Y);
            assert!((Z_MIN..=Z_MAX).contains(&p.z));
            assert!(p.rotation.abs() <= MAX_ROTATION);
        }
    }

    #[test]
    fn test_placed_cards_never_intersect() {
        let text: String = (0..20)
            .map(|i| format!("# Note {i}\n1\n2\n3\n4\n5\n6\n7\n"))
            .collect();
        let mut set = notes(&text);
        place(&mut set, 4);
        assert_eq!(set.len(), 20);

        let area = Rect::new(0, 0, 200, 100);
        let rects: Vec<Rect> = set
            .iter()
            .filter_map(|n| card_rect(&n.position.unwrap(), (0.0, 0.0), CARD_MAX_H, area))
            .collect();
        assert_eq!(rects.len(), 20);
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.intersects(*b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_positions_stable_across_relayout_and_reparse() {
        let text = "# A\n# B\n# C";
        let mut first = notes(text);
        place(&mut first, 4);
        let before: Vec<Position> = first.iter().filter_map(|n| n.position).collect();

        let mut second = parser::parse(text, &first);
        place(&mut second, 4);
        let after: Vec<Position> = second.iter().filter_map(|n| n.position).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_same_document_lays_out_identically() {
        let mut a = notes("# One\n# Two");
        let mut b = notes("# One\n# Two");
        place(&mut a, 3);
        place(&mut b, 3);
        let pa: Vec<Position> = a.iter().filter_map(|n| n.position).collect();
        let pb: Vec<Position> = b.iter().filter_map(|n| n.position).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_animations_off_is_deterministic() {
        let p = Position {
            x: 1.0,
            y: 2.0,
            z: 1.5,
            rotation: 3.0,
        };
        assert_eq!(float_offset(&p, 12.5, false), (0.0, 0.0));
        assert_eq!(parallax_offset(&p, (0.7, -0.2), false), (0.0, 0.0));
        assert_ne!(float_offset(&p, 12.5, true), (0.0, 0.0));
    }

    #[test]
    fn test_parallax_scales_with_depth() {
        let near = Position {
            x: 0.0,
            y: 0.0,
            z: 0.5,
            rotation: 0.0,
        };
        let far = Position { z: 2.0, ..near };
        let (nx, _) = parallax_offset(&near, (1.0, 0.0), true);
        let (fx, _) = parallax_offset(&far, (1.0, 0.0), true);
        assert_eq!(nx, -1.0);
        assert_eq!(fx, -4.0);
    }

    #[test]
    fn test_tilt_grows_as_pointer_approaches() {
        let center = (50.0, 20.0);
        let near = tilt(center, (52.0, 20.0), 40.0);
        let far = tilt(center, (80.0, 20.0), 40.0);
        assert!(near.magnitude() > far.magnitude());
        assert!(near.x > 0.0);
        assert_eq!(near.y, 0.0);
        assert!(tilt(center, (40.0, 10.0), 40.0).x < 0.0);
        assert_eq!(tilt(center, (200.0, 20.0), 40.0).magnitude(), 0.0);
        assert_eq!(tilt(center, center, 40.0), Tilt::default());
    }

    #[test]
    fn test_shared_tag_connections() {
        let set = notes("# A\n#bug one\n# B\nnothing\n# C\n#bug #ui two");
        let links = connect(&set, None);
        assert_eq!(links.connections.len(), 1);
        let c = &links.connections[0];
        assert_eq!((c.from, c.to), (set.ids()[0], set.ids()[2]));
        assert_eq!(c.reason, ConnectionReason::SharedTag("bug".to_string()));
    }

    #[test]
    fn test_keyword_connections_and_hits() {
        let set = notes("# A\nthe Layer cake\n# B\nno match\n# C\nreference layer");
        let links = connect(&set, Some("layer"));
        assert_eq!(links.keyword_hits, vec![set.ids()[0], set.ids()[2]]);
        assert_eq!(links.connections.len(), 1);
        assert_eq!(links.connections[0].reason, ConnectionReason::Keyword);

        assert!(connect(&set, Some("la")).connections.is_empty());
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let set = notes("# A\n# B");
        let hits = [
            CardHit {
                id: set.ids()[0],
                rect: Rect::new(0, 0, 10, 5),
            },
            CardHit {
                id: set.ids()[1],
                rect: Rect::new(5, 2, 10, 5),
            },
        ];
        assert_eq!(hit_test(&hits, 6, 3).map(|h| h.id), Some(set.ids()[1]));
        assert_eq!(hit_test(&hits, 1, 1).map(|h| h.id), Some(set.ids()[0]));
        assert!(hit_test(&hits, 30, 30).is_none());
        assert!(hits[0].on_title_row(0));
    }

    #[test]
    fn test_card_rect_clips_to_area() {
        let area = Rect::new(0, 0, 40, 10);
        let p = Position {
            x: 1.0,
            y: 0.0,
            z: 1.0,
            rotation: 0.0,
        };
        let rect = card_rect(&p, (0.0, 0.0), 5, area).unwrap();
        assert_eq!(rect.x, 31);
        assert_eq!(rect.width, 9);

        let off = Position { x: 3.0, ..p };
        assert!(card_rect(&off, (0.0, 0.0), 5, area).is_none());
    }

    #[test]
    fn test_drag_moves_position() {
        let mut set = notes("# A");
        place(&mut set, 4);
        let id = set.ids()[0];
        let before = set.get(id).unwrap().position.unwrap();
        drag_by(set.get_mut(id).unwrap(), CELL_W as i32, -1000);
        let after = set.get(id).unwrap().position.unwrap();
        assert!((after.x - before.x - 1.0).abs() < 1e-5);
        assert_eq!(after.y, 0.0);
    }
}
