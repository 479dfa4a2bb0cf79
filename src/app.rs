use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::Block;

use crate::engine::debounce::Debouncer;
use crate::engine::focus::{FocusEvent, FocusState};
use crate::engine::gestures::{self, GestureState};
use crate::engine::input::{InputSampler, Modifier, Signal};
use crate::engine::layout::{self, CardHit, Links};
use crate::engine::parser::{self, NoteId, NoteSet};
use crate::engine::visibility::{
    self, EditorDepth, LayerModes, LayerSet, LayerVisibility, Stage, Surface, Weather,
};
use crate::model::buffer::Buffer;
use crate::model::config::AppConfig;
use crate::model::mode::Mode;
use crate::msg::Msg;
use crate::ui::atmosphere::{self, TypingCadence};
use crate::ui::cards::{self, ReferenceView};
use crate::ui::editor::EditorView;
use crate::ui::status::{self, StatusInfo};
use crate::ui::surface::{self, BACKGROUND, FogPane, Pane};
use crate::ui::weather::{self, Lightning, Rain, RainKind};

/// Lines scrolled per wheel notch when the wheel is not driving depth.
const SCROLL_LINES: isize = 3;
/// Below this the editor is not drawn at all.
const EDITOR_HIDDEN: f32 = 0.08;

#[derive(Debug, Clone, Copy)]
enum MoveDir {
    Up,
    Down,
    Left,
    Right,
    LineStart,
    LineEnd,
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    id: NoteId,
    last: (u16, u16),
}

pub struct App {
    pub mode: Mode,
    pub buffer: Buffer,
    pub config: AppConfig,
    pub should_quit: bool,
    sampler: InputSampler,
    focus: FocusState,
    gestures: GestureState,
    notes: NoteSet,
    links: Links,
    keyword: Option<String>,
    modes: LayerModes,
    weather: Weather,
    editor_depth: EditorDepth,
    animations: bool,
    layers: LayerSet,
    visibility: LayerVisibility,
    reparse: Debouncer,
    cadence: TypingCadence,
    /// Set by a text edit, consumed by the matching typing signal.
    edited: bool,
    pointer: Option<(u16, u16)>,
    body_area: Rect,
    card_hits: Vec<CardHit>,
    drag: Option<Drag>,
    rain_back: Rain,
    rain_front: Rain,
    lightning: Lightning,
    last_diagnostics: usize,
    editor: EditorView,
    started: Instant,
    last_tick: Instant,
    last_saved_file: Option<(PathBuf, Instant)>,
}

impl App {
    pub fn new(config: AppConfig, file: Option<PathBuf>) -> Result<Self> {
        let path = file.unwrap_or_else(|| config.scratch_path());

        let buffer = if path.exists() {
            Buffer::from_file(path)?
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            let mut buf = Buffer::new();
            buf.path = Some(path);
            buf
        };

        let layers = LayerSet {
            editor: Some(Box::new(Pane::new(1.0, true))),
            reference: Some(Box::new(Pane::new(0.0, false))),
            overlay: Some(Box::new(Pane::new(0.0, false))),
            rain_back: Some(Box::new(Pane::new(1.0, false))),
            rain_front: Some(Box::new(Pane::new(1.0, false))),
            lightning: Some(Box::new(Pane::new(0.0, false))),
            fog: Some(Box::new(FogPane::new(0, 0))),
        };

        let modes = LayerModes {
            lantern: config.ambient.lantern,
            ghost: config.ambient.ghost,
            xray: false,
        };
        let weather = Weather {
            rain_back: config.ambient.rain_back,
            rain_front: config.ambient.rain_front,
            fog: config.ambient.fog,
        };
        let now = Instant::now();

        let mut app = Self {
            mode: Mode::Normal,
            buffer,
            sampler: InputSampler::new(&config.general),
            focus: FocusState::default(),
            gestures: GestureState::new(&config.gestures),
            notes: NoteSet::default(),
            links: Links::default(),
            keyword: None,
            modes,
            weather,
            editor_depth: EditorDepth::from_level(config.ambient.editor_depth),
            animations: config.layout.animations,
            layers,
            visibility: visibility::resolve(0.0, modes, &config.visibility),
            reparse: Debouncer::new(Duration::from_millis(config.general.reparse_debounce_ms)),
            cadence: TypingCadence::default(),
            edited: false,
            pointer: None,
            body_area: Rect::default(),
            card_hits: Vec::new(),
            drag: None,
            rain_back: Rain::new(RainKind::Back),
            rain_front: Rain::new(RainKind::Front),
            lightning: Lightning::default(),
            last_diagnostics: 0,
            editor: EditorView::new(),
            started: now,
            last_tick: now,
            last_saved_file: None,
            config,
            should_quit: false,
        };
        app.reparse_notes(now);
        app.refresh_visibility(now);
        Ok(app)
    }

    // ── MVU: Update ──────────────────────────────────────────────

    pub fn update(&mut self, msg: Msg) -> Result<()> {
        match msg {
            Msg::Input(event) => {
                let now = Instant::now();
                for signal in self.sampler.sample(&event, now) {
                    self.handle_signal(signal, now)?;
                }
            }
            Msg::Resize(_w, h) => {
                self.buffer.viewport.height = h.saturating_sub(1); // status bar
                self.editor.mark_dirty();
            }
            Msg::FileChanged(path) => self.handle_file_changed(path)?,
            Msg::Tick => self.handle_tick()?,
        }
        Ok(())
    }

    fn handle_signal(&mut self, signal: Signal, now: Instant) -> Result<()> {
        match signal {
            Signal::ModifierDown(Modifier::Depth) => self.apply_focus(FocusEvent::ModifierDown, now),
            Signal::ModifierUp(Modifier::Depth) => self.apply_focus(FocusEvent::ModifierUp, now),
            Signal::ModifierDown(Modifier::XRay) => self.set_xray(true, now),
            Signal::ModifierUp(Modifier::XRay) => self.set_xray(false, now),
            Signal::ModifierDown(Modifier::Sonar) | Signal::ModifierUp(Modifier::Sonar) => {}
            Signal::Tap(_) => {
                if self.gestures.sonar.tap(now) {
                    tracing::debug!(notes = self.notes.len(), "sonar");
                }
            }
            Signal::Wheel(delta) => {
                if self.sampler.is_held(Modifier::Depth) {
                    self.apply_focus(FocusEvent::Wheel(delta), now);
                } else {
                    self.buffer.scroll_by(delta.signum() as isize * SCROLL_LINES);
                    self.editor.mark_dirty();
                }
            }
            Signal::Click { x, y } => self.handle_click(x, y),
            Signal::DoubleClick { x, y } => self.handle_double_click(x, y),
            Signal::Drag { x, y } => self.handle_drag(x, y),
            Signal::Release { .. } => self.drag = None,
            Signal::PointerMove { x, y } => self.handle_pointer(x, y),
            Signal::Key(key) => self.handle_key(key)?,
            Signal::Typed(at) => {
                if std::mem::take(&mut self.edited) {
                    self.cadence.record(at);
                    self.gestures.portals.typed(at);
                }
            }
        }
        Ok(())
    }

    fn apply_focus(&mut self, event: FocusEvent, now: Instant) {
        self.focus = self.focus.apply(event, &self.config.focus);
        if matches!(event, FocusEvent::ModifierDown) {
            tracing::debug!(depth = self.focus.depth, "focus engaged");
        }
        self.refresh_visibility(now);
    }

    fn set_xray(&mut self, held: bool, now: Instant) {
        if self.gestures.xray.set(held) {
            self.modes.xray = self.gestures.xray.active;
            self.refresh_visibility(now);
        }
    }

    fn handle_click(&mut self, x: u16, y: u16) {
        self.drag = None;
        if self.visibility.reference_interactive() {
            if let Some(hit) = layout::hit_test(&self.card_hits, x, y) {
                if hit.on_title_row(y) {
                    gestures::toggle_collapsed(&mut self.notes, hit.id);
                }
                self.drag = Some(Drag {
                    id: hit.id,
                    last: (x, y),
                });
            }
            return;
        }

        let body = self.body_area;
        if x < body.x || y < body.y || x >= body.right() || y >= body.bottom() {
            return;
        }
        let row = self.buffer.viewport.top_line + (y - body.y) as usize;
        let col = self
            .buffer
            .line_text(row)
            .map(|line| display_to_byte(&line, (x - body.x) as usize))
            .unwrap_or(0);
        self.buffer.click_to(row, col);
        self.refresh_keyword();
    }

    fn handle_double_click(&mut self, x: u16, y: u16) {
        if !self.visibility.reference_interactive() {
            return;
        }
        if let Some(hit) = layout::hit_test(&self.card_hits, x, y)
            && gestures::spotlight(&mut self.notes, hit.id)
        {
            tracing::debug!("spotlight");
        }
    }

    fn handle_drag(&mut self, x: u16, y: u16) {
        self.pointer = Some((x, y));
        let Some(drag) = self.drag.as_mut() else {
            return;
        };
        let dx = x as i32 - drag.last.0 as i32;
        let dy = y as i32 - drag.last.1 as i32;
        drag.last = (x, y);
        if let Some(note) = self.notes.get_mut(drag.id) {
            layout::drag_by(note, dx, dy);
        }
    }

    fn handle_pointer(&mut self, x: u16, y: u16) {
        self.pointer = Some((x, y));
        if !self.weather.fog {
            return;
        }
        let body = self.body_area;
        if x < body.x || y < body.y {
            return;
        }
        let radius = self.config.ambient.fog_clear_radius;
        if let Some(fog) = self.layers.fog.as_deref_mut() {
            fog.clear_at((x - body.x) as f32, (y - body.y) as f32, radius);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.mode {
            Mode::Normal => self.handle_key_normal(key),
            Mode::Insert => self.handle_key_insert(key),
        }
    }

    fn handle_key_normal(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') => {
                if self.buffer.dirty {
                    self.save_now()?;
                }
                self.should_quit = true;
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.save_buffer();
            }
            KeyCode::Char('i') => self.mode = Mode::Insert,
            KeyCode::Char('L') => {
                self.modes.lantern = !self.modes.lantern;
                self.refresh_visibility(Instant::now());
            }
            KeyCode::Char('G') => {
                self.modes.ghost = !self.modes.ghost;
                self.refresh_visibility(Instant::now());
            }
            KeyCode::Char('R') => {
                self.weather.rain_back = !self.weather.rain_back;
                self.refresh_visibility(Instant::now());
            }
            KeyCode::Char('W') => {
                self.weather.rain_front = !self.weather.rain_front;
                self.refresh_visibility(Instant::now());
            }
            KeyCode::Char(']') => self.shift_editor_depth(1),
            KeyCode::Char('[') => self.shift_editor_depth(-1),
            KeyCode::Char('F') => {
                self.weather.fog = !self.weather.fog;
                self.refresh_visibility(Instant::now());
            }
            KeyCode::Char('A') => self.animations = !self.animations,
            KeyCode::Char('h') | KeyCode::Left => self.move_cursor(MoveDir::Left),
            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(MoveDir::Down),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(MoveDir::Up),
            KeyCode::Char('l') | KeyCode::Right => self.move_cursor(MoveDir::Right),
            KeyCode::Char('0') | KeyCode::Home => self.move_cursor(MoveDir::LineStart),
            KeyCode::Char('$') | KeyCode::End => self.move_cursor(MoveDir::LineEnd),
            _ => {}
        }
        Ok(())
    }

    fn handle_key_insert(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Normal,
            KeyCode::Enter => {
                self.buffer.insert_newline();
                self.after_edit();
            }
            KeyCode::Backspace => {
                self.buffer.delete_char_before();
                self.after_edit();
            }
            KeyCode::Tab => {
                for _ in 0..4 {
                    self.buffer.insert_char(' ');
                }
                self.after_edit();
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.buffer.insert_char(ch);
                self.after_edit();
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.save_buffer();
            }
            KeyCode::Left => self.move_cursor(MoveDir::Left),
            KeyCode::Right => self.move_cursor(MoveDir::Right),
            KeyCode::Up => self.move_cursor(MoveDir::Up),
            KeyCode::Down => self.move_cursor(MoveDir::Down),
            KeyCode::Home => self.move_cursor(MoveDir::LineStart),
            KeyCode::End => self.move_cursor(MoveDir::LineEnd),
            _ => {}
        }
        Ok(())
    }

    fn shift_editor_depth(&mut self, delta: i8) {
        let depth = self.editor_depth.adjust(delta);
        if depth != self.editor_depth {
            self.editor_depth = depth;
            tracing::debug!(level = depth.level(), "editor depth");
        }
    }

    fn after_edit(&mut self) {
        self.edited = true;
        self.buffer.scroll_to_cursor();
        self.editor.mark_dirty();
        self.reparse.schedule(Instant::now());
        self.refresh_keyword();
    }

    fn move_cursor(&mut self, dir: MoveDir) {
        let prev_top = self.buffer.viewport.top_line;
        match dir {
            MoveDir::Up => {
                if self.buffer.cursor.row > 0 {
                    self.buffer.cursor.row -= 1;
                    self.buffer.cursor.col = self.buffer.cursor.desired_col;
                }
            }
            MoveDir::Down => {
                if self.buffer.cursor.row < self.buffer.line_count().saturating_sub(1) {
                    self.buffer.cursor.row += 1;
                    self.buffer.cursor.col = self.buffer.cursor.desired_col;
                }
            }
            MoveDir::Left => {
                let line = self.buffer.line_text(self.buffer.cursor.row).unwrap_or_default();
                let col = self.buffer.cursor.col.min(line.len());
                if let Some((idx, _)) = line[..col].char_indices().next_back() {
                    self.buffer.cursor.col = idx;
                    self.buffer.cursor.desired_col = idx;
                }
            }
            MoveDir::Right => {
                let line = self.buffer.line_text(self.buffer.cursor.row).unwrap_or_default();
                let col = self.buffer.cursor.col.min(line.len());
                if let Some(ch) = line[col..].chars().next() {
                    self.buffer.cursor.col = col + ch.len_utf8();
                    self.buffer.cursor.desired_col = self.buffer.cursor.col;
                }
            }
            MoveDir::LineStart => {
                self.buffer.cursor.col = 0;
                self.buffer.cursor.desired_col = 0;
            }
            MoveDir::LineEnd => {
                let line_len = self
                    .buffer
                    .line_text(self.buffer.cursor.row)
                    .map(|l| l.len())
                    .unwrap_or(0);
                self.buffer.cursor.col = line_len;
                self.buffer.cursor.desired_col = line_len;
            }
        }
        self.buffer.clamp_cursor();
        self.buffer.scroll_to_cursor();
        if self.buffer.viewport.top_line != prev_top {
            self.editor.mark_dirty();
        }
        self.refresh_keyword();
    }

    /// Track the word at the caret and recompute keyword links when it changes.
    fn refresh_keyword(&mut self) {
        let keyword = self
            .buffer
            .word_at_cursor()
            .and_then(|word| layout::tracked_keyword(&word));
        if keyword != self.keyword {
            self.keyword = keyword;
            self.links = layout::connect(&self.notes, self.keyword.as_deref());
        }
    }

    fn handle_tick(&mut self) -> Result<()> {
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick).as_secs_f32().min(0.25);
        self.last_tick = now;

        if !self.focus.at_rest() {
            self.focus = self.focus.apply(FocusEvent::Tick, &self.config.focus);
        }
        self.gestures.tick(now);

        if let Some(generation) = self.reparse.poll(now)
            && self.reparse.is_current(generation)
        {
            self.reparse_notes(now);
        }

        if self.animations {
            if self.weather.rain_back {
                self.rain_back.advance(dt);
            }
            if self.weather.rain_front {
                self.rain_front.advance(dt);
            }
        }
        if let Some(fog) = self.layers.fog.as_deref_mut() {
            fog.regrow(dt);
        }

        self.refresh_visibility(now);
        Ok(())
    }

    /// Re-split the document, keeping note identity, then lay out and relink.
    fn reparse_notes(&mut self, now: Instant) {
        let started = Instant::now();
        let mut notes = parser::parse(&self.buffer.text(), &self.notes);
        layout::place(&mut notes, self.config.layout.columns);
        self.notes = notes;
        self.links = layout::connect(&self.notes, self.keyword.as_deref());
        self.gestures.portals.sync(&self.notes, now);

        let diagnostics = self.notes.diagnostics.total();
        if diagnostics > self.last_diagnostics {
            self.lightning.strike(now);
        }
        self.last_diagnostics = diagnostics;

        tracing::info!(
            notes = self.notes.len(),
            connections = self.links.connections.len(),
            diagnostics,
            elapsed_us = started.elapsed().as_micros() as u64,
            "reparsed"
        );
    }

    fn refresh_visibility(&mut self, now: Instant) {
        self.visibility = visibility::resolve(self.focus.depth, self.modes, &self.config.visibility);
        visibility::apply(&self.visibility, self.weather, &mut self.layers);
        if let Some(lightning) = self.layers.lightning.as_deref_mut() {
            lightning.set_opacity(self.lightning.intensity(now));
        }
    }

    fn save_buffer(&mut self) {
        let Some(path) = self.buffer.path.clone() else {
            return;
        };
        self.buffer.dirty = false;
        self.last_saved_file = Some((path.clone(), Instant::now()));

        let rope = self.buffer.rope.clone();
        spawn_buffer_save(path, rope);
    }

    /// Save on the calling thread; used on quit so the write is not lost.
    fn save_now(&mut self) -> Result<()> {
        let Some(path) = self.buffer.path.clone() else {
            return Ok(());
        };
        write_rope(&path, &self.buffer.rope)?;
        self.buffer.dirty = false;
        self.last_saved_file = Some((path, Instant::now()));
        Ok(())
    }

    fn handle_file_changed(&mut self, path: PathBuf) -> Result<()> {
        if !self.should_reload_active(&path) {
            return Ok(());
        }

        match std::fs::read_to_string(&path) {
            Ok(text) => {
                self.buffer.replace_text(&text);
                self.editor.mark_dirty();
                self.reparse.cancel();
                self.reparse_notes(Instant::now());
                tracing::info!("reloaded after external change");
            }
            Err(err) => tracing::warn!("reload failed: {err}"),
        }

        Ok(())
    }

    fn should_reload_active(&self, path: &Path) -> bool {
        let Some(active) = self.buffer.path.as_ref() else {
            return false;
        };

        if !same_file_path(active, path) || !path.exists() {
            return false;
        }

        if self.buffer.dirty {
            return false;
        }

        if let Some((saved_path, saved_at)) = &self.last_saved_file {
            let recently_saved =
                Instant::now().duration_since(*saved_at) <= Duration::from_millis(1200);
            if recently_saved && same_file_path(saved_path, path) {
                return false;
            }
        }

        true
    }

    // ── MVU: View ────────────────────────────────────────────────

    pub fn view(&mut self, frame: &mut Frame) {
        let now = Instant::now();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),    // body
                Constraint::Length(1), // status bar
            ])
            .split(frame.area());
        let body = chunks[0];
        self.fit_body(body);

        let hue = atmosphere::hue(self.cadence.rate(now), self.last_diagnostics);
        let caret = self.caret_position(body);

        frame.render_widget(
            Block::default().style(Style::default().bg(Color::Rgb(
                BACKGROUND.0,
                BACKGROUND.1,
                BACKGROUND.2,
            ))),
            body,
        );

        self.card_hits = cards::render(
            frame,
            body,
            &ReferenceView {
                notes: &self.notes,
                links: &self.links,
                opacity: layer_opacity(self.layers.reference.as_deref()),
                hue,
                pointer: self.pointer,
                caret: caret.filter(|_| self.keyword.is_some()),
                t: now.duration_since(self.started).as_secs_f32(),
                animations: self.animations,
                tilt_falloff: self.config.layout.tilt_falloff,
            },
        );

        surface::dim_outside(
            frame.buffer_mut(),
            body,
            self.pointer.or(caret),
            self.config.visibility.lantern_radius as f32,
            layer_opacity(self.layers.overlay.as_deref()),
        );

        let editor_opacity = layer_opacity(self.layers.editor.as_deref());
        for stage in self.editor_depth.draw_order() {
            match stage {
                Stage::RainBack => self.rain_back.draw(
                    frame.buffer_mut(),
                    layer_opacity(self.layers.rain_back.as_deref()),
                ),
                Stage::RainFront => self.rain_front.draw(
                    frame.buffer_mut(),
                    layer_opacity(self.layers.rain_front.as_deref()),
                ),
                Stage::Editor if editor_opacity >= EDITOR_HIDDEN => {
                    self.render_editor(frame, body, editor_opacity);
                }
                Stage::Editor => {}
            }
        }

        if let Some(fog) = self.layers.fog.as_deref() {
            surface::draw_fog(frame.buffer_mut(), body, fog);
        }
        weather::draw_flash(
            frame.buffer_mut(),
            body,
            layer_opacity(self.layers.lightning.as_deref()),
        );
        if let Some(progress) = self.gestures.sonar.pulse_progress(now) {
            cards::render_sonar(frame.buffer_mut(), body, progress, hue);
        }

        status::render(
            frame,
            chunks[1],
            &StatusInfo {
                mode: self.mode,
                buffer: &self.buffer,
                depth: self.focus.depth,
                modes: self.modes,
                weather: self.weather,
                editor_depth: self.editor_depth,
                animations: self.animations,
                sonar: self.gestures.sonar.phase,
                portal: self.gestures.portals.phase,
                notes: self.notes.len(),
                diagnostics: self.last_diagnostics,
                hue,
            },
        );

        if editor_opacity >= 0.5
            && let Some(position) = caret
        {
            frame.set_cursor_position(position);
        }
    }

    /// Text glyphs, then the marker badges and portal markers pinned to it.
    fn render_editor(&mut self, frame: &mut Frame, body: Rect, opacity: f32) {
        self.editor.render(frame, &self.buffer, body, opacity);
        self.editor
            .render_badges(frame, &self.buffer, body, &self.notes.badges, opacity);
        self.editor.render_portals(
            frame,
            &self.buffer,
            body,
            &self.gestures.portals.markers,
            self.gestures.portals.is_active(),
        );
    }

    fn fit_body(&mut self, body: Rect) {
        if body == self.body_area {
            return;
        }
        self.body_area = body;
        self.buffer.viewport.height = body.height;
        self.rain_back.resize(body);
        self.rain_front.resize(body);
        if let Some(fog) = self.layers.fog.as_deref_mut() {
            fog.resize(body.width, body.height);
        }
        self.editor.mark_dirty();
    }

    /// Screen cell of the caret, when it is inside the body.
    fn caret_position(&self, body: Rect) -> Option<(u16, u16)> {
        let row = self.buffer.cursor.row.checked_sub(self.buffer.viewport.top_line)?;
        if row >= body.height as usize {
            return None;
        }
        let line = self.buffer.line_text(self.buffer.cursor.row).unwrap_or_default();
        let col = self.buffer.cursor.col.min(line.len());
        let chars = line.get(..col).map_or(0, |s| s.chars().count());
        let x = (body.x as usize + chars).min(body.right().saturating_sub(1) as usize);
        Some((x as u16, body.y + row as u16))
    }
}

fn layer_opacity(layer: Option<&dyn Surface>) -> f32 {
    layer.map_or(0.0, |s| s.opacity())
}

/// Byte offset of the `col`-th character of `line`, or the line end.
fn display_to_byte(line: &str, col: usize) -> usize {
    line.char_indices()
        .nth(col)
        .map(|(idx, _)| idx)
        .unwrap_or(line.len())
}

fn same_file_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }

    let a_canon = std::fs::canonicalize(a);
    let b_canon = std::fs::canonicalize(b);
    matches!((a_canon, b_canon), (Ok(ca), Ok(cb)) if ca == cb)
}

/// Write through a sibling temp file, then rename over the target.
fn write_rope(path: &Path, rope: &ropey::Rope) -> std::io::Result<()> {
    use std::io::Write;
    let tmp = path.with_extension("tmp");
    let file = std::fs::File::create(&tmp)?;
    let mut writer = std::io::BufWriter::new(file);
    for chunk in rope.chunks() {
        writer.write_all(chunk.as_bytes())?;
    }
    writer.flush()?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn spawn_buffer_save(path: PathBuf, rope: ropey::Rope) {
    std::thread::spawn(move || {
        if let Err(e) = write_rope(&path, &rope) {
            tracing::error!("save failed: {e}");
        }
    });
}
