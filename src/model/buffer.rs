use ropey::Rope;
use std::path::PathBuf;

use super::cursor::CursorState;
use crate::error::Result;

/// Viewport state for scroll tracking.
#[derive(Debug, Clone)]
pub struct Viewport {
    pub top_line: usize,
    pub height: u16,
    pub scroll_off: u16,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            top_line: 0,
            height: 24,
            scroll_off: 3,
        }
    }
}

/// The editor's text, backed by a Rope.
pub struct Buffer {
    pub rope: Rope,
    pub path: Option<PathBuf>,
    pub dirty: bool,
    pub cursor: CursorState,
    pub viewport: Viewport,
}

impl Buffer {
    pub fn new() -> Self {
        Self::from_text("")
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            path: None,
            dirty: false,
            cursor: CursorState::default(),
            viewport: Viewport::default(),
        }
    }

    /// Create a buffer from file contents.
    pub fn from_file(path: PathBuf) -> Result<Self> {
        let text = std::fs::read_to_string(&path)?;
        let mut buffer = Self::from_text(&text);
        buffer.path = Some(path);
        Ok(buffer)
    }

    /// Full document text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Replace the whole document, keeping the cursor in bounds.
    pub fn replace_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.dirty = false;
        self.clamp_cursor();
        self.scroll_to_cursor();
    }

    /// Total number of lines in the buffer.
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// Get the text of a specific line (without trailing newline).
    pub fn line_text(&self, idx: usize) -> Option<String> {
        if idx >= self.rope.len_lines() {
            return None;
        }
        let line = self.rope.line(idx);
        let mut s: String = line.chunks().collect();
        if s.ends_with('\n') {
            s.pop();
        }
        if s.ends_with('\r') {
            s.pop();
        }
        Some(s)
    }

    /// Insert a character at the cursor position.
    pub fn insert_char(&mut self, ch: char) {
        let char_idx = self.cursor_char_offset();
        self.rope.insert_char(char_idx, ch);
        self.cursor.col += ch.len_utf8();
        self.cursor.desired_col = self.cursor.col;
        self.dirty = true;
    }

    /// Insert a newline at the cursor position.
    pub fn insert_newline(&mut self) {
        let char_idx = self.cursor_char_offset();
        self.rope.insert_char(char_idx, '\n');
        self.cursor.row += 1;
        self.cursor.col = 0;
        self.cursor.desired_col = 0;
        self.dirty = true;
    }

    /// Delete the character before the cursor (backspace).
    pub fn delete_char_before(&mut self) {
        if self.cursor.col == 0 && self.cursor.row == 0 {
            return;
        }

        let char_idx = self.cursor_char_offset();
        if self.cursor.col == 0 {
            // Join with previous line
            let prev_line_len = self
                .line_text(self.cursor.row - 1)
                .map(|l| l.len())
                .unwrap_or(0);
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.row -= 1;
            self.cursor.col = prev_line_len;
        } else {
            let removed_len = self.rope.char(char_idx - 1).len_utf8();
            self.rope.remove(char_idx - 1..char_idx);
            self.cursor.col -= removed_len;
        }

        self.cursor.desired_col = self.cursor.col;
        self.dirty = true;
    }

    /// Move the cursor to a clicked cell, snapping to a char boundary.
    pub fn click_to(&mut self, row: usize, col: usize) {
        self.cursor.row = row;
        let line = self.line_text(row.min(self.line_count().saturating_sub(1)));
        let col = line
            .map(|l| snap_to_boundary(&l, col))
            .unwrap_or(0);
        self.cursor.move_to(self.cursor.row, col);
        self.clamp_cursor();
    }

    /// Word under or directly behind the cursor.
    pub fn word_at_cursor(&self) -> Option<String> {
        let line = self.line_text(self.cursor.row)?;
        let col = self.cursor.col.min(line.len());
        let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '-';

        let start = line[..col]
            .char_indices()
            .rev()
            .take_while(|(_, c)| is_word(*c))
            .last()
            .map(|(i, _)| i)
            .unwrap_or(col);
        let end = line[col..]
            .char_indices()
            .find(|(_, c)| !is_word(*c))
            .map(|(i, _)| col + i)
            .unwrap_or(line.len());

        let word = &line[start..end];
        (!word.is_empty()).then(|| word.to_string())
    }

    /// Rope char index for the cursor. `cursor.col` is a byte offset within the line.
    fn cursor_char_offset(&self) -> usize {
        let line_start = self.rope.line_to_char(self.cursor.row);
        let line = self.line_text(self.cursor.row).unwrap_or_default();
        let col = snap_to_boundary(&line, self.cursor.col);
        line_start + line[..col].chars().count()
    }

    /// Ensure the cursor stays within valid bounds.
    pub fn clamp_cursor(&mut self) {
        let max_row = self.rope.len_lines().saturating_sub(1);
        self.cursor.row = self.cursor.row.min(max_row);

        let line = self.line_text(self.cursor.row).unwrap_or_default();
        self.cursor.col = snap_to_boundary(&line, self.cursor.col.min(line.len()));
    }

    /// Ensure the viewport keeps the cursor visible.
    pub fn scroll_to_cursor(&mut self) {
        let off = self.viewport.scroll_off as usize;
        let height = (self.viewport.height as usize).max(off * 2 + 1);

        if self.cursor.row < self.viewport.top_line + off {
            self.viewport.top_line = self.cursor.row.saturating_sub(off);
        }
        if self.cursor.row + off >= self.viewport.top_line + height {
            self.viewport.top_line = self.cursor.row + off + 1 - height;
        }
    }

    /// Scroll the viewport without moving the cursor.
    pub fn scroll_by(&mut self, lines: isize) {
        let max_top = self.line_count().saturating_sub(1) as isize;
        let next = (self.viewport.top_line as isize + lines).clamp(0, max_top);
        self.viewport.top_line = next as usize;
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

fn snap_to_boundary(line: &str, col: usize) -> usize {
    let mut col = col.min(line.len());
    while col > 0 && !line.is_char_boundary(col) {
        col -= 1;
    }
    col
}
