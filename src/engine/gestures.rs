use std::time::{Duration, Instant};

use super::parser::{NoteId, NoteSet};
use crate::model::config::GestureConfig;

/// See-through editor, active exactly while its modifier is held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XRay {
    pub active: bool,
}

impl XRay {
    /// Returns whether the state changed.
    pub fn set(&mut self, held: bool) -> bool {
        let changed = self.active != held;
        self.active = held;
        changed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SonarPhase {
    Idle,
    Charging { since: Instant },
    Pulsing { since: Instant },
}

/// Double-tap pulse.
#[derive(Debug, Clone)]
pub struct Sonar {
    pub phase: SonarPhase,
    window: Duration,
    pulse: Duration,
}

impl Sonar {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            phase: SonarPhase::Idle,
            window: Duration::from_millis(config.sonar_window_ms),
            pulse: Duration::from_millis(config.sonar_pulse_ms),
        }
    }

    /// Feed a tap. Returns true when the tap starts a pulse.
    pub fn tap(&mut self, now: Instant) -> bool {
        self.tick(now);
        match self.phase {
            SonarPhase::Idle => {
                self.phase = SonarPhase::Charging { since: now };
                false
            }
            SonarPhase::Charging { .. } => {
                self.phase = SonarPhase::Pulsing { since: now };
                tracing::debug!("sonar pulse");
                true
            }
            SonarPhase::Pulsing { .. } => false,
        }
    }

    pub fn tick(&mut self, now: Instant) {
        match self.phase {
            SonarPhase::Charging { since } if now.duration_since(since) > self.window => {
                self.phase = SonarPhase::Idle;
            }
            SonarPhase::Pulsing { since } if now.duration_since(since) >= self.pulse => {
                self.phase = SonarPhase::Idle;
            }
            _ => {}
        }
    }

    /// Fraction of the pulse elapsed, while pulsing.
    pub fn pulse_progress(&self, now: Instant) -> Option<f32> {
        let SonarPhase::Pulsing { since } = self.phase else {
            return None;
        };
        let elapsed = now.duration_since(since).as_secs_f32();
        Some((elapsed / self.pulse.as_secs_f32().max(f32::EPSILON)).clamp(0.0, 1.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalPhase {
    Idle,
    Armed { since: Instant },
    Active,
}

/// Marker drawn for an `@portal` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalMarker {
    pub line: usize,
    pub note: Option<NoteId>,
}

/// Portal markers open once typing has paused for the idle period.
#[derive(Debug, Clone)]
pub struct Portals {
    pub phase: PortalPhase,
    pub markers: Vec<PortalMarker>,
    idle: Duration,
}

impl Portals {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            phase: PortalPhase::Idle,
            markers: Vec::new(),
            idle: Duration::from_millis(config.portal_idle_ms),
        }
    }

    /// Rebuild markers from the latest parse.
    pub fn sync(&mut self, notes: &NoteSet, now: Instant) {
        self.markers = notes
            .portals
            .iter()
            .map(|p| PortalMarker {
                line: p.line,
                note: p.note,
            })
            .collect();

        if self.markers.is_empty() {
            self.phase = PortalPhase::Idle;
        } else if self.phase == PortalPhase::Idle {
            self.phase = PortalPhase::Armed { since: now };
        }
    }

    pub fn typed(&mut self, now: Instant) {
        if !self.markers.is_empty() {
            self.phase = PortalPhase::Armed { since: now };
        }
    }

    pub fn tick(&mut self, now: Instant) {
        if let PortalPhase::Armed { since } = self.phase
            && now.duration_since(since) >= self.idle
        {
            tracing::debug!(markers = self.markers.len(), "portals open");
            self.phase = PortalPhase::Active;
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == PortalPhase::Active
    }
}

/// Pin a note. Returns true only when the note was not already pinned.
pub fn spotlight(notes: &mut NoteSet, id: NoteId) -> bool {
    match notes.get_mut(id) {
        Some(note) if !note.spotlighted => {
            note.spotlighted = true;
            true
        }
        _ => false,
    }
}

/// Flip a note's collapsed flag, returning the new value.
pub fn toggle_collapsed(notes: &mut NoteSet, id: NoteId) -> Option<bool> {
    let note = notes.get_mut(id)?;
    note.collapsed = !note.collapsed;
    Some(note.collapsed)
}

#[derive(Debug, Clone)]
pub struct GestureState {
    pub xray: XRay,
    pub sonar: Sonar,
    pub portals: Portals,
}

impl GestureState {
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            xray: XRay::default(),
            sonar: Sonar::new(config),
            portals: Portals::new(config),
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.sonar.tick(now);
        self.portals.tick(now);
    }
}
