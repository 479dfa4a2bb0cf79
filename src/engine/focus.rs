//! Focus depth: how far the view has sunk from the editor into the
//! reference layer.
//!
//! Depth is a value in `[0, 1]`. Holding the depth modifier jumps it to the
//! peek depth at once; the wheel nudges it while held; releasing lets it
//! decay back towards zero on every tick.

use crate::model::config::FocusConfig;

/// Depth below which an idle decay snaps to rest.
const REST_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusEvent {
    ModifierDown,
    ModifierUp,
    /// Wheel delta; positive scrolls down and sinks deeper.
    Wheel(f32),
    Tick,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FocusState {
    pub modifier_held: bool,
    pub manual_offset: f32,
    pub depth: f32,
    /// A wheel event arrived during the current (or last) engagement.
    pub scrolled: bool,
}

impl FocusState {
    pub fn apply(self, event: FocusEvent, config: &FocusConfig) -> Self {
        let mut next = self;
        match event {
            FocusEvent::ModifierDown => {
                if self.modifier_held {
                    return self;
                }
                if !self.scrolled {
                    next.manual_offset = 0.0;
                }
                next.scrolled = false;
                next.modifier_held = true;
                next.depth = next.engaged_depth(config);
            }
            FocusEvent::ModifierUp => {
                next.modifier_held = false;
            }
            FocusEvent::Wheel(delta) => {
                if !self.modifier_held || !delta.is_finite() {
                    return self;
                }
                let peek = config.peek_depth;
                next.manual_offset =
                    (self.manual_offset + delta * config.scroll_scale).clamp(-peek, 1.0 - peek);
                next.scrolled = true;
                next.depth = next.engaged_depth(config);
            }
            FocusEvent::Tick => {
                if self.modifier_held {
                    next.depth = next.engaged_depth(config);
                } else {
                    next.depth = self.depth * (1.0 - config.decay);
                    if next.depth < REST_EPSILON {
                        next.depth = 0.0;
                    }
                }
            }
        }
        next.depth = next.depth.clamp(0.0, 1.0);
        next
    }

    /// Opacity of the editor surface before mode overrides.
    pub fn editor_opacity(&self) -> f32 {
        1.0 - self.depth
    }

    pub fn at_rest(&self) -> bool {
        !self.modifier_held && self.depth == 0.0
    }

    fn engaged_depth(&self, config: &FocusConfig) -> f32 {
        (config.peek_depth + self.manual_offset).clamp(0.0, 1.0)
    }
}
