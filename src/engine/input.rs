use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, ModifierKeyCode, MouseButton,
    MouseEvent, MouseEventKind,
};
use smallvec::SmallVec;
use std::time::{Duration, Instant};

use crate::model::config::GeneralConfig;

/// Wheel delta of one notch.
pub const WHEEL_STEP: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// Alt: sinks focus into the reference layer.
    Depth,
    /// Control: see-through editor.
    XRay,
    /// Shift: double tap fires sonar.
    Sonar,
}

impl Modifier {
    fn from_key(code: ModifierKeyCode) -> Option<Self> {
        match code {
            ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => Some(Self::Depth),
            ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => Some(Self::XRay),
            ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => Some(Self::Sonar),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Depth => 0,
            Self::XRay => 1,
            Self::Sonar => 2,
        }
    }
}

const MODIFIERS: [Modifier; 3] = [Modifier::Depth, Modifier::XRay, Modifier::Sonar];

/// Semantic input, produced from raw terminal events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    ModifierDown(Modifier),
    ModifierUp(Modifier),
    Wheel(f32),
    Click { x: u16, y: u16 },
    DoubleClick { x: u16, y: u16 },
    Drag { x: u16, y: u16 },
    Release { x: u16, y: u16 },
    PointerMove { x: u16, y: u16 },
    Tap(Modifier),
    Key(KeyEvent),
    Typed(Instant),
}

pub type Signals = SmallVec<[Signal; 2]>;

/// Plain keys standing in for bare modifier presses, which terminals only
/// report under the keyboard enhancement protocol.
#[derive(Debug, Clone, Copy)]
struct FallbackKeys {
    depth_latch: Option<KeyCode>,
    xray_latch: Option<KeyCode>,
    sonar_tap: Option<KeyCode>,
}

fn fallback_key(name: &str, role: &str) -> Option<KeyCode> {
    let parsed = parse_key(name);
    if parsed.is_none() {
        tracing::warn!(key = name, role, "unrecognised fallback key");
    }
    parsed
}

pub struct InputSampler {
    held: [bool; 3],
    keys: FallbackKeys,
    double_click: Duration,
    last_click: Option<(u16, u16, Instant)>,
}

impl InputSampler {
    pub fn new(config: &GeneralConfig) -> Self {
        Self {
            held: [false; 3],
            keys: FallbackKeys {
                depth_latch: fallback_key(&config.depth_latch_key, "depth latch"),
                xray_latch: fallback_key(&config.xray_latch_key, "x-ray latch"),
                sonar_tap: fallback_key(&config.sonar_tap_key, "sonar tap"),
            },
            double_click: Duration::from_millis(config.double_click_ms),
            last_click: None,
        }
    }

    pub fn is_held(&self, modifier: Modifier) -> bool {
        self.held[modifier.index()]
    }

    pub fn sample(&mut self, event: &Event, now: Instant) -> Signals {
        let mut out = Signals::new();
        match event {
            Event::Key(key) => self.sample_key(key, now, &mut out),
            Event::Mouse(mouse) => self.sample_mouse(mouse, now, &mut out),
            Event::FocusLost => {
                for modifier in MODIFIERS {
                    self.release(modifier, &mut out);
                }
            }
            _ => {}
        }
        out
    }

    fn sample_key(&mut self, key: &KeyEvent, now: Instant, out: &mut Signals) {
        if let KeyCode::Modifier(code) = key.code {
            let Some(modifier) = Modifier::from_key(code) else {
                return;
            };
            match key.kind {
                KeyEventKind::Press => self.press(modifier, out),
                KeyEventKind::Release => self.release(modifier, out),
                KeyEventKind::Repeat => {}
            }
            return;
        }

        if key.kind == KeyEventKind::Release {
            return;
        }

        if key.kind == KeyEventKind::Press {
            let code = Some(key.code);
            if code == self.keys.depth_latch {
                self.toggle(Modifier::Depth, out);
                return;
            }
            if code == self.keys.xray_latch {
                self.toggle(Modifier::XRay, out);
                return;
            }
            if code == self.keys.sonar_tap {
                out.push(Signal::Tap(Modifier::Sonar));
                return;
            }
        }

        out.push(Signal::Key(*key));
        if modifies_text(key) {
            out.push(Signal::Typed(now));
        }
    }

    fn sample_mouse(&mut self, mouse: &MouseEvent, now: Instant, out: &mut Signals) {
        let (x, y) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                out.push(Signal::Click { x, y });
                match self.last_click {
                    Some((lx, ly, at))
                        if lx == x && ly == y && now.duration_since(at) <= self.double_click =>
                    {
                        out.push(Signal::DoubleClick { x, y });
                        self.last_click = None;
                    }
                    _ => self.last_click = Some((x, y, now)),
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => out.push(Signal::Drag { x, y }),
            MouseEventKind::Up(MouseButton::Left) => out.push(Signal::Release { x, y }),
            MouseEventKind::Moved => out.push(Signal::PointerMove { x, y }),
            MouseEventKind::ScrollDown => out.push(Signal::Wheel(WHEEL_STEP)),
            MouseEventKind::ScrollUp => out.push(Signal::Wheel(-WHEEL_STEP)),
            _ => {}
        }
    }

    fn press(&mut self, modifier: Modifier, out: &mut Signals) {
        let held = &mut self.held[modifier.index()];
        if *held {
            return;
        }
        *held = true;
        out.push(Signal::ModifierDown(modifier));
        if modifier == Modifier::Sonar {
            out.push(Signal::Tap(modifier));
        }
    }

    fn toggle(&mut self, modifier: Modifier, out: &mut Signals) {
        if self.is_held(modifier) {
            self.release(modifier, out);
        } else {
            self.press(modifier, out);
        }
    }

    fn release(&mut self, modifier: Modifier, out: &mut Signals) {
        let held = &mut self.held[modifier.index()];
        if *held {
            *held = false;
            out.push(Signal::ModifierUp(modifier));
        }
    }
}

fn modifies_text(key: &KeyEvent) -> bool {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return false;
    }
    matches!(
        key.code,
        KeyCode::Char(_) | KeyCode::Enter | KeyCode::Backspace | KeyCode::Delete | KeyCode::Tab
    )
}

/// Parse a key name such as `F2` or `~`.
pub fn parse_key(name: &str) -> Option<KeyCode> {
    let name = name.trim();
    if let Some(n) = name.strip_prefix(['F', 'f'])
        && let Ok(n) = n.parse::<u8>()
        && (1..=12).contains(&n)
    {
        return Some(KeyCode::F(n));
    }
    match name.to_ascii_lowercase().as_str() {
        "tab" => return Some(KeyCode::Tab),
        "insert" => return Some(KeyCode::Insert),
        "home" => return Some(KeyCode::Home),
        "end" => return Some(KeyCode::End),
        _ => {}
    }
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(KeyCode::Char(c)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        })
    }

    fn mouse(kind: MouseEventKind, x: u16, y: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: x,
            row: y,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn sampler() -> InputSampler {
        InputSampler::new(&GeneralConfig::default())
    }

    #[test]
    fn test_modifier_edges_are_deduplicated() {
        let mut s = sampler();
        let now = Instant::now();
        let alt = KeyCode::Modifier(ModifierKeyCode::LeftAlt);

        let down = s.sample(&key(alt, KeyEventKind::Press), now);
        assert_eq!(down.as_slice(), &[Signal::ModifierDown(Modifier::Depth)]);
        assert!(s.sample(&key(alt, KeyEventKind::Press), now).is_empty());
        assert!(s.sample(&key(alt, KeyEventKind::Repeat), now).is_empty());

        let up = s.sample(&key(alt, KeyEventKind::Release), now);
        assert_eq!(up.as_slice(), &[Signal::ModifierUp(Modifier::Depth)]);
        assert!(s.sample(&key(alt, KeyEventKind::Release), now).is_empty());
    }

    #[test]
    fn test_shift_press_taps() {
        let mut s = sampler();
        let shift = KeyCode::Modifier(ModifierKeyCode::RightShift);
        let out = s.sample(&key(shift, KeyEventKind::Press), Instant::now());
        assert_eq!(
            out.as_slice(),
            &[
                Signal::ModifierDown(Modifier::Sonar),
                Signal::Tap(Modifier::Sonar)
            ]
        );
    }

    #[test]
    fn test_latch_key_toggles_depth() {
        let mut s = sampler();
        let now = Instant::now();
        let f2 = key(KeyCode::F(2), KeyEventKind::Press);
        assert_eq!(s.sample(&f2, now).as_slice(), &[Signal::ModifierDown(Modifier::Depth)]);
        assert!(s.is_held(Modifier::Depth));
        assert_eq!(s.sample(&f2, now).as_slice(), &[Signal::ModifierUp(Modifier::Depth)]);
    }

    #[test]
    fn test_latch_key_toggles_xray() {
        let mut s = sampler();
        let now = Instant::now();
        let f3 = key(KeyCode::F(3), KeyEventKind::Press);
        assert_eq!(s.sample(&f3, now).as_slice(), &[Signal::ModifierDown(Modifier::XRay)]);
        assert!(s.is_held(Modifier::XRay));
        assert!(!s.is_held(Modifier::Depth));
        assert_eq!(s.sample(&f3, now).as_slice(), &[Signal::ModifierUp(Modifier::XRay)]);
        assert!(s.sample(&key(KeyCode::F(3), KeyEventKind::Release), now).is_empty());
    }

    #[test]
    fn test_tap_key_taps_sonar() {
        let mut s = sampler();
        let now = Instant::now();
        let f4 = key(KeyCode::F(4), KeyEventKind::Press);
        assert_eq!(s.sample(&f4, now).as_slice(), &[Signal::Tap(Modifier::Sonar)]);
        assert_eq!(s.sample(&f4, now).as_slice(), &[Signal::Tap(Modifier::Sonar)]);
        assert!(!s.is_held(Modifier::Sonar));
    }

    #[test]
    fn test_fallback_keys_follow_config() {
        let config = GeneralConfig {
            xray_latch_key: "x".to_string(),
            sonar_tap_key: "nonsense".to_string(),
            ..GeneralConfig::default()
        };
        let mut s = InputSampler::new(&config);
        let now = Instant::now();
        let x = key(KeyCode::Char('x'), KeyEventKind::Press);
        assert_eq!(s.sample(&x, now).as_slice(), &[Signal::ModifierDown(Modifier::XRay)]);
        let f4 = s.sample(&key(KeyCode::F(4), KeyEventKind::Press), now);
        assert!(matches!(f4.as_slice(), [Signal::Key(_)]));
    }

    #[test]
    fn test_alt_chars_are_not_typed() {
        let mut s = sampler();
        let now = Instant::now();
        let alt_x = Event::Key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::ALT));
        let out = s.sample(&alt_x, now);
        assert!(matches!(out.as_slice(), [Signal::Key(_)]));
    }

    #[test]
    fn test_text_keys_are_typed() {
        let mut s = sampler();
        let now = Instant::now();
        let out = s.sample(&key(KeyCode::Char('a'), KeyEventKind::Press), now);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1], Signal::Typed(now));

        let out = s.sample(&key(KeyCode::Left, KeyEventKind::Press), now);
        assert_eq!(out.len(), 1);
        assert!(s.sample(&key(KeyCode::Char('a'), KeyEventKind::Release), now).is_empty());
    }

    #[test]
    fn test_wheel_and_double_click() {
        let mut s = sampler();
        let t0 = Instant::now();
        assert_eq!(
            s.sample(&mouse(MouseEventKind::ScrollDown, 0, 0), t0).as_slice(),
            &[Signal::Wheel(WHEEL_STEP)]
        );

        let click = mouse(MouseEventKind::Down(MouseButton::Left), 4, 5);
        assert_eq!(s.sample(&click, t0).len(), 1);
        let second = s.sample(&click, t0 + Duration::from_millis(150));
        assert_eq!(second[1], Signal::DoubleClick { x: 4, y: 5 });

        let third = s.sample(&click, t0 + Duration::from_millis(200));
        assert_eq!(third.len(), 1);
        let late = s.sample(&click, t0 + Duration::from_millis(900));
        assert_eq!(late.len(), 1);
    }

    #[test]
    fn test_focus_lost_releases_everything() {
        let mut s = sampler();
        let now = Instant::now();
        s.sample(&key(KeyCode::Modifier(ModifierKeyCode::LeftControl), KeyEventKind::Press), now);
        let out = s.sample(&Event::FocusLost, now);
        assert_eq!(out.as_slice(), &[Signal::ModifierUp(Modifier::XRay)]);
    }

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("F2"), Some(KeyCode::F(2)));
        assert_eq!(parse_key("f12"), Some(KeyCode::F(12)));
        assert_eq!(parse_key("~"), Some(KeyCode::Char('~')));
        assert_eq!(parse_key("F13"), None);
        assert_eq!(parse_key(""), None);
    }
}
