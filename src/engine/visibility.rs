use crate::model::config::VisibilityConfig;

/// Presentation modes that gate the depth-derived opacities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerModes {
    pub lantern: bool,
    pub ghost: bool,
    pub xray: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerVisibility {
    pub editor_opacity: f32,
    pub reference_opacity: f32,
    /// The editor receives pointer input.
    pub editor_pointer_events: bool,
    /// Strength of the lantern mask drawn over the reference layer.
    pub reference_overlay_opacity: f32,
    pub editor_see_through: bool,
}

impl LayerVisibility {
    pub fn reference_interactive(&self) -> bool {
        !self.editor_pointer_events
    }
}

/// Map a focus depth and mode flags to per-layer opacity and interactivity.
pub fn resolve(depth: f32, modes: LayerModes, config: &VisibilityConfig) -> LayerVisibility {
    let depth = if depth.is_finite() {
        depth.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let reference_opacity = if modes.ghost {
        depth.max(config.ghost_floor)
    } else {
        depth
    };

    let editor_opacity = if modes.xray {
        config.xray_opacity
    } else {
        1.0 - depth
    };

    let reference_overlay_opacity = if modes.lantern {
        depth * config.lantern_strength
    } else {
        0.0
    };

    LayerVisibility {
        editor_opacity: editor_opacity.clamp(0.0, 1.0),
        reference_opacity: reference_opacity.clamp(0.0, 1.0),
        editor_pointer_events: reference_opacity <= config.pointer_threshold,
        reference_overlay_opacity: reference_overlay_opacity.clamp(0.0, 1.0),
        editor_see_through: modes.xray,
    }
}

/// A render target whose visibility the engine drives.
pub trait Surface {
    fn set_opacity(&mut self, opacity: f32);
    fn set_interactive(&mut self, interactive: bool);
    fn opacity(&self) -> f32;
    fn interactive(&self) -> bool;
}

/// The fog layer additionally lets the pointer wipe a clear patch, which
/// slowly grows back.
pub trait FogSurface: Surface {
    fn clear_at(&mut self, x: f32, y: f32, radius: f32);
    /// Fog density in `[0, 1]` at a cell.
    fn density_at(&self, x: u16, y: u16) -> f32;
    fn regrow(&mut self, dt: f32);
    fn resize(&mut self, width: u16, height: u16);
}

/// The set of surfaces a session renders into. Any of them may be absent.
#[derive(Default)]
pub struct LayerSet {
    pub editor: Option<Box<dyn Surface>>,
    pub reference: Option<Box<dyn Surface>>,
    pub overlay: Option<Box<dyn Surface>>,
    pub rain_back: Option<Box<dyn Surface>>,
    pub rain_front: Option<Box<dyn Surface>>,
    pub lightning: Option<Box<dyn Surface>>,
    pub fog: Option<Box<dyn FogSurface>>,
}

/// Weather toggles pushed alongside the depth-derived values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weather {
    pub rain_back: bool,
    pub rain_front: bool,
    pub fog: bool,
}

/// Where the editor glyphs sit among the rain layers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditorDepth {
    Behind,
    #[default]
    Between,
    Front,
}

/// One pass of the weather stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RainBack,
    Editor,
    RainFront,
}

impl EditorDepth {
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Behind,
            1 => Self::Between,
            _ => Self::Front,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Self::Behind => 0,
            Self::Between => 1,
            Self::Front => 2,
        }
    }

    /// Step the level by `delta`, clamped to the three levels.
    pub fn adjust(self, delta: i8) -> Self {
        Self::from_level((self.level() as i8 + delta).clamp(0, 2) as u8)
    }

    pub fn icon(self) -> char {
        match self {
            Self::Behind => '▼',
            Self::Between => '◆',
            Self::Front => '▲',
        }
    }

    /// Bottom-to-top draw order of the editor and the rain layers.
    pub fn draw_order(self) -> [Stage; 3] {
        match self {
            Self::Behind => [Stage::Editor, Stage::RainBack, Stage::RainFront],
            Self::Between => [Stage::RainBack, Stage::Editor, Stage::RainFront],
            Self::Front => [Stage::RainBack, Stage::RainFront, Stage::Editor],
        }
    }
}

/// Push resolved visibility into whichever surfaces exist.
pub fn apply(visibility: &LayerVisibility, weather: Weather, layers: &mut LayerSet) {
    if let Some(editor) = layers.editor.as_deref_mut() {
        editor.set_opacity(visibility.editor_opacity);
        editor.set_interactive(visibility.editor_pointer_events);
    }
    if let Some(reference) = layers.reference.as_deref_mut() {
        reference.set_opacity(visibility.reference_opacity);
        reference.set_interactive(visibility.reference_interactive());
    }
    if let Some(overlay) = layers.overlay.as_deref_mut() {
        overlay.set_opacity(visibility.reference_overlay_opacity);
        overlay.set_interactive(false);
    }
    let rain_opacity = 1.0 - visibility.reference_opacity * 0.5;
    for (layer, on) in [
        (layers.rain_back.as_deref_mut(), weather.rain_back),
        (layers.rain_front.as_deref_mut(), weather.rain_front),
    ] {
        if let Some(rain) = layer {
            rain.set_opacity(if on { rain_opacity } else { 0.0 });
            rain.set_interactive(false);
        }
    }
    if let Some(fog) = layers.fog.as_deref_mut() {
        fog.set_opacity(if weather.fog { 1.0 } else { 0.0 });
        fog.set_interactive(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        opacity: f32,
        interactive: bool,
    }

    impl Surface for Probe {
        fn set_opacity(&mut self, opacity: f32) {
            self.opacity = opacity;
        }
        fn set_interactive(&mut self, interactive: bool) {
            self.interactive = interactive;
        }
        fn opacity(&self) -> f32 {
            self.opacity
        }
        fn interactive(&self) -> bool {
            self.interactive
        }
    }

    impl FogSurface for Probe {
        fn clear_at(&mut self, _x: f32, _y: f32, _radius: f32) {}
        fn density_at(&self, _x: u16, _y: u16) -> f32 {
            1.0
        }
        fn regrow(&mut self, _dt: f32) {}
        fn resize(&mut self, _width: u16, _height: u16) {}
    }

    fn cfg() -> VisibilityConfig {
        VisibilityConfig::default()
    }

    #[test]
    fn test_rest_shows_editor_only() {
        let v = resolve(0.0, LayerModes::default(), &cfg());
        assert_eq!(v.editor_opacity, 1.0);
        assert_eq!(v.reference_opacity, 0.0);
        assert!(v.editor_pointer_events);
        assert!(!v.editor_see_through);
    }

    #[test]
    fn test_reference_mode_takes_pointer() {
        let v = resolve(0.98, LayerModes::default(), &cfg());
        assert!((v.editor_opacity - 0.02).abs() < 1e-6);
        assert!(!v.editor_pointer_events);
        assert!(v.reference_interactive());
    }

    #[test]
    fn test_ghost_keeps_floor() {
        let modes = LayerModes {
            ghost: true,
            ..Default::default()
        };
        assert_eq!(resolve(0.0, modes, &cfg()).reference_opacity, 0.15);
        assert_eq!(resolve(0.6, modes, &cfg()).reference_opacity, 0.6);
    }

    #[test]
    fn test_lantern_off_hides_overlay_at_any_depth() {
        let off = resolve(1.0, LayerModes::default(), &cfg());
        assert_eq!(off.reference_overlay_opacity, 0.0);

        let on = LayerModes {
            lantern: true,
            ..Default::default()
        };
        assert!((resolve(1.0, on, &cfg()).reference_overlay_opacity - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_xray_ignores_depth() {
        let modes = LayerModes {
            xray: true,
            ..Default::default()
        };
        for depth in [0.0, 0.5, 1.0] {
            let v = resolve(depth, modes, &cfg());
            assert_eq!(v.editor_opacity, 0.3);
            assert!(v.editor_see_through);
        }
    }

    #[test]
    fn test_out_of_range_depth_is_clamped() {
        assert_eq!(resolve(7.0, LayerModes::default(), &cfg()).reference_opacity, 1.0);
        assert_eq!(resolve(-3.0, LayerModes::default(), &cfg()).editor_opacity, 1.0);
        assert_eq!(resolve(f32::NAN, LayerModes::default(), &cfg()).editor_opacity, 1.0);
    }

    #[test]
    fn test_apply_skips_missing_surfaces() {
        let mut layers = LayerSet {
            reference: Some(Box::new(Probe::default())),
            rain_front: Some(Box::new(Probe::default())),
            fog: Some(Box::new(Probe::default())),
            ..Default::default()
        };
        let v = resolve(1.0, LayerModes::default(), &cfg());
        let weather = Weather {
            rain_back: true,
            rain_front: false,
            fog: false,
        };
        apply(&v, weather, &mut layers);

        let reference = layers.reference.as_deref().unwrap();
        assert_eq!(reference.opacity(), 1.0);
        assert!(reference.interactive());
        assert_eq!(layers.rain_front.as_deref().unwrap().opacity(), 0.0);
        assert_eq!(layers.fog.as_deref().unwrap().opacity(), 0.0);
        assert!(layers.editor.is_none());
        assert!(layers.rain_back.is_none());
    }

    #[test]
    fn test_rain_layers_toggle_independently() {
        let mut layers = LayerSet {
            rain_back: Some(Box::new(Probe::default())),
            rain_front: Some(Box::new(Probe::default())),
            ..Default::default()
        };
        let v = resolve(0.0, LayerModes::default(), &cfg());
        let weather = Weather {
            rain_back: false,
            rain_front: true,
            fog: false,
        };
        apply(&v, weather, &mut layers);
        assert_eq!(layers.rain_back.as_deref().unwrap().opacity(), 0.0);
        assert_eq!(layers.rain_front.as_deref().unwrap().opacity(), 1.0);
    }

    #[test]
    fn test_editor_depth_orders_rain() {
        assert_eq!(
            EditorDepth::Behind.draw_order(),
            [Stage::Editor, Stage::RainBack, Stage::RainFront]
        );
        assert_eq!(
            EditorDepth::Between.draw_order(),
            [Stage::RainBack, Stage::Editor, Stage::RainFront]
        );
        assert_eq!(
            EditorDepth::Front.draw_order(),
            [Stage::RainBack, Stage::RainFront, Stage::Editor]
        );
    }

    #[test]
    fn test_editor_depth_adjust_clamps() {
        assert_eq!(EditorDepth::default(), EditorDepth::Between);
        assert_eq!(EditorDepth::Between.adjust(1), EditorDepth::Front);
        assert_eq!(EditorDepth::Front.adjust(1), EditorDepth::Front);
        assert_eq!(EditorDepth::Behind.adjust(-1), EditorDepth::Behind);
        assert_eq!(EditorDepth::from_level(7), EditorDepth::Front);
    }
}
