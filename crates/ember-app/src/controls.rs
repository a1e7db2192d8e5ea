//! Keyboard parameter panel.
//!
//! Physical key codes are bound to [`ParamAction`]s that nudge the shared
//! dissolve parameters. Every edit goes through the clamping setters on
//! [`ShadingParams`], so values stay inside the slider ranges.

use std::collections::HashMap;

use ember_materials::{ShadingParams, SharedShadingParams};
use glam::Vec3;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Process change per key press.
pub const PROCESS_STEP: f32 = 0.5;
/// Frequency change per key press.
pub const FREQUENCY_STEP: f32 = 0.05;
/// Strength change per key press.
pub const STRENGTH_STEP: f32 = 1.0;

/// Edge colors cycled by [`ParamAction::CycleEdgeColor`], linear RGB.
/// `#4d9bff`, `#ff6a00`, `#4dff88`, `#ff3df2`.
pub const EDGE_PALETTE: [Vec3; 4] = [
    Vec3::new(0.074_214, 0.327_778, 1.0),
    Vec3::new(1.0, 0.144_128, 0.0),
    Vec3::new(0.074_214, 1.0, 0.246_201),
    Vec3::new(1.0, 0.046_665, 0.887_923),
];

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum ParamAction {
    ProcessUp,
    ProcessDown,
    FrequencyUp,
    FrequencyDown,
    StrengthUp,
    StrengthDown,
    CycleEdgeColor,
    /// Restore the values the session started with.
    Reset,
}

impl ParamAction {
    /// Whether holding the key keeps applying the action.
    pub fn repeats(self) -> bool {
        !matches!(self, Self::CycleEdgeColor | Self::Reset)
    }
}

/// Key bindings plus the values to reset to.
pub struct ParamControls {
    bindings: HashMap<KeyCode, ParamAction>,
    initial: ShadingParams,
}

impl ParamControls {
    /// Default bindings; `initial` is what [`ParamAction::Reset`] restores.
    pub fn new(initial: ShadingParams) -> Self {
        Self {
            bindings: default_bindings(),
            initial,
        }
    }

    /// Bound action for a key, ignoring repeat rules.
    pub fn action_for(&self, key: KeyCode) -> Option<ParamAction> {
        self.bindings.get(&key).copied()
    }

    /// Map a winit key event to an action, honoring key repeat rules.
    pub fn resolve(&self, event: &KeyEvent) -> Option<ParamAction> {
        if event.state != ElementState::Pressed {
            return None;
        }
        let PhysicalKey::Code(code) = event.physical_key else {
            return None;
        };
        self.action_for(code)
            .filter(|action| !event.repeat || action.repeats())
    }

    /// Apply `action` to the shared parameters.
    pub fn apply(&self, params: &SharedShadingParams, action: ParamAction) {
        params.update(|p| apply_action(p, action, &self.initial));
        let p = params.snapshot();
        tracing::debug!(
            ?action,
            process = p.process,
            frequency = p.frequency,
            strength = p.strength,
            "Parameters edited"
        );
    }
}

/// Arrows for process and frequency, PageUp/PageDown for strength, `C`
/// cycles the edge color, `R` resets.
pub fn default_bindings() -> HashMap<KeyCode, ParamAction> {
    HashMap::from([
        (KeyCode::ArrowUp, ParamAction::ProcessUp),
        (KeyCode::ArrowDown, ParamAction::ProcessDown),
        (KeyCode::ArrowRight, ParamAction::FrequencyUp),
        (KeyCode::ArrowLeft, ParamAction::FrequencyDown),
        (KeyCode::PageUp, ParamAction::StrengthUp),
        (KeyCode::PageDown, ParamAction::StrengthDown),
        (KeyCode::KeyC, ParamAction::CycleEdgeColor),
        (KeyCode::KeyR, ParamAction::Reset),
    ])
}

/// Apply one action to `params`, clamping to the slider ranges.
pub fn apply_action(params: &mut ShadingParams, action: ParamAction, initial: &ShadingParams) {
    match action {
        ParamAction::ProcessUp => params.set_process(params.process + PROCESS_STEP),
        ParamAction::ProcessDown => params.set_process(params.process - PROCESS_STEP),
        ParamAction::FrequencyUp => params.set_frequency(params.frequency + FREQUENCY_STEP),
        ParamAction::FrequencyDown => params.set_frequency(params.frequency - FREQUENCY_STEP),
        ParamAction::StrengthUp => params.set_strength(params.strength + STRENGTH_STEP),
        ParamAction::StrengthDown => params.set_strength(params.strength - STRENGTH_STEP),
        ParamAction::CycleEdgeColor => params.edge_color = next_edge_color(params.edge_color),
        ParamAction::Reset => *params = *initial,
    }
}

/// The palette entry after `current`; colors outside the palette restart it.
pub fn next_edge_color(current: Vec3) -> Vec3 {
    let next = EDGE_PALETTE
        .iter()
        .position(|c| c.abs_diff_eq(current, 1e-4))
        .map_or(0, |i| (i + 1) % EDGE_PALETTE.len());
    EDGE_PALETTE[next]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_materials::{PROCESS_MAX, PROCESS_MIN};

    #[test]
    fn test_process_nudges_clamp_to_range() {
        let initial = ShadingParams::default();
        let mut params = ShadingParams {
            process: PROCESS_MAX - 0.1,
            ..initial
        };
        apply_action(&mut params, ParamAction::ProcessUp, &initial);
        assert_eq!(params.process, PROCESS_MAX);

        params.process = PROCESS_MIN + 0.1;
        apply_action(&mut params, ParamAction::ProcessDown, &initial);
        assert_eq!(params.process, PROCESS_MIN);
    }

    #[test]
    fn test_frequency_and_strength_clamp() {
        let initial = ShadingParams::default();
        let mut params = initial;
        for _ in 0..100 {
            apply_action(&mut params, ParamAction::FrequencyUp, &initial);
            apply_action(&mut params, ParamAction::StrengthDown, &initial);
        }
        assert_eq!(params.frequency, 1.0);
        assert_eq!(params.strength, 1.0);
    }

    #[test]
    fn test_edge_color_cycles_through_palette() {
        let mut color = EDGE_PALETTE[0];
        for expected in EDGE_PALETTE.iter().cycle().skip(1).take(EDGE_PALETTE.len()) {
            color = next_edge_color(color);
            assert_eq!(color, *expected);
        }
        assert_eq!(next_edge_color(Vec3::splat(0.5)), EDGE_PALETTE[0]);
    }

    #[test]
    fn test_reset_restores_initial() {
        let initial = ShadingParams::default();
        let mut params = initial;
        apply_action(&mut params, ParamAction::ProcessUp, &initial);
        apply_action(&mut params, ParamAction::CycleEdgeColor, &initial);
        apply_action(&mut params, ParamAction::Reset, &initial);
        assert_eq!(params, initial);
    }

    #[test]
    fn test_edits_reach_shared_handle() {
        let shared = SharedShadingParams::new(ShadingParams::default());
        let reader = shared.clone();
        let controls = ParamControls::new(shared.snapshot());
        controls.apply(&shared, ParamAction::ProcessUp);
        assert_eq!(reader.snapshot().process, PROCESS_STEP);
    }

    #[test]
    fn test_default_bindings() {
        let controls = ParamControls::new(ShadingParams::default());
        assert_eq!(controls.action_for(KeyCode::ArrowUp), Some(ParamAction::ProcessUp));
        assert_eq!(controls.action_for(KeyCode::KeyC), Some(ParamAction::CycleEdgeColor));
        assert_eq!(controls.action_for(KeyCode::KeyW), None);
        assert!(ParamAction::ProcessUp.repeats());
        assert!(!ParamAction::Reset.repeats());
    }
}
