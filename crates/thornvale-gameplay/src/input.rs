//! Intent snapshots consumed by the player state machine.
//!
//! Raw device polling lives outside the core. A device layer reports which
//! controls are held each tick ([`RawControls`]); [`IntentTracker`] turns that
//! into edge-triggered [`Intent`]s. Tests and the headless runner feed intents
//! directly through an [`IntentSource`].

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One tick of player intent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Intent {
    /// Horizontal movement axis in [-1, 1]
    pub move_axis: f32,
    /// Jump pressed this tick
    pub jump_pressed: bool,
    /// Jump held (variable jump height)
    pub jump_held: bool,
    /// Dash pressed this tick
    pub dash_pressed: bool,
    /// Main attack pressed this tick
    pub attack_pressed: bool,
    /// Interact pressed this tick
    pub interact_pressed: bool,
    /// Drink potion pressed this tick
    pub heal_pressed: bool,
}

impl Intent {
    /// No input.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// Holds a movement direction.
    #[must_use]
    pub fn moving(axis: f32) -> Self {
        Self::default().with_move(axis)
    }

    /// Sets the movement axis, clamped to [-1, 1].
    #[must_use]
    pub fn with_move(mut self, axis: f32) -> Self {
        self.move_axis = if axis.is_finite() { axis.clamp(-1.0, 1.0) } else { 0.0 };
        self
    }

    /// Presses (and holds) jump.
    #[must_use]
    pub fn with_jump(mut self) -> Self {
        self.jump_pressed = true;
        self.jump_held = true;
        self
    }

    /// Holds jump without a fresh press.
    #[must_use]
    pub fn holding_jump(mut self) -> Self {
        self.jump_held = true;
        self
    }

    /// Presses dash.
    #[must_use]
    pub fn with_dash(mut self) -> Self {
        self.dash_pressed = true;
        self
    }

    /// Presses attack.
    #[must_use]
    pub fn with_attack(mut self) -> Self {
        self.attack_pressed = true;
        self
    }

    /// Presses interact.
    #[must_use]
    pub fn with_interact(mut self) -> Self {
        self.interact_pressed = true;
        self
    }

    /// Presses heal.
    #[must_use]
    pub fn with_heal(mut self) -> Self {
        self.heal_pressed = true;
        self
    }

    /// Sign of the movement axis, zero inside the dead zone.
    #[must_use]
    pub fn move_sign(&self) -> f32 {
        if self.move_axis > AXIS_DEAD_ZONE {
            1.0
        } else if self.move_axis < -AXIS_DEAD_ZONE {
            -1.0
        } else {
            0.0
        }
    }
}

/// Axis magnitude below which input counts as neutral.
pub const AXIS_DEAD_ZONE: f32 = 0.1;

/// State of a single digital control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ButtonState {
    /// Whether the button is currently held down
    pub pressed: bool,
    /// Whether the button was just pressed this tick
    pub just_pressed: bool,
    /// Whether the button was just released this tick
    pub just_released: bool,
}

impl ButtonState {
    /// Create a new button state (not pressed).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pressed: false,
            just_pressed: false,
            just_released: false,
        }
    }

    /// Update the button state based on whether it's currently held.
    pub fn update(&mut self, is_pressed: bool) {
        self.just_pressed = is_pressed && !self.pressed;
        self.just_released = !is_pressed && self.pressed;
        self.pressed = is_pressed;
    }

    /// Clear the tick-specific state (just_pressed, just_released).
    pub fn clear_frame(&mut self) {
        self.just_pressed = false;
        self.just_released = false;
    }
}

/// Held state of every control for one tick, as reported by a device layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawControls {
    /// Horizontal axis in [-1, 1]
    pub axis: f32,
    /// Jump held
    pub jump: bool,
    /// Dash held
    pub dash: bool,
    /// Attack held
    pub attack: bool,
    /// Interact held
    pub interact: bool,
    /// Heal held
    pub heal: bool,
}

/// Converts held controls into edge-triggered intents.
#[derive(Debug, Clone, Default)]
pub struct IntentTracker {
    jump: ButtonState,
    dash: ButtonState,
    attack: ButtonState,
    interact: ButtonState,
    heal: ButtonState,
}

impl IntentTracker {
    /// Creates a tracker with nothing held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one tick of held controls and returns the resulting intent.
    pub fn update(&mut self, raw: &RawControls) -> Intent {
        self.jump.update(raw.jump);
        self.dash.update(raw.dash);
        self.attack.update(raw.attack);
        self.interact.update(raw.interact);
        self.heal.update(raw.heal);

        Intent {
            move_axis: 0.0,
            jump_pressed: self.jump.just_pressed,
            jump_held: self.jump.pressed,
            dash_pressed: self.dash.just_pressed,
            attack_pressed: self.attack.just_pressed,
            interact_pressed: self.interact.just_pressed,
            heal_pressed: self.heal.just_pressed,
        }
        .with_move(raw.axis)
    }

    /// Forgets edges, e.g. when input is suspended for a pause.
    pub fn clear_frame(&mut self) {
        for button in [
            &mut self.jump,
            &mut self.dash,
            &mut self.attack,
            &mut self.interact,
            &mut self.heal,
        ] {
            button.clear_frame();
        }
    }
}

/// Supplies one intent per tick.
pub trait IntentSource {
    /// Returns the intent for the next tick.
    fn next_intent(&mut self) -> Intent;
}

/// Plays back a fixed list of intents, then idles.
#[derive(Debug, Clone, Default)]
pub struct ScriptedIntents {
    queue: VecDeque<Intent>,
}

impl ScriptedIntents {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `intent` repeated for `ticks` ticks.
    #[must_use]
    pub fn then(mut self, intent: Intent, ticks: usize) -> Self {
        self.queue.extend(std::iter::repeat(intent).take(ticks));
        self
    }

    /// Remaining scripted ticks.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl IntentSource for ScriptedIntents {
    fn next_intent(&mut self) -> Intent {
        self.queue.pop_front().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_state_edges() {
        let mut button = ButtonState::new();
        button.update(true);
        assert!(button.pressed && button.just_pressed);
        button.update(true);
        assert!(button.pressed && !button.just_pressed);
        button.update(false);
        assert!(button.just_released);
    }

    #[test]
    fn test_tracker_produces_single_press() {
        let mut tracker = IntentTracker::new();
        let held = RawControls {
            jump: true,
            axis: 2.0,
            ..RawControls::default()
        };

        let first = tracker.update(&held);
        assert!(first.jump_pressed && first.jump_held);
        assert_eq!(first.move_axis, 1.0);

        let second = tracker.update(&held);
        assert!(!second.jump_pressed && second.jump_held);
    }

    #[test]
    fn test_move_sign_dead_zone() {
        assert_eq!(Intent::moving(0.05).move_sign(), 0.0);
        assert_eq!(Intent::moving(-0.5).move_sign(), -1.0);
        assert_eq!(Intent::moving(f32::NAN).move_axis, 0.0);
    }

    #[test]
    fn test_scripted_intents_then_idle() {
        let mut script = ScriptedIntents::new()
            .then(Intent::moving(1.0), 2)
            .then(Intent::idle().with_jump(), 1);
        assert_eq!(script.remaining(), 3);
        assert_eq!(script.next_intent().move_axis, 1.0);
        assert_eq!(script.next_intent().move_axis, 1.0);
        assert!(script.next_intent().jump_pressed);
        assert_eq!(script.next_intent(), Intent::idle());
    }
}
