//! xkb keyboard state tracking (§4.6).
//!
//! Wraps an xkb context/keymap/state triple and the modifier quadruple
//! (depressed, latched, locked, effective group) that the gateway needs
//! to send `wl_keyboard.modifiers` whenever a key event changes them.
//!
//! Austin Shafer - 2020

use crate::config::EngineConfig;
use xkbcommon::xkb;

/// The serialized modifier quadruple sent on `wl_keyboard.modifiers`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct ModifierState {
    pub depressed: u32,
    pub latched: u32,
    pub locked: u32,
    pub group: u32,
}

pub struct KeyboardState {
    _xkb_ctx: xkb::Context,
    _xkb_keymap: xkb::Keymap,
    /// The keymap serialized as a string, shared with clients via the
    /// `(format, size, fd)` keymap handoff (§4.6/§6).
    pub keymap_as_string: String,
    xkb_state: xkb::State,
    mods: ModifierState,
}

impl KeyboardState {
    /// Build an empty keyboard state and immediately initialize it
    /// with the configured keymap (default `evdev`/`pc105`/`us`, §4.6).
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);
        let keymap = xkb::Keymap::new_from_names(
            &context,
            &config.xkb_rules,
            &config.xkb_model,
            &config.xkb_layout,
            &config.xkb_variant,
            if config.xkb_options.is_empty() {
                None
            } else {
                Some(config.xkb_options.clone())
            },
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        )
        .ok_or_else(|| anyhow::anyhow!("xkbcommon could not compile the configured keymap"))?;

        let keymap_as_string = keymap.get_as_string(xkb::KEYMAP_FORMAT_TEXT_V1);
        let state = xkb::State::new(&keymap);

        Ok(KeyboardState {
            _xkb_ctx: context,
            _xkb_keymap: keymap,
            keymap_as_string,
            xkb_state: state,
            mods: ModifierState::default(),
        })
    }

    /// Update xkb state for one key event and return the modifier
    /// quadruple both before and after the update, per §4.4: the
    /// gateway only sends `wl_keyboard.modifiers` when they differ.
    ///
    /// `keycode` is the evdev keycode as received from the input
    /// layer; xkb expects X11 keycodes, which are offset by 8 (§4.6).
    pub fn update_key(&mut self, keycode: u32, pressed: bool) -> (ModifierState, ModifierState) {
        let before = self.mods;

        let direction = if pressed {
            xkb::KeyDirection::Down
        } else {
            xkb::KeyDirection::Up
        };
        let changed = self.xkb_state.update_key(keycode + 8, direction);

        if changed != 0 {
            self.mods = ModifierState {
                depressed: self.xkb_state.serialize_mods(xkb::STATE_MODS_DEPRESSED),
                latched: self.xkb_state.serialize_mods(xkb::STATE_MODS_LATCHED),
                locked: self.xkb_state.serialize_mods(xkb::STATE_MODS_LOCKED),
                group: self.xkb_state.serialize_layout(xkb::STATE_LAYOUT_LOCKED),
            };
        }

        (before, self.mods)
    }

    pub fn current_mods(&self) -> ModifierState {
        self.mods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializes_with_configured_keymap() {
        let cfg = EngineConfig::default();
        let state = KeyboardState::new(&cfg).expect("keymap should compile");
        assert!(!state.keymap_as_string.is_empty());
    }

    #[test]
    fn unmodified_key_reports_no_mod_change() {
        let cfg = EngineConfig::default();
        let mut state = KeyboardState::new(&cfg).expect("keymap should compile");
        // KEY_A (30) is not a modifier, so pressing/releasing it should
        // not change the serialized modifier quadruple.
        let (before, after) = state.update_key(30, true);
        assert_eq!(before, after);
    }
}
