//! Keysym lookup and key bindings

use crate::selection::KeyAction;
use crate::OverlayResult;
use std::collections::HashMap;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, Keycode, Keysym};

pub mod keysym {
    use x11rb::protocol::xproto::Keysym;

    pub const RETURN: Keysym = 0xff0d;
    pub const KP_ENTER: Keysym = 0xff8d;
    pub const ESCAPE: Keysym = 0xff1b;
    pub const Q: Keysym = 0x0071;
    pub const S: Keysym = 0x0073;
    pub const W: Keysym = 0x0077;
}

/// Which key triggers which session command
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: HashMap<Keysym, KeyAction>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut bindings = HashMap::new();
        bindings.insert(keysym::RETURN, KeyAction::Confirm);
        bindings.insert(keysym::KP_ENTER, KeyAction::Confirm);
        bindings.insert(keysym::ESCAPE, KeyAction::Cancel);
        bindings.insert(keysym::Q, KeyAction::Cancel);
        bindings.insert(keysym::W, KeyAction::Window);
        bindings.insert(keysym::S, KeyAction::Screen);
        Self { bindings }
    }
}

impl KeyBindings {
    pub fn action_for(&self, sym: Keysym) -> Option<KeyAction> {
        self.bindings.get(&sym).copied()
    }
}

/// Snapshot of the server's keycode to keysym table
#[derive(Debug, Clone)]
pub struct KeyboardMap {
    min_keycode: Keycode,
    keysyms_per_keycode: usize,
    keysyms: Vec<Keysym>,
}

impl KeyboardMap {
    pub fn new(min_keycode: Keycode, keysyms_per_keycode: u8, keysyms: Vec<Keysym>) -> Self {
        Self {
            min_keycode,
            keysyms_per_keycode: usize::from(keysyms_per_keycode),
            keysyms,
        }
    }

    pub fn query<C: Connection>(conn: &C) -> OverlayResult<Self> {
        let setup = conn.setup();
        let count = setup.max_keycode - setup.min_keycode + 1;
        let reply = conn.get_keyboard_mapping(setup.min_keycode, count)?.reply()?;
        Ok(Self::new(setup.min_keycode, reply.keysyms_per_keycode, reply.keysyms))
    }

    /// Unshifted keysym of `keycode`.
    pub fn keysym(&self, keycode: Keycode) -> Option<Keysym> {
        if keycode < self.min_keycode || self.keysyms_per_keycode == 0 {
            return None;
        }
        let index = usize::from(keycode - self.min_keycode) * self.keysyms_per_keycode;
        self.keysyms.get(index).copied().filter(|&sym| sym != 0)
    }
}
