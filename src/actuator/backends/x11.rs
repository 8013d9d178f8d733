use anyhow::{anyhow, Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::xtest::{self, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;

use crate::actuator::{KeyActuator, KeyState};

/// Keystroke injection through the XTEST extension.
///
/// Requires a US keyboard layout on the X server; the session's keystroke
/// table assumes it, so a mismatched layout would silently type the wrong
/// characters.
#[derive(Debug)]
pub struct X11Actuator {
    conn: RustConnection,
    root: xproto::Window,
}

fn evdev_to_x11_keycode(evdev_keycode: u32) -> Result<u8> {
    // On most Linux Xorg setups, X11 keycodes are evdev + 8.
    let x11 = evdev_keycode
        .checked_add(8)
        .ok_or_else(|| anyhow!("evdev keycode overflow"))?;
    u8::try_from(x11).map_err(|_| anyhow!("evdev keycode {evdev_keycode} out of range for X11"))
}

fn key_state_to_x11_event_type(state: KeyState) -> u8 {
    match state {
        KeyState::Pressed => xproto::KEY_PRESS_EVENT,
        KeyState::Released => xproto::KEY_RELEASE_EVENT,
    }
}

fn query_xtest(conn: &impl Connection) -> Result<()> {
    let ext = conn
        .extension_information(xtest::X11_EXTENSION_NAME)
        .context("failed to query X11 extension info")?;

    if ext.is_none() {
        return Err(anyhow!(
            "X11 backend requires the XTEST extension (not present on this X server)"
        ));
    }

    // Version probe; a failure here still counts as unsupported.
    let _ = conn
        .xtest_get_version(2, 2)
        .ok()
        .and_then(|cookie| cookie.reply().ok());

    Ok(())
}

fn latin1_keysym(c: char) -> xproto::Keysym {
    // For Latin-1, X11 keysyms match the character code.
    c as u32
}

fn validate_us_keymap(conn: &impl Connection) -> Result<()> {
    // Spot-check representative keys: index 0 is the unshifted keysym,
    // index 1 the shifted one.
    let checks: &[(u32, xproto::Keysym, xproto::Keysym)] = &[
        (crate::keyboard::KEY_A, latin1_keysym('a'), latin1_keysym('A')),
        (crate::keyboard::KEY_Q, latin1_keysym('q'), latin1_keysym('Q')),
        (crate::keyboard::KEY_1, latin1_keysym('1'), latin1_keysym('!')),
        (
            crate::keyboard::KEY_SEMICOLON,
            latin1_keysym(';'),
            latin1_keysym(':'),
        ),
        (
            crate::keyboard::KEY_APOSTROPHE,
            latin1_keysym('\''),
            latin1_keysym('"'),
        ),
    ];

    for (evdev, unshifted, shifted) in checks {
        let keycode = evdev_to_x11_keycode(*evdev)?;
        let reply = conn
            .get_keyboard_mapping(keycode, 1)
            .context("failed to request keyboard mapping")?
            .reply()
            .context("failed to read keyboard mapping")?;

        if reply.keysyms_per_keycode == 0 {
            return Err(anyhow!("X server returned 0 keysyms per keycode"));
        }

        let got0 = reply.keysyms.first().copied().unwrap_or(x11rb::NO_SYMBOL);
        let got1 = reply.keysyms.get(1).copied().unwrap_or(x11rb::NO_SYMBOL);

        if got0 == x11rb::NO_SYMBOL || got1 == x11rb::NO_SYMBOL {
            return Err(anyhow!(
                "X11 backend could not validate the server keymap (keycode {keycode} returned NoSymbol). This backend assumes X11 keycodes are evdev+8 and requires a US keymap."
            ));
        }

        if got0 != *unshifted || got1 != *shifted {
            return Err(anyhow!(
                "X11 backend requires a US keyboard layout, but the server keymap does not match (keycode {keycode}: got {got0:#x}/{got1:#x}). Try `setxkbmap us`."
            ));
        }
    }

    Ok(())
}

impl X11Actuator {
    /// Connect to the X server and verify XTEST and the keymap up front, so
    /// a missing dependency surfaces before any countdown starts.
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("failed to connect to X11")?;
        query_xtest(&conn)?;
        validate_us_keymap(&conn)?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| anyhow!("invalid X11 screen index"))?
            .root;

        Ok(Self { conn, root })
    }

    fn send_key(&self, keycode: u32, state: KeyState) -> Result<()> {
        let x11_keycode = evdev_to_x11_keycode(keycode)?;
        self.conn
            .xtest_fake_input(
                key_state_to_x11_event_type(state),
                x11_keycode,
                x11rb::CURRENT_TIME,
                self.root,
                0,
                0,
                0,
            )
            .context("failed to send XTEST fake input")?;
        self.conn.flush().context("failed to flush X11 connection")?;
        Ok(())
    }

    fn release_modifiers_best_effort(&self) {
        // Releases may be sent for keys that are not down; that is harmless
        // and avoids leaving a stuck modifier after an aborted run.
        for keycode in super::COMMON_MODIFIER_KEYCODES {
            if let Ok(code) = evdev_to_x11_keycode(keycode) {
                let _ = self.conn.xtest_fake_input(
                    xproto::KEY_RELEASE_EVENT,
                    code,
                    x11rb::CURRENT_TIME,
                    self.root,
                    0,
                    0,
                    0,
                );
            }
        }
        let _ = self.conn.flush();
    }
}

impl KeyActuator for X11Actuator {
    fn press_key(&mut self, keycode: u32) -> Result<()> {
        self.send_key(keycode, KeyState::Pressed)
    }

    fn release_key(&mut self, keycode: u32) -> Result<()> {
        self.send_key(keycode, KeyState::Released)
    }

    fn prepare(&mut self) -> Result<()> {
        // Require explicit input focus so keystrokes land in the window the
        // user picked during the countdown, not wherever the pointer sits.
        let focus = self
            .conn
            .get_input_focus()
            .context("failed to request input focus")?
            .reply()
            .context("failed to read input focus reply")?;

        // X11 special focus value: PointerRoot means focus follows the pointer.
        const POINTER_ROOT: xproto::Window = 1;
        if focus.focus == x11rb::NONE {
            return Err(anyhow!(
                "no X11 input focus detected; click into the target window before typing starts"
            ));
        }
        if focus.focus == POINTER_ROOT {
            return Err(anyhow!(
                "X11 input focus is set to PointerRoot; click into the target window to give it explicit focus"
            ));
        }

        // Start from a neutral modifier state in case a previous run aborted.
        self.release_modifiers_best_effort();
        Ok(())
    }

    fn reset(&mut self) {
        self.release_modifiers_best_effort();
    }
}
