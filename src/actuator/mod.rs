pub mod backends;

use anyhow::{anyhow, ensure, Result};

use crate::keyboard::{char_to_keystroke, KEY_BACKSPACE, KEY_ENTER, KEY_LEFTSHIFT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// The keystroke-injection capability the typing session drives.
///
/// Implementations press and release physical keys by evdev keycode; the
/// provided methods build characters and the named special keys on top of
/// that. Any error is fatal to the running session.
pub trait KeyActuator: Send + std::fmt::Debug {
    fn press_key(&mut self, keycode: u32) -> Result<()>;
    fn release_key(&mut self, keycode: u32) -> Result<()>;

    /// Last check before the first keystroke, after the countdown has given
    /// the user time to focus the target window.
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    /// Best-effort cleanup when a session aborts (e.g. release modifiers that
    /// would otherwise stay stuck in the target). Must not fail.
    fn reset(&mut self) {}

    fn tap_key(&mut self, keycode: u32) -> Result<()> {
        self.press_key(keycode)?;
        self.release_key(keycode)
    }

    /// Type one character, holding Shift for uppercase and shifted symbols.
    fn type_char(&mut self, c: char) -> Result<()> {
        let stroke = char_to_keystroke(c).ok_or_else(|| {
            anyhow!(
                "no US-QWERTY keystroke for character {c:?} (U+{:04X})",
                c as u32
            )
        })?;

        if stroke.shift {
            self.press_key(KEY_LEFTSHIFT)?;
            let tapped = self.tap_key(stroke.keycode);
            // Release Shift even if the tap failed, then surface the error.
            let released = self.release_key(KEY_LEFTSHIFT);
            tapped?;
            released
        } else {
            self.tap_key(stroke.keycode)
        }
    }

    fn backspace(&mut self) -> Result<()> {
        self.tap_key(KEY_BACKSPACE)
    }

    fn enter(&mut self) -> Result<()> {
        self.tap_key(KEY_ENTER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Auto,
    Wayland,
    X11,
}

fn env_is_set(name: &str) -> bool {
    std::env::var_os(name)
        .map(|v| !v.is_empty())
        .unwrap_or(false)
}

fn auto_backend() -> Backend {
    let wayland_env = env_is_set("WAYLAND_DISPLAY") || env_is_set("WAYLAND_SOCKET");
    let x11_env = env_is_set("DISPLAY");

    // Prefer Wayland if both are present (common in Wayland sessions with Xwayland).
    if wayland_env {
        if cfg!(feature = "wayland") {
            return Backend::Wayland;
        }

        // Wayland detected but compiled out: fall back to X11 when available,
        // otherwise keep Wayland so the caller gets a "detected but disabled"
        // error instead of a generic one.
        if cfg!(feature = "x11") && x11_env {
            return Backend::X11;
        }
        return Backend::Wayland;
    }

    if x11_env {
        return Backend::X11;
    }

    // Unknown/unsupported environment.
    Backend::Auto
}

fn environment_summary() -> String {
    let xdg_session_type = std::env::var("XDG_SESSION_TYPE").unwrap_or_default();

    let mut parts = Vec::new();
    if env_is_set("WAYLAND_DISPLAY") {
        parts.push("WAYLAND_DISPLAY is set".to_string());
    }
    if env_is_set("WAYLAND_SOCKET") {
        parts.push("WAYLAND_SOCKET is set".to_string());
    }
    if env_is_set("DISPLAY") {
        parts.push("DISPLAY is set".to_string());
    }
    if !xdg_session_type.is_empty() {
        parts.push(format!("XDG_SESSION_TYPE={xdg_session_type}"));
    }

    if parts.is_empty() {
        "No display session detected (expected Wayland or X11 environment variables).".to_string()
    } else {
        format!("Detected environment: {}", parts.join(", "))
    }
}

fn require_supported_backend(
    #[allow(unused_variables)] selected: Backend,
    resolved: Backend,
) -> Result<()> {
    match resolved {
        Backend::Wayland => {
            #[cfg(feature = "wayland")]
            {
                Ok(())
            }

            #[cfg(not(feature = "wayland"))]
            {
                let how = match selected {
                    Backend::Auto => "detected",
                    _ => "requested",
                };
                Err(anyhow!(
                    "Wayland backend {how} but is disabled in this build. (Rebuild with `--features wayland`.) {details}",
                    how = how,
                    details = environment_summary()
                ))
            }
        }
        Backend::X11 => {
            #[cfg(feature = "x11")]
            {
                Ok(())
            }

            #[cfg(not(feature = "x11"))]
            {
                let how = match selected {
                    Backend::Auto => "detected",
                    _ => "requested",
                };
                Err(anyhow!(
                    "X11 backend {how} but is disabled in this build. (Rebuild with `--features x11`.) {details}",
                    how = how,
                    details = environment_summary()
                ))
            }
        }
        Backend::Auto => {
            let mut forced = Vec::new();
            if cfg!(feature = "wayland") {
                forced.push("--backend wayland");
            }
            if cfg!(feature = "x11") {
                forced.push("--backend x11");
            }
            let hint = if forced.is_empty() {
                "This build has no injection backends enabled."
            } else if forced.len() == 1 {
                "Try passing the available backend flag to force it."
            } else {
                "Try forcing a backend."
            };

            Err(anyhow!(
                "No supported injection backend detected. {details}\n\
                 {hint} {}",
                forced.join(" or "),
                details = environment_summary(),
                hint = hint,
            ))
        }
    }
}

/// Resolve `Auto` against the runtime environment and verify the result is
/// compiled into this build.
pub fn resolve_backend(requested: Backend) -> Result<Backend> {
    let resolved = match requested {
        Backend::Auto => auto_backend(),
        other => other,
    };

    require_supported_backend(requested, resolved)?;
    Ok(resolved)
}

/// Resolve and connect the keystroke-injection backend.
///
/// Any failure here means the dependency is unavailable; it surfaces before
/// a countdown starts and before any key event is emitted.
pub fn connect(requested: Backend, seat_name: Option<&str>) -> Result<Box<dyn KeyActuator>> {
    if let Some(name) = seat_name {
        ensure!(!name.trim().is_empty(), "--seat must not be empty");
    }

    let resolved = resolve_backend(requested)?;

    if seat_name.is_some() && resolved == Backend::X11 {
        return Err(anyhow!("--seat is Wayland-only and is not supported on X11"));
    }

    match resolved {
        Backend::Wayland => {
            #[cfg(feature = "wayland")]
            {
                Ok(Box::new(backends::wayland::WaylandActuator::connect(
                    seat_name,
                )?))
            }

            #[cfg(not(feature = "wayland"))]
            {
                Err(anyhow!(
                    "Wayland backend is disabled in this build (rebuild with `--features wayland`)."
                ))
            }
        }
        Backend::X11 => {
            #[cfg(feature = "x11")]
            {
                Ok(Box::new(backends::x11::X11Actuator::connect()?))
            }

            #[cfg(not(feature = "x11"))]
            {
                Err(anyhow!(
                    "X11 backend is disabled in this build (rebuild with `--features x11`)."
                ))
            }
        }
        Backend::Auto => Err(anyhow!("no backend resolved")),
    }
}
