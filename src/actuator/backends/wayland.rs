use std::collections::HashMap;
use std::io::Write;
use std::os::fd::{AsFd, FromRawFd, IntoRawFd, OwnedFd};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use memfd::MemfdOptions;
use wayland_client::globals::{registry_queue_init, GlobalListContents};
use wayland_client::protocol::{wl_registry, wl_seat};
use wayland_client::{Connection, Dispatch, EventQueue, Proxy, QueueHandle};
use xkbcommon::xkb;

use crate::actuator::{KeyActuator, KeyState};
use crate::keyboard::{KEY_LEFTCTRL, KEY_LEFTSHIFT, KEY_RIGHTCTRL, KEY_RIGHTSHIFT};
use crate::protocols::virtual_keyboard_unstable_v1::zwp_virtual_keyboard_manager_v1::ZwpVirtualKeyboardManagerV1;
use crate::protocols::virtual_keyboard_unstable_v1::zwp_virtual_keyboard_v1::ZwpVirtualKeyboardV1;

const KEYMAP_FORMAT_XKB_V1: u32 = 1;

#[derive(Debug, Clone)]
struct SeatData {
    global_name: u32,
}

#[derive(Debug, Default)]
struct State {
    seat_names_by_global: HashMap<u32, String>,
}

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for State {
    fn event(
        _state: &mut Self,
        _proxy: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<wl_seat::WlSeat, SeatData> for State {
    fn event(
        state: &mut Self,
        _proxy: &wl_seat::WlSeat,
        event: wl_seat::Event,
        data: &SeatData,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Name { name } = event {
            state.seat_names_by_global.insert(data.global_name, name);
        }
    }
}

impl Dispatch<ZwpVirtualKeyboardManagerV1, ()> for State {
    fn event(
        _state: &mut Self,
        _proxy: &ZwpVirtualKeyboardManagerV1,
        _event: <ZwpVirtualKeyboardManagerV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<ZwpVirtualKeyboardV1, ()> for State {
    fn event(
        _state: &mut Self,
        _proxy: &ZwpVirtualKeyboardV1,
        _event: <ZwpVirtualKeyboardV1 as Proxy>::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
    }
}

fn key_state_to_u32(state: KeyState) -> u32 {
    match state {
        KeyState::Released => 0,
        KeyState::Pressed => 1,
    }
}

struct UsKeymap {
    keymap: String,
    shift_mask: u32,
    ctrl_mask: u32,
}

fn us_qwerty_keymap() -> Result<UsKeymap> {
    let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);

    let keymap = xkb::Keymap::new_from_names(
        &context,
        "evdev",
        "pc105",
        "us",
        "",
        None,
        xkb::KEYMAP_COMPILE_NO_FLAGS,
    )
    .ok_or_else(|| anyhow!("failed to build xkb keymap for us/pc105"))?;

    let keymap_str = keymap.get_as_string(xkb::KEYMAP_FORMAT_TEXT_V1);

    let shift_index = keymap.mod_get_index(xkb::MOD_NAME_SHIFT);
    if shift_index == xkb::MOD_INVALID {
        return Err(anyhow!("xkb keymap missing Shift modifier"));
    }

    let ctrl_index = keymap.mod_get_index(xkb::MOD_NAME_CTRL);
    if ctrl_index == xkb::MOD_INVALID {
        return Err(anyhow!("xkb keymap missing Control modifier"));
    }

    let shift_mask = 1u32
        .checked_shl(shift_index)
        .ok_or_else(|| anyhow!("Shift modifier index out of range"))?;
    let ctrl_mask = 1u32
        .checked_shl(ctrl_index)
        .ok_or_else(|| anyhow!("Control modifier index out of range"))?;

    Ok(UsKeymap {
        keymap: keymap_str,
        shift_mask,
        ctrl_mask,
    })
}

fn make_keymap_fd(keymap: &str) -> Result<(OwnedFd, u32)> {
    let memfd = MemfdOptions::default()
        .allow_sealing(true)
        .create("typist-xkb-keymap")
        .context("failed to create memfd for keymap")?;

    let mut file = memfd.as_file();
    file.write_all(keymap.as_bytes())?;
    file.write_all(&[0])?;

    let size = (keymap.as_bytes().len() + 1)
        .try_into()
        .map_err(|_| anyhow!("keymap too large"))?;

    let raw_fd = memfd.into_file().into_raw_fd();
    let owned_fd = unsafe { OwnedFd::from_raw_fd(raw_fd) };

    Ok((owned_fd, size))
}

/// Keystroke injection through `zwp_virtual_keyboard_v1` (wlroots
/// compositors). Uploads a US xkb keymap and mirrors modifier key events into
/// explicit modifier-state updates, which the protocol requires.
#[derive(Debug)]
pub struct WaylandActuator {
    conn: Connection,
    _queue: EventQueue<State>,
    keyboard: ZwpVirtualKeyboardV1,
    started: Instant,
    shift_mask: u32,
    ctrl_mask: u32,
    mods_depressed: u32,
}

impl WaylandActuator {
    pub fn connect(seat_name: Option<&str>) -> Result<Self> {
        let conn = Connection::connect_to_env().context("failed to connect to Wayland")?;
        let (globals, mut event_queue) =
            registry_queue_init(&conn).context("failed to init Wayland registry")?;
        let qh = event_queue.handle();
        let mut state = State::default();

        let manager: ZwpVirtualKeyboardManagerV1 = globals.bind(&qh, 1..=1, ()).context(
            "zwp_virtual_keyboard_manager_v1 not available (is sway/wlroots exposing it?)",
        )?;

        let seat_globals: Vec<_> = globals
            .contents()
            .clone_list()
            .into_iter()
            .filter(|g| g.interface == wl_seat::WlSeat::interface().name)
            .collect();

        if seat_globals.is_empty() {
            return Err(anyhow!("wl_seat not available (no seats advertised)"));
        }

        let seat: wl_seat::WlSeat = match seat_name {
            Some(requested) => {
                let mut seats = Vec::with_capacity(seat_globals.len());
                for g in seat_globals.iter() {
                    let version = g.version.min(7);
                    let seat: wl_seat::WlSeat = globals.registry().bind(
                        g.name,
                        version,
                        &qh,
                        SeatData {
                            global_name: g.name,
                        },
                    );
                    seats.push((g.name, seat));
                }

                event_queue
                    .roundtrip(&mut state)
                    .context("Wayland roundtrip (seat discovery) failed")?;

                if let Some(seat) = seats.iter().find_map(|(global_name, seat)| {
                    state
                        .seat_names_by_global
                        .get(global_name)
                        .filter(|n| n.as_str() == requested)
                        .map(|_| seat.clone())
                }) {
                    seat
                } else {
                    let mut names = state
                        .seat_names_by_global
                        .values()
                        .cloned()
                        .collect::<Vec<_>>();
                    names.sort();
                    names.dedup();

                    if names.is_empty() {
                        return Err(anyhow!(
                            "requested seat {requested:?}, but compositor did not advertise any wl_seat.name values (requires wl_seat v2+)"
                        ));
                    }

                    return Err(anyhow!(
                        "requested seat {requested:?} not found; available seats: {}",
                        names.join(", ")
                    ));
                }
            }
            None => {
                let g = &seat_globals[0];
                let version = g.version.min(7);
                globals.registry().bind(
                    g.name,
                    version,
                    &qh,
                    SeatData {
                        global_name: g.name,
                    },
                )
            }
        };

        let keyboard: ZwpVirtualKeyboardV1 = manager.create_virtual_keyboard(&seat, &qh, ());

        event_queue
            .roundtrip(&mut state)
            .context("Wayland roundtrip failed")?;

        let us = us_qwerty_keymap()?;
        let (keymap_fd, keymap_size) = make_keymap_fd(&us.keymap)?;
        keyboard.keymap(KEYMAP_FORMAT_XKB_V1, keymap_fd.as_fd(), keymap_size);

        // Start compositor and clients from a neutral modifier state.
        keyboard.modifiers(0, 0, 0, 0);
        conn.flush().context("Wayland flush failed")?;

        Ok(Self {
            conn,
            _queue: event_queue,
            keyboard,
            started: Instant::now(),
            shift_mask: us.shift_mask,
            ctrl_mask: us.ctrl_mask,
            mods_depressed: 0,
        })
    }

    fn time_ms(&self) -> u32 {
        self.started.elapsed().as_millis().try_into().unwrap_or(u32::MAX)
    }

    fn modifier_mask(&self, keycode: u32) -> Option<u32> {
        match keycode {
            KEY_LEFTSHIFT | KEY_RIGHTSHIFT => Some(self.shift_mask),
            KEY_LEFTCTRL | KEY_RIGHTCTRL => Some(self.ctrl_mask),
            _ => None,
        }
    }

    fn send_key(&mut self, keycode: u32, state: KeyState) -> Result<()> {
        self.keyboard
            .key(self.time_ms(), keycode, key_state_to_u32(state));

        if let Some(mask) = self.modifier_mask(keycode) {
            match state {
                KeyState::Pressed => self.mods_depressed |= mask,
                KeyState::Released => self.mods_depressed &= !mask,
            }
            self.keyboard.modifiers(self.mods_depressed, 0, 0, 0);
        }

        self.conn
            .flush()
            .with_context(|| format!("Wayland flush failed (keycode={keycode} state={state:?})"))
    }

    fn release_modifiers_best_effort(&mut self) {
        self.mods_depressed = 0;
        self.keyboard.modifiers(0, 0, 0, 0);

        // Releases may be sent for keys that are not down; harmless, and it
        // avoids leaving a stuck modifier after an aborted run.
        let time_ms = self.time_ms();
        for keycode in super::COMMON_MODIFIER_KEYCODES {
            self.keyboard.key(time_ms, keycode, 0);
        }
        let _ = self.conn.flush();
    }
}

impl KeyActuator for WaylandActuator {
    fn press_key(&mut self, keycode: u32) -> Result<()> {
        self.send_key(keycode, KeyState::Pressed)
    }

    fn release_key(&mut self, keycode: u32) -> Result<()> {
        self.send_key(keycode, KeyState::Released)
    }

    fn reset(&mut self) {
        self.release_modifiers_best_effort();
    }
}
