#[cfg(feature = "wayland")]
pub mod wayland;

#[cfg(feature = "x11")]
pub mod x11;

// Modifiers we try to "unstick" when a session aborts mid-run. The session
// only ever holds Shift, but releasing the rest costs nothing and a previous
// aborted run may have left any of them down.
#[allow(dead_code)]
pub(crate) const COMMON_MODIFIER_KEYCODES: [u32; 6] = [
    crate::keyboard::KEY_LEFTSHIFT,
    crate::keyboard::KEY_RIGHTSHIFT,
    crate::keyboard::KEY_LEFTCTRL,
    crate::keyboard::KEY_RIGHTCTRL,
    crate::keyboard::KEY_LEFTALT,
    crate::keyboard::KEY_RIGHTALT,
];

#[cfg(test)]
mod tests {
    use super::COMMON_MODIFIER_KEYCODES;

    #[test]
    fn common_modifier_list_contains_expected_keys() {
        assert!(COMMON_MODIFIER_KEYCODES.contains(&crate::keyboard::KEY_LEFTSHIFT));
        assert!(COMMON_MODIFIER_KEYCODES.contains(&crate::keyboard::KEY_RIGHTSHIFT));
        assert!(COMMON_MODIFIER_KEYCODES.contains(&crate::keyboard::KEY_LEFTCTRL));
        assert!(COMMON_MODIFIER_KEYCODES.contains(&crate::keyboard::KEY_RIGHTCTRL));
        assert!(COMMON_MODIFIER_KEYCODES.contains(&crate::keyboard::KEY_LEFTALT));
        assert!(COMMON_MODIFIER_KEYCODES.contains(&crate::keyboard::KEY_RIGHTALT));
    }
}
