use rand::Rng;

/// A physical key plus whether Shift must be held to produce the character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub keycode: u32,
    pub shift: bool,
}

// Linux evdev keycodes (see linux/input-event-codes.h)
pub const KEY_1: u32 = 2;
pub const KEY_2: u32 = 3;
pub const KEY_3: u32 = 4;
pub const KEY_4: u32 = 5;
pub const KEY_5: u32 = 6;
pub const KEY_6: u32 = 7;
pub const KEY_7: u32 = 8;
pub const KEY_8: u32 = 9;
pub const KEY_9: u32 = 10;
pub const KEY_0: u32 = 11;

pub const KEY_MINUS: u32 = 12;
pub const KEY_EQUAL: u32 = 13;
pub const KEY_BACKSPACE: u32 = 14;

pub const KEY_Q: u32 = 16;
pub const KEY_W: u32 = 17;
pub const KEY_E: u32 = 18;
pub const KEY_R: u32 = 19;
pub const KEY_T: u32 = 20;
pub const KEY_Y: u32 = 21;
pub const KEY_U: u32 = 22;
pub const KEY_I: u32 = 23;
pub const KEY_O: u32 = 24;
pub const KEY_P: u32 = 25;

pub const KEY_LEFTBRACE: u32 = 26;
pub const KEY_RIGHTBRACE: u32 = 27;
pub const KEY_ENTER: u32 = 28;

pub const KEY_LEFTCTRL: u32 = 29;

pub const KEY_A: u32 = 30;
pub const KEY_S: u32 = 31;
pub const KEY_D: u32 = 32;
pub const KEY_F: u32 = 33;
pub const KEY_G: u32 = 34;
pub const KEY_H: u32 = 35;
pub const KEY_J: u32 = 36;
pub const KEY_K: u32 = 37;
pub const KEY_L: u32 = 38;

pub const KEY_SEMICOLON: u32 = 39;
pub const KEY_APOSTROPHE: u32 = 40;
pub const KEY_GRAVE: u32 = 41;

pub const KEY_LEFTSHIFT: u32 = 42;

pub const KEY_BACKSLASH: u32 = 43;

pub const KEY_Z: u32 = 44;
pub const KEY_X: u32 = 45;
pub const KEY_C: u32 = 46;
pub const KEY_V: u32 = 47;
pub const KEY_B: u32 = 48;
pub const KEY_N: u32 = 49;
pub const KEY_M: u32 = 50;

pub const KEY_COMMA: u32 = 51;
pub const KEY_DOT: u32 = 52;
pub const KEY_SLASH: u32 = 53;

pub const KEY_RIGHTSHIFT: u32 = 54;

pub const KEY_LEFTALT: u32 = 56;
pub const KEY_SPACE: u32 = 57;

pub const KEY_RIGHTCTRL: u32 = 97;
pub const KEY_RIGHTALT: u32 = 100;

fn letter_keycode(lower: char) -> Option<u32> {
    let keycode = match lower {
        'a' => KEY_A,
        'b' => KEY_B,
        'c' => KEY_C,
        'd' => KEY_D,
        'e' => KEY_E,
        'f' => KEY_F,
        'g' => KEY_G,
        'h' => KEY_H,
        'i' => KEY_I,
        'j' => KEY_J,
        'k' => KEY_K,
        'l' => KEY_L,
        'm' => KEY_M,
        'n' => KEY_N,
        'o' => KEY_O,
        'p' => KEY_P,
        'q' => KEY_Q,
        'r' => KEY_R,
        's' => KEY_S,
        't' => KEY_T,
        'u' => KEY_U,
        'v' => KEY_V,
        'w' => KEY_W,
        'x' => KEY_X,
        'y' => KEY_Y,
        'z' => KEY_Z,
        _ => return None,
    };
    Some(keycode)
}

/// Map an output character to the US-QWERTY keystroke that produces it.
///
/// Covers printable ASCII, space, and newline (Enter). Everything else,
/// including tab and carriage return, is unsupported.
pub fn char_to_keystroke(c: char) -> Option<KeyStroke> {
    if c.is_ascii_alphabetic() {
        let keycode = letter_keycode(c.to_ascii_lowercase())?;
        return Some(KeyStroke {
            keycode,
            shift: c.is_ascii_uppercase(),
        });
    }

    let (keycode, shift) = match c {
        '1' => (KEY_1, false),
        '2' => (KEY_2, false),
        '3' => (KEY_3, false),
        '4' => (KEY_4, false),
        '5' => (KEY_5, false),
        '6' => (KEY_6, false),
        '7' => (KEY_7, false),
        '8' => (KEY_8, false),
        '9' => (KEY_9, false),
        '0' => (KEY_0, false),
        '!' => (KEY_1, true),
        '@' => (KEY_2, true),
        '#' => (KEY_3, true),
        '$' => (KEY_4, true),
        '%' => (KEY_5, true),
        '^' => (KEY_6, true),
        '&' => (KEY_7, true),
        '*' => (KEY_8, true),
        '(' => (KEY_9, true),
        ')' => (KEY_0, true),
        '-' => (KEY_MINUS, false),
        '_' => (KEY_MINUS, true),
        '=' => (KEY_EQUAL, false),
        '+' => (KEY_EQUAL, true),
        '[' => (KEY_LEFTBRACE, false),
        '{' => (KEY_LEFTBRACE, true),
        ']' => (KEY_RIGHTBRACE, false),
        '}' => (KEY_RIGHTBRACE, true),
        '\\' => (KEY_BACKSLASH, false),
        '|' => (KEY_BACKSLASH, true),
        ';' => (KEY_SEMICOLON, false),
        ':' => (KEY_SEMICOLON, true),
        '\'' => (KEY_APOSTROPHE, false),
        '"' => (KEY_APOSTROPHE, true),
        '`' => (KEY_GRAVE, false),
        '~' => (KEY_GRAVE, true),
        ',' => (KEY_COMMA, false),
        '<' => (KEY_COMMA, true),
        '.' => (KEY_DOT, false),
        '>' => (KEY_DOT, true),
        '/' => (KEY_SLASH, false),
        '?' => (KEY_SLASH, true),
        ' ' => (KEY_SPACE, false),
        '\n' => (KEY_ENTER, false),
        _ => return None,
    };
    Some(KeyStroke { keycode, shift })
}

/// Find the first character in `text` that has no US-QWERTY keystroke.
///
/// Used to fail fast before a session starts instead of stalling mid-run.
pub fn find_first_unsupported_char(text: &str) -> Option<(usize, char)> {
    text.char_indices()
        .find(|&(_idx, c)| char_to_keystroke(c).is_none())
}

/// Physical QWERTY neighbors for a key, keyed by the unshifted character.
///
/// Rows cover letters, the digit row, and the punctuation keys a typist's
/// fingers actually drift onto. An empty slice means no adjacency data.
pub fn qwerty_neighbors(c: char) -> &'static [char] {
    match c {
        'a' => &['q', 'w', 's', 'z'],
        'b' => &['v', 'g', 'h', 'n'],
        'c' => &['x', 'd', 'f', 'v'],
        'd' => &['e', 'r', 'f', 'c', 'x', 's'],
        'e' => &['w', 's', 'd', 'f', 'r'],
        'f' => &['r', 't', 'g', 'd', 'v', 'c'],
        'g' => &['t', 'y', 'f', 'h', 'v', 'b'],
        'h' => &['y', 'u', 'g', 'j', 'n', 'b'],
        'i' => &['u', 'j', 'k', 'o'],
        'j' => &['u', 'i', 'k', 'h', 'm'],
        'k' => &['i', 'j', 'o', 'l', 'm', ','],
        'l' => &['k', 'o', 'p', ';', '.'],
        'm' => &['n', 'j', ','],
        'n' => &['b', 'h', 'j', 'm'],
        'o' => &['i', 'k', 'l', 'p'],
        'p' => &['o', 'l', ';', '['],
        'q' => &['w', 'a', 's'],
        'r' => &['e', 'd', 'f', 'g', 't'],
        's' => &['a', 'q', 'w', 'z', 'e', 'd', 'x'],
        't' => &['r', 'f', 'g', 'y'],
        'u' => &['y', 'h', 'j', 'i'],
        'v' => &['c', 'f', 'g', 'b'],
        'w' => &['q', 'a', 's', 'e'],
        'x' => &['z', 's', 'd', 'c'],
        'y' => &['t', 'u', 'g', 'h'],
        'z' => &['a', 's', 'x'],
        '1' => &['2', 'q'],
        '2' => &['1', '3', 'w'],
        '3' => &['2', '4', 'e'],
        '4' => &['3', '5', 'r'],
        '5' => &['4', '6', 't'],
        '6' => &['5', '7', 'y'],
        '7' => &['6', '8', 'u'],
        '8' => &['7', '9', 'i'],
        '9' => &['8', '0', 'o'],
        '0' => &['9', 'p'],
        ',' => &['k', 'm', 'l', '.'],
        '.' => &[',', ';', 'l', '/'],
        ';' => &['l', ',', 'p', '.'],
        '\'' => &[';'],
        '-' => &['0', '='],
        '=' => &['-'],
        '/' => &['.', ';'],
        _ => &[],
    }
}

fn keep_case(src: char, neighbor: char) -> char {
    if src.is_uppercase() {
        neighbor.to_ascii_uppercase()
    } else {
        neighbor
    }
}

/// Pick a plausible mistyped character for `c`: a random physical neighbor,
/// case preserved. Keys without adjacency data fall back to a uniformly
/// random letter of matching case, so a wrong character always exists.
pub fn adjacent_key(c: char, rng: &mut impl Rng) -> char {
    let base = c.to_ascii_lowercase();
    let neighbors = qwerty_neighbors(base);
    if !neighbors.is_empty() {
        return keep_case(c, neighbors[rng.gen_range(0..neighbors.len())]);
    }

    let fallback = (b'a' + rng.gen_range(0..26u8)) as char;
    keep_case(c, fallback)
}
