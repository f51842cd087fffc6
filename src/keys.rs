//! Named key symbols and their raw byte-sequence aliases
//!
//! Every symbol carries the set of input byte sequences that may encode it
//! across POSIX terminals (CSI and SS3 forms) and Windows consoles (two-byte
//! scan codes led by `0xE0` or `0x00`). Decoding never consults this table:
//! the recorder dispatches on exact burst strings, and a symbol merely
//! answers whether a given burst is one of its spellings.

/// A named key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Esc,
    Enter,
    Tab,
    Space,
    Insert,
    Delete,
    CtrlDelete,
    Backspace,
    CtrlBackspace,
    Left,
    Right,
    Up,
    Down,
    OptLeft,
    OptRight,
    CtrlLeft,
    CtrlRight,
    Home,
    End,
    PageUp,
    PageDown,
    CtrlA,
    CtrlB,
    CtrlC,
    CtrlD,
    CtrlE,
    CtrlF,
    CtrlG,
    CtrlH,
    CtrlI,
    CtrlJ,
    CtrlK,
    CtrlL,
    CtrlM,
    CtrlN,
    CtrlO,
    CtrlP,
    CtrlQ,
    CtrlR,
    CtrlS,
    CtrlT,
    CtrlU,
    CtrlV,
    CtrlW,
    CtrlX,
    CtrlY,
    CtrlZ,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
}

impl Key {
    /// Raw input sequences that decode to this key.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Key::Esc => &["\x1b"],
            Key::Enter => &["\r", "\n", "\x1bOM"],
            Key::Tab => &["\t", "\x1bOI"],
            Key::Space => &[" ", "\x1bO "],
            Key::Insert => &["\x1b[2~"],
            Key::Delete => &["\x2e", "\x1b[3~", "\x00S", "\u{e0}S"],
            Key::CtrlDelete => &["\u{e0}\u{93}", "\x00\u{93}"],
            Key::Backspace => &["\x7f", "\x08"],
            Key::CtrlBackspace => &["\x17"],
            Key::Left => &["\x1b[D", "\u{e0}K", "\x1bOD", "\x00K"],
            Key::Right => &["\x1b[C", "\u{e0}M", "\x1bOC", "\x00M"],
            Key::Up => &["\x1b[A", "\u{e0}H", "\x1bOA", "\x00H"],
            Key::Down => &["\x1b[B", "\u{e0}P", "\x1bOB", "\x00P"],
            Key::OptLeft => &["\x1bb"],
            Key::OptRight => &["\x1bf"],
            Key::CtrlLeft => &["\u{e0}s", "\x00s"],
            Key::CtrlRight => &["\u{e0}t", "\x00t"],
            Key::Home => &["\x1b[H", "\u{e0}G", "\x1bOH", "\x1b[1~", "\x00G"],
            Key::End => &["\x1b[F", "\u{e0}O", "\x1bOF", "\x1b[4~", "\x00O"],
            Key::PageUp => &["\u{e0}I", "\x1b[5~", "\x00I"],
            Key::PageDown => &["\u{e0}Q", "\x1b[6~", "\x00Q"],
            Key::CtrlA => &["\x01"],
            Key::CtrlB => &["\x02"],
            Key::CtrlC => &["\x03"],
            Key::CtrlD => &["\x04"],
            Key::CtrlE => &["\x05"],
            Key::CtrlF => &["\x06"],
            Key::CtrlG => &["\x07"],
            Key::CtrlH => &["\x08"],
            Key::CtrlI => &["\x09"],
            Key::CtrlJ => &["\x0a"],
            Key::CtrlK => &["\x0b"],
            Key::CtrlL => &["\x0c"],
            Key::CtrlM => &["\x0d"],
            Key::CtrlN => &["\x0e"],
            Key::CtrlO => &["\x0f"],
            Key::CtrlP => &["\x10"],
            Key::CtrlQ => &["\x11"],
            Key::CtrlR => &["\x12"],
            Key::CtrlS => &["\x13"],
            Key::CtrlT => &["\x14"],
            Key::CtrlU => &["\x15"],
            Key::CtrlV => &["\x16"],
            Key::CtrlW => &["\x17"],
            Key::CtrlX => &["\x18"],
            Key::CtrlY => &["\x19"],
            Key::CtrlZ => &["\x1a"],
            Key::F1 => &["\x1bOP", "\x00;"],
            Key::F2 => &["\x1bOQ", "\x00<"],
            Key::F3 => &["\x1bOR", "\x00="],
            Key::F4 => &["\x1bOS", "\x00>"],
            Key::F5 => &["\x1b[15~"],
            Key::F6 => &["\x1b[17~"],
            Key::F7 => &["\x1b[18~"],
            Key::F8 => &["\x1b[19~"],
            Key::F9 => &["\x1b[20~"],
            Key::F10 => &["\x1b[21~"],
            Key::F11 => &["\x1b[23~"],
            Key::F12 => &["\x1b[24~"],
        }
    }

    /// Whether `burst` is one of this key's spellings.
    pub fn matches(self, burst: &str) -> bool {
        self.aliases().contains(&burst)
    }

    /// The four arrow keys.
    pub const ARROWS: [Key; 4] = [Key::Up, Key::Down, Key::Right, Key::Left];

    /// Arrows plus Home/End/PageUp/PageDown.
    pub const NAV: [Key; 8] = [
        Key::Up,
        Key::Down,
        Key::Right,
        Key::Left,
        Key::Home,
        Key::End,
        Key::PageUp,
        Key::PageDown,
    ];

    /// F1 through F12.
    pub const FUNCTION: [Key; 12] = [
        Key::F1,
        Key::F2,
        Key::F3,
        Key::F4,
        Key::F5,
        Key::F6,
        Key::F7,
        Key::F8,
        Key::F9,
        Key::F10,
        Key::F11,
        Key::F12,
    ];

    /// Ctrl-A through Ctrl-Z.
    pub const CTRL: [Key; 26] = [
        Key::CtrlA,
        Key::CtrlB,
        Key::CtrlC,
        Key::CtrlD,
        Key::CtrlE,
        Key::CtrlF,
        Key::CtrlG,
        Key::CtrlH,
        Key::CtrlI,
        Key::CtrlJ,
        Key::CtrlK,
        Key::CtrlL,
        Key::CtrlM,
        Key::CtrlN,
        Key::CtrlO,
        Key::CtrlP,
        Key::CtrlQ,
        Key::CtrlR,
        Key::CtrlS,
        Key::CtrlT,
        Key::CtrlU,
        Key::CtrlV,
        Key::CtrlW,
        Key::CtrlX,
        Key::CtrlY,
        Key::CtrlZ,
    ];
}

impl PartialEq<str> for Key {
    fn eq(&self, other: &str) -> bool {
        self.matches(other)
    }
}

impl PartialEq<&str> for Key {
    fn eq(&self, other: &&str) -> bool {
        self.matches(other)
    }
}
