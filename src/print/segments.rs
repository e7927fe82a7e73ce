//! The print job encoder: a receipt is an ordered sequence of segments,
//! each either a raw ESC/POS control sequence or literal text.

/// One ordered unit of a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Control(&'static [u8]),
    Text(&'static str),
}

impl Segment {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Segment::Control(bytes) => bytes,
            Segment::Text(text) => text.as_bytes(),
        }
    }
}

// ESC/POS control sequences
const INIT: &[u8] = &[0x1B, 0x40]; // ESC @
const TEXT_MODE_DEFAULT: &[u8] = &[0x1B, 0x21, 0x00]; // ESC ! 0
const ALIGN_CENTER: &[u8] = &[0x1B, 0x61, 0x01]; // ESC a 1
const EMPHASIS_ON: &[u8] = &[0x1B, 0x45, 0x01]; // ESC E 1
const EMPHASIS_OFF: &[u8] = &[0x1B, 0x45, 0x00]; // ESC E 0
const CUT_FEED: &[u8] = &[0x1D, 0x56, 0x41, 0x10]; // GS V 65 16

/// The fixed test receipt, fully known at compile time.
pub const TEST_RECEIPT: &[Segment] = &[
    Segment::Control(INIT),
    Segment::Control(TEXT_MODE_DEFAULT),
    Segment::Control(ALIGN_CENTER),
    Segment::Text("TEST RECEIPT\n\n"),
    Segment::Text("================\n"),
    Segment::Control(EMPHASIS_ON),
    Segment::Text("Printed successfully!\n"),
    Segment::Control(EMPHASIS_OFF),
    Segment::Control(CUT_FEED),
];
