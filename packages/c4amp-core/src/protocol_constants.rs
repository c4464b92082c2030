//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the amplifier firmware (C4-8AMP1-B) and
//! changing them would break wire compatibility.

// ─────────────────────────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────────────────────────

/// Default UDP port the amplifier listens on for commands.
pub const DEFAULT_PORT: u16 = 8750;

/// Fixed prefix of the counter tag that starts every datagram.
pub const COUNTER_PREFIX: &str = "0s2a";

/// Inclusive range of the random two-digit suffix appended to the counter prefix.
pub const COUNTER_SUFFIX_MIN: u8 = 10;
pub const COUNTER_SUFFIX_MAX: u8 = 99;

/// How long a send waits for any inbound datagram (milliseconds).
pub const RESPONSE_TIMEOUT_MS: u64 = 1000;

/// Receive buffer for inbound datagrams. Device replies are short ASCII lines.
pub const RECV_BUFFER_SIZE: usize = 1024;

/// Capacity of the inbound datagram broadcast channel.
pub const INBOUND_CHANNEL_CAPACITY: usize = 32;

// ─────────────────────────────────────────────────────────────────────────────
// Command Verbs
// ─────────────────────────────────────────────────────────────────────────────

/// Route a physical input port to an output (`00` disconnects).
pub const CMD_OUTPUT: &str = "c4.amp.out";
/// Set the analog/digital mode flag of a physical port.
pub const CMD_DIGITAL: &str = "c4.amp.digital";
pub const CMD_VOLUME: &str = "c4.amp.chvol";
pub const CMD_BALANCE: &str = "c4.amp.balance";
pub const CMD_INPUT_GAIN: &str = "c4.amp.ingain";
pub const CMD_BASS: &str = "c4.amp.bass";
pub const CMD_TREBLE: &str = "c4.amp.treble";

// ─────────────────────────────────────────────────────────────────────────────
// Topology
// ─────────────────────────────────────────────────────────────────────────────

pub const NUM_ANALOG_INPUTS: u8 = 4;
pub const NUM_DIGITAL_INPUTS: u8 = 2;
/// Total number of logical inputs (analog first, then digital).
pub const NUM_LOGICAL_INPUTS: u8 = NUM_ANALOG_INPUTS + NUM_DIGITAL_INPUTS;
/// Maximum number of stereo outputs the device exposes.
pub const NUM_OUTPUTS: u8 = 4;

/// Physical ports that can run in digital mode.
pub const DIGITAL_CAPABLE_PORTS: [u8; 2] = [1, 3];

// ─────────────────────────────────────────────────────────────────────────────
// Value Ranges
// ─────────────────────────────────────────────────────────────────────────────

/// Volume is sent as `round(volume * 100) + VOLUME_WIRE_OFFSET` in hex.
pub const VOLUME_WIRE_OFFSET: u32 = 160;

/// Balance range, L10 .. R10.
pub const BALANCE_MIN: i32 = -10;
pub const BALANCE_MAX: i32 = 10;

/// Input gain range (dB).
pub const GAIN_MIN: i32 = -6;
pub const GAIN_MAX: i32 = 0;

/// Bass/treble range (dB).
pub const TONE_MIN: i32 = -12;
pub const TONE_MAX: i32 = 12;

// ─────────────────────────────────────────────────────────────────────────────
// Zone Policy
// ─────────────────────────────────────────────────────────────────────────────

/// Volume used when powering on without a usable snapshot, and the floor
/// applied when unmuting so a zone never comes back silent.
pub const DEFAULT_ZONE_VOLUME: f64 = 0.3;

/// Capacity of the zone event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
