/**
 * How long (milliseconds) the discovery window stays open before scanning
 * stops on its own.
 */
pub const SCAN_WINDOW: u64 = 10_000;

/**
 * How long (milliseconds) to pause after each print segment write before the
 * next one is issued.
 */
pub const SEGMENT_DELAY: u64 = 50;

/**
 * How long (milliseconds) a write to a characteristic may take.
 */
pub const WRITE_DEADLINE: u64 = 2000;

/**
 * Buffered capacity of the device event channel.
 */
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
