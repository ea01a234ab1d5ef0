//! Scheduler time units.
//!
//! Drivers report waits in ticks of the scheduler's timer, whose frequency is
//! the `CLOCK_FREQ` of the chip family.

/// Convert microseconds to timer ticks at `freq` Hz, rounding down.
pub const fn ticks_from_us(freq: u32, us: u32) -> u32 {
    ((freq as u64 * us as u64) / 1_000_000) as u32
}

/// Smallest divider from `choices` that brings `input` Hz at or below `max` Hz.
///
/// Returns the index into `choices`, or `None` if even the largest divider
/// leaves the clock too fast.
pub const fn pick_divider(input: u32, max: u32, choices: &[u32]) -> Option<usize> {
    let mut i = 0;
    while i < choices.len() {
        if input / choices[i] <= max {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// [`pick_divider`] for prescalers fixed at build time.
///
/// In a `const` item, a clock tree with no fitting divider fails the build.
pub const fn prescaler(input: u32, max: u32, choices: &[u32]) -> u32 {
    match pick_divider(input, max, choices) {
        Some(i) => i as u32,
        None => panic!("no prescaler brings the clock within its limit"),
    }
}
