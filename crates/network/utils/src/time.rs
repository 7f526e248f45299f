use std::time::{SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp.
///
/// # Panics
///
/// Panics if the system time is before the Unix epoch (January 1, 1970).
#[must_use]
pub fn time_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("time went backwards").as_secs()
}

/// Returns the current Unix time in hundredths of a second.
///
/// Used to derive fresh client ids when registering on the market.
///
/// # Panics
///
/// Panics if the system time is before the Unix epoch (January 1, 1970).
#[must_use]
pub fn time_now_centis() -> u64 {
    (SystemTime::now().duration_since(UNIX_EPOCH).expect("time went backwards").as_millis() / 10)
        as u64
}
