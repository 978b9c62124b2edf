use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Ticks per second of the server's native timestamp representation.
const TICKS_PER_SECOND: u64 = 10_000_000;

/// Seconds between the native epoch (1601-01-01 UTC) and the Unix epoch.
const EPOCH_DELTA_SECS: u64 = 11_644_473_600;

/// Converts the server's native modification timestamp to [`SystemTime`].
///
/// `DATE_MODIFIED` lines carry an unsigned 64-bit count of 100-nanosecond
/// ticks since 1601-01-01 UTC, which is distinct from Unix time. The
/// conversion happens here, at the protocol boundary, so the rest of the
/// engine only ever sees portable timestamps.
///
/// Returns `None` for tick counts before the Unix epoch; such values cannot
/// be represented without guessing at the caller's clamping policy, and real
/// servers never report them for index entries.
#[must_use]
pub fn decode_native_timestamp(ticks: u64) -> Option<SystemTime> {
    let secs_since_native_epoch = ticks / TICKS_PER_SECOND;
    let sub_second_ticks = ticks % TICKS_PER_SECOND;

    let unix_secs = secs_since_native_epoch.checked_sub(EPOCH_DELTA_SECS)?;
    // sub_second_ticks < 10^7, so the nanosecond count always fits.
    let nanos = u32::try_from(sub_second_ticks * 100).ok()?;

    UNIX_EPOCH.checked_add(Duration::new(unix_secs, nanos))
}
