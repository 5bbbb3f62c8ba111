//! Conversion between the time-keeping registers and seconds since the unix epoch
//! (00:00:00 January 1st 1970, GMT).
//!
//! The two-digit year register counts years since 2000, so only local times from
//! 2000-01-01T00:00:00 through 2099-12-31T23:59:59 are representable.
//! Hundredths of seconds and the century bit take no part in the conversion.

use crate::registers::{HourMode, TimeRegisters};

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3_600;
const SECONDS_PER_DAY: i64 = 86_400;

/// Days in each month of a common year
const MONTH_DAYS: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Years between the unix epoch and the base year of the two-digit year register
const REGISTER_YEAR_OFFSET: u32 = 30;

/// First representable instant, 2000-01-01T00:00:00
pub const MIN_EPOCH: i64 = 946_684_800;
/// Last representable instant, 2099-12-31T23:59:59
pub const MAX_EPOCH: i64 = 4_102_444_799;

/// Timezone offsets are whole hours in this range, positive east of GMT
pub const TIMEZONE_MIN: i8 = -12;
pub const TIMEZONE_MAX: i8 = 12;

/// Gregorian leap year rule. Years before 1 AD are never leap years.
pub const fn is_leap_year(year: i32) -> bool {
  year > 0 && year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

// leap year test for a count of years since the epoch
const fn is_leap_offset(years_since_epoch: u32) -> bool {
  is_leap_year(1970 + years_since_epoch as i32)
}

const fn days_in_year(years_since_epoch: u32) -> u64 {
  if is_leap_offset(years_since_epoch) { 366 } else { 365 }
}

// `month` is 1..12
const fn days_in_month(month: u8, leap: bool) -> u8 {
  if month == 2 && leap { 29 } else { MONTH_DAYS[(month - 1) as usize] }
}

fn timezone_seconds(timezone: i8) -> i64 {
  i64::from(timezone.clamp(TIMEZONE_MIN, TIMEZONE_MAX)) * SECONDS_PER_HOUR
}

/// Convert register values, read in `mode` and expressed in local time at `timezone`
/// hours east of GMT, into seconds since the unix epoch.
///
/// The input is not modified. Month and year are clamped to their register ranges,
/// days beyond the end of the month roll over into the following month.
pub fn to_epoch(regs: &TimeRegisters, mode: HourMode, timezone: i8) -> i64 {
  let years = u32::from(regs.year.min(99)) + REGISTER_YEAR_OFFSET;
  let month = regs.month.clamp(1, 12);
  let leap = is_leap_offset(years);

  let mut days = i64::from(years) * 365;
  days += (0..years).filter(|y| is_leap_offset(*y)).count() as i64;
  days += (1..month).map(|m| i64::from(days_in_month(m, leap))).sum::<i64>();
  days += i64::from(regs.day.saturating_sub(1));

  days * SECONDS_PER_DAY
    + i64::from(regs.hours_24(mode)) * SECONDS_PER_HOUR
    + i64::from(regs.minutes) * SECONDS_PER_MINUTE
    + i64::from(regs.seconds)
    - timezone_seconds(timezone)
}

/// Convert seconds since the unix epoch into register values for `mode`,
/// expressed in local time at `timezone` hours east of GMT.
///
/// Local times outside the representable window saturate at its bounds.
/// `hundredths` and `century` are left at zero.
pub fn from_epoch(epoch: i64, mode: HourMode, timezone: i8) -> TimeRegisters {
  let local = epoch
    .saturating_add(timezone_seconds(timezone))
    .clamp(MIN_EPOCH, MAX_EPOCH);
  // non-negative after the clamp
  let mut t = local as u64;

  let mut regs = TimeRegisters::default();
  regs.seconds = (t % 60) as u8;
  t /= 60;
  regs.minutes = (t % 60) as u8;
  t /= 60;
  regs.set_hours_24((t % 24) as u8, mode);
  t /= 24;

  // t is now whole days since the epoch, which fell on a Thursday
  regs.weekday = ((t + 4) % 7 + 1) as u8;

  let mut years: u32 = 0;
  while t >= days_in_year(years) {
    t -= days_in_year(years);
    years += 1;
  }
  regs.year = (years - REGISTER_YEAR_OFFSET) as u8;

  let leap = is_leap_offset(years);
  let mut month: u8 = 1;
  while month < 12 && t >= u64::from(days_in_month(month, leap)) {
    t -= u64::from(days_in_month(month, leap));
    month += 1;
  }
  regs.month = month;
  regs.day = (t + 1) as u8;

  regs
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::registers::AmPm;
  use proptest::prelude::*;

  // 2003-02-01T01:02:03, a Saturday
  fn sample() -> TimeRegisters {
    TimeRegisters {
      hundredths: 0,
      seconds: 3,
      minutes: 2,
      hours: 1,
      weekday: 7,
      day: 1,
      month: 2,
      year: 3,
      century: 0,
      am_pm: AmPm::Am,
    }
  }

  #[test]
  fn leap_years() {
    assert!(is_leap_year(1972));
    assert!(is_leap_year(2000));
    assert!(!is_leap_year(1900));
    assert!(!is_leap_year(2023));
    assert!(is_leap_year(2024));
    assert!(!is_leap_year(2100));
    assert!(!is_leap_year(0));
  }

  #[test]
  fn to_epoch_with_timezone() {
    assert_eq!(to_epoch(&sample(), HourMode::H24, -3), 1_044_072_123);
    assert_eq!(to_epoch(&sample(), HourMode::H24, 0), 1_044_061_323);
  }

  #[test]
  fn to_epoch_leaves_input_untouched() {
    let regs = TimeRegisters { hours: 3, am_pm: AmPm::Pm, ..sample() };
    let copy = regs;
    let epoch = to_epoch(&regs, HourMode::H12, 0);
    assert_eq!(regs, copy);
    assert_eq!(epoch, 1_044_061_323 + 14 * 3_600);
  }

  #[test]
  fn from_epoch_with_timezone() {
    assert_eq!(from_epoch(1_044_072_123, HourMode::H24, -3), sample());
  }

  #[test]
  fn window_bounds() {
    let first = from_epoch(MIN_EPOCH, HourMode::H24, 0);
    assert_eq!((first.year, first.month, first.day), (0, 1, 1));
    // 2000-01-01 was a Saturday
    assert_eq!(first.weekday, 7);
    let last = from_epoch(MAX_EPOCH, HourMode::H24, 0);
    assert_eq!((last.year, last.month, last.day), (99, 12, 31));
    assert_eq!((last.hours, last.minutes, last.seconds), (23, 59, 59));
    assert_eq!(to_epoch(&first, HourMode::H24, 0), MIN_EPOCH);
    assert_eq!(to_epoch(&last, HourMode::H24, 0), MAX_EPOCH);
  }

  #[test]
  fn out_of_window_saturates() {
    assert_eq!(from_epoch(0, HourMode::H24, 0), from_epoch(MIN_EPOCH, HourMode::H24, 0));
    assert_eq!(from_epoch(i64::MAX, HourMode::H24, 12), from_epoch(MAX_EPOCH, HourMode::H24, 0));
  }

  #[test]
  fn leap_day() {
    // 2024-02-29T12:00:00
    let regs = from_epoch(1_709_208_000, HourMode::H24, 0);
    assert_eq!((regs.year, regs.month, regs.day, regs.hours), (24, 2, 29, 12));
    // Thursday
    assert_eq!(regs.weekday, 5);
    // 2024-03-01
    let regs = from_epoch(1_709_208_000 + 12 * 3_600, HourMode::H24, 0);
    assert_eq!((regs.month, regs.day), (3, 1));
  }

  #[test]
  fn twelve_hour_mode() {
    // 2003-02-01T14:00:00
    let regs = from_epoch(1_044_108_000, HourMode::H12, 0);
    assert_eq!((regs.hours, regs.am_pm), (2, AmPm::Pm));
    let regs = from_epoch(1_044_057_600, HourMode::H12, 0);
    assert_eq!((regs.hours, regs.am_pm), (12, AmPm::Am));
    let regs = from_epoch(1_044_100_800, HourMode::H12, 0);
    assert_eq!((regs.hours, regs.am_pm), (12, AmPm::Pm));
  }

  #[test]
  fn timezone_is_clamped() {
    assert_eq!(to_epoch(&sample(), HourMode::H24, 14), to_epoch(&sample(), HourMode::H24, 12));
    assert_eq!(from_epoch(1_044_072_123, HourMode::H24, -20),
               from_epoch(1_044_072_123, HourMode::H24, -12));
  }

  fn arb_mode() -> impl Strategy<Value = HourMode> {
    prop_oneof![Just(HourMode::H24), Just(HourMode::H12)]
  }

  proptest! {
    #[test]
    fn epoch_survives_register_conversion(
      local in MIN_EPOCH..=MAX_EPOCH,
      timezone in TIMEZONE_MIN..=TIMEZONE_MAX,
      mode in arb_mode(),
    ) {
      let epoch = local - i64::from(timezone) * 3_600;
      let regs = from_epoch(epoch, mode, timezone);
      prop_assert_eq!(to_epoch(&regs, mode, timezone), epoch);
    }

    #[test]
    fn weekday_follows_days(days in 10_957i64..47_481) {
      let a = from_epoch(days * 86_400, HourMode::H24, 0).weekday;
      let b = from_epoch((days + 1) * 86_400, HourMode::H24, 0).weekday;
      prop_assert_eq!(b, a % 7 + 1);
    }
  }
}
