//! In-memory, decimal-valued view of the eight time-keeping registers
//! and their mode-dependent wire encoding.

use core::ops::RangeInclusive;

use crate::bcd::{bcd_to_bin, bin_to_bcd};

/// Number of contiguous time-keeping registers, hundredths through year
pub const TIME_REGISTER_COUNT: usize = 8;

// Hours register bits
pub(crate) const HOUR_MODE_BIT: u8 = 1 << 6; // 12/24 select, set for 12h
pub(crate) const AM_PM_BIT: u8 = 1 << 5; // PM when set, 12h only
const HOURS_24_MASK: u8 = 0x3F;
const HOURS_12_MASK: u8 = 0x1F;

// Month register bits
pub(crate) const CENTURY_BIT: u8 = 1 << 7;
const MONTH_MASK: u8 = 0x1F;

pub const HUNDREDTHS_RANGE: RangeInclusive<u8> = 0..=99;
pub const SECONDS_RANGE: RangeInclusive<u8> = 0..=59;
pub const MINUTES_RANGE: RangeInclusive<u8> = 0..=59;
pub const HOURS_24_RANGE: RangeInclusive<u8> = 0..=23;
pub const HOURS_12_RANGE: RangeInclusive<u8> = 1..=12;
/// Day of week, 1 is Sunday
pub const WEEKDAY_RANGE: RangeInclusive<u8> = 1..=7;
/// Day of month. Not checked against the length of the month.
pub const DAY_RANGE: RangeInclusive<u8> = 1..=31;
pub const MONTH_RANGE: RangeInclusive<u8> = 1..=12;
/// Two-digit year, 0 is 2000
pub const YEAR_RANGE: RangeInclusive<u8> = 0..=99;
pub const CENTURY_RANGE: RangeInclusive<u8> = 0..=1;

pub(crate) fn clamp(value: u8, range: RangeInclusive<u8>) -> u8 {
  value.clamp(*range.start(), *range.end())
}

/// Hour encoding selected by the mode bit of the hours register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HourMode {
  /// 0..23
  #[default]
  H24,
  /// 1..12 with AM/PM
  H12,
}

impl HourMode {
  /// Extract the mode from a raw hours register value
  pub const fn from_hours_register(raw: u8) -> Self {
    if raw & HOUR_MODE_BIT != 0 { HourMode::H12 } else { HourMode::H24 }
  }

  /// The valid range of the decimal hour field in this mode
  pub const fn hour_range(self) -> RangeInclusive<u8> {
    match self {
      HourMode::H24 => HOURS_24_RANGE,
      HourMode::H12 => HOURS_12_RANGE,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AmPm {
  #[default]
  Am,
  Pm,
}

/// Decode a raw hours register value.
/// In 24h mode the AM/PM indicator is always reported as `Am`.
pub fn decode_hours(raw: u8, mode: HourMode) -> (u8, AmPm) {
  match mode {
    HourMode::H24 => (bcd_to_bin(raw & HOURS_24_MASK), AmPm::Am),
    HourMode::H12 => {
      let am_pm = if raw & AM_PM_BIT != 0 { AmPm::Pm } else { AmPm::Am };
      (bcd_to_bin(raw & HOURS_12_MASK), am_pm)
    }
  }
}

/// Encode an hours register value, clamping `hours` to the range of `mode`.
/// In 12h mode the mode bit is always set, so the written byte
/// can never disagree with itself about the encoding in use.
pub fn encode_hours(hours: u8, am_pm: AmPm, mode: HourMode) -> u8 {
  let bcd = bin_to_bcd(clamp(hours, mode.hour_range()));
  match mode {
    HourMode::H24 => bcd,
    HourMode::H12 => {
      let pm = if am_pm == AmPm::Pm { AM_PM_BIT } else { 0 };
      bcd | pm | HOUR_MODE_BIT
    }
  }
}

/// Decode a raw month register value into (month, century bit)
pub const fn decode_month(raw: u8) -> (u8, u8) {
  (bcd_to_bin(raw & MONTH_MASK), (raw & CENTURY_BIT) >> 7)
}

/// Encode a month register value, clamping `month` to 1..12
/// and carrying the low bit of `century` into bit 7
pub fn encode_month(month: u8, century: u8) -> u8 {
  bin_to_bcd(clamp(month, MONTH_RANGE)) | (clamp(century, CENTURY_RANGE) << 7)
}

/// Decimal values of the time-keeping registers.
/// This is a transient transcoding buffer: the device is the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeRegisters {
  pub hundredths: u8,
  pub seconds: u8,
  pub minutes: u8,
  /// 0..23 in 24h mode, 1..12 in 12h mode
  pub hours: u8,
  /// 1..7, 1 is Sunday
  pub weekday: u8,
  pub day: u8,
  pub month: u8,
  /// Two-digit year, 0..99 for 2000..2099
  pub year: u8,
  /// Bit 7 of the month register. Depending on the validity scheme this is either the
  /// literal century flag or the validity flag.
  pub century: u8,
  /// Only meaningful in 12h mode
  pub am_pm: AmPm,
}

impl TimeRegisters {
  /// Decode the raw register block, starting at the hundredths register.
  pub fn unpack(raw: &[u8; TIME_REGISTER_COUNT], mode: HourMode) -> Self {
    let (hours, am_pm) = decode_hours(raw[3], mode);
    let (month, century) = decode_month(raw[6]);
    TimeRegisters {
      hundredths: bcd_to_bin(raw[0]),
      seconds: bcd_to_bin(raw[1]),
      minutes: bcd_to_bin(raw[2]),
      hours,
      weekday: bcd_to_bin(raw[4]),
      day: bcd_to_bin(raw[5]),
      month,
      year: bcd_to_bin(raw[7]),
      century,
      am_pm,
    }
  }

  /// Encode into the raw register block, clamping every field to its valid range first.
  pub fn pack(&self, mode: HourMode) -> [u8; TIME_REGISTER_COUNT] {
    [
      bin_to_bcd(clamp(self.hundredths, HUNDREDTHS_RANGE)),
      bin_to_bcd(clamp(self.seconds, SECONDS_RANGE)),
      bin_to_bcd(clamp(self.minutes, MINUTES_RANGE)),
      encode_hours(self.hours, self.am_pm, mode),
      bin_to_bcd(clamp(self.weekday, WEEKDAY_RANGE)),
      bin_to_bcd(clamp(self.day, DAY_RANGE)),
      encode_month(self.month, self.century),
      bin_to_bcd(clamp(self.year, YEAR_RANGE)),
    ]
  }

  /// Hour of day in 0..23 regardless of the mode the fields were read in.
  /// 12 AM is midnight and 12 PM is noon.
  pub fn hours_24(&self, mode: HourMode) -> u8 {
    match mode {
      HourMode::H24 => self.hours,
      HourMode::H12 => {
        let base = self.hours % 12;
        match self.am_pm {
          AmPm::Am => base,
          AmPm::Pm => base + 12,
        }
      }
    }
  }

  /// Store a 0..23 hour of day using the encoding of `mode`
  pub fn set_hours_24(&mut self, hours: u8, mode: HourMode) {
    match mode {
      HourMode::H24 => {
        self.hours = hours;
        self.am_pm = AmPm::Am;
      }
      HourMode::H12 => {
        let (hours, am_pm) = match hours {
          0 => (12, AmPm::Am),
          1..=11 => (hours, AmPm::Am),
          12 => (12, AmPm::Pm),
          _ => (hours - 12, AmPm::Pm),
        };
        self.hours = hours;
        self.am_pm = am_pm;
      }
    }
  }
}
