#![cfg_attr(not(test), no_std)]

//! DS1390 / DS1391 SPI real time clock driver.
//!
//! The device keeps time in eight BCD registers (hundredths of a second through
//! a two-digit year), with a 12h/24h mode bit, an AM/PM bit and a century bit.
//! This driver exposes per-field accessors, burst access to all eight registers,
//! conversion to and from unix epoch seconds, and the trickle charger.

pub use rtcc::{
  DateTimeAccess, NaiveDate, NaiveDateTime, Datelike, Timelike,
};

pub mod bcd;
pub mod calendar;
pub mod registers;

pub use calendar::{from_epoch, is_leap_year, to_epoch, MAX_EPOCH, MIN_EPOCH};
pub use registers::{AmPm, HourMode, TimeRegisters, TIME_REGISTER_COUNT};

use bcd::{bcd_to_bin, bin_to_bcd};
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::spi::{Transfer, Write};
use embedded_hal::digital::v2::OutputPin;
use embedded_hal::spi::{Mode, MODE_1};
use log::{debug, trace};
use registers::{
  clamp, decode_hours, decode_month, encode_hours, encode_month,
  CENTURY_BIT, HOUR_MODE_BIT,
};

/// SPI mode the device expects: CPOL = 0, CPHA = 1, MSB first
pub const SPI_MODE: Mode = MODE_1;

/// Maximum SPI clock frequency
pub const SPI_CLOCK_HZ: u32 = 4_000_000;

/// Minimum delay after power up before the device accepts transfers
pub const POWER_UP_DELAY_MS: u16 = 200;

// Write addresses are the read addresses with this bit set
const WRITE_FLAG: u8 = 0x80;

// Clocked out while reading
const DUMMY_BYTE: u8 = 0xFF;

// Register (read) addresses
const REG_HUNDREDTHS: u8 = 0x00;
const REG_SECONDS: u8 = 0x01;
const REG_MINUTES: u8 = 0x02;

// Hours, plus the 12/24 mode bit (6) and the AM/PM bit (5, 12h mode only)
const REG_HOURS: u8 = 0x03;

// Day of week, 1..7 with 1 = Sunday
const REG_WEEKDAY: u8 = 0x04;
const REG_DAY: u8 = 0x05;

// Month in the low five bits, century bit in bit 7
const REG_MONTH: u8 = 0x06;
const REG_YEAR: u8 = 0x07;

// 0x08 - 0x0C alarm registers, 0x0D control

// Holds the oscillator stop flag
const REG_STATUS: u8 = 0x0E;

// Trickle charger configuration
const REG_TRICKLE_CHARGER: u8 = 0x0F;

// REG_STATUS bits:
// Set by the device whenever the oscillator stopped, eg on loss of backup power
const OSC_STOP_FLAG: u8 = 1 << 7;

/// How the driver records that the time registers were explicitly written
/// since the device last lost power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidityScheme {
  /// Valid while the oscillator stop flag in the status register is clear.
  /// The century bit keeps its literal meaning.
  #[default]
  OscillatorStopFlag,
  /// Compatibility variant: valid while the century bit of the month register is set.
  /// The century bit cannot be used as a century flag in this scheme.
  CenturyBit,
}

/// Trickle charger configurations recognized by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrickleChargeMode {
  Disabled = 0x00,
  Ohms250NoDiode = 0xA5,
  Ohms250Diode = 0xA9,
  Ohms2kNoDiode = 0xA6,
  Ohms2kDiode = 0xAA,
  Ohms4kNoDiode = 0xA7,
  Ohms4kDiode = 0xAB,
}

impl TryFrom<u8> for TrickleChargeMode {
  type Error = u8;

  /// Fails with the raw value if it is not one of the recognized bit patterns
  fn try_from(raw: u8) -> Result<Self, Self::Error> {
    match raw {
      0x00 => Ok(TrickleChargeMode::Disabled),
      0xA5 => Ok(TrickleChargeMode::Ohms250NoDiode),
      0xA9 => Ok(TrickleChargeMode::Ohms250Diode),
      0xA6 => Ok(TrickleChargeMode::Ohms2kNoDiode),
      0xAA => Ok(TrickleChargeMode::Ohms2kDiode),
      0xA7 => Ok(TrickleChargeMode::Ohms4kNoDiode),
      0xAB => Ok(TrickleChargeMode::Ohms4kDiode),
      other => Err(other),
    }
  }
}

/// Driver errors
#[derive(Debug)]
pub enum Error<SpiE, PinE> {
  /// SPI bus transfer failed
  Spi(SpiE),
  /// Chip select pin could not be driven
  Pin(PinE),
  /// The date time lies outside 2000..2099, or the registers do not hold a real date
  InvalidDateTime,
}

/// DS1390 / DS1391
/// Low-voltage SPI real-time clock with trickle charger
/// rust no_std driver (utilizes the embedded_hal blocking spi interface)
pub struct DS1390<SPI, CS> {
  spi: SPI,
  cs: CS,
  scheme: ValidityScheme,
}

impl<SPI, CS, SpiE, PinE> DS1390<SPI, CS>
  where
    SPI: Transfer<u8, Error = SpiE> + Write<u8, Error = SpiE>,
    CS: OutputPin<Error = PinE>,
{

  /// New driver instance, using the oscillator stop flag to track validity.
  /// - `spi` : bus configured with `SPI_MODE`, at most `SPI_CLOCK_HZ`
  /// - `cs` : active-low chip select of the device
  pub fn new(spi: SPI, cs: CS) -> Self {
    Self::new_with_scheme(spi, cs, ValidityScheme::default())
  }

  /// New driver instance with an explicit validity tracking scheme
  pub fn new_with_scheme(spi: SPI, cs: CS, scheme: ValidityScheme) -> Self {
    DS1390 {
      spi,
      cs,
      scheme,
    }
  }

  /// Release the bus and chip select pin
  pub fn destroy(self) -> (SPI, CS) {
    (self.spi, self.cs)
  }

  /// The validity tracking scheme chosen at construction
  pub fn validity_scheme(&self) -> ValidityScheme {
    self.scheme
  }

  /// Deselect the device and wait out the power up delay.
  /// Call once after the device is powered, before any other method.
  pub fn init<D: DelayMs<u16>>(&mut self, delay: &mut D) -> Result<(), Error<SpiE, PinE>> {
    self.cs.set_high().map_err(Error::Pin)?;
    debug!("ds1390 power up wait {} ms", POWER_UP_DELAY_MS);
    delay.delay_ms(POWER_UP_DELAY_MS);
    Ok(())
  }

  // Run one bus transaction with chip select asserted.
  // Chip select is released even when the transfer fails.
  fn transact<T>(&mut self, op: impl FnOnce(&mut SPI) -> Result<T, SpiE>)
    -> Result<T, Error<SpiE, PinE>> {
    self.cs.set_low().map_err(Error::Pin)?;
    let res = op(&mut self.spi).map_err(Error::Spi);
    self.cs.set_high().map_err(Error::Pin)?;
    res
  }

  fn write_register(&mut self, reg: u8, data: u8) -> Result<(), Error<SpiE, PinE>> {
    trace!("write reg {:#04x} = {:#04x}", reg, data);
    self.transact(|spi| spi.write(&[reg | WRITE_FLAG, data]))
  }

  fn read_register(&mut self, reg: u8) -> Result<u8, Error<SpiE, PinE>> {
    let mut frame = [reg, DUMMY_BYTE];
    self.transact(|spi| spi.transfer(&mut frame).map(|_| ()))?;
    trace!("read reg {:#04x} = {:#04x}", reg, frame[1]);
    Ok(frame[1])
  }

  // read all time registers in one burst
  fn read_time_block(&mut self) -> Result<[u8; TIME_REGISTER_COUNT], Error<SpiE, PinE>> {
    let mut frame = [DUMMY_BYTE; TIME_REGISTER_COUNT + 1];
    frame[0] = REG_HUNDREDTHS;
    self.transact(|spi| spi.transfer(&mut frame).map(|_| ()))?;
    let mut block = [0u8; TIME_REGISTER_COUNT];
    block.copy_from_slice(&frame[1..]);
    trace!("read time block {:02x?}", block);
    Ok(block)
  }

  // write all time registers in one burst, then mark the registers valid
  fn write_time_block(&mut self, regs: &TimeRegisters, mode: HourMode)
    -> Result<(), Error<SpiE, PinE>> {
    let block = regs.pack(mode);
    trace!("write time block {:02x?}", block);
    let mut frame = [0u8; TIME_REGISTER_COUNT + 1];
    frame[0] = REG_HUNDREDTHS | WRITE_FLAG;
    frame[1..].copy_from_slice(&block);
    self.transact(|spi| spi.write(&frame))?;
    self.set_validity()
  }

  // set specific bits in a register:
  // all bits must be high that you wish to set
  fn set_reg_bits(&mut self, reg: u8, bits: u8) -> Result<(), Error<SpiE, PinE>> {
    let mut reg_val = self.read_register(reg)?;
    reg_val |= bits; // Set bits that are high
    self.write_register(reg, reg_val)
  }

  // clear specific bits in a register:
  // all bits must be high that you wish to be cleared
  fn clear_reg_bits(&mut self, reg: u8, bits: u8) -> Result<(), Error<SpiE, PinE>> {
    let mut reg_val = self.read_register(reg)?;
    reg_val &= !(bits); // Clear  bits that are high
    self.write_register(reg, reg_val)
  }

  // Shared setter for the plain BCD fields:
  // clamp, skip the write if unchanged, otherwise write and mark valid
  fn update_bcd_register(&mut self, reg: u8, value: u8, range: core::ops::RangeInclusive<u8>)
    -> Result<bool, Error<SpiE, PinE>> {
    let value = clamp(value, range);
    if value == bcd_to_bin(self.read_register(reg)?) {
      return Ok(false);
    }
    self.write_register(reg, bin_to_bcd(value))?;
    self.set_validity()?;
    Ok(true)
  }

  /// Check whether the time registers can be trusted:
  /// false if they may have been corrupted by a loss of power since they were last written.
  pub fn get_validity(&mut self) -> Result<bool, Error<SpiE, PinE>> {
    match self.scheme {
      ValidityScheme::OscillatorStopFlag =>
        Ok(0 == (self.read_register(REG_STATUS)? & OSC_STOP_FLAG)),
      ValidityScheme::CenturyBit =>
        Ok(0 != (self.read_register(REG_MONTH)? & CENTURY_BIT)),
    }
  }

  /// Mark the time registers as valid, preserving the other bits of the flag's register.
  /// Every write method calls this already.
  pub fn set_validity(&mut self) -> Result<(), Error<SpiE, PinE>> {
    debug!("mark time valid ({:?})", self.scheme);
    match self.scheme {
      ValidityScheme::OscillatorStopFlag => self.clear_reg_bits(REG_STATUS, OSC_STOP_FLAG),
      ValidityScheme::CenturyBit => self.set_reg_bits(REG_MONTH, CENTURY_BIT),
    }
  }

  /// Get the hour encoding currently selected on the device
  pub fn get_time_format(&mut self) -> Result<HourMode, Error<SpiE, PinE>> {
    Ok(HourMode::from_hours_register(self.read_register(REG_HOURS)?))
  }

  /// Select 12h or 24h hour encoding.
  /// Returns false if the device already uses `mode`.
  /// Only the mode bit is flipped: the stored hour is not converted,
  /// so set the hours again after changing the format.
  pub fn set_time_format(&mut self, mode: HourMode) -> Result<bool, Error<SpiE, PinE>> {
    let raw = self.read_register(REG_HOURS)?;
    if HourMode::from_hours_register(raw) == mode {
      return Ok(false);
    }
    let raw = match mode {
      HourMode::H24 => raw & !HOUR_MODE_BIT,
      HourMode::H12 => raw | HOUR_MODE_BIT,
    };
    debug!("time format {:?}", mode);
    self.write_register(REG_HOURS, raw)?;
    self.set_validity()?;
    Ok(true)
  }

  /// Read all time registers in a single burst
  pub fn get_time_registers(&mut self) -> Result<TimeRegisters, Error<SpiE, PinE>> {
    let block = self.read_time_block()?;
    Ok(TimeRegisters::unpack(&block, HourMode::from_hours_register(block[3])))
  }

  /// Write all time registers in a single burst, using the hour encoding currently
  /// selected on the device. Out of range fields are clamped.
  pub fn set_time_registers(&mut self, regs: &TimeRegisters) -> Result<(), Error<SpiE, PinE>> {
    let mode = self.get_time_format()?;
    self.write_time_block(regs, mode)
  }

  /// Get hundredths of seconds (0..99)
  pub fn get_hundredths(&mut self) -> Result<u8, Error<SpiE, PinE>> {
    Ok(bcd_to_bin(self.read_register(REG_HUNDREDTHS)?))
  }

  /// Set hundredths of seconds (0..99)
  pub fn set_hundredths(&mut self, hundredths: u8) -> Result<bool, Error<SpiE, PinE>> {
    self.update_bcd_register(REG_HUNDREDTHS, hundredths, registers::HUNDREDTHS_RANGE)
  }

  /// Get seconds (0..59)
  pub fn get_seconds(&mut self) -> Result<u8, Error<SpiE, PinE>> {
    Ok(bcd_to_bin(self.read_register(REG_SECONDS)?))
  }

  /// Set seconds (0..59)
  pub fn set_seconds(&mut self, seconds: u8) -> Result<bool, Error<SpiE, PinE>> {
    self.update_bcd_register(REG_SECONDS, seconds, registers::SECONDS_RANGE)
  }

  /// Get minutes (0..59)
  pub fn get_minutes(&mut self) -> Result<u8, Error<SpiE, PinE>> {
    Ok(bcd_to_bin(self.read_register(REG_MINUTES)?))
  }

  /// Set minutes (0..59)
  pub fn set_minutes(&mut self, minutes: u8) -> Result<bool, Error<SpiE, PinE>> {
    self.update_bcd_register(REG_MINUTES, minutes, registers::MINUTES_RANGE)
  }

  /// Get hours: 0..23 in 24h mode, 1..12 in 12h mode
  pub fn get_hours(&mut self) -> Result<u8, Error<SpiE, PinE>> {
    let raw = self.read_register(REG_HOURS)?;
    Ok(decode_hours(raw, HourMode::from_hours_register(raw)).0)
  }

  /// Set hours: 0..23 in 24h mode, 1..12 in 12h mode.
  /// The AM/PM bit is preserved.
  pub fn set_hours(&mut self, hours: u8) -> Result<bool, Error<SpiE, PinE>> {
    let raw = self.read_register(REG_HOURS)?;
    let mode = HourMode::from_hours_register(raw);
    let hours = clamp(hours, mode.hour_range());
    let (current, am_pm) = decode_hours(raw, mode);
    if hours == current {
      return Ok(false);
    }
    self.write_register(REG_HOURS, encode_hours(hours, am_pm, mode))?;
    self.set_validity()?;
    Ok(true)
  }

  /// Get AM or PM. Always `Am` in 24h mode.
  pub fn get_am_pm(&mut self) -> Result<AmPm, Error<SpiE, PinE>> {
    let raw = self.read_register(REG_HOURS)?;
    Ok(decode_hours(raw, HourMode::from_hours_register(raw)).1)
  }

  /// Set AM or PM. Returns false without writing in 24h mode.
  pub fn set_am_pm(&mut self, am_pm: AmPm) -> Result<bool, Error<SpiE, PinE>> {
    let raw = self.read_register(REG_HOURS)?;
    let mode = HourMode::from_hours_register(raw);
    if mode == HourMode::H24 {
      return Ok(false);
    }
    let (hours, current) = decode_hours(raw, mode);
    if am_pm == current {
      return Ok(false);
    }
    self.write_register(REG_HOURS, encode_hours(hours, am_pm, mode))?;
    self.set_validity()?;
    Ok(true)
  }

  /// Get the day of week (1..7, 1 = Sunday)
  pub fn get_weekday(&mut self) -> Result<u8, Error<SpiE, PinE>> {
    Ok(bcd_to_bin(self.read_register(REG_WEEKDAY)?))
  }

  /// Set the day of week (1..7, 1 = Sunday)
  pub fn set_weekday(&mut self, weekday: u8) -> Result<bool, Error<SpiE, PinE>> {
    self.update_bcd_register(REG_WEEKDAY, weekday, registers::WEEKDAY_RANGE)
  }

  /// Get the calendar day of month (1..31)
  pub fn get_day(&mut self) -> Result<u8, Error<SpiE, PinE>> {
    Ok(bcd_to_bin(self.read_register(REG_DAY)?))
  }

  /// Set the calendar day of month (1..31).
  /// Not checked against the length of the current month.
  pub fn set_day(&mut self, day: u8) -> Result<bool, Error<SpiE, PinE>> {
    self.update_bcd_register(REG_DAY, day, registers::DAY_RANGE)
  }

  /// Get the calendar month (1..12)
  pub fn get_month(&mut self) -> Result<u8, Error<SpiE, PinE>> {
    Ok(decode_month(self.read_register(REG_MONTH)?).0)
  }

  /// Set the calendar month (1..12). The century bit is preserved.
  pub fn set_month(&mut self, month: u8) -> Result<bool, Error<SpiE, PinE>> {
    let month = clamp(month, registers::MONTH_RANGE);
    let (current, century) = decode_month(self.read_register(REG_MONTH)?);
    if month == current {
      return Ok(false);
    }
    self.write_register(REG_MONTH, encode_month(month, century))?;
    self.set_validity()?;
    Ok(true)
  }

  /// Get the calendar year (00..99 for 2000..2099)
  pub fn get_year(&mut self) -> Result<u8, Error<SpiE, PinE>> {
    Ok(bcd_to_bin(self.read_register(REG_YEAR)?))
  }

  /// Set the calendar year (00..99 for 2000..2099)
  pub fn set_year(&mut self, year: u8) -> Result<bool, Error<SpiE, PinE>> {
    self.update_bcd_register(REG_YEAR, year, registers::YEAR_RANGE)
  }

  /// Get the century bit (0 or 1)
  pub fn get_century(&mut self) -> Result<u8, Error<SpiE, PinE>> {
    Ok(decode_month(self.read_register(REG_MONTH)?).1)
  }

  /// Set the century bit (0 or 1).
  /// Returns false without writing under `ValidityScheme::CenturyBit`,
  /// where the bit is reserved for validity tracking.
  pub fn set_century(&mut self, century: u8) -> Result<bool, Error<SpiE, PinE>> {
    if self.scheme == ValidityScheme::CenturyBit {
      debug!("century bit is reserved for validity");
      return Ok(false);
    }
    let century = clamp(century, registers::CENTURY_RANGE);
    let (month, current) = decode_month(self.read_register(REG_MONTH)?);
    if century == current {
      return Ok(false);
    }
    self.write_register(REG_MONTH, encode_month(month, century))?;
    self.set_validity()?;
    Ok(true)
  }

  /// Get the raw trickle charger configuration byte
  pub fn get_trickle_charger_raw(&mut self) -> Result<u8, Error<SpiE, PinE>> {
    self.read_register(REG_TRICKLE_CHARGER)
  }

  /// Get the trickle charger configuration, if it is one of the recognized modes
  pub fn get_trickle_charger_mode(&mut self) -> Result<Option<TrickleChargeMode>, Error<SpiE, PinE>> {
    Ok(TrickleChargeMode::try_from(self.get_trickle_charger_raw()?).ok())
  }

  /// Configure the trickle charger. Returns false if already configured so.
  pub fn set_trickle_charger_mode(&mut self, mode: TrickleChargeMode) -> Result<bool, Error<SpiE, PinE>> {
    if mode as u8 == self.get_trickle_charger_raw()? {
      return Ok(false);
    }
    debug!("trickle charger {:?}", mode);
    self.write_register(REG_TRICKLE_CHARGER, mode as u8)?;
    self.set_validity()?;
    Ok(true)
  }

  /// Configure the trickle charger from a raw configuration byte.
  /// Returns false without touching the device if `raw` is not a recognized mode.
  pub fn set_trickle_charger_raw(&mut self, raw: u8) -> Result<bool, Error<SpiE, PinE>> {
    match TrickleChargeMode::try_from(raw) {
      Ok(mode) => self.set_trickle_charger_mode(mode),
      Err(_) => Ok(false),
    }
  }

  /// Read the time registers and convert them to seconds since the unix epoch.
  /// - `timezone` : hours east of GMT (-12..12) that the device time is kept in
  /// Hundredths of seconds are ignored.
  pub fn get_epoch(&mut self, timezone: i8) -> Result<i64, Error<SpiE, PinE>> {
    let block = self.read_time_block()?;
    let mode = HourMode::from_hours_register(block[3]);
    Ok(to_epoch(&TimeRegisters::unpack(&block, mode), mode, timezone))
  }

  /// Set the time registers from seconds since the unix epoch.
  /// - `timezone` : hours east of GMT (-12..12) that the device time is kept in
  /// Times outside 2000..2099 (local) saturate to that window.
  /// Hundredths of seconds and the century bit are written as zero.
  pub fn set_epoch(&mut self, epoch: i64, timezone: i8) -> Result<(), Error<SpiE, PinE>> {
    let mode = self.get_time_format()?;
    let regs = from_epoch(epoch, mode, timezone);
    self.write_time_block(&regs, mode)
  }

}

impl<SPI, CS, SpiE, PinE> DateTimeAccess for DS1390<SPI, CS>
  where
    SPI: Transfer<u8, Error = SpiE> + Write<u8, Error = SpiE>,
    CS: OutputPin<Error = PinE>,
{
  type Error = Error<SpiE, PinE>;

  /// Datetime in GMT, with hundredths of seconds as sub-second precision.
  /// Fails if the registers do not hold a real calendar date.
  fn datetime(&mut self) -> Result<NaiveDateTime, Self::Error> {
    let block = self.read_time_block()?;
    let mode = HourMode::from_hours_register(block[3]);
    let regs = TimeRegisters::unpack(&block, mode);
    NaiveDate::from_ymd_opt(2000 + regs.year as i32, regs.month as u32, regs.day as u32)
      .ok_or(Error::InvalidDateTime)?;
    let nanos = regs.hundredths.min(99) as u32 * 10_000_000;
    NaiveDateTime::from_timestamp_opt(to_epoch(&regs, mode, 0), nanos)
      .ok_or(Error::InvalidDateTime)
  }

  /// Only datetimes from 2000-01-01 through 2099-12-31 (GMT) are accepted.
  fn set_datetime(&mut self, datetime: &NaiveDateTime) -> Result<(), Self::Error> {
    let timestamp = datetime.timestamp();
    if !(MIN_EPOCH..=MAX_EPOCH).contains(&timestamp) {
      return Err(Error::InvalidDateTime);
    }
    let mode = self.get_time_format()?;
    let mut regs = from_epoch(timestamp, mode, 0);
    regs.hundredths = (datetime.timestamp_subsec_nanos() / 10_000_000).min(99) as u8;
    self.write_time_block(&regs, mode)
  }

}
