extern crate ds1390_rtc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use ds1390_rtc::{DS1390, Error, HourMode};
use embedded_hal::blocking::spi::{Transfer, Write};
use embedded_hal::digital::v2::OutputPin;
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::sysfs_gpio::Direction;
use linux_embedded_hal::{Delay, Spidev, SysfsPin};

/// This example probes a clock that has already been set
/// (see the `set_from_system` example) and has been running on backup
/// power since. It only reads: no register is written.
///
/// This example assumes:
/// - The host connecting to the RTC is running a linux environment (such as Raspberry Pi)
/// - The RTC is attached to spidev0.0, with its chip select wired to GPIO 8
/// - The RTC keeps GMT (timezone offset 0)
///

const TIMEZONE: i8 = 0;

fn read_rtc_status<SPI, CS, SpiE, PinE>(rtc: &mut DS1390<SPI, CS>) -> Result<(), Error<SpiE, PinE>>
  where
    SPI: Transfer<u8, Error = SpiE> + Write<u8, Error = SpiE>,
    CS: OutputPin<Error = PinE>,
{
  let valid = rtc.get_validity()?;
  println!("time registers valid: {}", valid);
  if !valid {
    println!("oscillator stopped since the clock was last set: time is not trustworthy");
  }

  let format = rtc.get_time_format()?;
  println!("time format: {:?}", format);

  let regs = rtc.get_time_registers()?;
  let am_pm = if format == HourMode::H12 { format!(" {:?}", regs.am_pm) } else { String::new() };
  println!("rtc regs: 20{:02}-{:02}-{:02} (wday {}) {:02}:{:02}:{:02}.{:02}{} century {}",
           regs.year, regs.month, regs.day, regs.weekday,
           regs.hours, regs.minutes, regs.seconds, regs.hundredths, am_pm, regs.century);

  let sys_timestamp = Utc::now().timestamp();
  let rtc_timestamp = rtc.get_epoch(TIMEZONE)?;
  println!("sys unix {}", sys_timestamp);
  println!("rtc unix {}", rtc_timestamp);
  println!("drift {} s", rtc_timestamp - sys_timestamp);

  println!("trickle charger: {:?}", rtc.get_trickle_charger_mode()?);

  Ok(())
}

fn main() -> Result<()> {
  env_logger::init();

  let mut spi = Spidev::open("/dev/spidev0.0")?;
  let options = SpidevOptions::new()
    .bits_per_word(8)
    .max_speed_hz(ds1390_rtc::SPI_CLOCK_HZ)
    .mode(SpiModeFlags::SPI_MODE_1 | SpiModeFlags::SPI_NO_CS)
    .build();
  spi.configure(&options)?;

  let cs = SysfsPin::new(8);
  cs.export()?;
  cs.set_direction(Direction::High)?;

  let mut rtc = DS1390::new(spi, cs);
  rtc.init(&mut Delay).map_err(|e| anyhow!("{:?}", e))?;

  read_rtc_status(&mut rtc).map_err(|e| anyhow!("{:?}", e))?;

  Ok(())
}
