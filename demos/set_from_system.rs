extern crate ds1390_rtc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use ds1390_rtc::{DateTimeAccess, HourMode, DS1390};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::sysfs_gpio::Direction;
use linux_embedded_hal::{Delay, Spidev, SysfsPin};

/// Example setting the RTC from the host's system clock, then reading it back.
///  Assumptions:
///  - The host this example runs on behaves like a Raspberry Pi 3+ running linux
///  - The device is attached to spidev0.0, with its chip select wired to GPIO 8
///
/// The following was tested by enabling spi0 on a Raspberry Pi 3+
///  using `sudo raspi-config`
///  and connecting the MOSI, MISO, SCLK, GND, and 3.3V pins from RPi to the RTC

const CS_GPIO: u64 = 8;

fn main() -> Result<()> {
    env_logger::init();

    let mut spi = Spidev::open("/dev/spidev0.0")?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(ds1390_rtc::SPI_CLOCK_HZ)
        .mode(SpiModeFlags::SPI_MODE_1 | SpiModeFlags::SPI_NO_CS)
        .build();
    spi.configure(&options)?;

    let cs = SysfsPin::new(CS_GPIO);
    cs.export()?;
    cs.set_direction(Direction::High)?;

    let mut rtc = DS1390::new(spi, cs);
    rtc.init(&mut Delay).map_err(|e| anyhow!("init: {:?}", e))?;

    let valid = rtc.get_validity().map_err(|e| anyhow!("{:?}", e))?;
    println!("rtc registers valid before set: {}", valid);

    // keep the device in 24h mode: the 12h mode does not roll AM/PM over
    rtc.set_time_format(HourMode::H24).map_err(|e| anyhow!("{:?}", e))?;

    let sys_dt = Utc::now().naive_utc();
    rtc.set_datetime(&sys_dt).map_err(|e| anyhow!("set: {:?}", e))?;

    let rtc_dt = rtc.datetime().map_err(|e| anyhow!("get: {:?}", e))?;
    println!("sys {}\r\nrtc {}", sys_dt, rtc_dt);

    let valid = rtc.get_validity().map_err(|e| anyhow!("{:?}", e))?;
    println!("rtc registers valid after set: {}", valid);

    Ok(())
}
