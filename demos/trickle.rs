extern crate ds1390_rtc;

use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::sysfs_gpio::Direction;
use linux_embedded_hal::{Delay, Spidev, SysfsPin};
use ds1390_rtc::{DS1390, TrickleChargeMode};
use std::time::Duration;

/// Example enabling/disabling backup power supply trickle charging.
///  Assumptions:
///  - The host this example runs on behaves like a Raspberry Pi 3+ running linux
///  - The device is attached to spidev0.0, with its chip select wired to GPIO 8
///  - A rechargeable backup cell (or supercap) is connected to VBACKUP


fn main() {
    env_logger::init();

    let mut spi = Spidev::open("/dev/spidev0.0").expect("Failed to open SPI device");
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(ds1390_rtc::SPI_CLOCK_HZ)
        .mode(SpiModeFlags::SPI_MODE_1 | SpiModeFlags::SPI_NO_CS)
        .build();
    spi.configure(&options).expect("Failed to configure SPI");

    let cs = SysfsPin::new(8);
    cs.export().expect("Failed to export chip select");
    cs.set_direction(Direction::High).expect("Failed to drive chip select");

    // Create instance of the DS1390 driver
    let mut rtc = DS1390::new(spi, cs);
    rtc.init(&mut Delay).unwrap();

    println!("trickle mode: {:?} (raw {:#04x})",
             rtc.get_trickle_charger_mode().unwrap(),
             rtc.get_trickle_charger_raw().unwrap());

    // enable trickle charging through 2k with a series diode
    let changed = rtc.set_trickle_charger_mode(TrickleChargeMode::Ohms2kDiode).unwrap();
    println!("trickle enabled, changed: {}", changed);

    // charge for three seconds
    let dur = Duration::from_secs(3);
    println!("charging backup for {:?}", dur);
    spin_sleep::sleep(dur);

    // disable trickle charging
    let changed = rtc.set_trickle_charger_mode(TrickleChargeMode::Disabled).unwrap();
    println!("trickle disabled, changed: {}", changed);
}
