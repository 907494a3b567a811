//! Linux backends: spidev video channel and i2c command interface

use std::io;
use std::thread;
use std::time::{Duration, Instant};

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use tracing::debug;

use crate::bus::{DeviceControl, SpiBus};

/// Command interface slave address
const CCI_ADDRESS: u16 = 0x2a;
const REG_STATUS: u16 = 0x0002;
const REG_COMMAND: u16 = 0x0004;
const REG_DATA_LENGTH: u16 = 0x0006;
const STATUS_BUSY: u16 = 0x0001;
/// OEM module, run command 0x40, protection bit set
const CMD_OEM_REBOOT: u16 = 0x4842;
const BUSY_TIMEOUT: Duration = Duration::from_millis(500);

/// Video channel on `/dev/spidev0.<bus>`
#[derive(Default)]
pub struct SpidevBus {
    device: Option<Spidev>,
}

impl SpidevBus {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpiBus for SpidevBus {
    fn open(&mut self, bus_index: u8, speed_hz: u32) -> io::Result<()> {
        let path = format!("/dev/spidev0.{bus_index}");
        let mut spi = Spidev::open(&path)?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(speed_hz)
            .mode(SpiModeFlags::SPI_MODE_3)
            .build();
        spi.configure(&options)?;
        debug!(path = %path, speed_hz, "spidev configured");
        self.device = Some(spi);
        Ok(())
    }

    fn close(&mut self) {
        self.device = None;
    }

    fn read_packet(&mut self, packet: &mut [u8]) -> io::Result<()> {
        let spi = self
            .device
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "spi bus not open"))?;
        let mut transfer = SpidevTransfer::read(packet);
        spi.transfer(&mut transfer)
    }
}

/// Command interface on `/dev/i2c-1`
pub struct CciDevice {
    device: LinuxI2CDevice,
}

impl CciDevice {
    pub fn open() -> io::Result<Self> {
        Self::open_path("/dev/i2c-1")
    }

    pub fn open_path(path: &str) -> io::Result<Self> {
        let device = LinuxI2CDevice::new(path, CCI_ADDRESS).map_err(i2c_error)?;
        Ok(Self { device })
    }

    fn wait_idle(&mut self) -> io::Result<()> {
        let deadline = Instant::now() + BUSY_TIMEOUT;
        while self.read_register(REG_STATUS)? & STATUS_BUSY != 0 {
            if Instant::now() >= deadline {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "command interface busy"));
            }
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }
}

impl DeviceControl for CciDevice {
    fn reboot(&mut self) -> io::Result<()> {
        self.wait_idle()?;
        self.write_register(REG_DATA_LENGTH, 0)?;
        self.write_register(REG_COMMAND, CMD_OEM_REBOOT)
    }

    fn read_register(&mut self, register: u16) -> io::Result<u16> {
        self.device
            .write(&register.to_be_bytes())
            .map_err(i2c_error)?;
        let mut value = [0u8; 2];
        self.device.read(&mut value).map_err(i2c_error)?;
        Ok(u16::from_be_bytes(value))
    }

    fn write_register(&mut self, register: u16, value: u16) -> io::Result<()> {
        let [rh, rl] = register.to_be_bytes();
        let [vh, vl] = value.to_be_bytes();
        self.device.write(&[rh, rl, vh, vl]).map_err(i2c_error)
    }
}

fn i2c_error(err: i2cdev::linux::LinuxI2CError) -> io::Error {
    io::Error::other(err.to_string())
}
