//! Device access traits
//!
//! The reader only talks to the sensor through these two seams, so the
//! hardware backend and the scripted test doubles are interchangeable.

use std::io;

/// Synchronous packet bus (SPI video channel)
pub trait SpiBus: Send {
    /// Open bus `bus_index` at `speed_hz`
    fn open(&mut self, bus_index: u8, speed_hz: u32) -> io::Result<()>;

    /// Close the bus; closing a closed bus is a no-op
    fn close(&mut self);

    /// Blocking read of exactly one packet into `packet`
    fn read_packet(&mut self, packet: &mut [u8]) -> io::Result<()>;
}

/// Sensor control channel (CCI registers)
pub trait DeviceControl: Send {
    /// Issue the reboot command; the caller waits for the device to settle
    fn reboot(&mut self) -> io::Result<()>;

    fn read_register(&mut self, register: u16) -> io::Result<u16>;

    fn write_register(&mut self, register: u16, value: u16) -> io::Result<()>;
}

impl<T: SpiBus + ?Sized> SpiBus for Box<T> {
    fn open(&mut self, bus_index: u8, speed_hz: u32) -> io::Result<()> {
        (**self).open(bus_index, speed_hz)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn read_packet(&mut self, packet: &mut [u8]) -> io::Result<()> {
        (**self).read_packet(packet)
    }
}

impl<T: DeviceControl + ?Sized> DeviceControl for Box<T> {
    fn reboot(&mut self) -> io::Result<()> {
        (**self).reboot()
    }

    fn read_register(&mut self, register: u16) -> io::Result<u16> {
        (**self).read_register(register)
    }

    fn write_register(&mut self, register: u16, value: u16) -> io::Result<()> {
        (**self).write_register(register, value)
    }
}
