///! Driver context: device table and public operations
///!
///! Each public operation takes the device lock exactly once.

use std::sync::{ MutexGuard, OnceLock };

use embedded_hal::blocking::delay::DelayUs;
use log::error;

use crate::{
    config::*,
    constants::*,
    device::*,
    errors::*,
    lock::DeviceLock,
    register::RegisterImage,
    transport::RegisterIo,
};


/// HMC7043 driver, owns up to [`MAX_DEVICES`] devices
#[derive(Debug)]
pub struct Hmc7043 {
    devices: [OnceLock<DeviceLock<Device>>; MAX_DEVICES],
    config: DriverConfig,
}

impl Default for Hmc7043 {
    fn default() -> Self {
        Hmc7043::new(DriverConfig::default())
    }
}

/// Logs a failed operation
fn logged<T>(dev: usize, op: &str, res: Result<T>) -> Result<T> {
    if let Err(e) = &res {
        error!("hmc7043[{}] {} failed: {}", dev, op, e);
    }
    res
}

impl Hmc7043 {

    /// Empty device table
    pub fn new(config: DriverConfig) -> Self {
        Hmc7043 {
            devices: Default::default(),
            config,
        }
    }

    #[inline]
    pub fn config(self: &Self) -> &DriverConfig {
        &self.config
    }

    /// Attaches a transport to device slot `dev`.
    ///
    /// Attaching an already attached slot swaps the transport and leaves the
    /// device uninitialized.
    pub fn attach<IO, D>(self: &Self, dev: usize, io: IO, delay: D) -> Result<()>
    where IO: RegisterIo + Send + 'static,
          D: DelayUs<u32> + Send + 'static,
    {
        let slot = match self.devices.get(dev) {
            Some(slot) => slot,
            None => return logged(dev, "attach", Err(Error::InvalidArgument)),
        };
        let device = Device::new(dev, Box::new(io), Box::new(delay));
        if let Err(rejected) = slot.set(DeviceLock::new(device)) {
            let res = rejected.into_inner().and_then(|fresh| {
                let lock = slot.get().ok_or(Error::NotInitialized)?;
                self.take(lock, "attach")?.reattach(fresh);
                Ok(())
            });
            return logged(dev, "attach", res);
        }
        Ok(())
    }

    fn take<'a>(self: &Self, slot: &'a DeviceLock<Device>, op: &str) -> Result<MutexGuard<'a, Device>> {
        slot.take(self.config.lock_timeout, op)
    }

    /// Locks an attached device
    fn lock(self: &Self, dev: usize, op: &str) -> Result<MutexGuard<'_, Device>> {
        let slot = self.devices.get(dev)
            .ok_or(Error::InvalidArgument)
            .and_then(|slot| slot.get().ok_or(Error::NotInitialized));
        logged(dev, op, slot.and_then(|slot| self.take(slot, op)))
    }

    /// Locks a device in `Ready` state and runs `f` on it
    fn with_ready<T, F>(self: &Self, dev: usize, op: &str, f: F) -> Result<T>
    where F: FnOnce(&mut Device) -> Result<T>
    {
        let mut d = self.lock(dev, op)?;
        logged(dev, op, d.ensure_ready().and_then(|_| f(&mut *d)))
    }


    /// Validates `params` and brings device `dev` up, cold or warm.
    ///
    /// Holds the device lock for the whole sequence.
    pub fn init_device(self: &Self, dev: usize, params: &DeviceParams, mode: InitMode) -> Result<()> {
        let mut d = self.lock(dev, "init")?;
        d.init(params, mode, &self.config)
    }

    /// Current device state
    pub fn state(self: &Self, dev: usize) -> Result<DeviceState> {
        Ok(self.lock(dev, "state")?.state())
    }

    /// Copy of the register image
    pub fn register_image(self: &Self, dev: usize) -> Result<RegisterImage> {
        Ok(*self.lock(dev, "register image")?.image())
    }

    /// Parameters of the last successful bring-up, SYSREF mode kept current
    pub fn params(self: &Self, dev: usize) -> Result<Option<DeviceParams>> {
        Ok(self.lock(dev, "params")?.params().copied())
    }

    /// Raw register read, any attached device
    pub fn read_register(self: &Self, dev: usize, addr: u16) -> Result<u8> {
        let mut d = self.lock(dev, "read register")?;
        logged(dev, "read register", d.read(addr))
    }

    /// Raw register write, any attached device. The register image is not updated.
    pub fn write_register(self: &Self, dev: usize, addr: u16, value: u8) -> Result<()> {
        let mut d = self.lock(dev, "write register")?;
        logged(dev, "write register", d.write(addr, value))
    }

    /// Enables or disables output channel `ch`
    pub fn enable_channel(self: &Self, dev: usize, ch: usize, enable: bool) -> Result<()> {
        self.with_ready(dev, "enable channel", |d| d.enable_channel(ch, enable))
    }

    /// Alarm read-back and alarm signal
    pub fn get_alarms(self: &Self, dev: usize) -> Result<Alarms> {
        self.with_ready(dev, "get alarms", |d| d.alarms())
    }

    /// Alarm signal only
    pub fn get_alarm(self: &Self, dev: usize) -> Result<bool> {
        self.with_ready(dev, "get alarm", |d| d.alarm_signal())
    }

    /// Clears latched alarms
    pub fn clear_alarms(self: &Self, dev: usize) -> Result<()> {
        let delay_us = self.config.reset_delay_us;
        self.with_ready(dev, "clear alarms", |d| d.clear_alarms(delay_us))
    }

    /// Switches the pulse generator mode
    pub fn set_sysref_mode(self: &Self, dev: usize, mode: SysrefMode) -> Result<()> {
        self.with_ready(dev, "set sysref mode", |d| d.set_sysref_mode(mode))
    }

    /// Multi-slip request, `mask` bit N selects channel N
    pub fn slip_channels(self: &Self, dev: usize, mask: u16) -> Result<()> {
        let mask = logged(dev, "slip channels", ChannelMask::new(mask))?;
        let delay_us = self.config.reset_delay_us;
        self.with_ready(dev, "slip channels", |d| d.slip(mask, delay_us))
    }

    /// Emits `count` SYSREF pulses, `mask` bit N selects channel N
    pub fn sysref_pulse_n(self: &Self, dev: usize, mask: u16, count: PulseCount) -> Result<()> {
        let mask = logged(dev, "sysref pulse", ChannelMask::new(mask))?;
        let delay_us = self.config.reset_delay_us;
        self.with_ready(dev, "sysref pulse", |d| d.pulse(mask, count, delay_us))
    }

    /// Enters or leaves sleep mode
    pub fn sleep(self: &Self, dev: usize, sleep: bool) -> Result<()> {
        self.with_ready(dev, "sleep", |d| d.sleep(sleep))
    }
}
