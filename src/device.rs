///! Device state and register level procedures
///!
///! Everything here runs with the device lock already held.

use embedded_hal::blocking::delay::DelayUs;
use log::{ debug, error, info };

use crate::{ config::*, constants::*, errors::*, register::*, transport::* };


/// Device life cycle
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum DeviceState {
    /// Attached, never brought up, or a bring-up is in progress
    Uninitialized,
    /// Last bring-up succeeded, runtime services available
    Ready,
    /// Last bring-up failed, hardware state is unknown
    Failed,
}

/// Alarm read-back
#[derive(Debug,Copy,Clone,Default,PartialEq,Eq)]
pub struct Alarms {
    pub sysref_sync: bool,
    pub clock_phase: bool,
    pub sync_request: bool,
    pub alarm_signal: bool,
}


/// HMC7043 device
pub struct Device {
    index: usize,
    io: Box<dyn RegisterIo + Send>,
    delay: Box<dyn DelayUs<u32> + Send>,
    state: DeviceState,
    params: Option<DeviceParams>,
    image: RegisterImage,
}

impl core::fmt::Debug for Device {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Device")
            .field("index", &self.index)
            .field("state", &self.state)
            .field("params", &self.params)
            .finish()
    }
}

#[inline]
fn check_addr(addr: u16) -> Result<()> {
    if addr > REG_ADDR_MAX { Err(Error::InvalidArgument) } else { Ok(()) }
}

impl Device {

    /// Creates the device (not initialized, register image zeroed).
    ///
    /// `index` - device slot, used in log messages
    /// `io` - register transport
    /// `delay` - blocking delay provider
    pub fn new(
        index: usize,
        io: Box<dyn RegisterIo + Send>,
        delay: Box<dyn DelayUs<u32> + Send>,
    ) -> Self {
        Device {
            index,
            io,
            delay,
            state: DeviceState::Uninitialized,
            params: None,
            image: RegisterImage::default(),
        }
    }

    /// Takes over the transport and delay provider of `other`,
    /// the device has to be initialized again
    pub fn reattach(self: &mut Self, other: Device) {
        self.io = other.io;
        self.delay = other.delay;
        self.state = DeviceState::Uninitialized;
    }

    #[inline]
    pub fn index(self: &Self) -> usize {
        self.index
    }

    #[inline]
    pub fn state(self: &Self) -> DeviceState {
        self.state
    }

    /// Parameters of the last successful bring-up
    #[inline]
    pub fn params(self: &Self) -> Option<&DeviceParams> {
        self.params.as_ref()
    }

    #[inline]
    pub fn image(self: &Self) -> &RegisterImage {
        &self.image
    }

    pub fn ensure_ready(self: &Self) -> Result<()> {
        match self.state {
            DeviceState::Ready => Ok(()),
            _ => Err(Error::NotInitialized),
        }
    }

    /// Single register read
    pub fn read(self: &mut Self, addr: u16) -> Result<u8> {
        check_addr(addr)?;
        self.io.read(addr).map_err(|e| {
            error!("hmc7043[{}] read 0x{:04x} failed: {}", self.index, addr, e);
            e
        })
    }

    /// Single register write
    pub fn write(self: &mut Self, addr: u16, value: u8) -> Result<()> {
        check_addr(addr)?;
        self.io.write(addr, value).map_err(|e| {
            error!("hmc7043[{}] write 0x{:04x} = 0x{:02x} failed: {}", self.index, addr, value, e);
            e
        })
    }

    /// Reads a global field from the hardware
    pub fn read_field<F>(self: &mut Self) -> Result<F>
    where F: GlobalField + From<u8>
    {
        Ok(field_get(self.read(F::addr())?))
    }

    /// Read-modify-write of one global field, the image follows the hardware
    pub fn update<F>(self: &mut Self, f: F) -> Result<()>
    where F: GlobalField + Into<u8>
    {
        self.update_addr(F::addr(), |r| field_set(r, f))
    }

    /// Read-modify-write of one channel field, the image follows the hardware
    pub fn update_ch<F>(self: &mut Self, ch: usize, f: F) -> Result<()>
    where F: ChannelField + Into<u8>
    {
        self.update_addr(channel_addr(ch, F::addr()), |r| field_set(r, f))
    }

    fn update_addr<M>(self: &mut Self, addr: u16, m: M) -> Result<()>
    where M: FnOnce(u8) -> u8
    {
        let v = m(self.read(addr)?);
        self.write(addr, v)?;
        self.image.set_reg(addr, v);
        Ok(())
    }

    /// Request toggle: set the bit, wait `delay_us`, clear it
    pub fn toggle<F>(self: &mut Self, delay_us: u32) -> Result<()>
    where F: GlobalField + From<bool> + Into<u8>
    {
        let addr = F::addr();
        let r = self.read(addr)?;
        self.write(addr, field_set(r, F::from(true)))?;
        self.delay.delay_us(delay_us);
        let cleared = field_set(r, F::from(false));
        self.write(addr, cleared)?;
        self.image.set_reg(addr, cleared);
        Ok(())
    }

    /// Writes every image register, ascending addresses
    pub fn commit(self: &mut Self) -> Result<()> {
        for addr in image_registers() {
            let v = self.image.reg(addr);
            self.write(addr, v)?;
        }
        Ok(())
    }

    /// Refreshes every image register from the hardware
    pub fn read_back(self: &mut Self) -> Result<()> {
        for addr in image_registers() {
            let v = self.read(addr)?;
            self.image.set_reg(addr, v);
        }
        Ok(())
    }

    /// 24 bit product id
    pub fn product_id(self: &mut Self) -> Result<u32> {
        let mut id = 0u32;
        for addr in REG_PRODUCT_ID.iter().rev() {
            id = id << 8 | self.read(*addr)? as u32;
        }
        Ok(id)
    }

    fn identify(self: &mut Self) -> Result<()> {
        let id = self.product_id()?;
        if id != PRODUCT_ID {
            error!("hmc7043[{}] invalid product id: 0x{:06x}, expected 0x{:06x}", self.index, id, PRODUCT_ID);
            return Err(Error::ProtocolFailure);
        }
        debug!("hmc7043[{}] found", self.index);
        Ok(())
    }


    /// Brings the device up with `params`.
    ///
    /// Parameters are validated before any register access. A failing
    /// bring-up leaves the device `Failed`, without rollback.
    pub fn init(self: &mut Self, params: &DeviceParams, mode: InitMode, cfg: &DriverConfig) -> Result<()> {
        let image = RegisterImage::configure(params).map_err(|e| {
            error!("hmc7043[{}] init: invalid parameters", self.index);
            e
        })?;

        self.state = DeviceState::Uninitialized;
        let res = match mode {
            InitMode::Cold => self.cold_init(image, params, cfg),
            InitMode::Warm => self.read_back(),
        };

        match res {
            Ok(()) => {
                self.params = Some(*params);
                self.state = DeviceState::Ready;
                info!("hmc7043[{}] {:?} init done", self.index, mode);
                Ok(())
            }
            Err(e) => {
                self.state = DeviceState::Failed;
                error!("hmc7043[{}] {:?} init aborted: {}", self.index, mode, e);
                Err(e)
            }
        }
    }

    fn cold_init(self: &mut Self, image: RegisterImage, params: &DeviceParams, cfg: &DriverConfig) -> Result<()> {
        self.identify()?;
        self.toggle::<SoftReset>(cfg.reset_delay_us)?;

        self.image = image;
        self.commit()?;

        self.toggle::<SoftReset>(cfg.reset_delay_us)?;
        self.toggle::<RestartDividers>(cfg.request_delay_us)?;
        self.toggle::<ReseedRequest>(cfg.request_delay_us)?;
        self.toggle::<PulseGenRequest>(cfg.request_delay_us)?;

        self.wait_settle(params, cfg)?;

        let phase: ClockPhaseStatus = self.read_field()?;
        if !phase.0 {
            error!("hmc7043[{}] clock outputs not in phase after {} SYSREF periods",
                   self.index, cfg.settle_periods);
            return Err(Error::ProtocolFailure);
        }

        for ch in (0..NUM_CHANNELS).filter(|&ch| params.channels[ch].is_used()) {
            self.image.set_ch(ch, SyncEnable(false));
            let addr = channel_addr(ch, CH_CONTROL);
            let v = self.image.reg(addr);
            self.write(addr, v)?;
        }
        Ok(())
    }

    /// Blocks for `settle_periods` SYSREF periods, timer as read back from the device
    fn wait_settle(self: &mut Self, params: &DeviceParams, cfg: &DriverConfig) -> Result<()> {
        let lsb = self.read(REG_SYSREF_TIMER_LSB)?;
        let msb = self.read(REG_SYSREF_TIMER_MSB)?;
        let timer = sysref_timer_from(lsb, msb) as u64;
        let effective = params.clkin.effective_hz();
        let period_us = (timer * 1_000_000 + effective - 1) / effective;
        let wait_us = period_us.saturating_mul(cfg.settle_periods as u64);
        debug!("hmc7043[{}] SYSREF timer {}, settling {}us", self.index, timer, wait_us);
        self.delay.delay_us(wait_us.min(u32::MAX as u64) as u32);
        Ok(())
    }


    /// Enables or disables one output channel
    pub fn enable_channel(self: &mut Self, ch: usize, enable: bool) -> Result<()> {
        if ch >= NUM_CHANNELS {
            return Err(Error::InvalidArgument);
        }
        self.update_ch(ch, ChannelEnable(enable))
    }

    pub fn alarms(self: &mut Self) -> Result<Alarms> {
        let readback = self.read(REG_ALARM_READBACK)?;
        let signal = self.read(REG_ALARM_SIGNAL)?;
        Ok(Alarms {
            sysref_sync: field_get::<SysrefSyncStatus>(readback).0,
            clock_phase: field_get::<ClockPhaseStatus>(readback).0,
            sync_request: field_get::<SyncRequestStatus>(readback).0,
            alarm_signal: field_get::<AlarmSignal>(signal).0,
        })
    }

    pub fn alarm_signal(self: &mut Self) -> Result<bool> {
        let signal: AlarmSignal = self.read_field()?;
        Ok(signal.0)
    }

    pub fn clear_alarms(self: &mut Self, delay_us: u32) -> Result<()> {
        self.toggle::<ClearAlarms>(delay_us)
    }

    pub fn set_sysref_mode(self: &mut Self, mode: SysrefMode) -> Result<()> {
        self.update(PulseGenMode(mode.bits()))?;
        if let Some(p) = self.params.as_mut() {
            p.sysref.mode = mode;
        }
        Ok(())
    }

    /// Every masked channel has to be in use
    fn check_mask(self: &Self, mask: ChannelMask) -> Result<()> {
        let params = self.params.as_ref().ok_or(Error::NotInitialized)?;
        match mask.channels().find(|&ch| !params.channels[ch].is_used()) {
            Some(ch) => {
                error!("hmc7043[{}] channel {} in mask 0x{:04x} is not used", self.index, ch, mask.bits());
                Err(Error::InvalidArgument)
            }
            None => Ok(()),
        }
    }

    /// Multi-slip request for the channels in `mask`
    pub fn slip(self: &mut Self, mask: ChannelMask, delay_us: u32) -> Result<()> {
        self.check_mask(mask)?;
        self.toggle::<SlipRequest>(delay_us)
    }

    /// Emits `count` SYSREF pulses, the pulse generator has to be in a pulsed mode
    pub fn pulse(self: &mut Self, mask: ChannelMask, count: PulseCount, delay_us: u32) -> Result<()> {
        self.check_mask(mask)?;
        let mode: PulseGenMode = self.read_field()?;
        if mode.0 == PULSE_GEN_MODE_LEVEL || mode.0 == PULSE_GEN_MODE_CONTINUOUS {
            error!("hmc7043[{}] SYSREF pulse request in non pulsed mode {}", self.index, mode.0);
            return Err(Error::InvalidState);
        }
        self.set_sysref_mode(SysrefMode::Pulsed(count))?;
        self.toggle::<PulseGenRequest>(delay_us)
    }

    pub fn sleep(self: &mut Self, sleep: bool) -> Result<()> {
        self.update(SleepMode(sleep))
    }
}
