///! Device configuration parameters

use core::time::Duration;

use crate::{ constants::*, errors::*, refin::* };


/// Output channel function
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum ChannelMode {
    /// Channel is not used, powered down
    Unused,
    /// Device clock output
    Clock,
    /// SYSREF output
    Sysref,
}

/// Output driver mode
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum DriverMode {
    Cml,
    Lvpecl,
    Lvds,
    Cmos,
}

impl DriverMode {
    /// Driver mode field value
    pub fn bits(self: Self) -> u8 {
        match self {
            DriverMode::Cml => 0,
            DriverMode::Lvpecl => 1,
            DriverMode::Lvds => 2,
            DriverMode::Cmos => 3,
        }
    }
}

/// Internal termination, CML mode only
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum CmlTermination {
    None,
    Ohm100,
    Ohm50,
}

/// Driver impedance field value, non-CML drivers are never terminated
pub fn driver_impedance_bits(mode: DriverMode, term: CmlTermination) -> u8 {
    match (mode, term) {
        (DriverMode::Cml, CmlTermination::Ohm100) => 1,
        (DriverMode::Cml, CmlTermination::Ohm50) => 3,
        _ => 0,
    }
}

/// Output mux selection
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum OutputMux {
    /// Input clock, bypassing the divider
    Fundamental,
    /// Channel divider
    Divider,
    /// Channel divider followed by the fine analog delay
    DividerAnalogDelay,
    /// Neighbor channel divider
    DividerNeighbor,
}

impl OutputMux {
    pub fn bits(self: Self) -> u8 {
        match self {
            OutputMux::Divider => 0,
            OutputMux::DividerAnalogDelay => 1,
            OutputMux::DividerNeighbor => 2,
            OutputMux::Fundamental => 3,
        }
    }
}

/// Output level while a dynamic driver is idle
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum IdleState {
    Normal,
    ForceZero,
    Float,
}

impl IdleState {
    pub fn bits(self: Self) -> u8 {
        match self {
            IdleState::Normal => 0,
            IdleState::ForceZero => 1,
            IdleState::Float => 2,
        }
    }
}


/// Per output channel parameters
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub struct ChannelParams {
    pub mode: ChannelMode,
    /// Output frequency, Hz, must divide the effective input frequency
    pub freq_hz: u64,
    /// Fine analog delay, ps, multiple of 25
    pub analog_delay_ps: u32,
    /// Coarse digital delay, ps, multiple of half the input clock period
    pub digital_delay_ps: u32,
    /// Phase slip applied at start-up, ps, multiple of the effective input period
    pub slip_quantum_ps: u32,
    pub driver_mode: DriverMode,
    pub termination: CmlTermination,
    pub output_mux: OutputMux,
    pub high_performance: bool,
    /// Pulse generator controlled driver, SYSREF channels only
    pub dynamic_driver: bool,
    /// Idle output level, SYSREF channels only
    pub idle_state: IdleState,
}

impl Default for ChannelParams {
    fn default() -> Self {
        ChannelParams {
            mode: ChannelMode::Unused,
            freq_hz: 0,
            analog_delay_ps: 0,
            digital_delay_ps: 0,
            slip_quantum_ps: 0,
            driver_mode: DriverMode::Cml,
            termination: CmlTermination::None,
            output_mux: OutputMux::Divider,
            high_performance: false,
            dynamic_driver: false,
            idle_state: IdleState::Normal,
        }
    }
}

impl ChannelParams {

    /// Device clock output, LVDS, divider output
    pub fn clock(freq_hz: u64) -> Self {
        ChannelParams {
            mode: ChannelMode::Clock,
            freq_hz,
            driver_mode: DriverMode::Lvds,
            ..ChannelParams::default()
        }
    }

    /// SYSREF output, LVDS, divider output, idles at logic 0
    pub fn sysref(freq_hz: u64) -> Self {
        ChannelParams {
            mode: ChannelMode::Sysref,
            freq_hz,
            driver_mode: DriverMode::Lvds,
            idle_state: IdleState::ForceZero,
            ..ChannelParams::default()
        }
    }

    #[inline]
    pub fn is_used(self: &Self) -> bool {
        self.mode != ChannelMode::Unused
    }
}


/// Number of SYSREF pulses per pulse generator request
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum PulseCount {
    One,
    Two,
    Four,
    Eight,
    Sixteen,
}

impl PulseCount {
    /// Pulse generator mode field value
    pub fn bits(self: Self) -> u8 {
        match self {
            PulseCount::One => 1,
            PulseCount::Two => 2,
            PulseCount::Four => 3,
            PulseCount::Eight => 4,
            PulseCount::Sixteen => 5,
        }
    }

    pub fn count(self: Self) -> u32 {
        1 << (self.bits() - 1)
    }
}

/// SYSREF pulse generator mode
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum SysrefMode {
    /// Free running
    Continuous,
    /// Follows the pulse generator request level
    LevelControlled,
    /// Fixed number of pulses per request
    Pulsed(PulseCount),
}

/// Raw pulse generator mode, continuous
pub const PULSE_GEN_MODE_CONTINUOUS: u8 = 7;

/// Raw pulse generator mode, level controlled
pub const PULSE_GEN_MODE_LEVEL: u8 = 0;

impl SysrefMode {
    /// Pulse generator mode field value
    pub fn bits(self: Self) -> u8 {
        match self {
            SysrefMode::LevelControlled => PULSE_GEN_MODE_LEVEL,
            SysrefMode::Pulsed(n) => n.bits(),
            SysrefMode::Continuous => PULSE_GEN_MODE_CONTINUOUS,
        }
    }
}

/// SYSREF timer and pulse generator parameters
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub struct SysrefParams {
    /// SYSREF timer frequency, Hz, below 4 MHz
    pub freq_hz: u64,
    pub mode: SysrefMode,
    /// Invert the SYNC input
    pub inverted_sync: bool,
    /// Retime the SYNC input
    pub sync_retime: bool,
}

impl SysrefParams {
    pub fn new(freq_hz: u64, mode: SysrefMode) -> Self {
        SysrefParams { freq_hz, mode, inverted_sync: false, sync_retime: false }
    }
}


/// GPI pin function
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum GpiFunction {
    None,
    Sleep,
    Mute,
    PulseGenerator,
    Reseed,
    Restart,
    Slip,
}

impl GpiFunction {
    /// GPI select field value, `None` if the GPI stays disabled
    pub fn select(self: Self) -> Option<u8> {
        match self {
            GpiFunction::None => None,
            GpiFunction::Sleep => Some(2),
            GpiFunction::Mute => Some(3),
            GpiFunction::PulseGenerator => Some(4),
            GpiFunction::Reseed => Some(5),
            GpiFunction::Restart => Some(6),
            GpiFunction::Slip => Some(8),
        }
    }
}

/// GPO pin function
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum GpoFunction {
    None,
    Alarm,
    Sdata,
    SysrefNotSynced,
    ClockOutputsPhase,
    SyncRequestStatus,
    ChannelFsmBusy,
    SysrefFsmState0,
    SysrefFsmState1,
    SysrefFsmState2,
    SysrefFsmState3,
    ForceOne,
    ForceZero,
    PulseGeneratorRequest,
}

impl GpoFunction {
    /// GPO select field value, `None` if the GPO stays disabled
    pub fn select(self: Self) -> Option<u8> {
        match self {
            GpoFunction::None => None,
            GpoFunction::Alarm => Some(0x00),
            GpoFunction::Sdata => Some(0x01),
            GpoFunction::SysrefNotSynced => Some(0x02),
            GpoFunction::ClockOutputsPhase => Some(0x03),
            GpoFunction::SyncRequestStatus => Some(0x04),
            GpoFunction::ChannelFsmBusy => Some(0x05),
            GpoFunction::SysrefFsmState0 => Some(0x06),
            GpoFunction::SysrefFsmState1 => Some(0x07),
            GpoFunction::SysrefFsmState2 => Some(0x08),
            GpoFunction::SysrefFsmState3 => Some(0x09),
            GpoFunction::ForceOne => Some(0x0A),
            GpoFunction::ForceZero => Some(0x0B),
            GpoFunction::PulseGeneratorRequest => Some(0x19),
        }
    }
}

/// GPO / SDATA output stage
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum OutputMode {
    OpenDrain,
    Cmos,
}

/// Alarms propagated to the alarm signal
#[derive(Debug,Copy,Clone,Default,PartialEq,Eq)]
pub struct AlarmMask {
    pub sysref_sync: bool,
    pub clock_phase: bool,
    pub sync_request: bool,
}


/// Complete application configuration of one device
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub struct DeviceParams {
    pub clkin: ClockInput,
    pub clkin_buffer: InputBuffer,
    pub syncin_buffer: InputBuffer,
    pub channels: [ChannelParams; NUM_CHANNELS],
    pub sysref: SysrefParams,
    pub gpi: GpiFunction,
    pub gpo: GpoFunction,
    pub gpo_mode: OutputMode,
    pub sdata_mode: OutputMode,
    pub alarm_mask: AlarmMask,
}

impl DeviceParams {

    /// All channels unused, AC coupled terminated CLKIN, no GPIO functions
    pub fn new(clkin: ClockInput, sysref: SysrefParams) -> Self {
        DeviceParams {
            clkin,
            clkin_buffer: InputBuffer::ac_terminated(),
            syncin_buffer: InputBuffer::default(),
            channels: [ChannelParams::default(); NUM_CHANNELS],
            sysref,
            gpi: GpiFunction::None,
            gpo: GpoFunction::None,
            gpo_mode: OutputMode::Cmos,
            sdata_mode: OutputMode::Cmos,
            alarm_mask: AlarmMask::default(),
        }
    }

    /// Replaces channel `ch` parameters
    pub fn channel(mut self: Self, ch: usize, params: ChannelParams) -> Result<Self> {
        let c = self.channels.get_mut(ch).ok_or(Error::InvalidArgument)?;
        *c = params;
        Ok(self)
    }
}


/// Set of output channels, bit N selects channel N
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub struct ChannelMask(u16);

impl ChannelMask {

    /// Non-empty mask within the channel range
    pub fn new(bits: u16) -> Result<Self> {
        if bits == 0 || bits >= (1 << NUM_CHANNELS) {
            Err(Error::InvalidArgument)
        } else {
            Ok(ChannelMask(bits))
        }
    }

    #[inline]
    pub fn bits(self: &Self) -> u16 {
        self.0
    }

    #[inline]
    pub fn contains(self: &Self, ch: usize) -> bool {
        ch < NUM_CHANNELS && self.0 & (1 << ch) != 0
    }

    /// Selected channel numbers, ascending
    pub fn channels(self: Self) -> impl Iterator<Item = usize> {
        (0..NUM_CHANNELS).filter(move |&ch| self.contains(ch))
    }
}


/// Device bring-up flavor
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum InitMode {
    /// Full datasheet power-on sequence
    Cold,
    /// Device is already running, adopt its register state
    Warm,
}


/// Driver timing knobs
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub struct DriverConfig {
    /// Max time to wait for a device lock
    pub lock_timeout: Duration,
    /// SYSREF periods to wait for the output phases to settle
    pub settle_periods: u32,
    /// Soft reset and runtime request toggle width, us
    pub reset_delay_us: u32,
    /// Bring-up request toggle width, us
    pub request_delay_us: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            lock_timeout: Duration::from_millis(LOCK_TIMEOUT_MS),
            settle_periods: SETTLE_SYSREF_PERIODS,
            reset_delay_us: RESET_TOGGLE_DELAY_US,
            request_delay_us: REQUEST_TOGGLE_DELAY_US,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_mask() {
        assert_eq!(ChannelMask::new(0), Err(Error::InvalidArgument));
        assert_eq!(ChannelMask::new(1 << 14), Err(Error::InvalidArgument));
        let m = ChannelMask::new(0b10_0000_0000_0101).unwrap();
        assert_eq!(m.channels().collect::<Vec<_>>(), vec![0, 2, 13]);
        assert!(!m.contains(1));
        assert!(!m.contains(14));
    }

    #[test]
    fn channel_index() {
        let fin = ClockInput { freq_hz: 122_880_000, divide: InputDivide::Fundamental };
        let p = DeviceParams::new(fin, SysrefParams::new(1_920_000, SysrefMode::Continuous));
        let clk = ChannelParams::clock(30_720_000);
        assert_eq!(p.channel(NUM_CHANNELS, clk), Err(Error::InvalidArgument));
        let p = p.channel(NUM_CHANNELS - 1, clk).unwrap();
        assert_eq!(p.channels[NUM_CHANNELS - 1], clk);
    }

    #[test]
    fn encodings() {
        assert_eq!(SysrefMode::Continuous.bits(), 7);
        assert_eq!(SysrefMode::LevelControlled.bits(), 0);
        assert_eq!(SysrefMode::Pulsed(PulseCount::Sixteen).bits(), 5);
        assert_eq!(PulseCount::Eight.count(), 8);
        assert_eq!(driver_impedance_bits(DriverMode::Cml, CmlTermination::Ohm50), 3);
        assert_eq!(driver_impedance_bits(DriverMode::Lvds, CmlTermination::Ohm50), 0);
        assert_eq!(OutputMux::Fundamental.bits(), 3);
        assert_eq!(GpiFunction::Slip.select(), Some(8));
        assert_eq!(GpoFunction::PulseGeneratorRequest.select(), Some(0x19));
        assert_eq!(GpoFunction::None.select(), None);
    }

    #[test]
    fn default_timing() {
        let c = DriverConfig::default();
        assert_eq!(c.lock_timeout, Duration::from_millis(200));
        assert_eq!(c.settle_periods, 6);
    }
}
