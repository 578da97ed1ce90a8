//! HMC7043 registers
//!
//! The device exposes 8 bit registers in the 0x0000..=0x0152 address space.
//! Fields are allocated LSB first. All bits not covered by a named field are
//! reserved and must carry their documented default on every write, see
//! [`RESERVED_FIELD_DEFAULTS`] and [`CHANNEL_RESERVED_DEFAULTS`].
//!
//! The 14 output channels share one register block layout, placed at
//! `0x00C8 + 10 * channel`.

use crate::constants::*;


/// Bit operations on 8bit register values
pub trait BitField {
    /// Register address, or the offset inside a channel block for channel fields
    fn addr() -> u16;

    /// Number of bits in the bit field
    fn num_bits() -> u8;

    /// Offset from 0
    fn offset() -> u8;

    #[inline]
    fn mask() -> u8 {
        !(0xFFFFu16 << Self::num_bits()) as u8
    }
}

/// Field of a global (non channel) register
pub trait GlobalField: BitField {}

/// Field of a channel register block
pub trait ChannelField: BitField {}


/// Extracts field `F` from a register value
#[inline]
pub fn field_get<F>(reg: u8) -> F
where F: BitField + From<u8>
{
    F::from((reg >> F::offset()) & F::mask())
}

/// Replaces field `F` in a register value, other bits are untouched
#[inline]
pub fn field_set<F>(reg: u8, f: F) -> u8
where F: BitField + Into<u8>
{
    let fbits = (f.into() & F::mask()) << F::offset();
    let rbits = reg & !(F::mask() << F::offset());
    rbits | fbits
}


/// Generate BitField implementation
macro_rules! gen_bitfield_impl {
    ($scope:ident, $n:ident, $addr:expr, $nb:tt, $off:tt) => {
        impl BitField for $n {
            #[inline] fn addr() -> u16 { $addr }
            #[inline] fn num_bits() -> u8 { $nb }
            #[inline] fn offset() -> u8 { $off }
        }

        impl $scope for $n {}
    }
}

/// Small bitfield-encoded numbers boilerplate
macro_rules! gen_bitfield_struct {
    ($(#[$meta:meta])*, $scope:ident, $n:ident, $v:ty, $addr:expr, $nb:tt, $off:tt) => {
        $(#[$meta])*
        #[derive(Debug,Copy,Clone,PartialEq,Eq)]
        pub struct $n(pub $v);

        gen_bitfield_impl!($scope, $n, $addr, $nb, $off);

        impl From<u8> for $n { #[inline] fn from(x: u8) -> Self { $n(x as $v) } }
        impl From<$n> for u8 { #[inline] fn from(f: $n) -> u8 { f.0 as u8 } }
    };
}

/// Single bit flags
macro_rules! gen_bitfield_flag {
    ($(#[$meta:meta])*, $scope:ident, $n:ident, $addr:expr, $off:tt) => {
        $(#[$meta])*
        #[derive(Debug,Copy,Clone,PartialEq,Eq)]
        pub struct $n(pub bool);

        gen_bitfield_impl!($scope, $n, $addr, 1, $off);

        impl From<u8> for $n { #[inline] fn from(x: u8) -> Self { $n(x != 0) } }
        impl From<bool> for $n { #[inline] fn from(x: bool) -> Self { $n(x) } }
        impl From<$n> for u8 { #[inline] fn from(f: $n) -> u8 { f.0 as u8 } }
    };
}


/// Global request register (soft reset)
pub const REG_SOFT_RESET: u16 = 0x0000;

/// Global request and mode register
pub const REG_REQUEST_MODE: u16 = 0x0001;

/// Multi-slip request register
pub const REG_SLIP_REQUEST: u16 = 0x0002;

/// Alarm clear register
pub const REG_CLEAR_ALARMS: u16 = 0x0006;

/// Pulse generator control
pub const REG_PULSE_GEN: u16 = 0x005A;

/// SYSREF timer, bits [7:0]
pub const REG_SYSREF_TIMER_LSB: u16 = 0x005C;

/// SYSREF timer, bits [11:8]
pub const REG_SYSREF_TIMER_MSB: u16 = 0x005D;

/// Product id, LSB / mid / MSB
pub const REG_PRODUCT_ID: [u16; 3] = [0x0078, 0x0079, 0x007A];

/// Alarm signal readback
pub const REG_ALARM_SIGNAL: u16 = 0x007B;

/// Alarm readback
pub const REG_ALARM_READBACK: u16 = 0x007D;

/// Channel block: control (enable, slip, start-up mode, SYNC, performance)
pub const CH_CONTROL: u16 = 0;


gen_bitfield_flag!(
    /// Soft reset, toggled to reset the digital core
    , GlobalField, SoftReset, REG_SOFT_RESET, 0
);

gen_bitfield_flag!(
    /// Sleep mode
    , GlobalField, SleepMode, REG_REQUEST_MODE, 0
);

gen_bitfield_flag!(
    /// Restart dividers/FSMs request
    , GlobalField, RestartDividers, REG_REQUEST_MODE, 1
);

gen_bitfield_flag!(
    /// Pulse generator request
    , GlobalField, PulseGenRequest, REG_REQUEST_MODE, 2
);

gen_bitfield_flag!(
    /// Mute output drivers
    , GlobalField, MuteOutputs, REG_REQUEST_MODE, 3
);

gen_bitfield_flag!(
    /// High performance distribution path, must always be set
    , GlobalField, HighPerformancePath, REG_REQUEST_MODE, 6
);

gen_bitfield_flag!(
    /// Reseed request: aligns divider phases
    , GlobalField, ReseedRequest, REG_REQUEST_MODE, 7
);

gen_bitfield_flag!(
    /// Multi-slip request
    , GlobalField, SlipRequest, REG_SLIP_REQUEST, 1
);

gen_bitfield_flag!(
    /// Enable SYSREF timer
    , GlobalField, SysrefTimerEnable, 0x0003, 2
);

gen_bitfield_flag!(
    /// Enable RF reseeder
    , GlobalField, RfReseederEnable, 0x0003, 5
);

gen_bitfield_struct!(
    /// Output pair enables, bit N powers channels 2N and 2N+1
    , GlobalField, OutputPairEnable, u8, 0x0004, 7, 0
);

gen_bitfield_flag!(
    /// Clear latched alarms
    , GlobalField, ClearAlarms, REG_CLEAR_ALARMS, 0
);

gen_bitfield_flag!(
    /// CLKIN input buffer enable
    , GlobalField, ClkInBufferEnable, 0x000A, 0
);

gen_bitfield_struct!(
    /// CLKIN input buffer mode: [0] 100 Ohm, [1] AC coupled, [2] LVPECL, [3] high-Z
    , GlobalField, ClkInBufferMode, u8, 0x000A, 4, 1
);

gen_bitfield_flag!(
    /// RFSYNCIN input buffer enable
    , GlobalField, SyncInBufferEnable, 0x000B, 0
);

gen_bitfield_struct!(
    /// RFSYNCIN input buffer mode, same layout as [`ClkInBufferMode`]
    , GlobalField, SyncInBufferMode, u8, 0x000B, 4, 1
);

gen_bitfield_flag!(
    /// GPI enable
    , GlobalField, GpiEnable, 0x0046, 0
);

gen_bitfield_struct!(
    /// GPI function select
    , GlobalField, GpiSelect, u8, 0x0046, 4, 1
);

gen_bitfield_flag!(
    /// GPO enable
    , GlobalField, GpoEnable, 0x0050, 0
);

gen_bitfield_flag!(
    /// GPO mode: 0 open drain, 1 CMOS
    , GlobalField, GpoCmos, 0x0050, 1
);

gen_bitfield_struct!(
    /// GPO function select
    , GlobalField, GpoSelect, u8, 0x0050, 5, 2
);

gen_bitfield_flag!(
    /// SDATA enable
    , GlobalField, SdataEnable, 0x0054, 0
);

gen_bitfield_flag!(
    /// SDATA mode: 0 open drain, 1 CMOS
    , GlobalField, SdataCmos, 0x0054, 1
);

gen_bitfield_struct!(
    /// Pulse generator mode: 0 level controlled, 1..=5 pulsed 1/2/4/8/16, 7 continuous
    , GlobalField, PulseGenMode, u8, REG_PULSE_GEN, 3, 0
);

gen_bitfield_flag!(
    /// SYNC input polarity inversion
    , GlobalField, SyncInvertPolarity, 0x005B, 0
);

gen_bitfield_flag!(
    /// SYNC retiming
    , GlobalField, SyncRetime, 0x005B, 2
);

gen_bitfield_struct!(
    /// SYSREF timer [7:0]
    , GlobalField, SysrefTimerLsb, u8, REG_SYSREF_TIMER_LSB, 8, 0
);

gen_bitfield_struct!(
    /// SYSREF timer [11:8]
    , GlobalField, SysrefTimerMsb, u8, REG_SYSREF_TIMER_MSB, 4, 0
);

gen_bitfield_flag!(
    /// Low frequency clock input path
    , GlobalField, LowFreqClkIn, 0x0064, 0
);

gen_bitfield_flag!(
    /// Divide CLKIN by 2
    , GlobalField, ClkInDivideBy2, 0x0064, 1
);

gen_bitfield_flag!(
    /// Analog delay low power mode
    , GlobalField, AnalogDelayLowPower, 0x0065, 0
);

gen_bitfield_flag!(
    /// Let SYSREF sync status drive the alarm signal
    , GlobalField, AlarmMaskSysrefSync, 0x0071, 1
);

gen_bitfield_flag!(
    /// Let clock outputs phase status drive the alarm signal
    , GlobalField, AlarmMaskClockPhase, 0x0071, 2
);

gen_bitfield_flag!(
    /// Let SYNC request status drive the alarm signal
    , GlobalField, AlarmMaskSyncRequest, 0x0071, 4
);

gen_bitfield_flag!(
    /// Alarm signal
    , GlobalField, AlarmSignal, REG_ALARM_SIGNAL, 0
);

gen_bitfield_flag!(
    /// SYSREF sync status
    , GlobalField, SysrefSyncStatus, REG_ALARM_READBACK, 1
);

gen_bitfield_flag!(
    /// Clock outputs phase status, set once all outputs reached their phase
    , GlobalField, ClockPhaseStatus, REG_ALARM_READBACK, 2
);

gen_bitfield_flag!(
    /// SYNC request status
    , GlobalField, SyncRequestStatus, REG_ALARM_READBACK, 4
);

gen_bitfield_struct!(
    /// SYSREF FSM state
    , GlobalField, SysrefFsmState, u8, 0x0091, 3, 0
);

gen_bitfield_flag!(
    /// Channel outputs FSM busy
    , GlobalField, ChannelFsmBusy, 0x0091, 3
);


gen_bitfield_flag!(
    /// Channel enable
    , ChannelField, ChannelEnable, CH_CONTROL, 0
);

gen_bitfield_flag!(
    /// Multi-slip enable
    , ChannelField, MultiSlipEnable, CH_CONTROL, 1
);

gen_bitfield_struct!(
    /// Start-up mode: 0 asynchronous (free running), 3 dynamic (pulse generator)
    , ChannelField, StartupMode, u8, CH_CONTROL, 2, 2
);

gen_bitfield_flag!(
    /// Single input cycle slip enable
    , ChannelField, SlipEnable, CH_CONTROL, 5
);

gen_bitfield_flag!(
    /// SYNC enable
    , ChannelField, SyncEnable, CH_CONTROL, 6
);

gen_bitfield_flag!(
    /// High performance mode
    , ChannelField, HighPerformance, CH_CONTROL, 7
);

gen_bitfield_struct!(
    /// Channel divider [7:0]
    , ChannelField, DividerLsb, u8, 1, 8, 0
);

gen_bitfield_struct!(
    /// Channel divider [11:8]
    , ChannelField, DividerMsb, u8, 2, 4, 0
);

gen_bitfield_struct!(
    /// Fine analog delay, 25ps steps
    , ChannelField, FineAnalogDelay, u8, 3, 5, 0
);

gen_bitfield_struct!(
    /// Coarse digital delay, half input clock cycle steps
    , ChannelField, CoarseDigitalDelay, u8, 4, 5, 0
);

gen_bitfield_struct!(
    /// Multi-slip digital delay [7:0]
    , ChannelField, MultiSlipLsb, u8, 5, 8, 0
);

gen_bitfield_struct!(
    /// Multi-slip digital delay [11:8]
    , ChannelField, MultiSlipMsb, u8, 6, 4, 0
);

gen_bitfield_struct!(
    /// Output mux: 0 divider, 1 divider + analog delay, 2 neighbor divider, 3 fundamental
    , ChannelField, OutputMuxSelect, u8, 7, 2, 0
);

gen_bitfield_struct!(
    /// CML driver impedance: 0 none, 1 100 Ohm, 3 50 Ohm
    , ChannelField, DriverImpedance, u8, 8, 2, 0
);

gen_bitfield_struct!(
    /// Driver mode: 0 CML, 1 LVPECL, 2 LVDS, 3 CMOS
    , ChannelField, DriverModeSelect, u8, 8, 2, 3
);

gen_bitfield_flag!(
    /// Dynamic driver enable (SYSREF channels)
    , ChannelField, DynamicDriverEnable, 8, 5
);

gen_bitfield_struct!(
    /// Idle state: 0 normal, 1 force to logic 0, 2 float
    , ChannelField, IdleAtZero, u8, 8, 2, 6
);


/// Datasheet "configuration updates" table: reserved registers and their values
pub const CONFIG_UPDATE_DEFAULTS: [(u16, u8); 14] = [
    (0x0098, 0x00), (0x0099, 0x00), (0x009D, 0xAA), (0x009E, 0xAA),
    (0x009F, 0x4D), (0x00A0, 0xDF), (0x00A2, 0x03), (0x00A3, 0x00),
    (0x00A4, 0x00), (0x00AD, 0x00), (0x00B5, 0x00), (0x00B6, 0x00),
    (0x00B7, 0x00), (0x00B8, 0x00),
];

/// Reserved registers not covered by the configuration updates table
pub const RESERVED_REGISTER_DEFAULTS: [(u16, u8); 4] = [
    (0x0005, 0x0F), (0x0007, 0x00), (0x0008, 0x00), (0x0009, 0x00),
];

/// Reserved bits of global registers: (address, reserved mask, value)
pub const RESERVED_FIELD_DEFAULTS: [(u16, u8, u8); 17] = [
    (0x0000, 0xFE, 0x00),
    (0x0001, 0x30, 0x00),
    (0x0002, 0xFD, 0x00),
    (0x0003, 0xDB, 0x10),
    (0x0004, 0x80, 0x00),
    (0x0006, 0xFE, 0x00),
    (0x000A, 0xE0, 0x00),
    (0x000B, 0xE0, 0x00),
    (0x0046, 0xE0, 0x00),
    (0x0050, 0x80, 0x00),
    (0x0054, 0xFC, 0x00),
    (0x005A, 0xF8, 0x00),
    (0x005B, 0xFA, 0x00),
    (0x005D, 0xF0, 0x00),
    (0x0064, 0xFC, 0x00),
    (0x0065, 0xFE, 0x00),
    (0x0071, 0xE9, 0x00),
];

/// Reserved bits of every channel block: (offset, reserved mask, value)
pub const CHANNEL_RESERVED_DEFAULTS: [(u16, u8, u8); 7] = [
    (CH_CONTROL, 0x10, 0x10),
    (2, 0xF0, 0x00),
    (3, 0xE0, 0x00),
    (4, 0xE0, 0x00),
    (6, 0xF0, 0x00),
    (7, 0xFC, 0x00),
    (8, 0x04, 0x00),
];

/// Writable global registers mirrored by the register image, ascending.
///
/// 0x0000 (soft reset) is only ever toggled, and the id/status
/// registers are read only.
pub const GLOBAL_IMAGE_REGISTERS: [u16; 35] = [
    0x0001, 0x0002, 0x0003, 0x0004, 0x0005, 0x0006, 0x0007, 0x0008,
    0x0009, 0x000A, 0x000B, 0x0046, 0x0050, 0x0054, 0x005A, 0x005B,
    0x005C, 0x005D, 0x0064, 0x0065, 0x0071, 0x0098, 0x0099, 0x009D,
    0x009E, 0x009F, 0x00A0, 0x00A2, 0x00A3, 0x00A4, 0x00AD, 0x00B5,
    0x00B6, 0x00B7, 0x00B8,
];


/// Address of register `offset` of channel block `ch`
#[inline]
pub fn channel_addr(ch: usize, offset: u16) -> u16 {
    CHANNEL_BASE + CHANNEL_STRIDE * (ch as u16) + offset
}

/// Every register mirrored by the register image, in ascending address order
pub fn image_registers() -> impl Iterator<Item = u16> {
    GLOBAL_IMAGE_REGISTERS.iter().copied().chain(
        (0..NUM_CHANNELS).flat_map(|ch| {
            (0..CHANNEL_BLOCK_LEN).map(move |off| channel_addr(ch, off))
        })
    )
}


/// In-memory mirror of the device registers.
/// Defaults to all bits set to 0.
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub struct RegisterImage {
    regs: [u8; REG_COUNT],
}

impl Default for RegisterImage {
    fn default() -> Self {
        RegisterImage { regs: [0; REG_COUNT] }
    }
}

impl RegisterImage {

    /// Register image holding only the datasheet mandated reserved values
    pub fn with_defaults() -> Self {
        let mut img = RegisterImage::default();
        img.apply_defaults();
        img
    }

    /// Loads reserved register and reserved field defaults,
    /// named fields are left alone.
    pub fn apply_defaults(&mut self) {
        for &(addr, v) in CONFIG_UPDATE_DEFAULTS.iter().chain(RESERVED_REGISTER_DEFAULTS.iter()) {
            self.set_reg(addr, v);
        }
        for &(addr, mask, v) in RESERVED_FIELD_DEFAULTS.iter() {
            self.set_masked(addr, mask, v);
        }
        for ch in 0..NUM_CHANNELS {
            for &(off, mask, v) in CHANNEL_RESERVED_DEFAULTS.iter() {
                self.set_masked(channel_addr(ch, off), mask, v);
            }
        }
    }

    /// Raw register value.
    ///
    /// Panics if `addr` is beyond [`REG_ADDR_MAX`].
    #[inline]
    pub fn reg(&self, addr: u16) -> u8 {
        self.regs[addr as usize]
    }

    /// Overwrites a raw register value.
    ///
    /// Panics if `addr` is beyond [`REG_ADDR_MAX`].
    #[inline]
    pub fn set_reg(&mut self, addr: u16, v: u8) {
        self.regs[addr as usize] = v;
    }

    #[inline]
    fn set_masked(&mut self, addr: u16, mask: u8, v: u8) {
        let r = self.reg(addr);
        self.set_reg(addr, (r & !mask) | (v & mask));
    }

    /// Register values, indexed by address
    #[inline]
    pub fn as_bytes(&self) -> &[u8; REG_COUNT] {
        &self.regs
    }

    /// Get global register bitfield value
    #[inline]
    pub fn get<F>(&self) -> F
    where F: GlobalField + From<u8>
    {
        field_get(self.reg(F::addr()))
    }

    /// Update global register bitfield
    #[inline]
    pub fn set<F>(&mut self, f: F) -> &mut Self
    where F: GlobalField + Into<u8>
    {
        let r = self.reg(F::addr());
        self.set_reg(F::addr(), field_set(r, f));
        self
    }

    /// Get channel register bitfield value
    #[inline]
    pub fn get_ch<F>(&self, ch: usize) -> F
    where F: ChannelField + From<u8>
    {
        field_get(self.reg(channel_addr(ch, F::addr())))
    }

    /// Update channel register bitfield
    #[inline]
    pub fn set_ch<F>(&mut self, ch: usize, f: F) -> &mut Self
    where F: ChannelField + Into<u8>
    {
        let addr = channel_addr(ch, F::addr());
        let r = self.reg(addr);
        self.set_reg(addr, field_set(r, f));
        self
    }

    /// 12 bit channel divider
    pub fn divider(&self, ch: usize) -> u16 {
        let lsb: DividerLsb = self.get_ch(ch);
        let msb: DividerMsb = self.get_ch(ch);
        (msb.0 as u16) << 8 | lsb.0 as u16
    }

    pub fn set_divider(&mut self, ch: usize, div: u16) -> &mut Self {
        self.set_ch(ch, DividerLsb(div as u8))
            .set_ch(ch, DividerMsb((div >> 8) as u8))
    }

    /// 12 bit multi-slip delay
    pub fn multi_slip(&self, ch: usize) -> u16 {
        let lsb: MultiSlipLsb = self.get_ch(ch);
        let msb: MultiSlipMsb = self.get_ch(ch);
        (msb.0 as u16) << 8 | lsb.0 as u16
    }

    pub fn set_multi_slip(&mut self, ch: usize, slip: u16) -> &mut Self {
        self.set_ch(ch, MultiSlipLsb(slip as u8))
            .set_ch(ch, MultiSlipMsb((slip >> 8) as u8))
    }

    /// 12 bit SYSREF timer, in input clock cycles
    pub fn sysref_timer(&self) -> u16 {
        sysref_timer_from(self.reg(REG_SYSREF_TIMER_LSB), self.reg(REG_SYSREF_TIMER_MSB))
    }

    pub fn set_sysref_timer(&mut self, timer: u16) -> &mut Self {
        self.set(SysrefTimerLsb(timer as u8))
            .set(SysrefTimerMsb((timer >> 8) as u8))
    }
}

/// Combines the two SYSREF timer register values
#[inline]
pub fn sysref_timer_from(lsb: u8, msb: u8) -> u16 {
    let lsb: SysrefTimerLsb = field_get(lsb);
    let msb: SysrefTimerMsb = field_get(msb);
    (msb.0 as u16) << 8 | lsb.0 as u16
}
