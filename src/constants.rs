//! Constants

/// Number of device slots managed by one driver context
pub const MAX_DEVICES: usize = 10;

/// Number of clock output channels
pub const NUM_CHANNELS: usize = 14;

/// Highest valid register address
pub const REG_ADDR_MAX: u16 = 0x0152;

/// Size of the register address space
pub const REG_COUNT: usize = REG_ADDR_MAX as usize + 1;

/// Expected 24 bit product id, stored LSB first in 0x0078..=0x007A
pub const PRODUCT_ID: u32 = 0x30_16_51;

/// Minimum CLKIN frequency, fundamental mode
pub const CLKIN_FREQ_MIN: u64 = 2_000_000;

/// Maximum CLKIN frequency, fundamental mode
pub const CLKIN_FUNDAMENTAL_FREQ_MAX: u64 = 3_200_000_000;

/// Maximum CLKIN frequency, divide-by-2 mode
pub const CLKIN_DIV2_FREQ_MAX: u64 = 6_000_000_000;

/// Below this CLKIN frequency the low frequency input path must be selected
pub const CLKIN_LOW_FREQ_THRESHOLD: u64 = 1_000_000_000;

/// SYSREF timer frequency must stay below this
pub const SYSREF_FREQ_MAX: u64 = 4_000_000;

/// SYSREF timer is a 12 bit counter of input clock cycles
pub const SYSREF_TIMER_MAX: u64 = 0x0FFF;

/// Channel dividers are 12 bit, 4094 is the largest supported ratio
pub const CHANNEL_DIVIDER_MAX: u64 = 4094;

/// A SYSREF channel in pulse generator (dynamic driver) mode
/// must divide by more than this
pub const PULSE_GEN_DIVIDER_MIN: u64 = 31;

/// Multi-slip delay is a 12 bit field
pub const MULTI_SLIP_MAX: u64 = 0x0FFF;

/// Fine analog delay step, ps
pub const ANALOG_DELAY_STEP_PS: u64 = 25;

/// Fine analog delay, max number of steps
pub const ANALOG_DELAY_MAX_STEPS: u64 = 23;

/// Coarse digital delay, max number of half input clock cycles
pub const DIGITAL_DELAY_MAX_STEPS: u64 = 17;

/// Picoseconds per second
pub const PS_PER_SEC: u64 = 1_000_000_000_000;

/// Delay quantization tolerance, in tenths of ps
pub const DELAY_TOLERANCE_DECI_PS: u64 = 1;

/// Channel blocks start here
pub const CHANNEL_BASE: u16 = 0x00C8;

/// Distance between two consecutive channel blocks
pub const CHANNEL_STRIDE: u16 = 0x0A;

/// Number of registers in a channel block
pub const CHANNEL_BLOCK_LEN: u16 = 9;

/// Default device lock timeout, ms
pub const LOCK_TIMEOUT_MS: u64 = 200;

/// SYSREF periods to wait for the outputs to settle in phase after bring-up
pub const SETTLE_SYSREF_PERIODS: u32 = 6;

/// Settle time after a soft reset or runtime request toggle, us
pub const RESET_TOGGLE_DELAY_US: u32 = 200;

/// Settle time after a bring-up request toggle, us
pub const REQUEST_TOGGLE_DELAY_US: u32 = 100;
