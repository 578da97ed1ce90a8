///! Input reference config
///! CLKIN frequency / divide-by-2 / input buffers

use crate::{ constants::*, errors::* };


/// CLKIN divider
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum InputDivide {
    /// Input clock drives the distribution path directly
    Fundamental,
    /// Input clock is divided by 2 first
    DivideBy2,
}

/// Input reference frequency config
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub struct ClockInput {
    /// Input frequency, Hz
    pub freq_hz: u64,
    /// Input divider
    pub divide: InputDivide,
}

impl ClockInput {

    /// Configure reference input frequency
    pub fn new(freq_hz: u64, divide: InputDivide) -> Result<Self> {
        let res = ClockInput { freq_hz, divide };
        res.validate()?;
        Ok(res)
    }

    /// Checks the input frequency against the divider mode limits, bounds included.
    /// A divide-by-2 input has to be an even number of Hz.
    pub fn validate(self: &Self) -> Result<()> {
        let (max, step) = match self.divide {
            InputDivide::Fundamental => (CLKIN_FUNDAMENTAL_FREQ_MAX, 1),
            InputDivide::DivideBy2 => (CLKIN_DIV2_FREQ_MAX, 2),
        };
        if (CLKIN_FREQ_MIN ..= max).contains(&self.freq_hz) && self.freq_hz % step == 0 {
            Ok(())
        } else {
            Err(Error::InvalidArgument)
        }
    }

    /// Frequency feeding the channel dividers, Hz
    pub fn effective_hz(self: &Self) -> u64 {
        match self.divide {
            InputDivide::Fundamental => self.freq_hz,
            InputDivide::DivideBy2 => self.freq_hz / 2,
        }
    }

    /// True if the low frequency input path has to be selected
    pub fn low_frequency(self: &Self) -> bool {
        self.freq_hz < CLKIN_LOW_FREQ_THRESHOLD
    }
}


/// Input buffer mode, encoded as CLKIN/RFSYNCIN buffer mode bits
#[derive(Debug,Copy,Clone,Default,PartialEq,Eq)]
pub struct InputBuffer {
    /// Buffer enabled
    pub enabled: bool,
    /// Internal 100 Ohm termination
    pub termination_100: bool,
    /// AC coupled input
    pub ac_coupled: bool,
    /// LVPECL input
    pub lvpecl: bool,
    /// High impedance input
    pub high_z: bool,
}

impl InputBuffer {

    /// Enabled buffer, 100 Ohm terminated, AC coupled
    pub fn ac_terminated() -> Self {
        InputBuffer {
            enabled: true,
            termination_100: true,
            ac_coupled: true,
            ..InputBuffer::default()
        }
    }

    /// Mode bits: [0] 100 Ohm, [1] AC coupled, [2] LVPECL, [3] high-Z
    pub fn mode_bits(self: &Self) -> u8 {
        (self.termination_100 as u8)
            | (self.ac_coupled as u8) << 1
            | (self.lvpecl as u8) << 2
            | (self.high_z as u8) << 3
    }
}
