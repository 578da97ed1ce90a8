//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::{ Arc, Mutex };

use embedded_hal::blocking::delay::DelayUs;

use hmc7043::{ config::*, refin::*, register::*, transport::MemoryTransport };

/// Alarm read-back with the clock outputs phase status set
pub const PHASE_OK: u8 = 0x04;

/// 122.88MHz input, channel 0 a 30.72MHz clock, 1.92MHz SYSREF timer
pub fn clock_params() -> DeviceParams {
    let fin = ClockInput { freq_hz: 122_880_000, divide: InputDivide::Fundamental };
    DeviceParams::new(fin, SysrefParams::new(1_920_000, SysrefMode::Continuous))
        .channel(0, ChannelParams::clock(30_720_000))
        .unwrap()
}

/// [`clock_params`] plus a pulse generator driven SYSREF output on channel 3
pub fn sysref_params() -> DeviceParams {
    let mut sref = ChannelParams::sysref(1_920_000);
    sref.dynamic_driver = true;
    clock_params().channel(3, sref).unwrap()
}

/// Fake device answering with the right product id and phase status
pub fn healthy_device() -> MemoryTransport {
    let mem = MemoryTransport::with_product_id();
    mem.preset(REG_ALARM_READBACK, PHASE_OK);
    mem
}

/// Delay provider recording every request instead of sleeping
#[derive(Clone, Default)]
pub struct RecordingDelay(pub Arc<Mutex<Vec<u32>>>);

impl RecordingDelay {
    pub fn calls(&self) -> Vec<u32> {
        self.0.lock().unwrap().clone()
    }
}

impl DelayUs<u32> for RecordingDelay {
    fn delay_us(&mut self, us: u32) {
        self.0.lock().unwrap().push(us);
    }
}
