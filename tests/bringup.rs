//! Bring-up sequence against the in-memory transport

mod common;

use common::*;

use hmc7043::{
    config::*,
    constants::*,
    delay::StdDelay,
    device::DeviceState,
    register::*,
    transport::MemoryTransport,
    Error, Hmc7043,
};

#[test]
fn cold_init_end_to_end() {
    let drv = Hmc7043::default();
    let mem = healthy_device();
    drv.attach(0, mem.clone(), StdDelay).unwrap();

    drv.init_device(0, &clock_params(), InitMode::Cold).unwrap();
    assert_eq!(drv.state(0), Ok(DeviceState::Ready));

    let img = drv.register_image(0).unwrap();
    assert_eq!(img.get_ch::<ChannelEnable>(0), ChannelEnable(true));
    assert_eq!(img.divider(0), 4);
    assert_eq!(img.get_ch::<SyncEnable>(0), SyncEnable(false));
    assert_eq!(img.get::<OutputPairEnable>(), OutputPairEnable(0x01));
    assert_eq!(img.sysref_timer(), 64);

    // hardware follows the image
    for addr in image_registers() {
        assert_eq!(mem.peek(addr), img.reg(addr), "register 0x{:04x}", addr);
    }
    assert_eq!(mem.peek(channel_addr(0, 1)), 4);
    assert_eq!(mem.peek(0x009D), 0xAA);
    assert_eq!(mem.peek(0x00A0), 0xDF);
}

#[test]
fn cold_init_write_order() {
    let drv = Hmc7043::default();
    let mem = healthy_device();
    drv.attach(0, mem.clone(), StdDelay).unwrap();
    drv.init_device(0, &clock_params(), InitMode::Cold).unwrap();

    let writes = mem.writes();
    assert_eq!(&writes[..2], &[(REG_SOFT_RESET, 0x01), (REG_SOFT_RESET, 0x00)]);

    let committed: Vec<u16> = writes[2..].iter().map(|w| w.0).take_while(|&a| a != REG_SOFT_RESET).collect();
    assert_eq!(committed, image_registers().collect::<Vec<_>>());

    // reset, restart, reseed, pulse generator toggles, then SYNC disable on channel 0
    let tail = &writes[2 + committed.len()..];
    assert_eq!(tail.len(), 9);
    assert_eq!(tail[0], (REG_SOFT_RESET, 0x01));
    assert_eq!(tail[1], (REG_SOFT_RESET, 0x00));
    assert_eq!(tail[2], (REG_REQUEST_MODE, 0x42));
    assert_eq!(tail[3], (REG_REQUEST_MODE, 0x40));
    assert_eq!(tail[4], (REG_REQUEST_MODE, 0xC0));
    assert_eq!(tail[5], (REG_REQUEST_MODE, 0x40));
    assert_eq!(tail[6], (REG_REQUEST_MODE, 0x44));
    assert_eq!(tail[7], (REG_REQUEST_MODE, 0x40));
    assert_eq!(tail[8].0, channel_addr(0, CH_CONTROL));
    assert_eq!(tail[8].1 & 0x40, 0);
}

#[test]
fn settle_wait_scales_with_sysref_period() {
    let drv = Hmc7043::default();
    let delay = RecordingDelay::default();
    drv.attach(0, healthy_device(), delay.clone()).unwrap();
    drv.init_device(0, &clock_params(), InitMode::Cold).unwrap();

    // timer 64 at 122.88MHz rounds up to a 1us period
    assert_eq!(delay.calls(), vec![200, 200, 100, 100, 100, 6]);

    // 2.4MHz input, timer 2400 = 1ms SYSREF period
    let fin = hmc7043::refin::ClockInput::new(2_400_000, hmc7043::refin::InputDivide::Fundamental).unwrap();
    let params = DeviceParams::new(fin, SysrefParams::new(1_000, SysrefMode::Continuous))
        .channel(2, ChannelParams::clock(1_200_000))
        .unwrap();
    delay.0.lock().unwrap().clear();
    drv.init_device(0, &params, InitMode::Cold).unwrap();
    assert_eq!(delay.calls().last(), Some(&6_000));
}

#[test]
fn identical_cold_inits() {
    let drv = Hmc7043::default();
    let mem = healthy_device();
    drv.attach(0, mem.clone(), StdDelay).unwrap();

    drv.init_device(0, &sysref_params(), InitMode::Cold).unwrap();
    let first = drv.register_image(0).unwrap();
    let first_writes = mem.writes();

    mem.clear_log();
    drv.init_device(0, &sysref_params(), InitMode::Cold).unwrap();
    assert_eq!(drv.register_image(0).unwrap(), first);
    assert_eq!(mem.writes(), first_writes);
}

#[test]
fn identity_mismatch() {
    let drv = Hmc7043::default();
    let mem = healthy_device();
    mem.preset_product_id(0xF17904);
    drv.attach(0, mem.clone(), StdDelay).unwrap();

    assert_eq!(drv.init_device(0, &clock_params(), InitMode::Cold), Err(Error::ProtocolFailure));
    assert!(mem.writes().is_empty());
    assert_eq!(drv.state(0), Ok(DeviceState::Failed));
}

#[test]
fn invalid_params_touch_nothing() {
    let drv = Hmc7043::default();
    let mem = healthy_device();
    drv.attach(0, mem.clone(), StdDelay).unwrap();

    let mut params = clock_params();
    params.channels[0].analog_delay_ps = 13;
    assert_eq!(drv.init_device(0, &params, InitMode::Cold), Err(Error::InvalidArgument));
    assert_eq!(drv.init_device(0, &params, InitMode::Warm), Err(Error::InvalidArgument));
    assert!(mem.ops().is_empty());
    assert_eq!(drv.state(0), Ok(DeviceState::Uninitialized));
}

#[test]
fn phase_not_reached() {
    let drv = Hmc7043::default();
    let mem = MemoryTransport::with_product_id();
    drv.attach(0, mem.clone(), StdDelay).unwrap();

    assert_eq!(drv.init_device(0, &clock_params(), InitMode::Cold), Err(Error::ProtocolFailure));
    assert_eq!(drv.state(0), Ok(DeviceState::Failed));
    assert_eq!(drv.get_alarms(0), Err(Error::NotInitialized));
    // no retry, SYNC left enabled
    assert_eq!(mem.peek(channel_addr(0, CH_CONTROL)) & 0x40, 0x40);
}

#[test]
fn transport_failure_aborts() {
    let drv = Hmc7043::default();
    let mem = healthy_device();
    drv.attach(0, mem.clone(), StdDelay).unwrap();
    drv.init_device(0, &clock_params(), InitMode::Cold).unwrap();

    mem.fail_on(Some(0x0046));
    mem.clear_log();
    assert_eq!(drv.init_device(0, &clock_params(), InitMode::Cold), Err(Error::TransportFailure));
    assert_eq!(drv.state(0), Ok(DeviceState::Failed));
    // commit stopped at the failing register
    assert_eq!(mem.writes().last().map(|w| w.0), Some(0x000B));
    assert_eq!(drv.enable_channel(0, 0, true), Err(Error::NotInitialized));
}

#[test]
fn warm_init_adopts_hardware() {
    let drv = Hmc7043::default();
    let mem = healthy_device();
    drv.attach(0, mem.clone(), StdDelay).unwrap();
    drv.init_device(0, &clock_params(), InitMode::Cold).unwrap();

    // some other agent moved channel 0 to divider 8
    mem.preset(channel_addr(0, 1), 8);

    let other = Hmc7043::default();
    other.attach(4, mem.clone(), StdDelay).unwrap();
    mem.clear_log();
    other.init_device(4, &clock_params(), InitMode::Warm).unwrap();

    assert!(mem.writes().is_empty());
    assert_eq!(other.state(4), Ok(DeviceState::Ready));
    let img = other.register_image(4).unwrap();
    assert_eq!(img.divider(0), 8);
    for addr in image_registers() {
        assert_eq!(img.reg(addr), mem.peek(addr));
    }
    assert_eq!(other.params(4).unwrap(), Some(clock_params()));
}

#[test]
fn init_unattached_device() {
    let drv = Hmc7043::default();
    assert_eq!(drv.init_device(2, &clock_params(), InitMode::Cold), Err(Error::NotInitialized));
    assert_eq!(drv.init_device(MAX_DEVICES, &clock_params(), InitMode::Cold), Err(Error::InvalidArgument));
}
