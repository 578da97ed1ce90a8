//! Per device serialization

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::*;

use hmc7043::{
    config::*,
    delay::StdDelay,
    transport::{ Access, MemoryTransport },
    Error, Hmc7043,
};

#[test]
fn alarms_never_see_a_partial_commit() {
    let drv = Arc::new(Hmc7043::default());
    let mem = healthy_device();
    drv.attach(0, mem.clone(), StdDelay).unwrap();
    drv.init_device(0, &clock_params(), InitMode::Cold).unwrap();

    mem.set_write_delay(Some(Duration::from_micros(20)));
    mem.clear_log();

    let d = drv.clone();
    let init = thread::spawn(move || {
        d.init_device(0, &sysref_params(), InitMode::Cold)
    });

    let d = drv.clone();
    let poll = thread::spawn(move || {
        (0..200).map(|_| d.get_alarms(0)).collect::<Vec<_>>()
    });

    let init_id = init.thread().id();
    assert_eq!(init.join().unwrap(), Ok(()));
    let polls = poll.join().unwrap();
    assert!(polls.iter().all(|r| r.is_ok()), "{:?}", polls.iter().find(|r| r.is_err()));

    let ops = mem.ops();
    let first = ops.iter().position(|op| op.thread == init_id).unwrap();
    let last = ops.iter().rposition(|op| op.thread == init_id).unwrap();
    assert!(ops[first..=last].iter().all(|op| op.thread == init_id),
            "register access interleaved with the bring-up sequence");

    // every get_alarms reads both alarm registers back to back
    let polled: Vec<_> = ops.iter().filter(|op| op.thread != init_id).collect();
    assert_eq!(polled.len(), 2 * polls.len());
    assert!(polled.iter().all(|op| op.access == Access::Read));
}

#[test]
fn devices_run_in_parallel() {
    let drv = Arc::new(Hmc7043::default());
    let mems: Vec<MemoryTransport> = (0..4).map(|_| healthy_device()).collect();
    for (dev, mem) in mems.iter().enumerate() {
        drv.attach(dev, mem.clone(), StdDelay).unwrap();
    }

    let handles: Vec<_> = (0..4).map(|dev| {
        let d = drv.clone();
        thread::spawn(move || d.init_device(dev, &sysref_params(), InitMode::Cold))
    }).collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), Ok(()));
    }

    let img = drv.register_image(0).unwrap();
    for dev in 1..4 {
        assert_eq!(drv.register_image(dev).unwrap(), img);
        assert_eq!(mems[dev].writes(), mems[0].writes());
    }
}

#[test]
fn lock_timeout_fails_closed() {
    let mut config = DriverConfig::default();
    config.lock_timeout = Duration::from_millis(5);
    let drv = Arc::new(Hmc7043::new(config));
    let mem = healthy_device();
    drv.attach(0, mem.clone(), StdDelay).unwrap();
    drv.init_device(0, &clock_params(), InitMode::Cold).unwrap();

    // a bring-up slow enough to hold the lock well beyond the timeout
    mem.set_write_delay(Some(Duration::from_micros(500)));
    let d = drv.clone();
    let init = thread::spawn(move || d.init_device(0, &clock_params(), InitMode::Cold));

    thread::sleep(Duration::from_millis(20));
    assert_eq!(drv.get_alarms(0), Err(Error::LockFailure));
    assert_eq!(init.join().unwrap(), Ok(()));

    mem.set_write_delay(None);
    assert!(drv.get_alarms(0).is_ok());
}
