///! Per device lock
///!
///! Timed, fail-closed mutual exclusion. An operation takes the lock once and
///! hands `&mut T` down to its helpers, helpers never lock again.

use std::sync::{ Mutex, MutexGuard, TryLockError };
use std::thread;
use std::time::{ Duration, Instant };

use log::warn;

use crate::errors::*;


/// Poll interval while waiting for a contended lock
const LOCK_POLL_INTERVAL: Duration = Duration::from_micros(50);


/// Mutex with a bounded wait
#[derive(Debug,Default)]
pub struct DeviceLock<T> {
    inner: Mutex<T>,
}

impl<T> DeviceLock<T> {

    pub fn new(value: T) -> Self {
        DeviceLock { inner: Mutex::new(value) }
    }

    /// Consumes the lock, returning the value
    pub fn into_inner(self: Self) -> Result<T> {
        self.inner.into_inner().map_err(|_| Error::LockFailure)
    }

    /// Single non-blocking attempt.
    ///
    /// `WouldBlock` while another thread holds the lock,
    /// a poisoned lock is `LockFailure`.
    pub fn try_take(self: &Self) -> nb::Result<MutexGuard<'_, T>, Error> {
        match self.inner.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => Err(nb::Error::WouldBlock),
            Err(TryLockError::Poisoned(_)) => Err(nb::Error::Other(Error::LockFailure)),
        }
    }

    /// Waits at most `timeout` for the lock.
    /// `context` names the operation in the log on failure.
    pub fn take(self: &Self, timeout: Duration, context: &str) -> Result<MutexGuard<'_, T>> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.try_take() {
                Ok(guard) => return Ok(guard),
                Err(nb::Error::Other(e)) => {
                    warn!("{}: device lock poisoned", context);
                    return Err(e);
                }
                Err(nb::Error::WouldBlock) => {
                    if Instant::now() >= deadline {
                        warn!("{}: device lock timeout after {:?}", context, timeout);
                        return Err(Error::LockFailure);
                    }
                    thread::sleep(LOCK_POLL_INTERVAL);
                }
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn uncontended() {
        let l = DeviceLock::new(5u32);
        {
            let mut g = l.take(Duration::from_millis(1), "test").unwrap();
            *g += 1;
        }
        assert_eq!(*l.try_take().unwrap(), 6);
    }

    #[test]
    fn would_block_then_timeout() {
        let l = DeviceLock::new(());
        let _g = l.take(Duration::from_millis(1), "holder").unwrap();
        assert!(matches!(l.try_take(), Err(nb::Error::WouldBlock)));

        let t0 = Instant::now();
        assert_eq!(l.take(Duration::from_millis(20), "waiter").err(), Some(Error::LockFailure));
        assert!(t0.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn waits_for_release() {
        let l = Arc::new(DeviceLock::new(0u32));
        let g = l.take(Duration::from_millis(1), "holder").unwrap();
        let l2 = l.clone();
        let h = thread::spawn(move || {
            *l2.take(Duration::from_secs(5), "waiter").unwrap() += 1;
        });
        thread::sleep(Duration::from_millis(10));
        drop(g);
        h.join().unwrap();
        assert_eq!(*l.try_take().unwrap(), 1);
    }

    #[test]
    fn poisoned() {
        let l = Arc::new(DeviceLock::new(()));
        let l2 = l.clone();
        let _ = thread::spawn(move || {
            let _g = l2.take(Duration::from_millis(1), "panicker").unwrap();
            panic!("poison");
        }).join();
        assert_eq!(l.take(Duration::from_millis(1), "after").err(), Some(Error::LockFailure));
    }
}
