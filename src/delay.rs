///! Hosted delay provider

use std::thread;
use std::time::Duration;

use embedded_hal::blocking::delay::DelayUs;


/// Blocking delay on top of `std::thread::sleep`
#[derive(Debug,Copy,Clone,Default)]
pub struct StdDelay;

impl DelayUs<u32> for StdDelay {
    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(us as u64));
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn sleeps_at_least() {
        let t0 = Instant::now();
        StdDelay.delay_us(2_000);
        assert!(t0.elapsed() >= Duration::from_micros(2_000));
    }
}
