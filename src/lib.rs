//! [HMC7043](https://www.analog.com/en/products/hmc7043.html) clock distribution driver.
//!
//! ```no_run
//! use hmc7043::{ config::*, delay::StdDelay, driver::Hmc7043, refin::*, transport::MemoryTransport };
//!
//! let drv = Hmc7043::default();
//! drv.attach(0, MemoryTransport::with_product_id(), StdDelay).unwrap();
//!
//! let fin = ClockInput::new(122_880_000, InputDivide::Fundamental).unwrap();
//! let params = DeviceParams::new(fin, SysrefParams::new(1_920_000, SysrefMode::Continuous))
//!     .channel(0, ChannelParams::clock(30_720_000))
//!     .unwrap();
//! drv.init_device(0, &params, InitMode::Cold).unwrap();
//! ```

pub mod constants;
pub mod errors;
pub mod register;
pub mod transport;
pub mod lock;
pub mod refin;
pub mod config;
pub mod frequency;
pub mod device;
pub mod driver;
pub mod delay;

pub use crate::errors::{ Error, Result };
pub use crate::driver::Hmc7043;
