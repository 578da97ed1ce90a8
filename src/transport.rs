///! Register transports
///!
///! SPI framing: 24 bit word, MSB first.
///! `[23]` R/W (1 = read), `[22:21]` byte count - 1 (always 0),
///! `[20:8]` register address, `[7:0]` data.

use std::sync::{ Arc, Mutex, MutexGuard };
use std::thread::{ self, ThreadId };
use std::time::Duration;

use embedded_hal:: {
    digital::v2::OutputPin,
    blocking::spi::Transfer,
};

use crate::{ constants::*, errors::* };


/// 8bit register access to one device
pub trait RegisterIo {
    /// Reads register `addr`
    fn read(&mut self, addr: u16) -> Result<u8>;

    /// Writes `value` to register `addr`
    fn write(&mut self, addr: u16, value: u8) -> Result<()>;
}

impl<T: RegisterIo + ?Sized> RegisterIo for Box<T> {
    fn read(&mut self, addr: u16) -> Result<u8> {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<()> {
        (**self).write(addr, value)
    }
}


const SPI_READ: u16 = 1 << 15;
const SPI_ADDR_MASK: u16 = 0x1FFF;

/// Instruction header: R/W bit, byte count, 13 bit address
#[inline]
fn spi_header(read: bool, addr: u16) -> [u8; 2] {
    let cmd = (if read { SPI_READ } else { 0 }) | (addr & SPI_ADDR_MASK);
    [(cmd >> 8) as u8, cmd as u8]
}


/// SPI attached device
pub struct SpiTransport<SPI, CS> {
    spi: SPI,
    pin_cs: CS,
}

impl<SPI, CS> SpiTransport<SPI, CS>
where SPI: Transfer<u8>,
      CS: OutputPin,
{
    /// `spi` - SPI bus, mode 0, 3-wire SDIO or 4-wire with SDO
    /// `pin_cs` - active low chip select
    pub fn new(spi: SPI, pin_cs: CS) -> Self {
        SpiTransport { spi, pin_cs }
    }

    /// Gives the bus and pin back
    pub fn release(self: Self) -> (SPI, CS) {
        (self.spi, self.pin_cs)
    }

    /// One framed 24 bit transfer, chip select asserted for its duration
    fn frame(self: &mut Self, buf: &mut [u8; 3]) -> Result<()> {
        self.pin_cs.set_low().map_err(|_| Error::TransportFailure)?;
        let res = self.spi.transfer(buf).map(|_| ()).map_err(|_| Error::TransportFailure);
        self.pin_cs.set_high().map_err(|_| Error::TransportFailure)?;
        res
    }
}

impl<SPI, CS> RegisterIo for SpiTransport<SPI, CS>
where SPI: Transfer<u8>,
      CS: OutputPin,
{
    fn read(&mut self, addr: u16) -> Result<u8> {
        let h = spi_header(true, addr);
        let mut buf = [h[0], h[1], 0];
        self.frame(&mut buf)?;
        Ok(buf[2])
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<()> {
        let h = spi_header(false, addr);
        let mut buf = [h[0], h[1], value];
        self.frame(&mut buf)
    }
}


/// Register access as seen by [`MemoryTransport`]
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub enum Access {
    Read,
    Write,
}

/// One recorded register access
#[derive(Debug,Copy,Clone,PartialEq,Eq)]
pub struct Op {
    pub thread: ThreadId,
    pub access: Access,
    pub addr: u16,
    pub value: u8,
}

#[derive(Debug)]
struct MemoryState {
    regs: [u8; REG_COUNT],
    ops: Vec<Op>,
    write_delay: Option<Duration>,
    fail_addr: Option<u16>,
}

/// In-memory register file standing in for a device.
///
/// Clones share the same registers and access log, so a test can keep one
/// handle while the driver owns another. Read only registers behave as plain
/// memory, preset them to fake ids and status bits.
#[derive(Debug,Clone)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        MemoryTransport::new()
    }
}

impl MemoryTransport {

    /// All registers zeroed
    pub fn new() -> Self {
        MemoryTransport {
            state: Arc::new(Mutex::new(MemoryState {
                regs: [0; REG_COUNT],
                ops: Vec::new(),
                write_delay: None,
                fail_addr: None,
            })),
        }
    }

    /// Registers zeroed except for the HMC7043 product id
    pub fn with_product_id() -> Self {
        let mem = MemoryTransport::new();
        mem.preset_product_id(PRODUCT_ID);
        mem
    }

    fn state(self: &Self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sets a register without logging an access
    pub fn preset(self: &Self, addr: u16, value: u8) {
        if let Some(r) = self.state().regs.get_mut(addr as usize) {
            *r = value;
        }
    }

    /// Stores a 24 bit id, LSB first, in the product id registers
    pub fn preset_product_id(self: &Self, id: u32) {
        self.preset(0x0078, id as u8);
        self.preset(0x0079, (id >> 8) as u8);
        self.preset(0x007A, (id >> 16) as u8);
    }

    /// Current register value, without logging an access
    pub fn peek(self: &Self, addr: u16) -> u8 {
        self.state().regs.get(addr as usize).copied().unwrap_or(0)
    }

    /// Every access so far, in order
    pub fn ops(self: &Self) -> Vec<Op> {
        self.state().ops.clone()
    }

    /// Every write so far, in order
    pub fn writes(self: &Self) -> Vec<(u16, u8)> {
        self.state().ops.iter()
            .filter(|op| op.access == Access::Write)
            .map(|op| (op.addr, op.value))
            .collect()
    }

    pub fn clear_log(self: &Self) {
        self.state().ops.clear();
    }

    /// Slows down every write by `delay`
    pub fn set_write_delay(self: &Self, delay: Option<Duration>) {
        self.state().write_delay = delay;
    }

    /// Makes every access to `addr` fail
    pub fn fail_on(self: &Self, addr: Option<u16>) {
        self.state().fail_addr = addr;
    }

    fn access(self: &Self, access: Access, addr: u16, value: u8) -> Result<u8> {
        let mut s = self.state();
        if s.fail_addr == Some(addr) {
            return Err(Error::TransportFailure);
        }
        let idx = addr as usize;
        if idx >= REG_COUNT {
            return Err(Error::TransportFailure);
        }
        let value = match access {
            Access::Read => s.regs[idx],
            Access::Write => {
                if let Some(d) = s.write_delay {
                    thread::sleep(d);
                }
                s.regs[idx] = value;
                value
            }
        };
        s.ops.push(Op { thread: thread::current().id(), access, addr, value });
        Ok(value)
    }
}

impl RegisterIo for MemoryTransport {
    fn read(&mut self, addr: u16) -> Result<u8> {
        self.access(Access::Read, addr, 0)
    }

    fn write(&mut self, addr: u16, value: u8) -> Result<()> {
        self.access(Access::Write, addr, value).map(|_| ())
    }
}
