//! SPI command structure

use super::AddressWidth;

/// A single SPI transaction
///
/// Uses slices for data so building a command never allocates. The
/// lifetime `'a` ties the command to the buffers it references.
pub struct SpiCommand<'a> {
    /// The opcode byte
    pub opcode: u8,

    /// Address (if any)
    pub address: Option<u32>,

    /// Address width
    pub address_width: AddressWidth,

    /// Number of dummy cycles after the address
    pub dummy_cycles: u8,

    /// Data to write after opcode/address/dummy
    pub write_data: &'a [u8],

    /// Buffer to read into
    pub read_buf: &'a mut [u8],
}

impl<'a> SpiCommand<'a> {
    /// Create a simple command with no address or data (e.g. RES)
    pub fn simple(opcode: u8) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: &mut [],
        }
    }

    /// Create a read register command with no address (e.g. RDID, RDSR)
    pub fn read_reg(opcode: u8, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: None,
            address_width: AddressWidth::None,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Create an addressed read command
    pub fn read(opcode: u8, width: AddressWidth, addr: u32, buf: &'a mut [u8]) -> Self {
        Self {
            opcode,
            address: Some(addr),
            address_width: width,
            dummy_cycles: 0,
            write_data: &[],
            read_buf: buf,
        }
    }

    /// Set the number of dummy cycles
    pub fn with_dummy_cycles(mut self, cycles: u8) -> Self {
        self.dummy_cycles = cycles;
        self
    }

    /// Set the data written after the header
    pub fn with_write_data(mut self, data: &'a [u8]) -> Self {
        self.write_data = data;
        self
    }

    /// Returns true if this command has a read phase
    pub fn has_read(&self) -> bool {
        !self.read_buf.is_empty()
    }

    /// Number of header bytes: opcode, address and dummy bytes
    ///
    /// Dummy cycles are rounded up to whole bytes since every single-I/O
    /// bridge clocks in units of eight.
    pub fn header_len(&self) -> usize {
        let addr_len = if self.address.is_some() {
            self.address_width.bytes()
        } else {
            0
        };
        1 + addr_len + (self.dummy_cycles as usize).div_ceil(8)
    }

    /// Encode opcode, address and dummy bytes into `buf`
    ///
    /// `buf` must be at least `header_len()` bytes. Dummy bytes are 0xFF.
    pub fn encode_header(&self, buf: &mut [u8]) -> usize {
        let len = self.header_len();
        buf[0] = self.opcode;
        let mut idx = 1;
        if let Some(addr) = self.address {
            self.address_width.encode(addr, &mut buf[idx..]);
            idx += self.address_width.bytes();
        }
        for b in &mut buf[idx..len] {
            *b = 0xFF;
        }
        len
    }

    /// Total number of bytes clocked on the bus
    pub fn total_bytes(&self) -> usize {
        self.header_len() + self.write_data.len() + self.read_buf.len()
    }
}
