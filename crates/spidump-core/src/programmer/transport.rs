//! Bounded command transport
//!
//! [`send_command`] is the byte-level contract of the transport layer:
//! opcode, optional address and optional payload in, response bytes out.
//! It enforces the bridge's transfer limit before anything reaches the bus.

use crate::error::{Error, Result, TransportError};
use crate::spi::{AddressWidth, SpiCommand};

use super::{SpiFeatures, SpiMaster};

/// Address phase of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address {
    /// Flash address
    pub addr: u32,
    /// Number of address bytes to send
    pub width: AddressWidth,
}

impl Address {
    /// A 3-byte address
    pub const fn three_byte(addr: u32) -> Self {
        Self {
            addr,
            width: AddressWidth::ThreeByte,
        }
    }

    /// A 4-byte address
    pub const fn four_byte(addr: u32) -> Self {
        Self {
            addr,
            width: AddressWidth::FourByte,
        }
    }
}

/// Send one command and return the `read_len` response bytes
///
/// Fails with `Error::TransferTooLarge` if the read phase exceeds
/// `max_read_len()` or the outgoing bytes exceed `max_write_len()`, and
/// with `Error::OpcodeNotSupported` if the programmer refuses the opcode or
/// cannot send a 4-byte address. Transport failures come back unchanged for
/// the caller to retry.
pub fn send_command<M: SpiMaster + ?Sized>(
    master: &mut M,
    opcode: u8,
    address: Option<Address>,
    data: &[u8],
    read_len: usize,
) -> Result<Vec<u8>> {
    if !master.probe_opcode(opcode) {
        return Err(Error::OpcodeNotSupported(opcode));
    }

    let max_read = master.max_read_len();
    if read_len > max_read {
        return Err(Error::TransferTooLarge {
            len: read_len,
            max: max_read,
        });
    }

    let mut response = vec![0u8; read_len];
    let mut cmd = match address {
        Some(a) => {
            if a.width == AddressWidth::FourByte
                && !master.features().contains(SpiFeatures::FOUR_BYTE_ADDR)
            {
                return Err(Error::OpcodeNotSupported(opcode));
            }
            SpiCommand::read(opcode, a.width, a.addr, &mut response)
        }
        None => SpiCommand::read_reg(opcode, &mut response),
    }
    .with_write_data(data);

    let out_len = cmd.header_len() + data.len();
    let max_write = master.max_write_len();
    if out_len > max_write {
        return Err(Error::TransferTooLarge {
            len: out_len,
            max: max_write,
        });
    }

    master.execute(&mut cmd)?;
    Ok(response)
}

/// Helper for implementing `SpiMaster::execute()` on byte-stream bridges
///
/// Builds the outgoing buffer from the command header and write data, hands
/// it to `transfer_fn` together with the number of bytes to read back, and
/// copies the result into the command's read buffer. A result shorter than
/// requested is reported as `TransportError::ShortTransfer`.
///
/// # Example
///
/// ```ignore
/// fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
///     default_execute_with_vec(cmd, |write_data, read_len| {
///         self.spi_transfer(write_data, read_len)
///     })
/// }
/// ```
pub fn default_execute_with_vec<F>(cmd: &mut SpiCommand<'_>, transfer_fn: F) -> Result<()>
where
    F: FnOnce(&[u8], usize) -> Result<Vec<u8>>,
{
    let header_len = cmd.header_len();
    let mut write_data = vec![0u8; header_len + cmd.write_data.len()];
    cmd.encode_header(&mut write_data);
    write_data[header_len..].copy_from_slice(cmd.write_data);

    let read_len = cmd.read_buf.len();
    let result = transfer_fn(&write_data, read_len)?;
    if result.len() < read_len {
        return Err(TransportError::ShortTransfer {
            expected: read_len,
            actual: result.len(),
        }
        .into());
    }
    cmd.read_buf.copy_from_slice(&result[..read_len]);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::opcodes;

    /// Echoes the outgoing header back as the response
    struct Loopback {
        last_out: Vec<u8>,
        short_by: usize,
    }

    impl SpiMaster for Loopback {
        fn features(&self) -> SpiFeatures {
            SpiFeatures::empty()
        }

        fn max_read_len(&self) -> usize {
            8
        }

        fn max_write_len(&self) -> usize {
            8
        }

        fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> Result<()> {
            let short_by = self.short_by;
            let mut out = Vec::new();
            default_execute_with_vec(cmd, |w, n| {
                out = w.to_vec();
                Ok(vec![0xA5; n - short_by])
            })?;
            self.last_out = out;
            Ok(())
        }

        fn probe_opcode(&self, opcode: u8) -> bool {
            opcode != 0x42
        }

        fn delay_us(&mut self, _us: u32) {}
    }

    fn loopback() -> Loopback {
        Loopback {
            last_out: Vec::new(),
            short_by: 0,
        }
    }

    #[test]
    fn test_send_command_builds_header() {
        let mut m = loopback();
        let resp = send_command(
            &mut m,
            opcodes::READ,
            Some(Address::three_byte(0x00_1000)),
            &[],
            4,
        )
        .unwrap();
        assert_eq!(resp, vec![0xA5; 4]);
        assert_eq!(m.last_out, vec![0x03, 0x00, 0x10, 0x00]);
    }

    #[test]
    fn test_send_command_enforces_limit() {
        let mut m = loopback();
        let err = send_command(&mut m, opcodes::READ, None, &[], 9).unwrap_err();
        assert_eq!(err, Error::TransferTooLarge { len: 9, max: 8 });

        let err = send_command(&mut m, opcodes::RDID, None, &[0; 8], 0).unwrap_err();
        assert_eq!(err, Error::TransferTooLarge { len: 9, max: 8 });
    }

    #[test]
    fn test_send_command_rejects_opcode_and_width() {
        let mut m = loopback();
        assert_eq!(
            send_command(&mut m, 0x42, None, &[], 1).unwrap_err(),
            Error::OpcodeNotSupported(0x42)
        );
        assert_eq!(
            send_command(
                &mut m,
                opcodes::READ_4B,
                Some(Address::four_byte(0)),
                &[],
                1
            )
            .unwrap_err(),
            Error::OpcodeNotSupported(opcodes::READ_4B)
        );
    }

    #[test]
    fn test_short_transfer_detected() {
        let mut m = loopback();
        m.short_by = 1;
        let err = send_command(&mut m, opcodes::RDID, None, &[], 3).unwrap_err();
        assert_eq!(
            err,
            Error::Transport(TransportError::ShortTransfer {
                expected: 3,
                actual: 2
            })
        );
    }
}
