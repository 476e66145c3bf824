//! CH341A protocol constants and packet framing
//!
//! Everything here is pure: it builds the byte streams the device expects
//! without touching USB, so framing can be tested on its own.

/// USB vendor ID (WinChipHead)
pub const CH341A_USB_VENDOR: u16 = 0x1A86;
/// USB product ID of the CH341A in SPI/I2C mode
pub const CH341A_USB_PRODUCT: u16 = 0x5512;

/// Bulk OUT endpoint
pub const WRITE_EP: u8 = 0x02;
/// Bulk IN endpoint
pub const READ_EP: u8 = 0x82;

/// Size of one command packet
pub const CH341_PACKET_LENGTH: usize = 0x20;
/// Largest single SPI transfer we hand to the device
pub const CH341_MAX_TRANSFER: usize = 4096;

pub const CH341A_CMD_SPI_STREAM: u8 = 0xA8;
pub const CH341A_CMD_I2C_STREAM: u8 = 0xAA;
pub const CH341A_CMD_UIO_STREAM: u8 = 0xAB;

pub const CH341A_CMD_I2C_STM_SET: u8 = 0x60;
pub const CH341A_CMD_I2C_STM_END: u8 = 0x00;

pub const CH341A_CMD_UIO_STM_IN: u8 = 0x00;
pub const CH341A_CMD_UIO_STM_DIR: u8 = 0x40;
pub const CH341A_CMD_UIO_STM_OUT: u8 = 0x80;
pub const CH341A_CMD_UIO_STM_US: u8 = 0xC0;
pub const CH341A_CMD_UIO_STM_END: u8 = 0x20;

/// I2C clock selector; the SPI clock follows it (~2 MHz)
pub const CH341A_STM_I2C_100K: u8 = 0x01;

/// D0-D5 high: CS0 deasserted, SCK low, DOUT high
pub const UIO_CS_DEASSERT: u8 = 0x37;
/// As above with CS0 (D0) low
pub const UIO_CS_ASSERT: u8 = 0x36;
/// D0-D5 as outputs
pub const UIO_DIR_OUTPUT: u8 = 0x3F;
/// All pins as inputs
pub const UIO_DIR_INPUT: u8 = 0x00;

/// Payload bytes carried by one SPI_STREAM packet
const STREAM_PAYLOAD: usize = CH341_PACKET_LENGTH - 1;

/// The CH341A shifts LSB first; SPI flash expects MSB first
#[inline]
pub fn reverse_byte(b: u8) -> u8 {
    b.reverse_bits()
}

/// Number of SPI_STREAM packets needed for `total_bytes` bus bytes
pub fn packet_count(total_bytes: usize) -> usize {
    total_bytes.div_ceil(STREAM_PAYLOAD)
}

/// Bytes actually sent for a transfer of `total_bytes`: the CS packet, then
/// one command byte per stream packet plus the payload
pub fn out_len(total_bytes: usize) -> usize {
    CH341_PACKET_LENGTH + packet_count(total_bytes) + total_bytes
}

/// Build the chip select packet that starts every transfer
///
/// CS is held high for a while before being asserted. The hold time covers
/// at least ~2 us, or `delay_us` if a caller asked for a delay before the
/// next command, limited to what fits in one packet.
pub fn build_cs_packet(delay_us: u32, packet: &mut [u8]) {
    let delay_cnt = if delay_us > 0 {
        (delay_us as usize * 4) / 3
    } else {
        2
    };
    // Leave room for the command byte, first deassert, assert and end
    let delay_cnt = delay_cnt.min(CH341_PACKET_LENGTH - 4);

    let mut idx = 0;
    packet[idx] = CH341A_CMD_UIO_STREAM;
    idx += 1;
    for _ in 0..=delay_cnt {
        packet[idx] = CH341A_CMD_UIO_STM_OUT | UIO_CS_DEASSERT;
        idx += 1;
    }
    packet[idx] = CH341A_CMD_UIO_STM_OUT | UIO_CS_ASSERT;
    idx += 1;
    packet[idx] = CH341A_CMD_UIO_STM_END;
}

/// Build the complete OUT stream for one SPI transfer
///
/// The result is the CS packet padded to a full packet, followed by
/// SPI_STREAM packets carrying the bit-reversed `write_data` and then 0xFF
/// filler clocked out while `read_len` bytes are read. Only the first
/// [`out_len`] bytes are meaningful; the stream packets are packed
/// back to back.
pub fn build_transfer(delay_us: u32, write_data: &[u8], read_len: usize) -> Vec<u8> {
    let total = write_data.len() + read_len;
    let mut wbuf = vec![0u8; CH341_PACKET_LENGTH + packet_count(total) * CH341_PACKET_LENGTH];
    build_cs_packet(delay_us, &mut wbuf[..CH341_PACKET_LENGTH]);

    let mut pos = CH341_PACKET_LENGTH;
    let mut written = 0;
    let mut read_left = read_len;
    while written < write_data.len() || read_left > 0 {
        let write_now = STREAM_PAYLOAD.min(write_data.len() - written);
        let read_now = (STREAM_PAYLOAD - write_now).min(read_left);

        wbuf[pos] = CH341A_CMD_SPI_STREAM;
        pos += 1;
        for &b in &write_data[written..written + write_now] {
            wbuf[pos] = reverse_byte(b);
            pos += 1;
        }
        wbuf[pos..pos + read_now].fill(0xFF);
        pos += read_now;

        written += write_now;
        read_left -= read_now;
    }

    wbuf.truncate(pos);
    wbuf
}

/// Pull the read phase out of the raw IN data of a transfer
///
/// The device returns one byte per bus byte; the first `write_len` were
/// clocked in while the command went out and are dropped.
pub fn extract_read_data(raw: &[u8], write_len: usize, read_len: usize) -> Vec<u8> {
    raw[write_len..write_len + read_len]
        .iter()
        .map(|&b| reverse_byte(b))
        .collect()
}

/// Chip select release sent after every transfer
///
/// Goes out as its own USB packet: a command inside an SPI_STREAM packet
/// would be clocked onto the bus as data.
pub fn cs_release_cmd() -> [u8; 3] {
    [
        CH341A_CMD_UIO_STREAM,
        CH341A_CMD_UIO_STM_OUT | UIO_CS_DEASSERT,
        CH341A_CMD_UIO_STM_END,
    ]
}

/// Stream configuration command (sets the bus clock)
pub fn config_stream_cmd(speed: u8) -> [u8; 3] {
    [
        CH341A_CMD_I2C_STREAM,
        CH341A_CMD_I2C_STM_SET | (speed & 0x7),
        CH341A_CMD_I2C_STM_END,
    ]
}

/// Pin direction command; CS is left deasserted either way
pub fn enable_pins_cmd(enable: bool) -> [u8; 4] {
    let dir = if enable { UIO_DIR_OUTPUT } else { UIO_DIR_INPUT };
    [
        CH341A_CMD_UIO_STREAM,
        CH341A_CMD_UIO_STM_OUT | UIO_CS_DEASSERT,
        CH341A_CMD_UIO_STM_DIR | dir,
        CH341A_CMD_UIO_STM_END,
    ]
}
