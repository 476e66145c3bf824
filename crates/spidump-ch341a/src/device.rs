//! CH341A device implementation
//!
//! This module provides the main `Ch341a` struct that implements USB
//! communication with the CH341A programmer and the `SpiMaster` trait.
//! All USB access is blocking.

use std::time::Duration;

use nusb::transfer::{Buffer, Bulk, In, Out};
use nusb::{Endpoint, MaybeFuture};
use spidump_core::error::{Result as CoreResult, TransportError};
use spidump_core::programmer::{default_execute_with_vec, SpiFeatures, SpiMaster};
use spidump_core::spi::SpiCommand;

use crate::error::{transfer_error, Ch341aError, Result};
use crate::protocol::*;

/// Timeout for a single USB completion
const USB_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of parallel IN transfers kept queued during a transfer
const USB_IN_TRANSFERS: usize = 32;

/// CH341A USB programmer
///
/// This struct represents a connection to a CH341A USB device and implements
/// the `SpiMaster` trait for communicating with SPI flash chips. Chip select
/// is asserted at the start of every transfer and released once it has
/// finished, whether it succeeded or not, so the bus is idle between
/// commands.
pub struct Ch341a {
    /// Bulk OUT endpoint for writes
    out_ep: Endpoint<Bulk, Out>,
    /// Bulk IN endpoint for reads
    in_ep: Endpoint<Bulk, In>,
    /// Accumulated delay for CS handling
    stored_delay_us: u32,
}

impl Ch341a {
    /// Open a CH341A device
    ///
    /// Searches for a CH341A device (VID:1a86 PID:5512) and opens it.
    /// Returns an error if no device is found or if the device cannot be opened.
    pub fn open() -> Result<Self> {
        Self::open_nth(0)
    }

    /// Open the nth CH341A device (0-indexed)
    ///
    /// Useful when multiple CH341A devices are connected.
    pub fn open_nth(index: usize) -> Result<Self> {
        let devices: Vec<_> = nusb::list_devices()
            .wait()
            .map_err(|e| Ch341aError::OpenFailed(e.to_string()))?
            .filter(|d| d.vendor_id() == CH341A_USB_VENDOR && d.product_id() == CH341A_USB_PRODUCT)
            .collect();

        let device_info = devices.get(index).ok_or(Ch341aError::DeviceNotFound)?;

        log::info!(
            "Opening CH341A device at bus {} address {}",
            device_info.busnum(),
            device_info.device_address()
        );

        let device = device_info
            .open()
            .wait()
            .map_err(|e| Ch341aError::OpenFailed(e.to_string()))?;

        let interface = device
            .claim_interface(0)
            .wait()
            .map_err(|e| Ch341aError::ClaimFailed(e.to_string()))?;

        let out_ep = interface
            .endpoint::<Bulk, Out>(WRITE_EP)
            .map_err(|e| Ch341aError::ClaimFailed(e.to_string()))?;
        let in_ep = interface
            .endpoint::<Bulk, In>(READ_EP)
            .map_err(|e| Ch341aError::ClaimFailed(e.to_string()))?;

        let mut ch341a = Self {
            out_ep,
            in_ep,
            stored_delay_us: 0,
        };

        ch341a.configure()?;

        Ok(ch341a)
    }

    /// List all connected CH341A devices
    pub fn list_devices() -> Result<Vec<Ch341aDeviceInfo>> {
        let devices: Vec<_> = nusb::list_devices()
            .wait()
            .map_err(|e| Ch341aError::OpenFailed(e.to_string()))?
            .filter(|d| d.vendor_id() == CH341A_USB_VENDOR && d.product_id() == CH341A_USB_PRODUCT)
            .enumerate()
            .map(|(index, d)| Ch341aDeviceInfo {
                index,
                bus: d.busnum(),
                address: d.device_address(),
            })
            .collect();

        Ok(devices)
    }

    /// Configure the CH341A for SPI mode
    fn configure(&mut self) -> Result<()> {
        // 100 kHz I2C base clock gives the ~2 MHz SPI clock
        self.usb_write(&config_stream_cmd(CH341A_STM_I2C_100K))?;
        self.enable_pins(true)?;

        log::info!("CH341A configured for SPI mode");
        Ok(())
    }

    /// Enable or disable output pins
    fn enable_pins(&mut self, enable: bool) -> Result<()> {
        self.usb_write(&enable_pins_cmd(enable))?;
        log::debug!("Pins {}abled", if enable { "en" } else { "dis" });
        Ok(())
    }

    /// Write data to USB endpoint
    fn usb_write(&mut self, data: &[u8]) -> std::result::Result<(), TransportError> {
        self.out_ep.submit(Buffer::from(data.to_vec()));

        let completion = self
            .out_ep
            .wait_next_complete(USB_TIMEOUT)
            .ok_or(TransportError::Timeout)?;
        completion.status.map_err(transfer_error)?;

        log::trace!("USB write {} bytes", data.len());
        Ok(())
    }

    /// Perform one SPI command and release chip select afterwards
    ///
    /// The release is attempted on failure too; the transfer's own error
    /// takes precedence over a failed release.
    fn spi_transfer(
        &mut self,
        write_data: &[u8],
        read_len: usize,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        let result = self.stream_transfer(write_data, read_len);
        let released = self.usb_write(&cs_release_cmd());
        match (result, released) {
            (Ok(data), Ok(())) => Ok(data),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), released) => {
                if let Err(release_err) = released {
                    log::debug!("CS release after failed transfer: {}", release_err);
                }
                Err(e)
            }
        }
    }

    /// Clock one command through the device using pipelined USB transfers,
    /// leaving CS asserted.
    ///
    /// 1. Build all OUT data (CS packet + SPI_STREAM packets) into one buffer
    /// 2. Submit the entire OUT buffer as a single bulk transfer
    /// 3. Keep up to `USB_IN_TRANSFERS` IN transfers queued
    /// 4. As IN transfers complete, reap them and submit new ones until all
    ///    data is read
    ///
    /// The device produces IN data as it works through the OUT stream. If no
    /// IN transfer is queued it stops accepting OUT data, so the IN queue
    /// must never run dry.
    fn stream_transfer(
        &mut self,
        write_data: &[u8],
        read_len: usize,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        let total_spi_bytes = write_data.len() + read_len;
        let out = build_transfer(self.stored_delay_us, write_data, read_len);
        self.stored_delay_us = 0;

        let mut rbuf = vec![0u8; total_spi_bytes];
        let mut in_done: usize = 0;
        let mut in_submitted: usize = 0;
        let mut in_flight_sizes = [0usize; USB_IN_TRANSFERS];
        let mut submit_idx: usize = 0;
        let mut complete_idx: usize = 0;
        let mut in_pending: usize = 0;
        let in_request_len = self.in_ep.max_packet_size();

        self.out_ep.submit(Buffer::from(out));
        let mut out_done = false;

        loop {
            while in_pending < USB_IN_TRANSFERS && in_submitted < total_spi_bytes {
                let cur_todo = (CH341_PACKET_LENGTH - 1).min(total_spi_bytes - in_submitted);
                in_flight_sizes[submit_idx] = cur_todo;
                self.in_ep.submit(Buffer::new(in_request_len));

                in_submitted += cur_todo;
                in_pending += 1;
                submit_idx = (submit_idx + 1) % USB_IN_TRANSFERS;
            }

            if out_done && in_done >= total_spi_bytes {
                break;
            }

            // Waiting on IN also drives OUT progress in nusb's event loop
            if self.in_ep.pending() > 0 {
                let completion = match self.in_ep.wait_next_complete(USB_TIMEOUT) {
                    Some(c) => c,
                    None => {
                        self.drain_all_pending();
                        return Err(TransportError::Timeout);
                    }
                };
                if let Err(e) = completion.status {
                    self.drain_all_pending();
                    return Err(transfer_error(e));
                }

                let expected = in_flight_sizes[complete_idx];
                let actual = completion.actual_len.min(expected);
                if actual < expected {
                    self.drain_all_pending();
                    return Err(TransportError::ShortTransfer {
                        expected: total_spi_bytes,
                        actual: in_done + actual,
                    });
                }
                rbuf[in_done..in_done + actual].copy_from_slice(&completion.buffer[..actual]);
                in_done += actual;
                in_pending -= 1;
                complete_idx = (complete_idx + 1) % USB_IN_TRANSFERS;
            }

            if !out_done && self.out_ep.pending() > 0 {
                if let Some(c) = self.out_ep.wait_next_complete(Duration::ZERO) {
                    if let Err(e) = c.status {
                        self.drain_all_pending();
                        return Err(transfer_error(e));
                    }
                    out_done = true;
                }
            } else if !out_done {
                out_done = true;
            }
        }

        self.drain_all_pending();
        Ok(extract_read_data(&rbuf, write_data.len(), read_len))
    }

    /// Cancel and drain all pending transfers on both endpoints.
    fn drain_all_pending(&mut self) {
        self.out_ep.cancel_all();
        while self.out_ep.pending() > 0 {
            let _ = self.out_ep.wait_next_complete(Duration::from_secs(1));
        }
        self.in_ep.cancel_all();
        while self.in_ep.pending() > 0 {
            let _ = self.in_ep.wait_next_complete(Duration::from_secs(1));
        }
    }
}

/// Information about a connected CH341A device
#[derive(Debug, Clone)]
pub struct Ch341aDeviceInfo {
    /// Index to pass to [`Ch341a::open_nth`]
    pub index: usize,
    /// USB bus number
    pub bus: u8,
    /// USB device address
    pub address: u8,
}

impl std::fmt::Display for Ch341aDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CH341A #{} at bus {} address {}",
            self.index, self.bus, self.address
        )
    }
}

impl Drop for Ch341a {
    fn drop(&mut self) {
        // Drain any pending transfers before shutdown to avoid panics
        self.drain_all_pending();

        if let Err(e) = self.enable_pins(false) {
            log::warn!("Failed to disable pins on close: {}", e);
        }
    }
}

impl SpiMaster for Ch341a {
    fn features(&self) -> SpiFeatures {
        // Address and dummy bytes are just more bytes in the stream
        SpiFeatures::FOUR_BYTE_ADDR | SpiFeatures::DUMMY_CYCLES
    }

    fn max_read_len(&self) -> usize {
        CH341_MAX_TRANSFER
    }

    fn max_write_len(&self) -> usize {
        CH341_MAX_TRANSFER
    }

    fn execute(&mut self, cmd: &mut SpiCommand<'_>) -> CoreResult<()> {
        default_execute_with_vec(cmd, |write_data, read_len| {
            self.spi_transfer(write_data, read_len).map_err(Into::into)
        })
    }

    fn delay_us(&mut self, us: u32) {
        // Short delays ride along in the next CS packet (up to ~20us)
        if us + self.stored_delay_us > 20 {
            let inc = 20 - self.stored_delay_us;
            std::thread::sleep(Duration::from_micros((us - inc) as u64));
            self.stored_delay_us = inc;
        } else {
            self.stored_delay_us += us;
        }
    }
}
