// src/session/io_helpers.rs

use core::time::Duration;

use log::{debug, info, warn};
use nb::Result as NbResult;

use super::RainSensorParser;
use crate::common::{timing, RainError, RainSerialTx, RainTimer, ResetLine};

/// Command link: the outbound serial half plus the timer bounding its writes.
impl<U, TX, RST, T> RainSensorParser<U, TX, RST, T>
where
    TX: RainSerialTx,
    T: RainTimer,
{
    /// Executes a non-blocking I/O operation (`f`) repeatedly until it
    /// stops returning `WouldBlock`, returning the final result or a timeout error.
    pub(super) fn execute_blocking_io_with_timeout<FN, R>(
        &mut self,
        timeout: Duration,
        mut f: FN,
    ) -> Result<R, RainError<TX::Error>>
    where
        FN: FnMut(&mut TX) -> NbResult<R, TX::Error>,
    {
        let deadline = self.timer.now() + timeout;

        loop {
            match f(&mut self.tx) {
                Ok(result) => return Ok(result),
                Err(nb::Error::WouldBlock) => {
                    if self.timer.now() >= deadline {
                        return Err(RainError::Timeout);
                    }
                    self.timer.delay_us(100);
                }
                Err(nb::Error::Other(e)) => return Err(RainError::Io(e)),
            }
        }
    }

    /// Writes the formatted command bytes, then flushes the link.
    pub(super) fn send_command_bytes(&mut self, cmd_bytes: &[u8]) -> Result<(), RainError<TX::Error>> {
        let write_duration = timing::BYTE_DURATION * cmd_bytes.len() as u32;
        let write_timeout = write_duration + timing::WRITE_SLACK;

        for byte in cmd_bytes {
            self.execute_blocking_io_with_timeout(write_timeout, |tx| tx.write_byte(*byte))?;
        }

        self.execute_blocking_io_with_timeout(timing::FLUSH_TIMEOUT, |tx| tx.flush())?;
        Ok(())
    }
}

/// Reset sequencing.
impl<U, TX, RST, T> RainSensorParser<U, TX, RST, T>
where
    RST: ResetLine,
    T: RainTimer,
{
    /// Holds the reset line low for [`timing::RESET_PULSE`], then releases it.
    pub(super) fn pulse_reset(&mut self) -> Result<(), RainError<RST::Error>> {
        self.reset_line.set_low()?;
        self.timer.delay_ms(timing::RESET_PULSE.as_millis() as u32);
        self.reset_line.set_high()?;
        debug!("Reset pulse of {:?} done", timing::RESET_PULSE);
        Ok(())
    }

    /// Drops a data-ready flag raised by a line read before the reset.
    pub(super) fn discard_stale_data(&self) {
        if let Some(signal) = self.shared.sink.data_ready() {
            signal.clear();
        }
    }

    /// Waits for the boot banner in data-ready mode and returns the wake-ups seen.
    ///
    /// A short banner is logged, not an error.
    pub(super) fn await_boot_banner(&self) -> usize {
        let Some(signal) = self.shared.sink.data_ready() else {
            return 0;
        };
        let expected = self.config.banner_lines;
        for seen in 0..expected {
            if !signal.wait_for_data(self.config.wait_timeout) {
                warn!("Saw {} of {} boot lines after reset", seen, expected);
                return seen;
            }
        }
        info!("Sensor reset complete");
        expected
    }
}
