// src/common/hal_traits.rs

use core::fmt::Debug;
use core::ops::{Add, Sub};
use core::time::Duration;

/// Monotonic time point produced by a [`RainTimer`].
pub trait RainInstant:
    Copy + Ord + Add<Duration, Output = Self> + Sub<Self, Output = Duration>
{
}

impl<T> RainInstant for T where
    T: Copy + Ord + Add<Duration, Output = T> + Sub<T, Output = Duration>
{
}

/// Abstraction for timer/delay operations.
pub trait RainTimer {
    type Instant: RainInstant;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Delay for at least the specified number of microseconds.
    fn delay_us(&mut self, us: u32);

    /// Delay for at least the specified number of milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Outbound half of the serial link to the rain sensor.
pub trait RainSerialTx {
    /// Associated error type for communication errors.
    type Error: Debug;

    /// Attempts to write a single byte to the serial interface.
    ///
    /// Returns `Err(nb::Error::WouldBlock)` if the transmit buffer is full.
    fn write_byte(&mut self, byte: u8) -> nb::Result<(), Self::Error>;

    /// Attempts to flush the transmit buffer.
    fn flush(&mut self) -> nb::Result<(), Self::Error>;
}

/// Inbound half of the serial link, as seen by the line framer.
///
/// Models a UART driver that buffers received bytes in a ring buffer and
/// records the position of every detected line terminator in a bounded
/// pattern queue.
pub trait LineSource {
    type Error: Debug;

    /// Pops the offset of the oldest detected terminator, relative to the
    /// start of the driver's ring buffer.
    ///
    /// `None` means the pattern queue overflowed and positions were lost.
    fn pattern_pop_pos(&mut self) -> Option<usize>;

    /// Reads up to `buf.len()` bytes from the ring buffer, waiting at most `timeout`.
    fn read_bytes(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, Self::Error>;

    /// Discards everything buffered by the driver, including queued pattern positions.
    fn flush_input(&mut self) -> Result<(), Self::Error>;
}

/// Digital output driving the sensor's reset (MCLR) input.
pub trait ResetLine {
    type Error: Debug;

    /// Configures the pin as a push-pull output with pull-up and no interrupts.
    fn configure(&mut self) -> Result<(), Self::Error>;

    fn set_low(&mut self) -> Result<(), Self::Error>;

    fn set_high(&mut self) -> Result<(), Self::Error>;
}

/// Reset line backed by any `embedded-hal` v1 output pin.
///
/// embedded-hal pins are configured by construction, so `configure` is a no-op.
#[cfg(feature = "impl-native")]
#[derive(Debug)]
pub struct HalResetLine<P> {
    pin: P,
}

#[cfg(feature = "impl-native")]
impl<P: embedded_hal::digital::OutputPin> HalResetLine<P> {
    pub fn new(pin: P) -> Self {
        HalResetLine { pin }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

#[cfg(feature = "impl-native")]
impl<P: embedded_hal::digital::OutputPin> ResetLine for HalResetLine<P> {
    type Error = P::Error;

    fn configure(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low()
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high()
    }
}

/// Timer backed by `std::time::Instant` and `std::thread::sleep`.
#[cfg(feature = "std")]
#[derive(Debug, Default, Clone, Copy)]
pub struct StdTimer;

#[cfg(feature = "std")]
impl RainTimer for StdTimer {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}

#[cfg(all(test, feature = "impl-native"))]
mod tests {
    use super::*;
    use core::convert::Infallible;

    struct FakePin {
        high: bool,
        writes: u32,
    }

    impl embedded_hal::digital::ErrorType for FakePin {
        type Error = Infallible;
    }

    impl embedded_hal::digital::OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_hal_reset_line_drives_pin() {
        let mut line = HalResetLine::new(FakePin { high: true, writes: 0 });
        line.configure().unwrap();
        line.set_low().unwrap();
        assert!(!line.pin.high);
        line.set_high().unwrap();
        let pin = line.release();
        assert!(pin.high);
        assert_eq!(pin.writes, 2);
    }
}

#[cfg(all(test, feature = "std"))]
mod std_tests {
    use super::*;

    #[test]
    fn test_std_timer_advances() {
        let mut timer = StdTimer;
        let start = timer.now();
        timer.delay_ms(5);
        timer.delay_us(500);
        assert!(timer.now() - start >= Duration::from_micros(5_500));
    }
}
