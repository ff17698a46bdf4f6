//! Bounded input stream over an in-flash firmware image.
//!
//! The NCP client pulls the image through [`InputStream`]. Every `skip`
//! toggles the status LED so a long update shows visible progress.

use embassy_time::Duration;
use embedded_hal::digital::StatefulOutputPin;

use crate::error::NcpError;

/// Events a reader can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamEvents(u32);

impl StreamEvents {
    /// No events.
    pub const NONE: Self = Self(0);
    /// Data can be read without blocking.
    pub const READABLE: Self = Self(1 << 0);
    /// Data can be written without blocking.
    pub const WRITABLE: Self = Self(1 << 1);

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `true` if no events are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` if all bits of `other` are set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Pull-style byte source handed to an NCP client.
pub trait InputStream {
    /// Copy up to `buf.len()` bytes out and consume them.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, NcpError>;

    /// Copy up to `buf.len()` bytes out without consuming them.
    fn peek(&mut self, buf: &mut [u8]) -> Result<usize, NcpError>;

    /// Consume up to `len` bytes.
    fn skip(&mut self, len: usize) -> Result<usize, NcpError>;

    /// Bytes left.
    fn available(&self) -> usize;

    /// Wait until one of `events` is ready or `timeout` elapses.
    fn wait_event(&mut self, events: StreamEvents, timeout: Duration)
        -> Result<StreamEvents, NcpError>;
}

/// [`InputStream`] over a borrowed image slice.
pub struct ImageStream<'a, L> {
    data: &'a [u8],
    led: &'a mut L,
}

impl<'a, L: StatefulOutputPin> ImageStream<'a, L> {
    /// Stream `data`, toggling `led` on every consumed chunk.
    pub fn new(data: &'a [u8], led: &'a mut L) -> Self {
        Self { data, led }
    }
}

impl<L: StatefulOutputPin> InputStream for ImageStream<'_, L> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, NcpError> {
        let len = self.peek(buf)?;
        self.skip(len)
    }

    fn peek(&mut self, buf: &mut [u8]) -> Result<usize, NcpError> {
        if self.data.is_empty() {
            return Err(NcpError::EndOfStream);
        }
        let len = buf.len().min(self.data.len());
        let (src, _) = self.data.split_at(len);
        let (dst, _) = buf.split_at_mut(len);
        dst.copy_from_slice(src);
        Ok(len)
    }

    fn skip(&mut self, len: usize) -> Result<usize, NcpError> {
        if self.data.is_empty() {
            return Err(NcpError::EndOfStream);
        }
        let len = len.min(self.data.len());
        let (_, rest) = self.data.split_at(len);
        self.data = rest;
        if self.led.toggle().is_err() {
            trace!("status LED toggle failed");
        }
        Ok(len)
    }

    fn available(&self) -> usize {
        self.data.len()
    }

    fn wait_event(
        &mut self,
        events: StreamEvents,
        _timeout: Duration,
    ) -> Result<StreamEvents, NcpError> {
        if events.is_empty() {
            return Ok(StreamEvents::NONE);
        }
        if !events.contains(StreamEvents::READABLE) {
            return Err(NcpError::InvalidArgument);
        }
        if self.data.is_empty() {
            return Err(NcpError::EndOfStream);
        }
        Ok(StreamEvents::READABLE)
    }
}

impl<L> embedded_io::ErrorType for ImageStream<'_, L> {
    type Error = NcpError;
}

impl<L: StatefulOutputPin> embedded_io::Read for ImageStream<'_, L> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        match InputStream::read(self, buf) {
            Err(NcpError::EndOfStream) => Ok(0),
            other => other,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::mocks::MockLed;

    #[test]
    fn peek_does_not_consume() {
        let mut led = MockLed::new();
        let mut stream = ImageStream::new(b"abcdef", &mut led);
        let mut buf = [0; 4];
        assert_eq!(stream.peek(&mut buf), Ok(4));
        assert_eq!(&buf, b"abcd");
        assert_eq!(stream.available(), 6);
    }

    #[test]
    fn read_is_clamped_to_remaining() {
        let mut led = MockLed::new();
        let mut stream = ImageStream::new(b"abc", &mut led);
        let mut buf = [0; 8];
        assert_eq!(InputStream::read(&mut stream, &mut buf), Ok(3));
        assert_eq!(stream.available(), 0);
        assert_eq!(
            InputStream::read(&mut stream, &mut buf),
            Err(NcpError::EndOfStream)
        );
    }

    #[test]
    fn skip_toggles_led() {
        let mut led = MockLed::new();
        {
            let mut stream = ImageStream::new(&[0; 10], &mut led);
            stream.skip(4).unwrap();
            stream.skip(4).unwrap();
            assert_eq!(stream.skip(4), Ok(2));
        }
        assert_eq!(led.toggle_count(), 3);
    }

    #[test]
    fn wait_event_rules() {
        let mut led = MockLed::new();
        let mut stream = ImageStream::new(b"x", &mut led);
        let timeout = Duration::from_millis(100);
        assert_eq!(stream.wait_event(StreamEvents::NONE, timeout), Ok(StreamEvents::NONE));
        assert_eq!(
            stream.wait_event(StreamEvents::WRITABLE, timeout),
            Err(NcpError::InvalidArgument)
        );
        assert_eq!(
            stream.wait_event(StreamEvents::READABLE, timeout),
            Ok(StreamEvents::READABLE)
        );
        stream.skip(1).unwrap();
        assert_eq!(
            stream.wait_event(StreamEvents::READABLE, timeout),
            Err(NcpError::EndOfStream)
        );
    }

    #[test]
    fn embedded_io_read_reports_eof_as_zero() {
        let mut led = MockLed::new();
        let mut stream = ImageStream::new(b"", &mut led);
        let mut buf = [0; 2];
        assert_eq!(embedded_io::Read::read(&mut stream, &mut buf), Ok(0));
    }
}
