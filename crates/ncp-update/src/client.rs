//! NCP client seam.

use core::ops::{Deref, DerefMut};

use crate::error::NcpError;
use crate::stream::InputStream;

/// Driver for the network co-processor.
pub trait NcpClient {
    /// Take the client's recursive lock. While held, the network layer
    /// will not power the NCP down.
    fn lock(&mut self);

    /// Release one level of [`lock`](Self::lock).
    fn unlock(&mut self);

    /// Power the NCP on if needed.
    fn on(&mut self) -> Result<(), NcpError>;

    /// Firmware version running on the NCP.
    fn firmware_module_version(&mut self) -> Result<u16, NcpError>;

    /// Stream `length` bytes of a new image to the NCP and apply it.
    fn update_firmware<S: InputStream>(&mut self, image: &mut S, length: usize)
        -> Result<(), NcpError>;
}

/// Holds an [`NcpClient`]'s lock for its lifetime.
pub struct NcpClientLock<'a, C: NcpClient> {
    client: &'a mut C,
}

impl<'a, C: NcpClient> NcpClientLock<'a, C> {
    /// Lock `client`.
    pub fn new(client: &'a mut C) -> Self {
        client.lock();
        Self { client }
    }
}

impl<C: NcpClient> Drop for NcpClientLock<'_, C> {
    fn drop(&mut self) {
        self.client.unlock();
    }
}

impl<C: NcpClient> Deref for NcpClientLock<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.client
    }
}

impl<C: NcpClient> DerefMut for NcpClientLock<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.client
    }
}
