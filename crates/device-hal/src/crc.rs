//! CRC-32 (IEEE 802.3) over byte buffers.

/// CRC-32 of `data`, as used for image and record checksums.
pub fn compute_crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
