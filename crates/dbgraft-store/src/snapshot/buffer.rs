//! Owned snapshot buffers and image header checks

use std::fmt;
use std::time::Instant;

use dbgraft_core::core_types::schema::OP_RELEASE;
use dbgraft_core::{log_op_end, log_op_start};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// First 16 bytes of every SQLite database image
pub const IMAGE_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Size of the fixed database header at the start of page 1
pub const IMAGE_HEADER_LEN: usize = 100;

/// Reasons an image cannot be installed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("image is empty")]
    Empty,

    #[error("image is {len} bytes, shorter than the 100-byte header")]
    Truncated { len: usize },

    #[error("image does not start with the SQLite header magic")]
    BadMagic,

    #[error("invalid page size {raw}")]
    BadPageSize { raw: u16 },

    #[error("image length {len} is not a multiple of page size {page_size}")]
    PartialPage { len: usize, page_size: u32 },
}

/// The parts of the database header needed to sanity check an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    pub page_size: u32,
    pub page_count: u64,
}

impl ImageHeader {
    /// Parse and check the header of a complete image
    ///
    /// ## Errors
    ///
    /// Any [`ImageError`] describing why the bytes are not a whole image.
    pub fn parse(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        if bytes.len() < IMAGE_HEADER_LEN {
            return Err(ImageError::Truncated { len: bytes.len() });
        }
        if &bytes[..IMAGE_MAGIC.len()] != IMAGE_MAGIC {
            return Err(ImageError::BadMagic);
        }

        // Big-endian at offset 16; the value 1 stands for 65536
        let raw = u16::from_be_bytes([bytes[16], bytes[17]]);
        let page_size = match raw {
            1 => 65_536,
            n if n >= 512 && n.is_power_of_two() => u32::from(n),
            _ => return Err(ImageError::BadPageSize { raw }),
        };

        if bytes.len() % page_size as usize != 0 {
            return Err(ImageError::PartialPage {
                len: bytes.len(),
                page_size,
            });
        }

        Ok(Self {
            page_size,
            page_count: (bytes.len() / page_size as usize) as u64,
        })
    }
}

/// The complete image of one store at the instant of capture
///
/// Exclusively owned; lend it to any number of transplants with `&`, then
/// give it up with [`SnapshotBuffer::release`]. Not `Clone`.
pub struct SnapshotBuffer {
    origin: String,
    bytes: Box<[u8]>,
}

impl SnapshotBuffer {
    /// Wrap image bytes taken from the store labelled `origin`
    ///
    /// The bytes are not checked here; transplant rejects malformed images.
    pub fn from_bytes(origin: impl Into<String>, bytes: impl Into<Box<[u8]>>) -> Self {
        Self {
            origin: origin.into(),
            bytes: bytes.into(),
        }
    }

    /// Label of the store this image was captured from
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Exact image length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parsed header, or why the image is malformed
    ///
    /// ## Errors
    ///
    /// See [`ImageHeader::parse`].
    pub fn header(&self) -> Result<ImageHeader, ImageError> {
        ImageHeader::parse(&self.bytes)
    }

    /// SHA-256 of the image, hex encoded
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }

    /// Give the buffer up; returns the number of bytes freed
    pub fn release(self) -> usize {
        let start = Instant::now();
        log_op_start!(OP_RELEASE, store = self.origin.as_str());
        let len = self.bytes.len();
        let origin = self.origin;
        drop(self.bytes);
        log_op_end!(
            OP_RELEASE,
            duration_ms = start.elapsed().as_millis() as u64,
            store = origin.as_str(),
            size_bytes = len as u64
        );
        len
    }
}

impl fmt::Debug for SnapshotBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotBuffer")
            .field("origin", &self.origin)
            .field("len", &self.bytes.len())
            .finish()
    }
}
