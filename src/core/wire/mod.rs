//! Byte-exact request / response layouts understood by the HDCP trusted
//! application.
//!
//! Every structure here mirrors a packed layout of the secure side. Fields are
//! native-endian `u32` (the trusted application runs on the same SoC) and byte
//! arrays. Offsets are documented per structure; `const` assertions pin the
//! total sizes so an accidental field change fails to compile.
//!
//! Buffers exchanged with the secure channel are padded with
//! [`qseecom_align`], which always rounds *up past* the length (an already
//! aligned length still gains one alignment unit).

pub mod command_id;
pub mod layout;

pub use command_id::CommandId;
pub use layout::*;

use core::mem::size_of;
use thiserror::Error;
use zerocopy::IntoBytes;

/// Alignment unit of the shared command buffer.
pub const QSEECOM_ALIGN_SIZE: usize = 0x40;
const QSEECOM_ALIGN_MASK: usize = QSEECOM_ALIGN_SIZE - 1;

/// Size of the buffer shared with the trusted application.
pub const QSEECOM_SBUFF_SIZE: usize = 0x1000;

/// Round a request / response length to the shared-buffer alignment.
#[must_use]
pub const fn qseecom_align(len: usize) -> usize {
    (len + QSEECOM_ALIGN_SIZE) & !QSEECOM_ALIGN_MASK
}

/// Decoding failures for raw secure-channel responses.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    /// Response shorter than its fixed layout.
    #[error("short response for {command}: expected at least {expected} bytes, got {actual}")]
    ShortResponse {
        command: CommandId,
        expected: usize,
        actual: usize,
    },
}

/// Serialize `req` into an aligned, zero-padded request buffer.
#[must_use]
pub fn encode_request<R: Request>(req: &R) -> Vec<u8> {
    let mut buf = vec![0u8; qseecom_align(size_of::<R>())];
    buf[..size_of::<R>()].copy_from_slice(req.as_bytes());
    buf
}

/// Aligned response capacity for request type `R`.
#[must_use]
pub fn response_capacity<R: Request>() -> usize {
    qseecom_align(size_of::<R::Resp>())
}

/// Aligned request + response footprint inside the shared buffer.
#[must_use]
pub fn shared_footprint<R: Request>() -> usize {
    qseecom_align(size_of::<R>()) + response_capacity::<R>()
}

/// Largest aligned request + response footprint of any HDCP 2.2 command.
///
/// A shared buffer smaller than this cannot carry every exchange.
#[must_use]
pub fn max_shared_footprint() -> usize {
    [
        shared_footprint::<LibInitReq>(),
        shared_footprint::<LibDeinitReq>(),
        shared_footprint::<TxmtrInitReq>(),
        shared_footprint::<TxmtrDeinitReq>(),
        shared_footprint::<RcvdMsgReq>(),
        shared_footprint::<SendTimeoutReq>(),
        shared_footprint::<SetHwKeyReq>(),
        shared_footprint::<QueryStreamTypeReq>(),
        shared_footprint::<GetTopologyReq>(),
        shared_footprint::<UpdateSrmReq>(),
    ]
    .into_iter()
    .max()
    .unwrap_or(QSEECOM_SBUFF_SIZE)
}

/// Decode the fixed layout prefix of a response.
///
/// Trailing bytes (alignment padding) are ignored.
///
/// # Errors
/// * `WireError::ShortResponse` if fewer than `Resp::MIN_SIZE` bytes arrived.
pub fn decode_response<Resp: Response>(
    command: CommandId,
    bytes: &[u8],
) -> Result<Resp, WireError> {
    let short = || WireError::ShortResponse {
        command,
        expected: Resp::MIN_SIZE,
        actual: bytes.len(),
    };
    if bytes.len() < Resp::MIN_SIZE {
        return Err(short());
    }
    Resp::read_from_prefix(bytes).map(|(r, _)| r).map_err(|_| short())
}
