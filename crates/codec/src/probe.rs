//! Clock probe payloads

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::{ContractError, MessagePath};

/// Ping payload width: the requester's send timestamp
pub const PING_WIDTH: usize = 8;

/// Pong payload width: echoed ping + responder timestamp
pub const PONG_WIDTH: usize = PING_WIDTH + 8;

/// Decoded pong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PongPayload {
    /// t1 as sent in the ping
    pub echo_t1: i64,
    /// Responder clock at receipt/reply (t2 = t3)
    pub reply_nanos: i64,
}

pub fn encode_ping(t1: i64) -> Bytes {
    let mut buf = BytesMut::with_capacity(PING_WIDTH);
    buf.put_i64_le(t1);
    buf.freeze()
}

pub fn decode_ping(mut bytes: &[u8]) -> Result<i64, ContractError> {
    if bytes.len() != PING_WIDTH {
        return Err(ContractError::malformed(
            MessagePath::Ping.as_str(),
            PING_WIDTH,
            bytes.len(),
        ));
    }
    Ok(bytes.get_i64_le())
}

/// Build a pong from the raw ping bytes
///
/// The ping is echoed verbatim, whatever its length; the requester
/// rejects pongs that do not decode.
pub fn encode_pong(ping: &[u8], reply_nanos: i64) -> Bytes {
    let mut buf = BytesMut::with_capacity(ping.len() + 8);
    buf.put_slice(ping);
    buf.put_i64_le(reply_nanos);
    buf.freeze()
}

pub fn decode_pong(mut bytes: &[u8]) -> Result<PongPayload, ContractError> {
    if bytes.len() != PONG_WIDTH {
        return Err(ContractError::malformed(
            MessagePath::Pong.as_str(),
            PONG_WIDTH,
            bytes.len(),
        ));
    }
    Ok(PongPayload {
        echo_t1: bytes.get_i64_le(),
        reply_nanos: bytes.get_i64_le(),
    })
}
