//! Wire protocol for the execute endpoint (msgpack with named fields).

use serde::{Deserialize, Serialize};
use serde_bytes::ByteBuf;
use thiserror::Error;

/// Maximum size of the inbound request frame.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;
/// Per-stream capture caps.
pub const MAX_STDOUT_BYTES: usize = 128 * 1024;
pub const MAX_STDERR_BYTES: usize = 32 * 1024;
/// Upper bound on the requested wall-clock timeout, in seconds.
pub const MAX_TIMEOUT_SECS: i64 = 60;

/// One execution request as sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub language: String,
    pub code: ByteBuf,
    pub input: ByteBuf,
    pub arguments: Vec<ByteBuf>,
    pub options: Vec<ByteBuf>,
    pub timeout: i64,
}

/// The record the sandbox helper leaves behind in the workspace `status`
/// file, JSON-encoded. Times are microseconds, memory is KiB.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub status_type: String,
    pub status_value: i64,
    pub timed_out: bool,
    pub real: i64,
    pub kernel: i64,
    pub user: i64,
    pub max_mem: i64,
    pub waits: i64,
    pub preemptions: i64,
    pub minor_page_faults: i64,
    pub major_page_faults: i64,
    pub input_ops: i64,
    pub output_ops: i64,
}

/// The full response frame: captured streams plus the helper's accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationResult {
    pub stdout: ByteBuf,
    pub stderr: ByteBuf,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
    pub status_type: String,
    pub status_value: i64,
    pub timed_out: bool,
    pub real: i64,
    pub kernel: i64,
    pub user: i64,
    pub max_mem: i64,
    pub waits: i64,
    pub preemptions: i64,
    pub minor_page_faults: i64,
    pub major_page_faults: i64,
    pub input_ops: i64,
    pub output_ops: i64,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0}")]
    Malformed(#[from] rmp_serde::decode::Error),

    #[error("extra data after request")]
    TrailingData,
}

/// Encode a message to msgpack with field names as strings.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec_named(msg)
}

/// Decode a message from msgpack, rejecting any trailing bytes.
pub fn decode<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T, DecodeError> {
    let mut de = rmp_serde::Deserializer::new(std::io::Cursor::new(data));
    let value = T::deserialize(&mut de)?;
    if (de.get_ref().position() as usize) < data.len() {
        return Err(DecodeError::TrailingData);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> InvocationRequest {
        InvocationRequest {
            language: "python".to_string(),
            code: ByteBuf::from(&b"print(1+1)\n"[..]),
            input: ByteBuf::new(),
            arguments: vec![ByteBuf::from(&b"-O"[..])],
            options: vec![],
            timeout: 10,
        }
    }

    #[test]
    fn request_round_trips() {
        let encoded = encode(&sample_request()).unwrap();
        let decoded: InvocationRequest = decode(&encoded).unwrap();
        assert_eq!(decoded.language, "python");
        assert_eq!(&decoded.code[..], b"print(1+1)\n");
        assert_eq!(decoded.arguments.len(), 1);
        assert_eq!(decoded.timeout, 10);
    }

    #[test]
    fn encoding_uses_field_names() {
        let encoded = encode(&sample_request()).unwrap();
        for name in ["language", "code", "input", "arguments", "options", "timeout"] {
            assert!(
                encoded.windows(name.len()).any(|w| w == name.as_bytes()),
                "field name {name} missing from encoding"
            );
        }
    }

    #[test]
    fn trailing_data_is_rejected() {
        let mut encoded = encode(&sample_request()).unwrap();
        encoded.push(0xc0);
        match decode::<InvocationRequest>(&encoded) {
            Err(DecodeError::TrailingData) => {}
            other => panic!("expected TrailingData, got {other:?}"),
        }
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(decode::<InvocationRequest>(&[0xc1, 0xff, 0x00]).is_err());
    }

    #[test]
    fn status_report_parses_helper_json() {
        let encoded = br#"{
            "status_type": "killed", "status_value": 9, "timed_out": true,
            "real": 1000001, "kernel": 2000, "user": 998000, "max_mem": 4096,
            "waits": 10, "preemptions": 2, "minor_page_faults": 150,
            "major_page_faults": 1, "input_ops": 3, "output_ops": 7
        }"#;
        let status: StatusReport = serde_json::from_slice(encoded).unwrap();
        assert_eq!(status.status_type, "killed");
        assert_eq!(status.status_value, 9);
        assert!(status.timed_out);
        assert_eq!(status.real, 1000001);
    }
}
