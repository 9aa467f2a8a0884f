//! Packet header and body encoding.
//!
//! A packet is `u32 LE kind` + `u64 LE source job` + `u64 LE target job`
//! followed by the JSON-encoded body.

use serde::de::DeserializeOwned;

use super::{JobId, MessageKind, Outbound, ProtocolError};

/// Size of the fixed packet header in bytes.
pub const PACKET_HEADER_LEN: usize = 4 + 8 + 8;

/// A single protocol message as carried by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Raw kind tag. May be a tag this client does not know.
    pub kind: u32,
    /// Job id assigned by the sender of a request.
    pub source_job: JobId,
    /// Job id of the request this packet answers.
    pub target_job: JobId,
    /// Encoded message body.
    pub body: Vec<u8>,
}

impl Packet {
    /// Build an outbound packet for `message`, tagged with `source_job`.
    pub fn request<M: Outbound>(message: &M, source_job: JobId) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind: M::KIND.tag(),
            source_job,
            target_job: JobId::NONE,
            body: encode_body(M::KIND, message)?,
        })
    }

    /// Build an outbound packet that carries no job id.
    pub fn notification<M: Outbound>(message: &M) -> Result<Self, ProtocolError> {
        Self::request(message, JobId::NONE)
    }

    /// Build a response packet of `kind` answering the job `target_job`.
    pub fn response<T: serde::Serialize>(
        kind: MessageKind,
        message: &T,
        target_job: JobId,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            kind: kind.tag(),
            source_job: JobId::NONE,
            target_job,
            body: encode_body(kind, message)?,
        })
    }

    /// Known kind of this packet, if any.
    pub fn message_kind(&self) -> Option<MessageKind> {
        MessageKind::from_tag(self.kind)
    }

    /// Decode the body into `T`, attributing errors to `kind`.
    pub fn decode_body<T: DeserializeOwned>(&self, kind: MessageKind) -> Result<T, ProtocolError> {
        decode_body(kind, &self.body)
    }

    /// Serialize header and body.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PACKET_HEADER_LEN + self.body.len());
        out.extend_from_slice(&self.kind.to_le_bytes());
        out.extend_from_slice(&self.source_job.0.to_le_bytes());
        out.extend_from_slice(&self.target_job.0.to_le_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    /// Parse header and body from `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < PACKET_HEADER_LEN {
            return Err(ProtocolError::Truncated {
                needed: PACKET_HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let kind = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let source_job = JobId(read_u64_le(&bytes[4..12]));
        let target_job = JobId(read_u64_le(&bytes[12..20]));

        Ok(Self {
            kind,
            source_job,
            target_job,
            body: bytes[PACKET_HEADER_LEN..].to_vec(),
        })
    }
}

fn read_u64_le(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

/// Encode a message body.
pub fn encode_body<T: serde::Serialize>(
    kind: MessageKind,
    message: &T,
) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(message).map_err(|source| ProtocolError::Encode { kind, source })
}

/// Decode a message body.
pub fn decode_body<T: DeserializeOwned>(
    kind: MessageKind,
    body: &[u8],
) -> Result<T, ProtocolError> {
    serde_json::from_slice(body).map_err(|source| ProtocolError::Decode { kind, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{GetAppOwnershipTicket, OwnershipTicketResponse, ResultCode};

    #[test]
    fn test_request_sets_source_job() {
        let packet = Packet::request(&GetAppOwnershipTicket { app_id: 730 }, JobId(42)).unwrap();
        assert_eq!(packet.message_kind(), Some(MessageKind::ClientGetAppOwnershipTicket));
        assert_eq!(packet.source_job, JobId(42));
        assert!(packet.target_job.is_none());
    }

    #[test]
    fn test_header_layout_is_little_endian() {
        let packet = Packet {
            kind: 0x0102_0304,
            source_job: JobId(0x1122_3344_5566_7788),
            target_job: JobId::NONE,
            body: b"{}".to_vec(),
        };
        let bytes = packet.encode();
        assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[4..12], &[0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);
        assert_eq!(&bytes[12..20], &[0xff; 8]);
        assert_eq!(&bytes[20..], b"{}");
        assert_eq!(Packet::decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_decode_truncated_header() {
        let err = Packet::decode(&[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Truncated {
                needed: PACKET_HEADER_LEN,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_response_body_decodes() {
        let response = OwnershipTicketResponse {
            eresult: ResultCode::OK,
            app_id: 730,
            ticket: vec![1, 2, 3],
        };
        let packet = Packet::response(
            MessageKind::ClientGetAppOwnershipTicketResponse,
            &response,
            JobId(9),
        )
        .unwrap();
        let decoded: OwnershipTicketResponse = packet
            .decode_body(MessageKind::ClientGetAppOwnershipTicketResponse)
            .unwrap();
        assert_eq!(decoded.ticket, vec![1, 2, 3]);
        assert_eq!(packet.target_job, JobId(9));
    }

    #[test]
    fn test_decode_body_error_names_kind() {
        let err = decode_body::<OwnershipTicketResponse>(
            MessageKind::ClientGetAppOwnershipTicketResponse,
            b"not json",
        )
        .unwrap_err();
        assert!(err
            .to_string()
            .contains("ClientGetAppOwnershipTicketResponse"));
    }
}
