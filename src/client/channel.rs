//! Client side of the OPC UA TCP secure conversation.
//!
//! Implements the Hello/Acknowledge handshake and single-chunk
//! OpenSecureChannel/Message/CloseSecureChannel framing for security policy
//! None. Signed and encrypted modes require the crypto provider seam and
//! are reported as unsupported here.

use std::io::{Cursor, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, info};

use crate::binary::{BinaryDecodable, BinaryEncodable};
use crate::client::SecureChannelConfig;
use crate::{config, ua, Error, Result};

const MSG_TYPE_HELLO: &[u8; 3] = b"HEL";
const MSG_TYPE_ACK: &[u8; 3] = b"ACK";
const MSG_TYPE_ERROR: &[u8; 3] = b"ERR";
const MSG_TYPE_OPEN: &[u8; 3] = b"OPN";
const MSG_TYPE_CLOSE: &[u8; 3] = b"CLO";
const MSG_TYPE_MSG: &[u8; 3] = b"MSG";

const IS_FINAL: u8 = b'F';

const MESSAGE_HEADER_SIZE: usize = 8;

/// Negotiated limits from the Hello/Acknowledge handshake.
#[derive(Debug, Clone, Copy)]
struct TransportLimits {
    send_buffer_size: u32,
    max_message_size: u32,
}

/// An open client secure channel over TCP.
#[derive(Debug)]
pub struct SecureChannel {
    stream: TcpStream,
    limits: TransportLimits,
    secure_channel_id: u32,
    token_id: u32,
    security_policy: ua::SecurityPolicy,
    sequence_number: u32,
    request_id: u32,
    /// Token lifetime granted by the server, in milliseconds.
    revised_lifetime_ms: u32,
}

fn parse_endpoint_url(url: &str) -> Result<(String, u16)> {
    let rest = url.strip_prefix("opc.tcp://").ok_or(Error::InvalidParameters)?;
    let authority = rest.split('/').next().unwrap_or(rest);
    let (host, port) = authority.rsplit_once(':').ok_or(Error::InvalidParameters)?;
    let port = port.parse::<u16>().map_err(|_| Error::InvalidParameters)?;
    if host.is_empty() {
        return Err(Error::InvalidParameters);
    }
    Ok((host.to_owned(), port))
}

impl SecureChannel {
    /// Connects the transport and opens a secure channel per the
    /// configuration.
    ///
    /// # Errors
    ///
    /// Fails with `NotSupported` for security modes other than None, with
    /// `Closed` when the peer disconnects, and with `Nok` on protocol
    /// errors.
    pub fn open(config: &SecureChannelConfig) -> Result<Self> {
        config.validate()?;
        if config.security_mode != ua::MessageSecurityMode::None {
            // Sign/SignAndEncrypt need the crypto provider, absent here.
            return Err(Error::NotSupported);
        }

        let (host, port) = parse_endpoint_url(&config.endpoint_url)?;
        info!("connecting to {host}:{port}");
        let stream = TcpStream::connect((host.as_str(), port)).map_err(Error::from)?;
        let timeout = Some(Duration::from_millis(u64::from(config.requested_lifetime_ms)));
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;

        let mut channel = Self {
            stream,
            limits: TransportLimits {
                send_buffer_size: config::TCP_UA_BUFFER_SIZE,
                max_message_size: config::TCP_UA_MAX_MESSAGE_SIZE,
            },
            secure_channel_id: 0,
            token_id: 0,
            security_policy: config.security_policy,
            sequence_number: 0,
            request_id: 0,
            revised_lifetime_ms: config.requested_lifetime_ms,
        };
        channel.hello(&config.endpoint_url)?;
        channel.open_channel(config)?;
        Ok(channel)
    }

    /// Lifetime granted by the server, in milliseconds.
    #[must_use]
    pub const fn revised_lifetime_ms(&self) -> u32 {
        self.revised_lifetime_ms
    }

    fn next_sequence_number(&mut self) -> u32 {
        self.sequence_number += 1;
        self.sequence_number
    }

    fn next_request_id(&mut self) -> u32 {
        self.request_id += 1;
        self.request_id
    }

    fn write_message(&mut self, message_type: &[u8; 3], body: &[u8]) -> Result<()> {
        let size = MESSAGE_HEADER_SIZE + body.len();
        if size > self.limits.send_buffer_size as usize {
            // Multi-chunk sending is not implemented.
            return Err(Error::Nok);
        }
        let mut frame = Vec::with_capacity(size);
        frame.extend_from_slice(message_type);
        frame.push(IS_FINAL);
        frame.write_u32::<LittleEndian>(u32::try_from(size).map_err(|_| Error::Nok)?)?;
        frame.extend_from_slice(body);
        self.stream.write_all(&frame)?;
        Ok(())
    }

    fn read_message(&mut self) -> Result<([u8; 3], Vec<u8>)> {
        let mut header = [0_u8; MESSAGE_HEADER_SIZE];
        self.stream.read_exact(&mut header)?;
        let message_type = [header[0], header[1], header[2]];
        if header[3] != IS_FINAL {
            // Chunked responses are not accepted on this transport.
            return Err(Error::Status(ua::StatusCode::BAD_TCP_MESSAGE_TYPE_INVALID));
        }
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if (size as usize) < MESSAGE_HEADER_SIZE || size > self.limits.max_message_size {
            return Err(Error::Status(ua::StatusCode::BAD_TCP_MESSAGE_TYPE_INVALID));
        }
        let mut body = vec![0_u8; size as usize - MESSAGE_HEADER_SIZE];
        self.stream.read_exact(&mut body)?;

        if &message_type == MSG_TYPE_ERROR {
            let mut cursor = Cursor::new(body.as_slice());
            let error = cursor.read_u32::<LittleEndian>().unwrap_or(0);
            let reason = ua::String::decode(&mut cursor).unwrap_or_else(|_| ua::String::null());
            debug!("received ERR message 0x{error:08X}: {reason}");
            return Err(Error::Status(ua::StatusCode::new(error)));
        }
        Ok((message_type, body))
    }

    fn hello(&mut self, endpoint_url: &str) -> Result<()> {
        let mut body = Vec::new();
        body.write_u32::<LittleEndian>(config::TCP_UA_PROTOCOL_VERSION)?;
        body.write_u32::<LittleEndian>(config::TCP_UA_BUFFER_SIZE)?;
        body.write_u32::<LittleEndian>(config::TCP_UA_BUFFER_SIZE)?;
        body.write_u32::<LittleEndian>(config::TCP_UA_MAX_MESSAGE_SIZE)?;
        body.write_u32::<LittleEndian>(1)?; // max chunk count
        ua::String::from(endpoint_url).encode(&mut body)?;
        self.write_message(MSG_TYPE_HELLO, &body)?;

        let (message_type, body) = self.read_message()?;
        if &message_type != MSG_TYPE_ACK {
            return Err(Error::Status(ua::StatusCode::BAD_TCP_MESSAGE_TYPE_INVALID));
        }
        let mut cursor = Cursor::new(body.as_slice());
        let _server_version = cursor.read_u32::<LittleEndian>()?;
        let _receive_buffer_size = cursor.read_u32::<LittleEndian>()?;
        let send_buffer_size = cursor.read_u32::<LittleEndian>()?;
        let max_message_size = cursor.read_u32::<LittleEndian>()?;
        let _max_chunk_count = cursor.read_u32::<LittleEndian>()?;
        self.limits.send_buffer_size = send_buffer_size.min(config::TCP_UA_BUFFER_SIZE);
        if max_message_size != 0 {
            self.limits.max_message_size = max_message_size.min(config::TCP_UA_MAX_MESSAGE_SIZE);
        }
        debug!("transport handshake done, send buffer {}", self.limits.send_buffer_size);
        Ok(())
    }

    fn open_channel(&mut self, config: &SecureChannelConfig) -> Result<()> {
        let request = ua::OpenSecureChannelRequest {
            request_header: ua::RequestHeader::new(ua::NodeId::null(), self.next_request_id(), 0),
            client_protocol_version: config::TCP_UA_PROTOCOL_VERSION,
            request_type: ua::SecurityTokenRequestType::Issue,
            security_mode: config.security_mode,
            client_nonce: ua::ByteString::null(),
            requested_lifetime: config.requested_lifetime_ms,
        };

        let mut body = Vec::new();
        body.write_u32::<LittleEndian>(self.secure_channel_id)?;
        // Asymmetric security header, all-null for policy None.
        ua::String::from(self.security_policy.uri()).encode(&mut body)?;
        ua::ByteString::null().encode(&mut body)?; // sender certificate
        ua::ByteString::null().encode(&mut body)?; // receiver cert thumbprint
        let sequence_number = self.next_sequence_number();
        body.write_u32::<LittleEndian>(sequence_number)?;
        body.write_u32::<LittleEndian>(self.request_id)?;
        ua::Message::OpenSecureChannelRequest(request).encode(&mut body)?;
        self.write_message(MSG_TYPE_OPEN, &body)?;

        let (message_type, body) = self.read_message()?;
        if &message_type != MSG_TYPE_OPEN {
            return Err(Error::Status(ua::StatusCode::BAD_TCP_MESSAGE_TYPE_INVALID));
        }
        let mut cursor = Cursor::new(body.as_slice());
        let _secure_channel_id = cursor.read_u32::<LittleEndian>()?;
        let _policy_uri = ua::String::decode(&mut cursor)?;
        let _sender_certificate = ua::ByteString::decode(&mut cursor)?;
        let _receiver_thumbprint = ua::ByteString::decode(&mut cursor)?;
        let _sequence_number = cursor.read_u32::<LittleEndian>()?;
        let _request_id = cursor.read_u32::<LittleEndian>()?;
        let message = ua::Message::decode(&mut cursor)?;
        let ua::Message::OpenSecureChannelResponse(response) = message else {
            return Err(Error::Status(ua::StatusCode::BAD_TCP_MESSAGE_TYPE_INVALID));
        };
        if response.response_header.service_result.is_bad() {
            return Err(Error::from_status_code(
                response.response_header.service_result,
            ));
        }

        self.secure_channel_id = response.security_token.channel_id;
        self.token_id = response.security_token.token_id;
        self.revised_lifetime_ms = response.security_token.revised_lifetime;
        info!(
            "secure channel {} opened, token {}",
            self.secure_channel_id, self.token_id
        );
        Ok(())
    }

    /// Sends a service request; returns the request id for correlation.
    ///
    /// # Errors
    ///
    /// Fails with `Closed` when the peer disconnected, `Nok` on oversized
    /// messages.
    pub fn send_request(&mut self, message: &ua::Message) -> Result<u32> {
        let mut body = Vec::new();
        body.write_u32::<LittleEndian>(self.secure_channel_id)?;
        body.write_u32::<LittleEndian>(self.token_id)?;
        let sequence_number = self.next_sequence_number();
        let request_id = self.next_request_id();
        body.write_u32::<LittleEndian>(sequence_number)?;
        body.write_u32::<LittleEndian>(request_id)?;
        message.encode(&mut body)?;
        self.write_message(MSG_TYPE_MSG, &body)?;
        Ok(request_id)
    }

    /// Receives the next service response.
    ///
    /// # Errors
    ///
    /// Fails with `Closed` when the peer disconnected and with a decoding
    /// status on malformed responses.
    pub fn recv_response(&mut self) -> Result<(u32, ua::Message)> {
        let (message_type, body) = self.read_message()?;
        if &message_type != MSG_TYPE_MSG {
            return Err(Error::Status(ua::StatusCode::BAD_TCP_MESSAGE_TYPE_INVALID));
        }
        let mut cursor = Cursor::new(body.as_slice());
        let _secure_channel_id = cursor.read_u32::<LittleEndian>()?;
        let _token_id = cursor.read_u32::<LittleEndian>()?;
        let _sequence_number = cursor.read_u32::<LittleEndian>()?;
        let request_id = cursor.read_u32::<LittleEndian>()?;
        let message = ua::Message::decode(&mut cursor)?;
        Ok((request_id, message))
    }

    /// Sends CloseSecureChannel and shuts the transport down. No response
    /// is expected for the close request.
    pub fn close(&mut self) {
        let request = ua::CloseSecureChannelRequest {
            request_header: ua::RequestHeader::new(ua::NodeId::null(), self.next_request_id(), 0),
        };
        let mut body = Vec::new();
        let encoded: Result<()> = (|| {
            body.write_u32::<LittleEndian>(self.secure_channel_id)?;
            body.write_u32::<LittleEndian>(self.token_id)?;
            let sequence_number = self.next_sequence_number();
            body.write_u32::<LittleEndian>(sequence_number)?;
            body.write_u32::<LittleEndian>(self.request_id)?;
            ua::Message::CloseSecureChannelRequest(request).encode(&mut body)?;
            Ok(())
        })();
        if encoded.is_ok() {
            let _ = self.write_message(MSG_TYPE_CLOSE, &body);
        }
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        debug!("secure channel {} closed", self.secure_channel_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_parsing() {
        assert_eq!(
            parse_endpoint_url("opc.tcp://localhost:4841").unwrap(),
            (String::from("localhost"), 4841)
        );
        assert_eq!(
            parse_endpoint_url("opc.tcp://10.0.0.1:4840/path").unwrap(),
            (String::from("10.0.0.1"), 4840)
        );
        assert!(parse_endpoint_url("http://localhost:4841").is_err());
        assert!(parse_endpoint_url("opc.tcp://localhost").is_err());
        assert!(parse_endpoint_url("opc.tcp://:4841").is_err());
    }
}
