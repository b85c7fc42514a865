//! Static configuration of the demo clients and runtime defaults.

use std::path::Path;

use crate::client::{CertificateHandle, KeyHandle, PkiHandle, SecureChannelConfig};
use crate::{ua, Result};

/* Secure channel configuration */

pub const ENDPOINT_URL: &str = "opc.tcp://localhost:4841";

/// Security policy is None, Basic256 or Basic256Sha256.
pub const SECURITY_POLICY: ua::SecurityPolicy = ua::SecurityPolicy::None;

/// Security mode is None, Sign or SignAndEncrypt.
pub const SECURITY_MODE: ua::MessageSecurityMode = ua::MessageSecurityMode::None;

/// Secure channel lifetime, in milliseconds.
pub const SC_LIFETIME_MS: u32 = 60_000;

/// Active wait sleep slice, in milliseconds.
pub const SLEEP_LENGTH_MS: u64 = 200;

/* Certificate and key paths, used when the security mode is not None. */

pub const PATH_CLIENT_PUBL: &str = "./client_public/client_4k_cert.der";
pub const PATH_CLIENT_PRIV: &str = "./client_private/client_4k_key.pem";
pub const PATH_SERVER_PUBL: &str = "./server_public/server_4k_cert.der";
pub const PATH_CACERT_PUBL: &str = "./trusted/cacert.der";

/* Runtime defaults */

/// Period of the cyclic timer evaluation, in milliseconds.
pub const TIMER_EVALUATION_TICK_MS: u64 = 50;

/// Per-service maximum number of operations in one request.
pub const MAX_OPERATIONS_PER_REQUEST: usize = 1000;

/// TCP UA protocol version announced in Hello messages.
pub const TCP_UA_PROTOCOL_VERSION: u32 = 0;

/// Negotiated buffer sizes for the TCP UA transport.
pub const TCP_UA_BUFFER_SIZE: u32 = 65_535;

/// Maximum accepted message body size (single chunk).
pub const TCP_UA_MAX_MESSAGE_SIZE: u32 = 2 * 1024 * 1024;

/// Application description of the demo clients.
pub const APPLICATION_URI: &str = "urn:opcua-runtime:client";
pub const PRODUCT_URI: &str = "urn:opcua-runtime";
pub const APPLICATION_NAME: &str = "opcua-runtime demo client";

/// Creates the secure channel configuration of the demo clients.
///
/// When the configured security mode is not None, the client and server
/// certificates, the client key and the PKI are loaded from the paths above.
///
/// # Errors
///
/// Fails with `Nok` when a certificate or key file cannot be loaded, or on
/// an inconsistent policy/mode combination.
pub fn new_secure_channel_config() -> Result<SecureChannelConfig> {
    let config = SecureChannelConfig::new(ENDPOINT_URL, SECURITY_POLICY, SECURITY_MODE, SC_LIFETIME_MS)?;
    if SECURITY_MODE == ua::MessageSecurityMode::None {
        return Ok(config);
    }
    Ok(config.with_certificates(
        CertificateHandle::from_file(Path::new(PATH_CLIENT_PUBL))?,
        KeyHandle::from_file(Path::new(PATH_CLIENT_PRIV))?,
        CertificateHandle::from_file(Path::new(PATH_SERVER_PUBL))?,
        PkiHandle::from_ca_file(Path::new(PATH_CACERT_PUBL))?,
    ))
}
