use std::fs;
use std::path::{Path, PathBuf};

use log::error;

use crate::ua;
use crate::{Error, Result};

/// Opaque handle on a DER-encoded certificate.
///
/// Crypto operations themselves live behind the PKI seam; the runtime only
/// moves the bytes around.
#[derive(Debug, Clone)]
pub struct CertificateHandle {
    path: PathBuf,
    der: Vec<u8>,
}

impl CertificateHandle {
    /// Loads a certificate file.
    ///
    /// # Errors
    ///
    /// Fails with `Nok` when the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self> {
        let der = fs::read(path).map_err(|err| {
            error!("failed to load certificate {}: {err}", path.display());
            Error::Nok
        })?;
        Ok(Self {
            path: path.to_owned(),
            der,
        })
    }

    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Opaque handle on a private key.
#[derive(Debug, Clone)]
pub struct KeyHandle {
    path: PathBuf,
    data: Vec<u8>,
}

impl KeyHandle {
    /// Loads a private key file.
    ///
    /// # Errors
    ///
    /// Fails with `Nok` when the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|err| {
            error!("failed to load private key {}: {err}", path.display());
            Error::Nok
        })?;
        Ok(Self {
            path: path.to_owned(),
            data,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Opaque PKI provider handle: the trust anchor used to validate peers.
#[derive(Debug, Clone)]
pub struct PkiHandle {
    ca: CertificateHandle,
}

impl PkiHandle {
    /// Creates a provider from a CA certificate.
    ///
    /// # Errors
    ///
    /// Fails with `Nok` when the CA cannot be read.
    pub fn from_ca_file(path: &Path) -> Result<Self> {
        Ok(Self {
            ca: CertificateHandle::from_file(path)?,
        })
    }

    #[must_use]
    pub fn ca(&self) -> &CertificateHandle {
        &self.ca
    }
}

/// Configuration of one client secure channel.
#[derive(Debug, Clone)]
pub struct SecureChannelConfig {
    pub endpoint_url: String,
    pub security_policy: ua::SecurityPolicy,
    pub security_mode: ua::MessageSecurityMode,
    /// Requested channel (and token) lifetime, in milliseconds.
    pub requested_lifetime_ms: u32,
    pub client_certificate: Option<CertificateHandle>,
    pub client_key: Option<KeyHandle>,
    pub server_certificate: Option<CertificateHandle>,
    pub pki: Option<PkiHandle>,
}

impl SecureChannelConfig {
    /// Creates a configuration without certificates, for security mode None.
    ///
    /// # Errors
    ///
    /// Fails with `Nok` on an inconsistent policy/mode combination: message
    /// security mode may be None if and only if the security policy is None.
    pub fn new(
        endpoint_url: &str,
        security_policy: ua::SecurityPolicy,
        security_mode: ua::MessageSecurityMode,
        requested_lifetime_ms: u32,
    ) -> Result<Self> {
        let policy_is_none = security_policy == ua::SecurityPolicy::None;
        let mode_is_none = security_mode == ua::MessageSecurityMode::None;
        if policy_is_none != mode_is_none {
            error!(
                "inconsistent security configuration: policy {security_policy} with mode {security_mode}"
            );
            return Err(Error::Nok);
        }
        Ok(Self {
            endpoint_url: endpoint_url.to_owned(),
            security_policy,
            security_mode,
            requested_lifetime_ms,
            client_certificate: None,
            client_key: None,
            server_certificate: None,
            pki: None,
        })
    }

    /// Attaches the certificates and PKI required when the mode is not None.
    #[must_use]
    pub fn with_certificates(
        mut self,
        client_certificate: CertificateHandle,
        client_key: KeyHandle,
        server_certificate: CertificateHandle,
        pki: PkiHandle,
    ) -> Self {
        self.client_certificate = Some(client_certificate);
        self.client_key = Some(client_key);
        self.server_certificate = Some(server_certificate);
        self.pki = Some(pki);
        self
    }

    /// Checks that certificates are present whenever the mode requires them.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidParameters` when mode is not None and any of the
    /// certificate, key or PKI handles is missing.
    pub fn validate(&self) -> Result<()> {
        if self.security_mode == ua::MessageSecurityMode::None {
            return Ok(());
        }
        let complete = self.client_certificate.is_some()
            && self.client_key.is_some()
            && self.server_certificate.is_some()
            && self.pki.is_some();
        if complete {
            Ok(())
        } else {
            Err(Error::InvalidParameters)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_mode_consistency() {
        assert!(SecureChannelConfig::new(
            "opc.tcp://localhost:4841",
            ua::SecurityPolicy::None,
            ua::MessageSecurityMode::None,
            60_000,
        )
        .is_ok());

        assert!(SecureChannelConfig::new(
            "opc.tcp://localhost:4841",
            ua::SecurityPolicy::None,
            ua::MessageSecurityMode::Sign,
            60_000,
        )
        .is_err());

        assert!(SecureChannelConfig::new(
            "opc.tcp://localhost:4841",
            ua::SecurityPolicy::Basic256Sha256,
            ua::MessageSecurityMode::None,
            60_000,
        )
        .is_err());
    }

    #[test]
    fn secured_config_requires_certificates() {
        let config = SecureChannelConfig::new(
            "opc.tcp://localhost:4841",
            ua::SecurityPolicy::Basic256Sha256,
            ua::MessageSecurityMode::SignAndEncrypt,
            60_000,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }
}
