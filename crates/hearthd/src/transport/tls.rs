//! TLS server configuration loaded from PEM files.

use std::sync::Arc;

use rustls::ServerConfig;
use rustls::crypto::ring;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use hearth_config::TlsBinding;

use super::ListenerError;

const HTTP_1_1: &[u8] = b"http/1.1";

/// Builds the rustls server configuration for a TLS binding.
pub(super) fn load_server_config(binding: &TlsBinding) -> Result<Arc<ServerConfig>, ListenerError> {
    let certificates = CertificateDer::pem_file_iter(binding.cert_file.as_std_path())
        .and_then(|certificates| certificates.collect::<Result<Vec<_>, _>>())
        .map_err(|source| ListenerError::TlsCertificates {
            path: binding.cert_file.clone(),
            source,
        })?;
    if certificates.is_empty() {
        return Err(ListenerError::TlsNoCertificates {
            path: binding.cert_file.clone(),
        });
    }

    let key = PrivateKeyDer::from_pem_file(binding.key_file.as_std_path()).map_err(|source| {
        ListenerError::TlsPrivateKey {
            path: binding.key_file.clone(),
            source,
        }
    })?;

    let mut config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(|source| ListenerError::TlsConfig { source })?
        .with_no_client_auth()
        .with_single_cert(certificates, key)
        .map_err(|source| ListenerError::TlsConfig { source })?;
    config.alpn_protocols = vec![HTTP_1_1.to_vec()];
    Ok(Arc::new(config))
}
