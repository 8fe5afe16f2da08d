use std::path::Path;

#[cfg(test)]
use mockall::automock;
use rcgen::BasicConstraints;
use rcgen::CertificateParams;
use rcgen::DnType;
use rcgen::ExtendedKeyUsagePurpose;
use rcgen::IsCa;
use rcgen::KeyPair;
use rcgen::KeyUsagePurpose;
use tracing::debug;

use crate::Result;
use crate::SystemError;
use crate::TlsConfig;
use crate::TlsMaterial;

/// Produces a fresh CA and a server key pair signed by it.
#[cfg_attr(test, automock)]
pub trait CertificateGenerator: Send + Sync + 'static {
    fn generate(
        &self,
        material: &TlsMaterial,
        config: &TlsConfig,
    ) -> Result<()>;
}

/// In-process generation with rcgen, written as PEM files.
#[derive(Debug, Default, Clone, Copy)]
pub struct RcgenGenerator;

impl CertificateGenerator for RcgenGenerator {
    fn generate(
        &self,
        material: &TlsMaterial,
        config: &TlsConfig,
    ) -> Result<()> {
        debug!("Generating TLS material in {}", material.folder().display());

        let ca_key = KeyPair::generate()?;
        let mut ca_params = CertificateParams::new(Vec::<String>::new())?;
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params
            .distinguished_name
            .push(DnType::OrganizationName, config.organization.as_str());
        ca_params
            .distinguished_name
            .push(DnType::CommonName, "Certificate Authority");
        ca_params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let ca_cert = ca_params.self_signed(&ca_key)?;

        let server_key = KeyPair::generate()?;
        let mut server_params = CertificateParams::new(config.server_names.clone())?;
        server_params
            .distinguished_name
            .push(DnType::OrganizationName, config.organization.as_str());
        server_params.distinguished_name.push(DnType::CommonName, "Server");
        server_params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        server_params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        let server_cert = server_params.signed_by(&server_key, &ca_cert, &ca_key)?;

        write_pem(&material.ca_key(), &ca_key.serialize_pem())?;
        write_pem(&material.ca_cert(), &ca_cert.pem())?;
        write_pem(&material.server_key(), &server_key.serialize_pem())?;
        write_pem(&material.server_cert(), &server_cert.pem())?;
        Ok(())
    }
}

fn write_pem(
    path: &Path,
    pem: &str,
) -> Result<()> {
    std::fs::write(path, pem).map_err(|e| SystemError::path(path, e))?;
    Ok(())
}
