use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use crate::utils::file_io::create_parent_dir_if_not_exist;
use crate::utils::file_io::file_age;
use crate::utils::wait::wait_for_condition;
use crate::CertificateGenerator;
use crate::LifecycleError;
use crate::Result;
use crate::TlsConfig;
use crate::TlsMaterial;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Process-wide TLS material, cached across runs in one folder.
///
/// Creating the folder claims generation. A run that finds the folder
/// already there waits for the files of whoever claimed it and reuses them
/// when all are present and younger than the validity threshold.
pub struct CertificateStore {
    material: TlsMaterial,
    generator: Arc<dyn CertificateGenerator>,
    config: TlsConfig,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl CertificateStore {
    pub fn new(
        material: TlsMaterial,
        generator: Arc<dyn CertificateGenerator>,
        config: TlsConfig,
        wait_timeout: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            material,
            generator,
            config,
            wait_timeout,
            poll_interval,
        }
    }

    pub fn material(&self) -> &TlsMaterial {
        &self.material
    }

    /// Make sure valid material exists, generating it at most once.
    pub async fn ensure(&self) -> Result<TlsMaterial> {
        let folder = self.material.folder();
        create_parent_dir_if_not_exist(folder)?;

        match tokio::fs::create_dir(folder).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if self.cache_is_valid().await {
                    debug!("Reusing TLS material in {}", folder.display());
                    return Ok(self.material.clone());
                }
            }
            Err(e) => {
                return Err(LifecycleError::CertificateGenerationFailed(format!(
                    "cannot create {}: {}",
                    folder.display(),
                    e
                ))
                .into())
            }
        }

        let tic = Instant::now();
        self.generator.generate(&self.material, &self.config)?;
        debug!("generate_tls_certs() Elapsed time: {:?}", tic.elapsed());
        Ok(self.material.clone())
    }

    async fn cache_is_valid(&self) -> bool {
        for file in self.material.cached_files() {
            if !self.wait_for_file(&file).await || !self.is_fresh(&file) {
                return false;
            }
        }
        true
    }

    async fn wait_for_file(
        &self,
        file: &Path,
    ) -> bool {
        let found = wait_for_condition(
            move || async move { tokio::fs::try_exists(file).await.ok().filter(|exists| *exists) },
            self.poll_interval,
            self.wait_timeout,
        )
        .await
        .is_some();
        if !found {
            warn!("Timed out waiting for certificate file {}", file.display());
        }
        found
    }

    fn is_fresh(
        &self,
        file: &Path,
    ) -> bool {
        let threshold = Duration::from_secs(self.config.validity_days * SECONDS_PER_DAY);
        match file_age(file) {
            Ok(age) => age < threshold,
            Err(e) => {
                warn!("Cannot read age of {}: {}", file.display(), e);
                false
            }
        }
    }
}
