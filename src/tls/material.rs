use std::path::Path;
use std::path::PathBuf;

pub const CA_KEY_FILE: &str = "ca.key";
pub const CA_CERT_FILE: &str = "ca.crt";
pub const SERVER_KEY_FILE: &str = "server.key";
pub const SERVER_CERT_FILE: &str = "server.crt";

/// Locations of the CA and server key pairs inside the TLS folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsMaterial {
    folder: PathBuf,
}

impl TlsMaterial {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self { folder: folder.into() }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn ca_key(&self) -> PathBuf {
        self.folder.join(CA_KEY_FILE)
    }

    pub fn ca_cert(&self) -> PathBuf {
        self.folder.join(CA_CERT_FILE)
    }

    pub fn server_key(&self) -> PathBuf {
        self.folder.join(SERVER_KEY_FILE)
    }

    pub fn server_cert(&self) -> PathBuf {
        self.folder.join(SERVER_CERT_FILE)
    }

    /// Files that must be present and fresh for the cache to be reused
    pub fn cached_files(&self) -> [PathBuf; 3] {
        [self.ca_cert(), self.server_key(), self.server_cert()]
    }

    /// Server flags shared by every node of a TLS cluster.
    ///
    /// The plain text port is disabled, `--tls-port` is set by the launcher.
    pub fn server_launch_args(
        &self,
        host: &str,
        replication: bool,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--tls-cluster".into(),
            "yes".into(),
            "--tls-cert-file".into(),
            self.server_cert().display().to_string(),
            "--tls-key-file".into(),
            self.server_key().display().to_string(),
            "--tls-ca-cert-file".into(),
            self.ca_cert().display().to_string(),
            // clients don't have to send a certificate
            "--tls-auth-clients".into(),
            "no".into(),
            "--bind".into(),
            host.into(),
            "--port".into(),
            "0".into(),
        ];
        if replication {
            args.extend(["--tls-replication".into(), "yes".into()]);
        }
        args
    }

    pub fn cli_args(&self) -> Vec<String> {
        vec![
            "--tls".into(),
            "--cert".into(),
            self.server_cert().display().to_string(),
            "--key".into(),
            self.server_key().display().to_string(),
            "--cacert".into(),
            self.ca_cert().display().to_string(),
        ]
    }
}
