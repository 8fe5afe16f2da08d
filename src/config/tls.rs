use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TlsConfig {
    /// Cached material older than this is regenerated
    /// Default: 3650 days
    #[serde(default = "default_validity_days")]
    pub validity_days: u64,

    /// Organization written into both certificate subjects
    /// Default: "Valkey GLIDE Test"
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Subject alternative names of the server certificate
    /// Default: ["localhost", "127.0.0.1"]
    #[serde(default = "default_server_names")]
    pub server_names: Vec<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            validity_days: default_validity_days(),
            organization: default_organization(),
            server_names: default_server_names(),
        }
    }
}

// Default implementations
fn default_validity_days() -> u64 {
    3650
}
fn default_organization() -> String {
    "Valkey GLIDE Test".into()
}
fn default_server_names() -> Vec<String> {
    vec!["localhost".into(), "127.0.0.1".into()]
}
