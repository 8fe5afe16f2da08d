use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::CommandOutput;
use crate::CommandRunner;
use crate::Node;
use crate::Result;
use crate::TlsMaterial;

/// Password passed to the CLI with `-a`
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    password: String,
}

impl Credentials {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str("Credentials(***)")
    }
}

/// Builds and runs CLI command lines against one node or the whole set.
#[derive(Clone)]
pub struct CliInvoker {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    tls: Option<TlsMaterial>,
}

impl CliInvoker {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        binary: impl Into<String>,
        tls: Option<TlsMaterial>,
    ) -> Self {
        Self {
            runner,
            binary: binary.into(),
            tls,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Connection options shared by every call
    pub fn option_args(
        &self,
        credentials: Option<&Credentials>,
    ) -> Vec<String> {
        let mut args = self.tls.as_ref().map(TlsMaterial::cli_args).unwrap_or_default();
        if let Some(credentials) = credentials {
            args.extend(["-a".to_string(), credentials.password().to_string()]);
        }
        args
    }

    pub fn node_args(
        &self,
        node: &Node,
        credentials: Option<&Credentials>,
        command: &[&str],
    ) -> Vec<String> {
        let mut args = vec!["-h".to_string(), node.host.clone(), "-p".to_string(), node.port.to_string()];
        args.extend(self.option_args(credentials));
        args.extend(command.iter().map(|c| c.to_string()));
        args
    }

    pub async fn run_on(
        &self,
        node: &Node,
        credentials: Option<&Credentials>,
        command: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let args = self.node_args(node, credentials, command);
        self.runner.run(&self.binary, &args, timeout).await
    }

    /// Command that does not target a single node, e.g. `--cluster create`
    pub async fn run(
        &self,
        command: Vec<String>,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let mut args = self.option_args(None);
        args.extend(command);
        self.runner.run(&self.binary, &args, timeout).await
    }
}
