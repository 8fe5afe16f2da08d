use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::MemoryLogSource;
use crate::CommandOutput;
use crate::CommandRunner;
use crate::Result;
use crate::SystemError;

pub const FAKE_SERVER: &str = "valkey-server";
pub const FAKE_CLI: &str = "valkey-cli";
pub const FAKE_VERSION: &str = "7.2.4";

#[derive(Debug, Clone)]
struct FakeNode {
    host: String,
    pid: u32,
    up: bool,
    log: PathBuf,
    in_cluster: bool,
    primary_port: Option<u16>,
}

impl FakeNode {
    fn id(port: u16) -> String {
        format!("{:040x}", port)
    }
}

#[derive(Debug, Default)]
struct FleetState {
    nodes: BTreeMap<u16, FakeNode>,
    next_pid: u32,
    conflict_ports: HashSet<u16>,
    conflicting_launches: usize,
    never_ready: HashSet<u16>,
    shutdown_timeouts: HashMap<u16, usize>,
    shutdown_rejections: HashSet<u16>,
    silent_pid_ports: HashSet<u16>,
    hidden_view_polls: usize,
    no_myself_ports: HashSet<u16>,
    reject_cluster_create: bool,
    calls: Vec<(String, Vec<String>)>,
    killed: Vec<u32>,
}

/// Scripted stand-in for the server and CLI binaries.
///
/// Launches write the same log lines a real daemonized server writes,
/// CLI calls answer from the simulated node table.
pub struct FakeServerFleet {
    logs: Arc<MemoryLogSource>,
    state: Mutex<FleetState>,
}

impl FakeServerFleet {
    pub fn new(logs: Arc<MemoryLogSource>) -> Self {
        Self {
            logs,
            state: Mutex::new(FleetState {
                next_pid: 40_000,
                ..Default::default()
            }),
        }
    }

    /// Launches on `port` log an address-in-use error.
    pub fn conflict_on(
        &self,
        port: u16,
    ) {
        self.state.lock().conflict_ports.insert(port);
    }

    /// The next `count` launches hit an address-in-use error, whatever
    /// their port.
    pub fn conflict_next_launches(
        &self,
        count: usize,
    ) {
        self.state.lock().conflicting_launches = count;
    }

    /// Nodes on `port` start but never answer PING.
    pub fn never_ready_on(
        &self,
        port: u16,
    ) {
        self.state.lock().never_ready.insert(port);
    }

    /// The next `count` shutdown requests to `port` time out.
    pub fn shutdown_times_out(
        &self,
        port: u16,
        count: usize,
    ) {
        self.state.lock().shutdown_timeouts.insert(port, count);
    }

    /// Shutdown requests to `port` are answered with an error.
    pub fn reject_shutdown_on(
        &self,
        port: u16,
    ) {
        self.state.lock().shutdown_rejections.insert(port);
    }

    /// Nodes on `port` never log their pid.
    pub fn hide_pid_on(
        &self,
        port: u16,
    ) {
        self.state.lock().silent_pid_ports.insert(port);
    }

    /// The first `polls` slot queries only list primaries.
    pub fn hide_replicas_for(
        &self,
        polls: usize,
    ) {
        self.state.lock().hidden_view_polls = polls;
    }

    /// `cluster nodes` asked on `port` does not flag the answering node.
    pub fn hide_myself_on(
        &self,
        port: u16,
    ) {
        self.state.lock().no_myself_ports.insert(port);
    }

    pub fn reject_cluster_create(&self) {
        self.state.lock().reject_cluster_create = true;
    }

    /// A node started by someone else, e.g. an earlier invocation.
    pub fn start_external(
        &self,
        host: &str,
        port: u16,
        log: PathBuf,
    ) -> u32 {
        let mut state = self.state.lock();
        state.next_pid += 1;
        let pid = state.next_pid;
        state.nodes.insert(
            port,
            FakeNode {
                host: host.to_string(),
                pid,
                up: true,
                log,
                in_cluster: false,
                primary_port: None,
            },
        );
        pid
    }

    pub fn is_up(
        &self,
        port: u16,
    ) -> bool {
        self.state.lock().nodes.get(&port).map(|n| n.up).unwrap_or(false)
    }

    pub fn running_ports(&self) -> Vec<u16> {
        self.state
            .lock()
            .nodes
            .iter()
            .filter(|(_, n)| n.up)
            .map(|(port, _)| *port)
            .collect()
    }

    pub fn pid_of(
        &self,
        port: u16,
    ) -> Option<u32> {
        self.state.lock().nodes.get(&port).map(|n| n.pid)
    }

    pub fn killed(&self) -> Vec<u32> {
        self.state.lock().killed.clone()
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.state.lock().calls.clone()
    }

    /// Every server launch attempt, `--version` excluded
    pub fn launches(&self) -> usize {
        self.calls()
            .iter()
            .filter(|(program, args)| program == FAKE_SERVER && args.first().map(String::as_str) != Some("--version"))
            .count()
    }

    /// Launch attempts that asked for `port`
    pub fn launches_on(
        &self,
        port: u16,
    ) -> usize {
        let port = port.to_string();
        self.calls()
            .iter()
            .filter(|(program, args)| program == FAKE_SERVER && flag_value(args, "--port").as_deref() == Some(port.as_str()))
            .count()
    }

    /// CLI calls whose trailing command starts with `command`
    pub fn cli_calls(
        &self,
        command: &[&str],
    ) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|(program, _)| program == FAKE_CLI)
            .map(|(_, args)| CliCall::parse(&args).command)
            .filter(|cmd| {
                cmd.len() >= command.len() && cmd.iter().zip(command).all(|(a, b)| a.eq_ignore_ascii_case(b))
            })
            .collect()
    }

    fn launch(
        &self,
        args: &[String],
    ) -> CommandOutput {
        let port = flag_value(args, "--tls-port")
            .or_else(|| flag_value(args, "--port"))
            .and_then(|p| p.parse::<u16>().ok());
        let log = flag_value(args, "--logfile").map(PathBuf::from);
        let (Some(port), Some(log)) = (port, log) else {
            return failure("missing --port or --logfile");
        };

        let mut state = self.state.lock();
        let taken = state.nodes.get(&port).map(|n| n.up).unwrap_or(false);
        let forced = state.conflicting_launches > 0;
        if forced {
            state.conflicting_launches -= 1;
        }
        if taken || forced || state.conflict_ports.contains(&port) {
            self.logs.append(
                &log,
                &format!(
                    "# Warning: Could not create server TCP listening socket *:{}: bind: Address already in use\n# Failed listening on port {} (tcp), aborting.\n",
                    port, port
                ),
            );
            return ok("");
        }

        state.next_pid += 1;
        let pid = state.next_pid;
        if !state.silent_pid_ports.contains(&port) {
            self.logs.append(
                &log,
                &format!(
                    "{}:C * Valkey version={}, bits=64, commit=00000000, modified=0, pid={}, just started\n",
                    pid, FAKE_VERSION, pid
                ),
            );
        }
        self.logs.append(&log, &format!("{}:M * Ready to accept connections tcp\n", pid));
        state.nodes.insert(
            port,
            FakeNode {
                host: "127.0.0.1".to_string(),
                pid,
                up: true,
                log,
                in_cluster: false,
                primary_port: None,
            },
        );
        ok("")
    }

    fn cli(
        &self,
        args: &[String],
        program: &str,
    ) -> Result<CommandOutput> {
        let call = CliCall::parse(args);
        let command: Vec<String> = call.command.iter().map(|c| c.to_ascii_lowercase()).collect();
        let command: Vec<&str> = command.iter().map(String::as_str).collect();
        match command.as_slice() {
            ["--cluster", "create", ..] => Ok(self.cluster_create(&call.command)),
            ["shutdown", "nosave"] => self.shutdown(&call, program),
            ["ping"] => Ok(self.ping(&call)),
            ["cluster", "slots"] => Ok(self.cluster_slots(&call)),
            ["cluster", "nodes"] => Ok(self.cluster_nodes(&call)),
            ["replicaof", host, port] => Ok(self.replica_of(&call, host, port)),
            ["role"] => Ok(self.role(&call)),
            _ => Ok(failure(&format!("unknown command {:?}", call.command))),
        }
    }

    fn connection_refused(call: &CliCall) -> CommandOutput {
        CommandOutput {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: format!(
                "Could not connect to Valkey at {}:{}: Connection refused\n",
                call.host, call.port
            ),
        }
    }

    fn ping(
        &self,
        call: &CliCall,
    ) -> CommandOutput {
        let state = self.state.lock();
        match state.nodes.get(&call.port) {
            Some(node) if node.up && !state.never_ready.contains(&call.port) => ok("PONG\n"),
            _ => Self::connection_refused(call),
        }
    }

    fn shutdown(
        &self,
        call: &CliCall,
        program: &str,
    ) -> Result<CommandOutput> {
        let mut state = self.state.lock();
        if let Some(remaining) = state.shutdown_timeouts.get_mut(&call.port) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SystemError::CommandTimeout {
                    command: format!("{} shutdown nosave", program),
                    timeout: Duration::from_secs(5),
                }
                .into());
            }
        }
        if state.shutdown_rejections.contains(&call.port) {
            return Ok(CommandOutput {
                exit_code: Some(0),
                stdout: String::new(),
                stderr: "(error) ERR Errors trying to SHUTDOWN. Check logs.\n".into(),
            });
        }
        let warning = if call.auth {
            "Warning: Using a password with '-a' or '-u' option on the command line interface may not be safe.\n"
        } else {
            ""
        };
        match state.nodes.get_mut(&call.port) {
            Some(node) if node.up => {
                node.up = false;
                Ok(CommandOutput {
                    exit_code: Some(0),
                    stdout: String::new(),
                    stderr: warning.to_string(),
                })
            }
            _ => Ok(Self::connection_refused(call)),
        }
    }

    fn cluster_create(
        &self,
        command: &[String],
    ) -> CommandOutput {
        let mut state = self.state.lock();
        if state.reject_cluster_create {
            return CommandOutput {
                exit_code: Some(1),
                stdout: "[ERR] Node is not empty.\n".into(),
                stderr: "[ERR] Node is not empty. Either the node already knows other nodes\n".into(),
            };
        }
        let replicas = flag_value(command, "--cluster-replicas")
            .and_then(|r| r.parse::<usize>().ok())
            .unwrap_or(0);
        let ports: Vec<u16> = command[2..]
            .iter()
            .take_while(|a| !a.starts_with("--"))
            .filter_map(|addr| addr.rsplit(':').next()?.parse().ok())
            .collect();
        let primaries = ports.len() / (1 + replicas);
        for (i, port) in ports.iter().enumerate() {
            let primary_port = if i < primaries {
                None
            } else {
                Some(ports[(i - primaries) % primaries])
            };
            if let Some(node) = state.nodes.get_mut(port) {
                node.in_cluster = true;
                node.primary_port = primary_port;
                self.logs.append(&node.log, "# Cluster state changed: ok\n");
            }
        }
        ok(">>> Performing hash slots allocation on nodes...\n>>> Check slots coverage...\n[OK] All 16384 slots covered.\n")
    }

    fn cluster_slots(
        &self,
        call: &CliCall,
    ) -> CommandOutput {
        let mut state = self.state.lock();
        if !state.nodes.get(&call.port).map(|n| n.up).unwrap_or(false) {
            return Self::connection_refused(call);
        }
        let hide_replicas = state.hidden_view_polls > 0;
        if hide_replicas {
            state.hidden_view_polls -= 1;
        }
        let mut out = String::new();
        for (port, node) in state.nodes.iter().filter(|(_, n)| n.in_cluster) {
            if hide_replicas && node.primary_port.is_some() {
                continue;
            }
            out.push_str(&format!("{}\n{}\n{}\n", node.host, port, FakeNode::id(*port)));
        }
        ok(&out)
    }

    fn cluster_nodes(
        &self,
        call: &CliCall,
    ) -> CommandOutput {
        let state = self.state.lock();
        let mut out = String::new();
        for (port, node) in state.nodes.iter().filter(|(_, n)| n.in_cluster) {
            let role = if node.primary_port.is_some() { "slave" } else { "master" };
            let flags = if *port == call.port && !state.no_myself_ports.contains(&call.port) {
                format!("myself,{}", role)
            } else {
                role.to_string()
            };
            let master = node.primary_port.map(FakeNode::id).unwrap_or_else(|| "-".into());
            out.push_str(&format!(
                "{} {}:{}@{} {} {} 0 0 1 connected\n",
                FakeNode::id(*port),
                node.host,
                port,
                u32::from(*port) + 10000,
                flags,
                master
            ));
        }
        ok(&out)
    }

    fn replica_of(
        &self,
        call: &CliCall,
        _host: &str,
        port: &str,
    ) -> CommandOutput {
        let Ok(primary_port) = port.parse::<u16>() else {
            return failure("(error) ERR value is not an integer or out of range");
        };
        let mut state = self.state.lock();
        match state.nodes.get_mut(&call.port) {
            Some(node) if node.up => {
                node.primary_port = Some(primary_port);
                self.logs.append(
                    &node.log,
                    "* MASTER <-> REPLICA sync: Finished with success\n",
                );
                ok("OK\n")
            }
            _ => Self::connection_refused(call),
        }
    }

    fn role(
        &self,
        call: &CliCall,
    ) -> CommandOutput {
        let state = self.state.lock();
        match state.nodes.get(&call.port) {
            Some(node) if node.up => match node.primary_port {
                Some(primary) => ok(&format!("slave\n{}\n{}\nconnected\n0\n", node.host, primary)),
                None => ok("master\n0\n"),
            },
            _ => Self::connection_refused(call),
        }
    }

    fn kill(
        &self,
        args: &[String],
    ) -> CommandOutput {
        let Some(pid) = args.last().and_then(|p| p.parse::<u32>().ok()) else {
            return failure("kill: invalid pid");
        };
        let mut state = self.state.lock();
        state.killed.push(pid);
        match state.nodes.values_mut().find(|n| n.pid == pid && n.up) {
            Some(node) => {
                node.up = false;
                ok("")
            }
            None => failure(&format!("kill: ({}) - No such process", pid)),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeServerFleet {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        _timeout: Duration,
    ) -> Result<CommandOutput> {
        self.state.lock().calls.push((program.to_string(), args.to_vec()));
        match program {
            "which" => {
                let known = args.first().map(|a| a == FAKE_SERVER || a == FAKE_CLI).unwrap_or(false);
                Ok(if known { ok("/usr/bin/fake\n") } else { failure("") })
            }
            "kill" => Ok(self.kill(args)),
            FAKE_SERVER if args.first().map(String::as_str) == Some("--version") => Ok(ok(&format!(
                "Valkey server v={} sha=00000000:0 malloc=jemalloc-5.3.0 bits=64 build=1\n",
                FAKE_VERSION
            ))),
            FAKE_SERVER => Ok(self.launch(args)),
            FAKE_CLI => self.cli(args, program),
            other => Err(SystemError::SpawnFailed {
                command: other.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such binary"),
            }
            .into()),
        }
    }
}

/// CLI arguments split into connection options and the command itself
struct CliCall {
    host: String,
    port: u16,
    auth: bool,
    command: Vec<String>,
}

impl CliCall {
    fn parse(args: &[String]) -> Self {
        let mut call = CliCall {
            host: "127.0.0.1".into(),
            port: 6379,
            auth: false,
            command: Vec::new(),
        };
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "-h" => call.host = iter.next().cloned().unwrap_or_default(),
                "-p" => call.port = iter.next().and_then(|p| p.parse().ok()).unwrap_or(0),
                "-a" => {
                    call.auth = true;
                    iter.next();
                }
                "--cert" | "--key" | "--cacert" => {
                    iter.next();
                }
                "--tls" => {}
                _ => {
                    call.command.push(arg.clone());
                    call.command.extend(iter.by_ref().cloned());
                }
            }
        }
        call
    }
}

fn flag_value(
    args: &[String],
    flag: &str,
) -> Option<String> {
    args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1)).cloned()
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

fn failure(stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(1),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}
