use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::net::SocketAddrV4;
use std::net::TcpListener;
use std::ops::RangeInclusive;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::time::sleep;
use tokio::time::Instant;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::LifecycleError;
use crate::PortsConfig;
use crate::Result;

/// Picks random loopback ports that can currently be bound.
///
/// Ports handed out once are never handed out again by the same allocator:
/// a daemonizing server may not have bound its port yet when the next node
/// asks for one.
pub struct PortAllocator {
    config: PortsConfig,
    issued: Mutex<HashSet<u16>>,
}

impl PortAllocator {
    pub fn new(config: PortsConfig) -> Self {
        Self {
            config,
            issued: Mutex::new(HashSet::new()),
        }
    }

    /// Search the configured range with the configured timeout.
    pub async fn allocate_default(&self) -> Result<u16> {
        self.allocate(self.config.range(), self.config.search_timeout()).await
    }

    pub async fn allocate(
        &self,
        range: RangeInclusive<u16>,
        timeout: Duration,
    ) -> Result<u16> {
        let started = Instant::now();
        let deadline = started + timeout;
        let (min_port, max_port) = (*range.start(), *range.end());

        while Instant::now() < deadline {
            let port = rand::thread_rng().gen_range(range.clone());
            debug!("Trying port {}", port);

            if self.issued.lock().contains(&port) {
                debug!("Port {} was already handed out", port);
            } else {
                match Self::try_bind(port) {
                    Ok(()) => {
                        self.issued.lock().insert(port);
                        debug!("next free port is {} Elapsed time: {:?}", port, started.elapsed());
                        return Ok(port);
                    }
                    Err(e) => warn!("next free port error for port {}: {}", port, e),
                }
            }

            // don't spam the system with sockets
            sleep(self.retry_delay()).await;
        }

        error!("Timeout Expired: No free port found");
        Err(LifecycleError::NoFreePort {
            min_port,
            max_port,
            timeout,
        }
        .into())
    }

    /// Ports handed out so far
    pub fn issued(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self.issued.lock().iter().copied().collect();
        ports.sort_unstable();
        ports
    }

    /// Binds a throwaway listener, released on return.
    fn try_bind(port: u16) -> std::io::Result<()> {
        let listener = TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))?;
        drop(listener);
        Ok(())
    }

    fn retry_delay(&self) -> Duration {
        let jitter = if self.config.retry_jitter_us == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.config.retry_jitter_us)
        };
        Duration::from_millis(self.config.retry_delay_ms) + Duration::from_micros(jitter)
    }
}
