//! Connection supervisor
//!
//! Owns the retry-until-found loop and the wiring of one connected device to
//! its control surface:
//!
//! ```text
//!   Searching --found--> Connected --lost--> DisconnectedRetrying --wait--> Searching
//!                            (surface create/publish failures count as lost)
//!       |  ^                 |
//!  miss |  | wait            | shutdown / surface closed
//!       v  |                 v
//!   (wait = None) -------> Stopped
//! ```
//!
//! A miss with no wait configured stops the loop with
//! [`BridgeError::NoDevicesFound`]. Shutdown is honoured between attempts and
//! during every sleep.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapter::DeviceAdapter;
use crate::bus::{BridgeEvent, SharedBus};
use crate::config::ConnectionArgs;
use crate::device::locator::{DeviceLocator, DeviceQuery};
use crate::device::SharedDevice;
use crate::error::BridgeError;
use crate::listener::{EventListener, IntegrationHook};
use crate::resolver::Resolver;
use crate::resources::ResourceCache;
use crate::surface::SurfaceFactory;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Searching,
    Connected,
    DisconnectedRetrying,
    Stopped,
}

/// What the supervisor was asked to connect to, and how patiently
#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    pub query: DeviceQuery,
    /// Pause between discovery attempts; `None` gives up after the first miss
    pub wait: Option<Duration>,
    /// Bounds each discovery pass, and the pause after a lost connection
    pub retry_wait: Duration,
    pub light_icon: bool,
}

impl From<&ConnectionArgs> for SupervisorConfig {
    fn from(args: &ConnectionArgs) -> Self {
        Self {
            query: args.query(),
            wait: args.wait.map(seconds),
            retry_wait: seconds(args.retry_wait),
            light_icon: args.icon,
        }
    }
}

/// Negative or non-finite values count as zero
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

/// How a connected session ended
enum SessionEnd {
    Lost,
    Stop,
}

pub struct Supervisor {
    locator: DeviceLocator,
    surfaces: Arc<dyn SurfaceFactory>,
    resources: Arc<ResourceCache>,
    hooks: Vec<Arc<dyn IntegrationHook>>,
    bus: SharedBus,
    shutdown: CancellationToken,
    config: SupervisorConfig,
    state: SupervisorState,
}

impl Supervisor {
    pub fn new(
        locator: DeviceLocator,
        surfaces: Arc<dyn SurfaceFactory>,
        resources: Arc<ResourceCache>,
        bus: SharedBus,
        shutdown: CancellationToken,
        config: SupervisorConfig,
    ) -> Self {
        Self {
            locator,
            surfaces,
            resources,
            hooks: Vec::new(),
            bus,
            shutdown,
            config,
            state: SupervisorState::Searching,
        }
    }

    pub fn with_hooks(mut self, hooks: Vec<Arc<dyn IntegrationHook>>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    fn transition(&mut self, next: SupervisorState) {
        if self.state != next {
            debug!("Supervisor: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    /// Run until shutdown, until the surface closes, or until a miss with
    /// retrying disabled.
    pub async fn run(mut self) -> Result<()> {
        let result = self.run_loop().await;
        self.transition(SupervisorState::Stopped);
        self.bus.publish(BridgeEvent::Stopped);
        info!("Supervisor stopped");
        result
    }

    async fn run_loop(&mut self) -> Result<()> {
        let label = self.config.query.label();
        let mut attempt: u32 = 0;

        loop {
            if self.shutdown.is_cancelled() {
                info!("Shutdown before discovery attempt");
                return Ok(());
            }

            self.transition(SupervisorState::Searching);
            attempt += 1;
            self.bus.publish(BridgeEvent::Searching { attempt });

            let found = match self
                .locator
                .find_device(&self.config.query, self.config.retry_wait)
                .await
            {
                Ok(found) => found,
                Err(e) => {
                    warn!("Discovery attempt {} failed: {:#}", attempt, e);
                    None
                }
            };

            let Some(device) = found else {
                let Some(wait) = self.config.wait else {
                    self.bus.publish(BridgeEvent::DeviceNotFound {
                        attempt,
                        retry_in: None,
                    });
                    return Err(BridgeError::NoDevicesFound(label).into());
                };

                info!(
                    "Device {} not found, retrying in {}s (attempt {})",
                    label,
                    wait.as_secs_f64(),
                    attempt
                );
                self.bus.publish(BridgeEvent::DeviceNotFound {
                    attempt,
                    retry_in: Some(wait.as_secs_f64()),
                });
                if !self.sleep(wait).await {
                    return Ok(());
                }
                continue;
            };

            attempt = 0;
            match self.connected(device).await {
                SessionEnd::Stop => return Ok(()),
                SessionEnd::Lost => {
                    self.transition(SupervisorState::DisconnectedRetrying);
                    let retry_wait = self.config.retry_wait;
                    info!("Reconnecting in {}s", retry_wait.as_secs_f64());
                    if !self.sleep(retry_wait).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Sleep unless shut down first. Returns false on shutdown.
    async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.shutdown.cancelled() => {
                info!("Shutdown during backoff");
                false
            }
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Wire the device to a fresh surface and hold until something ends
    /// the session. A surface that can't be created or published releases
    /// the device and counts as a lost session.
    async fn connected(&mut self, device: SharedDevice) -> SessionEnd {
        let name = device.name().to_string();

        let resolver = Arc::new(Resolver::new(
            device.clone(),
            self.resources.clone(),
            self.config.light_icon,
        ));
        let adapter = Arc::new(DeviceAdapter::new(resolver.clone()));
        let surface = match self.surfaces.create(&name, adapter) {
            Ok(surface) => surface,
            Err(e) => {
                warn!("Couldn't create control surface for {}: {:#}", name, e);
                device.disconnect();
                self.bus.publish(BridgeEvent::ConnectionLost { name });
                return SessionEnd::Lost;
            }
        };
        let listener =
            Arc::new(EventListener::new(resolver, surface.clone()).with_hooks(self.hooks.clone()));
        let lost = listener.connection_lost();

        device.register_listener(listener);
        if let Err(e) = surface.publish() {
            warn!("Couldn't publish control surface for {}: {:#}", name, e);
            device.unregister_listeners();
            device.disconnect();
            self.bus.publish(BridgeEvent::ConnectionLost { name });
            return SessionEnd::Lost;
        }

        self.transition(SupervisorState::Connected);
        info!("Connected to {}", name);
        self.bus.publish(BridgeEvent::Connected {
            name: name.clone(),
            uuid: device.uuid().to_string(),
        });

        let serve_token = self.shutdown.child_token();
        let end = tokio::select! {
            result = surface.serve(serve_token.clone()) => match result {
                Ok(()) => {
                    info!("Control surface for {} closed", name);
                    SessionEnd::Stop
                }
                Err(e) => {
                    warn!("Control surface for {} failed: {:#}", name, e);
                    SessionEnd::Lost
                }
            },
            _ = lost.cancelled() => SessionEnd::Lost,
            _ = self.shutdown.cancelled() => SessionEnd::Stop,
        };
        serve_token.cancel();

        device.unregister_listeners();
        device.disconnect();
        if matches!(end, SessionEnd::Lost) {
            warn!("Lost connection to {}", name);
            self.bus.publish(BridgeEvent::ConnectionLost { name });
        }
        end
    }
}
