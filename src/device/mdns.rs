//! mDNS discovery of casting receivers

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use mdns_sd::{ServiceDaemon, ServiceEvent};
use tracing::debug;

use super::locator::{DeviceDiscovery, DeviceRecord};
use super::normalize_uuid;

pub const CAST_SERVICE_TYPE: &str = "_googlecast._tcp.local.";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Stop condition for one browse window
type Predicate = Box<dyn Fn(&DeviceRecord) -> bool + Send>;

/// Discovery over multicast DNS, one short-lived daemon per pass
#[derive(Debug, Default, Clone)]
pub struct MdnsDiscovery;

impl MdnsDiscovery {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DeviceDiscovery for MdnsDiscovery {
    async fn discover(&self, timeout: Duration) -> Result<Vec<DeviceRecord>> {
        tokio::task::spawn_blocking(move || browse(timeout, None))
            .await
            .context("mDNS discovery task panicked")?
    }

    async fn lookup_listed(
        &self,
        name: Option<&str>,
        uuid: Option<&str>,
        timeout: Duration,
    ) -> Result<Vec<DeviceRecord>> {
        let name = name.map(str::to_lowercase);
        let uuid = uuid.map(normalize_uuid);
        if name.is_none() && uuid.is_none() {
            return Ok(Vec::new());
        }

        // Listed lookup keeps browsing until the wanted receiver answers,
        // then returns only that one.
        let wanted: Predicate = Box::new(move |record: &DeviceRecord| {
            name.as_deref()
                .is_some_and(|n| record.name.to_lowercase() == n)
                || uuid
                    .as_deref()
                    .is_some_and(|u| !record.uuid.is_empty() && normalize_uuid(&record.uuid) == u)
        });

        let found = tokio::task::spawn_blocking(move || {
            browse(timeout, Some(&wanted)).map(|devices| {
                devices
                    .into_iter()
                    .filter(|d| wanted(d))
                    .collect::<Vec<_>>()
            })
        })
        .await
        .context("mDNS lookup task panicked")??;
        Ok(found)
    }
}

fn browse(window: Duration, stop_on: Option<&Predicate>) -> Result<Vec<DeviceRecord>> {
    let mdns = ServiceDaemon::new().context("failed to start mDNS daemon")?;
    let receiver = match mdns.browse(CAST_SERVICE_TYPE) {
        Ok(receiver) => receiver,
        Err(e) => {
            let _ = mdns.shutdown();
            return Err(e).context("failed to browse cast service");
        }
    };

    let by_uuid = collect(window, stop_on, |wait| match receiver.recv_timeout(wait) {
        Ok(event) => Poll::Event(event),
        Err(_) if receiver.is_disconnected() => Poll::Closed,
        Err(_) => Poll::Idle,
    });

    if let Err(e) = mdns.stop_browse(CAST_SERVICE_TYPE) {
        debug!("mDNS: failed to stop browse cleanly: {}", e);
    }
    let _ = mdns.shutdown();

    let mut devices: Vec<DeviceRecord> = by_uuid.into_values().collect();
    devices.sort_by_key(|d| d.name.to_lowercase());
    Ok(devices)
}

/// One poll of the browse channel
enum Poll {
    Event(ServiceEvent),
    Idle,
    Closed,
}

/// Gather resolved receivers until the window ends, the stop condition
/// matches, or the channel closes
fn collect(
    window: Duration,
    stop_on: Option<&Predicate>,
    mut next: impl FnMut(Duration) -> Poll,
) -> HashMap<String, DeviceRecord> {
    let deadline = Instant::now() + window;
    let mut by_uuid = HashMap::new();

    while Instant::now() < deadline {
        let wait = deadline
            .saturating_duration_since(Instant::now())
            .min(POLL_INTERVAL);
        let event = match next(wait) {
            Poll::Event(event) => event,
            Poll::Idle => continue,
            Poll::Closed => {
                debug!("mDNS: browse channel closed");
                break;
            }
        };
        if let ServiceEvent::ServiceResolved(service) = event {
            if let Some(record) = record_from_service(&service) {
                debug!("mDNS: found {} at {}:{}", record.name, record.host, record.port);
                let done = stop_on.is_some_and(|p| p(&record));
                by_uuid.insert(record.uuid.clone(), record);
                if done {
                    break;
                }
            }
        }
    }

    by_uuid
}

fn record_from_service(service: &mdns_sd::ResolvedService) -> Option<DeviceRecord> {
    let mut v4: Vec<_> = service.get_addresses_v4().iter().copied().collect();
    v4.sort();
    let host = v4.first().map(ToString::to_string)?;
    let port = service.get_port();

    let txt = |key: &str| {
        service
            .get_property_val_str(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
    };

    let name = txt("fn").unwrap_or_else(|| instance_name(service.get_fullname()));
    let uuid = txt("id").unwrap_or_else(|| format!("{}:{}", host, port));

    Some(DeviceRecord {
        name,
        uuid,
        host,
        port,
        model: txt("md"),
    })
}

/// Instance label of a full service name, used when the TXT record has no
/// friendly name
fn instance_name(fullname: &str) -> String {
    let label = fullname
        .trim()
        .strip_suffix(CAST_SERVICE_TYPE)
        .unwrap_or(fullname)
        .trim_matches('.');
    label.to_string()
}
