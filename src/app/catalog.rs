//! Static service catalog built from [`StationConfig`].

use crate::config::{ServiceEntry, StationConfig};

use super::ports::{Channel, ServiceCatalog};

/// Read-only catalog copied out of the configuration at boot.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    entries: heapless::Vec<ServiceEntry, { crate::config::MAX_SERVICES }>,
}

impl StaticCatalog {
    pub fn from_config(config: &StationConfig) -> Self {
        Self {
            entries: config.services.clone(),
        }
    }

    pub fn services(&self) -> impl Iterator<Item = &ServiceEntry> {
        self.entries.iter()
    }

    fn find(&self, service_id: &str) -> Option<&ServiceEntry> {
        self.entries.iter().find(|e| e.id.as_str() == service_id)
    }
}

impl ServiceCatalog for StaticCatalog {
    fn resolve_channel(&self, service_id: &str) -> Option<Channel> {
        self.find(service_id).map(|e| Channel(e.channel))
    }

    fn price_per_minute(&self, service_id: &str) -> Option<f64> {
        self.find(service_id).map(|e| e.price_per_minute)
    }
}
