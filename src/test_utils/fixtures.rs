//! Sample catalogs.

use std::sync::Arc;

use crate::cache::{Cache, InMemoryCache};
use crate::config::CatalogConfig;
use crate::core::{NewTemplate, TemplateId};
use crate::service::TemplateService;
use crate::store::{InMemoryStore, Store};

/// A small plant catalog in file form: `Pump → Motor → Valve`, `Pump → Valve`,
/// plus an unrelated `Heater`.
pub const SAMPLE_CATALOG: &str = r#"
[[templates]]
name = "Pump"
segment = "Water"
block_type = "FB"
control_library = "core"
depends_on = ["Motor", "Valve"]

[[templates.parameters]]
name = "Speed"
kind = "REAL"
sort_order = 1

[[templates.parameters]]
name = "Run"
kind = "BOOL"
sort_order = 2

[[templates]]
name = "Motor"
segment = "Water"
block_type = "FB"
control_library = "core"
depends_on = ["Valve"]

[[templates]]
name = "Valve"
segment = "Water"
block_type = "UDT"

[[templates]]
name = "Heater"
segment = "Power"
block_type = "FB"
"#;

/// The templates of [`SAMPLE_CATALOG`] created directly through a service, with
/// handles on the backends so tests can inspect them.
pub struct PlantFixture {
    pub service: TemplateService,
    pub store: Arc<InMemoryStore>,
    pub cache: Arc<InMemoryCache>,
    pub pump: TemplateId,
    pub motor: TemplateId,
    pub valve: TemplateId,
    pub heater: TemplateId,
}

impl PlantFixture {
    /// Build the plant with default configuration.
    ///
    /// # Panics
    ///
    /// Panics if building the catalog fails, which only happens on a bug.
    pub async fn new() -> Self {
        Self::with_config(&CatalogConfig::default()).await
    }

    /// Build the plant with `config`.
    ///
    /// # Panics
    ///
    /// Panics if building the catalog fails, which only happens on a bug.
    pub async fn with_config(config: &CatalogConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(InMemoryCache::with_capacity(config.cache.max_entries));
        let service = TemplateService::new(
            Arc::clone(&store) as Arc<dyn Store>,
            Arc::clone(&cache) as Arc<dyn Cache>,
            config,
        );

        let create = |name: &str, segment: &str, block_type: &str| {
            NewTemplate::new(name, format!("NETWORK {name}"))
                .with_segment(segment)
                .with_block_type(block_type)
        };
        let pump = service.create(create("Pump", "Water", "FB")).await.unwrap();
        let motor = service.create(create("Motor", "Water", "FB")).await.unwrap();
        let valve = service.create(create("Valve", "Water", "UDT")).await.unwrap();
        let heater = service.create(create("Heater", "Power", "FB")).await.unwrap();

        service.set_dependencies(motor, &[valve]).await.unwrap();
        service.set_dependencies(pump, &[motor, valve]).await.unwrap();

        Self {
            service,
            store,
            cache,
            pump,
            motor,
            valve,
            heater,
        }
    }
}
