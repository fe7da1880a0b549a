use std::collections::BTreeMap;

use async_trait::async_trait;
use healthmgr_types::ComponentMetrics;

use super::{Sensor, SensorContext, BUFFER_SIZE, BUFFER_SIZE_SUFFIX};
use crate::HealthError;

/// Bytes the collector holds buffered for each bolt instance.
pub struct BufferSizeSensor {
    ctx: SensorContext,
}

impl BufferSizeSensor {
    pub fn new(ctx: SensorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Sensor for BufferSizeSensor {
    fn metric(&self) -> &'static str {
        BUFFER_SIZE
    }

    async fn get(
        &self,
        filter: &[&str],
    ) -> Result<BTreeMap<String, ComponentMetrics>, HealthError> {
        self.ctx
            .collect_per_instance(
                filter,
                BUFFER_SIZE,
                |instance| format!("{}{}{}", BUFFER_SIZE, instance, BUFFER_SIZE_SUFFIX),
                |bytes| bytes,
            )
            .await
    }
}
