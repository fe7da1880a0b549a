use std::collections::BTreeMap;

use async_trait::async_trait;
use healthmgr_types::ComponentMetrics;

use super::{Sensor, SensorContext, BACK_PRESSURE};
use crate::HealthError;

/// Share of the window each bolt instance spent throttled, as a percentage.
///
/// The collector reports milliseconds of back pressure within the window;
/// the sensor stores `ms * 100 / window_ms` clamped to `[0, 100]`.
pub struct BackPressureSensor {
    ctx: SensorContext,
}

impl BackPressureSensor {
    pub fn new(ctx: SensorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Sensor for BackPressureSensor {
    fn metric(&self) -> &'static str {
        BACK_PRESSURE
    }

    async fn get(
        &self,
        filter: &[&str],
    ) -> Result<BTreeMap<String, ComponentMetrics>, HealthError> {
        let window_ms = (self.ctx.config.window.as_millis() as f64).max(1.0);

        self.ctx
            .collect_per_instance(
                filter,
                BACK_PRESSURE,
                |instance| format!("{}{}", BACK_PRESSURE, instance),
                |ms| (ms * 100.0 / window_ms).clamp(0.0, 100.0),
            )
            .await
    }
}
