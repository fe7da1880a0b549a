use std::collections::BTreeMap;

use async_trait::async_trait;
use healthmgr_types::{ComponentMetrics, InstanceMetric};
use tracing::{debug, warn};

use super::{Sensor, SensorContext, EXECUTE_COUNT};
use crate::HealthError;

/// Tuples executed by each bolt instance within the window.
///
/// Instances report this metric themselves, so one query is made per
/// component. Only instances of the current packing plan are kept.
pub struct ExecuteCountSensor {
    ctx: SensorContext,
}

impl ExecuteCountSensor {
    pub fn new(ctx: SensorContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Sensor for ExecuteCountSensor {
    fn metric(&self) -> &'static str {
        EXECUTE_COUNT
    }

    async fn get(
        &self,
        filter: &[&str],
    ) -> Result<BTreeMap<String, ComponentMetrics>, HealthError> {
        let mut result = BTreeMap::new();

        for component in self.ctx.components(filter).await? {
            let planned = self.ctx.instances(&component).await?;
            let mut metrics = ComponentMetrics::new(component.clone());

            let reported = self
                .ctx
                .query(EXECUTE_COUNT, &component)
                .await?
                .and_then(|mut r| r.remove(&component));

            for instance in reported.iter().flat_map(|r| r.iter()) {
                if !planned.contains(&instance.name) {
                    warn!(
                        component = %component,
                        instance = %instance.name,
                        "instance not in packing plan, dropping"
                    );
                    continue;
                }
                match instance.get(EXECUTE_COUNT) {
                    Some(count) if count.is_finite() => {
                        metrics.insert(InstanceMetric::with_metric(
                            instance.name.clone(),
                            EXECUTE_COUNT,
                            count,
                        ));
                    }
                    other => {
                        warn!(
                            component = %component,
                            instance = %instance.name,
                            value = ?other,
                            "unusable execute count, skipping instance"
                        );
                    }
                }
            }

            debug!(
                component = %component,
                instances = metrics.instance_count(),
                "collected execute count"
            );
            result.insert(component, metrics);
        }

        Ok(result)
    }
}
