//! Logical topology and physical packing plan of a stream-processing job.

use std::collections::BTreeMap;

/// Role a component plays in the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ComponentRole {
    /// Source of tuples.
    Spout,
    /// Processing step.
    Bolt,
}

/// Role and parallelism of one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentInfo {
    pub role: ComponentRole,
    pub parallelism: u32,
}

/// The logical topology of a job: its components keyed by name.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Topology {
    pub name: String,
    pub components: BTreeMap<String, ComponentInfo>,
}

impl Topology {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: BTreeMap::new(),
        }
    }

    /// Add a spout with the given parallelism.
    pub fn spout(self, name: impl Into<String>, parallelism: u32) -> Self {
        self.component(name, ComponentRole::Spout, parallelism)
    }

    /// Add a bolt with the given parallelism.
    pub fn bolt(self, name: impl Into<String>, parallelism: u32) -> Self {
        self.component(name, ComponentRole::Bolt, parallelism)
    }

    pub fn component(
        mut self,
        name: impl Into<String>,
        role: ComponentRole,
        parallelism: u32,
    ) -> Self {
        self.components
            .insert(name.into(), ComponentInfo { role, parallelism });
        self
    }

    /// Names of all components with the given role, sorted.
    pub fn names(&self, role: ComponentRole) -> Vec<String> {
        self.components
            .iter()
            .filter(|(_, info)| info.role == role)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn bolt_names(&self) -> Vec<String> {
        self.names(ComponentRole::Bolt)
    }

    pub fn spout_names(&self) -> Vec<String> {
        self.names(ComponentRole::Spout)
    }

    pub fn bolt_count(&self) -> usize {
        self.bolt_names().len()
    }
}

/// Placement of one component instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstancePlan {
    pub component: String,
    pub task_id: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub component_index: u32,
}

/// The instances placed in one container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerPlan {
    pub id: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub instances: Vec<InstancePlan>,
}

/// Assignment of every component instance to a container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PackingPlan {
    pub id: String,
    pub containers: Vec<ContainerPlan>,
}

impl PackingPlan {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            containers: Vec::new(),
        }
    }

    /// Add a container holding `(component, task_id)` instances.
    pub fn container(mut self, id: u32, instances: &[(&str, u32)]) -> Self {
        let instances = instances
            .iter()
            .enumerate()
            .map(|(index, (component, task_id))| InstancePlan {
                component: component.to_string(),
                task_id: *task_id,
                component_index: index as u32,
            })
            .collect();
        self.containers.push(ContainerPlan { id, instances });
        self
    }

    /// Instance ids of a component, ordered by container id then task id.
    ///
    /// Ids have the form `container_<containerId>_<component>_<taskId>`.
    /// Unknown components yield an empty list.
    pub fn instance_names(&self, component: &str) -> Vec<String> {
        let mut placed: Vec<(u32, u32)> = self
            .containers
            .iter()
            .flat_map(|c| {
                c.instances
                    .iter()
                    .filter(move |i| i.component == component)
                    .map(move |i| (c.id, i.task_id))
            })
            .collect();
        placed.sort_unstable();

        placed
            .into_iter()
            .map(|(container, task_id)| instance_id(container, component, task_id))
            .collect()
    }

    /// Total number of placed instances.
    pub fn instance_count(&self) -> usize {
        self.containers.iter().map(|c| c.instances.len()).sum()
    }
}

/// Build the id of an instance from its placement.
pub fn instance_id(container: u32, component: &str, task_id: u32) -> String {
    format!("container_{}_{}_{}", container, component, task_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology() -> Topology {
        Topology::new("word-count")
            .spout("sentence", 1)
            .bolt("bolt-1", 1)
            .bolt("bolt-2", 2)
    }

    #[test]
    fn bolt_and_spout_names_are_partitioned_by_role() {
        let t = topology();
        assert_eq!(t.bolt_names(), vec!["bolt-1", "bolt-2"]);
        assert_eq!(t.spout_names(), vec!["sentence"]);
        assert_eq!(t.bolt_count(), 2);
    }

    #[test]
    fn instance_names_follow_container_placement() {
        let plan = PackingPlan::new("plan")
            .container(2, &[("bolt-2", 22)])
            .container(1, &[("bolt-1", 1), ("bolt-2", 333)]);

        assert_eq!(plan.instance_names("bolt-1"), vec!["container_1_bolt-1_1"]);
        assert_eq!(
            plan.instance_names("bolt-2"),
            vec!["container_1_bolt-2_333", "container_2_bolt-2_22"]
        );
        assert!(plan.instance_names("unknown").is_empty());
        assert_eq!(plan.instance_count(), 3);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn packing_plan_deserializes_without_component_index() {
        let json = r#"{
            "id": "plan-7",
            "containers": [
                { "id": 1, "instances": [ { "component": "bolt-1", "task_id": 4 } ] }
            ]
        }"#;
        let plan: PackingPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.instance_names("bolt-1"), vec!["container_1_bolt-1_4"]);
    }
}
