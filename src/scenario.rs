use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use tracing::info;

use crate::common::Agent;
use crate::error::InstanceError;
use crate::map::Map;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentYaml {
    pub name: String,
    pub start: [usize; 2],
}

/// On-disk shape of an instance: the grid rows inline, plus agent starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub map: Vec<String>,
    pub agents: Vec<AgentYaml>,
}

impl Scenario {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("failed to open {path}"))?;
        let reader = BufReader::new(file);
        let scenario = serde_yaml::from_reader(reader)?;
        Ok(scenario)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Agents are numbered in file order.
    pub fn into_instance(self) -> Result<Instance, InstanceError> {
        let map = Map::from_rows(&self.map)?;
        let agents = self
            .agents
            .iter()
            .enumerate()
            .map(|(id, agent)| Agent {
                id,
                start: (agent.start[0], agent.start[1]),
            })
            .collect();

        let instance = Instance::new(map, agents)?;
        info!(
            "Load instance: {}x{} map, agents {:?}",
            instance.map.height,
            instance.map.width,
            self.agents.iter().map(|a| &a.name).collect::<Vec<_>>()
        );
        Ok(instance)
    }
}

/// The static problem: a grid and where every agent starts.
#[derive(Debug, Clone)]
pub struct Instance {
    pub map: Map,
    pub agents: Vec<Agent>,
}

impl Instance {
    pub fn new(map: Map, agents: Vec<Agent>) -> Result<Self, InstanceError> {
        if agents.is_empty() {
            return Err(InstanceError::NoAgents);
        }

        let mut starts: HashMap<(usize, usize), usize> = HashMap::new();
        for (index, agent) in agents.iter().enumerate() {
            if agent.id != index {
                return Err(InstanceError::AgentIdMismatch {
                    agent: index,
                    id: agent.id,
                });
            }
            let (x, y) = agent.start;
            if !map.in_bounds(x, y) {
                return Err(InstanceError::OutOfBounds {
                    agent: index,
                    position: agent.start,
                });
            }
            if !map.is_passable(x, y) {
                return Err(InstanceError::Blocked {
                    agent: index,
                    position: agent.start,
                });
            }
            if let Some(&other) = starts.get(&agent.start) {
                return Err(InstanceError::SharedStart {
                    agent: index,
                    other,
                    position: agent.start,
                });
            }
            starts.insert(agent.start, index);
        }

        Ok(Instance { map, agents })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORRIDOR: &str = r#"
map:
  - "..."
agents:
  - name: left
    start: [0, 0]
  - name: right
    start: [0, 2]
"#;

    #[test]
    fn test_read_scenario() {
        let instance = Scenario::from_yaml_str(CORRIDOR)
            .unwrap()
            .into_instance()
            .unwrap();

        assert_eq!(instance.map.width, 3);
        assert_eq!(
            instance.agents,
            [
                Agent {
                    id: 0,
                    start: (0, 0)
                },
                Agent {
                    id: 1,
                    start: (0, 2)
                },
            ]
        );
    }

    #[test]
    fn test_reject_invalid_agents() {
        let map = Map::from_rows(&[".@"]).unwrap();
        assert_eq!(
            Instance::new(map.clone(), vec![]).unwrap_err(),
            InstanceError::NoAgents
        );
        assert_eq!(
            Instance::new(map.clone(), vec![Agent { id: 0, start: (0, 1) }]).unwrap_err(),
            InstanceError::Blocked {
                agent: 0,
                position: (0, 1)
            }
        );
        assert_eq!(
            Instance::new(map.clone(), vec![Agent { id: 0, start: (3, 0) }]).unwrap_err(),
            InstanceError::OutOfBounds {
                agent: 0,
                position: (3, 0)
            }
        );
        assert_eq!(
            Instance::new(map, vec![Agent { id: 1, start: (0, 0) }]).unwrap_err(),
            InstanceError::AgentIdMismatch { agent: 0, id: 1 }
        );

        let corridor = Map::from_rows(&["..."]).unwrap();
        assert_eq!(
            Instance::new(
                corridor,
                vec![
                    Agent { id: 0, start: (0, 0) },
                    Agent { id: 1, start: (0, 0) },
                    Agent { id: 2, start: (0, 2) },
                ]
            )
            .unwrap_err(),
            InstanceError::SharedStart {
                agent: 1,
                other: 0,
                position: (0, 0)
            }
        );
    }

    #[test]
    fn test_shared_start_in_yaml_is_rejected() {
        let yaml = r#"
map:
  - "..."
agents:
  - name: a
    start: [0, 2]
  - name: b
    start: [0, 2]
"#;
        let err = Scenario::from_yaml_str(yaml)
            .unwrap()
            .into_instance()
            .unwrap_err();
        assert!(matches!(err, InstanceError::SharedStart { agent: 1, .. }));
    }

    #[test]
    fn test_missing_file() {
        assert!(Scenario::load_from_file("instances/does-not-exist.yaml").is_err());
    }
}
