//! Geometry of an intersection.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tsc_core::{FeatureLayout, TscError};

/// A movement from an incoming approach to an outgoing link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Movement {
    /// Index of the incoming approach.
    pub from: usize,

    /// Index of the outgoing link.
    pub to: usize,
}

/// A signal phase: the set of movements that have green together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Name of the phase.
    pub name: String,

    /// Movements served by the phase.
    pub movements: Vec<Movement>,
}

impl Phase {
    /// Creates a phase.
    pub fn new(name: impl Into<String>, movements: &[(usize, usize)]) -> Self {
        Self {
            name: name.into(),
            movements: movements
                .iter()
                .map(|&(from, to)| Movement { from, to })
                .collect(),
        }
    }

    /// Incoming approaches served by the phase, each listed once.
    pub fn approaches(&self) -> Vec<usize> {
        let mut v: Vec<usize> = self.movements.iter().map(|m| m.from).collect();
        v.sort_unstable();
        v.dedup();
        v
    }

    /// Outgoing links fed by the phase, each listed once.
    pub fn links(&self) -> Vec<usize> {
        let mut v: Vec<usize> = self.movements.iter().map(|m| m.to).collect();
        v.sort_unstable();
        v.dedup();
        v
    }
}

/// Approaches, outgoing links and phases of an intersection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntersectionLayout {
    /// Names of the incoming approaches.
    pub approaches: Vec<String>,

    /// Names of the outgoing links.
    pub links: Vec<String>,

    /// Signal phases in cyclic order.
    pub phases: Vec<Phase>,
}

impl Default for IntersectionLayout {
    fn default() -> Self {
        Self::two_way()
    }
}

impl IntersectionLayout {
    /// Two competing directions, north-south and east-west, with one phase each.
    pub fn two_way() -> Self {
        Self {
            approaches: vec!["ns".to_string(), "ew".to_string()],
            links: vec!["ns_out".to_string(), "ew_out".to_string()],
            phases: vec![Phase::new("ns_green", &[(0, 0)]), Phase::new("ew_green", &[(1, 1)])],
        }
    }

    /// Four approaches with through movements, served by two phases.
    pub fn four_way() -> Self {
        let names = |suffix: &str| {
            ["north", "south", "east", "west"]
                .iter()
                .map(|d| format!("{}{}", d, suffix))
                .collect::<Vec<_>>()
        };
        Self {
            approaches: names("_in"),
            links: names("_out"),
            phases: vec![
                Phase::new("ns_through", &[(0, 1), (1, 0)]),
                Phase::new("ew_through", &[(2, 3), (3, 2)]),
            ],
        }
    }

    /// Number of incoming approaches.
    pub fn n_approaches(&self) -> usize {
        self.approaches.len()
    }

    /// Number of outgoing links.
    pub fn n_links(&self) -> usize {
        self.links.len()
    }

    /// Number of phases.
    pub fn n_phases(&self) -> usize {
        self.phases.len()
    }

    /// Layout of the observation features.
    pub fn feature_layout(&self) -> FeatureLayout {
        FeatureLayout::new(self.n_approaches(), self.n_phases())
    }

    /// Checks that phases exist and only reference known approaches and links.
    pub fn validate(&self) -> Result<()> {
        if self.phases.is_empty() {
            return Err(TscError::InvalidConfig("intersection has no phase".to_string()).into());
        }
        for phase in self.phases.iter() {
            if phase.movements.is_empty() {
                return Err(TscError::InvalidConfig(format!(
                    "phase {} has no movement",
                    phase.name
                ))
                .into());
            }
            for m in phase.movements.iter() {
                if m.from >= self.n_approaches() || m.to >= self.n_links() {
                    return Err(TscError::InvalidConfig(format!(
                        "phase {} references unknown approach or link ({} -> {})",
                        phase.name, m.from, m.to
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_layouts_are_valid() -> Result<()> {
        IntersectionLayout::two_way().validate()?;
        let layout = IntersectionLayout::four_way();
        layout.validate()?;
        assert_eq!(layout.phases[1].approaches(), vec![2, 3]);
        assert_eq!(layout.phases[1].links(), vec![2, 3]);
        assert_eq!(layout.feature_layout().dim(), 11);
        Ok(())
    }

    #[test]
    fn test_unknown_link_is_rejected() {
        let mut layout = IntersectionLayout::two_way();
        layout.phases[0].movements.push(Movement { from: 0, to: 5 });
        assert!(layout.validate().is_err());
    }
}
