use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiversityFilterName {
    IdenticalMurckoScaffold,
    IdenticalTopologicalScaffold,
    ScaffoldSimilarity,
    NoFilter,
}

impl fmt::Display for DiversityFilterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::IdenticalMurckoScaffold => "IdenticalMurckoScaffold",
            Self::IdenticalTopologicalScaffold => "IdenticalTopologicalScaffold",
            Self::ScaffoldSimilarity => "ScaffoldSimilarity",
            Self::NoFilter => "NoFilter",
        };
        f.write_str(name)
    }
}

/// Scaffold-based diversity filter applied by the external tool during reinforcement
/// learning.
///
/// Molecules scoring below `minscore` never enter the scaffold memory, and a scaffold
/// bucket holding `nbmax` molecules penalizes further members. `minsimilarity` is only
/// read by the [`DiversityFilterName::ScaffoldSimilarity`] filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityFilter {
    pub name: DiversityFilterName,
    pub nbmax: usize,
    pub minscore: f64,
    pub minsimilarity: f64,
}

impl Default for DiversityFilter {
    fn default() -> Self {
        Self {
            name: DiversityFilterName::IdenticalMurckoScaffold,
            nbmax: 25,
            minscore: 0.4,
            minsimilarity: 0.4,
        }
    }
}
