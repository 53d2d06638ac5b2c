use super::diversity::DiversityFilter;
use super::learning::{CreateModel, Inception, ReinforcementLearning, Sampling, TransferLearning};
use super::logging::Logging;
use super::scoring::ScoringFunction;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

pub const CONFIGURATION_VERSION: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    ReinforcementLearning,
    Sampling,
    TransferLearning,
    CreateModel,
    Scoring,
}

impl RunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReinforcementLearning => "reinforcement_learning",
            Self::Sampling => "sampling",
            Self::TransferLearning => "transfer_learning",
            Self::CreateModel => "create_model",
            Self::Scoring => "scoring",
        }
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[default]
    Default,
    LibInvent,
    LinkInvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReinforcementLearningParameters {
    pub diversity_filter: DiversityFilter,
    pub inception: Inception,
    pub reinforcement_learning: ReinforcementLearning,
    pub scoring_function: ScoringFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringParameters {
    pub input: PathBuf,
    pub scoring_function: ScoringFunction,
}

/// The `parameters` section. Its variant determines the configuration's `run_type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Parameters {
    ReinforcementLearning(Box<ReinforcementLearningParameters>),
    Sampling(Sampling),
    TransferLearning(TransferLearning),
    CreateModel(CreateModel),
    Scoring(ScoringParameters),
}

impl Parameters {
    pub fn run_type(&self) -> RunType {
        match self {
            Self::ReinforcementLearning(_) => RunType::ReinforcementLearning,
            Self::Sampling(_) => RunType::Sampling,
            Self::TransferLearning(_) => RunType::TransferLearning,
            Self::CreateModel(_) => RunType::CreateModel,
            Self::Scoring(_) => RunType::Scoring,
        }
    }

    fn decode(run_type: RunType, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match run_type {
            RunType::ReinforcementLearning => {
                Self::ReinforcementLearning(Box::new(serde_json::from_value(value)?))
            }
            RunType::Sampling => Self::Sampling(serde_json::from_value(value)?),
            RunType::TransferLearning => Self::TransferLearning(serde_json::from_value(value)?),
            RunType::CreateModel => Self::CreateModel(serde_json::from_value(value)?),
            RunType::Scoring => Self::Scoring(serde_json::from_value(value)?),
        })
    }
}

/// A complete configuration document for one invocation of the external tool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawRunConfiguration")]
pub struct RunConfiguration {
    pub version: u32,
    pub model_type: ModelType,
    pub logging: Logging,
    pub parameters: Parameters,
}

impl RunConfiguration {
    pub fn new(logging: Logging, parameters: Parameters) -> Self {
        Self {
            version: CONFIGURATION_VERSION,
            model_type: ModelType::Default,
            logging,
            parameters,
        }
    }

    pub fn run_type(&self) -> RunType {
        self.parameters.run_type()
    }

    pub fn reinforcement_learning(&self) -> Option<&ReinforcementLearningParameters> {
        match &self.parameters {
            Parameters::ReinforcementLearning(params) => Some(params.as_ref()),
            _ => None,
        }
    }

    pub fn scoring_function(&self) -> Option<&ScoringFunction> {
        match &self.parameters {
            Parameters::ReinforcementLearning(params) => Some(&params.scoring_function),
            Parameters::Scoring(params) => Some(&params.scoring_function),
            _ => None,
        }
    }
}

impl Serialize for RunConfiguration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RunConfiguration", 5)?;
        state.serialize_field("version", &self.version)?;
        state.serialize_field("run_type", &self.run_type())?;
        state.serialize_field("model_type", &self.model_type)?;
        state.serialize_field("logging", &self.logging)?;
        state.serialize_field("parameters", &self.parameters)?;
        state.end()
    }
}

#[derive(Deserialize)]
struct RawRunConfiguration {
    version: u32,
    run_type: RunType,
    #[serde(default)]
    model_type: ModelType,
    logging: Logging,
    parameters: Value,
}

impl TryFrom<RawRunConfiguration> for RunConfiguration {
    type Error = String;

    fn try_from(raw: RawRunConfiguration) -> Result<Self, Self::Error> {
        let parameters = Parameters::decode(raw.run_type, raw.parameters).map_err(|e| {
            format!("invalid parameters for run type '{}': {}", raw.run_type, e)
        })?;
        Ok(Self {
            version: raw.version,
            model_type: raw.model_type,
            logging: raw.logging,
            parameters,
        })
    }
}
