use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("Scoring function has no components")]
    NoComponents,

    #[error("Duplicate component name: '{0}'")]
    DuplicateName(String),

    #[error("Component '{name}' has invalid weight {weight} (must be finite and positive)")]
    InvalidWeight { name: String, weight: f64 },

    #[error("Component '{name}' of type '{component_type}' is missing specific parameter '{key}'")]
    MissingSpecificParameter {
        name: String,
        component_type: String,
        key: &'static str,
    },

    #[error("Component '{name}' of type '{component_type}' requires a transformation")]
    MissingTransformation { name: String, component_type: String },

    #[error("Transformation of component '{name}' is invalid: {reason}")]
    InvalidTransformation { name: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringFunctionName {
    CustomProduct,
    CustomSum,
}

/// Kind of a scoring component.
///
/// Types the tool is known to ship are named variants; anything else is carried through
/// verbatim as [`ComponentType::Other`] so that newer components can still be configured.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentType {
    MatchingSubstructure,
    TanimotoSimilarity,
    JaccardDistance,
    CustomAlerts,
    QedScore,
    PredictiveProperty,
    MolecularWeight,
    NumRotatableBonds,
    NumHbdLipinski,
    NumHbaLipinski,
    NumRings,
    Tpsa,
    SlogP,
    GraphLength,
    SaScore,
    Selectivity,
    DockStream,
    Other(String),
}

impl ComponentType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::MatchingSubstructure => "matching_substructure",
            Self::TanimotoSimilarity => "tanimoto_similarity",
            Self::JaccardDistance => "jaccard_distance",
            Self::CustomAlerts => "custom_alerts",
            Self::QedScore => "qed_score",
            Self::PredictiveProperty => "predictive_property",
            Self::MolecularWeight => "molecular_weight",
            Self::NumRotatableBonds => "num_rotatable_bonds",
            Self::NumHbdLipinski => "num_hbd_lipinski",
            Self::NumHbaLipinski => "num_hba_lipinski",
            Self::NumRings => "num_rings",
            Self::Tpsa => "tpsa",
            Self::SlogP => "slogp",
            Self::GraphLength => "graph_length",
            Self::SaScore => "sa_score",
            Self::Selectivity => "selectivity",
            Self::DockStream => "dockstream",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for ComponentType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "matching_substructure" => Self::MatchingSubstructure,
            "tanimoto_similarity" => Self::TanimotoSimilarity,
            "jaccard_distance" => Self::JaccardDistance,
            "custom_alerts" => Self::CustomAlerts,
            "qed_score" => Self::QedScore,
            "predictive_property" => Self::PredictiveProperty,
            "molecular_weight" => Self::MolecularWeight,
            "num_rotatable_bonds" => Self::NumRotatableBonds,
            "num_hbd_lipinski" => Self::NumHbdLipinski,
            "num_hba_lipinski" => Self::NumHbaLipinski,
            "num_rings" => Self::NumRings,
            "tpsa" => Self::Tpsa,
            "slogp" => Self::SlogP,
            "graph_length" => Self::GraphLength,
            "sa_score" => Self::SaScore,
            "selectivity" => Self::Selectivity,
            "dockstream" => Self::DockStream,
            _ => Self::Other(value),
        }
    }
}

impl From<ComponentType> for String {
    fn from(value: ComponentType) -> Self {
        match value {
            ComponentType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationType {
    Sigmoid,
    ReverseSigmoid,
    DoubleSigmoid,
    Step,
    LeftStep,
    RightStep,
    NoTransformation,
}

/// Score transformation mapping a component's raw value onto `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    pub transformation_type: TransformationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coef_div: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coef_si: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coef_se: Option<f64>,
}

impl Transformation {
    fn bare(transformation_type: TransformationType) -> Self {
        Self {
            transformation_type,
            low: None,
            high: None,
            k: None,
            coef_div: None,
            coef_si: None,
            coef_se: None,
        }
    }

    pub fn none() -> Self {
        Self::bare(TransformationType::NoTransformation)
    }

    pub fn sigmoid(low: f64, high: f64, k: f64) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
            k: Some(k),
            ..Self::bare(TransformationType::Sigmoid)
        }
    }

    pub fn reverse_sigmoid(low: f64, high: f64, k: f64) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
            k: Some(k),
            ..Self::bare(TransformationType::ReverseSigmoid)
        }
    }

    pub fn double_sigmoid(low: f64, high: f64, coef_div: f64, coef_si: f64, coef_se: f64) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
            coef_div: Some(coef_div),
            coef_si: Some(coef_si),
            coef_se: Some(coef_se),
            ..Self::bare(TransformationType::DoubleSigmoid)
        }
    }

    pub fn step(low: f64, high: f64) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
            ..Self::bare(TransformationType::Step)
        }
    }

    /// Checks that every parameter the transformation type reads is present and
    /// consistent. Returns a human readable reason on failure.
    pub fn check(&self) -> Result<(), String> {
        let require = |value: Option<f64>, key: &str| -> Result<f64, String> {
            match value {
                Some(v) if v.is_finite() => Ok(v),
                Some(v) => Err(format!("'{}' must be finite, got {}", key, v)),
                None => Err(format!("'{}' is required", key)),
            }
        };

        match self.transformation_type {
            TransformationType::NoTransformation => Ok(()),
            TransformationType::Sigmoid | TransformationType::ReverseSigmoid => {
                let low = require(self.low, "low")?;
                let high = require(self.high, "high")?;
                require(self.k, "k")?;
                if low >= high {
                    return Err(format!("'low' ({}) must be below 'high' ({})", low, high));
                }
                Ok(())
            }
            TransformationType::DoubleSigmoid => {
                let low = require(self.low, "low")?;
                let high = require(self.high, "high")?;
                require(self.coef_div, "coef_div")?;
                require(self.coef_si, "coef_si")?;
                require(self.coef_se, "coef_se")?;
                if low >= high {
                    return Err(format!("'low' ({}) must be below 'high' ({})", low, high));
                }
                Ok(())
            }
            TransformationType::Step => {
                let low = require(self.low, "low")?;
                let high = require(self.high, "high")?;
                if low > high {
                    return Err(format!("'low' ({}) must not exceed 'high' ({})", low, high));
                }
                Ok(())
            }
            TransformationType::LeftStep => require(self.low, "low").map(|_| ()),
            TransformationType::RightStep => require(self.high, "high").map(|_| ()),
        }
    }
}

/// Component-specific settings. The transformation is typed; every other key (model
/// paths, SMARTS lists, descriptor settings, ...) is passed through as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecificParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation: Option<Transformation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SpecificParameters {
    pub fn with_transformation(mut self, transformation: Transformation) -> Self {
        self.transformation = Some(transformation);
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub component_type: ComponentType,
    pub name: String,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_parameters: Option<SpecificParameters>,
}

impl Component {
    pub fn new(component_type: ComponentType, name: impl Into<String>, weight: f64) -> Self {
        Self {
            component_type,
            name: name.into(),
            weight,
            specific_parameters: None,
        }
    }

    pub fn with_parameters(mut self, parameters: SpecificParameters) -> Self {
        self.specific_parameters = Some(parameters);
        self
    }
}

struct ComponentRequirements {
    keys: &'static [&'static str],
    transformation: bool,
}

static COMPONENT_REQUIREMENTS: phf::Map<&'static str, ComponentRequirements> = phf::phf_map! {
    "matching_substructure" => ComponentRequirements { keys: &["smiles"], transformation: false },
    "custom_alerts" => ComponentRequirements { keys: &["smiles"], transformation: false },
    "tanimoto_similarity" => ComponentRequirements { keys: &["smiles"], transformation: false },
    "jaccard_distance" => ComponentRequirements { keys: &["smiles"], transformation: false },
    "predictive_property" => ComponentRequirements {
        keys: &["model_path", "scikit", "descriptor_type"],
        transformation: false,
    },
    "selectivity" => ComponentRequirements {
        keys: &["activity_model_path", "offtarget_model_path"],
        transformation: false,
    },
    "molecular_weight" => ComponentRequirements { keys: &[], transformation: true },
    "tpsa" => ComponentRequirements { keys: &[], transformation: true },
    "slogp" => ComponentRequirements { keys: &[], transformation: true },
    "num_rotatable_bonds" => ComponentRequirements { keys: &[], transformation: true },
    "num_hbd_lipinski" => ComponentRequirements { keys: &[], transformation: true },
    "num_hba_lipinski" => ComponentRequirements { keys: &[], transformation: true },
    "num_rings" => ComponentRequirements { keys: &[], transformation: true },
    "graph_length" => ComponentRequirements { keys: &[], transformation: true },
    "dockstream" => ComponentRequirements {
        keys: &["configuration_path", "docker_script_path", "environment_path"],
        transformation: true,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringFunction {
    pub name: ScoringFunctionName,
    pub parallel: bool,
    pub parameters: Vec<Component>,
}

impl ScoringFunction {
    pub fn new(name: ScoringFunctionName) -> Self {
        Self {
            name,
            parallel: false,
            parameters: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.parameters.push(component);
        self
    }

    pub fn components(&self) -> &[Component] {
        &self.parameters
    }

    pub fn validate(&self) -> Result<(), ScoringError> {
        if self.parameters.is_empty() {
            return Err(ScoringError::NoComponents);
        }

        let mut seen = HashSet::new();
        for component in &self.parameters {
            if !seen.insert(component.name.as_str()) {
                return Err(ScoringError::DuplicateName(component.name.clone()));
            }
            if !component.weight.is_finite() || component.weight <= 0.0 {
                return Err(ScoringError::InvalidWeight {
                    name: component.name.clone(),
                    weight: component.weight,
                });
            }
            validate_component(component)?;
        }
        Ok(())
    }
}

fn validate_component(component: &Component) -> Result<(), ScoringError> {
    let params = component.specific_parameters.as_ref();

    if let Some(transformation) = params.and_then(|p| p.transformation.as_ref()) {
        transformation
            .check()
            .map_err(|reason| ScoringError::InvalidTransformation {
                name: component.name.clone(),
                reason,
            })?;
    }

    let Some(requirements) = COMPONENT_REQUIREMENTS.get(component.component_type.as_str()) else {
        return Ok(());
    };

    for &key in requirements.keys {
        if !params.is_some_and(|p| p.extra.contains_key(key)) {
            return Err(ScoringError::MissingSpecificParameter {
                name: component.name.clone(),
                component_type: component.component_type.to_string(),
                key,
            });
        }
    }

    if requirements.transformation && params.and_then(|p| p.transformation.as_ref()).is_none() {
        return Err(ScoringError::MissingTransformation {
            name: component.name.clone(),
            component_type: component.component_type.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn substructure(name: &str) -> Component {
        Component::new(ComponentType::MatchingSubstructure, name, 1.0)
            .with_parameters(SpecificParameters::default().with("smiles", json!(["c1ccccc1CC"])))
    }

    #[test]
    fn component_type_round_trips_known_and_unknown_names() {
        assert_eq!(
            ComponentType::from("qed_score".to_string()),
            ComponentType::QedScore
        );
        let other = ComponentType::from("shiny_new_component".to_string());
        assert_eq!(other, ComponentType::Other("shiny_new_component".into()));
        assert_eq!(String::from(other), "shiny_new_component");
    }

    #[test]
    fn component_serializes_to_contract_shape() {
        let component = Component::new(ComponentType::PredictiveProperty, "Regression model", 2.0)
            .with_parameters(
                SpecificParameters::default()
                    .with("model_path", "models/regression.pkl")
                    .with("scikit", "regression")
                    .with("descriptor_type", "ecfp_counts")
                    .with("size", 2048)
                    .with_transformation(Transformation::sigmoid(4.0, 9.0, 0.25)),
            );
        let value = serde_json::to_value(&component).unwrap();
        assert_eq!(value["component_type"], json!("predictive_property"));
        assert_eq!(value["weight"], json!(2.0));
        let specific = &value["specific_parameters"];
        assert_eq!(specific["size"], json!(2048));
        assert_eq!(
            specific["transformation"],
            json!({"transformation_type": "sigmoid", "low": 4.0, "high": 9.0, "k": 0.25})
        );
    }

    #[test]
    fn qed_component_without_parameters_omits_the_key() {
        let component = Component::new(ComponentType::QedScore, "QED Score", 1.0);
        let value = serde_json::to_value(&component).unwrap();
        assert!(value.get("specific_parameters").is_none());
    }

    #[test]
    fn validate_rejects_empty_function() {
        let function = ScoringFunction::new(ScoringFunctionName::CustomProduct);
        assert_eq!(function.validate(), Err(ScoringError::NoComponents));
    }

    #[test]
    fn validate_rejects_duplicate_names() {
        let function = ScoringFunction::new(ScoringFunctionName::CustomSum)
            .with_component(substructure("Match"))
            .with_component(substructure("Match"));
        assert_eq!(
            function.validate(),
            Err(ScoringError::DuplicateName("Match".into()))
        );
    }

    #[test]
    fn validate_rejects_non_positive_weight() {
        let mut component = substructure("Match");
        component.weight = 0.0;
        let function =
            ScoringFunction::new(ScoringFunctionName::CustomProduct).with_component(component);
        assert!(matches!(
            function.validate(),
            Err(ScoringError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn validate_requires_registry_keys() {
        let component = Component::new(ComponentType::CustomAlerts, "Alerts", 1.0);
        let function =
            ScoringFunction::new(ScoringFunctionName::CustomProduct).with_component(component);
        assert_eq!(
            function.validate(),
            Err(ScoringError::MissingSpecificParameter {
                name: "Alerts".into(),
                component_type: "custom_alerts".into(),
                key: "smiles",
            })
        );
    }

    #[test]
    fn validate_requires_transformation_for_physchem_components() {
        let component = Component::new(ComponentType::MolecularWeight, "MW", 1.0);
        let function =
            ScoringFunction::new(ScoringFunctionName::CustomProduct).with_component(component);
        assert!(matches!(
            function.validate(),
            Err(ScoringError::MissingTransformation { .. })
        ));

        let fixed = Component::new(ComponentType::MolecularWeight, "MW", 1.0).with_parameters(
            SpecificParameters::default()
                .with_transformation(Transformation::double_sigmoid(200.0, 500.0, 500.0, 20.0, 20.0)),
        );
        let function =
            ScoringFunction::new(ScoringFunctionName::CustomProduct).with_component(fixed);
        assert!(function.validate().is_ok());
    }

    #[test]
    fn validate_checks_transformation_bounds() {
        let component = Component::new(ComponentType::QedScore, "QED", 1.0).with_parameters(
            SpecificParameters::default().with_transformation(Transformation::sigmoid(9.0, 4.0, 0.25)),
        );
        let function =
            ScoringFunction::new(ScoringFunctionName::CustomProduct).with_component(component);
        assert!(matches!(
            function.validate(),
            Err(ScoringError::InvalidTransformation { .. })
        ));
    }

    #[test]
    fn unknown_component_types_skip_registry_checks() {
        let component = Component::new(ComponentType::Other("aizynth".into()), "Synth", 0.5);
        let function =
            ScoringFunction::new(ScoringFunctionName::CustomSum).with_component(component);
        assert!(function.validate().is_ok());
    }

    #[test]
    fn step_transformations_check_their_side() {
        let mut left = Transformation::none();
        left.transformation_type = TransformationType::LeftStep;
        assert!(left.check().is_err());
        left.low = Some(3.0);
        assert!(left.check().is_ok());
        assert!(Transformation::step(1.0, 2.0).check().is_ok());
        assert!(Transformation::step(3.0, 2.0).check().is_err());
    }
}
