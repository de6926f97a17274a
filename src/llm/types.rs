//! Oracle response types: ClassificationResult and IdeaList.
//!
//! The model returns JSON that deserializes directly into these types.
//! Deserialization alone catches missing fields and wrong types; `validate`
//! covers the constraints serde cannot express.

use crate::error::OracleError;
use serde::{Deserialize, Serialize};

/// What the oracle says about one photographed component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub component_type: String,
    pub recyclable: bool,
    pub hazard_flag: bool,
    /// In [0, 1].
    pub confidence_score: f64,
}

/// Coarse confidence bucket shown next to the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

/// Where the component should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Disposition {
    Upcycle,
    EcoBurn,
}

/// Scores below this get a "please verify" hint.
pub const VERIFY_BELOW: f64 = 0.7;

impl ClassificationResult {
    /// Parse and validate the model's JSON text.
    pub fn from_model_json(raw: &str) -> Result<Self, OracleError> {
        let mut result: Self = serde_json::from_str(raw)?;
        result.component_type = result.component_type.trim().to_string();
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> Result<(), OracleError> {
        if self.component_type.trim().is_empty() {
            return Err(OracleError::Invalid("componentType is empty".into()));
        }
        if !self.confidence_score.is_finite() || !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(OracleError::Invalid(format!(
                "confidenceScore {} is outside [0, 1]",
                self.confidence_score
            )));
        }
        Ok(())
    }

    pub fn confidence_band(&self) -> ConfidenceBand {
        if self.confidence_score > 0.9 {
            ConfidenceBand::High
        } else if self.confidence_score > 0.7 {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    pub fn needs_verification(&self) -> bool {
        self.confidence_score < VERIFY_BELOW
    }

    pub fn disposition(&self) -> Disposition {
        if self.recyclable {
            Disposition::Upcycle
        } else {
            Disposition::EcoBurn
        }
    }
}

/// Ordered upcycling suggestions for one component type. Empty is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeaList {
    pub ideas: Vec<String>,
}

impl IdeaList {
    /// Parse the model's JSON text, trimming entries and dropping blank ones.
    pub fn from_model_json(raw: &str) -> Result<Self, OracleError> {
        let parsed: Self = serde_json::from_str(raw)?;
        Ok(Self {
            ideas: parsed
                .ideas
                .into_iter()
                .map(|idea| idea.trim().to_string())
                .filter(|idea| !idea.is_empty())
                .collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.ideas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_classification() {
        let raw = r#"{"componentType":" Capacitor ","recyclable":true,"hazardFlag":false,"confidenceScore":0.92}"#;
        let result = ClassificationResult::from_model_json(raw).unwrap();
        assert_eq!(result.component_type, "Capacitor");
        assert!(result.recyclable);
        assert!(!result.hazard_flag);
        assert_eq!(result.confidence_score, 0.92);
    }

    #[test]
    fn integer_confidence_is_accepted() {
        let raw = r#"{"componentType":"Resistor","recyclable":false,"hazardFlag":false,"confidenceScore":1}"#;
        let result = ClassificationResult::from_model_json(raw).unwrap();
        assert_eq!(result.confidence_score, 1.0);
    }

    #[test]
    fn missing_field_is_rejected() {
        let raw = r#"{"componentType":"Resistor","recyclable":true,"confidenceScore":0.5}"#;
        let err = ClassificationResult::from_model_json(raw).unwrap_err();
        assert!(matches!(err, OracleError::Json(_)));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let raw = r#"{"componentType":"Resistor","recyclable":"yes","hazardFlag":false,"confidenceScore":0.5}"#;
        assert!(matches!(
            ClassificationResult::from_model_json(raw),
            Err(OracleError::Json(_))
        ));
    }

    #[test]
    fn confidence_out_of_range_is_rejected() {
        for score in ["1.2", "-0.1"] {
            let raw = format!(
                r#"{{"componentType":"Diode","recyclable":true,"hazardFlag":false,"confidenceScore":{}}}"#,
                score
            );
            assert!(matches!(
                ClassificationResult::from_model_json(&raw),
                Err(OracleError::Invalid(_))
            ));
        }
    }

    #[test]
    fn blank_component_type_is_rejected() {
        let raw = r#"{"componentType":"  ","recyclable":true,"hazardFlag":false,"confidenceScore":0.5}"#;
        assert!(matches!(
            ClassificationResult::from_model_json(raw),
            Err(OracleError::Invalid(_))
        ));
    }

    #[test]
    fn bands_follow_thresholds() {
        let mut r = ClassificationResult {
            component_type: "IC".into(),
            recyclable: true,
            hazard_flag: false,
            confidence_score: 0.95,
        };
        assert_eq!(r.confidence_band(), ConfidenceBand::High);
        assert!(!r.needs_verification());

        r.confidence_score = 0.9;
        assert_eq!(r.confidence_band(), ConfidenceBand::Medium);

        r.confidence_score = 0.7;
        assert_eq!(r.confidence_band(), ConfidenceBand::Low);
        assert!(!r.needs_verification());

        r.confidence_score = 0.69;
        assert!(r.needs_verification());
    }

    #[test]
    fn disposition_follows_recyclable() {
        let r = ClassificationResult {
            component_type: "Battery".into(),
            recyclable: false,
            hazard_flag: true,
            confidence_score: 0.8,
        };
        assert_eq!(r.disposition(), Disposition::EcoBurn);
    }

    #[test]
    fn idea_list_drops_blank_entries() {
        let list = IdeaList::from_model_json(r#"{"ideas":[" Make jewelry ","","Build a coil"]}"#).unwrap();
        assert_eq!(list.ideas, vec!["Make jewelry", "Build a coil"]);
    }

    #[test]
    fn empty_idea_list_is_valid() {
        let list = IdeaList::from_model_json(r#"{"ideas":[]}"#).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn idea_list_requires_ideas_field() {
        assert!(IdeaList::from_model_json(r#"{"suggestions":[]}"#).is_err());
    }
}
