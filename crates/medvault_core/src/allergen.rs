//! crates/medvault_core/src/allergen.rs
//!
//! The allergen risk evaluator: resolves a food descriptor, asks a classifier
//! for the allergen it most likely contains, and compares that allergen with
//! the user's recorded allergies.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{Classification, FoodAllergyScan};
use crate::ports::{
    ClassificationService, Clock, DatabaseService, PortError, PortResult, Singularizer,
};

/// Matches below this confidence are low risk.
pub const LOW_RISK_CEILING: f64 = 0.45;
/// Matches at or above this confidence are high risk.
pub const HIGH_RISK_FLOOR: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Tiers a confirmed match by classifier confidence.
    ///
    /// A confidence of exactly `LOW_RISK_CEILING` is neither below the ceiling
    /// nor strictly inside the medium band, so it lands in `High`.
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence < LOW_RISK_CEILING {
            RiskTier::Low
        } else if confidence > LOW_RISK_CEILING && confidence < HIGH_RISK_FLOOR {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

/// The result of comparing a detected allergen with a user's allergies.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskOutcome {
    Match(RiskTier),
    NoMatch { food_name: String },
}

impl fmt::Display for RiskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskOutcome::Match(tier) => f.write_str(tier.as_str()),
            RiskOutcome::NoMatch { food_name } => write!(f, "No allergen found in {}", food_name),
        }
    }
}

/// Lower-cases, trims and singularizes a single allergen term.
pub fn normalize_term(term: &str, singularizer: &dyn Singularizer) -> String {
    let lowered = term.trim().to_lowercase();
    if lowered.is_empty() {
        return lowered;
    }
    singularizer.singularize(&lowered)
}

/// Splits a comma-separated allergy list into normalized terms.
pub fn normalize_allergy_list(list: &str, singularizer: &dyn Singularizer) -> HashSet<String> {
    list.split(',')
        .map(|entry| normalize_term(entry, singularizer))
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Decides the risk of `classification` for a user whose allergies are `allergies`.
pub fn assess(
    classification: &Classification,
    allergies: &str,
    food_name: &str,
    singularizer: &dyn Singularizer,
) -> RiskOutcome {
    let allergen = normalize_term(&classification.label, singularizer);
    let known = normalize_allergy_list(allergies, singularizer);

    if !allergen.is_empty() && known.contains(&allergen) {
        RiskOutcome::Match(RiskTier::from_confidence(classification.confidence))
    } else {
        RiskOutcome::NoMatch {
            food_name: food_name.to_string(),
        }
    }
}

//=========================================================================================
// Scan Requests
//=========================================================================================

/// Raw scan input. Exactly one of the two fields must carry a value.
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    pub food_name: Option<String>,
    pub food_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Descriptor {
    Name(String),
    ImageUrl(String),
}

impl ScanRequest {
    fn descriptor(&self) -> PortResult<Descriptor> {
        let name = non_blank(&self.food_name);
        let image = non_blank(&self.food_image);
        match (name, image) {
            (Some(name), None) => Ok(Descriptor::Name(name)),
            (None, Some(url)) => Ok(Descriptor::ImageUrl(url)),
            (Some(_), Some(_)) => Err(PortError::Validation(
                "Provide either food_name or food_image, not both".to_string(),
            )),
            (None, None) => Err(PortError::Validation(
                "Either food_name or food_image is required".to_string(),
            )),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

//=========================================================================================
// The Evaluator
//=========================================================================================

#[derive(Clone)]
pub struct AllergenEvaluator {
    db: Arc<dyn DatabaseService>,
    classifier: Arc<dyn ClassificationService>,
    singularizer: Arc<dyn Singularizer>,
    clock: Arc<dyn Clock>,
}

impl AllergenEvaluator {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        classifier: Arc<dyn ClassificationService>,
        singularizer: Arc<dyn Singularizer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            classifier,
            singularizer,
            clock,
        }
    }

    /// Runs a scan end to end and returns the persisted record.
    ///
    /// The record is created before classification starts and deleted again
    /// if any later step fails, so failed scans never persist.
    pub async fn scan(&self, user_id: Uuid, request: ScanRequest) -> PortResult<FoodAllergyScan> {
        let descriptor = request.descriptor()?;

        let mut scan = FoodAllergyScan {
            id: Uuid::new_v4(),
            user_id,
            food_name: non_blank(&request.food_name),
            food_image: non_blank(&request.food_image),
            detected_allergen: None,
            confidence: None,
            risk_level: None,
            created_at: self.now(),
        };
        self.db.create_scan(&scan).await?;

        match self.evaluate(&mut scan, &descriptor).await {
            Ok(()) => Ok(scan),
            Err(e) => {
                if let Err(cleanup) = self.db.delete_scan(scan.id).await {
                    warn!("Failed to delete scan {} after error: {:?}", scan.id, cleanup);
                }
                Err(e)
            }
        }
    }

    async fn evaluate(
        &self,
        scan: &mut FoodAllergyScan,
        descriptor: &Descriptor,
    ) -> PortResult<()> {
        let profile = self.db.get_profile_by_user(scan.user_id).await?;

        let food_name = match descriptor {
            Descriptor::Name(name) => name.clone(),
            Descriptor::ImageUrl(url) => self.classifier.classify_image(url).await?.label,
        };
        let food_name = food_name.trim().to_string();
        if food_name.is_empty() {
            return Err(PortError::Validation(
                "Could not determine a food name from the input".to_string(),
            ));
        }

        let classification = self.classifier.classify_text(&food_name).await?;
        if !classification.confidence.is_finite() {
            return Err(PortError::Upstream(
                "Classifier returned a non-numeric confidence".to_string(),
            ));
        }
        let classification = Classification {
            label: classification.label.trim().to_string(),
            confidence: classification.confidence.clamp(0.0, 1.0),
        };

        let outcome = assess(
            &classification,
            &profile.allergies,
            &food_name,
            self.singularizer.as_ref(),
        );

        scan.food_name = Some(food_name);
        scan.detected_allergen = Some(classification.label);
        scan.confidence = Some(classification.confidence);
        scan.risk_level = Some(outcome.to_string());
        self.db.update_scan(scan).await
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Strips a trailing "s" or "es"; good enough for these fixtures.
    struct SuffixSingularizer;

    impl Singularizer for SuffixSingularizer {
        fn singularize(&self, word: &str) -> String {
            if let Some(stem) = word.strip_suffix("ies") {
                format!("{}y", stem)
            } else if let Some(stem) = word.strip_suffix("es").filter(|s| s.ends_with("sh")) {
                stem.to_string()
            } else if let Some(stem) = word.strip_suffix('s') {
                stem.to_string()
            } else {
                word.to_string()
            }
        }
    }

    fn classified(label: &str, confidence: f64) -> Classification {
        Classification {
            label: label.to_string(),
            confidence,
        }
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(RiskTier::from_confidence(0.0), RiskTier::Low);
        assert_eq!(RiskTier::from_confidence(0.44), RiskTier::Low);
        assert_eq!(RiskTier::from_confidence(0.45), RiskTier::High);
        assert_eq!(RiskTier::from_confidence(0.46), RiskTier::Medium);
        assert_eq!(RiskTier::from_confidence(0.69), RiskTier::Medium);
        assert_eq!(RiskTier::from_confidence(0.70), RiskTier::High);
        assert_eq!(RiskTier::from_confidence(1.0), RiskTier::High);
    }

    #[test]
    fn match_ignores_case_and_plurality() {
        let s = SuffixSingularizer;
        for label in ["Nuts", "nut", " NUT "] {
            let outcome = assess(&classified(label, 0.9), "eggs, nuts", "cashew mix", &s);
            assert_eq!(outcome, RiskOutcome::Match(RiskTier::High), "label {:?}", label);
        }
    }

    #[test]
    fn stored_singular_matches_plural_label() {
        let s = SuffixSingularizer;
        let outcome = assess(&classified("Strawberries", 0.5), "strawberry", "smoothie", &s);
        assert_eq!(outcome, RiskOutcome::Match(RiskTier::Medium));
    }

    #[test]
    fn no_match_mentions_food_name() {
        let s = SuffixSingularizer;
        let outcome = assess(&classified("gluten", 0.95), "peanuts", "bread roll", &s);
        assert_eq!(
            outcome,
            RiskOutcome::NoMatch {
                food_name: "bread roll".to_string()
            }
        );
        let text = outcome.to_string();
        assert!(text.contains("bread roll"));
        assert!(!["low", "medium", "high"].contains(&text.as_str()));
    }

    #[test]
    fn empty_allergy_list_never_matches() {
        let s = SuffixSingularizer;
        let outcome = assess(&classified("", 0.9), " , ,", "water", &s);
        assert!(matches!(outcome, RiskOutcome::NoMatch { .. }));
    }

    #[test]
    fn allergy_list_is_trimmed_and_folded() {
        let s = SuffixSingularizer;
        let set = normalize_allergy_list(" Peanuts,shellfish , ,Dairies", &s);
        assert!(set.contains("peanut"));
        assert!(set.contains("shellfish"));
        assert!(set.contains("dairy"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn request_needs_exactly_one_input() {
        let both = ScanRequest {
            food_name: Some("rice".to_string()),
            food_image: Some("https://img.example/rice.jpg".to_string()),
        };
        assert!(matches!(both.descriptor(), Err(PortError::Validation(_))));

        let blank = ScanRequest {
            food_name: Some("   ".to_string()),
            food_image: None,
        };
        assert!(matches!(blank.descriptor(), Err(PortError::Validation(_))));

        let image = ScanRequest {
            food_name: Some(String::new()),
            food_image: Some("https://img.example/rice.jpg".to_string()),
        };
        assert_eq!(
            image.descriptor().unwrap(),
            Descriptor::ImageUrl("https://img.example/rice.jpg".to_string())
        );
    }
}
