//! crates/medvault_core/src/profile.rs
//!
//! Creation and partial update of emergency profiles.

use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::{EmergencyProfile, ProfileUpdate};
use crate::ports::{PortError, PortResult};

const MAX_BLOOD_FIELD_LEN: usize = 5;

impl ProfileUpdate {
    /// Builds a brand new profile for `user_id`.
    ///
    /// Blood type, genotype, weight and the emergency contact are mandatory;
    /// every other field defaults to empty.
    pub fn into_new_profile(self, user_id: Uuid) -> PortResult<EmergencyProfile> {
        let mut missing = Vec::new();
        if self.blood_type.is_none() {
            missing.push("blood_type");
        }
        if self.genotype.is_none() {
            missing.push("genotype");
        }
        if self.weight.is_none() {
            missing.push("weight");
        }
        if self.emergency_contact_name.is_none() {
            missing.push("emergency_contact_name");
        }
        if self.emergency_contact_phone.is_none() {
            missing.push("emergency_contact_phone");
        }
        if !missing.is_empty() {
            return Err(PortError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let mut profile = EmergencyProfile {
            id: Uuid::new_v4(),
            user_id,
            blood_type: String::new(),
            genotype: String::new(),
            weight: 0.0,
            allergies: String::new(),
            conditions: String::new(),
            medications: String::new(),
            emergency_contact_name: String::new(),
            emergency_contact_phone: String::new(),
            vaccination_history: BTreeMap::new(),
            dietary_restrictions: String::new(),
            smoking_status: String::new(),
            alcohol_consumption: String::new(),
            physical_activity_level: String::new(),
        };
        self.apply_to(&mut profile)?;
        Ok(profile)
    }

    /// Overwrites only the fields present in the update. Nothing is changed on error.
    pub fn apply_to(self, profile: &mut EmergencyProfile) -> PortResult<()> {
        self.validate()?;

        let ProfileUpdate {
            blood_type,
            genotype,
            weight,
            allergies,
            conditions,
            medications,
            emergency_contact_name,
            emergency_contact_phone,
            vaccination_history,
            dietary_restrictions,
            smoking_status,
            alcohol_consumption,
            physical_activity_level,
        } = self;

        set(&mut profile.blood_type, blood_type.map(|v| v.trim().to_string()));
        set(&mut profile.genotype, genotype.map(|v| v.trim().to_string()));
        set(&mut profile.weight, weight);
        set(&mut profile.allergies, allergies);
        set(&mut profile.conditions, conditions);
        set(&mut profile.medications, medications);
        set(&mut profile.emergency_contact_name, emergency_contact_name);
        set(
            &mut profile.emergency_contact_phone,
            emergency_contact_phone.map(|v| v.trim().to_string()),
        );
        set(&mut profile.vaccination_history, vaccination_history);
        set(&mut profile.dietary_restrictions, dietary_restrictions);
        set(&mut profile.smoking_status, smoking_status);
        set(&mut profile.alcohol_consumption, alcohol_consumption);
        set(&mut profile.physical_activity_level, physical_activity_level);
        Ok(())
    }

    fn validate(&self) -> PortResult<()> {
        if let Some(weight) = self.weight {
            if !weight.is_finite() || weight <= 0.0 {
                return Err(PortError::Validation(
                    "weight must be a positive number".to_string(),
                ));
            }
        }
        for (field, value) in [("blood_type", &self.blood_type), ("genotype", &self.genotype)] {
            if let Some(value) = value {
                let value = value.trim();
                if value.is_empty() || value.chars().count() > MAX_BLOOD_FIELD_LEN {
                    return Err(PortError::Validation(format!(
                        "{} must be between 1 and {} characters",
                        field, MAX_BLOOD_FIELD_LEN
                    )));
                }
            }
        }
        Ok(())
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_update() -> ProfileUpdate {
        ProfileUpdate {
            blood_type: Some("O+".to_string()),
            genotype: Some("AA".to_string()),
            weight: Some(72.5),
            emergency_contact_name: Some("Ada".to_string()),
            emergency_contact_phone: Some(" 08031234567 ".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn new_profile_requires_core_fields() {
        let update = ProfileUpdate {
            blood_type: Some("O+".to_string()),
            ..Default::default()
        };
        match update.into_new_profile(Uuid::new_v4()) {
            Err(PortError::Validation(msg)) => {
                assert!(msg.contains("genotype"));
                assert!(msg.contains("emergency_contact_phone"));
                assert!(!msg.contains("blood_type"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn new_profile_defaults_optional_fields() {
        let user_id = Uuid::new_v4();
        let profile = complete_update().into_new_profile(user_id).unwrap();
        assert_eq!(profile.user_id, user_id);
        assert_eq!(profile.emergency_contact_phone, "08031234567");
        assert!(profile.allergies.is_empty());
        assert!(profile.vaccination_history.is_empty());
    }

    #[test]
    fn partial_update_keeps_untouched_fields() {
        let mut profile = complete_update().into_new_profile(Uuid::new_v4()).unwrap();
        let update = ProfileUpdate {
            allergies: Some("peanuts, eggs".to_string()),
            ..Default::default()
        };
        update.apply_to(&mut profile).unwrap();
        assert_eq!(profile.allergies, "peanuts, eggs");
        assert_eq!(profile.blood_type, "O+");
        assert_eq!(profile.weight, 72.5);
    }

    #[test]
    fn rejects_non_positive_weight_without_mutating() {
        let mut profile = complete_update().into_new_profile(Uuid::new_v4()).unwrap();
        let update = ProfileUpdate {
            weight: Some(-3.0),
            allergies: Some("milk".to_string()),
            ..Default::default()
        };
        assert!(matches!(update.apply_to(&mut profile), Err(PortError::Validation(_))));
        assert!(profile.allergies.is_empty());
    }

    #[test]
    fn rejects_overlong_blood_type() {
        let update = ProfileUpdate {
            blood_type: Some("AB-POS".to_string()),
            ..complete_update()
        };
        assert!(update.into_new_profile(Uuid::new_v4()).is_err());
    }
}
