use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a stored or submitted string does not name a known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: {value:?}")]
pub struct ParseEnumError {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ParseEnumError {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(
    /// Total order used for sorting and blocking: `High > Moderate > Low`.
    /// Variant order matters, `Ord` is derived from it.
    Severity {
        Low => "low",
        Moderate => "moderate",
        High => "high",
    }
);

str_enum!(FindingKind {
    Interaction => "interaction",
    Allergy => "allergy",
});

str_enum!(
    /// Reasons a clinician may give when overriding a finding.
    OverrideReason {
        ClinicalBenefit => "clinical_benefit",
        NoAlternative => "no_alternative",
        PatientMonitored => "patient_monitored",
        DoseAdjusted => "dose_adjusted",
        TemporaryUse => "temporary_use",
        SpecialistConsultation => "specialist_consultation",
        Custom => "custom",
    }
);

str_enum!(
    /// Banner level consumed by the presentation layer.
    AlertLevel {
        Info => "info",
        Warning => "warning",
        Critical => "critical",
    }
);

impl Severity {
    /// Lenient parse for external data: case-insensitive, and accepts the
    /// clinical vocabulary patient records commonly use.
    pub fn parse_lenient(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" | "mild" | "minor" => Some(Self::Low),
            "moderate" | "medium" => Some(Self::Moderate),
            "high" | "severe" | "major" | "life_threatening" | "life-threatening" => {
                Some(Self::High)
            }
            _ => None,
        }
    }

    pub fn alert_level(&self) -> AlertLevel {
        match self {
            Self::Low => AlertLevel::Info,
            Self::Moderate => AlertLevel::Warning,
            Self::High => AlertLevel::Critical,
        }
    }
}

impl OverrideReason {
    /// Human-readable label shown in the override dialog.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ClinicalBenefit => "Clinical benefit outweighs risk",
            Self::NoAlternative => "No suitable alternative available",
            Self::PatientMonitored => "Patient will be closely monitored",
            Self::DoseAdjusted => "Dose has been adjusted appropriately",
            Self::TemporaryUse => "Temporary use only",
            Self::SpecialistConsultation => "Specialist consultation obtained",
            Self::Custom => "Other (specify)",
        }
    }

    pub fn all() -> [Self; 7] {
        [
            Self::ClinicalBenefit,
            Self::NoAlternative,
            Self::PatientMonitored,
            Self::DoseAdjusted,
            Self::TemporaryUse,
            Self::SpecialistConsultation,
            Self::Custom,
        ]
    }
}
