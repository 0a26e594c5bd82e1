//! Discrete code types for the categorical fields.
//!
//! Each categorical column has its own enum with a closed set of valid
//! codes. Codes serialize as plain integers so the record keeps the
//! classifier's tabular shape.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::field::Field;

/// A code outside the valid set of a categorical field.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{code} is not a valid code for '{field}'")]
pub struct InvalidCode {
    pub field: Field,
    pub code: u8,
}

/// Common behaviour of the categorical code enums.
pub trait CategoricalCode: Copy + Sized + 'static {
    /// Column this code belongs to.
    const FIELD: Field;

    /// Valid codes in ascending order.
    const CODES: &'static [u8];

    fn from_code(code: u8) -> Option<Self>;

    fn code(self) -> u8;

    /// Human-readable meaning of the code.
    fn label(self) -> &'static str;
}

macro_rules! categorical_code {
    (
        $(#[$meta:meta])*
        $name:ident for $field:path {
            $( $variant:ident = $code:literal => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "u8", try_from = "u8")]
        #[repr(u8)]
        pub enum $name {
            $( $variant = $code ),+
        }

        impl CategoricalCode for $name {
            const FIELD: Field = $field;
            const CODES: &'static [u8] = &[$($code),+];

            fn from_code(code: u8) -> Option<Self> {
                match code {
                    $( $code => Some(Self::$variant), )+
                    _ => None,
                }
            }

            fn code(self) -> u8 {
                self as u8
            }

            fn label(self) -> &'static str {
                match self {
                    $( Self::$variant => $label ),+
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value.code()
            }
        }

        impl TryFrom<u8> for $name {
            type Error = InvalidCode;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                Self::from_code(code).ok_or(InvalidCode { field: $field, code })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} ({})", self.code(), self.label())
            }
        }
    };
}

categorical_code! {
    /// Patient sex as recorded in the training data.
    Sex for Field::Sex {
        Female = 0 => "female",
        Male = 1 => "male",
    }
}

categorical_code! {
    ChestPain for Field::ChestPain {
        TypicalAngina = 0 => "typical angina",
        AtypicalAngina = 1 => "atypical angina",
        NonAnginalPain = 2 => "non-anginal pain",
        Asymptomatic = 3 => "asymptomatic",
    }
}

categorical_code! {
    /// Whether fasting blood sugar exceeds 120 mg/dl.
    FastingBloodSugar for Field::FastingBloodSugar {
        Normal = 0 => "<= 120 mg/dl",
        Elevated = 1 => "> 120 mg/dl",
    }
}

categorical_code! {
    RestingEcg for Field::RestingEcg {
        Normal = 0 => "normal",
        StTAbnormality = 1 => "ST-T wave abnormality",
        LeftVentricularHypertrophy = 2 => "left ventricular hypertrophy",
    }
}

categorical_code! {
    ExerciseAngina for Field::ExerciseAngina {
        No = 0 => "no",
        Yes = 1 => "yes",
    }
}

categorical_code! {
    /// Slope of the peak exercise ST segment.
    StSlope for Field::Slope {
        Upsloping = 0 => "upsloping",
        Flat = 1 => "flat",
        Downsloping = 2 => "downsloping",
    }
}

categorical_code! {
    /// Number of major vessels colored by fluoroscopy.
    MajorVessels for Field::MajorVessels {
        Zero = 0 => "none",
        One = 1 => "one",
        Two = 2 => "two",
        Three = 3 => "three",
        Four = 4 => "four",
    }
}

categorical_code! {
    Thalassemia for Field::Thal {
        Normal = 1 => "normal",
        FixedDefect = 2 => "fixed defect",
        ReversibleDefect = 3 => "reversible defect",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_round_trips<T: CategoricalCode + PartialEq + fmt::Debug>() {
        for &code in T::CODES {
            let value = T::from_code(code).unwrap();
            assert_eq!(value.code(), code);
        }
    }

    #[test]
    fn test_every_declared_code_resolves() {
        assert_round_trips::<Sex>();
        assert_round_trips::<ChestPain>();
        assert_round_trips::<FastingBloodSugar>();
        assert_round_trips::<RestingEcg>();
        assert_round_trips::<ExerciseAngina>();
        assert_round_trips::<StSlope>();
        assert_round_trips::<MajorVessels>();
        assert_round_trips::<Thalassemia>();
    }

    #[test]
    fn test_out_of_set_codes_rejected() {
        assert!(ChestPain::from_code(4).is_none());
        assert!(MajorVessels::from_code(5).is_none());
        // thal has no zero code
        assert!(Thalassemia::from_code(0).is_none());

        let err = Sex::try_from(2).unwrap_err();
        assert_eq!(err.field, Field::Sex);
        assert_eq!(err.code, 2);
    }

    #[test]
    fn test_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Sex::Male).unwrap(), "1");
        assert_eq!(serde_json::to_string(&Thalassemia::ReversibleDefect).unwrap(), "3");

        let slope: StSlope = serde_json::from_str("2").unwrap();
        assert_eq!(slope, StSlope::Downsloping);
        assert!(serde_json::from_str::<StSlope>("3").is_err());
    }

    #[test]
    fn test_display_shows_code_and_label() {
        assert_eq!(ChestPain::Asymptomatic.to_string(), "3 (asymptomatic)");
    }
}
