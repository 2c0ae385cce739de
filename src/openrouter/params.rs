use std::error::Error;
use std::fmt;

use serde::Serialize;

/// Model sampling knobs. Every field is optional; `None` means the knob is
/// omitted from the outgoing request entirely, never sent as a zero. A
/// supplied `0` is a real value and is kept.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SamplingParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
}

#[derive(Debug, PartialEq)]
pub enum ParamError {
    OutOfRange {
        name: &'static str,
        bounds: &'static str,
        value: f64,
    },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                name,
                bounds,
                value,
            } => write!(f, "{name} must be within {bounds}, got {value}"),
        }
    }
}

impl Error for ParamError {}

impl SamplingParams {
    /// Validates every present knob against its documented range:
    /// temperature [0, 2], top_p (0, 1], top_k [0, inf) by type,
    /// frequency/presence penalty [-2, 2], repetition_penalty (0, 2].
    pub fn validate(&self) -> Result<(), ParamError> {
        check_inclusive("temperature", self.temperature, 0.0, 2.0, "[0, 2]")?;
        check_half_open("top_p", self.top_p, 0.0, 1.0, "(0, 1]")?;
        check_inclusive(
            "frequency_penalty",
            self.frequency_penalty,
            -2.0,
            2.0,
            "[-2, 2]",
        )?;
        check_inclusive(
            "presence_penalty",
            self.presence_penalty,
            -2.0,
            2.0,
            "[-2, 2]",
        )?;
        check_half_open(
            "repetition_penalty",
            self.repetition_penalty,
            0.0,
            2.0,
            "(0, 2]",
        )?;
        Ok(())
    }
}

fn check_inclusive(
    name: &'static str,
    value: Option<f32>,
    min: f32,
    max: f32,
    bounds: &'static str,
) -> Result<(), ParamError> {
    match value {
        Some(v) if !v.is_finite() || v < min || v > max => Err(ParamError::OutOfRange {
            name,
            bounds,
            value: f64::from(v),
        }),
        _ => Ok(()),
    }
}

fn check_half_open(
    name: &'static str,
    value: Option<f32>,
    min_exclusive: f32,
    max: f32,
    bounds: &'static str,
) -> Result<(), ParamError> {
    match value {
        Some(v) if !v.is_finite() || v <= min_exclusive || v > max => {
            Err(ParamError::OutOfRange {
                name,
                bounds,
                value: f64::from(v),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_temperature(value: f32) -> SamplingParams {
        SamplingParams {
            temperature: Some(value),
            ..SamplingParams::default()
        }
    }

    #[test]
    fn absent_knobs_always_validate() {
        assert!(SamplingParams::default().validate().is_ok());
    }

    #[test]
    fn boundary_values_are_accepted() {
        assert!(with_temperature(0.0).validate().is_ok());
        assert!(with_temperature(2.0).validate().is_ok());

        let params = SamplingParams {
            top_p: Some(1.0),
            repetition_penalty: Some(2.0),
            frequency_penalty: Some(-2.0),
            presence_penalty: Some(2.0),
            ..SamplingParams::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn values_outside_each_bound_are_rejected() {
        assert!(with_temperature(-1.0).validate().is_err());
        assert!(with_temperature(3.0).validate().is_err());

        let high_top_p = SamplingParams {
            top_p: Some(2.0),
            ..SamplingParams::default()
        };
        assert!(high_top_p.validate().is_err());

        let low_penalty = SamplingParams {
            frequency_penalty: Some(-3.0),
            ..SamplingParams::default()
        };
        assert!(low_penalty.validate().is_err());

        let high_repetition = SamplingParams {
            repetition_penalty: Some(3.0),
            ..SamplingParams::default()
        };
        assert!(high_repetition.validate().is_err());
    }

    #[test]
    fn exclusive_lower_bounds_reject_zero() {
        let zero_top_p = SamplingParams {
            top_p: Some(0.0),
            ..SamplingParams::default()
        };
        assert_eq!(
            zero_top_p.validate(),
            Err(ParamError::OutOfRange {
                name: "top_p",
                bounds: "(0, 1]",
                value: 0.0,
            })
        );

        let zero_repetition = SamplingParams {
            repetition_penalty: Some(0.0),
            ..SamplingParams::default()
        };
        assert!(zero_repetition.validate().is_err());
    }

    #[test]
    fn error_message_names_the_parameter_and_bounds() {
        let err = with_temperature(2.5).validate().unwrap_err();
        assert_eq!(err.to_string(), "temperature must be within [0, 2], got 2.5");
    }
}
