//! Derived clinical metrics
//!
//! Body-mass index is the only derived field on a patient profile. It is
//! never entered by hand: every height or weight change recomputes it.

/// Compute BMI from height in centimetres and weight in kilograms.
///
/// Returns `None` (shown as blank) unless both values are finite and
/// positive. The result is rounded to one decimal place.
pub fn compute_bmi(height_cm: f64, weight_kg: f64) -> Option<f64> {
    if !(height_cm.is_finite() && weight_kg.is_finite()) {
        return None;
    }
    if height_cm <= 0.0 || weight_kg <= 0.0 {
        return None;
    }

    let height_m = height_cm / 100.0;
    let bmi = weight_kg / (height_m * height_m);
    if !bmi.is_finite() {
        return None;
    }

    Some(round_one_decimal(bmi))
}

/// Compute BMI from raw form input.
///
/// Non-numeric text yields `None` just like a non-positive number.
pub fn compute_bmi_from_input(height: &str, weight: &str) -> Option<f64> {
    let height = height.trim().parse::<f64>().ok()?;
    let weight = weight.trim().parse::<f64>().ok()?;
    compute_bmi(height, weight)
}

/// Render a BMI with exactly one fractional digit, or blank.
pub fn format_bmi(bmi: Option<f64>) -> String {
    match bmi {
        Some(value) => format!("{:.1}", value),
        None => String::new(),
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// WHO adult BMI bands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }
}

impl std::fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BmiCategory::Underweight => write!(f, "Underweight"),
            BmiCategory::Normal => write!(f, "Normal"),
            BmiCategory::Overweight => write!(f, "Overweight"),
            BmiCategory::Obese => write!(f, "Obese"),
        }
    }
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// BMI matches the textbook formula to one decimal place
        #[test]
        fn bmi_matches_formula(
            height in 50.0..250.0f64,
            weight in 2.0..300.0f64
        ) {
            let expected = weight / ((height / 100.0) * (height / 100.0));
            let bmi = compute_bmi(height, weight).unwrap();
            prop_assert!(
                (bmi - expected).abs() <= 0.05 + 1e-9,
                "bmi {} too far from {}",
                bmi, expected
            );
            prop_assert_eq!(bmi, (bmi * 10.0).round() / 10.0);
        }

        /// Any non-positive input blanks the result
        #[test]
        fn non_positive_is_blank(
            height in -500.0..=0.0f64,
            weight in 1.0..300.0f64
        ) {
            prop_assert_eq!(compute_bmi(height, weight), None);
            prop_assert_eq!(compute_bmi(weight, height), None);
        }
    }
}
