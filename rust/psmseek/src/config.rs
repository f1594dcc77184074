use crate::errors::{
    PsmSeekError,
    Result,
};
use crate::models::MassFormat;
use regex::Regex;
use serde::{
    Deserialize,
    Serialize,
};

/// Shift values scanned while fitting the Weibull location parameter.
///
/// Scanned from `max` downward in `step` increments while strictly above `min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ShiftRange {
    pub const PRIMARY: ShiftRange = ShiftRange {
        min: -5.0,
        max: 5.0,
        step: 0.05,
    };
    pub const PRELIMINARY: ShiftRange = ShiftRange {
        min: -100.0,
        max: 300.0,
        step: 5.0,
    };

    /// Shift values in scan order. Computed from the step count so that
    /// long scans do not accumulate rounding drift.
    pub fn shifts(&self) -> impl Iterator<Item = f64> + '_ {
        (0..)
            .map(move |k| self.max - (k as f64) * self.step)
            .take_while(move |s| *s > self.min)
    }
}

/// Run-wide, read-only parameters for building and calibrating match
/// collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParameters {
    pub max_rank_preliminary: u32,
    pub psms_per_spectrum_reported: u32,
    pub fraction_top_scores_to_fit: f64,
    pub match_capacity: usize,
    pub min_weibull_points: usize,
    pub primary_shift_range: ShiftRange,
    pub preliminary_shift_range: ShiftRange,
    /// A fit is only kept if its correlation reaches this value. 0 accepts
    /// the best available fit.
    pub correlation_threshold: f64,
    pub bonferroni_correction: bool,
    /// Estimated fraction of true nulls, scaling the Benjamini-Hochberg
    /// q-values of the Weibull p-values.
    pub pi_zero: f64,
    pub decoy_prefix: String,
    pub newton_max_iterations: usize,
    pub newton_tolerance: f64,
    /// Copy primary scores into the decoy score pool while scoring.
    pub store_primary_scores: bool,
    #[serde(skip)]
    pub mass_format: MassFormat,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            max_rank_preliminary: 500,
            psms_per_spectrum_reported: 5,
            fraction_top_scores_to_fit: 0.55,
            match_capacity: 10_000_000,
            min_weibull_points: 40,
            primary_shift_range: ShiftRange::PRIMARY,
            preliminary_shift_range: ShiftRange::PRELIMINARY,
            correlation_threshold: 0.0,
            bonferroni_correction: true,
            pi_zero: 1.0,
            decoy_prefix: "decoy_".to_string(),
            newton_max_iterations: 100,
            newton_tolerance: 1e-6,
            store_primary_scores: false,
            mass_format: MassFormat::MergedMods,
        }
    }
}

impl SearchParameters {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fraction_top_scores_to_fit) {
            return Err(PsmSeekError::ParseError {
                msg: format!(
                    "fraction_top_scores_to_fit must be within [0, 1], got {}",
                    self.fraction_top_scores_to_fit
                ),
            });
        }
        if !(self.pi_zero > 0.0 && self.pi_zero <= 1.0) {
            return Err(PsmSeekError::ParseError {
                msg: format!("pi_zero must be within (0, 1], got {}", self.pi_zero),
            });
        }
        if self.match_capacity == 0 {
            return Err(PsmSeekError::ParseError {
                msg: "match_capacity must be positive".to_string(),
            });
        }
        for (name, range) in [
            ("primary_shift_range", &self.primary_shift_range),
            ("preliminary_shift_range", &self.preliminary_shift_range),
        ] {
            if range.step <= 0.0 || range.min >= range.max {
                return Err(PsmSeekError::ParseError {
                    msg: format!("invalid {}: {:?}", name, range),
                });
            }
        }
        Ok(())
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let out: SearchParameters = serde_json::from_str(s)?;
        out.validate()?;
        Ok(out)
    }
}

/// Parses an inclusive scan range such as `"100-250"` or a single scan `"42"`.
pub fn parse_scan_range(s: &str) -> Result<(u32, u32)> {
    let re = Regex::new(r"^\s*(\d+)\s*(?:-\s*(\d+))?\s*$")?;
    let caps = re.captures(s).ok_or_else(|| PsmSeekError::ParseError {
        msg: format!("invalid scan range '{}', expected 'first-last'", s),
    })?;
    let first: u32 = caps[1].parse()?;
    let last: u32 = match caps.get(2) {
        Some(x) => x.as_str().parse()?,
        None => first,
    };
    if last < first {
        return Err(PsmSeekError::ParseError {
            msg: format!("invalid scan range '{}', last scan before first", s),
        });
    }
    Ok((first, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let params = SearchParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.decoy_prefix, "decoy_");
        assert_eq!(params.psms_per_spectrum_reported, 5);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let params =
            SearchParameters::from_json_str(r#"{"fraction_top_scores_to_fit": 0.4}"#).unwrap();
        assert_eq!(params.fraction_top_scores_to_fit, 0.4);
        assert_eq!(params.min_weibull_points, 40);
        assert_eq!(params.primary_shift_range, ShiftRange::PRIMARY);
    }

    #[test]
    fn test_rejects_bad_fraction() {
        assert!(SearchParameters::from_json_str(r#"{"fraction_top_scores_to_fit": 1.5}"#).is_err());
    }

    #[test]
    fn test_pi_zero_bounds() {
        assert_eq!(SearchParameters::default().pi_zero, 1.0);
        let params = SearchParameters::from_json_str(r#"{"pi_zero": 0.8}"#).unwrap();
        assert_eq!(params.pi_zero, 0.8);
        assert!(SearchParameters::from_json_str(r#"{"pi_zero": 0.0}"#).is_err());
        assert!(SearchParameters::from_json_str(r#"{"pi_zero": 1.2}"#).is_err());
    }

    #[test]
    fn test_shift_scan_is_exclusive_of_min() {
        let shifts: Vec<f64> = ShiftRange::PRIMARY.shifts().collect();
        assert_eq!(shifts.len(), 200);
        assert_eq!(shifts[0], 5.0);
        assert!(shifts.last().unwrap() > &-5.0);

        let sp: Vec<f64> = ShiftRange::PRELIMINARY.shifts().collect();
        assert_eq!(sp.len(), 80);
    }

    #[test]
    fn test_parse_scan_range() {
        assert_eq!(parse_scan_range("100-250").unwrap(), (100, 250));
        assert_eq!(parse_scan_range(" 42 ").unwrap(), (42, 42));
        assert!(parse_scan_range("250-100").is_err());
        assert!(parse_scan_range("abc").is_err());
    }
}
