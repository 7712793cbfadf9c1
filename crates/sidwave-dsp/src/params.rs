//! Combined-waveform model parameters and the multiplicative perturbation
//! used by the search.
//!
//! The text form (`name = value`, one per line) is what the fitting tool
//! prints for every accepted improvement and what it reads back as a seed.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

use crate::error::FitError;

/// Upper bound on `st_mix`, re-applied after every perturbation.
pub const ST_MIX_MAX: f32 = 1.0;

/// One candidate analog model for the shared waveform bus.
///
/// No field other than `st_mix` is bounded. Repeated perturbation can push
/// any of them to extreme magnitudes; the score is left to penalise that.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParameterSet {
    /// Threshold a mixed bus line must exceed to read as 1.
    pub bias: f32,
    /// Level the pulse output drives onto its virtual bus line.
    pub pulse_strength: f32,
    /// Coupling of accumulator bit 11 onto the bus.
    pub top_bit: f32,
    /// Falloff of the inverse-quadratic coupling between bus lines.
    pub distance: f32,
    /// Sawtooth/triangle blend weight (clamped to <= 1).
    pub st_mix: f32,
}

const FIELD_NAMES: [&str; 5] = ["bias", "pulse_strength", "top_bit", "distance", "st_mix"];

/// Map a uniform draw to a scale factor symmetric in log space around 1.
///
/// `t = 1 - u/2` lies in (0.5, 1] for `u` in [0, 1); `invert` returns `1/t`
/// instead, in [1, 2). The arithmetic is done in f64 so `t` never rounds
/// down onto 0.5 for the largest f32 draw.
pub fn scale_factor(u: f32, invert: bool) -> f64 {
    let t = 1.0 - u as f64 * 0.5;
    if invert { 1.0 / t } else { t }
}

/// Draw one scale factor from `rng`.
pub fn draw_scale_factor<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u: f32 = rng.r#gen();
    scale_factor(u, rng.gen_bool(0.5))
}

fn scaled<R: Rng + ?Sized>(value: f32, rng: &mut R) -> f32 {
    (value as f64 * draw_scale_factor(rng)) as f32
}

impl ParameterSet {
    pub fn new(bias: f32, pulse_strength: f32, top_bit: f32, distance: f32, st_mix: f32) -> Self {
        Self {
            bias,
            pulse_strength,
            top_bit,
            distance,
            st_mix,
        }
    }

    /// New candidate: every field scaled by its own factor, `st_mix` re-clamped.
    pub fn perturb<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let bias = scaled(self.bias, rng);
        let pulse_strength = scaled(self.pulse_strength, rng);
        let top_bit = scaled(self.top_bit, rng);
        let distance = scaled(self.distance, rng);
        let st_mix = scaled(self.st_mix, rng).min(ST_MIX_MAX);
        Self {
            bias,
            pulse_strength,
            top_bit,
            distance,
            st_mix,
        }
    }

    fn fields(&self) -> [f32; 5] {
        [
            self.bias,
            self.pulse_strength,
            self.top_bit,
            self.distance,
            self.st_mix,
        ]
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut f32> {
        match name {
            "bias" => Some(&mut self.bias),
            "pulse_strength" | "pulsestrength" => Some(&mut self.pulse_strength),
            "top_bit" | "topbit" => Some(&mut self.top_bit),
            "distance" => Some(&mut self.distance),
            "st_mix" | "stmix" => Some(&mut self.st_mix),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in FIELD_NAMES.iter().zip(self.fields()) {
            writeln!(f, "{name} = {value:?}")?;
        }
        Ok(())
    }
}

impl FromStr for ParameterSet {
    type Err = FitError;

    /// Parse `name = value` lines. Blank lines and `//` comments are skipped;
    /// absent fields stay zero. Also accepts the emulator-source spelling
    /// `bestparams.bias = 0.93f;`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut params = ParameterSet::default();
        for (idx, raw) in s.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| FitError::malformed(line_no, format!("expected `name = value`, got `{line}`")))?;
            let key = key.trim();
            let key = key.strip_prefix("bestparams.").unwrap_or(key);
            let value = value.trim().trim_end_matches(';').trim();
            // Drop a float-literal suffix (`0.93f`) but leave `inf` intact.
            let value = match value.strip_suffix('f') {
                Some(num) if num.ends_with(|c: char| c.is_ascii_digit() || c == '.') => num,
                _ => value,
            };

            let slot = params
                .field_mut(key)
                .ok_or_else(|| FitError::malformed(line_no, format!("unknown parameter `{key}`")))?;
            *slot = value
                .parse()
                .map_err(|_| FitError::malformed(line_no, format!("`{value}` is not a number")))?;
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_scale_factor_bounds_at_extremes() {
        let largest_below_one = 1.0f32 - f32::EPSILON / 2.0;
        for u in [0.0f32, 0.25, 0.5, 0.999, largest_below_one] {
            for invert in [false, true] {
                let f = scale_factor(u, invert);
                assert!(f > 0.5 && f <= 2.0, "u={u} invert={invert}: factor {f} out of (0.5, 2]");
            }
        }
        assert_eq!(scale_factor(0.0, false), 1.0);
        assert_eq!(scale_factor(0.0, true), 1.0);
    }

    #[test]
    fn test_scale_factor_log_symmetric() {
        let shrink = scale_factor(0.6, false);
        let grow = scale_factor(0.6, true);
        assert!((shrink.ln() + grow.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_drawn_factors_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100_000 {
            let f = draw_scale_factor(&mut rng);
            assert!(f > 0.5 && f <= 2.0, "factor {f} out of range");
        }
    }

    #[test]
    fn test_st_mix_never_exceeds_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut p = ParameterSet::new(0.9, 1.0, 0.5, 0.1, 1.0);
        for step in 0..10_000 {
            p = p.perturb(&mut rng);
            assert!(p.st_mix <= ST_MIX_MAX, "step {step}: st_mix = {}", p.st_mix);
        }
    }

    #[test]
    fn test_perturb_leaves_source_untouched() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let p = ParameterSet::new(0.9, 2.0, 0.5, 0.03, 0.4);
        let copy = p;
        let q = p.perturb(&mut rng);
        assert_eq!(p, copy);
        assert_ne!(p, q);
    }

    #[test]
    fn test_zero_is_a_fixed_point() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let zero = ParameterSet::default();
        assert_eq!(zero.perturb(&mut rng), zero);
    }

    #[test]
    fn test_sign_is_preserved() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut p = ParameterSet::new(-0.5, 1.0, -2.0, 0.2, -0.3);
        for _ in 0..200 {
            p = p.perturb(&mut rng);
        }
        assert!(p.bias < 0.0 && p.top_bit < 0.0 && p.st_mix < 0.0);
        assert!(p.pulse_strength > 0.0 && p.distance > 0.0);
    }

    #[test]
    fn test_text_form_is_lossless() {
        let p = ParameterSet::new(0.9347278, 0.0, 1.680824, 0.03339716, 0.5655234);
        let text = p.to_string();
        assert!(text.contains("bias = 0.9347278"), "unexpected text: {text}");
        assert_eq!(text.parse::<ParameterSet>().unwrap(), p);
    }

    #[test]
    fn test_parses_emulator_source_form() {
        let text = "// current score 44\n\
                    bestparams.bias = 0.9266459f;\n\
                    bestparams.pulsestrength = 0.7393153f;\n\
                    bestparams.topbit = 0f;\n\
                    bestparams.distance = 0.0598464f;\n\
                    bestparams.stmix = 0.1851717f;\n";
        let p: ParameterSet = text.parse().unwrap();
        assert_eq!(p, ParameterSet::new(0.9266459, 0.7393153, 0.0, 0.0598464, 0.1851717));
    }

    #[test]
    fn test_drifted_infinities_roundtrip() {
        let p = ParameterSet::new(0.9, f32::INFINITY, 0.0, f32::NEG_INFINITY, 0.5);
        let text = p.to_string();
        assert!(text.contains("pulse_strength = inf"), "unexpected text: {text}");
        assert_eq!(text.parse::<ParameterSet>().unwrap(), p);
        assert_eq!("bias = 2.f;".parse::<ParameterSet>().unwrap().bias, 2.0);
    }

    #[test]
    fn test_missing_fields_default_to_zero() {
        let p: ParameterSet = "bias = 1.0\n".parse().unwrap();
        assert_eq!(p, ParameterSet::new(1.0, 0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_rejects_unknown_key_and_bad_value() {
        match "bias = 1.0\ngain = 2".parse::<ParameterSet>() {
            Err(FitError::MalformedInput { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed input, got {other:?}"),
        }
        assert!("bias = abc".parse::<ParameterSet>().is_err());
        assert!("bias 1.0".parse::<ParameterSet>().is_err());
    }
}
