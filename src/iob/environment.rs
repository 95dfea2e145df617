// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Numeric tolerances and operating mode for boolean operations

use super::CsgError;
use anyhow::{Context, Result};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default file read by [`Environment::load`]
pub const CONFIG_FILE: &str = "iob.toml";

/// Tolerances and flags threaded through every geometry routine.
///
/// Built once per operation (or shared as the default) and never mutated by the
/// engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Full double precision; when false imported coordinates are rounded through f32
    pub double_precision: bool,
    /// Scalars below this are treated as zero
    pub near_zero: f64,
    /// Positions closer than this are the same point
    pub between_points: f64,
    /// Points closer than this to a plane lie on it
    pub on_plane: f64,
    /// Coordinates larger than this are rejected
    pub max_point_magnitude: f64,
    /// Components more than this many decimal orders below the largest one snap to zero
    pub magnitude_range: i32,
    /// Drop faces whose split produced no valid piece instead of keeping them
    pub remove_unsplit_face: bool,
    /// Split ceiling per pass, as a multiple of the combined face count
    pub split_limit_factor: usize,
    /// Ray perturbations allowed before a face is left unclassified
    pub max_ray_retries: usize,
    /// Magnitude of the random offset added to a perturbed ray direction
    pub ray_perturbation: f64,
    /// Seed for ray perturbation
    pub random_seed: u64,
    /// Log every recovered problem at warn level
    pub debug: bool,
    /// Reject non-finite input coordinates up front
    pub validate_input: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            double_precision: true,
            near_zero: 1e-10,
            between_points: 1e-7,
            on_plane: 1e-7,
            max_point_magnitude: 1e7,
            magnitude_range: 12,
            remove_unsplit_face: false,
            split_limit_factor: 20,
            max_ray_retries: 8,
            ray_perturbation: 1e-5,
            random_seed: 0x10b5_eed,
            debug: false,
            validate_input: true,
        }
    }
}

impl Environment {
    /// Preset for meshes whose coordinates originate from single precision buffers
    pub fn float_compatible() -> Self {
        Self {
            double_precision: false,
            near_zero: 1e-6,
            between_points: 1e-5,
            on_plane: 1e-5,
            max_point_magnitude: 1e5,
            magnitude_range: 6,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CsgError> {
        let tolerances = [
            ("near_zero", self.near_zero),
            ("between_points", self.between_points),
            ("on_plane", self.on_plane),
            ("max_point_magnitude", self.max_point_magnitude),
            ("ray_perturbation", self.ray_perturbation),
        ];
        for (name, value) in tolerances {
            if !value.is_finite() || value <= 0.0 {
                return Err(CsgError::invalid_geometry(format!(
                    "environment {} must be positive and finite, got {}",
                    name, value
                )));
            }
        }
        if self.magnitude_range <= 0 {
            return Err(CsgError::invalid_geometry(format!(
                "environment magnitude_range must be positive, got {}",
                self.magnitude_range
            )));
        }
        if self.split_limit_factor == 0 {
            return Err(CsgError::invalid_geometry(
                "environment split_limit_factor must be at least 1",
            ));
        }
        Ok(())
    }

    /// Load an environment from a TOML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let env: Environment = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        env.validate()
            .with_context(|| format!("Invalid environment in {:?}", path.as_ref()))?;
        Ok(env)
    }

    /// Load `iob.toml` from the working directory if present, then apply
    /// `IOB_*` environment variable overrides
    pub fn load() -> Result<Self> {
        let mut env = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };

        env.apply_overrides(|key| std::env::var(key).ok())?;
        env.validate()?;
        Ok(env)
    }

    /// Apply `IOB_*` overrides looked up through `var`
    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = var("IOB_NEAR_ZERO") {
            self.near_zero = value.parse().context("IOB_NEAR_ZERO is not a number")?;
        }
        if let Some(value) = var("IOB_BETWEEN_POINTS") {
            self.between_points = value
                .parse()
                .context("IOB_BETWEEN_POINTS is not a number")?;
        }
        if let Some(value) = var("IOB_ON_PLANE") {
            self.on_plane = value.parse().context("IOB_ON_PLANE is not a number")?;
        }
        if let Some(value) = var("IOB_DEBUG") {
            self.debug = value
                .parse()
                .context("IOB_DEBUG is not `true` or `false`")?;
        }
        if let Some(value) = var("IOB_SEED") {
            self.random_seed = value.parse().context("IOB_SEED is not an integer")?;
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize environment")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn is_zero(&self, value: f64) -> bool {
        value.abs() < self.near_zero
    }

    pub fn same_point(&self, a: &Point3<f64>, b: &Point3<f64>) -> bool {
        (a - b).norm_squared() < self.between_points * self.between_points
    }

    /// Round a coordinate according to the precision mode
    pub fn round(&self, point: Point3<f64>) -> Point3<f64> {
        if self.double_precision {
            point
        } else {
            point.map(|c| c as f32 as f64)
        }
    }

    /// Snap negligible components to zero. Returns `None` for non-finite points
    /// and points beyond `max_point_magnitude`.
    pub fn rationalize(&self, point: Point3<f64>) -> Option<Point3<f64>> {
        if point.coords.iter().any(|c| !c.is_finite()) {
            return None;
        }
        let largest = point.coords.amax();
        if largest > self.max_point_magnitude {
            return None;
        }
        let floor = (largest * 10f64.powi(-self.magnitude_range)).max(self.near_zero);
        Some(point.map(|c| if c.abs() < floor { 0.0 } else { c }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(Environment::default().validate().is_ok());
        assert!(Environment::float_compatible().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        let env = Environment {
            on_plane: 0.0,
            ..Environment::default()
        };
        assert!(matches!(env.validate(), Err(CsgError::InvalidGeometry { .. })));

        let env = Environment {
            near_zero: f64::NAN,
            ..Environment::default()
        };
        assert!(env.validate().is_err());
    }

    #[test]
    fn test_rationalize() {
        let env = Environment::default();
        let p = env
            .rationalize(Point3::new(1000.0, 1e-11, -3.5))
            .unwrap();
        assert_eq!(p, Point3::new(1000.0, 0.0, -3.5));

        // Twelve orders below the largest component
        let p = env.rationalize(Point3::new(1e6, 1e-7, 0.0)).unwrap();
        assert_eq!(p.y, 0.0);

        assert!(env.rationalize(Point3::new(1e8, 0.0, 0.0)).is_none());
        assert!(env.rationalize(Point3::new(f64::INFINITY, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_float_rounding() {
        let env = Environment::float_compatible();
        let p = env.round(Point3::new(0.1, 0.2, 0.3));
        assert_eq!(p.x, 0.1f32 as f64);
        assert_eq!(Environment::default().round(Point3::new(0.1, 0.2, 0.3)).x, 0.1);
    }

    #[test]
    fn test_toml_partial_keys() {
        let env: Environment = toml::from_str("on_plane = 1e-5\nremove_unsplit_face = true\n").unwrap();
        assert_eq!(env.on_plane, 1e-5);
        assert!(env.remove_unsplit_face);
        assert_eq!(env.near_zero, Environment::default().near_zero);
    }

    #[test]
    fn test_overrides() {
        let vars = |key: &str| match key {
            "IOB_ON_PLANE" => Some("1e-6".to_string()),
            "IOB_DEBUG" => Some("true".to_string()),
            "IOB_SEED" => Some("7".to_string()),
            _ => None,
        };
        let mut env = Environment::default();
        env.apply_overrides(vars).unwrap();
        assert_eq!(env.on_plane, 1e-6);
        assert!(env.debug);
        assert_eq!(env.random_seed, 7);
        assert_eq!(env.near_zero, Environment::default().near_zero);
    }

    #[test]
    fn test_malformed_overrides_are_errors() {
        for key in ["IOB_DEBUG", "IOB_NEAR_ZERO", "IOB_SEED"] {
            let mut env = Environment::default();
            let result = env.apply_overrides(|k| (k == key).then(|| "yes please".to_string()));
            let err = result.unwrap_err();
            assert!(err.to_string().contains(key));
        }
    }

    #[test]
    fn test_is_zero() {
        let env = Environment::default();
        assert!(env.is_zero(1e-12));
        assert!(env.is_zero(-1e-11));
        assert!(!env.is_zero(1e-9));
    }
}
