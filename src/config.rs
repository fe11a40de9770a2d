use std::path::Path;

use serde::{Deserialize, Serialize};
use vek::Vec2;

use crate::{
    error::{ConfigError, RopeError},
    physics::Classification,
};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RopeConfig {
    pub segment_count: usize,
    pub rest_length: f32,
    /// Seconds a detached piece without the payload lives. `<= 0` keeps it forever.
    pub detached_lifetime: f32,
    /// Layer mask given to every segment body and used to filter slice queries.
    pub rope_layer: u32,
    pub axis: Vec2<f32>,
}

impl Default for RopeConfig {
    fn default() -> Self {
        Self {
            segment_count: 15,
            rest_length: 0.2,
            detached_lifetime: 5.0,
            rope_layer: 1 << 3,
            axis: Vec2::new(0.0, -1.0),
        }
    }
}

impl RopeConfig {
    pub fn classification(&self) -> Classification {
        Classification(self.rope_layer)
    }

    pub fn validate(&self) -> Result<(), RopeError> {
        if self.segment_count == 0 {
            return Err(invalid("segment_count must be positive"));
        }
        if !(self.rest_length.is_finite() && self.rest_length > 0.0) {
            return Err(invalid(format!(
                "rest_length must be a positive number, got {}",
                self.rest_length
            )));
        }
        if self.rope_layer == 0 {
            // Segments on no layer could never be sliced
            return Err(invalid("rope_layer must have at least one bit set"));
        }
        if !self.detached_lifetime.is_finite() {
            return Err(invalid("detached_lifetime must be finite"));
        }
        if !(self.axis.x.is_finite() && self.axis.y.is_finite())
            || self.axis.magnitude_squared() == 0.0
        {
            return Err(invalid("axis must be a finite non-zero vector"));
        }
        Ok(())
    }

    pub fn direction(&self) -> Vec2<f32> {
        self.axis.normalized()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub gravity: Vec2<f32>,
    /// Fraction of velocity lost per step, in `0..1`.
    pub drag: f32,
    pub iterations: u32,
    /// Collision radius of every body for line queries.
    pub body_radius: f32,
    pub max_bodies: Option<usize>,
    pub max_links: Option<usize>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.81),
            drag: 0.01,
            iterations: 12,
            body_radius: 0.08,
            max_bodies: None,
            max_links: None,
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> Result<(), RopeError> {
        if self.iterations == 0 {
            return Err(invalid("iterations must be positive"));
        }
        if !(0.0..1.0).contains(&self.drag) {
            return Err(invalid(format!("drag must be in 0..1, got {}", self.drag)));
        }
        if !(self.body_radius.is_finite() && self.body_radius > 0.0) {
            return Err(invalid("body_radius must be a positive number"));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rope: RopeConfig,
    pub world: WorldConfig,
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), RopeError> {
        self.rope.validate()?;
        self.world.validate()
    }
}

fn invalid(msg: impl Into<String>) -> RopeError {
    RopeError::InvalidConfiguration(msg.into())
}
