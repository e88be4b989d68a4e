//! Climate parameters sampled per column.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use worldgen_core::{ChunkPos, GenerationError};

use crate::noise::{NoiseKernel, NoiseLayer};
use crate::stage::Deadline;

/// Climate values are compared as integers at this resolution.
pub const QUANTIZATION: f64 = 10_000.0;

/// Stretch applied to raw layer output so climate covers more of [-1, 1].
const CLIMATE_SPREAD: f64 = 1.6;

/// The five climate dimensions, in classification order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateParameter {
    /// Hot vs cold.
    Temperature,
    /// Wet vs dry.
    Humidity,
    /// Ocean vs inland.
    Continentalness,
    /// Rugged vs flat.
    Erosion,
    /// Peaks and valleys variation.
    Weirdness,
}

impl ClimateParameter {
    /// All parameters in classification order.
    pub const ALL: [ClimateParameter; 5] = [
        ClimateParameter::Temperature,
        ClimateParameter::Humidity,
        ClimateParameter::Continentalness,
        ClimateParameter::Erosion,
        ClimateParameter::Weirdness,
    ];

    /// Position in [`ClimateParameter::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Noise layer backing this parameter.
    pub fn layer(self) -> NoiseLayer {
        match self {
            ClimateParameter::Temperature => NoiseLayer::Temperature,
            ClimateParameter::Humidity => NoiseLayer::Humidity,
            ClimateParameter::Continentalness => NoiseLayer::Continentalness,
            ClimateParameter::Erosion => NoiseLayer::Erosion,
            ClimateParameter::Weirdness => NoiseLayer::Weirdness,
        }
    }
}

/// Climate of one column. Every value lies in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClimateSample {
    pub temperature: f64,
    pub humidity: f64,
    pub continentalness: f64,
    pub erosion: f64,
    pub weirdness: f64,
}

impl ClimateSample {
    pub fn new(
        temperature: f64,
        humidity: f64,
        continentalness: f64,
        erosion: f64,
        weirdness: f64,
    ) -> Self {
        Self {
            temperature,
            humidity,
            continentalness,
            erosion,
            weirdness,
        }
    }

    /// Value of one parameter.
    pub fn get(&self, parameter: ClimateParameter) -> f64 {
        match parameter {
            ClimateParameter::Temperature => self.temperature,
            ClimateParameter::Humidity => self.humidity,
            ClimateParameter::Continentalness => self.continentalness,
            ClimateParameter::Erosion => self.erosion,
            ClimateParameter::Weirdness => self.weirdness,
        }
    }

    /// Values in [`ClimateParameter::ALL`] order.
    pub fn values(&self) -> [f64; 5] {
        ClimateParameter::ALL.map(|p| self.get(p))
    }

    /// Fixed-point view used for classification.
    ///
    /// Fails when any value is non-finite or outside [-1, 1].
    pub fn quantize(&self) -> Result<QuantizedClimate, GenerationError> {
        let mut out = [0i64; 5];
        for parameter in ClimateParameter::ALL {
            let value = self.get(parameter);
            if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                return Err(GenerationError::biome(format!(
                    "{parameter:?} value {value} is outside climate space [-1, 1]"
                )));
            }
            out[parameter.index()] = quantize(value);
        }
        Ok(QuantizedClimate(out))
    }
}

/// Quantize one climate coordinate.
pub fn quantize(value: f64) -> i64 {
    (value * QUANTIZATION) as i64
}

/// Climate vector at [`QUANTIZATION`] resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuantizedClimate(pub [i64; 5]);

/// Samples [`ClimateSample`]s from the climate noise layers.
#[derive(Clone)]
pub struct ClimateSampler {
    kernel: Arc<NoiseKernel>,
}

impl ClimateSampler {
    pub fn new(kernel: Arc<NoiseKernel>) -> Self {
        Self { kernel }
    }

    /// Climate of the column at block `(x, z)`.
    pub fn sample(&self, x: i64, z: i64) -> Result<ClimateSample, GenerationError> {
        let mut values = [0.0; 5];
        for parameter in ClimateParameter::ALL {
            let raw = self
                .kernel
                .sample_2d(parameter.layer(), x as f64, z as f64)?;
            values[parameter.index()] = (raw * CLIMATE_SPREAD).clamp(-1.0, 1.0);
        }
        let [temperature, humidity, continentalness, erosion, weirdness] = values;
        Ok(ClimateSample::new(
            temperature,
            humidity,
            continentalness,
            erosion,
            weirdness,
        ))
    }
}

/// Climate samples for a chunk plus a border of `pad` columns on every side.
///
/// The border covers neighbor columns without materializing neighbor chunks.
#[derive(Debug, Clone)]
pub struct ClimateGrid {
    pad: i32,
    side: i32,
    samples: Vec<ClimateSample>,
}

impl ClimateGrid {
    pub fn sample(
        sampler: &ClimateSampler,
        pos: ChunkPos,
        chunk_size: u32,
        pad: u32,
        deadline: &Deadline,
    ) -> Result<Self, GenerationError> {
        let pad = pad as i32;
        let side = chunk_size as i32 + 2 * pad;
        let (origin_x, origin_z) = pos.origin(chunk_size);
        let mut samples = Vec::with_capacity((side * side) as usize);
        for gz in 0..side {
            deadline.check()?;
            for gx in 0..side {
                let x = origin_x + i64::from(gx - pad);
                let z = origin_z + i64::from(gz - pad);
                samples.push(sampler.sample(x, z)?);
            }
        }
        Ok(Self { pad, side, samples })
    }

    /// Border width in columns.
    pub fn pad(&self) -> i32 {
        self.pad
    }

    /// Sample at chunk-local `(lx, lz)`; the border is reachable with
    /// coordinates down to `-pad` and up to `size - 1 + pad`.
    pub fn get(&self, lx: i32, lz: i32) -> Option<&ClimateSample> {
        let gx = lx + self.pad;
        let gz = lz + self.pad;
        if gx < 0 || gz < 0 || gx >= self.side || gz >= self.side {
            return None;
        }
        self.samples.get((gz * self.side + gx) as usize)
    }
}
