// src/config.rs

use crate::error::ConfigError;

// Default audio configuration
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_BLOCK_LEN: usize = 512;
pub const DEFAULT_NOTE_QUEUE_CAPACITY: usize = 1024;
pub const DEFAULT_PARAM_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_MAX_CONSECUTIVE_FAULTS: u32 = 8;

/// Configuration shared by the tree's queues and the render loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Sample rate used by `RenderLoop::start`
    pub sample_rate: u32,
    /// Frames rendered per `advance()`
    pub block_len: usize,
    /// Note events that can wait between two blocks
    pub note_queue_capacity: usize,
    /// Parameter writes that can wait between two blocks
    pub param_queue_capacity: usize,
    /// Faulty blocks in a row before the loop stops
    pub max_consecutive_faults: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_len: DEFAULT_BLOCK_LEN,
            note_queue_capacity: DEFAULT_NOTE_QUEUE_CAPACITY,
            param_queue_capacity: DEFAULT_PARAM_QUEUE_CAPACITY,
            max_consecutive_faults: DEFAULT_MAX_CONSECUTIVE_FAULTS,
        }
    }
}

impl EngineConfig {
    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn block_len(mut self, frames: usize) -> Self {
        self.block_len = frames;
        self
    }

    pub fn note_queue_capacity(mut self, capacity: usize) -> Self {
        self.note_queue_capacity = capacity;
        self
    }

    pub fn param_queue_capacity(mut self, capacity: usize) -> Self {
        self.param_queue_capacity = capacity;
        self
    }

    pub fn max_consecutive_faults(mut self, faults: u32) -> Self {
        self.max_consecutive_faults = faults;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate(self.sample_rate));
        }
        if self.block_len == 0 {
            return Err(ConfigError::ZeroBlockLength);
        }
        if self.note_queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity { name: "note queue" });
        }
        if self.param_queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                name: "parameter queue",
            });
        }
        if self.max_consecutive_faults == 0 {
            return Err(ConfigError::ZeroFaultLimit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_zeroes() {
        let base = EngineConfig::default();
        assert_eq!(
            base.block_len(0).validate(),
            Err(ConfigError::ZeroBlockLength)
        );
        assert_eq!(
            base.sample_rate(0).validate(),
            Err(ConfigError::InvalidSampleRate(0))
        );
        assert!(matches!(
            base.note_queue_capacity(0).validate(),
            Err(ConfigError::ZeroCapacity { .. })
        ));
        assert_eq!(
            base.max_consecutive_faults(0).validate(),
            Err(ConfigError::ZeroFaultLimit)
        );
    }
}
