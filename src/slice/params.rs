//! Per-class generation and queueing parameters.

use serde::{Deserialize, Serialize};

use super::class::SliceType;
use super::error::SliceError;
use crate::queue::QueueLimit;

/// Per-application rates drawn from a class range are clamped into this window (Mbps).
pub const MIN_APP_RATE_MBPS: f64 = 0.1;
pub const MAX_APP_RATE_MBPS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassParams {
    pub min_rate_mbps: f64,
    pub max_rate_mbps: f64,
    pub min_packet_bytes: u32,
    pub max_packet_bytes: u32,
    pub queue_limit: QueueLimit,
    pub weight: u32,
}

impl ClassParams {
    pub fn defaults_for(class: SliceType) -> Self {
        match class {
            SliceType::Urllc => Self {
                min_rate_mbps: 1.0,
                max_rate_mbps: 10.0,
                min_packet_bytes: 20,
                max_packet_bytes: 250,
                queue_limit: QueueLimit::Bytes(25_000),
                weight: 80,
            },
            SliceType::Embb => Self {
                min_rate_mbps: 10.0,
                max_rate_mbps: 100.0,
                min_packet_bytes: 100,
                max_packet_bytes: 1500,
                queue_limit: QueueLimit::Bytes(300_000),
                weight: 15,
            },
            SliceType::Mmtc => Self {
                min_rate_mbps: 0.1,
                max_rate_mbps: 1.0,
                min_packet_bytes: 20,
                max_packet_bytes: 100,
                queue_limit: QueueLimit::Bytes(20_000),
                weight: 5,
            },
        }
    }

    pub fn validate(&self, class: SliceType) -> Result<(), SliceError> {
        let rates_ok = self.min_rate_mbps.is_finite()
            && self.max_rate_mbps.is_finite()
            && self.min_rate_mbps > 0.0
            && self.min_rate_mbps <= self.max_rate_mbps;
        if !rates_ok {
            return Err(SliceError::InvalidRateRange {
                class,
                min: self.min_rate_mbps,
                max: self.max_rate_mbps,
            });
        }
        if self.min_packet_bytes == 0 || self.min_packet_bytes > self.max_packet_bytes {
            return Err(SliceError::InvalidPacketSizeRange {
                class,
                min: self.min_packet_bytes,
                max: self.max_packet_bytes,
            });
        }
        Ok(())
    }
}

/// One `ClassParams` per slice type.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassParamsTable {
    params: [ClassParams; SliceType::COUNT],
}

impl Default for ClassParamsTable {
    fn default() -> Self {
        Self {
            params: SliceType::ALL.map(ClassParams::defaults_for),
        }
    }
}

impl ClassParamsTable {
    pub fn get(&self, class: SliceType) -> &ClassParams {
        &self.params[class.index()]
    }

    pub fn set(&mut self, class: SliceType, params: ClassParams) {
        self.params[class.index()] = params;
    }

    pub fn set_weight(&mut self, class: SliceType, weight: u32) {
        self.params[class.index()].weight = weight;
    }

    pub fn weights(&self) -> [(SliceType, u32); SliceType::COUNT] {
        SliceType::ALL.map(|t| (t, self.get(t).weight))
    }

    pub fn validate(&self) -> Result<(), SliceError> {
        for t in SliceType::ALL {
            self.get(t).validate(t)?;
        }
        Ok(())
    }
}
