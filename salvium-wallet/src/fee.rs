//! Fee estimation.
//!
//! The fee is affine in serialized transaction weight with a priority
//! multiplier, quantized up to the protocol mask:
//!
//! ```text
//! fee = ceil(weight * fee_per_byte * multiplier / mask) * mask
//! ```

use serde::{Deserialize, Serialize};

use salvium_common::consts::{FEE_PER_BYTE, FEE_QUANTIZATION_MASK, RING_SIZE};

/// Fee priority levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeePriority {
    /// Lowest multiplier; may wait several blocks.
    #[default]
    Default,
    /// Standard next-few-blocks confirmation.
    Normal,
    /// Near-head-of-queue inclusion.
    High,
}

impl FeePriority {
    /// Fee multiplier for this priority level.
    pub fn multiplier(&self) -> u64 {
        match self {
            FeePriority::Default => 1,
            FeePriority::Normal => 4,
            FeePriority::High => 20,
        }
    }
}

impl std::str::FromStr for FeePriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "default" | "low" => Ok(FeePriority::Default),
            "normal" | "medium" => Ok(FeePriority::Normal),
            "high" | "urgent" => Ok(FeePriority::High),
            _ => Err(format!("Unknown priority: {s}. Valid: default, normal, high")),
        }
    }
}

/// Weight model constants, calibrated against serialized transactions.
const TX_BASE_WEIGHT: usize = 340;
const INPUT_WEIGHT_PER_RING_MEMBER: usize = 70;
const INPUT_BASE_WEIGHT: usize = 120;
const OUTPUT_WEIGHT: usize = 180;
const RANGE_PROOF_BASE_WEIGHT: usize = 576;
const RANGE_PROOF_PER_OUTPUT_WEIGHT: usize = 90;

/// Stateless fee estimator.
#[derive(Debug, Clone)]
pub struct FeeEstimator {
    fee_per_byte: u64,
    quantization_mask: u64,
}

impl Default for FeeEstimator {
    fn default() -> Self {
        FeeEstimator {
            fee_per_byte: FEE_PER_BYTE,
            quantization_mask: FEE_QUANTIZATION_MASK,
        }
    }
}

impl FeeEstimator {
    pub fn new(fee_per_byte: u64, quantization_mask: u64) -> Self {
        FeeEstimator {
            fee_per_byte,
            quantization_mask,
        }
    }

    /// Estimate the serialized weight of a transaction.
    pub fn estimate_weight(&self, num_inputs: usize, num_outputs: usize) -> usize {
        TX_BASE_WEIGHT
            + num_inputs * (INPUT_BASE_WEIGHT + RING_SIZE * INPUT_WEIGHT_PER_RING_MEMBER)
            + num_outputs * OUTPUT_WEIGHT
            + RANGE_PROOF_BASE_WEIGHT
            + num_outputs * RANGE_PROOF_PER_OUTPUT_WEIGHT
    }

    /// Fee for a known weight.
    pub fn fee_for_weight(&self, weight: usize, priority: FeePriority) -> u64 {
        let raw = weight as u64 * self.fee_per_byte * priority.multiplier();
        quantize(raw, self.quantization_mask)
    }

    /// Fee from input/output counts (the builder's estimation loop).
    pub fn estimate_fee(
        &self,
        num_inputs: usize,
        num_outputs: usize,
        priority: FeePriority,
    ) -> u64 {
        self.fee_for_weight(self.estimate_weight(num_inputs, num_outputs), priority)
    }
}

fn quantize(fee: u64, mask: u64) -> u64 {
    if mask == 0 {
        return fee;
    }
    fee.div_ceil(mask) * mask
}
