//! Fee Estimation
//!
//! Fixed per-input/per-output size approximations for the only shapes this
//! tool ever builds: key-path taproot inputs and one standard output. These
//! are not exact weight-unit computations.

/// Approximate vbytes per key-path taproot input
pub const INPUT_UNIT_SIZE: u64 = 106;

/// Approximate vbytes per output
pub const OUTPUT_UNIT_SIZE: u64 = 42;

/// Version, locktime, counts and segwit marker
pub const FIXED_OVERHEAD: u64 = 10;

/// Default fee rate (sats/vbyte)
pub const DEFAULT_FEE_RATE: f64 = 1.0;

/// Estimated transaction size in vbytes
pub fn estimate_size(input_count: usize, output_count: usize) -> u64 {
    input_count as u64 * INPUT_UNIT_SIZE + output_count as u64 * OUTPUT_UNIT_SIZE + FIXED_OVERHEAD
}

/// Fee in satoshis, truncated toward zero
///
/// The rate is not validated here. A negative or NaN rate produces 0.
pub fn estimate_fee(input_count: usize, output_count: usize, fee_rate: f64) -> u64 {
    let size = estimate_size(input_count, output_count);
    (size as f64 * fee_rate).trunc() as u64
}
