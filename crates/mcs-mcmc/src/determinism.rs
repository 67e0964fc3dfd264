use mcs_core::derive_substream_seed;

/// Derives the seed of chain `chain_index` forked from a parent at `iteration`.
///
/// The parent iteration is mixed in first so forks taken at different points
/// of one run never share a stream.
pub fn chain_seed(master_seed: u64, chain_index: usize, iteration: u64) -> u64 {
    let intermediate = derive_substream_seed(master_seed ^ 0xA5A5_A5A5_A5A5_A5A5, iteration);
    derive_substream_seed(intermediate, chain_index as u64)
}
