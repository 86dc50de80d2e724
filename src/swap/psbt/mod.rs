//! PSBT builders for the two halves of a swap, plus their recombination.

pub mod list;
pub mod merge;
pub mod purchase;
