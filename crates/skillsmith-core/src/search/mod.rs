//! Rank fusion primitives shared by the search engine's hybrid path (C7).

pub mod fusion;

pub use fusion::{reciprocal_rank_fusion, weighted_sum_fusion, FusionMethod};
