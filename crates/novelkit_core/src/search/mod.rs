//! Text search over manuscript content.
//!
//! # Responsibility
//! - Count character/world-item name mentions across scenes.
//! - Keep result shaping (per-chapter buckets) inside core.

pub mod mentions;
