//! # forestmgmt parallel
//!
//! Parallel processing strategies for region analysis.
//!
//! This crate provides:
//! - Tiled processing so large regions are rasterized in independent blocks
//! - Processing modes controlling how many regions run concurrently

pub mod strategy;
pub mod tiled;

pub use strategy::{ParallelStrategy, ProcessingMode};
pub use tiled::{Tile, TileIterator, TiledProcessor};
