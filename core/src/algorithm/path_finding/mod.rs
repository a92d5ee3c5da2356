//! Augmenting path search over residual networks
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

pub mod bfs;

pub use self::bfs::{AugmentingPathFinder, PathSearch};
