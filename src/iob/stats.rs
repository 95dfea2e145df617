// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Counters collected while splitting and classifying

use serde::{Deserialize, Serialize};

/// Splits performed, by case
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitCounts {
    pub edge_in_two: usize,
    pub edge_in_three: usize,
    pub corner_cut: usize,
    pub vertex_fan: usize,
    pub edge_interior: usize,
    pub five_way: usize,
}

impl SplitCounts {
    pub fn total(&self) -> usize {
        self.edge_in_two
            + self.edge_in_three
            + self.corner_cut
            + self.vertex_fan
            + self.edge_interior
            + self.five_way
    }

    fn merge(&mut self, other: &SplitCounts) {
        self.edge_in_two += other.edge_in_two;
        self.edge_in_three += other.edge_in_three;
        self.corner_cut += other.corner_cut;
        self.vertex_fan += other.vertex_fan;
        self.edge_interior += other.edge_interior;
        self.five_way += other.five_way;
    }
}

/// Progress and diagnostic counters for one boolean operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsgStats {
    pub input_faces: usize,
    pub pair_tests: usize,
    pub bound_rejections: usize,
    pub parallel_rays: usize,
    pub splits: SplitCounts,
    pub degenerate_dropped: usize,
    pub unsplit_removed: usize,
    pub unsplit_kept: usize,
    pub simple_classified: usize,
    pub ray_traced: usize,
    pub ray_retries: usize,
    pub indeterminate: usize,
    pub output_triangles: usize,
    pub output_vertices: usize,
    pub elapsed_ms: f64,
}

impl CsgStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the counters of another operand or operation
    pub fn merge(&mut self, other: &CsgStats) {
        self.input_faces += other.input_faces;
        self.pair_tests += other.pair_tests;
        self.bound_rejections += other.bound_rejections;
        self.parallel_rays += other.parallel_rays;
        self.splits.merge(&other.splits);
        self.degenerate_dropped += other.degenerate_dropped;
        self.unsplit_removed += other.unsplit_removed;
        self.unsplit_kept += other.unsplit_kept;
        self.simple_classified += other.simple_classified;
        self.ray_traced += other.ray_traced;
        self.ray_retries += other.ray_retries;
        self.indeterminate += other.indeterminate;
        self.output_triangles += other.output_triangles;
        self.output_vertices += other.output_vertices;
        self.elapsed_ms += other.elapsed_ms;
    }

    pub fn print_summary(&self) {
        println!("Input faces:       {}", self.input_faces);
        println!(
            "Pair tests:        {} ({} rejected by bounds)",
            self.pair_tests, self.bound_rejections
        );
        println!("Splits:            {}", self.splits.total());
        println!(
            "Classified:        {} simple, {} ray traced ({} retries)",
            self.simple_classified, self.ray_traced, self.ray_retries
        );
        if self.degenerate_dropped > 0 || self.indeterminate > 0 {
            println!(
                "Dropped:           {} degenerate, {} indeterminate",
                self.degenerate_dropped, self.indeterminate
            );
        }
        println!("Output triangles:  {}", self.output_triangles);
        println!("Time:              {:.2}ms", self.elapsed_ms);
    }
}
