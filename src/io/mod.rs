// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh file input and output

mod stl;

pub use stl::{load_stl, read_stl, save_stl, write_stl};
