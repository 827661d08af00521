/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
//! This crate extends Helmsman with a plugin used to standardize testing the library itself.
//!
//! Tests drive the fixed-step schedule by hand with `step_fixed`, script input with
//! `press`/`hold`/`release`, and inspect what happened through the `EventLog`.

mod helpers;
mod plugin;

pub use helpers::*;
pub use plugin::HelmsmanTestPlugin;
