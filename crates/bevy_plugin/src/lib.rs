/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/

//! This crate extends Helmsman with a plugin that streamlines its integration into an
//! existing Bevy application.
//!
//! The plugin handles the basic gruntwork - setting up the Resources, Observers and
//! fixed-step Systems of every Helmsman subsystem, in the right order.
//!
//! What's left for you to do after adding it in is spawning your entities, feeding
//! `ActionInputs` from your input layer, and calling `init_control_authority` once the
//! player exists.

mod plugin;

pub use plugin::HelmsmanPlugin;
