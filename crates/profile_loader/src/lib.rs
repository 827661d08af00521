/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/

//! This crate extends Helmsman with asset loaders for its authoring-time records,
//! `MotionProfile`s and `ControlBindings`, from any available Bevy
//! [`AssetSource`](https://docs.rs/bevy/latest/bevy/asset/io/struct.AssetSource.html).
//!
//! Each file format is a `ProfileLoaderBackend` behind its own cargo feature
//! (`json_support`, `ron_support`, `yaml_support`, ...). Add one `ProfileAssetPlugin<T, B>`
//! per record type and format you want to load, then trigger a `LoadProfileRequest<T>`.

mod loader;

pub use loader::*;
