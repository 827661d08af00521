/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
#![doc = include_str!("../README.md")]

pub use helmsman_core::*;

#[cfg(feature = "bevy_plugin")]
pub use helmsman_bevy_plugin::HelmsmanPlugin;

#[cfg(feature = "profile_loader")]
pub use helmsman_profile_loader as profile_loader;

#[cfg(feature = "testing")]
pub use helmsman_test_plugin as testing;

pub mod prelude {
    pub use helmsman_core::prelude::*;
    pub use helmsman_core::authority::{init_control_authority, mount_vehicle, dismount_vehicle, set_active_controller};

    #[cfg(feature = "bevy_plugin")]
    pub use helmsman_bevy_plugin::HelmsmanPlugin;

    #[cfg(feature = "profile_loader")]
    pub use helmsman_profile_loader::{LoadProfileRequest, ProfileAssetPlugin, ProfileLoaded, ProfileLoadingTimeout};
}
