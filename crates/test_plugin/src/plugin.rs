/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
use bevy::{app::ScheduleRunnerPlugin, prelude::*};

use crate::helpers::*;


pub struct HelmsmanTestPlugin;

impl Plugin for HelmsmanTestPlugin {
    fn build(&self, app: &mut App) {
        app
        .add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(TEST_STEP)),
            #[cfg(feature = "logging")]
            bevy::log::LogPlugin {
                level: bevy::log::Level::DEBUG,
                custom_layer: |_| None,
                filter: "wgpu=error,bevy_render=info,bevy_ecs=info".to_string(),
                fmt_layer: |_| None,
            },
        ))
        .init_resource::<EventLog>()
        .add_observer(record_motion_started)
        .add_observer(record_motion_completed)
        .add_observer(record_motion_killed)
        .add_observer(record_action_changed)
        .add_observer(record_environment_changed)
        .add_observer(record_authority_changed)
        .add_observer(record_vehicle_mounted)
        .add_observer(record_vehicle_dismounted)
        .add_observer(record_proximity_entered)
        .add_observer(record_proximity_exited)
        .add_systems(Last, exit_when_frame_budget_spent)
        ;
    }
}
