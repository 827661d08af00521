/*
This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0.
If a copy of the MPL was not distributed with this file,
You can obtain one at https://mozilla.org/MPL/2.0/.
*/
use core::marker::PhantomData;
use core::time::Duration;

use bevy::asset::{AssetLoader, LoadContext, io::Reader};
use bevy::prelude::*;
use serde::de::DeserializeOwned;

use helmsman_core::types::HelmsmanKvMap;

/// Anything that can be authored in a file and loaded as an Asset.
///
/// Implemented for every deserializable Asset, which covers `MotionProfile` and `ControlBindings`.
pub trait ProfileAsset: Asset + DeserializeOwned {}

impl<T: Asset + DeserializeOwned> ProfileAsset for T {}

/// One file format.
pub trait ProfileLoaderBackend: TypePath + Send + Sync + 'static {
    /// What type does the loader return as a loader on error.
    type Error: core::error::Error + Send + Sync + 'static;

    /// Must be able to load from a byte array.
    fn from_slice<T: DeserializeOwned>(v: &[u8]) -> core::result::Result<T, Self::Error>;

    /// What extensions should be read for this (by default)?
    fn extensions() -> &'static [&'static str] {
        &[]
    }
}

#[cfg(any(feature = "json_support", test))]
pub mod json_support {
    use serde::de::DeserializeOwned;
    use super::ProfileLoaderBackend;

    #[derive(Default, bevy::reflect::TypePath)]
    pub struct JsonProfileLoader;

    impl ProfileLoaderBackend for JsonProfileLoader {
        type Error = serde_json::Error;

        fn from_slice<T: DeserializeOwned>(v: &[u8]) -> core::result::Result<T, Self::Error> {
            serde_json::from_slice(v)
        }

        fn extensions() -> &'static [&'static str] {
            &["json"]
        }
    }
}


#[cfg(feature = "toml_support")]
pub mod toml_support {
    use serde::de::DeserializeOwned;
    use super::ProfileLoaderBackend;

    #[derive(Default, bevy::reflect::TypePath)]
    pub struct TomlProfileLoader;

    impl ProfileLoaderBackend for TomlProfileLoader {
        type Error = toml::de::Error;

        fn from_slice<T: DeserializeOwned>(v: &[u8]) -> core::result::Result<T, Self::Error> {
            toml::from_slice(v)
        }

        fn extensions() -> &'static [&'static str] {
            &["toml"]
        }
    }
}


#[cfg(feature = "msgpack_support")]
pub mod msgpack_support {
    use serde::de::DeserializeOwned;
    use super::ProfileLoaderBackend;

    #[derive(Default, bevy::reflect::TypePath)]
    pub struct MsgpackProfileLoader;

    impl ProfileLoaderBackend for MsgpackProfileLoader {
        type Error = rmp_serde::decode::Error;

        fn from_slice<T: DeserializeOwned>(v: &[u8]) -> core::result::Result<T, Self::Error> {
            rmp_serde::decode::from_slice(v)
        }

        fn extensions() -> &'static [&'static str] {
            &["msgpack"]
        }
    }
}


#[cfg(feature = "cbor_support")]
pub mod cbor_support {
    use serde::de::DeserializeOwned;
    use super::ProfileLoaderBackend;

    #[derive(Default, bevy::reflect::TypePath)]
    pub struct CborProfileLoader;

    impl ProfileLoaderBackend for CborProfileLoader {
        type Error = ciborium::de::Error<std::io::Error>;

        fn from_slice<T: DeserializeOwned>(v: &[u8]) -> core::result::Result<T, Self::Error> {
            ciborium::de::from_reader(v)
        }

        fn extensions() -> &'static [&'static str] {
            &["cbor"]
        }
    }
}


#[cfg(any(feature = "ron_support", test))]
pub mod ron_support {
    use serde::de::DeserializeOwned;
    use super::ProfileLoaderBackend;

    #[derive(Default, bevy::reflect::TypePath)]
    pub struct RonProfileLoader;

    impl ProfileLoaderBackend for RonProfileLoader {
        type Error = ron::de::SpannedError;

        fn from_slice<T: DeserializeOwned>(v: &[u8]) -> core::result::Result<T, Self::Error> {
            ron::de::from_bytes(v)
        }

        fn extensions() -> &'static [&'static str] {
            &["ron"]
        }
    }
}


#[cfg(any(feature = "yaml_support", test))]
pub mod yaml_support {
    use serde::de::DeserializeOwned;
    use super::ProfileLoaderBackend;

    #[derive(Default, bevy::reflect::TypePath)]
    pub struct YamlProfileLoader;

    impl ProfileLoaderBackend for YamlProfileLoader {
        type Error = serde_saphyr::Error;

        fn from_slice<T: DeserializeOwned>(v: &[u8]) -> core::result::Result<T, Self::Error> {
            serde_saphyr::from_slice(v)
        }

        fn extensions() -> &'static [&'static str] {
            &["yaml", "yml"]
        }
    }
}


#[cfg(feature = "postcard_support")]
pub mod postcard_support {
    use serde::de::DeserializeOwned;
    use super::ProfileLoaderBackend;

    #[derive(Default, bevy::reflect::TypePath)]
    pub struct PostcardProfileLoader;

    impl ProfileLoaderBackend for PostcardProfileLoader {
        type Error = postcard::Error;

        fn from_slice<T: DeserializeOwned>(v: &[u8]) -> core::result::Result<T, Self::Error> {
            postcard::from_bytes(v)
        }

        fn extensions() -> &'static [&'static str] {
            &["postcard"]
        }
    }
}


/// Asset loader for records of type `T` in the format `B`.
#[derive(TypePath)]
pub struct ProfileLoader<T, B>(PhantomData<fn() -> (T, B)>);

impl<T, B> Default for ProfileLoader<T, B> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: ProfileAsset, B: ProfileLoaderBackend> AssetLoader for ProfileLoader<T, B> {
    type Asset = T;
    type Settings = ();
    type Error = Box<dyn core::error::Error + Send + Sync + 'static>;

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &Self::Settings,
        _ctx: &mut LoadContext<'_>
    ) -> Result<Self::Asset, Self::Error> {
        #[cfg(feature = "logging")]
        bevy::log::debug!("ProfileLoader running for {:?}...", _ctx.path());

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;

        let record = B::from_slice::<T>(&bytes).map_err(|err| {
            #[cfg(feature = "logging")]
            bevy::log::error!("ProfileLoader error in {:?}: {:?}", _ctx.path(), err);
            err
        })?;

        #[cfg(feature = "logging")]
        bevy::log::debug!("ProfileLoader finished {:?}...", _ctx.path());
        Ok(record)
    }

    fn extensions(&self) -> &[&str] {
        B::extensions()
    }
}

/// How long a requested file may take to load before `ProfileLoadingTimeout` fires.
#[derive(Resource, Debug, Clone, Copy)]
pub struct ProfileLoadTimeout(pub Duration);

impl Default for ProfileLoadTimeout {
    fn default() -> Self {
        Self(Duration::from_secs(2))
    }
}

#[derive(Resource)]
struct ProfileHandles<T: Asset>(HelmsmanKvMap<String, Handle<T>>);

impl<T: Asset> Default for ProfileHandles<T> {
    fn default() -> Self {
        Self(HelmsmanKvMap::default())
    }
}

#[derive(Resource)]
struct ProfileLoadTimers<T: Asset>(HelmsmanKvMap<String, Timer>, PhantomData<fn() -> T>);

impl<T: Asset> Default for ProfileLoadTimers<T> {
    fn default() -> Self {
        Self(HelmsmanKvMap::default(), PhantomData)
    }
}

/// Starts loading a `T` from `filename`.
#[derive(Event, Debug)]
pub struct LoadProfileRequest<T: Asset> {
    filename: String,
    _asset: PhantomData<fn() -> T>,
}

impl<T: Asset> LoadProfileRequest<T> {
    pub fn new<IS: Into<String>>(filename: IS) -> Self {
        Self {
            filename: filename.into(),
            _asset: PhantomData,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

#[derive(Event, Debug)]
pub struct ProfileLoaded<T: Asset> {
    pub filename: String,
    pub asset_handle: Handle<T>,
}

#[derive(Event, Debug)]
pub struct ProfileLoadingTimeout<T: Asset> {
    pub filename: String,
    pub timeout_time: f32,
    _asset: PhantomData<fn() -> T>,
}

fn load_profile<T: ProfileAsset>(
    event: On<LoadProfileRequest<T>>,
    asset_server: Res<AssetServer>,
    timeout: Res<ProfileLoadTimeout>,
    mut handles: ResMut<ProfileHandles<T>>,
    mut timers: ResMut<ProfileLoadTimers<T>>,
) {
    let asset_path = event.event().filename.to_owned();
    #[cfg(feature = "logging")]
    bevy::log::info!("Reading {} from {}...", T::short_type_path(), &asset_path);
    let handle: Handle<T> = asset_server.load(asset_path.to_owned());
    handles.0.entry(asset_path.to_owned()).or_insert(handle);
    timers.0.insert(asset_path, Timer::new(timeout.0, TimerMode::Once));
}

/// Reports each pending file once: as loaded as soon as it is, or as timed out.
fn watch_pending_loads<T: ProfileAsset>(
    time: Res<Time>,
    handles: Res<ProfileHandles<T>>,
    assets: Res<Assets<T>>,
    mut timers: ResMut<ProfileLoadTimers<T>>,
    mut commands: Commands,
) {
    timers.0.retain(|key, timer| {
        let loaded = handles.0.get(key).filter(|handle| assets.contains(handle.id()));

        if let Some(handle) = loaded {
            #[cfg(feature = "logging")]
            bevy::log::info!("Successfully loaded {} from file {:?}...", T::short_type_path(), key);
            commands.trigger(ProfileLoaded::<T> {
                filename: key.to_owned(),
                asset_handle: handle.clone(),
            });
            return false;
        }

        if timer.is_finished() {
            let elapsed_time = timer.elapsed_secs();
            #[cfg(feature = "logging")]
            bevy::log::warn!(
                "Loading {} data from file {:?} timed out after {:?}s!",
                T::short_type_path(), key, elapsed_time
            );
            commands.trigger(ProfileLoadingTimeout::<T> {
                filename: key.to_owned(),
                timeout_time: elapsed_time,
                _asset: PhantomData,
            });
            return false;
        }

        timer.tick(time.delta());
        true
    });
}

/// Registers loading of `T` records in the `B` format.
///
/// Adds Bevy's `AssetPlugin` if nothing else has yet, so one per record type and format can be stacked.
pub struct ProfileAssetPlugin<T, B>(PhantomData<fn() -> (T, B)>);

impl<T, B> Default for ProfileAssetPlugin<T, B> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T: ProfileAsset, B: ProfileLoaderBackend> bevy::app::Plugin for ProfileAssetPlugin<T, B> {
    fn build(&self, app: &mut bevy::app::App) {
        if !app.is_plugin_added::<AssetPlugin>() {
            app.add_plugins(AssetPlugin::default());
        }

        app
        .init_resource::<ProfileLoadTimeout>()
        .init_resource::<ProfileHandles<T>>()
        .init_resource::<ProfileLoadTimers<T>>()
        .init_asset::<T>()
        .init_asset_loader::<ProfileLoader<T, B>>()
        .add_observer(load_profile::<T>)
        .add_systems(First, watch_pending_loads::<T>)
        ;
    }
}

#[cfg(test)]
mod tests {
    use bevy::{app::ScheduleRunnerPlugin, prelude::*};
    use bevy::asset::io::AssetSourceBuilder;
    use helmsman_core::bridge::{ControlBindings, LinearMode, MovementMode};
    use helmsman_core::input::InputSignalKind;
    use helmsman_core::motion_profile::{LoopPolicy, MotionKind, MotionProfile, PathInterpolation};

    use super::*;
    use super::json_support::JsonProfileLoader;
    use super::ron_support::RonProfileLoader;
    use super::yaml_support::YamlProfileLoader;

    #[test]
    fn json_profiles_fill_in_defaults() {
        let profile: MotionProfile = JsonProfileLoader::from_slice(
            br#"{"kind": "Move", "target_vector": [1.0, 2.0, 3.0]}"#
        ).unwrap();

        assert_eq!(profile.kind, MotionKind::Move);
        assert_eq!(profile.target_vector, Vec3::new(1., 2., 3.));
        assert_eq!(profile.duration, 1.);
        assert_eq!(profile.loop_policy, LoopPolicy::None);
        assert!(profile.is_valid());
    }

    #[test]
    fn invalid_profiles_still_parse_but_fail_validation() {
        let profile: MotionProfile = RonProfileLoader::from_slice(
            b"(kind: Path, waypoints: [(0.0, 0.0, 0.0)], duration: 0.0)"
        ).unwrap();

        assert!(!profile.is_valid());
    }

    #[test]
    fn yaml_bindings_parse() {
        let bindings: ControlBindings = YamlProfileLoader::from_slice(
            include_bytes!("../test_assets/player_bindings.yaml")
        ).unwrap();

        assert_eq!(bindings.bridges.len(), 2);
        let movement = &bindings.bridges[0];
        assert_eq!(movement.action(), Some("Move"));
        assert_eq!(movement.mode(), Some(MovementMode::Linear(LinearMode::VelocitySet)));
        assert_eq!(movement.input.as_ref().and_then(|input| input.kind), Some(InputSignalKind::Axis2D));
        assert!(movement.reference_frame.is_some());
        assert_eq!(bindings.valid_bridges().count(), 2);
    }

    #[derive(Resource, Debug)]
    struct TestAssetFilepath(String);

    fn load_test_asset<T: ProfileAsset>(
        src_path_res: Res<TestAssetFilepath>,
        mut commands: Commands,
    ) {
        commands.trigger(LoadProfileRequest::<T>::new(src_path_res.0.to_owned()));
    }

    fn succeed_on_loaded<T: ProfileAsset>(
        trigger: On<ProfileLoaded<T>>,
        mut exit: MessageWriter<AppExit>,
    ) {
        let _evt = trigger.event();
        #[cfg(feature = "logging")]
        bevy::log::info!("Profile loaded successfully from {:?} as {:?}", _evt.filename, _evt.asset_handle);
        exit.write(AppExit::Success);
    }

    fn fail_on_timeout<T: ProfileAsset>(
        trigger: On<ProfileLoadingTimeout<T>>,
    ) {
        let evt = trigger.event();
        panic!("Loading {:?} timed out after {:?}s", evt.filename, evt.timeout_time);
    }

    /// An abstraction over the common bits of each format's test code.
    fn run_loader_test<T: ProfileAsset, B: ProfileLoaderBackend>(src_path: &str) {
        let mut app = App::new();
        app
        .register_asset_source(
            "test_assets",
            AssetSourceBuilder::platform_default(
                "test_assets",
                None,
            )
        )
        .insert_resource(TestAssetFilepath(src_path.to_string()))
        .add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_millis(200))),
            #[cfg(feature = "logging")]
            bevy::log::LogPlugin {
                level: bevy::log::Level::DEBUG,
                custom_layer: |_| None,
                filter: "wgpu=error,bevy_render=info,bevy_ecs=info".to_string(),
                fmt_layer: |_| None,
            },
            ProfileAssetPlugin::<T, B>::default(),
        ))
        .add_systems(Startup, load_test_asset::<T>)
        .add_observer(succeed_on_loaded::<T>)
        .add_observer(fail_on_timeout::<T>)
        .run();
    }

    #[test]
    fn test_load_json_profile() {
        run_loader_test::<MotionProfile, JsonProfileLoader>("test_assets://patrol_path.json");
    }

    #[test]
    fn test_load_ron_profile() {
        run_loader_test::<MotionProfile, RonProfileLoader>("test_assets://hop.ron");
    }

    #[test]
    fn test_load_yaml_bindings() {
        run_loader_test::<ControlBindings, YamlProfileLoader>("test_assets://player_bindings.yaml");
    }

    #[test]
    fn patrol_fixture_is_a_looping_spline() {
        let profile: MotionProfile = JsonProfileLoader::from_slice(
            include_bytes!("../test_assets/patrol_path.json")
        ).unwrap();

        assert_eq!(profile.kind, MotionKind::Path);
        assert_eq!(profile.path_interpolation, PathInterpolation::CatmullRom);
        assert_eq!(profile.loop_policy, LoopPolicy::PingPong);
        assert_eq!(profile.loop_count, -1);
        assert!(profile.is_valid());
    }
}
