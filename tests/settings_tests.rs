// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the settings manager with the bundled catalog and graph

use camera_settings::constants::keys;
use camera_settings::errors::EngineError;
use camera_settings::settings::capabilities::{exposure_compensation_values, iso_values};
use camera_settings::settings::{ChangeKind, ChangeSet, ChannelObserver, DeviceCapabilities};
use camera_settings::{JsonFileStore, MemoryStore, PersistentStore, SettingsManager};
use tempfile::TempDir;

fn phone() -> DeviceCapabilities {
    DeviceCapabilities::new("0")
        .with(
            keys::SCENE_MODE,
            ["auto", "hdr", "night", "panorama", "chromaflash", "vendor_mode"],
        )
        .with(keys::FLASH_MODE, ["off", "auto", "on", "torch"])
        .with(keys::ISO, iso_values(100, 800))
        .with(keys::EXPOSURE, exposure_compensation_values(-2, 2))
        .with(keys::WHITE_BALANCE, ["auto", "daylight", "cloudy_daylight"])
        .with(keys::COLOR_EFFECT, ["none", "mono", "sepia"])
        .with(keys::FOCUS_MODE, ["auto", "continuous_picture"])
        .with(keys::PICTURE_SIZE, ["4000x3000", "1920x1080", "4000x3000"])
        .with(keys::FACE_DETECTION, ["off", "on"])
        .with(keys::HISTOGRAM, ["disable"])
        .with(keys::LONGSHOT, ["off", "on"])
        .with(keys::TIMER, ["off", "2", "5", "10"])
        .with(keys::MAKEUP, ["off", "on"])
        .with(keys::REDEYE_REDUCTION, ["off", "on"])
        .with(keys::VIDEO_QUALITY, ["3840x2160", "1920x1080", "1280x720"])
        .with(keys::VIDEO_HIGH_FRAME_RATE, ["off"])
        .with_dependent(
            keys::VIDEO_HIGH_FRAME_RATE,
            keys::VIDEO_QUALITY,
            "1920x1080",
            ["off", "hfr60", "hfr120"],
        )
        .with_dependent(
            keys::VIDEO_HIGH_FRAME_RATE,
            keys::VIDEO_QUALITY,
            "1280x720",
            ["off", "hfr60", "hfr120", "hfr240"],
        )
        .with(keys::VIDEO_ENCODER, ["h264", "h265"])
        .with(keys::DIS, ["off", "on"])
        .with(keys::VIDEO_FLASH_MODE, ["off", "torch"])
}

fn manager_with(store: Box<dyn PersistentStore + Send>) -> SettingsManager {
    let mut manager = SettingsManager::with_embedded(store).unwrap();
    manager.initialize(Box::new(phone())).unwrap();
    manager
}

fn manager() -> SettingsManager {
    manager_with(Box::new(MemoryStore::new()))
}

#[test]
fn test_unsupported_settings_filtered_out() {
    let mut manager = manager();

    let scenes = manager.supported_domain(keys::SCENE_MODE).unwrap();
    assert_eq!(scenes, ["auto", "hdr", "night", "panorama", "chromaflash"]);
    assert_eq!(
        manager.supported_domain(keys::PICTURE_SIZE).unwrap(),
        ["4000x3000", "1920x1080"]
    );

    let filtered = manager.filtered_out_keys();
    assert!(filtered.contains(keys::HISTOGRAM));
    assert!(filtered.contains(keys::CLEARSIGHT));
    assert!(manager.supported_domain(keys::HISTOGRAM).is_none());

    let err = manager.set_value(keys::CLEARSIGHT, "on").unwrap_err();
    assert!(err.is_unknown_setting());
}

#[test]
fn test_repeated_set_changes_nothing() {
    let mut manager = manager();
    let first = manager.set_value(keys::SCENE_MODE, "hdr").unwrap();
    assert!(!first.is_empty());

    let before = manager.value_states();
    let second = manager.set_value(keys::SCENE_MODE, "hdr").unwrap();
    assert!(second.is_empty());
    assert_eq!(manager.value_states(), before);
}

#[test]
fn test_hdr_scene_locks_dependents() {
    let mut manager = manager();
    manager.set_value(keys::ISO, "400").unwrap();
    manager.set_value(keys::WHITE_BALANCE, "daylight").unwrap();

    let changes = manager.set_value(keys::SCENE_MODE, "hdr").unwrap();
    assert_eq!(
        changes.keys(),
        vec![
            keys::SCENE_MODE,
            keys::EXPOSURE,
            keys::FLASH_MODE,
            keys::ISO,
            keys::LONGSHOT,
            keys::MAKEUP,
            keys::WHITE_BALANCE,
        ]
    );
    assert_eq!(manager.effective_value(keys::FLASH_MODE), Some("off"));
    assert_eq!(manager.effective_value(keys::ISO), Some("auto"));
    assert_eq!(manager.effective_value(keys::WHITE_BALANCE), Some("auto"));
    assert_eq!(manager.overridden_by(keys::ISO), Some(keys::SCENE_MODE));
    assert!(!manager.is_overridden(keys::TIMER));
}

#[test]
fn test_leaving_hdr_restores_choices() {
    let mut manager = manager();
    manager.set_value(keys::ISO, "400").unwrap();
    manager.set_value(keys::SCENE_MODE, "hdr").unwrap();

    let changes = manager.set_value(keys::SCENE_MODE, "auto").unwrap();
    assert!(
        changes
            .iter()
            .filter(|c| c.key != keys::SCENE_MODE)
            .all(|c| c.kind == ChangeKind::Released)
    );
    assert_eq!(manager.effective_value(keys::ISO), Some("400"));
    assert_eq!(manager.effective_value(keys::FLASH_MODE), Some("auto"));
    assert!(manager.overridden_keys().is_empty());
}

#[test]
fn test_user_choice_unlocks_setting() {
    let mut manager = manager();
    manager.set_value(keys::SCENE_MODE, "night").unwrap();
    assert!(manager.is_overridden(keys::FLASH_MODE));

    let changes = manager.set_value(keys::FLASH_MODE, "torch").unwrap();
    assert_eq!(changes.keys(), vec![keys::FLASH_MODE]);
    assert!(!manager.is_overridden(keys::FLASH_MODE));
    assert_eq!(manager.effective_value(keys::FLASH_MODE), Some("torch"));
    assert!(manager.controllers_of(keys::FLASH_MODE).is_empty());
}

#[test]
fn test_first_controller_wins_then_hands_over() {
    let mut manager = manager();
    manager.set_value(keys::MAKEUP, "on").unwrap();
    assert_eq!(manager.overridden_by(keys::LONGSHOT), Some(keys::MAKEUP));

    manager.set_value(keys::SCENE_MODE, "night").unwrap();
    assert_eq!(manager.overridden_by(keys::LONGSHOT), Some(keys::MAKEUP));
    assert_eq!(
        manager.controllers_of(keys::LONGSHOT),
        [keys::MAKEUP, keys::SCENE_MODE]
    );

    let changes = manager.set_value(keys::MAKEUP, "off").unwrap();
    assert_eq!(
        changes.keys(),
        vec![keys::MAKEUP, keys::COLOR_EFFECT, keys::FACE_DETECTION, keys::LONGSHOT]
    );
    assert_eq!(changes.get(keys::LONGSHOT).unwrap().kind, ChangeKind::Forced);
    assert_eq!(manager.overridden_by(keys::LONGSHOT), Some(keys::SCENE_MODE));
    assert_eq!(manager.effective_value(keys::LONGSHOT), Some("off"));

    manager.set_value(keys::SCENE_MODE, "auto").unwrap();
    assert!(!manager.is_overridden(keys::LONGSHOT));
}

#[test]
fn test_out_of_domain_value_rejected() {
    let mut manager = manager();
    let before = manager.value_states();

    let err = manager.set_value(keys::SCENE_MODE, "promode").unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidValue {
            key: keys::SCENE_MODE.to_string(),
            value: "promode".to_string()
        }
    );
    assert_eq!(manager.value_states(), before);
}

#[test]
fn test_initialize_is_deterministic() {
    let store = MemoryStore::new()
        .with(keys::SCENE_MODE, "panorama")
        .with(keys::TIMER, "5")
        .with(keys::ISO, "12800");

    let a = manager_with(Box::new(store.clone()));
    let b = manager_with(Box::new(store));
    assert_eq!(a.value_states(), b.value_states());
    assert_eq!(a.filtered_out_keys(), b.filtered_out_keys());
    for key in a.engine().active_keys() {
        assert_eq!(a.controllers_of(key), b.controllers_of(key));
    }

    assert_eq!(a.effective_value(keys::TIMER), Some("off"));
    assert_eq!(a.engine().value_state(keys::TIMER).unwrap().base, "5");
    assert_eq!(a.effective_value(keys::ISO), Some("auto"));
}

#[test]
fn test_video_quality_refreshes_frame_rates() {
    let mut manager = manager();
    assert_eq!(
        manager.supported_domain(keys::VIDEO_HIGH_FRAME_RATE).unwrap(),
        ["off", "hfr60", "hfr120"]
    );

    manager.set_value(keys::VIDEO_HIGH_FRAME_RATE, "hfr120").unwrap();
    assert_eq!(manager.overridden_by(keys::DIS), Some(keys::VIDEO_HIGH_FRAME_RATE));

    let changes = manager.set_value(keys::VIDEO_QUALITY, "1280x720").unwrap();
    assert_eq!(
        changes.refreshed(),
        [keys::VIDEO_HIGH_FRAME_RATE, keys::VIDEO_ENCODER]
    );
    assert_eq!(changes.keys(), vec![keys::VIDEO_QUALITY]);
    assert_eq!(
        manager.value_index(keys::VIDEO_HIGH_FRAME_RATE),
        Some(2)
    );

    // 4K offers no high frame rates at all
    let changes = manager.set_value(keys::VIDEO_QUALITY, "3840x2160").unwrap();
    assert_eq!(
        changes.get(keys::VIDEO_HIGH_FRAME_RATE).unwrap().kind,
        ChangeKind::DomainReset
    );
    assert_eq!(manager.effective_value(keys::VIDEO_HIGH_FRAME_RATE), Some("off"));
    assert_eq!(manager.supported_domain(keys::VIDEO_HIGH_FRAME_RATE).unwrap(), ["off"]);
    assert!(!manager.is_overridden(keys::DIS));
    assert!(!manager.is_overridden(keys::VIDEO_FLASH_MODE));
}

#[test]
fn test_dependent_keys_listed() {
    let mut manager = manager();
    assert!(manager.dependent_keys(keys::SCENE_MODE).is_empty());

    manager.set_value(keys::SCENE_MODE, "panorama").unwrap();
    assert_eq!(
        manager.dependent_keys(keys::SCENE_MODE),
        vec![
            keys::COLOR_EFFECT,
            keys::FLASH_MODE,
            keys::LONGSHOT,
            keys::TIMER
        ]
    );
    assert_eq!(
        manager.dependent_keys(keys::VIDEO_QUALITY),
        vec![keys::VIDEO_HIGH_FRAME_RATE, keys::VIDEO_ENCODER]
    );
}

#[test]
fn test_values_survive_restart() {
    let dir = TempDir::new().unwrap();
    {
        let store = JsonFileStore::open(dir.path(), "0").unwrap();
        let mut manager = manager_with(Box::new(store));
        manager.set_value(keys::ISO, "400").unwrap();
        manager.set_value(keys::SCENE_MODE, "hdr").unwrap();
        manager.set_value_by_index(keys::TIMER, 3).unwrap();
    }

    let store = JsonFileStore::open(dir.path(), "0").unwrap();
    assert_eq!(store.get_value(keys::TIMER).as_deref(), Some("10"));
    assert!(store.get_value(keys::FLASH_MODE).is_none());

    let manager = manager_with(Box::new(store));
    assert_eq!(manager.effective_value(keys::SCENE_MODE), Some("hdr"));
    assert_eq!(manager.effective_value(keys::ISO), Some("auto"));
    assert_eq!(manager.engine().value_state(keys::ISO).unwrap().base, "400");
    assert_eq!(manager.overridden_by(keys::FLASH_MODE), Some(keys::SCENE_MODE));
}

#[tokio::test]
async fn test_changes_delivered_over_channel() {
    let mut manager = manager();
    let (observer, mut receiver) = ChannelObserver::channel();
    let id = manager.register_observer(Box::new(observer));

    manager.set_value(keys::SCENE_MODE, "chromaflash").unwrap();
    let changes: ChangeSet = receiver.recv().await.unwrap();
    assert_eq!(changes.get(keys::FLASH_MODE).unwrap().effective_value(), "on");

    assert!(manager.unregister_observer(id));
    manager.set_value(keys::SCENE_MODE, "auto").unwrap();
    assert!(receiver.try_recv().is_err());
}
