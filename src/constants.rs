// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Application directory name used under the platform config/data dirs
pub const APP_DIR_NAME: &str = "camera-settings";

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Embedded declared-settings catalog
pub const CATALOG_ASSET: &str = "settings.json";

/// Embedded dependency graph
pub const DEPENDENCY_ASSET: &str = "dependency.json";

/// Fallback rule name in the dependency graph
///
/// Applied when a controlling setting's current value has no explicit entry.
pub const DEFAULT_RULE: &str = "default";

/// Persisted settings schema version
///
/// Version history:
/// - 1: numeric jpeg quality values
/// - 2: named jpeg quality values (normal, fine, superfine)
/// - 3: legacy `video_quality` entries dropped
pub const STORE_VERSION: u32 = 3;

/// Setting keys used across the crate
///
/// The key strings are the same ones used by the catalog, the dependency graph,
/// capability files and the persisted store.
pub mod keys {
    pub const SCENE_MODE: &str = "scene_mode";
    pub const FLASH_MODE: &str = "flash_mode";
    pub const ISO: &str = "iso";
    pub const EXPOSURE: &str = "exposure";
    pub const WHITE_BALANCE: &str = "white_balance";
    pub const COLOR_EFFECT: &str = "color_effect";
    pub const FOCUS_MODE: &str = "focus_mode";
    pub const PICTURE_SIZE: &str = "picture_size";
    pub const JPEG_QUALITY: &str = "jpeg_quality";
    pub const REDEYE_REDUCTION: &str = "redeye_reduction";
    pub const NOISE_REDUCTION: &str = "noise_reduction";
    pub const FACE_DETECTION: &str = "face_detection";
    pub const HDR: &str = "hdr";
    pub const HISTOGRAM: &str = "histogram";
    pub const LONGSHOT: &str = "longshot";
    pub const TIMER: &str = "timer";
    pub const MAKEUP: &str = "makeup";
    pub const CLEARSIGHT: &str = "clearsight";
    pub const MONO_ONLY: &str = "mono_only";
    pub const MPO: &str = "mpo";
    pub const SAVE_RAW: &str = "saveraw";
    pub const ANTI_BANDING: &str = "anti_banding";
    pub const SATURATION_LEVEL: &str = "saturation_level";
    pub const SELFIE_MIRROR: &str = "selfie_mirror";
    pub const SELFIE_FLASH: &str = "selfie_flash";
    pub const VIDEO_QUALITY: &str = "video_quality";
    pub const VIDEO_HIGH_FRAME_RATE: &str = "video_hfr";
    pub const VIDEO_ENCODER: &str = "video_encoder";
    pub const AUDIO_ENCODER: &str = "audio_encoder";
    pub const DIS: &str = "dis";
    pub const VIDEO_FLASH_MODE: &str = "video_flash_mode";
}

/// Numeric capability ranges turned into setting domains
pub mod ranges {
    /// ISO values are offered in steps of this size
    pub const ISO_STEP: u32 = 50;

    /// Exposure compensation domains are thinned until they fit this many steps
    pub const EXPOSURE_MAX_STEPS: i32 = 10;
}
