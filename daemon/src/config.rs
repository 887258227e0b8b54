use anyhow::Result;
use serde::{Deserialize, Serialize};
use shared::Mode;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub objects: ObjectsConfig,
    #[serde(default)]
    pub faces: FacesConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CameraConfig {
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            width: default_width(),
            height: default_height(),
        }
    }
}

fn default_device() -> String {
    "0".to_string()
}
fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CaptureConfig {
    #[serde(default = "default_capture_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub initial_mode: Mode,
}

impl CaptureConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            directory: default_capture_directory(),
            interval_ms: default_interval_ms(),
            initial_mode: Mode::default(),
        }
    }
}

fn default_capture_directory() -> PathBuf {
    PathBuf::from("captures")
}

fn default_interval_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ObjectsConfig {
    #[serde(default = "default_objects_model_path")]
    pub model_path: PathBuf,
    #[serde(default, with = "optional_url")]
    pub model_url: Option<String>,
    #[serde(default)]
    pub model_checksum: Option<String>,
    #[serde(default = "default_input_size")]
    pub input_size: u32,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,
    #[serde(default = "default_backend")]
    pub backend: String,
}

impl Default for ObjectsConfig {
    fn default() -> Self {
        Self {
            model_path: default_objects_model_path(),
            model_url: None,
            model_checksum: None,
            input_size: default_input_size(),
            confidence_threshold: default_confidence_threshold(),
            iou_threshold: default_iou_threshold(),
            backend: default_backend(),
        }
    }
}

fn default_objects_model_path() -> PathBuf {
    PathBuf::from("models/yolov8l.torchscript")
}

fn default_input_size() -> u32 {
    640
}

fn default_confidence_threshold() -> f32 {
    0.4
}

fn default_iou_threshold() -> f32 {
    0.45
}

fn default_backend() -> String {
    "cpu".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FacesConfig {
    #[serde(default = "default_faces_model_path")]
    pub model_path: PathBuf,
    #[serde(default = "default_faces_model_url", with = "optional_url")]
    pub model_url: Option<String>,
    #[serde(default)]
    pub model_checksum: Option<String>,
    #[serde(default = "default_known_faces_dir")]
    pub known_faces_dir: PathBuf,
    #[serde(default = "default_frame_scale")]
    pub frame_scale: f32,
    #[serde(default = "default_min_face_size")]
    pub min_face_size: u32,
    #[serde(default = "default_confident_distance")]
    pub confident_distance: f32,
    #[serde(default = "default_unsure_distance")]
    pub unsure_distance: f32,
}

impl Default for FacesConfig {
    fn default() -> Self {
        Self {
            model_path: default_faces_model_path(),
            model_url: default_faces_model_url(),
            model_checksum: None,
            known_faces_dir: default_known_faces_dir(),
            frame_scale: default_frame_scale(),
            min_face_size: default_min_face_size(),
            confident_distance: default_confident_distance(),
            unsure_distance: default_unsure_distance(),
        }
    }
}

fn default_faces_model_path() -> PathBuf {
    PathBuf::from("models/seeta_fd_frontal_v1.0.bin")
}

fn default_faces_model_url() -> Option<String> {
    Some(
        "https://github.com/atomashpolskiy/rustface/raw/master/model/seeta_fd_frontal_v1.0.bin"
            .to_string(),
    )
}

/// Download URLs where an empty string means "never download". TOML has no
/// null, so `None` is written back out as `""`.
mod optional_url {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(url: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(url.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let url = Option::<String>::deserialize(deserializer)?;
        Ok(url.filter(|u| !u.trim().is_empty()))
    }
}

fn default_known_faces_dir() -> PathBuf {
    PathBuf::from("faces")
}

fn default_frame_scale() -> f32 {
    0.25
}

fn default_min_face_size() -> u32 {
    20
}

fn default_confident_distance() -> f32 {
    0.6
}

fn default_unsure_distance() -> f32 {
    0.8
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_command")]
    pub command: String,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_max_width")]
    pub max_width: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: default_ocr_command(),
            languages: default_languages(),
            max_width: default_max_width(),
        }
    }
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

fn default_max_width() -> u32 {
    1280
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_command")]
    pub command: String,
    #[serde(default = "default_rate")]
    pub rate: u32,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub voice: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            command: default_speech_command(),
            rate: default_rate(),
            volume: default_volume(),
            voice: None,
        }
    }
}

fn default_speech_command() -> String {
    "espeak-ng".to_string()
}

fn default_rate() -> u32 {
    150
}

fn default_volume() -> f32 {
    0.9
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ControlConfig {
    #[serde(default = "default_keyboard")]
    pub keyboard: bool,
    #[serde(default)]
    pub socket_path: Option<PathBuf>,
}

impl ControlConfig {
    pub fn socket_path(&self) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(shared::default_socket_path)
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            keyboard: default_keyboard(),
            socket_path: None,
        }
    }
}

fn default_keyboard() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TimeoutsConfig {
    #[serde(default = "default_socket_operation_timeout")]
    pub socket_operation_timeout_seconds: u64,
    #[serde(default = "default_model_download_timeout")]
    pub model_download_timeout_seconds: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            socket_operation_timeout_seconds: default_socket_operation_timeout(),
            model_download_timeout_seconds: default_model_download_timeout(),
        }
    }
}

fn default_socket_operation_timeout() -> u64 {
    10
}

fn default_model_download_timeout() -> u64 {
    300
}

/// Load the config from `path`, or from the user config directory when no
/// path is given. A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => get_config_path()?,
    };

    if !config_path.exists() {
        tracing::info!("Config file not found at {:?}, using defaults", config_path);
        return Ok(Config::default());
    }

    tracing::info!("Loading config from {:?}", config_path);
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file: {}", e))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))?;

    tracing::info!("Config loaded successfully");
    Ok(config)
}

fn get_config_path() -> Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Failed to get config directory"))?;
    Ok(dir.join("seer").join("config.toml"))
}
