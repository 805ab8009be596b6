use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::ClassId;
use crate::ingest::file::DEFAULT_ALLOWED_EXTENSIONS;
use crate::store::DEFAULT_OUTPUT_DIR;

const DEFAULT_STRIDE: u64 = 10;
const DEFAULT_TARGET_LABEL: &str = "cow";
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.25;
const DEFAULT_STRIP_HEIGHT: u32 = 250;
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 512 * 1024 * 1024;
const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8501";

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    scan: Option<ScanConfigFile>,
    output: Option<OutputConfigFile>,
    detector: Option<DetectorConfigFile>,
    report: Option<ReportConfigFile>,
    upload: Option<UploadConfigFile>,
    server: Option<ServerConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ScanConfigFile {
    stride: Option<u64>,
    target_class: Option<u32>,
    target_label: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ReportConfigFile {
    strip_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct UploadConfigFile {
    allowed_extensions: Option<Vec<String>>,
    max_bytes: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ServerConfigFile {
    addr: Option<String>,
}

/// Fully resolved configuration for a scan (and the upload server hosting it).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub scan: ScanSettings,
    pub output_dir: PathBuf,
    pub detector: DetectorSettings,
    pub report: ReportSettings,
    pub upload: UploadSettings,
    pub server_addr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSettings {
    /// Raw frames between evaluated samples.
    pub stride: u64,
    pub target_class: ClassId,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: Option<PathBuf>,
    pub input_size: u32,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub struct ReportSettings {
    /// Human name of the target class, used in headings.
    pub target_label: String,
    /// Display height in pixels for every image in a strip.
    pub strip_height: u32,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub allowed_extensions: Vec<String>,
    pub max_bytes: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            stride: DEFAULT_STRIDE,
            target_class: ClassId::COW,
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_BACKEND.to_string(),
            model_path: None,
            input_size: DEFAULT_INPUT_SIZE,
            confidence: DEFAULT_CONFIDENCE,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            target_label: DEFAULT_TARGET_LABEL.to_string(),
            strip_height: DEFAULT_STRIP_HEIGHT,
        }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scan: ScanSettings::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            detector: DetectorSettings::default(),
            report: ReportSettings::default(),
            upload: UploadSettings::default(),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// Load from `SIGHTLINE_CONFIG` (JSON, or TOML for `.toml` files), apply
    /// `SIGHTLINE_*` environment overrides, then validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SIGHTLINE_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let defaults = Self::default();
        let scan = file.scan.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let upload = file.upload.unwrap_or_default();
        Self {
            scan: ScanSettings {
                stride: scan.stride.unwrap_or(defaults.scan.stride),
                target_class: scan
                    .target_class
                    .map(ClassId)
                    .unwrap_or(defaults.scan.target_class),
            },
            output_dir: file
                .output
                .and_then(|output| output.dir)
                .unwrap_or(defaults.output_dir),
            detector: DetectorSettings {
                backend: detector.backend.unwrap_or(defaults.detector.backend),
                model_path: detector.model_path,
                input_size: detector.input_size.unwrap_or(defaults.detector.input_size),
                confidence: detector.confidence.unwrap_or(defaults.detector.confidence),
            },
            report: ReportSettings {
                target_label: scan
                    .target_label
                    .unwrap_or(defaults.report.target_label),
                strip_height: file
                    .report
                    .and_then(|report| report.strip_height)
                    .unwrap_or(defaults.report.strip_height),
            },
            upload: UploadSettings {
                allowed_extensions: upload
                    .allowed_extensions
                    .unwrap_or(defaults.upload.allowed_extensions),
                max_bytes: upload.max_bytes.unwrap_or(defaults.upload.max_bytes),
            },
            server_addr: file
                .server
                .and_then(|server| server.addr)
                .unwrap_or(defaults.server_addr),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(stride) = env_nonempty("SIGHTLINE_STRIDE") {
            self.scan.stride = stride
                .parse()
                .map_err(|_| anyhow!("SIGHTLINE_STRIDE must be a positive integer"))?;
        }
        if let Some(class) = env_nonempty("SIGHTLINE_TARGET_CLASS") {
            let class: u32 = class
                .parse()
                .map_err(|_| anyhow!("SIGHTLINE_TARGET_CLASS must be an integer class id"))?;
            self.scan.target_class = ClassId(class);
        }
        if let Some(label) = env_nonempty("SIGHTLINE_TARGET_LABEL") {
            self.report.target_label = label;
        }
        if let Some(dir) = env_nonempty("SIGHTLINE_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(backend) = env_nonempty("SIGHTLINE_BACKEND") {
            self.detector.backend = backend;
        }
        if let Some(path) = env_nonempty("SIGHTLINE_MODEL_PATH") {
            self.detector.model_path = Some(PathBuf::from(path));
        }
        if let Some(confidence) = env_nonempty("SIGHTLINE_CONFIDENCE") {
            self.detector.confidence = confidence
                .parse()
                .map_err(|_| anyhow!("SIGHTLINE_CONFIDENCE must be a number"))?;
        }
        if let Some(addr) = env_nonempty("SIGHTLINE_ADDR") {
            self.server_addr = addr;
        }
        if let Some(exts) = env_nonempty("SIGHTLINE_ALLOWED_EXTENSIONS") {
            let parsed = split_csv(&exts);
            if !parsed.is_empty() {
                self.upload.allowed_extensions = parsed;
            }
        }
        Ok(())
    }

    /// Check invariants and normalize extension spellings.
    pub fn validate(&mut self) -> Result<()> {
        if self.scan.stride == 0 {
            return Err(anyhow!("scan stride must be greater than zero"));
        }
        if self.report.strip_height == 0 {
            return Err(anyhow!("report strip height must be greater than zero"));
        }
        if !(self.detector.confidence > 0.0 && self.detector.confidence <= 1.0) {
            return Err(anyhow!("detector confidence must be in (0, 1]"));
        }
        if self.detector.input_size == 0 {
            return Err(anyhow!("detector input size must be greater than zero"));
        }
        if self.detector.backend == "tract" && self.detector.model_path.is_none() {
            return Err(anyhow!("tract backend requires a model path"));
        }
        if self.report.target_label.trim().is_empty() {
            return Err(anyhow!("target label must not be empty"));
        }

        self.upload.allowed_extensions = self
            .upload
            .allowed_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        if self.upload.allowed_extensions.is_empty() {
            return Err(anyhow!("at least one upload extension must be allowed"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
