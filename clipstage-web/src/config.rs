use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid stage config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid log level \"{0}\"")]
    LogLevel(String),

    /// Parsed, but a value is out of its usable range.
    #[error("Invalid stage config: {0}")]
    Invalid(String),
}

/// Page configuration, read from an optional TOML document handed over by
/// the hosting page. Every field has a default, so `None` (or an empty
/// document) gives the stock studio scene.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StageConfig {
    pub log_level: String,
    pub assets: AssetConfig,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub renderer: RendererConfig,
    pub lights: LightsConfig,
    pub primary: ModelPlacement,
    pub secondary: ModelPlacement,
    pub command_box: CommandBoxConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetConfig {
    pub environment_url: String,
    pub primary_model_url: String,
    pub secondary_model_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RendererConfig {
    pub exposure: f32,
    pub environment_intensity: f32,
    pub clear_color: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LightsConfig {
    pub ambient: AmbientLightConfig,
    pub point: PointLightConfig,
    pub spot: SpotLightConfig,
    pub area: AreaLightConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AmbientLightConfig {
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PointLightConfig {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpotLightConfig {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    /// Half-angle of the cone, radians.
    pub angle: f32,
    /// Fraction of the cone that fades out, 0..1.
    pub penumbra: f32,
}

/// Rectangular area light, shaded as a directional fill from its position
/// toward its target.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AreaLightConfig {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelPlacement {
    pub scale: f32,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CommandBoxConfig {
    pub placeholder: String,
}

impl StageConfig {
    /// Parse a TOML document; missing sections and keys fall back to defaults.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let config: StageConfig = toml::from_str(source)?;
        config.log_level_filter()?;
        config.controls.validate()?;
        Ok(config)
    }

    /// `None` means the page passed no configuration at all.
    pub fn from_optional_toml(source: Option<&str>) -> Result<Self, ConfigError> {
        match source {
            Some(text) if !text.trim().is_empty() => Self::from_toml(text),
            _ => Ok(Self::default()),
        }
    }

    pub fn log_level_filter(&self) -> Result<log::LevelFilter, ConfigError> {
        self.log_level
            .parse::<log::LevelFilter>()
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }
}

impl ControlsConfig {
    /// Reject values the orbit controls cannot work with: NaN anywhere, an
    /// empty or non-positive distance range, and zoom/damping factors that
    /// would raise a negative base to a fractional power.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("damping_factor", self.damping_factor),
            ("rotate_speed", self.rotate_speed),
            ("zoom_speed", self.zoom_speed),
            ("pan_speed", self.pan_speed),
            ("min_distance", self.min_distance),
            ("max_distance", self.max_distance),
        ];
        if let Some((name, _)) = values.iter().find(|(_, v)| v.is_nan()) {
            return Err(ConfigError::Invalid(format!("controls.{name} is NaN")));
        }
        if self.min_distance <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "controls.min_distance must be positive, got {}",
                self.min_distance
            )));
        }
        if self.min_distance > self.max_distance {
            return Err(ConfigError::Invalid(format!(
                "controls.min_distance ({}) exceeds max_distance ({})",
                self.min_distance, self.max_distance
            )));
        }
        if !(0.0..1.0).contains(&self.zoom_speed) {
            return Err(ConfigError::Invalid(format!(
                "controls.zoom_speed must be in [0, 1), got {}",
                self.zoom_speed
            )));
        }
        if !(0.0..=1.0).contains(&self.damping_factor) {
            return Err(ConfigError::Invalid(format!(
                "controls.damping_factor must be in [0, 1], got {}",
                self.damping_factor
            )));
        }
        Ok(())
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            assets: AssetConfig::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            renderer: RendererConfig::default(),
            lights: LightsConfig::default(),
            primary: ModelPlacement {
                scale: 2.0,
                position: [0.0, -0.2, 0.0],
            },
            secondary: ModelPlacement {
                scale: 0.04,
                position: [0.0, -0.2, -0.1],
            },
            command_box: CommandBoxConfig::default(),
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            environment_url: "models/brown_photostudio_02_2k.hdr".to_string(),
            primary_model_url: "models/cilindro6.gltf".to_string(),
            secondary_model_url: "models/tia_15.glb".to_string(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [0.2, 0.2, 0.2],
            target: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 0.05,
            pan_speed: 1.0,
            min_distance: 0.01,
            max_distance: 1000.0,
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            exposure: 1.5,
            environment_intensity: 1.0,
            clear_color: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            ambient: AmbientLightConfig::default(),
            point: PointLightConfig::default(),
            spot: SpotLightConfig::default(),
            area: AreaLightConfig::default(),
        }
    }
}

impl Default for AmbientLightConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
        }
    }
}

impl Default for PointLightConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 0.15,
            position: [0.0, 0.08, 0.1],
        }
    }
}

impl Default for SpotLightConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 0.3,
            position: [0.0, 0.1, 0.4],
            target: [0.0, 0.0, 0.0],
            angle: std::f32::consts::FRAC_PI_6,
            penumbra: 0.3,
        }
    }
}

impl Default for AreaLightConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            position: [0.0, 0.2, 0.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for ModelPlacement {
    fn default() -> Self {
        Self {
            scale: 1.0,
            position: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for CommandBoxConfig {
    fn default() -> Self {
        Self {
            placeholder: "Type a command...".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = StageConfig::from_toml("").unwrap();
        assert_eq!(config, StageConfig::default());
        assert_eq!(config.camera.fov_deg, 75.0);
        assert_eq!(config.renderer.exposure, 1.5);
    }

    #[test]
    fn test_none_and_blank_are_default() {
        assert_eq!(StageConfig::from_optional_toml(None).unwrap(), StageConfig::default());
        assert_eq!(
            StageConfig::from_optional_toml(Some("  \n")).unwrap(),
            StageConfig::default()
        );
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config = StageConfig::from_toml(
            r#"
            log_level = "debug"

            [assets]
            primary_model_url = "https://example.com/robot.glb"

            [secondary]
            scale = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.assets.primary_model_url, "https://example.com/robot.glb");
        assert_eq!(config.assets.environment_url, AssetConfig::default().environment_url);
        assert_eq!(config.secondary.scale, 0.5);
        assert_eq!(config.secondary.position, [0.0, 0.0, 0.0]);
        assert_eq!(config.primary, StageConfig::default().primary);
        assert_eq!(config.log_level_filter().unwrap(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = StageConfig::from_toml("[camera]\nfov = 60.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let err = StageConfig::from_toml("log_level = \"loud\"").unwrap_err();
        assert!(matches!(err, ConfigError::LogLevel(level) if level == "loud"));
    }

    // ── controls validation ──

    #[test]
    fn test_default_controls_are_valid() {
        assert!(ControlsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_distance_rejected() {
        let err = StageConfig::from_toml("[controls]\nmin_distance = 10.0\nmax_distance = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_non_positive_min_distance_rejected() {
        for value in ["0.0", "-1.0"] {
            let source = format!("[controls]\nmin_distance = {value}\n");
            assert!(matches!(StageConfig::from_toml(&source), Err(ConfigError::Invalid(_))), "{value}");
        }
    }

    #[test]
    fn test_nan_control_rejected() {
        let err = StageConfig::from_toml("[controls]\nrotate_speed = nan\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("rotate_speed")));
    }

    #[test]
    fn test_zoom_speed_range() {
        assert!(matches!(
            StageConfig::from_toml("[controls]\nzoom_speed = 1.5\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            StageConfig::from_toml("[controls]\nzoom_speed = 1.0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(StageConfig::from_toml("[controls]\nzoom_speed = 0.0\n").is_ok());
    }

    #[test]
    fn test_damping_factor_range() {
        assert!(matches!(
            StageConfig::from_toml("[controls]\ndamping_factor = 1.5\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            StageConfig::from_toml("[controls]\ndamping_factor = -0.1\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(StageConfig::from_toml("[controls]\ndamping_factor = 1.0\n").is_ok());
    }

    #[test]
    fn test_default_lights_match_studio_setup() {
        let lights = LightsConfig::default();
        assert_eq!(lights.point.intensity, 0.15);
        assert_eq!(lights.spot.position, [0.0, 0.1, 0.4]);
        assert!((lights.spot.angle - std::f32::consts::PI / 6.0).abs() < 1e-6);
        assert_eq!(lights.area.position, [0.0, 0.2, 0.0]);
    }
}
