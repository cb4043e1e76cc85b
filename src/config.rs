use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub stabilizer: StabilizerConfig,
    #[serde(default = "default_push_up")]
    pub push_up: AngleRepConfig,
    #[serde(default = "default_squat")]
    pub squat: AngleRepConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// 何フレームに1回姿勢推定を行うか (1 = 毎フレーム)
    #[serde(default = "default_sampling_interval")]
    pub sampling_interval: u32,
    /// カロリー計算に使う体重 (kg)
    #[serde(default = "default_body_weight_kg")]
    pub body_weight_kg: f32,
    /// 種目処理に必要な関節の最低信頼度
    #[serde(default = "default_min_joint_confidence")]
    pub min_joint_confidence: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StabilizerConfig {
    /// これ未満の信頼度のキーポイントは平滑化しない
    #[serde(default = "default_stabilizer_min_confidence")]
    pub min_confidence: f32,
    /// 信頼度1.0のときの平滑化係数
    #[serde(default = "default_min_alpha")]
    pub min_alpha: f32,
    /// 信頼度0.0のときの平滑化係数
    #[serde(default = "default_max_alpha")]
    pub max_alpha: f32,
}

/// 角度で判定する種目のしきい値（度）
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct AngleRepConfig {
    /// この角度を下回ると Down
    pub down_angle: f32,
    /// この角度を上回ると Up (レップ確定)
    pub up_angle: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MotionConfig {
    /// 軌跡バッファの容量
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// 方向転換の判定に使う最小移動量 (ピクセル)
    #[serde(default = "default_min_step")]
    pub min_step: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    /// オーバーレイに描画するキーポイントの信頼度閾値
    #[serde(default = "default_render_confidence")]
    pub confidence_threshold: f32,
    #[serde(default = "default_point_radius")]
    pub point_radius: f32,
}

fn default_sampling_interval() -> u32 { 3 }
fn default_body_weight_kg() -> f32 { 70.0 }
fn default_min_joint_confidence() -> f32 { 0.4 }
fn default_stabilizer_min_confidence() -> f32 { 0.1 }
fn default_min_alpha() -> f32 { 0.1 }
fn default_max_alpha() -> f32 { 0.6 }
fn default_push_up() -> AngleRepConfig { AngleRepConfig { down_angle: 90.0, up_angle: 160.0 } }
fn default_squat() -> AngleRepConfig { AngleRepConfig { down_angle: 120.0, up_angle: 160.0 } }
fn default_history_capacity() -> usize { 15 }
fn default_min_step() -> f32 { 2.0 }
fn default_render_confidence() -> f32 { 0.3 }
fn default_point_radius() -> f32 { 4.0 }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sampling_interval: default_sampling_interval(),
            body_weight_kg: default_body_weight_kg(),
            min_joint_confidence: default_min_joint_confidence(),
        }
    }
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_stabilizer_min_confidence(),
            min_alpha: default_min_alpha(),
            max_alpha: default_max_alpha(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            min_step: default_min_step(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_render_confidence(),
            point_radius: default_point_radius(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.session.sampling_interval = config.session.sampling_interval.max(1);
        config.motion.history_capacity = config.motion.history_capacity.max(2);
        Ok(config)
    }

    /// ファイルがない・壊れている場合はデフォルト設定
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::info!("Using default config ({:#})", e);
                Self::default()
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            stabilizer: StabilizerConfig::default(),
            push_up: default_push_up(),
            squat: default_squat(),
            motion: MotionConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.session.sampling_interval, 3);
        assert_eq!(config.session.body_weight_kg, 70.0);
        assert_eq!(config.session.min_joint_confidence, 0.4);
        assert_eq!(config.push_up.down_angle, 90.0);
        assert_eq!(config.squat.down_angle, 120.0);
        assert_eq!(config.squat.up_angle, 160.0);
        assert_eq!(config.motion.history_capacity, 15);
    }

    #[test]
    fn test_partial_override() {
        let config = Config::parse(
            r#"
            [session]
            sampling_interval = 1

            [squat]
            down_angle = 100.0
            up_angle = 170.0
            "#,
        )
        .unwrap();
        assert_eq!(config.session.sampling_interval, 1);
        assert_eq!(config.session.body_weight_kg, 70.0);
        assert_eq!(config.squat.down_angle, 100.0);
        assert_eq!(config.squat.up_angle, 170.0);
        assert_eq!(config.push_up.up_angle, 160.0);
    }

    #[test]
    fn test_zero_sampling_interval_is_raised() {
        let config = Config::parse("[session]\nsampling_interval = 0\n").unwrap();
        assert_eq!(config.session.sampling_interval, 1);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::parse("[session\n").is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("definitely/not/here/config.toml");
        assert_eq!(config.session.sampling_interval, 3);
    }
}
