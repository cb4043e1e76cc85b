use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AngleRepConfig;

/// 反復運動の現在の局面
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepState {
    #[default]
    Up,
    Down,
}

/// 角度判定のヒステリシス帯
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleThresholds {
    pub down: f32,
    pub up: f32,
}

impl From<&AngleRepConfig> for AngleThresholds {
    fn from(config: &AngleRepConfig) -> Self {
        Self {
            down: config.down_angle,
            up: config.up_angle,
        }
    }
}

/// 状態機械への入力
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    /// 監視している関節角度 (度)
    Angle { angle: f32, thresholds: AngleThresholds },
    /// 軌跡ベースの種目: 動作中か / 1周期が完了したか
    Cycle { in_motion: bool, complete: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: RepState,
    pub rep_completed: bool,
}

/// Up/Down 状態を1ステップ進める
///
/// レップは Down→Up の遷移でのみ数える。
pub fn advance(state: RepState, trigger: Trigger) -> Transition {
    let (next, rep_completed) = match (state, trigger) {
        (RepState::Up, Trigger::Angle { angle, thresholds }) if angle < thresholds.down => {
            (RepState::Down, false)
        }
        (RepState::Down, Trigger::Angle { angle, thresholds }) if angle > thresholds.up => {
            (RepState::Up, true)
        }
        (RepState::Up, Trigger::Cycle { in_motion, complete }) if in_motion || complete => {
            (RepState::Down, false)
        }
        (RepState::Down, Trigger::Cycle { complete: true, .. }) => (RepState::Up, true),
        (state, _) => (state, false),
    };
    Transition {
        state: next,
        rep_completed,
    }
}

/// 直前のレップから一定時間経過するまで次のレップを数えない
#[derive(Debug, Clone, Copy)]
pub struct Cooldown {
    period: Duration,
}

impl Cooldown {
    pub const fn from_millis(ms: u64) -> Self {
        Self {
            period: Duration::from_millis(ms),
        }
    }

    /// `last_rep` / `now` はセッション開始からの秒数
    pub fn ready(&self, last_rep: f64, now: f64) -> bool {
        now - last_rep >= self.period.as_secs_f64()
    }
}
