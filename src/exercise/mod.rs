//! Exercise processors.
//!
//! Each supported exercise has one processor that owns its auxiliary tracker state.
//! [`TrackerState`] holds the processor for the session's exercise and is the only
//! entry point the session uses.

pub mod arm_circle;
pub mod hip_circle;
pub mod plank;
pub mod push_up;
pub mod reps;
pub mod squat;
pub mod wrist_rotation;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::config::Config;
use crate::geometry::{clamp_score, Vec2};
use crate::metrics::Metrics;
use crate::pose::{KeypointIndex, Pose};

pub use arm_circle::ArmCircleProcessor;
pub use hip_circle::HipCircleProcessor;
pub use plank::PlankProcessor;
pub use push_up::PushUpProcessor;
pub use squat::SquatProcessor;
pub use wrist_rotation::WristRotationProcessor;

/// 対応している種目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    PushUp,
    Squat,
    Plank,
    HipCircle,
    WristRotation,
    ArmCircle,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 6] = [
        Self::PushUp,
        Self::Squat,
        Self::Plank,
        Self::HipCircle,
        Self::WristRotation,
        Self::ArmCircle,
    ];

    /// 代謝当量 (MET)
    pub fn met(self) -> f64 {
        match self {
            Self::PushUp => 8.0,
            Self::Squat => 5.0,
            Self::Plank => 4.0,
            Self::HipCircle => 3.0,
            Self::WristRotation => 2.5,
            Self::ArmCircle => 3.5,
        }
    }

    /// レップではなく保持時間で評価する種目か
    pub fn is_timed(self) -> bool {
        matches!(self, Self::Plank)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::PushUp => "Push-ups",
            Self::Squat => "Squats",
            Self::Plank => "Plank",
            Self::HipCircle => "Hip Circles",
            Self::WristRotation => "Wrist Rotations",
            Self::ArmCircle => "Arm Circles",
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown exercise type: {0:?}")]
pub struct ParseExerciseError(pub String);

impl FromStr for ExerciseType {
    type Err = ParseExerciseError;

    /// "push-up", "Push Ups", "push_up", "pushups" などの表記ゆれを受け付ける
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let key = key.strip_suffix('s').unwrap_or(&key);
        match key {
            "pushup" => Ok(Self::PushUp),
            "squat" => Ok(Self::Squat),
            "plank" => Ok(Self::Plank),
            "hipcircle" => Ok(Self::HipCircle),
            "wristrotation" => Ok(Self::WristRotation),
            "armcircle" => Ok(Self::ArmCircle),
            _ => Err(ParseExerciseError(s.to_string())),
        }
    }
}

/// 1フレームの処理に必要な情報
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    /// セッション開始からの秒数
    pub now: f64,
    /// 関節の最低信頼度
    pub min_joint_confidence: f32,
}

/// 信頼度チェック済みの関節位置
#[derive(Debug, Clone)]
pub struct Joints {
    points: [Option<Vec2>; KeypointIndex::COUNT],
}

impl Joints {
    /// 名前 → インデックスの順で解決し、信頼度が閾値未満の関節は None にする
    pub fn resolve(pose: &Pose, min_confidence: f32) -> Self {
        let mut points = [None; KeypointIndex::COUNT];
        for index in KeypointIndex::ALL {
            points[index as usize] = pose
                .get_valid(index, min_confidence)
                .map(|kp| kp.position())
                .filter(|p| p.is_finite());
        }
        Self { points }
    }

    pub fn has_all(&self, required: &[KeypointIndex]) -> bool {
        required.iter().all(|&i| self.points[i as usize].is_some())
    }

    pub fn get(&self, index: KeypointIndex) -> Option<Vec2> {
        self.points[index as usize]
    }

    /// 必須関節用。`has_all` で確認済みであること
    pub fn point(&self, index: KeypointIndex) -> Vec2 {
        self.points[index as usize].unwrap_or_default()
    }

    pub fn midpoint(&self, a: KeypointIndex, b: KeypointIndex) -> Vec2 {
        self.point(a).midpoint(self.point(b))
    }
}

/// 種目ごとのメトリクス計算
pub trait ExerciseProcessor {
    /// このリストの関節が全て有効な場合のみ `analyze` が呼ばれる
    fn required_joints(&self) -> &'static [KeypointIndex];

    /// レップ判定・問題検出・スコア計算を行い `metrics` に書き込む。
    /// `metrics.mistakes` は呼び出し前に空になっている
    fn analyze(&mut self, joints: &Joints, metrics: &mut Metrics, ctx: &FrameContext);
}

/// セッションが所有する種目ごとの状態
pub enum TrackerState {
    PushUp(PushUpProcessor),
    Squat(SquatProcessor),
    Plank(PlankProcessor),
    HipCircle(HipCircleProcessor),
    WristRotation(WristRotationProcessor),
    ArmCircle(ArmCircleProcessor),
}

impl TrackerState {
    pub fn for_exercise(exercise: ExerciseType, config: &Config) -> Self {
        match exercise {
            ExerciseType::PushUp => Self::PushUp(PushUpProcessor::new(&config.push_up)),
            ExerciseType::Squat => Self::Squat(SquatProcessor::new(&config.squat)),
            ExerciseType::Plank => Self::Plank(PlankProcessor),
            ExerciseType::HipCircle => Self::HipCircle(HipCircleProcessor::new(&config.motion)),
            ExerciseType::WristRotation => {
                Self::WristRotation(WristRotationProcessor::new(&config.motion))
            }
            ExerciseType::ArmCircle => Self::ArmCircle(ArmCircleProcessor::new(&config.motion)),
        }
    }

    pub fn exercise(&self) -> ExerciseType {
        match self {
            Self::PushUp(_) => ExerciseType::PushUp,
            Self::Squat(_) => ExerciseType::Squat,
            Self::Plank(_) => ExerciseType::Plank,
            Self::HipCircle(_) => ExerciseType::HipCircle,
            Self::WristRotation(_) => ExerciseType::WristRotation,
            Self::ArmCircle(_) => ExerciseType::ArmCircle,
        }
    }

    fn processor(&mut self) -> &mut dyn ExerciseProcessor {
        match self {
            Self::PushUp(p) => p,
            Self::Squat(p) => p,
            Self::Plank(p) => p,
            Self::HipCircle(p) => p,
            Self::WristRotation(p) => p,
            Self::ArmCircle(p) => p,
        }
    }

    /// 1フレーム処理し、更新後のメトリクスを返す。`current` は変更しない
    ///
    /// 必須関節が欠けている場合はレップ判定をせず、スコアを中立値にする。
    pub fn process(&mut self, pose: &Pose, current: &Metrics, ctx: &FrameContext) -> Metrics {
        let exercise = self.exercise();
        let processor = self.processor();
        let joints = Joints::resolve(pose, ctx.min_joint_confidence);

        let mut next = current.clone();
        next.mistakes.clear();

        if !joints.has_all(processor.required_joints()) {
            tracing::trace!(?exercise, "required joints missing, neutral frame");
            next.set_neutral();
            return next;
        }

        processor.analyze(&joints, &mut next, ctx);

        if !next.scores_are_finite() {
            tracing::warn!(?exercise, "non-finite score, falling back to neutral");
            next.set_neutral();
        }
        next.clamp_scores();
        next
    }
}

/// 各サブスコアを 0〜100 にクランプしてから重み付き平均をとる
pub fn weighted_score(parts: &[(f32, f32)]) -> f32 {
    let total_weight: f32 = parts.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let sum: f32 = parts.iter().map(|(s, w)| clamp_score(*s) * w).sum();
    sum / total_weight
}

/// 左右の差から対称性スコア。`per_unit` は差1あたりの減点
pub fn symmetry_score(left: f32, right: f32, per_unit: f32) -> f32 {
    clamp_score(100.0 - (left - right).abs() * per_unit)
}

/// 比 value / target を 0〜100 にする
pub fn ratio_score(value: f32, target: f32) -> f32 {
    if target <= 0.0 {
        return 0.0;
    }
    clamp_score(value / target * 100.0)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::pose::{Keypoint, KeypointIndex, Pose};

    /// 指定した関節だけを信頼度0.9で持つ Pose
    pub fn pose_with(points: &[(KeypointIndex, f32, f32)]) -> Pose {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        for &(index, x, y) in points {
            keypoints[index as usize] = Keypoint::new(x, y, 0.9);
        }
        Pose::from_array(keypoints)
    }
}
