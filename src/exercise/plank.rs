use crate::geometry::{clamp_score, EPSILON};
use crate::metrics::Metrics;
use crate::pose::KeypointIndex::{self, *};

use super::{ExerciseProcessor, FrameContext, Joints};

const REQUIRED: &[KeypointIndex] = &[
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
    LeftAnkle,
    RightAnkle,
];

/// 体長に対する腰のずれの許容量
const HIP_OFFSET_TOLERANCE: f32 = 0.08;
/// ずれ1.0 (体長と同じ) あたりの減点
const OFFSET_PENALTY: f32 = 400.0;

pub const MISTAKE_HIPS_SAGGING: &str = "Hips sagging - engage your core";
pub const MISTAKE_HIPS_HIGH: &str = "Hips too high - lower them in line with your body";

/// プランク: レップは数えず、肩-腰-足首の一直線度だけを評価する
pub struct PlankProcessor;

impl PlankProcessor {
    /// 肩-足首を結ぶ線からの腰の鉛直方向のずれ (体長で正規化)
    ///
    /// 正: 腰が線より下 (落ちている), 負: 腰が線より上
    pub fn hip_offset(joints: &Joints) -> Option<f32> {
        let shoulder = joints.midpoint(LeftShoulder, RightShoulder);
        let hip = joints.midpoint(LeftHip, RightHip);
        let ankle = joints.midpoint(LeftAnkle, RightAnkle);

        let body = ankle.sub(shoulder);
        let length = body.length();
        if length < EPSILON {
            return None;
        }
        // 画像座標 (y下向き) では外積が正 = 進行方向の右側。頭の向きで符号を揃える
        let facing = if body.x < 0.0 { -1.0 } else { 1.0 };
        Some(body.cross(hip.sub(shoulder)) / length / length * facing)
    }
}

impl ExerciseProcessor for PlankProcessor {
    fn required_joints(&self) -> &'static [KeypointIndex] {
        REQUIRED
    }

    fn analyze(&mut self, joints: &Joints, metrics: &mut Metrics, _ctx: &FrameContext) {
        let Some(offset) = Self::hip_offset(joints) else {
            metrics.set_neutral();
            return;
        };

        if offset > HIP_OFFSET_TOLERANCE {
            metrics.add_mistake(MISTAKE_HIPS_SAGGING);
        } else if offset < -HIP_OFFSET_TOLERANCE {
            metrics.add_mistake(MISTAKE_HIPS_HIGH);
        }

        let score = clamp_score(100.0 - offset.abs() * OFFSET_PENALTY);
        metrics.form_score = score;
        metrics.rep_quality = score;
    }
}
