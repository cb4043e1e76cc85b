use crate::config::AngleRepConfig;
use crate::geometry::{angle_degrees, clamp_score, EPSILON};
use crate::metrics::{Metrics, NEUTRAL_SCORE};
use crate::pose::KeypointIndex::{self, *};

use super::reps::AngleRepTracker;
use super::{symmetry_score, weighted_score, ExerciseProcessor, FrameContext, Joints};

const REQUIRED: &[KeypointIndex] = &[
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
];

/// 肘の開きが肩幅の何倍を超えたら指摘するか
const ELBOW_FLARE_RATIO: f32 = 1.5;
/// 左右の肘角度差 (度)
const UNEVEN_ARMS_DEG: f32 = 20.0;
/// 肩-腰-足首 の角度がこれ未満なら体が曲がっている
const BODY_LINE_MIN_DEG: f32 = 160.0;

pub const MISTAKE_ELBOW_FLARE: &str = "Elbows flaring out - keep them closer to your body";
pub const MISTAKE_UNEVEN_ARMS: &str = "Uneven arm bend - push evenly with both arms";
pub const MISTAKE_BODY_LINE: &str = "Keep your body in a straight line from head to heels";

/// 腕立て伏せ: 肘角度でレップを数える
pub struct PushUpProcessor {
    reps: AngleRepTracker,
}

impl PushUpProcessor {
    pub fn new(config: &AngleRepConfig) -> Self {
        Self {
            reps: AngleRepTracker::new(config.into(), config.down_angle),
        }
    }
}

impl ExerciseProcessor for PushUpProcessor {
    fn required_joints(&self) -> &'static [KeypointIndex] {
        REQUIRED
    }

    fn analyze(&mut self, joints: &Joints, metrics: &mut Metrics, ctx: &FrameContext) {
        let (ls, le, lw) = (
            joints.point(LeftShoulder),
            joints.point(LeftElbow),
            joints.point(LeftWrist),
        );
        let (rs, re, rw) = (
            joints.point(RightShoulder),
            joints.point(RightElbow),
            joints.point(RightWrist),
        );
        let left = angle_degrees(ls, le, lw);
        let right = angle_degrees(rs, re, rw);
        let elbow_angle = (left + right) / 2.0;

        self.reps.update(elbow_angle, metrics, ctx.now);

        // 肘の開き: 正面から見えている (肩幅が胴の長さに対して十分ある) ときだけ判定
        let shoulder_mid = joints.midpoint(LeftShoulder, RightShoulder);
        let hip_mid = joints.midpoint(LeftHip, RightHip);
        let torso = shoulder_mid.distance(hip_mid);
        let shoulder_span = joints.point(LeftShoulder).distance(joints.point(RightShoulder));
        let elbow_span = joints.point(LeftElbow).distance(joints.point(RightElbow));
        if shoulder_span > EPSILON
            && shoulder_span >= 0.2 * torso
            && elbow_span > ELBOW_FLARE_RATIO * shoulder_span
        {
            metrics.add_mistake(MISTAKE_ELBOW_FLARE);
        }

        if (left - right).abs() > UNEVEN_ARMS_DEG {
            metrics.add_mistake(MISTAKE_UNEVEN_ARMS);
        }

        let alignment = match (joints.get(LeftAnkle), joints.get(RightAnkle)) {
            (Some(la), Some(ra)) => {
                let body = angle_degrees(shoulder_mid, hip_mid, la.midpoint(ra));
                if body < BODY_LINE_MIN_DEG {
                    metrics.add_mistake(MISTAKE_BODY_LINE);
                }
                clamp_score(100.0 - (180.0 - body) * 2.5)
            }
            _ => NEUTRAL_SCORE,
        };

        let range = self.reps.range_score(metrics.rep_state).unwrap_or(NEUTRAL_SCORE);
        let symmetry = symmetry_score(left, right, 2.0);
        metrics.form_score = weighted_score(&[(range, 0.4), (symmetry, 0.3), (alignment, 0.3)]);
    }
}
