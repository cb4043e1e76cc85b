use crate::config::AngleRepConfig;
use crate::geometry::{angle_degrees, clamp_score, tilt_from_vertical, EPSILON};
use crate::metrics::{Metrics, NEUTRAL_SCORE};
use crate::pose::KeypointIndex::{self, *};
use crate::tracker::RepState;

use super::reps::AngleRepTracker;
use super::{symmetry_score, weighted_score, ExerciseProcessor, FrameContext, Joints};

const REQUIRED: &[KeypointIndex] = &[
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
];

/// 目標の膝角度 (太ももが床と平行)
const TARGET_KNEE_DEG: f32 = 90.0;
/// 膝と足首の水平ずれが太もも長のこの割合を超えたら指摘
const KNEE_OVER_TOE_RATIO: f32 = 0.35;
/// 膝幅が足首幅のこの割合未満なら膝が内側に入っている
const KNEE_CAVE_RATIO: f32 = 0.8;
/// 上体の前傾がこの角度を超えたら指摘
const TORSO_LEAN_MAX_DEG: f32 = 45.0;

pub const MISTAKE_KNEES_PAST_TOES: &str = "Knees going past toes - sit back into your hips";
pub const MISTAKE_KNEES_CAVING: &str = "Knees caving in - push them out over your feet";
pub const MISTAKE_CHEST_DOWN: &str = "Keep your chest up";

/// スクワット: 膝角度でレップを数える
pub struct SquatProcessor {
    reps: AngleRepTracker,
}

impl SquatProcessor {
    pub fn new(config: &AngleRepConfig) -> Self {
        Self {
            reps: AngleRepTracker::new(config.into(), TARGET_KNEE_DEG),
        }
    }
}

impl ExerciseProcessor for SquatProcessor {
    fn required_joints(&self) -> &'static [KeypointIndex] {
        REQUIRED
    }

    fn analyze(&mut self, joints: &Joints, metrics: &mut Metrics, ctx: &FrameContext) {
        let (lh, rh) = (joints.point(LeftHip), joints.point(RightHip));
        let (lk, rk) = (joints.point(LeftKnee), joints.point(RightKnee));
        let (la, ra) = (joints.point(LeftAnkle), joints.point(RightAnkle));

        let left = angle_degrees(lh, lk, la);
        let right = angle_degrees(rh, rk, ra);
        let knee_angle = (left + right) / 2.0;

        self.reps.update(knee_angle, metrics, ctx.now);

        if metrics.rep_state == RepState::Down {
            let past_toes = [(lh, lk, la), (rh, rk, ra)].iter().any(|(hip, knee, ankle)| {
                let thigh = hip.distance(*knee);
                thigh > EPSILON && (knee.x - ankle.x).abs() > KNEE_OVER_TOE_RATIO * thigh
            });
            if past_toes {
                metrics.add_mistake(MISTAKE_KNEES_PAST_TOES);
            }

            let ankle_span = la.distance(ra);
            if ankle_span > EPSILON && lk.distance(rk) < KNEE_CAVE_RATIO * ankle_span {
                metrics.add_mistake(MISTAKE_KNEES_CAVING);
            }
        }

        let shoulder_mid = joints.midpoint(LeftShoulder, RightShoulder);
        let hip_mid = lh.midpoint(rh);
        let posture = match tilt_from_vertical(shoulder_mid, hip_mid) {
            Some(lean) => {
                if lean > TORSO_LEAN_MAX_DEG {
                    metrics.add_mistake(MISTAKE_CHEST_DOWN);
                }
                clamp_score(100.0 - (lean - 20.0).max(0.0) * 2.5)
            }
            None => NEUTRAL_SCORE,
        };

        let range = self.reps.range_score(metrics.rep_state).unwrap_or(NEUTRAL_SCORE);
        let symmetry = symmetry_score(left, right, 2.0);
        metrics.form_score = weighted_score(&[(range, 0.4), (symmetry, 0.3), (posture, 0.3)]);
    }
}
