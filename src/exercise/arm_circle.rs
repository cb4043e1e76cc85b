use crate::config::MotionConfig;
use crate::geometry::{angle_degrees, clamp_score, Vec2, EPSILON};
use crate::metrics::Metrics;
use crate::pose::KeypointIndex::{self, *};
use crate::tracker::motion::MIN_CIRCLE_SAMPLES;
use crate::tracker::{advance, Cooldown, DirectionChangeCounter, MotionHistory, Trigger};

use super::{ratio_score, weighted_score, ExerciseProcessor, FrameContext, Joints};

const REQUIRED: &[KeypointIndex] = &[
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
];

const TURN_THRESHOLD_DEG: f32 = 30.0;
/// 左右合計の方向転換回数
const CHANGES_PER_REP: u32 = 6;
const COOLDOWN: Cooldown = Cooldown::from_millis(800);
const STRAIGHT_ARM_MIN_DEG: f32 = 150.0;
/// 左右の円の大きさの差 (大きい方に対する割合)
const MAX_ASYMMETRY: f32 = 0.3;
/// 腕の長さに対する円の大きさ
const TARGET_RANGE_RATIO: f32 = 0.5;
const MIN_RANGE_RATIO: f32 = 0.25;

pub const MISTAKE_BENT_ARMS: &str = "Keep your arms straight";
pub const MISTAKE_UNEVEN_CIRCLES: &str = "Make circles the same size with both arms";
pub const MISTAKE_SMALL_CIRCLES: &str = "Make bigger arm circles";

/// 片腕分の軌跡 (肩から見た手首の位置)
struct ArmTrack {
    path: MotionHistory,
    changes: DirectionChangeCounter,
}

impl ArmTrack {
    fn new(config: &MotionConfig) -> Self {
        Self {
            path: MotionHistory::new(config.history_capacity),
            changes: DirectionChangeCounter::new(TURN_THRESHOLD_DEG, config.min_step),
        }
    }

    fn observe(&mut self, shoulder_relative: Vec2) {
        self.path.record(shoulder_relative);
        self.changes.observe(shoulder_relative);
    }

    fn finish_cycle(&mut self) {
        self.path.clear();
        self.changes.finish_cycle();
    }
}

/// アームサークル: 両手首の軌跡で1周を検出する
pub struct ArmCircleProcessor {
    left: ArmTrack,
    right: ArmTrack,
}

impl ArmCircleProcessor {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            left: ArmTrack::new(config),
            right: ArmTrack::new(config),
        }
    }
}

impl ExerciseProcessor for ArmCircleProcessor {
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

        let left_arm = ls.distance(le) + le.distance(lw);
        let right_arm = rs.distance(re) + re.distance(rw);
        let arm_length = (left_arm + right_arm) / 2.0;
        if arm_length < EPSILON {
            metrics.set_neutral();
            return;
        }

        self.left.observe(lw.sub(ls));
        self.right.observe(rw.sub(rs));

        let left_range = self.left.path.movement_range();
        let right_range = self.right.path.movement_range();
        let avg_range = (left_range + right_range) / 2.0;
        let max_range = left_range.max(right_range);
        let asymmetry = if max_range > EPSILON {
            (left_range - right_range).abs() / max_range
        } else {
            0.0
        };

        let min_elbow = angle_degrees(ls, le, lw).min(angle_degrees(rs, re, rw));
        if min_elbow < STRAIGHT_ARM_MIN_DEG {
            metrics.add_mistake(MISTAKE_BENT_ARMS);
        }
        let warmed_up = self.left.path.len() >= MIN_CIRCLE_SAMPLES
            && self.right.path.len() >= MIN_CIRCLE_SAMPLES;
        if warmed_up && asymmetry > MAX_ASYMMETRY {
            metrics.add_mistake(MISTAKE_UNEVEN_CIRCLES);
        }
        if warmed_up && avg_range < MIN_RANGE_RATIO * arm_length {
            metrics.add_mistake(MISTAKE_SMALL_CIRCLES);
        }

        let range_score = ratio_score(avg_range, TARGET_RANGE_RATIO * arm_length);
        let symmetry = clamp_score(100.0 - asymmetry * 100.0);
        let smoothness = (self.left.path.smoothness() + self.right.path.smoothness()) * 50.0;
        let straightness = clamp_score(100.0 - (180.0 - min_elbow).max(0.0) * 2.0);

        let changes = self.left.changes.count() + self.right.changes.count();
        let both_circular = self.left.path.is_circular() && self.right.path.is_circular();
        // 合計回数は片腕だけでも届くので、両腕がそれぞれ1周していることを求める
        let both_looped = self.left.changes.closed_loop() && self.right.changes.closed_loop();
        let complete = (changes >= CHANGES_PER_REP || both_circular)
            && both_looped
            && COOLDOWN.ready(metrics.last_rep_timestamp, ctx.now);
        let transition = advance(
            metrics.rep_state,
            Trigger::Cycle {
                in_motion: changes > 0,
                complete,
            },
        );
        metrics.rep_state = transition.state;

        if transition.rep_completed {
            metrics.record_rep(ctx.now);
            metrics.rep_quality = (range_score + smoothness) / 2.0;
            tracing::debug!(
                reps = metrics.rep_count,
                left_range,
                right_range,
                "arm circle counted"
            );
            self.left.finish_cycle();
            self.right.finish_cycle();
        }

        metrics.form_score = weighted_score(&[
            (range_score, 0.3),
            (symmetry, 0.25),
            (smoothness, 0.25),
            (straightness, 0.2),
        ]);
    }
}
