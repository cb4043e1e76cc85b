use crate::config::MotionConfig;
use crate::geometry::{clamp_score, tilt_from_vertical, EPSILON};
use crate::metrics::Metrics;
use crate::pose::KeypointIndex::{self, *};
use crate::tracker::motion::MIN_CIRCLE_SAMPLES;
use crate::tracker::{advance, Cooldown, DirectionChangeCounter, MotionHistory, Trigger};

use super::{ratio_score, weighted_score, ExerciseProcessor, FrameContext, Joints};

const REQUIRED: &[KeypointIndex] = &[LeftShoulder, RightShoulder, LeftHip, RightHip];

const TURN_THRESHOLD_DEG: f32 = 45.0;
/// 1周とみなす方向転換回数
const CHANGES_PER_REP: u32 = 4;
const COOLDOWN: Cooldown = Cooldown::from_millis(1000);
/// 上体の傾きの許容量 (度)
const MAX_LEAN_DEG: f32 = 20.0;
/// 胴の長さに対する目標の円の大きさ
const TARGET_RANGE_RATIO: f32 = 0.15;
const MIN_RANGE_RATIO: f32 = 0.05;

pub const MISTAKE_LEANING: &str = "Keep your upper body upright";
pub const MISTAKE_SMALL_CIRCLES: &str = "Make bigger hip circles";

/// ヒップサークル: 腰の中点の軌跡で1周を検出する
///
/// 方向転換の回数か軌跡の円形判定で周期を検出し、移動方向が1周分回っていればレップとする。
pub struct HipCircleProcessor {
    path: MotionHistory,
    changes: DirectionChangeCounter,
    /// 直前のレップで描いた円の大きさ (バッファが溜まるまでの代用)
    last_range: f32,
}

impl HipCircleProcessor {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            path: MotionHistory::new(config.history_capacity),
            changes: DirectionChangeCounter::new(TURN_THRESHOLD_DEG, config.min_step),
            last_range: 0.0,
        }
    }
}

impl ExerciseProcessor for HipCircleProcessor {
    fn required_joints(&self) -> &'static [KeypointIndex] {
        REQUIRED
    }

    fn analyze(&mut self, joints: &Joints, metrics: &mut Metrics, ctx: &FrameContext) {
        let hip = joints.midpoint(LeftHip, RightHip);
        let shoulder = joints.midpoint(LeftShoulder, RightShoulder);
        let torso = shoulder.distance(hip);
        if torso < EPSILON {
            metrics.set_neutral();
            return;
        }

        self.path.record(hip);
        self.changes.observe(hip);

        let mut range = self.path.movement_range();
        if self.path.len() < MIN_CIRCLE_SAMPLES {
            range = range.max(self.last_range);
        }
        let range_score = ratio_score(range, TARGET_RANGE_RATIO * torso);
        let smoothness = self.path.smoothness() * 100.0;

        let lean = tilt_from_vertical(shoulder, hip).unwrap_or(0.0);
        if lean > MAX_LEAN_DEG {
            metrics.add_mistake(MISTAKE_LEANING);
        }
        if self.path.len() >= MIN_CIRCLE_SAMPLES && range < MIN_RANGE_RATIO * torso {
            metrics.add_mistake(MISTAKE_SMALL_CIRCLES);
        }
        let stability = clamp_score(100.0 - (lean - 5.0).max(0.0) * 4.0);

        let triggered = self.changes.count() >= CHANGES_PER_REP || self.path.is_circular();
        let complete = triggered
            && self.changes.closed_loop()
            && COOLDOWN.ready(metrics.last_rep_timestamp, ctx.now);
        let in_motion = self.changes.count() > 0;
        let transition = advance(
            metrics.rep_state,
            Trigger::Cycle {
                in_motion,
                complete,
            },
        );
        metrics.rep_state = transition.state;

        if transition.rep_completed {
            metrics.record_rep(ctx.now);
            metrics.rep_quality = (range_score + smoothness) / 2.0;
            tracing::debug!(reps = metrics.rep_count, range, "hip circle counted");
            self.last_range = range;
            self.changes.finish_cycle();
            self.path.clear();
        }

        metrics.form_score = weighted_score(&[
            (range_score, 0.35),
            (smoothness, 0.35),
            (stability, 0.3),
        ]);
    }
}
