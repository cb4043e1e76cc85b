use crate::config::MotionConfig;
use crate::geometry::{clamp_score, Vec2, EPSILON};
use crate::metrics::Metrics;
use crate::pose::KeypointIndex::{self, *};
use crate::tracker::motion::MIN_CIRCLE_SAMPLES;
use crate::tracker::{advance, Cooldown, DirectionChangeCounter, MotionHistory, Trigger};

use super::{weighted_score, ExerciseProcessor, FrameContext, Joints};

const REQUIRED: &[KeypointIndex] = &[LeftElbow, RightElbow, LeftWrist, RightWrist];

const TURN_THRESHOLD_DEG: f32 = 30.0;
/// 片側あたりの方向転換回数
const CHANGES_PER_SIDE: u32 = 2;
const COOLDOWN: Cooldown = Cooldown::from_millis(500);
/// 前腕長に対する肘の移動量の許容値
const ELBOW_DRIFT_RATIO: f32 = 0.15;
/// この移動量で安定度スコアが0になる
const ELBOW_DRIFT_ZERO_RATIO: f32 = 0.3;
const MAX_ASYMMETRY: f32 = 0.35;

pub const MISTAKE_ELBOWS_MOVING: &str = "Keep your elbows steady";
pub const MISTAKE_UNEVEN_ROTATION: &str = "Rotate both wrists evenly";

struct WristTrack {
    /// 肘から見た手首の位置
    wrist: MotionHistory,
    changes: DirectionChangeCounter,
    /// 肘の絶対位置。レップをまたいで保持する
    elbow: MotionHistory,
}

impl WristTrack {
    fn new(config: &MotionConfig) -> Self {
        Self {
            wrist: MotionHistory::new(config.history_capacity),
            changes: DirectionChangeCounter::new(TURN_THRESHOLD_DEG, config.min_step),
            elbow: MotionHistory::new(config.history_capacity),
        }
    }

    fn observe(&mut self, elbow: Vec2, wrist: Vec2) {
        let relative = wrist.sub(elbow);
        self.wrist.record(relative);
        self.changes.observe(relative);
        self.elbow.record(elbow);
    }

    fn finish_cycle(&mut self) {
        self.wrist.clear();
        self.changes.finish_cycle();
    }
}

/// 手首回し: 肘を中心とした手首の軌跡で回転を数え、肘が動いていないかを見る
pub struct WristRotationProcessor {
    left: WristTrack,
    right: WristTrack,
}

impl WristRotationProcessor {
    pub fn new(config: &MotionConfig) -> Self {
        Self {
            left: WristTrack::new(config),
            right: WristTrack::new(config),
        }
    }
}

impl ExerciseProcessor for WristRotationProcessor {
    fn required_joints(&self) -> &'static [KeypointIndex] {
        REQUIRED
    }

    fn analyze(&mut self, joints: &Joints, metrics: &mut Metrics, ctx: &FrameContext) {
        let (le, lw) = (joints.point(LeftElbow), joints.point(LeftWrist));
        let (re, rw) = (joints.point(RightElbow), joints.point(RightWrist));
        let forearm = (le.distance(lw) + re.distance(rw)) / 2.0;
        if forearm < EPSILON {
            metrics.set_neutral();
            return;
        }

        self.left.observe(le, lw);
        self.right.observe(re, rw);

        let elbow_motion = self
            .left
            .elbow
            .movement_range()
            .max(self.right.elbow.movement_range());
        if elbow_motion > ELBOW_DRIFT_RATIO * forearm {
            metrics.add_mistake(MISTAKE_ELBOWS_MOVING);
        }
        let drift_limit = ELBOW_DRIFT_ZERO_RATIO * forearm;
        let steadiness = clamp_score(100.0 - elbow_motion / drift_limit * 100.0);

        let left_range = self.left.wrist.movement_range();
        let right_range = self.right.wrist.movement_range();
        let max_range = left_range.max(right_range);
        let asymmetry = if max_range > EPSILON {
            (left_range - right_range).abs() / max_range
        } else {
            0.0
        };
        let warmed_up = self.left.wrist.len() >= MIN_CIRCLE_SAMPLES
            && self.right.wrist.len() >= MIN_CIRCLE_SAMPLES;
        if warmed_up && asymmetry > MAX_ASYMMETRY {
            metrics.add_mistake(MISTAKE_UNEVEN_ROTATION);
        }
        let symmetry = clamp_score(100.0 - asymmetry * 100.0);
        let smoothness = (self.left.wrist.smoothness() + self.right.wrist.smoothness()) * 50.0;

        let (cl, cr) = (self.left.changes.count(), self.right.changes.count());
        let both_circular = self.left.wrist.is_circular() && self.right.wrist.is_circular();
        let both_looped = self.left.changes.closed_loop() && self.right.changes.closed_loop();
        let complete = ((cl >= CHANGES_PER_SIDE && cr >= CHANGES_PER_SIDE) || both_circular)
            && both_looped
            && COOLDOWN.ready(metrics.last_rep_timestamp, ctx.now);
        let transition = advance(
            metrics.rep_state,
            Trigger::Cycle {
                in_motion: cl + cr > 0,
                complete,
            },
        );
        metrics.rep_state = transition.state;

        if transition.rep_completed {
            metrics.record_rep(ctx.now);
            metrics.rep_quality = (smoothness + symmetry) / 2.0;
            tracing::debug!(reps = metrics.rep_count, elbow_motion, "wrist rotation counted");
            self.left.finish_cycle();
            self.right.finish_cycle();
        }

        metrics.form_score =
            weighted_score(&[(steadiness, 0.4), (symmetry, 0.3), (smoothness, 0.3)]);
    }
}
