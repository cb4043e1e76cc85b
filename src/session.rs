//! 1回のトレーニングセッション
//!
//! 推定されたポーズを平滑化し、種目ごとのプロセッサに渡して [`Metrics`] を更新する。
//! メトリクスは毎フレーム作り直して丸ごと差し替えるので、途中状態が外から見えることはない。

use std::time::{Duration, Instant};

use crate::config::Config;
use crate::exercise::{ExerciseType, FrameContext, TrackerState};
use crate::metrics::Metrics;
use crate::pose::Pose;
use crate::tracker::Stabilizer;

pub struct Session {
    exercise: ExerciseType,
    config: Config,
    metrics: Metrics,
    stabilizer: Stabilizer,
    /// 最初のフレームで作る
    tracker: Option<TrackerState>,
    started: Instant,
}

impl Session {
    pub fn start(exercise: ExerciseType, config: &Config) -> Self {
        Self::start_at(exercise, config, Instant::now())
    }

    pub fn start_at(exercise: ExerciseType, config: &Config, started: Instant) -> Self {
        tracing::info!(%exercise, "session started");
        Self {
            exercise,
            config: config.clone(),
            metrics: Metrics::new(exercise),
            stabilizer: Stabilizer::from_config(&config.stabilizer),
            tracker: None,
            started,
        }
    }

    pub fn exercise(&self) -> ExerciseType {
        self.exercise
    }

    /// 現在のメトリクス。副作用なし
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// 壁時計で1フレーム処理する
    pub fn process_frame(&mut self, pose: &Pose) -> Metrics {
        let elapsed = self.elapsed();
        self.process_frame_at(pose, elapsed)
    }

    /// セッション開始からの経過時間を指定して1フレーム処理する (リプレイ・テスト用)
    pub fn process_frame_at(&mut self, pose: &Pose, elapsed: Duration) -> Metrics {
        let stabilized = self.stabilizer.apply(pose);
        let ctx = FrameContext {
            now: elapsed.as_secs_f64(),
            min_joint_confidence: self.config.session.min_joint_confidence,
        };

        let exercise = self.exercise;
        let config = &self.config;
        let tracker = self
            .tracker
            .get_or_insert_with(|| TrackerState::for_exercise(exercise, config));

        let mut next = tracker.process(&stabilized, &self.metrics, &ctx);
        next.update_clock(ctx.now, self.config.session.body_weight_kg);
        tracing::trace!(
            reps = next.rep_count,
            form = next.form_score,
            state = ?next.rep_state,
            "frame processed"
        );
        self.metrics = next;
        self.metrics.clone()
    }

    /// ポーズが検出されなかったフレーム。経過時間とカロリーだけ進める
    pub fn record_missed_frame(&mut self) -> Metrics {
        let elapsed = self.elapsed();
        self.record_missed_frame_at(elapsed)
    }

    pub fn record_missed_frame_at(&mut self, elapsed: Duration) -> Metrics {
        let mut next = self.metrics.clone();
        next.update_clock(elapsed.as_secs_f64(), self.config.session.body_weight_kg);
        self.metrics = next;
        self.metrics.clone()
    }

    /// 同じ種目で最初からやり直す
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, started: Instant) {
        tracing::info!(exercise = %self.exercise, reps = self.metrics.rep_count, "session reset");
        self.metrics = Metrics::new(self.exercise);
        self.tracker = None;
        self.stabilizer.reset();
        self.started = started;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::squat::tests::squat_pose;
    use crate::tracker::RepState;

    fn at(secs: f64) -> Duration {
        Duration::from_secs_f64(secs)
    }

    /// 各角度を3フレームずつ保持して平滑化の遅れを吸収する
    fn squat_reps(session: &mut Session, reps: usize, start: f64) -> f64 {
        let cycle = [180.0, 150.0, 120.0, 90.0, 120.0, 150.0, 180.0];
        let mut now = start;
        for _ in 0..reps {
            for angle in cycle {
                for _ in 0..3 {
                    session.process_frame_at(&squat_pose(angle), at(now));
                    now += 0.05;
                }
            }
        }
        now
    }

    #[test]
    fn test_counts_squats_through_stabilizer() {
        let mut session = Session::start(ExerciseType::Squat, &Config::default());
        squat_reps(&mut session, 5, 0.0);
        let metrics = session.metrics();
        assert_eq!(metrics.rep_count, 5);
        assert_eq!(metrics.rep_state, RepState::Up);
        assert!(metrics.avg_rep_duration > 0.0);
        assert!(metrics.calories > 0.0);
    }

    #[test]
    fn test_metrics_is_idempotent() {
        let mut session = Session::start(ExerciseType::Squat, &Config::default());
        squat_reps(&mut session, 1, 0.0);
        let first = session.metrics().clone();
        let second = session.metrics().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn test_process_frame_returns_stored_metrics() {
        let mut session = Session::start(ExerciseType::Squat, &Config::default());
        let returned = session.process_frame_at(&squat_pose(170.0), at(0.5));
        assert_eq!(&returned, session.metrics());
        assert!((returned.duration_seconds - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_reset_keeps_exercise() {
        let mut session = Session::start(ExerciseType::Squat, &Config::default());
        let now = squat_reps(&mut session, 2, 0.0);
        assert_eq!(session.metrics().rep_count, 2);
        session.record_missed_frame_at(at(now + 1.0));

        session.reset();
        let metrics = session.metrics();
        assert_eq!(metrics.exercise, ExerciseType::Squat);
        assert_eq!(metrics.rep_count, 0);
        assert_eq!(metrics.rep_state, RepState::Up);
        assert_eq!(metrics.duration_seconds, 0.0);
        assert_eq!(metrics.calories, 0.0);
        assert!(metrics.mistakes.is_empty());
        assert!(session.tracker.is_none());

        // やり直し後も数えられる
        squat_reps(&mut session, 1, 0.0);
        assert_eq!(session.metrics().rep_count, 1);
    }

    #[test]
    fn test_missed_frame_only_advances_clock() {
        let mut session = Session::start(ExerciseType::Plank, &Config::default());
        let before = session.process_frame_at(&Pose::default(), at(1.0));
        let after = session.record_missed_frame_at(at(31.0));
        assert_eq!(after.rep_count, before.rep_count);
        assert_eq!(after.form_score, before.form_score);
        assert!((after.duration_seconds - 31.0).abs() < 1e-9);
        // 4.0 MET × 70kg × 31s / 3600
        assert!((after.calories - 4.0 * 70.0 * 31.0 / 3600.0).abs() < 1e-9);
    }

    #[test]
    fn test_tracker_created_lazily() {
        let mut session = Session::start(ExerciseType::HipCircle, &Config::default());
        assert!(session.tracker.is_none());
        session.process_frame_at(&Pose::default(), at(0.1));
        assert_eq!(
            session.tracker.as_ref().map(TrackerState::exercise),
            Some(ExerciseType::HipCircle)
        );
    }

    #[test]
    fn test_scores_always_in_range() {
        for exercise in ExerciseType::ALL {
            let mut session = Session::start(exercise, &Config::default());
            for (i, angle) in [180.0, 5.0, 90.0, 179.0, 45.0, 135.0, 0.0].iter().enumerate() {
                let metrics = session.process_frame_at(&squat_pose(*angle), at(i as f64 * 0.2));
                assert!((0.0..=100.0).contains(&metrics.form_score), "{:?}", exercise);
                assert!((0.0..=100.0).contains(&metrics.rep_quality), "{:?}", exercise);
            }
        }
    }
}
