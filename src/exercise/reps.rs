use std::collections::VecDeque;

use crate::geometry::clamp_score;
use crate::metrics::Metrics;
use crate::tracker::{advance, AngleThresholds, RepState, Trigger};

/// レップの深さを何回分保持するか
const DEPTH_HISTORY: usize = 5;
/// 目標角度から1度浅いごとの減点
const DEPTH_PENALTY_PER_DEGREE: f32 = 2.5;

/// 関節角度で判定する種目 (腕立て・スクワット) のレップ追跡
///
/// 各レップの最も深い角度を記録し、深さとその一貫性からレップの質を計算する。
#[derive(Debug, Clone)]
pub struct AngleRepTracker {
    thresholds: AngleThresholds,
    /// 目標とする最も深い角度
    target_angle: f32,
    current_min: f32,
    depths: VecDeque<f32>,
}

impl AngleRepTracker {
    pub fn new(thresholds: AngleThresholds, target_angle: f32) -> Self {
        Self {
            thresholds,
            target_angle,
            current_min: f32::INFINITY,
            depths: VecDeque::with_capacity(DEPTH_HISTORY),
        }
    }

    /// 角度を入力して状態を進める。レップが完了したら true
    pub fn update(&mut self, angle: f32, metrics: &mut Metrics, now: f64) -> bool {
        let prev = metrics.rep_state;
        if prev == RepState::Down {
            self.current_min = self.current_min.min(angle);
        }

        let transition = advance(
            prev,
            Trigger::Angle {
                angle,
                thresholds: self.thresholds,
            },
        );
        if prev == RepState::Up && transition.state == RepState::Down {
            self.current_min = angle;
        }
        metrics.rep_state = transition.state;

        if transition.rep_completed {
            self.depths.push_back(self.current_min);
            while self.depths.len() > DEPTH_HISTORY {
                self.depths.pop_front();
            }
            metrics.record_rep(now);
            metrics.rep_quality = self.rep_quality();
            tracing::debug!(
                reps = metrics.rep_count,
                depth = self.current_min,
                quality = metrics.rep_quality,
                "rep counted"
            );
            self.current_min = f32::INFINITY;
        }
        transition.rep_completed
    }

    /// 目標角度にどれだけ近づいたか
    pub fn depth_score(&self, deepest: f32) -> f32 {
        clamp_score(100.0 - (deepest - self.target_angle).max(0.0) * DEPTH_PENALTY_PER_DEGREE)
    }

    /// 可動域スコア。下降中は現在のレップ、それ以外は直前のレップの深さを使う。
    /// まだ何も分からなければ None
    pub fn range_score(&self, state: RepState) -> Option<f32> {
        let deepest = match state {
            RepState::Down if self.current_min.is_finite() => Some(self.current_min),
            _ => self.depths.back().copied(),
        };
        deepest.map(|d| self.depth_score(d))
    }

    /// 直近レップ群の深さのばらつきから一貫性スコア
    pub fn consistency(&self) -> f32 {
        if self.depths.len() < 2 {
            return 100.0;
        }
        let n = self.depths.len() as f32;
        let mean = self.depths.iter().sum::<f32>() / n;
        let variance = self.depths.iter().map(|d| (d - mean).powi(2)).sum::<f32>() / n;
        clamp_score(100.0 - 2.0 * variance.sqrt())
    }

    fn rep_quality(&self) -> f32 {
        let depth = self
            .depths
            .back()
            .map(|&d| self.depth_score(d))
            .unwrap_or(0.0);
        0.5 * depth + 0.5 * self.consistency()
    }
}
