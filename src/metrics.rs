use serde::Serialize;

use crate::exercise::ExerciseType;
use crate::geometry::clamp_score;
use crate::tracker::RepState;

/// 関節が見えないフレームで使う中立スコア
pub const NEUTRAL_SCORE: f32 = 50.0;

/// セッションの計測結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub exercise: ExerciseType,
    pub rep_state: RepState,
    pub rep_count: u32,
    /// 直近レップの質 (0〜100)
    pub rep_quality: f32,
    /// フォームスコア (0〜100)
    pub form_score: f32,
    /// 推定消費カロリー (kcal)
    pub calories: f64,
    /// セッション開始からの経過秒数
    pub duration_seconds: f64,
    /// 最後にレップを数えた時刻 (セッション開始からの秒数)
    pub last_rep_timestamp: f64,
    /// レップ間隔の平均 (秒)
    pub avg_rep_duration: f64,
    /// 直近フレームで検出したフォームの問題
    pub mistakes: Vec<String>,
}

impl Metrics {
    pub fn new(exercise: ExerciseType) -> Self {
        Self {
            exercise,
            rep_state: RepState::Up,
            rep_count: 0,
            rep_quality: 0.0,
            form_score: 0.0,
            calories: 0.0,
            duration_seconds: 0.0,
            last_rep_timestamp: 0.0,
            avg_rep_duration: 0.0,
            mistakes: Vec::new(),
        }
    }

    /// レップを1回記録し、レップ間隔の移動平均を更新する
    pub fn record_rep(&mut self, now: f64) {
        let interval = (now - self.last_rep_timestamp).max(0.0);
        self.rep_count += 1;
        let n = self.rep_count as f64;
        self.avg_rep_duration += (interval - self.avg_rep_duration) / n;
        self.last_rep_timestamp = now;
    }

    /// スコアを中立値にし、問題リストを空にする。レップ数と状態は変えない
    pub fn set_neutral(&mut self) {
        self.form_score = NEUTRAL_SCORE;
        self.rep_quality = NEUTRAL_SCORE;
        self.mistakes.clear();
    }

    pub fn scores_are_finite(&self) -> bool {
        self.form_score.is_finite() && self.rep_quality.is_finite()
    }

    pub fn clamp_scores(&mut self) {
        self.form_score = clamp_score(self.form_score);
        self.rep_quality = clamp_score(self.rep_quality);
    }

    /// 経過時間を更新し、カロリーを再計算する。経過時間は減らない
    pub fn update_clock(&mut self, elapsed_seconds: f64, body_weight_kg: f32) {
        if elapsed_seconds.is_finite() && elapsed_seconds > self.duration_seconds {
            self.duration_seconds = elapsed_seconds;
        }
        self.calories = estimate_calories(self.exercise, body_weight_kg, self.duration_seconds);
    }

    pub fn add_mistake(&mut self, mistake: &str) {
        self.mistakes.push(mistake.to_string());
    }
}

/// MET × 体重 × 時間 (h)
pub fn estimate_calories(
    exercise: ExerciseType,
    body_weight_kg: f32,
    duration_seconds: f64,
) -> f64 {
    let kcal = exercise.met() * body_weight_kg as f64 * duration_seconds / 3600.0;
    kcal.max(0.0)
}
