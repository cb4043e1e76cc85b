use std::collections::VecDeque;
use std::f32::consts::PI;

use crate::geometry::{angle_between, signed_angle, Vec2, EPSILON};

/// 円判定に必要な最小サンプル数
pub const MIN_CIRCLE_SAMPLES: usize = 8;
/// 半径の分散 / 半径² がこれ未満なら円とみなす
const CIRCLE_VARIANCE_RATIO: f32 = 0.2;

/// 関節位置の軌跡を保持するリングバッファ
#[derive(Debug, Clone)]
pub struct MotionHistory {
    samples: VecDeque<Vec2>,
    capacity: usize,
}

impl MotionHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// サンプルを追加し、容量を超えたら古いものから捨てる (FIFO)
    pub fn record(&mut self, point: Vec2) {
        self.samples.push_back(point);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn latest(&self) -> Option<Vec2> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec2> {
        self.samples.iter()
    }

    pub fn centroid(&self) -> Option<Vec2> {
        if self.samples.is_empty() {
            return None;
        }
        let sum = self.samples.iter().fold(Vec2::ZERO, |acc, p| acc.add(*p));
        Some(sum.scale(1.0 / self.samples.len() as f32))
    }

    /// バウンディングボックスの幅と高さの平均
    pub fn movement_range(&self) -> f32 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f32::INFINITY, f32::NEG_INFINITY);
        for p in &self.samples {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        ((max_x - min_x) + (max_y - min_y)) / 2.0
    }

    /// 1 - (連続する移動セグメント間の平均回転角 / π)
    ///
    /// 1.0 が最も滑らか。サンプルが4未満、または測れる回転がない場合は 1.0
    pub fn smoothness(&self) -> f32 {
        if self.samples.len() < 4 {
            return 1.0;
        }
        let segments: Vec<Vec2> = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|(a, b)| b.sub(*a))
            .filter(|s| s.length() >= EPSILON)
            .collect();

        let turns: Vec<f32> = segments
            .windows(2)
            .filter_map(|w| angle_between(w[0], w[1]))
            .collect();
        if turns.is_empty() {
            return 1.0;
        }
        let mean_turn = turns.iter().sum::<f32>() / turns.len() as f32;
        (1.0 - mean_turn / PI).clamp(0.0, 1.0)
    }

    /// 軌跡がループ状に分布しているか
    ///
    /// 重心からの半径のばらつきが小さく、かつ点が重心の周囲全体に分布している
    /// (角度順に並べた隣接点の最大ギャップが π 未満) 場合に true。
    /// 重心は弧の内側に寄るため、120度程度以上の弧でも true になりうる。
    /// 1周したかどうかは [`DirectionChangeCounter::closed_loop`] で確認する。
    pub fn is_circular(&self) -> bool {
        if self.samples.len() < MIN_CIRCLE_SAMPLES {
            return false;
        }
        let Some(center) = self.centroid() else {
            return false;
        };

        let radii: Vec<f32> = self.samples.iter().map(|p| p.distance(center)).collect();
        let n = radii.len() as f32;
        let mean_radius = radii.iter().sum::<f32>() / n;
        if mean_radius < EPSILON {
            return false;
        }
        let variance = radii.iter().map(|r| (r - mean_radius).powi(2)).sum::<f32>() / n;
        if variance / (mean_radius * mean_radius) >= CIRCLE_VARIANCE_RATIO {
            return false;
        }

        let mut angles: Vec<f32> = self
            .samples
            .iter()
            .map(|p| f32::atan2(p.y - center.y, p.x - center.x))
            .collect();
        angles.sort_by(|a, b| a.total_cmp(b));

        let mut max_gap = angles
            .windows(2)
            .map(|w| w[1] - w[0])
            .fold(0.0f32, f32::max);
        if let (Some(first), Some(last)) = (angles.first(), angles.last()) {
            max_gap = max_gap.max(first + 2.0 * PI - last);
        }
        max_gap < PI
    }
}

/// これより大きい回転は折り返しとみなし、周回角に加えない
const MAX_LOOP_TURN_RAD: f32 = 2.0 * PI / 3.0;
/// 1周とみなす累積回転角。最初と最後のサンプル間の欠けを許容する
pub const FULL_LOOP_RAD: f32 = 2.0 * PI - PI / 3.0;

/// 軌跡の方向転換を数えるカウンタ
///
/// Δx/Δy の符号反転、または直前の移動方向からの回転角がしきい値を超えたときに1増える。
/// 符号は直近の非ゼロ値と比べるので、極値でちょうど Δ=0 になっても反転を取りこぼさない。
/// 円運動を細かくサンプリングすると1周でおよそ4回になる。
///
/// 同時に移動方向の符号付き回転角を積算する。閉じた軌跡を1周すると ±2π になるので、
/// 部分的な弧と1周を区別できる。
#[derive(Debug, Clone)]
pub struct DirectionChangeCounter {
    threshold_rad: f32,
    min_step: f32,
    last_point: Option<Vec2>,
    last_step: Option<Vec2>,
    sign_x: f32,
    sign_y: f32,
    count: u32,
    turned: f32,
}

impl DirectionChangeCounter {
    pub fn new(threshold_deg: f32, min_step: f32) -> Self {
        Self {
            threshold_rad: threshold_deg.to_radians(),
            min_step: min_step.max(EPSILON),
            last_point: None,
            last_step: None,
            sign_x: 0.0,
            sign_y: 0.0,
            count: 0,
            turned: 0.0,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// 積算した移動方向の回転角 (ラジアン, 絶対値)
    pub fn swept(&self) -> f32 {
        self.turned.abs()
    }

    /// 直前の周期から軌跡が1周したか
    pub fn closed_loop(&self) -> bool {
        self.swept() >= FULL_LOOP_RAD
    }

    /// 新しい位置を観測する。方向転換と判定したら true
    pub fn observe(&mut self, point: Vec2) -> bool {
        let Some(last_point) = self.last_point else {
            self.last_point = Some(point);
            return false;
        };
        let step = point.sub(last_point);
        if step.length() < self.min_step || !step.is_finite() {
            // 微小な揺れは無視し、基準点も更新しない
            return false;
        }
        self.last_point = Some(point);

        let flipped = sign_flip(self.sign_x, step.x) || sign_flip(self.sign_y, step.y);
        let changed = match self.last_step.and_then(|prev| signed_angle(prev, step)) {
            Some(turn) => {
                if turn.abs() <= MAX_LOOP_TURN_RAD {
                    self.turned += turn;
                }
                flipped || turn.abs() > self.threshold_rad
            }
            None => false,
        };
        if step.x != 0.0 {
            self.sign_x = step.x.signum();
        }
        if step.y != 0.0 {
            self.sign_y = step.y.signum();
        }
        self.last_step = Some(step);
        if changed {
            self.count += 1;
        }
        changed
    }

    /// 1周期分を消費する
    ///
    /// 回数は0に戻し、回転角は1周分だけ差し引く。移動の基準点は保持するので、
    /// 続けて回している間は周期の区切りがずれない。
    pub fn finish_cycle(&mut self) {
        self.count = 0;
        if self.turned != 0.0 {
            self.turned -= 2.0 * PI * self.turned.signum();
        }
    }

    pub fn reset(&mut self) {
        self.last_point = None;
        self.last_step = None;
        self.sign_x = 0.0;
        self.sign_y = 0.0;
        self.count = 0;
        self.turned = 0.0;
    }
}

/// 直近の非ゼロの符号から反転したか
fn sign_flip(prev_sign: f32, cur: f32) -> bool {
    (prev_sign > 0.0 && cur < 0.0) || (prev_sign < 0.0 && cur > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle_points(n: usize, radius: f32, center: Vec2) -> Vec<Vec2> {
        (0..n)
            .map(|i| {
                let t = 2.0 * PI * i as f32 / n as f32;
                Vec2::new(center.x + radius * t.cos(), center.y + radius * t.sin())
            })
            .collect()
    }

    fn history_from(points: &[Vec2], capacity: usize) -> MotionHistory {
        let mut h = MotionHistory::new(capacity);
        for p in points {
            h.record(*p);
        }
        h
    }

    #[test]
    fn test_record_evicts_oldest() {
        let mut h = MotionHistory::new(3);
        for i in 0..5 {
            h.record(Vec2::new(i as f32, 0.0));
        }
        assert_eq!(h.len(), 3);
        let xs: Vec<f32> = h.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![2.0, 3.0, 4.0]);
        assert_eq!(h.latest(), Some(Vec2::new(4.0, 0.0)));
    }

    #[test]
    fn test_movement_range() {
        let h = history_from(&[Vec2::new(0.0, 0.0), Vec2::new(10.0, 4.0)], 10);
        assert!((h.movement_range() - 7.0).abs() < 1e-6);
        let single = history_from(&[Vec2::new(3.0, 3.0)], 10);
        assert_eq!(single.movement_range(), 0.0);
    }

    #[test]
    fn test_smoothness_straight_line() {
        let points: Vec<Vec2> = (0..6).map(|i| Vec2::new(i as f32, 0.0)).collect();
        let h = history_from(&points, 10);
        assert!((h.smoothness() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_smoothness_zigzag_is_rough() {
        let points: Vec<Vec2> = (0..8)
            .map(|i| Vec2::new(i as f32, if i % 2 == 0 { 0.0 } else { 5.0 }))
            .collect();
        let h = history_from(&points, 10);
        assert!(h.smoothness() < 0.5, "smoothness={}", h.smoothness());
    }

    #[test]
    fn test_smoothness_few_samples_or_stationary() {
        let few = history_from(&[Vec2::ZERO, Vec2::new(1.0, 1.0)], 10);
        assert_eq!(few.smoothness(), 1.0);
        let still = history_from(&[Vec2::ZERO; 6], 10);
        assert_eq!(still.smoothness(), 1.0);
    }

    #[test]
    fn test_circle_is_circular() {
        let points = circle_points(16, 10.0, Vec2::new(100.0, 100.0));
        let h = history_from(&points, 16);
        assert!(h.is_circular());
    }

    #[test]
    fn test_collinear_is_not_circular() {
        let points: Vec<Vec2> = (0..16).map(|i| Vec2::new(i as f32 * 2.0, 50.0)).collect();
        let h = history_from(&points, 16);
        assert!(!h.is_circular());
    }

    #[test]
    fn test_short_arc_is_not_circular() {
        // 90度の弧は重心から見ても片側に偏る
        let points: Vec<Vec2> = (0..10)
            .map(|i| {
                let t = PI / 2.0 * i as f32 / 9.0;
                Vec2::new(10.0 * t.cos(), 10.0 * t.sin())
            })
            .collect();
        let h = history_from(&points, 16);
        assert!(!h.is_circular());
    }

    #[test]
    fn test_stationary_is_not_circular() {
        let h = history_from(&[Vec2::new(5.0, 5.0); 12], 16);
        assert!(!h.is_circular());
    }

    #[test]
    fn test_too_few_samples_not_circular() {
        let points = circle_points(7, 10.0, Vec2::ZERO);
        let h = history_from(&points, 16);
        assert!(!h.is_circular());
    }

    #[test]
    fn test_direction_counter_one_revolution() {
        let mut counter = DirectionChangeCounter::new(45.0, 0.5);
        // 1周 + 最初の点に戻る
        let mut points = circle_points(32, 20.0, Vec2::ZERO);
        points.push(points[0]);
        for p in points {
            counter.observe(p);
        }
        assert!(
            (3..=5).contains(&counter.count()),
            "count={}",
            counter.count()
        );
    }

    #[test]
    fn test_direction_counter_straight_line_no_change() {
        let mut counter = DirectionChangeCounter::new(30.0, 0.5);
        for i in 0..20 {
            counter.observe(Vec2::new(i as f32 * 3.0, i as f32));
        }
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_direction_counter_ignores_jitter() {
        let mut counter = DirectionChangeCounter::new(30.0, 2.0);
        for i in 0..20 {
            let jitter = if i % 2 == 0 { 0.5 } else { -0.5 };
            counter.observe(Vec2::new(100.0 + jitter, 100.0 - jitter));
        }
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_direction_counter_keeps_sign_across_zero_step() {
        // Δx が一度 0 になってから負に転じても反転として数える
        let mut counter = DirectionChangeCounter::new(90.0, 0.5);
        for p in [(0.0, 0.0), (10.0, 5.0), (10.0, 10.0), (0.0, 15.0)] {
            counter.observe(Vec2::new(p.0, p.1));
        }
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_partial_arc_does_not_close_loop() {
        let mut counter = DirectionChangeCounter::new(45.0, 0.5);
        // 270度の弧
        for i in 0..28 {
            let t = 1.5 * PI * i as f32 / 27.0;
            counter.observe(Vec2::new(30.0 * t.cos(), 30.0 * t.sin()));
        }
        assert!(!counter.closed_loop(), "swept={}", counter.swept());
        assert!(counter.swept() > PI);
    }

    #[test]
    fn test_full_loop_and_finish_cycle() {
        let mut counter = DirectionChangeCounter::new(45.0, 0.5);
        let mut points = circle_points(32, 20.0, Vec2::ZERO);
        points.push(points[0]);
        for p in &points {
            counter.observe(*p);
        }
        assert!(counter.closed_loop(), "swept={}", counter.swept());

        counter.finish_cycle();
        assert_eq!(counter.count(), 0);
        assert!(!counter.closed_loop());

        // 続けてもう1周すると再び閉じる
        for p in points.iter().skip(1) {
            counter.observe(*p);
        }
        assert!(counter.closed_loop(), "swept={}", counter.swept());
    }

    #[test]
    fn test_back_and_forth_never_closes_loop() {
        let mut counter = DirectionChangeCounter::new(45.0, 0.5);
        for i in 0..200 {
            let x = 30.0 * (2.0 * PI * i as f32 / 20.0).sin();
            counter.observe(Vec2::new(x, 0.0));
        }
        assert!(counter.count() > 0);
        assert!(!counter.closed_loop());
    }

    #[test]
    fn test_direction_counter_reversal_and_reset() {
        let mut counter = DirectionChangeCounter::new(45.0, 0.5);
        counter.observe(Vec2::new(0.0, 0.0));
        counter.observe(Vec2::new(10.0, 0.0));
        assert!(counter.observe(Vec2::new(0.0, 0.0)));
        assert_eq!(counter.count(), 1);
        counter.reset();
        assert_eq!(counter.count(), 0);
    }
}
