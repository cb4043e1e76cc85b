use crate::config::StabilizerConfig;
use crate::pose::{Keypoint, KeypointIndex, Pose};

/// キーポイント位置のEMA平滑化フィルタ
///
/// 平滑化係数αは信頼度に応じて変わる。信頼度が高いほどαが小さく、新しい観測を強く信頼する。
/// 出力 = lerp(prev, current, 1 - α)
pub struct Stabilizer {
    min_confidence: f32,
    min_alpha: f32,
    max_alpha: f32,
    prev: Option<Pose>,
}

impl Stabilizer {
    pub fn new(min_confidence: f32, min_alpha: f32, max_alpha: f32) -> Self {
        Self {
            min_confidence,
            min_alpha: min_alpha.clamp(0.0, 1.0),
            max_alpha: max_alpha.clamp(0.0, 1.0),
            prev: None,
        }
    }

    pub fn from_config(config: &StabilizerConfig) -> Self {
        Self::new(config.min_confidence, config.min_alpha, config.max_alpha)
    }

    /// 信頼度から平滑化係数を求める
    pub fn alpha_for(&self, confidence: f32) -> f32 {
        let c = confidence.clamp(0.0, 1.0);
        (self.max_alpha - (self.max_alpha - self.min_alpha) * c)
            .clamp(self.min_alpha.min(self.max_alpha), self.max_alpha.max(self.min_alpha))
    }

    pub fn apply(&mut self, pose: &Pose) -> Pose {
        let result = match &self.prev {
            Some(prev) if prev.keypoints.len() == pose.keypoints.len() => {
                let keypoints = pose
                    .keypoints
                    .iter()
                    .enumerate()
                    .map(|(i, cur)| match previous_of(prev, i, cur) {
                        Some(prev) => self.smooth_keypoint(cur, prev),
                        None => *cur,
                    })
                    .collect();
                Pose::new(keypoints, pose.score)
            }
            _ => pose.clone(),
        };
        self.prev = Some(result.clone());
        result
    }

    fn smooth_keypoint(&self, cur: &Keypoint, prev: &Keypoint) -> Keypoint {
        if !cur.is_valid(self.min_confidence) || !prev.is_valid(self.min_confidence) {
            return *cur;
        }
        let alpha = self.alpha_for(cur.confidence);
        let position = prev.position().lerp(cur.position(), 1.0 - alpha);
        if !position.is_finite() {
            return *cur;
        }
        Keypoint {
            x: position.x,
            y: position.y,
            ..*cur
        }
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}

/// 前フレームから同じ関節を探す。名前がなければ位置から関節を決める
fn previous_of<'a>(prev: &'a Pose, position: usize, cur: &Keypoint) -> Option<&'a Keypoint> {
    match cur.name.or_else(|| KeypointIndex::from_index(position)) {
        Some(index) => prev.get(index),
        None => prev.keypoints.get(position).filter(|kp| kp.name.is_none()),
    }
}

impl Default for Stabilizer {
    fn default() -> Self {
        Self::from_config(&StabilizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    fn single(x: f32, y: f32, confidence: f32) -> Pose {
        Pose::new(vec![Keypoint::named(KeypointIndex::Nose, x, y, confidence)], confidence)
    }

    #[test]
    fn test_first_frame_passthrough() {
        let mut s = Stabilizer::default();
        let pose = single(10.0, 20.0, 0.9);
        assert_eq!(s.apply(&pose), pose);
    }

    #[test]
    fn test_alpha_decreases_with_confidence() {
        let s = Stabilizer::new(0.1, 0.1, 0.6);
        assert!(approx_eq(s.alpha_for(0.0), 0.6, 1e-6));
        assert!(approx_eq(s.alpha_for(1.0), 0.1, 1e-6));
        assert!(s.alpha_for(0.9) < s.alpha_for(0.3));
    }

    #[test]
    fn test_position_smoothing() {
        let mut s = Stabilizer::new(0.1, 0.5, 0.5);
        s.apply(&single(0.0, 0.0, 0.9));
        let result = s.apply(&single(10.0, 20.0, 0.9));
        // α=0.5 → 中点
        assert!(approx_eq(result.keypoints[0].x, 5.0, 1e-5));
        assert!(approx_eq(result.keypoints[0].y, 10.0, 1e-5));
        assert_eq!(result.keypoints[0].confidence, 0.9);
    }

    #[test]
    fn test_high_confidence_tracks_closer() {
        let mut low = Stabilizer::default();
        let mut high = Stabilizer::default();
        low.apply(&single(0.0, 0.0, 0.3));
        high.apply(&single(0.0, 0.0, 0.95));
        let r_low = low.apply(&single(100.0, 0.0, 0.3));
        let r_high = high.apply(&single(100.0, 0.0, 0.95));
        assert!(r_high.keypoints[0].x > r_low.keypoints[0].x);
    }

    #[test]
    fn test_low_confidence_not_smoothed() {
        let mut s = Stabilizer::new(0.1, 0.5, 0.5);
        s.apply(&single(0.0, 0.0, 0.9));
        let current = single(10.0, 20.0, 0.05);
        let result = s.apply(&current);
        assert_eq!(result, current);
    }

    #[test]
    fn test_length_mismatch_passthrough() {
        let mut s = Stabilizer::default();
        s.apply(&single(0.0, 0.0, 0.9));
        let two = Pose::new(
            vec![Keypoint::new(5.0, 5.0, 0.9), Keypoint::new(6.0, 6.0, 0.9)],
            0.9,
        );
        assert_eq!(s.apply(&two), two);
    }

    #[test]
    fn test_pairs_keypoints_by_name() {
        let mut s = Stabilizer::new(0.1, 0.5, 0.5);
        s.apply(&Pose::new(
            vec![
                Keypoint::named(KeypointIndex::Nose, 0.0, 0.0, 0.9),
                Keypoint::named(KeypointIndex::LeftHip, 500.0, 500.0, 0.9),
            ],
            0.9,
        ));
        // 同じ関節が逆順で届く
        let result = s.apply(&Pose::new(
            vec![
                Keypoint::named(KeypointIndex::LeftHip, 500.0, 500.0, 0.9),
                Keypoint::named(KeypointIndex::Nose, 10.0, 0.0, 0.9),
            ],
            0.9,
        ));
        let hip = result.get(KeypointIndex::LeftHip).unwrap();
        assert_eq!((hip.x, hip.y), (500.0, 500.0));
        let nose = result.get(KeypointIndex::Nose).unwrap();
        assert!(approx_eq(nose.x, 5.0, 1e-5));
    }

    #[test]
    fn test_joint_missing_from_previous_frame_passes_through() {
        let mut s = Stabilizer::new(0.1, 0.5, 0.5);
        s.apply(&Pose::new(
            vec![
                Keypoint::named(KeypointIndex::Nose, 0.0, 0.0, 0.9),
                Keypoint::named(KeypointIndex::LeftHip, 500.0, 500.0, 0.9),
            ],
            0.9,
        ));
        let result = s.apply(&Pose::new(
            vec![
                Keypoint::named(KeypointIndex::Nose, 10.0, 0.0, 0.9),
                Keypoint::named(KeypointIndex::RightKnee, 300.0, 300.0, 0.9),
            ],
            0.9,
        ));
        assert!(approx_eq(result.keypoints[0].x, 5.0, 1e-5));
        assert_eq!(result.keypoints[1].x, 300.0);
    }

    #[test]
    fn test_never_produces_nan() {
        let mut s = Stabilizer::default();
        s.apply(&single(f32::MAX, 0.0, 0.9));
        let result = s.apply(&single(-f32::MAX, 0.0, 0.9));
        assert!(result.keypoints[0].x.is_finite());
    }

    #[test]
    fn test_reset() {
        let mut s = Stabilizer::new(0.1, 0.9, 0.9);
        s.apply(&single(0.0, 0.0, 0.9));
        s.reset();
        let pose = single(50.0, 50.0, 0.9);
        assert_eq!(s.apply(&pose), pose);
    }
}
