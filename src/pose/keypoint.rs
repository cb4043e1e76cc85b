use serde::{Deserialize, Serialize};

use crate::geometry::Vec2;

/// COCO / MoveNet の 17 キーポイント
///
/// 名前が付いていないキーポイントは、この並び順のインデックスで解決される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;

    pub const ALL: [KeypointIndex; KeypointIndex::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.name() == name)
    }

    /// 外部の姿勢推定器が使う名前 (snake_case)
    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    /// キーポイント名。None の場合は Pose 内の位置で解決する
    #[serde(default)]
    pub name: Option<KeypointIndex>,
    /// X座標 (ピクセル)
    pub x: f32,
    /// Y座標 (ピクセル)
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    #[serde(alias = "score")]
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self {
            name: None,
            x,
            y,
            confidence,
        }
    }

    pub fn named(name: KeypointIndex, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            name: Some(name),
            x,
            y,
            confidence,
        }
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl Default for Keypoint {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

/// 1フレーム分の姿勢
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
    /// 検出全体の信頼度
    #[serde(default)]
    pub score: f32,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>, score: f32) -> Self {
        Self { keypoints, score }
    }

    /// 17要素の配列から、インデックス順の名前付き Pose を作る
    pub fn from_array(keypoints: [Keypoint; KeypointIndex::COUNT]) -> Self {
        let keypoints: Vec<Keypoint> = keypoints
            .iter()
            .zip(KeypointIndex::ALL)
            .map(|(kp, index)| Keypoint {
                name: Some(index),
                ..*kp
            })
            .collect();
        let score = average(keypoints.iter().map(|k| k.confidence));
        Self { keypoints, score }
    }

    /// 名前でキーポイントを探し、見つからなければ名前なしの同位置キーポイントを使う
    pub fn get(&self, index: KeypointIndex) -> Option<&Keypoint> {
        if let Some(kp) = self.keypoints.iter().find(|k| k.name == Some(index)) {
            return Some(kp);
        }
        self.keypoints
            .get(index as usize)
            .filter(|kp| kp.name.is_none())
    }

    /// 信頼度が閾値以上の場合のみ返す
    pub fn get_valid(&self, index: KeypointIndex, threshold: f32) -> Option<&Keypoint> {
        self.get(index).filter(|kp| kp.is_valid(threshold))
    }

    /// 全キーポイントの平均信頼度
    pub fn average_confidence(&self) -> f32 {
        average(self.keypoints.iter().map(|k| k.confidence))
    }
}

fn average(values: impl Iterator<Item = f32>) -> f32 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}
