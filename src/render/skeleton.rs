use crate::exercise::ExerciseType;
use crate::pose::KeypointIndex::{self, *};

/// 骨格の接続定義 (COCO 17点の標準的な16本)
pub const SKELETON_CONNECTIONS: [(KeypointIndex, KeypointIndex); 16] = [
    // 顔
    (LeftEar, LeftEye),
    (LeftEye, Nose),
    (Nose, RightEye),
    (RightEye, RightEar),
    // 上半身
    (LeftShoulder, RightShoulder),
    (LeftShoulder, LeftElbow),
    (LeftElbow, LeftWrist),
    (RightShoulder, RightElbow),
    (RightElbow, RightWrist),
    // 胴体
    (LeftShoulder, LeftHip),
    (RightShoulder, RightHip),
    (LeftHip, RightHip),
    // 下半身
    (LeftHip, LeftKnee),
    (LeftKnee, LeftAnkle),
    (RightHip, RightKnee),
    (RightKnee, RightAnkle),
];

/// キーポイントの色 (RGB)
pub const KEYPOINT_COLOR: u32 = 0x00FF00;
pub const SKELETON_COLOR: u32 = 0xFFFF00;
pub const LOW_CONFIDENCE_COLOR: u32 = 0xFF0000;
/// 種目で注目する関節角度の色
pub const ANGLE_COLOR: u32 = 0x00FFFF;
pub const TEXT_COLOR: u32 = 0xFFFFFF;
pub const WARNING_COLOR: u32 = 0xFF8000;

pub type AngleJoints = (KeypointIndex, KeypointIndex, KeypointIndex);

const ELBOWS: &[AngleJoints] = &[
    (LeftShoulder, LeftElbow, LeftWrist),
    (RightShoulder, RightElbow, RightWrist),
];
const KNEES: &[AngleJoints] = &[(LeftHip, LeftKnee, LeftAnkle), (RightHip, RightKnee, RightAnkle)];
const BODY_LINE: &[AngleJoints] = &[
    (LeftShoulder, LeftHip, LeftAnkle),
    (RightShoulder, RightHip, RightAnkle),
];
const HIPS: &[AngleJoints] = &[
    (LeftShoulder, LeftHip, LeftKnee),
    (RightShoulder, RightHip, RightKnee),
];

/// 種目ごとに角度を表示する関節 (端点, 頂点, 端点)
pub fn key_angles(exercise: ExerciseType) -> &'static [AngleJoints] {
    match exercise {
        ExerciseType::PushUp | ExerciseType::ArmCircle | ExerciseType::WristRotation => ELBOWS,
        ExerciseType::Squat => KNEES,
        ExerciseType::Plank => BODY_LINE,
        ExerciseType::HipCircle => HIPS,
    }
}
