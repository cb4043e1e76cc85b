use serde::Serialize;

use crate::config::RenderConfig;
use crate::exercise::ExerciseType;
use crate::geometry::{angle_degrees, Vec2};
use crate::metrics::Metrics;
use crate::pose::Pose;
use crate::report::format_duration;

use super::skeleton::{
    key_angles, ANGLE_COLOR, KEYPOINT_COLOR, LOW_CONFIDENCE_COLOR, SKELETON_COLOR,
    SKELETON_CONNECTIONS, TEXT_COLOR, WARNING_COLOR,
};

/// 角度表示の円弧の半径 (ピクセル)
const ANGLE_ARC_RADIUS: f32 = 24.0;
const HUD_ORIGIN: Vec2 = Vec2 { x: 12.0, y: 24.0 };
const HUD_LINE_HEIGHT: f32 = 22.0;

/// 描画命令。座標は画像のピクセル座標、色は 0xRRGGBB
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawPrimitive {
    Point { at: Vec2, radius: f32, color: u32 },
    Line { from: Vec2, to: Vec2, color: u32 },
    /// `start` から `end` まで (ラジアン、画像座標系) の短い方の弧
    Arc { center: Vec2, radius: f32, start: f32, end: f32, color: u32 },
    Text { at: Vec2, text: String, color: u32 },
}

/// 骨格と種目ごとの関節角度を描画する
pub fn draw_overlay(
    pose: &Pose,
    exercise: ExerciseType,
    config: &RenderConfig,
) -> Vec<DrawPrimitive> {
    let threshold = config.confidence_threshold;
    let mut out = Vec::new();

    for (a, b) in SKELETON_CONNECTIONS.iter() {
        let ends = (pose.get_valid(*a, threshold), pose.get_valid(*b, threshold));
        if let (Some(start), Some(end)) = ends {
            out.push(DrawPrimitive::Line {
                from: start.position(),
                to: end.position(),
                color: SKELETON_COLOR,
            });
        }
    }

    for kp in pose.keypoints.iter().filter(|kp| kp.position().is_finite()) {
        let color = if kp.is_valid(threshold) {
            KEYPOINT_COLOR
        } else {
            LOW_CONFIDENCE_COLOR
        };
        out.push(DrawPrimitive::Point {
            at: kp.position(),
            radius: config.point_radius,
            color,
        });
    }

    for &(a, b, c) in key_angles(exercise) {
        let (Some(a), Some(b), Some(c)) = (
            pose.get_valid(a, threshold),
            pose.get_valid(b, threshold),
            pose.get_valid(c, threshold),
        ) else {
            continue;
        };
        let (a, b, c) = (a.position(), b.position(), c.position());
        let angle = angle_degrees(a, b, c);
        let start = (a.y - b.y).atan2(a.x - b.x);
        let end = (c.y - b.y).atan2(c.x - b.x);
        out.push(DrawPrimitive::Arc {
            center: b,
            radius: ANGLE_ARC_RADIUS,
            start,
            end,
            color: ANGLE_COLOR,
        });
        out.push(DrawPrimitive::Text {
            at: Vec2::new(b.x + ANGLE_ARC_RADIUS, b.y - ANGLE_ARC_RADIUS / 2.0),
            text: format!("{:.0}°", angle),
            color: ANGLE_COLOR,
        });
    }
    out
}

/// 画面左上に表示するメトリクス
pub fn draw_hud(metrics: &Metrics) -> Vec<DrawPrimitive> {
    let title = metrics.exercise.display_name().to_string();
    let mut lines: Vec<(String, u32)> = vec![(title, TEXT_COLOR)];
    if metrics.exercise.is_timed() {
        lines.push((format!("Hold: {}", format_duration(metrics.duration_seconds)), TEXT_COLOR));
    } else {
        lines.push((format!("Reps: {}", metrics.rep_count), TEXT_COLOR));
    }
    lines.push((format!("Form: {:.0}%", metrics.form_score), TEXT_COLOR));
    lines.push((format!("Calories: {:.1} kcal", metrics.calories), TEXT_COLOR));
    for mistake in &metrics.mistakes {
        lines.push((mistake.clone(), WARNING_COLOR));
    }

    lines
        .into_iter()
        .enumerate()
        .map(|(i, (text, color))| DrawPrimitive::Text {
            at: Vec2::new(HUD_ORIGIN.x, HUD_ORIGIN.y + i as f32 * HUD_LINE_HEIGHT),
            text,
            color,
        })
        .collect()
}
