//! 記録済みポーズ列 (JSON Lines) の再生
//!
//! 1行1フレーム: `{"timestamp_ms": 1234, "keypoints": [...], "score": 0.8}`。
//! `keypoints` が null のフレームは検出なしとして扱う。

use std::io::BufRead;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::metrics::Metrics;
use crate::pose::{Keypoint, Pose};
use crate::session::Session;

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFrame {
    pub timestamp_ms: u64,
    #[serde(default)]
    pub keypoints: Option<Vec<Keypoint>>,
    #[serde(default)]
    pub score: f32,
}

impl ReplayFrame {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line).context("invalid replay frame")
    }

    pub fn into_pose(self) -> Option<Pose> {
        self.keypoints.map(|keypoints| Pose::new(keypoints, self.score))
    }
}

/// 全フレームをセッションに流し込み、最終メトリクスを返す
///
/// 経過時間は最初のフレームのタイムスタンプからの差。空行は読み飛ばす。
pub fn replay<R: BufRead>(reader: R, session: &mut Session) -> Result<Metrics> {
    let mut first_ts = None;
    let mut frames = 0usize;
    let mut missed = 0usize;

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let frame = ReplayFrame::parse(&line).with_context(|| format!("line {}", line_no + 1))?;
        let start = *first_ts.get_or_insert(frame.timestamp_ms);
        let elapsed = Duration::from_millis(frame.timestamp_ms.saturating_sub(start));

        match frame.into_pose() {
            Some(pose) => {
                session.process_frame_at(&pose, elapsed);
            }
            None => {
                session.record_missed_frame_at(elapsed);
                missed += 1;
            }
        }
        frames += 1;
    }

    tracing::info!(frames, missed, reps = session.metrics().rep_count, "replay finished");
    Ok(session.metrics().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::exercise::squat::tests::squat_pose;
    use crate::exercise::ExerciseType;
    use std::io::Cursor;

    fn line(ts: u64, pose: Option<&Pose>) -> String {
        match pose {
            Some(pose) => serde_json::json!({
                "timestamp_ms": ts,
                "keypoints": pose.keypoints,
                "score": pose.score,
            })
            .to_string(),
            None => serde_json::json!({ "timestamp_ms": ts, "keypoints": null }).to_string(),
        }
    }

    #[test]
    fn test_replay_counts_squats() {
        let mut lines = Vec::new();
        let mut ts = 5_000;
        for _ in 0..2 {
            for angle in [180.0, 150.0, 120.0, 90.0, 120.0, 150.0, 180.0] {
                let pose = squat_pose(angle);
                for _ in 0..3 {
                    lines.push(line(ts, Some(&pose)));
                    ts += 50;
                }
            }
        }
        lines.push(String::new());
        lines.push(line(ts + 1_000, None));

        let mut session = Session::start(ExerciseType::Squat, &Config::default());
        let metrics = replay(Cursor::new(lines.join("\n")), &mut session).unwrap();
        assert_eq!(metrics.rep_count, 2);
        let expected = (ts + 1_000 - 5_000) as f64 / 1000.0;
        assert!((metrics.duration_seconds - expected).abs() < 1e-6);
    }

    #[test]
    fn test_unnamed_keypoints_use_index() {
        let line = r#"{"timestamp_ms": 0, "keypoints": [{"x": 1.0, "y": 2.0, "score": 0.9}]}"#;
        let frame = ReplayFrame::parse(line).unwrap();
        let pose = frame.into_pose().unwrap();
        let nose = pose.get(crate::pose::KeypointIndex::Nose).unwrap();
        assert_eq!((nose.x, nose.y, nose.confidence), (1.0, 2.0, 0.9));
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let mut session = Session::start(ExerciseType::Plank, &Config::default());
        let input = "{\"timestamp_ms\": 0, \"keypoints\": null}\nnot json\n";
        let err = replay(Cursor::new(input), &mut session).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }
}
