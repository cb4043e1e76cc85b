//! セッション終了時のテキストレポート

use std::fmt::Write;

use crate::exercise::ExerciseType;
use crate::metrics::Metrics;

const LOW_FORM: f32 = 70.0;
const HIGH_FORM: f32 = 90.0;
const SHORT_HOLD_SECS: f64 = 30.0;
const LONG_HOLD_SECS: f64 = 60.0;
const FEW_REPS: u32 = 10;
const MANY_REPS: u32 = 20;

/// `Xm YYs`
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0).round() as u64 } else { 0 };
    format!("{}m {:02}s", total / 60, total % 60)
}

fn format_reps(count: u32) -> String {
    if count == 1 {
        "1 rep".to_string()
    } else {
        format!("{} reps", count)
    }
}

/// 成績に応じたアドバイス
pub fn recommendations(metrics: &Metrics, exercise: ExerciseType) -> Vec<String> {
    let mut recs = Vec::new();

    if metrics.form_score < LOW_FORM {
        recs.push("Focus on form: slow down and control each movement".to_string());
    } else if metrics.form_score >= HIGH_FORM {
        recs.push("Excellent form! Consider increasing the difficulty".to_string());
    } else {
        recs.push("Good form. Keep refining your technique".to_string());
    }

    if exercise.is_timed() {
        if metrics.duration_seconds < SHORT_HOLD_SECS {
            recs.push("Work on building up your hold time toward 30 seconds".to_string());
        } else if metrics.duration_seconds >= LONG_HOLD_SECS {
            recs.push("Great endurance! Try longer holds or a harder variation".to_string());
        }
    } else if metrics.rep_count < FEW_REPS {
        recs.push(format!("Build endurance: aim for at least {} reps", FEW_REPS));
    } else if metrics.rep_count >= MANY_REPS {
        recs.push("Strong set! Consider adding another set".to_string());
    }

    if !metrics.mistakes.is_empty() {
        recs.push("Review the mistakes above and correct them in your next session".to_string());
    }
    recs
}

/// メトリクスを人が読むレポートにする
pub fn generate_report(metrics: &Metrics, exercise: ExerciseType) -> String {
    let mut out = String::new();
    // String への書き込みは失敗しない
    let _ = writeln!(out, "Exercise Report: {}", exercise.display_name());
    let _ = writeln!(out);

    if exercise.is_timed() {
        let _ = writeln!(out, "Duration held: {}", format_duration(metrics.duration_seconds));
    } else {
        let _ = writeln!(out, "Repetitions: {}", format_reps(metrics.rep_count));
        let _ = writeln!(out, "Average rep duration: {:.1}s", metrics.avg_rep_duration);
    }
    let _ = writeln!(out, "Form quality: {:.0}%", metrics.form_score);
    let _ = writeln!(out, "Calories burned: {:.1} kcal", metrics.calories);
    let _ = writeln!(out, "Total duration: {}", format_duration(metrics.duration_seconds));

    if !metrics.mistakes.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Mistakes:");
        for mistake in &metrics.mistakes {
            let _ = writeln!(out, "  - {}", mistake);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Recommendations:");
    for rec in recommendations(metrics, exercise) {
        let _ = writeln!(out, "  - {}", rec);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squat_metrics() -> Metrics {
        let mut m = Metrics::new(ExerciseType::Squat);
        m.rep_count = 12;
        m.form_score = 85.0;
        m.duration_seconds = 125.0;
        m.calories = 7.3;
        m.avg_rep_duration = 3.2;
        m
    }

    #[test]
    fn test_squat_report() {
        let report = generate_report(&squat_metrics(), ExerciseType::Squat);
        assert!(report.starts_with("Exercise Report: Squats"));
        assert!(report.contains("12 reps"));
        assert!(report.contains("85%"));
        assert!(report.contains("7.3 kcal"));
        assert!(report.contains("2m 05s"));
        assert!(report.contains("Average rep duration: 3.2s"));
        assert!(!report.contains("Mistakes:"));
        assert!(report.contains("Keep refining"));
    }

    #[test]
    fn test_plank_report_uses_hold_time() {
        let mut m = Metrics::new(ExerciseType::Plank);
        m.duration_seconds = 75.0;
        m.form_score = 92.0;
        let report = generate_report(&m, ExerciseType::Plank);
        assert!(report.contains("Duration held: 1m 15s"));
        assert!(!report.contains("Repetitions"));
        assert!(!report.contains("Average rep duration"));
        assert!(report.contains("increasing the difficulty"));
        assert!(report.contains("longer holds"));
    }

    #[test]
    fn test_mistakes_listed() {
        let mut m = squat_metrics();
        m.add_mistake("Keep your chest up");
        let report = generate_report(&m, ExerciseType::Squat);
        assert!(report.contains("Mistakes:\n  - Keep your chest up"));
        assert!(report.contains("Review the mistakes above"));
    }

    #[test]
    fn test_singular_rep() {
        let mut m = Metrics::new(ExerciseType::PushUp);
        m.rep_count = 1;
        let report = generate_report(&m, ExerciseType::PushUp);
        assert!(report.contains("Repetitions: 1 rep\n"));
    }

    #[test]
    fn test_recommendation_rules() {
        let mut m = Metrics::new(ExerciseType::PushUp);
        m.form_score = 50.0;
        m.rep_count = 3;
        let recs = recommendations(&m, ExerciseType::PushUp);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].starts_with("Focus on form"));
        assert!(recs[1].starts_with("Build endurance"));

        m.form_score = 80.0;
        m.rep_count = 25;
        let recs = recommendations(&m, ExerciseType::PushUp);
        assert!(recs[1].contains("another set"));

        // 10〜19 レップは回数についての指摘なし
        m.rep_count = 15;
        assert_eq!(recommendations(&m, ExerciseType::PushUp).len(), 1);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0m 00s");
        assert_eq!(format_duration(59.6), "1m 00s");
        assert_eq!(format_duration(3725.0), "62m 05s");
        assert_eq!(format_duration(f64::NAN), "0m 00s");
    }
}
