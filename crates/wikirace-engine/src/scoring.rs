//! The scoring calculator. Pure functions of a player's progress and the
//! room rules; no clocks, no I/O.

use wikirace_protocol::{Metric, PlayerProgress, Rules};

/// Scores a finished player's round under the room's metric.
pub fn score(progress: &PlayerProgress, rules: &Rules) -> i32 {
    match rules.metric {
        Metric::Clicks => score_clicks(progress.clicks),
        Metric::Time => score_time(progress.time_taken, rules.time_limit),
        Metric::Combined => ceil_half(
            score_clicks(progress.clicks) + score_time(progress.time_taken, rules.time_limit),
        ),
        Metric::Unknown => {
            tracing::warn!("unknown scoring metric, falling back to clicks");
            score_clicks(progress.clicks)
        }
    }
}

/// 100 points for a one-click finish, 10 points less per extra click,
/// floored at 10 for ten clicks or more.
pub fn score_clicks(clicks: u32) -> i32 {
    10 * (11 - clicks.min(10) as i32)
}

/// 100 points for an instant finish, scaling down to 10 at the deadline.
///
/// Deliberately unclamped: a finish reported after the nominal deadline
/// (late click, network delay) goes negative rather than being silently
/// rounded up.
pub fn score_time(time_taken: u64, time_limit: u64) -> i32 {
    if time_limit == 0 {
        return 10;
    }
    let remaining_fraction = 1.0 - time_taken as f64 / time_limit as f64;
    10 + (90.0 * remaining_fraction).ceil() as i32
}

/// Ceiling of `sum / 2`, correct for negative sums too.
fn ceil_half(sum: i32) -> i32 {
    (sum + 1).div_euclid(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(clicks: u32, time_taken: u64) -> PlayerProgress {
        PlayerProgress {
            clicks,
            time_taken,
            ..PlayerProgress::seeded("Start")
        }
    }

    fn rules(metric: Metric, time_limit: u64) -> Rules {
        Rules {
            metric,
            time_limit,
            ..Rules::default()
        }
    }

    #[test]
    fn test_score_clicks_three_clicks_is_eighty() {
        assert_eq!(score_clicks(3), 80);
    }

    #[test]
    fn test_score_clicks_is_non_increasing_and_floors_at_ten() {
        let mut previous = i32::MAX;
        for clicks in 1..=10 {
            let s = score_clicks(clicks);
            assert!(s < previous, "score must strictly decrease up to 10 clicks");
            previous = s;
        }
        assert_eq!(score_clicks(10), 10);
        assert_eq!(score_clicks(11), 10);
        assert_eq!(score_clicks(500), 10);
    }

    #[test]
    fn test_score_time_spans_hundred_down_to_ten() {
        assert_eq!(score_time(0, 120), 100);
        assert_eq!(score_time(60, 120), 55);
        assert_eq!(score_time(120, 120), 10);
    }

    #[test]
    fn test_score_time_goes_negative_past_the_deadline() {
        // A finish reported after the limit is not clamped.
        assert_eq!(score_time(200, 100), -80);
    }

    #[test]
    fn test_score_combined_takes_ceiling_of_average() {
        // clicks=3 → 80, time 41/120 → 10 + ceil(90*79/120) = 10 + 60 = 70.
        // combined = ceil((80 + 70) / 2) = 75.
        let s = score(&progress(3, 41), &rules(Metric::Combined, 120));
        assert_eq!(s, 75);
    }

    #[test]
    fn test_score_unknown_metric_falls_back_to_clicks() {
        let s = score(&progress(4, 10), &rules(Metric::Unknown, 120));
        assert_eq!(s, score_clicks(4));
    }

    #[test]
    fn test_score_dispatches_on_metric() {
        let p = progress(2, 30);
        assert_eq!(score(&p, &rules(Metric::Clicks, 120)), 90);
        assert_eq!(score(&p, &rules(Metric::Time, 120)), 78);
    }

    #[test]
    fn test_ceil_half_rounds_toward_positive_infinity() {
        assert_eq!(ceil_half(5), 3);
        assert_eq!(ceil_half(4), 2);
        assert_eq!(ceil_half(-3), -1);
    }
}
