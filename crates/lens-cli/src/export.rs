//! Best-window export: score a warm-up run, pick the strongest window and
//! name it by its signature.

use serde::Serialize;

/// Score weight of H; S gets the remainder.
const SCORE_H: f64 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub t: f64,
    pub h: f64,
    pub s: f64,
    pub score: f64,
}

impl TimelinePoint {
    pub fn new(t: f64, h: f64, s: f64) -> Self {
        Self {
            t,
            h,
            s,
            score: SCORE_H * h + (1.0 - SCORE_H) * s,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BestWindow {
    pub start_t: f64,
    pub avg: f64,
    pub duration: f64,
}

impl BestWindow {
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_t && t <= self.start_t + self.duration
    }
}

/// Window of `duration` seconds with the highest mean score, using a
/// two-pointer sweep over the time-ordered timeline. `None` with fewer than
/// two points.
pub fn find_best_window(timeline: &[TimelinePoint], duration: f64) -> Option<BestWindow> {
    if timeline.len() < 2 {
        return None;
    }
    let mut best = BestWindow {
        start_t: timeline[0].t,
        avg: f64::NEG_INFINITY,
        duration,
    };
    let mut sum = 0.0;
    let mut j = 0;
    for (i, point) in timeline.iter().enumerate() {
        let end_t = point.t + duration;
        while j < timeline.len() && timeline[j].t <= end_t {
            sum += timeline[j].score;
            j += 1;
        }
        let count = j.saturating_sub(i).max(1);
        let avg = sum / count as f64;
        if avg > best.avg {
            best = BestWindow {
                start_t: point.t,
                avg,
                duration,
            };
        }
        sum -= point.score;
    }
    Some(best)
}

/// Highest H and S inside the window.
pub fn window_peaks(timeline: &[TimelinePoint], window: &BestWindow) -> (f64, f64) {
    timeline
        .iter()
        .filter(|p| window.contains(p.t))
        .fold((0.0, 0.0), |(ph, ps), p| (f64::max(ph, p.h), f64::max(ps, p.s)))
}

/// `A{avg}_H{peakH}_S{peakS}` with each value scaled by 1000 and rounded.
pub fn signature(window: &BestWindow, peak_h: f64, peak_s: f64) -> String {
    format!(
        "A{}_H{}_S{}",
        (window.avg * 1000.0).round() as i64,
        (peak_h * 1000.0).round() as i64,
        (peak_s * 1000.0).round() as i64
    )
}
