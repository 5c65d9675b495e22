//! Per-source clock state

use std::time::Instant;

/// Low-pass factor applied to the observed extrapolation error.
///
/// Absorbs small sample-rate and hardware timing errors without visible
/// jumps in the reported position.
const DRIFT_GAIN: f64 = 0.1;

/// One clock: "at `reference`, this source was at `pts_ms`"
///
/// Estimated position at time `t` is `pts_ms + (t − reference) + drift_ms`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StreamClock {
    pts_ms: f64,
    reference: Option<Instant>,
    drift_ms: f64,
    /// Raw PTS of the first frame ever seen for this stream-type.
    /// Set once per opened file; never reset by seeks.
    base_ms: Option<f64>,
}

impl StreamClock {
    /// Normalizes a raw stream PTS, recording the base on first sight
    pub fn normalize(&mut self, raw_pts_ms: f64) -> f64 {
        let base = *self.base_ms.get_or_insert(raw_pts_ms);
        raw_pts_ms - base
    }

    /// The normalization base, or 0 before the first frame
    pub fn base_ms(&self) -> f64 {
        self.base_ms.unwrap_or(0.0)
    }

    /// Records a new observation of this source's position
    ///
    /// While running, the difference between the observed position and
    /// the value extrapolated from the previous observation feeds the
    /// drift term.
    pub fn update(&mut self, raw_pts_ms: f64, now: Instant, running: bool) {
        let normalized = self.normalize(raw_pts_ms);

        if running {
            if let Some(reference) = self.reference {
                let expected = self.pts_ms + elapsed_ms(reference, now);
                self.drift_ms = DRIFT_GAIN * (normalized - expected);
            }
        }

        self.pts_ms = normalized;
        self.reference = Some(now);
    }

    /// Estimated position at `now`
    pub fn extrapolate(&self, now: Instant) -> f64 {
        match self.reference {
            Some(reference) => self.pts_ms + elapsed_ms(reference, now) + self.drift_ms,
            None => self.pts_ms,
        }
    }

    /// Repositions the clock after a seek
    ///
    /// Only the position, reference, and drift change; the normalization
    /// base survives so post-seek positions stay absolute.
    pub fn reset_for_seek(&mut self, target_ms: f64, now: Instant) {
        self.pts_ms = target_ms - self.base_ms();
        self.reference = Some(now);
        self.drift_ms = 0.0;
    }

    /// Shifts the reference forward by a pause interval
    pub fn shift_reference(&mut self, by: std::time::Duration) {
        if let Some(reference) = self.reference.as_mut() {
            *reference += by;
        }
    }
}

fn elapsed_ms(from: Instant, to: Instant) -> f64 {
    if to >= from {
        to.duration_since(from).as_secs_f64() * 1000.0
    } else {
        -(from.duration_since(to).as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_update_sets_base() {
        let mut clock = StreamClock::default();
        let now = Instant::now();
        clock.update(5000.0, now, true);
        assert_eq!(clock.base_ms(), 5000.0);
        assert!(clock.extrapolate(now).abs() < 1e-9);
    }

    #[test]
    fn test_extrapolation_advances_with_time() {
        let mut clock = StreamClock::default();
        let start = Instant::now();
        clock.update(0.0, start, true);
        let later = start + Duration::from_millis(250);
        assert!((clock.extrapolate(later) - 250.0).abs() < 1.0);
    }

    #[test]
    fn test_drift_is_low_passed() {
        let mut clock = StreamClock::default();
        let start = Instant::now();
        clock.update(0.0, start, true);

        // Source reports 10 ms ahead of where extrapolation expected.
        let next = start + Duration::from_millis(100);
        clock.update(110.0, next, true);
        assert!((clock.extrapolate(next) - 111.0).abs() < 0.5);
    }

    #[test]
    fn test_seek_reset_keeps_base() {
        let mut clock = StreamClock::default();
        let start = Instant::now();
        clock.update(5000.0, start, true);

        let seek_at = start + Duration::from_millis(10);
        clock.reset_for_seek(30_000.0, seek_at);
        assert_eq!(clock.base_ms(), 5000.0);
        assert!((clock.extrapolate(seek_at) - 25_000.0).abs() < 1e-6);
    }
}
