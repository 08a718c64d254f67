//! Unread counter relative to the viewport.
//!
//! Counts snapshot deliveries that arrive while the user is scrolled away
//! from the newest message. One snapshot counts once, however many new
//! messages it carries.

/// Default distance from the end that still counts as "at bottom".
pub const DEFAULT_BOTTOM_THRESHOLD: f32 = 24.0;

/// Scroll position reported by the viewport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMetrics {
    /// Distance scrolled from the top
    pub offset: f32,
    /// Largest possible offset; zero when the content fits
    pub max_offset: f32,
}

impl ViewportMetrics {
    #[must_use]
    pub fn distance_to_bottom(self) -> f32 {
        (self.max_offset - self.offset).max(0.0)
    }
}

/// Counts snapshots that arrive while the user is scrolled away from the tail
#[derive(Debug, Clone)]
pub struct UnreadTracker {
    count: u32,
    at_bottom: bool,
    threshold: f32,
}

impl UnreadTracker {
    #[must_use]
    pub fn new(threshold: f32) -> Self {
        Self {
            count: 0,
            at_bottom: true,
            threshold: threshold.max(0.0),
        }
    }

    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub const fn is_at_bottom(&self) -> bool {
        self.at_bottom
    }

    /// Record one snapshot delivery.
    ///
    /// Returns true when the viewport sits at the bottom and should follow
    /// the new tail; otherwise the delivery is counted as unread.
    pub fn on_snapshot(&mut self) -> bool {
        if self.at_bottom {
            true
        } else {
            self.count = self.count.saturating_add(1);
            false
        }
    }

    /// Update from a scroll event. Coming within the threshold of the end
    /// resets the counter.
    pub fn on_viewport(&mut self, metrics: ViewportMetrics) {
        let at_bottom =
            metrics.max_offset <= 0.0 || metrics.distance_to_bottom() <= self.threshold;
        self.set_at_bottom(at_bottom);
    }

    pub fn set_at_bottom(&mut self, at_bottom: bool) {
        if at_bottom {
            self.reached_bottom();
        } else {
            self.at_bottom = false;
        }
    }

    /// Full reset; the only way the counter goes down.
    pub fn reached_bottom(&mut self) {
        if self.count > 0 {
            tracing::debug!(cleared = self.count, "Unread counter reset");
        }
        self.at_bottom = true;
        self.count = 0;
    }
}

impl Default for UnreadTracker {
    fn default() -> Self {
        Self::new(DEFAULT_BOTTOM_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrolled_up() -> ViewportMetrics {
        ViewportMetrics {
            offset: 100.0,
            max_offset: 900.0,
        }
    }

    #[test]
    fn starts_at_bottom_with_nothing_unread() {
        let tracker = UnreadTracker::default();
        assert_eq!(tracker.count(), 0);
        assert!(tracker.is_at_bottom());
    }

    #[test]
    fn counts_one_per_snapshot_while_away() {
        let mut tracker = UnreadTracker::default();
        tracker.on_viewport(scrolled_up());
        for _ in 0..3 {
            assert!(!tracker.on_snapshot());
        }
        assert_eq!(tracker.count(), 3);

        tracker.reached_bottom();
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn snapshots_at_bottom_follow_tail() {
        let mut tracker = UnreadTracker::default();
        assert!(tracker.on_snapshot());
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn viewport_near_end_resets() {
        let mut tracker = UnreadTracker::new(24.0);
        tracker.on_viewport(scrolled_up());
        tracker.on_snapshot();
        tracker.on_snapshot();

        tracker.on_viewport(ViewportMetrics {
            offset: 850.0,
            max_offset: 900.0,
        });
        assert_eq!(tracker.count(), 2);

        tracker.on_viewport(ViewportMetrics {
            offset: 880.0,
            max_offset: 900.0,
        });
        assert_eq!(tracker.count(), 0);
        assert!(tracker.is_at_bottom());
    }

    #[test]
    fn scrolling_without_reaching_bottom_never_decrements() {
        let mut tracker = UnreadTracker::default();
        tracker.on_viewport(scrolled_up());
        tracker.on_snapshot();
        tracker.on_snapshot();
        let before = tracker.count();

        for offset in [200.0, 50.0, 700.0, 400.0] {
            tracker.on_viewport(ViewportMetrics {
                offset,
                max_offset: 900.0,
            });
            assert_eq!(tracker.count(), before);
        }
    }

    #[test]
    fn content_that_fits_is_at_bottom() {
        let mut tracker = UnreadTracker::default();
        tracker.set_at_bottom(false);
        tracker.on_snapshot();
        tracker.on_viewport(ViewportMetrics {
            offset: 0.0,
            max_offset: 0.0,
        });
        assert_eq!(tracker.count(), 0);
    }
}
