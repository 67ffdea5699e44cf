/// Frame timing over one-second windows, for the performance overlay.
#[derive(Debug, Clone)]
pub struct FrameStats {
    frame_count: u32,
    accumulated_ms: f64,
    pub frame_ms: f64,
    pub current_fps: f32,
    pub min_fps: f32,
    pub max_fps: f32,
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStats {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            accumulated_ms: 0.0,
            frame_ms: 0.0,
            current_fps: 0.0,
            min_fps: f32::INFINITY,
            max_fps: 0.0,
        }
    }

    /// Record one frame of `dt_ms`. Returns the new FPS when a one-second
    /// window closes.
    pub fn record(&mut self, dt_ms: f64) -> Option<f32> {
        self.frame_ms = dt_ms;
        self.frame_count += 1;
        self.accumulated_ms += dt_ms;

        if self.accumulated_ms >= 1000.0 {
            self.current_fps = (self.frame_count as f64 * 1000.0 / self.accumulated_ms) as f32;
            self.min_fps = self.min_fps.min(self.current_fps);
            self.max_fps = self.max_fps.max(self.current_fps);

            self.accumulated_ms = 0.0;
            self.frame_count = 0;

            return Some(self.current_fps);
        }

        None
    }

    /// Overlay text, e.g. `60 FPS (58-61)`.
    pub fn label(&self) -> String {
        if self.min_fps.is_infinite() {
            return "-- FPS".to_string();
        }
        format!(
            "{:.0} FPS ({:.0}-{:.0})",
            self.current_fps, self.min_fps, self.max_fps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_once_per_second() {
        let mut stats = FrameStats::new();
        let mut reports = Vec::new();
        for _ in 0..100 {
            if let Some(fps) = stats.record(20.0) {
                reports.push(fps);
            }
        }
        assert_eq!(reports, vec![50.0, 50.0]);
    }

    #[test]
    fn test_min_max_track_windows() {
        let mut stats = FrameStats::new();
        for _ in 0..25 {
            stats.record(40.0);
        }
        for _ in 0..50 {
            stats.record(20.0);
        }
        assert_eq!(stats.min_fps, 25.0);
        assert_eq!(stats.max_fps, 50.0);
        assert_eq!(stats.label(), "50 FPS (25-50)");
    }

    #[test]
    fn test_label_before_first_window() {
        let mut stats = FrameStats::new();
        stats.record(16.0);
        assert_eq!(stats.label(), "-- FPS");
        assert_eq!(stats.frame_ms, 16.0);
    }
}
