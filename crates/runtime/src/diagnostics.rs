use std::ops::AddAssign;

use hair_physics::StepReport;
use hair_render::DrawStats;

use crate::orchestrator::FramePhase;

/// Counts of recoverable faults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameDiagnostics {
    /// Strands reset after diverging.
    pub instabilities: usize,
    /// Collision proxies skipped because their bone was missing.
    pub missing_proxies: usize,
    /// Frames whose geometry did not fit the buffer.
    pub geometry_overflows: usize,
    /// Strands dropped from rendering to fit the buffer.
    pub culled_strands: usize,
    /// Physics steps abandoned before they started.
    pub abandoned_steps: usize,
    /// Frames the device failed to draw.
    pub render_failures: usize,
}

impl FrameDiagnostics {
    pub fn record_step(&mut self, report: &StepReport) {
        self.instabilities += report.instability_count();
        self.missing_proxies += report.missing_proxy_count();
        if !report.committed {
            self.abandoned_steps += 1;
        }
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

impl AddAssign for FrameDiagnostics {
    fn add_assign(&mut self, other: Self) {
        self.instabilities += other.instabilities;
        self.missing_proxies += other.missing_proxies;
        self.geometry_overflows += other.geometry_overflows;
        self.culled_strands += other.culled_strands;
        self.abandoned_steps += other.abandoned_steps;
        self.render_failures += other.render_failures;
    }
}

/// What one call to `tick` did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Host frame counter, starting at 1.
    pub frame: u64,
    /// Physics steps run this frame.
    pub steps: u32,
    /// Phases entered this frame, in order.
    pub transitions: Vec<FramePhase>,
    /// Seconds of time debt dropped by the cap.
    pub discarded_time: f64,
    /// True when the stop flag ended the step loop.
    pub stopped: bool,
    pub diagnostics: FrameDiagnostics,
    pub draw: Option<DrawStats>,
}

#[cfg(test)]
mod tests {
    use hair_physics::PhysicsError;

    use super::*;

    #[test]
    fn step_reports_are_counted() {
        let mut diagnostics = FrameDiagnostics::default();
        diagnostics.record_step(&StepReport {
            committed: true,
            errors: vec![
                PhysicsError::NumericalInstability { strand: 0, particle: 3 },
                PhysicsError::CollisionProxyMissing { proxy: 1, bone: 4 },
                PhysicsError::CollisionProxyMissing { proxy: 2, bone: 4 },
            ],
            ..StepReport::default()
        });
        assert_eq!(diagnostics.instabilities, 1);
        assert_eq!(diagnostics.missing_proxies, 2);
        assert_eq!(diagnostics.abandoned_steps, 0);

        diagnostics.record_step(&StepReport::default());
        assert_eq!(diagnostics.abandoned_steps, 1);
        assert!(!diagnostics.is_clean());
    }

    #[test]
    fn totals_add_up() {
        let mut total = FrameDiagnostics::default();
        let frame = FrameDiagnostics {
            culled_strands: 3,
            geometry_overflows: 1,
            ..FrameDiagnostics::default()
        };
        total += frame;
        total += frame;
        assert_eq!(total.culled_strands, 6);
        assert_eq!(total.geometry_overflows, 2);
    }
}
