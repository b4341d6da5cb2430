//! Per-frame pass ordering.
//!
//! The shadow map is a render target during the depth pass and a sampled
//! texture afterwards. [`PassTracker`] rejects any ordering that would read
//! it while it is still bound or before it was written this frame.

use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Light-space depth into the shadow map.
    ShadowDepth,
    /// Mirrored scene into the water reflection target.
    Reflection,
    /// Final colour pass into the surface.
    Main,
}

impl PassKind {
    pub fn samples_shadow_map(self) -> bool {
        !matches!(self, PassKind::ShadowDepth)
    }
}

/// Passes of one frame in submission order.
pub fn frame_passes(shadows: bool, reflections: bool) -> Vec<PassKind> {
    let mut passes = Vec::with_capacity(3);
    if shadows {
        passes.push(PassKind::ShadowDepth);
    }
    if reflections {
        passes.push(PassKind::Reflection);
    }
    passes.push(PassKind::Main);
    passes
}

/// Records pass begin/end and enforces the shadow map ordering.
#[derive(Debug, Default)]
pub struct PassTracker {
    shadows: bool,
    active: Option<PassKind>,
    depth_done: bool,
    history: Vec<PassKind>,
}

impl PassTracker {
    pub fn new(shadows: bool) -> Self {
        Self {
            shadows,
            ..Default::default()
        }
    }

    pub fn begin_frame(&mut self) {
        self.active = None;
        self.depth_done = false;
        self.history.clear();
    }

    pub fn begin(&mut self, pass: PassKind) -> Result<(), RenderError> {
        let reason = match (self.active, pass) {
            (Some(PassKind::ShadowDepth), _) => Some("shadow map is still bound as a render target"),
            (Some(_), _) => Some("previous pass has not ended"),
            (None, PassKind::ShadowDepth) if self.depth_done => Some("depth pass already ran this frame"),
            (None, PassKind::ShadowDepth) if !self.shadows => Some("shadows are disabled"),
            (None, p) if p.samples_shadow_map() && self.shadows && !self.depth_done => {
                Some("depth pass has not completed")
            }
            _ => None,
        };
        if let Some(reason) = reason {
            return Err(RenderError::PassOrder { pass, reason });
        }
        self.active = Some(pass);
        self.history.push(pass);
        Ok(())
    }

    pub fn end(&mut self, pass: PassKind) -> Result<(), RenderError> {
        if self.active != Some(pass) {
            return Err(RenderError::PassOrder {
                pass,
                reason: "ended a pass that is not active",
            });
        }
        self.active = None;
        if pass == PassKind::ShadowDepth {
            self.depth_done = true;
        }
        Ok(())
    }

    pub fn shadow_map_bound(&self) -> bool {
        self.active == Some(PassKind::ShadowDepth)
    }

    pub fn depth_done(&self) -> bool {
        self.depth_done
    }

    /// Passes begun this frame.
    pub fn history(&self) -> &[PassKind] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(tracker: &mut PassTracker, passes: &[PassKind]) -> Result<(), RenderError> {
        for &pass in passes {
            tracker.begin(pass)?;
            tracker.end(pass)?;
        }
        Ok(())
    }

    #[test]
    fn frame_plan_runs_cleanly() {
        let mut tracker = PassTracker::new(true);
        let plan = frame_passes(true, true);
        assert_eq!(plan, [PassKind::ShadowDepth, PassKind::Reflection, PassKind::Main]);
        run(&mut tracker, &plan).unwrap();
        assert_eq!(tracker.history(), plan.as_slice());
        assert!(tracker.depth_done());
    }

    #[test]
    fn colour_before_depth_is_rejected() {
        let mut tracker = PassTracker::new(true);
        let err = tracker.begin(PassKind::Main).unwrap_err();
        assert!(matches!(err, RenderError::PassOrder { pass: PassKind::Main, .. }));
        assert!(tracker.history().is_empty());
    }

    #[test]
    fn sampling_while_bound_is_rejected() {
        let mut tracker = PassTracker::new(true);
        tracker.begin(PassKind::ShadowDepth).unwrap();
        assert!(tracker.shadow_map_bound());
        for pass in [PassKind::Reflection, PassKind::Main] {
            let err = tracker.begin(pass).unwrap_err();
            assert!(matches!(
                err,
                RenderError::PassOrder { reason: "shadow map is still bound as a render target", .. }
            ));
        }
        tracker.end(PassKind::ShadowDepth).unwrap();
        tracker.begin(PassKind::Main).unwrap();
    }

    #[test]
    fn new_frame_requires_a_new_depth_pass() {
        let mut tracker = PassTracker::new(true);
        run(&mut tracker, &frame_passes(true, false)).unwrap();
        tracker.begin_frame();
        assert!(tracker.begin(PassKind::Main).is_err());
        assert!(run(&mut tracker, &[PassKind::ShadowDepth, PassKind::ShadowDepth]).is_err());
    }

    #[test]
    fn without_shadows_colour_passes_run_alone() {
        let mut tracker = PassTracker::new(false);
        let plan = frame_passes(false, true);
        assert_eq!(plan, [PassKind::Reflection, PassKind::Main]);
        run(&mut tracker, &plan).unwrap();
        assert!(tracker.begin(PassKind::ShadowDepth).is_err());
    }
}
