use log::trace;
use vek::Vec2;

use crate::{
    physics::{BodyHandle, Classification, PhysicsWorld},
    registry::{ChainRegistry, CutReport},
};

/// Maps input coordinates (screen or UI space) into world space.
pub trait Projection {
    fn screen_to_world(&self, screen: Vec2<f32>) -> Vec2<f32>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SliceHit {
    pub body: BodyHandle,
    pub report: CutReport,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwipeTrace {
    pub start: Vec2<f32>,
    pub end: Vec2<f32>,
    pub ttl: f32,
}

const TRACE_TTL: f32 = 0.5;

pub struct SliceDetector {
    mask: Classification,
    last_sample: Option<Vec2<f32>>,
    debug_draw: bool,
    traces: Vec<SwipeTrace>,
}

impl SliceDetector {
    pub fn new(mask: Classification) -> Self {
        Self {
            mask,
            last_sample: None,
            debug_draw: false,
            traces: Vec::new(),
        }
    }

    pub fn with_debug_draw(mut self, enabled: bool) -> Self {
        self.debug_draw = enabled;
        self
    }

    pub fn is_slicing(&self) -> bool {
        self.last_sample.is_some()
    }

    pub fn begin(&mut self, screen: Vec2<f32>) {
        self.last_sample = Some(screen);
    }

    pub fn sample(
        &mut self,
        screen: Vec2<f32>,
        projection: &impl Projection,
        world: &mut impl PhysicsWorld,
        registry: &mut ChainRegistry,
    ) -> Option<SliceHit> {
        let start = self.last_sample?;
        self.last_sample = Some(screen);
        self.slice(start, screen, projection, world, registry)
    }

    pub fn end(&mut self) {
        self.last_sample = None;
    }

    /// Cuts the rope at the first body crossed between two samples.
    pub fn slice(
        &mut self,
        screen_start: Vec2<f32>,
        screen_end: Vec2<f32>,
        projection: &impl Projection,
        world: &mut impl PhysicsWorld,
        registry: &mut ChainRegistry,
    ) -> Option<SliceHit> {
        if screen_start == screen_end {
            return None;
        }
        let start = projection.screen_to_world(screen_start);
        let end = projection.screen_to_world(screen_end);
        if self.debug_draw {
            self.traces.push(SwipeTrace {
                start,
                end,
                ttl: TRACE_TTL,
            });
        }

        let body = world.linecast_first_hit(start, end, self.mask)?;
        let report = registry.cut_body(world, body);
        trace!("Swipe {:?} -> {:?} hit {:?}: {:?}", start, end, body, report);
        Some(SliceHit { body, report })
    }

    pub fn update(&mut self, dt: f32) {
        for trace in &mut self.traces {
            trace.ttl -= dt;
        }
        self.traces.retain(|t| t.ttl > 0.0);
    }

    pub fn traces(&self) -> &[SwipeTrace] {
        &self.traces
    }
}
