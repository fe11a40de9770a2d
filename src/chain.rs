use log::{debug, info};
use vek::Vec2;

use crate::{
    config::RopeConfig,
    error::RopeError,
    physics::{Anchor, BodyHandle, LinkHandle, LinkTarget, Payload, PhysicsWorld},
    segment::Segment,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Lifetime {
    Permanent,
    Finite { remaining: f32 },
}

impl Lifetime {
    /// Lifetime of a falling piece; `seconds <= 0` never expires.
    pub fn detached(seconds: f32) -> Self {
        if seconds > 0.0 {
            Lifetime::Finite { remaining: seconds }
        } else {
            Lifetime::Permanent
        }
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Lifetime::Permanent)
    }

    pub fn remaining(&self) -> Option<f32> {
        match self {
            Lifetime::Permanent => None,
            Lifetime::Finite { remaining } => Some(*remaining),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayloadLink {
    pub payload: BodyHandle,
    pub holder: BodyHandle,
    link: LinkHandle,
}

#[derive(Debug)]
pub enum CutOutcome {
    Split(Chain),
    /// Nothing to cut: past the end, or the segment is already loose.
    Unchanged,
    NotFound,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChainPath {
    pub anchor: Option<Vec2<f32>>,
    pub segments: Vec<Vec2<f32>>,
    pub payload: Option<Vec2<f32>>,
}

impl ChainPath {
    pub fn points(&self) -> Vec<Vec2<f32>> {
        self.anchor
            .into_iter()
            .chain(self.segments.iter().copied())
            .chain(self.payload)
            .collect()
    }
}

#[derive(Debug)]
pub struct Chain {
    segments: Vec<Segment>,
    anchor: Option<Anchor>,
    payload: Option<PayloadLink>,
    lifetime: Lifetime,
    root: bool,
    rest_length: f32,
}

impl Chain {
    /// Builds the anchored root rope, optionally carrying `payload`.
    ///
    /// On failure every body and link created so far is destroyed again.
    pub fn build(
        world: &mut impl PhysicsWorld,
        config: &RopeConfig,
        anchor: Anchor,
        payload: Option<Payload>,
    ) -> Result<Self, RopeError> {
        config.validate()?;
        let attach_index = payload.map(|p| p.attach_index.unwrap_or(config.segment_count - 1));
        if let Some(index) = attach_index.filter(|i| *i >= config.segment_count) {
            return Err(RopeError::InvalidConfiguration(format!(
                "payload attachment index {index} is outside a rope of {} segments",
                config.segment_count
            )));
        }

        let mut chain = Self {
            segments: Vec::with_capacity(config.segment_count),
            anchor: Some(anchor),
            payload: None,
            lifetime: Lifetime::Permanent,
            root: true,
            rest_length: config.rest_length,
        };

        let step = config.direction() * config.rest_length;
        let mut pos = anchor.position;
        let mut target = anchor.link_target();
        for _ in 0..config.segment_count {
            pos += step;
            let segment = match Segment::create_linked(
                world,
                pos,
                target,
                config.rest_length,
                config.classification(),
            ) {
                Ok(segment) => segment,
                Err(e) => {
                    chain.release(world);
                    return Err(e);
                }
            };
            target = LinkTarget::Body(segment.body());
            chain.segments.push(segment);
        }

        if let (Some(payload), Some(index)) = (payload, attach_index) {
            let holder = chain.segments[index].body();
            match world.create_link(LinkTarget::Body(holder), payload.body, config.rest_length) {
                Ok(link) => {
                    chain.payload = Some(PayloadLink {
                        payload: payload.body,
                        holder,
                        link,
                    })
                }
                Err(e) => {
                    chain.release(world);
                    return Err(e);
                }
            }
        }

        info!(
            "Built rope with {} segments, payload {}",
            chain.segments.len(),
            if chain.payload.is_some() { "attached" } else { "absent" }
        );
        Ok(chain)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn bodies(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.segments.iter().map(Segment::body)
    }

    pub fn anchor(&self) -> Option<&Anchor> {
        self.anchor.as_ref()
    }

    pub fn payload(&self) -> Option<&PayloadLink> {
        self.payload.as_ref()
    }

    pub fn owns_payload(&self, payload: BodyHandle) -> bool {
        self.payload.is_some_and(|p| p.payload == payload)
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn index_of(&self, body: BodyHandle) -> Option<usize> {
        self.segments.iter().position(|s| s.body() == body)
    }

    pub fn cut(
        &mut self,
        world: &mut impl PhysicsWorld,
        body: BodyHandle,
        detached_lifetime: f32,
    ) -> CutOutcome {
        match self.index_of(body) {
            Some(k) => self.cut_at(world, k, detached_lifetime),
            None => CutOutcome::NotFound,
        }
    }

    /// Severs segment `k` from its predecessor and hands `[k, len)` to a new chain.
    ///
    /// The payload follows its holder segment. The returned chain has no
    /// anchor and lives forever only while it carries the payload.
    pub fn cut_at(
        &mut self,
        world: &mut impl PhysicsWorld,
        k: usize,
        detached_lifetime: f32,
    ) -> CutOutcome {
        if k >= self.segments.len() {
            return CutOutcome::Unchanged;
        }
        // A loose head on an anchored chain still has to leave the anchor
        if k == 0 && !self.segments[0].is_linked() && self.anchor.is_none() {
            return CutOutcome::Unchanged;
        }

        let mut bottom = self.segments.split_off(k);
        bottom[0].cut(world);

        let payload = match self.payload.take() {
            Some(p) if bottom.iter().any(|s| s.body() == p.holder) => Some(p),
            kept => {
                self.payload = kept;
                None
            }
        };

        if payload.is_some() && !self.root {
            self.lifetime = Lifetime::detached(detached_lifetime);
        }

        let lifetime = if payload.is_some() {
            Lifetime::Permanent
        } else {
            Lifetime::detached(detached_lifetime)
        };

        debug!(
            "Cut rope at {}: {} segments stay, {} fall{}",
            k,
            self.segments.len(),
            bottom.len(),
            if payload.is_some() { " with the payload" } else { "" }
        );

        CutOutcome::Split(Chain {
            segments: bottom,
            anchor: None,
            payload,
            lifetime,
            root: false,
            rest_length: self.rest_length,
        })
    }

    /// Drops the link of segment `index` without touching the bookkeeping.
    pub(crate) fn sever_segment(&mut self, world: &mut impl PhysicsWorld, index: usize) {
        if let Some(segment) = self.segments.get_mut(index) {
            segment.cut(world);
        }
    }

    pub fn age(&mut self, dt: f32) {
        if let Lifetime::Finite { remaining } = &mut self.lifetime {
            *remaining -= dt;
        }
    }

    pub fn is_expired(&self) -> bool {
        if self.segments.is_empty() && self.payload.is_none() {
            return true;
        }
        matches!(self.lifetime, Lifetime::Finite { remaining } if remaining <= 0.0)
    }

    pub fn path(&self, world: &impl PhysicsWorld) -> ChainPath {
        ChainPath {
            anchor: self.anchor.map(|a| a.current_position(world)),
            segments: self
                .segments
                .iter()
                .filter_map(|s| s.position(world))
                .collect(),
            payload: self.payload.and_then(|p| world.position(p.payload)),
        }
    }

    /// Destroys the payload link and every segment. The payload and anchor
    /// bodies belong to the caller and are left alone.
    pub fn release(&mut self, world: &mut impl PhysicsWorld) {
        if let Some(p) = self.payload.take() {
            world.destroy_link(p.link);
        }
        for segment in self.segments.drain(..) {
            segment.release(world);
        }
    }
}
