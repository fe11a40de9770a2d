use slotmap::new_key_type;
use vek::Vec2;

use crate::error::RopeError;

new_key_type! {
    pub struct BodyHandle;
    pub struct LinkHandle;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Classification(pub u32);

impl Classification {
    pub const NONE: Classification = Classification(0);
    pub const ALL: Classification = Classification(u32::MAX);

    pub fn layer(index: u32) -> Self {
        Self(1 << (index % 32))
    }

    pub fn intersects(self, other: Classification) -> bool {
        self.0 & other.0 != 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LinkTarget {
    Anchor(Vec2<f32>),
    Body(BodyHandle),
}

/// Fixed or externally driven point constraining the head of the root chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub position: Vec2<f32>,
    pub body: Option<BodyHandle>,
}

impl Anchor {
    pub fn fixed(position: Vec2<f32>) -> Self {
        Self {
            position,
            body: None,
        }
    }

    /// Anchor that follows `body`; `position` is used until the body reports one.
    pub fn on_body(body: BodyHandle, position: Vec2<f32>) -> Self {
        Self {
            position,
            body: Some(body),
        }
    }

    pub fn link_target(&self) -> LinkTarget {
        match self.body {
            Some(body) => LinkTarget::Body(body),
            None => LinkTarget::Anchor(self.position),
        }
    }

    pub fn current_position(&self, world: &impl PhysicsWorld) -> Vec2<f32> {
        self.body
            .and_then(|body| world.position(body))
            .unwrap_or(self.position)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Payload {
    pub body: BodyHandle,
    /// Segment the payload hangs from. `None` means the tail.
    pub attach_index: Option<usize>,
}

impl Payload {
    pub fn new(body: BodyHandle) -> Self {
        Self {
            body,
            attach_index: None,
        }
    }

    pub fn attached_at(mut self, index: usize) -> Self {
        self.attach_index = Some(index);
        self
    }
}

/// Destroying a stale handle must be a no-op.
pub trait PhysicsWorld {
    fn create_body(
        &mut self,
        position: Vec2<f32>,
        class: Classification,
    ) -> Result<BodyHandle, RopeError>;

    fn destroy_body(&mut self, body: BodyHandle);

    /// Constrains `body` to stay `rest_length` away from `target`.
    fn create_link(
        &mut self,
        target: LinkTarget,
        body: BodyHandle,
        rest_length: f32,
    ) -> Result<LinkHandle, RopeError>;

    fn destroy_link(&mut self, link: LinkHandle);

    fn position(&self, body: BodyHandle) -> Option<Vec2<f32>>;

    /// First body whose class intersects `mask` along `start..end`.
    fn linecast_first_hit(
        &self,
        start: Vec2<f32>,
        end: Vec2<f32>,
        mask: Classification,
    ) -> Option<BodyHandle>;
}
