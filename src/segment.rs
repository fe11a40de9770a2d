use vek::Vec2;

use crate::{
    error::RopeError,
    physics::{BodyHandle, Classification, LinkHandle, LinkTarget, PhysicsWorld},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    body: BodyHandle,
    // None for the head of a detached piece
    link: Option<LinkHandle>,
}

impl Segment {
    /// Allocates a body at `pos` and links it to `target`.
    /// Nothing is left allocated when this fails.
    pub fn create_linked(
        world: &mut impl PhysicsWorld,
        pos: Vec2<f32>,
        target: LinkTarget,
        rest_length: f32,
        class: Classification,
    ) -> Result<Self, RopeError> {
        let body = world.create_body(pos, class)?;
        match world.create_link(target, body, rest_length) {
            Ok(link) => Ok(Self {
                body,
                link: Some(link),
            }),
            Err(e) => {
                world.destroy_body(body);
                Err(e)
            }
        }
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn is_linked(&self) -> bool {
        self.link.is_some()
    }

    /// Severs the link to the predecessor. Cutting twice does nothing.
    pub fn cut(&mut self, world: &mut impl PhysicsWorld) {
        if let Some(link) = self.link.take() {
            world.destroy_link(link);
        }
    }

    pub fn position(&self, world: &impl PhysicsWorld) -> Option<Vec2<f32>> {
        world.position(self.body)
    }

    pub(crate) fn release(mut self, world: &mut impl PhysicsWorld) {
        self.cut(world);
        world.destroy_body(self.body);
    }
}
