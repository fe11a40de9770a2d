use slotmap::SlotMap;
use vek::Vec2;

use crate::{
    config::WorldConfig,
    error::{Resource, RopeError},
    physics::{BodyHandle, Classification, LinkHandle, LinkTarget, PhysicsWorld},
};

struct Body {
    pos: Vec2<f32>,
    prev: Vec2<f32>,
    inv_mass: f32,
    class: Classification,
}

struct Link {
    target: LinkTarget,
    body: BodyHandle,
    rest_length: f32,
}

pub struct VerletWorld {
    bodies: SlotMap<BodyHandle, Body>,
    links: SlotMap<LinkHandle, Link>,
    config: WorldConfig,
}

impl VerletWorld {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            bodies: SlotMap::with_key(),
            links: SlotMap::with_key(),
            config,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_linked(&self, target: LinkTarget, body: BodyHandle) -> bool {
        self.links
            .values()
            .any(|link| link.body == body && link.target == target)
    }

    /// Body that is never integrated and does not yield to its links.
    pub fn create_kinematic_body(
        &mut self,
        position: Vec2<f32>,
        class: Classification,
    ) -> Result<BodyHandle, RopeError> {
        let body = self.create_body(position, class)?;
        if let Some(b) = self.bodies.get_mut(body) {
            b.inv_mass = 0.0;
        }
        Ok(body)
    }

    /// Teleports a body, killing its velocity.
    pub fn set_position(&mut self, body: BodyHandle, position: Vec2<f32>) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.pos = position;
            b.prev = position;
        }
    }

    pub fn step(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        let gravity = self.config.gravity * dt * dt;
        let keep = 1.0 - self.config.drag;
        for body in self.bodies.values_mut() {
            if body.inv_mass == 0.0 {
                continue;
            }
            let vel = (body.pos - body.prev) * keep;
            body.prev = body.pos;
            body.pos += vel + gravity;
        }

        for _ in 0..self.config.iterations {
            for link in self.links.values() {
                relax(&mut self.bodies, link);
            }
        }
    }

    fn hit_distance(&self, body: &Body, start: Vec2<f32>, end: Vec2<f32>) -> Option<f32> {
        let r = self.config.body_radius;
        let d = end - start;
        let f = start - body.pos;
        let c = f.magnitude_squared() - r * r;
        if c <= 0.0 {
            // starts inside
            return Some(0.0);
        }
        let a = d.magnitude_squared();
        if a == 0.0 {
            return None;
        }
        let b = 2.0 * f.dot(d);
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let t = (-b - disc.sqrt()) / (2.0 * a);
        (0.0..=1.0).contains(&t).then_some(t)
    }
}

fn relax(bodies: &mut SlotMap<BodyHandle, Body>, link: &Link) {
    let Some(body) = bodies.get(link.body) else {
        return;
    };
    let (pos, inv_mass) = (body.pos, body.inv_mass);
    let (other_pos, other_inv_mass) = match link.target {
        LinkTarget::Anchor(p) => (p, 0.0),
        LinkTarget::Body(other) => match bodies.get(other) {
            Some(o) => (o.pos, o.inv_mass),
            None => return,
        },
    };

    let total = inv_mass + other_inv_mass;
    let delta = pos - other_pos;
    let dist = delta.magnitude();
    if total == 0.0 || dist == 0.0 {
        return;
    }
    let correction = delta * ((dist - link.rest_length) / (dist * total));

    if let Some(b) = bodies.get_mut(link.body) {
        b.pos -= correction * inv_mass;
    }
    if let LinkTarget::Body(other) = link.target {
        if let Some(o) = bodies.get_mut(other) {
            o.pos += correction * other_inv_mass;
        }
    }
}

impl PhysicsWorld for VerletWorld {
    fn create_body(
        &mut self,
        position: Vec2<f32>,
        class: Classification,
    ) -> Result<BodyHandle, RopeError> {
        if self
            .config
            .max_bodies
            .is_some_and(|max| self.bodies.len() >= max)
        {
            return Err(RopeError::ResourceExhausted(Resource::Body));
        }
        Ok(self.bodies.insert(Body {
            pos: position,
            prev: position,
            inv_mass: 1.0,
            class,
        }))
    }

    fn destroy_body(&mut self, body: BodyHandle) {
        if self.bodies.remove(body).is_some() {
            // Links pointing at a dead body would never relax again
            self.links.retain(|_, link| {
                link.body != body && link.target != LinkTarget::Body(body)
            });
        }
    }

    fn create_link(
        &mut self,
        target: LinkTarget,
        body: BodyHandle,
        rest_length: f32,
    ) -> Result<LinkHandle, RopeError> {
        if self
            .config
            .max_links
            .is_some_and(|max| self.links.len() >= max)
        {
            return Err(RopeError::ResourceExhausted(Resource::Link));
        }
        if !self.bodies.contains_key(body) {
            return Err(RopeError::ReferenceNotFound(body));
        }
        if let LinkTarget::Body(other) = target {
            if !self.bodies.contains_key(other) {
                return Err(RopeError::ReferenceNotFound(other));
            }
        }
        Ok(self.links.insert(Link {
            target,
            body,
            rest_length,
        }))
    }

    fn destroy_link(&mut self, link: LinkHandle) {
        self.links.remove(link);
    }

    fn position(&self, body: BodyHandle) -> Option<Vec2<f32>> {
        self.bodies.get(body).map(|b| b.pos)
    }

    fn linecast_first_hit(
        &self,
        start: Vec2<f32>,
        end: Vec2<f32>,
        mask: Classification,
    ) -> Option<BodyHandle> {
        self.bodies
            .iter()
            .filter(|(_, body)| body.class.intersects(mask))
            .filter_map(|(handle, body)| Some((handle, self.hit_distance(body, start, end)?)))
            .min_by(|(_, t1), (_, t2)| t1.partial_cmp(t2).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(handle, _)| handle)
    }
}
