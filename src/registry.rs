use hashbrown::HashMap;
use log::{debug, warn};
use slotmap::{new_key_type, SlotMap};

use crate::{
    chain::{Chain, CutOutcome},
    config::RopeConfig,
    error::RopeError,
    physics::{Anchor, BodyHandle, Payload, PhysicsWorld},
};

new_key_type! {
    pub struct ChainId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CutReport {
    Split {
        top: ChainId,
        bottom: ChainId,
        /// The top chain became empty and was destroyed.
        top_destroyed: bool,
        /// The payload moved from `top` to `bottom`.
        payload_moved: bool,
    },
    Unchanged,
    /// The segment belongs to another chain; only its own link was severed.
    Foreign,
    NotFound,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub destroyed: Vec<ChainId>,
}

/// Owns every live chain: the anchored root and all pieces cut from it.
pub struct ChainRegistry {
    chains: SlotMap<ChainId, Chain>,
    // body -> (owning chain, index within it)
    owners: HashMap<BodyHandle, (ChainId, usize)>,
    root: Option<ChainId>,
    config: RopeConfig,
}

impl ChainRegistry {
    pub fn new(config: RopeConfig) -> Self {
        Self {
            chains: SlotMap::with_key(),
            owners: HashMap::new(),
            root: None,
            config,
        }
    }

    pub fn config(&self) -> &RopeConfig {
        &self.config
    }

    /// Builds the anchored rope. Nothing is registered if building fails.
    pub fn spawn_root(
        &mut self,
        world: &mut impl PhysicsWorld,
        anchor: Anchor,
        payload: Option<Payload>,
    ) -> Result<ChainId, RopeError> {
        if self.root.is_some() {
            return Err(RopeError::InvalidConfiguration(
                "a root rope is already registered".into(),
            ));
        }
        let chain = Chain::build(world, &self.config, anchor, payload)?;
        let id = self.insert(chain);
        self.root = Some(id);
        Ok(id)
    }

    pub fn root(&self) -> Option<ChainId> {
        self.root
    }

    pub fn chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(id)
    }

    pub fn chains(&self) -> impl Iterator<Item = (ChainId, &Chain)> {
        self.chains.iter()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn total_segments(&self) -> usize {
        self.chains.values().map(Chain::len).sum()
    }

    pub fn payload_owners(&self, payload: BodyHandle) -> Vec<ChainId> {
        self.chains
            .iter()
            .filter(|(_, chain)| chain.owns_payload(payload))
            .map(|(id, _)| id)
            .collect()
    }

    /// Chain and index of the segment built around `body`.
    pub fn locate(&self, body: BodyHandle) -> Result<(ChainId, usize), RopeError> {
        self.owners
            .get(&body)
            .copied()
            .ok_or(RopeError::ReferenceNotFound(body))
    }

    pub fn cut_body(&mut self, world: &mut impl PhysicsWorld, body: BodyHandle) -> CutReport {
        match self.locate(body) {
            Ok((id, _)) => self.cut(world, id, body),
            Err(e) => {
                debug!("Ignoring cut: {}", e);
                CutReport::NotFound
            }
        }
    }

    /// Cuts chain `id` at the segment of `body`, registering the falling piece.
    pub fn cut(&mut self, world: &mut impl PhysicsWorld, id: ChainId, body: BodyHandle) -> CutReport {
        if !self.chains.contains_key(id) {
            return CutReport::NotFound;
        }
        let k = match self.owners.get(&body).copied() {
            Some((owner, k)) if owner == id => k,
            Some((owner, k)) => {
                warn!(
                    "Segment {:?} belongs to chain {:?}, not {:?}; severing its link only",
                    body, owner, id
                );
                if let Some(chain) = self.chains.get_mut(owner) {
                    chain.sever_segment(world, k);
                }
                return CutReport::Foreign;
            }
            None => return CutReport::NotFound,
        };
        let Some(chain) = self.chains.get_mut(id) else {
            return CutReport::NotFound;
        };
        debug_assert_eq!(chain.index_of(body), Some(k));

        let had_payload = chain.payload().is_some();
        let bottom = match chain.cut_at(world, k, self.config.detached_lifetime) {
            CutOutcome::Split(bottom) => bottom,
            CutOutcome::Unchanged | CutOutcome::NotFound => return CutReport::Unchanged,
        };
        let payload_moved = had_payload && chain.payload().is_none();
        let top_empty = chain.is_empty();

        let bottom = self.insert(bottom);
        if top_empty {
            self.destroy(world, id);
        }

        CutReport::Split {
            top: id,
            bottom,
            top_destroyed: top_empty,
            payload_moved,
        }
    }

    /// Ages every finite chain by `dt` and destroys the expired and the empty.
    pub fn tick(&mut self, world: &mut impl PhysicsWorld, dt: f32) -> TickReport {
        if dt.is_finite() && dt > 0.0 {
            for chain in self.chains.values_mut() {
                chain.age(dt);
            }
        }

        let destroyed: Vec<ChainId> = self
            .chains
            .iter()
            .filter(|(_, chain)| chain.is_expired())
            .map(|(id, _)| id)
            .collect();
        for id in &destroyed {
            self.destroy(world, *id);
        }
        TickReport { destroyed }
    }

    pub fn destroy(&mut self, world: &mut impl PhysicsWorld, id: ChainId) -> bool {
        let Some(mut chain) = self.chains.remove(id) else {
            return false;
        };
        for body in chain.bodies() {
            self.owners.remove(&body);
        }
        chain.release(world);
        if self.root == Some(id) {
            self.root = None;
        }
        debug!("Destroyed rope piece {:?}", id);
        true
    }

    pub fn clear(&mut self, world: &mut impl PhysicsWorld) {
        let ids: Vec<ChainId> = self.chains.keys().collect();
        for id in ids {
            self.destroy(world, id);
        }
    }

    fn insert(&mut self, chain: Chain) -> ChainId {
        let id = self.chains.insert(chain);
        if let Some(chain) = self.chains.get(id) {
            for (index, body) in chain.bodies().enumerate() {
                self.owners.insert(body, (id, index));
            }
        }
        id
    }
}
