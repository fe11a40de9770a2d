//! Sliceable ropes: chains of linked bodies that can be cut anywhere.

pub mod chain;
pub mod config;
pub mod error;
pub mod physics;
pub mod registry;
pub mod render;
pub mod segment;
pub mod slice;
pub mod verlet;

pub use chain::{Chain, ChainPath, CutOutcome, Lifetime, PayloadLink};
pub use config::{Config, RopeConfig, WorldConfig};
pub use error::{ConfigError, Resource, RopeError};
pub use physics::{
    Anchor, BodyHandle, Classification, LinkHandle, LinkTarget, Payload, PhysicsWorld,
};
pub use registry::{ChainId, ChainRegistry, CutReport, TickReport};
pub use render::{Canvas, PathSink, Viewport, VisualSync};
pub use segment::Segment;
pub use slice::{Projection, SliceDetector, SliceHit, SwipeTrace};
pub use verlet::VerletWorld;
