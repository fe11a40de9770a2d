use hashbrown::{HashMap, HashSet};
use vek::Vec2;

use crate::{
    physics::PhysicsWorld,
    registry::{ChainId, ChainRegistry},
    slice::{Projection, SwipeTrace},
};

pub trait PathSink {
    fn set_path(&mut self, chain: ChainId, points: &[Vec2<f32>]);

    /// The chain is gone; drop whatever was kept for it.
    fn release(&mut self, chain: ChainId);
}

/// Pushes chain positions to a [`PathSink`] and unsubscribes dead chains.
#[derive(Default)]
pub struct VisualSync {
    subscribed: HashSet<ChainId>,
}

impl VisualSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(
        &mut self,
        registry: &ChainRegistry,
        world: &impl PhysicsWorld,
        sink: &mut impl PathSink,
    ) {
        let mut live = HashSet::with_capacity(registry.len());
        for (id, chain) in registry.chains() {
            sink.set_path(id, &chain.path(world).points());
            live.insert(id);
        }
        for gone in self.subscribed.difference(&live) {
            sink.release(*gone);
        }
        self.subscribed = live;
    }
}

/// Orthographic mapping between window pixels (y down) and world units (y up).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub size: Vec2<usize>,
    /// World point shown at the window centre.
    pub center: Vec2<f32>,
    pub pixels_per_unit: f32,
}

impl Viewport {
    pub fn world_to_screen(&self, world: Vec2<f32>) -> Vec2<f32> {
        let half: Vec2<f32> = self.size.as_::<f32>() * 0.5;
        let rel = (world - self.center) * self.pixels_per_unit;
        Vec2::new(half.x + rel.x, half.y - rel.y)
    }
}

impl Projection for Viewport {
    fn screen_to_world(&self, screen: Vec2<f32>) -> Vec2<f32> {
        let half: Vec2<f32> = self.size.as_::<f32>() * 0.5;
        let rel = Vec2::new(screen.x - half.x, half.y - screen.y);
        self.center + rel / self.pixels_per_unit
    }
}

const BACKGROUND: (u8, u8, u8) = (24, 24, 32);
const PALETTE: [(u8, u8, u8); 4] = [
    (222, 184, 135),
    (205, 133, 63),
    (160, 82, 45),
    (139, 69, 19),
];
const TRACE_COLOR: (u8, u8, u8) = (220, 40, 40);

pub struct Canvas {
    viewport: Viewport,
    buf: Vec<u32>,
    paths: HashMap<ChainId, Vec<Vec2<f32>>>,
}

impl Canvas {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            buf: vec![0; viewport.size.x * viewport.size.y],
            paths: HashMap::new(),
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buf
    }

    pub fn path(&self, chain: ChainId) -> Option<&[Vec2<f32>]> {
        self.paths.get(&chain).map(Vec::as_slice)
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn draw(&mut self, traces: &[SwipeTrace]) {
        self.buf.fill(pack(BACKGROUND));
        let mut ids: Vec<ChainId> = self.paths.keys().copied().collect();
        ids.sort();
        for (i, id) in ids.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let points: Vec<Vec2<i32>> = self.paths[id]
                .iter()
                .map(|p| self.viewport.world_to_screen(*p).round().as_())
                .collect();
            for pair in points.windows(2) {
                self.line(pair[0], pair[1], color);
            }
            for p in &points {
                self.dot(*p, color);
            }
        }
        for trace in traces {
            let a = self.viewport.world_to_screen(trace.start).round().as_();
            let b = self.viewport.world_to_screen(trace.end).round().as_();
            self.line(a, b, TRACE_COLOR);
        }
    }

    fn set(&mut self, pos: Vec2<i32>, color: (u8, u8, u8)) {
        let size = self.viewport.size;
        if pos.x < 0 || pos.y < 0 || pos.x as usize >= size.x || pos.y as usize >= size.y {
            return;
        }
        self.buf[pos.y as usize * size.x + pos.x as usize] = pack(color);
    }

    fn dot(&mut self, pos: Vec2<i32>, color: (u8, u8, u8)) {
        for dx in -1..=1 {
            for dy in -1..=1 {
                self.set(pos + Vec2::new(dx, dy), color);
            }
        }
    }

    // Bresenham
    fn line(&mut self, from: Vec2<i32>, to: Vec2<i32>, color: (u8, u8, u8)) {
        let d = Vec2::new((to.x - from.x).abs(), -(to.y - from.y).abs());
        let step = Vec2::new(
            if from.x < to.x { 1 } else { -1 },
            if from.y < to.y { 1 } else { -1 },
        );
        let mut err = d.x + d.y;
        let mut pos = from;
        loop {
            self.set(pos, color);
            if pos == to {
                break;
            }
            let e2 = 2 * err;
            if e2 >= d.y {
                err += d.y;
                pos.x += step.x;
            }
            if e2 <= d.x {
                err += d.x;
                pos.y += step.y;
            }
        }
    }
}

impl PathSink for Canvas {
    fn set_path(&mut self, chain: ChainId, points: &[Vec2<f32>]) {
        let path = self.paths.entry(chain).or_default();
        path.clear();
        path.extend_from_slice(points);
    }

    fn release(&mut self, chain: ChainId) {
        self.paths.remove(&chain);
    }
}

fn pack(color: (u8, u8, u8)) -> u32 {
    u32::from_le_bytes([color.2, color.1, color.0, 0])
}
