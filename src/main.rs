use std::time::{Duration, Instant};

use log::{info, warn};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};
use ropecut::{
    Anchor, BodyHandle, Canvas, ChainRegistry, Classification, Config, Payload, PhysicsWorld,
    SliceDetector, Viewport, VerletWorld, VisualSync,
};
use vek::Vec2;

const W: usize = 800;
const H: usize = 600;
const PIXELS_PER_UNIT: f32 = 120.0;
const ANCHOR: Vec2<f32> = Vec2::new(0.0, 2.2);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    info!("Using config {:?}", config);

    let mut win = Window::new("Rope Cut", W, H, WindowOptions::default())?;
    win.limit_update_rate(Some(Duration::from_micros(16_600)));

    let viewport = Viewport {
        size: Vec2::new(W, H),
        center: Vec2::zero(),
        pixels_per_unit: PIXELS_PER_UNIT,
    };
    let mut canvas = Canvas::new(viewport);
    let mut world = VerletWorld::new(config.world);
    let mut ropes = ChainRegistry::new(config.rope);
    let mut slicer = SliceDetector::new(config.rope.classification()).with_debug_draw(true);
    let mut sync = VisualSync::new();

    let mut payload = spawn(&mut world, &mut ropes)?;

    let mut last = Instant::now();
    while win.is_open() {
        let now = Instant::now();
        let dt = (now - last).as_secs_f32().min(1.0 / 20.0);
        last = now;

        if win.is_key_pressed(Key::Q, KeyRepeat::No) || win.is_key_down(Key::Escape) {
            break;
        }
        if win.is_key_pressed(Key::R, KeyRepeat::No) {
            ropes.clear(&mut world);
            world.destroy_body(payload);
            payload = spawn(&mut world, &mut ropes)?;
        }

        match win.get_mouse_pos(MouseMode::Discard) {
            Some((x, y)) if win.get_mouse_down(MouseButton::Left) => {
                let pos = Vec2::new(x, y);
                if slicer.is_slicing() {
                    slicer.sample(pos, &viewport, &mut world, &mut ropes);
                } else {
                    slicer.begin(pos);
                }
            }
            _ => slicer.end(),
        }

        world.step(dt);
        ropes.tick(&mut world, dt);
        slicer.update(dt);

        sync.sync(&ropes, &world, &mut canvas);
        canvas.draw(slicer.traces());
        win.update_with_buffer(canvas.buffer(), W, H)?;
    }

    Ok(())
}

fn spawn(
    world: &mut VerletWorld,
    ropes: &mut ChainRegistry,
) -> Result<BodyHandle, ropecut::RopeError> {
    let rope = *ropes.config();
    let tail = ANCHOR + rope.direction() * rope.rest_length * (rope.segment_count + 1) as f32;
    let payload = world.create_body(tail, Classification::NONE)?;
    if let Err(e) = ropes.spawn_root(world, Anchor::fixed(ANCHOR), Some(Payload::new(payload))) {
        warn!("Could not build rope: {}", e);
        world.destroy_body(payload);
        return Err(e);
    }
    Ok(payload)
}
