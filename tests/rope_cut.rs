//! End-to-end behaviour of cutting ropes through the registry.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use ropecut::{
    Anchor, BodyHandle, ChainId, ChainRegistry, Classification, CutReport, Lifetime, Payload,
    PhysicsWorld, RopeConfig, VerletWorld, WorldConfig,
};
use vek::Vec2;

const LIFETIME: f32 = 2.0;

fn setup(n: usize, with_payload: bool) -> (VerletWorld, ChainRegistry, ChainId, Option<BodyHandle>) {
    let mut world = VerletWorld::new(WorldConfig::default());
    let mut registry = ChainRegistry::new(RopeConfig {
        segment_count: n,
        rest_length: 0.25,
        detached_lifetime: LIFETIME,
        ..Default::default()
    });
    let payload = with_payload.then(|| {
        world
            .create_body(Vec2::new(0.0, -5.0), Classification::NONE)
            .unwrap()
    });
    let root = registry
        .spawn_root(
            &mut world,
            Anchor::fixed(Vec2::new(0.0, 1.0)),
            payload.map(Payload::new),
        )
        .unwrap();
    (world, registry, root, payload)
}

fn bodies(registry: &ChainRegistry, id: ChainId) -> Vec<BodyHandle> {
    registry.chain(id).unwrap().bodies().collect()
}

fn split(report: CutReport) -> (ChainId, ChainId, bool) {
    match report {
        CutReport::Split {
            top,
            bottom,
            top_destroyed,
            ..
        } => (top, bottom, top_destroyed),
        other => panic!("expected a split, got {other:?}"),
    }
}

#[test]
fn payload_scenario_with_recursive_cut() {
    let (mut world, mut registry, root, payload) = setup(5, true);
    let payload = payload.unwrap();
    let seg = bodies(&registry, root);

    let (_, bottom, _) = split(registry.cut_body(&mut world, seg[2]));

    assert_eq!(bodies(&registry, root), seg[..2]);
    let top = registry.chain(root).unwrap();
    assert!(top.anchor().is_some());
    assert!(top.payload().is_none());
    assert!(top.lifetime().is_permanent());

    let falling = registry.chain(bottom).unwrap();
    assert_eq!(bodies(&registry, bottom), seg[2..]);
    assert!(falling.anchor().is_none());
    assert!(!falling.segments()[0].is_linked());
    assert!(falling.owns_payload(payload));
    assert_eq!(falling.lifetime(), Lifetime::Permanent);

    // Global seg3 is local index 1 of the falling piece
    let (_, newest, _) = split(registry.cut(&mut world, bottom, seg[3]));

    assert_eq!(bodies(&registry, bottom), seg[2..3]);
    assert_eq!(bodies(&registry, newest), seg[3..]);
    assert!(registry.chain(newest).unwrap().owns_payload(payload));
    assert!(registry.chain(newest).unwrap().lifetime().is_permanent());
    let previous = registry.chain(bottom).unwrap();
    assert!(previous.payload().is_none());
    assert_eq!(previous.lifetime(), Lifetime::Finite { remaining: LIFETIME });

    registry.tick(&mut world, 0.5);
    assert_eq!(
        registry.chain(bottom).unwrap().lifetime().remaining(),
        Some(LIFETIME - 0.5)
    );
}

#[test]
fn cutting_first_segment_detaches_everything() {
    let (mut world, mut registry, root, _) = setup(3, false);
    let seg = bodies(&registry, root);

    let (top, bottom, top_destroyed) = split(registry.cut_body(&mut world, seg[0]));

    assert_eq!(top, root);
    assert!(top_destroyed);
    assert!(registry.chain(root).is_none());
    assert_eq!(registry.root(), None);
    assert_eq!(registry.len(), 1);
    assert_eq!(bodies(&registry, bottom), seg);
    assert!(registry.chain(bottom).unwrap().anchor().is_none());
    // the anchor link is gone, the two inner links remain
    assert_eq!(world.link_count(), 2);
}

#[test]
fn cutting_first_segment_hands_payload_to_the_whole_rope() {
    let (mut world, mut registry, root, payload) = setup(4, true);
    let payload = payload.unwrap();
    let seg = bodies(&registry, root);

    let (_, bottom, _) = split(registry.cut_body(&mut world, seg[0]));

    assert_eq!(registry.payload_owners(payload), vec![bottom]);
    assert!(registry.chain(bottom).unwrap().lifetime().is_permanent());
}

#[test]
fn double_cut_in_one_tick_is_noop() {
    let (mut world, mut registry, root, _) = setup(6, false);
    let seg = bodies(&registry, root);

    split(registry.cut_body(&mut world, seg[3]));
    let chains = registry.len();
    let links = world.link_count();

    assert_eq!(registry.cut_body(&mut world, seg[3]), CutReport::Unchanged);
    assert_eq!(registry.len(), chains);
    assert_eq!(world.link_count(), links);
}

#[test]
fn payload_owner_is_never_aged_out() {
    let (mut world, mut registry, root, payload) = setup(4, true);
    let payload = payload.unwrap();
    let seg = bodies(&registry, root);
    let (_, bottom, _) = split(registry.cut_body(&mut world, seg[1]));

    for _ in 0..100 {
        registry.tick(&mut world, 0.25);
    }

    assert!(registry.chain(bottom).is_some());
    assert!(registry.chain(root).is_some());
    assert_eq!(registry.payload_owners(payload), vec![bottom]);
}

#[test]
fn detached_piece_counts_down_then_disappears() {
    let (mut world, mut registry, root, _) = setup(6, false);
    let seg = bodies(&registry, root);
    let (_, bottom, _) = split(registry.cut_body(&mut world, seg[4]));

    let mut last = LIFETIME;
    loop {
        let report = registry.tick(&mut world, 0.3);
        match registry.chain(bottom) {
            Some(chain) => {
                let remaining = chain.lifetime().remaining().unwrap();
                assert!(remaining < last);
                last = remaining;
            }
            None => {
                assert_eq!(report.destroyed, vec![bottom]);
                break;
            }
        }
    }
    assert_eq!(world.body_count(), 4);
}

#[test]
fn permanent_detached_pieces_when_lifetime_disabled() {
    let mut world = VerletWorld::new(WorldConfig::default());
    let mut registry = ChainRegistry::new(RopeConfig {
        segment_count: 4,
        detached_lifetime: 0.0,
        ..Default::default()
    });
    let root = registry
        .spawn_root(&mut world, Anchor::fixed(Vec2::zero()), None)
        .unwrap();
    let seg = bodies(&registry, root);
    let (_, bottom, _) = split(registry.cut_body(&mut world, seg[2]));

    registry.tick(&mut world, 1000.0);

    assert!(registry.chain(bottom).unwrap().lifetime().is_permanent());
}

#[test]
fn falling_piece_drops_while_root_hangs() {
    let (mut world, mut registry, root, _) = setup(8, false);
    let seg = bodies(&registry, root);
    split(registry.cut_body(&mut world, seg[4]));
    let kept_before = world.position(seg[3]).unwrap();
    let cut_before = world.position(seg[4]).unwrap();

    for _ in 0..60 {
        world.step(1.0 / 60.0);
    }

    let kept_drop = kept_before.y - world.position(seg[3]).unwrap().y;
    let cut_drop = cut_before.y - world.position(seg[4]).unwrap().y;
    assert!(cut_drop > 1.0, "free piece only fell {cut_drop}");
    assert!(kept_drop < 0.1, "anchored piece sagged {kept_drop}");
}

#[test]
fn random_cuts_partition_and_keep_one_payload_owner() {
    for seed in 0..16 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = rng.gen_range(1..24);
        let (mut world, mut registry, _, payload) = setup(n, true);
        let payload = payload.unwrap();

        for _ in 0..rng.gen_range(1..12) {
            let chains: Vec<ChainId> = registry.chains().map(|(id, _)| id).collect();
            if chains.is_empty() {
                break;
            }
            let id = chains[rng.gen_range(0..chains.len())];
            let before = bodies(&registry, id);
            let k = rng.gen_range(0..before.len());
            let total_before = registry.total_segments();

            match registry.cut(&mut world, id, before[k]) {
                CutReport::Split {
                    top,
                    bottom,
                    top_destroyed,
                    ..
                } => {
                    assert_eq!(top, id);
                    assert_eq!(top_destroyed, k == 0);
                    assert_eq!(bodies(&registry, bottom), before[k..]);
                    if !top_destroyed {
                        assert_eq!(bodies(&registry, top), before[..k]);
                    }
                }
                CutReport::Unchanged => {
                    assert_eq!(k, 0);
                    assert_eq!(bodies(&registry, id), before);
                }
                other => panic!("unexpected {other:?}"),
            }

            assert_eq!(registry.total_segments(), total_before);
            assert_eq!(registry.payload_owners(payload).len(), 1, "seed {seed}");
            registry.tick(&mut world, 0.5);
            assert!(registry.total_segments() <= n);
            assert_eq!(registry.payload_owners(payload).len(), 1, "seed {seed}");
        }
    }
}

#[test]
fn recursive_cut_counts() {
    let (mut world, mut registry, root, _) = setup(10, false);
    let seg = bodies(&registry, root);

    let (_, bottom, _) = split(registry.cut_body(&mut world, seg[5]));
    assert_eq!(registry.chain(bottom).unwrap().len(), 5);

    let local = registry.chain(bottom).unwrap().segments()[2].body();
    let (_, further, _) = split(registry.cut(&mut world, bottom, local));
    assert_eq!(registry.chain(further).unwrap().len(), 3);
    assert_eq!(registry.chain(bottom).unwrap().len(), 2);
    assert_eq!(registry.total_segments(), 10);

    registry.tick(&mut world, LIFETIME);
    assert_eq!(registry.total_segments(), 5);
    assert_eq!(registry.len(), 1);
}

#[test]
fn rope_follows_moving_anchor_body() {
    let mut world = VerletWorld::new(WorldConfig::default());
    let hook = world
        .create_kinematic_body(Vec2::new(0.0, 1.0), Classification::NONE)
        .unwrap();
    let mut registry = ChainRegistry::new(RopeConfig {
        segment_count: 3,
        rest_length: 0.25,
        ..Default::default()
    });
    let root = registry
        .spawn_root(&mut world, Anchor::on_body(hook, Vec2::new(0.0, 1.0)), None)
        .unwrap();
    let head = bodies(&registry, root)[0];

    for i in 1..=200 {
        world.set_position(hook, Vec2::new(i as f32 / 100.0, 1.0));
        world.step(1.0 / 60.0);
    }
    for _ in 0..120 {
        world.step(1.0 / 60.0);
    }

    let path = registry.chain(root).unwrap().path(&world);
    assert_eq!(path.anchor, Some(Vec2::new(2.0, 1.0)));
    let reach = world.position(head).unwrap().distance(Vec2::new(2.0, 1.0));
    assert!((reach - 0.25).abs() < 0.05, "head is {reach} from the hook");

    // the hook is not part of the rope and survives its destruction
    registry.clear(&mut world);
    assert_eq!(world.body_count(), 1);
}
