//! Benchmarks for xpbd-rigid
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use xpbd_rigid::{
    gjk, penetration, Collider, Constraint, Pose, RigidBodyBuilder, SolverConfig, Vec3, World,
};

fn box_stack(height: usize) -> World {
    let mut world = World::new(SolverConfig::default()).unwrap();
    world.add_body(
        RigidBodyBuilder::new(Collider::plane(Vec3::UNIT_Y, 20.0))
            .fixed()
            .build(),
    );
    for i in 0..height {
        world.add_body(
            RigidBodyBuilder::new(Collider::cuboid(Vec3::splat(0.5)))
                .box_mass(1.0, Vec3::splat(0.5))
                .position(Vec3::new(0.0, 0.5 + i as f64, 0.0))
                .can_sleep(false)
                .build(),
        );
    }
    world
}

fn chain(links: usize) -> World {
    let mut world = World::new(SolverConfig::default()).unwrap();
    let half = Vec3::new(0.05, 0.2, 0.05);
    let up = Pose::from_position(Vec3::new(0.0, 0.25, 0.0));
    let down = Pose::from_position(Vec3::new(0.0, -0.25, 0.0));
    let ids: Vec<_> = (0..links)
        .map(|i| {
            world.add_body(
                RigidBodyBuilder::new(Collider::cuboid(half))
                    .box_mass(0.5, half)
                    .position(Vec3::new(0.5 * i as f64, -0.25, 0.0))
                    .can_sleep(false)
                    .build(),
            )
        })
        .collect();
    world
        .add_constraint(Constraint::spherical(ids[0], None, up, Pose::IDENTITY))
        .unwrap();
    for pair in ids.windows(2) {
        world
            .add_constraint(Constraint::spherical(pair[0], Some(pair[1]), down, up))
            .unwrap();
    }
    world
}

// ============================================================================
// Narrow phase
// ============================================================================

fn bench_narrow_phase(c: &mut Criterion) {
    let mut group = c.benchmark_group("narrow_phase");

    let a = Collider::cuboid(Vec3::splat(0.5));
    let mut b = Collider::cuboid(Vec3::splat(0.5));
    b.update_pose(Pose::new(
        Vec3::new(0.7, 0.3, 0.1),
        xpbd_rigid::Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.4),
    ));

    group.bench_function("gjk_boxes", |bench| {
        bench.iter(|| black_box(gjk(black_box(&a), black_box(&b)).is_intersecting()));
    });

    group.bench_function("epa_boxes", |bench| {
        bench.iter(|| black_box(penetration(black_box(&a), black_box(&b))));
    });

    group.finish();
}

// ============================================================================
// World frames
// ============================================================================

fn bench_world(c: &mut Criterion) {
    let mut group = c.benchmark_group("world");

    group.bench_function("box_stack_10_frame", |bench| {
        let mut world = box_stack(10);
        bench.iter(|| {
            world.step_frame();
            black_box(world.contacts().len())
        });
    });

    group.bench_function("chain_20_60_frames", |bench| {
        bench.iter(|| {
            let mut world = chain(20);
            for _ in 0..60 {
                world.step_frame();
            }
            black_box(world.bodies()[19].position())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_narrow_phase, bench_world);
criterion_main!(benches);
