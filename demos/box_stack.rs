//! Box Stack Example
//!
//! Drops a column of boxes on a plane and waits for the stack to settle and
//! fall asleep.
//!
//! ```bash
//! cargo run --example box_stack
//! ```

use xpbd_rigid::prelude::*;

fn main() -> Result<(), PhysicsError> {
    let config = SolverConfig {
        substeps: 20,
        ..Default::default()
    };
    let mut world = World::new(config)?;

    // Ground
    world.add_body(
        RigidBodyBuilder::new(Collider::plane(Vec3::UNIT_Y, 20.0))
            .fixed()
            .friction(0.6)
            .restitution(0.0)
            .build(),
    );

    // Five boxes with a small gap between them
    let half = Vec3::splat(0.5);
    let boxes: Vec<BodyId> = (0..5)
        .map(|i| {
            world.add_body(
                RigidBodyBuilder::new(Collider::cuboid(half))
                    .box_mass(2.0, half)
                    .position(Vec3::new(0.0, 0.55 + 1.05 * i as f64, 0.0))
                    .friction(0.6)
                    .restitution(0.0)
                    .build(),
            )
        })
        .collect();

    println!("xpbd-rigid Box Stack");
    println!("====================");
    println!("Bodies: {}", world.bodies().len());
    println!();

    for frame in 0..600 {
        world.step(1.0 / 60.0);

        if frame % 60 == 0 {
            let top = world.body(boxes[4]).map(|b| b.position()).unwrap_or(Vec3::ZERO);
            println!(
                "t={:.1}s  top=({:.3}, {:.3}, {:.3})  contacts={}  asleep={}",
                frame as f64 / 60.0,
                top.x,
                top.y,
                top.z,
                world.contacts().len(),
                world.sleeping_count(),
            );
        }
    }

    println!();
    for (i, id) in boxes.iter().enumerate() {
        if let Some(body) = world.body(*id) {
            println!("box {}: y={:.4} sleeping={}", i, body.position().y, body.is_sleeping());
        }
    }
    Ok(())
}
