//! Pendulum Chain Example
//!
//! A chain of links joined by spherical joints with swing limits, released
//! from a horizontal start.
//!
//! ```bash
//! cargo run --example pendulum_chain
//! ```

use xpbd_rigid::prelude::*;

const LINKS: usize = 8;

fn main() -> Result<(), PhysicsError> {
    let mut world = World::new(SolverConfig::default())?;

    let half = Vec3::new(0.2, 0.05, 0.05);
    let left = Pose::from_position(Vec3::new(-0.25, 0.0, 0.0));
    let right = Pose::from_position(Vec3::new(0.25, 0.0, 0.0));

    let links: Vec<BodyId> = (0..LINKS)
        .map(|i| {
            world.add_body(
                RigidBodyBuilder::new(Collider::cuboid(half))
                    .box_mass(0.5, half)
                    .position(Vec3::new(0.25 + 0.5 * i as f64, 0.0, 0.0))
                    .build(),
            )
        })
        .collect();

    // Anchor the first link to a fixed point in the world
    world.add_constraint(Constraint::spherical(links[0], None, left, Pose::IDENTITY))?;

    for pair in links.windows(2) {
        let mut joint = Constraint::spherical(pair[0], Some(pair[1]), right, left);
        joint.set_swing_limits(-0.6, 0.6);
        joint.set_damping(0.0, 0.2);
        world.add_constraint(joint)?;
    }

    println!("xpbd-rigid Pendulum Chain");
    println!("=========================");
    println!("Links: {}  Joints: {}", LINKS, world.constraints().len());
    println!();

    for frame in 0..300 {
        world.step(1.0 / 60.0);

        if frame % 30 == 0 {
            let tip = world
                .body(links[LINKS - 1])
                .map(|b| b.pose().transform_point(right.position))
                .unwrap_or(Vec3::ZERO);
            let tension = world
                .constraints()
                .first()
                .map(|c| c.force(world.config().substep_time()))
                .unwrap_or(0.0);
            println!(
                "t={:.1}s  tip=({:.3}, {:.3}, {:.3})  anchor force={:.2}",
                frame as f64 / 60.0,
                tip.x,
                tip.y,
                tip.z,
                tension,
            );
        }
    }
    Ok(())
}
