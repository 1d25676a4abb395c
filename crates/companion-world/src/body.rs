//! Kinematic agent body.
//!
//! A [`Body`] is a command sink: controllers call the [`MovementDriver`]
//! methods during a tick, which only record intent. After every controller
//! has run, the tick driver calls [`Body::integrate`] to apply that intent
//! against the sandbox terrain. Commands are consumed by `integrate`, so a
//! body that nobody commands in a tick stands still.

use companion_types::{AgentClass, Vec3};

use crate::sandbox::SandboxWorld;
use crate::substrate::MovementDriver;
use crate::terrain::JUMPABLE_HEIGHT;

/// Highest ground step a walking body climbs without jumping.
const MAX_STEP_CLIMB: f32 = 0.6;

/// How long a jump keeps the body airborne, in seconds.
const JUMP_AIR_TIME: f32 = 0.6;

/// Movement below this many meters in one integration counts as no progress.
const MIN_STEP: f32 = 0.001;

/// One recorded move command.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MoveCommand {
    point: Vec3,
    stop_distance: f32,
    run: bool,
}

/// Physical parameters of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyParams {
    /// Walking speed in m/s.
    pub walk_speed: f32,
    /// Running speed in m/s.
    pub run_speed: f32,
    /// Turn rate in radians per second.
    pub turn_rate: f32,
    /// Horizontal clearance kept from obstacles.
    pub clearance: f32,
}

impl BodyParams {
    /// Defaults for an agent class.
    pub const fn for_class(class: AgentClass) -> Self {
        match class {
            AgentClass::Humanoid => Self {
                walk_speed: 2.5,
                run_speed: 5.0,
                turn_rate: 8.0,
                clearance: 0.3,
            },
            AgentClass::Large => Self {
                walk_speed: 2.0,
                run_speed: 4.0,
                turn_rate: 4.0,
                clearance: 1.0,
            },
        }
    }
}

/// A kinematic body in the sandbox world.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    position: Vec3,
    yaw: f32,
    class: AgentClass,
    params: BodyParams,
    command: Option<MoveCommand>,
    look_target: Option<Vec3>,
    jump_requested: bool,
    airborne: f32,
    last_progress: bool,
}

impl Body {
    /// A body standing at `position`, facing +Z.
    pub const fn new(position: Vec3, class: AgentClass) -> Self {
        Self {
            position,
            yaw: 0.0,
            class,
            params: BodyParams::for_class(class),
            command: None,
            look_target: None,
            jump_requested: false,
            airborne: 0.0,
            last_progress: true,
        }
    }

    /// Agent class used for path queries.
    pub const fn class(&self) -> AgentClass {
        self.class
    }

    /// Physical parameters.
    pub const fn params(&self) -> BodyParams {
        self.params
    }

    /// Current yaw in radians.
    pub const fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Whether the body is mid-jump.
    pub fn is_airborne(&self) -> bool {
        self.airborne > 0.0
    }

    /// Instantly relocate the body, dropping any pending command.
    pub const fn teleport(&mut self, position: Vec3) {
        self.position = position;
        self.command = None;
        self.look_target = None;
        self.last_progress = true;
    }

    /// Apply this tick's commands against the world.
    pub fn integrate(&mut self, dt: f32, world: &SandboxWorld) {
        if self.jump_requested && self.airborne <= 0.0 {
            self.airborne = JUMP_AIR_TIME;
        }
        self.jump_requested = false;

        let mut facing = self.look_target.take();

        if let Some(command) = self.command.take() {
            let remaining = self.position.horizontal_distance(command.point) - command.stop_distance;
            let direction = self.position.direction_to(command.point);
            if remaining > 0.0 && direction != Vec3::ZERO {
                let speed = if command.run {
                    self.params.run_speed
                } else {
                    self.params.walk_speed
                };
                let step = (speed * dt).min(remaining);
                self.last_progress = self.try_step(direction * step, world);
                if facing.is_none() {
                    facing = Some(command.point);
                }
            } else {
                self.last_progress = true;
            }
        }

        if let Some(point) = facing {
            self.turn_toward(point, dt);
        }

        self.airborne = (self.airborne - dt).max(0.0);
    }

    /// Attempt one displacement; returns whether the body moved.
    fn try_step(&mut self, delta: Vec3, world: &SandboxWorld) -> bool {
        let candidate = self.position + delta;
        let Some(ground) = world.terrain().ground_height(candidate) else {
            return false;
        };
        let climb_limit = if self.is_airborne() {
            JUMPABLE_HEIGHT.max(MAX_STEP_CLIMB)
        } else {
            MAX_STEP_CLIMB
        };
        if ground - self.position.y > climb_limit {
            return false;
        }
        let next = candidate.with_y(ground);
        if world.walk_blocked(self.position, next, self.params.clearance, self.is_airborne()) {
            return false;
        }
        let moved = self.position.horizontal_distance(next) >= MIN_STEP;
        self.position = next;
        moved
    }

    fn turn_toward(&mut self, point: Vec3, dt: f32) {
        let direction = self.position.direction_to(point);
        if direction == Vec3::ZERO {
            return;
        }
        let desired = direction.yaw();
        let mut delta = desired - self.yaw;
        while delta > core::f32::consts::PI {
            delta -= core::f32::consts::TAU;
        }
        while delta < -core::f32::consts::PI {
            delta += core::f32::consts::TAU;
        }
        let max_turn = self.params.turn_rate * dt;
        self.yaw += delta.clamp(-max_turn, max_turn);
    }
}

impl MovementDriver for Body {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn forward(&self) -> Vec3 {
        Vec3::from_yaw(self.yaw)
    }

    fn move_toward(&mut self, point: Vec3, stop_distance: f32, run: bool) -> bool {
        if self.position.horizontal_distance(point) <= stop_distance {
            self.command = None;
            return true;
        }
        self.command = Some(MoveCommand {
            point,
            stop_distance,
            run,
        });
        self.last_progress
    }

    fn stop(&mut self) {
        self.command = None;
    }

    fn look_at(&mut self, point: Vec3) {
        self.look_target = Some(point);
    }

    fn is_facing(&self, point: Vec3, angle_tolerance: f32, invert: bool) -> bool {
        let to_point = self.position.direction_to(point);
        if to_point == Vec3::ZERO {
            return !invert;
        }
        let within = self.forward().horizontal_angle_deg(to_point) <= angle_tolerance;
        within != invert
    }

    fn jump(&mut self) {
        self.jump_requested = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{Obstacle, Terrain};

    fn flat_world() -> SandboxWorld {
        SandboxWorld::new(Terrain::flat(100.0))
    }

    #[test]
    fn walks_toward_point_and_stops() {
        let world = flat_world();
        let mut body = Body::new(Vec3::ZERO, AgentClass::Humanoid);
        let target = Vec3::new(0.0, 0.0, 3.0);
        for _ in 0..40 {
            body.move_toward(target, 1.0, false);
            body.integrate(0.1, &world);
        }
        let dist = body.position().horizontal_distance(target);
        assert!((dist - 1.0).abs() < 0.05, "ended {dist} from target");
        assert!(body.move_toward(target, 1.0, false));
    }

    #[test]
    fn uncommanded_body_stands_still() {
        let world = flat_world();
        let mut body = Body::new(Vec3::ZERO, AgentClass::Humanoid);
        body.move_toward(Vec3::new(5.0, 0.0, 0.0), 0.5, true);
        body.integrate(0.1, &world);
        let after_one = body.position();
        body.integrate(0.1, &world);
        assert_eq!(body.position(), after_one);
    }

    #[test]
    fn obstacle_blocks_and_reports_no_progress() {
        let mut world = flat_world();
        world.terrain_mut().obstacles.push(Obstacle {
            center: Vec3::new(0.0, 0.0, 1.0),
            radius: 0.8,
            height: 3.0,
        });
        let mut body = Body::new(Vec3::ZERO, AgentClass::Humanoid);
        let target = Vec3::new(0.0, 0.0, 5.0);
        body.move_toward(target, 0.2, false);
        body.integrate(0.1, &world);
        assert!(!body.move_toward(target, 0.2, false));
    }

    #[test]
    fn jump_clears_low_obstacle() {
        let mut world = flat_world();
        world.terrain_mut().obstacles.push(Obstacle {
            center: Vec3::new(0.0, 0.0, 0.9),
            radius: 0.5,
            height: 0.8,
        });
        let mut body = Body::new(Vec3::ZERO, AgentClass::Humanoid);
        let target = Vec3::new(0.0, 0.0, 5.0);
        body.jump();
        body.move_toward(target, 0.2, false);
        body.integrate(0.1, &world);
        assert!(body.position().z > 0.0);
    }

    #[test]
    fn facing_turns_gradually() {
        let world = flat_world();
        let mut body = Body::new(Vec3::ZERO, AgentClass::Humanoid);
        let behind = Vec3::new(0.0, 0.0, -5.0);
        assert!(!body.is_facing(behind, 10.0, false));
        assert!(body.is_facing(behind, 10.0, true));
        for _ in 0..10 {
            body.look_at(behind);
            body.integrate(0.1, &world);
        }
        assert!(body.is_facing(behind, 10.0, false));
    }

    #[test]
    fn teleport_resets_command() {
        let world = flat_world();
        let mut body = Body::new(Vec3::ZERO, AgentClass::Humanoid);
        body.move_toward(Vec3::new(5.0, 0.0, 0.0), 0.5, false);
        body.teleport(Vec3::new(20.0, 0.0, 20.0));
        body.integrate(0.1, &world);
        assert_eq!(body.position(), Vec3::new(20.0, 0.0, 20.0));
    }
}
