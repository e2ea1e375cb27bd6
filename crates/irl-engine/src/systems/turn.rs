//! The PLAYER → COMPUTER → SETUP cycle.
//!
//! PLAYER tracks the real balls. Ending the turn binds every sane sighting
//! into the physics space and fires the computer's break shot. COMPUTER
//! steps the simulation until every ball has settled. SETUP guides the
//! player to move the real balls onto the simulated layout, returning to
//! PLAYER once every ball is within tolerance.

use glam::Vec2;
use image::RgbImage;
use rand::Rng;

use crate::api::session::GameSession;
use crate::api::types::{SessionEvent, TurnState};
use crate::error::{IrlError, Result};
use crate::systems::overlay::{compose, Overlay};

/// A detected ball is aligned with its target when no further than `tolerance`.
pub fn is_aligned(detected: Vec2, target: Vec2, tolerance: f32) -> bool {
    detected.distance(target) <= tolerance
}

/// Run one tick of the current state against `frame`.
pub(crate) fn tick(session: &mut GameSession, frame: &RgbImage) -> Result<RgbImage> {
    let expected = (session.width, session.height);
    if frame.dimensions() != expected {
        return Err(IrlError::FrameSize {
            expected,
            actual: frame.dimensions(),
        });
    }

    session.overlays.clear();
    match session.state {
        TurnState::Player => player_tick(session, frame),
        TurnState::Computer => computer_tick(session),
        TurnState::Setup => setup_tick(session, frame),
    }
    Ok(compose(frame, &session.overlays))
}

fn player_tick(session: &mut GameSession, frame: &RgbImage) {
    let locator = session.locator;
    for ball in session.roster.iter_mut() {
        match locator.locate(frame, &ball.range) {
            Some(det) => {
                ball.update_detection(det.position, det.radius);
                session
                    .overlays
                    .push(Overlay::outline(det.position, det.radius, ball.color));
            }
            None => log::debug!("{}: not detected", ball.name),
        }
    }
}

fn computer_tick(session: &mut GameSession) {
    session.step_physics();

    let max_radius = session.max_radius();
    for ball in session.roster.iter() {
        if let Some((pos, radius)) = ball.simulated_within(&session.physics, max_radius) {
            session.overlays.push(Overlay::outline(pos, radius, ball.color));
        }
    }

    if session.is_settled() {
        session.set_state(TurnState::Setup);
    }
}

fn setup_tick(session: &mut GameSession, frame: &RgbImage) {
    let locator = session.locator;
    let max_radius = session.max_radius();
    let tolerance = session.config.setup_error;
    let mut aligned = true;

    for ball in session.roster.iter() {
        let Some((target, target_radius)) = ball.simulated_within(&session.physics, max_radius)
        else {
            log::debug!("{}: no sane simulated position", ball.name);
            continue;
        };

        // The live sighting is only compared, never written back. Oversized
        // sightings are occlusion noise and take no part in alignment.
        let sighting = locator
            .locate(frame, &ball.range)
            .filter(|det| det.radius < max_radius);
        if let Some(det) = sighting {
            let distance = det.position.distance(target);
            log::debug!("{}: {:.1}px from target", ball.name, distance);
            session.overlays.push(Overlay::correction(det.position, target));
            if !is_aligned(det.position, target, tolerance) {
                aligned = false;
            }
        }
        session
            .overlays
            .push(Overlay::target(target, target_radius, ball.color));
    }

    if aligned {
        session.release_all();
        session.set_state(TurnState::Player);
        session.set_can_end_turn(true);
    }
}

/// PLAYER → COMPUTER. Returns `false` without side effects in any other state.
pub(crate) fn end_turn(session: &mut GameSession) -> bool {
    if session.state != TurnState::Player {
        log::warn!("End turn requested during {}, ignored", session.state);
        return false;
    }
    begin_computer_phase(session);
    true
}

fn begin_computer_phase(session: &mut GameSession) {
    let bound = session.bind_all();
    log::info!("Bound {} of {} balls", bound, session.roster.len());

    let break_ball = session.config.break_ball.clone();
    match session.roster.find(&break_ball).filter(|b| b.is_bound()).map(|b| b.id) {
        Some(id) => {
            let lo = session.config.break_impulse_min.min(session.config.break_impulse_max);
            let hi = session.config.break_impulse_min.max(session.config.break_impulse_max);
            let impulse = Vec2::new(session.rng.gen_range(lo..=hi), session.rng.gen_range(lo..=hi));
            let local = Vec2::from(session.config.break_point);
            session.apply_impulse(id, impulse, local);
            log::info!("Break shot on {}: {:?}", break_ball, impulse);
            session.emit_event(SessionEvent::BreakApplied { ball: id, impulse });
        }
        None => log::warn!("Break ball {} is not bound, no shot this turn", break_ball),
    }

    session.set_can_end_turn(false);
    session.set_state(TurnState::Computer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_is_inclusive() {
        let target = Vec2::new(100.0, 100.0);
        assert!(is_aligned(Vec2::new(170.0, 100.0), target, 70.0));
        assert!(!is_aligned(Vec2::new(171.0, 100.0), target, 70.0));
        assert!(is_aligned(target, target, 0.0));
    }
}
