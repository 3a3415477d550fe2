use std::sync::atomic::{AtomicBool, Ordering};

use krever_motor::{MotorControl, MoveProfile};
use tracing::{info, warn};

/// Move each motor in `motors` in turn with `profile`, checking `cancel`
/// before every move. Returns how many moves failed.
///
/// A move that is already running when `cancel` is set still finishes its
/// duration; the remaining moves are skipped.
pub fn drive_sequence<C: MotorControl>(
    controller: &C,
    motors: &[i32],
    profile: &MoveProfile,
    cancel: &AtomicBool,
) -> usize {
    let mut failures = 0;
    for (done, &motor_id) in motors.iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            warn!(skipped = motors.len() - done, "Drive sequence cancelled.");
            break;
        }
        info!(motor_id, ?profile, "Moving motor");
        if !controller.move_motor(motor_id, profile) {
            failures += 1;
        }
    }
    failures
}
