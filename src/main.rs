mod config;
mod drive;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use krever_motor::{Motor, MotorController, MoveProfile, SimulatedGpio};
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = config::load_config().context("failed to load configuration")?;
    info!(pins = ?config.pins, "Krever base started on simulated GPIO.");

    let controller = Arc::new(
        MotorController::new(config.pins, SimulatedGpio::new())
            .context("invalid pin configuration")?,
    );
    // No point continuing without the driver pins.
    controller.init().context("motor driver initialization failed")?;

    let profile = MoveProfile::from(config.move_profile);
    let motors = config.run.motors.clone();
    let cancel = Arc::new(AtomicBool::new(false));

    info!("Spawning drive task...");
    let mut drive = tokio::task::spawn_blocking({
        let controller = Arc::clone(&controller);
        let cancel = Arc::clone(&cancel);
        move || drive::drive_sequence(controller.as_ref(), &motors, &profile, &cancel)
    });

    tokio::select! {
        joined = &mut drive => {
            let failures = joined.context("drive task panicked")?;
            if failures > 0 {
                warn!(failures, "Drive sequence finished with failed moves.");
            } else {
                info!("Drive sequence finished.");
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            warn!("Interrupted, stopping all motors.");
            cancel.store(true, Ordering::SeqCst);
            if let Err(e) = controller.stop_all() {
                error!("Safety stop failed: {}", e);
            }
        }
    }

    for motor in Motor::ALL {
        if let Ok(state) = controller.state(motor) {
            info!(?state, "Final motor state");
        }
    }

    controller.shutdown().context("motor driver shutdown failed")?;
    info!("Krever base stopped.");
    Ok(())
}
