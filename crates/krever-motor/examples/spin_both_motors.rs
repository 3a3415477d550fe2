use krever_motor::*;

const STEP: i32 = 25;

fn main() {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let gpio = SimulatedGpio::new();
    let controller = match MotorController::new(PinConfig::default(), gpio.clone()) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Failed to create motor controller: {}", e);
            return;
        }
    };

    if let Err(e) = controller.init() {
        eprintln!("Failed to initialize motor driver: {}", e);
        return;
    }

    println!("Ramping both motors in opposite directions...");
    for speed in (0..=100).step_by(STEP as usize) {
        let commands = [
            (Motor::Left, Direction::Forward),
            (Motor::Right, Direction::Backward),
        ];
        for (motor, direction) in commands {
            if let Err(e) = controller.run(motor, direction, speed) {
                eprintln!("Failed to run {} motor: {}", motor, e);
                return;
            }
        }
        println!(
            "Speed {:>3}: ENA duty {:?}, ENB duty {:?}",
            speed,
            gpio.duty(22),
            gpio.duty(25)
        );
    }

    println!("\nBraking left, coasting right...");
    let stopped = controller
        .brake(Motor::Left)
        .and_then(|()| controller.stop(Motor::Right));
    if let Err(e) = stopped {
        eprintln!("Failed to stop motors: {}", e);
    }

    for motor in Motor::ALL {
        match controller.state(motor) {
            Ok(state) => println!("{} motor: {:?}", motor, state),
            Err(e) => eprintln!("No state for {} motor: {}", motor, e),
        }
    }

    if let Err(e) = controller.shutdown() {
        eprintln!("Shutdown failed: {}", e);
    }
    println!("\nDone. {} pin writes issued.", gpio.writes().len());
}
