use ansi_term::Colour;
use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::{
    meditation::{BreathPhase, BreathingPlan, BreathingSession},
    utils::clock::DefaultClock,
};

use super::shutdown::detect_shutdown;

#[derive(Debug, Clone, Copy, clap::Args)]
pub struct MeditateArgs {
    #[arg(long, default_value_t = 10, help = "Length of the session in minutes, from 1 to 120")]
    minutes: u64,
    #[arg(long, default_value_t = 5, help = "Seconds to breathe in, from 1 to 60")]
    breath_in: u64,
    #[arg(long, default_value_t = 5, help = "Seconds to breathe out, from 1 to 60")]
    breath_out: u64,
}

impl MeditateArgs {
    pub fn session(&self) -> Result<BreathingSession> {
        let plan = BreathingPlan::new(self.minutes, self.breath_in, self.breath_out)?;
        Ok(BreathingSession::new(plan, Box::new(DefaultClock)))
    }
}

pub fn print_phase(phase: BreathPhase) {
    let colour = match phase {
        BreathPhase::In => Colour::Green,
        BreathPhase::Out => Colour::Blue,
    };
    println!("{}", colour.bold().paint(phase.to_string()));
}

pub fn print_outcome(finished: bool) {
    if finished {
        println!("Meditation complete. Well done!");
    } else {
        println!("Meditation stopped.");
    }
}

pub async fn run_meditation(args: MeditateArgs) -> Result<()> {
    let session = args.session()?;
    let shutdown = CancellationToken::new();
    tokio::spawn(detect_shutdown(shutdown.clone()));

    println!("Meditating for {} minutes. Press Ctrl-C to stop.", args.minutes);
    let finished = session.run(shutdown.clone(), print_phase).await;
    shutdown.cancel();
    print_outcome(finished);
    Ok(())
}
