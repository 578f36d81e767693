use clap::Args;
use buggyfocus_core::messages::{self, MessageContext, Mood};

#[derive(Args)]
pub struct SnarkArgs {
    /// Mood: idle, distracted, starting, finished, gaveup, extending, flowing
    #[arg(default_value = "idle")]
    category: String,
    /// Task name to fill into the line
    #[arg(long, default_value = "")]
    task: String,
    /// Session length in minutes to fill into the line
    #[arg(long, default_value = "25")]
    minutes: i64,
}

pub fn run(args: SnarkArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mood = Mood::parse_lossy(&args.category);
    let ctx = MessageContext::new(&args.task, args.minutes * 60);
    println!("{}", messages::select(mood, ctx));
    Ok(())
}
