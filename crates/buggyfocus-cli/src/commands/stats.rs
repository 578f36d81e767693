use clap::Subcommand;
use buggyfocus_core::StatsStore;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's totals, streak and 30-day heatmap
    Today,
    /// Recorded sessions, oldest first
    Sessions {
        /// Only show the most recent N sessions
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = StatsStore::open_default()?;

    match action {
        StatsAction::Today => {
            let stats = store.today();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Sessions { limit } => {
            let data = store.try_load()?;
            let skip = limit.map_or(0, |n| data.sessions.len().saturating_sub(n));
            println!("{}", serde_json::to_string_pretty(&data.sessions[skip..])?);
        }
    }
    Ok(())
}
