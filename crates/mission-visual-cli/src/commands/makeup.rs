//! Make-up day commands for CLI.

use clap::Subcommand;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum MakeupAction {
    /// Append make-up days to a challenge
    Add {
        /// Challenge ID
        challenge_id: String,
        /// Number of days to add
        #[arg(long, default_value = "1")]
        count: u32,
    },
    /// Resolve the oldest missed day with a make-up day
    Compensate {
        /// Challenge ID
        challenge_id: String,
        /// ID of the day used as make-up
        makeup_day_id: String,
    },
}

pub fn run(action: MakeupAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = ctx.open()?;

    match action {
        MakeupAction::Add {
            challenge_id,
            count,
        } => {
            let challenge = ws.manager.add_makeup_slots(&challenge_id, count)?;
            print_json(&challenge)?;
        }
        MakeupAction::Compensate {
            challenge_id,
            makeup_day_id,
        } => {
            let challenge = ws.manager.compensate(&challenge_id, &makeup_day_id)?;
            print_json(&challenge)?;
        }
    }

    ws.report()
}
