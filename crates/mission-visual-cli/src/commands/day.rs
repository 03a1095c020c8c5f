//! Daily check-in commands for CLI.

use clap::Subcommand;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum DayAction {
    /// Mark a day as done
    Complete {
        /// Challenge ID
        challenge_id: String,
        /// Day number (1-based)
        day: u32,
        /// Free-form note
        #[arg(long, default_value = "")]
        note: String,
        /// Attachment reference (repeatable)
        #[arg(long = "attachment")]
        attachments: Vec<String>,
    },
    /// Mark overdue days as missed
    Check {
        /// Challenge ID
        challenge_id: String,
    },
}

pub fn run(action: DayAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = ctx.open()?;

    match action {
        DayAction::Complete {
            challenge_id,
            day,
            note,
            attachments,
        } => {
            let challenge = ws
                .manager
                .complete_day(&challenge_id, day, &note, attachments)?;
            print_json(&challenge)?;
        }
        DayAction::Check { challenge_id } => {
            let challenge = ws.manager.detect_missed(&challenge_id)?;
            print_json(&challenge)?;
        }
    }

    ws.report()
}
