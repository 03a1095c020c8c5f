//! Challenge management commands for CLI.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use mission_visual_core::ChallengeStatus;

use super::{print_json, Context};

#[derive(Subcommand)]
pub enum ChallengeAction {
    /// Create a new 30-day challenge
    Create {
        /// Challenge title
        title: String,
        /// What the challenge is about
        #[arg(long, default_value = "")]
        description: String,
        /// How the daily task is carried out
        #[arg(long, default_value = "")]
        execution: String,
        /// First day as RFC 3339 instant (default: now)
        #[arg(long)]
        start: Option<DateTime<Utc>>,
    },
    /// List challenges
    List {
        /// Filter by status (active, completed, failed, archived)
        #[arg(long)]
        status: Option<ChallengeStatus>,
    },
    /// Show one challenge with all of its days
    Show {
        /// Challenge ID
        id: String,
    },
    /// Show completion progress
    Progress {
        /// Challenge ID
        id: String,
    },
    /// Give up on a challenge
    Fail {
        /// Challenge ID
        id: String,
    },
    /// Archive a challenge and start a fresh 30-day cycle
    Restart {
        /// Challenge ID
        id: String,
    },
}

pub fn run(action: ChallengeAction, ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let mut ws = ctx.open()?;

    match action {
        ChallengeAction::Create {
            title,
            description,
            execution,
            start,
        } => {
            let start = start.unwrap_or_else(Utc::now);
            let challenge = ws
                .manager
                .create_challenge(&title, &description, &execution, start)?;
            print_json(&challenge)?;
        }
        ChallengeAction::List { status } => {
            let challenges = ws.manager.challenges(status)?;
            print_json(&challenges)?;
        }
        ChallengeAction::Show { id } => {
            print_json(&ws.manager.challenge(&id)?)?;
        }
        ChallengeAction::Progress { id } => {
            print_json(&ws.manager.progress(&id)?)?;
        }
        ChallengeAction::Fail { id } => {
            print_json(&ws.manager.fail_challenge(&id)?)?;
        }
        ChallengeAction::Restart { id } => {
            print_json(&ws.manager.restart_challenge(&id)?)?;
        }
    }

    ws.report()
}
