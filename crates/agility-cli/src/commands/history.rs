use clap::Subcommand;
use agility_core::SessionStore;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Most recent sessions
    List {
        /// Only sessions for this player
        #[arg(long)]
        player: Option<String>,
        /// Maximum number of rows
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Full record of one session
    Show {
        /// Session id
        id: String,
    },
    /// Aggregate history for a player
    Player {
        /// Player id
        id: String,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = SessionStore::open()?;

    match action {
        HistoryAction::List { player, limit } => {
            let sessions = match player {
                Some(player) => store.list_for_player(&player, limit)?,
                None => store.list_recent(limit)?,
            };
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        HistoryAction::Show { id } => match store.get(&id)? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => return Err(format!("session not found: {id}").into()),
        },
        HistoryAction::Player { id } => {
            let summary = store.player_summary(&id)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
