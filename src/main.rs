use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pet_quest_engine::{Database, EngineConfig, QuestTracker};

const DEFAULT_PLAYER_ID: &str = "player";

const HELP: &str = "commands:
  available <level>
  start <quest_id>
  act <type> <target> <amount>
  choose <quest_id> <choice text>
  status <quest_id>
  active
  titles
  save
  quit";

fn init_tracing(config: &EngineConfig) {
    let mut filter = EnvFilter::from_default_env();
    match config.log_filter.parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring invalid log filter '{}': {}", config.log_filter, e),
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to encode output: {}", e),
    }
}

/// Handle one input line; returns false when the session should end
async fn handle_command(
    line: &str,
    tracker: &mut QuestTracker,
    db: &Database,
    player_id: &str,
) -> bool {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return true;
    };

    match command {
        "available" => {
            let level = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1);
            for quest in tracker.available(level) {
                println!("{}  {}", quest.id, quest.name);
            }
        }
        "start" => match parts.next() {
            Some(quest_id) => match tracker.start_quest(quest_id) {
                Ok(dialogue) => {
                    for line in dialogue {
                        println!("{}", line);
                    }
                }
                Err(e) => println!("error: {}", e),
            },
            None => println!("usage: start <quest_id>"),
        },
        "act" => {
            let (Some(objective_type), Some(target)) = (parts.next(), parts.next()) else {
                println!("usage: act <type> <target> <amount>");
                return true;
            };
            let amount = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1);
            let report = tracker.record_action(objective_type, &target.replace('_', " "), amount);
            print_json(&report);
        }
        "choose" => {
            let Some(quest_id) = parts.next() else {
                println!("usage: choose <quest_id> <choice text>");
                return true;
            };
            let choice = parts.collect::<Vec<_>>().join(" ");
            match tracker.make_choice(quest_id, &choice) {
                Ok(result) => print_json(&result),
                Err(e) => println!("error: {}", e),
            }
        }
        "status" => match parts.next() {
            Some(quest_id) => match tracker.status(quest_id) {
                Ok(view) => print_json(&view),
                Err(e) => println!("error: {}", e),
            },
            None => println!("usage: status <quest_id>"),
        },
        "active" => print_json(&tracker.active()),
        "titles" => {
            for title in tracker.earned_titles() {
                println!("{}", title);
            }
        }
        "save" => {
            if let Err(e) = db.save_quest_state(player_id, tracker.state()).await {
                error!("{}", e);
            }
        }
        "quit" | "exit" => return false,
        "help" => println!("{}", HELP),
        other => println!("unknown command '{}'; try 'help'", other),
    }
    true
}

#[tokio::main]
async fn main() {
    let config = match EngineConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    init_tracing(&config);

    let catalog = match config.load_catalog() {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Failed to load quest catalog: {}", e);
            std::process::exit(1);
        }
    };
    info!("Quest catalog ready with {} quests", catalog.len());

    let db = match Database::new(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database {}: {}", config.database_url, e);
            std::process::exit(1);
        }
    };

    let player_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PLAYER_ID.to_string());

    let mut tracker = match db.load_quest_state(&player_id).await {
        Ok(Some(state)) => {
            info!("Resuming saved quests for {}", player_id);
            QuestTracker::from_state(catalog, state, config.tracker_options())
        }
        Ok(None) => {
            match QuestTracker::new_player(catalog, &config.starter_quest, config.tracker_options()) {
                Ok(tracker) => tracker,
                Err(e) => {
                    error!("Cannot create player: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if !handle_command(line.trim(), &mut tracker, &db, &player_id).await {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                break;
            }
        }
    }

    let state = tracker.into_state();
    match db.save_quest_state(&player_id, &state).await {
        Ok(()) => info!("Saved quest state for {}", player_id),
        Err(e) => error!("{}", e),
    }
}
