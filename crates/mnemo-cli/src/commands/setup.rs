use std::sync::Arc;

use anyhow::Result;
use mnemo_ai::profile::ProfileUpdate;
use mnemo_ai::{ConversationStore, RedbConversationStore};
use serde_json::{Map, Value, json};

use crate::cli::{OutputFormat, SetupArgs};
use crate::config::CliConfig;
use crate::output::print_json;
use crate::setup::open_storage;

fn seed_fields(args: &SetupArgs) -> Map<String, Value> {
    [
        ("name", &args.name),
        ("last_name", &args.last_name),
        ("occupation", &args.occupation),
        ("location", &args.location),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), Value::String(v.clone()))))
    .collect()
}

pub async fn run(config: &CliConfig, args: SetupArgs, format: OutputFormat) -> Result<()> {
    let storage = open_storage(config)?;
    let store = RedbConversationStore::new(storage);

    let fields = seed_fields(&args);
    let profile = if fields.is_empty() {
        store.load_profile().await?
    } else {
        let update = ProfileUpdate::from_json(&Value::Object(fields))?;
        Some(store.merge_profile(&update).await?)
    };

    if format.is_json() {
        return print_json(&json!({
            "db_path": config.db_path(),
            "profile": profile,
        }));
    }

    println!("Database ready at {}", config.db_path().display());
    if let Some(profile) = profile {
        println!("Profile: {}", Value::Object(profile.visible_fields()));
    }
    Ok(())
}
