use anyhow::Result;
use mnemo_ai::{ConversationStore, RedbConversationStore};
use serde_json::{Value, json};

use crate::config::CliConfig;
use crate::output::print_json;
use crate::setup::open_storage;

pub async fn run(config: &CliConfig) -> Result<()> {
    let store = RedbConversationStore::new(open_storage(config)?);

    match store.load_profile().await? {
        Some(profile) => {
            let mut fields = profile.visible_fields();
            fields.insert("id".to_string(), json!(profile.id));
            print_json(&Value::Object(fields))
        }
        None => print_json(&json!({})),
    }
}
