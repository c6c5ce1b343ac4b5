use notesync_core::config::SyncConfig;
use notesync_core::store::{DocumentStore, SqliteStore};
use notesync_core::surface::DocumentSnapshot;

use crate::cli::block_on;

pub fn handle_show(config: &SyncConfig, raw: bool) -> bool {
    let store = match SqliteStore::open(&config.database_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!(
                "✗ Error opening database {}: {}",
                config.database_path.display(),
                e
            );
            return false;
        }
    };

    match block_on(render_document(&store, raw)) {
        Ok(Some(text)) => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
            true
        }
        Ok(None) => {
            eprintln!("No note stored yet. Run 'notesync edit' to create one.");
            true
        }
        Err(e) => {
            eprintln!("✗ Error reading note: {}", e);
            false
        }
    }
}

async fn render_document(
    store: &dyn DocumentStore,
    raw: bool,
) -> notesync_core::Result<Option<String>> {
    let Some(record) = store.get_document().await? else {
        return Ok(None);
    };
    if raw {
        let value: serde_json::Value = serde_json::from_str(&record.content)?;
        return Ok(Some(serde_json::to_string_pretty(&value)?));
    }
    let snapshot = DocumentSnapshot::parse(&record.content)?;
    Ok(Some(snapshot.content().to_plain_text()))
}
