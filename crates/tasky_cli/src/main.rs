//! Maintenance entry point for the Tasky core.
//!
//! # Responsibility
//! - Check that `tasky_core` links and reports its version.
//! - Inspect the sync queue of a local database file without changing it.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tasky_core::{LocalStore, RemoteCollection, SyncOperationType, SyncQueue};

const USAGE: &str = "usage: tasky <ping|version|queue <db>|drain <db>>";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["ping"] => {
            println!("tasky_core ping={}", tasky_core::ping());
            Ok(())
        }
        ["version"] => {
            println!("tasky_core version={}", tasky_core::core_version());
            Ok(())
        }
        ["queue", db] => queue_len(Path::new(db)),
        ["drain", db] => drain(Path::new(db)),
        _ => Err(USAGE.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn open_store(db: &Path) -> Result<Arc<LocalStore>, String> {
    LocalStore::open(db)
        .map(Arc::new)
        .map_err(|err| format!("cannot open `{}`: {err}", db.display()))
}

fn queue_len(db: &Path) -> Result<(), String> {
    let store = open_store(db)?;
    let pending = SyncQueue::new(store).len().map_err(|err| err.to_string())?;
    println!("pending={pending}");
    Ok(())
}

/// Prints the remote write the next pass would make for each pending
/// operation, oldest first. The queue is left as it is.
fn drain(db: &Path) -> Result<(), String> {
    let store = open_store(db)?;
    let queue = SyncQueue::new(store);
    let pending = queue.pending().map_err(|err| err.to_string())?;
    let stored = queue.len().map_err(|err| err.to_string())?;

    let mut writes = 0;
    for op in &pending {
        let target = match RemoteCollection::for_entity(op.entity) {
            Some(collection) => {
                writes += 1;
                let action = match op.op_type {
                    SyncOperationType::Delete => "delete",
                    SyncOperationType::Create | SyncOperationType::Update => "upsert",
                };
                format!("{action}:{}", collection.name())
            }
            None => "skip".to_string(),
        };
        println!(
            "op_id={} type={} entity={} entity_id={} target={}",
            op.id,
            op.op_type.as_str(),
            op.entity.as_str(),
            op.entity_id,
            target
        );
    }
    println!(
        "pending={} writes={} skipped={} undecodable={}",
        pending.len(),
        writes,
        pending.len() - writes,
        stored.saturating_sub(pending.len())
    );
    Ok(())
}
