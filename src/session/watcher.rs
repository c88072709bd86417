//! Config-file watcher — reconnects automatically when the bridge
//! configuration changes on disk.

use anyhow::Result;
use notify_debouncer_full::{
    new_debouncer,
    notify::{EventKind, RecursiveMode, Watcher as _},
    DebounceEventResult,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::Session;

const DEBOUNCE: Duration = Duration::from_secs(2);

/// Guard that keeps the debounced watcher alive. Drop to stop watching.
pub struct ConfigWatcher {
    _debouncer: notify_debouncer_full::Debouncer<
        notify_debouncer_full::notify::RecommendedWatcher,
        notify_debouncer_full::FileIdMap,
    >,
}

/// Watch `config_path` and trigger [`Session::auto_reconnect`] on changes.
///
/// Only modify/create events count — editors commonly emit a burst of both
/// on save, hence the debounce. The parent directory is watched because
/// watching a not-yet-existing file fails on some platforms.
pub fn watch_config(config_path: &Path, session: Arc<Session>) -> Result<ConfigWatcher> {
    let file_name = config_path.file_name().map(|n| n.to_os_string());
    let rt_handle = tokio::runtime::Handle::current();

    let mut debouncer = new_debouncer(
        DEBOUNCE,
        None,
        move |result: DebounceEventResult| match result {
            Ok(events) => {
                let relevant = events.iter().any(|e| {
                    matches!(e.event.kind, EventKind::Modify(_) | EventKind::Create(_))
                        && e.event.paths.iter().any(|p| {
                            p.file_name() == file_name.as_deref()
                        })
                });
                if relevant {
                    let session = session.clone();
                    rt_handle.spawn(async move {
                        session.auto_reconnect().await;
                    });
                }
            }
            Err(errors) => {
                for e in errors {
                    warn!(err = %e, "config watcher error");
                }
            }
        },
    )?;

    let watch_path = config_path.parent().unwrap_or_else(|| Path::new("."));
    debouncer
        .watcher()
        .watch(watch_path, RecursiveMode::NonRecursive)?;
    info!(path = %config_path.display(), "config watcher started");

    Ok(ConfigWatcher {
        _debouncer: debouncer,
    })
}
