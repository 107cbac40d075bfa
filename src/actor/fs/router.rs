use super::types::DebouncedEvents;
use crate::actor::messages::CompilerMsg;
use crate::config::HotviewConfig;
use crate::utils::path::normalize_path;

pub(super) fn log_events(events: &DebouncedEvents) {
    for (path, kind) in &events.0 {
        crate::debug!("watch"; "{}: {}", kind.label(), path.display());
    }
}

/// Removals go first so a rename drops the old file's views before the
/// new file defines them again.
pub(super) fn events_to_messages(events: DebouncedEvents, config: &HotviewConfig) -> Vec<CompilerMsg> {
    let (mut changed, removed) = events.split();

    let mut messages = Vec::new();
    let config_file = normalize_path(&config.config_path);
    let before = changed.len();
    changed.retain(|p| *p != config_file);
    if changed.len() != before {
        messages.push(CompilerMsg::ConfigChanged);
    }

    if !removed.is_empty() {
        messages.push(CompilerMsg::Remove(removed));
    }
    if !changed.is_empty() {
        messages.push(CompilerMsg::Build(changed));
    }
    messages
}
