//! Config file hot reload.
//!
//! A reload is validated, then split in two. Session settings (upstream
//! URLs, token, backoff, idle limit, cookie policy) reach the live snapshot
//! and apply to the next session or request. Settings bound when the server
//! started (listener, HTTP client timeouts, observability) are pinned to
//! their running values and reported as needing a restart.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RelayConfig;

/// Quiet period after a change event before the file is read.
const SETTLE: Duration = Duration::from_millis(200);

/// Watches the relay config file and publishes applicable changes.
pub struct ConfigWatcher {
    path: PathBuf,
    running: RelayConfig,
    update_tx: mpsc::UnboundedSender<RelayConfig>,
}

impl ConfigWatcher {
    /// Create a watcher for `path`, starting from the configuration the
    /// server is running with.
    ///
    /// Returns the watcher and a receiver of reloaded configurations.
    pub fn new(path: &Path, running: RelayConfig) -> (Self, mpsc::UnboundedReceiver<RelayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            running,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Must be called inside a Tokio runtime; the returned
    /// handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let _ = change_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        tokio::spawn(self.reload_on_change(change_rx));
        Ok(watcher)
    }

    async fn reload_on_change(mut self, mut changes: mpsc::UnboundedReceiver<()>) {
        while changes.recv().await.is_some() {
            // One save usually fires several events.
            tokio::time::sleep(SETTLE).await;
            while changes.try_recv().is_ok() {}

            self.reload();
            if self.update_tx.is_closed() {
                break;
            }
        }
    }

    /// Read the file and publish it if anything applicable changed.
    ///
    /// Returns whether an update was sent.
    fn reload(&mut self) -> bool {
        let mut next = match load_config(&self.path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(
                    path = ?self.path,
                    error = %e,
                    "Failed to reload config, keeping current configuration"
                );
                return false;
            }
        };

        for field in pin_startup_settings(&self.running, &mut next) {
            tracing::warn!(field, "Config change ignored until restart");
        }
        if next == self.running {
            tracing::debug!(path = ?self.path, "Config file changed, nothing to apply");
            return false;
        }

        tracing::info!(path = ?self.path, "Config file change detected, reloading");
        self.running = next.clone();
        self.update_tx.send(next).is_ok()
    }
}

/// Reset the settings fixed at startup in `next` to their `running` values.
///
/// Returns the dotted names of the settings that differed.
pub fn pin_startup_settings(running: &RelayConfig, next: &mut RelayConfig) -> Vec<&'static str> {
    let mut pinned = Vec::new();

    pin(
        "listener.bind_address",
        &running.listener.bind_address,
        &mut next.listener.bind_address,
        &mut pinned,
    );
    pin(
        "upstream.connect_timeout_secs",
        &running.upstream.connect_timeout_secs,
        &mut next.upstream.connect_timeout_secs,
        &mut pinned,
    );
    pin(
        "upstream.request_timeout_secs",
        &running.upstream.request_timeout_secs,
        &mut next.upstream.request_timeout_secs,
        &mut pinned,
    );
    pin(
        "observability.log_level",
        &running.observability.log_level,
        &mut next.observability.log_level,
        &mut pinned,
    );
    pin(
        "observability.metrics_enabled",
        &running.observability.metrics_enabled,
        &mut next.observability.metrics_enabled,
        &mut pinned,
    );
    pin(
        "observability.metrics_address",
        &running.observability.metrics_address,
        &mut next.observability.metrics_address,
        &mut pinned,
    );

    pinned
}

fn pin<T: PartialEq + Clone>(name: &'static str, running: &T, next: &mut T, pinned: &mut Vec<&'static str>) {
    if running != next {
        *next = running.clone();
        pinned.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_startup_settings_are_pinned_and_reported() {
        let running = RelayConfig::default();
        let mut next = running.clone();
        next.listener.bind_address = "127.0.0.1:4000".to_string();
        next.upstream.connect_timeout_secs = 1;
        next.upstream.request_timeout_secs = 99;
        next.observability.log_level = "debug".to_string();
        next.upstream.sse_url = Some("http://controller:3003/sse".to_string());
        next.backoff.delay_ms = 250;

        let pinned = pin_startup_settings(&running, &mut next);

        assert_eq!(
            pinned,
            vec![
                "listener.bind_address",
                "upstream.connect_timeout_secs",
                "upstream.request_timeout_secs",
                "observability.log_level",
            ]
        );
        assert_eq!(next.listener, running.listener);
        assert_eq!(next.upstream.connect_timeout_secs, 5);
        assert_eq!(next.upstream.request_timeout_secs, 10);
        assert_eq!(next.observability, running.observability);
        // session settings still go through
        assert_eq!(next.upstream.sse_url.as_deref(), Some("http://controller:3003/sse"));
        assert_eq!(next.backoff.delay_ms, 250);
    }

    #[test]
    fn test_unchanged_config_pins_nothing() {
        let running = RelayConfig::default();
        let mut next = running.clone();
        assert!(pin_startup_settings(&running, &mut next).is_empty());
        assert_eq!(next, running);
    }

    #[test]
    fn test_reload_publishes_only_applicable_changes() {
        let path = std::env::temp_dir().join(format!("relay-watch-{}.toml", uuid::Uuid::new_v4()));
        let (mut watcher, mut updates) = ConfigWatcher::new(&path, RelayConfig::default());

        // Restart-only change: nothing to publish.
        fs::write(&path, "[upstream]\nrequest_timeout_secs = 30\n").unwrap();
        assert!(!watcher.reload());
        assert!(updates.try_recv().is_err());

        fs::write(
            &path,
            "[upstream]\nrequest_timeout_secs = 30\nsse_url = \"http://controller:3003/sse\"\n\n[auth]\ncookie_same_site = \"lax\"\n",
        )
        .unwrap();
        assert!(watcher.reload());
        let update = updates.try_recv().unwrap();
        assert_eq!(update.upstream.sse_url.as_deref(), Some("http://controller:3003/sse"));
        assert_eq!(update.upstream.request_timeout_secs, 10);
        assert_eq!(update.auth.cookie_same_site, crate::config::SameSite::Lax);

        // Invalid file keeps the running configuration.
        fs::write(&path, "[relay]\nchannel_capacity = 0\n").unwrap();
        assert!(!watcher.reload());
        assert!(updates.try_recv().is_err());

        let _ = fs::remove_file(&path);
    }
}
