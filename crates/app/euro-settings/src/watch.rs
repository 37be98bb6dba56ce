use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher, event::ModifyKind};
use std::{
    path::{Path, PathBuf},
    sync::{Arc, mpsc},
    time::Duration,
};
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::{Error, Result, SyncSettings};

pub const SETTINGS_FILE: &str = "settings.json";

/// Settings snapshot kept in sync with `settings.json`.
///
/// Consumers hold a [`watch::Receiver`] and read the latest value when they
/// need it, so a change made on disk (or through [`Self::update`]) is picked
/// up by the next operation without restarting anything.
#[derive(Clone)]
pub struct SettingsWithDiskSync {
    config_path: PathBuf,
    snapshot: Arc<watch::Sender<SyncSettings>>,
}

impl SettingsWithDiskSync {
    pub fn new(config_dir: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_dir.as_ref().join(SETTINGS_FILE);
        let settings = SyncSettings::load(&config_path)?;
        let (tx, _) = watch::channel(settings);

        Ok(Self {
            config_path,
            snapshot: Arc::new(tx),
        })
    }

    pub fn get(&self) -> SyncSettings {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncSettings> {
        self.snapshot.subscribe()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Apply `change`, persist it, then publish it to subscribers.
    pub fn update(&self, change: impl FnOnce(&mut SyncSettings)) -> Result<()> {
        let mut next = self.get();
        change(&mut next);
        next.save(&self.config_path)?;
        self.snapshot.send_replace(next);
        Ok(())
    }

    pub fn watch_in_background(&self) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        let snapshot = Arc::clone(&self.snapshot);
        let config_path = self.config_path.to_owned();
        let watcher_config = Config::default()
            .with_compare_contents(true)
            .with_poll_interval(Duration::from_secs(2));

        let mut watcher: RecommendedWatcher = Watcher::new(tx, watcher_config)?;
        watcher.watch(&config_path, RecursiveMode::NonRecursive)?;

        tokio::task::spawn_blocking(move || {
            // Moved in so the watcher lives as long as the loop.
            let _watcher = watcher;
            loop {
                match rx.recv() {
                    Ok(Ok(Event {
                        kind: notify::event::EventKind::Modify(ModifyKind::Data(_)),
                        ..
                    })) => match SyncSettings::load(&config_path) {
                        Ok(update) => {
                            debug!("settings.json modified; refreshing settings");
                            snapshot.send_if_modified(|current| {
                                if *current == update {
                                    return false;
                                }
                                *current = update;
                                true
                            });
                        }
                        Err(err) => warn!("Ignoring invalid settings update: {}", err),
                    },

                    Ok(Err(err)) => {
                        warn!("Settings watcher reported an error: {}", Error::from(err));
                    }

                    Err(_) => {
                        error!(
                            "Error watching config file {:?} - watcher terminated",
                            config_path
                        );
                        break;
                    }

                    _ => {
                        // Noop
                    }
                }
            }
        });
        Ok(())
    }
}
