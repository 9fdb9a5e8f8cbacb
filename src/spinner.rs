//! A terminal spinner for the CLI while a unit is waiting on its backend.

use std::io::Write;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Braille spinner frames.
const FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const INTERVAL: Duration = Duration::from_millis(80);

/// Runs in a background task and writes to stderr, so stdout stays clean
/// for the result. The label can change while it spins.
pub struct Spinner {
    handle: JoinHandle<()>,
    /// `None` tells the task to clear its line and exit.
    label: watch::Sender<Option<String>>,
}

impl Spinner {
    pub fn start(label: &str) -> Self {
        let (label_tx, mut label_rx) = watch::channel(Some(label.to_string()));

        let handle = tokio::spawn(async move {
            let mut i = 0;
            loop {
                let Some(label) = label_rx.borrow_and_update().clone() else {
                    break;
                };
                eprint!("\x1b[2K\r{} {label}", FRAMES[i % FRAMES.len()]);
                let _ = std::io::stderr().flush();

                tokio::select! {
                    _ = tokio::time::sleep(INTERVAL) => {}
                    changed = label_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                i += 1;
            }
            eprint!("\x1b[2K\r");
            let _ = std::io::stderr().flush();
        });

        Self {
            handle,
            label: label_tx,
        }
    }

    pub fn set_label(&self, label: &str) {
        let _ = self.label.send(Some(label.to_string()));
    }

    /// Stop and clear the line before anything else is printed.
    pub async fn stop(self) {
        let _ = self.label.send(None);
        let _ = self.handle.await;
    }
}
