//! Terminal rendering of run events for the interactive CLI.

use tokio::sync::broadcast::{Receiver, error::RecvError};

use crate::events::Event;
use crate::spinner::Spinner;

/// One status line per event, or `None` for events that only move the spinner.
pub fn describe(event: &Event) -> Option<String> {
    match event {
        Event::RunStarted { units, process } => {
            Some(format!("▶ running {units} unit(s), {process}"))
        }
        Event::UnitStarted { .. } => None,
        Event::CapabilitySkipped {
            role,
            capability,
            missing,
        } => Some(format!(
            "  · {role}: skipped {capability} (missing {})",
            missing.join(", ")
        )),
        Event::CapabilityFailed {
            role,
            capability,
            error,
        } => Some(format!("  ! {role}: {capability} failed: {error}")),
        Event::UnitFinished {
            index, total, role, ..
        } => Some(format!("✓ [{}/{total}] {role}", index + 1)),
        Event::OutputSaved { path } => Some(format!("  saved {}", path.display())),
        Event::RunFinished { .. } => None,
    }
}

/// Consume events until the run finishes or the bus closes, showing a
/// spinner while each unit is in flight.
pub async fn render(mut rx: Receiver<Event>) {
    let mut spinner: Option<Spinner> = None;

    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        };

        if let Event::UnitStarted { index, total, role } = &event {
            let label = format!("[{}/{total}] {role} working", index + 1);
            match &spinner {
                Some(s) => s.set_label(&label),
                None => spinner = Some(Spinner::start(&label)),
            }
            continue;
        }

        let line = describe(&event);
        let finished = matches!(event, Event::RunFinished { .. });
        if (line.is_some() || finished)
            && let Some(s) = spinner.take()
        {
            s.stop().await;
        }
        if let Some(line) = line {
            eprintln!("{line}");
        }
        if finished {
            break;
        }
    }

    if let Some(s) = spinner {
        s.stop().await;
    }
}
