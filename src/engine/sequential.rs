use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::{Process, RunContext, RunOutput};
use crate::capabilities::Outcome;
use crate::crew::{CrewConfig, Inputs, WorkUnit};
use crate::events::{Event, EventBus};
use crate::prompts::unit::{UnitPrompt, build_unit_prompt};
use crate::template;

/// Units run one after another, in declared order, exactly once each.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sequential;

#[async_trait]
impl Process for Sequential {
    fn name(&self) -> &str {
        "sequential"
    }

    async fn execute(&self, run: RunContext<'_>, inputs: &Inputs) -> Result<RunOutput> {
        let RunContext {
            units,
            backend,
            config,
            mut memory,
            events,
        } = run;

        let total = units.len();
        let mut output = RunOutput::default();
        let mut history = String::new();

        for (index, unit) in units.iter().enumerate() {
            let actor = unit
                .assigned_actor()
                .with_context(|| format!("unit {} has no actor", index + 1))?;
            let role = actor.role();

            info!(unit = index + 1, total, role, "unit started");
            emit(events, || Event::UnitStarted {
                index,
                total,
                role: role.to_string(),
            });

            let instruction = template::substitute(unit.instruction(), inputs);

            let context = if unit.dependencies().is_empty() {
                let fallback = if history.is_empty() {
                    memory
                        .as_deref()
                        .map(|m| m.get_context())
                        .unwrap_or_default()
                } else {
                    history.clone()
                };
                match config.context_window {
                    Some(window) => tail_chars(&fallback, window).to_string(),
                    None => fallback,
                }
            } else {
                dependency_context(unit, units, &output.results)
            };

            let dispatched = actor
                .capabilities()
                .dispatch(inputs, config.capability_timeout)
                .await;
            for result in &dispatched {
                match &result.outcome {
                    Outcome::Success(_) => {
                        debug!(role, capability = %result.capability, "capability succeeded");
                    }
                    Outcome::Skipped { missing } => {
                        debug!(role, capability = %result.capability, ?missing, "capability skipped");
                        emit(events, || Event::CapabilitySkipped {
                            role: role.to_string(),
                            capability: result.capability.clone(),
                            missing: missing.clone(),
                        });
                    }
                    Outcome::Error(err) => {
                        warn!(role, capability = %result.capability, error = %err, "capability failed");
                        emit(events, || Event::CapabilityFailed {
                            role: role.to_string(),
                            capability: result.capability.clone(),
                            error: err.clone(),
                        });
                    }
                }
            }

            let prompt = build_unit_prompt(&UnitPrompt {
                role,
                goal: actor.goal(),
                backstory: config.include_backstory.then(|| actor.backstory()),
                highlights: highlights(config, inputs),
                focus: config
                    .focus_field
                    .as_deref()
                    .and_then(|f| inputs.get(f))
                    .map(String::as_str),
                context: Some(context.as_str()),
                instruction: &instruction,
                expected_output: unit.expected_output(),
                capability_results: dispatched
                    .iter()
                    .filter_map(|r| r.output().map(|out| (r.capability.as_str(), out)))
                    .collect(),
            });

            let backend = actor.backend().unwrap_or(backend);
            let completion = match backend.generate(&prompt).await {
                Ok(completion) => completion,
                Err(e) => {
                    error!(unit = index + 1, role, backend = backend.name(), error = %e, "generation failed");
                    return Err(e.context(format!("unit {} ({role}) failed", index + 1)));
                }
            };
            if let Some(usage) = completion.usage {
                output.usage.add(usage);
            }
            let text = completion.text;

            history.push_str(&format!("\n\n=== {role} ===\n{text}"));
            if let Some(memory) = memory.as_deref_mut() {
                memory.add(role, text.clone());
            }

            if let Some(target) = unit.output_target() {
                let path = resolve_target(config, target);
                persist(&path, &text).await?;
                info!(path = %path.display(), "output saved");
                emit(events, || Event::OutputSaved { path: path.clone() });
            }

            info!(unit = index + 1, total, role, chars = text.chars().count(), "unit finished");
            emit(events, || Event::UnitFinished {
                index,
                total,
                role: role.to_string(),
                result: text.clone(),
            });

            output.results.push(text);
        }

        output.result = output.results.last().cloned().unwrap_or_default();
        Ok(output)
    }
}

fn emit(events: Option<&EventBus>, event: impl FnOnce() -> Event) {
    if let Some(bus) = events {
        bus.emit(event());
    }
}

/// Labeled blocks for each declared dependency, looked up by unit id.
fn dependency_context(unit: &WorkUnit, units: &[WorkUnit], results: &[String]) -> String {
    unit.dependencies()
        .iter()
        .filter_map(|dep| {
            let result = results.get(dep.index())?;
            let role = units
                .get(dep.index())
                .and_then(|u| u.assigned_actor())
                .map(|a| a.role())
                .unwrap_or("Actor");
            Some(format!("Context from '{role}': {result}"))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn highlights<'a>(config: &'a CrewConfig, inputs: &'a Inputs) -> Vec<(&'a str, &'a str)> {
    config
        .highlight_fields
        .iter()
        .filter_map(|field| {
            inputs
                .get(field)
                .map(|value| (field.as_str(), value.as_str()))
        })
        .collect()
}

/// The last `max` characters of `text`, never splitting a character.
fn tail_chars(text: &str, max: usize) -> &str {
    let count = text.chars().count();
    if count <= max {
        return text;
    }
    text.char_indices()
        .nth(count - max)
        .map_or("", |(i, _)| &text[i..])
}

fn resolve_target(config: &CrewConfig, target: &Path) -> PathBuf {
    match &config.output_dir {
        Some(dir) if target.is_relative() => dir.join(target),
        _ => target.to_path_buf(),
    }
}

async fn persist(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, text)
        .await
        .with_context(|| format!("failed to write output to {}", path.display()))
}
