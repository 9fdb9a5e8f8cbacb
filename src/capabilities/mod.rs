pub mod travel;
pub mod weather;
pub mod web_search;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::crew::CrewError;

/// Named arguments handed to a capability. The crew passes its full input map.
pub type Args = HashMap<String, String>;

/// One named field of a capability's input schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub required: bool,
}

/// Ordered set of named fields, each required or optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(self, name: impl Into<String>) -> Self {
        self.field(name, true)
    }

    pub fn optional(self, name: impl Into<String>) -> Self {
        self.field(name, false)
    }

    /// Adding a name twice keeps the first position and the stricter flag.
    fn field(mut self, name: impl Into<String>, required: bool) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(existing) => existing.required |= required,
            None => self.fields.push(Field { name, required }),
        }
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Required field names absent from `args`. Pure key membership, no type checks.
    pub fn missing<'a>(&'a self, args: &Args) -> Vec<&'a str> {
        self.fields
            .iter()
            .filter(|f| f.required && !args.contains_key(&f.name))
            .map(|f| f.name.as_str())
            .collect()
    }
}

/// Something an actor can call while working on a unit.
///
/// Implementations may do external I/O but must not touch orchestration state.
#[async_trait]
pub trait Capability: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// `None` means "invoke with whatever arguments are available".
    fn schema(&self) -> Option<&Schema> {
        None
    }

    async fn invoke(&self, args: &Args) -> Result<String>;
}

/// What happened when a capability was dispatched. Errors are information, not failures.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(String),
    /// Not invoked: these required fields were missing.
    Skipped { missing: Vec<String> },
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityResult {
    pub capability: String,
    pub outcome: Outcome,
}

impl CapabilityResult {
    pub fn output(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Success(text) => Some(text),
            _ => None,
        }
    }
}

/// An actor's capabilities: ordered, names unique. Capabilities are shared
/// by `Arc`, so one instance can serve many actors.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    capabilities: Vec<Arc<dyn Capability>>,
}

impl std::fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.capabilities.iter().map(|c| c.name()))
            .finish()
    }
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: Arc<dyn Capability>) -> Result<(), CrewError> {
        if self.capabilities.iter().any(|c| c.name() == capability.name()) {
            return Err(CrewError::DuplicateCapability(capability.name().to_string()));
        }
        self.capabilities.push(capability);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.capabilities.iter().map(|c| c.name().to_string()).collect()
    }

    /// Invoke every capability in declaration order, one after another.
    ///
    /// A capability whose schema lists a required field absent from `args` is
    /// skipped without being called. Failures and timeouts become
    /// [`Outcome::Error`]; they never abort the dispatch.
    pub async fn dispatch(&self, args: &Args, timeout: Option<Duration>) -> Vec<CapabilityResult> {
        let mut results = Vec::with_capacity(self.capabilities.len());

        for capability in &self.capabilities {
            let name = capability.name().to_string();

            if let Some(schema) = capability.schema() {
                let missing = schema.missing(args);
                if !missing.is_empty() {
                    results.push(CapabilityResult {
                        capability: name,
                        outcome: Outcome::Skipped {
                            missing: missing.into_iter().map(String::from).collect(),
                        },
                    });
                    continue;
                }
            }

            let outcome = match timeout {
                Some(limit) => match tokio::time::timeout(limit, capability.invoke(args)).await {
                    Ok(result) => into_outcome(result),
                    Err(_) => Outcome::Error(format!("timed out after {}s", limit.as_secs_f32())),
                },
                None => into_outcome(capability.invoke(args).await),
            };

            results.push(CapabilityResult {
                capability: name,
                outcome,
            });
        }

        results
    }
}

fn into_outcome(result: Result<String>) -> Outcome {
    match result {
        Ok(text) => Outcome::Success(text),
        Err(e) => Outcome::Error(format!("{e:#}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(keys: &[&str]) -> Args {
        keys.iter().map(|k| (k.to_string(), "v".to_string())).collect()
    }

    #[test]
    fn missing_reports_only_required_fields() {
        let schema = Schema::new().required("city").optional("units").required("date");
        assert_eq!(schema.missing(&args(&["units"])), vec!["city", "date"]);
        assert!(schema.missing(&args(&["city", "date"])).is_empty());
    }

    #[test]
    fn duplicate_field_keeps_position_and_stricter_flag() {
        let schema = Schema::new().optional("a").required("b").required("a");
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.fields()[0].name, "a");
        assert!(schema.fields()[0].required);
    }

    #[test]
    fn empty_schema_never_misses() {
        assert!(Schema::new().missing(&Args::new()).is_empty());
    }

    #[test]
    fn only_successes_have_output() {
        let ok = CapabilityResult {
            capability: "c".to_string(),
            outcome: Outcome::Success("out".to_string()),
        };
        let skipped = CapabilityResult {
            capability: "c".to_string(),
            outcome: Outcome::Skipped {
                missing: vec!["city".to_string()],
            },
        };
        assert_eq!(ok.output(), Some("out"));
        assert_eq!(skipped.output(), None);
    }
}
