use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;

use troupe::backend::{BackendError, TokenUsage};
use troupe::backend::mock::{Reply, ScriptedBackend};
use troupe::capabilities::{Args, Capability, Schema};
use troupe::crew::{Actor, Crew, CrewConfig, Inputs, WorkUnit};
use troupe::engine::{Process, RunContext, RunOutput};
use troupe::events::{Event, EventBus};
use troupe::memory::SharedMemory;

/// A capability that counts its calls and answers or fails on demand.
struct Counting {
    name: &'static str,
    schema: Option<Schema>,
    fail: bool,
    calls: AtomicUsize,
}

impl Counting {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            schema: None,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn requiring(mut self, field: &str) -> Self {
        self.schema = Some(Schema::new().required(field));
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Capability for Counting {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "counts its calls"
    }

    fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    async fn invoke(&self, args: &Args) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("lookup exploded");
        }
        Ok(format!("{} saw {} args", self.name, args.len()))
    }
}

fn inputs(pairs: &[(&str, &str)]) -> Inputs {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn actor(role: &str) -> Arc<Actor> {
    Actor::builder(role, format!("{role} goal")).build().unwrap()
}

fn no_window() -> CrewConfig {
    CrewConfig {
        context_window: None,
        ..CrewConfig::default()
    }
}

// ── Ordering and results ──────────────────────────────────────────

#[tokio::test]
async fn every_unit_runs_once_and_last_result_wins() {
    let backend = Arc::new(ScriptedBackend::texts(["r1", "r2", "r3"]));
    let mut builder = Crew::builder(backend.clone());
    for i in 1..=3 {
        builder.add_unit(WorkUnit::new(format!("step {i}"), "").actor(actor("Worker")));
    }
    let mut crew = builder.build().unwrap();

    let result = crew.run(&Inputs::new()).await.unwrap();

    assert_eq!(result, "r3");
    assert_eq!(backend.calls(), 3);
    let prompts = backend.prompts();
    for (i, prompt) in prompts.iter().enumerate() {
        assert!(prompt.contains(&format!("Task:\nstep {}", i + 1)));
    }
}

#[tokio::test]
async fn empty_crew_returns_empty_result() {
    let backend = Arc::new(ScriptedBackend::texts(Vec::<String>::new()));
    let mut crew = Crew::builder(backend.clone()).build().unwrap();

    assert_eq!(crew.run(&Inputs::new()).await.unwrap(), "");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn instruction_placeholders_are_substituted() {
    let backend = Arc::new(ScriptedBackend::texts(["ok"]));
    let mut builder = Crew::builder(backend.clone());
    builder.add_unit(
        WorkUnit::new("Describe {destination} in {season}, ask about {unknown}", "")
            .actor(actor("Writer")),
    );
    let mut crew = builder.build().unwrap();

    crew.run(&inputs(&[("destination", "Oslo"), ("season", "winter")]))
        .await
        .unwrap();

    let prompt = &backend.prompts()[0];
    assert!(prompt.contains("Describe Oslo in winter, ask about {unknown}"));
}

// ── Context resolution ────────────────────────────────────────────

#[tokio::test]
async fn dependency_result_is_labelled_context() {
    let backend = Arc::new(ScriptedBackend::texts(["alpha findings", "beta summary"]));
    let mut builder = Crew::builder(backend.clone());
    let a = builder.add_unit(WorkUnit::new("research", "").actor(actor("Alpha")));
    builder.add_unit(
        WorkUnit::new("summarise", "")
            .actor(actor("Beta"))
            .depends_on(a),
    );
    let mut crew = builder.build().unwrap();

    let result = crew.run(&Inputs::new()).await.unwrap();

    assert_eq!(result, "beta summary");
    let second = &backend.prompts()[1];
    assert!(second.contains("Context from 'Alpha': alpha findings"));
}

#[tokio::test]
async fn several_dependencies_keep_declared_order() {
    let backend = Arc::new(ScriptedBackend::texts(["one", "two", "three"]));
    let mut builder = Crew::builder(backend.clone());
    let first = builder.add_unit(WorkUnit::new("1", "").actor(actor("First")));
    let second = builder.add_unit(WorkUnit::new("2", "").actor(actor("Second")));
    builder.add_unit(
        WorkUnit::new("3", "")
            .actor(actor("Third"))
            .depends_on(second)
            .depends_on(first),
    );
    let mut crew = builder.build().unwrap();
    crew.run(&Inputs::new()).await.unwrap();

    let last = &backend.prompts()[2];
    let two = last.find("Context from 'Second': two").unwrap();
    let one = last.find("Context from 'First': one").unwrap();
    assert!(two < one);
}

#[tokio::test]
async fn independent_unit_sees_rolling_history() {
    let backend = Arc::new(ScriptedBackend::texts(["first answer", "second answer"]));
    let mut builder = Crew::builder(backend.clone());
    builder.add_unit(WorkUnit::new("a", "").actor(actor("Scout")));
    builder.add_unit(WorkUnit::new("b", "").actor(actor("Writer")));
    builder.config(no_window());
    let mut crew = builder.build().unwrap();

    crew.run(&Inputs::new()).await.unwrap();

    let prompts = backend.prompts();
    assert!(!prompts[0].contains("Context:"));
    assert!(prompts[1].contains("=== Scout ===\nfirst answer"));
}

#[tokio::test]
async fn first_unit_falls_back_to_shared_memory() {
    let backend = Arc::new(ScriptedBackend::texts(["fresh"]));
    let mut memory = SharedMemory::new(5);
    memory.add("Archivist", "earlier note");

    let mut builder = Crew::builder(backend.clone());
    builder.add_unit(WorkUnit::new("continue", "").actor(actor("Writer")));
    builder.memory(memory);
    let mut crew = builder.build().unwrap();

    crew.run(&Inputs::new()).await.unwrap();

    assert!(backend.prompts()[0].contains("Context:\nArchivist: earlier note"));
    let memory = crew.memory().unwrap();
    assert_eq!(memory.len(), 2);
    assert_eq!(memory.get_context(), "Archivist: earlier note\nWriter: fresh");
}

#[tokio::test]
async fn history_is_cut_to_the_context_window() {
    let backend = Arc::new(ScriptedBackend::texts(["0123456789abcdefghij", "done"]));
    let mut builder = Crew::builder(backend.clone());
    builder.add_unit(WorkUnit::new("a", "").actor(actor("Long")));
    builder.add_unit(WorkUnit::new("b", "").actor(actor("Short")));
    builder.config(CrewConfig {
        context_window: Some(10),
        ..CrewConfig::default()
    });
    let mut crew = builder.build().unwrap();

    crew.run(&Inputs::new()).await.unwrap();

    let second = &backend.prompts()[1];
    assert!(second.contains("Context:\nabcdefghij"));
    assert!(!second.contains("0123456789"));
}

#[tokio::test]
async fn zero_window_drops_the_history() {
    let backend = Arc::new(ScriptedBackend::texts(["private notes", "done"]));
    let mut builder = Crew::builder(backend.clone());
    builder.add_unit(WorkUnit::new("a", "").actor(actor("Scout")));
    builder.add_unit(WorkUnit::new("b", "").actor(actor("Writer")));
    builder.config(CrewConfig {
        context_window: Some(0),
        ..CrewConfig::default()
    });
    let mut crew = builder.build().unwrap();

    crew.run(&Inputs::new()).await.unwrap();

    assert!(!backend.prompts()[1].contains("private notes"));
}

#[tokio::test]
async fn memory_is_bounded_across_runs() {
    let backend = Arc::new(ScriptedBackend::texts(["x", "y", "z"]));
    let mut builder = Crew::builder(backend);
    builder.add_unit(WorkUnit::new("go", "").actor(actor("Loop")));
    builder.memory(SharedMemory::new(2));
    let mut crew = builder.build().unwrap();

    for _ in 0..3 {
        crew.run(&Inputs::new()).await.unwrap();
    }

    assert_eq!(crew.memory().unwrap().get_context(), "Loop: y\nLoop: z");
}

// ── Capabilities ──────────────────────────────────────────────────

#[tokio::test]
async fn missing_required_field_skips_capability() {
    let counter = Arc::new(Counting::new("weather").requiring("city"));
    let backend = Arc::new(ScriptedBackend::texts(["report"]));
    let forecaster = Actor::builder("Forecaster", "forecast")
        .capability(counter.clone())
        .build()
        .unwrap();

    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let mut builder = Crew::builder(backend.clone());
    builder.add_unit(WorkUnit::new("forecast", "").actor(forecaster));
    builder.events(bus.clone());
    let mut crew = builder.build().unwrap();

    let result = crew.run(&inputs(&[("destination", "Oslo")])).await.unwrap();

    assert_eq!(result, "report");
    assert_eq!(counter.calls(), 0);
    assert!(!backend.prompts()[0].contains("Capability results:"));

    let mut skipped = None;
    while let Ok(event) = rx.try_recv() {
        if let Event::CapabilitySkipped { missing, .. } = event {
            skipped = Some(missing);
        }
    }
    assert_eq!(skipped, Some(vec!["city".to_string()]));
}

#[tokio::test]
async fn capability_output_reaches_the_prompt() {
    let counter = Arc::new(Counting::new("weather").requiring("city"));
    let backend = Arc::new(ScriptedBackend::texts(["report"]));
    let forecaster = Actor::builder("Forecaster", "forecast")
        .capability(counter.clone())
        .build()
        .unwrap();

    let mut builder = Crew::builder(backend.clone());
    builder.add_unit(WorkUnit::new("forecast", "").actor(forecaster));
    let mut crew = builder.build().unwrap();

    crew.run(&inputs(&[("city", "Oslo"), ("budget", "moderate")]))
        .await
        .unwrap();

    assert_eq!(counter.calls(), 1);
    assert!(backend.prompts()[0].contains("Capability results:\n[weather]\nweather saw 2 args"));
}

#[tokio::test]
async fn failing_capability_does_not_abort_the_run() {
    let broken = Arc::new(Counting::new("broken").failing());
    let healthy = Arc::new(Counting::new("healthy"));
    let backend = Arc::new(ScriptedBackend::texts(["still fine"]));
    let worker = Actor::builder("Worker", "work")
        .capability(broken.clone())
        .capability(healthy.clone())
        .build()
        .unwrap();

    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();
    let mut builder = Crew::builder(backend.clone());
    builder.add_unit(WorkUnit::new("work", "").actor(worker));
    builder.events(bus.clone());
    let mut crew = builder.build().unwrap();

    let result = crew.run(&Inputs::new()).await.unwrap();

    assert_eq!(result, "still fine");
    assert_eq!(broken.calls(), 1);
    let prompt = &backend.prompts()[0];
    assert!(!prompt.contains("[broken]"));
    assert!(prompt.contains("[healthy]"));

    let failed = std::iter::from_fn(|| rx.try_recv().ok())
        .any(|e| matches!(e, Event::CapabilityFailed { ref error, .. } if error.contains("lookup exploded")));
    assert!(failed);
}

// ── Failures ──────────────────────────────────────────────────────

#[tokio::test]
async fn backend_failure_aborts_remaining_units() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        Reply::Text("ok".to_string()),
        Reply::Fail("connection reset".to_string()),
        Reply::Text("never".to_string()),
    ]));
    let mut builder = Crew::builder(backend.clone());
    builder.add_unit(WorkUnit::new("1", "").actor(actor("One")));
    builder.add_unit(WorkUnit::new("2", "").actor(actor("Two")));
    builder.add_unit(WorkUnit::new("3", "").actor(actor("Three")));
    let mut crew = builder.build().unwrap();

    let err = crew.run(&Inputs::new()).await.unwrap_err();

    assert_eq!(backend.calls(), 2);
    let message = format!("{err:#}");
    assert!(message.contains("unit 2 (Two) failed"));
    assert!(message.contains("connection reset"));
}

#[tokio::test]
async fn rate_limit_stays_typed_through_the_run() {
    let backend = Arc::new(ScriptedBackend::new(vec![Reply::RateLimited]));
    let mut builder = Crew::builder(backend);
    builder.add_unit(WorkUnit::new("1", "").actor(actor("One")));
    let mut crew = builder.build().unwrap();

    let err = crew.run(&Inputs::new()).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<BackendError>(),
        Some(BackendError::RateLimited { .. })
    ));
}

#[tokio::test]
async fn actor_backend_overrides_crew_backend() {
    let crew_backend = Arc::new(ScriptedBackend::texts(["from crew"]));
    let own_backend = Arc::new(ScriptedBackend::texts(["from actor"]));
    let special = Actor::builder("Special", "be special")
        .backend(own_backend.clone())
        .build()
        .unwrap();

    let mut builder = Crew::builder(crew_backend.clone());
    builder.add_unit(WorkUnit::new("1", "").actor(special));
    let mut crew = builder.build().unwrap();

    assert_eq!(crew.run(&Inputs::new()).await.unwrap(), "from actor");
    assert_eq!(crew_backend.calls(), 0);
    assert_eq!(own_backend.calls(), 1);
}

// ── Output files ──────────────────────────────────────────────────

#[tokio::test]
async fn output_file_is_written_and_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::texts(["first draft", "second draft"]));
    let mut builder = Crew::builder(backend);
    builder.add_unit(
        WorkUnit::new("write", "")
            .actor(actor("Author"))
            .output_file("guides/out.md"),
    );
    builder.config(CrewConfig {
        output_dir: Some(dir.path().to_path_buf()),
        ..CrewConfig::default()
    });
    let mut crew = builder.build().unwrap();
    let path = dir.path().join("guides").join("out.md");

    crew.run(&Inputs::new()).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "first draft");

    crew.run(&Inputs::new()).await.unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "second draft");
}

#[tokio::test]
async fn unwritable_output_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    // A file where the parent directory should be.
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, "not a directory").unwrap();

    let backend = Arc::new(ScriptedBackend::texts(["text"]));
    let mut builder = Crew::builder(backend);
    builder.add_unit(
        WorkUnit::new("write", "")
            .actor(actor("Author"))
            .output_file(blocker.join("out.md")),
    );
    let mut crew = builder.build().unwrap();

    assert!(crew.run(&Inputs::new()).await.is_err());
}

// ── Events ────────────────────────────────────────────────────────

#[tokio::test]
async fn events_follow_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::texts(["a", "b"]));
    let bus = Arc::new(EventBus::default());
    let mut rx = bus.subscribe();

    let mut builder = Crew::builder(backend);
    builder.add_unit(WorkUnit::new("1", "").actor(actor("One")));
    builder.add_unit(
        WorkUnit::new("2", "")
            .actor(actor("Two"))
            .output_file(dir.path().join("two.md")),
    );
    builder.events(bus.clone());
    let mut crew = builder.build().unwrap();
    crew.run(&Inputs::new()).await.unwrap();

    let events: Vec<Event> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(
        events.first(),
        Some(&Event::RunStarted {
            units: 2,
            process: "sequential".to_string()
        })
    );
    assert_eq!(events.last(), Some(&Event::RunFinished { units: 2 }));
    assert!(events.contains(&Event::UnitFinished {
        index: 1,
        total: 2,
        role: "Two".to_string(),
        result: "b".to_string(),
    }));
    assert!(events.contains(&Event::OutputSaved {
        path: dir.path().join("two.md"),
    }));
}

#[tokio::test]
async fn crew_without_bus_is_silent_but_works() {
    let backend = Arc::new(ScriptedBackend::texts(["quiet"]));
    let mut builder = Crew::builder(backend);
    builder.add_unit(WorkUnit::new("1", "").actor(actor("Mute")));
    let mut crew = builder.build().unwrap();
    assert_eq!(crew.run(&Inputs::new()).await.unwrap(), "quiet");
}

// ── Custom process ────────────────────────────────────────────────

/// Answers with the unit instructions in reverse, without a backend.
struct Reversed;

#[async_trait]
impl Process for Reversed {
    fn name(&self) -> &str {
        "reversed"
    }

    async fn execute(&self, run: RunContext<'_>, _inputs: &Inputs) -> Result<RunOutput> {
        let results: Vec<String> = run
            .units
            .iter()
            .rev()
            .map(|u| u.instruction().to_string())
            .collect();
        Ok(RunOutput {
            result: results.join(","),
            results,
            usage: TokenUsage {
                input_tokens: 3,
                output_tokens: 4,
            },
        })
    }
}

#[tokio::test]
async fn custom_process_replaces_sequential_execution() {
    let backend = Arc::new(ScriptedBackend::texts(Vec::<String>::new()));
    let mut builder = Crew::builder(backend.clone());
    builder.add_unit(WorkUnit::new("first", "").actor(actor("A")));
    builder.add_unit(WorkUnit::new("second", "").actor(actor("B")));
    builder.process_strategy(Box::new(Reversed));
    let mut crew = builder.build().unwrap();

    assert_eq!(crew.process_name(), "reversed");
    assert_eq!(crew.run(&Inputs::new()).await.unwrap(), "second,first");
    crew.run(&Inputs::new()).await.unwrap();

    assert_eq!(backend.calls(), 0);
    assert_eq!(crew.session_usage().total(), 14);
}
