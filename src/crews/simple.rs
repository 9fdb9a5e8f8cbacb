//! One planner, no capabilities. Useful offline and as a cheap fallback.

use anyhow::Result;
use std::sync::Arc;

use super::{PipelineOptions, TRIP_FIELDS};
use crate::backend::Backend;
use crate::crew::{Actor, Crew, CrewConfig, WorkUnit};
use crate::memory::SharedMemory;

pub fn build(backend: Arc<dyn Backend>, options: &PipelineOptions) -> Result<Crew> {
    let planner = Actor::builder(
        "Travel Planner",
        "Plan a realistic trip that fits the traveller's constraints",
    )
    .backstory("An experienced travel agent who plans trips end to end.")
    .build()?;

    let mut builder = Crew::builder(backend);
    builder.add_unit(
        WorkUnit::new(
            "Plan a {duration}-day trip to {destination} from {origin} on a {budget} \
             budget. Cover getting there, where to stay, what to do each day and a \
             rough cost estimate.",
            "A concise day-by-day travel plan with transport, lodging and a budget estimate.",
        )
        .actor(planner),
    );

    if options.memory_capacity > 0 {
        builder.memory(SharedMemory::new(options.memory_capacity));
    }
    builder.config(CrewConfig {
        context_window: options.context_window,
        highlight_fields: TRIP_FIELDS.iter().map(|f| f.to_string()).collect(),
        focus_field: Some("destination".to_string()),
        output_dir: options.output_dir.clone(),
        ..CrewConfig::default()
    });
    if let Some(bus) = &options.events {
        builder.events(Arc::clone(bus));
    }

    Ok(builder.build()?)
}
