//! The full travel crew: five specialists feeding a coordinator.

use anyhow::Result;
use std::sync::Arc;

use super::{PipelineOptions, TRIP_FIELDS};
use crate::backend::Backend;
use crate::capabilities::travel::{
    ActivityGuide, ItineraryTemplate, LodgingGuide, RestaurantGuide, TransportGuide,
};
use crate::capabilities::weather::WeatherCapability;
use crate::capabilities::web_search::WebSearchCapability;
use crate::crew::{Actor, Crew, CrewConfig, WorkUnit};
use crate::memory::SharedMemory;

pub const OUTPUT_FILE: &str = "travel_guide.md";

pub fn build(backend: Arc<dyn Backend>, options: &PipelineOptions) -> Result<Crew> {
    let researcher = Actor::builder(
        "Destination Researcher",
        "Find the best information about the destination and its attractions",
    )
    .backstory(
        "A seasoned travel writer who has explored every continent and knows \
         how to surface what makes a place worth the trip.",
    )
    .capability(Arc::new(WebSearchCapability::new(
        "{destination} top attractions travel guide",
    )))
    .build()?;

    let weather = Actor::builder(
        "Weather Specialist",
        "Analyse current weather and give practical advice for the trip",
    )
    .backstory(
        "A meteorologist turned travel advisor who translates forecasts into \
         what to pack and when to go out.",
    )
    .capability(Arc::new(WeatherCapability::new("destination")))
    .build()?;

    let lodging = Actor::builder(
        "Accommodation Expert",
        "Recommend the best places to stay for the budget",
    )
    .backstory(
        "Former hotel manager who knows every neighbourhood's trade-offs \
         between price, comfort and location.",
    )
    .capability(Arc::new(LodgingGuide::default()))
    .build()?;

    let transport = Actor::builder(
        "Transport Coordinator",
        "Optimise every journey and find the best transport options",
    )
    .backstory("A logistics specialist fluent in timetables, fares and connections.")
    .capability(Arc::new(TransportGuide::default()))
    .build()?;

    let activities = Actor::builder(
        "Activity Planner",
        "Build an enriching activity programme suited to the traveller",
    )
    .backstory(
        "A creative trip organiser who knows the best activities, restaurants \
         and local experiences, and balances culture, food and rest.",
    )
    .capability(Arc::new(ActivityGuide::default()))
    .capability(Arc::new(RestaurantGuide::default()))
    .capability(Arc::new(ItineraryTemplate::default()))
    .build()?;

    let coordinator = Actor::builder(
        "Trip Coordinator",
        "Produce a complete, coherent travel plan from everyone's findings",
    )
    .backstory(
        "A senior coordinator who excels at turning complex information into \
         a clear plan that is easy to follow.",
    )
    .build()?;

    let mut builder = Crew::builder(backend);

    let research = builder.add_unit(
        WorkUnit::new(
            "Research {destination} thoroughly: main attractions, history and culture, \
             interesting neighbourhoods, practical tips, and what not to miss.",
            "A report with the top 5 attractions, a cultural overview, recommended \
             neighbourhoods and practical travel tips.",
        )
        .actor(researcher),
    );

    let forecast = builder.add_unit(
        WorkUnit::new(
            "Analyse the current weather in {destination}: conditions, what to wear, \
             weather-appropriate activities and the best times to go out.",
            "A weather report with temperature and conditions, a packing list and \
             activity recommendations.",
        )
        .actor(weather),
    );

    let stay = builder.add_unit(
        WorkUnit::new(
            "Find the best accommodation in {destination} for a {budget} budget: \
             suitable types, where to stay, price range and booking tips.",
            "3 to 5 options for the budget, recommended areas, price estimates and \
             practical advice.",
        )
        .actor(lodging),
    );

    let travel = builder.add_unit(
        WorkUnit::new(
            "Plan how to get from {origin} to {destination}: best options (train, \
             plane, bus), price and duration comparison, local transport, booking tips.",
            "A transport plan comparing the options, with local transport details \
             and booking advice.",
        )
        .actor(transport),
    );

    let programme = builder.add_unit(
        WorkUnit::new(
            "Create a complete {duration}-day activity programme in {destination}, \
             with restaurant suggestions and a day-by-day itinerary.",
            "A day-by-day itinerary with activities, suggested restaurants and a \
             balance of culture, rest and food.",
        )
        .actor(activities),
    );

    builder.add_unit(
        WorkUnit::new(
            "Combine the destination research, weather analysis, accommodation \
             recommendations, transport plan and activity programme into one \
             complete travel guide for {destination}.",
            "A complete travel guide: 1. destination overview 2. weather and \
             clothing 3. accommodation 4. transport 5. day-by-day itinerary \
             6. pre-departure checklist 7. estimated total budget.",
        )
        .actor(coordinator)
        .depends_on(research)
        .depends_on(forecast)
        .depends_on(stay)
        .depends_on(travel)
        .depends_on(programme)
        .output_file(OUTPUT_FILE),
    );

    if options.memory_capacity > 0 {
        builder.memory(SharedMemory::new(options.memory_capacity));
    }
    builder.config(CrewConfig {
        context_window: options.context_window,
        highlight_fields: TRIP_FIELDS.iter().map(|f| f.to_string()).collect(),
        focus_field: Some("destination".to_string()),
        capability_timeout: options.capability_timeout,
        output_dir: options.output_dir.clone(),
        ..CrewConfig::default()
    });
    if let Some(bus) = &options.events {
        builder.events(Arc::clone(bus));
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::ScriptedBackend;

    #[test]
    fn six_actors_and_a_coordinator_that_depends_on_everyone() {
        let crew = build(
            Arc::new(ScriptedBackend::texts(Vec::<String>::new())),
            &PipelineOptions::default(),
        )
        .unwrap();

        assert_eq!(crew.actors().len(), 6);
        assert_eq!(crew.units().len(), 6);

        let last = crew.units().last().unwrap();
        let deps: Vec<_> = last.dependencies().iter().map(|d| d.index()).collect();
        assert_eq!(deps, vec![0, 1, 2, 3, 4]);
        assert_eq!(
            last.output_target().and_then(|p| p.to_str()),
            Some(OUTPUT_FILE)
        );
        assert!(crew.memory().is_some());
        assert_eq!(crew.config().focus_field.as_deref(), Some("destination"));
    }

    #[test]
    fn zero_capacity_disables_memory() {
        let crew = build(
            Arc::new(ScriptedBackend::texts(Vec::<String>::new())),
            &PipelineOptions {
                memory_capacity: 0,
                ..PipelineOptions::default()
            },
        )
        .unwrap();
        assert!(crew.memory().is_none());
    }
}
