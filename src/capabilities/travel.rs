//! Offline travel guides: templated advice built from the trip inputs.
//! No network access; they give the backend a structured starting point.

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::{Args, Capability, Schema};

/// Budget tier as understood by the guides. Unknown words fall back to moderate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetTier {
    Economy,
    Moderate,
    Luxury,
}

impl BudgetTier {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "economy" | "budget" | "cheap" | "economique" | "économique" => BudgetTier::Economy,
            "luxury" | "luxe" | "premium" => BudgetTier::Luxury,
            _ => BudgetTier::Moderate,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BudgetTier::Economy => "economy",
            BudgetTier::Moderate => "moderate",
            BudgetTier::Luxury => "luxury",
        }
    }
}

fn arg<'a>(args: &'a Args, key: &str) -> Result<&'a str> {
    args.get(key)
        .map(String::as_str)
        .with_context(|| format!("missing '{key}' argument"))
}

fn budget(args: &Args) -> BudgetTier {
    args.get("budget")
        .map(|b| BudgetTier::parse(b))
        .unwrap_or(BudgetTier::Moderate)
}

/// Lodging types and nightly price range for a destination and budget.
pub struct LodgingGuide {
    schema: Schema,
}

impl Default for LodgingGuide {
    fn default() -> Self {
        Self {
            schema: Schema::new().required("destination").optional("budget"),
        }
    }
}

#[async_trait]
impl Capability for LodgingGuide {
    fn name(&self) -> &str {
        "lodging_guide"
    }

    fn description(&self) -> &str {
        "Lodging types, nightly price range and booking tips for a destination and budget."
    }

    fn schema(&self) -> Option<&Schema> {
        Some(&self.schema)
    }

    async fn invoke(&self, args: &Args) -> Result<String> {
        let destination = arg(args, "destination")?;
        let tier = budget(args);
        let ((low, high), kinds): ((u32, u32), &[&str]) = match tier {
            BudgetTier::Economy => ((30, 60), &["Hostels", "2-3 star hotels"]),
            BudgetTier::Moderate => ((60, 120), &["2-3 star hotels", "3-4 star hotels"]),
            BudgetTier::Luxury => ((120, 300), &["4-5 star hotels", "Boutique hotels and resorts"]),
        };

        let mut out = format!(
            "Lodging in {destination} (budget: {})\n\nPrice range: {low}-{high} EUR per night\n\nRecommended types:\n",
            tier.label()
        );
        for kind in kinds {
            out.push_str(&format!("- {kind}\n"));
        }
        out.push_str(
            "\nTips:\n\
             - Book 2-3 months ahead for the best prices\n\
             - Compare several booking sites and recent reviews\n\
             - Prefer central neighbourhoods or ones well served by transit\n",
        );
        Ok(out)
    }
}

/// Ways to get from the origin to the destination.
pub struct TransportGuide {
    schema: Schema,
}

impl Default for TransportGuide {
    fn default() -> Self {
        Self {
            schema: Schema::new()
                .required("origin")
                .required("destination")
                .optional("transport_type"),
        }
    }
}

#[async_trait]
impl Capability for TransportGuide {
    fn name(&self) -> &str {
        "transport_guide"
    }

    fn description(&self) -> &str {
        "Train, flight and bus options between two places, with booking advice."
    }

    fn schema(&self) -> Option<&Schema> {
        Some(&self.schema)
    }

    async fn invoke(&self, args: &Args) -> Result<String> {
        let origin = arg(args, "origin")?;
        let destination = arg(args, "destination")?;
        let mode = args
            .get("transport_type")
            .map(|m| m.to_lowercase())
            .unwrap_or_else(|| "all".to_string());

        let mut out = format!("Transport options: {origin} -> {destination}\n\n");
        if matches!(mode.as_str(), "train" | "all") {
            out.push_str("TRAIN\n- Comfortable, low-carbon, city centre to city centre\n- Book early for the best fares\n\n");
        }
        if matches!(mode.as_str(), "plane" | "flight" | "all") {
            out.push_str("FLIGHT\n- Fastest over long distances\n- Compare secondary airports\n\n");
        }
        if matches!(mode.as_str(), "bus" | "all") {
            out.push_str("BUS\n- Cheapest option, but the slowest\n\n");
        }
        out.push_str("Be flexible on dates (+/- 3 days) to find lower prices.\n");
        Ok(out)
    }
}

/// Activity categories worth planning around.
pub struct ActivityGuide {
    schema: Schema,
}

impl Default for ActivityGuide {
    fn default() -> Self {
        Self {
            schema: Schema::new().required("destination").optional("interests"),
        }
    }
}

#[async_trait]
impl Capability for ActivityGuide {
    fn name(&self) -> &str {
        "activity_guide"
    }

    fn description(&self) -> &str {
        "Culture, outdoor, food and sport activity ideas for a destination."
    }

    fn schema(&self) -> Option<&Schema> {
        Some(&self.schema)
    }

    async fn invoke(&self, args: &Args) -> Result<String> {
        let destination = arg(args, "destination")?;
        let interests = args
            .get("interests")
            .map(|i| i.to_lowercase())
            .unwrap_or_else(|| "all".to_string());
        let wants = |keys: &[&str]| interests == "all" || keys.iter().any(|k| interests.contains(k));

        let mut out = format!("Activities in {destination}\n\n");
        if wants(&["culture", "museum"]) {
            out.push_str("CULTURE & MUSEUMS\n- Main museums (skip-the-line tickets)\n- Guided heritage walks\n\n");
        }
        if wants(&["nature", "outdoor"]) {
            out.push_str("NATURE & OUTDOORS\n- Parks and gardens\n- Urban hikes and viewpoints\n\n");
        }
        if wants(&["food", "gastronomy"]) {
            out.push_str("FOOD\n- Food tours and tastings\n- Traditional markets\n\n");
        }
        if wants(&["sport", "adventure"]) {
            out.push_str("SPORT & ADVENTURE\n- Bike or kayak rentals\n- Local sporting events\n\n");
        }
        Ok(out)
    }
}

/// Where and what to eat, per budget.
pub struct RestaurantGuide {
    schema: Schema,
}

impl Default for RestaurantGuide {
    fn default() -> Self {
        Self {
            schema: Schema::new()
                .required("destination")
                .optional("budget")
                .optional("cuisine"),
        }
    }
}

#[async_trait]
impl Capability for RestaurantGuide {
    fn name(&self) -> &str {
        "restaurant_guide"
    }

    fn description(&self) -> &str {
        "Restaurant advice and per-person price range for a destination."
    }

    fn schema(&self) -> Option<&Schema> {
        Some(&self.schema)
    }

    async fn invoke(&self, args: &Args) -> Result<String> {
        let destination = arg(args, "destination")?;
        let cuisine = args.get("cuisine").map(String::as_str).unwrap_or("local");
        let price = match budget(args) {
            BudgetTier::Economy => "10-20 EUR per person",
            BudgetTier::Moderate => "20-40 EUR per person",
            BudgetTier::Luxury => "50+ EUR per person",
        };

        Ok(format!(
            "Restaurants in {destination}\n\n\
             Cuisine: {cuisine}\n\
             Budget: {price}\n\n\
             - Favour places where locals eat, away from the busiest tourist streets\n\
             - Ask for regional specialities\n\
             - Book ahead for popular restaurants\n\
             - Try the local markets\n"
        ))
    }
}

/// Day-by-day skeleton itinerary.
pub struct ItineraryTemplate {
    schema: Schema,
    max_days: u32,
}

impl Default for ItineraryTemplate {
    fn default() -> Self {
        Self {
            schema: Schema::new().required("destination").required("duration"),
            max_days: 30,
        }
    }
}

#[async_trait]
impl Capability for ItineraryTemplate {
    fn name(&self) -> &str {
        "itinerary_template"
    }

    fn description(&self) -> &str {
        "A morning/lunch/afternoon/evening skeleton for each day of the stay."
    }

    fn schema(&self) -> Option<&Schema> {
        Some(&self.schema)
    }

    async fn invoke(&self, args: &Args) -> Result<String> {
        let destination = arg(args, "destination")?;
        let raw = arg(args, "duration")?;
        let days: u32 = raw
            .trim()
            .parse()
            .with_context(|| format!("duration is not a number of days: {raw:?}"))?;
        let days = days.clamp(1, self.max_days);

        let mut out = format!(
            "Itinerary for {destination} ({days} day{})\n\n",
            if days > 1 { "s" } else { "" }
        );
        for day in 1..=days {
            out.push_str(&format!(
                "DAY {day}\n\
                 Morning: main sights before the crowds\n\
                 Lunch: a recommended local restaurant\n\
                 Afternoon: neighbourhood walk or activity\n\
                 Evening: dinner and a show or stroll\n\n"
            ));
        }
        out.push_str("Group sights by area and keep some slack for spontaneous finds.\n");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> Args {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn budget_tier_parsing() {
        assert_eq!(BudgetTier::parse("Luxe"), BudgetTier::Luxury);
        assert_eq!(BudgetTier::parse("économique"), BudgetTier::Economy);
        assert_eq!(BudgetTier::parse("moderate"), BudgetTier::Moderate);
        assert_eq!(BudgetTier::parse("whatever"), BudgetTier::Moderate);
    }

    #[tokio::test]
    async fn lodging_uses_budget_range() {
        let out = LodgingGuide::default()
            .invoke(&args(&[("destination", "Kyoto"), ("budget", "luxury")]))
            .await
            .unwrap();
        assert!(out.contains("Lodging in Kyoto (budget: luxury)"));
        assert!(out.contains("120-300 EUR"));
    }

    #[tokio::test]
    async fn transport_filters_by_mode() {
        let out = TransportGuide::default()
            .invoke(&args(&[
                ("origin", "Brussels"),
                ("destination", "Paris"),
                ("transport_type", "train"),
            ]))
            .await
            .unwrap();
        assert!(out.contains("Brussels -> Paris"));
        assert!(out.contains("TRAIN"));
        assert!(!out.contains("FLIGHT"));
    }

    #[tokio::test]
    async fn activities_default_to_all_categories() {
        let out = ActivityGuide::default()
            .invoke(&args(&[("destination", "Oslo")]))
            .await
            .unwrap();
        for section in ["CULTURE", "NATURE", "FOOD", "SPORT"] {
            assert!(out.contains(section), "missing {section}");
        }
    }

    #[tokio::test]
    async fn restaurants_price_follows_budget() {
        let out = RestaurantGuide::default()
            .invoke(&args(&[("destination", "Lyon"), ("budget", "economy")]))
            .await
            .unwrap();
        assert!(out.contains("10-20 EUR"));
        assert!(out.contains("Cuisine: local"));
    }

    #[tokio::test]
    async fn itinerary_has_one_block_per_day() {
        let out = ItineraryTemplate::default()
            .invoke(&args(&[("destination", "Rome"), ("duration", "3")]))
            .await
            .unwrap();
        assert!(out.contains("(3 days)"));
        assert!(out.contains("DAY 3"));
        assert!(!out.contains("DAY 4"));
    }

    #[tokio::test]
    async fn itinerary_rejects_non_numeric_duration() {
        let err = ItineraryTemplate::default()
            .invoke(&args(&[("destination", "Rome"), ("duration", "a week")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duration"));
    }
}
