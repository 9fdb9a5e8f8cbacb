use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{Args, Capability, Schema};
use crate::template;

const DDG_URL: &str = "https://api.duckduckgo.com/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RESULTS: usize = 5;

/// DuckDuckGo instant-answer lookup. The query comes from a `{field}`
/// template; every placeholder in it is a required schema field.
pub struct WebSearchCapability {
    query_template: String,
    max_results: usize,
    schema: Schema,
    client: reqwest::Client,
}

impl Default for WebSearchCapability {
    fn default() -> Self {
        Self::new("{query}")
    }
}

impl WebSearchCapability {
    pub fn new(query_template: impl Into<String>) -> Self {
        let query_template = query_template.into();
        let schema = template::placeholders(&query_template)
            .into_iter()
            .fold(Schema::new(), |schema, name| schema.required(name));
        Self {
            query_template,
            max_results: DEFAULT_RESULTS,
            schema,
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    fn build_query(&self, args: &Args) -> String {
        template::substitute(&self.query_template, args)
    }

    fn format_answer(&self, query: &str, answer: &InstantAnswer) -> String {
        let mut sections = Vec::new();
        if !answer.abstract_text.is_empty() {
            sections.push(format!("Summary: {}", answer.abstract_text));
        }
        sections.extend(
            answer
                .related_topics
                .iter()
                .filter_map(|t| t.text.as_deref())
                .take(self.max_results)
                .map(|t| format!("- {t}")),
        );

        if sections.is_empty() {
            format!("No results found for: {query}")
        } else {
            sections.join("\n\n")
        }
    }
}

#[async_trait]
impl Capability for WebSearchCapability {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web for current information and returns a short digest."
    }

    fn schema(&self) -> Option<&Schema> {
        Some(&self.schema)
    }

    async fn invoke(&self, args: &Args) -> Result<String> {
        let query = self.build_query(args);
        let url = reqwest::Url::parse_with_params(
            DDG_URL,
            &[
                ("q", query.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ],
        )?;
        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            bail!("web search failed ({})", resp.status());
        }

        let answer: InstantAnswer = resp.json().await?;
        Ok(self.format_answer(&query, &answer))
    }
}

#[derive(Debug, Default, Deserialize)]
struct InstantAnswer {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

/// Grouped topics have no `Text`; they are skipped.
#[derive(Debug, Deserialize)]
struct RelatedTopic {
    #[serde(rename = "Text")]
    text: Option<String>,
}
