const ROLE_LABEL: &str = "Role:";
const GOAL_LABEL: &str = "Goal:";
const BACKSTORY_LABEL: &str = "Backstory:";
const HIGHLIGHTS_HEADER: &str = "Key information:";
const CONTEXT_HEADER: &str = "Context:";
const TASK_HEADER: &str = "Task:";
const EXPECTED_HEADER: &str = "Expected output:";
const CAPABILITIES_HEADER: &str = "Capability results:";

/// Everything that goes into one unit's prompt, already resolved.
#[derive(Debug, Default)]
pub struct UnitPrompt<'a> {
    pub role: &'a str,
    pub goal: &'a str,
    pub backstory: Option<&'a str>,
    /// `(field, value)` pairs surfaced before the context.
    pub highlights: Vec<(&'a str, &'a str)>,
    /// Value the backend must not drift away from.
    pub focus: Option<&'a str>,
    pub context: Option<&'a str>,
    pub instruction: &'a str,
    pub expected_output: &'a str,
    /// `(capability, output)` pairs in declaration order.
    pub capability_results: Vec<(&'a str, &'a str)>,
}

/// Sections in fixed order: role, goal, backstory, key information, context,
/// task, expected output, capability results. Empty sections are left out.
pub fn build_unit_prompt(prompt: &UnitPrompt) -> String {
    let mut sections = Vec::new();

    let mut persona = format!("{ROLE_LABEL} {}\n{GOAL_LABEL} {}", prompt.role, prompt.goal);
    if let Some(backstory) = prompt.backstory.map(str::trim).filter(|b| !b.is_empty()) {
        persona.push_str(&format!("\n{BACKSTORY_LABEL} {backstory}"));
    }
    sections.push(persona);

    if !prompt.highlights.is_empty() || prompt.focus.is_some() {
        let mut block = String::from(HIGHLIGHTS_HEADER);
        for (field, value) in &prompt.highlights {
            block.push_str(&format!("\n- {field}: {value}"));
        }
        if let Some(focus) = prompt.focus {
            block.push_str(&format!(
                "\nIMPORTANT: focus exclusively on {focus}. Never suggest alternatives to it."
            ));
        }
        sections.push(block);
    }

    if let Some(context) = prompt.context.map(str::trim).filter(|c| !c.is_empty()) {
        sections.push(format!("{CONTEXT_HEADER}\n{context}"));
    }

    sections.push(format!("{TASK_HEADER}\n{}", prompt.instruction.trim()));

    let expected = prompt.expected_output.trim();
    if !expected.is_empty() {
        sections.push(format!("{EXPECTED_HEADER}\n{expected}"));
    }

    if !prompt.capability_results.is_empty() {
        let results = prompt
            .capability_results
            .iter()
            .map(|(name, output)| format!("[{name}]\n{}", output.trim()))
            .collect::<Vec<_>>()
            .join("\n\n");
        sections.push(format!("{CAPABILITIES_HEADER}\n{results}"));
    }

    sections.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> UnitPrompt<'static> {
        UnitPrompt {
            role: "Weather Specialist",
            goal: "Advise on clothing",
            backstory: Some("Ten years forecasting"),
            highlights: vec![("destination", "Oslo"), ("duration", "4")],
            focus: Some("Oslo"),
            context: Some("Context from 'Researcher': fjords"),
            instruction: "  Analyse the weather in Oslo.  ",
            expected_output: "A short report",
            capability_results: vec![("weather", "3°C, snow")],
        }
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let prompt = build_unit_prompt(&full());
        let order = [
            "Role: Weather Specialist",
            "Goal: Advise on clothing",
            "Backstory: Ten years forecasting",
            "Key information:",
            "- destination: Oslo",
            "IMPORTANT: focus exclusively on Oslo",
            "Context:\nContext from 'Researcher': fjords",
            "Task:\nAnalyse the weather in Oslo.",
            "Expected output:\nA short report",
            "Capability results:\n[weather]\n3°C, snow",
        ];
        let mut last = 0;
        for needle in order {
            let pos = prompt[last..]
                .find(needle)
                .unwrap_or_else(|| panic!("{needle:?} missing or out of order"));
            last += pos;
        }
    }

    #[test]
    fn empty_sections_are_omitted() {
        let prompt = build_unit_prompt(&UnitPrompt {
            role: "Planner",
            goal: "Plan",
            instruction: "Do it",
            ..UnitPrompt::default()
        });
        assert_eq!(prompt, "Role: Planner\nGoal: Plan\n\nTask:\nDo it");
    }

    #[test]
    fn blank_backstory_is_dropped() {
        let prompt = build_unit_prompt(&UnitPrompt {
            backstory: Some("   "),
            ..full()
        });
        assert!(!prompt.contains(BACKSTORY_LABEL));
    }

    #[test]
    fn capability_results_keep_declaration_order() {
        let prompt = build_unit_prompt(&UnitPrompt {
            capability_results: vec![("b_first", "1"), ("a_second", "2")],
            ..full()
        });
        let b = prompt.find("[b_first]").unwrap();
        let a = prompt.find("[a_second]").unwrap();
        assert!(b < a);
    }
}
