//! Prompt construction for the stages that consult the judge.
//!
//! Learner text is always passed through `sanitize_input` before it is
//! embedded here.

use wlr_core::{Intent, WisdomCorrection};

pub fn intent_prompt(topic: &str, description: &str) -> String {
    format!(
        r#"You classify learner work-log entries into exactly one activity category.

Categories:
- deep_learning: studying new concepts or material for the first time
- review: revisiting, revising or practising material already studied
- project_work: building or extending a concrete project or feature
- debugging: investigating and fixing errors, crashes or broken behaviour

Example 1
Topic: "React Hooks"
Entry: "Read the docs on useEffect cleanup and wrote tiny examples to see when it runs."
Reasoning: New material studied through documentation and small experiments.
Category: deep_learning

Example 2
Topic: "SQL Joins"
Entry: "Went back over last week's notes on outer joins and redid the practice queries."
Reasoning: Revisiting material already covered and repeating exercises.
Category: review

Example 3
Topic: "Django REST Framework"
Entry: "Added pagination and filtering to the inventory API of our internal tool."
Reasoning: Extending a concrete application with new features.
Category: project_work

Example 4
Topic: "Docker"
Entry: "Container kept exiting with code 137; traced it to the memory limit and fixed the compose file."
Reasoning: Investigating and resolving a failure.
Category: debugging

Now classify this entry. Think step by step, then answer in this exact format:
Reasoning: <one or two sentences>
Category: <deep_learning | review | project_work | debugging>

Topic: "{topic}"
Entry: "{description}""#
    )
}

pub fn substance_prompt(topic: &str, description: &str, hours: f64, intent: Intent) -> String {
    format!(
        r#"You review learner work-log entries for substance.
Topic: "{topic}"
Activity: {intent}
Hours claimed: {hours:.1}h

Entry: "{description}"

Does the entry describe concrete, specific work (concepts, tools, techniques, results)
in proportion to the hours claimed, or is it vague filler?

Answer in this exact format:
Reasoning: <2-3 sentences>
Verdict: <PASS or CONCERN or FAIL>
Score: <0.0-1.0, how substantive the entry is>"#
    )
}

pub fn legitimacy_prompt(
    topic: &str,
    description: &str,
    hours: f64,
    intent: Intent,
    signals: &[String],
) -> String {
    let signals = if signals.is_empty() {
        "none".to_string()
    } else {
        signals.join("; ")
    };
    format!(
        r#"You audit learner work-log entries that automated checks marked as high risk.
Topic: "{topic}"
Activity: {intent}
Hours claimed: {hours:.1}h
Risk signals raised: {signals}

Entry: "{description}"

Think step by step:
1. Could a person genuinely have done this work in {hours:.1}h?
2. Is the text padded, repetitive or generic enough to fit any topic?
3. Does it name anything specific that only someone who did the work would know?

Answer in this exact format:
Reasoning: <3-5 sentences>
Verdict: <PASS or CONCERN or FAIL>
Score: <0.0-1.0, how likely the entry is a legitimate log of real work>"#
    )
}

pub fn relevance_prompt(
    topic: &str,
    description: &str,
    prior_entries: u32,
    corrections: &[&WisdomCorrection],
) -> String {
    let position = if prior_entries == 0 {
        "This is the learner's FIRST entry on this topic. Be lenient about depth.".to_string()
    } else {
        format!("This is entry #{} on this topic.", prior_entries + 1)
    };

    let mut wisdom = String::new();
    if !corrections.is_empty() {
        wisdom.push_str("\nAdmin corrections of earlier judgments (learn from these):\n");
        for c in corrections {
            wisdom.push_str(&format!(
                "- '{}': {} (judged {} -> admin {})\n",
                c.topic_name, c.reason, c.original_decision, c.corrected_decision
            ));
        }
    }

    format!(
        r#"You judge whether a learner's work-log entry is about the topic it was logged under.

Example (fully relevant)
Topic: "Python Decorators"
Entry: "Wrote a timing decorator with functools.wraps and learned why it keeps the wrapped name."
Reasoning: Entirely about decorators, with a concrete example.
Score: 0.95

Example (partially relevant)
Topic: "Kubernetes"
Entry: "Set up Docker on my laptop and read an overview of container orchestration."
Reasoning: Adjacent groundwork; Kubernetes itself is only touched in passing.
Score: 0.55

Example (unrelated)
Topic: "Machine Learning"
Entry: "Organised my desk and answered emails about the team offsite."
Reasoning: Nothing to do with the topic.
Score: 0.05
{wisdom}
{position}

Topic: "{topic}"
Entry: "{description}"

Answer in this exact format:
Reasoning: <1-3 sentences>
Score: <0.0-1.0>"#
    )
}

pub fn blocker_prompt(topic: &str, blocker: &str, hours: f64) -> String {
    format!(
        r#"A learner logged {hours:.1}h on "{topic}" and reported this blocker:
"{blocker}"

Is this a plausible, specific obstacle that would reasonably slow learning down,
or an empty excuse?

Answer in this exact format:
Reasoning: <1-2 sentences>
Verdict: <PASS or CONCERN or FAIL>
Score: <0.0-1.0, how legitimate the blocker is>"#
    )
}
