//! Prompt templates for the deliberation flow

/// Templates for generating prompts at each stage
pub struct PromptTemplate;

impl PromptTemplate {
    /// Preamble prepended to the user's task for every competing agent.
    ///
    /// Every backend is additionally constrained at the invocation level
    /// (disabled write/edit/exec capabilities); this restates the contract
    /// in-band so the model plans instead of acting.
    pub fn competitor_preamble() -> &'static str {
        r#"You are one of several independent AI coding assistants analyzing the same task.
Explore the repository in read-only mode: do not write files, do not modify state,
do not run commands that change anything. Produce a concrete, well-structured plan
or answer for the task below. Be specific about files, functions, and trade-offs."#
    }

    /// Full competitor prompt for a task.
    pub fn competitor_prompt(task: &str) -> String {
        format!("{}\n\nTask:\n{}", Self::competitor_preamble(), task)
    }

    /// Ranking prompt sent to every judge: all anonymized candidates plus
    /// the required verdict format.
    pub fn ranking_prompt(task: &str, labeled_responses: &[(String, String)]) -> String {
        let mut prompt = format!(
            r#"Several AI assistants independently produced a response to this task:

{task}

Evaluate each response for correctness, depth, and practical usefulness.
The responses are anonymized; judge only their content.

"#
        );

        for (label, response) in labeled_responses {
            prompt.push_str(&format!("--- {label} ---\n{response}\n\n"));
        }

        prompt.push_str(
            r#"After your analysis, end with your verdict in exactly this format:

FINAL RANKING:
1. Response X
2. Response Y

(best first, one numbered entry per response)"#,
        );

        prompt
    }

    /// Synthesis prompt for the chairman: candidates plus judge verdicts.
    pub fn synthesis_prompt(
        task: &str,
        labeled_responses: &[(String, String)],
        verdicts: &[(String, String)],
    ) -> String {
        let mut prompt = format!(
            r#"You are the chairman of a panel that evaluated responses to this task:

{task}

Candidate responses:
"#
        );

        for (label, response) in labeled_responses {
            prompt.push_str(&format!("\n--- {label} ---\n{response}\n"));
        }

        if !verdicts.is_empty() {
            prompt.push_str("\nJudge verdicts:\n");
            for (judge, verdict) in verdicts {
                prompt.push_str(&format!("\n--- Verdict by {judge} ---\n{verdict}\n"));
            }
        }

        prompt.push_str(
            r#"
Synthesize a single final answer that takes the strongest elements from the
candidates, weighted by the judges' verdicts. Resolve disagreements explicitly.
Respond with the final answer only."#,
        );

        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn competitor_prompt_embeds_task() {
        let prompt = PromptTemplate::competitor_prompt("add a cache");
        assert!(prompt.contains("read-only"));
        assert!(prompt.contains("add a cache"));
    }

    #[test]
    fn ranking_prompt_contains_labels_and_format() {
        let responses = vec![
            ("Response A".to_string(), "first".to_string()),
            ("Response B".to_string(), "second".to_string()),
        ];
        let prompt = PromptTemplate::ranking_prompt("the task", &responses);
        assert!(prompt.contains("--- Response A ---"));
        assert!(prompt.contains("--- Response B ---"));
        assert!(prompt.contains("FINAL RANKING:"));
    }

    #[test]
    fn synthesis_prompt_includes_verdicts_when_present() {
        let responses = vec![("Response A".to_string(), "plan".to_string())];
        let verdicts = vec![("gpt-5.2".to_string(), "1. Response A".to_string())];
        let prompt = PromptTemplate::synthesis_prompt("task", &responses, &verdicts);
        assert!(prompt.contains("Verdict by gpt-5.2"));

        let without = PromptTemplate::synthesis_prompt("task", &responses, &[]);
        assert!(!without.contains("Judge verdicts"));
    }
}
