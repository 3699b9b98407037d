use super::models::{Feedback, FeedbackRequest};
use crate::store::StarText;

const NOT_PROVIDED: &str = "Not provided";

fn field(value: &Option<String>) -> &str {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => NOT_PROVIDED,
    }
}

fn draft_context(draft: &StarText) -> String {
    format!(
        "The user prepared this STAR draft:\n\
         Situation: {}\n\
         Task: {}\n\
         Action: {}\n\
         Result: {}\n",
        field(&draft.situation),
        field(&draft.task),
        field(&draft.action),
        field(&draft.result),
    )
}

/// Render the coaching prompt for one attempt
pub fn build_prompt(request: &FeedbackRequest) -> String {
    let draft = request
        .draft
        .as_ref()
        .map(draft_context)
        .unwrap_or_default();

    format!(
        r#"You are an expert interview coach evaluating a behavioral interview response.

Question: "{question}"

{draft}
Candidate's spoken response (transcript):
"{transcript}"

Provide detailed feedback in the following JSON format:
{{
  "overall": "A brief overall assessment (2-3 sentences)",
  "star": {{
    "situation": "Feedback on the situation component",
    "task": "Feedback on the task component",
    "action": "Feedback on the action component",
    "result": "Feedback on the result component"
  }},
  "strengths": ["strength 1", "strength 2", "strength 3"],
  "improvements": ["improvement 1", "improvement 2", "improvement 3"]
}}

Focus on:
- STAR structure completeness
- Specificity and detail
- Relevance to the question
- Communication clarity
- Quantifiable results"#,
        question = request.question_title,
        draft = draft,
        transcript = request.transcript,
    )
}

/// Parse the model's reply, tolerating a surrounding ``` fence
pub fn parse_feedback(text: &str) -> Result<Feedback, serde_json::Error> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(body.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(draft: Option<StarText>) -> FeedbackRequest {
        FeedbackRequest {
            question_title: "Describe a conflict".to_string(),
            transcript: "We disagreed about the language".to_string(),
            draft,
        }
    }

    #[test]
    fn test_prompt_includes_question_and_transcript() {
        let prompt = build_prompt(&request(None));
        assert!(prompt.contains("Question: \"Describe a conflict\""));
        assert!(prompt.contains("\"We disagreed about the language\""));
        assert!(!prompt.contains("STAR draft"));
    }

    #[test]
    fn test_missing_draft_fields_marked_not_provided() {
        let prompt = build_prompt(&request(Some(StarText {
            situation: Some("Team project".to_string()),
            task: Some("   ".to_string()),
            ..Default::default()
        })));

        assert!(prompt.contains("Situation: Team project"));
        assert!(prompt.contains("Task: Not provided"));
        assert!(prompt.contains("Result: Not provided"));
    }

    #[test]
    fn test_parse_accepts_fenced_json() {
        let reply = "```json\n{\"overall\": \"Good\", \"strengths\": []}\n```";
        let feedback = parse_feedback(reply).unwrap();
        assert_eq!(feedback.overall, "Good");
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(parse_feedback("Great answer, well done!").is_err());
    }
}
