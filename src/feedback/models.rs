use serde::{Deserialize, Serialize};

use crate::store::StarText;

/// Coach comments per STAR component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarFeedback {
    #[serde(default)]
    pub situation: String,
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub result: String,
}

/// Structured feedback on one spoken response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub overall: String,
    #[serde(default)]
    pub star: StarFeedback,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
}

impl Feedback {
    /// Shown when the model call fails or returns something unparseable
    pub fn fallback() -> Self {
        Self {
            overall: "Your response demonstrates good structure and addresses the question. \
                      Consider adding more specific details and quantifiable results."
                .to_string(),
            star: StarFeedback {
                situation: "Clearly described the context and background".to_string(),
                task: "Identified your responsibility in the situation".to_string(),
                action: "Explained specific steps you took".to_string(),
                result: "Mentioned a positive outcome".to_string(),
            },
            strengths: vec![
                "Clear STAR structure throughout the response".to_string(),
                "Demonstrated ownership of the situation".to_string(),
                "Included an outcome".to_string(),
            ],
            improvements: vec![
                "Add more specific details about the situation".to_string(),
                "Elaborate on the techniques you used".to_string(),
                "Include metrics that quantify the result".to_string(),
            ],
        }
    }
}

/// Everything the coach sees for one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRequest {
    pub question_title: String,
    pub transcript: String,
    pub draft: Option<StarText>,
}

/// Returned to the review screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub transcript: String,
    pub feedback: Feedback,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_model_output_fills_defaults() {
        let feedback: Feedback =
            serde_json::from_str(r#"{"overall": "Solid", "strengths": ["Clear"]}"#).unwrap();
        assert_eq!(feedback.overall, "Solid");
        assert_eq!(feedback.strengths, vec!["Clear".to_string()]);
        assert!(feedback.improvements.is_empty());
        assert_eq!(feedback.star, StarFeedback::default());
    }

    #[test]
    fn test_fallback_is_fully_populated() {
        let feedback = Feedback::fallback();
        assert!(!feedback.overall.is_empty());
        assert!(!feedback.star.result.is_empty());
        assert_eq!(feedback.strengths.len(), 3);
        assert_eq!(feedback.improvements.len(), 3);
    }
}
