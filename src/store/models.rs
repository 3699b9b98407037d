use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A behavioral question from the library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub question_number: Option<i32>,
    #[serde(default)]
    pub companies: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub example_situation: Option<String>,
    #[serde(default)]
    pub example_task: Option<String>,
    #[serde(default)]
    pub example_action: Option<String>,
    #[serde(default)]
    pub example_result: Option<String>,
}

/// A user's written STAR response to one question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    pub user_id: String,
    pub question_id: String,
    #[serde(default)]
    pub situation: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Draft {
    pub fn star(&self) -> StarText {
        StarText {
            situation: self.situation.clone(),
            task: self.task.clone(),
            action: self.action.clone(),
            result: self.result.clone(),
        }
    }
}

/// The four STAR fields, as edited in the workspace or shown to the coach
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StarText {
    #[serde(default)]
    pub situation: Option<String>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
}

/// A persisted recording of one practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: String,
    pub user_id: String,
    pub question_id: String,
    #[serde(default)]
    pub draft_id: Option<String>,
    /// Recorded length in whole seconds
    pub duration: u64,
    #[serde(default)]
    pub transcript: Option<String>,
    /// Coach feedback JSON; null until the review flow fills it in
    #[serde(default)]
    pub feedback: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for a new attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttempt {
    pub user_id: String,
    pub question_id: String,
    pub draft_id: Option<String>,
    pub duration: u64,
    pub transcript: String,
    /// Always null at creation
    pub feedback: Option<serde_json::Value>,
}

/// Library filter; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

/// Questions without a number sort after numbered ones
const UNNUMBERED_RANK: i32 = 999;

impl QuestionFilter {
    pub fn matches(&self, question: &Question) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => question
                .title
                .to_lowercase()
                .contains(&term.to_lowercase()),
            _ => true,
        };

        let matches_category = match self.category.as_deref() {
            None | Some("") | Some("All Topics") => true,
            Some(category) => question.category == category,
        };

        let matches_company = match self.company.as_deref() {
            None | Some("") | Some("All Companies") => true,
            Some(company) => question
                .companies
                .as_ref()
                .map(|companies| companies.iter().any(|c| c == company))
                .unwrap_or(false),
        };

        matches_search && matches_category && matches_company
    }

    /// Filter and order questions the way the library lists them
    pub fn apply(&self, questions: Vec<Question>) -> Vec<Question> {
        let mut filtered: Vec<Question> = questions
            .into_iter()
            .filter(|q| self.matches(q))
            .collect();

        filtered.sort_by_key(|q| q.question_number.unwrap_or(UNNUMBERED_RANK));
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, title: &str, category: &str, number: Option<i32>) -> Question {
        Question {
            id: id.to_string(),
            title: title.to_string(),
            category: category.to_string(),
            difficulty: None,
            description: None,
            question_number: number,
            companies: None,
            tags: None,
            example_situation: None,
            example_task: None,
            example_action: None,
            example_result: None,
        }
    }

    #[test]
    fn test_filter_sorts_unnumbered_last() {
        let questions = vec![
            question("a", "Tell me about a failure", "Failure", None),
            question("b", "Describe a conflict", "Conflict", Some(7)),
            question("c", "Lead a team", "Leadership", Some(2)),
        ];

        let ids: Vec<String> = QuestionFilter::default()
            .apply(questions)
            .into_iter()
            .map(|q| q.id)
            .collect();

        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let filter = QuestionFilter {
            search: Some("CONFLICT".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&question("b", "Describe a conflict", "Conflict", None)));
        assert!(!filter.matches(&question("c", "Lead a team", "Leadership", None)));
    }

    #[test]
    fn test_all_topics_matches_every_category() {
        let filter = QuestionFilter {
            category: Some("All Topics".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&question("c", "Lead a team", "Leadership", None)));
    }

    #[test]
    fn test_company_filter_requires_listed_company() {
        let mut q = question("c", "Lead a team", "Leadership", None);
        let filter = QuestionFilter {
            company: Some("Acme".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&q));

        q.companies = Some(vec!["Acme".to_string()]);
        assert!(filter.matches(&q));
    }
}
