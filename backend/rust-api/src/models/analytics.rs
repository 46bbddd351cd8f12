use serde::Serialize;

/// Aggregated host-facing view over one session: score histogram plus a
/// per-question response breakdown.
#[derive(Debug, Serialize)]
pub struct SessionAnalytics {
    pub session_code: i64,
    pub quiz_id: String,
    pub student_count: u64,
    pub total_questions: u64,
    pub total_correct: u64,
    pub total_possible_answers: u64,
    /// `100 * total_correct / total_possible_answers`, 0.0 with no students.
    pub average_correct_percent: f64,
    /// Ten fixed 10-point buckets; index 9 covers [90, 100] inclusive.
    pub score_buckets: [u64; 10],
    pub per_question: Vec<QuestionBreakdown>,
}

#[derive(Debug, Serialize)]
pub struct QuestionBreakdown {
    pub question_id: String,
    pub question_text: String,
    pub options: Vec<OptionBreakdown>,
    pub total_responses: i64,
    pub correct_count: i64,
}

#[derive(Debug, Serialize)]
pub struct OptionBreakdown {
    pub option_id: String,
    /// None for counters recorded against option ids the quiz no longer
    /// knows about (option churn anomalies).
    pub text: Option<String>,
    pub is_correct: bool,
    pub count: i64,
}
