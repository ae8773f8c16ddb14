use uuid::Uuid;

use crate::models::question::{AnswerLabel, Question};

/// Feedback bands, checked top-down against the rounded percentage.
const FEEDBACK_BANDS: &[(i32, &str)] = &[
    (90, "Outstanding! You have mastered this topic."),
    (80, "Great job! You have a strong grasp of this topic."),
    (70, "Good work! You know this topic well, with a few gaps to fill."),
    (60, "Not bad! Review the explanations to strengthen your understanding."),
    (50, "You're getting there. Study the topic a bit more and try again."),
    (0, "Keep learning! Go through the explanations and give it another try."),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub position: i32,
    pub submitted: AnswerLabel,
    pub correct: AnswerLabel,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub score: i32,
    pub total: i32,
    pub percentage: i32,
    pub answers: Vec<GradedAnswer>,
}

pub struct GradingService;

impl GradingService {
    /// Grades answers positionally: `answers[i]` is compared with the question
    /// at ordinal `i + 1`. Both slices must have the same length.
    pub fn grade(questions: &[Question], answers: &[AnswerLabel]) -> Grade {
        let mut ordered: Vec<&Question> = questions.iter().collect();
        ordered.sort_by_key(|q| q.position);

        let graded: Vec<GradedAnswer> = ordered
            .iter()
            .zip(answers.iter())
            .map(|(q, submitted)| GradedAnswer {
                question_id: q.id,
                position: q.position,
                submitted: *submitted,
                correct: q.correct_answer,
                is_correct: *submitted == q.correct_answer,
            })
            .collect();

        let score = graded.iter().filter(|a| a.is_correct).count() as i32;
        let total = graded.len() as i32;

        Grade {
            score,
            total,
            percentage: Self::percentage(score, total),
            answers: graded,
        }
    }

    /// `round(score / total * 100)` with halves rounding up.
    pub fn percentage(score: i32, total: i32) -> i32 {
        if total <= 0 {
            return 0;
        }
        (200 * score + total) / (2 * total)
    }

    pub fn feedback(percentage: i32) -> &'static str {
        FEEDBACK_BANDS
            .iter()
            .find(|(threshold, _)| percentage >= *threshold)
            .map(|(_, message)| *message)
            .unwrap_or(FEEDBACK_BANDS[FEEDBACK_BANDS.len() - 1].1)
    }
}
