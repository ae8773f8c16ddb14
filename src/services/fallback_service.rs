use async_trait::async_trait;

use super::ai_service::QuizProvider;
use crate::error::Result;

/// Built-in quiz source used when AI generation fails and fallback is enabled.
/// Emits the same line template as the AI prompt so it flows through the
/// regular parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackProvider;

#[async_trait]
impl QuizProvider for FallbackProvider {
    async fn generate_raw(&self, topic: &str, _model: &str) -> Result<String> {
        let topic = topic.trim();
        Ok(format!(
            "Q1: Which approach is most effective for building a solid understanding of {topic}?
A) Memorizing isolated facts without context
B) Connecting the core concepts and practicing with concrete examples
C) Skipping the fundamentals and starting with edge cases
D) Relying on a single unverified source
Correct: B
Explanation: Understanding grows when concepts are linked together and applied.

Q2: You meet an unfamiliar term while studying {topic}. What should you do first?
A) Ignore it and keep reading
B) Assume it means the same as a similar-looking word
C) Look up its definition and see how it is used in context
D) Stop studying the topic altogether
Correct: C
Explanation: Clarifying vocabulary early prevents misunderstandings later.

Q3: What is a reliable way to check your own knowledge of {topic}?
A) Explain the main ideas in your own words without notes
B) Re-read the same page several times
C) Highlight as much text as possible
D) Count how many hours you have spent on it
Correct: A
Explanation: Active recall reveals gaps that passive review hides.

Q4: Which sources are generally the most trustworthy for learning about {topic}?
A) Anonymous posts without references
B) Advertisements
C) Rumours shared on social media
D) Expert-authored or peer-reviewed material
Correct: D
Explanation: Expert review and citations make information easier to verify.

Q5: Why is it useful to revisit {topic} a few days after first studying it?
A) It is not useful once you have read it once
B) It guarantees you never forget anything
C) Spaced repetition strengthens long-term memory
D) Details always change within a few days
Correct: C
Explanation: Reviewing at increasing intervals improves retention.
"
        ))
    }
}
