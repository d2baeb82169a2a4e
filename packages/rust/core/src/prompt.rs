//! Prompt construction for article enhancement.

use std::fmt::Write as _;

use blogforge_shared::Article;

/// System prompt sent with every enhancement request.
pub const SYSTEM_PROMPT: &str = "You are an expert content writer and SEO specialist. \
Your task is to improve articles by analyzing top-performing content and incorporating \
best practices while maintaining authenticity.";

/// Competitors cited explicitly in the task instructions.
const CITED_COMPETITORS: usize = 2;

const NOT_AVAILABLE: &str = "N/A";

const TASK: &str = "**YOUR TASK:**
Rewrite the original article with the following improvements:

1. **Structure & Formatting**: Adopt the formatting style of the top-ranking articles (heading hierarchy, paragraph length, use of lists)

2. **Content Enhancement**:
   - Maintain the original topic and core message
   - Incorporate relevant insights from competitor articles
   - Improve clarity and readability
   - Add more depth where competitors provide better coverage

3. **SEO Optimization**:
   - Use natural keyword integration similar to competitors
   - Improve meta-worthy content
   - Enhance engagement potential

4. **Tone & Style**: Match the professional, engaging tone of successful articles

5. **Length**: Aim for similar word count as the competitor articles

**IMPORTANT**:
- Keep the enhanced article authentic and original
- Do not plagiarize; synthesize insights creatively
- Maintain factual accuracy from the original
- Write in a clear, engaging manner

**OUTPUT FORMAT**:
Provide only the rewritten article content. Do not include any preamble or explanation.";

/// A scraped competitor article, in search rank order.
#[derive(Debug, Clone)]
pub struct Competitor {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Character budgets for the embedded article bodies.
#[derive(Debug, Clone, Copy)]
pub struct PromptBudgets {
    pub original: usize,
    pub competitor: usize,
}

impl Default for PromptBudgets {
    fn default() -> Self {
        Self {
            original: 2000,
            competitor: 1500,
        }
    }
}

/// First `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Build the user prompt for one article.
///
/// Every competitor is embedded, but the task text and the References
/// section only name the first two; missing slots read `N/A`.
pub fn build_user_prompt(
    article: &Article,
    competitors: &[Competitor],
    budgets: PromptBudgets,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("I need you to rewrite and enhance an article based on successful competitor content.\n\n");

    let _ = write!(
        prompt,
        "**ORIGINAL ARTICLE:**\nTitle: {}\nContent: {}\n\n",
        article.title,
        truncate_chars(&article.content, budgets.original)
    );

    let slots = competitors.len().max(CITED_COMPETITORS);
    for i in 0..slots {
        let (title, content) = match competitors.get(i) {
            Some(c) => (c.title.as_str(), truncate_chars(&c.content, budgets.competitor)),
            None => (NOT_AVAILABLE, NOT_AVAILABLE),
        };
        let _ = write!(
            prompt,
            "**TOP-RANKING COMPETITOR {}:**\nTitle: {title}\nContent: {content}\n\n",
            i + 1
        );
    }

    prompt.push_str(TASK);
    prompt.push_str(
        "\n\nAt the end of the article, add a \"**References**\" section citing the two competitor articles:\n\n**References:**\n",
    );
    for (i, c) in competitors.iter().take(CITED_COMPETITORS).enumerate() {
        let _ = writeln!(prompt, "{}. [{}]({})", i + 1, c.title, c.url);
    }
    prompt.push_str("\nNow, please provide the enhanced article:");

    prompt
}
