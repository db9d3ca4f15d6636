//! Prompt contract for lesson-plan generation.
//!
//! The section structure is requested from the model, never validated.
use std::fmt::Write;

use super::LessonRequest;

pub const SYSTEM_PROMPT: &str = "You are an experienced university lecturer and instructional \
designer. You plan lessons using constructive alignment, backward design, Bloom's revised \
taxonomy and Gagné's Nine Events of Instruction. Your plans are student-centred, inclusive and \
ready to paste into a learning management system. You may add widely accepted disciplinary \
knowledge that is not in the supplied documents when it clearly improves learning.";

/// Build the user message: retrieved context, lesson parameters and the
/// required Markdown section structure.
#[must_use]
pub fn lesson_prompt(request: &LessonRequest, context: &str) -> String {
    let mut prompt = String::new();
    let context = if context.trim().is_empty() {
        "(no course documents were retrieved)"
    } else {
        context
    };

    let _ = writeln!(prompt, "### Context\n{context}\n");
    let _ = writeln!(prompt, "### Lesson Parameters");
    let _ = writeln!(prompt, "- **Course / Unit**: {}", request.course_title.trim());
    let _ = writeln!(prompt, "- **Academic level**: {}", request.level);
    let _ = writeln!(prompt, "- **Preset type**: {}", request.preset);
    let _ = writeln!(prompt, "- **Lesson length**: {} minutes", request.lesson_minutes);
    let _ = writeln!(prompt, "- **Include group work?** {}", yes_no(request.group_work));
    let _ = writeln!(prompt, "- **Include quiz?** {}\n", yes_no(request.include_quiz));

    let _ = writeln!(
        prompt,
        "### Your task\nUsing the context above and your own expertise, write a Markdown lesson \
         plan with exactly the following sections, in this order.\n"
    );

    let mut n = 0;
    let mut section = |prompt: &mut String, title: &str, body: &str| {
        n += 1;
        let _ = writeln!(prompt, "## {n} {title}\n{body}\n");
    };

    section(
        &mut prompt,
        "Overview",
        "At most 120 words linking prior knowledge, real-world relevance and where this \
         lesson fits in the unit.",
    );
    section(
        &mut prompt,
        "Intended Learning Outcomes",
        "3 to 6 bullet points, each specific and measurable within this lesson and ending with \
         a Bloom level in italics (Remember, Understand, Apply, Analyse, Evaluate, Create).",
    );
    section(
        &mut prompt,
        "Session Structure",
        &format!(
            "A Markdown table with columns `Start - End | Phase | Gagné Event | Learning \
             Activity | Resources`. Major phases in bold. Timings must add up to exactly {} \
             minutes.",
            request.lesson_minutes
        ),
    );
    if request.group_work {
        section(
            &mut prompt,
            "Group-Work Activity",
            "A short description of what students produce and why it matters, numbered \
             instructions with roles, deliverables and timing, and a rubric table \
             `Criteria | Excellent | Good | Fair | Poor`.",
        );
    }
    if request.include_quiz {
        section(
            &mut prompt,
            "MCQ Quiz",
            "Exactly 10 multiple-choice questions, each headed `### Q<n>` with options A to D \
             and a final line `**Answer: <letter>**`. Prefer higher-order questions with \
             plausible distractors.",
        );
    }
    section(
        &mut prompt,
        "Constructive Alignment Check",
        "One paragraph judging how well outcomes, activities and assessment fit together. \
         If they do not, start the paragraph with ⚠️ and name the section to revise.",
    );

    let _ = writeln!(
        prompt,
        "Address students in the second person plural, explain technical terms, and output \
         GitHub-flavoured Markdown only, with no HTML."
    );
    prompt
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}
