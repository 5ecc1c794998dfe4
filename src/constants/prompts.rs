use once_cell::sync::Lazy;

use regex::{Captures, Regex};

pub const QUESTION_GENERATION_PROMPT: &str = "You are acting as a Quiz's question generating engine. Your role is, given a knowledge base (hereafter KB), to generate questions based on the content of KB.
The questions CAN ONLY REFER to the content of KB.
The following is the KB that is given to you:
----------------
${knowledge_base}
----------------
Generate ${question_count} questions based on the KB.
Questions should require a bit of elaboration, not just a few words as an answer.
Provide the questions as a JSON object with only one field called questions which will be an array of strings.
Do not provide anything else. Only provide a JSON object. No other text.";

pub const RATING_REASONING_PROMPT: &str = "You are a Quiz engine and you have previously generated some questions based on a knowledge base.
You are going to be provided a question (that you generated) and the user's answer to that question.
You are asked to rate the answer on a scale from 1 to 5, 1 being the lowest score, 5 the highest.
This is the KNOWLEDGE BASE:
----------------
${knowledge_base}
----------------
This is the QUESTION:
----------------
${question}
----------------
This is the user's ANSWER:
----------------
${answer}
----------------
Rate the answer as a float with maximum one decimal number.
You MUST only use the knowledge base to rate the answer.
If some information is provided in the answer and cannot be found in the knowledge base, ignore it and do not mention it in your explanations.

To rate the answer you MUST perform the following steps:
1. List the most important aspects as a short list
2. Check how many of those aspects are covered by the answer
3. Rate the answer
    - if the answer misses half or more main aspects, it should NOT get a rating higher than 2
    - if the answer gets all the important aspects it should get a rating of 5.
    - Minor omissions must be ignored.";

pub const RATING_FORMATTING_PROMPT: &str = "You are a JSON formatter with a brain.
You are being given some text that rates a user answer to a question in the context of a Quiz. In that text there are two VERY IMPORTANT things that I need:
1. A rating, expressed as either an integer or a float with a single decimal (from 1 to 5)
2. An explanation of the rating.
You are asked to extract these two pieces of information and provide them in a JSON format.
This is the text from which you must extract that information:
----------------
${rationale}
----------------

Provide the rating in a JSON format. You must provide at least the following fields:
- rating which will contain the rating value as a float
- explanation which will contain the explanations for the rating, with corrections of what the user got wrong. Be synthetic.

ONLY provide the answer in a JSON format. Do not provide additional text.";

/// Appended when a JSON reply could not be parsed and the stage asks again.
pub const STRICT_JSON_REMINDER: &str = "

IMPORTANT: your previous reply could not be parsed as JSON.
Reply with exactly one JSON object containing the requested fields.
Do not wrap it in markdown code fences and do not add any text before or after it.";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([a-z_]+)\}").expect("PLACEHOLDER is a valid regex pattern")
});

/// Fills `${name}` placeholders in one pass, so substituted text is never
/// scanned for further placeholders. Unknown placeholders are left as is.
pub fn render_prompt(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// The re-prompt text for a stage whose JSON reply was malformed.
pub fn strict_json_prompt(prompt: &str) -> String {
    format!("{}{}", prompt, STRICT_JSON_REMINDER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_replaces_known_placeholders() {
        let rendered = render_prompt(
            "KB: ${knowledge_base} / N: ${question_count}",
            &[("knowledge_base", "Cortes"), ("question_count", "3")],
        );
        assert_eq!(rendered, "KB: Cortes / N: 3");
    }

    #[test]
    fn render_does_not_expand_placeholders_inside_values() {
        let rendered = render_prompt(
            "${question} | ${answer}",
            &[("question", "What is ${answer}?"), ("answer", "1519")],
        );
        assert_eq!(rendered, "What is ${answer}? | 1519");
    }

    #[test]
    fn render_leaves_unknown_placeholders() {
        assert_eq!(render_prompt("${other}", &[]), "${other}");
    }

    #[test]
    fn strict_prompt_extends_the_original() {
        let strict = strict_json_prompt(RATING_FORMATTING_PROMPT);
        assert!(strict.starts_with(RATING_FORMATTING_PROMPT));
        assert!(strict.ends_with(STRICT_JSON_REMINDER));
        assert_ne!(strict, RATING_FORMATTING_PROMPT);
    }

    #[test]
    fn templates_keep_json_contracts() {
        assert!(QUESTION_GENERATION_PROMPT.contains("field called questions"));
        assert!(RATING_FORMATTING_PROMPT.contains("- rating"));
        assert!(RATING_FORMATTING_PROMPT.contains("- explanation"));
        assert!(!RATING_REASONING_PROMPT.contains("JSON"));
    }
}
