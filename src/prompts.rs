//! Prompts sent to council members, judges, the extractor and the chairman.

use crate::types::{response_label, Response};

/// Labeled block of responses, as shown to judges.
///
/// When `reveal_models` is false only the anonymous labels appear.
pub fn responses_block(responses: &[Response], reveal_models: bool) -> String {
    responses
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if reveal_models {
                format!("{} (from {}):\n{}", response_label(i), r.model_id, r.content)
            } else {
                format!("{}:\n{}", response_label(i), r.content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Asks a judge to rank every response.
pub fn ranking_prompt(question: &str, responses: &[Response]) -> String {
    let mut prompt = format!(
        "You are evaluating multiple responses to this question: \"{}\"\n\n",
        question
    );

    prompt.push_str(&responses_block(responses, false));
    prompt.push_str("\n\nRank ALL responses from best to worst. Be objective.\n\n");

    prompt.push_str("You MUST respond with ONLY valid JSON in this exact format:\n");
    prompt.push_str("{\n");
    prompt.push_str("  \"rankings\": [\"Response X\", \"Response Y\", ...],\n");
    prompt.push_str("  \"confidence\": 0.5 to 1.0,\n");
    prompt.push_str("  \"reasoning\": \"explanation\",\n");
    prompt.push_str(
        "  \"dissent\": null or \"explanation if one response fundamentally differs\"\n",
    );
    prompt.push_str("}\n");

    prompt
}

/// Asks a judge to compare two responses.
pub fn pairwise_prompt(question: &str, response_a: &str, response_b: &str) -> String {
    let mut prompt = format!(
        "Compare these two responses to the question: \"{}\"\n\n",
        question
    );

    prompt.push_str("Response A:\n");
    prompt.push_str(response_a);
    prompt.push_str("\n\nResponse B:\n");
    prompt.push_str(response_b);
    prompt.push_str(
        "\n\nWhich response is better in terms of accuracy, completeness, and clarity?\n\n",
    );

    prompt.push_str("You MUST respond with ONLY valid JSON in this exact format:\n");
    prompt.push_str("{\n");
    prompt.push_str("  \"winner\": \"A\" or \"B\" or \"tie\",\n");
    prompt.push_str("  \"confidence\": 0.5 to 1.0,\n");
    prompt.push_str("  \"reasoning\": \"why you chose this\"\n");
    prompt.push_str("}\n");

    prompt
}

/// Asks the extractor for atomic claims across all responses.
pub fn claim_extraction_prompt(question: &str, responses: &[Response]) -> String {
    let mut prompt = format!(
        "Analyze these responses to the question: \"{}\"\n\n",
        question
    );

    prompt.push_str(&responses_block(responses, true));
    prompt.push_str("\n\nExtract all distinct factual claims made across these responses.\n");
    prompt.push_str("For each claim, note which responses support it and which contradict it.\n\n");

    prompt.push_str("Respond with ONLY valid JSON in this exact format:\n");
    prompt.push_str("{\n");
    prompt.push_str("  \"claims\": [\n");
    prompt.push_str("    {\n");
    prompt.push_str("      \"claim\": \"specific factual statement\",\n");
    prompt.push_str("      \"supporting_models\": [\"Response A\", \"Response B\"],\n");
    prompt.push_str("      \"contradicting_models\": [\"Response C\"],\n");
    prompt.push_str("      \"confidence\": 0.5 to 1.0\n");
    prompt.push_str("    }\n");
    prompt.push_str("  ],\n");
    prompt.push_str("  \"agreement_score\": 0.0 to 1.0,\n");
    prompt.push_str("  \"high_disagreement_claims\": [\"claim text that models disagree on\"]\n");
    prompt.push_str("}\n");

    prompt
}

/// Asks the verifier to check one claim.
pub fn verification_prompt(claim: &str) -> String {
    let mut prompt = format!("Verify this claim: \"{}\"\n\n", claim);

    prompt.push_str("Based on your knowledge, is this claim:\n");
    prompt.push_str("- TRUE: The claim is factually accurate\n");
    prompt.push_str("- FALSE: The claim is factually inaccurate\n");
    prompt.push_str("- CONTESTED: The claim is debatable or depends on context\n");
    prompt.push_str("- UNVERIFIABLE: Cannot be determined without external sources\n\n");

    prompt.push_str("Respond with ONLY valid JSON:\n");
    prompt.push_str("{\n");
    prompt.push_str(
        "  \"status\": \"verified_true\" or \"verified_false\" or \"contested\" or \"unverified\",\n",
    );
    prompt.push_str("  \"explanation\": \"brief explanation\",\n");
    prompt.push_str("  \"source\": \"reference if applicable\"\n");
    prompt.push_str("}\n");

    prompt
}

/// Asks the chairman for the final answer.
///
/// `ranking_summary` is the aggregated ranking, best first, already rendered.
pub fn synthesis_prompt(question: &str, responses: &[Response], ranking_summary: &str) -> String {
    let mut prompt = format!(
        "You are the chairman of a council of models. The council answered this question: \"{}\"\n\n",
        question
    );

    prompt.push_str(&responses_block(responses, true));

    if !ranking_summary.trim().is_empty() {
        prompt.push_str("\n\nPeer ranking of the responses (best first):\n");
        prompt.push_str(ranking_summary);
    }

    prompt.push_str("\n\nWrite a single, accurate final answer to the question. ");
    prompt.push_str("Draw on the strongest responses and resolve disagreements explicitly.\n");

    prompt
}
