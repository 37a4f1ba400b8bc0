//! The regional-resilience extraction query
//!
//! The instruction is generated from the field table, so the numbered list
//! the model sees always matches the columns the parser maps onto.

use papersift_domain::ExtractionQuery;

/// Research question the fields are extracted for
pub const RESEARCH_QUESTION: &str = "What specific geographical, institutional, and \
infrastructural factors have been empirically or theoretically identified as enhancing \
regional resilience to nuclear winter, large magnitude volcanic eruptions, extreme \
pandemics, and infrastructure collapse catastrophes, and how do these resilience factors \
vary across catastrophe types?";

/// Extracted fields and the guidance given to the model for each
pub const GCR_FIELDS: &[(&str, &str)] = &[
    ("paper_citation", "Full citation (author, year, title)"),
    (
        "publication_type",
        "[Journal article/Preprint/Report/Book chapter]",
    ),
    (
        "gcr_types",
        "Types of catastrophic risks addressed \
         [Nuclear/Volcanic/Asteroid/Infrastructure/Pandemic/Climate/Multiple]",
    ),
    (
        "geographic_focus",
        "[Global/Regional/National/Local/Islands - specify]",
    ),
    (
        "geographic_factors",
        "List key geographic factors (location, climate, resources, etc.)",
    ),
    (
        "institutional_factors",
        "List key institutional factors (governance, policies, social systems, etc.)",
    ),
    (
        "infrastructural_factors",
        "List key infrastructure factors (energy, food, communications, etc.)",
    ),
    (
        "other_resilience_factors",
        "Any resilience factors not fitting above categories",
    ),
    (
        "study_approach",
        "[Model/Empirical/Review/Case study/Theoretical]",
    ),
    (
        "resilience_phase",
        "[Preparedness/Robustness/Recovery/Adaptation]",
    ),
    (
        "main_resilience_factors",
        "Brief summary of main resilience-enhancing factors",
    ),
    (
        "resilience_tradeoffs",
        "[Yes/No] with description of any identified trade-offs",
    ),
    (
        "vulnerable_resilient_regions",
        "List of particularly vulnerable or resilient regions identified",
    ),
    (
        "overall_relevance",
        "[Low/Medium/High] relevance to our research question",
    ),
    (
        "evidence_gaps",
        "Brief description of critical missing validation elements",
    ),
];

const FORMAT_REQUIREMENTS: &str = r#"CRITICAL CSV FORMATTING REQUIREMENTS:

- Wrap ALL text fields in double quotes, even if they don't contain commas
- If a text field contains double quotes, escape them by doubling them ("")
- Use commas ONLY as field separators between fields
- Each field must be enclosed in double quotes: "field content"

Example format: "text field 1","text field 2","text field 3"

For fields with multiple options, use the exact values specified in brackets. Please analyze the paper thoroughly before extracting the information.
Respond with ONLY the CSV row (no column headers, no additional text)."#;

/// Names of the extracted fields, in column order
pub fn gcr_field_names() -> impl Iterator<Item = &'static str> {
    GCR_FIELDS.iter().map(|(name, _)| *name)
}

/// Render the full instruction for the resilience fields
pub fn gcr_instruction() -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "I need you to analyze the provided research paper and extract specific \
         information about regional resilience to catastrophic risks. ",
    );
    prompt.push_str(&format!(
        "Our research question is: \"{}\"\n\n",
        RESEARCH_QUESTION
    ));

    prompt.push_str(
        "After analyzing the paper thoroughly, provide your output in a single row \
         CSV format with the following structure:\n\n",
    );
    for (idx, (name, guidance)) in GCR_FIELDS.iter().enumerate() {
        prompt.push_str(&format!("{}. {}: {}\n", idx + 1, name, guidance));
    }
    prompt.push('\n');

    prompt.push_str(FORMAT_REQUIREMENTS);
    prompt.push_str(&format!(
        "\nThe entire row should look like: \"field1\",\"field2\",\"field3\",...,\"field{}\"",
        GCR_FIELDS.len()
    ));
    prompt
}

/// The default query: resilience instruction plus its 15 fields
pub fn default_query() -> ExtractionQuery {
    ExtractionQuery::new(gcr_instruction(), gcr_field_names())
}
