//! Prompt templates for planning, research and synthesis calls
//!
//! Templates carry `{placeholder}` markers filled by the helper functions;
//! literal JSON braces in the format sections are left untouched.

/// Plan-stage query writer: queries that inform the section structure.
pub const PLAN_QUERY_WRITER: &str = r#"You are assisting with research for an upcoming report.

<Report Topic>
{topic}
</Report Topic>

<Report Structure>
{report_organization}
</Report Structure>

<Task>
Your objective is to generate {number_of_queries} targeted web search queries to support the development of this report.

Each query should:
1. Be clearly related to the report topic.
2. Directly support one or more sections in the report structure.
3. Be specific and well-phrased to return high-quality, relevant information.
4. Cover a broad enough scope to ensure comprehensive research across the entire report.

Aim for a mix of foundational context, recent developments, statistics, case studies, expert insights, and practical examples relevant to the topic and structure.
</Task>

<Format>
Respond with a JSON object of the form {"queries": [{"query": "..."}]}.
</Format>"#;

/// Report planner: produce the ordered section list.
pub const REPORT_PLANNER: &str = r#"You are creating a clear, concise plan for a report.

<Report Topic>
The topic of the report is:
{topic}
</Report Topic>

<Report Structure>
The report should follow this organization:
{report_organization}
</Report Structure>

<Context>
Use the following background to inform your section planning:
{context}
</Context>

<Task>
Generate a list of well-structured report sections. The structure should be tight, purposeful, and free of redundancy or filler.

Each section must include the following fields:
- name: A concise name for this section, unique within the report.
- description: A brief summary of the core focus of this section.
- research: Whether web research is needed to support this section.
- content: Leave this field blank for now.

Guidelines:
- Keep each section distinct with no overlap in content.
- Avoid filler sections or vague groupings.
- Combine related ideas when appropriate instead of splitting them across multiple sections.
- Embed examples, case studies, and implementation details inside relevant sections (not in separate ones).
- Ensure the structure follows a logical narrative or analytical flow.

Review the entire plan before submitting to confirm it is focused, efficient, and logically ordered.
</Task>

<Feedback>
Here is feedback on the report structure from a previous review (if any):
{feedback}
</Feedback>

<Format>
Respond with a JSON object of the form {"sections": [{"name": "...", "description": "...", "research": true, "content": ""}]}.
</Format>"#;

/// Section-stage query writer: queries for one section's research pass.
pub const SECTION_QUERY_WRITER: &str = r#"You are an expert technical writer developing targeted web search queries to support a specific section of a technical report.

<Report Topic>
{topic}
</Report Topic>

<Section Topic>
{section_topic}
</Section Topic>

<Task>
Your goal is to create {number_of_queries} web search queries to support research for the above section.

Each query should:
1. Be directly related to the section topic.
2. Explore different angles or subtopics to ensure broad coverage.
3. Be clearly worded and specific enough to return high-quality, relevant information.

The goal is to gather credible sources, expert insights, statistics, use cases, comparisons, or technical implementation details relevant to the section.

Avoid overly broad or vague queries - focus on actionable research prompts.
</Task>

<Format>
Respond with a JSON object of the form {"queries": [{"query": "..."}]}.
</Format>"#;

/// Section writer: draft one research-backed section from the source digest.
pub const SECTION_WRITER: &str = r#"You are an expert technical writer crafting one section of a research report.

<Report Topic>
{topic}
</Report Topic>

<Section Name>
{section_name}
</Section Name>

<Section Topic>
{section_topic}
</Section Topic>

<Existing Section Content (if populated)>
{section_content}
</Existing Section Content (if populated)>

<Source Material>
{context}
</Source Material>

<Task>
Write the report section grounded in the source material.

1. Length: 150-200 words.
2. Start with a `## {section_name}` Markdown heading.
3. Use simple, clear language and short paragraphs (2-3 sentences each).
4. End with a `### Sources` list citing each source as `[n] Title: URL`.
5. Number citations sequentially starting at 1 with no gaps, one number per unique URL cited in the body.
6. If existing section content is present, improve on it using the new source material rather than starting over.
</Task>

<Format>
Respond with the section content in Markdown. Do not wrap it in JSON.
</Format>"#;

/// Section grader: judge a draft against its section topic.
pub const SECTION_GRADER: &str = r#"You are grading one section of a research report against the topic it was meant to cover.

<Report Topic>
{topic}
</Report Topic>

<Section Topic>
{section_topic}
</Section Topic>

<Section Content>
{section}
</Section Content>

<Task>
Evaluate whether the section content adequately addresses the section topic: technically accurate, specific, and grounded in its cited sources.

If the section fails, generate {number_of_queries} follow-up search queries targeting exactly the missing or weak information. If it passes, return an empty query list.
</Task>

<Format>
Respond with a JSON object of the form {"grade": "pass", "follow_up_queries": []} or {"grade": "fail", "follow_up_queries": [{"query": "..."}]}.
</Format>"#;

/// Synthesis-section writer: introductions and conclusions drawn from the
/// completed research sections.
pub const FINAL_SECTION_WRITER: &str = r#"You are an expert technical writer crafting a section that synthesizes information from the rest of the report.

<Report Topic>
{topic}
</Report Topic>

<Section Name>
{section_name}
</Section Name>

<Section Topic>
{section_topic}
</Section Topic>

<Available Report Content>
{context}
</Available Report Content>

<Task>
1. Section-specific approach:

For an introduction:
- Use `#` for the report title (Markdown format).
- 50-100 word limit.
- Write in simple and clear language.
- Focus on the core motivation for the report in 1-2 paragraphs.
- No structural elements (no lists or tables).
- No sources section.

For a conclusion or summary:
- Use `##` for the section heading (Markdown format).
- 100-150 word limit.
- Include at most one structural element - a short list or a small table - that distills the main body sections.
- End with specific next steps or implications.
- No sources section.

2. Writing approach:
- Use concrete details over general statements.
- Make every word count.
</Task>

<Format>
Respond with the section content in Markdown. Do not wrap it in JSON.
</Format>"#;

// Short user-role task statements paired with the instruction templates.
pub const GENERATE_QUERIES_TASK: &str =
    "Generate the search queries based on the provided topic and instructions.";
pub const GENERATE_SECTIONS_TASK: &str =
    "Generate the report sections based on the provided instructions.";
pub const WRITE_SECTION_TASK: &str =
    "Write the report section based on the provided source material.";
pub const GRADE_SECTION_TASK: &str =
    "Grade the report section and suggest follow-up queries if it falls short.";

pub fn plan_query_writer_instructions(
    topic: &str,
    report_organization: &str,
    number_of_queries: usize,
) -> String {
    PLAN_QUERY_WRITER
        .replace("{topic}", topic)
        .replace("{report_organization}", report_organization)
        .replace("{number_of_queries}", &number_of_queries.to_string())
}

pub fn report_planner_instructions(
    topic: &str,
    report_organization: &str,
    context: &str,
    feedback: &str,
) -> String {
    REPORT_PLANNER
        .replace("{topic}", topic)
        .replace("{report_organization}", report_organization)
        .replace("{context}", context)
        .replace("{feedback}", feedback)
}

pub fn section_query_writer_instructions(
    topic: &str,
    section_topic: &str,
    number_of_queries: usize,
) -> String {
    SECTION_QUERY_WRITER
        .replace("{topic}", topic)
        .replace("{section_topic}", section_topic)
        .replace("{number_of_queries}", &number_of_queries.to_string())
}

pub fn section_writer_instructions(
    topic: &str,
    section_name: &str,
    section_topic: &str,
    section_content: &str,
    context: &str,
) -> String {
    SECTION_WRITER
        .replace("{topic}", topic)
        .replace("{section_name}", section_name)
        .replace("{section_topic}", section_topic)
        .replace("{section_content}", section_content)
        .replace("{context}", context)
}

pub fn section_grader_instructions(
    topic: &str,
    section_topic: &str,
    section: &str,
    number_of_queries: usize,
) -> String {
    SECTION_GRADER
        .replace("{topic}", topic)
        .replace("{section_topic}", section_topic)
        .replace("{section}", section)
        .replace("{number_of_queries}", &number_of_queries.to_string())
}

pub fn final_section_writer_instructions(
    topic: &str,
    section_name: &str,
    section_topic: &str,
    context: &str,
) -> String {
    FINAL_SECTION_WRITER
        .replace("{topic}", topic)
        .replace("{section_name}", section_name)
        .replace("{section_topic}", section_topic)
        .replace("{context}", context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_filled_and_json_braces_survive() {
        let filled = plan_query_writer_instructions("rust web frameworks", "intro/body/conclusion", 3);
        assert!(filled.contains("rust web frameworks"));
        assert!(filled.contains("generate 3 targeted web search queries"));
        assert!(!filled.contains("{topic}"));
        // The JSON example in the format block must survive substitution
        assert!(filled.contains(r#"{"queries": [{"query": "..."}]}"#));
    }
}
