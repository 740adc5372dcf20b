// All prompt string constants for the analysis and apply paths.
// Placeholders are literal tokens replaced once by the builder — no escaping,
// no recursive substitution.

/// System prompt for the v1 template family — plain strict-JSON instruction.
pub const SYSTEM_JSON_STRICT: &str = "You are a precise resume analyst. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object.";

/// System prompt for the v2 template family — stricter contract.
pub const SYSTEM_JSON_STRICT_V2: &str = "You are a precise resume analyst. \
    You MUST respond with a single valid JSON object and nothing else. \
    Do NOT use markdown code fences. \
    NEVER omit a required key — use an empty string or empty array instead. \
    Do NOT include explanations or apologies.";

/// System prompt for the repair pass — asks for a JSON-only rewrite of a
/// previous malformed response.
pub const REPAIR_SYSTEM: &str = "You are a JSON repair assistant. \
    The previous response was not valid JSON. \
    Rewrite it as a single valid JSON object preserving all information. \
    Respond with the corrected JSON only — no commentary, no code fences.";

/// User prompt for the repair pass. Replace `{previous_raw}`.
pub const REPAIR_USER_TEMPLATE: &str = r#"Your previous response was not valid JSON. Here it is verbatim:

{previous_raw}

Return the same content as ONE valid JSON object matching the schema above. Output the JSON object only."#;

/// User prompt for the analyze path.
/// Replace `{resume_text}`, `{job_description}`, `{target_role}`.
/// A missing job description or role hint renders as "N/A".
pub const ANALYZE_USER_TEMPLATE: &str = r#"RESUME TEXT:
{resume_text}

JOB DESCRIPTION (or "N/A" if none was provided):
{job_description}

TARGET ROLE HINT (or "N/A"):
{target_role}

Analyze the resume per the schema in the instructions and return the JSON object."#;

// Every developer schema prompt opens with the same preamble. The
// `{schema_version}` token is always the tag the caller *requested*, even
// when an unknown tag fell back to the default template.

/// v1 developer schema prompt.
pub const DEVELOPER_V1: &str = r#"You are performing resume analysis, schema version {schema_version}, running on model {target_model}.
A job description was provided: {has_job_description}.
Score ats_score 0-100. Severity must be one of: "low", "medium", "high", "critical".

Return a JSON object with EXACTLY these keys:
{
  "summary": "two-sentence overview of the resume",
  "ats_score": 74,
  "issues": [{"severity": "high", "message": "No dates on most recent role"}],
  "bullet_rewrites": [{"original": "worked on backend", "improved": "Built order-routing backend handling 2k rps"}],
  "missing_information": ["Graduation year"],
  "action_plan": ["Add dates to every role"]
}"#;

/// v2 developer schema prompt — adds `assessment` and per-issue `section`.
pub const DEVELOPER_V2: &str = r#"You are performing resume analysis, schema version {schema_version}, running on model {target_model}.
A job description was provided: {has_job_description}.
Score ats_score 0-100. Severity must be one of: "low", "medium", "high", "critical".

Return a JSON object with EXACTLY these keys:
{
  "summary": "two-sentence overview of the resume",
  "ats_score": 74,
  "assessment": "narrative fit assessment; may be empty",
  "issues": [{"severity": "high", "message": "No dates on most recent role", "section": "experience"}],
  "bullet_rewrites": [{"original": "worked on backend", "improved": "Built order-routing backend handling 2k rps"}],
  "missing_information": ["Graduation year"],
  "action_plan": ["Add dates to every role"]
}"#;

/// v2_1 developer schema prompt — assessment becomes mandatory content.
pub const DEVELOPER_V2_1: &str = r#"You are performing resume analysis, schema version {schema_version}, running on model {target_model}.
A job description was provided: {has_job_description}.
Score ats_score 0-100. Severity must be one of: "low", "medium", "high", "critical".

Return a JSON object with EXACTLY these keys:
{
  "summary": "two-sentence overview of the resume",
  "ats_score": 74,
  "assessment": "REQUIRED non-empty narrative fit assessment",
  "issues": [{"severity": "high", "message": "No dates on most recent role", "section": "experience"}],
  "bullet_rewrites": [{"original": "worked on backend", "improved": "Built order-routing backend handling 2k rps"}],
  "missing_information": ["Graduation year"],
  "action_plan": ["Add dates to every role"]
}
The "assessment" field MUST contain at least one full sentence."#;

/// v2_2 developer schema prompt — adds keyword coverage.
pub const DEVELOPER_V2_2: &str = r#"You are performing resume analysis, schema version {schema_version}, running on model {target_model}.
A job description was provided: {has_job_description}.
Score ats_score 0-100. Severity must be one of: "low", "medium", "high", "critical".

Return a JSON object with EXACTLY these keys:
{
  "summary": "two-sentence overview of the resume",
  "ats_score": 74,
  "assessment": "REQUIRED non-empty narrative fit assessment",
  "issues": [{"severity": "high", "message": "No dates on most recent role", "section": "experience"}],
  "bullet_rewrites": [{"original": "worked on backend", "improved": "Built order-routing backend handling 2k rps"}],
  "missing_information": ["Graduation year"],
  "action_plan": ["Add dates to every role"],
  "keyword_analysis": {"matched": ["Rust", "Kubernetes"], "missing": ["Terraform"]}
}
"keyword_analysis" is REQUIRED. When no job description was provided, return empty arrays."#;

/// v2_3 developer schema prompt — adds per-section scores.
pub const DEVELOPER_V2_3: &str = r#"You are performing resume analysis, schema version {schema_version}, running on model {target_model}.
A job description was provided: {has_job_description}.
Score ats_score 0-100. Severity must be one of: "low", "medium", "high", "critical".

Return a JSON object with EXACTLY these keys:
{
  "summary": "two-sentence overview of the resume",
  "ats_score": 74,
  "assessment": "REQUIRED non-empty narrative fit assessment",
  "issues": [{"severity": "high", "message": "No dates on most recent role", "section": "experience"}],
  "bullet_rewrites": [{"original": "worked on backend", "improved": "Built order-routing backend handling 2k rps"}],
  "missing_information": ["Graduation year"],
  "action_plan": ["Add dates to every role"],
  "keyword_analysis": {"matched": ["Rust", "Kubernetes"], "missing": ["Terraform"]},
  "section_scores": {"experience": 80, "skills": 65, "education": 90}
}
"keyword_analysis" and "section_scores" are REQUIRED. Every section score is an integer 0-100."#;

/// System prompt for the apply (resume regeneration) path.
pub const APPLY_SYSTEM: &str = "You are an expert resume writer. \
    Rewrite the candidate's resume applying the prior analysis feedback. \
    You MUST respond with a single valid JSON object matching the requested shape. \
    Do NOT use markdown code fences. \
    Do NOT invent facts not present in the source resume.";

/// Apply prompt. Replace `{resume_text}` and `{analysis_json}`.
pub const APPLY_PROMPT_TEMPLATE: &str = r#"Rewrite the resume below, applying every actionable item from the prior analysis.

HARD RULES:
1. header.name is REQUIRED and must come from the source resume
2. "summary" is an array of at most 4 lines
3. Every experience entry has at most 5 "highlights" bullets
4. Use ONLY facts present in the source resume — no invention
5. Omit a list entirely rather than returning null

Return a JSON object with this shape:
{
  "header": {"name": "...", "title": "...", "email": "...", "phone": "...", "location": "...", "links": [{"label": "GitHub", "url": "..."}]},
  "summary": ["line 1", "line 2"],
  "skills": {"Languages": ["Rust", "Go"]},
  "experience": [{"company": "...", "role": "...", "start": "2021", "end": "present", "highlights": ["..."]}],
  "projects": [{"name": "...", "description": "...", "tech": ["..."]}],
  "education": [{"institution": "...", "degree": "...", "year": "..."}],
  "achievements": ["..."],
  "certifications": ["..."]
}

PRIOR ANALYSIS (JSON):
{analysis_json}

SOURCE RESUME TEXT:
{resume_text}"#;
