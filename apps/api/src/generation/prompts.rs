// LLM prompt constants for narrative generation.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for the résumé + cover-letter composer.
/// Replace: {verbatim_instruction}, {json_only_instruction}
pub const NARRATIVE_SYSTEM_TEMPLATE: &str = "You are a resume and cover-letter composer with strict guardrails.
{verbatim_instruction}
- Write a headline (roughly 10-16 words) and a cover letter in the provided tone; do not add new factual claims.
- The cover letter should reference 1-2 specific experiences and attribute them to their source role/company (e.g. 'At Acme...', 'As Product Manager...').
- Integrate references naturally into prose (no bullet lists); aim for 300-450 words.
- Optimize for ATS parsing: single column, standard headings, plain bullets.
{json_only_instruction}";

/// User prompt. Replace: {job_description}, {allowed_bullets}, {roles}, {tone_guide}
pub const NARRATIVE_PROMPT_TEMPLATE: &str = r#"JOB_DESCRIPTION:
{job_description}

ALLOWED_BULLETS: (use verbatim text; refer by id in output)
{allowed_bullets}

ROLES (for attribution in the cover letter):
{roles}

GUIDANCE FOR COVER LETTER:
- Quote or closely reference 1-2 ALLOWED_BULLETS and attribute them with their source role/company.
- Weave references into natural prose (no lists); keep length 300-450 words.

TONE_GUIDE (examples):
{tone_guide}

Return a JSON object with this EXACT schema:
{
  "resume": {
    "headline": "10-16 word headline",
    "sections": [
      {
        "title": "Experience",
        "items": [
          {"item_id": "item id if known", "bullet_ids": ["ids from ALLOWED_BULLETS, most compelling first"]}
        ]
      }
    ]
  },
  "cover_letter": {
    "greeting": "Hiring Team",
    "body_paragraphs": ["paragraph one", "paragraph two"],
    "closing": "Sincerely,",
    "signature": "candidate name"
  }
}

HARD RULES:
1. Every entry in `bullet_ids` MUST be an id listed in ALLOWED_BULLETS
2. Do NOT restate bullet text in `resume`; refer to bullets by id only
3. `headline` and `body_paragraphs` must not be empty"#;
