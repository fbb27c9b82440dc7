// Cross-cutting prompt fragments. Each caller keeps its own prompts.rs alongside it.

/// Appended to every system prompt whose reply is parsed as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps generated prose from paraphrasing or inventing résumé content.
pub const VERBATIM_INSTRUCTION: &str = "\
    CRITICAL: You may ONLY use work-history bullets provided in ALLOWED_BULLETS, \
    and only by their id. Never rewrite a bullet, never invent an id, and never add \
    factual claims that no allowed bullet supports.";
