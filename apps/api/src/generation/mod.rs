// Package generation: JD cleanup, narrative collaborator, selection enforcement,
// section assembly and the HTTP handlers that drive them.
// All LLM calls go through llm_client; no direct Anthropic API calls here.

pub mod assembly;
pub mod enforcer;
pub mod generator;
pub mod handlers;
pub mod jd_parser;
pub mod narrative;
pub mod prompts;
pub mod tone;
