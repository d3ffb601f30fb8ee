//! Prompt and function schema for feature extraction
//!
//! The model is asked to answer with exactly one `save_features` call whose
//! arguments decode as [`Features`](crate::models::Features).

use crate::models::{Application, ProjectAge, TeamSize, UsersCount};
use serde_json::{json, Value};

pub const SAVE_FEATURES_FUNCTION: &str = "save_features";

pub const SHORT_DESCRIPTION_MAX_LEN: usize = 100;
pub const ENHANCED_DESCRIPTION_MAX_LEN: usize = 1000;

pub const SYSTEM_PROMPT: &str = "Carefully analyze project descriptions to accurately extract and save features. \
Focus on the semantic relationships and ensure that tags reflect the project's core functionalities and goals.";

/// Tag vocabulary offered as examples; the model may still emit other tags
pub const TAG_EXAMPLES: &[&str] = &[
    "Has GitHub",
    "Has Twitter",
    "Has Discord",
    "Has funding",
    "VC backed",
    "Has traction",
    "Open source",
    "Non-profit",
    "For-profit",
    "Proven impact",
    "Has community",
    "Has token",
    "Female-led",
    "First time founder",
    "Received previous grant",
    "No previous grant",
    "Has impact metrics",
    "Has images",
    "Has video",
    "Has demo",
    "Has product",
    "Has audit",
    "DAO governed",
    "Has roadmap",
    "dApp",
    "ReFi",
    "Climate",
    "Health",
    "Education",
    "Economic empowerment",
    "Equality",
    "Justice",
    "Infrastructure",
    "Is a community",
    "Arts",
    "Media",
    "Disaster relief",
    "Governance",
    "Sustainability",
    "Conservation",
    "Carbon offsetting",
    "Renewable energy",
    "Environment",
    "Green tech",
    "Financial inclusion",
    "Financial literacy",
    "Financial services",
    "Food tech",
    "NFT",
    "Developer tools",
    "ENS",
    "Layer 2",
    "DeFi",
    "Privacy",
    "Security",
    "Base",
    "Optimism",
    "Arbitrum",
    "AI",
    "LLM",
    "Polygon",
    "Fiat",
    "Wallet",
    "dMRV",
    "Protocol",
];

const TAGGING_RULES: &str = "\
Evaluate and tag the following project data using the 'save_features' function. \
Each feature should be substantiated by a clear and direct relationship in the text:

- CALL the save_features function only ONCE.
- Avoid superficial tagging based solely on keyword presence; ensure each tag is supported by a clear contextual link.
- For ambiguous cases, do not add the tag.
- If a feature is mentioned but does not fundamentally relate to the project's operations or goals, it should not be tagged.
- Tags will be used for users to search for relevant projects, include tags that are likely to be searched for.
- Include tags that are not necessarily keyword based, like 'DAO governed', 'VC backed', 'Non-profit', 'For-profit', 'Has community'.
- Include tags about the people behind the project, like 'Solo founder', 'First time founder', 'Small team'.
- Keep tags short.
- Limit to 5-10 tags.
- Don't use title casing for tags. i.e. 'Climate solutions' not 'Climate Solutions', DAO instead of DAo.
- Example of tagging:
  If a project description mentions a 'wallet,' tag as 'Wallet' only if the description involves wallet functionalities like transactions or storage.
  If a project mentions working with DAOs but does not mention itself being governed by a DAO, do not tag as 'DAO governed'.
  If the amount of users is not explicitly mentioned, do not tag user count.";

/// User message embedding the application's free text
///
/// Only clear-text answers are included; encrypted answers are skipped.
pub fn build_user_message(application: &Application) -> String {
    let project = application.project();

    let answers = application
        .plain_answers()
        .map(|(question, answer)| format!("Q: {}\nA: {}", question, answer))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{rules}\n\n\
         Project Description:\n{description}\n\n\
         Project GitHub: {project_github}\n\
         User GitHub: {user_github}\n\
         Project Twitter: {project_twitter}\n\n\
         Project Answers:\n{answers}\n",
        rules = TAGGING_RULES,
        description = project.description,
        project_github = project.project_github,
        user_github = project.user_github,
        project_twitter = project.project_twitter,
        answers = answers,
    )
}

/// `tools` entry declaring `save_features` with the Features parameter schema
pub fn save_features_tool() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": SAVE_FEATURES_FUNCTION,
            "description": "Extracts and saves key features from project descriptions, emphasizing deep contextual understanding and semantic accuracy.",
            "parameters": {
                "type": "object",
                "properties": {
                    "short_description": {
                        "type": "string",
                        "description": "Short project description",
                        "maxLength": SHORT_DESCRIPTION_MAX_LEN,
                    },
                    "is_dao": {
                        "type": "boolean",
                        "description": "The project is governed by a DAO.",
                    },
                    "enhanced_project_description": {
                        "type": "string",
                        "description": "Enhanced project description, summary of key features and intended impact",
                        "maxLength": ENHANCED_DESCRIPTION_MAX_LEN,
                    },
                    "tags": {
                        "type": "array",
                        "description": "Tags that precisely describe the project.",
                        "items": {
                            "type": "string",
                            "examples": TAG_EXAMPLES,
                        },
                    },
                    "technology_stack": {
                        "type": "array",
                        "description": "Technologies used in the project, e.g. 'Rust', 'EVM', 'Blockchain', 'Optimistic Rollups'",
                        "items": {"type": "string"},
                    },
                    "project_age": {
                        "type": "string",
                        "enum": ProjectAge::LABELS,
                    },
                    "users_count": {
                        "type": "string",
                        "enum": UsersCount::LABELS,
                    },
                    "team_size": {
                        "type": "string",
                        "enum": TeamSize::LABELS,
                    },
                    "regions": {
                        "type": "array",
                        "description": "Regions or countries the project is based in or focused on.",
                        "items": {"type": "string"},
                    },
                },
            },
        },
    })
}
