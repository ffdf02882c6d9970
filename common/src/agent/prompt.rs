/// name the assistant answers under
pub const PERSONA: &str = "Samvada";

/// marker the classifier uses when the question needs the database
pub const NEEDS_DATABASE_TAG: &str = "CANNOT_ANSWER";

/// marker the classifier uses for small talk
pub const CONVERSATIONAL_TAG: &str = "CONVERSATIONAL";

/// numeric codes stored in the enumerated columns
pub const ENUM_MAPPINGS: &[(&str, &[(u8, &str)])] = &[
    ("CATEGORY_ID", &[(1, "Part"), (2, "BOM")]),
    ("SO_TYPE_ID", &[(1, "confirm"), (2, "trend"), (3, "forecast")]),
    (
        "STATUS_ID",
        &[
            (1, "open"),
            (5, "on hold"),
            (6, "cancelled"),
            (7, "close"),
            (8, "on hold auto close"),
            (9, "auto close"),
        ],
    ),
    (
        "STAGE_STATUS_ID",
        &[(1, "open"), (2, "assigned"), (3, "delivered"), (4, "partial")],
    ),
];

/// filters applied unless the user asks otherwise
pub const DEFAULT_FILTERS: &[(&str, &str)] = &[
    ("STAGE_STATUS_ID = 3", "delivered"),
    ("SO_TYPE_ID = 1", "confirmed"),
];

pub fn render_enum_mappings() -> String {
    let mut lines = Vec::new();
    for (column, values) in ENUM_MAPPINGS {
        lines.push(format!("- {}:", column));
        for (code, label) in values.iter() {
            lines.push(format!("    {} = '{}'", code, label));
        }
    }
    lines.join("\n")
}

fn render_default_filters() -> String {
    DEFAULT_FILTERS
        .iter()
        .map(|(filter, label)| format!("    - only orders where `{}` ({})", filter, label))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_classification_prompt(history: &str) -> String {
    format!(
        "You are {persona}, a conversational assistant in front of a SQL question-answering agent.\n\
         Classify the latest human message in the conversation below:\n\
         1. General small talk (greetings, thanks, goodbyes): reply with {conv}: followed by a short friendly reply \
         that introduces you as a database assistant.\n\
         2. Needs a database lookup to answer: reply with exactly {cannot}\n\
         3. Answerable from the conversation so far or from common knowledge alone: answer it directly.\n\n\
         Rules:\n\
         - Do not assume anything that is not in the history.\n\
         - Never invent database facts.\n\
         - If your answer would be that you do not know or have no access, reply with {cannot} instead.\n\n\
         Conversation history:\n{history}\n\n\
         Now respond.",
        persona = PERSONA,
        conv = CONVERSATIONAL_TAG,
        cannot = NEEDS_DATABASE_TAG,
        history = history
    )
}

pub fn build_context_extraction_prompt(history: &str) -> String {
    format!(
        "From the conversation below, extract only the minimal context needed to understand and \
         answer the most recent human question.\n\n\
         {}\n\n\
         Respond with the relevant context only.",
        history
    )
}

pub fn build_clarification_prompt(
    history: &str,
    current_time: &str,
    user_input: &str,
) -> String {
    format!(
        "Rewrite the user's question so it is unambiguous and can be understood without the conversation.\n\
         Use the history to fill in anything the question refers to.\n\
         Replace relative time expressions such as 'today' or 'this month' with concrete dates \
         computed from the current time, and only mention time if the question needs it.\n\n\
         History:\n{history}\n\n\
         Current time: {current_time}\n\n\
         Original question: {user_input}\n\n\
         The original question is the last human message in the history.\n\
         Respond with the rewritten question only.",
        history = history,
        current_time = current_time,
        user_input = user_input
    )
}

pub fn build_sql_prompt(
    clarified_query: &str,
    conversational_context: &str,
    schema_context: &str,
) -> String {
    format!(
        "You are an expert SQL generator.\n\n\
         Write a SQL query that answers this question:\n---\n{query}\n---\n\n\
         Conversational context:\n---\n{context}\n---\n\n\
         Schema and sample rows:\n---\n{schema}\n---\n\n\
         States such as open or closed are stored as numeric codes. Enumerated columns:\n\
         {mappings}\n\n\
         Always translate labels through these mappings.\n\
         IMPORTANT: unless the user explicitly says otherwise, apply these filters:\n\
         {filters}\n\n\
         Once the query is ready, call the `execute_query` tool to run it.\n\
         When you have the answer, call the `save_result` tool with it.",
        query = clarified_query,
        context = conversational_context,
        schema = schema_context,
        mappings = render_enum_mappings(),
        filters = render_default_filters()
    )
}

pub fn build_response_prompt(user_input: &str, working: &str) -> String {
    format!(
        "You are {persona}, a friendly database assistant. Below is the user's original question and \
         the working of the agent that found the answer.\n\
         Answer the original question conversationally, using the result in the working.\n\
         If asked who you are, say you are {persona}, a database assistant.\n\n\
         Original question: {user_input}\n\n\
         Agent working:\n{working}",
        persona = PERSONA,
        user_input = user_input,
        working = working
    )
}

/// reply used when the classifier returns a bare conversational tag
pub fn default_greeting() -> String {
    format!(
        "Hello, I am {}, a database assistant. How can I help you with your data?",
        PERSONA
    )
}
