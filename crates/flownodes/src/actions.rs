use crate::validate::{looks_like_email, number_in_range, one_of, require_string};
use floweditor::{Definition, NodeRegistry};
use serde_json::{json, Value};

const HTTP_METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

pub fn register_actions(registry: &mut NodeRegistry) {
    register_core(registry);
    register_logic(registry);
    register_communication(registry);
    register_data(registry);
    register_ai(registry);
}

fn register_core(registry: &mut NodeRegistry) {
    registry.register(
        Definition::new("http")
            .with_label("HTTP Request")
            .with_description("Call an HTTP endpoint")
            .with_category("core")
            .with_icon("globe")
            .with_tags(["api", "rest", "request", "fetch"])
            .with_default("method", "GET")
            .with_default("url", "")
            .with_default("headers", json!({}))
            .with_default("timeout", 30)
            .with_validator(|config| {
                require_string(config, "url", "URL")?;
                one_of(config, "method", &HTTP_METHODS)?;
                number_in_range(config, "timeout", 1.0, 300.0)
            }),
    );

    registry.register(
        Definition::new("delay")
            .with_label("Delay")
            .with_description("Wait before continuing")
            .with_category("core")
            .with_icon("hourglass")
            .with_tags(["wait", "sleep", "pause"])
            .with_default("duration", 1000)
            .with_validator(|config| {
                number_in_range(config, "duration", 0.0, 86_400_000.0)
            }),
    );

    registry.register(
        Definition::new("code")
            .with_label("Run Code")
            .with_description("Run a JavaScript or Python snippet")
            .with_category("core")
            .with_icon("code")
            .with_tags(["script", "javascript", "python"])
            .with_default("language", "javascript")
            .with_default("code", "return items;")
            .with_validator(|config| {
                one_of(config, "language", &["javascript", "python"])?;
                require_string(config, "code", "Code")
            }),
    );

    registry.register(
        Definition::new("form")
            .with_label("Form")
            .with_description("Collect input through a generated form")
            .with_category("forms")
            .with_icon("form")
            .with_tags(["input", "fields", "survey"])
            .with_default("title", "Form")
            .with_default("submitLabel", "Submit"),
    );
}

fn register_logic(registry: &mut NodeRegistry) {
    registry.register(
        Definition::new("if")
            .with_label("If")
            .with_description("Route items down the true or false branch")
            .with_category("logic")
            .with_icon("git-branch")
            .with_tags(["condition", "branch", "filter"])
            .with_default("condition", "")
            .supports_branches()
            .with_validator(|config| require_string(config, "condition", "Condition")),
    );

    registry.register(
        Definition::new("switch")
            .with_label("Switch")
            .with_description("Route items to the first matching case")
            .with_category("logic")
            .with_icon("shuffle")
            .with_tags(["case", "branch", "router"])
            .with_default("field", "")
            .with_default("cases", json!([]))
            .supports_branches()
            .with_validator(|config| match config.get("cases") {
                None | Some(Value::Array(_)) => Ok(()),
                Some(_) => Err("Cases must be a list".to_string()),
            }),
    );

    registry.register(
        Definition::new("merge")
            .with_label("Merge")
            .with_description("Wait for several inputs and combine them")
            .with_category("logic")
            .with_icon("merge")
            .with_tags(["join", "combine"])
            .with_default("mode", "append")
            .with_validator(|config| one_of(config, "mode", &["append", "combine", "wait"])),
    );
}

fn register_communication(registry: &mut NodeRegistry) {
    registry.register(
        Definition::new("email")
            .with_label("Send Email")
            .with_description("Send an email message")
            .with_category("communication")
            .with_icon("mail")
            .with_tags(["smtp", "mail", "notify"])
            .with_default("to", "")
            .with_default("subject", "")
            .with_default("body", "")
            .with_validator(|config| {
                require_string(config, "to", "Recipient")?;
                let to = config.get("to").and_then(Value::as_str).unwrap_or_default();
                match to.split(',').map(str::trim).find(|a| !looks_like_email(a)) {
                    Some(bad) => Err(format!("'{}' is not a valid email address", bad)),
                    None => Ok(()),
                }
            }),
    );

    registry.register(
        Definition::new("slack")
            .with_label("Slack Message")
            .with_description("Post a message to a Slack channel")
            .with_category("communication")
            .with_icon("message-square")
            .with_tags(["chat", "notify"])
            .with_default("channel", "#general")
            .with_default("text", "")
            .with_validator(|config| require_string(config, "channel", "Channel")),
    );
}

fn register_data(registry: &mut NodeRegistry) {
    registry.register(
        Definition::new("transform")
            .with_label("Transform Data")
            .with_description("Map, rename or compute fields")
            .with_category("data")
            .with_icon("shuffle")
            .with_tags(["map", "json", "set"])
            .with_default("mappings", json!([])),
    );

    registry.register(
        Definition::new("filter")
            .with_label("Filter")
            .with_description("Keep only items matching a condition")
            .with_category("data")
            .with_icon("filter")
            .with_tags(["where", "condition"])
            .with_default("condition", "")
            .with_validator(|config| require_string(config, "condition", "Condition")),
    );

    registry.register(
        Definition::new("database")
            .with_label("Database Query")
            .with_description("Run a query against a database")
            .with_category("data")
            .with_icon("database")
            .with_tags(["sql", "postgres", "mysql"])
            .with_default("operation", "select")
            .with_default("query", "")
            .with_validator(|config| {
                one_of(config, "operation", &["select", "insert", "update", "delete"])?;
                require_string(config, "query", "Query")
            }),
    );
}

fn register_ai(registry: &mut NodeRegistry) {
    registry.register(
        Definition::new("ai_agent")
            .with_label("AI Agent")
            .with_description("Let a language model decide which tools to call")
            .with_category("ai")
            .with_icon("bot")
            .with_tags(["llm", "agent", "tools", "gpt"])
            .with_default("model", "gpt-4o-mini")
            .with_default("prompt", "")
            .with_default("temperature", 0.7)
            .supports_tools()
            .with_validator(|config| number_in_range(config, "temperature", 0.0, 2.0)),
    );

    registry.register(
        Definition::new("ai_text")
            .with_label("Generate Text")
            .with_description("Complete a prompt with a language model")
            .with_category("ai")
            .with_icon("sparkles")
            .with_tags(["llm", "prompt", "completion"])
            .with_default("model", "gpt-4o-mini")
            .with_default("prompt", "")
            .with_validator(|config| require_string(config, "prompt", "Prompt")),
    );
}
