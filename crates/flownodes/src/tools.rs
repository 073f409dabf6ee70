use crate::validate::require_string;
use floweditor::{Definition, ToolRegistry};

pub fn register_tools(registry: &mut ToolRegistry) {
    registry.register(
        Definition::new("web_search")
            .with_label("Web Search")
            .with_description("Search the web and return the top results")
            .with_category("ai")
            .with_icon("search")
            .with_tags(["search", "browse"])
            .with_default("maxResults", 5),
    );

    registry.register(
        Definition::new("http_tool")
            .with_label("HTTP Tool")
            .with_description("Let the agent call a fixed endpoint")
            .with_category("ai")
            .with_icon("globe")
            .with_tags(["api", "request"])
            .with_default("url", "")
            .with_validator(|config| require_string(config, "url", "URL")),
    );

    registry.register(
        Definition::new("calculator")
            .with_label("Calculator")
            .with_description("Evaluate arithmetic expressions")
            .with_category("ai")
            .with_icon("calculator")
            .with_tags(["math"]),
    );

    registry.register(
        Definition::new("code_interpreter")
            .with_label("Code Interpreter")
            .with_description("Run generated Python in a sandbox")
            .with_category("ai")
            .with_icon("terminal")
            .with_tags(["python", "sandbox"])
            .with_default("timeout", 30),
    );
}
