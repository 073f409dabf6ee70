use crate::validate::{looks_like_email, one_of, require_string};
use floweditor::{Definition, TriggerRegistry};
use serde_json::{json, Value};

pub fn register_triggers(registry: &mut TriggerRegistry) {
    registry.register(
        Definition::new("webhook")
            .with_label("Webhook")
            .with_description("Start the workflow when an HTTP request arrives")
            .with_category("core")
            .with_icon("webhook")
            .with_tags(["http", "api", "request"])
            .with_default("method", "POST")
            .with_default("path", "/webhook")
            .with_validator(|config| {
                one_of(config, "method", &["GET", "POST", "PUT", "PATCH", "DELETE"])?;
                match config.get("path").and_then(Value::as_str) {
                    Some(path) if !path.starts_with('/') => {
                        Err("Path must start with '/'".to_string())
                    }
                    _ => Ok(()),
                }
            }),
    );

    registry.register(
        Definition::new("schedule")
            .with_label("Schedule")
            .with_description("Run on a cron schedule")
            .with_category("core")
            .with_icon("clock")
            .with_tags(["cron", "timer", "interval"])
            .with_default("cron", "0 9 * * *")
            .with_default("timezone", "UTC")
            .with_validator(|config| {
                require_string(config, "cron", "Cron expression")?;
                let fields = config
                    .get("cron")
                    .and_then(Value::as_str)
                    .map(|c| c.split_whitespace().count())
                    .unwrap_or(0);
                if (5..=6).contains(&fields) {
                    Ok(())
                } else {
                    Err("Cron expression must have 5 or 6 fields".to_string())
                }
            }),
    );

    registry.register(
        Definition::new("manual")
            .with_label("Manual")
            .with_description("Start the workflow by hand")
            .with_category("core")
            .with_icon("play")
            .with_tags(["button", "test"]),
    );

    registry.register(
        Definition::new("form_submission")
            .with_label("Form Submission")
            .with_description("Start when the workflow's form is submitted")
            .with_category("forms")
            .with_icon("form")
            .with_tags(["form", "input", "submit"])
            .with_default("formTitle", "New submission")
            .with_default("fields", json!([])),
    );

    registry.register(
        Definition::new("email_received")
            .with_label("Email Received")
            .with_description("Start when a message arrives in a mailbox")
            .with_category("communication")
            .with_icon("inbox")
            .with_tags(["email", "imap", "mail"])
            .with_default("mailbox", "INBOX")
            .with_validator(|config| {
                match config.get("address").and_then(Value::as_str) {
                    Some(address) if !looks_like_email(address) => {
                        Err(format!("'{}' is not a valid email address", address))
                    }
                    _ => Ok(()),
                }
            }),
    );
}
