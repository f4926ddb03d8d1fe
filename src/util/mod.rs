//! Small utilities shared across the pipeline.

pub mod exec;

/// Render an argv for logs. Arguments containing whitespace are quoted;
/// everything else is joined verbatim.
pub fn display_command<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| {
            let a = a.as_ref();
            if a.is_empty() || a.chars().any(char::is_whitespace) {
                format!("'{}'", a.replace('\'', "'\"'\"'"))
            } else {
                a.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
