//! Scripted events replayed against the router.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use vidar::InvocationData;

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScriptEvent {
    Invoke(InvocationData),
    Autocomplete {
        #[serde(flatten)]
        data: InvocationData,
        focused: String,
        #[serde(default)]
        query: String,
    },
}

impl ScriptEvent {
    pub fn data(&self) -> &InvocationData {
        match self {
            Self::Invoke(data) | Self::Autocomplete { data, .. } => data,
        }
    }

    /// Short label used to prefix output, e.g. `subc set`.
    pub fn label(&self, index: usize) -> String {
        let data = self.data();
        let path = data.path().to_string();
        if path.is_empty() {
            format!("#{index} /{}", data.command)
        } else {
            format!("#{index} /{} {path}", data.command)
        }
    }
}

/// Read a JSON array of events.
pub fn load_script(path: &Path) -> Result<Vec<ScriptEvent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid script {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vidar::OptionValue;

    #[test]
    fn parses_both_event_kinds() {
        let events: Vec<ScriptEvent> = serde_json::from_str(
            r#"[
                {"kind": "invoke", "command": "subc", "subcommand": "set",
                 "options": {"color": "red"}},
                {"kind": "autocomplete", "command": "hero", "focused": "name", "query": "s"}
            ]"#,
        )
        .unwrap();

        match &events[0] {
            ScriptEvent::Invoke(data) => {
                assert_eq!(
                    data.options.get("color"),
                    Some(&OptionValue::String("red".into()))
                );
            }
            other => panic!("expected invoke, got {other:?}"),
        }
        assert_eq!(events[0].label(1), "#1 /subc set");
        match &events[1] {
            ScriptEvent::Autocomplete { data, focused, query } => {
                assert_eq!(data.command, "hero");
                assert_eq!(focused, "name");
                assert_eq!(query, "s");
            }
            other => panic!("expected autocomplete, got {other:?}"),
        }
        assert_eq!(events[1].label(2), "#2 /hero");
    }

    #[test]
    fn missing_script_is_an_error() {
        let err = load_script(Path::new("/nonexistent/script.json")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read script"));
    }
}
