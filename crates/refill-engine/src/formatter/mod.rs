use crate::agent::PageSnapshot;
use crate::browser::TabInfo;
use refill_common::CapturedEntry;
use refill_common::protocol::{RecordingStateReply, Reply};

const SENSITIVE_KEYS: [&str; 8] = [
    "password",
    "passwd",
    "secret",
    "token",
    "cvv",
    "ssn",
    "card_number",
    "credit_card",
];

pub fn format_reply(reply: &Reply) -> String {
    match reply {
        Reply::Ack(ack) if ack.ok => match &ack.profile_name {
            Some(name) => format!("OK (profile: {})", name),
            None => "OK".to_string(),
        },
        Reply::Ack(ack) => format!(
            "Failed: {}",
            ack.error.as_deref().unwrap_or("unknown error")
        ),
        Reply::Apply(apply) if !apply.success => "Apply failed".to_string(),
        Reply::Apply(apply) if apply.applied < apply.total => format!(
            "Applied {}/{} fields ({} not found)",
            apply.applied,
            apply.total,
            apply.total - apply.applied
        ),
        Reply::Apply(apply) => format!("Applied {}/{} fields", apply.applied, apply.total),
        Reply::State(state) => format_state(state),
        Reply::Profiles(list) => format_profiles(&list.profiles),
    }
}

pub fn format_state(state: &RecordingStateReply) -> String {
    match (state.recording, &state.profile_name) {
        (true, Some(name)) => format!("Recording into '{}'", name),
        (true, None) => "Recording".to_string(),
        (false, _) => "Not recording".to_string(),
    }
}

pub fn format_profiles(profiles: &[String]) -> String {
    if profiles.is_empty() {
        return "No saved profiles.".to_string();
    }
    let mut output = format!("{} profile(s):", profiles.len());
    for name in profiles {
        output.push_str(&format!("\n- {}", name));
    }
    output
}

pub fn format_entries(name: &str, entries: &[CapturedEntry]) -> String {
    let mut output = format!("Profile '{}': {} entries", name, entries.len());
    for entry in entries {
        output.push_str(&format!("\n[{}] {} {}", entry.timestamp, entry.kind, entry.selector));
        if let Some(label) = &entry.label {
            output.push_str(&format!(" ({})", label));
        }
        if let Some(checked) = entry.checked {
            output.push_str(&format!(" checked={}", checked));
        }
        if let Some(value) = &entry.value {
            let shown = if is_sensitive(entry) { "********" } else { value.as_str() };
            output.push_str(&format!(" = \"{}\"", shown));
        }
        if let Some(text) = &entry.text {
            output.push_str(&format!(" \"{}\"", text));
        }
        if let Some(href) = &entry.href {
            output.push_str(&format!(" -> {}", href));
        }
    }
    output
}

pub fn format_snapshot(snapshot: &PageSnapshot) -> String {
    let mut output = format!("Title: {}\nURL: {}", snapshot.title, snapshot.url);
    output.push_str(match (snapshot.injected, &snapshot.recording) {
        (false, _) => "\nAgent: not injected",
        (true, Some(_)) => "\nAgent: recording",
        (true, None) => "\nAgent: idle",
    });
    if let Some(name) = &snapshot.recording {
        output.push_str(&format!(" ('{}')", name));
    }
    if snapshot.fields.is_empty() {
        output.push_str("\n\nNo form fields.");
        return output;
    }
    output.push_str("\n\nFields:");
    for field in &snapshot.fields {
        output.push_str(&format!("\n- {} [{}]", field.selector, field.kind));
        match field.kind.as_str() {
            "Checkbox" | "Radio" => output.push_str(&format!(" checked={}", field.checked)),
            _ => output.push_str(&format!(" = \"{}\"", field.value)),
        }
    }
    output
}

pub fn format_tabs(tabs: &[TabInfo]) -> String {
    if tabs.is_empty() {
        return "No open tabs.".to_string();
    }
    tabs.iter()
        .map(|t| {
            format!(
                "{} {} {} ({})",
                if t.active { "*" } else { " " },
                t.id,
                t.title,
                t.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Values typed into password-like fields are masked when displayed.
pub fn is_sensitive(entry: &CapturedEntry) -> bool {
    let haystack = format!(
        "{} {}",
        entry.selector.to_lowercase(),
        entry.name.as_deref().unwrap_or_default().to_lowercase()
    );
    SENSITIVE_KEYS.iter().any(|key| haystack.contains(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use refill_common::EntryKind;
    use refill_common::protocol::ApplyReply;

    #[test]
    fn partial_apply_is_called_out() {
        let reply = Reply::Apply(ApplyReply {
            success: true,
            applied: 2,
            total: 3,
        });
        assert_eq!(format_reply(&reply), "Applied 2/3 fields (1 not found)");
    }

    #[test]
    fn password_values_are_masked() {
        let entry = CapturedEntry {
            kind: EntryKind::InputTyping,
            selector: "form>input[name=\"password\"]".into(),
            name: Some("password".into()),
            value: Some("hunter2".into()),
            checked: None,
            label: None,
            text: None,
            href: None,
            page_url: String::new(),
            page_title: String::new(),
            timestamp: 5,
        };
        let out = format_entries("signup", &[entry]);
        assert!(out.contains("********"));
        assert!(!out.contains("hunter2"));
    }
}
