/// Closed classification of an element for capture and replay decisions.
///
/// Derived once from the tag name and `type` attribute so the recorder and
/// replayer match on a variant instead of comparing strings repeatedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    TextInput,
    Checkbox,
    Radio,
    Select,
    TextArea,
    Other,
}

impl ElementKind {
    pub fn classify(tag: &str, input_type: Option<&str>) -> Self {
        match tag {
            "input" => match input_type.map(|t| t.trim().to_ascii_lowercase()).as_deref() {
                Some("checkbox") => ElementKind::Checkbox,
                Some("radio") => ElementKind::Radio,
                _ => ElementKind::TextInput,
            },
            "select" => ElementKind::Select,
            "textarea" => ElementKind::TextArea,
            _ => ElementKind::Other,
        }
    }

    /// input, select or textarea.
    pub fn is_form_control(&self) -> bool {
        !matches!(self, ElementKind::Other)
    }

    pub fn is_toggle(&self) -> bool {
        matches!(self, ElementKind::Checkbox | ElementKind::Radio)
    }

    /// Elements that emit raw `input` events worth capturing while typing.
    pub fn accepts_typing(&self) -> bool {
        matches!(self, ElementKind::TextInput | ElementKind::TextArea)
    }
}
