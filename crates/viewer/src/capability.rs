use protocol::TransportDescriptor;

/// What the current user may see around the stream. Passed explicitly to
/// whatever builds the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capability {
    #[default]
    Viewer,
    Admin,
}

impl Capability {
    /// Lines to show the user after negotiation.
    ///
    /// The security note is always shown when present: a secure page cannot
    /// open an insecure socket, so every user needs to know why a stream may
    /// not appear. Setup instructions are for admins only.
    pub fn setup_lines<'a>(&self, descriptor: &'a TransportDescriptor) -> Vec<&'a str> {
        let mut lines = Vec::new();
        if *self == Capability::Admin {
            lines.extend(descriptor.instructions.lines());
        }
        if !descriptor.security_note.is_empty() {
            lines.push(descriptor.security_note.as_str());
        }
        lines
    }
}
