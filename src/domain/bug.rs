named_enum! {
    pub enum Severity as "severity" {
        Low => "low", "Low";
        Medium => "medium", "Medium", "med";
        High => "high", "High";
    }
}

named_enum! {
    pub enum Status as "status" {
        Open => "open", "Open";
        Closed => "closed", "Closed";
    }
}

impl Status {
    pub fn toggled(self) -> Status {
        match self {
            Status::Open => Status::Closed,
            Status::Closed => Status::Open,
        }
    }

    /// Text of the audit comment recorded when a bug moves into this status.
    pub fn audit_text(self) -> &'static str {
        match self {
            Status::Open => "Reopened the bug.",
            Status::Closed => "Closed the bug.",
        }
    }
}

impl Severity {
    pub fn audit_text(self) -> String {
        format!("Changed bug severity to {}", self.label())
    }
}

pub const OPENED_AUDIT_TEXT: &str = "Opened the bug.";
