named_enum! {
    pub enum Visibility as "visibility" {
        Public => "public", "Public";
        LoggedInOnly => "logged_in_only", "Logged in only", "logged_in", "loggedinonly";
        Restricted => "restricted", "Restricted", "private";
    }
}

named_enum! {
    pub enum ProjectPermission as "permission" {
        Viewer => "viewer", "Viewer";
        Editor => "editor", "Editor";
        Owner => "owner", "Owner";
    }
}

named_enum! {
    /// Project filter on the state of its bugs.
    pub enum OpenBugFilter as "bug filter" {
        All => "all", "All";
        OpenBugsOnly => "open_bugs_only", "Open bugs only", "open";
        NoOpenBugs => "no_open_bugs", "No open bugs", "none", "closed";
    }
}

impl ProjectPermission {
    /// The owner level is implicit to the creator and never granted.
    pub fn is_assignable(self) -> bool {
        !matches!(self, ProjectPermission::Owner)
    }

    pub fn can_contribute(self) -> bool {
        matches!(self, ProjectPermission::Editor | ProjectPermission::Owner)
    }
}

impl OpenBugFilter {
    pub fn accepts(self, open_bugs: usize) -> bool {
        match self {
            OpenBugFilter::All => true,
            OpenBugFilter::OpenBugsOnly => open_bugs > 0,
            OpenBugFilter::NoOpenBugs => open_bugs == 0,
        }
    }
}

impl Default for OpenBugFilter {
    fn default() -> Self {
        OpenBugFilter::All
    }
}
