named_enum! {
    pub enum SortKey as "sort key" {
        Name => "name", "Name", "summary";
        CreatedDate => "created_date", "Created date", "created";
        LastUpdated => "last_updated", "Last updated", "updated", "modified";
    }
}

named_enum! {
    pub enum SortOrder as "sort order" {
        Ascending => "ascending", "Ascending", "asc";
        Descending => "descending", "Descending", "desc";
    }
}

named_enum! {
    /// Which timestamp a date-range filter reads.
    pub enum DateField as "date field" {
        Created => "created", "Created", "created_date";
        LastUpdated => "last_updated", "Last updated", "updated", "modified";
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Ascending
    }
}

impl Default for DateField {
    fn default() -> Self {
        DateField::Created
    }
}
