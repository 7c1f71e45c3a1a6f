named_enum! {
    pub enum AccountRole as "account role" {
        Normal => "normal", "Normal";
        Admin => "admin", "Administrator", "administrator";
        SuperUser => "super_user", "Super user", "superuser";
    }
}

impl AccountRole {
    pub fn is_admin(self) -> bool {
        matches!(self, AccountRole::Admin | AccountRole::SuperUser)
    }

    /// Only `Normal` and `Admin` can be handed out; the super user is seeded once.
    pub fn is_assignable(self) -> bool {
        !matches!(self, AccountRole::SuperUser)
    }
}
