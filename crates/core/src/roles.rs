//! User roles.
//!
//! Role names must match the `CHECK` constraint on `users.role` in
//! `20260301000001_create_users_and_machines.sql`.

use crate::text_enum::text_enum;

text_enum! {
    /// The single role held by a user.
    pub enum Role {
        /// Reports faults and warnings, confirms repairs.
        Technician => "technician",
        /// Repair personnel who work cases.
        Repair => "repair",
        /// May perform every valid workflow action.
        Manager => "manager",
        /// Read-only access.
        ViewOnly => "view_only",
    }
}

impl Role {
    pub fn is_manager(self) -> bool {
        self == Role::Manager
    }

    /// Roles that take part in maintenance work (everyone except view-only).
    pub fn is_staff(self) -> bool {
        self != Role::ViewOnly
    }
}
