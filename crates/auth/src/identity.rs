use serde::{Deserialize, Serialize};

use encore_core::SubjectId;

use crate::RoleSet;

/// Who the credential says is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: SubjectId,
    pub display_name: String,
    pub roles: RoleSet,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.roles.is_admin()
    }
}
