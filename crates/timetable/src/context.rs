/// Who is operating the client, passed explicitly to timetable views and markers
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Staff,
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "ADMIN",
            Role::Staff => "STAFF",
            Role::Student => "STUDENT",
        };
        f.write_str(s)
    }
}

/// The signed-in user and the department they act for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorContext {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    pub department: String,
}

impl OperatorContext {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        role: Role,
        department: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            role,
            department: department.into(),
        }
    }

    /// Only administrators author timetables.
    pub fn can_author(&self) -> bool {
        self.role == Role::Admin
    }
}
