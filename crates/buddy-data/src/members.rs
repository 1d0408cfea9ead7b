use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error as ThisError;

use crate::Credential;

pub type MemberId = String;

/// Engagement of a member with the club. Independent
/// of the approval state.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash,
    Serialize, Deserialize, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Attendance {
    #[default]
    Attending,
    Absent,
    Graduate,
}

impl fmt::Display for Attendance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attendance::Attending => "attending",
            Attendance::Absent => "absent",
            Attendance::Graduate => "graduate",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Attendance {
    type Err = FieldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "attending" => Ok(Attendance::Attending),
            "absent" => Ok(Attendance::Absent),
            "graduate" => Ok(Attendance::Graduate),
            _ => Err(FieldError::InvalidValue {
                field: "attendance".to_string(),
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    #[serde(skip)]
    pub password_salt: String,
    #[serde(skip)]
    pub password_hash: String,
    pub name: String,
    pub department: String,
    pub grade: String,
    pub phone: String,
    pub email: String,
    pub attendance: Attendance,
    pub approved: bool,
    pub on_delete: bool,
}

impl Member {
    /// Get the stored credential of the member
    pub fn credential(&self) -> Credential {
        Credential {
            salt: self.password_salt.clone(),
            hash: self.password_hash.clone(),
        }
    }

    /// Check a password against the stored credential
    pub fn verify_password(&self, password: &str) -> bool {
        self.credential().verify(password)
    }

    /// Replace the credential with one derived from password
    pub fn set_password(&mut self, password: &str) {
        let credential = Credential::new(password);
        self.password_salt = credential.salt;
        self.password_hash = credential.hash;
    }

    pub fn is_graduate(&self) -> bool {
        self.attendance == Attendance::Graduate
    }
}

/// A request to join the club.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub id: MemberId,
    /// The member id is used as initial password
    /// when no password is given.
    pub password: Option<String>,
    pub name: String,
    pub department: String,
    pub grade: String,
    pub phone: String,
    pub email: String,
    pub attendance: Attendance,
}

impl From<Candidate> for Member {
    fn from(candidate: Candidate) -> Self {
        let password = candidate
            .password
            .unwrap_or_else(|| candidate.id.clone());
        let mut member = Member {
            id: candidate.id,
            name: candidate.name,
            department: candidate.department,
            grade: candidate.grade,
            phone: candidate.phone,
            email: candidate.email,
            attendance: candidate.attendance,
            approved: false,
            on_delete: false,
            ..Default::default()
        };
        member.set_password(&password);
        member
    }
}

/// Select members. Every field that is set must match;
/// list valued fields match when the value is one of the list.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MemberFilter {
    pub ids: Option<Vec<MemberId>>,
    pub name: Option<String>,
    pub department: Option<Vec<String>>,
    pub grade: Option<Vec<String>>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub attendance: Option<Vec<Attendance>>,
    pub approved: Option<bool>,
    pub on_delete: Option<bool>,
}

impl MemberFilter {
    /// Filter for a single member id
    pub fn id(id: &str) -> Self {
        Self {
            ids: Some(vec![id.to_string()]),
            ..Default::default()
        }
    }

    /// Filter for a list of member ids
    pub fn ids(ids: &[MemberId]) -> Self {
        Self {
            ids: Some(ids.to_vec()),
            ..Default::default()
        }
    }
}

/// A single field assignment on a member record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberChange {
    Name(String),
    Department(String),
    Grade(String),
    Phone(String),
    Email(String),
    Attendance(Attendance),
    Credential(Credential),
    Approved(bool),
    OnDelete(bool),
}

#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
pub enum FieldError {
    #[error("field {0} can not be changed by an update")]
    Immutable(String),
    #[error("unknown member field {0}")]
    Unknown(String),
    #[error("invalid value {value:?} for field {field}")]
    InvalidValue { field: String, value: String },
}

/// The member fields that may be changed through an update.
/// Identity and lifecycle flags have their own operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPatch {
    pub name: Option<String>,
    pub department: Option<String>,
    pub grade: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub attendance: Option<Attendance>,
    pub password: Option<String>,
}

impl MemberPatch {
    /// Set a field by name, as it arrives from a field map.
    pub fn set(&mut self, field: &str, value: &str) -> Result<(), FieldError> {
        match field {
            "name" => self.name = Some(value.to_string()),
            "department" => self.department = Some(value.to_string()),
            "grade" => self.grade = Some(value.to_string()),
            "phone" => self.phone = Some(value.to_string()),
            "email" => self.email = Some(value.to_string()),
            "attendance" => self.attendance = Some(value.parse()?),
            "password" => self.password = Some(value.to_string()),
            "id" | "approved" | "on_delete" | "onDelete" => {
                return Err(FieldError::Immutable(field.to_string()))
            }
            _ => return Err(FieldError::Unknown(field.to_string())),
        }
        Ok(())
    }

    /// Build a patch from (field, value) pairs
    pub fn from_fields<'a, I>(fields: I) -> Result<Self, FieldError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut patch = Self::default();
        for (field, value) in fields {
            patch.set(field, value)?;
        }
        Ok(patch)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Show how a member looks with the patch applied.
    /// The credential is left as it is.
    pub fn preview(&self, member: &Member) -> Member {
        let mut member = member.clone();
        if let Some(name) = &self.name {
            member.name = name.clone();
        }
        if let Some(department) = &self.department {
            member.department = department.clone();
        }
        if let Some(grade) = &self.grade {
            member.grade = grade.clone();
        }
        if let Some(phone) = &self.phone {
            member.phone = phone.clone();
        }
        if let Some(email) = &self.email {
            member.email = email.clone();
        }
        if let Some(attendance) = self.attendance {
            member.attendance = attendance;
        }
        member
    }

    /// Turn the patch into field assignments. A new password
    /// is hashed with a fresh salt.
    pub fn into_changes(self) -> Vec<MemberChange> {
        let mut changes = Vec::new();
        if let Some(name) = self.name {
            changes.push(MemberChange::Name(name));
        }
        if let Some(department) = self.department {
            changes.push(MemberChange::Department(department));
        }
        if let Some(grade) = self.grade {
            changes.push(MemberChange::Grade(grade));
        }
        if let Some(phone) = self.phone {
            changes.push(MemberChange::Phone(phone));
        }
        if let Some(email) = self.email {
            changes.push(MemberChange::Email(email));
        }
        if let Some(attendance) = self.attendance {
            changes.push(MemberChange::Attendance(attendance));
        }
        if let Some(password) = self.password {
            changes.push(MemberChange::Credential(Credential::new(&password)));
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_default_password_is_id() {
        let member: Member = Candidate {
            id: "20210001".to_string(),
            name: "Test1".to_string(),
            ..Default::default()
        }
        .into();
        assert!(!member.approved);
        assert!(!member.on_delete);
        assert!(member.verify_password("20210001"));
        assert!(!member.verify_password("20210002"));
    }

    #[test]
    fn test_candidate_password() {
        let member: Member = Candidate {
            id: "20190002".to_string(),
            password: Some("hunter2".to_string()),
            attendance: Attendance::Absent,
            ..Default::default()
        }
        .into();
        assert!(member.verify_password("hunter2"));
        assert!(!member.verify_password("20190002"));
        assert_eq!(member.attendance, Attendance::Absent);
    }

    #[test]
    fn test_member_serialization_hides_credential() {
        let member: Member = Candidate {
            id: "20210001".to_string(),
            ..Default::default()
        }
        .into();
        let json = serde_json::to_value(&member).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password_salt").is_none());
        assert_eq!(json["attendance"], "attending");
    }

    #[test]
    fn test_attendance_parse() {
        assert_eq!("Attending".parse::<Attendance>(), Ok(Attendance::Attending));
        assert_eq!(" absent".parse::<Attendance>(), Ok(Attendance::Absent));
        assert_eq!("graduate".parse::<Attendance>(), Ok(Attendance::Graduate));
        assert!("retired".parse::<Attendance>().is_err());
    }

    #[test]
    fn test_patch_from_fields() {
        let patch = MemberPatch::from_fields([
            ("attendance", "attending"),
            ("password", "00000000"),
        ])
        .unwrap();
        assert_eq!(patch.attendance, Some(Attendance::Attending));
        assert_eq!(patch.password.as_deref(), Some("00000000"));
        assert!(patch.name.is_none());
    }

    #[test]
    fn test_patch_rejects_immutable_fields() {
        for field in ["id", "approved", "on_delete"] {
            let result = MemberPatch::from_fields([(field, "x")]);
            assert_eq!(result, Err(FieldError::Immutable(field.to_string())));
        }
        assert_eq!(
            MemberPatch::from_fields([("shoe_size", "44")]),
            Err(FieldError::Unknown("shoe_size".to_string()))
        );
    }

    #[test]
    fn test_patch_into_changes() {
        let patch = MemberPatch {
            email: Some("new@mail".to_string()),
            password: Some("secret".to_string()),
            ..Default::default()
        };
        let changes = patch.into_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], MemberChange::Email("new@mail".to_string()));
        match &changes[1] {
            MemberChange::Credential(credential) => {
                assert!(credential.verify("secret"))
            }
            other => panic!("unexpected change {:?}", other),
        }
    }

    #[test]
    fn test_patch_preview() {
        let member = Member {
            id: "20210001".to_string(),
            name: "Test1".to_string(),
            ..Default::default()
        };
        let patch = MemberPatch {
            name: Some("Test One".to_string()),
            attendance: Some(Attendance::Absent),
            ..Default::default()
        };
        let preview = patch.preview(&member);
        assert_eq!(preview.name, "Test One");
        assert_eq!(preview.attendance, Attendance::Absent);
        assert_eq!(preview.id, "20210001");
        assert!(!patch.is_empty());
        assert!(MemberPatch::default().is_empty());
    }
}
