use serde::{Deserialize, Serialize};

use super::repo_types::{ProfilePatch, UserProfile};
use crate::{
    auth::{dto::PublicUser, repo_types::User},
    error::AppError,
    validation::{parse_date, Validator},
};

pub const GENDERS: [&str; 4] = ["male", "female", "other", "prefer_not_to_say"];
pub const IBD_TYPES: [&str; 3] = [
    "Crohn's Disease",
    "Ulcerative Colitis",
    "Indeterminate Colitis",
];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EmergencyContactBody {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub diagnosis_date: Option<String>,
    pub ibd_type: Option<String>,
    pub emergency_contact: Option<EmergencyContactBody>,
}

fn trimmed(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string())
}

impl UpdateProfileRequest {
    pub fn into_patch(self) -> Result<ProfilePatch, AppError> {
        let mut v = Validator::new();
        let contact = self.emergency_contact.unwrap_or_default();

        let first_name = trimmed(self.first_name);
        let last_name = trimmed(self.last_name);
        let contact_name = trimmed(contact.name);
        let contact_phone = trimmed(contact.phone);
        let contact_relationship = trimmed(contact.relationship);

        if let Some(n) = &first_name {
            v.check(!n.is_empty(), "firstName", "First name cannot be empty");
        }
        if let Some(n) = &last_name {
            v.check(!n.is_empty(), "lastName", "Last name cannot be empty");
        }

        let date_of_birth = self.date_of_birth.as_deref().and_then(|raw| {
            let parsed = parse_date(raw);
            v.check(parsed.is_some(), "dateOfBirth", "Invalid date format");
            parsed
        });
        let diagnosis_date = self.diagnosis_date.as_deref().and_then(|raw| {
            let parsed = parse_date(raw);
            v.check(parsed.is_some(), "diagnosisDate", "Invalid diagnosis date format");
            parsed
        });

        if let Some(g) = &self.gender {
            v.check(GENDERS.contains(&g.as_str()), "gender", "Invalid gender");
        }
        if let Some(t) = &self.ibd_type {
            v.check(IBD_TYPES.contains(&t.as_str()), "ibdType", "Invalid IBD type");
        }
        if let Some(n) = &contact_name {
            v.check(
                !n.is_empty(),
                "emergencyContact.name",
                "Emergency contact name cannot be empty",
            );
        }
        if let Some(p) = &contact_phone {
            v.check(
                p.chars().count() >= 10,
                "emergencyContact.phone",
                "Invalid phone number",
            );
        }
        if let Some(r) = &contact_relationship {
            v.check(
                !r.is_empty(),
                "emergencyContact.relationship",
                "Emergency contact relationship cannot be empty",
            );
        }
        v.finish()?;

        Ok(ProfilePatch {
            first_name,
            last_name,
            date_of_birth,
            gender: self.gender,
            diagnosis_date,
            ibd_type: self.ibd_type,
            emergency_contact_name: contact_name,
            emergency_contact_phone: contact_phone,
            emergency_contact_relationship: contact_relationship,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut v = Validator::new();
        v.check(
            !self.current_password.is_empty(),
            "currentPassword",
            "Current password is required",
        )
        .check(
            self.new_password.chars().count() >= 8,
            "newPassword",
            "New password must be at least 8 characters long",
        )
        .check(
            self.confirm_password == self.new_password,
            "confirmPassword",
            "Password confirmation does not match new password",
        );
        v.finish()
    }
}

#[derive(Debug, Default, Serialize)]
pub struct EmergencyContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileBody {
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub diagnosis_date: Option<String>,
    pub ibd_type: Option<String>,
    pub emergency_contact: EmergencyContact,
}

impl From<Option<UserProfile>> for ProfileBody {
    fn from(p: Option<UserProfile>) -> Self {
        let Some(p) = p else {
            return Self::default();
        };
        Self {
            date_of_birth: p.date_of_birth.map(|d| d.to_string()),
            gender: p.gender,
            diagnosis_date: p.diagnosis_date.map(|d| d.to_string()),
            ibd_type: p.ibd_type,
            emergency_contact: EmergencyContact {
                name: p.emergency_contact_name,
                phone: p.emergency_contact_phone,
                relationship: p.emergency_contact_relationship,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileUser {
    #[serde(flatten)]
    pub user: PublicUser,
    pub profile: ProfileBody,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: ProfileUser,
}

impl ProfileResponse {
    pub fn new(user: User, profile: Option<UserProfile>) -> Self {
        Self {
            user: ProfileUser {
                user: PublicUser::from(user),
                profile: ProfileBody::from(profile),
            },
        }
    }
}
