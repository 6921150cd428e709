use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// 1:1 extension of a user, created on first profile write.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub diagnosis_date: Option<Date>,
    pub ibd_type: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relationship: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated partial update; `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<Date>,
    pub gender: Option<String>,
    pub diagnosis_date: Option<Date>,
    pub ibd_type: Option<String>,
    pub emergency_contact_name: Option<String>,
    pub emergency_contact_phone: Option<String>,
    pub emergency_contact_relationship: Option<String>,
}

impl ProfilePatch {
    pub fn touches_user(&self) -> bool {
        self.first_name.is_some() || self.last_name.is_some()
    }

    pub fn touches_profile(&self) -> bool {
        self.date_of_birth.is_some()
            || self.gender.is_some()
            || self.diagnosis_date.is_some()
            || self.ibd_type.is_some()
            || self.emergency_contact_name.is_some()
            || self.emergency_contact_phone.is_some()
            || self.emergency_contact_relationship.is_some()
    }

    /// Merges the profile half of the patch over `existing`, or over an
    /// empty profile when the user has none yet.
    pub fn merge_into(
        &self,
        existing: Option<UserProfile>,
        user_id: Uuid,
        now: OffsetDateTime,
    ) -> UserProfile {
        let mut p = existing.unwrap_or(UserProfile {
            user_id,
            date_of_birth: None,
            gender: None,
            diagnosis_date: None,
            ibd_type: None,
            emergency_contact_name: None,
            emergency_contact_phone: None,
            emergency_contact_relationship: None,
            created_at: now,
            updated_at: now,
        });
        if let Some(v) = self.date_of_birth {
            p.date_of_birth = Some(v);
        }
        if let Some(v) = &self.gender {
            p.gender = Some(v.clone());
        }
        if let Some(v) = self.diagnosis_date {
            p.diagnosis_date = Some(v);
        }
        if let Some(v) = &self.ibd_type {
            p.ibd_type = Some(v.clone());
        }
        if let Some(v) = &self.emergency_contact_name {
            p.emergency_contact_name = Some(v.clone());
        }
        if let Some(v) = &self.emergency_contact_phone {
            p.emergency_contact_phone = Some(v.clone());
        }
        if let Some(v) = &self.emergency_contact_relationship {
            p.emergency_contact_relationship = Some(v.clone());
        }
        p.updated_at = now;
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn first_merge_creates_profile_with_only_supplied_fields() {
        let uid = Uuid::new_v4();
        let now = datetime!(2024-06-01 12:00 UTC);
        let patch = ProfilePatch {
            gender: Some("female".into()),
            ..Default::default()
        };
        let p = patch.merge_into(None, uid, now);
        assert_eq!(p.user_id, uid);
        assert_eq!(p.gender.as_deref(), Some("female"));
        assert_eq!(p.date_of_birth, None);
        assert_eq!(p.created_at, now);
    }

    #[test]
    fn merge_keeps_untouched_fields() {
        let uid = Uuid::new_v4();
        let created = datetime!(2024-01-01 00:00 UTC);
        let existing = UserProfile {
            user_id: uid,
            date_of_birth: Some(date!(1990 - 04 - 17)),
            gender: Some("male".into()),
            diagnosis_date: None,
            ibd_type: Some("Ulcerative Colitis".into()),
            emergency_contact_name: Some("Sam".into()),
            emergency_contact_phone: Some("555-010-0199".into()),
            emergency_contact_relationship: Some("sibling".into()),
            created_at: created,
            updated_at: created,
        };
        let patch = ProfilePatch {
            emergency_contact_phone: Some("555-010-0200".into()),
            ..Default::default()
        };
        let now = datetime!(2024-06-01 12:00 UTC);
        let p = patch.merge_into(Some(existing.clone()), uid, now);
        assert_eq!(p.emergency_contact_phone.as_deref(), Some("555-010-0200"));
        assert_eq!(p.emergency_contact_name, existing.emergency_contact_name);
        assert_eq!(p.date_of_birth, existing.date_of_birth);
        assert_eq!(p.ibd_type, existing.ibd_type);
        assert_eq!(p.created_at, created);
        assert_eq!(p.updated_at, now);
    }

    #[test]
    fn touches_reports_halves() {
        let names = ProfilePatch {
            last_name: Some("Doe".into()),
            ..Default::default()
        };
        assert!(names.touches_user());
        assert!(!names.touches_profile());
        assert!(!ProfilePatch::default().touches_profile());
    }
}
