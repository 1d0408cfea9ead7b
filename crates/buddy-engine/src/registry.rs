use tracing::{info, warn};

use buddy_data::{
    Attendance,
    Candidate,
    Delete,
    Insert,
    Member,
    MemberChange,
    MemberFilter,
    MemberId,
    MemberPatch,
    Query,
    Retrieve,
    Update,
};

use crate::{
    validation::{first_missing, require_non_empty, unique},
    Error,
    Result,
};

/// Everything the registry needs from a store.
pub trait MemberStore:
    Query<Member, Filter = MemberFilter>
    + Retrieve<Member, Key = MemberId>
    + Insert<Member>
    + Update<Member, Filter = MemberFilter, Change = Vec<MemberChange>>
    + Delete<Member, Filter = MemberFilter>
    + Send
    + Sync
{
}

impl<T> MemberStore for T where
    T: Query<Member, Filter = MemberFilter>
        + Retrieve<Member, Key = MemberId>
        + Insert<Member>
        + Update<Member, Filter = MemberFilter, Change = Vec<MemberChange>>
        + Delete<Member, Filter = MemberFilter>
        + Send
        + Sync
{
}

/// The member roster and the lifecycle of its members.
pub struct Registry<DB> {
    db: DB,
}

impl<DB: MemberStore> Registry<DB> {
    pub fn new(db: DB) -> Self {
        Self { db }
    }

    /// Get a member, pending or approved
    pub async fn retrieve(&self, id: &str) -> Result<Member> {
        self.db
            .retrieve(id.to_string())
            .await
            .map_err(|err| Error::from(err).about(format!("Member {}", id)))
    }

    /// Request membership. The new member waits for approval.
    pub async fn sign_up(&self, candidate: Candidate) -> Result<Member> {
        require_non_empty("id", &candidate.id)?;
        require_non_empty("name", &candidate.name)?;
        if let Some(password) = &candidate.password {
            require_non_empty("password", password)?;
        }

        let id = candidate.id.clone();
        let member = self
            .db
            .insert(Member::from(candidate))
            .await
            .map_err(|err| Error::from(err).about(format!("Member {}", id)))?;
        info!(member = %member.id, "signed up");
        Ok(member)
    }

    /// Members waiting for approval, in order of signup
    pub async fn sign_ups(&self) -> Result<Vec<Member>> {
        let filter = MemberFilter {
            approved: Some(false),
            ..Default::default()
        };
        Ok(self.db.query(&filter).await?)
    }

    /// Admit members. Unknown ids fail the whole batch before
    /// anything is written; members already admitted are left alone.
    pub async fn approve(&self, ids: &[MemberId]) -> Result<()> {
        let ids = unique(ids);
        if ids.is_empty() {
            return Ok(());
        }
        let known = self.db.query(&MemberFilter::ids(&ids)).await?;
        if let Some(id) = first_missing(&ids, known.into_iter().map(|m| m.id)) {
            return Err(Error::NotFound(format!("Member {}", id)));
        }

        let filter = MemberFilter {
            approved: Some(false),
            ..MemberFilter::ids(&ids)
        };
        let approved = self
            .db
            .update(&filter, &vec![MemberChange::Approved(true)])
            .await?;
        info!(requested = ids.len(), approved, "approved members");
        Ok(())
    }

    /// Check credentials of a member
    pub async fn sign_in(&self, id: &str, password: &str) -> Result<Member> {
        let member = self.retrieve(id).await?;
        if !member.verify_password(password) {
            warn!(member = %id, "sign in with invalid credentials");
            return Err(Error::Unauthorized);
        }
        if !member.approved {
            return Err(Error::UnderReview(id.to_string()));
        }
        Ok(member)
    }

    /// Request to leave the club
    pub async fn exit(&self, id: &str) -> Result<()> {
        let filter = MemberFilter {
            approved: Some(true),
            on_delete: Some(false),
            ..MemberFilter::id(id)
        };
        let changed = self
            .db
            .update(&filter, &vec![MemberChange::OnDelete(true)])
            .await?;
        if changed > 0 {
            info!(member = %id, "requested exit");
            return Ok(());
        }

        let member = self.retrieve(id).await?;
        Err(match (member.approved, member.on_delete) {
            (false, _) => Error::InvalidState(format!(
                "Member {} is not approved and can not exit",
                id
            )),
            (true, true) => Error::AlreadyExiting(id.to_string()),
            (true, false) => {
                Error::Transient(format!("Member {} changed concurrently", id))
            }
        })
    }

    /// Withdraw an exit request
    pub async fn cancel_exit(&self, id: &str) -> Result<()> {
        let filter = MemberFilter {
            on_delete: Some(true),
            ..MemberFilter::id(id)
        };
        let changed = self
            .db
            .update(&filter, &vec![MemberChange::OnDelete(false)])
            .await?;
        if changed > 0 {
            info!(member = %id, "cancelled exit");
            return Ok(());
        }

        let member = self.retrieve(id).await?;
        if member.on_delete {
            return Err(Error::Transient(format!(
                "Member {} changed concurrently",
                id
            )));
        }
        Err(Error::NotOnDelete(id.to_string()))
    }

    /// Members who requested to exit
    pub async fn exits(&self) -> Result<Vec<Member>> {
        let filter = MemberFilter {
            approved: Some(true),
            on_delete: Some(true),
            ..Default::default()
        };
        Ok(self.db.query(&filter).await?)
    }

    /// Finalize exits by removing the members. Every member must
    /// have requested to exit, otherwise nothing is removed.
    pub async fn delete(&self, ids: &[MemberId]) -> Result<()> {
        let ids = unique(ids);
        if ids.is_empty() {
            return Ok(());
        }
        let known = self.db.query(&MemberFilter::ids(&ids)).await?;
        if let Some(id) =
            first_missing(&ids, known.iter().map(|m| m.id.clone()))
        {
            return Err(Error::NotFound(format!("Member {}", id)));
        }
        if let Some(member) = known.iter().find(|m| !m.on_delete) {
            return Err(Error::InvalidState(format!(
                "Member {} did not request to exit",
                member.id
            )));
        }

        let filter = MemberFilter {
            on_delete: Some(true),
            ..MemberFilter::ids(&ids)
        };
        let removed = self.db.delete(&filter).await?;
        if removed < ids.len() as u64 {
            warn!(
                requested = ids.len(),
                removed, "some members cancelled their exit before removal"
            );
        }
        info!(removed, "removed members");
        Ok(())
    }

    /// Change the updatable fields of a member
    pub async fn update(&self, id: &str, patch: MemberPatch) -> Result<()> {
        if patch.is_empty() {
            return Err(Error::Validation("nothing to update".to_string()));
        }
        if let Some(name) = &patch.name {
            require_non_empty("name", name)?;
        }
        if let Some(password) = &patch.password {
            require_non_empty("password", password)?;
        }

        // Graduation is final
        let mut filter = MemberFilter {
            approved: Some(true),
            ..MemberFilter::id(id)
        };
        if patch.attendance.is_some() {
            filter.attendance =
                Some(vec![Attendance::Attending, Attendance::Absent]);
        }

        let changed = self.db.update(&filter, &patch.into_changes()).await?;
        if changed > 0 {
            info!(member = %id, "updated member");
            return Ok(());
        }

        let member = self.retrieve(id).await?;
        if !member.approved {
            return Err(Error::NotFound(format!("Member {}", id)));
        }
        if member.is_graduate() {
            return Err(Error::InvalidState(format!(
                "Member {} graduated, attendance can not change",
                id
            )));
        }
        Err(Error::Transient(format!("Member {} changed concurrently", id)))
    }

    /// Approved members matching the filter. An empty
    /// filter matches every approved member.
    pub async fn search(&self, filter: MemberFilter) -> Result<Vec<Member>> {
        let filter = MemberFilter {
            approved: Some(true),
            ..filter
        };
        Ok(self.db.query(&filter).await?)
    }

    /// Mark a member as graduated
    pub async fn graduate(&self, id: &str) -> Result<()> {
        let filter = MemberFilter {
            approved: Some(true),
            ..MemberFilter::id(id)
        };
        let changed = self
            .db
            .update(&filter, &vec![MemberChange::Attendance(Attendance::Graduate)])
            .await?;
        if changed > 0 {
            info!(member = %id, "graduated");
            return Ok(());
        }

        // Either unknown or still under review
        self.retrieve(id).await?;
        Err(Error::InvalidState(format!(
            "Member {} is not approved and can not graduate",
            id
        )))
    }

    /// Approved members who graduated
    pub async fn graduates(&self) -> Result<Vec<Member>> {
        self.search(MemberFilter {
            attendance: Some(vec![Attendance::Graduate]),
            ..Default::default()
        })
        .await
    }
}
