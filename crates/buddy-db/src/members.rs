use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};

use buddy_data::{
    Delete,
    Insert,
    Member,
    MemberChange,
    MemberFilter,
    MemberId,
    Query,
    QueryError,
    Retrieve,
    Update,
};

use crate::{
    results::{push_in, store_error},
    Connection,
};

/// Append the conditions of a member filter
fn push_member_filter(qry: &mut QueryBuilder<'_, Sqlite>, filter: &MemberFilter) {
    if let Some(ids) = filter.ids.clone() {
        push_in(qry, "id", ids);
    }
    if let Some(name) = filter.name.clone() {
        qry.push(" AND name = ").push_bind(name);
    }
    if let Some(departments) = filter.department.clone() {
        push_in(qry, "department", departments);
    }
    if let Some(grades) = filter.grade.clone() {
        push_in(qry, "grade", grades);
    }
    if let Some(phone) = filter.phone.clone() {
        qry.push(" AND phone = ").push_bind(phone);
    }
    if let Some(email) = filter.email.clone() {
        qry.push(" AND email = ").push_bind(email);
    }
    if let Some(attendance) = filter.attendance.clone() {
        push_in(qry, "attendance", attendance);
    }
    if let Some(approved) = filter.approved {
        qry.push(" AND approved = ").push_bind(approved);
    }
    if let Some(on_delete) = filter.on_delete {
        qry.push(" AND on_delete = ").push_bind(on_delete);
    }
}

#[async_trait]
impl Query<Member> for Connection {
    type Filter = MemberFilter;

    async fn query(&self, filter: &MemberFilter) -> Result<Vec<Member>> {
        self.bounded(async {
            let mut conn = self.lock().await;
            let mut qry = QueryBuilder::<Sqlite>::new(
                r#"
                SELECT
                    id,
                    password_salt,
                    password_hash,
                    name,
                    department,
                    grade,
                    phone,
                    email,
                    attendance,
                    approved,
                    on_delete
                FROM members
                WHERE 1
                "#,
            );
            push_member_filter(&mut qry, filter);
            qry.push(" ORDER BY rowid");

            let members: Vec<Member> = qry
                .build_query_as()
                .fetch_all(&mut *conn)
                .await
                .map_err(store_error)?;
            tracing::debug!(count = members.len(), "queried members");
            Ok(members)
        })
        .await
    }
}

#[async_trait]
impl Retrieve<Member> for Connection {
    type Key = MemberId;

    async fn retrieve(&self, member_id: MemberId) -> Result<Member> {
        let mut members: Vec<Member> =
            self.query(&MemberFilter::id(&member_id)).await?;
        if members.len() > 1 {
            return Err(QueryError::Ambiguous(members.len()).into());
        }
        let member = members.pop().ok_or(QueryError::NotFound)?;
        Ok(member)
    }
}

#[async_trait]
impl Insert<Member> for Connection {
    async fn insert(&self, member: Member) -> Result<Member> {
        self.bounded(async {
            let mut conn = self.lock().await;
            let mut qry = QueryBuilder::<Sqlite>::new(
                r#"INSERT INTO members (
                    id,
                    password_salt,
                    password_hash,
                    name,
                    department,
                    grade,
                    phone,
                    email,
                    attendance,
                    approved,
                    on_delete
                ) VALUES (
                "#,
            );
            qry.separated(", ")
                .push_bind(member.id.clone())
                .push_bind(member.password_salt.clone())
                .push_bind(member.password_hash.clone())
                .push_bind(member.name.clone())
                .push_bind(member.department.clone())
                .push_bind(member.grade.clone())
                .push_bind(member.phone.clone())
                .push_bind(member.email.clone())
                .push_bind(member.attendance)
                .push_bind(member.approved)
                .push_bind(member.on_delete);
            qry.push(")")
                .build()
                .execute(&mut *conn)
                .await
                .map_err(store_error)?;
            Ok(())
        })
        .await?;
        self.retrieve(member.id).await
    }
}

#[async_trait]
impl Update<Member> for Connection {
    type Filter = MemberFilter;
    type Change = Vec<MemberChange>;

    /// Update all members matching the filter
    async fn update(
        &self,
        filter: &MemberFilter,
        changes: &Vec<MemberChange>,
    ) -> Result<u64> {
        if changes.is_empty() {
            return Err(anyhow!("no member fields to update"));
        }
        self.bounded(async {
            let mut conn = self.lock().await;
            let mut qry = QueryBuilder::<Sqlite>::new("UPDATE members SET ");
            {
                let mut set = qry.separated(", ");
                for change in changes {
                    match change.clone() {
                        MemberChange::Name(name) => {
                            set.push("name = ").push_bind_unseparated(name);
                        }
                        MemberChange::Department(department) => {
                            set.push("department = ")
                                .push_bind_unseparated(department);
                        }
                        MemberChange::Grade(grade) => {
                            set.push("grade = ").push_bind_unseparated(grade);
                        }
                        MemberChange::Phone(phone) => {
                            set.push("phone = ").push_bind_unseparated(phone);
                        }
                        MemberChange::Email(email) => {
                            set.push("email = ").push_bind_unseparated(email);
                        }
                        MemberChange::Attendance(attendance) => {
                            set.push("attendance = ")
                                .push_bind_unseparated(attendance);
                        }
                        MemberChange::Credential(credential) => {
                            set.push("password_salt = ")
                                .push_bind_unseparated(credential.salt);
                            set.push("password_hash = ")
                                .push_bind_unseparated(credential.hash);
                        }
                        MemberChange::Approved(approved) => {
                            set.push("approved = ")
                                .push_bind_unseparated(approved);
                        }
                        MemberChange::OnDelete(on_delete) => {
                            set.push("on_delete = ")
                                .push_bind_unseparated(on_delete);
                        }
                    }
                }
            }
            qry.push(" WHERE 1");
            push_member_filter(&mut qry, filter);

            let result = qry
                .build()
                .execute(&mut *conn)
                .await
                .map_err(store_error)?;
            Ok(result.rows_affected())
        })
        .await
    }
}

#[async_trait]
impl Delete<Member> for Connection {
    type Filter = MemberFilter;

    /// Delete all members matching the filter
    async fn delete(&self, filter: &MemberFilter) -> Result<u64> {
        self.bounded(async {
            let mut conn = self.lock().await;
            let mut qry =
                QueryBuilder::<Sqlite>::new("DELETE FROM members WHERE 1");
            push_member_filter(&mut qry, filter);
            let result = qry
                .build()
                .execute(&mut *conn)
                .await
                .map_err(store_error)?;
            Ok(result.rows_affected())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use buddy_data::{Attendance, Candidate};

    fn candidate(id: &str, name: &str, attendance: Attendance) -> Member {
        Candidate {
            id: id.to_string(),
            name: name.to_string(),
            department: "Computer Science".to_string(),
            grade: "1".to_string(),
            phone: "010-0000-0000".to_string(),
            email: format!("{}@club.test", id),
            attendance,
            ..Default::default()
        }
        .into()
    }

    #[tokio::test]
    async fn test_member_insert() {
        let (_handle, db) = Connection::open_test().await;
        let member = db
            .insert(candidate("20210001", "Test1", Attendance::Attending))
            .await
            .unwrap();

        assert_eq!(member.id, "20210001");
        assert_eq!(member.name, "Test1");
        assert_eq!(member.department, "Computer Science");
        assert_eq!(member.email, "20210001@club.test");
        assert_eq!(member.attendance, Attendance::Attending);
        assert!(!member.approved);
        assert!(!member.on_delete);
        assert!(member.verify_password("20210001"));
    }

    #[tokio::test]
    async fn test_member_insert_duplicate() {
        let (_handle, db) = Connection::open_test().await;
        db.insert(candidate("20210001", "Test1", Attendance::Attending))
            .await
            .unwrap();
        let err = db
            .insert(candidate("20210001", "Other", Attendance::Absent))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueryError>(),
            Some(QueryError::Duplicate)
        ));
    }

    #[tokio::test]
    async fn test_member_retrieve_missing() {
        let (_handle, db) = Connection::open_test().await;
        let result: Result<Member> = db.retrieve("nobody".to_string()).await;
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<QueryError>(),
            Some(QueryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_member_filter() {
        let (_handle, db) = Connection::open_test().await;
        db.insert(candidate("20210001", "Test1", Attendance::Attending))
            .await
            .unwrap();
        db.insert(candidate("20190002", "Test2", Attendance::Absent))
            .await
            .unwrap();
        db.insert(candidate("20190003", "Test3", Attendance::Attending))
            .await
            .unwrap();

        let members: Vec<Member> = db
            .query(&MemberFilter {
                attendance: Some(vec![Attendance::Attending]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(members.len(), 2);
        // insertion order
        assert_eq!(members[0].id, "20210001");
        assert_eq!(members[1].id, "20190003");

        let members: Vec<Member> = db
            .query(&MemberFilter::ids(&[
                "20190002".to_string(),
                "20190003".to_string(),
            ]))
            .await
            .unwrap();
        assert_eq!(members.len(), 2);

        let members: Vec<Member> =
            db.query(&MemberFilter::ids(&[])).await.unwrap();
        assert!(members.is_empty());

        let members: Vec<Member> =
            db.query(&MemberFilter::default()).await.unwrap();
        assert_eq!(members.len(), 3);
    }

    #[tokio::test]
    async fn test_member_update() {
        let (_handle, db) = Connection::open_test().await;
        db.insert(candidate("20210001", "Test1", Attendance::Attending))
            .await
            .unwrap();

        let changed = Update::<Member>::update(
            &db,
            &MemberFilter::id("20210001"),
            &vec![
                MemberChange::Approved(true),
                MemberChange::Email("new@mail".to_string()),
                MemberChange::Attendance(Attendance::Absent),
            ],
        )
        .await
        .unwrap();
        assert_eq!(changed, 1);

        let member: Member = db.retrieve("20210001".to_string()).await.unwrap();
        assert!(member.approved);
        assert_eq!(member.email, "new@mail");
        assert_eq!(member.attendance, Attendance::Absent);
    }

    #[tokio::test]
    async fn test_member_conditional_update() {
        let (_handle, db) = Connection::open_test().await;
        db.insert(candidate("20210001", "Test1", Attendance::Attending))
            .await
            .unwrap();

        // Not approved, so the precondition does not hold
        let changed = Update::<Member>::update(
            &db,
            &MemberFilter {
                approved: Some(true),
                ..MemberFilter::id("20210001")
            },
            &vec![MemberChange::OnDelete(true)],
        )
        .await
        .unwrap();
        assert_eq!(changed, 0);
    }

    #[tokio::test]
    async fn test_member_delete() {
        let (_handle, db) = Connection::open_test().await;
        db.insert(candidate("20210001", "Test1", Attendance::Attending))
            .await
            .unwrap();
        db.insert(candidate("20190002", "Test2", Attendance::Absent))
            .await
            .unwrap();

        let removed = Delete::<Member>::delete(&db, &MemberFilter::id("20210001"))
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let members: Vec<Member> =
            db.query(&MemberFilter::default()).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, "20190002");
    }
}
