use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use buddy_data::{
    Fee,
    FeeChange,
    FeeFilter,
    Insert,
    Log,
    LogChange,
    LogFilter,
    LogId,
    LogKind,
    Member,
    MemberFilter,
    Query,
    Retrieve,
    Term,
    Update,
};

use crate::{
    validation::{
        first_missing,
        require_non_empty,
        require_non_negative,
        require_positive,
        require_term,
        unique,
    },
    Error,
    Result,
};

/// Everything the ledger needs from a store. Members
/// are only read, to know who is on the roster.
pub trait LedgerStore:
    Query<Fee, Filter = FeeFilter>
    + Retrieve<Fee, Key = Term>
    + Insert<Fee>
    + Update<Fee, Filter = FeeFilter, Change = FeeChange>
    + Query<Log, Filter = LogFilter>
    + Insert<Log>
    + Update<Log, Filter = LogFilter, Change = LogChange>
    + Query<Member, Filter = MemberFilter>
    + Send
    + Sync
{
}

impl<T> LedgerStore for T where
    T: Query<Fee, Filter = FeeFilter>
        + Retrieve<Fee, Key = Term>
        + Insert<Fee>
        + Update<Fee, Filter = FeeFilter, Change = FeeChange>
        + Query<Log, Filter = LogFilter>
        + Insert<Log>
        + Update<Log, Filter = LogFilter, Change = LogChange>
        + Query<Member, Filter = MemberFilter>
        + Send
        + Sync
{
}

/// A member who paid less than the due amount of a term.
#[derive(Debug, Clone, Serialize)]
pub struct Debtor {
    pub member: Member,
    pub deficit: i64,
}

/// The state of a term: what is due, what was filed,
/// and who paid.
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub fee: Fee,
    pub logs: Vec<Log>,
    pub payers: Vec<Member>,
    pub debtors: Vec<Debtor>,
}

impl Statement {
    /// Classify the roster against the approved logs of a term
    pub fn settle(fee: Fee, logs: Vec<Log>, roster: Vec<Member>) -> Self {
        let paid = paid_totals(&logs);
        let mut payers = Vec::new();
        let mut debtors = Vec::new();
        for member in roster {
            let total = paid.get(member.id.as_str()).copied().unwrap_or(0);
            if total >= fee.amount {
                payers.push(member);
            } else {
                debtors.push(Debtor {
                    member,
                    deficit: fee.amount - total,
                });
            }
        }
        Self {
            fee,
            logs,
            payers,
            debtors,
        }
    }
}

/// Sum of approved payments per member. Totals saturate
/// at i64::MAX, which still counts as paid in full.
pub fn paid_totals(logs: &[Log]) -> HashMap<&str, i64> {
    let mut totals: HashMap<&str, i64> = HashMap::new();
    for log in logs.iter().filter(|log| log.is_approved()) {
        let total = totals.entry(log.member_id.as_str()).or_insert(0);
        *total = total.saturating_add(log.amount);
    }
    totals
}

/// The due amount after adjusting it by delta
pub fn due_after(amount: i64, delta: i64) -> Result<i64> {
    let due = amount.checked_add(delta).ok_or_else(|| {
        Error::Validation(format!(
            "Adjusting {} by {} overflows the due amount",
            amount, delta
        ))
    })?;
    if due < 0 {
        return Err(Error::Validation(format!(
            "Adjusting {} by {} would make the due amount negative",
            amount, delta
        )));
    }
    Ok(due)
}

fn checked_total<'a>(
    amounts: impl IntoIterator<Item = &'a i64>,
) -> Option<i64> {
    amounts
        .into_iter()
        .try_fold(0i64, |total, amount| total.checked_add(*amount))
}

/// The semester dues and the payments filed against them.
pub struct Ledger<DB> {
    db: DB,
}

impl<DB: LedgerStore> Ledger<DB> {
    pub fn new(db: DB) -> Self {
        Self { db }
    }

    async fn fee(&self, term: Term) -> Result<Fee> {
        Retrieve::<Fee>::retrieve(&self.db, term)
            .await
            .map_err(|err| Error::from(err).about(format!("Term {}", term)))
    }

    async fn roster(&self) -> Result<Vec<Member>> {
        let filter = MemberFilter {
            approved: Some(true),
            ..Default::default()
        };
        Ok(Query::<Member>::query(&self.db, &filter).await?)
    }

    /// Open a term with its due amount
    pub async fn create(&self, term: Term, amount: i64) -> Result<Fee> {
        require_term(term)?;
        require_non_negative("amount", amount)?;
        let fee = Insert::<Fee>::insert(&self.db, Fee::new(term, amount))
            .await
            .map_err(|err| Error::from(err).about(format!("Term {}", term)))?;
        info!(term = %term, amount, "created term");
        Ok(fee)
    }

    /// All terms, oldest first
    pub async fn terms(&self) -> Result<Vec<Fee>> {
        Ok(Query::<Fee>::query(&self.db, &FeeFilter::default()).await?)
    }

    /// Adjust the due amount of a term by delta
    pub async fn deposit(&self, term: Term, delta: i64) -> Result<()> {
        let fee = self.fee(term).await?;
        due_after(fee.amount, delta)?;

        let changed = Update::<Fee>::update(
            &self.db,
            &FeeFilter::from(term),
            &FeeChange::Deposit(delta),
        )
        .await?;
        if changed > 0 {
            info!(term = %term, delta, "adjusted due amount");
            return Ok(());
        }

        // Changed in between; report against the current amount
        let fee = self.fee(term).await?;
        match due_after(fee.amount, delta) {
            Ok(_) => Err(Error::Transient(format!(
                "Term {} changed concurrently",
                term
            ))),
            Err(err) => Err(err),
        }
    }

    /// File a payment. It counts once approved.
    pub async fn pay(
        &self,
        term: Term,
        member_id: &str,
        amount: i64,
    ) -> Result<Log> {
        require_non_empty("member id", member_id)?;
        require_positive("amount", amount)?;
        self.fee(term).await?;

        let filter = MemberFilter {
            approved: Some(true),
            ..MemberFilter::id(member_id)
        };
        let members = Query::<Member>::query(&self.db, &filter).await?;
        if members.is_empty() {
            return Err(Error::NotFound(format!("Member {}", member_id)));
        }

        let filter = LogFilter {
            member_id: Some(member_id.to_string()),
            ..LogFilter::term(term)
        };
        let filed = Query::<Log>::query(&self.db, &filter).await?;
        let amounts = filed.iter().map(|log| &log.amount);
        if checked_total(amounts.chain([&amount])).is_none() {
            return Err(Error::Validation(format!(
                "Payments of member {} for {} would overflow",
                member_id, term
            )));
        }

        let log =
            Insert::<Log>::insert(&self.db, Log::new(term, member_id, amount))
                .await
                .map_err(|err| {
                    Error::from(err).about(format!("Term {}", term))
                })?;
        info!(term = %term, member = %member_id, amount, log = log.id, "filed payment");
        Ok(log)
    }

    /// Approve payments. Unknown ids fail the whole batch before
    /// anything is written; approved logs stay as they are.
    pub async fn approve(&self, ids: &[LogId]) -> Result<()> {
        let ids = unique(ids);
        if ids.is_empty() {
            return Ok(());
        }
        let filter = LogFilter {
            ids: Some(ids.clone()),
            ..Default::default()
        };
        let known = Query::<Log>::query(&self.db, &filter).await?;
        if let Some(id) = first_missing(&ids, known.iter().map(|log| log.id)) {
            return Err(Error::NotFound(format!("Log {}", id)));
        }

        let filter = LogFilter {
            kind: Some(LogKind::Unapproved),
            ..filter
        };
        let at = chrono::Utc::now().timestamp();
        let approved = Update::<Log>::update(
            &self.db,
            &filter,
            &LogChange::Approve { at },
        )
        .await?;
        info!(requested = ids.len(), approved, "approved payments");
        Ok(())
    }

    /// Approved payments of a member in a term
    pub async fn amount(&self, term: Term, member_id: &str) -> Result<i64> {
        self.fee(term).await?;
        let filter = LogFilter {
            member_id: Some(member_id.to_string()),
            kind: Some(LogKind::Approved),
            ..LogFilter::term(term)
        };
        let logs = Query::<Log>::query(&self.db, &filter).await?;
        let total = checked_total(logs.iter().map(|log| &log.amount))
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Payments of member {} for {} overflow",
                    member_id, term
                ))
            })?;
        debug!(term = %term, member = %member_id, total, "summed payments");
        Ok(total)
    }

    /// Members who paid at least the due amount
    pub async fn payers(&self, term: Term) -> Result<Vec<Member>> {
        Ok(self.search(term).await?.payers)
    }

    /// Members who paid less than the due amount, with
    /// what they still owe.
    pub async fn deptors(&self, term: Term) -> Result<Vec<Debtor>> {
        Ok(self.search(term).await?.debtors)
    }

    /// Due amount, payment logs, payers and debtors of a term
    pub async fn search(&self, term: Term) -> Result<Statement> {
        let fee = self.fee(term).await?;
        let logs =
            Query::<Log>::query(&self.db, &LogFilter::term(term)).await?;
        let roster = self.roster().await?;
        Ok(Statement::settle(fee, logs, roster))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use buddy_data::Candidate;
    use buddy_db::Connection;

    use crate::Registry;

    const TERM: Term = Term {
        year: 2021,
        semester: 1,
    };

    /// A ledger over a roster of approved members
    async fn ledger_with(
        db: &Connection,
        members: &[&str],
    ) -> Ledger<Connection> {
        let registry = Registry::new(db.clone());
        let mut ids = Vec::new();
        for id in members {
            registry
                .sign_up(Candidate {
                    id: id.to_string(),
                    name: format!("Test {}", id),
                    ..Default::default()
                })
                .await
                .unwrap();
            ids.push(id.to_string());
        }
        registry.approve(&ids).await.unwrap();
        Ledger::new(db.clone())
    }

    /// File a payment and approve it
    async fn paid(ledger: &Ledger<Connection>, member: &str, amount: i64) -> Log {
        let log = ledger.pay(TERM, member, amount).await.unwrap();
        ledger.approve(&[log.id]).await.unwrap();
        log
    }

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            approved: true,
            ..Default::default()
        }
    }

    fn log(member_id: &str, amount: i64, kind: LogKind) -> Log {
        Log {
            kind,
            ..Log::new(TERM, member_id, amount)
        }
    }

    #[test]
    fn test_settle() {
        let fee = Fee::new(TERM, 40000);
        let logs = vec![
            log("abc", 20000, LogKind::Approved),
            log("abc", 20000, LogKind::Approved),
            log("def", 20000, LogKind::Approved),
            log("def", 20000, LogKind::Unapproved),
            log("gone", 40000, LogKind::Approved),
        ];
        let roster = vec![member("abc"), member("def"), member("ghi")];

        let statement = Statement::settle(fee, logs, roster);
        assert_eq!(statement.logs.len(), 5);
        assert_eq!(statement.payers.len(), 1);
        assert_eq!(statement.payers[0].id, "abc");

        let deficits: Vec<(&str, i64)> = statement
            .debtors
            .iter()
            .map(|d| (d.member.id.as_str(), d.deficit))
            .collect();
        assert_eq!(deficits, vec![("def", 20000), ("ghi", 40000)]);
    }

    #[test]
    fn test_paid_totals_ignore_unapproved() {
        let logs = vec![
            log("abc", 100, LogKind::Unapproved),
            log("abc", 250, LogKind::Approved),
        ];
        let totals = paid_totals(&logs);
        assert_eq!(totals.get("abc"), Some(&250));
        assert_eq!(totals.len(), 1);
    }

    #[test]
    fn test_paid_totals_saturate() {
        let logs = vec![
            log("abc", i64::MAX, LogKind::Approved),
            log("abc", 1, LogKind::Approved),
        ];
        assert_eq!(paid_totals(&logs).get("abc"), Some(&i64::MAX));

        let statement =
            Statement::settle(Fee::new(TERM, 40000), logs, vec![member("abc")]);
        assert_eq!(statement.payers.len(), 1);
        assert!(statement.debtors.is_empty());
    }

    #[test]
    fn test_due_after() {
        assert_eq!(due_after(40000, 5000).unwrap(), 45000);
        assert_eq!(due_after(100, -100).unwrap(), 0);
        assert!(matches!(due_after(100, -101), Err(Error::Validation(_))));
        assert!(matches!(
            due_after(10, i64::MAX),
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = ledger_with(&db, &["abc", "def"]).await;

        let fee = ledger.create(TERM, 40000).await.unwrap();
        assert_eq!(fee.amount, 40000);

        let err = ledger.create(TERM, 30000).await.unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));

        // A fresh term: nothing filed, nobody paid
        let statement = ledger.search(TERM).await.unwrap();
        assert_eq!(statement.fee.amount, 40000);
        assert!(statement.logs.is_empty());
        assert!(statement.payers.is_empty());
        assert_eq!(statement.debtors.len(), 2);
        assert!(statement.debtors.iter().all(|d| d.deficit == 40000));
        assert_eq!(ledger.amount(TERM, "abc").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = Ledger::new(db);
        let err = ledger.create(TERM, -1).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = ledger.create(Term::new(2021, 0), 100).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_installments_make_a_payer() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = ledger_with(&db, &["abc"]).await;
        ledger.create(TERM, 40000).await.unwrap();

        paid(&ledger, "abc", 20000).await;
        paid(&ledger, "abc", 20000).await;

        assert_eq!(ledger.amount(TERM, "abc").await.unwrap(), 40000);
        let payers = ledger.payers(TERM).await.unwrap();
        assert_eq!(payers.len(), 1);
        assert_eq!(payers[0].id, "abc");
        assert!(ledger.deptors(TERM).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_payment_leaves_a_debt() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = ledger_with(&db, &["abc"]).await;
        ledger.create(TERM, 40000).await.unwrap();

        paid(&ledger, "abc", 20000).await;
        // Filed but not approved
        ledger.pay(TERM, "abc", 20000).await.unwrap();

        assert_eq!(ledger.amount(TERM, "abc").await.unwrap(), 20000);
        assert!(ledger.payers(TERM).await.unwrap().is_empty());
        let debtors = ledger.deptors(TERM).await.unwrap();
        assert_eq!(debtors.len(), 1);
        assert_eq!(debtors[0].member.id, "abc");
        assert_eq!(debtors[0].deficit, 20000);

        let statement = ledger.search(TERM).await.unwrap();
        assert_eq!(statement.logs.len(), 2);
        assert_eq!(statement.fee.logs.len(), 2);
    }

    #[tokio::test]
    async fn test_deposit_moves_payer_to_debtors() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = ledger_with(&db, &["abc"]).await;
        ledger.create(TERM, 40000).await.unwrap();
        paid(&ledger, "abc", 40000).await;
        assert_eq!(ledger.payers(TERM).await.unwrap().len(), 1);

        ledger.deposit(TERM, 5000).await.unwrap();

        let statement = ledger.search(TERM).await.unwrap();
        assert_eq!(statement.fee.amount, 45000);
        assert!(statement.payers.is_empty());
        assert_eq!(statement.debtors.len(), 1);
        assert_eq!(statement.debtors[0].deficit, 5000);
    }

    #[tokio::test]
    async fn test_deposit_errors() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = Ledger::new(db);

        let err = ledger.deposit(TERM, 100).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        ledger.create(TERM, 100).await.unwrap();
        let err = ledger.deposit(TERM, -200).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(ledger.search(TERM).await.unwrap().fee.amount, 100);
    }

    #[tokio::test]
    async fn test_deposit_overflow_keeps_term() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = ledger_with(&db, &["abc"]).await;
        ledger.create(TERM, 10).await.unwrap();

        let err = ledger.deposit(TERM, i64::MAX).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let statement = ledger.search(TERM).await.unwrap();
        assert_eq!(statement.fee.amount, 10);
        assert_eq!(statement.debtors[0].deficit, 10);
        ledger.pay(TERM, "abc", 10).await.unwrap();
    }

    #[tokio::test]
    async fn test_pay_overflow() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = ledger_with(&db, &["abc"]).await;
        ledger.create(TERM, 40000).await.unwrap();

        paid(&ledger, "abc", i64::MAX).await;
        let err = ledger.pay(TERM, "abc", 1).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        assert_eq!(ledger.amount(TERM, "abc").await.unwrap(), i64::MAX);
        let statement = ledger.search(TERM).await.unwrap();
        assert_eq!(statement.logs.len(), 1);
        assert_eq!(statement.payers.len(), 1);
        assert!(statement.debtors.is_empty());
    }

    #[tokio::test]
    async fn test_pay_errors() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = ledger_with(&db, &["abc"]).await;

        let err = ledger.pay(TERM, "abc", 100).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        ledger.create(TERM, 100).await.unwrap();
        let err = ledger.pay(TERM, "abc", 0).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = ledger.pay(TERM, "nobody", 100).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_approve_logs() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = ledger_with(&db, &["abc"]).await;
        ledger.create(TERM, 100).await.unwrap();
        let filed = ledger.pay(TERM, "abc", 100).await.unwrap();

        let err = ledger.approve(&[filed.id, 9999]).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(ledger.amount(TERM, "abc").await.unwrap(), 0);

        ledger.approve(&[filed.id]).await.unwrap();
        // approving again is a no-op
        ledger.approve(&[filed.id, filed.id]).await.unwrap();

        let statement = ledger.search(TERM).await.unwrap();
        let log = &statement.logs[0];
        assert_eq!(log.kind, LogKind::Approved);
        assert_eq!(log.amount, 100);
        assert_eq!(log.created_at, filed.created_at);
        assert!(log.updated_at >= filed.updated_at);
        assert_eq!(statement.payers.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_term() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = Ledger::new(db);
        assert!(matches!(
            ledger.amount(TERM, "abc").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(ledger.search(TERM).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_terms() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = Ledger::new(db);
        ledger.create(Term::new(2022, 2), 40000).await.unwrap();
        ledger.create(Term::new(2022, 1), 30000).await.unwrap();

        let terms: Vec<Term> = ledger
            .terms()
            .await
            .unwrap()
            .iter()
            .map(|fee| fee.term())
            .collect();
        assert_eq!(terms, vec![Term::new(2022, 1), Term::new(2022, 2)]);
    }
}
