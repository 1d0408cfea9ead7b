use anyhow::Result;
use clap::{Args, Subcommand};

use buddy_data::{LogId, MemberId, Term};
use buddy_db::Connection;
use buddy_engine::{due_after, Ledger};

use crate::commands::confirm;
use crate::formatting::PrintFormatted;

#[derive(Subcommand, Debug)]
pub enum Fees {
    /// Open a term with the amount due
    #[clap(name = "create")]
    Create(CreateFee),
    /// Raise or lower the amount due for a term
    #[clap(name = "deposit")]
    Deposit(DepositFee),
    /// Record a payment, pending approval
    #[clap(name = "pay")]
    Pay(PayFee),
    /// Approve recorded payments
    #[clap(name = "approve")]
    Approve(ApprovePayments),
    /// Show what a member paid for a term
    #[clap(name = "amount")]
    Amount(ShowAmount),
    /// List members who paid in full
    #[clap(name = "payers")]
    Payers(ListPayers),
    /// List members who owe dues
    #[clap(name = "debtors")]
    Debtors(ListDebtors),
    /// Show the statement of a term
    #[clap(name = "show")]
    Show(ShowStatement),
    /// List terms
    #[clap(name = "list")]
    List(ListTerms),
}

impl Fees {
    pub async fn run(self, db: &Connection) -> Result<()> {
        let ledger = Ledger::new(db.clone());
        match self {
            Fees::Create(cmd) => cmd.run(&ledger).await,
            Fees::Deposit(cmd) => cmd.run(&ledger).await,
            Fees::Pay(cmd) => cmd.run(&ledger).await,
            Fees::Approve(cmd) => cmd.run(&ledger).await,
            Fees::Amount(cmd) => cmd.run(&ledger).await,
            Fees::Payers(cmd) => cmd.run(&ledger).await,
            Fees::Debtors(cmd) => cmd.run(&ledger).await,
            Fees::Show(cmd) => cmd.run(&ledger).await,
            Fees::List(cmd) => cmd.run(&ledger).await,
        }
    }
}

type Book = Ledger<Connection>;

#[derive(Args, Debug)]
pub struct TermArgs {
    #[clap(short, long)]
    pub year: i32,
    #[clap(short, long)]
    pub semester: i32,
}

impl From<&TermArgs> for Term {
    fn from(args: &TermArgs) -> Self {
        Term::new(args.year, args.semester)
    }
}

#[derive(Args, Debug)]
pub struct CreateFee {
    #[clap(flatten)]
    pub term: TermArgs,
    #[clap(short, long)]
    pub amount: i64,
}

impl CreateFee {
    pub async fn run(self, ledger: &Book) -> Result<()> {
        let fee = ledger.create(Term::from(&self.term), self.amount).await?;
        println!("");
        fee.print_formatted();
        println!("");
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct DepositFee {
    #[clap(flatten)]
    pub term: TermArgs,
    /// Change of the amount due, may be negative
    #[clap(short, long, allow_negative_numbers = true)]
    pub delta: i64,
    #[clap(long)]
    pub yes: bool,
}

impl DepositFee {
    pub async fn run(self, ledger: &Book) -> Result<()> {
        let term = Term::from(&self.term);
        let statement = ledger.search(term).await?;
        let due = statement.fee.amount;
        let next = due_after(due, self.delta)?;
        println!("Amount due:\t\t{} -> {}", due, next);
        if !confirm("Change the amount due?", self.yes)? {
            return Ok(());
        }
        ledger.deposit(term, self.delta).await?;
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct PayFee {
    #[clap(flatten)]
    pub term: TermArgs,
    #[clap(short, long)]
    pub member: MemberId,
    #[clap(short, long)]
    pub amount: i64,
}

impl PayFee {
    pub async fn run(self, ledger: &Book) -> Result<()> {
        let log = ledger
            .pay(Term::from(&self.term), &self.member, self.amount)
            .await?;
        println!("");
        log.print_formatted();
        println!("");
        println!("Payment {} recorded, awaiting approval.", log.id);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ApprovePayments {
    pub ids: Vec<LogId>,
    #[clap(long)]
    pub yes: bool,
}

impl ApprovePayments {
    pub async fn run(self, ledger: &Book) -> Result<()> {
        let message = format!("Approve {} payments?", self.ids.len());
        if !confirm(&message, self.yes)? {
            return Ok(());
        }
        ledger.approve(&self.ids).await?;
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ShowAmount {
    #[clap(flatten)]
    pub term: TermArgs,
    #[clap(short, long)]
    pub member: MemberId,
}

impl ShowAmount {
    pub async fn run(self, ledger: &Book) -> Result<()> {
        let term = Term::from(&self.term);
        let paid = ledger.amount(term, &self.member).await?;
        println!("Member {} paid {} for {}.", self.member, paid, term);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ListPayers {
    #[clap(flatten)]
    pub term: TermArgs,
}

impl ListPayers {
    pub async fn run(self, ledger: &Book) -> Result<()> {
        let payers = ledger.payers(Term::from(&self.term)).await?;
        println!("{} members paid in full.", payers.len());
        payers.print_formatted();
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ListDebtors {
    #[clap(flatten)]
    pub term: TermArgs,
}

impl ListDebtors {
    pub async fn run(self, ledger: &Book) -> Result<()> {
        let debtors = ledger.deptors(Term::from(&self.term)).await?;
        println!("{} members owe dues.", debtors.len());
        debtors.print_formatted();
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ShowStatement {
    #[clap(flatten)]
    pub term: TermArgs,
}

impl ShowStatement {
    pub async fn run(self, ledger: &Book) -> Result<()> {
        let statement = ledger.search(Term::from(&self.term)).await?;
        println!("");
        statement.print_formatted();
        println!("");
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ListTerms {}

impl ListTerms {
    pub async fn run(self, ledger: &Book) -> Result<()> {
        let fees = ledger.terms().await?;
        println!("{} terms.", fees.len());
        fees.print_formatted();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deposit_overflow_is_refused() {
        let (_handle, db) = Connection::open_test().await;
        let ledger = Ledger::new(db);
        let term = Term::new(2021, 1);
        ledger.create(term, 10).await.unwrap();

        let cmd = DepositFee {
            term: TermArgs {
                year: 2021,
                semester: 1,
            },
            delta: i64::MAX,
            yes: true,
        };
        assert!(cmd.run(&ledger).await.is_err());
        assert_eq!(ledger.search(term).await.unwrap().fee.amount, 10);
    }
}
