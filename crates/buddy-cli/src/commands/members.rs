use anyhow::Result;
use clap::{Args, Subcommand};
use inquire::Password;

use buddy_data::{Attendance, Candidate, Member, MemberFilter, MemberId, MemberPatch};
use buddy_db::Connection;
use buddy_engine::Registry;

use crate::commands::confirm;
use crate::formatting::PrintFormatted;

#[derive(Subcommand, Debug)]
pub enum Members {
    /// List pending sign-ups
    #[clap(name = "signups")]
    SignUps(ListSignUps),
    /// Approve pending sign-ups
    #[clap(name = "approve")]
    Approve(ApproveMembers),
    /// Show a member
    #[clap(name = "show")]
    Show(ShowMember),
    /// List approved members
    #[clap(name = "list")]
    List(ListMembers),
    /// List members who requested to exit
    #[clap(name = "exits")]
    Exits(ListExits),
    /// List graduates
    #[clap(name = "graduates")]
    Graduates(ListGraduates),
    /// Sign up a new member
    #[clap(name = "signup")]
    SignUp(SignUp),
    /// Update a member
    #[clap(name = "update")]
    Update(UpdateMember),
    /// Request to exit the club
    #[clap(name = "exit")]
    Exit(ExitMember),
    /// Withdraw an exit request
    #[clap(name = "cancel-exit")]
    CancelExit(CancelExit),
    /// Mark a member as graduated
    #[clap(name = "graduate")]
    Graduate(GraduateMember),
    /// Delete members who requested to exit
    #[clap(name = "delete")]
    Delete(DeleteMembers),
    /// Check a member's password
    #[clap(name = "signin")]
    SignIn(SignIn),
}

impl Members {
    pub async fn run(self, db: &Connection) -> Result<()> {
        let registry = Registry::new(db.clone());
        match self {
            Members::SignUps(cmd) => cmd.run(&registry).await,
            Members::Approve(cmd) => cmd.run(&registry).await,
            Members::Show(cmd) => cmd.run(&registry).await,
            Members::List(cmd) => cmd.run(&registry).await,
            Members::Exits(cmd) => cmd.run(&registry).await,
            Members::Graduates(cmd) => cmd.run(&registry).await,
            Members::SignUp(cmd) => cmd.run(&registry).await,
            Members::Update(cmd) => cmd.run(&registry).await,
            Members::Exit(cmd) => cmd.run(&registry).await,
            Members::CancelExit(cmd) => cmd.run(&registry).await,
            Members::Graduate(cmd) => cmd.run(&registry).await,
            Members::Delete(cmd) => cmd.run(&registry).await,
            Members::SignIn(cmd) => cmd.run(&registry).await,
        }
    }
}

type Roster = Registry<Connection>;

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// The members among `ids`, for review before a batch change
fn listed(members: Vec<Member>, ids: &[MemberId]) -> Vec<Member> {
    members
        .into_iter()
        .filter(|member| ids.contains(&member.id))
        .collect()
}

#[derive(Args, Debug)]
pub struct ListSignUps {}

impl ListSignUps {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        let members = registry.sign_ups().await?;
        println!("{} pending sign-ups.", members.len());
        members.print_formatted();
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ApproveMembers {
    pub ids: Vec<MemberId>,
    #[clap(long)]
    pub yes: bool,
}

impl ApproveMembers {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        let members = listed(registry.sign_ups().await?, &self.ids);
        println!("");
        members.print_formatted();
        println!("");
        if !confirm("Approve these sign-ups?", self.yes)? {
            return Ok(());
        }
        registry.approve(&self.ids).await?;
        println!("Approved {} members.", self.ids.len());
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ShowMember {
    #[clap(short, long)]
    pub id: MemberId,
}

impl ShowMember {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        let member = registry.retrieve(&self.id).await?;
        println!("");
        member.print_formatted();
        println!("");
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ListMembers {
    #[clap(short, long)]
    pub name: Option<String>,
    #[clap(short, long)]
    pub department: Vec<String>,
    #[clap(short, long)]
    pub grade: Vec<String>,
    #[clap(short, long)]
    pub attendance: Vec<Attendance>,
    #[clap(short, long)]
    pub email: Option<String>,
}

impl ListMembers {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        let filter = MemberFilter {
            name: self.name,
            department: non_empty(self.department),
            grade: non_empty(self.grade),
            attendance: non_empty(self.attendance),
            email: self.email,
            ..Default::default()
        };

        let members = registry.search(filter).await?;
        println!("{} members.", members.len());
        members.print_formatted();
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ListExits {}

impl ListExits {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        let members = registry.exits().await?;
        println!("{} members requested to exit.", members.len());
        members.print_formatted();
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ListGraduates {}

impl ListGraduates {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        let members = registry.graduates().await?;
        println!("{} graduates.", members.len());
        members.print_formatted();
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct SignUp {
    #[clap(short, long)]
    pub id: MemberId,
    #[clap(short, long)]
    pub name: String,
    #[clap(short, long)]
    pub department: String,
    #[clap(short, long)]
    pub grade: String,
    #[clap(short, long)]
    pub phone: String,
    #[clap(short, long)]
    pub email: String,
    #[clap(short, long, default_value_t = Attendance::Attending)]
    pub attendance: Attendance,
    /// Defaults to the member id
    #[clap(long)]
    pub password: Option<String>,
    #[clap(long)]
    pub yes: bool,
}

impl SignUp {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        let candidate = Candidate {
            id: self.id,
            password: self.password,
            name: self.name,
            department: self.department,
            grade: self.grade,
            phone: self.phone,
            email: self.email,
            attendance: self.attendance,
        };

        println!("");
        Member::from(candidate.clone()).print_formatted();
        println!("");
        if !confirm("Sign up member?", self.yes)? {
            return Ok(());
        }

        let member = registry.sign_up(candidate).await?;
        println!("Member {} signed up, awaiting approval.", member.id);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct UpdateMember {
    #[clap(short, long)]
    pub id: MemberId,
    #[clap(short, long)]
    pub name: Option<String>,
    #[clap(short, long)]
    pub department: Option<String>,
    #[clap(short, long)]
    pub grade: Option<String>,
    #[clap(short, long)]
    pub phone: Option<String>,
    #[clap(short, long)]
    pub email: Option<String>,
    #[clap(short, long)]
    pub attendance: Option<Attendance>,
    /// Prompt for a new password
    #[clap(long)]
    pub password: bool,
    #[clap(long)]
    pub yes: bool,
}

impl UpdateMember {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        let password = if self.password {
            Some(Password::new("New password:").prompt()?)
        } else {
            None
        };
        let patch = MemberPatch {
            name: self.name,
            department: self.department,
            grade: self.grade,
            phone: self.phone,
            email: self.email,
            attendance: self.attendance,
            password,
        };

        let member = registry.retrieve(&self.id).await?;
        let update = patch.preview(&member);
        println!("");
        (member, update).print_formatted();
        if patch.password.is_some() {
            println!("Password:\t\t(changed)");
        }
        println!("");
        if !confirm("Update member?", self.yes)? {
            return Ok(());
        }

        registry.update(&self.id, patch).await?;
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ExitMember {
    #[clap(short, long)]
    pub id: MemberId,
}

impl ExitMember {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        registry.exit(&self.id).await?;
        println!("Member {} requested to exit.", self.id);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct CancelExit {
    #[clap(short, long)]
    pub id: MemberId,
}

impl CancelExit {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        registry.cancel_exit(&self.id).await?;
        println!("Member {} stays.", self.id);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct GraduateMember {
    #[clap(short, long)]
    pub id: MemberId,
    #[clap(long)]
    pub yes: bool,
}

impl GraduateMember {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        let member = registry.retrieve(&self.id).await?;
        println!("");
        member.print_formatted();
        println!("");
        if !confirm("Mark member as graduated? This can not be undone.", self.yes)? {
            return Ok(());
        }
        registry.graduate(&self.id).await?;
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct DeleteMembers {
    pub ids: Vec<MemberId>,
    #[clap(long)]
    pub yes: bool,
}

impl DeleteMembers {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        let members = listed(registry.exits().await?, &self.ids);
        println!("");
        members.print_formatted();
        println!("");
        if !confirm("Delete members from database?", self.yes)? {
            return Ok(());
        }
        registry.delete(&self.ids).await?;
        println!("Deleted {} members.", self.ids.len());
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct SignIn {
    #[clap(short, long)]
    pub id: MemberId,
}

impl SignIn {
    pub async fn run(self, registry: &Roster) -> Result<()> {
        let password = Password::new("Password:")
            .without_confirmation()
            .prompt()?;
        let member = registry.sign_in(&self.id, &password).await?;
        println!("Signed in as {} ({}).", member.name, member.id);
        Ok(())
    }
}
