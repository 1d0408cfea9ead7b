use chrono::DateTime;

use buddy_data::{Fee, Log, Member};
use buddy_engine::{Debtor, Statement};

macro_rules! next_attr {
    ($old:ident, $new:ident, $attr:ident) => {
        if $old.$attr != $new.$attr {
            format!(" -> {}", $new.$attr)
        } else {
            "".to_string()
        }
    };
}

pub trait PrintFormatted {
    fn print_formatted(&self);
}

fn flags(member: &Member) -> String {
    let mut flags = Vec::new();
    if !member.approved {
        flags.push("pending");
    }
    if member.on_delete {
        flags.push("exiting");
    }
    flags.join(",")
}

fn timestamp(secs: i64) -> String {
    match DateTime::from_timestamp(secs, 0) {
        Some(at) => at.format("%Y-%m-%d %H:%M").to_string(),
        None => secs.to_string(),
    }
}

impl PrintFormatted for Member {
    fn print_formatted(&self) {
        println!("ID:\t\t\t{}", self.id);
        println!("Name:\t\t\t{}", self.name);
        println!("Department:\t\t{}", self.department);
        println!("Grade:\t\t\t{}", self.grade);
        println!("Phone:\t\t\t{}", self.phone);
        println!("Email:\t\t\t{}", self.email);
        println!("Attendance:\t\t{}", self.attendance);
        println!("Approved:\t\t{}", self.approved);
        println!("Exit requested:\t\t{}", self.on_delete);
    }
}

impl PrintFormatted for (Member, Member) {
    fn print_formatted(&self) {
        let (old, new) = self;
        println!("ID:\t\t\t{}", old.id);
        let next_name = next_attr!(old, new, name);
        println!("Name:\t\t\t{}{}", old.name, next_name);
        let next_department = next_attr!(old, new, department);
        println!("Department:\t\t{}{}", old.department, next_department);
        let next_grade = next_attr!(old, new, grade);
        println!("Grade:\t\t\t{}{}", old.grade, next_grade);
        let next_phone = next_attr!(old, new, phone);
        println!("Phone:\t\t\t{}{}", old.phone, next_phone);
        let next_email = next_attr!(old, new, email);
        println!("Email:\t\t\t{}{}", old.email, next_email);
        let next_attendance = next_attr!(old, new, attendance);
        println!("Attendance:\t\t{}{}", old.attendance, next_attendance);
    }
}

impl PrintFormatted for Vec<Member> {
    fn print_formatted(&self) {
        println!(
            "{:<12}\t{:<20}\t{:<20}\t{:<6}\t{:<16}\t{:<28}\t{:<10}\t{}",
            "ID", "Name", "Department", "Grade", "Phone", "Email",
            "Attendance", "Flags"
        );
        println!("{:-<150}", "-");
        for member in self {
            println!(
                "{:<12}\t{:<20}\t{:<20}\t{:<6}\t{:<16}\t{:<28}\t{:<10}\t{}",
                member.id,
                member.name,
                member.department,
                member.grade,
                member.phone,
                member.email,
                member.attendance,
                flags(member),
            );
        }
    }
}

impl PrintFormatted for Fee {
    fn print_formatted(&self) {
        println!("Term:\t\t\t{}", self.term());
        println!("Amount due:\t\t{}", self.amount);
        println!("Payments:\t\t{}", self.logs.len());
    }
}

impl PrintFormatted for Vec<Fee> {
    fn print_formatted(&self) {
        println!("{:<8}\t{:>12}\t{:>8}", "Term", "Amount", "Payments");
        println!("{:-<40}", "-");
        for fee in self {
            println!(
                "{:<8}\t{:>12}\t{:>8}",
                fee.term().to_string(),
                fee.amount,
                fee.logs.len()
            );
        }
    }
}

impl PrintFormatted for Log {
    fn print_formatted(&self) {
        println!("ID:\t\t\t{}", self.id);
        println!("Member:\t\t\t{}", self.member_id);
        println!("Term:\t\t\t{}", self.term());
        println!("Amount:\t\t\t{}", self.amount);
        println!("State:\t\t\t{}", self.kind);
        println!("Created:\t\t{}", timestamp(self.created_at));
    }
}

impl PrintFormatted for Vec<Log> {
    fn print_formatted(&self) {
        println!(
            "{:>6}\t{:<12}\t{:<8}\t{:>10}\t{:<10}\t{:<16}\t{}",
            "ID", "Member", "Term", "Amount", "State", "Created", "Updated"
        );
        println!("{:-<110}", "-");
        for log in self {
            println!(
                "{:>6}\t{:<12}\t{:<8}\t{:>10}\t{:<10}\t{:<16}\t{}",
                log.id,
                log.member_id,
                log.term().to_string(),
                log.amount,
                log.kind.to_string(),
                timestamp(log.created_at),
                timestamp(log.updated_at),
            );
        }
    }
}

impl PrintFormatted for Vec<Debtor> {
    fn print_formatted(&self) {
        println!("{:<12}\t{:<20}\t{:<20}\t{:>10}", "ID", "Name", "Department", "Deficit");
        println!("{:-<70}", "-");
        for debtor in self {
            println!(
                "{:<12}\t{:<20}\t{:<20}\t{:>10}",
                debtor.member.id,
                debtor.member.name,
                debtor.member.department,
                debtor.deficit,
            );
        }
    }
}

impl PrintFormatted for Statement {
    fn print_formatted(&self) {
        self.fee.print_formatted();
        println!("");
        println!("{} payments.", self.logs.len());
        self.logs.print_formatted();
        println!("");
        println!("{} members paid in full.", self.payers.len());
        self.payers.print_formatted();
        println!("");
        println!("{} members owe dues.", self.debtors.len());
        self.debtors.print_formatted();
    }
}
